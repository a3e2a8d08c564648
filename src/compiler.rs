//! Compilation: fold the syntax tree into an executable pattern tree.
//!
//! This is where the default lookup key and the case flag are resolved,
//! repeat bounds and numeric constants are validated, value regexes are
//! compiled (and downgraded to plain strings when they contain no
//! metacharacters), `$name` atoms are substituted, and boolean combinators
//! collapse to their single-token forms when both operands consume the same
//! number of tokens.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::ast::{
    Atom, AtomKind, BodyAtom, BodyExpr, Expr, KeyValue, Num, RepeatBounds, TokenExpr, ValueExpr,
};
use crate::error::PatternError;
use crate::parser;
use crate::pattern::{Capture, Node, Parts, Pattern, UNBOUNDED};

/// The lookup key used for bare values when none is configured.
pub const DEFAULT_KEY: &str = "default";

/// Options for [`Pattern::compile_with`] and
/// [`Pattern::compile_variables`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// If true (the default), literal values must match case exactly.
    /// When false, literals compare by upper-case folding and value regexes
    /// are compiled case-insensitively.
    pub case_sensitive: bool,
    /// The token key that bare values (`hello`, `"hello"`, `42`) are looked
    /// up under.
    pub default_key: String,
    /// Named subpatterns available to `$name` atoms.
    pub variables: HashMap<String, Pattern>,
}

impl Default for CompileOptions {
    fn default() -> CompileOptions {
        CompileOptions {
            case_sensitive: true,
            default_key: DEFAULT_KEY.to_string(),
            variables: HashMap::new(),
        }
    }
}

impl CompileOptions {
    /// The default options with case-insensitive matching.
    pub fn case_insensitive() -> CompileOptions {
        CompileOptions {
            case_sensitive: false,
            ..CompileOptions::default()
        }
    }
}

/// Process-wide cache of compiled value regexes, keyed by source text and
/// case flag. This is the only globally shared mutable state in the crate.
static REGEX_CACHE: Lazy<Mutex<HashMap<(String, bool), Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// True when a regex body contains none of the characters that would make
/// it behave differently from a plain string comparison.
fn is_plain_regex(body: &str) -> bool {
    !body.is_empty()
        && body.chars().all(|c| {
            !matches!(
                c,
                '\\' | '[' | ']' | '^' | '$' | '&' | '|' | '{' | '}' | '?' | '*' | '.' | '+'
            )
        })
}

impl Pattern {
    /// Compile a pattern with the default options: case-sensitive, bare
    /// values looked up under [`DEFAULT_KEY`], no variables.
    pub fn compile(source: &str) -> Result<Pattern, PatternError> {
        Pattern::compile_with(source, &CompileOptions::default())
    }

    /// Compile a pattern.
    ///
    /// Blank source compiles to the empty pattern, which matches only the
    /// empty input sequence.
    pub fn compile_with(source: &str, options: &CompileOptions) -> Result<Pattern, PatternError> {
        compile_impl(
            source,
            options.case_sensitive,
            &options.default_key,
            &options.variables,
        )
    }

    /// Compile a collection of variable definitions that may reference each
    /// other, in any definition order.
    ///
    /// Compilation runs to a fixpoint: each pass compiles every definition
    /// whose references are already resolved. When a pass makes no
    /// progress, the remaining definitions are circular or reference
    /// something undefined, and compilation fails. A leading `$` on a
    /// definition name is stripped. Variables already present in
    /// `options.variables` seed the environment and are part of the
    /// returned map.
    pub fn compile_variables(
        definitions: &HashMap<String, String>,
        options: &CompileOptions,
    ) -> Result<HashMap<String, Pattern>, PatternError> {
        let mut compiled = options.variables.clone();
        let mut fringe: Vec<(&str, &str)> = definitions
            .iter()
            .map(|(name, source)| (name.strip_prefix('$').unwrap_or(name), source.as_str()))
            .collect();
        while !fringe.is_empty() {
            let mut remaining = Vec::with_capacity(fringe.len());
            let mut last_error = None;
            let before = fringe.len();
            for (name, source) in fringe {
                match compile_impl(source, options.case_sensitive, &options.default_key, &compiled)
                {
                    Ok(pattern) => {
                        compiled.insert(name.to_string(), pattern);
                    }
                    Err(err) => {
                        last_error = Some(err);
                        remaining.push((name, source));
                    }
                }
            }
            if remaining.len() == before {
                // No definition compiled this pass: a cycle or an unbound
                // reference. Surface the most recent failure.
                let err = last_error.unwrap_or_else(|| PatternError::new("empty fringe", "", 0));
                return Err(PatternError::new(
                    format!(
                        "could not compile {} pattern variable(s); last failure: {}",
                        remaining.len(),
                        err.message()
                    ),
                    err.pattern(),
                    err.offset(),
                ));
            }
            fringe = remaining;
        }
        Ok(compiled)
    }
}

fn compile_impl(
    source: &str,
    case_sensitive: bool,
    default_key: &str,
    variables: &HashMap<String, Pattern>,
) -> Result<Pattern, PatternError> {
    if source.trim().is_empty() {
        return Ok(Pattern::new(Node::Empty));
    }
    let expr = parser::parse(source)?;
    let builder = Builder {
        source,
        case_sensitive,
        default_key,
        variables,
    };
    builder.pattern(&expr)
}

struct Builder<'a> {
    source: &'a str,
    case_sensitive: bool,
    default_key: &'a str,
    variables: &'a HashMap<String, Pattern>,
}

impl Builder<'_> {
    fn err(&self, message: impl Into<String>, offset: usize) -> PatternError {
        PatternError::new(message, self.source, offset)
    }

    fn pattern(&self, expr: &Expr) -> Result<Pattern, PatternError> {
        match expr {
            Expr::Seq(atoms) => self.atom_list(atoms),
            Expr::And(atoms, rest) => {
                let lhs = self.atom_list(atoms)?;
                let rhs = self.pattern(rest)?;
                Ok(conjoin(lhs, rhs))
            }
            Expr::Or(atoms, rest) => {
                let lhs = self.atom_list(atoms)?;
                let rhs = self.pattern(rest)?;
                Ok(disjoin(lhs, rhs))
            }
        }
    }

    fn atom_list(&self, atoms: &[Atom]) -> Result<Pattern, PatternError> {
        let mut parts = atoms
            .iter()
            .map(|atom| self.atom(atom))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            let count = parts.len() as u32;
            Ok(Pattern::new(Node::Sequence {
                parts: Parts::List(parts),
                min: count,
                max: count,
                reluctant: false,
            }))
        }
    }

    fn atom(&self, atom: &Atom) -> Result<Pattern, PatternError> {
        match &atom.kind {
            AtomKind::Token(token) => self.token(token),
            AtomKind::Group { name, body } => {
                let inner = self.pattern(body)?;
                let capture = match name {
                    None => Capture::Anonymous,
                    Some(name) => Capture::Named(name.clone()),
                };
                Ok(inner.with_capture(capture))
            }
            AtomKind::Variable(name) => self.variables.get(name).cloned().ok_or_else(|| {
                self.err(
                    format!("could not find variable '${name}'; has it been declared?"),
                    atom.offset,
                )
            }),
            AtomKind::Repeat {
                inner,
                bounds,
                reluctant,
            } => {
                let part = self.atom(inner)?;
                let (min, max, reluctant) = match bounds {
                    RepeatBounds::Star => (0, UNBOUNDED, *reluctant),
                    RepeatBounds::Plus => (1, UNBOUNDED, *reluctant),
                    RepeatBounds::Opt => (0, 1, *reluctant),
                    // `{n}?` is semantically `{n}`; the reluctance marker
                    // was already discarded by the parser.
                    RepeatBounds::Exact(n) => {
                        let n = self.bound(n)?;
                        (n, n, false)
                    }
                    RepeatBounds::AtLeast(n) => (self.bound(n)?, UNBOUNDED, *reluctant),
                    RepeatBounds::Range(lo, hi) => {
                        let min = self.bound(lo)?;
                        let max = self.bound(hi)?;
                        if max < min {
                            return Err(self.err(
                                "repeat upper bound cannot be less than the lower bound",
                                hi.offset,
                            ));
                        }
                        (min, max, *reluctant)
                    }
                };
                Ok(Pattern::new(Node::Sequence {
                    parts: Parts::Repeat(part),
                    min,
                    max,
                    reluctant,
                }))
            }
        }
    }

    /// A repeat bound: `--` pairs collapse, and the result must be a
    /// non-negative 32-bit integer.
    fn bound(&self, num: &Num) -> Result<u32, PatternError> {
        let text = num.text.replace("--", "");
        let value: i64 = text.parse().map_err(|_| {
            self.err(
                format!("cannot parse repeat bound '{}'", num.text),
                num.offset,
            )
        })?;
        if value < 0 {
            return Err(self.err("repeat bound cannot be negative", num.offset));
        }
        if value > i64::from(i32::MAX) {
            return Err(self.err(
                format!("repeat bound '{}' overflows a 32-bit integer", num.text),
                num.offset,
            ));
        }
        Ok(value as u32)
    }

    fn token(&self, token: &TokenExpr) -> Result<Pattern, PatternError> {
        match token {
            TokenExpr::Value(value) => self.value(self.default_key, value),
            TokenExpr::Keyword(text) => Ok(Pattern::new(Node::Literal {
                key: self.default_key.to_string(),
                value: text.clone(),
                case_sensitive: self.case_sensitive,
            })),
            TokenExpr::Wildcard => Ok(Pattern::new(Node::Wildcard)),
            TokenExpr::Start => Ok(Pattern::new(Node::Start)),
            TokenExpr::End => Ok(Pattern::new(Node::End)),
            TokenExpr::Body(body) => self.body(body),
        }
    }

    fn value(&self, key: &str, value: &ValueExpr) -> Result<Pattern, PatternError> {
        let literal = |value: String| {
            Pattern::new(Node::Literal {
                key: key.to_string(),
                value,
                case_sensitive: self.case_sensitive,
            })
        };
        match value {
            ValueExpr::Unquoted(text) => Ok(literal(text.clone())),
            ValueExpr::Quoted(text) => Ok(literal(text.clone())),
            ValueExpr::Comma => Ok(literal(",".to_string())),
            ValueExpr::Number(text) => {
                // Dash pairs cancel, and negative zero folds to zero.
                let mut folded = text.replace("--", "");
                if folded == "-0" {
                    folded = "0".to_string();
                }
                Ok(literal(folded))
            }
            ValueExpr::Regex { source, offset } => {
                if is_plain_regex(source) {
                    // No metacharacters: a plain string comparison is
                    // equivalent and much cheaper.
                    Ok(literal(source.clone()))
                } else {
                    let regex = self.value_regex(source, *offset)?;
                    Ok(Pattern::new(Node::ValueRegex {
                        key: key.to_string(),
                        source: source.clone(),
                        regex,
                    }))
                }
            }
        }
    }

    /// Compile (or fetch from the cache) a value regex, anchored so it must
    /// match the whole token value.
    fn value_regex(&self, source: &str, offset: usize) -> Result<Regex, PatternError> {
        let key = (source.to_string(), !self.case_sensitive);
        let mut cache = REGEX_CACHE
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(regex) = cache.get(&key) {
            return Ok(regex.clone());
        }
        let anchored = format!(r"\A(?:{source})\z");
        let regex = RegexBuilder::new(&anchored)
            .case_insensitive(!self.case_sensitive)
            .build()
            .map_err(|err| self.err(format!("invalid regex /{source}/: {err}"), offset))?;
        cache.insert(key, regex.clone());
        Ok(regex)
    }

    fn body(&self, body: &BodyExpr) -> Result<Pattern, PatternError> {
        match body {
            BodyExpr::Atom(atom) => self.body_atom(atom),
            BodyExpr::And(lhs, rhs) => Ok(Pattern::new(Node::TokenAnd(
                self.body(lhs)?,
                self.body_atom(rhs)?,
            ))),
            BodyExpr::Or(lhs, rhs) => Ok(Pattern::new(Node::TokenOr(
                self.body(lhs)?,
                self.body_atom(rhs)?,
            ))),
        }
    }

    fn body_atom(&self, atom: &BodyAtom) -> Result<Pattern, PatternError> {
        match atom {
            BodyAtom::KeyValue(pair) => self.key_value(pair),
            BodyAtom::Paren(body) => self.body(body),
            BodyAtom::Not(inner) => {
                let inner = self.body_atom(inner)?;
                // The grammar cannot produce a multi-token operand here,
                // but the invariant is load-bearing, so it is checked.
                if inner.token_length().is_none() {
                    return Err(self.err("negation is only valid over a single token", 0));
                }
                Ok(Pattern::new(Node::Not(inner)))
            }
        }
    }

    fn key_value(&self, pair: &KeyValue) -> Result<Pattern, PatternError> {
        match pair {
            KeyValue::Pair { key, value } => self.value(key, value),
            KeyValue::Cmp { key, op, number } => {
                let value = number.text.parse::<i32>().map_err(|_| {
                    self.err(
                        format!(
                            "numeric comparison against non-integer value '{}'",
                            number.text
                        ),
                        number.offset,
                    )
                })?;
                Ok(Pattern::new(Node::Cmp {
                    key: key.clone(),
                    value,
                    op: *op,
                }))
            }
            KeyValue::Absent { key } => Ok(Pattern::new(Node::Absent { key: key.clone() })),
        }
    }
}

/// `lhs & rhs`, collapsed to the single-token form when both operands
/// consume the same number of tokens (the length test matters for the
/// zero-width anchors).
fn conjoin(lhs: Pattern, rhs: Pattern) -> Pattern {
    match (lhs.token_length(), rhs.token_length()) {
        (Some(a), Some(b)) if a == b => Pattern::new(Node::TokenAnd(lhs, rhs)),
        _ => Pattern::new(Node::And(lhs, rhs)),
    }
}

/// `lhs | rhs`, collapsed like [`conjoin`].
fn disjoin(lhs: Pattern, rhs: Pattern) -> Pattern {
    match (lhs.token_length(), rhs.token_length()) {
        (Some(a), Some(b)) if a == b => Pattern::new(Node::TokenOr(lhs, rhs)),
        _ => Pattern::new(Node::Or(lhs, rhs)),
    }
}
