//! The compiled pattern tree.
//!
//! A [`Pattern`] is an immutable tree of matchable constructs, cheap to
//! clone (`Arc`-backed) and safe to share across threads. All mutable match
//! state lives in the [`Matcher`](crate::Matcher) built from it.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::error::MatchError;
use crate::iter::{ConjIter, DisjIter, EndIter, SeqIter};
use crate::matcher::{MatchState, Matcher};
use crate::token::Token;

/// Repeat upper bound for `*`, `+`, and `{n,}`.
pub(crate) const UNBOUNDED: u32 = u32::MAX;

/// A compiled token-sequence pattern, analogous to a compiled string regex.
///
/// Compile once with [`Pattern::compile`] (or
/// [`compile_with`](Pattern::compile_with)), then create any number of
/// [`Matcher`]s from it; all per-match state lives in the matcher, so one
/// pattern may serve many concurrent matchers.
#[derive(Clone)]
pub struct Pattern {
    pub(crate) repr: Arc<Repr>,
}

#[derive(Clone)]
pub(crate) struct Repr {
    pub node: Node,
    pub capture: Capture,
}

/// The capture slot carried by a node: absent, anonymous, or named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Capture {
    None,
    Anonymous,
    Named(String),
}

#[derive(Clone)]
pub(crate) enum Node {
    /// The empty pattern, compiled from blank source. Consumes nothing and
    /// matches a whole input only when the input is empty.
    Empty,
    /// A single token whose value at `key` equals `value`.
    Literal {
        key: String,
        value: String,
        case_sensitive: bool,
    },
    /// A single token whose value at `key` is fully matched by a regex.
    ValueRegex {
        key: String,
        source: String,
        regex: regex::Regex,
    },
    /// A single token whose value at `key` is an integer comparing true
    /// against `value`.
    Cmp { key: String, value: i32, op: CmpOp },
    /// A single token with no value at `key`.
    Absent { key: String },
    /// Any single token.
    Wildcard,
    /// Start of the input sequence (zero-width).
    Start,
    /// End of the input sequence (zero-width).
    End,
    /// Single-token conjunction; operands must agree on consumed length.
    TokenAnd(Pattern, Pattern),
    /// Single-token disjunction; operands must agree on consumed length.
    TokenOr(Pattern, Pattern),
    /// Single-token negation.
    Not(Pattern),
    /// An ordered list of sub-patterns, or one sub-pattern repeated between
    /// `min` and `max` times.
    Sequence {
        parts: Parts,
        min: u32,
        max: u32,
        reluctant: bool,
    },
    /// Multi-token conjunction: both sides must end at the same index.
    And(Pattern, Pattern),
    /// Multi-token disjunction: all ends of the left side, then the right,
    /// deduplicated.
    Or(Pattern, Pattern),
}

#[derive(Clone)]
pub(crate) enum Parts {
    List(Vec<Pattern>),
    Repeat(Pattern),
}

/// Comparison operator of an integer-comparison node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
        })
    }
}

impl Pattern {
    pub(crate) fn new(node: Node) -> Pattern {
        Pattern {
            repr: Arc::new(Repr {
                node,
                capture: Capture::None,
            }),
        }
    }

    /// A copy of this pattern carrying `capture`; replaces any capture the
    /// node already had, so `((a))` introduces a single slot.
    pub(crate) fn with_capture(&self, capture: Capture) -> Pattern {
        Pattern {
            repr: Arc::new(Repr {
                node: self.repr.node.clone(),
                capture,
            }),
        }
    }

    /// Node identity. Two clones of one pattern share it; `with_capture`
    /// produces a fresh one.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.repr) as usize
    }

    pub(crate) fn node(&self) -> &Node {
        &self.repr.node
    }

    pub(crate) fn capture(&self) -> &Capture {
        &self.repr.capture
    }

    /// The number of tokens a single-token construct consumes (1, or 0 for
    /// the zero-width anchors), or `None` for multi-token constructs.
    pub(crate) fn token_length(&self) -> Option<u32> {
        match &self.repr.node {
            Node::Literal { .. }
            | Node::ValueRegex { .. }
            | Node::Cmp { .. }
            | Node::Absent { .. }
            | Node::Wildcard => Some(1),
            Node::Start | Node::End => Some(0),
            Node::TokenAnd(lhs, _) | Node::TokenOr(lhs, _) => lhs.token_length(),
            Node::Not(inner) => inner.token_length(),
            Node::Empty | Node::Sequence { .. } | Node::And(_, _) | Node::Or(_, _) => None,
        }
    }

    /// Visit this node and then its children, depth-first pre-order.
    ///
    /// Capture-slot ids follow this order, so an outer group numbers before
    /// the groups nested inside it.
    pub(crate) fn for_each<'a>(&'a self, f: &mut dyn FnMut(&'a Pattern)) {
        f(self);
        match &self.repr.node {
            Node::TokenAnd(lhs, rhs)
            | Node::TokenOr(lhs, rhs)
            | Node::And(lhs, rhs)
            | Node::Or(lhs, rhs) => {
                lhs.for_each(f);
                rhs.for_each(f);
            }
            Node::Not(inner) => inner.for_each(f),
            Node::Sequence { parts, .. } => match parts {
                Parts::List(parts) => {
                    for part in parts {
                        part.for_each(f);
                    }
                }
                Parts::Repeat(part) => part.for_each(f),
            },
            _ => {}
        }
    }

    /// Record `[begin, end)` in this node's capture slot, if it has one.
    pub(crate) fn register_match(&self, begin: usize, end: usize, state: &mut MatchState) {
        if !matches!(self.repr.capture, Capture::None) {
            state.register(self.id(), begin, end);
        }
    }

    /// The lazy sequence of end indices at which this pattern, started at
    /// `index`, could stop. Greedy nodes emit the largest end first,
    /// reluctant nodes the smallest.
    pub(crate) fn consume<T: Token>(
        &self,
        input: &[T],
        index: usize,
        state: &mut MatchState,
    ) -> Result<EndIter, MatchError> {
        match &self.repr.node {
            Node::Empty => Ok(EndIter::One(index)),
            Node::Sequence { .. } => Ok(EndIter::Seq(Box::new(SeqIter::new(self.clone(), index)))),
            Node::Or(lhs, rhs) => {
                let left = lhs.consume(input, index, state)?;
                let right = rhs.consume(input, index, state)?;
                Ok(EndIter::Disj(Box::new(DisjIter::new(
                    self.clone(),
                    index,
                    left,
                    right,
                ))))
            }
            Node::And(lhs, rhs) => {
                let mut left = lhs.consume(input, index, state)?;
                let Some(left_first) = left.next(input, state)? else {
                    return Ok(EndIter::Empty);
                };
                let mut right = rhs.consume(input, index, state)?;
                let Some(right_first) = right.next(input, state)? else {
                    return Ok(EndIter::Empty);
                };
                if left.is_single_valued() && right.is_single_valued() {
                    // Both sides had exactly one end; the common case of a
                    // conjunction over short operands.
                    if left_first == right_first {
                        self.register_match(index, left_first, state);
                        Ok(EndIter::One(left_first))
                    } else {
                        Ok(EndIter::Empty)
                    }
                } else {
                    Ok(EndIter::Conj(Box::new(ConjIter::new(
                        self.clone(),
                        index,
                        left_first,
                        right_first,
                        left,
                        right,
                    ))))
                }
            }
            _ => {
                let length = self.token_length().expect("single-token node") as usize;
                if self.matches_at(input, index, state) {
                    self.register_match(index, index + length, state);
                    Ok(EndIter::One(index + length))
                } else {
                    Ok(EndIter::Empty)
                }
            }
        }
    }

    /// Evaluate a single-token construct at one index.
    pub(crate) fn matches_at<T: Token>(
        &self,
        input: &[T],
        index: usize,
        state: &mut MatchState,
    ) -> bool {
        match &self.repr.node {
            Node::Literal {
                key,
                value,
                case_sensitive,
            } => match lookup(input, index, key) {
                Some(actual) if *case_sensitive => actual == value,
                Some(actual) => eq_fold(value, actual),
                None => false,
            },
            Node::ValueRegex { key, regex, .. } => match lookup(input, index, key) {
                Some(actual) => match regex.captures(actual) {
                    Some(caps) => {
                        for name in regex.capture_names().flatten() {
                            if let Some(m) = caps.name(name) {
                                state.register_string(name, m.as_str());
                            }
                        }
                        true
                    }
                    None => false,
                },
                None => false,
            },
            Node::Cmp { key, value, op } => {
                let Some(actual) = lookup(input, index, key) else {
                    return false;
                };
                let Some(actual) = parse_i32(actual) else {
                    return false;
                };
                match op {
                    CmpOp::Lt => actual < *value,
                    CmpOp::Lte => actual <= *value,
                    CmpOp::Gt => actual > *value,
                    CmpOp::Gte => actual >= *value,
                    CmpOp::Eq => actual == *value,
                    CmpOp::Neq => actual != *value,
                }
            }
            Node::Absent { key } => index < input.len() && input[index].get(key).is_none(),
            Node::Wildcard => index < input.len(),
            Node::Start => index == 0,
            Node::End => index == input.len(),
            Node::TokenAnd(lhs, rhs) => {
                let length = self.token_length().expect("single-token node") as usize;
                if lhs.matches_at(input, index, state) {
                    lhs.register_match(index, index + length, state);
                    if rhs.matches_at(input, index, state) {
                        rhs.register_match(index, index + length, state);
                        return true;
                    }
                }
                false
            }
            Node::TokenOr(lhs, rhs) => {
                let length = self.token_length().expect("single-token node") as usize;
                if lhs.matches_at(input, index, state) {
                    lhs.register_match(index, index + length, state);
                    true
                } else if rhs.matches_at(input, index, state) {
                    rhs.register_match(index, index + length, state);
                    true
                } else {
                    false
                }
            }
            // No sub-captures are recorded for a negated arm.
            Node::Not(inner) => !inner.matches_at(input, index, state),
            Node::Empty | Node::Sequence { .. } | Node::And(_, _) | Node::Or(_, _) => {
                debug_assert!(false, "matches_at on a multi-token node");
                false
            }
        }
    }

    /// Create a matcher for this pattern over `input`.
    ///
    /// The matcher owns all per-match state, so many matchers may share one
    /// compiled pattern, including across threads.
    pub fn matcher<'t, T: Token>(&self, input: &'t [T]) -> Matcher<'t, T> {
        Matcher::new(self.clone(), input)
    }

    // ─── Rendering ──────────────────────────────────────────────────────────

    /// The inner contents of this node, without capture-group or token
    /// bracket decoration (those are added by the `Display` impl).
    fn populate(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr.node {
            Node::Empty | Node::Wildcard => Ok(()),
            Node::Literal { key, value, .. } => {
                write!(
                    f,
                    "{key}:\"{}\"",
                    value.replace('\\', "\\\\").replace('"', "\\\"")
                )
            }
            Node::ValueRegex { key, source, .. } => write!(f, "{key}:/{source}/"),
            Node::Cmp { key, value, op } => write!(f, "{key}{op}{value}"),
            Node::Absent { key } => write!(f, "!{key}"),
            Node::Start => f.write_str("^"),
            Node::End => f.write_str("$"),
            Node::TokenAnd(lhs, rhs) => {
                lhs.populate(f)?;
                f.write_str(" & ")?;
                rhs.populate(f)
            }
            Node::TokenOr(lhs, rhs) => {
                lhs.populate(f)?;
                f.write_str(" | ")?;
                rhs.populate(f)
            }
            Node::Not(inner) => {
                f.write_str("!")?;
                inner.populate(f)
            }
            Node::Sequence {
                parts: Parts::List(parts),
                ..
            } => write!(f, "{}", parts.iter().format(" ")),
            Node::Sequence {
                parts: Parts::Repeat(part),
                min,
                max,
                reluctant,
            } => {
                write!(f, "{part}")?;
                match (*min, *max) {
                    (0, UNBOUNDED) => f.write_str("*")?,
                    (1, UNBOUNDED) => f.write_str("+")?,
                    (0, 1) => f.write_str("?")?,
                    (min, UNBOUNDED) => write!(f, "{{{min},}}")?,
                    (min, max) if min == max => write!(f, "{{{min}}}")?,
                    (min, max) => write!(f, "{{{min},{max}}}")?,
                }
                if *reluctant {
                    f.write_str("?")?;
                }
                Ok(())
            }
            Node::And(lhs, rhs) => write!(f, "{lhs} & {rhs}"),
            Node::Or(lhs, rhs) => write!(f, "{lhs} | {rhs}"),
        }
    }
}

impl fmt::Display for Pattern {
    /// A stable rendering that recompiles to a pattern with the same
    /// matching semantics. Source formatting is not preserved, and a capture
    /// group absorbed into a single-token conjunction or disjunction is not
    /// rendered (a cosmetic loss only; the slot still matches).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr.capture {
            Capture::None => {}
            Capture::Anonymous => f.write_str("(")?,
            Capture::Named(name) => write!(f, "(?<{name}> ")?,
        }
        if self.token_length() == Some(1) {
            f.write_str("[")?;
            self.populate(f)?;
            f.write_str("]")?;
        } else {
            self.populate(f)?;
        }
        if !matches!(self.repr.capture, Capture::None) {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({self})")
    }
}

fn lookup<'i, T: Token>(input: &'i [T], index: usize, key: &str) -> Option<&'i str> {
    input.get(index)?.get(key)
}

/// Case-insensitive string equality by single-code-point upper-case folding.
///
/// There is deliberately no lower-case fallback; scripts where equality
/// needs the extra step (Georgian) will not compare equal.
fn eq_fold(a: &str, b: &str) -> bool {
    let mut a = a.chars();
    let mut b = b.chars();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) => {
                if x != y && fold_upper(x) != fold_upper(y) {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Single-code-point upper-case mapping; identity where the full mapping
/// would expand to more than one code point.
fn fold_upper(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// Parse a signed 32-bit integer: an optional `-`, then digits. Overflow
/// short-circuits, `-0` parses to `0`, and `i32::MIN` is representable.
/// `None` means "not an integer", which comparison nodes treat as a local
/// non-match rather than an error.
pub(crate) fn parse_i32(s: &str) -> Option<i32> {
    let bytes = s.as_bytes();
    let (negative, digits) = match bytes.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, bytes),
    };
    if digits.is_empty() {
        return None;
    }
    let limit = i64::from(i32::MAX) + 1;
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + i64::from(b - b'0');
        if value > limit {
            return None;
        }
    }
    if negative {
        if value > limit { None } else { Some((-value) as i32) }
    } else if value > i64::from(i32::MAX) {
        None
    } else {
        Some(value as i32)
    }
}
