//! Recursive descent parser for the pattern grammar.

use crate::ast::*;
use crate::error::PatternError;
use crate::lexer::{self, LexKind, Lexeme};
use crate::pattern::CmpOp;

/// Parse a pattern source string into its syntax tree.
///
/// The whole input must be consumed; trailing lexemes are an error.
pub(crate) fn parse(source: &str) -> Result<Expr, PatternError> {
    let lexemes = lexer::lex(source);
    for lexeme in &lexemes {
        match lexeme.kind {
            LexKind::UnterminatedQuoted => {
                return Err(PatternError::new(
                    "unterminated string literal",
                    source,
                    lexeme.offset,
                ));
            }
            LexKind::UnterminatedRegex => {
                return Err(PatternError::new(
                    "unterminated regex literal",
                    source,
                    lexeme.offset,
                ));
            }
            _ => {}
        }
    }
    let mut parser = Parser {
        source,
        lexemes,
        pos: 0,
    };
    let expr = parser.parse_pattern()?;
    if parser.pos < parser.lexemes.len() {
        return Err(parser.err("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser<'a> {
    source: &'a str,
    lexemes: Vec<Lexeme<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek_kind(&self) -> Option<LexKind> {
        self.kind_at(0)
    }

    fn kind_at(&self, ahead: usize) -> Option<LexKind> {
        self.lexemes.get(self.pos + ahead).map(|l| l.kind)
    }

    fn offset(&self) -> usize {
        self.lexemes
            .get(self.pos)
            .map_or(self.source.len(), |l| l.offset)
    }

    fn bump(&mut self) -> Option<Lexeme<'a>> {
        let lexeme = self.lexemes.get(self.pos).copied();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn eat(&mut self, kind: LexKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: LexKind, what: &str) -> Result<Lexeme<'a>, PatternError> {
        match self.peek_kind() {
            Some(k) if k == kind => Ok(self.bump().unwrap_or(Lexeme {
                kind,
                text: "",
                offset: self.source.len(),
            })),
            _ => Err(self.err(format!("expected {what}"))),
        }
    }

    fn err(&self, message: impl Into<String>) -> PatternError {
        PatternError::new(message, self.source, self.offset())
    }

    // ─── Pattern level ──────────────────────────────────────────────────────

    fn parse_pattern(&mut self) -> Result<Expr, PatternError> {
        let atoms = self.parse_atom_list()?;
        match self.peek_kind() {
            Some(LexKind::And) => {
                self.pos += 1;
                Ok(Expr::And(atoms, Box::new(self.parse_pattern()?)))
            }
            Some(LexKind::Or) => {
                self.pos += 1;
                Ok(Expr::Or(atoms, Box::new(self.parse_pattern()?)))
            }
            _ => Ok(Expr::Seq(atoms)),
        }
    }

    fn parse_atom_list(&mut self) -> Result<Vec<Atom>, PatternError> {
        let mut atoms = vec![self.parse_atom()?];
        while self.at_atom_start() {
            atoms.push(self.parse_atom()?);
        }
        Ok(atoms)
    }

    fn at_atom_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(
                LexKind::OpenParen
                    | LexKind::OpenSquare
                    | LexKind::Caret
                    | LexKind::Dollar
                    | LexKind::Variable
                    | LexKind::Unquoted
                    | LexKind::Quoted
                    | LexKind::Regex
                    | LexKind::Number
                    | LexKind::Comma
                    | LexKind::Colon
                    | LexKind::Lt
                    | LexKind::Gt
                    | LexKind::Eq
                    | LexKind::Not
            )
        )
    }

    fn parse_atom(&mut self) -> Result<Atom, PatternError> {
        let offset = self.offset();
        let mut atom = match self.peek_kind() {
            Some(LexKind::OpenParen) => self.parse_parenthetical()?,
            Some(LexKind::OpenSquare) => Atom {
                kind: AtomKind::Token(self.parse_bracket_token()?),
                offset,
            },
            Some(LexKind::Caret) => {
                self.pos += 1;
                Atom {
                    kind: AtomKind::Token(TokenExpr::Start),
                    offset,
                }
            }
            Some(LexKind::Dollar) => {
                self.pos += 1;
                Atom {
                    kind: AtomKind::Token(TokenExpr::End),
                    offset,
                }
            }
            Some(LexKind::Variable) => {
                let lexeme = self.bump().map_or("", |l| l.text);
                Atom {
                    kind: AtomKind::Variable(lexeme.get(1..).unwrap_or("").to_string()),
                    offset,
                }
            }
            Some(
                LexKind::Unquoted
                | LexKind::Quoted
                | LexKind::Regex
                | LexKind::Number
                | LexKind::Comma,
            ) => Atom {
                kind: AtomKind::Token(TokenExpr::Value(self.parse_value()?)),
                offset,
            },
            Some(LexKind::Colon | LexKind::Lt | LexKind::Gt | LexKind::Eq | LexKind::Not) => {
                let mut text = String::new();
                while matches!(
                    self.peek_kind(),
                    Some(
                        LexKind::Colon
                            | LexKind::Lt
                            | LexKind::Gt
                            | LexKind::Eq
                            | LexKind::Not
                    )
                ) {
                    if let Some(lexeme) = self.bump() {
                        text.push_str(lexeme.text);
                    }
                }
                Atom {
                    kind: AtomKind::Token(TokenExpr::Keyword(text)),
                    offset,
                }
            }
            _ => return Err(self.err("expected an atom")),
        };
        loop {
            match self.peek_kind() {
                Some(LexKind::Star) => {
                    self.pos += 1;
                    let reluctant = self.eat(LexKind::QMark);
                    atom = Atom {
                        kind: AtomKind::Repeat {
                            inner: Box::new(atom),
                            bounds: RepeatBounds::Star,
                            reluctant,
                        },
                        offset,
                    };
                }
                Some(LexKind::Plus) => {
                    self.pos += 1;
                    let reluctant = self.eat(LexKind::QMark);
                    atom = Atom {
                        kind: AtomKind::Repeat {
                            inner: Box::new(atom),
                            bounds: RepeatBounds::Plus,
                            reluctant,
                        },
                        offset,
                    };
                }
                Some(LexKind::QMark) => {
                    self.pos += 1;
                    let reluctant = self.eat(LexKind::QMark);
                    atom = Atom {
                        kind: AtomKind::Repeat {
                            inner: Box::new(atom),
                            bounds: RepeatBounds::Opt,
                            reluctant,
                        },
                        offset,
                    };
                }
                Some(LexKind::OpenBrace) => {
                    let (bounds, reluctant) = self.parse_repeat_bounds()?;
                    atom = Atom {
                        kind: AtomKind::Repeat {
                            inner: Box::new(atom),
                            bounds,
                            reluctant,
                        },
                        offset,
                    };
                }
                _ => break,
            }
        }
        Ok(atom)
    }

    /// `{n}`, `{n,}`, or `{n,m}` after an atom, with an optional trailing
    /// `?`. The `?` marks a reluctant repeat except on the exact form, where
    /// it is accepted and discarded (`a{n}?` is the same as `a{n}`).
    fn parse_repeat_bounds(&mut self) -> Result<(RepeatBounds, bool), PatternError> {
        self.expect(LexKind::OpenBrace, "'{'")?;
        let lo = self.parse_number("a repeat bound")?;
        match self.peek_kind() {
            Some(LexKind::CloseBrace) => {
                self.pos += 1;
                self.eat(LexKind::QMark);
                Ok((RepeatBounds::Exact(lo), false))
            }
            Some(LexKind::Comma) => {
                self.pos += 1;
                match self.peek_kind() {
                    Some(LexKind::CloseBrace) => {
                        self.pos += 1;
                        let reluctant = self.eat(LexKind::QMark);
                        Ok((RepeatBounds::AtLeast(lo), reluctant))
                    }
                    Some(LexKind::Number) => {
                        let hi = self.parse_number("a repeat bound")?;
                        self.expect(LexKind::CloseBrace, "'}' after repeat bounds")?;
                        let reluctant = self.eat(LexKind::QMark);
                        Ok((RepeatBounds::Range(lo, hi), reluctant))
                    }
                    _ => Err(self.err("expected a repeat upper bound or '}'")),
                }
            }
            _ => Err(self.err("expected ',' or '}' in repeat bounds")),
        }
    }

    fn parse_number(&mut self, what: &str) -> Result<Num, PatternError> {
        let lexeme = self.expect(LexKind::Number, what)?;
        Ok(Num {
            text: lexeme.text.to_string(),
            offset: lexeme.offset,
        })
    }

    /// `( pattern )`, `(?<name> pattern)`, or the legacy `(?$name pattern)`.
    fn parse_parenthetical(&mut self) -> Result<Atom, PatternError> {
        let offset = self.offset();
        self.expect(LexKind::OpenParen, "'('")?;
        let name = if self.eat(LexKind::QMark) {
            match self.peek_kind() {
                Some(LexKind::Lt) => {
                    self.pos += 1;
                    let name = self.expect(LexKind::Unquoted, "a capture group name")?;
                    self.expect(LexKind::Gt, "'>' after the capture group name")?;
                    Some(name.text.to_string())
                }
                Some(LexKind::Variable) => {
                    let lexeme = self.bump().map_or("", |l| l.text);
                    Some(lexeme.get(1..).unwrap_or("").to_string())
                }
                _ => return Err(self.err("expected '<name>' or '$name' after '(?'")),
            }
        } else {
            None
        };
        let body = self.parse_pattern()?;
        self.expect(LexKind::CloseParen, "')'")?;
        Ok(Atom {
            kind: AtomKind::Group {
                name,
                body: Box::new(body),
            },
            offset,
        })
    }

    // ─── Token level ────────────────────────────────────────────────────────

    /// `[]` or `[ token_body ]`; the opening square is the current lexeme.
    fn parse_bracket_token(&mut self) -> Result<TokenExpr, PatternError> {
        self.expect(LexKind::OpenSquare, "'['")?;
        if self.eat(LexKind::CloseSquare) {
            return Ok(TokenExpr::Wildcard);
        }
        let body = self.parse_token_body()?;
        self.expect(LexKind::CloseSquare, "']' to close the token")?;
        Ok(TokenExpr::Body(body))
    }

    fn parse_token_body(&mut self) -> Result<BodyExpr, PatternError> {
        let mut body = BodyExpr::Atom(self.parse_body_atom()?);
        loop {
            match self.peek_kind() {
                Some(LexKind::And) => {
                    self.pos += 1;
                    body = BodyExpr::And(Box::new(body), self.parse_body_atom()?);
                }
                Some(LexKind::Or) => {
                    self.pos += 1;
                    body = BodyExpr::Or(Box::new(body), self.parse_body_atom()?);
                }
                _ => break,
            }
        }
        Ok(body)
    }

    fn parse_body_atom(&mut self) -> Result<BodyAtom, PatternError> {
        match self.peek_kind() {
            Some(LexKind::Not) => {
                // `!key` is a null check; `!key:value` and `!key>=n` negate
                // the pair. One lexeme of lookahead past the key decides.
                if self.kind_at(1) == Some(LexKind::Unquoted) && !self.key_follows_with_op(2) {
                    self.pos += 1;
                    let key = self.expect(LexKind::Unquoted, "a key after '!'")?;
                    return Ok(BodyAtom::KeyValue(KeyValue::Absent {
                        key: key.text.to_string(),
                    }));
                }
                self.pos += 1;
                Ok(BodyAtom::Not(Box::new(self.parse_body_atom()?)))
            }
            Some(LexKind::OpenParen) => {
                self.pos += 1;
                let body = self.parse_token_body()?;
                self.expect(LexKind::CloseParen, "')' inside the token body")?;
                Ok(BodyAtom::Paren(Box::new(body)))
            }
            Some(LexKind::OpenBrace) => {
                self.pos += 1;
                let pair = if self.peek_kind() == Some(LexKind::Not) {
                    self.pos += 1;
                    let key = self.expect(LexKind::Unquoted, "a key after '!'")?;
                    KeyValue::Absent {
                        key: key.text.to_string(),
                    }
                } else {
                    self.parse_braceless_pair()?
                };
                self.expect(LexKind::CloseBrace, "'}' to close the key/value pair")?;
                Ok(BodyAtom::KeyValue(pair))
            }
            Some(LexKind::Unquoted) => Ok(BodyAtom::KeyValue(self.parse_braceless_pair()?)),
            _ => Err(self.err("expected a key/value pair")),
        }
    }

    /// True when the lexeme at `ahead` starts a `:` or comparison operator.
    fn key_follows_with_op(&self, ahead: usize) -> bool {
        match self.kind_at(ahead) {
            Some(LexKind::Colon | LexKind::Lt | LexKind::Gt | LexKind::Eq) => true,
            Some(LexKind::Not) => self.kind_at(ahead + 1) == Some(LexKind::Eq),
            _ => false,
        }
    }

    fn parse_braceless_pair(&mut self) -> Result<KeyValue, PatternError> {
        let key = self.expect(LexKind::Unquoted, "a key")?;
        match self.peek_kind() {
            Some(LexKind::Colon) => {
                self.pos += 1;
                Ok(KeyValue::Pair {
                    key: key.text.to_string(),
                    value: self.parse_value()?,
                })
            }
            Some(LexKind::Lt | LexKind::Gt | LexKind::Eq | LexKind::Not) => {
                let op = self.parse_numeric_op()?;
                let number = self.parse_number("a number to compare against")?;
                Ok(KeyValue::Cmp {
                    key: key.text.to_string(),
                    op,
                    number,
                })
            }
            _ => Err(self.err("expected ':' or a comparison operator after the key")),
        }
    }

    fn parse_numeric_op(&mut self) -> Result<CmpOp, PatternError> {
        match self.peek_kind() {
            Some(LexKind::Lt) => {
                self.pos += 1;
                Ok(if self.eat(LexKind::Eq) { CmpOp::Lte } else { CmpOp::Lt })
            }
            Some(LexKind::Gt) => {
                self.pos += 1;
                Ok(if self.eat(LexKind::Eq) { CmpOp::Gte } else { CmpOp::Gt })
            }
            Some(LexKind::Eq) => {
                self.pos += 1;
                self.eat(LexKind::Eq);
                Ok(CmpOp::Eq)
            }
            Some(LexKind::Not) => {
                self.pos += 1;
                self.expect(LexKind::Eq, "'=' after '!'")?;
                Ok(CmpOp::Neq)
            }
            _ => Err(self.err("expected a comparison operator")),
        }
    }

    fn parse_value(&mut self) -> Result<ValueExpr, PatternError> {
        let offset = self.offset();
        match self.bump() {
            Some(lexeme) => match lexeme.kind {
                LexKind::Unquoted => Ok(ValueExpr::Unquoted(lexeme.text.to_string())),
                LexKind::Quoted => Ok(ValueExpr::Quoted(unescape(
                    &lexeme.text[1..lexeme.text.len() - 1],
                ))),
                LexKind::Regex => Ok(ValueExpr::Regex {
                    source: lexeme.text[1..lexeme.text.len() - 1].to_string(),
                    offset,
                }),
                LexKind::Number => Ok(ValueExpr::Number(lexeme.text.to_string())),
                LexKind::Comma => Ok(ValueExpr::Comma),
                _ => Err(PatternError::new("expected a value", self.source, offset)),
            },
            None => Err(PatternError::new("expected a value", self.source, offset)),
        }
    }
}

/// Resolve `\"` and `\\` escapes; any other backslash sequence is kept
/// verbatim.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped @ ('"' | '\\')) => out.push(escaped),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> Expr {
        match parse(input) {
            Ok(expr) => expr,
            Err(err) => panic!("should parse {input:?}: {err}"),
        }
    }

    fn parse_err(input: &str) -> PatternError {
        match parse(input) {
            Ok(expr) => panic!("should not parse {input:?}, got {expr:?}"),
            Err(err) => err,
        }
    }

    fn single_atom(expr: Expr) -> Atom {
        match expr {
            Expr::Seq(mut atoms) if atoms.len() == 1 => atoms.remove(0),
            other => panic!("expected a single atom, got {other:?}"),
        }
    }

    // ─── Values and tokens ──────────────────────────────────────────────────

    #[test]
    fn bare_values() {
        for input in ["hello", "~#%-", "\"hello world\"", "/hello world/", "42", "foo42", ",", "/\\+/"] {
            let atom = single_atom(parse_ok(input));
            assert!(
                matches!(atom.kind, AtomKind::Token(TokenExpr::Value(_))),
                "{input:?} should be a value token"
            );
        }
    }

    #[test]
    fn quoted_value_unescapes() {
        let atom = single_atom(parse_ok(r#""hel\"lo \\ end""#));
        match atom.kind {
            AtomKind::Token(TokenExpr::Value(ValueExpr::Quoted(text))) => {
                assert_eq!(text, "hel\"lo \\ end");
            }
            other => panic!("expected a quoted value, got {other:?}"),
        }
    }

    #[test]
    fn regex_value_keeps_escapes() {
        let atom = single_atom(parse_ok(r"/hel\/lo/"));
        match atom.kind {
            AtomKind::Token(TokenExpr::Value(ValueExpr::Regex { source, .. })) => {
                assert_eq!(source, r"hel\/lo");
            }
            other => panic!("expected a regex value, got {other:?}"),
        }
    }

    #[test]
    fn keyword_tokens() {
        for (input, keyword) in [(":", ":"), ("::", "::"), ("<", "<"), ("<=", "<="), ("=", "="), ("==", "=="), ("=:", "=:"), ("!", "!")] {
            let atom = single_atom(parse_ok(input));
            match atom.kind {
                AtomKind::Token(TokenExpr::Keyword(text)) => assert_eq!(text, keyword),
                other => panic!("{input:?} should be a keyword token, got {other:?}"),
            }
        }
    }

    #[test]
    fn boundary_and_wildcard_tokens() {
        assert!(matches!(
            single_atom(parse_ok("^")).kind,
            AtomKind::Token(TokenExpr::Start)
        ));
        assert!(matches!(
            single_atom(parse_ok("$")).kind,
            AtomKind::Token(TokenExpr::End)
        ));
        assert!(matches!(
            single_atom(parse_ok("[]")).kind,
            AtomKind::Token(TokenExpr::Wildcard)
        ));
    }

    #[test]
    fn invalid_tokens() {
        parse_err("{");
        parse_err("}");
        parse_err("[");
        parse_err("{foo:bar}");
        parse_err("[]]");
        parse_err("\"foo");
        parse_err("[foo]");
        parse_err("[/foo/]");
        parse_err("[\"foo\"]");
        parse_err("[{word::]");
        parse_err("[{word:{]");
        parse_err("[{word:}]");
    }

    // ─── Token bodies ───────────────────────────────────────────────────────

    #[test]
    fn token_bodies() {
        for input in [
            "[{foo: bar}]",
            "[({foo: bar})]",
            "[(!{foo: bar})]",
            "[{foo: bar} & {bar: baz}]",
            "[{foo: bar} | {bar: baz}]",
            "[{foo: bar} & {bar: baz} | {a: b}]",
            "[({foo: bar} & {bar: baz}) | {a: b}]",
            "[{foo: bar} & ({bar: baz} | {a: b})]",
            "[{a:b} & ({b:c} | ({d:e})) | {e:f}]",
            "[({a:b} & !({b:c} | ({d:e}))) | {e:f}]",
            "[foo: bar | foo: baz]",
            "[foo: bar | foo: /baz/]",
            "[foo: bar | foo: \"baz\"]",
            "[foo: bar]",
            "[foo: bar & key: \"value\"]",
            "[{!foo}]",
            "[!foo]",
            "[key >= 7]",
            "[key=2]",
            "[key<=2]",
            "[!foo & (key >= 8 | a: b)]",
            "[!word:foo]",
            "[{a:b} | {c:d}]",
        ] {
            parse_ok(input);
        }
    }

    #[test]
    fn invalid_token_bodies() {
        parse_err("[({a:b}]");
        parse_err("[({a:b}))]");
        parse_err("[!{foo}]");
        parse_err("[{foo: bar} | baz]");
        parse_err("[{foo: bar} | /baz/]");
        parse_err("[{foo: bar} | \"baz\"]");
    }

    #[test]
    fn null_check_vs_negated_pair() {
        let atom = single_atom(parse_ok("[!foo]"));
        match atom.kind {
            AtomKind::Token(TokenExpr::Body(BodyExpr::Atom(BodyAtom::KeyValue(
                KeyValue::Absent { key },
            )))) => assert_eq!(key, "foo"),
            other => panic!("expected a null check, got {other:?}"),
        }
        let atom = single_atom(parse_ok("[!word:foo]"));
        assert!(matches!(
            atom.kind,
            AtomKind::Token(TokenExpr::Body(BodyExpr::Atom(BodyAtom::Not(_))))
        ));
        let atom = single_atom(parse_ok("[!key != 5]"));
        assert!(matches!(
            atom.kind,
            AtomKind::Token(TokenExpr::Body(BodyExpr::Atom(BodyAtom::Not(_))))
        ));
    }

    #[test]
    fn comparison_operators() {
        for (input, op) in [
            ("[key<7]", CmpOp::Lt),
            ("[key<=7]", CmpOp::Lte),
            ("[key>7]", CmpOp::Gt),
            ("[key>=7]", CmpOp::Gte),
            ("[key=7]", CmpOp::Eq),
            ("[key==7]", CmpOp::Eq),
            ("[key!=7]", CmpOp::Neq),
        ] {
            let atom = single_atom(parse_ok(input));
            match atom.kind {
                AtomKind::Token(TokenExpr::Body(BodyExpr::Atom(BodyAtom::KeyValue(
                    KeyValue::Cmp { op: got, .. },
                )))) => assert_eq!(got, op, "operator for {input:?}"),
                other => panic!("expected a comparison, got {other:?}"),
            }
        }
    }

    // ─── Quantifiers ────────────────────────────────────────────────────────

    fn repeat_of(input: &str) -> (RepeatBounds, bool) {
        match single_atom(parse_ok(input)).kind {
            AtomKind::Repeat {
                bounds, reluctant, ..
            } => (bounds, reluctant),
            other => panic!("{input:?} should be a repeat, got {other:?}"),
        }
    }

    #[test]
    fn star_plus_qmark() {
        assert_eq!(repeat_of("foo*"), (RepeatBounds::Star, false));
        assert_eq!(repeat_of("foo*?"), (RepeatBounds::Star, true));
        assert_eq!(repeat_of("foo+"), (RepeatBounds::Plus, false));
        assert_eq!(repeat_of("foo+?"), (RepeatBounds::Plus, true));
        assert_eq!(repeat_of("foo?"), (RepeatBounds::Opt, false));
        assert_eq!(repeat_of("foo??"), (RepeatBounds::Opt, true));
        parse_ok("[]+");
        parse_ok("\"foo\"+");
        parse_ok("/foo/*");
        parse_ok("[{a:b} & ({b:c} | {d:e})]+");
        parse_ok("foo**");
    }

    #[test]
    fn braced_repeats() {
        match repeat_of("[]{0,10}") {
            (RepeatBounds::Range(lo, hi), false) => {
                assert_eq!(lo.text, "0");
                assert_eq!(hi.text, "10");
            }
            other => panic!("unexpected parse: {other:?}"),
        }
        assert!(matches!(repeat_of("[]{0,10}?"), (RepeatBounds::Range(_, _), true)));
        assert!(matches!(repeat_of("[]{10}"), (RepeatBounds::Exact(_), false)));
        // `{n}?` still parses, and the `?` is discarded.
        assert!(matches!(repeat_of("[]{10}?"), (RepeatBounds::Exact(_), false)));
        assert!(matches!(repeat_of("[]{10,}"), (RepeatBounds::AtLeast(_), false)));
        assert!(matches!(repeat_of("[]{10,}?"), (RepeatBounds::AtLeast(_), true)));
        parse_ok("foo{0,10}");
        parse_ok("\"foo\"{0,10}?");
        parse_ok("/foo/{0,10}");
        parse_ok("[{a:b}]{10}");
        // Negative or inverted bounds are a compiler problem, not a parse error.
        parse_ok("[]{-2,5}");
        parse_ok("[]{5,2}");
        parse_ok("[]{-2,-5}");
    }

    #[test]
    fn invalid_quantifiers() {
        parse_err("*");
        parse_err("**");
        parse_err("+");
        parse_err("++");
        parse_err("?");
        parse_err("??");
        parse_err("{}");
        parse_err("{,}");
        parse_err("{0,10}");
        parse_err("foo{bar}");
    }

    // ─── Parentheticals ─────────────────────────────────────────────────────

    #[test]
    fn parentheticals() {
        for input in [
            "([])",
            "([{a: b}] [{c:d}])",
            "(a b c)",
            "(a /b/ \"c\")",
            "(a (b c) d)",
            "(a{0,9} (b c)* d+)",
        ] {
            let atom = single_atom(parse_ok(input));
            assert!(matches!(atom.kind, AtomKind::Group { name: None, .. }), "{input:?}");
        }
        for input in ["(?<group> hello)", "(?<group_name> hello)"] {
            let atom = single_atom(parse_ok(input));
            assert!(matches!(atom.kind, AtomKind::Group { name: Some(_), .. }), "{input:?}");
        }
        match single_atom(parse_ok("(?$group hello)")).kind {
            AtomKind::Group { name: Some(name), .. } => assert_eq!(name, "group"),
            other => panic!("expected a legacy named group, got {other:?}"),
        }
        parse_err("(?<group name> hello)");
        parse_err("(foo");
    }

    // ─── Atom lists, conjunction, disjunction ───────────────────────────────

    #[test]
    fn atom_lists() {
        parse_ok("[]");
        parse_ok("[] []");
        parse_ok("foo bar");
        parse_ok("foo \"bar\" /baz/");
        parse_ok("[{word:foo}] \"bar\" /baz/");
        parse_ok("([({word:foo} | {lemma:food})] \"bar\")+ /baz/{0,3}");
        parse_ok("[] $FOO bar");
    }

    #[test]
    fn conjunction_and_disjunction() {
        for input in [
            "[] & []",
            "foo & bar",
            "(foo & bar) & baz",
            "foo & (bar & baz)",
            "foo bar & a b",
            "foo bar & a b & x y z",
            "(foo bar & a) x & q r s",
            "[] | []",
            "foo | bar",
            "(foo | bar) | baz",
            "foo | (bar | baz)",
            "foo bar | a b",
            "foo bar | a b | x y z",
            "(foo bar | a) x | q r s",
        ] {
            parse_ok(input);
        }
        parse_err("foo &");
        parse_err("foo & bar &");
        parse_err("foo |");
        parse_err("foo | bar |");
    }

    #[test]
    fn conjunction_is_right_associative() {
        match parse_ok("a & b & c") {
            Expr::And(lhs, rest) => {
                assert_eq!(lhs.len(), 1);
                assert!(matches!(*rest, Expr::And(_, _)));
            }
            other => panic!("expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn error_offsets_point_at_the_problem() {
        let err = parse_err("foo | bar |");
        assert_eq!(err.offset(), "foo | bar |".len());
        let err = parse_err("\"unterminated");
        assert_eq!(err.offset(), 0);
        assert!(err.message().contains("unterminated string"));
        let err = parse_err("a /unterminated");
        assert_eq!(err.offset(), 2);
        assert!(err.message().contains("unterminated regex"));
    }
}
