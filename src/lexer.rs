//! Lexer for the pattern grammar.
//!
//! Splits a pattern source string into [`Lexeme`]s, discarding whitespace
//! and both comment forms (`// …` to end of line, `/* … */`). Unterminated
//! string and regex literals are kept as distinguished lexemes so the parser
//! can report them precisely.

/// The kind of a single lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LexKind {
    OpenBrace,
    CloseBrace,
    OpenSquare,
    CloseSquare,
    OpenParen,
    CloseParen,
    Colon,
    And,
    Or,
    Not,
    Plus,
    Star,
    QMark,
    Comma,
    Dollar,
    Caret,
    Lt,
    Gt,
    Eq,
    Number,
    Unquoted,
    Quoted,
    Regex,
    UnterminatedQuoted,
    UnterminatedRegex,
    Variable,
}

/// One lexeme: its kind, its raw source text, and its byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Lexeme<'a> {
    pub kind: LexKind,
    pub text: &'a str,
    pub offset: usize,
}

/// Characters that terminate an unquoted literal and lex as their own
/// lexemes (or open a quoted/regex literal).
fn is_special(c: char) -> bool {
    matches!(
        c,
        '{' | '}'
            | '['
            | ']'
            | '('
            | ')'
            | ':'
            | '&'
            | '|'
            | '!'
            | '+'
            | '*'
            | '?'
            | ','
            | '$'
            | '^'
            | '<'
            | '>'
            | '='
            | '"'
            | '/'
    )
}

/// Byte length of a maximal run of non-special, non-whitespace characters.
fn run_len(s: &str) -> usize {
    s.char_indices()
        .find(|&(_, c)| is_special(c) || c.is_whitespace())
        .map_or(s.len(), |(i, _)| i)
}

/// Byte length of an unquoted literal at the head of `s`, or 0 if `s` does
/// not start with one.
///
/// An unquoted literal is a run starting with a non-special, non-digit,
/// non-dash character; or one or more dashes followed by a non-digit
/// non-special head (e.g. `-LRB-`); or a pure run of dashes.
fn unquoted_len(s: &str) -> usize {
    let Some(head) = s.chars().next() else {
        return 0;
    };
    if head == '-' {
        let dashes = s.chars().take_while(|&c| c == '-').count();
        match s[dashes..].chars().next() {
            Some(c) if !is_special(c) && !c.is_whitespace() && !c.is_ascii_digit() => {
                dashes + run_len(&s[dashes..])
            }
            _ => dashes,
        }
    } else if !is_special(head) && !head.is_whitespace() && !head.is_ascii_digit() {
        run_len(s)
    } else {
        0
    }
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

/// A quoted string literal; the opening quote is the current character.
/// `\"` and `\\` escapes are honoured.
fn scan_quoted(s: &mut Scanner) -> LexKind {
    s.bump();
    loop {
        match s.bump() {
            None => return LexKind::UnterminatedQuoted,
            Some('\\') => {
                if s.bump().is_none() {
                    return LexKind::UnterminatedQuoted;
                }
            }
            Some('"') => return LexKind::Quoted,
            Some(_) => {}
        }
    }
}

/// A regex literal; the opening slash is the current character. `\/` and
/// `\\` escapes are honoured. A body cannot be empty because `//` opens a
/// comment instead.
fn scan_regex(s: &mut Scanner) -> LexKind {
    s.bump();
    loop {
        match s.bump() {
            None => return LexKind::UnterminatedRegex,
            Some('\\') => {
                if s.bump().is_none() {
                    return LexKind::UnterminatedRegex;
                }
            }
            Some('/') => return LexKind::Regex,
            Some(_) => {}
        }
    }
}

/// A run of dashes and digits. `-*[0-9]+` is a number; a dash run with no
/// digit after it falls back to an unquoted literal.
fn scan_number_or_dashes(s: &mut Scanner) -> LexKind {
    let rest = s.rest();
    let dashes = rest.chars().take_while(|&c| c == '-').count();
    let digits = rest[dashes..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits > 0 {
        s.pos += dashes + digits;
        LexKind::Number
    } else {
        s.pos += unquoted_len(rest);
        LexKind::Unquoted
    }
}

/// Lex `source` into a vector of lexemes, skipping whitespace and comments.
pub(crate) fn lex(source: &str) -> Vec<Lexeme<'_>> {
    let mut scanner = Scanner { src: source, pos: 0 };
    let mut lexemes = Vec::new();
    while let Some(c) = scanner.peek() {
        if c.is_whitespace() {
            scanner.bump();
            continue;
        }
        if scanner.rest().starts_with("//") {
            while let Some(c) = scanner.peek() {
                if c == '\n' {
                    break;
                }
                scanner.bump();
            }
            continue;
        }
        if scanner.rest().starts_with("/*") {
            scanner.pos += 2;
            match scanner.rest().find("*/") {
                Some(at) => scanner.pos += at + 2,
                None => scanner.pos = source.len(),
            }
            continue;
        }
        let start = scanner.pos;
        let kind = match c {
            '{' => {
                scanner.bump();
                LexKind::OpenBrace
            }
            '}' => {
                scanner.bump();
                LexKind::CloseBrace
            }
            '[' => {
                scanner.bump();
                LexKind::OpenSquare
            }
            ']' => {
                scanner.bump();
                LexKind::CloseSquare
            }
            '(' => {
                scanner.bump();
                LexKind::OpenParen
            }
            ')' => {
                scanner.bump();
                LexKind::CloseParen
            }
            ':' => {
                scanner.bump();
                LexKind::Colon
            }
            '&' => {
                scanner.bump();
                LexKind::And
            }
            '|' => {
                scanner.bump();
                LexKind::Or
            }
            '!' => {
                scanner.bump();
                LexKind::Not
            }
            '+' => {
                scanner.bump();
                LexKind::Plus
            }
            '*' => {
                scanner.bump();
                LexKind::Star
            }
            '?' => {
                scanner.bump();
                LexKind::QMark
            }
            ',' => {
                scanner.bump();
                LexKind::Comma
            }
            '^' => {
                scanner.bump();
                LexKind::Caret
            }
            '<' => {
                scanner.bump();
                LexKind::Lt
            }
            '>' => {
                scanner.bump();
                LexKind::Gt
            }
            '=' => {
                scanner.bump();
                LexKind::Eq
            }
            '"' => scan_quoted(&mut scanner),
            '/' => scan_regex(&mut scanner),
            '$' => {
                scanner.bump();
                let suffix = unquoted_len(scanner.rest());
                if suffix > 0 {
                    scanner.pos += suffix;
                    LexKind::Variable
                } else {
                    LexKind::Dollar
                }
            }
            _ if c == '-' || c.is_ascii_digit() => scan_number_or_dashes(&mut scanner),
            _ => {
                scanner.pos += unquoted_len(scanner.rest());
                LexKind::Unquoted
            }
        };
        lexemes.push(Lexeme {
            kind,
            text: &source[start..scanner.pos],
            offset: start,
        });
    }
    lexemes
}

#[cfg(test)]
mod tests {
    use super::LexKind::*;
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        lex(input).iter().map(|l| l.text).collect()
    }

    fn check(input: &str, expected: &[(&str, LexKind)]) {
        let lexemes = lex(input);
        let got: Vec<(&str, LexKind)> = lexemes.iter().map(|l| (l.text, l.kind)).collect();
        let want: Vec<(&str, LexKind)> = expected.to_vec();
        assert_eq!(got, want, "lexing {input:?}");
    }

    #[test]
    fn quoted_string_literal() {
        check("\"hello", &[("\"hello", UnterminatedQuoted)]);
        check("\"hello\"", &[("\"hello\"", Quoted)]);
        check("\"hello world\"", &[("\"hello world\"", Quoted)]);
        check(
            "\"hello\" \"world\"",
            &[("\"hello\"", Quoted), ("\"world\"", Quoted)],
        );
    }

    #[test]
    fn quoted_string_literal_with_escapes() {
        check("\"hel\\\"lo\"", &[("\"hel\\\"lo\"", Quoted)]);
        check("\"word1\\\" \\\"word2\"", &[("\"word1\\\" \\\"word2\"", Quoted)]);
        check("\"hel\\\\lo\"", &[("\"hel\\\\lo\"", Quoted)]);
    }

    #[test]
    fn quoted_string_literal_special_characters() {
        check("\"foo+*-?{}&|,!\"", &[("\"foo+*-?{}&|,!\"", Quoted)]);
    }

    #[test]
    fn regex_literal() {
        check("/hello", &[("/hello", UnterminatedRegex)]);
        check("/hello/", &[("/hello/", Regex)]);
        check("/\\hi/", &[("/\\hi/", Regex)]);
        check("/\\+/", &[("/\\+/", Regex)]);
        check("/hello/ /world/", &[("/hello/", Regex), ("/world/", Regex)]);
    }

    #[test]
    fn regex_with_escapes() {
        check("/hel\\/lo/", &[("/hel\\/lo/", Regex)]);
        check("/hel\\\\lo/", &[("/hel\\\\lo/", Regex)]);
        check("/hello\\/ \\/world/", &[("/hello\\/ \\/world/", Regex)]);
    }

    #[test]
    fn regex_special_characters() {
        check("/foo+*-?{}&|,!/", &[("/foo+*-?{}&|,!/", Regex)]);
    }

    #[test]
    fn regex_with_unicode() {
        check("/你好/", &[("/你好/", Regex)]);
        check("/你./", &[("/你./", Regex)]);
    }

    #[test]
    fn unquoted_string_literal() {
        check("hello", &[("hello", Unquoted)]);
        check("hello world", &[("hello", Unquoted), ("world", Unquoted)]);
        check(".", &[(".", Unquoted)]);
        check("foo42", &[("foo42", Unquoted)]);
        check("hello-world", &[("hello-world", Unquoted)]);
        check("~@", &[("~@", Unquoted)]);
        check("-42", &[("-42", Number)]);
        check("-LRB-", &[("-LRB-", Unquoted)]);
        check("a-3", &[("a-3", Unquoted)]);
        check("-", &[("-", Unquoted)]);
        check("--", &[("--", Unquoted)]);
        check("--foo--", &[("--foo--", Unquoted)]);
        check(",", &[(",", Comma)]);
        check(",,", &[(",", Comma), (",", Comma)]);
    }

    #[test]
    fn numbers() {
        check("42", &[("42", Number)]);
        check("0", &[("0", Number)]);
        check("-3", &[("-3", Number)]);
        check("--3", &[("--3", Number)]);
    }

    #[test]
    fn numeric_operators() {
        check("<", &[("<", Lt)]);
        check("<=", &[("<", Lt), ("=", Eq)]);
        check(">", &[(">", Gt)]);
        check(">=", &[(">", Gt), ("=", Eq)]);
        check("=", &[("=", Eq)]);
        check("==", &[("=", Eq), ("=", Eq)]);
        check(">==", &[(">", Gt), ("=", Eq), ("=", Eq)]);
        check("!=", &[("!", Not), ("=", Eq)]);
    }

    #[test]
    fn repeat_markers() {
        check("foo+", &[("foo", Unquoted), ("+", Plus)]);
        check("foo+?", &[("foo", Unquoted), ("+", Plus), ("?", QMark)]);
        check("foo*", &[("foo", Unquoted), ("*", Star)]);
        check("foo*?", &[("foo", Unquoted), ("*", Star), ("?", QMark)]);
        check("foo?", &[("foo", Unquoted), ("?", QMark)]);
        check("foo??", &[("foo", Unquoted), ("?", QMark), ("?", QMark)]);
        check("foo**", &[("foo", Unquoted), ("*", Star), ("*", Star)]);
        check("\"foo*\"*", &[("\"foo*\"", Quoted), ("*", Star)]);
        check(
            "{0,10}",
            &[
                ("{", OpenBrace),
                ("0", Number),
                (",", Comma),
                ("10", Number),
                ("}", CloseBrace),
            ],
        );
    }

    #[test]
    fn variables() {
        check("$foo", &[("$foo", Variable)]);
        check("$foo_bar", &[("$foo_bar", Variable)]);
        check("$foo-bar", &[("$foo-bar", Variable)]);
        check("$foo42", &[("$foo42", Variable)]);
        check("$42", &[("$", Dollar), ("42", Number)]);
        check("$-42", &[("$-", Variable), ("42", Number)]);
    }

    #[test]
    fn sequence_boundaries() {
        check("^", &[("^", Caret)]);
        check("$", &[("$", Dollar)]);
        check("^$", &[("^", Caret), ("$", Dollar)]);
        check("$ foo", &[("$", Dollar), ("foo", Unquoted)]);
        check("^ foo", &[("^", Caret), ("foo", Unquoted)]);
        check(
            "^ foo $",
            &[("^", Caret), ("foo", Unquoted), ("$", Dollar)],
        );
        check("^foo$", &[("^", Caret), ("foo", Unquoted), ("$", Dollar)]);
        check("$|x", &[("$", Dollar), ("|", Or), ("x", Unquoted)]);
    }

    #[test]
    fn comments() {
        assert_eq!(texts("foo // comment"), vec!["foo"]);
        assert_eq!(texts("foo //"), vec!["foo"]);
        assert_eq!(texts("foo // "), vec!["foo"]);
        assert_eq!(texts("foo /* comment */"), vec!["foo"]);
        assert_eq!(texts("foo /* */"), vec!["foo"]);
        assert_eq!(texts("foo /**/"), vec!["foo"]);
        assert_eq!(texts("foo /* comment */ bar"), vec!["foo", "bar"]);
        // A regex followed by a line comment.
        check("a /b*///", &[("a", Unquoted), ("/b*/", Regex)]);
    }

    #[test]
    fn mixed_examples() {
        check(
            "[!{foo:8}]{0,5}",
            &[
                ("[", OpenSquare),
                ("!", Not),
                ("{", OpenBrace),
                ("foo", Unquoted),
                (":", Colon),
                ("8", Number),
                ("}", CloseBrace),
                ("]", CloseSquare),
                ("{", OpenBrace),
                ("0", Number),
                (",", Comma),
                ("5", Number),
                ("}", CloseBrace),
            ],
        );
        check(
            "foo8[]",
            &[("foo8", Unquoted), ("[", OpenSquare), ("]", CloseSquare)],
        );
        check(
            "(?<hello>foo)",
            &[
                ("(", OpenParen),
                ("?", QMark),
                ("<", Lt),
                ("hello", Unquoted),
                (">", Gt),
                ("foo", Unquoted),
                (")", CloseParen),
            ],
        );
        check(
            "(?$hello foo)",
            &[
                ("(", OpenParen),
                ("?", QMark),
                ("$hello", Variable),
                ("foo", Unquoted),
                (")", CloseParen),
            ],
        );
    }

    #[test]
    fn offsets_are_byte_positions() {
        let lexemes = lex("a  [b]");
        assert_eq!(lexemes[0].offset, 0);
        assert_eq!(lexemes[1].offset, 3);
        assert_eq!(lexemes[2].offset, 4);
        assert_eq!(lexemes[3].offset, 5);
    }
}
