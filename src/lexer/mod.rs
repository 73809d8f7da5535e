//! Line-oriented lexer (§4.1): turns source text into a sequence of
//! non-empty lines, each a `Vec<Token>`.

use crate::isa::MNEMONICS;
use crate::token::{DirectiveKind, NumLit, Token, TokenKind, DIRECTIVES};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("lexer error at line {line}, column {column}:\n{line_text}\n{caret}\n{message}")]
pub struct LexerError {
    pub line: usize,
    pub column: usize,
    pub line_text: String,
    pub caret: String,
    pub message: String,
}

impl LexerError {
    fn at(line: usize, column: usize, line_text: &str, message: impl Into<String>) -> Self {
        let caret = format!("{}^", " ".repeat(column.saturating_sub(1)));
        Self {
            line,
            column,
            line_text: line_text.to_string(),
            caret,
            message: message.into(),
        }
    }
}

/// Tokenize `source` into non-empty lines of tokens.
pub fn lex(source: &str) -> Result<Vec<Vec<Token>>, LexerError> {
    let mut lines = Vec::new();
    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let tokens = lex_line(raw_line, line_no)?;
        if !tokens.is_empty() {
            lines.push(tokens);
        }
    }
    Ok(lines)
}

fn lex_line(line: &str, line_no: usize) -> Result<Vec<Token>, LexerError> {
    let bytes = line.as_bytes();
    let mut pos = 0usize;
    let mut tokens = Vec::new();

    while pos < bytes.len() {
        while pos < bytes.len() && (bytes[pos] as char).is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        let rest = &line[pos..];
        match try_match(rest) {
            Some((kind, len)) => {
                log::trace!("line {line_no}: matched {kind:?} ({len} bytes)");
                tokens.push(Token::new(kind, line_no));
                pos += len;
            }
            None => {
                return Err(LexerError::at(
                    line_no,
                    pos + 1,
                    line,
                    format!("no token pattern matches starting at {:?}", rest),
                ));
            }
        }
    }

    Ok(tokens)
}

/// Try each token kind in declaration order; the first pattern that matches
/// at the start of `rest` wins. Order encodes priority: mnemonics and
/// directives must be tried before the generic identifier pattern, register
/// names before identifiers, and numeric literals greedily consume the
/// widest run of digits so that e.g. `$1234` reads as one 2-byte literal
/// rather than two 1-byte ones.
fn try_match(rest: &str) -> Option<(TokenKind, usize)> {
    match_comment(rest)
        .or_else(|| match_directive(rest))
        .or_else(|| match_mnemonic(rest))
        .or_else(|| match_register(rest))
        .or_else(|| match_hex_number(rest))
        .or_else(|| match_bin_number(rest))
        .or_else(|| match_dec_number(rest))
        .or_else(|| match_identifier(rest))
        .or_else(|| match_punctuation(rest))
}

fn match_comment(rest: &str) -> Option<(TokenKind, usize)> {
    if rest.starts_with(';') {
        Some((TokenKind::Comment, rest.len()))
    } else {
        None
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn word_len(rest: &str) -> usize {
    let mut chars = rest.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return 0,
    }
    let mut end = 1;
    for (i, c) in chars {
        if is_ident_continue(c) {
            end = i + c.len_utf8();
        } else {
            break;
        }
    }
    end
}

fn match_directive(rest: &str) -> Option<(TokenKind, usize)> {
    if !rest.starts_with('.') {
        return None;
    }
    let name_len = word_len(&rest[1..]);
    if name_len == 0 {
        return None;
    }
    let name = &rest[1..1 + name_len];
    let lower = name.to_ascii_lowercase();
    DIRECTIVES
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, kind): &(&str, DirectiveKind)| (TokenKind::Directive(*kind), 1 + name_len))
}

fn match_mnemonic(rest: &str) -> Option<(TokenKind, usize)> {
    let len = word_len(rest);
    if len == 0 {
        return None;
    }
    let word = &rest[..len];
    let upper = word.to_ascii_uppercase();
    if MNEMONICS.contains(&upper.as_str()) {
        let mnemonic = upper.parse().expect("mnemonic list and FromStr must agree");
        Some((TokenKind::Mnemonic(mnemonic), len))
    } else {
        None
    }
}

fn match_register(rest: &str) -> Option<(TokenKind, usize)> {
    let mut chars = rest.chars();
    let first = chars.next()?;
    let boundary = chars.next().map(|c| !is_ident_continue(c)).unwrap_or(true);
    if !boundary {
        return None;
    }
    match first {
        'x' | 'X' => Some((TokenKind::RegX, 1)),
        'y' | 'Y' => Some((TokenKind::RegY, 1)),
        _ => None,
    }
}

fn digit_run(rest: &str, is_digit: impl Fn(char) -> bool) -> usize {
    rest.char_indices()
        .take_while(|(_, c)| is_digit(*c))
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0)
}

fn size_for_hex_digits(n: usize) -> Option<u8> {
    match n {
        1..=2 => Some(1),
        3..=4 => Some(2),
        5..=8 => Some(4),
        _ => None,
    }
}

fn size_for_bin_digits(n: usize) -> Option<u8> {
    match n {
        8 => Some(1),
        16 => Some(2),
        32 => Some(4),
        _ => None,
    }
}

fn match_hex_number(rest: &str) -> Option<(TokenKind, usize)> {
    if !rest.starts_with('$') {
        return None;
    }
    let digits = &rest[1..];
    let n = digit_run(digits, |c| c.is_ascii_hexdigit());
    if n == 0 {
        return None;
    }
    let size = size_for_hex_digits(n)?;
    let value = i64::from_str_radix(&digits[..n], 16).ok()?;
    Some((TokenKind::Number(NumLit { value, size }), 1 + n))
}

fn match_bin_number(rest: &str) -> Option<(TokenKind, usize)> {
    if !rest.starts_with('%') {
        return None;
    }
    let digits = &rest[1..];
    let n = digit_run(digits, |c| c == '0' || c == '1');
    if n == 0 {
        return None;
    }
    let size = size_for_bin_digits(n)?;
    let value = i64::from_str_radix(&digits[..n], 2).ok()?;
    Some((TokenKind::Number(NumLit { value, size }), 1 + n))
}

fn match_dec_number(rest: &str) -> Option<(TokenKind, usize)> {
    let n = digit_run(rest, |c| c.is_ascii_digit());
    if n == 0 || n > 3 {
        return None;
    }
    let value: i64 = rest[..n].parse().ok()?;
    Some((TokenKind::Number(NumLit { value, size: 1 }), n))
}

fn match_identifier(rest: &str) -> Option<(TokenKind, usize)> {
    let len = word_len(rest);
    if len == 0 {
        return None;
    }
    Some((TokenKind::Identifier(rest[..len].to_string()), len))
}

fn match_punctuation(rest: &str) -> Option<(TokenKind, usize)> {
    let c = rest.chars().next()?;
    let kind = match c {
        ':' => TokenKind::Colon,
        ',' => TokenKind::Comma,
        '=' => TokenKind::Equals,
        '#' => TokenKind::Pound,
        '(' => TokenKind::LeftParen,
        ')' => TokenKind::RightParen,
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '<' => TokenKind::LessThan,
        '>' => TokenKind::GreaterThan,
        _ => return None,
    };
    Some((kind, c.len_utf8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::Mnemonic;
    use crate::token::TokenKind::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().flatten().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_determinism() {
        let src = "start: LDA #$05 ; load\nJMP start\n";
        assert_eq!(lex(src).unwrap(), lex(src).unwrap());
    }

    #[test]
    fn hex_widths_are_widest_first() {
        assert_eq!(kinds("$1234"), vec![Number(NumLit { value: 0x1234, size: 2 })]);
        assert_eq!(kinds("$12"), vec![Number(NumLit { value: 0x12, size: 1 })]);
        assert_eq!(kinds("$12345678"), vec![Number(NumLit { value: 0x1234_5678, size: 4 })]);
    }

    #[test]
    fn binary_widths() {
        assert_eq!(kinds("%00000001"), vec![Number(NumLit { value: 1, size: 1 })]);
        assert_eq!(
            kinds("%0000000000000001"),
            vec![Number(NumLit { value: 1, size: 2 })]
        );
    }

    #[test]
    fn decimal_is_always_one_byte() {
        assert_eq!(kinds("123"), vec![Number(NumLit { value: 123, size: 1 })]);
    }

    #[test]
    fn mnemonic_before_identifier() {
        assert_eq!(kinds("lda"), vec![Mnemonic(Mnemonic::LDA)]);
        assert_eq!(kinds("ldax"), vec![Identifier("ldax".to_string())]);
    }

    #[test]
    fn register_before_identifier() {
        assert_eq!(kinds("x"), vec![RegX]);
        assert_eq!(kinds("xyz"), vec![Identifier("xyz".to_string())]);
    }

    #[test]
    fn directive_tokens() {
        assert_eq!(kinds(".org"), vec![Directive(DirectiveKind::Org)]);
        assert_eq!(kinds(".ORG"), vec![Directive(DirectiveKind::Org)]);
    }

    #[test]
    fn unknown_directive_fails_to_lex() {
        assert!(lex(".bogus").is_err());
    }

    #[test]
    fn empty_and_comment_only_lines_are_dropped() {
        let lines = lex("\n; only a comment\n   \nLDA #$01\n").unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn unmatched_character_reports_line_and_column() {
        let err = lex_line("LDA @foo", 3).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 5);
    }
}
