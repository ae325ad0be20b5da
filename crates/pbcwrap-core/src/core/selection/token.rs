//! Lexer for the atom selection language.

use super::SelectionError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(String),
    Quoted(String),
    Integer(i64),
    Float(f64),
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Dash,
    Colon,
    Eof,
}

/// A token with its byte span in the input string.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: (usize, usize),
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'*' | b'?' | b'\'' | b'.' | b'+')
}

pub fn tokenize(input: &str) -> Result<Vec<SpannedToken>, SelectionError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        let start = pos;
        if pos >= bytes.len() {
            tokens.push(SpannedToken {
                token: Token::Eof,
                span: (start, start),
            });
            return Ok(tokens);
        }

        let next = bytes.get(pos + 1).copied();
        let (token, len) = match bytes[pos] {
            b'(' => (Token::LParen, 1),
            b')' => (Token::RParen, 1),
            b'-' => (Token::Dash, 1),
            b':' => (Token::Colon, 1),
            b'<' if next == Some(b'=') => (Token::Le, 2),
            b'<' => (Token::Lt, 1),
            b'>' if next == Some(b'=') => (Token::Ge, 2),
            b'>' => (Token::Gt, 1),
            b'=' if next == Some(b'=') => (Token::Eq, 2),
            b'=' => (Token::Eq, 1),
            b'!' if next == Some(b'=') => (Token::Ne, 2),
            b'"' => {
                let Some(close) = input[pos + 1..].find('"') else {
                    return Err(SelectionError::new(
                        "Unterminated quoted string",
                        input,
                        (start, bytes.len()),
                    ));
                };
                let text = input[pos + 1..pos + 1 + close].to_string();
                (Token::Quoted(text), close + 2)
            }
            b if is_word_byte(b) => {
                let mut end = pos;
                while end < bytes.len() && is_word_byte(bytes[end]) {
                    end += 1;
                }
                let text = &input[pos..end];
                let token = if let Ok(i) = text.parse::<i64>() {
                    Token::Integer(i)
                } else if text.contains('.') && text.parse::<f64>().is_ok() {
                    Token::Float(text.parse().unwrap_or_default())
                } else {
                    Token::Word(text.to_string())
                };
                (token, end - pos)
            }
            other => {
                return Err(SelectionError::new(
                    format!("Unexpected character '{}'", other as char),
                    input,
                    (start, start + 1),
                ));
            }
        };

        pos += len;
        tokens.push(SpannedToken {
            token,
            span: (start, pos),
        });
    }
}
