//! Recursive-descent parser producing the selection syntax tree.

use super::SelectionError;
use super::token::{SpannedToken, Token, tokenize};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    All,
    Nothing,
    Water,
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Strings {
        field: StringField,
        patterns: Vec<Pattern>,
    },
    Integers {
        field: IntegerField,
        ranges: Vec<(i64, i64)>,
    },
    Reals {
        field: RealField,
        values: Vec<f64>,
    },
    Compare {
        field: RealField,
        op: CmpOp,
        value: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringField {
    Name,
    Resname,
    Chain,
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerField {
    Index,
    Serial,
    Resid,
    Residue,
    Fragment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealField {
    Beta,
    Occupancy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }
}

/// A string value to match; `*` and `?` make it a glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Exact(String),
    Glob(String),
}

impl Pattern {
    fn from_word(word: &str) -> Self {
        if word.contains(['*', '?']) {
            Pattern::Glob(word.to_string())
        } else {
            Pattern::Exact(word.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Pattern::Exact(p) => p == value,
            Pattern::Glob(p) => glob_match(p.as_bytes(), value.as_bytes()),
        }
    }
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == b'?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star_p, star_t)) = backtrack {
            p = star_p + 1;
            t = star_t + 1;
            backtrack = Some((star_p, star_t + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}

enum Keyword {
    Constant(Expr),
    String(StringField),
    Integer(IntegerField),
    Real(RealField),
}

fn keyword(word: &str) -> Option<Keyword> {
    let kw = match word.to_ascii_lowercase().as_str() {
        "all" => Keyword::Constant(Expr::All),
        "none" => Keyword::Constant(Expr::Nothing),
        "water" | "waters" => Keyword::Constant(Expr::Water),
        "name" => Keyword::String(StringField::Name),
        "resname" => Keyword::String(StringField::Resname),
        "chain" => Keyword::String(StringField::Chain),
        "element" => Keyword::String(StringField::Element),
        "index" => Keyword::Integer(IntegerField::Index),
        "serial" => Keyword::Integer(IntegerField::Serial),
        "resid" => Keyword::Integer(IntegerField::Resid),
        "residue" => Keyword::Integer(IntegerField::Residue),
        "fragment" => Keyword::Integer(IntegerField::Fragment),
        "beta" => Keyword::Real(RealField::Beta),
        "occupancy" => Keyword::Real(RealField::Occupancy),
        _ => return None,
    };
    Some(kw)
}

fn is_reserved(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "and" | "or" | "not" | "to"
    ) || keyword(word).is_some()
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn span(&self) -> (usize, usize) {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> SelectionError {
        SelectionError::new(message, self.input, self.span())
    }

    fn at_word(&self, expected: &str) -> bool {
        matches!(self.peek(), Token::Word(w) if w.eq_ignore_ascii_case(expected))
    }

    fn parse_or(&mut self) -> Result<Expr, SelectionError> {
        let mut lhs = self.parse_and()?;
        while self.at_word("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, SelectionError> {
        let mut lhs = self.parse_not()?;
        while self.at_word("and") {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, SelectionError> {
        if self.at_word("not") {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, SelectionError> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let inner = self.parse_or()?;
                if *self.peek() != Token::RParen {
                    return Err(self.error("Expected ')'"));
                }
                self.advance();
                Ok(inner)
            }
            Token::Word(word) => {
                let Some(kw) = keyword(&word) else {
                    return Err(self.error(format!("Unknown keyword '{}'", word)));
                };
                self.advance();
                match kw {
                    Keyword::Constant(expr) => Ok(expr),
                    Keyword::String(field) => self.parse_strings(field),
                    Keyword::Integer(field) => self.parse_integers(field),
                    Keyword::Real(field) => self.parse_reals(field),
                }
            }
            Token::Eof => Err(self.error("Unexpected end of selection")),
            _ => Err(self.error("Expected a selection keyword")),
        }
    }

    fn parse_strings(&mut self, field: StringField) -> Result<Expr, SelectionError> {
        let mut patterns = Vec::new();
        loop {
            let pattern = match self.peek() {
                Token::Word(w) if !is_reserved(w) => Pattern::from_word(w),
                Token::Quoted(q) => Pattern::Exact(q.clone()),
                Token::Integer(_) | Token::Float(_) => {
                    let (start, end) = self.span();
                    Pattern::Exact(self.input[start..end].to_string())
                }
                _ => break,
            };
            patterns.push(pattern);
            self.advance();
        }
        if patterns.is_empty() {
            return Err(self.error("Expected at least one value"));
        }
        Ok(Expr::Strings { field, patterns })
    }

    fn parse_signed_int(&mut self) -> Result<i64, SelectionError> {
        let negative = *self.peek() == Token::Dash;
        if negative {
            self.advance();
        }
        match *self.peek() {
            Token::Integer(i) => {
                self.advance();
                Ok(if negative { -i } else { i })
            }
            _ => Err(self.error("Expected an integer")),
        }
    }

    fn next_is_signed_int(&self) -> bool {
        match self.peek() {
            Token::Integer(_) => true,
            Token::Dash => matches!(
                self.tokens.get(self.pos + 1).map(|t| &t.token),
                Some(Token::Integer(_))
            ),
            _ => false,
        }
    }

    fn parse_integers(&mut self, field: IntegerField) -> Result<Expr, SelectionError> {
        let mut ranges = Vec::new();
        while self.next_is_signed_int() {
            let lo = self.parse_signed_int()?;
            let hi = if self.at_word("to") || *self.peek() == Token::Colon {
                self.advance();
                self.parse_signed_int()?
            } else if *self.peek() == Token::Dash {
                self.advance();
                self.parse_signed_int()?
            } else {
                lo
            };
            ranges.push((lo, hi));
        }
        if ranges.is_empty() {
            return Err(self.error("Expected at least one integer value"));
        }
        Ok(Expr::Integers { field, ranges })
    }

    fn parse_signed_real(&mut self) -> Result<f64, SelectionError> {
        let negative = *self.peek() == Token::Dash;
        if negative {
            self.advance();
        }
        let value = match *self.peek() {
            Token::Integer(i) => i as f64,
            Token::Float(f) => f,
            _ => return Err(self.error("Expected a number")),
        };
        self.advance();
        Ok(if negative { -value } else { value })
    }

    fn parse_reals(&mut self, field: RealField) -> Result<Expr, SelectionError> {
        let op = match self.peek() {
            Token::Lt => Some(CmpOp::Lt),
            Token::Le => Some(CmpOp::Le),
            Token::Gt => Some(CmpOp::Gt),
            Token::Ge => Some(CmpOp::Ge),
            Token::Eq => Some(CmpOp::Eq),
            Token::Ne => Some(CmpOp::Ne),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let value = self.parse_signed_real()?;
            return Ok(Expr::Compare { field, op, value });
        }

        let mut values = Vec::new();
        while matches!(self.peek(), Token::Integer(_) | Token::Float(_) | Token::Dash) {
            values.push(self.parse_signed_real()?);
        }
        if values.is_empty() {
            return Err(self.error("Expected a number or a comparison"));
        }
        Ok(Expr::Reals { field, values })
    }
}

pub fn parse(input: &str) -> Result<Expr, SelectionError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_or()?;
    if *parser.peek() != Token::Eof {
        return Err(parser.error("Unexpected trailing input"));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_is_not_then_and_then_or() {
        let expr = parse("not water and name CA or all").unwrap();
        let expected = Expr::Or(
            Box::new(Expr::And(
                Box::new(Expr::Not(Box::new(Expr::Water))),
                Box::new(Expr::Strings {
                    field: StringField::Name,
                    patterns: vec![Pattern::Exact("CA".into())],
                }),
            )),
            Box::new(Expr::All),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn integer_ranges_in_every_spelling() {
        let expr = parse("resid -3 1 to 4 7-9 12:13").unwrap();
        assert_eq!(
            expr,
            Expr::Integers {
                field: IntegerField::Resid,
                ranges: vec![(-3, -3), (1, 4), (7, 9), (12, 13)],
            }
        );
    }

    #[test]
    fn comparisons_and_value_lists_on_reals() {
        assert_eq!(
            parse("beta >= -0.5").unwrap(),
            Expr::Compare {
                field: RealField::Beta,
                op: CmpOp::Ge,
                value: -0.5
            }
        );
        assert_eq!(
            parse("occupancy 1 0.5").unwrap(),
            Expr::Reals {
                field: RealField::Occupancy,
                values: vec![1.0, 0.5]
            }
        );
    }

    #[test]
    fn globs_are_detected() {
        let expr = parse("name H* C?").unwrap();
        let Expr::Strings { patterns, .. } = expr else {
            panic!("expected a string match");
        };
        assert!(patterns[0].matches("HW1"));
        assert!(!patterns[0].matches("CA"));
        assert!(patterns[1].matches("CA"));
        assert!(!patterns[1].matches("CA1"));
    }

    #[test]
    fn glob_matching_handles_backtracking() {
        assert!(glob_match(b"*A*B", b"xxAyyAzzB"));
        assert!(glob_match(b"**", b""));
        assert!(!glob_match(b"*A?", b"xxA"));
    }

    #[test]
    fn errors_point_at_the_offending_token() {
        let err = parse("name CA and bogus 3").unwrap_err();
        assert_eq!((err.start, err.end), (12, 17));
        assert!(err.message.contains("bogus"));

        let err = parse("(all").unwrap_err();
        assert!(err.message.contains("')'"));

        assert!(parse("name").is_err());
        assert!(parse("resid").is_err());
        assert!(parse("all none").is_err());
        assert!(parse("").is_err());
    }
}
