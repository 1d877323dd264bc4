//! Lexer and recursive descent parser for condition strings.
//!
//! The grammar, lowest precedence first:
//!
//! ```text
//! expr      := and_expr ( "or" and_expr )*
//! and_expr  := not_expr ( "and" not_expr )*
//! not_expr  := "not" not_expr | primary
//! primary   := "true" | "false" | "(" expr ")" | predicate
//! predicate := "file" "(" string ")"
//!            | "active" "(" string ")"
//!            | "checksum" "(" string "," crc ")"
//!            | "version" "(" string "," string "," comparator ")"
//! ```
//!
//! Errors are plain reason strings; the caller attaches the condition text.

use super::{Comparator, Expr};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// A bare word: a keyword, predicate name or hex CRC literal.
    Word(String),

    /// A double-quoted string, quotes stripped.
    Str(String),

    Cmp(Comparator),
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Word(w) => format!("'{w}'"),
            Self::Str(s) => format!("\"{s}\""),
            Self::Cmp(_) => "a comparison operator".to_owned(),
            Self::LParen => "'('".to_owned(),
            Self::RParen => "')'".to_owned(),
            Self::Comma => "','".to_owned(),
        }
    }
}

pub(super) fn parse(text: &str) -> Result<Expr, String> {
    let tokens = lex(text)?;
    let mut parser = Parser { tokens, pos: 0 };

    let expr = parser.parse_or()?;
    if let Some(trailing) = parser.peek() {
        return Err(format!("unexpected {} after the expression", trailing.describe()));
    }

    Ok(expr)
}

fn lex(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            ' ' | '\t' | '\r' | '\n' => continue,
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            ',' => tokens.push(Token::Comma),

            '"' => {
                let mut value = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(format!("unterminated string starting at column {}", pos + 1));
                }
                tokens.push(Token::Str(value));
            }

            '=' | '!' | '<' | '>' => {
                let double = chars.next_if(|&(_, c)| c == '=').is_some();
                let cmp = match (c, double) {
                    ('=', true) => Comparator::Eq,
                    ('!', true) => Comparator::Ne,
                    ('<', true) => Comparator::Le,
                    ('>', true) => Comparator::Ge,
                    ('<', false) => Comparator::Lt,
                    ('>', false) => Comparator::Gt,
                    _ => return Err(format!("unexpected '{c}' at column {}", pos + 1)),
                };
                tokens.push(Token::Cmp(cmp));
            }

            c if c.is_ascii_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }

            other => return Err(format!("unexpected '{other}' at column {}", pos + 1)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consumes the next token if it is the given keyword (case-insensitive).
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some(Token::Word(word)) = self.peek() {
            if word.eq_ignore_ascii_case(keyword) {
                self.pos += 1;
                return true;
            }
        }
        false
    }

    fn expect(&mut self, expected: Token) -> Result<(), String> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(format!(
                "expected {} but found {}",
                expected.describe(),
                token.describe()
            )),
            None => Err(format!(
                "expected {} but the condition ended",
                expected.describe()
            )),
        }
    }

    fn expect_string(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Str(value)) => Ok(value),
            Some(token) => Err(format!(
                "expected a quoted string but found {}",
                token.describe()
            )),
            None => Err("expected a quoted string but the condition ended".to_owned()),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_not()?;
        while self.eat_keyword("and") {
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("not") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        if self.eat_keyword("true") {
            return Ok(Expr::Literal(true));
        }
        if self.eat_keyword("false") {
            return Ok(Expr::Literal(false));
        }

        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Word(name)) => self.parse_predicate(&name),
            Some(token) => Err(format!("unexpected {}", token.describe())),
            None => Err("the condition ended where a predicate was expected".to_owned()),
        }
    }

    fn parse_predicate(&mut self, name: &str) -> Result<Expr, String> {
        let lowered = name.to_ascii_lowercase();
        self.expect(Token::LParen)?;

        let expr = match lowered.as_str() {
            "file" => Expr::FileExists(self.expect_string()?),
            "active" => Expr::Active(self.expect_string()?),

            "checksum" => {
                let path = self.expect_string()?;
                self.expect(Token::Comma)?;
                let crc = self.expect_crc()?;
                Expr::ChecksumMatches(path, crc)
            }

            "version" => {
                let path = self.expect_string()?;
                self.expect(Token::Comma)?;
                let version = self.expect_string()?;
                self.expect(Token::Comma)?;
                let cmp = self.expect_comparator()?;
                Expr::VersionCheck(path, version, cmp)
            }

            _ => return Err(format!("unknown predicate '{name}'")),
        };

        self.expect(Token::RParen)?;
        Ok(expr)
    }

    /// CRC values are written as bare hexadecimal, e.g. `checksum("A.esp", 24F0E2A1)`.
    fn expect_crc(&mut self) -> Result<u32, String> {
        match self.next() {
            Some(Token::Word(word)) => u32::from_str_radix(&word, 16)
                .map_err(|_| format!("'{word}' is not a valid CRC-32 value")),
            Some(token) => Err(format!("expected a CRC value but found {}", token.describe())),
            None => Err("expected a CRC value but the condition ended".to_owned()),
        }
    }

    fn expect_comparator(&mut self) -> Result<Comparator, String> {
        match self.next() {
            Some(Token::Cmp(cmp)) => Ok(cmp),
            Some(token) => Err(format!(
                "expected a comparison operator but found {}",
                token.describe()
            )),
            None => Err("expected a comparison operator but the condition ended".to_owned()),
        }
    }
}
