use super::{token::*, Error, Offset, TEXT_CAPACITY};
use crate::error;

type Result<T> = std::result::Result<T, Error>;

/// Tokenizes a whole buffer. The end-of-input token is not included.
pub fn lex(s: &str) -> Result<Vec<(Offset, Token)>> {
    let mut lexer = Lexer::new(s);
    let mut tokens = vec![];
    loop {
        match lexer.next_token()? {
            (_, Token::Eof) => return Ok(tokens),
            token => tokens.push(token),
        }
    }
}

/// ## Program text scanner
///
/// A NUL byte or the end of the buffer is end of input.
/// `peek` scans ahead without moving the cursor.

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    buf: &'a [u8],
    cursor: Offset,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Lexer<'a> {
        Lexer::from_bytes(text.as_bytes())
    }

    pub fn from_bytes(buf: &'a [u8]) -> Lexer<'a> {
        Lexer { buf, cursor: 0 }
    }

    pub fn peek(&self) -> Result<(Offset, Token)> {
        self.clone().next_token()
    }

    pub fn next_token(&mut self) -> Result<(Offset, Token)> {
        self.skip_whitespace();
        let start = self.cursor;
        let ch = self.byte(start);
        if ch == 0 {
            return Ok((start, Token::Eof));
        }
        if let Some(token) = self.punctuation() {
            return Ok((start, token));
        }
        if ch == b'"' {
            return Ok((start, self.string()));
        }
        if ch.is_ascii_alphabetic() {
            return Ok((start, self.alphabetic()));
        }
        if ch.is_ascii_digit() {
            return self.number().map(|token| (start, token));
        }
        Err(error!(UnexpectedCharacter, ..start; format!("'{}'", char::from(ch))))
    }

    fn byte(&self, at: Offset) -> u8 {
        self.buf.get(at).copied().unwrap_or(0)
    }

    fn skip_whitespace(&mut self) {
        while self.byte(self.cursor).is_ascii_whitespace() {
            self.cursor += 1;
        }
    }

    /// Consumes the next byte only when it is `expected`.
    fn follows(&mut self, expected: u8) -> bool {
        if self.byte(self.cursor) == expected {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn punctuation(&mut self) -> Option<Token> {
        use Operator::*;
        let ch = self.byte(self.cursor);
        let token = match ch {
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b',' => Token::Comma,
            b':' => Token::Colon,
            b';' => Token::Semicolon,
            b'.' => Token::Dot,
            b'+' => Token::Operator(Plus),
            b'-' => Token::Operator(Minus),
            b'*' => Token::Operator(Multiply),
            b'/' => Token::Operator(Divide),
            b'%' => Token::Operator(Modulus),
            b'=' | b'!' | b'<' | b'>' | b'&' | b'|' => {
                self.cursor += 1;
                let token = match ch {
                    b'=' if self.follows(b'=') => Token::Operator(Equal),
                    b'=' => Token::Operator(Assign),
                    b'!' if self.follows(b'=') => Token::Operator(NotEqual),
                    b'!' => Token::Operator(Not),
                    b'<' if self.follows(b'=') => Token::Operator(LessEqual),
                    b'<' => Token::Operator(Less),
                    b'>' if self.follows(b'=') => Token::Operator(GreaterEqual),
                    b'>' => Token::Operator(Greater),
                    b'&' if self.follows(b'&') => Token::Operator(And),
                    b'|' if self.follows(b'|') => Token::Operator(Or),
                    _ => {
                        self.cursor -= 1;
                        return None;
                    }
                };
                return Some(token);
            }
            _ => return None,
        };
        self.cursor += 1;
        Some(token)
    }

    fn string(&mut self) -> Token {
        let mut text = vec![];
        self.cursor += 1;
        loop {
            match self.byte(self.cursor) {
                0 => break,
                b'"' => {
                    self.cursor += 1;
                    break;
                }
                ch => {
                    if text.len() < TEXT_CAPACITY - 1 {
                        text.push(ch);
                    }
                    self.cursor += 1;
                }
            }
        }
        Token::Literal(Literal::String(
            String::from_utf8_lossy(&text).into_owned(),
        ))
    }

    fn alphabetic(&mut self) -> Token {
        let mut s = String::new();
        while self.byte(self.cursor).is_ascii_alphanumeric() {
            if s.len() < TEXT_CAPACITY - 1 {
                s.push(char::from(self.byte(self.cursor)));
            }
            self.cursor += 1;
        }
        match Token::from_string(&s) {
            Some(token) => token,
            None => Token::Ident(s),
        }
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.cursor;
        let mut value: Option<i32> = Some(0);
        while self.byte(self.cursor).is_ascii_digit() {
            let digit = i32::from(self.byte(self.cursor) - b'0');
            value = value
                .and_then(|v| v.checked_mul(10))
                .and_then(|v| v.checked_add(digit));
            self.cursor += 1;
        }
        match value {
            Some(n) => Ok(Token::Literal(Literal::Integer(n))),
            None => Err(error!(Overflow, ..start; "INTEGER LITERAL TOO LARGE")),
        }
    }
}
