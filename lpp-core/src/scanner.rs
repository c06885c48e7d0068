use phf::{phf_map, Map};

use crate::token::{Token, Type};

pub struct Scanner;

impl Scanner {
    const KEYWORDS: Map<&'static str, Type> = phf_map! {
        "var" => Type::Var,
        "funcion" => Type::Function,
        "regresa" => Type::Return,
        "si" => Type::If,
        "si_no" => Type::Else,
        "mientras" => Type::While,
        "por" => Type::For,
        "en" => Type::In,
        "verdadero" => Type::True,
        "falso" => Type::False,
        "nulo" => Type::Null,
    };

    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Scanner
    }

    pub fn scan_tokens<'a, 'b>(&'a mut self, src: &'b str) -> TokenStream
    where
        'b: 'a,
    {
        TokenStream::new(src)
    }

    /// Returns the keyword type for `text`, if it is one.
    pub fn keyword(text: &str) -> Option<Type> {
        Self::KEYWORDS.get(text).copied()
    }
}

/// Shorthand for `Scanner::new().scan_tokens(src)`.
pub fn tokenize(src: &str) -> TokenStream {
    TokenStream::new(src)
}

pub struct TokenStream {
    // The source is held as chars so that `start` and `current` never land inside a multi-byte
    // character.
    src: Vec<char>,
    line: usize,
    line_start: usize,

    // `start` and `current` points to the start and end of the token being scanned
    start: usize,
    current: usize,

    // Set once the iterator has handed out the eof token. `next_token` keeps producing eof
    // tokens regardless, only the iterator stops.
    eof: bool,
}

impl TokenStream {
    pub fn new(src: &str) -> Self {
        TokenStream {
            src: src.chars().collect(),
            line: 0,
            line_start: 0,
            start: 0,
            current: 0,
            eof: false,
        }
    }

    /// Scans the next token. Once the input is exhausted every call returns an `Eof` token with
    /// an empty lexeme.
    pub fn next_token(&mut self) -> Token {
        loop {
            self.start = self.current;
            if self.is_at_end() {
                return self.make_token(Type::Eof);
            }

            if let Some(token) = self.scan_token() {
                return token;
            }
        }
    }

    fn scan_token(&mut self) -> Option<Token> {
        let c = self.advance();

        let token = match c {
            '(' => self.make_token(Type::LeftParen),
            ')' => self.make_token(Type::RightParen),
            '{' => self.make_token(Type::LeftBrace),
            '}' => self.make_token(Type::RightBrace),
            '[' => self.make_token(Type::LeftBracket),
            ']' => self.make_token(Type::RightBracket),
            ',' => self.make_token(Type::Comma),
            ';' => self.make_token(Type::SemiColon),
            ':' => self.make_token(Type::Colon),
            '.' => self.make_token(Type::Dot),
            '%' => self.make_token(Type::Percent),

            '+' => {
                if self.match_char('+') {
                    self.make_token(Type::Increment)
                } else if self.match_char('=') {
                    self.make_token(Type::PlusAssign)
                } else {
                    self.make_token(Type::Plus)
                }
            }

            '-' => {
                if self.match_char('-') {
                    self.make_token(Type::Decrement)
                } else if self.match_char('=') {
                    self.make_token(Type::MinusAssign)
                } else {
                    self.make_token(Type::Minus)
                }
            }

            '*' => {
                if self.match_char('*') {
                    self.make_token(Type::Power)
                } else if self.match_char('=') {
                    self.make_token(Type::StarAssign)
                } else {
                    self.make_token(Type::Star)
                }
            }

            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    return None;
                } else if self.match_char('=') {
                    self.make_token(Type::SlashAssign)
                } else {
                    self.make_token(Type::Slash)
                }
            }

            '!' => {
                if self.match_char('=') {
                    self.make_token(Type::BangEqual)
                } else {
                    self.make_token(Type::Bang)
                }
            }

            '=' => {
                if self.match_char('=') {
                    self.make_token(Type::EqualEqual)
                } else if self.match_char('>') {
                    self.make_token(Type::Arrow)
                } else {
                    self.make_token(Type::Assign)
                }
            }

            '<' => {
                if self.match_char('=') {
                    self.make_token(Type::LessEqual)
                } else {
                    self.make_token(Type::Less)
                }
            }

            '>' => {
                if self.match_char('=') {
                    self.make_token(Type::GreaterEqual)
                } else {
                    self.make_token(Type::Greater)
                }
            }

            '&' => {
                if self.match_char('&') {
                    self.make_token(Type::And)
                } else {
                    self.make_token(Type::Illegal)
                }
            }

            '|' => {
                if self.match_char('|') {
                    self.make_token(Type::Or)
                } else {
                    self.make_token(Type::Illegal)
                }
            }

            '"' => self.string(),

            // White spaces, do nothing
            ' ' | '\t' | '\r' => return None,

            '\n' => {
                self.line += 1;
                self.line_start = self.current;
                return None;
            }

            _ => {
                if c.is_ascii_digit() {
                    self.number()
                } else if c.is_alphabetic() || c == '_' {
                    self.identifier()
                } else {
                    self.make_token(Type::Illegal)
                }
            }
        };

        Some(token)
    }

    // Strings are taken verbatim, an unterminated string runs until the end of input.
    fn string(&mut self) -> Token {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
                self.line_start = self.current + 1;
            }

            self.advance();
        }

        let end = self.current;

        // consume the closing "
        if !self.is_at_end() {
            self.advance();
        }

        let text: String = self.src[self.start + 1..end].iter().collect();
        Token::new(Type::Str, text, self.line, self.col())
    }

    fn number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }

            return self.make_token(Type::Float);
        }

        self.make_token(Type::Int)
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.lexeme();
        match Scanner::keyword(&text) {
            None => self.make_token(Type::Identifier),
            Some(keyword) => self.make_token(keyword),
        }
    }

    fn current(&self) -> char {
        self.src[self.current]
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.current()
        }
    }

    fn advance(&mut self) -> char {
        let res = self.current();
        self.current += 1;
        res
    }

    fn match_char(&mut self, c: char) -> bool {
        if self.is_at_end() || self.current() != c {
            false
        } else {
            self.current += 1;
            true
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.src.len()
    }

    fn lexeme(&self) -> String {
        self.src[self.start..self.current].iter().collect()
    }

    fn col(&self) -> usize {
        self.start.saturating_sub(self.line_start)
    }

    fn make_token(&self, ty: Type) -> Token {
        let lexeme = match ty {
            Type::Eof => String::new(),
            _ => self.lexeme(),
        };

        Token::new(ty, lexeme, self.line, self.col())
    }
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof {
            return None;
        }

        let token = self.next_token();
        if token.ty == Type::Eof {
            self.eof = true;
        }

        Some(token)
    }
}
