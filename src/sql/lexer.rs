// SQL Lexer
use crate::error::{Error, Result};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Create,
    Table,
    Drop,
    Update,
    Set,
    Delete,
    And,
    Or,
    Not,
    True,
    False,
    Null,
    As,
    Order,
    By,
    Asc,
    Desc,
    Limit,

    // Data types
    Integer,
    Real,
    Text,
    Boolean,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Dot,

    // Literals
    IntegerLiteral(i64),
    RealLiteral(f64),
    StringLiteral(String),
    Identifier(String),

    // Special
    /// A character no rule recognizes, including a lone `!`.
    Invalid(char),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(s) => write!(f, "identifier {}", s),
            TokenKind::IntegerLiteral(n) => write!(f, "integer {}", n),
            TokenKind::RealLiteral(n) => write!(f, "real {:?}", n),
            TokenKind::StringLiteral(s) => write!(f, "string '{}'", s),
            TokenKind::Invalid(c) => write!(f, "invalid character '{}'", c),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::NotEqual => write!(f, "'<>'"),
            TokenKind::Less => write!(f, "'<'"),
            TokenKind::LessEqual => write!(f, "'<='"),
            TokenKind::Greater => write!(f, "'>'"),
            TokenKind::GreaterEqual => write!(f, "'>='"),
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Dot => write!(f, "'.'"),
            keyword => write!(f, "{}", format!("{:?}", keyword).to_uppercase()),
        }
    }
}

lazy_static! {
    static ref KEYWORDS: HashMap<&'static str, TokenKind> = {
        let mut m = HashMap::new();
        m.insert("SELECT", TokenKind::Select);
        m.insert("FROM", TokenKind::From);
        m.insert("WHERE", TokenKind::Where);
        m.insert("INSERT", TokenKind::Insert);
        m.insert("INTO", TokenKind::Into);
        m.insert("VALUES", TokenKind::Values);
        m.insert("CREATE", TokenKind::Create);
        m.insert("TABLE", TokenKind::Table);
        m.insert("DROP", TokenKind::Drop);
        m.insert("UPDATE", TokenKind::Update);
        m.insert("SET", TokenKind::Set);
        m.insert("DELETE", TokenKind::Delete);
        m.insert("AND", TokenKind::And);
        m.insert("OR", TokenKind::Or);
        m.insert("NOT", TokenKind::Not);
        m.insert("TRUE", TokenKind::True);
        m.insert("FALSE", TokenKind::False);
        m.insert("NULL", TokenKind::Null);
        m.insert("AS", TokenKind::As);
        m.insert("ORDER", TokenKind::Order);
        m.insert("BY", TokenKind::By);
        m.insert("ASC", TokenKind::Asc);
        m.insert("DESC", TokenKind::Desc);
        m.insert("LIMIT", TokenKind::Limit);
        m.insert("INTEGER", TokenKind::Integer);
        m.insert("REAL", TokenKind::Real);
        m.insert("TEXT", TokenKind::Text);
        m.insert("BOOLEAN", TokenKind::Boolean);
        m
    };
}

/// Location of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset from the start of the input.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text consumed, quotes included for strings.
    pub text: String,
    pub position: Position,
}

impl Token {
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_eof() {
            write!(f, "end of input")
        } else {
            write!(f, "`{}`", self.text)
        }
    }
}

/// Scans SQL text into [`Token`]s.
///
/// The lexer is an iterator that produces tokens lazily and stops after
/// the end marker (or the first error). [`Lexer::reset`] rewinds it to the
/// beginning of the input.
///
/// In strict mode (the default) an unterminated string literal is an
/// error and [`Lexer::tokenize`] rejects invalid characters. In
/// permissive mode an unterminated string runs to the end of input and
/// invalid characters are skipped.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
    offset: usize,
    line: usize,
    column: usize,
    strict: bool,
    finished: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Lexer {
            input: chars,
            position: 0,
            current_char,
            offset: 0,
            line: 1,
            column: 1,
            strict: true,
            finished: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.current_char = self.input.first().copied();
        self.offset = 0;
        self.line = 1;
        self.column = 1;
        self.finished = false;
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char {
            self.offset += ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn mark(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '-' && self.peek(1) == Some('-') {
                while let Some(c) = self.current_char {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, position: Position) -> Token {
        Token {
            kind,
            text: self.input[start..self.position].iter().collect(),
            position,
        }
    }

    fn read_number(&mut self, start: usize, position: Position) -> Result<Token> {
        let mut num_str = String::new();
        let mut is_real = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '.' && !is_real {
                is_real = true;
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = if is_real {
            num_str
                .parse()
                .map(TokenKind::RealLiteral)
                .map_err(|_| Error::Lexical {
                    message: format!("invalid real literal {}", num_str),
                    position,
                })?
        } else {
            num_str
                .parse()
                .map(TokenKind::IntegerLiteral)
                .map_err(|_| Error::Lexical {
                    message: format!("integer literal {} out of range", num_str),
                    position,
                })?
        };

        Ok(self.make_token(kind, start, position))
    }

    fn read_string(&mut self, quote: char, start: usize, position: Position) -> Result<Token> {
        let mut string = String::new();
        self.advance(); // opening quote

        loop {
            match self.current_char {
                None => {
                    if self.strict {
                        return Err(Error::Lexical {
                            message: "unterminated string literal".to_string(),
                            position,
                        });
                    }
                    break;
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some('\\') if self.peek(1).is_some() => {
                    self.advance();
                    if let Some(escaped) = self.current_char {
                        string.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        });
                        self.advance();
                    }
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
            }
        }

        Ok(self.make_token(TokenKind::StringLiteral(string), start, position))
    }

    fn read_identifier(&mut self, start: usize, position: Position) -> Token {
        let mut ident = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = KEYWORDS
            .get(ident.to_ascii_uppercase().as_str())
            .cloned()
            .unwrap_or(TokenKind::Identifier(ident));
        self.make_token(kind, start, position)
    }

    fn single(&mut self, kind: TokenKind, start: usize, position: Position) -> Token {
        self.advance();
        self.make_token(kind, start, position)
    }

    /// Scans the next token. Invalid characters come back as
    /// [`TokenKind::Invalid`]; deciding whether that is fatal is left to
    /// the consumer.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let start = self.position;
        let position = self.mark();

        let ch = match self.current_char {
            None => return Ok(self.make_token(TokenKind::Eof, start, position)),
            Some(ch) => ch,
        };

        let token = match ch {
            '\'' | '"' => self.read_string(ch, start, position)?,
            _ if ch.is_ascii_digit() => self.read_number(start, position)?,
            _ if ch.is_ascii_alphabetic() || ch == '_' => self.read_identifier(start, position),
            '(' => self.single(TokenKind::LeftParen, start, position),
            ')' => self.single(TokenKind::RightParen, start, position),
            ',' => self.single(TokenKind::Comma, start, position),
            ';' => self.single(TokenKind::Semicolon, start, position),
            '.' => self.single(TokenKind::Dot, start, position),
            '+' => self.single(TokenKind::Plus, start, position),
            '-' => self.single(TokenKind::Minus, start, position),
            '*' => self.single(TokenKind::Star, start, position),
            '/' => self.single(TokenKind::Slash, start, position),
            '=' => self.single(TokenKind::Equal, start, position),
            '<' => {
                self.advance();
                let kind = match self.current_char {
                    Some('=') => {
                        self.advance();
                        TokenKind::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        TokenKind::NotEqual
                    }
                    _ => TokenKind::Less,
                };
                self.make_token(kind, start, position)
            }
            '>' => {
                self.advance();
                let kind = if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.make_token(kind, start, position)
            }
            '!' => {
                self.advance();
                let kind = if self.current_char == Some('=') {
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    TokenKind::Invalid('!')
                };
                self.make_token(kind, start, position)
            }
            other => self.single(TokenKind::Invalid(other), start, position),
        };

        Ok(token)
    }

    /// Tokenizes the whole input from the beginning. The returned vector
    /// always ends with a [`TokenKind::Eof`] token.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        self.reset();
        let strict = self.strict;
        let mut tokens = Vec::new();
        let mut dropped = 0usize;

        for token in self.by_ref() {
            let token = token?;
            if let TokenKind::Invalid(ch) = token.kind {
                if strict {
                    return Err(Error::Lexical {
                        message: format!("unrecognized character '{}'", ch),
                        position: token.position,
                    });
                }
                warn!(character = %ch, position = %token.position, "Dropping invalid token");
                dropped += 1;
                continue;
            }
            tokens.push(token);
        }

        debug!(tokens = tokens.len(), dropped, "Tokenized input");
        Ok(tokens)
    }
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        match &token {
            Ok(t) if t.is_eof() => self.finished = true,
            Err(_) => self.finished = true,
            _ => {}
        }
        Some(token)
    }
}
