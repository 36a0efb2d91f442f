//! Tokenizer for DBML text.
//!
//! Newlines are significant (column and ref declarations are line-delimited),
//! so they are emitted as tokens. Comments are dropped.

use crate::error::{ParseError, ParseErrorKind};
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    /// `"..."` quoted identifier.
    Quoted(String),
    /// `'...'` or `'''...'''` string literal.
    Str(String),
    /// `` `...` `` expression.
    Expr(String),
    Num(String),

    LBrace,   // {
    RBrace,   // }
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Colon,    // :
    Dot,      // .
    Gt,       // >
    Lt,       // <
    Dash,     // -
    LtGt,     // <>
    Symbol(char),
    Newline,

    Eof,
}

impl Token {
    /// Source-like text of the token, used when rebuilding raw constraint text.
    pub fn text(&self) -> String {
        match self {
            Token::Ident(s) | Token::Num(s) => s.clone(),
            Token::Quoted(s) => format!("\"{s}\""),
            Token::Str(s) => format!("'{s}'"),
            Token::Expr(s) => format!("`{s}`"),
            Token::LBrace => "{".into(),
            Token::RBrace => "}".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::LBracket => "[".into(),
            Token::RBracket => "]".into(),
            Token::Comma => ",".into(),
            Token::Colon => ":".into(),
            Token::Dot => ".".into(),
            Token::Gt => ">".into(),
            Token::Lt => "<".into(),
            Token::Dash => "-".into(),
            Token::LtGt => "<>".into(),
            Token::Symbol(c) => c.to_string(),
            Token::Newline => "\\n".into(),
            Token::Eof => String::new(),
        }
    }

    /// Identifier-like tokens: bare words and quoted names.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Token::Ident(s) | Token::Quoted(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(s) if s.eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Newline => write!(f, "end of line"),
            Token::Eof => write!(f, "end of input"),
            other => write!(f, "'{}'", other.text()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let line = self.skip_whitespace_and_comments()?;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(Spanned { token, line });
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    /// Skips blanks and comments, returning the line the next token starts on.
    fn skip_whitespace_and_comments(&mut self) -> Result<usize, ParseError> {
        loop {
            match self.chars.peek() {
                Some('\n') => break,
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek() {
                        Some('/') => {
                            while let Some(&c) = self.chars.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.chars.next();
                            }
                        }
                        Some('*') => {
                            let start = self.line;
                            self.chars.next();
                            self.chars.next();
                            let mut closed = false;
                            while let Some(c) = self.chars.next() {
                                if c == '\n' {
                                    self.line += 1;
                                } else if c == '*' && self.chars.peek() == Some(&'/') {
                                    self.chars.next();
                                    closed = true;
                                    break;
                                }
                            }
                            if !closed {
                                return Err(ParseError::new(
                                    start,
                                    ParseErrorKind::UnterminatedBlock { block: "comment" },
                                ));
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
        Ok(self.line)
    }

    fn read_while(&mut self, first: char, pred: impl Fn(char) -> bool) -> String {
        let mut s = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if pred(c) {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_number(&mut self, first: char) -> String {
        let mut s = self.read_while(first, |c| c.is_ascii_digit());
        let mut lookahead = self.chars.clone();
        if lookahead.next() == Some('.') && lookahead.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.chars.next();
            s.push('.');
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_digit() {
                    s.push(c);
                    self.chars.next();
                } else {
                    break;
                }
            }
        }
        s
    }

    fn read_delimited(&mut self, delimiter: char) -> Result<String, ParseError> {
        let start = self.line;
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some(c) if c == delimiter => return Ok(s),
                Some('\\') => {
                    if let Some(c) = self.chars.next() {
                        match c {
                            'n' => s.push('\n'),
                            't' => s.push('\t'),
                            _ => s.push(c),
                        }
                    }
                }
                Some('\n') => {
                    self.line += 1;
                    s.push('\n');
                }
                Some(c) => s.push(c),
                None => {
                    return Err(ParseError::new(start, ParseErrorKind::UnterminatedString));
                }
            }
        }
    }

    /// Single-quoted literal; `'''` opens a multi-line literal.
    fn read_single_quoted(&mut self) -> Result<String, ParseError> {
        let mut lookahead = self.chars.clone();
        if lookahead.next() == Some('\'') && lookahead.next() == Some('\'') {
            self.chars.next();
            self.chars.next();
            let start = self.line;
            let mut s = String::new();
            loop {
                match self.chars.next() {
                    Some('\'') => {
                        let mut rest = self.chars.clone();
                        if rest.next() == Some('\'') && rest.next() == Some('\'') {
                            self.chars.next();
                            self.chars.next();
                            return Ok(s.trim().to_string());
                        }
                        s.push('\'');
                    }
                    Some('\n') => {
                        self.line += 1;
                        s.push('\n');
                    }
                    Some(c) => s.push(c),
                    None => {
                        return Err(ParseError::new(start, ParseErrorKind::UnterminatedString));
                    }
                }
            }
        }
        self.read_delimited('\'')
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let c = match self.chars.next() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let tok = match c {
            '\n' => {
                self.line += 1;
                Token::Newline
            }
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '.' => Token::Dot,
            '>' => Token::Gt,
            '-' => Token::Dash,
            '<' => {
                if self.chars.peek() == Some(&'>') {
                    self.chars.next();
                    Token::LtGt
                } else {
                    Token::Lt
                }
            }
            '"' => Token::Quoted(self.read_delimited('"')?),
            '\'' => Token::Str(self.read_single_quoted()?),
            '`' => Token::Expr(self.read_delimited('`')?),
            '#' => Token::Ident(self.read_while('#', |c| c.is_alphanumeric() || c == '_')),
            c if c.is_ascii_digit() => Token::Num(self.read_number(c)),
            c if c.is_alphabetic() || c == '_' => {
                Token::Ident(self.read_while(c, |c| c.is_alphanumeric() || c == '_'))
            }
            c => Token::Symbol(c),
        };

        Ok(tok)
    }
}
