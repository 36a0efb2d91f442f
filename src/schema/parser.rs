//! # DBML Parser
//!
//! Recursive-descent parser over the token stream produced by
//! [`Lexer`](super::lexer::Lexer). Single forward pass, no backtracking beyond
//! one-token lookahead.
//!
//! Grammar accepted (keywords are case-insensitive):
//!
//! ```text
//! schema   := { table | ref | enum | skipped_block | NEWLINE }
//! table    := "table" name ["as" name] [settings] "{" { column | note | indexes } "}"
//! column   := name type ["(" args ")"] { settings | bare_constraint } NEWLINE
//! ref      := "ref" [name] ":" endpoint op endpoint [settings]
//!           | "ref" [name] "{" { endpoint op endpoint } "}"
//! enum     := "enum" name "{" value { ("," | NEWLINE) value } "}"
//! endpoint := name { "." name }        (last two segments are table.column)
//! op       := ">" | "<" | "-" | "<>"
//! ```
//!
//! The parser is permissive about types (anything is accepted and kept
//! verbatim) and fails only on structure it cannot place into the model.

use super::lexer::{Lexer, Spanned, Token};
use super::types::{
    Column, ColumnReference, EnumDef, Index, ParsedSchema, Relationship, RelationshipKind, Table,
};
use crate::error::{ParseError, ParseErrorKind};
use tracing::{debug, instrument};

/// Parses DBML text into a [`ParsedSchema`].
#[instrument(skip(text), fields(bytes = text.len()))]
pub fn parse(text: &str) -> Result<ParsedSchema, ParseError> {
    let schema = Parser::new(text)?.parse()?;
    debug!(
        tables = schema.tables.len(),
        relationships = schema.relationships.len(),
        enums = schema.enums.len(),
        "Parsed DBML schema"
    );
    Ok(schema)
}

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    schema: ParsedSchema,
}

impl Parser {
    pub fn new(input: &str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Self {
            tokens,
            pos: 0,
            schema: ParsedSchema::default(),
        })
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    /// `Ref:` or `Ref name:` at the cursor, as opposed to a column named `ref`.
    fn at_ref_declaration(&self) -> bool {
        match self.peek_at(1) {
            Token::Colon | Token::LBrace => true,
            tok if tok.as_name().is_some() => {
                matches!(self.peek_at(2), Token::Colon | Token::LBrace)
            }
            _ => false,
        }
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens
            .get(self.pos + offset)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|s| s.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while *self.peek() == Token::Newline {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::new(
            self.line(),
            ParseErrorKind::Unexpected {
                found: self.peek().to_string(),
                expected,
            },
        )
    }

    fn expect(&mut self, expected: Token, what: &'static str) -> Result<(), ParseError> {
        if *self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    /// Consumes a possibly schema-qualified name and returns its last segment.
    fn parse_name(&mut self) -> Option<String> {
        let mut name = self.peek().as_name()?.to_string();
        self.advance();
        while *self.peek() == Token::Dot && self.peek_at(1).as_name().is_some() {
            self.advance();
            if let Some(segment) = self.advance().as_name() {
                name = segment.to_string();
            }
        }
        Some(name)
    }

    pub fn parse(mut self) -> Result<ParsedSchema, ParseError> {
        loop {
            self.skip_newlines();
            let tok = self.peek().clone();
            if tok == Token::Eof {
                break;
            }

            if tok.is_keyword("table") {
                self.advance();
                let table = self.parse_table()?;
                self.schema.tables.push(table);
            } else if tok.is_keyword("ref") {
                self.advance();
                self.parse_ref_declaration()?;
            } else if tok.is_keyword("enum") {
                self.advance();
                let def = self.parse_enum()?;
                self.schema.enums.push(def);
            } else {
                self.skip_unknown_statement()?;
            }
        }
        Ok(self.schema)
    }

    /// `Project`, `TableGroup` and anything else unrecognised: skip the line,
    /// and the whole brace block if the line opens one.
    fn skip_unknown_statement(&mut self) -> Result<(), ParseError> {
        let line = self.line();
        debug!(line = line, token = %self.peek(), "Skipping unrecognised statement");
        loop {
            match self.peek() {
                Token::Newline | Token::Eof => return Ok(()),
                Token::LBrace => return self.skip_block(line),
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_block(&mut self, start_line: usize) -> Result<(), ParseError> {
        let mut depth = 0usize;
        loop {
            match self.advance() {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Token::Eof => {
                    return Err(ParseError::new(
                        start_line,
                        ParseErrorKind::UnterminatedBlock { block: "statement" },
                    ));
                }
                _ => {}
            }
        }
    }

    /// Skips a `[...]` list whose opening bracket is the current token.
    fn skip_settings(&mut self) -> Result<(), ParseError> {
        let line = self.line();
        self.advance();
        loop {
            match self.advance() {
                Token::RBracket => return Ok(()),
                Token::Eof => {
                    return Err(ParseError::new(
                        line,
                        ParseErrorKind::UnterminatedBlock { block: "settings" },
                    ));
                }
                _ => {}
            }
        }
    }

    fn parse_table(&mut self) -> Result<Table, ParseError> {
        let start_line = self.line();
        let name = self
            .parse_name()
            .ok_or_else(|| ParseError::new(start_line, ParseErrorKind::MissingTableName))?;
        let mut table = Table::new(name);

        if self.peek().is_keyword("as") {
            self.advance();
            table.alias = self.parse_name();
        }
        if *self.peek() == Token::LBracket {
            self.skip_settings()?;
        }

        self.skip_newlines();
        self.expect(Token::LBrace, "'{' after table name")?;

        loop {
            self.skip_newlines();
            let tok = self.peek().clone();
            match tok {
                Token::RBrace => {
                    self.advance();
                    break;
                }
                Token::Eof => {
                    return Err(ParseError::new(
                        start_line,
                        ParseErrorKind::UnterminatedBlock { block: "table" },
                    ));
                }
                ref t if t.is_keyword("note") && matches!(self.peek_at(1), Token::Colon) => {
                    self.advance();
                    self.advance();
                    table.note = self.parse_note_value();
                }
                ref t if t.is_keyword("note") && matches!(self.peek_at(1), Token::LBrace) => {
                    self.advance();
                    self.advance();
                    self.skip_newlines();
                    table.note = self.parse_note_value();
                    self.skip_newlines();
                    self.expect(Token::RBrace, "'}' closing note")?;
                }
                ref t if t.is_keyword("indexes") && matches!(self.peek_at(1), Token::LBrace) => {
                    self.advance();
                    self.advance();
                    table.indexes = self.parse_indexes(start_line)?;
                }
                ref t if t.is_keyword("ref") && self.at_ref_declaration() => {
                    return Err(self.unexpected(
                        "a column definition; Ref declarations belong outside table blocks",
                    ));
                }
                ref t if t.as_name().is_some() => {
                    let column = self.parse_column(&table.name)?;
                    table.columns.push(column);
                }
                _ => return Err(self.unexpected("column definition")),
            }
        }

        Ok(table)
    }

    fn parse_note_value(&mut self) -> Option<String> {
        match self.peek().clone() {
            Token::Str(s) | Token::Quoted(s) => {
                self.advance();
                Some(s)
            }
            _ => None,
        }
    }

    fn parse_indexes(&mut self, table_line: usize) -> Result<Vec<Index>, ParseError> {
        let mut indexes = Vec::new();
        loop {
            self.skip_newlines();
            match self.peek().clone() {
                Token::RBrace => {
                    self.advance();
                    return Ok(indexes);
                }
                Token::Eof => {
                    return Err(ParseError::new(
                        table_line,
                        ParseErrorKind::UnterminatedBlock { block: "indexes" },
                    ));
                }
                Token::LParen => {
                    self.advance();
                    let mut columns = Vec::new();
                    loop {
                        match self.advance() {
                            Token::RParen => break,
                            Token::Comma => {}
                            Token::Eof | Token::Newline => {
                                return Err(self.unexpected("')' closing index columns"));
                            }
                            other => columns.push(unquote(&other)),
                        }
                    }
                    let settings = self.parse_index_settings()?;
                    indexes.push(Index { columns, settings });
                }
                other => {
                    self.advance();
                    let settings = self.parse_index_settings()?;
                    indexes.push(Index {
                        columns: vec![unquote(&other)],
                        settings,
                    });
                }
            }
        }
    }

    fn parse_index_settings(&mut self) -> Result<Vec<String>, ParseError> {
        if *self.peek() != Token::LBracket {
            return Ok(Vec::new());
        }
        let groups = self.collect_settings()?;
        Ok(groups.iter().map(|g| join_tokens(g)).collect())
    }

    /// Reads a `[a, b: c, ...]` list into comma-separated token groups.
    fn collect_settings(&mut self) -> Result<Vec<Vec<Token>>, ParseError> {
        let line = self.line();
        self.advance();
        let mut groups = Vec::new();
        let mut current = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.advance() {
                Token::RBracket if depth == 0 => break,
                Token::Comma if depth == 0 => {
                    if !current.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                }
                Token::Newline => {}
                Token::Eof => {
                    return Err(ParseError::new(
                        line,
                        ParseErrorKind::UnterminatedBlock { block: "settings" },
                    ));
                }
                tok => {
                    match tok {
                        Token::LParen => depth += 1,
                        Token::RParen => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    current.push(tok);
                }
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }
        Ok(groups)
    }

    fn parse_column(&mut self, table_name: &str) -> Result<Column, ParseError> {
        let line = self.line();
        let name = self.advance().as_name().unwrap_or_default().to_string();

        let mut data_type = match self.peek().as_name() {
            Some(_) => self.parse_name().unwrap_or_default(),
            None => {
                return Err(ParseError::new(
                    line,
                    ParseErrorKind::MissingColumnType { column: name },
                ));
            }
        };
        if *self.peek() == Token::LParen {
            self.advance();
            let mut args = Vec::new();
            loop {
                match self.advance() {
                    Token::RParen => break,
                    Token::Comma => {}
                    Token::Newline | Token::Eof => {
                        return Err(ParseError::new(
                            line,
                            ParseErrorKind::Unexpected {
                                found: "end of line".into(),
                                expected: "')' closing type arguments",
                            },
                        ));
                    }
                    tok => args.push(tok.text()),
                }
            }
            data_type = format!("{}({})", data_type, args.join(","));
        }

        let mut column = Column::new(name, data_type);

        loop {
            match self.peek().clone() {
                Token::Newline | Token::Eof | Token::RBrace => break,
                Token::LBracket => {
                    for group in self.collect_settings()? {
                        self.apply_setting(table_name, &mut column, &group, line)?;
                    }
                }
                Token::Ident(word) => {
                    self.advance();
                    self.apply_bare_constraint(&mut column, &word);
                }
                _ => return Err(self.unexpected("column setting")),
            }
        }

        Ok(column)
    }

    /// Constraint words written after the type without brackets.
    fn apply_bare_constraint(&mut self, column: &mut Column, word: &str) {
        let lower = word.to_lowercase();
        let follower = self.peek().clone();
        match lower.as_str() {
            "pk" => column.primary_key = true,
            "primary" if follower.is_keyword("key") => {
                self.advance();
                column.primary_key = true;
                column.constraints.push("primary key".into());
                return;
            }
            "not" if follower.is_keyword("null") => {
                self.advance();
                column.not_null = true;
                column.constraints.push("not null".into());
                return;
            }
            "unique" => column.unique = true,
            _ => {}
        }
        column.constraints.push(lower);
    }

    fn apply_setting(
        &mut self,
        table_name: &str,
        column: &mut Column,
        group: &[Token],
        line: usize,
    ) -> Result<(), ParseError> {
        let raw = join_tokens(group);
        let words: Vec<String> = group
            .iter()
            .take_while(|t| **t != Token::Colon)
            .map(|t| t.text().to_lowercase())
            .collect();
        let value = group
            .iter()
            .position(|t| *t == Token::Colon)
            .map(|i| &group[i + 1..]);

        match (words.join(" ").as_str(), value) {
            ("pk", None) | ("primary key", None) => column.primary_key = true,
            ("not null", None) => column.not_null = true,
            ("unique", None) => column.unique = true,
            ("default", Some(rest)) => column.default_value = Some(default_text(rest)),
            ("note", Some(rest)) => {
                column.note = rest.first().map(unquote);
            }
            ("ref", Some(rest)) => {
                let (kind, target) = parse_inline_ref(rest, line)?;
                column.references = Some(target.clone());
                self.push_relationship(Relationship {
                    kind,
                    from_table: table_name.to_string(),
                    from_column: column.name.clone(),
                    to_table: target.table,
                    to_column: target.column,
                });
            }
            _ => {}
        }
        column.constraints.push(raw);
        Ok(())
    }

    fn push_relationship(&mut self, relationship: Relationship) {
        if !self.schema.relationships.contains(&relationship) {
            self.schema.relationships.push(relationship);
        }
    }

    fn parse_ref_declaration(&mut self) -> Result<(), ParseError> {
        if self.peek().as_name().is_some() {
            self.advance();
        }
        match self.peek() {
            Token::Colon => {
                self.advance();
                self.parse_ref_line()
            }
            Token::LBrace => {
                let start_line = self.line();
                self.advance();
                loop {
                    self.skip_newlines();
                    match self.peek() {
                        Token::RBrace => {
                            self.advance();
                            return Ok(());
                        }
                        Token::Eof => {
                            return Err(ParseError::new(
                                start_line,
                                ParseErrorKind::UnterminatedBlock { block: "ref" },
                            ));
                        }
                        _ => self.parse_ref_line()?,
                    }
                }
            }
            _ => Err(self.unexpected("':' or '{' after Ref")),
        }
    }

    /// `a.b > c.d [settings]` up to the end of the line.
    fn parse_ref_line(&mut self) -> Result<(), ParseError> {
        let line = self.line();
        let mut tokens = Vec::new();
        loop {
            match self.peek() {
                Token::Newline | Token::Eof | Token::RBrace => break,
                Token::LBracket => {
                    self.skip_settings()?;
                }
                _ => tokens.push(self.advance()),
            }
        }

        let op_index = tokens
            .iter()
            .position(is_ref_operator)
            .ok_or_else(|| {
                ParseError::new(
                    line,
                    ParseErrorKind::MalformedReference(join_tokens(&tokens)),
                )
            })?;
        let kind = operator_kind(&tokens[op_index]);
        let from = parse_endpoint(&tokens[..op_index], line)?;
        let to = parse_endpoint(&tokens[op_index + 1..], line)?;

        self.push_relationship(Relationship {
            kind,
            from_table: from.table,
            from_column: from.column,
            to_table: to.table,
            to_column: to.column,
        });
        Ok(())
    }

    fn parse_enum(&mut self) -> Result<EnumDef, ParseError> {
        let start_line = self.line();
        let name = self
            .parse_name()
            .ok_or_else(|| self.unexpected("enum name"))?;
        self.skip_newlines();
        self.expect(Token::LBrace, "'{' after enum name")?;

        let mut values = Vec::new();
        loop {
            match self.advance() {
                Token::RBrace => break,
                Token::Comma | Token::Newline => {}
                Token::LBracket => {
                    self.pos -= 1;
                    self.skip_settings()?;
                }
                Token::Eof => {
                    return Err(ParseError::new(
                        start_line,
                        ParseErrorKind::UnterminatedBlock { block: "enum" },
                    ));
                }
                tok => values.push(unquote(&tok)),
            }
        }

        Ok(EnumDef { name, values })
    }
}

fn is_ref_operator(tok: &Token) -> bool {
    matches!(tok, Token::Gt | Token::Lt | Token::Dash | Token::LtGt)
}

fn operator_kind(tok: &Token) -> RelationshipKind {
    RelationshipKind::from_operator(&tok.text()).unwrap_or(RelationshipKind::ManyToOne)
}

/// `schema.table.column` or `table.column`; the last two segments win.
fn parse_endpoint(tokens: &[Token], line: usize) -> Result<ColumnReference, ParseError> {
    let malformed = || ParseError::new(line, ParseErrorKind::MalformedReference(join_tokens(tokens)));

    let mut segments = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        if i % 2 == 0 {
            segments.push(tok.as_name().ok_or_else(malformed)?.to_string());
        } else if *tok != Token::Dot {
            return Err(malformed());
        }
    }
    if segments.len() < 2 || tokens.len() % 2 == 0 {
        return Err(malformed());
    }
    let column = segments.pop().ok_or_else(malformed)?;
    let table = segments.pop().ok_or_else(malformed)?;
    Ok(ColumnReference { table, column })
}

/// Inline `ref: > table.column` value, read from the owning column's side.
fn parse_inline_ref(
    tokens: &[Token],
    line: usize,
) -> Result<(RelationshipKind, ColumnReference), ParseError> {
    match tokens.split_first() {
        Some((op, rest)) if is_ref_operator(op) => Ok((operator_kind(op), parse_endpoint(rest, line)?)),
        _ => Err(ParseError::new(
            line,
            ParseErrorKind::MalformedReference(join_tokens(tokens)),
        )),
    }
}

fn unquote(tok: &Token) -> String {
    match tok {
        Token::Ident(s) | Token::Quoted(s) | Token::Str(s) | Token::Expr(s) | Token::Num(s) => {
            s.clone()
        }
        other => other.text(),
    }
}

/// Default values keep their literal form, except quoted strings lose the quotes.
fn default_text(tokens: &[Token]) -> String {
    match tokens {
        [Token::Str(s)] => s.clone(),
        [Token::Dash, Token::Num(n)] => format!("-{n}"),
        _ => join_tokens(tokens),
    }
}

/// Rebuilds source-like text: words separated by spaces, punctuation tight.
fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        let tight = matches!(
            tok,
            Token::Dot | Token::Comma | Token::Colon | Token::LParen | Token::RParen
        );
        if !out.is_empty() && !tight && !out.ends_with('.') && !out.ends_with('(') {
            out.push(' ');
        }
        out.push_str(&tok.text());
    }
    out
}
