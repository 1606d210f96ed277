//! Single-line statement parser.
//!
//! # Responsibility
//! - Turn one physical declaration line into its `;`-separated statements.
//! - Tell lines that need their neighbours apart from complete lines that
//!   fall outside the supported statement set.
//!
//! # Invariants
//! - The parser never looks past the line it was given.
//! - An unclosed bracket, an unterminated string, a trailing backslash, a
//!   block header, or an indented continuation is always incomplete.

use crate::declaration::lexer::{tokenize, LexErrorKind, Token};
use crate::value::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One parsed declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Pass,
    Import(Vec<ImportItem>),
    FromImport {
        module: Vec<String>,
        names: Vec<ImportName>,
    },
    Assign {
        targets: Vec<String>,
        value: Expr,
    },
    Assert {
        test: Expr,
        message: Option<Expr>,
    },
    Del(Vec<String>),
    Expr(Expr),
}

/// `a.b.c [as alias]` in an `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportItem {
    pub path: Vec<String>,
    pub alias: Option<String>,
}

/// `name [as alias]` in a `from ... import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportName {
    /// Name bound in the namespace.
    pub fn binding(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Name(String),
    Attribute(Box<Expr>, String),
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Compare {
        left: Box<Expr>,
        op: CompareOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    UnexpectedIndent,
    UnterminatedString { offset: usize },
    LineContinuation,
    UnbalancedBrackets,
    BlockHeader,
    UnexpectedEnd(&'static str),
    InvalidToken { offset: usize, fragment: String },
    UnexpectedToken(String),
    UnsupportedStatement(String),
}

impl SyntaxError {
    /// True when the line only makes sense together with adjacent lines.
    ///
    /// Every other variant describes a complete line that this statement
    /// language does not support.
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedIndent
                | Self::UnterminatedString { .. }
                | Self::LineContinuation
                | Self::UnbalancedBrackets
                | Self::BlockHeader
                | Self::UnexpectedEnd(_)
        )
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedIndent => write!(f, "unexpected indent"),
            Self::UnterminatedString { offset } => {
                write!(f, "string opened at column {} is not closed", offset + 1)
            }
            Self::LineContinuation => write!(f, "backslash continues onto the next line"),
            Self::UnbalancedBrackets => write!(f, "brackets are not balanced on this line"),
            Self::BlockHeader => {
                write!(f, "block header needs an indented body on following lines")
            }
            Self::InvalidToken { offset, fragment } => {
                write!(f, "invalid token `{fragment}` at column {}", offset + 1)
            }
            Self::UnexpectedToken(token) => write!(f, "unexpected token {token}"),
            Self::UnexpectedEnd(expected) => {
                write!(f, "line ended early, expected {expected}")
            }
            Self::UnsupportedStatement(detail) => {
                write!(f, "unsupported statement: {detail}")
            }
        }
    }
}

impl Error for SyntaxError {}

/// Parses one physical line into its statements.
///
/// Blank and comment-only lines yield no statements. Incompleteness is
/// checked before grammar, so a line that both opens a bracket and uses an
/// unsupported operator is reported as incomplete.
pub fn parse_line(line: &str) -> Result<Vec<Statement>, SyntaxError> {
    if line.starts_with([' ', '\t']) && !line.trim().is_empty() {
        return Err(SyntaxError::UnexpectedIndent);
    }

    let lexed = tokenize(line);
    for err in &lexed.errors {
        match err.kind {
            LexErrorKind::UnterminatedString => {
                return Err(SyntaxError::UnterminatedString { offset: err.offset })
            }
            LexErrorKind::Continuation => return Err(SyntaxError::LineContinuation),
            LexErrorKind::UnknownCharacter => {}
        }
    }
    if !brackets_balanced(&lexed.tokens) {
        return Err(SyntaxError::UnbalancedBrackets);
    }
    if lexed.tokens.last() == Some(&Token::Colon) {
        return Err(SyntaxError::BlockHeader);
    }
    if let Some(err) = lexed.errors.into_iter().next() {
        return Err(SyntaxError::InvalidToken {
            offset: err.offset,
            fragment: err.fragment,
        });
    }

    let mut parser = LineParser {
        tokens: lexed.tokens,
        pos: 0,
    };
    let mut statements = Vec::new();
    while parser.peek().is_some() {
        statements.push(parser.statement()?);
        if !parser.eat(&Token::Semi) {
            break;
        }
    }
    parser.finish()?;
    Ok(statements)
}

fn brackets_balanced(tokens: &[Token]) -> bool {
    let mut open = Vec::new();
    for token in tokens {
        match token {
            Token::LParen | Token::LBracket | Token::LBrace => open.push(token),
            Token::RParen => {
                if open.pop() != Some(&Token::LParen) {
                    return false;
                }
            }
            Token::RBracket => {
                if open.pop() != Some(&Token::LBracket) {
                    return false;
                }
            }
            Token::RBrace => {
                if open.pop() != Some(&Token::LBrace) {
                    return false;
                }
            }
            _ => {}
        }
    }
    open.is_empty()
}

struct LineParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl LineParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect(&mut self, expected: Token, label: &'static str) -> Result<(), SyntaxError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(unexpected(&token)),
            None => Err(SyntaxError::UnexpectedEnd(label)),
        }
    }

    fn ident(&mut self, label: &'static str) -> Result<String, SyntaxError> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(name),
            Some(token) => Err(unexpected(&token)),
            None => Err(SyntaxError::UnexpectedEnd(label)),
        }
    }

    fn finish(&mut self) -> Result<(), SyntaxError> {
        match self.advance() {
            None => Ok(()),
            Some(token) => Err(unexpected(&token)),
        }
    }

    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        let Some(first) = self.peek().cloned() else {
            return Err(SyntaxError::UnexpectedEnd("statement"));
        };
        match first {
            Token::Pass => {
                self.pos += 1;
                Ok(Statement::Pass)
            }
            Token::Import => {
                self.pos += 1;
                self.import_items()
            }
            Token::From => {
                self.pos += 1;
                self.from_import()
            }
            Token::Assert => {
                self.pos += 1;
                let test = self.expression()?;
                let message = if self.eat(&Token::Comma) {
                    Some(self.expression()?)
                } else {
                    None
                };
                Ok(Statement::Assert { test, message })
            }
            Token::Del => {
                self.pos += 1;
                let mut names = vec![self.ident("name to delete")?];
                while self.eat(&Token::Comma) {
                    names.push(self.ident("name to delete")?);
                }
                Ok(Statement::Del(names))
            }
            Token::Reserved => Err(SyntaxError::UnsupportedStatement(
                "compound and control-flow statements are not supported".to_string(),
            )),
            _ => self.assignment_or_expression(),
        }
    }

    fn import_items(&mut self) -> Result<Statement, SyntaxError> {
        let mut items = Vec::new();
        loop {
            let path = self.dotted_path()?;
            let alias = if self.eat(&Token::As) {
                Some(self.ident("alias after `as`")?)
            } else {
                None
            };
            items.push(ImportItem { path, alias });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(Statement::Import(items))
    }

    fn from_import(&mut self) -> Result<Statement, SyntaxError> {
        let module = self.dotted_path()?;
        self.expect(Token::Import, "`import`")?;

        let parenthesized = self.eat(&Token::LParen);
        let mut names = Vec::new();
        loop {
            if parenthesized && !names.is_empty() && self.peek() == Some(&Token::RParen) {
                break;
            }
            let name = self.ident("imported name")?;
            let alias = if self.eat(&Token::As) {
                Some(self.ident("alias after `as`")?)
            } else {
                None
            };
            names.push(ImportName { name, alias });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        if parenthesized {
            self.expect(Token::RParen, "`)` closing the import list")?;
        }
        Ok(Statement::FromImport { module, names })
    }

    fn dotted_path(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut path = vec![self.ident("module name")?];
        while self.eat(&Token::Dot) {
            path.push(self.ident("module name after `.`")?);
        }
        Ok(path)
    }

    fn assignment_or_expression(&mut self) -> Result<Statement, SyntaxError> {
        let mut exprs = vec![self.expression()?];
        while self.eat(&Token::Assign) {
            exprs.push(self.expression()?);
        }
        let Some(value) = exprs.pop() else {
            return Err(SyntaxError::UnexpectedEnd("expression"));
        };
        if exprs.is_empty() {
            return Ok(Statement::Expr(value));
        }

        let mut targets = Vec::with_capacity(exprs.len());
        for target in exprs {
            match target {
                Expr::Name(name) => targets.push(name),
                _ => {
                    return Err(SyntaxError::UnsupportedStatement(
                        "only plain names can be assigned".to_string(),
                    ))
                }
            }
        }
        Ok(Statement::Assign { targets, value })
    }

    fn expression(&mut self) -> Result<Expr, SyntaxError> {
        let left = self.postfix()?;
        let op = if self.eat(&Token::EqEq) {
            CompareOp::Eq
        } else if self.eat(&Token::NotEq) {
            CompareOp::NotEq
        } else {
            return Ok(left);
        };
        let right = self.postfix()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.atom()?;
        while self.eat(&Token::Dot) {
            let attr = self.ident("attribute name")?;
            expr = Expr::Attribute(Box::new(expr), attr);
        }
        Ok(expr)
    }

    fn atom(&mut self) -> Result<Expr, SyntaxError> {
        let Some(token) = self.advance() else {
            return Err(SyntaxError::UnexpectedEnd("expression"));
        };
        match token {
            Token::NoneLit => Ok(Expr::Literal(Value::None)),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Int(digits) => int_literal(&digits),
            Token::Float(value) => Ok(Expr::Literal(Value::Float(value))),
            Token::Str(value) => Ok(Expr::Literal(Value::Str(value))),
            Token::Ident(name) => Ok(Expr::Name(name)),
            Token::Minus => match self.advance() {
                Some(Token::Int(digits)) => int_literal(&format!("-{digits}")),
                Some(Token::Float(value)) => Ok(Expr::Literal(Value::Float(-value))),
                Some(token) => Err(unexpected(&token)),
                None => Err(SyntaxError::UnexpectedEnd("number after `-`")),
            },
            Token::LBracket => {
                let items = self.sequence(&Token::RBracket, "`]` closing the list")?;
                Ok(Expr::List(items))
            }
            Token::LParen => {
                if self.eat(&Token::RParen) {
                    return Ok(Expr::Tuple(Vec::new()));
                }
                let first = self.expression()?;
                if self.eat(&Token::RParen) {
                    return Ok(first);
                }
                self.expect(Token::Comma, "`,` or `)`")?;
                let mut items = vec![first];
                items.extend(self.sequence(&Token::RParen, "`)` closing the tuple")?);
                Ok(Expr::Tuple(items))
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Comma-separated items up to `close`, allowing one trailing comma.
    fn sequence(&mut self, close: &Token, label: &'static str) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            if self.peek().is_none() {
                return Err(SyntaxError::UnexpectedEnd(label));
            }
            items.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return match self.advance() {
                Some(token) => Err(unexpected(&token)),
                None => Err(SyntaxError::UnexpectedEnd(label)),
            };
        }
    }
}

fn int_literal(digits: &str) -> Result<Expr, SyntaxError> {
    digits
        .parse::<i64>()
        .map(|value| Expr::Literal(Value::Int(value)))
        .map_err(|_| {
            SyntaxError::UnsupportedStatement(format!(
                "integer literal `{digits}` does not fit in 64 bits"
            ))
        })
}

fn unexpected(token: &Token) -> SyntaxError {
    SyntaxError::UnexpectedToken(format!("{token:?}"))
}
