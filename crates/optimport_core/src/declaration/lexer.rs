//! Single-line tokenizer for declaration statements.

use logos::Logos;

/// Tokens of one declaration line.
///
/// Strings never span a newline, so an unterminated or triple-quoted literal
/// surfaces as a lexing error for the line that opens it. Integer digits are
/// kept as text; range checking belongs to the parser.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f]+|#[^\r\n]*")]
pub enum Token {
    #[token("import")]
    Import,
    #[token("from")]
    From,
    #[token("as")]
    As,
    #[token("assert")]
    Assert,
    #[token("del")]
    Del,
    #[token("pass")]
    Pass,
    #[token("None")]
    NoneLit,
    #[token("True")]
    True,
    #[token("False")]
    False,

    // Compound or unsupported statements; always rejected by the parser.
    #[token("def")]
    #[token("class")]
    #[token("if")]
    #[token("elif")]
    #[token("else")]
    #[token("try")]
    #[token("except")]
    #[token("finally")]
    #[token("for")]
    #[token("while")]
    #[token("with")]
    #[token("lambda")]
    #[token("return")]
    #[token("yield")]
    #[token("raise")]
    #[token("global")]
    #[token("nonlocal")]
    Reserved,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    #[regex(r"[0-9]+", |lex| lex.slice().to_string())]
    Int(String),
    #[regex(r"[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),
    #[regex(r#""([^"\\\r\n]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r#"'([^'\\\r\n]|\\.)*'"#, |lex| unquote(lex.slice()))]
    Str(String),

    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("=")]
    Assign,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token("-")]
    Minus,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
}

/// Why a fragment of the line could not be tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A quote with no closing quote on the same line.
    UnterminatedString,
    /// A trailing backslash joining the next physical line.
    Continuation,
    UnknownCharacter,
}

/// Lexing failure with the byte offset where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
    pub fragment: String,
}

/// Tokens of one physical line plus every fragment that failed to lex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LexedLine {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Tokenizes one physical line, continuing past invalid fragments.
pub fn tokenize(line: &str) -> LexedLine {
    let mut lexer = Token::lexer(line);
    let mut lexed = LexedLine::default();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => lexed.tokens.push(token),
            Err(()) => {
                let fragment = lexer.slice().to_string();
                let kind = if fragment.starts_with(['\'', '"']) {
                    LexErrorKind::UnterminatedString
                } else if fragment.starts_with('\\') && lexer.remainder().trim().is_empty() {
                    LexErrorKind::Continuation
                } else {
                    LexErrorKind::UnknownCharacter
                };
                lexed.errors.push(LexError {
                    kind,
                    offset: lexer.span().start,
                    fragment,
                });
            }
        }
    }
    lexed
}

fn unquote(raw: &str) -> Option<String> {
    let inner = raw.get(1..raw.len().checked_sub(1)?)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            other @ ('\\' | '\'' | '"') => out.push(other),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}
