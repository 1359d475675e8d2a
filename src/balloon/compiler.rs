//! Balloon template compiler
//!
//! A template is HTML with `<3DCityDB>...</3DCityDB>` spans. Compilation
//! tokenizes the text into literal and marker tokens, parses balanced spans
//! recursively, and turns every top-level span into a [`BalloonStatement`].
//! Literal text between spans becomes a chunk, so a template with N
//! statements always has N + 1 chunks.

use super::sql;
use super::statement::{BalloonStatement, Segment};
use crate::domain::{CityKmlError, Result, TemplateError};
use std::path::Path;

/// Opening marker of a statement span (matched case-insensitively)
pub const START_MARKER: &str = "<3DCityDB>";

/// Closing marker of a statement span (matched case-insensitively)
pub const END_MARKER: &str = "</3DCityDB>";

/// A template ready for rendering
///
/// Built once and shared between workers; the statements memoize their SQL
/// internally.
#[derive(Debug)]
pub struct CompiledTemplate {
    chunks: Vec<String>,
    statements: Vec<BalloonStatement>,
}

impl CompiledTemplate {
    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn statements(&self) -> &[BalloonStatement] {
        &self.statements
    }

    /// True if the template contains no statements at all
    pub fn is_static(&self) -> bool {
        self.statements.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Text,
    Open,
    Close,
}

#[derive(Debug, Clone, Copy)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn tokenize(source: &str) -> Vec<Token> {
    // ASCII lowercasing keeps byte offsets intact
    let lower = source.to_ascii_lowercase();
    let open = START_MARKER.to_ascii_lowercase();
    let close = END_MARKER.to_ascii_lowercase();

    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(found) = lower[pos..].find('<') {
        let at = pos + found;
        let rest = &lower[at..];
        let marker = if rest.starts_with(&open) {
            Some((TokenKind::Open, open.len()))
        } else if rest.starts_with(&close) {
            Some((TokenKind::Close, close.len()))
        } else {
            None
        };

        match marker {
            Some((kind, len)) => {
                if text_start < at {
                    tokens.push(Token {
                        kind: TokenKind::Text,
                        start: text_start,
                        end: at,
                    });
                }
                tokens.push(Token {
                    kind,
                    start: at,
                    end: at + len,
                });
                pos = at + len;
                text_start = pos;
            }
            None => pos = at + 1,
        }
    }

    if text_start < source.len() {
        tokens.push(Token {
            kind: TokenKind::Text,
            start: text_start,
            end: source.len(),
        });
    }

    tokens
}

#[derive(Debug)]
enum Node {
    Text { start: usize, end: usize },
    Span(Span),
}

#[derive(Debug)]
struct Span {
    open: usize,
    content_start: usize,
    content_end: usize,
    close_end: usize,
    children: Vec<Node>,
}

impl Span {
    fn has_inner_spans(&self) -> bool {
        self.children.iter().any(|c| matches!(c, Node::Span(_)))
    }

    fn raw<'a>(&self, source: &'a str) -> &'a str {
        &source[self.content_start..self.content_end]
    }
}

struct Parser {
    tokens: std::vec::IntoIter<Token>,
}

impl Parser {
    fn parse_top_level(&mut self) -> std::result::Result<Vec<Node>, TemplateError> {
        let mut nodes = Vec::new();
        while let Some(token) = self.tokens.next() {
            match token.kind {
                // A stray end marker outside any span is literal text
                TokenKind::Text | TokenKind::Close => nodes.push(Node::Text {
                    start: token.start,
                    end: token.end,
                }),
                TokenKind::Open => nodes.push(Node::Span(self.parse_span(token)?)),
            }
        }
        Ok(nodes)
    }

    fn parse_span(&mut self, open: Token) -> std::result::Result<Span, TemplateError> {
        let mut children = Vec::new();
        while let Some(token) = self.tokens.next() {
            match token.kind {
                TokenKind::Text => children.push(Node::Text {
                    start: token.start,
                    end: token.end,
                }),
                TokenKind::Open => children.push(Node::Span(self.parse_span(token)?)),
                TokenKind::Close => {
                    return Ok(Span {
                        open: open.start,
                        content_start: open.end,
                        content_end: token.start,
                        close_end: token.end,
                        children,
                    })
                }
            }
        }
        Err(TemplateError::syntax(
            open.start,
            "start marker has no matching end marker",
        ))
    }
}

fn is_end_foreach(raw: &str) -> bool {
    let words: Vec<&str> = raw.split_whitespace().collect();
    match words.as_slice() {
        [one] => one.eq_ignore_ascii_case("ENDFOREACH"),
        [end, foreach] => end.eq_ignore_ascii_case("END") && foreach.eq_ignore_ascii_case("FOREACH"),
        _ => false,
    }
}

fn build_statement(source: &str, span: &Span) -> BalloonStatement {
    let raw = span.raw(source);
    if !span.has_inner_spans() {
        return BalloonStatement::simple(raw);
    }

    let segments = span
        .children
        .iter()
        .map(|child| match child {
            Node::Text { start, end } => Segment::Text(source[*start..*end].to_string()),
            Node::Span(inner) => Segment::Inner(Box::new(build_statement(source, inner))),
        })
        .collect();
    BalloonStatement::nested(raw, segments)
}

/// Compiles template text
///
/// # Errors
///
/// Returns `TemplateError::Syntax` when a start marker has no matching end
/// marker, a FOREACH block is not closed by ENDFOREACH, or an ENDFOREACH
/// appears without a FOREACH.
///
/// # Examples
///
/// ```
/// use citykml::balloon::compile;
///
/// let template = compile("<b><3DCityDB>BUILDING/NAME</3DCityDB></b>").unwrap();
/// assert_eq!(template.chunks(), &["<b>".to_string(), "</b>".to_string()]);
/// assert_eq!(template.statements().len(), 1);
/// ```
pub fn compile(source: &str) -> std::result::Result<CompiledTemplate, TemplateError> {
    let mut parser = Parser {
        tokens: tokenize(source).into_iter(),
    };
    let nodes = parser.parse_top_level()?;

    let mut chunks = Vec::new();
    let mut statements = Vec::new();
    let mut chunk = String::new();
    let mut nodes = nodes.into_iter();

    while let Some(node) = nodes.next() {
        let span = match node {
            Node::Text { start, end } => {
                chunk.push_str(&source[start..end]);
                continue;
            }
            Node::Span(span) => span,
        };

        let raw = span.raw(source);
        if is_end_foreach(raw) {
            return Err(TemplateError::syntax(
                span.open,
                "ENDFOREACH without a preceding FOREACH",
            ));
        }

        let statement = if sql::strip_foreach(raw).is_some() {
            if span.has_inner_spans() {
                return Err(TemplateError::syntax(
                    span.open,
                    "FOREACH header cannot contain nested statements",
                ));
            }

            let end = loop {
                match nodes.next() {
                    Some(Node::Text { .. }) => continue,
                    Some(Node::Span(next)) if is_end_foreach(next.raw(source)) => break next,
                    Some(Node::Span(next)) => {
                        return Err(TemplateError::syntax(
                            next.open,
                            "FOREACH block must be closed before the next statement",
                        ))
                    }
                    None => {
                        return Err(TemplateError::syntax(
                            span.open,
                            "FOREACH block lacks its closing ENDFOREACH marker",
                        ))
                    }
                }
            };

            BalloonStatement::foreach(raw, &source[span.close_end..end.open])
        } else {
            build_statement(source, &span)
        };

        chunks.push(std::mem::take(&mut chunk));
        statements.push(statement);
    }

    chunks.push(chunk);
    Ok(CompiledTemplate { chunks, statements })
}

/// Reads and compiles a template file
///
/// # Errors
///
/// Returns `CityKmlError::Io` if the file cannot be read and
/// `CityKmlError::Template` if it does not compile.
pub fn compile_file(path: impl AsRef<Path>) -> Result<CompiledTemplate> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|e| {
        CityKmlError::Io(format!("Failed to read template {}: {}", path.display(), e))
    })?;
    Ok(compile(&source)?)
}
