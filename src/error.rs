//! Error types for parsing the graph serialization grammar

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    /// A prefixed name used a prefix no `@prefix` directive declared.
    #[error("Unknown namespace prefix '{prefix}:' at {span:?}")]
    UnknownPrefix { prefix: String, span: Span },
}

impl ParseError {
    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let (span, label_message) = match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                (span, format!("{}{}", message, expected_str))
            }
            ParseError::UnknownPrefix { prefix, span } => (
                span,
                format!("no @prefix directive declares '{}:'", prefix),
            ),
        };

        Report::build(ReportKind::Error, filename, span.start)
            .with_message(label_message.clone())
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(label_message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::graph::lexer::Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::graph::lexer::Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "Unexpected end of input".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::graph::lexer::Token) -> String {
    use crate::graph::lexer::Token;
    match tok {
        Token::Iri(iri) => format!("IRI <{}>", iri),
        Token::PNameLn(name) => format!("prefixed name '{}'", name),
        Token::PNameNs(prefix) => format!("prefix label '{}:'", prefix),
        Token::BlankLabel(label) => format!("blank node '_:{}'", label),
        Token::StringLit(s) => format!("string \"{}\"", s),
        Token::LangTag(tag) => format!("language tag '@{}'", tag),
        Token::Integer(n) => format!("number {}", n),
        Token::Decimal(n) => format!("number {}", n),
        Token::PrefixDecl => "'@prefix'".to_string(),
        Token::A => "keyword 'a'".to_string(),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Semicolon => "';'".to_string(),
        Token::Comma => "','".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::DoubleCaret => "'^^'".to_string(),
    }
}
