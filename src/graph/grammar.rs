//! Parser implementation for the graph serialization grammar using chumsky
//!
//! Parsing happens in two passes: chumsky builds a statement list with
//! unresolved prefixed names, then a resolution pass walks the statements in
//! document order, tracking `@prefix` directives and expanding every prefixed
//! name to a full IRI. Anonymous blank-node property lists are flattened into
//! triples during resolution.

use std::collections::BTreeMap;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{ParseError, Span};
use crate::graph::lexer::{self, Token};
use crate::graph::{Term, Triple};
use crate::namespaces::{RDF_TYPE, XSD_BOOLEAN, XSD_DECIMAL, XSD_INTEGER};

/// An IRI-valued name, possibly still prefixed
#[derive(Debug, Clone)]
enum Name {
    Iri(String),
    Prefixed {
        prefix: String,
        local: String,
        span: Span,
    },
    Blank(String),
}

#[derive(Debug, Clone)]
struct LiteralAst {
    lexical: String,
    datatype: Option<Name>,
    language: Option<String>,
}

#[derive(Debug, Clone)]
enum ObjectAst {
    Name(Name),
    Literal(LiteralAst),
    /// Anonymous blank node carrying its own predicate-object list
    Anon(Vec<(Name, Vec<ObjectAst>)>),
}

#[derive(Debug, Clone)]
enum Stmt {
    Prefix { label: String, iri: String },
    Triples {
        subject: Name,
        predicates: Vec<(Name, Vec<ObjectAst>)>,
    },
}

/// Helper enum for literal suffixes (`^^datatype` or `@lang`)
#[derive(Debug, Clone)]
enum Suffix {
    Datatype(Name),
    Language(String),
}

/// Parse serialization text into triples plus the prefix map it declared
pub(crate) fn parse(input: &str) -> Result<(Vec<Triple>, BTreeMap<String, String>), Vec<ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let statements = document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .map(ParseError::from)
                .collect::<Vec<ParseError>>()
        })?;

    resolve(statements)
}

/// Helper to extract span range from chumsky's span
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> Span {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Vec<Stmt>, extra::Err<Rich<'a, Token>>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let iri_or_prefixed = choice((
        select! { Token::Iri(iri) => Name::Iri(iri) },
        select! { Token::PNameLn(pname) => pname }.map_with(|pname, e| {
            let (prefix, local) = match pname.split_once(':') {
                Some((prefix, local)) => (prefix.to_string(), local.to_string()),
                None => (String::new(), pname),
            };
            Name::Prefixed {
                prefix,
                local,
                span: span_range(&e.span()),
            }
        }),
    ));

    let node = choice((
        iri_or_prefixed.clone(),
        select! { Token::BlankLabel(label) => Name::Blank(label) },
    ));

    let verb = choice((
        just(Token::A).to(Name::Iri(RDF_TYPE.to_string())),
        iri_or_prefixed.clone(),
    ));

    let literal = choice((
        select! { Token::StringLit(s) => s }
            .then(
                choice((
                    just(Token::DoubleCaret)
                        .ignore_then(iri_or_prefixed.clone())
                        .map(Suffix::Datatype),
                    select! { Token::LangTag(tag) => tag }.map(Suffix::Language),
                ))
                .or_not(),
            )
            .map(|(lexical, suffix)| match suffix {
                Some(Suffix::Datatype(datatype)) => LiteralAst {
                    lexical,
                    datatype: Some(datatype),
                    language: None,
                },
                Some(Suffix::Language(language)) => LiteralAst {
                    lexical,
                    datatype: None,
                    language: Some(language),
                },
                None => LiteralAst {
                    lexical,
                    datatype: None,
                    language: None,
                },
            }),
        select! { Token::Integer(lexical) => lexical }.map(|lexical| LiteralAst {
            lexical,
            datatype: Some(Name::Iri(XSD_INTEGER.to_string())),
            language: None,
        }),
        select! { Token::Decimal(lexical) => lexical }.map(|lexical| LiteralAst {
            lexical,
            datatype: Some(Name::Iri(XSD_DECIMAL.to_string())),
            language: None,
        }),
        just(Token::True).to(LiteralAst {
            lexical: "true".to_string(),
            datatype: Some(Name::Iri(XSD_BOOLEAN.to_string())),
            language: None,
        }),
        just(Token::False).to(LiteralAst {
            lexical: "false".to_string(),
            datatype: Some(Name::Iri(XSD_BOOLEAN.to_string())),
            language: None,
        }),
    ));

    // Objects are recursive through anonymous blank-node property lists
    let object = recursive(|object| {
        let object_list = object
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<ObjectAst>>();
        let predicates = verb
            .clone()
            .then(object_list)
            .separated_by(just(Token::Semicolon))
            .allow_trailing()
            .at_least(1)
            .collect::<Vec<_>>();
        let anon = predicates
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(ObjectAst::Anon);

        choice((
            just(Token::BracketOpen)
                .ignore_then(just(Token::BracketClose))
                .to(ObjectAst::Anon(Vec::new())),
            anon,
            literal.clone().map(ObjectAst::Literal),
            node.clone().map(ObjectAst::Name),
        ))
    });

    // The same predicate-object list shape, over the finished object parser
    let object_list = object
        .clone()
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<ObjectAst>>();
    let predicates = verb
        .clone()
        .then(object_list)
        .separated_by(just(Token::Semicolon))
        .allow_trailing()
        .at_least(1)
        .collect::<Vec<_>>();

    let prefix_stmt = just(Token::PrefixDecl)
        .ignore_then(select! { Token::PNameNs(label) => label })
        .then(select! { Token::Iri(iri) => iri })
        .then_ignore(just(Token::Dot))
        .map(|(label, iri)| Stmt::Prefix { label, iri });

    let triples_stmt = node
        .then(predicates)
        .then_ignore(just(Token::Dot))
        .map(|(subject, predicates)| Stmt::Triples {
            subject,
            predicates,
        });

    choice((prefix_stmt, triples_stmt))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}

fn resolve(statements: Vec<Stmt>) -> Result<(Vec<Triple>, BTreeMap<String, String>), Vec<ParseError>> {
    let mut prefixes = BTreeMap::new();
    let mut triples = Vec::new();
    let mut blank_counter = 0usize;

    for stmt in statements {
        match stmt {
            Stmt::Prefix { label, iri } => {
                prefixes.insert(label, iri);
            }
            Stmt::Triples {
                subject,
                predicates,
            } => {
                let subject = resolve_name(subject, &prefixes).map_err(|e| vec![e])?;
                resolve_predicates(subject, predicates, &prefixes, &mut triples, &mut blank_counter)
                    .map_err(|e| vec![e])?;
            }
        }
    }

    Ok((triples, prefixes))
}

fn resolve_name(name: Name, prefixes: &BTreeMap<String, String>) -> Result<Term, ParseError> {
    match name {
        Name::Iri(iri) => Ok(Term::Iri(iri)),
        Name::Blank(label) => Ok(Term::Blank(label)),
        Name::Prefixed {
            prefix,
            local,
            span,
        } => match prefixes.get(&prefix) {
            Some(namespace) => Ok(Term::Iri(format!("{}{}", namespace, local))),
            None => Err(ParseError::UnknownPrefix { prefix, span }),
        },
    }
}

fn resolve_predicates(
    subject: Term,
    predicates: Vec<(Name, Vec<ObjectAst>)>,
    prefixes: &BTreeMap<String, String>,
    triples: &mut Vec<Triple>,
    blank_counter: &mut usize,
) -> Result<(), ParseError> {
    for (verb, objects) in predicates {
        let predicate = resolve_name(verb, prefixes)?;
        for object in objects {
            let object = match object {
                ObjectAst::Name(name) => resolve_name(name, prefixes)?,
                ObjectAst::Literal(lit) => {
                    let datatype = match lit.datatype {
                        Some(name) => match resolve_name(name, prefixes)? {
                            Term::Iri(iri) => Some(iri),
                            // the grammar only admits IRIs after ^^
                            _ => unreachable!("datatype position only parses IRIs"),
                        },
                        None => None,
                    };
                    Term::Literal {
                        lexical: lit.lexical,
                        datatype,
                        language: lit.language,
                    }
                }
                ObjectAst::Anon(nested) => {
                    let blank = Term::Blank(format!("b{}", *blank_counter));
                    *blank_counter += 1;
                    resolve_predicates(blank.clone(), nested, prefixes, triples, blank_counter)?;
                    blank
                }
            };
            triples.push(Triple {
                subject: subject.clone(),
                predicate: predicate.clone(),
                object,
            });
        }
    }
    Ok(())
}
