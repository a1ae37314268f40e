//! Lexer for the graph serialization grammar using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token {
    #[token("@prefix", priority = 20)]
    PrefixDecl,

    // rdf:type shorthand
    #[token("a")]
    A,

    #[token("true")]
    True,
    #[token("false")]
    False,

    // Delimiters
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("^^")]
    DoubleCaret,

    #[regex(r"<[^<>\s]*>", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Iri(String),

    // Prefixed name with a local part; the prefix label may be empty
    #[regex(r"([A-Za-z][A-Za-z0-9_-]*)?:[A-Za-z0-9_][A-Za-z0-9_-]*", |lex| lex.slice().to_string())]
    PNameLn(String),

    // Bare prefix label, as written in @prefix directives
    #[regex(r"([A-Za-z][A-Za-z0-9_-]*)?:", |lex| {
        let s = lex.slice();
        s[..s.len()-1].to_string()
    })]
    PNameNs(String),

    #[regex(r"_:[A-Za-z0-9_][A-Za-z0-9_-]*", |lex| lex.slice()[2..].to_string())]
    BlankLabel(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len()-1])
    })]
    StringLit(String),

    #[regex(r"@[a-zA-Z]+(-[a-zA-Z0-9]+)*", |lex| lex.slice()[1..].to_string(), priority = 2)]
    LangTag(String),

    // Numbers keep their lexical form; the parser attaches the xsd datatype
    #[regex(r"[+-]?[0-9]+\.[0-9]+", |lex| lex.slice().to_string())]
    Decimal(String),

    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().to_string())]
    Integer(String),
}

/// Resolve backslash escapes inside a quoted string
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
