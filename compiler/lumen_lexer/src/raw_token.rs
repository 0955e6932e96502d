//! Logos-derived raw tokenizer.
//!
//! Raw tokens carry parsed payloads (numeric values, cooked strings)
//! but no interning; [`crate::lex`] converts them into `lumen_ir`
//! tokens.

use logos::{FilterResult, Lexer, Logos};
use lumen_ir::IntLitKind;

use crate::escape::cook_str;

/// Consume a (possibly nested) block comment. The opening `/*` has
/// already been matched.
fn block_comment(lex: &mut Lexer<RawToken>) -> FilterResult<(), ()> {
    let rest = lex.remainder();
    let bytes = rest.as_bytes();
    let mut depth = 1usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] == b'/' && i + 1 < bytes.len() && bytes[i + 1] == b'*' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && i + 1 < bytes.len() && bytes[i + 1] == b'/' {
            depth -= 1;
            i += 2;
            if depth == 0 {
                lex.bump(i);
                return FilterResult::Skip;
            }
        } else {
            i += 1;
        }
    }

    // Unterminated comment: consume to end of input and report.
    lex.bump(bytes.len());
    FilterResult::Error(())
}

fn int_literal(lex: &mut Lexer<RawToken>) -> Option<(u64, IntLitKind)> {
    let slice = lex.slice();

    let (digits, kind) = if let Some(d) = slice.strip_suffix("u64") {
        (d, IntLitKind::U64)
    } else if let Some(d) = slice.strip_suffix("i64") {
        (d, IntLitKind::I64)
    } else if let Some(d) = slice.strip_suffix("ul") {
        (d, IntLitKind::U64)
    } else if let Some(d) = slice.strip_suffix('u') {
        (d, IntLitKind::U32)
    } else if let Some(d) = slice.strip_suffix('l') {
        (d, IntLitKind::I64)
    } else {
        (slice, IntLitKind::I32)
    };

    let value = if let Some(hex) = digits.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()?
    } else {
        digits.parse::<u64>().ok()?
    };

    Some((value, kind))
}

fn float_literal(lex: &mut Lexer<RawToken>) -> Option<(f64, bool)> {
    let slice = lex.slice();
    let (digits, is_f32) = if let Some(d) = slice.strip_suffix("f32") {
        (d, true)
    } else if let Some(d) = slice.strip_suffix("f64") {
        (d, false)
    } else if let Some(d) = slice.strip_suffix('f') {
        (d, true)
    } else {
        (slice, false)
    };
    Some((digits.parse::<f64>().ok()?, is_f32))
}

fn string_literal(lex: &mut Lexer<RawToken>) -> String {
    let slice = lex.slice();
    // Strip the surrounding quotes before cooking escapes.
    cook_str(&slice[1..slice.len() - 1])
}

fn char_literal(lex: &mut Lexer<RawToken>) -> Option<char> {
    let slice = lex.slice();
    let cooked = cook_str(&slice[1..slice.len() - 1]);
    let mut chars = cooked.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None; // more than one code point
    }
    Some(ch)
}

#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum RawToken {
    #[token("/*", block_comment)]
    BlockComment,

    #[regex(r"[0-9]+\.[0-9]+(f32|f64|f)?", float_literal)]
    Float((f64, bool)),

    #[regex(r"(0x[0-9a-fA-F]+|0b[01]+|[0-9]+)(u64|i64|ul|u|l)?", int_literal)]
    Int((u64, IntLitKind)),

    #[regex(r#""([^"\\\n]|\\.)*""#, string_literal)]
    Str(String),

    #[regex(r"'([^'\\\n]|\\.)*'", char_literal)]
    Char(char),

    #[regex(r"[\p{XID_Start}_][\p{XID_Continue}]*", |lex| lex.slice().to_owned())]
    Ident(String),

    // Keywords
    #[token("func")]
    Func,
    #[token("var")]
    Var,
    #[token("mutable")]
    Mutable,
    #[token("ret")]
    Ret,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("loop")]
    Loop,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("match")]
    Match,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("class")]
    Class,
    #[token("union")]
    Union,
    #[token("typedef")]
    Typedef,
    #[token("import")]
    Import,
    #[token("namespace")]
    Namespace,
    #[token("extern")]
    Extern,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("as")]
    As,
    #[token("sizeof")]
    SizeOf,
    #[token("new")]
    New,
    #[token("delete")]
    Delete,
    #[token("ref")]
    Ref,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Delimiters and punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token("...")]
    DotDotDot,
    #[token(".")]
    Dot,
    #[token("|>")]
    PipeGt,

    // Operators. `>>` and `>=` are composed by the parser from
    // adjacent tokens so that nested template argument lists close.
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("=")]
    Eq,
    #[token("<=")]
    Le,
    #[token("<<")]
    Shl,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Not,
}
