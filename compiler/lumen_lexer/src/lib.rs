//! Lexer for the Lumen language, built on `logos`.
//!
//! `//` comments run to end of line; `/* ... */` comments nest. String
//! and char literals are cooked here (see [`escape`]); identifiers and
//! string contents are interned so downstream stages compare 4-byte
//! handles. Invalid input produces `TokenKind::Error` tokens and lexing
//! continues, so the parser can report everything in one pass.

mod escape;
mod raw_token;

use logos::Logos;
use lumen_ir::{Span, StringInterner, Token, TokenKind, TokenList};
use raw_token::RawToken;

/// Lex source code into a [`TokenList`].
///
/// The returned list is always terminated by an `Eof` token spanning
/// the end of input.
pub fn lex(source: &str, interner: &StringInterner) -> TokenList {
    let mut tokens = TokenList::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::from_range(lexer.span());
        let kind = match result {
            Ok(raw) => convert(raw, interner),
            Err(()) => TokenKind::Error,
        };
        tokens.push(Token::new(kind, span));
    }

    let end = source.len() as u32;
    tokens.push(Token::new(TokenKind::Eof, Span::new(end, end)));
    tokens
}

fn convert(raw: RawToken, interner: &StringInterner) -> TokenKind {
    match raw {
        // The block-comment callback either skips or errors; the
        // variant itself is never emitted on the success path.
        RawToken::BlockComment => TokenKind::Error,
        RawToken::Int((value, kind)) => TokenKind::Int { value, kind },
        RawToken::Float((value, is_f32)) => TokenKind::Float { value, is_f32 },
        RawToken::Str(s) => TokenKind::Str(interner.intern(&s)),
        RawToken::Char(c) => TokenKind::Char(c),
        RawToken::Ident(name) => TokenKind::Ident(interner.intern(&name)),
        RawToken::Func => TokenKind::Func,
        RawToken::Var => TokenKind::Var,
        RawToken::Mutable => TokenKind::Mutable,
        RawToken::Ret => TokenKind::Ret,
        RawToken::If => TokenKind::If,
        RawToken::Else => TokenKind::Else,
        RawToken::Loop => TokenKind::Loop,
        RawToken::While => TokenKind::While,
        RawToken::For => TokenKind::For,
        RawToken::Match => TokenKind::Match,
        RawToken::Break => TokenKind::Break,
        RawToken::Continue => TokenKind::Continue,
        RawToken::Class => TokenKind::Class,
        RawToken::Union => TokenKind::Union,
        RawToken::Typedef => TokenKind::Typedef,
        RawToken::Import => TokenKind::Import,
        RawToken::Namespace => TokenKind::Namespace,
        RawToken::Extern => TokenKind::Extern,
        RawToken::Public => TokenKind::Public,
        RawToken::Private => TokenKind::Private,
        RawToken::As => TokenKind::As,
        RawToken::SizeOf => TokenKind::SizeOf,
        RawToken::New => TokenKind::New,
        RawToken::Delete => TokenKind::Delete,
        RawToken::Ref => TokenKind::Ref,
        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::Null => TokenKind::Null,
        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBrace => TokenKind::LBrace,
        RawToken::RBrace => TokenKind::RBrace,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Semi => TokenKind::Semi,
        RawToken::ColonColon => TokenKind::ColonColon,
        RawToken::Colon => TokenKind::Colon,
        RawToken::Arrow => TokenKind::Arrow,
        RawToken::FatArrow => TokenKind::FatArrow,
        RawToken::DotDotDot => TokenKind::DotDotDot,
        RawToken::Dot => TokenKind::Dot,
        RawToken::PipeGt => TokenKind::PipeGt,
        RawToken::PlusEq => TokenKind::PlusEq,
        RawToken::MinusEq => TokenKind::MinusEq,
        RawToken::StarEq => TokenKind::StarEq,
        RawToken::SlashEq => TokenKind::SlashEq,
        RawToken::PercentEq => TokenKind::PercentEq,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Eq => TokenKind::Eq,
        RawToken::Le => TokenKind::Le,
        RawToken::Shl => TokenKind::Shl,
        RawToken::Lt => TokenKind::Lt,
        RawToken::Gt => TokenKind::Gt,
        RawToken::AndAnd => TokenKind::AndAnd,
        RawToken::OrOr => TokenKind::OrOr,
        RawToken::Amp => TokenKind::Amp,
        RawToken::Pipe => TokenKind::Pipe,
        RawToken::PlusPlus => TokenKind::PlusPlus,
        RawToken::MinusMinus => TokenKind::MinusMinus,
        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Percent => TokenKind::Percent,
        RawToken::Not => TokenKind::Not,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_ir::IntLitKind;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let interner = StringInterner::new();
        lex(source, &interner).iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn keywords_and_punctuation() {
        let interner = StringInterner::new();
        let tokens = lex("func main() -> i32 { ret 42; }", &interner);
        let expected = vec![
            TokenKind::Func,
            TokenKind::Ident(interner.intern("main")),
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Arrow,
            TokenKind::Ident(interner.intern("i32")),
            TokenKind::LBrace,
            TokenKind::Ret,
            TokenKind::Int {
                value: 42,
                kind: IntLitKind::I32,
            },
            TokenKind::Semi,
            TokenKind::RBrace,
            TokenKind::Eof,
        ];
        let got: Vec<TokenKind> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn integer_suffixes() {
        assert_eq!(
            kinds("1 2u 3l 4ul 5i64 6u64 0x2a 0b1010"),
            vec![
                TokenKind::Int { value: 1, kind: IntLitKind::I32 },
                TokenKind::Int { value: 2, kind: IntLitKind::U32 },
                TokenKind::Int { value: 3, kind: IntLitKind::I64 },
                TokenKind::Int { value: 4, kind: IntLitKind::U64 },
                TokenKind::Int { value: 5, kind: IntLitKind::I64 },
                TokenKind::Int { value: 6, kind: IntLitKind::U64 },
                TokenKind::Int { value: 42, kind: IntLitKind::I32 },
                TokenKind::Int { value: 10, kind: IntLitKind::I32 },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn float_literals() {
        assert_eq!(
            kinds("1.5 2.0f 3.25f32 4.5f64"),
            vec![
                TokenKind::Float { value: 1.5, is_f32: false },
                TokenKind::Float { value: 2.0, is_f32: true },
                TokenKind::Float { value: 3.25, is_f32: true },
                TokenKind::Float { value: 4.5, is_f32: false },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn nested_block_comments() {
        assert_eq!(
            kinds("1 /* outer /* inner */ still skipped */ 2"),
            vec![
                TokenKind::Int { value: 1, kind: IntLitKind::I32 },
                TokenKind::Int { value: 2, kind: IntLitKind::I32 },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_is_error() {
        let got = kinds("1 /* /* unclosed */");
        assert!(got.contains(&TokenKind::Error));
    }

    #[test]
    fn line_comments() {
        assert_eq!(
            kinds("1 // the rest is skipped\n2"),
            vec![
                TokenKind::Int { value: 1, kind: IntLitKind::I32 },
                TokenKind::Int { value: 2, kind: IntLitKind::I32 },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_and_char_literals() {
        let interner = StringInterner::new();
        let tokens = lex(r#""hi\n" 'a' '\n'"#, &interner);
        let got: Vec<TokenKind> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            got,
            vec![
                TokenKind::Str(interner.intern("hi\n")),
                TokenKind::Char('a'),
                TokenKind::Char('\n'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn shift_right_lexes_as_two_gt() {
        let got = kinds("a >> b");
        assert_eq!(got[1], TokenKind::Gt);
        assert_eq!(got[2], TokenKind::Gt);
        // The two '>' are adjacent, so the parser can compose them.
        let interner = StringInterner::new();
        let tokens = lex("a >> b", &interner);
        assert_eq!(tokens[1].span.end, tokens[2].span.start);
    }

    #[test]
    fn pipeline_operator() {
        let got = kinds("x |> f()");
        assert!(got.contains(&TokenKind::PipeGt));
    }
}
