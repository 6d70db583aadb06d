use yap::lang::token::*;
use yap::lang::{lex, ErrorCode};

fn kinds(s: &str) -> Vec<Token> {
    lex(s).unwrap().into_iter().map(|(_, t)| t).collect()
}

#[test]
fn test_declaration_tokens() {
    assert_eq!(
        kinds("x:int=42"),
        vec![
            Token::Ident("x".to_string()),
            Token::Colon,
            Token::Word(Word::Int),
            Token::Operator(Operator::Assign),
            Token::Literal(Literal::Integer(42)),
        ]
    );
}

#[test]
fn test_function_tokens() {
    assert_eq!(
        kinds("f:int=func(a:arr) ret a[0] endfunc"),
        vec![
            Token::Ident("f".to_string()),
            Token::Colon,
            Token::Word(Word::Int),
            Token::Operator(Operator::Assign),
            Token::Word(Word::Func),
            Token::LParen,
            Token::Ident("a".to_string()),
            Token::Colon,
            Token::Word(Word::Arr),
            Token::RParen,
            Token::Word(Word::Ret),
            Token::Ident("a".to_string()),
            Token::LBracket,
            Token::Literal(Literal::Integer(0)),
            Token::RBracket,
            Token::Word(Word::Endfunc),
        ]
    );
}

#[test]
fn test_offsets() {
    let offsets: Vec<usize> = lex("if (a<=b)\n  print(\"x\")")
        .unwrap()
        .into_iter()
        .map(|(o, _)| o)
        .collect();
    assert_eq!(offsets, vec![0, 3, 4, 5, 7, 8, 12, 17, 18, 21]);
}

#[test]
fn test_keywords_are_not_prefixes() {
    assert_eq!(kinds("printer"), vec![Token::Ident("printer".to_string())]);
    assert_eq!(kinds("iffy"), vec![Token::Ident("iffy".to_string())]);
}

#[test]
fn test_bad_character() {
    let error = lex("x:int=1 # no").unwrap_err();
    assert_eq!(error.code(), ErrorCode::UnexpectedCharacter);
}
