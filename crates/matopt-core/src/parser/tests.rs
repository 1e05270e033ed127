//! Tests for the tokenizer and block parser

use super::*;
use crate::error::ParseError;

#[test]
fn test_tokens_split_on_whitespace() {
    let mut p = Parser::new("material \t wood_floor\n{ }");
    assert_eq!(p.read_token(), Some("material"));
    assert_eq!(p.read_token(), Some("wood_floor"));
    assert_eq!(p.read_token(), Some("{"));
    assert_eq!(p.read_token(), Some("}"));
    assert_eq!(p.read_token(), None);
}

#[test]
fn test_read_block_balances_nesting() {
    let mut p = Parser::new("{ a { b } c }");
    let block = p.read_block().unwrap();
    assert_eq!(block, "{ a { b } c }");
}

#[test]
fn test_read_block_unterminated() {
    let mut p = Parser::new("{ a { b } c");
    assert_eq!(p.read_block(), Err(ParseError::UnterminatedBlock(0)));
}

#[test]
fn test_read_block_requires_brace() {
    let mut p = Parser::new("no braces here");
    assert!(matches!(p.read_block(), Err(ParseError::MissingBlock(_))));
}

#[test]
fn test_read_block_skips_leading_comments() {
    // Seen in the wild: a comment wedged between a name and its block
    let mut p = Parser::new("/* legacy */ // note\n{ x }");
    assert_eq!(p.read_block().unwrap(), "{ x }");
}

#[test]
fn test_skip_comment_nested() {
    let mut p = Parser::new("/* outer /* inner */ still outer */ after");
    assert_eq!(p.read_token(), Some("/*"));
    p.skip_comment().unwrap();
    assert_eq!(p.read_token(), Some("after"));
}

#[test]
fn test_skip_comment_unterminated() {
    let mut p = Parser::new("/* never closed");
    p.read_token();
    assert!(matches!(
        p.skip_comment(),
        Err(ParseError::UnterminatedComment(_))
    ));
}

#[test]
fn test_glued_brace_rewind() {
    // "name{" must be split so read_block still sees the brace
    let mut p = Parser::new("material stone{ k v }");
    assert_eq!(p.read_token(), Some("material"));
    let mut name = p.read_token().unwrap();
    if let Some(stripped) = name.strip_suffix('{') {
        name = stripped;
        p.unread(1);
    }
    assert_eq!(name, "stone");
    assert_eq!(p.read_block().unwrap(), "{ k v }");
}

#[test]
fn test_read_to_eol() {
    let mut p = Parser::new("// comment to end\nnext");
    assert_eq!(p.read_token(), Some("//"));
    p.read_to_eol();
    assert_eq!(p.read_token(), Some("next"));
}
