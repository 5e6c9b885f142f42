//! Integration tests for the incremental tokenizer front-end.
//!
//! The contract under test: concatenating every `flush()` batch with the
//! final `end()` batch yields exactly the single-pass tokenization of the
//! concatenated input, regardless of where the chunk boundaries fall.

use vellum_html::{IncrementalParser, Token, Tokenizer};

/// Feed `chunks` one at a time, flushing after each, and return everything
/// the parser produced.
fn incremental(chunks: &[&str]) -> Vec<Token> {
    let mut parser = IncrementalParser::new();
    let mut tokens = Vec::new();
    for chunk in chunks {
        parser.feed(chunk);
        tokens.extend(parser.flush());
    }
    tokens.extend(parser.end());
    tokens
}

/// Assert the incremental token stream equals single-pass tokenization for
/// every possible split point of `input` into two chunks.
fn assert_all_two_way_splits_match(input: &str) {
    let expected = Tokenizer::tokenize(input);
    let boundaries: Vec<usize> = (0..=input.len())
        .filter(|&i| input.is_char_boundary(i))
        .collect();
    for &split in &boundaries {
        let (a, b) = input.split_at(split);
        let got = incremental(&[a, b]);
        assert_eq!(got, expected, "split at byte {split} of {input:?}");
    }
}

#[test]
fn test_split_mid_tag() {
    let mut parser = IncrementalParser::new();
    parser.feed("<p>Hel");
    let first = parser.flush();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].as_start_tag(), Some("p"));

    parser.feed("lo</p>");
    let second = parser.flush();
    let rest = parser.end();

    let mut all = first;
    all.extend(second);
    all.extend(rest);
    assert_eq!(all, Tokenizer::tokenize("<p>Hello</p>"));
}

#[test]
fn test_every_split_of_simple_markup() {
    assert_all_two_way_splits_match("<p>Hello</p>");
}

#[test]
fn test_every_split_with_entity() {
    assert_all_two_way_splits_match("a &amp; b &#x41;<b>!</b>");
}

#[test]
fn test_every_split_of_rawtext() {
    assert_all_two_way_splits_match("<script>if (a > b) { f(); }</script><p>x</p>");
}

#[test]
fn test_every_split_of_comment_with_angle() {
    assert_all_two_way_splits_match("<!-- x > y --><i>z</i>");
}

#[test]
fn test_every_split_of_quoted_attribute_with_angle() {
    assert_all_two_way_splits_match(r#"<a title="x>y">link</a>"#);
}

#[test]
fn test_byte_at_a_time_feed() {
    let input = "<!DOCTYPE html><html><body><table><div id=x>hi</div></table></body></html>";
    let expected = Tokenizer::tokenize(input);
    let mut parser = IncrementalParser::new();
    let mut tokens = Vec::new();
    for (i, _) in input.char_indices() {
        let end = input[i..]
            .char_indices()
            .nth(1)
            .map_or(input.len(), |(j, _)| i + j);
        parser.feed(&input[i..end]);
        tokens.extend(parser.flush());
    }
    tokens.extend(parser.end());
    assert_eq!(tokens, expected);
}

#[test]
fn test_no_token_is_returned_twice() {
    let mut parser = IncrementalParser::new();
    parser.feed("<p>a</p>");
    let first = parser.flush();
    // A flush with no new input settles nothing new.
    let again = parser.flush();
    assert!(!first.is_empty());
    assert!(again.is_empty());
    assert!(parser.end().is_empty());
}

#[test]
fn test_end_recovers_trailing_fragment() {
    let mut parser = IncrementalParser::new();
    parser.feed("<p>done<br");
    let _ = parser.flush();
    let rest = parser.end();
    // The dangling "<br" is dropped; the settled text survives.
    assert!(rest.iter().any(|t| t.as_text() == Some("done")));
}
