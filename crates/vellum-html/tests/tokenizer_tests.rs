//! Integration tests for the HTML tokenizer.

use vellum_html::{Token, Tokenizer};

/// Helper to tokenize a complete document and return the tokens.
fn tokenize(input: &str) -> Vec<Token> {
    Tokenizer::tokenize(input)
}

#[test]
fn test_plain_text() {
    let tokens = tokenize("Hello");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].as_text(), Some("Hello"));
}

#[test]
fn test_empty_input() {
    assert!(tokenize("").is_empty());
}

#[test]
fn test_doctype() {
    let tokens = tokenize("<!DOCTYPE html>");
    assert_eq!(tokens.len(), 1);
    match &tokens[0] {
        Token::Doctype { name, force_quirks } => {
            assert_eq!(name.as_deref(), Some("html"));
            assert!(!force_quirks);
        }
        other => panic!("expected DOCTYPE token, got {other}"),
    }
}

#[test]
fn test_legacy_doctype_forces_quirks() {
    let tokens = tokenize(r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN">"#);
    match &tokens[0] {
        Token::Doctype { force_quirks, .. } => assert!(force_quirks),
        other => panic!("expected DOCTYPE token, got {other}"),
    }
}

#[test]
fn test_start_tag() {
    let tokens = tokenize("<div>");
    assert_eq!(tokens.len(), 1);
    match &tokens[0] {
        Token::StartTag {
            name,
            self_closing,
            attrs,
        } => {
            assert_eq!(name, "div");
            assert!(!self_closing);
            assert!(attrs.is_empty());
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn test_tag_name_is_lowercased() {
    let tokens = tokenize("<DiV>");
    assert_eq!(tokens[0].as_start_tag(), Some("div"));
}

#[test]
fn test_end_tag() {
    let tokens = tokenize("</div>");
    assert_eq!(tokens, vec![Token::EndTag { name: "div".into() }]);
}

#[test]
fn test_self_closing_tag() {
    let tokens = tokenize("<br/>");
    match &tokens[0] {
        Token::StartTag {
            name, self_closing, ..
        } => {
            assert_eq!(name, "br");
            assert!(self_closing);
        }
        other => panic!("expected self-closing StartTag token, got {other}"),
    }
}

#[test]
fn test_comment() {
    let tokens = tokenize("<!-- hello -->");
    assert_eq!(
        tokens,
        vec![Token::Comment {
            data: " hello ".into()
        }]
    );
}

#[test]
fn test_comment_with_embedded_angle_and_dash() {
    let tokens = tokenize("<!-- a > b - c -->");
    assert_eq!(
        tokens,
        vec![Token::Comment {
            data: " a > b - c ".into()
        }]
    );
}

#[test]
fn test_attribute_quoting_styles() {
    for input in [
        r#"<div class="foo">"#,
        "<div class='foo'>",
        "<div class=foo>",
    ] {
        let tokens = tokenize(input);
        match &tokens[0] {
            Token::StartTag { attrs, .. } => {
                assert_eq!(attrs.len(), 1, "input: {input}");
                assert_eq!(attrs[0].name, "class");
                assert_eq!(attrs[0].value, "foo");
            }
            other => panic!("expected StartTag token, got {other}"),
        }
    }
}

#[test]
fn test_attribute_names_lowercased_duplicates_keep_first() {
    let tokens = tokenize(r#"<a HREF="/first" href="/second">"#);
    match &tokens[0] {
        Token::StartTag { attrs, .. } => {
            assert_eq!(attrs.len(), 1);
            assert_eq!(attrs[0].name, "href");
            assert_eq!(attrs[0].value, "/first");
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn test_multiple_attributes_keep_source_order() {
    let tokens = tokenize(r#"<input type="text" name=q value="x">"#);
    match &tokens[0] {
        Token::StartTag { attrs, .. } => {
            let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
            assert_eq!(names, ["type", "name", "value"]);
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn test_script_content_is_raw_text() {
    // The `<` inside the script body must not open a tag.
    let tokens = tokenize("<script>var x = 0 < 1;</script>");
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].as_start_tag(), Some("script"));
    assert_eq!(tokens[1].as_text(), Some("var x = 0 < 1;"));
    assert_eq!(
        tokens[2],
        Token::EndTag {
            name: "script".into()
        }
    );
}

#[test]
fn test_style_content_ignores_markup() {
    let tokens = tokenize("<style>p > a { color: red }</style>");
    assert_eq!(tokens[1].as_text(), Some("p > a { color: red }"));
}

#[test]
fn test_rawtext_close_tag_is_case_insensitive() {
    let tokens = tokenize("<script>x</SCRIPT>");
    assert_eq!(tokens[1].as_text(), Some("x"));
    assert_eq!(
        tokens[2],
        Token::EndTag {
            name: "script".into()
        }
    );
}

#[test]
fn test_rawtext_not_fooled_by_similar_close_tag() {
    let tokens = tokenize("<script>a</scripty>b</script>");
    assert_eq!(tokens[1].as_text(), Some("a</scripty>b"));
}

#[test]
fn test_rcdata_decodes_references_in_textarea() {
    let tokens = tokenize("<textarea>a &lt; b</textarea>");
    assert_eq!(tokens[1].as_text(), Some("a < b"));
}

#[test]
fn test_entity_decoding() {
    let tokens = tokenize("5 &lt; 10 &amp; 20 &#x4E;&#78;");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].as_text(), Some("5 < 10 & 20 NN"));
}

#[test]
fn test_unknown_entity_passes_through() {
    let tokens = tokenize("a &bogus; b");
    assert_eq!(tokens[0].as_text(), Some("a &bogus; b"));
}

#[test]
fn test_entity_in_attribute_value() {
    let tokens = tokenize(r#"<a title="Tom &amp; Jerry">"#);
    match &tokens[0] {
        Token::StartTag { attrs, .. } => assert_eq!(attrs[0].value, "Tom & Jerry"),
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn test_stray_less_than_is_literal() {
    let tokens = tokenize("3 < 5");
    assert_eq!(tokens[0].as_text(), Some("3 < 5"));
}

#[test]
fn test_angle_in_quoted_attribute_value() {
    let tokens = tokenize(r#"<a title="x>y" href="/z">"#);
    match &tokens[0] {
        Token::StartTag { attrs, .. } => {
            assert_eq!(attrs[0].value, "x>y");
            assert_eq!(attrs[1].value, "/z");
        }
        other => panic!("expected StartTag token, got {other}"),
    }
}

#[test]
fn test_adjacent_text_is_one_run() {
    let tokens = tokenize("<p>one two</p>");
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[1].as_text(), Some("one two"));
}

#[test]
fn test_unterminated_tag_at_document_end_is_dropped() {
    let tokens = tokenize("text<p titl");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].as_text(), Some("text"));
}

#[test]
fn test_lone_angle_at_document_end_is_text() {
    let tokens = tokenize("a<");
    assert_eq!(tokens[0].as_text(), Some("a<"));
}

#[test]
fn test_bogus_comment_from_processing_instruction() {
    let tokens = tokenize("<?xml version=\"1.0\"?>x");
    assert!(matches!(tokens[0], Token::Comment { .. }));
    assert_eq!(tokens[1].as_text(), Some("x"));
}
