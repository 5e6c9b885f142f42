//! Integration tests for the cascade: specificity, importance, layers,
//! inheritance, custom properties, conditions, and cache invalidation.

use vellum_css::selector::PseudoElement;
use vellum_css::{CascadeEngine, DefaultEnvironment, Stylesheet};
use vellum_dom::{NodeArena, NodeId};
use vellum_html::{Tokenizer, TreeBuilder};

fn parse(html: &str) -> NodeArena {
    TreeBuilder::new(Tokenizer::tokenize(html)).run()
}

fn find(arena: &NodeArena, tag: &str) -> NodeId {
    arena
        .iter_all()
        .find(|&id| arena.as_element(id).is_some_and(|e| e.tag_name == tag))
        .unwrap_or_else(|| panic!("no <{tag}> in fixture"))
}

fn engine_with(css: &str) -> CascadeEngine<DefaultEnvironment> {
    let mut engine = CascadeEngine::new(DefaultEnvironment::default());
    engine.add_stylesheet(Stylesheet::parse(css));
    engine
}

/// Resolve one property for the first element with the given tag.
fn resolve(html: &str, css: &str, tag: &str, property: &str) -> Option<String> {
    let arena = parse(html);
    let mut engine = engine_with(css);
    let element = find(&arena, tag);
    engine
        .computed_style(&arena, element)
        .get(property)
        .map(str::to_string)
}

#[test]
fn test_higher_specificity_wins() {
    let css = "p { color: green } .c { color: red }";
    let html = r#"<p class="c">x</p>"#;
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("red"));
}

#[test]
fn test_source_order_breaks_specificity_ties() {
    let css = "p { color: green } p { color: blue }";
    assert_eq!(
        resolve("<p>x</p>", css, "p", "color").as_deref(),
        Some("blue")
    );
}

#[test]
fn test_important_beats_higher_specificity() {
    let css = "#t { color: blue }\n.c  { color: red !important }\np   { color: green }";
    let html = r#"<p id="t" class="c">x</p>"#;
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("red"));
}

#[test]
fn test_unlayered_beats_layered_normals() {
    let css = "@layer base, theme;\n\
               @layer base { p { color: red } }\n\
               @layer theme { p { color: blue } }\n\
               p { color: green }";
    assert_eq!(
        resolve("<p>x</p>", css, "p", "color").as_deref(),
        Some("green")
    );
}

#[test]
fn test_later_layer_beats_earlier_for_normals() {
    let css = "@layer base, theme;\n\
               @layer base { p { color: red } }\n\
               @layer theme { p { color: blue } }";
    assert_eq!(
        resolve("<p>x</p>", css, "p", "color").as_deref(),
        Some("blue")
    );
}

#[test]
fn test_important_layer_order_is_reversed() {
    let css = "@layer base, theme;\n\
               @layer base { p { color: red !important } }\n\
               @layer theme { p { color: blue !important } }\n\
               p { color: green !important }";
    // Among important declarations the earliest layer wins, and unlayered
    // important is the weakest of the three.
    assert_eq!(
        resolve("<p>x</p>", css, "p", "color").as_deref(),
        Some("red")
    );
}

#[test]
fn test_inheritance_of_color() {
    let css = "body { color: red }";
    let html = "<body><p><span>x</span></p></body>";
    assert_eq!(resolve(html, css, "span", "color").as_deref(), Some("red"));
}

#[test]
fn test_background_is_not_inherited() {
    let css = "body { background-color: gray }";
    let html = "<body><p>x</p></body>";
    assert_eq!(resolve(html, css, "p", "background-color"), None);
}

#[test]
fn test_own_declaration_overrides_inherited_value() {
    let css = "body { color: red } p { color: blue }";
    let html = "<body><p>x</p></body>";
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("blue"));
}

#[test]
fn test_inline_style_overrides_sheet_normals() {
    let css = "#x { color: red }";
    let html = r#"<p id="x" style="color: blue">t</p>"#;
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("blue"));
}

#[test]
fn test_sheet_important_beats_inline_normal() {
    let css = "p { color: red !important }";
    let html = r#"<p style="color: blue">t</p>"#;
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("red"));
}

#[test]
fn test_inline_important_beats_sheet_important() {
    let css = "p { color: red !important }";
    let html = r#"<p style="color: blue !important">t</p>"#;
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("blue"));
}

#[test]
fn test_var_substitution_from_root() {
    let css = ":root { --c: red } p { color: var(--c) }";
    let html = "<p>x</p>";
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("red"));
}

#[test]
fn test_var_fallback_when_undefined() {
    let css = "div { width: var(--x, 5px) }";
    assert_eq!(
        resolve("<div>x</div>", css, "div", "width").as_deref(),
        Some("5px")
    );
}

#[test]
fn test_var_defined_wins_over_fallback() {
    let css = ":root { --x: 1px } div { width: var(--x, 5px) }";
    assert_eq!(
        resolve("<div>x</div>", css, "div", "width").as_deref(),
        Some("1px")
    );
}

#[test]
fn test_unresolved_var_without_fallback_is_empty() {
    let css = "div { width: var(--missing) }";
    assert_eq!(
        resolve("<div>x</div>", css, "div", "width").as_deref(),
        Some("")
    );
}

#[test]
fn test_global_keywords() {
    let css = "body { color: red } p { color: inherit } div { color: green; }";
    let html = "<body><p>a</p><div>b</div></body>";
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("red"));

    // unset on an inherited property falls back to the parent value.
    let css = "body { color: red } p { color: unset }";
    assert_eq!(
        resolve("<body><p>a</p></body>", css, "p", "color").as_deref(),
        Some("red")
    );

    // initial clears even the inherited value.
    let css = "body { color: red } p { color: initial }";
    assert_eq!(resolve("<body><p>a</p></body>", css, "p", "color"), None);

    // unset on a non-inherited property clears it.
    let css = "p { margin-top: 4px; margin-top: unset }";
    assert_eq!(resolve("<p>a</p>", css, "p", "margin-top"), None);
}

#[test]
fn test_media_query_gates_rules_on_viewport() {
    let css = "@media (min-width: 10000px) { p { color: red } }";
    assert_eq!(resolve("<p>x</p>", css, "p", "color"), None);

    let css = "@media (min-width: 600px) { p { color: red } }";
    assert_eq!(
        resolve("<p>x</p>", css, "p", "color").as_deref(),
        Some("red")
    );
}

#[test]
fn test_supports_rule_is_optimistic() {
    let css = "@supports (display: grid) { p { color: red } }";
    assert_eq!(
        resolve("<p>x</p>", css, "p", "color").as_deref(),
        Some("red")
    );

    let css = "@supports not (display: grid) { p { color: red } }";
    assert_eq!(resolve("<p>x</p>", css, "p", "color"), None);
}

#[test]
fn test_container_query_falls_back_to_viewport() {
    // No measured container size: the 1024px viewport satisfies the query.
    let css = "div { container-type: inline-size }\n\
               @container (min-width: 600px) { p { color: red } }";
    let html = "<div><p>x</p></div>";
    assert_eq!(resolve(html, css, "p", "color").as_deref(), Some("red"));

    let css = "div { container-type: inline-size }\n\
               @container (min-width: 9000px) { p { color: red } }";
    assert_eq!(resolve(html, css, "p", "color"), None);
}

#[test]
fn test_cascade_is_deterministic_and_cached() {
    let arena = parse(r#"<p id="t" class="c">x</p>"#);
    let mut engine = engine_with("#t { color: blue } .c { width: 1px }");
    let p = find(&arena, "p");

    let first = engine.computed_style(&arena, p);
    let cached_after_first = engine.cached_nodes();
    let second = engine.computed_style(&arena, p);
    assert_eq!(first, second);
    // The second call hit the cache; nothing new was computed.
    assert_eq!(engine.cached_nodes(), cached_after_first);
}

#[test]
fn test_replace_sync_bumps_generation_and_recomputes() {
    let arena = parse("<div>x</div>");
    let mut engine = engine_with(":root { --x: 1px } div { width: var(--x, 5px) }");
    let div = find(&arena, "div");

    assert_eq!(
        engine.computed_style(&arena, div).get("width"),
        Some("1px")
    );

    engine
        .stylesheet_mut(0)
        .expect("sheet exists")
        .replace_sync(":root { --x: 2px } div { width: var(--x, 5px) }");

    assert_eq!(
        engine.computed_style(&arena, div).get("width"),
        Some("2px")
    );
}

#[test]
fn test_rule_insertion_invalidates_cached_styles() {
    let arena = parse("<p>x</p>");
    let mut engine = engine_with("p { color: red }");
    let p = find(&arena, "p");
    assert_eq!(engine.computed_style(&arena, p).get("color"), Some("red"));

    assert!(
        engine
            .stylesheet_mut(0)
            .expect("sheet exists")
            .insert_rule("p { color: blue }", 1)
    );
    assert_eq!(engine.computed_style(&arena, p).get("color"), Some("blue"));
}

#[test]
fn test_later_stylesheet_wins_ties() {
    let arena = parse("<p>x</p>");
    let mut engine = CascadeEngine::new(DefaultEnvironment::default());
    engine.add_stylesheet(Stylesheet::parse("p { color: red }"));
    engine.add_stylesheet(Stylesheet::parse("p { color: blue }"));
    let p = find(&arena, "p");
    assert_eq!(engine.computed_style(&arena, p).get("color"), Some("blue"));
}

#[test]
fn test_pseudo_element_content_resolves() {
    let arena = parse(r#"<p class="q">x</p>"#);
    let mut engine = engine_with(
        ":root { --marker: \"> \" } .q::before { content: var(--marker); color: red }",
    );
    let p = find(&arena, "p");
    let before = engine.pseudo_style(&arena, p, PseudoElement::Before);
    assert_eq!(before.get("content"), Some("\"> \""));
    assert_eq!(before.get("color"), Some("red"));

    let after = engine.pseudo_style(&arena, p, PseudoElement::After);
    assert!(after.is_empty());
}

#[test]
fn test_duplicate_declarations_in_rule_last_wins() {
    let css = "p { color: red; color: blue }";
    assert_eq!(
        resolve("<p>x</p>", css, "p", "color").as_deref(),
        Some("blue")
    );
}
