//! Integration tests for selector parsing, specificity, and matching.

use vellum_css::selector::{parse_selector, parse_selector_list};
use vellum_dom::{AttrList, NodeArena, NodeId};

/// Specificity of a selector, packed as `a·10_000 + b·100 + c`.
fn specificity(text: &str) -> u32 {
    parse_selector(text).expect("selector parses").specificity
}

/// Build `<html><body><div id=main class="note warn"><p>first<p><span>`
/// and return interesting node ids.
struct Fixture {
    arena: NodeArena,
    div: NodeId,
    p1: NodeId,
    p2: NodeId,
    span: NodeId,
}

fn fixture() -> Fixture {
    let mut arena = NodeArena::new();
    let html = arena.alloc_element("html", AttrList::new());
    arena.append_child(NodeId::ROOT, html);
    let body = arena.alloc_element("body", AttrList::new());
    arena.append_child(html, body);

    let div_attrs: AttrList = [("id", "main"), ("class", "note warn")]
        .into_iter()
        .collect();
    let div = arena.alloc_element("div", div_attrs);
    arena.append_child(body, div);

    let p1 = arena.alloc_element("p", AttrList::new());
    arena.append_child(div, p1);
    arena.append_text(p1, "first");
    let p2 = arena.alloc_element("p", AttrList::new());
    arena.append_child(div, p2);
    let span = arena.alloc_element("span", AttrList::new());
    arena.append_child(p2, span);

    Fixture {
        arena,
        div,
        p1,
        p2,
        span,
    }
}

fn matches(text: &str, arena: &NodeArena, id: NodeId) -> bool {
    parse_selector(text)
        .expect("selector parses")
        .matches(arena, id)
}

#[test]
fn test_specificity_formula() {
    assert_eq!(specificity("p"), 1);
    assert_eq!(specificity("*"), 0);
    assert_eq!(specificity(".note"), 100);
    assert_eq!(specificity("#main"), 10_000);
    assert_eq!(specificity("div.note"), 101);
    assert_eq!(specificity("#main .note p"), 10_101);
    assert_eq!(specificity("[href]"), 100);
    assert_eq!(specificity("a:first-child"), 101);
    assert_eq!(specificity("p::before"), 2);
}

#[test]
fn test_specificity_of_functional_pseudo_classes() {
    // :not() contributes its argument's specificity.
    assert_eq!(specificity("p:not(.note)"), 101);
    // :is() contributes the maximum among its options.
    assert_eq!(specificity("p:is(.note, #main)"), 10_001);
    // :where() contributes nothing.
    assert_eq!(specificity("p:where(.note, #main)"), 1);
    // :nth-* is excluded from the class count.
    assert_eq!(specificity("li:nth-child(2)"), 1);
}

#[test]
fn test_type_id_class_matching() {
    let f = fixture();
    assert!(matches("div", &f.arena, f.div));
    assert!(matches("#main", &f.arena, f.div));
    assert!(matches(".note", &f.arena, f.div));
    assert!(matches(".warn", &f.arena, f.div));
    assert!(matches("div.note#main", &f.arena, f.div));
    assert!(!matches(".missing", &f.arena, f.div));
    assert!(!matches("span", &f.arena, f.div));
    assert!(matches("*", &f.arena, f.div));
}

#[test]
fn test_descendant_and_child_combinators() {
    let f = fixture();
    assert!(matches("div p", &f.arena, f.p1));
    assert!(matches("body p", &f.arena, f.p1));
    assert!(matches("div > p", &f.arena, f.p1));
    assert!(!matches("body > p", &f.arena, f.p1));
    assert!(matches("#main span", &f.arena, f.span));
    assert!(matches("div > p > span", &f.arena, f.span));
    assert!(!matches("p > div", &f.arena, f.p1));
}

#[test]
fn test_sibling_combinators() {
    let f = fixture();
    assert!(matches("p + p", &f.arena, f.p2));
    assert!(!matches("p + p", &f.arena, f.p1));
    assert!(matches("p ~ p", &f.arena, f.p2));
}

#[test]
fn test_structural_pseudo_classes() {
    let f = fixture();
    assert!(matches("p:first-child", &f.arena, f.p1));
    assert!(!matches("p:first-child", &f.arena, f.p2));
    assert!(matches("p:last-child", &f.arena, f.p2));
    assert!(matches("div:only-child", &f.arena, f.div));
    assert!(!matches("p:only-child", &f.arena, f.p1));
    // p2 has an element child; p1 has a text child; neither is :empty.
    assert!(!matches("p:empty", &f.arena, f.p1));
    assert!(matches("span:empty", &f.arena, f.span));
    assert!(matches("html:root", &f.arena, f.arena.document_element().unwrap()));
}

#[test]
fn test_attribute_selectors() {
    let f = fixture();
    assert!(matches("[id]", &f.arena, f.div));
    assert!(matches("[id=main]", &f.arena, f.div));
    assert!(matches("[id=\"main\"]", &f.arena, f.div));
    assert!(!matches("[id=other]", &f.arena, f.div));
    assert!(matches("[class~=warn]", &f.arena, f.div));
    assert!(!matches("[class~=war]", &f.arena, f.div));
    assert!(matches("[id^=ma]", &f.arena, f.div));
    assert!(matches("[id$=in]", &f.arena, f.div));
    assert!(matches("[id*=ai]", &f.arena, f.div));
    assert!(!matches("[class|=note]", &f.arena, f.div));
}

#[test]
fn test_negation_and_matches_any() {
    let f = fixture();
    assert!(matches("div:not(.missing)", &f.arena, f.div));
    assert!(!matches("div:not(.note)", &f.arena, f.div));
    assert!(matches("p:is(.x, p)", &f.arena, f.p1));
    assert!(matches(":where(#main)", &f.arena, f.div));
    assert!(!matches("p:is(.x, .y)", &f.arena, f.p1));
}

#[test]
fn test_interactive_pseudo_classes_never_match() {
    let f = fixture();
    assert!(!matches("div:hover", &f.arena, f.div));
    assert!(!matches("p:nth-child(1)", &f.arena, f.p1));
    // The selector still parses, so the rule is kept, not dropped.
    assert!(parse_selector("a:hover").is_some());
}

#[test]
fn test_pseudo_elements_are_recorded_and_stripped() {
    let selector = parse_selector("p::before").unwrap();
    assert!(selector.pseudo_element.is_some());
    let f = fixture();
    // Matching ignores the pseudo-element part.
    assert!(selector.matches(&f.arena, f.p1));

    // Legacy single-colon form.
    let legacy = parse_selector("p:after").unwrap();
    assert!(legacy.pseudo_element.is_some());
}

#[test]
fn test_selector_lists_split_on_top_level_commas() {
    let list = parse_selector_list("p, .note, #main");
    assert_eq!(list.len(), 3);
    // A comma inside :is() does not split the list.
    let list = parse_selector_list("p:is(.a, .b), span");
    assert_eq!(list.len(), 2);
}

#[test]
fn test_unparsable_list_items_are_dropped() {
    let list = parse_selector_list("p, ~~bad~~, span");
    assert_eq!(list.len(), 2);
}
