//! Integration tests for HTML tree construction.

use vellum_dom::{NodeArena, NodeId};
use vellum_html::{Tokenizer, TreeBuilder};

/// Parse a document all the way to a tree.
fn parse(input: &str) -> NodeArena {
    TreeBuilder::new(Tokenizer::tokenize(input)).run()
}

/// Find the first element with the given tag name, in document order.
fn find(arena: &NodeArena, tag: &str) -> Option<NodeId> {
    arena
        .iter_all()
        .find(|&id| arena.as_element(id).is_some_and(|e| e.tag_name == tag))
}

/// Tag names of an element's element children.
fn child_tags(arena: &NodeArena, id: NodeId) -> Vec<String> {
    arena
        .children(id)
        .iter()
        .filter_map(|&c| arena.as_element(c).map(|e| e.tag_name.clone()))
        .collect()
}

/// Concatenated text content of a subtree.
fn text_content(arena: &NodeArena, id: NodeId) -> String {
    let mut out = String::new();
    if let Some(t) = arena.as_text(id) {
        out.push_str(t);
    }
    for &child in arena.children(id) {
        out.push_str(&text_content(arena, child));
    }
    out
}

#[test]
fn test_empty_input_still_builds_document_scaffolding() {
    let arena = parse("");
    let html = arena.document_element().expect("implicit <html>");
    assert_eq!(child_tags(&arena, html), ["head", "body"]);
    assert!(arena.body().is_some());
}

#[test]
fn test_text_without_markup_lands_in_body() {
    let arena = parse("just text");
    let body = arena.body().unwrap();
    assert_eq!(text_content(&arena, body), "just text");
}

#[test]
fn test_every_node_parents_back_to_document() {
    let arena = parse("<!DOCTYPE html><p>a<b>c</b></p><ul><li>x</li></ul>");
    for id in arena.iter_all() {
        if id == NodeId::ROOT {
            continue;
        }
        let parent = arena.parent(id).expect("node has a parent");
        assert!(arena.children(parent).contains(&id));
        assert_eq!(arena.ancestors(id).last(), Some(NodeId::ROOT));
    }
}

#[test]
fn test_foster_parenting_moves_div_before_table() {
    let arena = parse("<!DOCTYPE html><html><body><table><div id=x>hi</div></table></body></html>");
    let body = arena.body().unwrap();
    assert_eq!(child_tags(&arena, body), ["div", "table"]);
    let div = find(&arena, "div").unwrap();
    assert_eq!(arena.as_element(div).unwrap().id(), Some("x"));
    assert_eq!(text_content(&arena, div), "hi");
    // The displaced div sits immediately before the table it came from.
    let table = find(&arena, "table").unwrap();
    assert_eq!(arena.next_sibling(div), Some(table));
}

#[test]
fn test_foster_parented_nodes_keep_their_relative_order() {
    let arena = parse("<table><div>a</div><div>b</div><tr><td>c</td></tr></table>");
    let body = arena.body().unwrap();
    let tags = child_tags(&arena, body);
    assert_eq!(tags, ["div", "div", "table"]);
    let first = arena.children(body)[0];
    let second = arena.children(body)[1];
    assert_eq!(text_content(&arena, first), "a");
    assert_eq!(text_content(&arena, second), "b");
}

#[test]
fn test_non_whitespace_table_text_is_foster_parented() {
    let arena = parse("<table>oops<tr><td>x</td></tr></table>");
    let body = arena.body().unwrap();
    let children = arena.children(body);
    // Text first, then the table.
    assert_eq!(arena.as_text(children[0]), Some("oops"));
    assert_eq!(child_tags(&arena, body), ["table"]);
}

#[test]
fn test_p_is_implicitly_closed_by_next_p() {
    let arena = parse("<p>a<p>b</p>");
    let body = arena.body().unwrap();
    assert_eq!(child_tags(&arena, body), ["p", "p"]);
    let children = arena.children(body);
    assert_eq!(text_content(&arena, children[0]), "a");
    assert_eq!(text_content(&arena, children[1]), "b");
}

#[test]
fn test_p_is_implicitly_closed_by_block_elements() {
    let arena = parse("<p>a<div>b</div>");
    let body = arena.body().unwrap();
    assert_eq!(child_tags(&arena, body), ["p", "div"]);
}

#[test]
fn test_heading_closes_open_paragraph() {
    let arena = parse("<p>intro<h1>Title</h1>");
    let body = arena.body().unwrap();
    assert_eq!(child_tags(&arena, body), ["p", "h1"]);
}

#[test]
fn test_stray_tr_gets_implicit_tbody() {
    let arena = parse("<table><tr><td>x</td></tr></table>");
    let table = find(&arena, "table").unwrap();
    assert_eq!(child_tags(&arena, table), ["tbody"]);
    let tbody = find(&arena, "tbody").unwrap();
    assert_eq!(child_tags(&arena, tbody), ["tr"]);
    let tr = find(&arena, "tr").unwrap();
    assert_eq!(child_tags(&arena, tr), ["td"]);
}

#[test]
fn test_stray_td_gets_implicit_row() {
    let arena = parse("<table><tbody><td>x</td></tbody></table>");
    let tbody = find(&arena, "tbody").unwrap();
    assert_eq!(child_tags(&arena, tbody), ["tr"]);
}

#[test]
fn test_cell_implicitly_closed_by_next_cell() {
    let arena = parse("<table><tr><td>a<td>b</tr></table>");
    let tr = find(&arena, "tr").unwrap();
    assert_eq!(child_tags(&arena, tr), ["td", "td"]);
}

#[test]
fn test_li_implicitly_closed_by_next_li() {
    let arena = parse("<ul><li>a<li>b</ul>");
    let ul = find(&arena, "ul").unwrap();
    assert_eq!(child_tags(&arena, ul), ["li", "li"]);
}

#[test]
fn test_script_body_is_a_single_text_child() {
    let arena = parse("<script>var x = 0 < 1;</script>");
    let script = find(&arena, "script").unwrap();
    let children = arena.children(script);
    assert_eq!(children.len(), 1);
    assert_eq!(arena.as_text(children[0]), Some("var x = 0 < 1;"));
}

#[test]
fn test_void_elements_have_no_children() {
    let arena = parse("<p>a<br>b<img src=x>c<hr></p>");
    for tag in ["br", "img", "hr"] {
        let id = find(&arena, tag).unwrap();
        assert!(
            arena.children(id).is_empty(),
            "<{tag}> must have no children"
        );
    }
}

#[test]
fn test_adjacent_text_merges_into_one_node() {
    // Two runs split by an entity boundary still coalesce in the tree.
    let arena = parse("<p>a<!-- split -->b</p>");
    let p = find(&arena, "p").unwrap();
    let texts: Vec<&str> = arena
        .children(p)
        .iter()
        .filter_map(|&c| arena.as_text(c))
        .collect();
    // The comment node sits between them, so two text nodes here.
    assert_eq!(texts, ["a", "b"]);

    let arena = parse("<p>a&amp;b</p>");
    let p = find(&arena, "p").unwrap();
    let children = arena.children(p);
    assert_eq!(children.len(), 1);
    assert_eq!(arena.as_text(children[0]), Some("a&b"));
}

#[test]
fn test_head_collects_metadata_elements() {
    let arena = parse("<title>T</title><meta charset=utf-8><p>body text");
    let html = arena.document_element().unwrap();
    let head = arena.children(html)[0];
    assert_eq!(child_tags(&arena, head), ["title", "meta"]);
    let body = arena.body().unwrap();
    assert_eq!(child_tags(&arena, body), ["p"]);
}

#[test]
fn test_repeated_html_tag_merges_attributes() {
    let arena = parse("<html lang=en><html dir=ltr><body></body></html>");
    let html = arena.document_element().unwrap();
    let data = arena.as_element(html).unwrap();
    assert_eq!(data.attrs.get("lang"), Some("en"));
    assert_eq!(data.attrs.get("dir"), Some("ltr"));
}

#[test]
fn test_select_pops_nested_options() {
    let arena = parse("<select><option>a<option>b<optgroup><option>c</select>after");
    let select = find(&arena, "select").unwrap();
    assert_eq!(child_tags(&arena, select), ["option", "option", "optgroup"]);
    let body = arena.body().unwrap();
    assert!(text_content(&arena, body).ends_with("after"));
}

#[test]
fn test_template_content_is_kept_but_separate() {
    let arena = parse("<template id=row><li>item</li></template><p>x</p>");
    let template = find(&arena, "template").unwrap();
    assert_eq!(child_tags(&arena, template), ["li"]);
    let body = arena.body().unwrap();
    assert!(child_tags(&arena, body).contains(&"p".to_string()));
}

#[test]
fn test_unmatched_end_tags_are_ignored() {
    let arena = parse("<p>a</div></span>b</p>");
    let body = arena.body().unwrap();
    assert_eq!(child_tags(&arena, body), ["p"]);
    let p = find(&arena, "p").unwrap();
    assert_eq!(text_content(&arena, p), "ab");
}

#[test]
fn test_content_after_body_reopens_body() {
    let arena = parse("<body><p>a</p></body><p>b</p>");
    let body = arena.body().unwrap();
    assert_eq!(child_tags(&arena, body), ["p", "p"]);
}

#[test]
fn test_pre_swallows_first_newline() {
    let arena = parse("<pre>\nline</pre>");
    let pre = find(&arena, "pre").unwrap();
    assert_eq!(text_content(&arena, pre), "line");
}

#[test]
fn test_run_with_issues_records_parse_errors() {
    let tokens = Tokenizer::tokenize("<table><div>x</div></table>");
    let (_, issues) = TreeBuilder::new(tokens).run_with_issues();
    assert!(!issues.is_empty());
}
