//! End-to-end pipeline tests: markup in, render-node list and side tables
//! out.

use vellum_css::DefaultEnvironment;
use vellum_render::{
    IncrementalScheduler, ParseResult, RenderNodeKind, WidgetKind, ascii_table, parse_document,
};

fn parse(html: &str) -> ParseResult {
    parse_document(html, DefaultEnvironment::default())
}

/// All text of the render-node list, blocks separated by `\n`.
fn all_text(result: &ParseResult) -> String {
    result
        .nodes
        .iter()
        .filter_map(|n| {
            let text = n.text();
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_paragraphs_become_separate_blocks() {
    // The first <p> is implicitly closed by the second.
    let result = parse("<!DOCTYPE html><p>a<p>b</p>");
    let blocks: Vec<String> = result
        .nodes
        .iter()
        .filter(|n| matches!(n.kind, RenderNodeKind::Block { .. }))
        .map(vellum_render::RenderNode::text)
        .collect();
    assert_eq!(blocks, ["a", "b"]);
}

#[test]
fn test_headings_carry_level() {
    let result = parse("<h1>Top</h1><h3 style=\"text-align: center\">Mid</h3>");
    let headings: Vec<(u8, String)> = result
        .nodes
        .iter()
        .filter_map(|n| match &n.kind {
            RenderNodeKind::Heading { level, .. } => Some((*level, n.text())),
            _ => None,
        })
        .collect();
    assert_eq!(headings, [(1, "Top".into()), (3, "Mid".into())]);
}

#[test]
fn test_inline_formatting_flags() {
    let result = parse("<p>plain <b>bold <i>both</i></b> <code>mono</code></p>");
    let spans = result.nodes[0].spans().expect("block has spans");
    let bold = spans.iter().find(|s| s.text.contains("bold")).unwrap();
    assert!(bold.bold && !bold.italic);
    let both = spans.iter().find(|s| s.text.contains("both")).unwrap();
    assert!(both.bold && both.italic);
    let mono = spans.iter().find(|s| s.text.contains("mono")).unwrap();
    assert!(mono.code);
}

#[test]
fn test_links_attach_href_and_skip_javascript() {
    let result = parse(r##"<p><a href="/page" download="f.txt">go</a> <a href="javascript:void(0)">no</a></p>"##);
    let spans = result.nodes[0].spans().unwrap();
    let link = spans.iter().find(|s| s.text.contains("go")).unwrap();
    assert_eq!(link.href.as_deref(), Some("/page"));
    assert_eq!(link.download.as_deref(), Some("f.txt"));
    let blocked = spans.iter().find(|s| s.text.contains("no")).unwrap();
    assert_eq!(blocked.href, None);
}

#[test]
fn test_cascaded_color_reaches_spans() {
    let result = parse("<style>p { color: red }</style><p>tinted</p>");
    let spans = result
        .nodes
        .iter()
        .find_map(|n| n.spans())
        .expect("a block renders");
    assert_eq!(spans[0].color.as_deref(), Some("red"));
}

#[test]
fn test_display_none_suppresses_subtree() {
    let result = parse("<style>.gone { display: none }</style><p>seen</p><div class=gone><p>unseen</p></div>");
    let text = all_text(&result);
    assert!(text.contains("seen"));
    assert!(!text.contains("unseen"));
}

#[test]
fn test_list_items_carry_indent() {
    let result = parse("<ul><li>one<ul><li>nested</li></ul></li><li>two</li></ul>");
    let items: Vec<(u8, String)> = result
        .nodes
        .iter()
        .filter_map(|n| match &n.kind {
            RenderNodeKind::ListItem { indent, .. } => Some((*indent, n.text())),
            _ => None,
        })
        .collect();
    assert_eq!(
        items,
        [
            (0, "one".into()),
            (1, "nested".into()),
            (0, "two".into())
        ]
    );
}

#[test]
fn test_blockquote_and_hr() {
    let result = parse("<blockquote>wise words</blockquote><hr>");
    assert!(result.nodes.iter().any(|n| matches!(
        &n.kind,
        RenderNodeKind::Blockquote { indent: 1, .. }
    )));
    assert!(
        result
            .nodes
            .iter()
            .any(|n| matches!(n.kind, RenderNodeKind::HorizontalRule))
    );
}

#[test]
fn test_pre_splits_lines_and_preserves_spacing() {
    let result = parse("<pre>first  line\n  second</pre>");
    let pre: Vec<String> = result
        .nodes
        .iter()
        .filter(|n| matches!(n.kind, RenderNodeKind::Preformatted { .. }))
        .map(vellum_render::RenderNode::text)
        .collect();
    assert_eq!(pre, ["first  line", "  second"]);
}

#[test]
fn test_table_rows_and_ascii_glyphs() {
    let result = parse(
        "<table><tr><th>name</th><th>age</th></tr><tr><td>ada</td><td>36</td></tr></table>",
    );
    let rows = result
        .nodes
        .iter()
        .find_map(|n| match &n.kind {
            RenderNodeKind::Table { rows } => Some(rows.clone()),
            _ => None,
        })
        .expect("table node emitted");
    assert_eq!(rows.len(), 2);
    assert!(rows[0].cells[0].header);
    assert_eq!(rows[1].cells[0].text, "ada");

    let lines = ascii_table(&rows);
    assert!(lines[0].starts_with('┌') && lines[0].ends_with('┐'));
    assert!(lines[2].starts_with('╞') && lines[2].contains('╪'));
    assert!(lines.last().unwrap().starts_with('└'));
}

#[test]
fn test_foster_parented_content_renders_before_table() {
    let result = parse("<table><div>displaced</div><tr><td>cell</td></tr></table>");
    let displaced_at = result
        .nodes
        .iter()
        .position(|n| n.text().contains("displaced"))
        .expect("foster-parented block renders");
    let table_at = result
        .nodes
        .iter()
        .position(|n| matches!(n.kind, RenderNodeKind::Table { .. }))
        .expect("table renders");
    assert!(displaced_at < table_at);
}

#[test]
fn test_form_widgets_and_kind_normalization() {
    let result = parse(
        r#"<form action="/s" method=POST>
             <input type="email" name="who" required>
             <input type="hidden" name="tok" value="1">
             <input type="image" name="go">
             <select name="pick"><option value=a>A</option><option selected>B</option></select>
             <textarea name="msg" rows=4 cols=10>hi</textarea>
             <button>Send</button>
           </form>"#,
    );
    assert_eq!(result.forms.len(), 1);
    assert_eq!(result.forms[0].method, "post");
    assert_eq!(result.forms[0].action, "/s");

    let kinds: Vec<WidgetKind> = result.widgets.iter().map(|w| w.kind).collect();
    assert_eq!(
        kinds,
        [
            WidgetKind::Text,
            WidgetKind::Hidden,
            WidgetKind::Submit,
            WidgetKind::Select,
            WidgetKind::Textarea,
            WidgetKind::Submit,
        ]
    );
    assert!(result.widgets.iter().all(|w| w.form_index == Some(0)));
    assert!(result.widgets[0].required);

    let select = &result.widgets[3];
    assert_eq!(select.options.len(), 2);
    assert_eq!(select.value, "B");

    let textarea = &result.widgets[4];
    assert_eq!((textarea.rows, textarea.cols), (4, 10));
    assert_eq!(textarea.value, "hi");

    let button = &result.widgets[5];
    assert_eq!(button.value, "Send");

    // Hidden inputs join the widget table but never the node list.
    assert!(!result.nodes.iter().any(|n| matches!(
        &n.kind,
        RenderNodeKind::Widget { blueprint } if blueprint.kind == WidgetKind::Hidden
    )));
}

#[test]
fn test_head_collection() {
    let result = parse(
        r#"<html><head>
             <title>The  Title</title>
             <base href="https://example.net/app/">
             <link rel="stylesheet" href="main.css">
             <link rel="icon" href="/fav.png">
             <style>p { color: red }</style>
             <script src="app.js"></script>
             <script>var inline = 1;</script>
           </head><body><p>x</p></body></html>"#,
    );
    assert_eq!(result.title, "The Title");
    assert_eq!(result.base_url, "https://example.net/app/");
    assert_eq!(result.style_links, ["main.css"]);
    assert_eq!(result.favicon.as_deref(), Some("/fav.png"));
    assert_eq!(result.styles.len(), 1);
    assert_eq!(result.scripts.len(), 2);
    assert!(!result.scripts[0].inline);
    assert_eq!(result.scripts[0].src.as_deref(), Some("app.js"));
    assert!(result.scripts[1].inline);
    assert_eq!(result.scripts[1].code, "var inline = 1;");
}

#[test]
fn test_quirks_mode_flag() {
    assert!(!parse("<!DOCTYPE html><p>x</p>").quirks_mode);
    assert!(parse("<p>x</p>").quirks_mode);
}

#[test]
fn test_templates_collected_not_rendered() {
    let result = parse("<template id=row><p>inside</p></template><p>outside</p>");
    assert!(!all_text(&result).contains("inside"));
    let fragment = result.templates.get("row").expect("template captured");
    assert!(fragment.iter().any(|n| n.text().contains("inside")));
}

#[test]
fn test_pseudo_content_with_counters() {
    let result = parse(
        "<style>\
           ol.steps { counter-reset: step }\
           ol.steps li { counter-increment: step }\
           ol.steps li::before { content: counter(step) \". \" }\
         </style>\
         <ol class=steps><li>alpha</li><li>beta</li></ol>",
    );
    let items: Vec<String> = result
        .nodes
        .iter()
        .filter(|n| matches!(n.kind, RenderNodeKind::ListItem { .. }))
        .map(vellum_render::RenderNode::text)
        .collect();
    assert_eq!(items, ["1. alpha", "2. beta"]);
}

#[test]
fn test_progress_renders_block_glyphs() {
    let result = parse("<p><progress value=5 max=10></progress></p>");
    let text = all_text(&result);
    assert_eq!(text, "█████░░░░░");
}

#[test]
fn test_placeholders_for_embedded_content() {
    let result = parse("<iframe src=x>fallback</iframe><video>alt</video>");
    let text = all_text(&result);
    assert!(text.contains("[iframe]"));
    assert!(text.contains("[video]"));
    assert!(!text.contains("fallback"));
}

#[test]
fn test_picture_source_selection() {
    let result = parse(
        r#"<picture>
             <source srcset="wide.avif 2x, tall.avif" type="image/avif">
             <img src="fallback.png" alt="art">
           </picture>"#,
    );
    let image = result
        .nodes
        .iter()
        .find_map(|n| match &n.kind {
            RenderNodeKind::Picture { image } => Some(image.clone()),
            _ => None,
        })
        .expect("picture node emitted");
    assert_eq!(image.src, "wide.avif");
    assert_eq!(image.alt, "art");
}

#[test]
fn test_plain_img_is_an_image_widget() {
    let result = parse(r#"<p><img src="cat.png" alt="cat"></p>"#);
    let widget = result
        .nodes
        .iter()
        .find_map(|n| match &n.kind {
            RenderNodeKind::Widget { blueprint } => Some(blueprint.clone()),
            _ => None,
        })
        .expect("image widget emitted");
    assert_eq!(widget.kind, WidgetKind::Image);
    assert_eq!(widget.src.as_deref(), Some("cat.png"));
}

#[test]
fn test_media_query_affects_render_output() {
    let html = "<style>@media (min-width: 10000px) { p { color: red } }</style><p>x</p>";
    let result = parse(html);
    let spans = result.nodes.iter().find_map(|n| n.spans()).unwrap();
    assert_eq!(spans[0].color, None);
}

#[test]
fn test_incremental_scheduler_matches_one_shot() {
    let html = "<!DOCTYPE html><html><head><title>T</title></head>\
                <body><p>Hello <b>world</b></p><ul><li>a</li><li>b</li></ul></body></html>";
    let one_shot = parse(html);

    let mut scheduler = IncrementalScheduler::new(DefaultEnvironment::default());
    // Split mid-tag on purpose; the front-end buffers to the boundary.
    let (first, second) = html.split_at(10);
    scheduler.feed(first);
    let _ = scheduler.render();
    scheduler.feed(second);
    let finished = scheduler.finish();
    assert_eq!(finished, one_shot);
}

#[test]
fn test_intermediate_renders_are_best_effort_prefixes() {
    let mut scheduler = IncrementalScheduler::new(DefaultEnvironment::default());
    scheduler.feed("<p>Hel");
    let early = scheduler.render();
    // Nothing but a lone open tag has settled; no text yet.
    assert!(all_text(&early).is_empty());
    scheduler.feed("lo</p>");
    let done = scheduler.finish();
    assert_eq!(all_text(&done), "Hello");
}

#[test]
fn test_result_serializes_to_json() {
    let result = parse("<!DOCTYPE html><p>hi <b>there</b></p>");
    let json = serde_json::to_string(&result).expect("result serializes");
    assert!(json.contains("\"nodes\""));
    assert!(json.contains("there"));
}
