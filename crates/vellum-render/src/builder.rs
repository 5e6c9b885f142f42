//! The render-node builder: element tree + cascade in, flat node list out.
//!
//! One depth-first walk over the tree. Inline formatting is tracked as
//! nesting counters, text accumulates into an open scratch block until a
//! block boundary flushes it, and side tables (title, forms, widgets,
//! scripts, templates) fill in as their elements pass by.

use std::collections::HashMap;

use vellum_css::selector::PseudoElement;
use vellum_css::{CascadeEngine, ComputedProps, Environment};
use vellum_dom::{ElementData, NodeArena, NodeId, NodeKind};

use crate::node::{
    ImageRef, InlineSpan, RenderNode, RenderNodeKind, StyleBox, TextAlign,
};
use crate::result::{FormRecord, ParseResult, ScriptRecord};
use crate::svg::SvgRasterizer;
use crate::table::TableScratch;
use crate::widget::{SelectOption, WidgetBlueprint, WidgetKind};

/// Inline formatting attributes tracked as nesting depths.
#[derive(Debug, Clone, Copy)]
enum InlineAttr {
    Bold,
    Italic,
    Code,
    Strikethrough,
    Mark,
    Underline,
    Small,
}

/// Block kinds a scratch block can flush into.
#[derive(Debug, Clone, PartialEq)]
enum ScratchKind {
    Paragraph,
    Heading(u8),
    Pre,
    ListItem(u8),
    Blockquote(u8),
    Summary,
    Grid(Vec<String>),
}

/// The open block accumulating inline spans until the next block boundary.
#[derive(Debug)]
struct OpenBlock {
    kind: ScratchKind,
    spans: Vec<InlineSpan>,
    style: StyleBox,
    align: TextAlign,
}

/// Walks the element tree and emits the layout input.
pub struct RenderBuilder<'a, E: Environment> {
    arena: &'a NodeArena,
    engine: &'a mut CascadeEngine<E>,
    rasterizer: &'a dyn SvgRasterizer,

    out: Vec<RenderNode>,

    // Inline attribute nesting counters.
    bold: u32,
    italic: u32,
    code: u32,
    strikethrough: u32,
    mark: u32,
    underline: u32,
    small: u32,

    list_depth: u32,
    blockquote_depth: u32,
    hidden_depth: u32,
    pre_depth: u32,
    /// `(href, download)` stack for nested anchors.
    links: Vec<(Option<String>, Option<String>)>,
    /// Computed styles of open elements; the top styles new spans.
    style_stack: Vec<std::rc::Rc<ComputedProps>>,
    scratch: Option<OpenBlock>,
    /// Open tables, innermost last.
    tables: Vec<TableScratch>,
    /// Raised while inside `<caption>`, routing text past the table.
    table_suspend: u32,
    /// `::before` content waiting for the element's own block to open.
    pending_before: Option<String>,
    /// `<picture>` source URL lists, innermost last.
    picture_sources: Vec<Vec<String>>,
    counters: HashMap<String, i64>,
    form_stack: Vec<usize>,

    title: String,
    base_url: String,
    favicon: Option<String>,
    styles: Vec<String>,
    style_links: Vec<String>,
    scripts: Vec<ScriptRecord>,
    forms: Vec<FormRecord>,
    widgets: Vec<WidgetBlueprint>,
    templates: HashMap<String, Vec<RenderNode>>,
}

impl<'a, E: Environment> RenderBuilder<'a, E> {
    /// Create a builder over a parsed tree and its cascade engine.
    #[must_use]
    pub fn new(
        arena: &'a NodeArena,
        engine: &'a mut CascadeEngine<E>,
        rasterizer: &'a dyn SvgRasterizer,
    ) -> Self {
        Self {
            arena,
            engine,
            rasterizer,
            out: Vec::new(),
            bold: 0,
            italic: 0,
            code: 0,
            strikethrough: 0,
            mark: 0,
            underline: 0,
            small: 0,
            list_depth: 0,
            blockquote_depth: 0,
            hidden_depth: 0,
            pre_depth: 0,
            links: Vec::new(),
            style_stack: Vec::new(),
            scratch: None,
            tables: Vec::new(),
            table_suspend: 0,
            pending_before: None,
            picture_sources: Vec::new(),
            counters: HashMap::new(),
            form_stack: Vec::new(),
            title: String::new(),
            base_url: String::new(),
            favicon: None,
            styles: Vec::new(),
            style_links: Vec::new(),
            scripts: Vec::new(),
            forms: Vec::new(),
            widgets: Vec::new(),
            templates: HashMap::new(),
        }
    }

    /// Walk the whole document and assemble the result. The quirks flag is
    /// left false; the caller owns the raw bytes and sets it.
    #[must_use]
    pub fn run(mut self) -> ParseResult {
        self.walk_children(self.arena.root());
        self.flush_block();
        ParseResult {
            nodes: self.out,
            title: self.title,
            forms: self.forms,
            widgets: self.widgets,
            base_url: self.base_url,
            scripts: self.scripts,
            styles: self.styles,
            style_links: self.style_links,
            quirks_mode: false,
            templates: self.templates,
            favicon: self.favicon,
        }
    }

    fn walk_children(&mut self, id: NodeId) {
        for &child in self.arena.children(id) {
            self.walk(child);
        }
    }

    fn walk(&mut self, id: NodeId) {
        match self.arena.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element(_)) => self.on_element(id),
            Some(NodeKind::Text(text)) => {
                let text = text.clone();
                self.on_text(&text);
            }
            Some(NodeKind::Document | NodeKind::DocumentFragment) => self.walk_children(id),
            Some(NodeKind::Comment(_)) | None => {}
        }
    }

    // ===== Text =====

    fn on_text(&mut self, text: &str) {
        if self.hidden_depth > 0 {
            return;
        }
        if self.table_suspend == 0
            && let Some(table) = self.tables.last_mut()
        {
            if table.in_cell() {
                table.push_text(text);
            }
            return;
        }
        if self.pre_depth > 0 {
            self.on_pre_text(text);
            return;
        }
        let collapsed = collapse_whitespace(text);
        if collapsed.trim().is_empty() {
            // Bare whitespace between blocks carries nothing.
            if self.scratch.is_some() {
                self.push_text(" ");
            }
            return;
        }
        self.push_text(&collapsed);
    }

    /// Preformatted text: preserve whitespace, split lines at `\n` into
    /// separate preformatted nodes.
    fn on_pre_text(&mut self, text: &str) {
        let mut first = true;
        for segment in text.split('\n') {
            if !first {
                self.flush_pre_line();
            }
            first = false;
            if !segment.is_empty() {
                self.push_text(segment);
            }
        }
    }

    /// Close the current preformatted line, emitting it even when empty so
    /// blank source lines survive.
    fn flush_pre_line(&mut self) {
        if self.scratch.is_none() {
            self.open_block();
        }
        if let Some(block) = self.scratch.take() {
            self.emit(RenderNode::new(
                RenderNodeKind::Preformatted { spans: block.spans },
                block.style,
            ));
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() || self.hidden_depth > 0 {
            return;
        }
        if self.scratch.is_none() {
            if text.trim().is_empty() {
                return;
            }
            self.open_block();
        }
        let span = self.make_span(text);
        if let Some(block) = self.scratch.as_mut() {
            if let Some(last) = block.spans.last_mut()
                && same_attrs(last, &span)
            {
                last.text.push_str(&span.text);
            } else {
                block.spans.push(span);
            }
        }
    }

    fn make_span(&self, text: &str) -> InlineSpan {
        let (href, download) = self.links.last().cloned().unwrap_or((None, None));
        InlineSpan {
            text: text.to_string(),
            href,
            download,
            bold: self.bold > 0,
            italic: self.italic > 0,
            code: self.code > 0,
            strikethrough: self.strikethrough > 0,
            mark: self.mark > 0,
            underline: self.underline > 0,
            color: self.current_props().and_then(|p| p.get("color").map(str::to_string)),
            scale: if self.small > 0 { 0.85 } else { 1.0 },
        }
    }

    fn current_props(&self) -> Option<&ComputedProps> {
        self.style_stack.last().map(AsRef::as_ref)
    }

    // ===== Blocks =====

    /// Open the default scratch block for the current context.
    fn open_block(&mut self) {
        let style = self
            .current_props()
            .map(StyleBox::from_computed)
            .unwrap_or_default();
        let align = TextAlign::from_value(self.current_props().and_then(|p| p.get("text-align")));
        let kind = if self.pre_depth > 0 {
            ScratchKind::Pre
        } else if self.blockquote_depth > 0 {
            ScratchKind::Blockquote(depth_u8(self.blockquote_depth))
        } else {
            ScratchKind::Paragraph
        };
        self.scratch = Some(OpenBlock {
            kind,
            spans: Vec::new(),
            style,
            align,
        });
        self.take_pending_before();
    }

    fn open_block_as(&mut self, kind: ScratchKind, props: &ComputedProps) {
        self.flush_block();
        self.scratch = Some(OpenBlock {
            kind,
            spans: Vec::new(),
            style: StyleBox::from_computed(props),
            align: TextAlign::from_value(props.get("text-align")),
        });
        self.take_pending_before();
    }

    /// Deliver held `::before` content into the just-opened block.
    fn take_pending_before(&mut self) {
        if let Some(text) = self.pending_before.take() {
            let span = self.make_span(&text);
            if let Some(block) = self.scratch.as_mut() {
                block.spans.push(span);
            }
        }
    }

    /// Emit the open scratch block, if it holds anything.
    fn flush_block(&mut self) {
        let Some(block) = self.scratch.take() else {
            return;
        };
        let has_text = block.spans.iter().any(|s| !s.text.trim().is_empty());
        let keep_empty = matches!(
            block.kind,
            ScratchKind::Heading(_) | ScratchKind::ListItem(_) | ScratchKind::Summary
        );
        if !has_text && !keep_empty {
            return;
        }
        let kind = match block.kind {
            ScratchKind::Paragraph => RenderNodeKind::Block { spans: block.spans },
            ScratchKind::Heading(level) => RenderNodeKind::Heading {
                level,
                spans: block.spans,
                align: block.align,
            },
            ScratchKind::Pre => RenderNodeKind::Preformatted { spans: block.spans },
            ScratchKind::ListItem(indent) => RenderNodeKind::ListItem {
                indent,
                spans: block.spans,
                align: block.align,
            },
            ScratchKind::Blockquote(indent) => RenderNodeKind::Blockquote {
                indent,
                spans: block.spans,
            },
            ScratchKind::Summary => RenderNodeKind::Summary { spans: block.spans },
            ScratchKind::Grid(tracks) => RenderNodeKind::Grid {
                spans: block.spans,
                tracks,
            },
        };
        self.emit(RenderNode::new(kind, block.style));
    }

    fn emit(&mut self, node: RenderNode) {
        if self.hidden_depth == 0 {
            self.out.push(node);
        }
    }

    /// Paragraph breaks never stack: one boundary, one break.
    fn emit_paragraph_break(&mut self, style: StyleBox) {
        self.flush_block();
        if self.hidden_depth > 0 {
            return;
        }
        let boundary_already = matches!(
            self.out.last().map(|n| &n.kind),
            None | Some(RenderNodeKind::ParagraphBreak)
        );
        if !boundary_already {
            self.out
                .push(RenderNode::new(RenderNodeKind::ParagraphBreak, style));
        }
    }

    // ===== Elements =====

    #[allow(clippy::too_many_lines)]
    fn on_element(&mut self, id: NodeId) {
        // The arena lives outside the builder, so element data borrowed
        // from it stays valid across the mutable walk below.
        let arena: &'a NodeArena = self.arena;
        let Some(data) = arena.as_element(id) else {
            return;
        };

        // Subtrees consumed whole, before any cascade work.
        match data.tag_name.as_str() {
            "head" => {
                self.collect_head(id);
                return;
            }
            "template" => {
                self.collect_template(id);
                return;
            }
            "script" => {
                self.record_script(id);
                return;
            }
            "style" => {
                let css = self.text_content(id);
                if !css.trim().is_empty() {
                    self.styles.push(css);
                }
                return;
            }
            "link" => {
                self.collect_link(id);
                return;
            }
            "title" | "meta" | "base" | "option" | "optgroup" | "col" | "colgroup" => return,
            _ => {}
        }

        let props = self.engine.computed_style(arena, id);
        let hidden = props.get("display").map(str::trim) == Some("none")
            || data.attrs.contains("hidden");

        self.apply_counters(&props);
        if hidden {
            self.hidden_depth += 1;
        }
        self.style_stack.push(std::rc::Rc::clone(&props));

        self.inject_pseudo_content(id, PseudoElement::Before);
        self.element_content(id, data, &props);
        // `::before` content held for a block that never opened (an
        // element with no text flow of its own) still renders.
        if let Some(text) = self.pending_before.take() {
            self.push_text(&text);
        }
        self.inject_pseudo_content(id, PseudoElement::After);

        let _ = self.style_stack.pop();
        if hidden {
            self.hidden_depth -= 1;
        }
    }

    /// Per-tag handling between the `::before` and `::after` injections.
    #[allow(clippy::too_many_lines)]
    fn element_content(&mut self, id: NodeId, data: &ElementData, props: &ComputedProps) {
        match data.tag_name.as_str() {
            // Inline formatting nesting.
            "strong" | "b" => self.formatted(InlineAttr::Bold, id),
            "em" | "i" | "cite" | "var" | "dfn" => self.formatted(InlineAttr::Italic, id),
            "code" | "kbd" | "samp" | "tt" => self.formatted(InlineAttr::Code, id),
            "del" | "s" | "strike" => self.formatted(InlineAttr::Strikethrough, id),
            "mark" => self.formatted(InlineAttr::Mark, id),
            "u" | "ins" => self.formatted(InlineAttr::Underline, id),
            "small" => self.formatted(InlineAttr::Small, id),
            "q" => {
                self.push_text("\u{201C}");
                self.walk_children(id);
                self.push_text("\u{201D}");
            }
            "a" => {
                let href = data
                    .attrs
                    .get("href")
                    .filter(|h| !h.trim_start().to_ascii_lowercase().starts_with("javascript:"))
                    .map(str::to_string);
                let download = data.attrs.get("download").map(str::to_string);
                self.links.push((href, download));
                self.walk_children(id);
                let _ = self.links.pop();
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = data.tag_name.as_bytes()[1] - b'0';
                self.open_block_as(ScratchKind::Heading(level), props);
                self.walk_children(id);
                self.flush_block();
            }
            "pre" => {
                self.emit_paragraph_break(StyleBox::from_computed(props));
                self.pre_depth += 1;
                self.walk_children(id);
                self.flush_block();
                self.pre_depth -= 1;
            }
            "br" => {
                if self.pre_depth > 0 {
                    self.flush_pre_line();
                } else {
                    self.flush_block();
                }
            }
            "hr" => {
                self.flush_block();
                self.emit(RenderNode::new(
                    RenderNodeKind::HorizontalRule,
                    StyleBox::from_computed(props),
                ));
            }
            "ul" | "ol" | "menu" => {
                self.flush_block();
                self.list_depth += 1;
                self.walk_children(id);
                self.flush_block();
                self.list_depth -= 1;
            }
            "li" => {
                let indent = depth_u8(self.list_depth.saturating_sub(1));
                self.open_block_as(ScratchKind::ListItem(indent), props);
                self.walk_children(id);
                self.flush_block();
            }
            "blockquote" => {
                self.emit_paragraph_break(StyleBox::from_computed(props));
                self.blockquote_depth += 1;
                self.open_block_as(ScratchKind::Blockquote(depth_u8(self.blockquote_depth)), props);
                self.walk_children(id);
                self.flush_block();
                self.blockquote_depth -= 1;
            }
            "summary" => {
                self.open_block_as(ScratchKind::Summary, props);
                self.walk_children(id);
                self.flush_block();
            }
            "table" => self.table_element(id, props),
            "thead" | "tbody" | "tfoot" => self.walk_children(id),
            "tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.start_row();
                }
                self.walk_children(id);
                if let Some(table) = self.tables.last_mut() {
                    table.end_row();
                }
            }
            "td" | "th" => {
                let header = data.tag_name == "th";
                if let Some(table) = self.tables.last_mut() {
                    table.start_cell(header);
                }
                self.walk_children(id);
                if let Some(table) = self.tables.last_mut() {
                    table.end_cell();
                }
            }
            "caption" => {
                self.table_suspend += 1;
                self.open_block_as(ScratchKind::Paragraph, props);
                self.walk_children(id);
                self.flush_block();
                self.table_suspend -= 1;
            }
            "form" => {
                self.forms.push(FormRecord {
                    action: data.attrs.get("action").unwrap_or_default().to_string(),
                    method: data
                        .attrs
                        .get("method")
                        .unwrap_or("get")
                        .to_ascii_lowercase(),
                    enctype: data
                        .attrs
                        .get("enctype")
                        .unwrap_or("application/x-www-form-urlencoded")
                        .to_string(),
                });
                self.form_stack.push(self.forms.len() - 1);
                self.walk_children(id);
                let _ = self.form_stack.pop();
            }
            "input" => self.emit_widget(WidgetBlueprint::from_input(data, self.current_form()), props),
            "select" => self.select_element(id, data, props),
            "textarea" => self.textarea_element(id, data, props),
            "button" => self.button_element(id, data, props),
            "img" => self.image_element(data, props),
            "picture" => {
                self.picture_sources.push(Vec::new());
                self.walk_children(id);
                let _ = self.picture_sources.pop();
            }
            "source" => {
                if let Some(url) = first_source_url(data)
                    && let Some(sources) = self.picture_sources.last_mut()
                {
                    sources.push(url);
                }
            }
            "svg" => self.svg_element(id, props),
            "iframe" | "video" | "audio" | "object" | "embed" | "canvas" | "noscript"
            | "noembed" => {
                self.flush_block();
                self.open_block_as(ScratchKind::Paragraph, props);
                let placeholder = format!("[{}]", data.tag_name);
                self.push_text(&placeholder);
                self.flush_block();
                // Fallback/body content of embedded elements never renders.
            }
            "progress" | "meter" => {
                let bar = meter_glyphs(
                    data.attrs.get("value").and_then(|v| v.parse().ok()),
                    data.attrs
                        .get("max")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(1.0),
                );
                self.push_text(&bar);
            }
            "details" | "p" | "div" | "article" | "section" | "header" | "footer" | "aside"
            | "main" | "nav" | "figure" | "figcaption" | "address" | "dl" | "dd" | "dt"
            | "fieldset" | "center" => {
                self.emit_paragraph_break(StyleBox::from_computed(props));
                if props.get("display").map(str::trim) == Some("grid") {
                    let tracks = props
                        .get("grid-template-columns")
                        .map(|t| t.split_whitespace().map(str::to_string).collect())
                        .unwrap_or_default();
                    self.open_block_as(ScratchKind::Grid(tracks), props);
                }
                self.walk_children(id);
                self.flush_block();
            }
            // body, html, span, label, and anything unrecognized: walk on.
            _ => self.walk_children(id),
        }
    }

    /// Bump an inline nesting counter around the children walk.
    fn formatted(&mut self, attr: InlineAttr, id: NodeId) {
        *self.attr_depth(attr) += 1;
        self.walk_children(id);
        *self.attr_depth(attr) -= 1;
    }

    fn attr_depth(&mut self, attr: InlineAttr) -> &mut u32 {
        match attr {
            InlineAttr::Bold => &mut self.bold,
            InlineAttr::Italic => &mut self.italic,
            InlineAttr::Code => &mut self.code,
            InlineAttr::Strikethrough => &mut self.strikethrough,
            InlineAttr::Mark => &mut self.mark,
            InlineAttr::Underline => &mut self.underline,
            InlineAttr::Small => &mut self.small,
        }
    }

    // ===== Tables =====

    fn table_element(&mut self, id: NodeId, props: &ComputedProps) {
        self.flush_block();
        self.tables.push(TableScratch::default());
        self.walk_children(id);
        let rows = self.tables.pop().map(TableScratch::finish).unwrap_or_default();
        if !rows.is_empty() {
            self.emit(RenderNode::new(
                RenderNodeKind::Table { rows },
                StyleBox::from_computed(props),
            ));
        }
    }

    // ===== Widgets =====

    fn emit_widget(&mut self, blueprint: WidgetBlueprint, props: &ComputedProps) {
        self.widgets.push(blueprint.clone());
        if blueprint.kind == WidgetKind::Hidden {
            return;
        }
        self.flush_block();
        self.emit(RenderNode::new(
            RenderNodeKind::Widget { blueprint },
            StyleBox::from_computed(props),
        ));
    }

    fn current_form(&self) -> Option<usize> {
        self.form_stack.last().copied()
    }

    fn select_element(&mut self, id: NodeId, data: &ElementData, props: &ComputedProps) {
        let mut blueprint = WidgetBlueprint::new(WidgetKind::Select);
        blueprint.name = data.attrs.get("name").unwrap_or_default().to_string();
        blueprint.disabled = data.attrs.contains("disabled");
        blueprint.multiple = data.attrs.contains("multiple");
        blueprint.required = data.attrs.contains("required");
        blueprint.form_index = self.current_form();
        for option_id in self.arena.descendants(id) {
            let Some(option) = self.arena.as_element(option_id) else {
                continue;
            };
            if option.tag_name != "option" {
                continue;
            }
            let label = collapse_whitespace(&self.text_content(option_id))
                .trim()
                .to_string();
            let value = option
                .attrs
                .get("value")
                .map_or_else(|| label.clone(), str::to_string);
            blueprint.options.push(SelectOption {
                value,
                label,
                selected: option.attrs.contains("selected"),
            });
        }
        blueprint.value = blueprint
            .options
            .iter()
            .find(|o| o.selected)
            .or_else(|| blueprint.options.first())
            .map(|o| o.value.clone())
            .unwrap_or_default();
        self.emit_widget(blueprint, props);
    }

    fn textarea_element(&mut self, id: NodeId, data: &ElementData, props: &ComputedProps) {
        let mut blueprint = WidgetBlueprint::new(WidgetKind::Textarea);
        blueprint.name = data.attrs.get("name").unwrap_or_default().to_string();
        blueprint.disabled = data.attrs.contains("disabled");
        blueprint.readonly = data.attrs.contains("readonly");
        blueprint.required = data.attrs.contains("required");
        blueprint.placeholder = data.attrs.get("placeholder").map(str::to_string);
        blueprint.rows = data.attrs.get("rows").and_then(|v| v.parse().ok()).unwrap_or(2);
        blueprint.cols = data.attrs.get("cols").and_then(|v| v.parse().ok()).unwrap_or(20);
        blueprint.form_index = self.current_form();
        blueprint.value = self.text_content(id);
        self.emit_widget(blueprint, props);
    }

    fn button_element(&mut self, id: NodeId, data: &ElementData, props: &ComputedProps) {
        let kind = match data.attrs.get("type").map(str::to_ascii_lowercase).as_deref() {
            Some("reset") => WidgetKind::Reset,
            Some("button") => WidgetKind::Button,
            _ => WidgetKind::Submit,
        };
        let mut blueprint = WidgetBlueprint::new(kind);
        blueprint.name = data.attrs.get("name").unwrap_or_default().to_string();
        blueprint.disabled = data.attrs.contains("disabled");
        blueprint.form_index = self.current_form();
        let label = collapse_whitespace(&self.text_content(id)).trim().to_string();
        blueprint.value = if label.is_empty() {
            data.attrs.get("value").unwrap_or("Submit").to_string()
        } else {
            label
        };
        self.emit_widget(blueprint, props);
    }

    fn image_element(&mut self, data: &ElementData, props: &ComputedProps) {
        let mut blueprint = WidgetBlueprint::from_image(data, self.current_form());
        let picture_source = self
            .picture_sources
            .last()
            .and_then(|sources| sources.first().cloned());
        if let Some(source) = picture_source {
            blueprint.src = Some(source.clone());
            self.widgets.push(blueprint);
            self.flush_block();
            self.emit(RenderNode::new(
                RenderNodeKind::Picture {
                    image: ImageRef {
                        src: source,
                        alt: data.attrs.get("alt").unwrap_or_default().to_string(),
                    },
                },
                StyleBox::from_computed(props),
            ));
        } else {
            self.emit_widget(blueprint, props);
        }
    }

    fn svg_element(&mut self, id: NodeId, props: &ComputedProps) {
        let markup = self.serialize_markup(id);
        let mut blueprint = WidgetBlueprint::new(WidgetKind::Image);
        blueprint.raster = self.rasterizer.rasterize(&markup);
        blueprint.alt = Some(String::from("[svg]"));
        self.emit_widget(blueprint, props);
    }

    // ===== Pseudo-element content and counters =====

    fn apply_counters(&mut self, props: &ComputedProps) {
        for (name, value) in counter_pairs(props.get("counter-reset"), 0) {
            let _ = self.counters.insert(name, value);
        }
        for (name, value) in counter_pairs(props.get("counter-increment"), 1) {
            *self.counters.entry(name).or_insert(0) += value;
        }
    }

    fn inject_pseudo_content(&mut self, id: NodeId, which: PseudoElement) {
        let pseudo = self.engine.pseudo_style(self.arena, id, which);
        if pseudo.is_empty() {
            return;
        }
        self.apply_counters(&pseudo);
        let Some(content) = pseudo.get("content") else {
            return;
        };
        let data = self.arena.as_element(id);
        let Some(text) = render_content_value(content, &self.counters, data) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        match which {
            // `::before` content belongs inside the element's own block;
            // when that block has not opened yet, hold the text for it.
            PseudoElement::Before if self.scratch.is_none() => {
                self.pending_before = Some(text);
            }
            _ => self.push_text(&text),
        }
    }

    // ===== Collection passes =====

    /// Head mode: nothing renders; metadata is harvested.
    fn collect_head(&mut self, head: NodeId) {
        for &child in self.arena.children(head) {
            let Some(data) = self.arena.as_element(child) else {
                continue;
            };
            match data.tag_name.as_str() {
                "title" => {
                    self.title = collapse_whitespace(&self.text_content(child))
                        .trim()
                        .to_string();
                }
                "base" => {
                    if self.base_url.is_empty()
                        && let Some(href) = data.attrs.get("href")
                    {
                        self.base_url = href.to_string();
                    }
                }
                "link" => self.collect_link(child),
                "style" => {
                    let css = self.text_content(child);
                    if !css.trim().is_empty() {
                        self.styles.push(css);
                    }
                }
                "script" => self.record_script(child),
                "template" => self.collect_template(child),
                _ => {}
            }
        }
    }

    fn collect_link(&mut self, id: NodeId) {
        let Some(data) = self.arena.as_element(id) else {
            return;
        };
        let rel = data.attrs.get("rel").unwrap_or_default().to_ascii_lowercase();
        let Some(href) = data.attrs.get("href") else {
            return;
        };
        let rel_words: Vec<&str> = rel.split_ascii_whitespace().collect();
        if rel_words.contains(&"stylesheet") {
            self.style_links.push(href.to_string());
        }
        if rel_words.contains(&"icon") && self.favicon.is_none() {
            self.favicon = Some(href.to_string());
        }
    }

    fn record_script(&mut self, id: NodeId) {
        let Some(data) = self.arena.as_element(id) else {
            return;
        };
        let script_type = data.attrs.get("type").map(str::to_string);
        match data.attrs.get("src") {
            Some(src) => self.scripts.push(ScriptRecord {
                inline: false,
                src: Some(src.to_string()),
                code: String::new(),
                script_type,
            }),
            None => {
                let code = self.text_content(id);
                self.scripts.push(ScriptRecord {
                    inline: true,
                    src: None,
                    code,
                    script_type,
                });
            }
        }
    }

    /// Render `<template>` children into a named fragment without
    /// emitting them inline. Anonymous templates are dropped.
    fn collect_template(&mut self, id: NodeId) {
        let Some(template_id) = self
            .arena
            .as_element(id)
            .and_then(|data| data.attrs.get("id"))
            .map(str::to_string)
        else {
            return;
        };
        self.flush_block();
        let kept = std::mem::take(&mut self.out);
        self.walk_children(id);
        self.flush_block();
        let fragment = std::mem::replace(&mut self.out, kept);
        let _ = self.templates.insert(template_id, fragment);
    }

    // ===== Small helpers =====

    fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in self.arena.children(id) {
            if let Some(text) = self.arena.as_text(child) {
                out.push_str(text);
            } else {
                self.collect_text(child, out);
            }
        }
    }

    /// Serialize a subtree back into markup, for the SVG hand-off.
    fn serialize_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, &mut out);
        out
    }

    fn serialize_into(&self, id: NodeId, out: &mut String) {
        match self.arena.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element(data)) => {
                out.push('<');
                out.push_str(&data.tag_name);
                for (name, value) in data.attrs.iter() {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                for &child in self.arena.children(id) {
                    self.serialize_into(child, out);
                }
                out.push_str("</");
                out.push_str(&data.tag_name);
                out.push('>');
            }
            Some(NodeKind::Text(text)) => out.push_str(&escape_text(text)),
            _ => {}
        }
    }
}

/// Whether two spans carry identical attributes and can merge.
fn same_attrs(a: &InlineSpan, b: &InlineSpan) -> bool {
    a.href == b.href
        && a.download == b.download
        && a.bold == b.bold
        && a.italic == b.italic
        && a.code == b.code
        && a.strikethrough == b.strikethrough
        && a.mark == b.mark
        && a.underline == b.underline
        && a.color == b.color
        && (a.scale - b.scale).abs() < f32::EPSILON
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_ws = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}

fn depth_u8(depth: u32) -> u8 {
    u8::try_from(depth).unwrap_or(u8::MAX)
}

/// `counter-reset: name [N]?` / `counter-increment: name [N]?` pairs,
/// applied left to right.
fn counter_pairs(value: Option<&str>, default: i64) -> Vec<(String, i64)> {
    let Some(value) = value else {
        return Vec::new();
    };
    if value.trim() == "none" {
        return Vec::new();
    }
    let mut pairs = Vec::new();
    let mut tokens = value.split_whitespace().peekable();
    while let Some(name) = tokens.next() {
        if name.parse::<i64>().is_ok() {
            // A stray number with no preceding name; skip it.
            continue;
        }
        let explicit = tokens.peek().and_then(|t| t.parse::<i64>().ok());
        let count = match explicit {
            Some(n) => {
                let _ = tokens.next();
                n
            }
            None => default,
        };
        pairs.push((name.to_string(), count));
    }
    pairs
}

/// Evaluate a `content:` value: string literals, `counter(name)`,
/// `attr(name)`, and quote keywords, concatenated. `none`/`normal`
/// produce nothing.
fn render_content_value(
    value: &str,
    counters: &HashMap<String, i64>,
    element: Option<&ElementData>,
) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "none" || trimmed == "normal" {
        return None;
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' | '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        i += 1;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '-' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '-' || chars[i] == '_')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if chars.get(i) == Some(&'(') {
                    let arg_start = i + 1;
                    let mut depth = 1usize;
                    i += 1;
                    while i < chars.len() && depth > 0 {
                        match chars[i] {
                            '(' => depth += 1,
                            ')' => depth -= 1,
                            _ => {}
                        }
                        i += 1;
                    }
                    let arg: String = chars[arg_start..i.saturating_sub(1)].iter().collect();
                    let arg = arg.split(',').next().unwrap_or("").trim();
                    match word.as_str() {
                        "counter" => {
                            let count = counters.get(arg).copied().unwrap_or(0);
                            out.push_str(&count.to_string());
                        }
                        "attr" => {
                            if let Some(value) =
                                element.and_then(|data| data.attrs.get(&arg.to_ascii_lowercase()))
                            {
                                out.push_str(value);
                            }
                        }
                        _ => {}
                    }
                } else {
                    match word.as_str() {
                        "open-quote" => out.push('\u{201C}'),
                        "close-quote" => out.push('\u{201D}'),
                        _ => {}
                    }
                }
            }
            _ => i += 1,
        }
    }
    Some(out)
}

/// Progress/meter rendering as a ten-cell bar of block glyphs: `█` for
/// filled cells, one `▓` for a half-filled cell, `░` for the rest. An
/// indeterminate bar (no value) is all medium-shade.
fn meter_glyphs(value: Option<f32>, max: f32) -> String {
    const CELLS: usize = 10;
    let Some(value) = value else {
        return "▓".repeat(CELLS);
    };
    let max = if max > 0.0 { max } else { 1.0 };
    let fraction = (value / max).clamp(0.0, 1.0);
    let scaled = fraction * to_f32(CELLS);
    let filled = scaled.floor();
    let has_partial = scaled - filled >= 0.5;
    let filled = filled_usize(filled);
    let mut bar = "█".repeat(filled.min(CELLS));
    if has_partial && filled < CELLS {
        bar.push('▓');
    }
    while bar.chars().count() < CELLS {
        bar.push('░');
    }
    bar
}

#[allow(clippy::cast_precision_loss)]
fn to_f32(v: usize) -> f32 {
    v as f32
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn filled_usize(v: f32) -> usize {
    v.max(0.0) as usize
}

/// First URL out of a `<source>`: the head of `srcset`, else `src`.
fn first_source_url(data: &ElementData) -> Option<String> {
    if let Some(srcset) = data.attrs.get("srcset") {
        let first = srcset.split(',').next()?.trim();
        let url = first.split_whitespace().next()?;
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    data.attrs.get("src").map(str::to_string)
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
