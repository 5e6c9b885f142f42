//! The render-node data model: the input handed to the layout stage.

use serde::Serialize;
use vellum_css::ComputedProps;

use crate::widget::WidgetBlueprint;

/// Horizontal text alignment for inline-bearing nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TextAlign {
    /// Default alignment.
    #[default]
    Left,
    /// `text-align: center`.
    Center,
    /// `text-align: right`.
    Right,
    /// `text-align: justify`.
    Justify,
}

impl TextAlign {
    /// Map a `text-align` value onto the enum, defaulting to left.
    #[must_use]
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("center") => Self::Center,
            Some("right" | "end") => Self::Right,
            Some("justify") => Self::Justify,
            _ => Self::Left,
        }
    }
}

/// Per-side lengths in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Edges {
    /// Top edge.
    pub top: f32,
    /// Right edge.
    pub right: f32,
    /// Bottom edge.
    pub bottom: f32,
    /// Left edge.
    pub left: f32,
}

/// Flex container fields the layout stage consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlexStyle {
    /// `flex-direction` (`row` if unspecified).
    pub direction: String,
    /// `gap` in CSS pixels.
    pub gap: f32,
}

/// The computed style box attached to every render node: the resolved
/// box-model and positioning values layout needs, with lengths already
/// parsed to pixels where the value was absolute.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StyleBox {
    /// Margin per side.
    pub margin: Edges,
    /// Padding per side.
    pub padding: Edges,
    /// Border width per side.
    pub border_width: Edges,
    /// Border color, if any border is set.
    pub border_color: Option<String>,
    /// `background-color` / `background` value text.
    pub background: Option<String>,
    /// Resolved foreground color value text.
    pub color: Option<String>,
    /// Raw `display` value, when declared.
    pub display: Option<String>,
    /// Raw `position` value, when declared.
    pub position: Option<String>,
    /// Flex fields when `display: flex`.
    pub flex: Option<FlexStyle>,
}

impl StyleBox {
    /// Extract the box fields from a computed property map.
    #[must_use]
    pub fn from_computed(props: &ComputedProps) -> Self {
        let margin = edges_from(props, "margin");
        let padding = edges_from(props, "padding");
        let (border_width, border_color) = border_from(props);
        let display = props.get("display").map(str::to_string);
        let flex = (display.as_deref() == Some("flex")).then(|| FlexStyle {
            direction: props
                .get("flex-direction")
                .unwrap_or("row")
                .to_string(),
            gap: props.get("gap").and_then(parse_px).unwrap_or(0.0),
        });
        Self {
            margin,
            padding,
            border_width,
            border_color,
            background: props
                .get("background-color")
                .or_else(|| props.get("background"))
                .map(str::to_string),
            color: props.get("color").map(str::to_string),
            display,
            position: props.get("position").map(str::to_string),
            flex,
        }
    }
}

/// Parse an absolute length into pixels; `em`/`rem` use the 16px default.
/// Relative units the layout stage must resolve return `None`.
#[must_use]
pub fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    if value == "0" {
        return Some(0.0);
    }
    if let Some(number) = value.strip_suffix("px") {
        return number.trim().parse().ok();
    }
    if let Some(number) = value
        .strip_suffix("rem")
        .or_else(|| value.strip_suffix("em"))
    {
        return number.trim().parse::<f32>().ok().map(|n| n * 16.0);
    }
    None
}

/// Resolve `margin`/`padding` longhands plus the 1–4 value shorthand.
fn edges_from(props: &ComputedProps, base: &str) -> Edges {
    let mut edges = Edges::default();
    if let Some(shorthand) = props.get(base) {
        let parts: Vec<f32> = shorthand
            .split_whitespace()
            .map(|part| parse_px(part).unwrap_or(0.0))
            .collect();
        match parts.as_slice() {
            [all] => edges = Edges {
                top: *all,
                right: *all,
                bottom: *all,
                left: *all,
            },
            [vertical, horizontal] => {
                edges = Edges {
                    top: *vertical,
                    right: *horizontal,
                    bottom: *vertical,
                    left: *horizontal,
                };
            }
            [top, horizontal, bottom] => {
                edges = Edges {
                    top: *top,
                    right: *horizontal,
                    bottom: *bottom,
                    left: *horizontal,
                };
            }
            [top, right, bottom, left, ..] => {
                edges = Edges {
                    top: *top,
                    right: *right,
                    bottom: *bottom,
                    left: *left,
                };
            }
            [] => {}
        }
    }
    for (side, slot) in [
        ("top", &mut edges.top),
        ("right", &mut edges.right),
        ("bottom", &mut edges.bottom),
        ("left", &mut edges.left),
    ] {
        if let Some(px) = props.get(&format!("{base}-{side}")).and_then(parse_px) {
            *slot = px;
        }
    }
    edges
}

/// Resolve the `border` shorthand and `border-width`/`border-color`.
fn border_from(props: &ComputedProps) -> (Edges, Option<String>) {
    let mut width = None;
    let mut color = None;
    if let Some(shorthand) = props.get("border") {
        for part in shorthand.split_whitespace() {
            if let Some(px) = parse_px(part) {
                width = Some(px);
            } else if !matches!(
                part,
                "solid" | "dashed" | "dotted" | "double" | "none" | "hidden" | "groove" | "ridge"
                    | "inset" | "outset"
            ) {
                color = Some(part.to_string());
            }
        }
    }
    if let Some(px) = props.get("border-width").and_then(parse_px) {
        width = Some(px);
    }
    if let Some(value) = props.get("border-color") {
        color = Some(value.to_string());
    }
    let width = width.unwrap_or(0.0);
    (
        Edges {
            top: width,
            right: width,
            bottom: width,
            left: width,
        },
        color,
    )
}

/// A text run with its inline formatting attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct InlineSpan {
    /// The run's character data.
    pub text: String,
    /// Link target when inside an `<a href>`.
    pub href: Option<String>,
    /// The anchor's `download` attribute, when present.
    pub download: Option<String>,
    /// Bold depth > 0.
    pub bold: bool,
    /// Italic depth > 0.
    pub italic: bool,
    /// Monospace (code) depth > 0.
    pub code: bool,
    /// Strikethrough depth > 0.
    pub strikethrough: bool,
    /// Highlight (`<mark>`) depth > 0.
    pub mark: bool,
    /// Underline depth > 0.
    pub underline: bool,
    /// Resolved text color, when declared.
    pub color: Option<String>,
    /// Font scale relative to the base size.
    pub scale: f32,
}

/// One table cell's flattened text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCell {
    /// The cell's text content.
    pub text: String,
    /// True for `<th>` cells.
    pub header: bool,
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// The row's cells, in source order.
    pub cells: Vec<TableCell>,
}

/// Reference to an image resolved from `<picture>`/`<img>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    /// The chosen source URL.
    pub src: String,
    /// Alternative text.
    pub alt: String,
}

/// The kind (and kind-specific payload) of a render node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderNodeKind {
    /// A plain block of inline content.
    Block {
        /// The block's inline spans.
        spans: Vec<InlineSpan>,
    },
    /// A heading block.
    Heading {
        /// Heading level, 1–6.
        level: u8,
        /// The heading's inline spans.
        spans: Vec<InlineSpan>,
        /// Horizontal alignment.
        align: TextAlign,
    },
    /// One line of preformatted text.
    Preformatted {
        /// The line's spans, whitespace preserved.
        spans: Vec<InlineSpan>,
    },
    /// A list item.
    ListItem {
        /// Nesting depth, zero-based.
        indent: u8,
        /// The item's inline spans.
        spans: Vec<InlineSpan>,
        /// Horizontal alignment.
        align: TextAlign,
    },
    /// A block quotation.
    Blockquote {
        /// Nesting depth, one-based.
        indent: u8,
        /// The quote's inline spans.
        spans: Vec<InlineSpan>,
    },
    /// A horizontal rule.
    HorizontalRule,
    /// A paragraph separator.
    ParagraphBreak,
    /// An embedded interactive element.
    Widget {
        /// The widget's declarative description.
        blueprint: WidgetBlueprint,
    },
    /// A table with structured rows; see [`crate::table::ascii_table`]
    /// for the terminal presentation.
    Table {
        /// The rows, header rows included.
        rows: Vec<TableRow>,
    },
    /// A grid container's inline content with its declared tracks.
    Grid {
        /// The container's inline spans.
        spans: Vec<InlineSpan>,
        /// The raw `grid-template-columns` track list.
        tracks: Vec<String>,
    },
    /// A `<summary>` line of a `<details>` disclosure.
    Summary {
        /// The summary's inline spans.
        spans: Vec<InlineSpan>,
    },
    /// An image chosen through `<picture>` source selection.
    Picture {
        /// The selected image.
        image: ImageRef,
    },
}

/// One layout-ready node: its kind plus the computed style box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    /// What the node is, with its payload.
    pub kind: RenderNodeKind,
    /// The node's computed box values.
    pub style: StyleBox,
}

impl RenderNode {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(kind: RenderNodeKind, style: StyleBox) -> Self {
        Self { kind, style }
    }

    /// The node's inline spans, if its kind carries any.
    #[must_use]
    pub fn spans(&self) -> Option<&[InlineSpan]> {
        match &self.kind {
            RenderNodeKind::Block { spans }
            | RenderNodeKind::Heading { spans, .. }
            | RenderNodeKind::Preformatted { spans }
            | RenderNodeKind::ListItem { spans, .. }
            | RenderNodeKind::Blockquote { spans, .. }
            | RenderNodeKind::Grid { spans, .. }
            | RenderNodeKind::Summary { spans } => Some(spans),
            _ => None,
        }
    }

    /// All span text concatenated, for tests and diagnostics.
    #[must_use]
    pub fn text(&self) -> String {
        self.spans()
            .map(|spans| spans.iter().map(|s| s.text.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_px_units() {
        assert_eq!(parse_px("12px"), Some(12.0));
        assert_eq!(parse_px("1.5em"), Some(24.0));
        assert_eq!(parse_px("2rem"), Some(32.0));
        assert_eq!(parse_px("0"), Some(0.0));
        assert_eq!(parse_px("50%"), None);
        assert_eq!(parse_px("auto"), None);
    }

    #[test]
    fn style_box_from_computed_values() {
        use vellum_css::{CascadeEngine, DefaultEnvironment, Stylesheet};
        use vellum_dom::{AttrList, NodeArena, NodeId};

        let mut arena = NodeArena::new();
        let div = arena.alloc_element("div", AttrList::new());
        arena.append_child(NodeId::ROOT, div);

        let mut engine = CascadeEngine::new(DefaultEnvironment::default());
        engine.add_stylesheet(Stylesheet::parse(
            "div { margin: 1px 2px 3px 4px; padding: 8px; padding-left: 2px; \
             border: 1px solid red; background-color: white; display: flex; gap: 4px }",
        ));
        let style = StyleBox::from_computed(&engine.computed_style(&arena, div));

        assert_eq!(style.margin.top, 1.0);
        assert_eq!(style.margin.right, 2.0);
        assert_eq!(style.margin.bottom, 3.0);
        assert_eq!(style.margin.left, 4.0);
        assert_eq!(style.padding.top, 8.0);
        assert_eq!(style.padding.left, 2.0);
        assert_eq!(style.border_width.top, 1.0);
        assert_eq!(style.border_color.as_deref(), Some("red"));
        assert_eq!(style.background.as_deref(), Some("white"));
        let flex = style.flex.expect("display: flex populates flex fields");
        assert_eq!(flex.direction, "row");
        assert_eq!(flex.gap, 4.0);
    }
}
