//! Render-node builder and incremental pipeline for the Vellum renderer.
//!
//! # Scope
//!
//! The last stage of the document pipeline: the element tree and the
//! cascade meet here and come out as a flat, layout-ready list of render
//! nodes, plus everything the embedding browser needs alongside (title,
//! forms, widget blueprints, scripts, stylesheet links, templates).
//!
//! - **`builder`** walks the tree, applies the cascade per element, and
//!   extracts inline spans, widgets, counters, and pseudo-element content
//! - **`scheduler`** glues the incremental tokenizer front-end to tree
//!   rebuild and re-render, chunk by chunk
//! - **`svg`** is the hand-off seam to an external SVG rasterizer
//!
//! Layout itself (box sizing, line breaking, placement) happens
//! downstream; this crate only emits its input.

/// The render-node builder.
pub mod builder;
/// Render-node and inline-span data model.
pub mod node;
/// The pipeline output record.
pub mod result;
/// Incremental feed-parse-render coordination.
pub mod scheduler;
/// SVG rasterization hand-off.
pub mod svg;
/// Table accumulation and box-drawing rendering.
pub mod table;
/// Embedded interactive element blueprints.
pub mod widget;

pub use builder::RenderBuilder;
pub use node::{InlineSpan, RenderNode, RenderNodeKind, StyleBox, TableCell, TableRow, TextAlign};
pub use result::{FormRecord, ParseResult, ScriptRecord};
pub use scheduler::{IncrementalScheduler, parse_bytes, parse_document, parse_document_with};
pub use svg::{NoopSvgRasterizer, RasterImage, SvgRasterizer};
pub use table::ascii_table;
pub use widget::{SelectOption, WidgetBlueprint, WidgetKind};
