//! The pipeline output record.

use std::collections::HashMap;

use serde::Serialize;

use crate::node::RenderNode;
use crate::widget::WidgetBlueprint;

/// A `<form>` element's submission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormRecord {
    /// The `action` URL (possibly relative; empty means self).
    pub action: String,
    /// The method, lowercased; defaults to `get`.
    pub method: String,
    /// The encoding type; defaults to `application/x-www-form-urlencoded`.
    pub enctype: String,
}

/// A `<script>` element surfaced for the script runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRecord {
    /// True for inline scripts (code carried in `code`).
    pub inline: bool,
    /// The `src` URL for external scripts.
    pub src: Option<String>,
    /// The inline source text.
    pub code: String,
    /// The `type` attribute, when present.
    pub script_type: Option<String>,
}

/// Everything the pipeline produces for one document: the layout input
/// plus the side tables the embedding browser consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseResult {
    /// The flat, layout-ready render-node list.
    pub nodes: Vec<RenderNode>,
    /// The `<title>` text.
    pub title: String,
    /// Forms in document order; widgets refer to them by index.
    pub forms: Vec<FormRecord>,
    /// Widget blueprints in document order.
    pub widgets: Vec<WidgetBlueprint>,
    /// The `<base href>` URL, if declared.
    pub base_url: String,
    /// Scripts in document order, inline and external.
    pub scripts: Vec<ScriptRecord>,
    /// Inline `<style>` text blocks in document order.
    pub styles: Vec<String>,
    /// External stylesheet URLs from `<link rel=stylesheet>`.
    pub style_links: Vec<String>,
    /// True when the document lacks a standards DOCTYPE in its first
    /// 512 bytes.
    pub quirks_mode: bool,
    /// `<template id=...>` contents, rendered but not emitted inline.
    pub templates: HashMap<String, Vec<RenderNode>>,
    /// The `<link rel=icon>` href, if declared.
    pub favicon: Option<String>,
}
