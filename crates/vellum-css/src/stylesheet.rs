//! The stylesheet data model and the style generation counter.
//!
//! Rules are a tagged variant over the rule kinds the cascade understands.
//! Nested conditional rules (`@media`, `@supports`, `@container`) carry
//! their bodies as sub-rule lists; `@layer` blocks are flattened at parse
//! time into style rules tagged with their layer index.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::parser::CssParser;
use crate::selector::ParsedSelector;

/// Process-wide cascade generation.
///
/// Any stylesheet mutation bumps this; per-element computed-style caches
/// remember the generation they were computed at and lazily recompute on
/// mismatch. Single-threaded pipeline, so relaxed ordering is plenty.
static STYLE_GENERATION: AtomicU64 = AtomicU64::new(0);

/// The current style generation.
#[must_use]
pub fn style_generation() -> u64 {
    STYLE_GENERATION.load(Ordering::Relaxed)
}

/// Invalidate every cached computed style by advancing the generation.
pub fn bump_style_generation() {
    let _ = STYLE_GENERATION.fetch_add(1, Ordering::Relaxed);
}

/// A property declaration: `(property, value, important)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The property name, lowercased (custom `--*` names keep their case).
    pub property: String,
    /// The raw value text, trimmed, with any `!important` removed.
    pub value: String,
    /// Whether the declaration carried `!important`.
    pub important: bool,
}

/// A style rule: selectors plus declarations, tagged with its cascade
/// layer and position in the stylesheet.
#[derive(Debug, Clone)]
pub struct StyleRule {
    /// Parsed selectors, one per comma-separated list item; each carries
    /// its own specificity.
    pub selectors: Vec<ParsedSelector>,
    /// Declarations in source order. Later duplicates override earlier
    /// ones within the rule.
    pub declarations: Vec<Declaration>,
    /// Index into the stylesheet's layer registry; `None` for unlayered
    /// rules, which outrank all layered normal declarations.
    pub layer: Option<u16>,
    /// Monotonic position within the stylesheet, across nesting.
    pub source_order: u32,
}

/// A `@media` rule with its nested body.
#[derive(Debug, Clone)]
pub struct MediaRule {
    /// The raw media query text.
    pub condition: String,
    /// The nested rules.
    pub rules: Vec<Rule>,
}

/// A `@supports` rule with its nested body.
#[derive(Debug, Clone)]
pub struct SupportsRule {
    /// The raw supports condition text.
    pub condition: String,
    /// The nested rules.
    pub rules: Vec<Rule>,
}

/// A `@container` rule with its nested body.
#[derive(Debug, Clone)]
pub struct ContainerRule {
    /// Optional container name the query is scoped to.
    pub name: Option<String>,
    /// The raw size condition text.
    pub condition: String,
    /// The nested rules.
    pub rules: Vec<Rule>,
}

/// One stop of a `@keyframes` rule (`from`, `to`, or a percentage list).
#[derive(Debug, Clone)]
pub struct KeyframeStop {
    /// The stop selector text as written.
    pub selector: String,
    /// The declarations at this stop.
    pub declarations: Vec<Declaration>,
}

/// A `@keyframes` rule. Parsed and surfaced; playback happens elsewhere.
#[derive(Debug, Clone)]
pub struct KeyframesRule {
    /// The animation name.
    pub name: String,
    /// The keyframe stops in source order.
    pub stops: Vec<KeyframeStop>,
}

/// A `@font-face` rule's descriptor block.
#[derive(Debug, Clone)]
pub struct FontFaceRule {
    /// The descriptors (`font-family`, `src`, ...).
    pub descriptors: Vec<Declaration>,
}

/// An `@import` rule. The fetch happens outside the core; fetched text is
/// fed back through [`Stylesheet::replace_sync`] by the embedder.
#[derive(Debug, Clone)]
pub struct ImportRule {
    /// The imported stylesheet URL.
    pub href: String,
}

/// A CSS rule.
#[derive(Debug, Clone)]
pub enum Rule {
    /// A selector + declaration-block rule.
    Style(StyleRule),
    /// `@media` with nested rules.
    Media(MediaRule),
    /// `@supports` with nested rules.
    Supports(SupportsRule),
    /// `@container` with nested rules.
    Container(ContainerRule),
    /// `@keyframes`.
    Keyframes(KeyframesRule),
    /// `@font-face`.
    FontFace(FontFaceRule),
    /// `@import url(...)`.
    Import(ImportRule),
    /// `@layer a, b;` statement form, recording declaration order.
    LayerStatement(Vec<String>),
}

/// A parsed stylesheet: an ordered rule list plus its layer registry.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    /// Top-level rules in source order.
    pub rules: Vec<Rule>,
    /// Layer names in declaration order; a [`StyleRule::layer`] indexes
    /// into this list.
    pub layer_names: Vec<String>,
}

impl Stylesheet {
    /// Parse CSS text into a stylesheet. Total: syntax errors skip to the
    /// next rule.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        CssParser::new(text).parse_stylesheet()
    }

    /// Replace this stylesheet's contents with newly parsed text and bump
    /// the style generation, invalidating cached computed styles.
    pub fn replace_sync(&mut self, text: &str) {
        *self = Self::parse(text);
        bump_style_generation();
    }

    /// Parse `rule_text` as a single rule and insert it at `index` among
    /// the top-level rules (clamped to the end). Returns whether a rule
    /// was actually parsed.
    pub fn insert_rule(&mut self, rule_text: &str, index: usize) -> bool {
        let parsed = Self::parse(rule_text);
        let Some(rule) = parsed.rules.into_iter().next() else {
            return false;
        };
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
        bump_style_generation();
        true
    }

    /// Remove the top-level rule at `index`, if it exists.
    pub fn delete_rule(&mut self, index: usize) -> bool {
        if index < self.rules.len() {
            let _ = self.rules.remove(index);
            bump_style_generation();
            true
        } else {
            false
        }
    }

    /// URLs of `@import` rules, in source order, repeats dropped.
    ///
    /// The embedder fetches these asynchronously and feeds the text back
    /// through [`Stylesheet::replace_sync`]. Passing the set of URLs
    /// already fetched breaks `@import` cycles: a repeat is silently
    /// dropped rather than refetched.
    #[must_use]
    pub fn import_hrefs(&self, visited: &HashSet<String>) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rules
            .iter()
            .filter_map(|r| match r {
                Rule::Import(import) => Some(import.href.as_str()),
                _ => None,
            })
            .filter(|href| !visited.contains(*href) && seen.insert(*href))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_increases_on_replace() {
        let mut sheet = Stylesheet::parse("p { color: red }");
        let before = style_generation();
        sheet.replace_sync("p { color: blue }");
        assert!(style_generation() > before);
    }

    #[test]
    fn insert_and_delete_rules() {
        let mut sheet = Stylesheet::parse("p { color: red }");
        assert!(sheet.insert_rule("a { color: blue }", 0));
        assert_eq!(sheet.rules.len(), 2);
        assert!(sheet.delete_rule(0));
        assert_eq!(sheet.rules.len(), 1);
        assert!(!sheet.delete_rule(5));
    }

    #[test]
    fn import_hrefs_are_surfaced_and_cycles_break() {
        let sheet = Stylesheet::parse(
            "@import url(theme.css); @import url(theme.css); @import \"base.css\"; p { color: red }",
        );
        assert_eq!(
            sheet.import_hrefs(&HashSet::new()),
            vec!["theme.css", "base.css"]
        );

        let visited: HashSet<String> = [String::from("theme.css")].into_iter().collect();
        assert_eq!(sheet.import_hrefs(&visited), vec!["base.css"]);
    }
}
