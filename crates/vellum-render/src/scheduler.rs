//! Incremental feed-parse-render coordination.
//!
//! The pipeline stages are pure; this module sequences them. The one-shot
//! [`parse_document`] runs bytes-to-render-list in a single call. The
//! [`IncrementalScheduler`] drives the same stages per network chunk,
//! rebuilding the tree from the full settled token list on every flush —
//! simple and always correct; an implementation that patches the tree in
//! place would need to track which tokens are terminal.

use vellum_common::error::{DocumentError, decode_document};
use vellum_css::{CascadeEngine, Environment, Stylesheet};
use vellum_dom::{NodeArena, NodeId, NodeKind};
use vellum_html::{IncrementalParser, Token, Tokenizer, TreeBuilder};

use crate::builder::RenderBuilder;
use crate::result::ParseResult;
use crate::svg::{NoopSvgRasterizer, SvgRasterizer};

/// Parse a complete document: tokenize, build the tree, resolve styles,
/// and emit the render-node list.
#[must_use]
pub fn parse_document<E: Environment>(html: &str, env: E) -> ParseResult {
    parse_document_with(html, env, &NoopSvgRasterizer)
}

/// [`parse_document`] with an SVG rasterizer plugged into the hand-off
/// seam.
#[must_use]
pub fn parse_document_with<E: Environment>(
    html: &str,
    env: E,
    rasterizer: &dyn SvgRasterizer,
) -> ParseResult {
    let tokens = Tokenizer::tokenize(html);
    render_tokens(html, &tokens, env, rasterizer)
}

/// Parse a raw byte stream, decoding it first.
///
/// # Errors
///
/// Returns [`DocumentError`] when the input is refused by the decoder
/// (oversized); invalid UTF-8 is replaced, not rejected.
pub fn parse_bytes<E: Environment>(bytes: &[u8], env: E) -> Result<ParseResult, DocumentError> {
    let html = decode_document(bytes)?;
    Ok(parse_document(&html, env))
}

/// Run tree construction, cascade, and the render walk over a settled
/// token list. `source` is the raw markup, consulted only for the
/// DOCTYPE sniff.
fn render_tokens<E: Environment>(
    source: &str,
    tokens: &[Token],
    env: E,
    rasterizer: &dyn SvgRasterizer,
) -> ParseResult {
    let arena = TreeBuilder::new(tokens.to_vec()).run();

    let mut engine = CascadeEngine::new(env);
    for css in collect_stylesheet_text(&arena) {
        engine.add_stylesheet(Stylesheet::parse(&css));
    }

    let mut result = RenderBuilder::new(&arena, &mut engine, rasterizer).run();
    result.quirks_mode = !has_standards_doctype(source);
    result
}

/// Gather the text of every `<style>` element, in document order, so the
/// cascade sees the sheets before the render walk starts.
fn collect_stylesheet_text(arena: &NodeArena) -> Vec<String> {
    let mut sheets = Vec::new();
    for id in arena.iter_all() {
        if arena
            .as_element(id)
            .is_some_and(|data| data.tag_name == "style")
        {
            let mut css = String::new();
            collect_text(arena, id, &mut css);
            if !css.trim().is_empty() {
                sheets.push(css);
            }
        }
    }
    sheets
}

fn collect_text(arena: &NodeArena, id: NodeId, out: &mut String) {
    for &child in arena.children(id) {
        match arena.get(child).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => out.push_str(text),
            _ => collect_text(arena, child, out),
        }
    }
}

/// Whether a standards `<!DOCTYPE html>` appears within the first 512
/// bytes. Anything else — a legacy doctype, a late doctype, none at all —
/// leaves the document in quirks mode.
#[must_use]
pub fn has_standards_doctype(source: &str) -> bool {
    let mut end = source.len().min(512);
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let prefix = source[..end].to_ascii_lowercase();
    let Some(at) = prefix.find("<!doctype") else {
        return false;
    };
    let rest = prefix[at + "<!doctype".len()..].trim_start();
    let Some(name) = rest.strip_prefix("html") else {
        return false;
    };
    matches!(name.trim_start().chars().next(), Some('>'))
}

/// Coordinates chunked input through tokenize, tree rebuild, cascade, and
/// render.
///
/// Rebuild-on-every-flush semantics: each [`IncrementalScheduler::render`]
/// call re-runs tree construction over all settled tokens, so the result
/// is always exactly what a one-shot parse of the input so far would give.
pub struct IncrementalScheduler<E: Environment + Clone> {
    parser: IncrementalParser,
    tokens: Vec<Token>,
    env: E,
}

impl<E: Environment + Clone> IncrementalScheduler<E> {
    /// Create a scheduler rendering against the given environment.
    #[must_use]
    pub fn new(env: E) -> Self {
        Self {
            parser: IncrementalParser::new(),
            tokens: Vec::new(),
            env,
        }
    }

    /// Buffer a chunk of input.
    pub fn feed(&mut self, chunk: &str) {
        self.parser.feed(chunk);
    }

    /// Flush newly settled tokens and re-render the document as parsed so
    /// far.
    pub fn render(&mut self) -> ParseResult {
        self.tokens.extend(self.parser.flush());
        render_tokens(
            self.parser.buffered(),
            &self.tokens,
            self.env.clone(),
            &NoopSvgRasterizer,
        )
    }

    /// Consume the trailing input fragment and produce the final render.
    pub fn finish(&mut self) -> ParseResult {
        self.tokens.extend(self.parser.end());
        render_tokens(
            self.parser.buffered(),
            &self.tokens,
            self.env.clone(),
            &NoopSvgRasterizer,
        )
    }

    /// Discard all buffered input and tokens.
    pub fn reset(&mut self) {
        self.parser.reset();
        self.tokens.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doctype_sniff_accepts_standards_forms() {
        assert!(has_standards_doctype("<!DOCTYPE html><p>x</p>"));
        assert!(has_standards_doctype("<!doctype HTML ><p>x</p>"));
        assert!(has_standards_doctype("  <!-- c --> <!DOCTYPE html>"));
    }

    #[test]
    fn doctype_sniff_rejects_legacy_and_missing() {
        assert!(!has_standards_doctype("<p>x</p>"));
        assert!(!has_standards_doctype(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\">"
        ));
        // Too late: past the first 512 bytes.
        let late = format!("{}<!DOCTYPE html>", " ".repeat(600));
        assert!(!has_standards_doctype(&late));
    }
}
