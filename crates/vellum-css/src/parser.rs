//! Stylesheet text parsing.
//!
//! A direct scanner over the source text: comments are stripped up front,
//! then rules are consumed one at a time. The parser is total — a rule
//! that fails to parse is skipped through its balanced block and the scan
//! continues at the next rule, which is the recovery the web requires.

use vellum_common::warning::warn_once;

use crate::selector::parse_selector_list;
use crate::stylesheet::{
    ContainerRule, Declaration, FontFaceRule, ImportRule, KeyframeStop, KeyframesRule, MediaRule,
    Rule, StyleRule, Stylesheet, SupportsRule,
};

/// Vendor prefixes that mirror onto the standard property name.
const VENDOR_PREFIXES: &[&str] = &["-webkit-", "-moz-", "-ms-", "-o-"];

/// The stylesheet parser.
pub struct CssParser {
    chars: Vec<char>,
    pos: usize,
    layer_names: Vec<String>,
    source_order: u32,
}

impl CssParser {
    /// Create a parser over CSS source text.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            chars: strip_comments(text).chars().collect(),
            pos: 0,
            layer_names: Vec::new(),
            source_order: 0,
        }
    }

    /// Parse the whole input into a stylesheet.
    #[must_use]
    pub fn parse_stylesheet(mut self) -> Stylesheet {
        let rules = self.parse_rules(None);
        Stylesheet {
            rules,
            layer_names: self.layer_names,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn next_order(&mut self) -> u32 {
        let order = self.source_order;
        self.source_order += 1;
        order
    }

    fn register_layer(&mut self, name: &str) -> u16 {
        let name = name.trim();
        if let Some(found) = self.layer_names.iter().position(|n| n == name) {
            return u16::try_from(found).unwrap_or(u16::MAX)
        }
        self.layer_names.push(name.to_string());
        u16::try_from(self.layer_names.len() - 1).unwrap_or(u16::MAX)
    }

    /// Consume rules until end of input or the `}` closing the enclosing
    /// block (left for the caller to consume).
    fn parse_rules(&mut self, layer: Option<u16>) -> Vec<Rule> {
        let mut rules = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return rules,
                Some('}') => return rules,
                Some('@') => {
                    let _ = self.bump();
                    self.parse_at_rule(layer, &mut rules);
                }
                Some(_) => {
                    if let Some(rule) = self.parse_style_rule(layer) {
                        rules.push(Rule::Style(rule));
                    }
                }
            }
        }
    }

    /// One qualified rule: selector list, then a declaration block.
    fn parse_style_rule(&mut self, layer: Option<u16>) -> Option<StyleRule> {
        let selector_text = self.read_until_top_level(&['{', '}']);
        if self.peek() != Some('{') {
            // Garbage with no block: drop it and resynchronize.
            let _ = self.bump();
            return None;
        }
        let _ = self.bump();
        let body = self.read_block_body();
        let selectors = parse_selector_list(&selector_text);
        if selectors.is_empty() {
            warn_once("CSS", "rule with unparsable selector list skipped");
            return None;
        }
        Some(StyleRule {
            selectors,
            declarations: parse_declaration_list(&body),
            layer,
            source_order: self.next_order(),
        })
    }

    fn parse_at_rule(&mut self, layer: Option<u16>, out: &mut Vec<Rule>) {
        let name = self.read_ident().to_ascii_lowercase();
        match name.as_str() {
            "charset" | "namespace" => self.skip_statement(),
            "import" => {
                let prelude = self.read_until_top_level(&['{', ';']);
                let _ = self.bump();
                match extract_import_href(&prelude) {
                    Some(href) => out.push(Rule::Import(ImportRule { href })),
                    None => warn_once("CSS", "@import without a usable URL skipped"),
                }
            }
            "layer" => {
                let prelude = self.read_until_top_level(&['{', ';']);
                match self.peek() {
                    Some(';') => {
                        let _ = self.bump();
                        let names: Vec<String> = prelude
                            .split(',')
                            .map(str::trim)
                            .filter(|n| !n.is_empty())
                            .map(|n| {
                                let _ = self.register_layer(n);
                                n.to_string()
                            })
                            .collect();
                        out.push(Rule::LayerStatement(names));
                    }
                    Some('{') => {
                        let _ = self.bump();
                        let index = self.register_layer(prelude.trim());
                        let nested = self.parse_rules(Some(index));
                        let _ = self.bump();
                        // Block form flattens: nested rules carry the
                        // layer index themselves.
                        out.extend(nested);
                    }
                    _ => {}
                }
            }
            "media" | "supports" | "container" => {
                let prelude = self.read_until_top_level(&['{', ';']);
                if self.peek() != Some('{') {
                    let _ = self.bump();
                    return;
                }
                let _ = self.bump();
                let nested = self.parse_rules(layer);
                let _ = self.bump();
                let condition = prelude.trim().to_string();
                out.push(match name.as_str() {
                    "media" => Rule::Media(MediaRule {
                        condition,
                        rules: nested,
                    }),
                    "supports" => Rule::Supports(SupportsRule {
                        condition,
                        rules: nested,
                    }),
                    _ => {
                        let (container_name, condition) = split_container_prelude(&condition);
                        Rule::Container(ContainerRule {
                            name: container_name,
                            condition,
                            rules: nested,
                        })
                    }
                });
            }
            "keyframes" => {
                let prelude = self.read_until_top_level(&['{', ';']);
                if self.peek() != Some('{') {
                    let _ = self.bump();
                    return;
                }
                let _ = self.bump();
                let mut stops = Vec::new();
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        None | Some('}') => break,
                        Some(_) => {
                            let selector = self.read_until_top_level(&['{', '}']);
                            if self.peek() != Some('{') {
                                break;
                            }
                            let _ = self.bump();
                            let body = self.read_block_body();
                            stops.push(KeyframeStop {
                                selector: selector.trim().to_string(),
                                declarations: parse_declaration_list(&body),
                            });
                        }
                    }
                }
                let _ = self.bump();
                out.push(Rule::Keyframes(KeyframesRule {
                    name: prelude.trim().to_string(),
                    stops,
                }));
            }
            "font-face" => {
                let _ = self.read_until_top_level(&['{', ';']);
                if self.peek() != Some('{') {
                    let _ = self.bump();
                    return;
                }
                let _ = self.bump();
                let body = self.read_block_body();
                out.push(Rule::FontFace(FontFaceRule {
                    descriptors: parse_declaration_list(&body),
                }));
            }
            _ => {
                warn_once("CSS", "unknown at-rule skipped");
                let _ = self.read_until_top_level(&['{', ';']);
                match self.peek() {
                    Some('{') => {
                        let _ = self.bump();
                        let _ = self.read_block_body();
                    }
                    Some(';') => {
                        let _ = self.bump();
                    }
                    _ => {}
                }
            }
        }
    }

    fn read_ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Read until one of `stops` appears outside quotes, parens, and
    /// brackets. The stop character is not consumed.
    fn read_until_top_level(&mut self, stops: &[char]) -> String {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                '"' | '\'' => self.skip_string_from_quote(),
                c if depth == 0 && stops.contains(&c) => break,
                _ => {}
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// With the opening `{` already consumed: read the block's text up to
    /// the matching `}` (consumed), honoring nested braces and strings.
    fn read_block_body(&mut self) -> String {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '{' => depth += 1,
                '}' => {
                    if depth == 0 {
                        let body: String = self.chars[start..self.pos].iter().collect();
                        let _ = self.bump();
                        return body;
                    }
                    depth -= 1;
                }
                '"' | '\'' => self.skip_string_from_quote(),
                _ => {}
            }
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// With `pos` on a quote character: advance to the closing quote.
    fn skip_string_from_quote(&mut self) {
        let Some(quote) = self.peek() else { return };
        self.pos += 1;
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.pos += 1;
            } else if c == quote {
                return;
            }
            self.pos += 1;
        }
    }

    fn skip_statement(&mut self) {
        let _ = self.read_until_top_level(&[';', '{']);
        if self.peek() == Some('{') {
            let _ = self.bump();
            let _ = self.read_block_body();
        } else {
            let _ = self.bump();
        }
    }
}

/// Parse a declaration block body (or a `style="..."` attribute value)
/// into declarations.
#[must_use]
pub fn parse_inline_style(text: &str) -> Vec<Declaration> {
    parse_declaration_list(&strip_comments(text))
}

/// Split on `;` at depth zero and parse each `prop: value` pair.
///
/// A vendor-prefixed property additionally sets the standard name, unless
/// the standard name is declared elsewhere in the same block.
#[must_use]
pub(crate) fn parse_declaration_list(body: &str) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    for chunk in split_at_depth_zero(body, ';') {
        let Some((property, value)) = chunk.split_once(':') else {
            if !chunk.trim().is_empty() {
                warn_once("CSS", "declaration without ':' skipped");
            }
            continue;
        };
        let raw_property = property.trim();
        if raw_property.is_empty() {
            continue;
        }
        // Custom properties are case-sensitive; everything else lowercases.
        let property = if raw_property.starts_with("--") {
            raw_property.to_string()
        } else {
            raw_property.to_ascii_lowercase()
        };
        let (value, important) = detach_important(value.trim());
        if value.is_empty() && !property.starts_with("--") {
            continue;
        }
        declarations.push(Declaration {
            property: property.clone(),
            value: value.clone(),
            important,
        });
        if let Some(prefix) = VENDOR_PREFIXES.iter().find(|p| property.starts_with(**p)) {
            let standard = property[prefix.len()..].to_string();
            if !standard.is_empty() && !declarations.iter().any(|d| d.property == standard) {
                declarations.push(Declaration {
                    property: standard,
                    value,
                    important,
                });
            }
        }
    }
    declarations
}

/// Detect and strip a trailing `!important`, whitespace and case tolerant.
fn detach_important(value: &str) -> (String, bool) {
    if let Some(bang) = value.rfind('!') {
        let tail = value[bang + 1..].trim();
        if tail.eq_ignore_ascii_case("important") {
            return (value[..bang].trim_end().to_string(), true);
        }
    }
    (value.to_string(), false)
}

/// Split on `sep` outside quotes, parens, brackets, and braces.
fn split_at_depth_zero(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[' | '{') => depth += 1,
            (None, ')' | ']' | '}') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// `@container [name] (condition)`: an optional container name precedes
/// the first parenthesized feature.
fn split_container_prelude(prelude: &str) -> (Option<String>, String) {
    let prelude = prelude.trim();
    if prelude.starts_with('(') || prelude.is_empty() {
        return (None, prelude.to_string());
    }
    match prelude.split_once(char::is_whitespace) {
        Some((name, rest)) => (Some(name.to_string()), rest.trim().to_string()),
        None => (Some(prelude.to_string()), String::new()),
    }
}

/// Pull the URL out of an `@import` prelude: `url(...)`, `url("...")`, or
/// a bare quoted string; trailing media queries are ignored.
fn extract_import_href(prelude: &str) -> Option<String> {
    let prelude = prelude.trim();
    let lower = prelude.to_ascii_lowercase();
    let inner = if let Some(open) = lower.find("url(") {
        let rest = &prelude[open + 4..];
        let close = rest.find(')')?;
        rest[..close].trim()
    } else if prelude.starts_with('"') || prelude.starts_with('\'') {
        let quote = prelude.chars().next()?;
        let rest = &prelude[1..];
        let close = rest.find(quote)?;
        &rest[..close]
    } else {
        prelude.split_whitespace().next()?
    };
    let href = inner.trim_matches(|c| c == '"' || c == '\'').trim();
    (!href.is_empty()).then(|| href.to_string())
}

/// Remove `/* ... */` comments, leaving string contents untouched.
fn strip_comments(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0usize;
    let mut quote: Option<char> = None;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) => {
                out.push(c);
                if c == '\\' && i + 1 < chars.len() {
                    out.push(chars[i + 1]);
                    i += 1;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '/' && chars.get(i + 1) == Some(&'*') {
                    i += 2;
                    while i < chars.len() {
                        if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                            i += 1;
                            break;
                        }
                        i += 1;
                    }
                    out.push(' ');
                } else {
                    if c == '"' || c == '\'' {
                        quote = Some(c);
                    }
                    out.push(c);
                }
            }
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_rules(sheet: &Stylesheet) -> Vec<&StyleRule> {
        sheet
            .rules
            .iter()
            .filter_map(|r| match r {
                Rule::Style(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parses_simple_rule() {
        let sheet = Stylesheet::parse("p { color: red; margin: 0 }");
        let rules = style_rules(&sheet);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].declarations.len(), 2);
        assert_eq!(rules[0].declarations[0].property, "color");
        assert_eq!(rules[0].declarations[0].value, "red");
    }

    #[test]
    fn comments_are_stripped() {
        let sheet = Stylesheet::parse("/* lead */ p { /* mid */ color: red }");
        let rules = style_rules(&sheet);
        assert_eq!(rules[0].declarations[0].value, "red");
    }

    #[test]
    fn important_is_detected_and_stripped() {
        let sheet = Stylesheet::parse("p { color: red !important; width: 4px ! IMPORTANT }");
        let rules = style_rules(&sheet);
        assert!(rules[0].declarations[0].important);
        assert_eq!(rules[0].declarations[0].value, "red");
        assert!(rules[0].declarations[1].important);
        assert_eq!(rules[0].declarations[1].value, "4px");
    }

    #[test]
    fn vendor_prefix_mirrors_standard_property() {
        let sheet = Stylesheet::parse("p { -webkit-border-radius: 4px }");
        let rules = style_rules(&sheet);
        let props: Vec<&str> = rules[0]
            .declarations
            .iter()
            .map(|d| d.property.as_str())
            .collect();
        assert_eq!(props, ["-webkit-border-radius", "border-radius"]);
    }

    #[test]
    fn vendor_prefix_does_not_override_explicit_standard() {
        let sheet = Stylesheet::parse("p { border-radius: 8px; -moz-border-radius: 4px }");
        let rules = style_rules(&sheet);
        // The explicit standard declaration already exists; no mirror.
        assert_eq!(rules[0].declarations.len(), 2);
    }

    #[test]
    fn malformed_rule_recovers_at_next_rule() {
        let sheet = Stylesheet::parse("p { color: red } ~~nonsense~~ { ??? } a { color: blue }");
        let rules = style_rules(&sheet);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1].selectors[0].text, "a");
    }

    #[test]
    fn media_rule_nests() {
        let sheet = Stylesheet::parse("@media (min-width: 600px) { p { color: red } }");
        match &sheet.rules[0] {
            Rule::Media(media) => {
                assert_eq!(media.condition, "(min-width: 600px)");
                assert_eq!(media.rules.len(), 1);
            }
            other => panic!("expected @media, got {other:?}"),
        }
    }

    #[test]
    fn container_rule_with_name() {
        let sheet = Stylesheet::parse("@container sidebar (min-width: 400px) { p { color: red } }");
        match &sheet.rules[0] {
            Rule::Container(container) => {
                assert_eq!(container.name.as_deref(), Some("sidebar"));
                assert_eq!(container.condition, "(min-width: 400px)");
            }
            other => panic!("expected @container, got {other:?}"),
        }
    }

    #[test]
    fn layer_statement_and_blocks_register_in_order() {
        let sheet = Stylesheet::parse(
            "@layer base, theme;\n@layer base { p { color: red } }\n@layer theme { p { color: blue } }\np { color: green }",
        );
        assert_eq!(sheet.layer_names, ["base", "theme"]);
        let rules = style_rules(&sheet);
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].layer, Some(0));
        assert_eq!(rules[1].layer, Some(1));
        assert_eq!(rules[2].layer, None);
    }

    #[test]
    fn keyframes_are_parsed_with_stops() {
        let sheet = Stylesheet::parse(
            "@keyframes slide { from { left: 0 } 50% { left: 5px } to { left: 10px } }",
        );
        match &sheet.rules[0] {
            Rule::Keyframes(keyframes) => {
                assert_eq!(keyframes.name, "slide");
                let stops: Vec<&str> = keyframes.stops.iter().map(|s| s.selector.as_str()).collect();
                assert_eq!(stops, ["from", "50%", "to"]);
            }
            other => panic!("expected @keyframes, got {other:?}"),
        }
    }

    #[test]
    fn font_face_descriptors() {
        let sheet = Stylesheet::parse("@font-face { font-family: Vellum; src: url(v.woff2) }");
        match &sheet.rules[0] {
            Rule::FontFace(font_face) => {
                assert_eq!(font_face.descriptors[0].property, "font-family");
            }
            other => panic!("expected @font-face, got {other:?}"),
        }
    }

    #[test]
    fn charset_and_unknown_at_rules_are_skipped() {
        let sheet =
            Stylesheet::parse("@charset \"utf-8\"; @page { margin: 0 } p { color: red }");
        assert_eq!(style_rules(&sheet).len(), 1);
    }

    #[test]
    fn custom_properties_keep_case() {
        let decls = parse_inline_style("--Main-Color: red; COLOR: blue");
        assert_eq!(decls[0].property, "--Main-Color");
        assert_eq!(decls[1].property, "color");
    }

    #[test]
    fn inline_style_parses_declaration_list() {
        let decls = parse_inline_style("color: red; font-size: 14px");
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].property, "font-size");
        assert_eq!(decls[1].value, "14px");
    }
}
