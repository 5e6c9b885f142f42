//! Selector parsing and matching per
//! [Selectors Level 4](https://www.w3.org/TR/selectors-4/).
//!
//! The feature set is what static rendering needs: elemental selectors,
//! attribute selectors, structural pseudo-classes, `:not()`/`:is()`/
//! `:where()`, and the four combinators. Interactive pseudo-classes parse
//! but never match, so a rule carrying `:hover` is kept without applying.

use vellum_dom::{ElementData, NodeArena, NodeId};

/// Pseudo-elements the render stage synthesizes content for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    /// `::before` — content injected at element entry.
    Before,
    /// `::after` — content injected at element exit.
    After,
}

/// [§ 4 Pseudo-classes](https://www.w3.org/TR/selectors-4/#pseudo-classes)
///
/// Structural pseudo-classes that can be evaluated against the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoClass {
    /// `:root` — the document element.
    Root,
    /// `:first-child` — no preceding element sibling.
    FirstChild,
    /// `:last-child` — no following element sibling.
    LastChild,
    /// `:only-child` — no element siblings at all.
    OnlyChild,
    /// `:empty` — no children of any kind.
    Empty,
    /// `:first-of-type` — no preceding element sibling of the same type.
    FirstOfType,
    /// `:last-of-type` — no following element sibling of the same type.
    LastOfType,
    /// `:link` — an `<a>` with an `href`; all links are unvisited here.
    Link,
    /// `:disabled` — carries the `disabled` attribute.
    Disabled,
    /// `:enabled` — a form control without the `disabled` attribute.
    Enabled,
}

/// [§ 6 Attribute selectors](https://www.w3.org/TR/selectors-4/#attribute-selectors)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrMatcher {
    /// `[attr]` — present.
    Exists,
    /// `[attr=v]` — exactly equal.
    Equals,
    /// `[attr~=v]` — whitespace-separated word match.
    Includes,
    /// `[attr|=v]` — equal, or prefixed by `v-`.
    DashMatch,
    /// `[attr^=v]` — value prefix.
    Prefix,
    /// `[attr$=v]` — value suffix.
    Suffix,
    /// `[attr*=v]` — substring.
    Substring,
}

/// An attribute selector condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    /// The attribute name, lowercased.
    pub name: String,
    /// How the value is compared.
    pub matcher: AttrMatcher,
    /// The expected value (empty for [`AttrMatcher::Exists`]).
    pub value: String,
}

/// One condition within a compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// `div` — a type selector, lowercased.
    Type(String),
    /// `.name` — a class selector.
    Class(String),
    /// `#name` — an ID selector.
    Id(String),
    /// `*` — the universal selector.
    Universal,
    /// `[attr...]` — an attribute selector.
    Attribute(AttributeSelector),
    /// A structural pseudo-class evaluated against the tree.
    Pseudo(PseudoClass),
    /// `:not(compound)` — negation.
    Not(Box<CompoundSelector>),
    /// `:is(...)` / `:where(...)` — matches-any over compounds. The flag
    /// records whether the selector contributes specificity (`:where`
    /// does not).
    AnyOf {
        /// The argument compounds; matching any one matches the selector.
        options: Vec<CompoundSelector>,
        /// False for `:where()`, which contributes zero specificity.
        counts: bool,
    },
    /// A recognized-but-unmatchable pseudo-class (`:hover`, `:focus`,
    /// `:nth-child(...)`, ...). Present so the rest of the rule survives;
    /// `counted` records whether it contributes class-level specificity
    /// (`:nth-*` does not).
    NeverMatch {
        /// Whether this still counts toward the class bucket.
        counted: bool,
    },
}

/// [§ 4.2 Compound selectors](https://www.w3.org/TR/selectors-4/#compound)
///
/// "A sequence of simple selectors that are not separated by a combinator":
/// simultaneous conditions on a single element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    /// The simple selectors, all of which must match.
    pub parts: Vec<SimpleSelector>,
}

/// [§ 16 Combinators](https://www.w3.org/TR/selectors-4/#combinators)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace — any ancestor.
    Descendant,
    /// `>` — parent.
    Child,
    /// `+` — immediately preceding element sibling.
    NextSibling,
    /// `~` — any preceding element sibling.
    SubsequentSibling,
}

/// A parsed complex selector: the subject compound plus the combinator
/// chain leading away from it, right to left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSelector {
    /// The rightmost compound — the elements the selector represents.
    pub subject: CompoundSelector,
    /// `(combinator, compound)` pairs walking left from the subject.
    pub ancestors: Vec<(Combinator, CompoundSelector)>,
    /// A pseudo-element on the subject (`::before`/`::after`), stripped
    /// from matching and handed to the render stage.
    pub pseudo_element: Option<PseudoElement>,
    /// Packed specificity: `ids·10_000 + classes·100 + types`.
    pub specificity: u32,
    /// The selector source text, trimmed.
    pub text: String,
}

impl ParsedSelector {
    /// Match this selector against an element, evaluating the combinator
    /// chain against the element's ancestors and siblings. The
    /// pseudo-element, if any, is ignored here — the caller decides
    /// whether pseudo-element rules are relevant.
    #[must_use]
    pub fn matches(&self, arena: &NodeArena, element: NodeId) -> bool {
        compound_matches(&self.subject, arena, element)
            && ancestors_match(&self.ancestors, 0, arena, element)
    }
}

/// Parse a comma-separated selector list, dropping list items that fail to
/// parse (the rest of the rule survives, matching error-recovery rules).
#[must_use]
pub fn parse_selector_list(text: &str) -> Vec<ParsedSelector> {
    split_top_level_commas(text)
        .into_iter()
        .filter_map(parse_selector)
        .collect()
}

/// Parse one complex selector. Returns `None` on syntax errors.
#[must_use]
pub fn parse_selector(text: &str) -> Option<ParsedSelector> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut parser = SelectorParser {
        chars: text.chars().collect(),
        pos: 0,
        pseudo_element: None,
    };
    let mut compounds = vec![parser.parse_compound()?];
    let mut combinators = Vec::new();
    loop {
        match parser.parse_combinator() {
            Some(combinator) => {
                // A pseudo-element is only valid on the subject, which is
                // the final compound.
                if parser.pseudo_element.is_some() {
                    return None;
                }
                combinators.push(combinator);
                compounds.push(parser.parse_compound()?);
            }
            None => break,
        }
    }
    if !parser.at_end() {
        return None;
    }

    let subject = compounds.pop()?;
    let mut ancestors = Vec::new();
    while let (Some(compound), Some(combinator)) = (compounds.pop(), combinators.pop()) {
        ancestors.push((combinator, compound));
    }

    let mut specificity: u32 = compound_specificity(&subject);
    for (_, compound) in &ancestors {
        specificity += compound_specificity(compound);
    }
    if parser.pseudo_element.is_some() {
        specificity += 1;
    }

    Some(ParsedSelector {
        subject,
        ancestors,
        pseudo_element: parser.pseudo_element,
        specificity,
        text: text.to_string(),
    })
}

/// [§ 17 Calculating a selector's specificity](https://www.w3.org/TR/selectors-4/#specificity-rules)
///
/// Packed as `a·10_000 + b·100 + c`. `:not()` contributes its argument's
/// specificity; `:is()` the maximum of its options; `:where()` zero.
fn compound_specificity(compound: &CompoundSelector) -> u32 {
    let mut total = 0u32;
    for part in &compound.parts {
        total += match part {
            SimpleSelector::Id(_) => 10_000,
            SimpleSelector::Class(_)
            | SimpleSelector::Attribute(_)
            | SimpleSelector::Pseudo(_)
            | SimpleSelector::NeverMatch { counted: true } => 100,
            SimpleSelector::Type(_) => 1,
            SimpleSelector::Universal | SimpleSelector::NeverMatch { counted: false } => 0,
            SimpleSelector::Not(inner) => compound_specificity(inner),
            SimpleSelector::AnyOf { options, counts } => {
                if *counts {
                    options.iter().map(compound_specificity).max().unwrap_or(0)
                } else {
                    0
                }
            }
        };
    }
    total
}

/// All conditions of a compound hold for the element.
fn compound_matches(compound: &CompoundSelector, arena: &NodeArena, element: NodeId) -> bool {
    let Some(data) = arena.as_element(element) else {
        return false;
    };
    compound.parts.iter().all(|part| {
        simple_matches(part, data, arena, element)
    })
}

fn simple_matches(
    part: &SimpleSelector,
    data: &ElementData,
    arena: &NodeArena,
    element: NodeId,
) -> bool {
    match part {
        SimpleSelector::Type(tag) => data.tag_name == *tag,
        SimpleSelector::Class(class) => data.classes().contains(class.as_str()),
        SimpleSelector::Id(id) => data.id() == Some(id.as_str()),
        SimpleSelector::Universal => true,
        SimpleSelector::Attribute(attr) => attribute_matches(attr, data),
        SimpleSelector::Pseudo(pseudo) => pseudo_matches(*pseudo, data, arena, element),
        SimpleSelector::Not(inner) => !compound_matches(inner, arena, element),
        SimpleSelector::AnyOf { options, .. } => options
            .iter()
            .any(|option| compound_matches(option, arena, element)),
        SimpleSelector::NeverMatch { .. } => false,
    }
}

fn attribute_matches(selector: &AttributeSelector, data: &ElementData) -> bool {
    let Some(actual) = data.attrs.get(&selector.name) else {
        return false;
    };
    let expected = selector.value.as_str();
    match selector.matcher {
        AttrMatcher::Exists => true,
        AttrMatcher::Equals => actual == expected,
        AttrMatcher::Includes => actual.split_ascii_whitespace().any(|word| word == expected),
        AttrMatcher::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected)
                    .is_some_and(|rest| rest.starts_with('-'))
        }
        AttrMatcher::Prefix => !expected.is_empty() && actual.starts_with(expected),
        AttrMatcher::Suffix => !expected.is_empty() && actual.ends_with(expected),
        AttrMatcher::Substring => !expected.is_empty() && actual.contains(expected),
    }
}

fn pseudo_matches(
    pseudo: PseudoClass,
    data: &ElementData,
    arena: &NodeArena,
    element: NodeId,
) -> bool {
    match pseudo {
        PseudoClass::Root => arena.document_element() == Some(element),
        PseudoClass::FirstChild => prev_element_sibling(arena, element).is_none(),
        PseudoClass::LastChild => next_element_sibling(arena, element).is_none(),
        PseudoClass::OnlyChild => {
            prev_element_sibling(arena, element).is_none()
                && next_element_sibling(arena, element).is_none()
        }
        PseudoClass::Empty => arena.children(element).is_empty(),
        PseudoClass::FirstOfType => !siblings_of_type_before(arena, element, &data.tag_name),
        PseudoClass::LastOfType => !siblings_of_type_after(arena, element, &data.tag_name),
        PseudoClass::Link => data.tag_name == "a" && data.attrs.contains("href"),
        PseudoClass::Disabled => data.attrs.contains("disabled"),
        PseudoClass::Enabled => {
            matches!(
                data.tag_name.as_str(),
                "input" | "button" | "select" | "textarea" | "optgroup" | "option" | "fieldset"
            ) && !data.attrs.contains("disabled")
        }
    }
}

fn prev_element_sibling(arena: &NodeArena, element: NodeId) -> Option<NodeId> {
    arena
        .preceding_siblings(element)
        .find(|&id| arena.as_element(id).is_some())
}

fn next_element_sibling(arena: &NodeArena, element: NodeId) -> Option<NodeId> {
    let mut current = arena.next_sibling(element);
    while let Some(id) = current {
        if arena.as_element(id).is_some() {
            return Some(id);
        }
        current = arena.next_sibling(id);
    }
    None
}

fn siblings_of_type_before(arena: &NodeArena, element: NodeId, tag: &str) -> bool {
    arena
        .preceding_siblings(element)
        .any(|id| arena.as_element(id).is_some_and(|e| e.tag_name == tag))
}

fn siblings_of_type_after(arena: &NodeArena, element: NodeId, tag: &str) -> bool {
    let mut current = arena.next_sibling(element);
    while let Some(id) = current {
        if arena.as_element(id).is_some_and(|e| e.tag_name == tag) {
            return true;
        }
        current = arena.next_sibling(id);
    }
    false
}

/// Evaluate the combinator chain, walking up and left from `current` with
/// backtracking for the indefinite combinators.
fn ancestors_match(
    chain: &[(Combinator, CompoundSelector)],
    index: usize,
    arena: &NodeArena,
    current: NodeId,
) -> bool {
    let Some((combinator, compound)) = chain.get(index) else {
        return true;
    };
    match combinator {
        Combinator::Child => {
            let Some(parent) = arena.parent(current) else {
                return false;
            };
            compound_matches(compound, arena, parent)
                && ancestors_match(chain, index + 1, arena, parent)
        }
        Combinator::Descendant => {
            let mut candidate = arena.parent(current);
            while let Some(ancestor) = candidate {
                if compound_matches(compound, arena, ancestor)
                    && ancestors_match(chain, index + 1, arena, ancestor)
                {
                    return true;
                }
                candidate = arena.parent(ancestor);
            }
            false
        }
        Combinator::NextSibling => {
            let Some(prev) = prev_element_sibling(arena, current) else {
                return false;
            };
            compound_matches(compound, arena, prev) && ancestors_match(chain, index + 1, arena, prev)
        }
        Combinator::SubsequentSibling => {
            let mut candidate = prev_element_sibling(arena, current);
            while let Some(sibling) = candidate {
                if compound_matches(compound, arena, sibling)
                    && ancestors_match(chain, index + 1, arena, sibling)
                {
                    return true;
                }
                candidate = prev_element_sibling(arena, sibling);
            }
            false
        }
    }
}

/// Split a selector list on commas outside brackets and parens.
fn split_top_level_commas(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

struct SelectorParser {
    chars: Vec<char>,
    pos: usize,
    pseudo_element: Option<PseudoElement>,
}

impl SelectorParser {
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

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_ident(&mut self) -> Option<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii())
        {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    /// Between two compounds: whitespace alone is the descendant
    /// combinator; `>`, `+`, `~` (optionally padded) are the others.
    /// Returns `None` at the end of the selector.
    fn parse_combinator(&mut self) -> Option<Combinator> {
        let had_space = self.peek().is_some_and(|c| c.is_ascii_whitespace());
        self.skip_whitespace();
        let combinator = match self.peek() {
            Some('>') => Some(Combinator::Child),
            Some('+') => Some(Combinator::NextSibling),
            Some('~') => Some(Combinator::SubsequentSibling),
            _ => None,
        };
        if let Some(combinator) = combinator {
            let _ = self.bump();
            self.skip_whitespace();
            return Some(combinator);
        }
        if had_space && !self.at_end() {
            return Some(Combinator::Descendant);
        }
        None
    }

    fn parse_compound(&mut self) -> Option<CompoundSelector> {
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some('*') => {
                    let _ = self.bump();
                    parts.push(SimpleSelector::Universal);
                }
                Some('.') => {
                    let _ = self.bump();
                    parts.push(SimpleSelector::Class(self.parse_ident()?));
                }
                Some('#') => {
                    let _ = self.bump();
                    parts.push(SimpleSelector::Id(self.parse_ident()?));
                }
                Some('[') => {
                    let _ = self.bump();
                    parts.push(SimpleSelector::Attribute(self.parse_attribute()?));
                }
                Some(':') => {
                    let _ = self.bump();
                    if let Some(part) = self.parse_pseudo()? {
                        parts.push(part);
                    }
                }
                Some(c) if c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii() => {
                    let ident = self.parse_ident()?;
                    parts.push(SimpleSelector::Type(ident.to_ascii_lowercase()));
                }
                _ => break,
            }
        }
        if parts.is_empty() && self.pseudo_element.is_none() {
            return None;
        }
        Some(CompoundSelector { parts })
    }

    fn parse_attribute(&mut self) -> Option<AttributeSelector> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let matcher = match self.peek() {
            Some(']') => {
                let _ = self.bump();
                return Some(AttributeSelector {
                    name,
                    matcher: AttrMatcher::Exists,
                    value: String::new(),
                });
            }
            Some('=') => {
                let _ = self.bump();
                AttrMatcher::Equals
            }
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                let _ = self.bump();
                if self.bump() != Some('=') {
                    return None;
                }
                match c {
                    '~' => AttrMatcher::Includes,
                    '|' => AttrMatcher::DashMatch,
                    '^' => AttrMatcher::Prefix,
                    '$' => AttrMatcher::Suffix,
                    _ => AttrMatcher::Substring,
                }
            }
            _ => return None,
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let _ = self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.pos += 1;
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                let _ = self.bump();
                value
            }
            _ => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| !c.is_ascii_whitespace() && c != ']')
                {
                    self.pos += 1;
                }
                self.chars[start..self.pos].iter().collect()
            }
        };
        self.skip_whitespace();
        // Tolerate (and ignore) the case-sensitivity flag.
        if self.peek().is_some_and(|c| c == 'i' || c == 'I' || c == 's' || c == 'S') {
            let _ = self.bump();
            self.skip_whitespace();
        }
        if self.bump() != Some(']') {
            return None;
        }
        Some(AttributeSelector {
            name,
            matcher,
            value,
        })
    }

    /// Parse after a consumed `:`. Returns `Ok(None)`-style `Some(None)`
    /// when the pseudo turned out to be the subject's pseudo-element.
    #[allow(clippy::option_option)]
    fn parse_pseudo(&mut self) -> Option<Option<SimpleSelector>> {
        let double = self.peek() == Some(':');
        if double {
            let _ = self.bump();
        }
        let name = self.parse_ident()?.to_ascii_lowercase();
        let argument = if self.peek() == Some('(') {
            let _ = self.bump();
            let start = self.pos;
            let mut depth = 1usize;
            while let Some(c) = self.peek() {
                match c {
                    '(' => depth += 1,
                    ')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                self.pos += 1;
            }
            let arg: String = self.chars[start..self.pos].iter().collect();
            if self.bump() != Some(')') {
                return None;
            }
            Some(arg)
        } else {
            None
        };

        if double || matches!(name.as_str(), "before" | "after") {
            // `::before`/`::after`, including the legacy one-colon form.
            match name.as_str() {
                "before" => {
                    self.pseudo_element = Some(PseudoElement::Before);
                    return Some(None);
                }
                "after" => {
                    self.pseudo_element = Some(PseudoElement::After);
                    return Some(None);
                }
                _ => {
                    // Other pseudo-elements render nothing here.
                    return Some(Some(SimpleSelector::NeverMatch { counted: false }));
                }
            }
        }

        let part = match name.as_str() {
            "root" => SimpleSelector::Pseudo(PseudoClass::Root),
            "first-child" => SimpleSelector::Pseudo(PseudoClass::FirstChild),
            "last-child" => SimpleSelector::Pseudo(PseudoClass::LastChild),
            "only-child" => SimpleSelector::Pseudo(PseudoClass::OnlyChild),
            "empty" => SimpleSelector::Pseudo(PseudoClass::Empty),
            "first-of-type" => SimpleSelector::Pseudo(PseudoClass::FirstOfType),
            "last-of-type" => SimpleSelector::Pseudo(PseudoClass::LastOfType),
            "link" | "any-link" => SimpleSelector::Pseudo(PseudoClass::Link),
            "disabled" => SimpleSelector::Pseudo(PseudoClass::Disabled),
            "enabled" => SimpleSelector::Pseudo(PseudoClass::Enabled),
            "not" => {
                let inner = parse_compound_argument(argument.as_deref()?)?;
                SimpleSelector::Not(Box::new(inner))
            }
            "is" | "matches" | "where" => {
                let options = split_top_level_commas(argument.as_deref()?)
                    .into_iter()
                    .filter_map(parse_compound_argument)
                    .collect::<Vec<_>>();
                if options.is_empty() {
                    return None;
                }
                SimpleSelector::AnyOf {
                    options,
                    counts: name != "where",
                }
            }
            n if n.starts_with("nth-") => SimpleSelector::NeverMatch { counted: false },
            // Interactive and state pseudo-classes: kept, never matching.
            _ => SimpleSelector::NeverMatch { counted: true },
        };
        Some(Some(part))
    }
}

/// Parse a lone compound selector (the argument of `:not()`/`:is()`).
fn parse_compound_argument(text: &str) -> Option<CompoundSelector> {
    let text = text.trim();
    let mut parser = SelectorParser {
        chars: text.chars().collect(),
        pos: 0,
        pseudo_element: None,
    };
    let compound = parser.parse_compound()?;
    parser.at_end().then_some(compound)
}
