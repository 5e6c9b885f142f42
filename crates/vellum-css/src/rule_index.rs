//! Key-selector bucketing for candidate rule lookup.
//!
//! Matching every selector against every element is quadratic in practice.
//! The index buckets each rule under the key of its rightmost compound —
//! `#id`, first `.class`, tag, or `*` — so a lookup touches only the
//! buckets an element could possibly match. The union is a superset: the
//! caller still validates each selector against the element.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::selector::{ParsedSelector, SimpleSelector};
use crate::stylesheet::{Declaration, Rule, Stylesheet};

/// The conditional context a rule sits inside, innermost last. A rule is
/// live only when every condition evaluates true.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// An enclosing `@media` prelude.
    Media(String),
    /// An enclosing `@supports` prelude.
    Supports(String),
    /// An enclosing `@container` prelude.
    Container {
        /// Optional container name the query targets.
        name: Option<String>,
        /// The size condition.
        condition: String,
    },
}

/// A style rule flattened out of the stylesheet for cascade consumption.
#[derive(Debug)]
pub struct CandidateRule {
    /// All selectors of the rule; the cascade validates each and takes the
    /// highest specificity among those that match.
    pub selectors: Vec<ParsedSelector>,
    /// The rule's declarations, in source order.
    pub declarations: Vec<Declaration>,
    /// Enclosing conditional at-rules, outermost first.
    pub conditions: Vec<Condition>,
    /// Cascade layer index; `None` for unlayered rules.
    pub layer: Option<u16>,
    /// Document-order position assigned while flattening the stylesheet.
    /// Unique per rule, so it doubles as an identity for de-duplicating
    /// the bucket union. Assigned here rather than taken from the parsed
    /// rule: `insert_rule` splices rules whose parse-time order counters
    /// restart at zero.
    pub source_order: u32,
    /// Highest selector specificity, used to keep buckets cascade-ready.
    pub max_specificity: u32,
}

/// The bucket key of a selector's rightmost compound.
///
/// Priority when a compound offers several: id, then class, then tag,
/// then universal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BucketKey {
    /// Keyed by `#id`.
    Id(String),
    /// Keyed by the first `.class`.
    Class(String),
    /// Keyed by tag name.
    Tag(String),
    /// No usable key; candidate for every element.
    Universal,
}

/// Compute the bucket key for one selector.
#[must_use]
pub fn key_selector(selector: &ParsedSelector) -> BucketKey {
    let mut class = None;
    let mut tag = None;
    for part in &selector.subject.parts {
        match part {
            SimpleSelector::Id(id) => return BucketKey::Id(id.clone()),
            SimpleSelector::Class(c) if class.is_none() => class = Some(c.clone()),
            SimpleSelector::Type(t) if tag.is_none() => tag = Some(t.clone()),
            _ => {}
        }
    }
    if let Some(class) = class {
        return BucketKey::Class(class);
    }
    if let Some(tag) = tag {
        return BucketKey::Tag(tag);
    }
    BucketKey::Universal
}

/// The rule index for one stylesheet.
#[derive(Debug, Default)]
pub struct RuleIndex {
    by_id: HashMap<String, Vec<Rc<CandidateRule>>>,
    by_class: HashMap<String, Vec<Rc<CandidateRule>>>,
    by_tag: HashMap<String, Vec<Rc<CandidateRule>>>,
    universal: Vec<Rc<CandidateRule>>,
}

impl RuleIndex {
    /// Build the index for a stylesheet, flattening conditional at-rules
    /// into per-rule condition lists.
    #[must_use]
    pub fn build(sheet: &Stylesheet) -> Self {
        let mut index = Self::default();
        let mut conditions = Vec::new();
        let mut order = 0u32;
        index.collect(&sheet.rules, &mut conditions, &mut order);
        index.sort_buckets();
        index
    }

    fn collect(&mut self, rules: &[Rule], conditions: &mut Vec<Condition>, order: &mut u32) {
        for rule in rules {
            match rule {
                Rule::Style(style) => {
                    if style.selectors.is_empty() {
                        continue;
                    }
                    let candidate = Rc::new(CandidateRule {
                        selectors: style.selectors.clone(),
                        declarations: style.declarations.clone(),
                        conditions: conditions.clone(),
                        layer: style.layer,
                        source_order: *order,
                        max_specificity: style
                            .selectors
                            .iter()
                            .map(|s| s.specificity)
                            .max()
                            .unwrap_or(0),
                    });
                    *order += 1;
                    self.insert(&candidate);
                }
                Rule::Media(media) => {
                    conditions.push(Condition::Media(media.condition.clone()));
                    self.collect(&media.rules, conditions, order);
                    let _ = conditions.pop();
                }
                Rule::Supports(supports) => {
                    conditions.push(Condition::Supports(supports.condition.clone()));
                    self.collect(&supports.rules, conditions, order);
                    let _ = conditions.pop();
                }
                Rule::Container(container) => {
                    conditions.push(Condition::Container {
                        name: container.name.clone(),
                        condition: container.condition.clone(),
                    });
                    self.collect(&container.rules, conditions, order);
                    let _ = conditions.pop();
                }
                Rule::Keyframes(_)
                | Rule::FontFace(_)
                | Rule::Import(_)
                | Rule::LayerStatement(_) => {}
            }
        }
    }

    /// Insert a rule under each distinct key among its selectors. A rule
    /// whose selectors share a key lands in that bucket once.
    fn insert(&mut self, candidate: &Rc<CandidateRule>) {
        let keys: HashSet<BucketKey> = candidate.selectors.iter().map(key_selector).collect();
        for key in keys {
            let bucket = match key {
                BucketKey::Id(id) => self.by_id.entry(id).or_default(),
                BucketKey::Class(class) => self.by_class.entry(class).or_default(),
                BucketKey::Tag(tag) => self.by_tag.entry(tag).or_default(),
                BucketKey::Universal => &mut self.universal,
            };
            bucket.push(Rc::clone(candidate));
        }
    }

    /// Buckets stay sorted ascending by (specificity, source order) so the
    /// cascade can apply them in order.
    fn sort_buckets(&mut self) {
        let sort = |bucket: &mut Vec<Rc<CandidateRule>>| {
            bucket.sort_by_key(|rule| (rule.max_specificity, rule.source_order));
        };
        self.by_id.values_mut().for_each(sort);
        self.by_class.values_mut().for_each(sort);
        self.by_tag.values_mut().for_each(sort);
        sort(&mut self.universal);
    }

    /// Candidate rules for an element, deduplicated across buckets and
    /// sorted ascending by (specificity, source order).
    #[must_use]
    pub fn candidates(
        &self,
        tag: &str,
        id: Option<&str>,
        classes: &HashSet<&str>,
    ) -> Vec<Rc<CandidateRule>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut take = |bucket: &[Rc<CandidateRule>]| {
            for rule in bucket {
                if seen.insert(rule.source_order) {
                    out.push(Rc::clone(rule));
                }
            }
        };
        take(&self.universal);
        if let Some(bucket) = self.by_tag.get(tag) {
            take(bucket);
        }
        if let Some(bucket) = id.and_then(|id| self.by_id.get(id)) {
            take(bucket);
        }
        for class in classes {
            if let Some(bucket) = self.by_class.get(*class) {
                take(bucket);
            }
        }
        out.sort_by_key(|rule| (rule.max_specificity, rule.source_order));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::parse_selector;

    fn key_of(text: &str) -> BucketKey {
        key_selector(&parse_selector(text).unwrap())
    }

    #[test]
    fn key_prefers_id_then_class_then_tag() {
        assert_eq!(key_of("div.note#main"), BucketKey::Id("main".into()));
        assert_eq!(key_of("div.note"), BucketKey::Class("note".into()));
        assert_eq!(key_of("div"), BucketKey::Tag("div".into()));
        assert_eq!(key_of("*"), BucketKey::Universal);
        assert_eq!(key_of("[hidden]"), BucketKey::Universal);
    }

    #[test]
    fn key_uses_rightmost_compound() {
        assert_eq!(key_of("#nav a"), BucketKey::Tag("a".into()));
        assert_eq!(key_of("ul > li.item"), BucketKey::Class("item".into()));
    }

    #[test]
    fn pseudo_elements_do_not_affect_the_key() {
        assert_eq!(key_of("p::before"), BucketKey::Tag("p".into()));
    }

    #[test]
    fn candidates_are_a_superset_and_sorted() {
        let sheet = Stylesheet::parse(
            "p { color: a } .note { color: b } #x { color: c } * { color: d } div { color: e }",
        );
        let index = RuleIndex::build(&sheet);
        let classes: HashSet<&str> = ["note"].into_iter().collect();
        let candidates = index.candidates("p", Some("x"), &classes);
        // div bucket is not consulted; everything else is.
        assert_eq!(candidates.len(), 4);
        let specs: Vec<u32> = candidates.iter().map(|c| c.max_specificity).collect();
        let mut sorted = specs.clone();
        sorted.sort_unstable();
        assert_eq!(specs, sorted);
    }

    #[test]
    fn comma_list_rule_appears_once_per_bucket() {
        let sheet = Stylesheet::parse(".a, .a > span { color: x }");
        let index = RuleIndex::build(&sheet);
        let classes: HashSet<&str> = ["a"].into_iter().collect();
        // One selector keys on .a, the other on span, but the .a bucket
        // holds the rule exactly once.
        let candidates = index.candidates("div", None, &classes);
        assert_eq!(candidates.len(), 1);
    }
}
