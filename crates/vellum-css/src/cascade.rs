//! The cascade resolver.
//!
//! [CSS Cascading and Inheritance Level 5](https://www.w3.org/TR/css-cascade-5/)
//!
//! For one element, declarations from every sheet are gathered through the
//! rule index, validated against the element, filtered by their enclosing
//! conditions, and applied lowest-priority-first so later writes win. The
//! precedence ladder, low to high:
//!
//! 1. layered normal declarations, by ascending layer order
//! 2. unlayered normal declarations
//! 3. inline `style="..."` normal declarations
//! 4. unlayered `!important` declarations
//! 5. layered `!important` declarations, by *descending* layer order
//! 6. inline `!important` declarations
//!
//! Within each step: ascending specificity, then stylesheet order, then
//! source order. Computed maps are cached per element and invalidated by
//! the style generation counter.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use vellum_dom::{NodeArena, NodeId};

use crate::environment::Environment;
use crate::media::{eval_container_condition, eval_media_query, eval_supports_condition};
use crate::parser::parse_inline_style;
use crate::rule_index::{CandidateRule, Condition, RuleIndex};
use crate::selector::PseudoElement;
use crate::stylesheet::{Stylesheet, style_generation};
use crate::vars::substitute_vars;

/// Whether a property passes from parent to child when the child has no
/// declaration of its own. Custom properties always inherit.
#[must_use]
pub fn is_inherited_property(property: &str) -> bool {
    property.starts_with("--")
        || property.starts_with("font")
        || property.starts_with("text-")
        || property.starts_with("list-style")
        || matches!(
            property,
            "color"
                | "cursor"
                | "direction"
                | "visibility"
                | "caption-side"
                | "border-collapse"
                | "border-spacing"
                | "empty-cells"
                | "quotes"
                | "orphans"
                | "widows"
                | "pointer-events"
                | "line-height"
                | "letter-spacing"
                | "word-spacing"
                | "white-space"
                | "word-break"
                | "overflow-wrap"
        )
}

/// The computed property map for one element: property name to resolved
/// value text. Values never contain unresolved `var()` references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedProps {
    values: HashMap<String, String>,
}

impl ComputedProps {
    /// Look up a computed value.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&str> {
        self.values.get(property).map(String::as_str)
    }

    /// Iterate over `(property, value)` pairs (unordered).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of computed properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn insert(&mut self, property: String, value: String) {
        let _ = self.values.insert(property, value);
    }

    fn remove(&mut self, property: &str) {
        let _ = self.values.remove(property);
    }
}

/// A declaration queued for application, with its full sort key.
struct OrderedDecl {
    /// Precedence step (the ladder in the module docs).
    tier: u8,
    /// Layer position within the tier (already direction-adjusted).
    layer_key: u32,
    specificity: u32,
    sheet: usize,
    source_order: u32,
    seq: usize,
    property: String,
    value: String,
}

struct CachedStyle {
    props: Rc<ComputedProps>,
    custom: Rc<HashMap<String, String>>,
}

/// The cascade engine: stylesheets, their indices, and the per-element
/// computed-style cache.
pub struct CascadeEngine<E: Environment> {
    env: E,
    sheets: Vec<Stylesheet>,
    indices: Vec<RuleIndex>,
    /// Generation the indices and cache were built at; `None` forces a
    /// rebuild on next use.
    indexed_at: Option<u64>,
    cache: HashMap<NodeId, CachedStyle>,
}

impl<E: Environment> CascadeEngine<E> {
    /// Create an engine with no stylesheets.
    #[must_use]
    pub fn new(env: E) -> Self {
        Self {
            env,
            sheets: Vec::new(),
            indices: Vec::new(),
            indexed_at: None,
            cache: HashMap::new(),
        }
    }

    /// Append a stylesheet. Invalidates cached styles.
    pub fn add_stylesheet(&mut self, sheet: Stylesheet) {
        self.sheets.push(sheet);
        self.indexed_at = None;
    }

    /// Mutable access to a stylesheet, for `replace_sync` and rule edits.
    /// The mutation itself bumps the style generation.
    pub fn stylesheet_mut(&mut self, index: usize) -> Option<&mut Stylesheet> {
        self.sheets.get_mut(index)
    }

    /// The environment conditions are evaluated against.
    #[must_use]
    pub fn environment(&self) -> &E {
        &self.env
    }

    /// Number of elements with a live cached style, for cache probes.
    #[must_use]
    pub fn cached_nodes(&self) -> usize {
        self.cache.len()
    }

    /// Resolve the computed style for an element, from cache when the
    /// style generation still matches.
    pub fn computed_style(&mut self, arena: &NodeArena, element: NodeId) -> Rc<ComputedProps> {
        self.computed_entry(arena, element).props
    }

    /// Resolve the declarations addressed at a pseudo-element of
    /// `element` (`::before`/`::after`), with `var()` substituted against
    /// the element's custom properties and `inherit` resolved against the
    /// element itself.
    pub fn pseudo_style(
        &mut self,
        arena: &NodeArena,
        element: NodeId,
        which: PseudoElement,
    ) -> ComputedProps {
        self.refresh();
        if arena.as_element(element).is_none() {
            return ComputedProps::default();
        }
        let candidates = self.gather_candidates(arena, element);
        let mut ordered = Vec::new();
        for (sheet, rule) in candidates {
            if !self.conditions_hold(arena, element, &rule) {
                continue;
            }
            let specificity = rule
                .selectors
                .iter()
                .filter(|s| s.pseudo_element == Some(which))
                .filter(|s| s.matches(arena, element))
                .map(|s| s.specificity)
                .max();
            let Some(specificity) = specificity else {
                continue;
            };
            push_rule_declarations(&mut ordered, &rule, sheet, specificity);
        }
        let owner = self.computed_entry(arena, element);
        let mut props = ComputedProps::default();
        apply_ordered(&mut ordered, &mut props);
        resolve_values(&mut props, &owner.custom, &owner.props);
        props
    }

    fn refresh(&mut self) {
        let generation = style_generation();
        if self.indexed_at != Some(generation) {
            self.indices = self.sheets.iter().map(RuleIndex::build).collect();
            self.cache.clear();
            self.indexed_at = Some(generation);
        }
    }

    fn computed_entry(&mut self, arena: &NodeArena, element: NodeId) -> CachedStyle {
        self.refresh();
        if arena.as_element(element).is_none() {
            return CachedStyle {
                props: Rc::new(ComputedProps::default()),
                custom: Rc::new(HashMap::new()),
            };
        }
        if let Some(hit) = self.cache.get(&element) {
            return CachedStyle {
                props: Rc::clone(&hit.props),
                custom: Rc::clone(&hit.custom),
            };
        }

        let parent = arena
            .ancestors(element)
            .find(|&id| arena.as_element(id).is_some());
        let inherited = match parent {
            Some(parent) => self.computed_entry(arena, parent),
            None => CachedStyle {
                props: Rc::new(ComputedProps::default()),
                custom: Rc::new(HashMap::new()),
            },
        };

        let candidates = self.gather_candidates(arena, element);
        let mut ordered = Vec::new();
        for (sheet, rule) in candidates {
            if !self.conditions_hold(arena, element, &rule) {
                continue;
            }
            let specificity = rule
                .selectors
                .iter()
                .filter(|s| s.pseudo_element.is_none())
                .filter(|s| s.matches(arena, element))
                .map(|s| s.specificity)
                .max();
            let Some(specificity) = specificity else {
                continue;
            };
            push_rule_declarations(&mut ordered, &rule, sheet, specificity);
        }

        // Inline style overlays at ladder steps 3 and 6.
        if let Some(style_attr) = arena
            .as_element(element)
            .and_then(|data| data.attrs.get("style"))
        {
            for (seq, decl) in parse_inline_style(style_attr).into_iter().enumerate() {
                ordered.push(OrderedDecl {
                    tier: if decl.important { 5 } else { 2 },
                    layer_key: 0,
                    specificity: 0,
                    sheet: usize::MAX,
                    source_order: u32::MAX,
                    seq,
                    property: decl.property,
                    value: decl.value,
                });
            }
        }

        // Custom properties cascade like everything else, into their own
        // map; the parent's map is the base (they all inherit).
        let mut custom: HashMap<String, String> = (*inherited.custom).clone();
        let mut own = ComputedProps::default();
        ordered.sort_by(|a, b| {
            (a.tier, a.layer_key, a.specificity, a.sheet, a.source_order, a.seq).cmp(&(
                b.tier,
                b.layer_key,
                b.specificity,
                b.sheet,
                b.source_order,
                b.seq,
            ))
        });
        for decl in ordered {
            if decl.property.starts_with("--") {
                let _ = custom.insert(decl.property, decl.value);
            } else {
                own.insert(decl.property, decl.value);
            }
        }

        // Start from the inheritable slice of the parent's map, then lay
        // the element's own resolved declarations over it.
        let mut props = ComputedProps::default();
        for (property, value) in inherited.props.iter() {
            if is_inherited_property(property) {
                props.insert(property.to_string(), value.to_string());
            }
        }
        let custom = Rc::new(custom);
        resolve_into(&own, &custom, &inherited.props, &mut props);

        let entry = CachedStyle {
            props: Rc::new(props),
            custom,
        };
        let _ = self.cache.insert(
            element,
            CachedStyle {
                props: Rc::clone(&entry.props),
                custom: Rc::clone(&entry.custom),
            },
        );
        entry
    }

    /// Candidate rules for the element across all sheets. The `Rc`s are
    /// cloned out so condition evaluation below can re-enter the engine.
    fn gather_candidates(
        &self,
        arena: &NodeArena,
        element: NodeId,
    ) -> Vec<(usize, Rc<CandidateRule>)> {
        let Some(data) = arena.as_element(element) else {
            return Vec::new();
        };
        let classes: HashSet<&str> = data.classes();
        let mut out = Vec::new();
        for (sheet, index) in self.indices.iter().enumerate() {
            for rule in index.candidates(&data.tag_name, data.id(), &classes) {
                out.push((sheet, rule));
            }
        }
        out
    }

    fn conditions_hold(
        &mut self,
        arena: &NodeArena,
        element: NodeId,
        rule: &CandidateRule,
    ) -> bool {
        // Conditions are evaluated outermost-first; any false short-circuits.
        (0..rule.conditions.len()).all(|i| match &rule.conditions[i] {
            Condition::Media(query) => eval_media_query(query, &self.env),
            Condition::Supports(condition) => eval_supports_condition(condition),
            Condition::Container { name, condition } => {
                self.container_condition_holds(arena, element, name.as_deref(), condition)
            }
        })
    }

    /// Resolve a `@container` condition against the nearest ancestor that
    /// establishes a container (optionally with a matching name). With no
    /// such ancestor, or no measured size, the viewport stands in.
    fn container_condition_holds(
        &mut self,
        arena: &NodeArena,
        element: NodeId,
        name: Option<&str>,
        condition: &str,
    ) -> bool {
        let ancestors: Vec<NodeId> = arena
            .ancestors(element)
            .filter(|&id| arena.as_element(id).is_some())
            .collect();
        let mut container = None;
        for ancestor in ancestors {
            let props = self.computed_entry(arena, ancestor).props;
            let establishes = props
                .get("container-type")
                .is_some_and(|v| !v.trim().is_empty() && v != "normal")
                || props.get("container-name").is_some()
                || props.get("container").is_some();
            if !establishes {
                continue;
            }
            if let Some(required) = name {
                let named = props
                    .get("container-name")
                    .or_else(|| props.get("container"))
                    .is_some_and(|v| v.split(|c: char| c.is_whitespace() || c == '/').any(|n| n == required));
                if !named {
                    continue;
                }
            }
            container = Some(ancestor);
            break;
        }
        let size = container
            .and_then(|id| self.env.container_size(id))
            .unwrap_or((self.env.viewport_width(), self.env.viewport_height()));
        eval_container_condition(condition, to_f32(size.0), to_f32(size.1))
    }
}

/// Queue a rule's declarations with the tier/layer portion of their sort
/// key filled in from the rule's layer and importance.
fn push_rule_declarations(
    ordered: &mut Vec<OrderedDecl>,
    rule: &Rc<CandidateRule>,
    sheet: usize,
    specificity: u32,
) {
    for (seq, decl) in rule.declarations.iter().enumerate() {
        let (tier, layer_key) = match (decl.important, rule.layer) {
            (false, Some(layer)) => (0, u32::from(layer)),
            (false, None) => (1, 0),
            (true, None) => (3, 0),
            // Descending layer order: the earliest-declared layer wins
            // among important declarations, so it applies last.
            (true, Some(layer)) => (4, u32::MAX - u32::from(layer)),
        };
        ordered.push(OrderedDecl {
            tier,
            layer_key,
            specificity,
            sheet,
            source_order: rule.source_order,
            seq,
            property: decl.property.clone(),
            value: decl.value.clone(),
        });
    }
}

/// Sort and fold the queued declarations into a raw (pre-substitution)
/// property map.
fn apply_ordered(ordered: &mut Vec<OrderedDecl>, out: &mut ComputedProps) {
    ordered.sort_by(|a, b| {
        (a.tier, a.layer_key, a.specificity, a.sheet, a.source_order, a.seq).cmp(&(
            b.tier,
            b.layer_key,
            b.specificity,
            b.sheet,
            b.source_order,
            b.seq,
        ))
    });
    for decl in ordered.drain(..) {
        out.insert(decl.property, decl.value);
    }
}

/// Substitute `var()` and resolve global keywords for each own
/// declaration, writing the result over the inherited base in `props`.
fn resolve_into(
    own: &ComputedProps,
    custom: &HashMap<String, String>,
    parent: &ComputedProps,
    props: &mut ComputedProps,
) {
    for (property, raw) in own.iter() {
        let value = substitute_vars(raw, custom);
        match value.trim().to_ascii_lowercase().as_str() {
            "inherit" => match parent.get(property) {
                Some(parent_value) => props.insert(property.to_string(), parent_value.to_string()),
                None => props.remove(property),
            },
            "initial" | "revert" => props.remove(property),
            "unset" => {
                if is_inherited_property(property) {
                    match parent.get(property) {
                        Some(parent_value) => {
                            props.insert(property.to_string(), parent_value.to_string());
                        }
                        None => props.remove(property),
                    }
                } else {
                    props.remove(property);
                }
            }
            _ => props.insert(property.to_string(), value),
        }
    }
}

/// Pseudo-element variant of [`resolve_into`]: no inherited base, and
/// `inherit` reads from the owning element.
fn resolve_values(
    props: &mut ComputedProps,
    custom: &HashMap<String, String>,
    owner: &ComputedProps,
) {
    let own = props.clone();
    *props = ComputedProps::default();
    resolve_into(&own, custom, owner, props);
}

#[allow(clippy::cast_precision_loss)]
fn to_f32(v: u32) -> f32 {
    v as f32
}
