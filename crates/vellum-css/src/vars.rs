//! Custom property (`var()`) substitution.
//!
//! [CSS Custom Properties Level 1 § 3](https://www.w3.org/TR/css-variables-1/#using-variables)
//!
//! Computed values here are strings, so substitution is textual: each
//! `var(--name, fallback)` occurrence is replaced by the custom property's
//! cascaded value, the fallback, or the empty string, in that order of
//! preference. The resulting map never contains an unresolved `var()`.

use std::collections::HashMap;

/// Maximum substitution depth to prevent runaway recursion from cycles.
///
/// [§ 2.3 Resolving Dependency Cycles](https://www.w3.org/TR/css-variables-1/#cycles)
///
/// "If there is a cycle in the dependency graph, all the custom properties
/// in the cycle are invalid at computed-value time."
///
/// A depth limit is a pragmatic approximation of cycle detection.
const MAX_SUBSTITUTION_DEPTH: u32 = 32;

/// Returns true if the value contains a `var(` reference.
#[must_use]
pub fn contains_var(value: &str) -> bool {
    find_var(value).is_some()
}

/// Substitute every `var()` in `value` against `custom` (a map of `--name`
/// to already-cascaded value text).
///
/// A reference to an undefined property with no fallback substitutes the
/// empty string; the declaration survives with a hole rather than erroring.
#[must_use]
#[allow(clippy::implicit_hasher)]
pub fn substitute_vars(value: &str, custom: &HashMap<String, String>) -> String {
    substitute_at_depth(value, custom, 0)
}

fn substitute_at_depth(value: &str, custom: &HashMap<String, String>, depth: u32) -> String {
    if depth > MAX_SUBSTITUTION_DEPTH {
        return String::new();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = find_var(rest) {
        out.push_str(&rest[..start]);
        let after_open = start + "var(".len();
        let Some(close) = matching_paren(rest, after_open) else {
            // Unbalanced reference; drop the malformed tail.
            return out;
        };
        let inner = &rest[after_open..close];
        let (name, fallback) = split_var_arguments(inner);
        if let Some(resolved) = name.and_then(|n| custom.get(n)) {
            out.push_str(&substitute_at_depth(resolved, custom, depth + 1));
        } else if let Some(fallback) = fallback {
            out.push_str(&substitute_at_depth(fallback, custom, depth + 1));
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Byte offset of the next `var(` occurrence, case-insensitively.
fn find_var(value: &str) -> Option<usize> {
    let lower = value.to_ascii_lowercase();
    let mut from = 0;
    while let Some(found) = lower[from..].find("var(") {
        let at = from + found;
        // Reject matches that are the tail of a longer ident (e.g. the
        // `var(` inside `novar(`).
        let boundary = at == 0
            || !lower[..at]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if boundary {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

/// Byte offset of the `)` matching the paren that opened just before
/// `from`, honoring nesting.
fn matching_paren(value: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in value[from..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `--name , fallback` at the first top-level comma.
///
/// "var(--foo, red, blue) defines a fallback of `red, blue`" — everything
/// after the first comma, commas included, is the fallback.
fn split_var_arguments(inner: &str) -> (Option<&str>, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                let name = inner[..i].trim();
                let fallback = inner[i + 1..].trim();
                return (
                    name.starts_with("--").then_some(name),
                    Some(fallback),
                );
            }
            _ => {}
        }
    }
    let name = inner.trim();
    (name.starts_with("--").then_some(name), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_defined_property() {
        let map = custom(&[("--c", "red")]);
        assert_eq!(substitute_vars("var(--c)", &map), "red");
    }

    #[test]
    fn fallback_used_when_undefined() {
        let map = custom(&[]);
        assert_eq!(substitute_vars("var(--missing, 5px)", &map), "5px");
    }

    #[test]
    fn defined_property_wins_over_fallback() {
        let map = custom(&[("--x", "1px")]);
        assert_eq!(substitute_vars("var(--x, 5px)", &map), "1px");
    }

    #[test]
    fn missing_without_fallback_is_empty() {
        let map = custom(&[]);
        assert_eq!(substitute_vars("var(--missing)", &map), "");
    }

    #[test]
    fn comma_in_fallback_is_preserved() {
        let map = custom(&[]);
        assert_eq!(
            substitute_vars("var(--font, Arial, sans-serif)", &map),
            "Arial, sans-serif"
        );
    }

    #[test]
    fn nested_fallback_resolves() {
        let map = custom(&[("--c", "green")]);
        assert_eq!(substitute_vars("var(--missing, var(--c))", &map), "green");
    }

    #[test]
    fn substitution_inside_function_arguments() {
        let map = custom(&[("--r", "255")]);
        assert_eq!(
            substitute_vars("rgb(var(--r), 0, 0)", &map),
            "rgb(255, 0, 0)"
        );
    }

    #[test]
    fn self_reference_terminates_empty() {
        let map = custom(&[("--a", "var(--a)")]);
        assert_eq!(substitute_vars("var(--a)", &map), "");
    }

    #[test]
    fn plain_value_passes_through() {
        let map = custom(&[]);
        assert_eq!(substitute_vars("10px solid red", &map), "10px solid red");
    }
}
