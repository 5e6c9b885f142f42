//! Media, supports, and container condition evaluation.
//!
//! The grammar is the subset real-world stylesheets use: comma-separated
//! alternatives (OR), an optional `not`/`only` prefix, an optional media
//! type, and `and (feature)` chains. Unknown features evaluate true — a
//! permissive reading keeps content styled when authors use features this
//! renderer has no notion of.

use vellum_common::warning::warn_once;

use crate::environment::Environment;

/// Evaluate a full media query list against the environment.
#[must_use]
pub fn eval_media_query(query: &str, env: &dyn Environment) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    split_top_level(query, ',')
        .into_iter()
        .any(|alt| eval_alternative(alt.trim(), env))
}

/// One comma-separated alternative: `[not|only] [type] [and (feature)]*`
/// or a bare feature chain `(feature) [and (feature)]*`.
fn eval_alternative(alt: &str, env: &dyn Environment) -> bool {
    let mut rest = alt;
    let mut negate = false;
    if let Some(stripped) = strip_keyword(rest, "not") {
        negate = true;
        rest = stripped;
    } else if let Some(stripped) = strip_keyword(rest, "only") {
        rest = stripped;
    }

    let mut result = true;
    // Optional media type before the feature chain.
    if !rest.starts_with('(') {
        let type_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let media_type = &rest[..type_end];
        result = match media_type {
            "all" => true,
            t => t.eq_ignore_ascii_case(env.media_type()),
        };
        rest = rest[type_end..].trim_start();
        rest = strip_keyword(rest, "and").unwrap_or(rest);
    }

    for part in split_keyword(rest, "and") {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let feature = part.trim_start_matches('(').trim_end_matches(')').trim();
        result = result && eval_feature(feature, env);
    }
    result != negate
}

/// Evaluate one `name` or `name: value` feature.
fn eval_feature(feature: &str, env: &dyn Environment) -> bool {
    let (name, value) = match feature.split_once(':') {
        Some((n, v)) => (n.trim(), Some(v.trim())),
        None => (feature.trim(), None),
    };
    let vw = to_f32(env.viewport_width());
    let vh = to_f32(env.viewport_height());
    match name {
        "width" => value.and_then(parse_px).is_some_and(|v| close(vw, v)),
        "min-width" => value.and_then(parse_px).is_some_and(|v| vw >= v),
        "max-width" => value.and_then(parse_px).is_some_and(|v| vw <= v),
        "height" => value.and_then(parse_px).is_some_and(|v| close(vh, v)),
        "min-height" => value.and_then(parse_px).is_some_and(|v| vh >= v),
        "max-height" => value.and_then(parse_px).is_some_and(|v| vh <= v),
        "aspect-ratio" => value
            .and_then(parse_ratio)
            .is_some_and(|r| close(vw / vh, r)),
        "min-aspect-ratio" => value.and_then(parse_ratio).is_some_and(|r| vw / vh >= r),
        "max-aspect-ratio" => value.and_then(parse_ratio).is_some_and(|r| vw / vh <= r),
        "orientation" => {
            let actual = if vh >= vw { "portrait" } else { "landscape" };
            value == Some(actual)
        }
        "prefers-color-scheme" => value == Some(env.prefers_color_scheme()),
        "prefers-reduced-motion" => value == Some(env.prefers_reduced_motion()),
        "prefers-contrast" => value == Some(env.prefers_contrast()),
        // This renderer always produces at least 8-bit color.
        "color" => value.is_none_or(|v| v.parse::<u32>().is_ok_and(|bits| bits <= 8)),
        "color-gamut" => value == Some("srgb"),
        "hover" => value == Some(env.hover()),
        "pointer" => value == Some(env.pointer()),
        "display-mode" => value == Some("browser"),
        _ => {
            warn_once("CSS", "unknown media feature treated as matching");
            true
        }
    }
}

/// [`CSS.supports`] semantics, optimistic: a syntactically well-formed
/// declaration is assumed supported, unknown properties included.
#[must_use]
pub fn eval_supports_condition(condition: &str) -> bool {
    let condition = condition.trim();
    if condition.is_empty() {
        return false;
    }
    if let Some(rest) = strip_keyword(condition, "not") {
        return !eval_supports_condition(rest);
    }
    let or_parts = split_keyword(condition, "or");
    if or_parts.len() > 1 {
        return or_parts.iter().any(|p| eval_supports_condition(p));
    }
    let and_parts = split_keyword(condition, "and");
    if and_parts.len() > 1 {
        return and_parts.iter().all(|p| eval_supports_condition(p));
    }
    // A parenthesized leaf: either a nested condition or a declaration.
    if condition.starts_with('(') && condition.ends_with(')') {
        let inner = condition[1..condition.len() - 1].trim();
        if inner.starts_with('(') || starts_with_keyword(inner, "not") {
            return eval_supports_condition(inner);
        }
        // Well-formed means "ident : non-empty value".
        return inner.split_once(':').is_some_and(|(prop, value)| {
            let prop = prop.trim();
            !prop.is_empty()
                && prop
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                && !value.trim().is_empty()
        });
    }
    false
}

/// Evaluate a `@container` size condition against a resolved container
/// size in CSS pixels.
#[must_use]
pub fn eval_container_condition(condition: &str, width: f32, height: f32) -> bool {
    split_keyword(condition.trim(), "and")
        .into_iter()
        .all(|part| {
            let feature = part
                .trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .trim();
            if feature.is_empty() {
                return true;
            }
            let (name, value) = match feature.split_once(':') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => (feature, ""),
            };
            match name {
                "width" => parse_px(value).is_some_and(|v| close(width, v)),
                "min-width" => parse_px(value).is_some_and(|v| width >= v),
                "max-width" => parse_px(value).is_some_and(|v| width <= v),
                "height" => parse_px(value).is_some_and(|v| close(height, v)),
                "min-height" => parse_px(value).is_some_and(|v| height >= v),
                "max-height" => parse_px(value).is_some_and(|v| height <= v),
                "aspect-ratio" => parse_ratio(value).is_some_and(|r| close(width / height, r)),
                "min-aspect-ratio" => parse_ratio(value).is_some_and(|r| width / height >= r),
                "max-aspect-ratio" => parse_ratio(value).is_some_and(|r| width / height <= r),
                _ => {
                    warn_once("CSS", "unknown container feature treated as matching");
                    true
                }
            }
        })
}

/// Parse a length into CSS pixels. `em`/`rem` assume the 16px default
/// font size; bare numbers are taken as pixels.
fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    if let Some(number) = value.strip_suffix("px") {
        return number.trim().parse().ok();
    }
    if let Some(number) = value
        .strip_suffix("rem")
        .or_else(|| value.strip_suffix("em"))
    {
        return number.trim().parse::<f32>().ok().map(|n| n * 16.0);
    }
    value.parse().ok()
}

/// Parse `W/H` (or a bare number) into a ratio.
fn parse_ratio(value: &str) -> Option<f32> {
    match value.split_once('/') {
        Some((w, h)) => {
            let w: f32 = w.trim().parse().ok()?;
            let h: f32 = h.trim().parse().ok()?;
            (h.abs() > f32::EPSILON).then(|| w / h)
        }
        None => value.trim().parse().ok(),
    }
}

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.5
}

#[allow(clippy::cast_precision_loss)]
fn to_f32(v: u32) -> f32 {
    v as f32
}

/// Split at top-level occurrences of `sep` (outside parentheses).
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Split at top-level occurrences of a whitespace-delimited keyword.
fn split_keyword<'a>(input: &'a str, keyword: &str) -> Vec<&'a str> {
    let lower = input.to_ascii_lowercase();
    let needle = format!(" {keyword} ");
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = lower.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ => {
                if depth == 0 && lower[i..].starts_with(&needle) {
                    parts.push(&input[start..i]);
                    start = i + needle.len();
                    i += needle.len();
                    continue;
                }
            }
        }
        i += 1;
    }
    parts.push(&input[start..]);
    parts
}

/// Strip a leading keyword followed by whitespace, case-insensitively.
fn strip_keyword<'a>(input: &'a str, keyword: &str) -> Option<&'a str> {
    if starts_with_keyword(input, keyword) {
        Some(input[keyword.len()..].trim_start())
    } else {
        None
    }
}

fn starts_with_keyword(input: &str, keyword: &str) -> bool {
    input.len() > keyword.len()
        && input[..keyword.len()].eq_ignore_ascii_case(keyword)
        && input[keyword.len()..]
            .chars()
            .next()
            .is_some_and(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::DefaultEnvironment;

    fn env() -> DefaultEnvironment {
        DefaultEnvironment::new(1024, 768)
    }

    #[test]
    fn min_width_against_viewport() {
        assert!(eval_media_query("(min-width: 600px)", &env()));
        assert!(!eval_media_query("(min-width: 10000px)", &env()));
    }

    #[test]
    fn media_type_and_feature_chain() {
        assert!(eval_media_query("screen and (min-width: 600px)", &env()));
        assert!(!eval_media_query("print and (min-width: 600px)", &env()));
        assert!(eval_media_query(
            "screen and (min-width: 600px) and (max-width: 2000px)",
            &env()
        ));
    }

    #[test]
    fn comma_separated_alternatives_are_or() {
        assert!(eval_media_query("print, (min-width: 600px)", &env()));
        assert!(!eval_media_query("print, (min-width: 9999px)", &env()));
    }

    #[test]
    fn not_inverts_an_alternative() {
        assert!(!eval_media_query("not screen", &env()));
        assert!(eval_media_query("not print", &env()));
    }

    #[test]
    fn orientation_feature() {
        assert!(eval_media_query("(orientation: landscape)", &env()));
        assert!(!eval_media_query("(orientation: portrait)", &env()));
    }

    #[test]
    fn preference_features_use_environment_defaults() {
        assert!(eval_media_query("(prefers-color-scheme: light)", &env()));
        assert!(!eval_media_query("(prefers-color-scheme: dark)", &env()));
        assert!(eval_media_query(
            "(prefers-reduced-motion: no-preference)",
            &env()
        ));
    }

    #[test]
    fn unknown_feature_is_permissive() {
        assert!(eval_media_query("(scripting: enabled)", &env()));
    }

    #[test]
    fn supports_is_optimistic_for_well_formed_declarations() {
        assert!(eval_supports_condition("(display: grid)"));
        assert!(eval_supports_condition("(made-up-property: whatever)"));
        assert!(!eval_supports_condition("(not-a-declaration)"));
        assert!(!eval_supports_condition("not (display: grid)"));
        assert!(eval_supports_condition(
            "(display: flex) and (gap: 1px)"
        ));
    }

    #[test]
    fn container_size_conditions() {
        assert!(eval_container_condition("(min-width: 300px)", 400.0, 200.0));
        assert!(!eval_container_condition("(min-width: 500px)", 400.0, 200.0));
        assert!(eval_container_condition(
            "(min-width: 300px) and (max-height: 300px)",
            400.0,
            200.0
        ));
    }

    #[test]
    fn em_lengths_resolve_at_sixteen_px() {
        assert!(eval_media_query("(min-width: 10em)", &env()));
        assert!(!eval_media_query("(min-width: 100em)", &env()));
    }
}
