//! Character reference lookup.
//!
//! [§ 13.2.5.72 Character reference state](https://html.spec.whatwg.org/multipage/parsing.html#character-reference-state)
//!
//! The full spec defines 2,231 named references; this table carries the
//! ones that occur in real-world content. Unrecognized references are
//! passed through literally by the tokenizer, so an entity missing here
//! degrades to visible `&name;` text rather than broken markup.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Longest entity name we will scan for before declaring the reference
/// unterminated. The longest name in the full spec table is 32 characters
/// (`CounterClockwiseContourIntegral`).
pub const MAX_ENTITY_NAME_LEN: usize = 32;

/// The named character reference table.
/// Maps entity names (without `&`, with the trailing `;`) to replacements.
static NAMED_ENTITIES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // The five predefined XML entities, required for basic HTML
        ("amp;", "&"),
        ("lt;", "<"),
        ("gt;", ">"),
        ("quot;", "\""),
        ("apos;", "'"),
        ("nbsp;", "\u{00A0}"),
        // Common punctuation and symbols
        ("copy;", "\u{00A9}"),
        ("reg;", "\u{00AE}"),
        ("trade;", "\u{2122}"),
        ("sect;", "\u{00A7}"),
        ("para;", "\u{00B6}"),
        ("mdash;", "\u{2014}"),
        ("ndash;", "\u{2013}"),
        ("hellip;", "\u{2026}"),
        ("bull;", "\u{2022}"),
        ("middot;", "\u{00B7}"),
        ("dagger;", "\u{2020}"),
        ("Dagger;", "\u{2021}"),
        ("lsquo;", "\u{2018}"),
        ("rsquo;", "\u{2019}"),
        ("ldquo;", "\u{201C}"),
        ("rdquo;", "\u{201D}"),
        ("sbquo;", "\u{201A}"),
        ("bdquo;", "\u{201E}"),
        ("laquo;", "\u{00AB}"),
        ("raquo;", "\u{00BB}"),
        ("shy;", "\u{00AD}"),
        ("ensp;", "\u{2002}"),
        ("emsp;", "\u{2003}"),
        ("thinsp;", "\u{2009}"),
        ("zwnj;", "\u{200C}"),
        ("zwj;", "\u{200D}"),
        // Currency
        ("cent;", "\u{00A2}"),
        ("pound;", "\u{00A3}"),
        ("curren;", "\u{00A4}"),
        ("euro;", "\u{20AC}"),
        ("yen;", "\u{00A5}"),
        // Math symbols
        ("times;", "\u{00D7}"),
        ("divide;", "\u{00F7}"),
        ("plusmn;", "\u{00B1}"),
        ("minus;", "\u{2212}"),
        ("ne;", "\u{2260}"),
        ("le;", "\u{2264}"),
        ("ge;", "\u{2265}"),
        ("deg;", "\u{00B0}"),
        ("micro;", "\u{00B5}"),
        ("infin;", "\u{221E}"),
        ("sum;", "\u{2211}"),
        ("prod;", "\u{220F}"),
        ("radic;", "\u{221A}"),
        ("asymp;", "\u{2248}"),
        ("equiv;", "\u{2261}"),
        ("frac12;", "\u{00BD}"),
        ("frac14;", "\u{00BC}"),
        ("frac34;", "\u{00BE}"),
        ("sup1;", "\u{00B9}"),
        ("sup2;", "\u{00B2}"),
        ("sup3;", "\u{00B3}"),
        // Arrows
        ("larr;", "\u{2190}"),
        ("rarr;", "\u{2192}"),
        ("uarr;", "\u{2191}"),
        ("darr;", "\u{2193}"),
        ("harr;", "\u{2194}"),
        ("crarr;", "\u{21B5}"),
        // Greek letters commonly used in text
        ("alpha;", "\u{03B1}"),
        ("beta;", "\u{03B2}"),
        ("gamma;", "\u{03B3}"),
        ("delta;", "\u{03B4}"),
        ("epsilon;", "\u{03B5}"),
        ("lambda;", "\u{03BB}"),
        ("mu;", "\u{03BC}"),
        ("pi;", "\u{03C0}"),
        ("sigma;", "\u{03C3}"),
        ("tau;", "\u{03C4}"),
        ("phi;", "\u{03C6}"),
        ("omega;", "\u{03C9}"),
        ("Delta;", "\u{0394}"),
        ("Omega;", "\u{03A9}"),
        // Common accented Latin characters
        ("Agrave;", "\u{00C0}"),
        ("Aacute;", "\u{00C1}"),
        ("Acirc;", "\u{00C2}"),
        ("Atilde;", "\u{00C3}"),
        ("Auml;", "\u{00C4}"),
        ("Aring;", "\u{00C5}"),
        ("AElig;", "\u{00C6}"),
        ("Ccedil;", "\u{00C7}"),
        ("Egrave;", "\u{00C8}"),
        ("Eacute;", "\u{00C9}"),
        ("Ntilde;", "\u{00D1}"),
        ("Ouml;", "\u{00D6}"),
        ("Uuml;", "\u{00DC}"),
        ("agrave;", "\u{00E0}"),
        ("aacute;", "\u{00E1}"),
        ("acirc;", "\u{00E2}"),
        ("atilde;", "\u{00E3}"),
        ("auml;", "\u{00E4}"),
        ("aring;", "\u{00E5}"),
        ("aelig;", "\u{00E6}"),
        ("ccedil;", "\u{00E7}"),
        ("egrave;", "\u{00E8}"),
        ("eacute;", "\u{00E9}"),
        ("ecirc;", "\u{00EA}"),
        ("euml;", "\u{00EB}"),
        ("igrave;", "\u{00EC}"),
        ("iacute;", "\u{00ED}"),
        ("ntilde;", "\u{00F1}"),
        ("ograve;", "\u{00F2}"),
        ("oacute;", "\u{00F3}"),
        ("ocirc;", "\u{00F4}"),
        ("ouml;", "\u{00F6}"),
        ("oslash;", "\u{00F8}"),
        ("ugrave;", "\u{00F9}"),
        ("uacute;", "\u{00FA}"),
        ("uuml;", "\u{00FC}"),
        ("szlig;", "\u{00DF}"),
        // Misc typography
        ("iexcl;", "\u{00A1}"),
        ("iquest;", "\u{00BF}"),
        ("ordf;", "\u{00AA}"),
        ("ordm;", "\u{00BA}"),
        ("darr2;", "\u{21CA}"),
        ("loz;", "\u{25CA}"),
        ("spades;", "\u{2660}"),
        ("clubs;", "\u{2663}"),
        ("hearts;", "\u{2665}"),
        ("diams;", "\u{2666}"),
        ("star;", "\u{2606}"),
        ("check;", "\u{2713}"),
        ("cross;", "\u{2717}"),
        ("permil;", "\u{2030}"),
        ("prime;", "\u{2032}"),
        ("Prime;", "\u{2033}"),
        ("oline;", "\u{203E}"),
        ("frasl;", "\u{2044}"),
    ])
});

/// Look up a named character reference.
///
/// `name` includes the trailing semicolon (`"amp;"`), matching the
/// tokenizer's requirement that references be semicolon-terminated.
/// Returns the replacement string, which may be more than one character.
#[must_use]
pub fn lookup_named_entity(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES.get(name).copied()
}

/// Resolve a numeric character reference.
///
/// [§ 13.2.5.80 Numeric character reference end state](https://html.spec.whatwg.org/multipage/parsing.html#numeric-character-reference-end-state)
///
/// Out-of-range and surrogate code points produce U+FFFD, as does NUL,
/// matching the spec's replacement behavior.
#[must_use]
pub fn numeric_reference(code_point: u32) -> char {
    if code_point == 0 || code_point > 0x0010_FFFF {
        return '\u{FFFD}';
    }
    char::from_u32(code_point).unwrap_or('\u{FFFD}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_entities_resolve() {
        assert_eq!(lookup_named_entity("amp;"), Some("&"));
        assert_eq!(lookup_named_entity("lt;"), Some("<"));
        assert_eq!(lookup_named_entity("mdash;"), Some("\u{2014}"));
    }

    #[test]
    fn unknown_entity_misses() {
        assert_eq!(lookup_named_entity("notarealentity;"), None);
    }

    #[test]
    fn numeric_replacement_for_invalid_code_points() {
        assert_eq!(numeric_reference(0), '\u{FFFD}');
        assert_eq!(numeric_reference(0xD800), '\u{FFFD}');
        assert_eq!(numeric_reference(0x0011_0000), '\u{FFFD}');
        assert_eq!(numeric_reference(0x4E), 'N');
    }
}
