use core::fmt;

/// An attribute on a start tag.
///
/// Per [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization):
/// "a list of attributes, each of which has a name and a value". Names are
/// lowercased ASCII by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrEntry {
    /// The attribute name, lowercased.
    pub name: String,
    /// The attribute value, with character references decoded.
    pub value: String,
}

impl AttrEntry {
    /// Create a new attribute entry.
    #[must_use]
    pub const fn new(name: String, value: String) -> Self {
        Self { name, value }
    }
}

/// The output of the tokenization stage.
///
/// [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
///
/// Five kinds of token flow from the tokenizer to the tree-construction
/// stage. Character data is carried as coalesced runs rather than single
/// characters; a run ends where the next tag, comment, or doctype begins.
/// End of input is signaled by the stream simply ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A DOCTYPE, examined downstream only for its name and quirks flag.
    Doctype {
        /// The doctype name (`html` for standards documents), lowercased.
        name: Option<String>,
        /// Set for missing names and legacy doctype forms.
        force_quirks: bool,
    },

    /// A start tag with its attributes.
    StartTag {
        /// The tag name, lowercased ASCII.
        name: String,
        /// Whether the tag carried a trailing `/`.
        self_closing: bool,
        /// Attributes in source order; duplicate names keep the first.
        attrs: Vec<AttrEntry>,
    },

    /// An end tag. Attributes on end tags are discarded.
    EndTag {
        /// The tag name, lowercased ASCII.
        name: String,
    },

    /// A run of character data with references already decoded.
    Text {
        /// The decoded character data.
        data: String,
    },

    /// A comment. Downstream consumers may discard these.
    Comment {
        /// The comment data, without the `<!--`/`-->` delimiters.
        data: String,
    },
}

impl Token {
    /// Create a start tag token.
    #[must_use]
    pub const fn start_tag(name: String, self_closing: bool, attrs: Vec<AttrEntry>) -> Self {
        Self::StartTag {
            name,
            self_closing,
            attrs,
        }
    }

    /// Returns the tag name if this is a start tag.
    #[must_use]
    pub fn as_start_tag(&self) -> Option<&str> {
        match self {
            Self::StartTag { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the character data if this is a text token.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { data } => Some(data),
            _ => None,
        }
    }

    /// Returns true if this is a text token consisting only of ASCII
    /// whitespace.
    ///
    /// Several insertion modes ignore whitespace-only character tokens;
    /// with run-coalesced text tokens the check covers the whole run.
    #[must_use]
    pub fn is_whitespace_text(&self) -> bool {
        match self {
            Self::Text { data } => data.chars().all(|c| c.is_ascii_whitespace()),
            _ => false,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Doctype { name, force_quirks } => {
                write!(f, "DOCTYPE")?;
                if let Some(n) = name {
                    write!(f, " {n}")?;
                }
                if *force_quirks {
                    write!(f, " (force-quirks)")?;
                }
                Ok(())
            }
            Self::StartTag {
                name,
                self_closing,
                attrs,
            } => {
                write!(f, "<{name}")?;
                for attr in attrs {
                    write!(f, " {}=\"{}\"", attr.name, attr.value)?;
                }
                if *self_closing {
                    write!(f, " /")?;
                }
                write!(f, ">")
            }
            Self::EndTag { name } => write!(f, "</{name}>"),
            Self::Text { data } => write!(f, "Text({data:?})"),
            Self::Comment { data } => write!(f, "<!--{data}-->"),
        }
    }
}
