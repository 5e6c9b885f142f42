use strum_macros::Display;

use vellum_common::warning::warn_once;

use super::entities::{MAX_ENTITY_NAME_LEN, lookup_named_entity, numeric_reference};
use super::token::{AttrEntry, Token};

/// Elements whose content the tokenizer treats as uninterpreted raw text
/// until the matching close tag.
const RAWTEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "noframes", "noembed"];

/// Elements whose content is raw text with character references decoded.
const RCDATA_ELEMENTS: &[&str] = &["textarea", "title"];

/// [§ 13.2.5 Tokenization](https://html.spec.whatwg.org/multipage/parsing.html#tokenization)
///
/// The tokenizer state machine, reduced to the states real-world content
/// exercises. Script-data escape states are omitted; `<script>` content is
/// handled by the generic RAWTEXT path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenizerState {
    /// [§ 13.2.5.1 Data state](https://html.spec.whatwg.org/multipage/parsing.html#data-state)
    Data,
    /// [§ 13.2.5.2 RCDATA state](https://html.spec.whatwg.org/multipage/parsing.html#rcdata-state)
    Rcdata,
    /// [§ 13.2.5.3 RAWTEXT state](https://html.spec.whatwg.org/multipage/parsing.html#rawtext-state)
    Rawtext,
    /// [§ 13.2.5.6 Tag open state](https://html.spec.whatwg.org/multipage/parsing.html#tag-open-state)
    TagOpen,
    /// [§ 13.2.5.7 End tag open state](https://html.spec.whatwg.org/multipage/parsing.html#end-tag-open-state)
    EndTagOpen,
    /// [§ 13.2.5.8 Tag name state](https://html.spec.whatwg.org/multipage/parsing.html#tag-name-state)
    TagName,
    /// [§ 13.2.5.32 Before attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#before-attribute-name-state)
    BeforeAttrName,
    /// [§ 13.2.5.33 Attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-name-state)
    AttrName,
    /// [§ 13.2.5.34 After attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#after-attribute-name-state)
    AfterAttrName,
    /// [§ 13.2.5.35 Before attribute value state](https://html.spec.whatwg.org/multipage/parsing.html#before-attribute-value-state)
    BeforeAttrValue,
    /// [§ 13.2.5.36 Attribute value (double-quoted) state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-value-(double-quoted)-state)
    AttrValueDoubleQuoted,
    /// [§ 13.2.5.37 Attribute value (single-quoted) state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-value-(single-quoted)-state)
    AttrValueSingleQuoted,
    /// [§ 13.2.5.38 Attribute value (unquoted) state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-value-(unquoted)-state)
    AttrValueUnquoted,
    /// [§ 13.2.5.39 After attribute value (quoted) state](https://html.spec.whatwg.org/multipage/parsing.html#after-attribute-value-(quoted)-state)
    AfterAttrValueQuoted,
    /// [§ 13.2.5.40 Self-closing start tag state](https://html.spec.whatwg.org/multipage/parsing.html#self-closing-start-tag-state)
    SelfClosingStartTag,
    /// [§ 13.2.5.41 Bogus comment state](https://html.spec.whatwg.org/multipage/parsing.html#bogus-comment-state)
    BogusComment,
    /// [§ 13.2.5.42 Markup declaration open state](https://html.spec.whatwg.org/multipage/parsing.html#markup-declaration-open-state)
    MarkupDeclarationOpen,
    /// [§ 13.2.5.43 Comment start state](https://html.spec.whatwg.org/multipage/parsing.html#comment-start-state)
    CommentStart,
    /// [§ 13.2.5.44 Comment start dash state](https://html.spec.whatwg.org/multipage/parsing.html#comment-start-dash-state)
    CommentStartDash,
    /// [§ 13.2.5.45 Comment state](https://html.spec.whatwg.org/multipage/parsing.html#comment-state)
    Comment,
    /// [§ 13.2.5.46 Comment less-than sign state](https://html.spec.whatwg.org/multipage/parsing.html#comment-less-than-sign-state)
    CommentLessThanSign,
    /// [§ 13.2.5.50 Comment end dash state](https://html.spec.whatwg.org/multipage/parsing.html#comment-end-dash-state)
    CommentEndDash,
    /// [§ 13.2.5.51 Comment end state](https://html.spec.whatwg.org/multipage/parsing.html#comment-end-state)
    CommentEnd,
    /// [§ 13.2.5.53 DOCTYPE state](https://html.spec.whatwg.org/multipage/parsing.html#doctype-state)
    Doctype,
    /// [§ 13.2.5.54 Before DOCTYPE name state](https://html.spec.whatwg.org/multipage/parsing.html#before-doctype-name-state)
    BeforeDoctypeName,
    /// [§ 13.2.5.55 DOCTYPE name state](https://html.spec.whatwg.org/multipage/parsing.html#doctype-name-state)
    DoctypeName,
    /// [§ 13.2.5.56 After DOCTYPE name state](https://html.spec.whatwg.org/multipage/parsing.html#after-doctype-name-state)
    AfterDoctypeName,
    /// [§ 13.2.5.72 Character reference state](https://html.spec.whatwg.org/multipage/parsing.html#character-reference-state)
    CharacterReference,
}

/// A tag token under construction.
#[derive(Debug, Default)]
struct TagInProgress {
    name: String,
    is_end: bool,
    self_closing: bool,
    attrs: Vec<AttrEntry>,
    cur_name: String,
    cur_value: String,
    has_attr: bool,
}

impl TagInProgress {
    fn start_attr(&mut self) {
        self.finish_attr();
        self.has_attr = true;
    }

    fn finish_attr(&mut self) {
        if self.has_attr {
            self.attrs.push(AttrEntry::new(
                std::mem::take(&mut self.cur_name),
                std::mem::take(&mut self.cur_value),
            ));
            self.has_attr = false;
        }
    }
}

/// A DOCTYPE token under construction.
#[derive(Debug, Default)]
struct DoctypeInProgress {
    name: Option<String>,
    force_quirks: bool,
}

/// The HTML tokenizer.
///
/// "Implementations must act as if they used the following state machine to
/// tokenize HTML." The machine is total: malformed input produces
/// best-effort tokens and never an error.
///
/// # End-of-input discipline
///
/// A tokenizer built with [`Tokenizer::new`] treats the end of its input as
/// the end of the document: a trailing text run is emitted, a lone `<` is
/// emitted as text, and unterminated tag/comment/DOCTYPE constructs are
/// dropped. A tokenizer built with [`Tokenizer::new_partial`] treats the
/// end of its input as a chunk boundary instead: anything unterminated is
/// held back entirely, so the token list for a growing input is always an
/// extension of the list for any shorter cut of it. The incremental
/// front-end depends on that prefix property.
pub struct Tokenizer {
    state: TokenizerState,
    return_state: Option<TokenizerState>,
    chars: Vec<char>,
    /// Index of the next unconsumed character.
    pos: usize,
    current: Option<char>,
    // "Reconsume in the X state" sets this flag; the next loop iteration
    // keeps the current character instead of consuming a new one.
    reconsume: bool,
    /// Whether the end of `chars` is the end of the document.
    at_end: bool,
    finished: bool,
    /// Set when a partial tokenizer runs out of input mid-construct.
    starved: bool,
    tokens: Vec<Token>,
    /// Character data accumulated since the last emitted token.
    pending_text: String,
    tag: Option<TagInProgress>,
    comment: Option<String>,
    doctype: Option<DoctypeInProgress>,
    /// The element name that switched us into RAWTEXT/RCDATA; only the
    /// matching close tag exits.
    raw_element: Option<String>,
}

impl Tokenizer {
    /// Create a tokenizer that treats its input as the complete document.
    #[must_use]
    pub fn new(input: &str) -> Self {
        Self::build(input, true)
    }

    /// Create a tokenizer that treats its input as a prefix of a longer
    /// document. Constructs left unterminated at the end of the input are
    /// held rather than emitted or recovered.
    #[must_use]
    pub fn new_partial(input: &str) -> Self {
        Self::build(input, false)
    }

    fn build(input: &str, at_end: bool) -> Self {
        Self {
            state: TokenizerState::Data,
            return_state: None,
            chars: input.chars().collect(),
            pos: 0,
            current: None,
            reconsume: false,
            at_end,
            finished: false,
            starved: false,
            tokens: Vec::new(),
            pending_text: String::new(),
            tag: None,
            comment: None,
            doctype: None,
            raw_element: None,
        }
    }

    /// Tokenize a complete document in one call.
    #[must_use]
    pub fn tokenize(input: &str) -> Vec<Token> {
        let mut tokenizer = Self::new(input);
        tokenizer.run();
        tokenizer.into_tokens()
    }

    /// Run the state machine until the input is exhausted.
    pub fn run(&mut self) {
        while !self.finished && !self.starved {
            if self.reconsume {
                self.reconsume = false;
            } else {
                self.advance();
            }
            match self.state {
                TokenizerState::Data => self.handle_data(),
                TokenizerState::Rcdata => self.handle_rcdata(),
                TokenizerState::Rawtext => self.handle_rawtext(),
                TokenizerState::TagOpen => self.handle_tag_open(),
                TokenizerState::EndTagOpen => self.handle_end_tag_open(),
                TokenizerState::TagName => self.handle_tag_name(),
                TokenizerState::BeforeAttrName => self.handle_before_attr_name(),
                TokenizerState::AttrName => self.handle_attr_name(),
                TokenizerState::AfterAttrName => self.handle_after_attr_name(),
                TokenizerState::BeforeAttrValue => self.handle_before_attr_value(),
                TokenizerState::AttrValueDoubleQuoted => self.handle_attr_value_quoted('"'),
                TokenizerState::AttrValueSingleQuoted => self.handle_attr_value_quoted('\''),
                TokenizerState::AttrValueUnquoted => self.handle_attr_value_unquoted(),
                TokenizerState::AfterAttrValueQuoted => self.handle_after_attr_value_quoted(),
                TokenizerState::SelfClosingStartTag => self.handle_self_closing_start_tag(),
                TokenizerState::BogusComment => self.handle_bogus_comment(),
                TokenizerState::MarkupDeclarationOpen => self.handle_markup_declaration_open(),
                TokenizerState::CommentStart => self.handle_comment_start(),
                TokenizerState::CommentStartDash => self.handle_comment_start_dash(),
                TokenizerState::Comment => self.handle_comment(),
                TokenizerState::CommentLessThanSign => self.handle_comment_less_than_sign(),
                TokenizerState::CommentEndDash => self.handle_comment_end_dash(),
                TokenizerState::CommentEnd => self.handle_comment_end(),
                TokenizerState::Doctype => self.handle_doctype(),
                TokenizerState::BeforeDoctypeName => self.handle_before_doctype_name(),
                TokenizerState::DoctypeName => self.handle_doctype_name(),
                TokenizerState::AfterDoctypeName => self.handle_after_doctype_name(),
                TokenizerState::CharacterReference => self.handle_character_reference(),
            }
        }
    }

    /// Consume the tokenizer and return the token stream.
    #[must_use]
    pub fn into_tokens(self) -> Vec<Token> {
        self.tokens
    }

    fn advance(&mut self) {
        self.current = self.chars.get(self.pos).copied();
        self.pos += 1;
    }

    fn peek(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    /// Stop without emitting: the input ran out mid-construct and a longer
    /// input could still complete it. Only reachable with `at_end` false.
    fn starve(&mut self) {
        self.starved = true;
    }

    fn flush_pending_text(&mut self) {
        if !self.pending_text.is_empty() {
            self.tokens.push(Token::Text {
                data: std::mem::take(&mut self.pending_text),
            });
        }
    }

    fn switch_to(&mut self, state: TokenizerState) {
        self.state = state;
    }

    fn reconsume_in(&mut self, state: TokenizerState) {
        self.reconsume = true;
        self.state = state;
    }

    fn tag_mut(&mut self) -> &mut TagInProgress {
        self.tag.get_or_insert_with(TagInProgress::default)
    }

    /// Emit the tag under construction and pick the follow state.
    ///
    /// Emitting a start tag for a raw-text or RCDATA element switches the
    /// machine so the element's content is not re-parsed as markup.
    fn emit_tag(&mut self) {
        let Some(mut tag) = self.tag.take() else {
            return;
        };
        tag.finish_attr();
        self.flush_pending_text();
        self.switch_to(TokenizerState::Data);
        if tag.is_end {
            if !tag.attrs.is_empty() {
                warn_once("HTML", "attributes on an end tag are ignored");
            }
            self.tokens.push(Token::EndTag { name: tag.name });
            return;
        }

        // "if there is already an attribute on the token with the exact
        // same name, then this is a duplicate-attribute parse error and the
        // new attribute must be removed from the token."
        let mut attrs: Vec<AttrEntry> = Vec::with_capacity(tag.attrs.len());
        for attr in tag.attrs {
            if attrs.iter().any(|a| a.name == attr.name) {
                warn_once("HTML", "duplicate attribute dropped");
            } else {
                attrs.push(attr);
            }
        }

        if !tag.self_closing {
            if RAWTEXT_ELEMENTS.contains(&tag.name.as_str()) {
                self.raw_element = Some(tag.name.clone());
                self.switch_to(TokenizerState::Rawtext);
            } else if RCDATA_ELEMENTS.contains(&tag.name.as_str()) {
                self.raw_element = Some(tag.name.clone());
                self.switch_to(TokenizerState::Rcdata);
            }
        }
        self.tokens.push(Token::StartTag {
            name: tag.name,
            self_closing: tag.self_closing,
            attrs,
        });
    }

    fn emit_comment(&mut self) {
        let data = self.comment.take().unwrap_or_default();
        self.flush_pending_text();
        self.tokens.push(Token::Comment { data });
        self.switch_to(TokenizerState::Data);
    }

    fn emit_doctype(&mut self) {
        let doctype = self.doctype.take().unwrap_or_default();
        self.flush_pending_text();
        self.tokens.push(Token::Doctype {
            name: doctype.name,
            force_quirks: doctype.force_quirks,
        });
        self.switch_to(TokenizerState::Data);
    }

    /// End of input while no token is mid-construction.
    fn end_in_data(&mut self) {
        if self.at_end {
            self.flush_pending_text();
        }
        self.finished = true;
    }

    /// End of input inside a tag, comment, or DOCTYPE. At a chunk boundary
    /// the construct is held; at document end it is dropped (best-effort
    /// recovery keeps whatever text preceded it).
    fn end_in_construct(&mut self) {
        if self.at_end {
            self.tag = None;
            self.comment = None;
            self.doctype = None;
            self.flush_pending_text();
        }
        self.finished = true;
    }

    /// [§ 13.2.5.1 Data state](https://html.spec.whatwg.org/multipage/parsing.html#data-state)
    fn handle_data(&mut self) {
        match self.current {
            Some('&') => {
                self.return_state = Some(TokenizerState::Data);
                self.switch_to(TokenizerState::CharacterReference);
            }
            Some('<') => self.switch_to(TokenizerState::TagOpen),
            Some(c) => self.pending_text.push(c),
            None => self.end_in_data(),
        }
    }

    /// [§ 13.2.5.2 RCDATA state](https://html.spec.whatwg.org/multipage/parsing.html#rcdata-state)
    ///
    /// Like RAWTEXT, but `&...;` references are decoded.
    fn handle_rcdata(&mut self) {
        match self.current {
            Some('&') => {
                self.return_state = Some(TokenizerState::Rcdata);
                self.switch_to(TokenizerState::CharacterReference);
            }
            Some('<') => self.raw_less_than_sign(),
            Some(c) => self.pending_text.push(c),
            None => self.end_in_data(),
        }
    }

    /// [§ 13.2.5.3 RAWTEXT state](https://html.spec.whatwg.org/multipage/parsing.html#rawtext-state)
    ///
    /// Only the literal close tag of the element that switched us here
    /// exits; everything else, including `<`, is character data.
    fn handle_rawtext(&mut self) {
        match self.current {
            Some('<') => self.raw_less_than_sign(),
            Some(c) => self.pending_text.push(c),
            None => self.end_in_data(),
        }
    }

    /// `<` seen in RAWTEXT or RCDATA: exit only on the matching close tag.
    ///
    /// The decision needs lookahead over `/name` plus one boundary
    /// character. If the input runs out before the decision is made at a
    /// chunk boundary, the machine starves rather than guessing.
    fn raw_less_than_sign(&mut self) {
        let name: Vec<char> = self
            .raw_element
            .as_deref()
            .unwrap_or_default()
            .chars()
            .collect();

        if self.peek(0) != Some('/') {
            if self.peek(0).is_none() && !self.at_end {
                self.starve();
                return;
            }
            self.pending_text.push('<');
            return;
        }
        for (i, &expected) in name.iter().enumerate() {
            match self.peek(1 + i) {
                Some(c) if c.eq_ignore_ascii_case(&expected) => {}
                Some(_) => {
                    self.pending_text.push('<');
                    return;
                }
                None => {
                    if self.at_end {
                        self.pending_text.push('<');
                    } else {
                        self.starve();
                    }
                    return;
                }
            }
        }
        // The tag name matched; require a boundary, then scan to `>`.
        let mut offset = 1 + name.len();
        match self.peek(offset) {
            Some('>') => offset += 1,
            Some(c) if c.is_ascii_whitespace() || c == '/' => loop {
                match self.peek(offset) {
                    Some('>') => {
                        offset += 1;
                        break;
                    }
                    Some(_) => offset += 1,
                    None => {
                        if self.at_end {
                            self.pending_text.push('<');
                        } else {
                            self.starve();
                        }
                        return;
                    }
                }
            },
            Some(_) => {
                self.pending_text.push('<');
                return;
            }
            None => {
                if self.at_end {
                    self.pending_text.push('<');
                } else {
                    self.starve();
                }
                return;
            }
        }
        self.pos += offset;
        self.flush_pending_text();
        let name: String = name.into_iter().collect();
        self.tokens.push(Token::EndTag { name });
        self.raw_element = None;
        self.switch_to(TokenizerState::Data);
    }

    /// [§ 13.2.5.6 Tag open state](https://html.spec.whatwg.org/multipage/parsing.html#tag-open-state)
    fn handle_tag_open(&mut self) {
        match self.current {
            Some('!') => self.switch_to(TokenizerState::MarkupDeclarationOpen),
            Some('/') => self.switch_to(TokenizerState::EndTagOpen),
            Some(c) if c.is_ascii_alphabetic() => {
                self.tag = Some(TagInProgress::default());
                self.tag_mut().name.push(c.to_ascii_lowercase());
                self.switch_to(TokenizerState::TagName);
            }
            Some('?') => {
                // "unexpected-question-mark-instead-of-tag-name parse error.
                // Create a comment token whose data is the empty string."
                self.comment = Some(String::from("?"));
                self.switch_to(TokenizerState::BogusComment);
            }
            Some(_) => {
                // "invalid-first-character-of-tag-name parse error. Emit a
                // U+003C LESS-THAN SIGN character token."
                self.pending_text.push('<');
                self.reconsume_in(TokenizerState::Data);
            }
            None => {
                if self.at_end {
                    self.pending_text.push('<');
                }
                self.end_in_data();
            }
        }
    }

    /// [§ 13.2.5.7 End tag open state](https://html.spec.whatwg.org/multipage/parsing.html#end-tag-open-state)
    fn handle_end_tag_open(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_alphabetic() => {
                self.tag = Some(TagInProgress {
                    is_end: true,
                    ..TagInProgress::default()
                });
                self.tag_mut().name.push(c.to_ascii_lowercase());
                self.switch_to(TokenizerState::TagName);
            }
            Some('>') => {
                // "missing-end-tag-name parse error."
                self.switch_to(TokenizerState::Data);
            }
            Some(c) => {
                self.comment = Some(String::from(c));
                self.switch_to(TokenizerState::BogusComment);
            }
            None => {
                if self.at_end {
                    self.pending_text.push_str("</");
                }
                self.end_in_data();
            }
        }
    }

    /// [§ 13.2.5.8 Tag name state](https://html.spec.whatwg.org/multipage/parsing.html#tag-name-state)
    fn handle_tag_name(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => self.switch_to(TokenizerState::BeforeAttrName),
            Some('/') => self.switch_to(TokenizerState::SelfClosingStartTag),
            Some('>') => self.emit_tag(),
            Some(c) => self.tag_mut().name.push(c.to_ascii_lowercase()),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.32 Before attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#before-attribute-name-state)
    fn handle_before_attr_name(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => {}
            Some('/') => self.switch_to(TokenizerState::SelfClosingStartTag),
            Some('>') => self.emit_tag(),
            Some(_) => {
                self.tag_mut().start_attr();
                self.reconsume_in(TokenizerState::AttrName);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.33 Attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-name-state)
    fn handle_attr_name(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => self.switch_to(TokenizerState::AfterAttrName),
            Some('/') => self.switch_to(TokenizerState::SelfClosingStartTag),
            Some('=') => self.switch_to(TokenizerState::BeforeAttrValue),
            Some('>') => self.emit_tag(),
            Some(c) => self.tag_mut().cur_name.push(c.to_ascii_lowercase()),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.34 After attribute name state](https://html.spec.whatwg.org/multipage/parsing.html#after-attribute-name-state)
    fn handle_after_attr_name(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => {}
            Some('/') => self.switch_to(TokenizerState::SelfClosingStartTag),
            Some('=') => self.switch_to(TokenizerState::BeforeAttrValue),
            Some('>') => self.emit_tag(),
            Some(_) => {
                self.tag_mut().start_attr();
                self.reconsume_in(TokenizerState::AttrName);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.35 Before attribute value state](https://html.spec.whatwg.org/multipage/parsing.html#before-attribute-value-state)
    fn handle_before_attr_value(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => {}
            Some('"') => self.switch_to(TokenizerState::AttrValueDoubleQuoted),
            Some('\'') => self.switch_to(TokenizerState::AttrValueSingleQuoted),
            Some('>') => {
                // "missing-attribute-value parse error."
                self.emit_tag();
            }
            Some(_) => self.reconsume_in(TokenizerState::AttrValueUnquoted),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.36–37 Attribute value (quoted) states](https://html.spec.whatwg.org/multipage/parsing.html#attribute-value-(double-quoted)-state)
    fn handle_attr_value_quoted(&mut self, quote: char) {
        match self.current {
            Some('&') => {
                self.return_state = Some(self.state);
                self.switch_to(TokenizerState::CharacterReference);
            }
            Some(c) if c == quote => self.switch_to(TokenizerState::AfterAttrValueQuoted),
            Some(c) => self.tag_mut().cur_value.push(c),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.38 Attribute value (unquoted) state](https://html.spec.whatwg.org/multipage/parsing.html#attribute-value-(unquoted)-state)
    fn handle_attr_value_unquoted(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => self.switch_to(TokenizerState::BeforeAttrName),
            Some('&') => {
                self.return_state = Some(self.state);
                self.switch_to(TokenizerState::CharacterReference);
            }
            Some('>') => self.emit_tag(),
            Some(c) => self.tag_mut().cur_value.push(c),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.39 After attribute value (quoted) state](https://html.spec.whatwg.org/multipage/parsing.html#after-attribute-value-(quoted)-state)
    fn handle_after_attr_value_quoted(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => self.switch_to(TokenizerState::BeforeAttrName),
            Some('/') => self.switch_to(TokenizerState::SelfClosingStartTag),
            Some('>') => self.emit_tag(),
            Some(_) => {
                // "missing-whitespace-between-attributes parse error."
                self.reconsume_in(TokenizerState::BeforeAttrName);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.40 Self-closing start tag state](https://html.spec.whatwg.org/multipage/parsing.html#self-closing-start-tag-state)
    fn handle_self_closing_start_tag(&mut self) {
        match self.current {
            Some('>') => {
                self.tag_mut().self_closing = true;
                self.emit_tag();
            }
            Some(_) => {
                // "unexpected-solidus-in-tag parse error."
                self.reconsume_in(TokenizerState::BeforeAttrName);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.41 Bogus comment state](https://html.spec.whatwg.org/multipage/parsing.html#bogus-comment-state)
    fn handle_bogus_comment(&mut self) {
        match self.current {
            Some('>') => self.emit_comment(),
            Some(c) => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push(c);
                }
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.42 Markup declaration open state](https://html.spec.whatwg.org/multipage/parsing.html#markup-declaration-open-state)
    ///
    /// "If the next few characters are two U+002D HYPHEN-MINUS ..." — the
    /// decision between comment, DOCTYPE, and bogus comment needs up to
    /// seven characters of lookahead.
    fn handle_markup_declaration_open(&mut self) {
        match self.current {
            Some('-') => {
                match self.peek(0) {
                    Some('-') => {
                        self.pos += 1;
                        self.comment = Some(String::new());
                        self.switch_to(TokenizerState::CommentStart);
                    }
                    Some(_) => {
                        self.comment = Some(String::from('-'));
                        self.switch_to(TokenizerState::BogusComment);
                    }
                    None => {
                        if self.at_end {
                            self.end_in_construct();
                        } else {
                            self.starve();
                        }
                    }
                }
            }
            Some(c) if c.eq_ignore_ascii_case(&'d') => {
                const REST: &[char] = &['o', 'c', 't', 'y', 'p', 'e'];
                for (i, &expected) in REST.iter().enumerate() {
                    match self.peek(i) {
                        Some(got) if got.eq_ignore_ascii_case(&expected) => {}
                        Some(_) => {
                            self.comment = Some(String::from(c));
                            self.switch_to(TokenizerState::BogusComment);
                            return;
                        }
                        None => {
                            if self.at_end {
                                self.end_in_construct();
                            } else {
                                self.starve();
                            }
                            return;
                        }
                    }
                }
                self.pos += REST.len();
                self.doctype = Some(DoctypeInProgress::default());
                self.switch_to(TokenizerState::Doctype);
            }
            Some(c) => {
                // "incorrectly-opened-comment parse error."
                self.comment = Some(String::from(c));
                self.switch_to(TokenizerState::BogusComment);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.43 Comment start state](https://html.spec.whatwg.org/multipage/parsing.html#comment-start-state)
    fn handle_comment_start(&mut self) {
        match self.current {
            Some('-') => self.switch_to(TokenizerState::CommentStartDash),
            Some('>') => {
                // "abrupt-closing-of-empty-comment parse error."
                self.emit_comment();
            }
            Some(_) => self.reconsume_in(TokenizerState::Comment),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.44 Comment start dash state](https://html.spec.whatwg.org/multipage/parsing.html#comment-start-dash-state)
    fn handle_comment_start_dash(&mut self) {
        match self.current {
            Some('-') => self.switch_to(TokenizerState::CommentEnd),
            Some('>') => self.emit_comment(),
            Some(_) => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push('-');
                }
                self.reconsume_in(TokenizerState::Comment);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.45 Comment state](https://html.spec.whatwg.org/multipage/parsing.html#comment-state)
    fn handle_comment(&mut self) {
        match self.current {
            Some('<') => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push('<');
                }
                self.switch_to(TokenizerState::CommentLessThanSign);
            }
            Some('-') => self.switch_to(TokenizerState::CommentEndDash),
            Some(c) => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push(c);
                }
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.46 Comment less-than sign state](https://html.spec.whatwg.org/multipage/parsing.html#comment-less-than-sign-state)
    fn handle_comment_less_than_sign(&mut self) {
        match self.current {
            Some(c @ ('!' | '<')) => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push(c);
                }
                if c == '!' {
                    self.switch_to(TokenizerState::Comment);
                }
            }
            Some(_) => self.reconsume_in(TokenizerState::Comment),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.50 Comment end dash state](https://html.spec.whatwg.org/multipage/parsing.html#comment-end-dash-state)
    fn handle_comment_end_dash(&mut self) {
        match self.current {
            Some('-') => self.switch_to(TokenizerState::CommentEnd),
            Some(_) => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push('-');
                }
                self.reconsume_in(TokenizerState::Comment);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.51 Comment end state](https://html.spec.whatwg.org/multipage/parsing.html#comment-end-state)
    fn handle_comment_end(&mut self) {
        match self.current {
            Some('>') => self.emit_comment(),
            Some('-') => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push('-');
                }
            }
            Some(_) => {
                if let Some(comment) = self.comment.as_mut() {
                    comment.push_str("--");
                }
                self.reconsume_in(TokenizerState::Comment);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.53 DOCTYPE state](https://html.spec.whatwg.org/multipage/parsing.html#doctype-state)
    fn handle_doctype(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => {
                self.switch_to(TokenizerState::BeforeDoctypeName);
            }
            Some('>') => {
                if let Some(doctype) = self.doctype.as_mut() {
                    doctype.force_quirks = true;
                }
                self.emit_doctype();
            }
            Some(_) => self.reconsume_in(TokenizerState::BeforeDoctypeName),
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.54 Before DOCTYPE name state](https://html.spec.whatwg.org/multipage/parsing.html#before-doctype-name-state)
    fn handle_before_doctype_name(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => {}
            Some('>') => {
                // "missing-doctype-name parse error."
                if let Some(doctype) = self.doctype.as_mut() {
                    doctype.force_quirks = true;
                }
                self.emit_doctype();
            }
            Some(c) => {
                if let Some(doctype) = self.doctype.as_mut() {
                    doctype.name = Some(String::from(c.to_ascii_lowercase()));
                }
                self.switch_to(TokenizerState::DoctypeName);
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.55 DOCTYPE name state](https://html.spec.whatwg.org/multipage/parsing.html#doctype-name-state)
    fn handle_doctype_name(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => {
                self.switch_to(TokenizerState::AfterDoctypeName);
            }
            Some('>') => self.emit_doctype(),
            Some(c) => {
                if let Some(doctype) = self.doctype.as_mut()
                    && let Some(name) = doctype.name.as_mut()
                {
                    name.push(c.to_ascii_lowercase());
                }
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.56 After DOCTYPE name state](https://html.spec.whatwg.org/multipage/parsing.html#after-doctype-name-state)
    ///
    /// Public and system identifiers are not retained; their presence (a
    /// legacy doctype form) just sets the force-quirks flag and the rest of
    /// the declaration is skipped.
    fn handle_after_doctype_name(&mut self) {
        match self.current {
            Some(c) if c.is_ascii_whitespace() => {}
            Some('>') => self.emit_doctype(),
            Some(_) => {
                if let Some(doctype) = self.doctype.as_mut() {
                    doctype.force_quirks = true;
                }
            }
            None => self.end_in_construct(),
        }
    }

    /// [§ 13.2.5.72 Character reference state](https://html.spec.whatwg.org/multipage/parsing.html#character-reference-state)
    ///
    /// Decodes named, decimal, and hexadecimal references, then returns to
    /// the state that saw the `&`. References must be semicolon-terminated;
    /// anything unrecognized is passed through literally.
    fn handle_character_reference(&mut self) {
        let return_state = self.return_state.take().unwrap_or(TokenizerState::Data);
        match self.current {
            Some('#') => self.numeric_character_reference(return_state),
            Some(c) if c.is_ascii_alphanumeric() => self.named_character_reference(return_state, c),
            Some(_) => {
                self.charref_emit(return_state, "&");
                self.reconsume_in(return_state);
            }
            None => {
                if self.at_end {
                    self.charref_emit(return_state, "&");
                    self.switch_to(return_state);
                } else {
                    self.starve();
                }
            }
        }
    }

    /// Scan `&#NNN;` / `&#xNNN;` with the `#` as the current character.
    fn numeric_character_reference(&mut self, return_state: TokenizerState) {
        let hex = matches!(self.peek(0), Some('x' | 'X'));
        let digits_start = usize::from(hex);
        let mut value: u32 = 0;
        let mut digit_count = 0usize;
        let mut offset = digits_start;
        loop {
            match self.peek(offset) {
                Some(c) if (hex && c.is_ascii_hexdigit()) || (!hex && c.is_ascii_digit()) => {
                    let digit = c.to_digit(if hex { 16 } else { 10 }).unwrap_or(0);
                    value = value.saturating_mul(if hex { 16 } else { 10 });
                    value = value.saturating_add(digit);
                    digit_count += 1;
                    offset += 1;
                }
                Some(';') if digit_count > 0 => {
                    self.pos += offset + 1;
                    let decoded = numeric_reference(value);
                    let mut buf = [0u8; 4];
                    let decoded = decoded.encode_utf8(&mut buf).to_string();
                    self.charref_emit(return_state, &decoded);
                    self.switch_to(return_state);
                    return;
                }
                Some(_) => {
                    // Not a terminated numeric reference; pass `&` through
                    // and reprocess from the `#`.
                    self.charref_emit(return_state, "&");
                    self.reconsume_in(return_state);
                    return;
                }
                None => {
                    if self.at_end {
                        self.charref_emit(return_state, "&");
                        self.reconsume_in(return_state);
                    } else {
                        self.starve();
                    }
                    return;
                }
            }
        }
    }

    /// Scan a named reference with its first character already consumed.
    fn named_character_reference(&mut self, return_state: TokenizerState, first: char) {
        let mut name = String::from(first);
        let mut offset = 0usize;
        loop {
            match self.peek(offset) {
                Some(';') => {
                    name.push(';');
                    if let Some(decoded) = lookup_named_entity(&name) {
                        self.pos += offset + 1;
                        let decoded = decoded.to_string();
                        self.charref_emit(return_state, &decoded);
                        self.switch_to(return_state);
                    } else {
                        // "ambiguous ampersand": pass the `&` through and
                        // reprocess the name as ordinary characters.
                        self.charref_emit(return_state, "&");
                        self.reconsume_in(return_state);
                    }
                    return;
                }
                Some(c) if c.is_ascii_alphanumeric() && name.len() < MAX_ENTITY_NAME_LEN => {
                    name.push(c);
                    offset += 1;
                }
                Some(_) => {
                    self.charref_emit(return_state, "&");
                    self.reconsume_in(return_state);
                    return;
                }
                None => {
                    if self.at_end {
                        self.charref_emit(return_state, "&");
                        self.reconsume_in(return_state);
                    } else {
                        self.starve();
                    }
                    return;
                }
            }
        }
    }

    /// Route decoded (or literal) reference output to the right sink for
    /// the state that triggered the reference.
    fn charref_emit(&mut self, return_state: TokenizerState, s: &str) {
        match return_state {
            TokenizerState::AttrValueDoubleQuoted
            | TokenizerState::AttrValueSingleQuoted
            | TokenizerState::AttrValueUnquoted => self.tag_mut().cur_value.push_str(s),
            _ => self.pending_text.push_str(s),
        }
    }
}
