use strum_macros::Display;

use vellum_common::warning::warn_once;
use vellum_dom::{AttrList, NodeArena, NodeId, NodeKind};

use super::tag_sets::{CLOSES_OPEN_P, IMPLIED_END_TAGS, VOID_ELEMENTS, is_special};
use crate::tokenizer::{AttrEntry, Token};

/// [§ 13.2.4.1 The insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-insertion-mode)
///
/// "The insertion mode is a state variable that controls the primary
/// operation of the tree construction stage."
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InsertionMode {
    /// [§ 13.2.6.4.1 The "initial" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-initial-insertion-mode)
    Initial,
    /// [§ 13.2.6.4.2 The "before html" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-html-insertion-mode)
    BeforeHtml,
    /// [§ 13.2.6.4.3 The "before head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-head-insertion-mode)
    BeforeHead,
    /// [§ 13.2.6.4.4 The "in head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhead)
    InHead,
    /// [§ 13.2.6.4.6 The "after head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-head-insertion-mode)
    AfterHead,
    /// [§ 13.2.6.4.7 The "in body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    InBody,
    /// [§ 13.2.6.4.8 The "text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incdata)
    Text,
    /// [§ 13.2.6.4.9 The "in table" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intable)
    InTable,
    /// [§ 13.2.6.4.10 The "in table text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intabletext)
    InTableText,
    /// [§ 13.2.6.4.11 The "in caption" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incaption)
    InCaption,
    /// [§ 13.2.6.4.12 The "in column group" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incolumngroup)
    InColumnGroup,
    /// [§ 13.2.6.4.13 The "in table body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intablebody)
    InTableBody,
    /// [§ 13.2.6.4.14 The "in row" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inrow)
    InRow,
    /// [§ 13.2.6.4.15 The "in cell" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incell)
    InCell,
    /// [§ 13.2.6.4.16 The "in select" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselect)
    InSelect,
    /// [§ 13.2.6.4.17 The "in select in table" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselectintable)
    InSelectInTable,
    /// [§ 13.2.6.4.18 The "in template" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intemplate)
    ///
    /// Handled as "in body" targeting the template element; template
    /// contents never render, so the reduced rules lose nothing.
    InTemplate,
    /// [§ 13.2.6.4.19 The "after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterbody)
    AfterBody,
    /// [§ 13.2.6.4.20 The "in frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inframeset)
    InFrameset,
    /// [§ 13.2.6.4.21 The "after frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterframeset)
    AfterFrameset,
    /// [§ 13.2.6.4.22 The "after after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-body-insertion-mode)
    AfterAfterBody,
}

/// [§ 13.2.2 Parse errors](https://html.spec.whatwg.org/multipage/parsing.html#parse-errors)
///
/// A recorded parse error. Errors never abort tree construction; they are
/// collected here as a diagnostics side channel.
#[derive(Debug, Clone)]
pub struct ParseIssue {
    /// Description of the parse error.
    pub message: String,
    /// Index into the token stream where the error was encountered.
    pub token_index: usize,
}

/// Where the next node goes: appended to a parent, or (for foster-parented
/// content) inserted immediately before a sibling.
#[derive(Debug, Clone, Copy)]
enum InsertionPlace {
    Append(NodeId),
    Before(NodeId, NodeId),
}

/// [§ 13.2.6 Tree construction](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction)
///
/// Builds one `#document` tree from a token stream. The builder is total:
/// tokens that make no sense for the current insertion mode are recorded as
/// parse errors and ignored, and the document is completed with implicit
/// `<html>`, `<head>`, and `<body>` elements when the stream ends early.
pub struct TreeBuilder {
    mode: InsertionMode,
    /// Mode to return to when leaving the "text" mode.
    original_mode: Option<InsertionMode>,
    arena: NodeArena,
    /// [§ 13.2.4.2 The stack of open elements](https://html.spec.whatwg.org/multipage/parsing.html#the-stack-of-open-elements)
    open_elements: Vec<NodeId>,
    /// [§ 13.2.4.4 The element pointers](https://html.spec.whatwg.org/multipage/parsing.html#the-element-pointers)
    head_element: Option<NodeId>,
    tokens: Vec<Token>,
    token_index: usize,
    issues: Vec<ParseIssue>,
    /// Character data accumulated in the "in table text" mode, pending the
    /// whitespace-or-foster decision.
    pending_table_text: String,
    /// Mode to return to when leaving "in table text".
    table_text_return: InsertionMode,
    /// While set, insertions into table containers are redirected before
    /// the table instead.
    foster_parenting: bool,
    /// A newline immediately after `<pre>`, `<listing>`, or `<textarea>`
    /// is dropped.
    ignore_next_lf: bool,
}

impl TreeBuilder {
    /// Create a builder over a token stream.
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            mode: InsertionMode::Initial,
            original_mode: None,
            arena: NodeArena::new(),
            open_elements: Vec::new(),
            head_element: None,
            tokens,
            token_index: 0,
            issues: Vec::new(),
            pending_table_text: String::new(),
            table_text_return: InsertionMode::InTable,
            foster_parenting: false,
            ignore_next_lf: false,
        }
    }

    /// Run the builder and return the document tree.
    #[must_use]
    pub fn run(self) -> NodeArena {
        self.run_with_issues().0
    }

    /// Run the builder and return the tree together with any parse issues.
    #[must_use]
    pub fn run_with_issues(mut self) -> (NodeArena, Vec<ParseIssue>) {
        let tokens = std::mem::take(&mut self.tokens);
        for (index, token) in tokens.iter().enumerate() {
            self.token_index = index;
            self.dispatch(token);
        }
        self.finish();
        (self.arena, self.issues)
    }

    fn parse_error(&mut self, message: &str) {
        warn_once("HTML", message);
        self.issues.push(ParseIssue {
            message: message.to_string(),
            token_index: self.token_index,
        });
    }

    // ===== Stack and tree helpers =====

    fn current_node(&self) -> NodeId {
        self.open_elements.last().copied().unwrap_or(NodeId::ROOT)
    }

    fn tag_of(&self, id: NodeId) -> &str {
        self.arena
            .as_element(id)
            .map_or("", |e| e.tag_name.as_str())
    }

    fn current_tag(&self) -> &str {
        self.tag_of(self.current_node())
    }

    fn attrs_from(entries: &[AttrEntry]) -> AttrList {
        entries
            .iter()
            .map(|a| (a.name.clone(), a.value.clone()))
            .collect()
    }

    /// [§ 13.2.6.1 Appropriate place for inserting a node](https://html.spec.whatwg.org/multipage/parsing.html#appropriate-place-for-inserting-a-node)
    ///
    /// "If foster parenting is enabled and target is a table, tbody, tfoot,
    /// thead, or tr element", the place is inside the table's parent,
    /// immediately before the table.
    fn insertion_place(&self) -> InsertionPlace {
        let target = self.current_node();
        if self.foster_parenting
            && matches!(
                self.tag_of(target),
                "table" | "tbody" | "tfoot" | "thead" | "tr"
            )
        {
            return self.foster_place();
        }
        InsertionPlace::Append(target)
    }

    fn foster_place(&self) -> InsertionPlace {
        let Some(table_pos) = self
            .open_elements
            .iter()
            .rposition(|&id| self.tag_of(id) == "table")
        else {
            // Fragment-ish case: no table on the stack, append to the root
            // of whatever is open.
            return InsertionPlace::Append(
                self.open_elements.first().copied().unwrap_or(NodeId::ROOT),
            );
        };
        let table = self.open_elements[table_pos];
        // "If last template is lower in the stack than last table", content
        // goes into the template instead of before the table.
        if let Some(&template) = self.open_elements[table_pos + 1..]
            .iter()
            .rev()
            .find(|&&id| self.tag_of(id) == "template")
        {
            return InsertionPlace::Append(template);
        }
        match self.arena.parent(table) {
            Some(parent) => InsertionPlace::Before(parent, table),
            None => InsertionPlace::Append(self.open_elements[table_pos.saturating_sub(1)]),
        }
    }

    /// Create and insert an element for a start tag, pushing it onto the
    /// stack of open elements.
    fn insert_element(&mut self, name: &str, attrs: &[AttrEntry]) -> NodeId {
        let id = self.arena.alloc_element(name, Self::attrs_from(attrs));
        match self.insertion_place() {
            InsertionPlace::Append(parent) => self.arena.append_child(parent, id),
            InsertionPlace::Before(parent, before) => self.arena.insert_before(parent, id, before),
        }
        self.open_elements.push(id);
        id
    }

    /// Insert a void element: inserted but never left on the stack.
    fn insert_void_element(&mut self, name: &str, attrs: &[AttrEntry]) {
        let _ = self.insert_element(name, attrs);
        let _ = self.open_elements.pop();
    }

    fn insert_text(&mut self, data: &str) {
        match self.insertion_place() {
            InsertionPlace::Append(parent) => self.arena.append_text(parent, data),
            InsertionPlace::Before(parent, before) => {
                self.arena.insert_text_before(parent, data, before);
            }
        }
    }

    fn insert_comment(&mut self, data: &str) {
        let id = self.arena.alloc(NodeKind::Comment(data.to_string()));
        match self.insertion_place() {
            InsertionPlace::Append(parent) => self.arena.append_child(parent, id),
            InsertionPlace::Before(parent, before) => self.arena.insert_before(parent, id, before),
        }
    }

    fn append_comment_to(&mut self, parent: NodeId, data: &str) {
        let id = self.arena.alloc(NodeKind::Comment(data.to_string()));
        self.arena.append_child(parent, id);
    }

    /// "create an element for the token ... and add the attributes that are
    /// not already present" — repeated `<html>`/`<body>` tags merge.
    fn merge_attrs_into(&mut self, element: NodeId, attrs: &[AttrEntry]) {
        if let Some(data) = self.arena.as_element_mut(element) {
            for attr in attrs {
                let _ = data.attrs.insert(attr.name.clone(), attr.value.clone());
            }
        }
    }

    // ===== Scope tests =====

    /// [§ 13.2.4.2 have an element in scope](https://html.spec.whatwg.org/multipage/parsing.html#has-an-element-in-target-scope)
    ///
    /// "The stack of open elements is said to have an element target node
    /// in a specific scope ... if target node is reached before an element
    /// in the list of scope markers."
    fn has_in_scope_with(&self, target: &str, extra_markers: &[&str]) -> bool {
        const SCOPE_MARKERS: &[&str] = &[
            "applet", "caption", "html", "table", "td", "th", "marquee", "object", "template",
        ];
        for &id in self.open_elements.iter().rev() {
            let tag = self.tag_of(id);
            if tag == target {
                return true;
            }
            if SCOPE_MARKERS.contains(&tag) || extra_markers.contains(&tag) {
                return false;
            }
        }
        false
    }

    fn has_in_scope(&self, target: &str) -> bool {
        self.has_in_scope_with(target, &[])
    }

    fn has_in_button_scope(&self, target: &str) -> bool {
        self.has_in_scope_with(target, &["button"])
    }

    fn has_in_list_item_scope(&self, target: &str) -> bool {
        self.has_in_scope_with(target, &["ol", "ul"])
    }

    /// "in table scope" uses only `html`, `table`, and `template` as
    /// markers.
    fn has_in_table_scope(&self, target: &str) -> bool {
        for &id in self.open_elements.iter().rev() {
            let tag = self.tag_of(id);
            if tag == target {
                return true;
            }
            if matches!(tag, "html" | "table" | "template") {
                return false;
            }
        }
        false
    }

    fn has_any_heading_in_scope(&self) -> bool {
        ["h1", "h2", "h3", "h4", "h5", "h6"]
            .iter()
            .any(|h| self.has_in_scope(h))
    }

    // ===== Implied end tags and closing =====

    /// [§ 13.2.6.3 Closing elements that have implied end tags](https://html.spec.whatwg.org/multipage/parsing.html#generate-implied-end-tags)
    ///
    /// Pops implied-closable elements off the top of the stack until the
    /// element being closed (one of `except`) is exposed or something
    /// outside the set is in the way.
    fn generate_implied_end_tags(&mut self, except: &[&str]) {
        loop {
            let tag = self.current_tag().to_string();
            if IMPLIED_END_TAGS.contains(&tag.as_str()) && !except.contains(&tag.as_str()) {
                let _ = self.open_elements.pop();
            } else {
                return;
            }
        }
    }

    /// Pop until an element with the given name has been popped.
    fn pop_until_inclusive(&mut self, name: &str) {
        while let Some(id) = self.open_elements.pop() {
            if self.tag_of(id) == name {
                return;
            }
        }
    }

    /// Pop until one of the given names has been popped.
    fn pop_until_any_inclusive(&mut self, names: &[&str]) {
        while let Some(id) = self.open_elements.pop() {
            if names.contains(&self.tag_of(id)) {
                return;
            }
        }
    }

    /// [§ 13.2.6.4.7 close a p element](https://html.spec.whatwg.org/multipage/parsing.html#close-a-p-element)
    fn close_p_element(&mut self) {
        self.generate_implied_end_tags(&["p"]);
        if self.current_tag() != "p" {
            self.parse_error("unexpected open elements while closing <p>");
        }
        self.pop_until_inclusive("p");
    }

    fn close_p_if_in_button_scope(&mut self) {
        if self.has_in_button_scope("p") {
            self.close_p_element();
        }
    }

    fn clear_stack_to_table_context(&mut self) {
        while !matches!(self.current_tag(), "table" | "template" | "html" | "") {
            let _ = self.open_elements.pop();
        }
    }

    fn clear_stack_to_table_body_context(&mut self) {
        while !matches!(
            self.current_tag(),
            "tbody" | "tfoot" | "thead" | "template" | "html" | ""
        ) {
            let _ = self.open_elements.pop();
        }
    }

    fn clear_stack_to_table_row_context(&mut self) {
        while !matches!(self.current_tag(), "tr" | "template" | "html" | "") {
            let _ = self.open_elements.pop();
        }
    }

    /// [§ 13.2.6.4.15 close the cell](https://html.spec.whatwg.org/multipage/parsing.html#close-the-cell)
    fn close_cell(&mut self) {
        self.generate_implied_end_tags(&[]);
        if !matches!(self.current_tag(), "td" | "th") {
            self.parse_error("unexpected open elements while closing a table cell");
        }
        self.pop_until_any_inclusive(&["td", "th"]);
        self.mode = InsertionMode::InRow;
    }

    /// [§ 13.2.4.1 reset the insertion mode appropriately](https://html.spec.whatwg.org/multipage/parsing.html#reset-the-insertion-mode-appropriately)
    fn reset_insertion_mode(&mut self) {
        for &id in self.open_elements.iter().rev() {
            match self.tag_of(id) {
                "select" => {
                    self.mode = InsertionMode::InSelect;
                    return;
                }
                "td" | "th" => {
                    self.mode = InsertionMode::InCell;
                    return;
                }
                "tr" => {
                    self.mode = InsertionMode::InRow;
                    return;
                }
                "tbody" | "thead" | "tfoot" => {
                    self.mode = InsertionMode::InTableBody;
                    return;
                }
                "caption" => {
                    self.mode = InsertionMode::InCaption;
                    return;
                }
                "colgroup" => {
                    self.mode = InsertionMode::InColumnGroup;
                    return;
                }
                "table" => {
                    self.mode = InsertionMode::InTable;
                    return;
                }
                "template" => {
                    self.mode = InsertionMode::InTemplate;
                    return;
                }
                "head" => {
                    self.mode = InsertionMode::InHead;
                    return;
                }
                "body" => {
                    self.mode = InsertionMode::InBody;
                    return;
                }
                "frameset" => {
                    self.mode = InsertionMode::InFrameset;
                    return;
                }
                "html" => {
                    self.mode = if self.head_element.is_none() {
                        InsertionMode::BeforeHead
                    } else {
                        InsertionMode::AfterHead
                    };
                    return;
                }
                _ => {}
            }
        }
        self.mode = InsertionMode::InBody;
    }

    // ===== Synthesis of implicit structural elements =====

    fn synthesize_html(&mut self) {
        let html = self.arena.alloc_element("html", AttrList::new());
        self.arena.append_child(NodeId::ROOT, html);
        self.open_elements.push(html);
    }

    fn synthesize_head(&mut self) {
        let head = self.insert_element("head", &[]);
        self.head_element = Some(head);
    }

    fn synthesize_body(&mut self) {
        let _ = self.insert_element("body", &[]);
    }

    // ===== Token dispatch =====

    /// [§ 13.2.6 tree construction dispatcher](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction-dispatcher)
    fn dispatch(&mut self, token: &Token) {
        // "the next token is a U+000A LINE FEED (LF) character token, then
        // ignore that token" after <pre>, <listing>, <textarea>.
        if self.ignore_next_lf {
            self.ignore_next_lf = false;
            if let Token::Text { data } = token
                && let Some(rest) = data.strip_prefix('\n')
            {
                if rest.is_empty() {
                    return;
                }
                let trimmed = Token::Text {
                    data: rest.to_string(),
                };
                self.dispatch(&trimmed);
                return;
            }
        }
        match self.mode {
            InsertionMode::Initial => self.handle_initial(token),
            InsertionMode::BeforeHtml => self.handle_before_html(token),
            InsertionMode::BeforeHead => self.handle_before_head(token),
            InsertionMode::InHead => self.handle_in_head(token),
            InsertionMode::AfterHead => self.handle_after_head(token),
            InsertionMode::InBody | InsertionMode::InTemplate => self.handle_in_body(token),
            InsertionMode::Text => self.handle_text(token),
            InsertionMode::InTable => self.handle_in_table(token),
            InsertionMode::InTableText => self.handle_in_table_text(token),
            InsertionMode::InCaption => self.handle_in_caption(token),
            InsertionMode::InColumnGroup => self.handle_in_column_group(token),
            InsertionMode::InTableBody => self.handle_in_table_body(token),
            InsertionMode::InRow => self.handle_in_row(token),
            InsertionMode::InCell => self.handle_in_cell(token),
            InsertionMode::InSelect => self.handle_in_select(token),
            InsertionMode::InSelectInTable => self.handle_in_select_in_table(token),
            InsertionMode::AfterBody => self.handle_after_body(token),
            InsertionMode::InFrameset => self.handle_in_frameset(token),
            InsertionMode::AfterFrameset => self.handle_after_frameset(token),
            InsertionMode::AfterAfterBody => self.handle_after_after_body(token),
        }
    }

    /// Split a text run into its leading ASCII whitespace and the rest.
    /// Several modes ignore (or insert) leading whitespace and reprocess
    /// the remainder under "anything else".
    fn split_leading_whitespace(data: &str) -> (&str, &str) {
        let rest_at = data
            .find(|c: char| !c.is_ascii_whitespace())
            .unwrap_or(data.len());
        data.split_at(rest_at)
    }

    /// [§ 13.2.6.4.1 The "initial" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-initial-insertion-mode)
    fn handle_initial(&mut self, token: &Token) {
        match token {
            Token::Text { data } => {
                let (_, rest) = Self::split_leading_whitespace(data);
                if !rest.is_empty() {
                    self.mode = InsertionMode::BeforeHtml;
                    self.dispatch(&Token::Text {
                        data: rest.to_string(),
                    });
                }
            }
            Token::Comment { data } => self.append_comment_to(NodeId::ROOT, data),
            Token::Doctype { .. } => {
                self.mode = InsertionMode::BeforeHtml;
            }
            Token::StartTag { .. } | Token::EndTag { .. } => {
                self.mode = InsertionMode::BeforeHtml;
                self.dispatch(token);
            }
        }
    }

    /// [§ 13.2.6.4.2 The "before html" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-html-insertion-mode)
    fn handle_before_html(&mut self, token: &Token) {
        match token {
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::Comment { data } => self.append_comment_to(NodeId::ROOT, data),
            Token::Text { data } => {
                let (_, rest) = Self::split_leading_whitespace(data);
                if !rest.is_empty() {
                    self.synthesize_html();
                    self.mode = InsertionMode::BeforeHead;
                    self.dispatch(&Token::Text {
                        data: rest.to_string(),
                    });
                }
            }
            Token::StartTag { name, attrs, .. } if name == "html" => {
                let html = self.arena.alloc_element("html", Self::attrs_from(attrs));
                self.arena.append_child(NodeId::ROOT, html);
                self.open_elements.push(html);
                self.mode = InsertionMode::BeforeHead;
            }
            Token::EndTag { name } if !matches!(name.as_str(), "head" | "body" | "html" | "br") => {
                self.parse_error("unexpected end tag before <html>");
            }
            _ => {
                self.synthesize_html();
                self.mode = InsertionMode::BeforeHead;
                self.dispatch(token);
            }
        }
    }

    /// [§ 13.2.6.4.3 The "before head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-before-head-insertion-mode)
    fn handle_before_head(&mut self, token: &Token) {
        match token {
            Token::Text { data } => {
                let (_, rest) = Self::split_leading_whitespace(data);
                if !rest.is_empty() {
                    self.synthesize_head();
                    self.mode = InsertionMode::InHead;
                    self.dispatch(&Token::Text {
                        data: rest.to_string(),
                    });
                }
            }
            Token::Comment { data } => self.insert_comment(data),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, attrs, .. } if name == "html" => {
                let html = self.open_elements[0];
                self.merge_attrs_into(html, attrs);
            }
            Token::StartTag { name, attrs, .. } if name == "head" => {
                let head = self.insert_element("head", attrs);
                self.head_element = Some(head);
                self.mode = InsertionMode::InHead;
            }
            Token::EndTag { name } if !matches!(name.as_str(), "head" | "body" | "html" | "br") => {
                self.parse_error("unexpected end tag before <head>");
            }
            _ => {
                self.synthesize_head();
                self.mode = InsertionMode::InHead;
                self.dispatch(token);
            }
        }
    }

    /// [§ 13.2.6.4.4 The "in head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inhead)
    fn handle_in_head(&mut self, token: &Token) {
        match token {
            Token::Text { data } => {
                let (ws, rest) = Self::split_leading_whitespace(data);
                if !ws.is_empty() {
                    self.insert_text(ws);
                }
                if !rest.is_empty() {
                    self.pop_head_and_reprocess(&Token::Text {
                        data: rest.to_string(),
                    });
                }
            }
            Token::Comment { data } => self.insert_comment(data),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "html" => {
                    let html = self.open_elements[0];
                    self.merge_attrs_into(html, attrs);
                }
                "base" | "basefont" | "bgsound" | "link" | "meta" => {
                    self.insert_void_element(name, attrs);
                }
                "title" | "style" | "script" | "noframes" => {
                    // The tokenizer has already switched to RCDATA/RAWTEXT;
                    // the element's content arrives as one text token. A
                    // self-closed raw-text tag never gets content, so the
                    // text mode is skipped for it.
                    let _ = self.insert_element(name, attrs);
                    if matches!(token, Token::StartTag { self_closing, .. } if *self_closing) {
                        let _ = self.open_elements.pop();
                    } else {
                        self.original_mode = Some(self.mode);
                        self.mode = InsertionMode::Text;
                    }
                }
                "noscript" => {
                    let _ = self.insert_element(name, attrs);
                }
                "template" => {
                    let _ = self.insert_element(name, attrs);
                    self.original_mode = Some(self.mode);
                    self.mode = InsertionMode::InTemplate;
                }
                "head" => self.parse_error("nested <head> ignored"),
                _ => self.pop_head_and_reprocess(token),
            },
            Token::EndTag { name } => match name.as_str() {
                "head" => {
                    let _ = self.open_elements.pop();
                    self.mode = InsertionMode::AfterHead;
                }
                "noscript" => {
                    if self.current_tag() == "noscript" {
                        let _ = self.open_elements.pop();
                    }
                }
                "template" => {
                    if self.has_in_scope("template") {
                        self.generate_implied_end_tags(&[]);
                        self.pop_until_inclusive("template");
                        self.original_mode = None;
                        self.reset_insertion_mode();
                    }
                }
                "body" | "html" | "br" => self.pop_head_and_reprocess(token),
                _ => self.parse_error("unexpected end tag in <head>"),
            },
        }
    }

    /// "Anything else" in the "in head" mode: pop the head and let the
    /// "after head" mode deal with the token.
    fn pop_head_and_reprocess(&mut self, token: &Token) {
        let _ = self.open_elements.pop();
        self.mode = InsertionMode::AfterHead;
        self.dispatch(token);
    }

    /// [§ 13.2.6.4.6 The "after head" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-head-insertion-mode)
    fn handle_after_head(&mut self, token: &Token) {
        match token {
            Token::Text { data } => {
                let (ws, rest) = Self::split_leading_whitespace(data);
                if !ws.is_empty() {
                    self.insert_text(ws);
                }
                if !rest.is_empty() {
                    self.synthesize_body();
                    self.mode = InsertionMode::InBody;
                    self.dispatch(&Token::Text {
                        data: rest.to_string(),
                    });
                }
            }
            Token::Comment { data } => self.insert_comment(data),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "html" => {
                    let html = self.open_elements[0];
                    self.merge_attrs_into(html, attrs);
                }
                "body" => {
                    let _ = self.insert_element("body", attrs);
                    self.mode = InsertionMode::InBody;
                }
                "frameset" => {
                    let _ = self.insert_element("frameset", attrs);
                    self.mode = InsertionMode::InFrameset;
                }
                "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script"
                | "style" | "template" | "title" => {
                    // "Push the node pointed to by the head element pointer
                    // onto the stack of open elements", process, remove.
                    self.parse_error("head-only element after </head>");
                    if let Some(head) = self.head_element {
                        self.open_elements.push(head);
                        self.handle_in_head(token);
                        self.open_elements.retain(|&id| id != head);
                    }
                }
                "head" => self.parse_error("second <head> ignored"),
                _ => {
                    self.synthesize_body();
                    self.mode = InsertionMode::InBody;
                    self.dispatch(token);
                }
            },
            Token::EndTag { name } => match name.as_str() {
                "body" | "html" | "br" => {
                    self.synthesize_body();
                    self.mode = InsertionMode::InBody;
                    self.dispatch(token);
                }
                _ => self.parse_error("unexpected end tag after <head>"),
            },
        }
    }

    /// [§ 13.2.6.4.7 The "in body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    fn handle_in_body(&mut self, token: &Token) {
        match token {
            Token::Text { data } => self.insert_text(data),
            Token::Comment { data } => self.insert_comment(data),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => self.in_body_start_tag(name, attrs, *self_closing),
            Token::EndTag { name } => self.in_body_end_tag(name),
        }
    }

    fn in_body_start_tag(&mut self, name: &str, attrs: &[AttrEntry], self_closing: bool) {
        match name {
            "html" => {
                self.parse_error("repeated <html> start tag");
                let html = self.open_elements[0];
                self.merge_attrs_into(html, attrs);
            }
            "base" | "basefont" | "bgsound" | "link" | "meta" | "noframes" | "script" | "style"
            | "template" | "title" => {
                self.handle_in_head(&Token::StartTag {
                    name: name.to_string(),
                    self_closing: false,
                    attrs: attrs.to_vec(),
                });
            }
            "body" => {
                self.parse_error("repeated <body> start tag");
                if let Some(&body) = self.open_elements.get(1)
                    && self.tag_of(body) == "body"
                {
                    self.merge_attrs_into(body, attrs);
                }
            }
            "frameset" => self.parse_error("<frameset> after content ignored"),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.close_p_if_in_button_scope();
                if matches!(self.current_tag(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                    self.parse_error("heading start tag closes open heading");
                    let _ = self.open_elements.pop();
                }
                let _ = self.insert_element(name, attrs);
            }
            "pre" | "listing" => {
                self.close_p_if_in_button_scope();
                let _ = self.insert_element(name, attrs);
                self.ignore_next_lf = true;
            }
            "li" => {
                if self.has_in_list_item_scope("li") {
                    self.generate_implied_end_tags(&["li"]);
                    self.pop_until_inclusive("li");
                }
                self.close_p_if_in_button_scope();
                let _ = self.insert_element(name, attrs);
            }
            "dd" | "dt" => {
                for dt in ["dd", "dt"] {
                    if self.has_in_scope(dt) {
                        self.generate_implied_end_tags(&[dt]);
                        self.pop_until_inclusive(dt);
                        break;
                    }
                }
                self.close_p_if_in_button_scope();
                let _ = self.insert_element(name, attrs);
            }
            "button" => {
                if self.has_in_scope("button") {
                    self.parse_error("nested <button> closes the open one");
                    self.generate_implied_end_tags(&[]);
                    self.pop_until_inclusive("button");
                }
                let _ = self.insert_element(name, attrs);
            }
            "table" => {
                self.close_p_if_in_button_scope();
                let _ = self.insert_element(name, attrs);
                self.mode = InsertionMode::InTable;
            }
            "area" | "br" | "embed" | "img" | "keygen" | "wbr" | "input" | "param" | "source"
            | "track" => {
                self.insert_void_element(name, attrs);
            }
            "hr" => {
                self.close_p_if_in_button_scope();
                self.insert_void_element(name, attrs);
            }
            "image" => {
                // "Don't ask."
                self.parse_error("<image> treated as <img>");
                self.insert_void_element("img", attrs);
            }
            "textarea" => {
                let _ = self.insert_element(name, attrs);
                self.ignore_next_lf = true;
                self.enter_text_mode(self_closing);
            }
            "xmp" => {
                self.close_p_if_in_button_scope();
                let _ = self.insert_element(name, attrs);
                self.enter_text_mode(self_closing);
            }
            "noembed" => {
                let _ = self.insert_element(name, attrs);
                self.enter_text_mode(self_closing);
            }
            "select" => {
                let _ = self.insert_element(name, attrs);
                self.mode = InsertionMode::InSelect;
            }
            "optgroup" | "option" => {
                if self.current_tag() == "option" {
                    let _ = self.open_elements.pop();
                }
                let _ = self.insert_element(name, attrs);
            }
            "caption" | "col" | "colgroup" | "frame" | "head" | "tbody" | "td" | "tfoot" | "th"
            | "thead" | "tr" => {
                self.parse_error("table-structure tag outside a table ignored");
            }
            _ => {
                if CLOSES_OPEN_P.contains(&name) {
                    self.close_p_if_in_button_scope();
                }
                if VOID_ELEMENTS.contains(&name) {
                    self.insert_void_element(name, attrs);
                } else {
                    let _ = self.insert_element(name, attrs);
                }
            }
        }
    }

    fn in_body_end_tag(&mut self, name: &str) {
        match name {
            "template" => self.handle_in_head(&Token::EndTag {
                name: name.to_string(),
            }),
            "body" => {
                if self.has_in_scope("body") {
                    self.mode = InsertionMode::AfterBody;
                } else {
                    self.parse_error("</body> without open body");
                }
            }
            "html" => {
                if self.has_in_scope("body") {
                    self.mode = InsertionMode::AfterBody;
                    self.dispatch(&Token::EndTag {
                        name: name.to_string(),
                    });
                } else {
                    self.parse_error("</html> without open body");
                }
            }
            "p" => {
                if self.has_in_button_scope("p") {
                    self.close_p_element();
                } else {
                    // "this is a parse error; insert an HTML element for a
                    // 'p' start tag token with no attributes" — the stray
                    // end tag materializes an empty paragraph.
                    self.parse_error("</p> without open paragraph");
                    let _ = self.insert_element("p", &[]);
                    self.close_p_element();
                }
            }
            "li" => {
                if self.has_in_list_item_scope("li") {
                    self.generate_implied_end_tags(&["li"]);
                    self.pop_until_inclusive("li");
                } else {
                    self.parse_error("</li> without open list item");
                }
            }
            "dd" | "dt" => {
                if self.has_in_scope(name) {
                    self.generate_implied_end_tags(&[name]);
                    self.pop_until_inclusive(name);
                } else {
                    self.parse_error("unmatched definition-list end tag");
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if self.has_any_heading_in_scope() {
                    self.generate_implied_end_tags(&[]);
                    self.pop_until_any_inclusive(&["h1", "h2", "h3", "h4", "h5", "h6"]);
                } else {
                    self.parse_error("unmatched heading end tag");
                }
            }
            "br" => {
                // "Act as described in the 'anything else' entry, but with
                // a br start tag token" — a stray </br> produces a break.
                self.parse_error("</br> treated as <br>");
                self.insert_void_element("br", &[]);
            }
            _ => self.any_other_end_tag(name),
        }
    }

    /// [§ 13.2.6.4.7 "Any other end tag"](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inbody)
    ///
    /// Walk down the stack; close through a matching element, or ignore
    /// the token once a special element is in the way.
    fn any_other_end_tag(&mut self, name: &str) {
        for i in (0..self.open_elements.len()).rev() {
            let tag = self.tag_of(self.open_elements[i]).to_string();
            if tag == name {
                self.generate_implied_end_tags(&[name]);
                self.open_elements.truncate(i);
                return;
            }
            if is_special(&tag) {
                self.parse_error("unmatched end tag ignored");
                return;
            }
        }
    }

    /// Switch into the "text" mode for a just-inserted raw-text element,
    /// unless the tag self-closed (the tokenizer then never switched out of
    /// the data state and no content token will come).
    fn enter_text_mode(&mut self, self_closing: bool) {
        if self_closing {
            let _ = self.open_elements.pop();
        } else {
            self.original_mode = Some(self.mode);
            self.mode = InsertionMode::Text;
        }
    }

    /// [§ 13.2.6.4.8 The "text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incdata)
    ///
    /// Raw-text and RCDATA element content: one text child, then the close
    /// tag restores the previous mode.
    fn handle_text(&mut self, token: &Token) {
        match token {
            Token::Text { data } => self.insert_text(data),
            Token::EndTag { .. } => {
                let _ = self.open_elements.pop();
                self.mode = self.original_mode.take().unwrap_or(InsertionMode::InBody);
            }
            _ => self.parse_error("unexpected token in raw text content"),
        }
    }

    /// [§ 13.2.6.4.9 The "in table" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intable)
    fn handle_in_table(&mut self, token: &Token) {
        match token {
            Token::Text { data } => {
                // Buffer and decide whitespace-vs-foster when the run ends.
                self.table_text_return = self.mode;
                self.pending_table_text = data.clone();
                self.mode = InsertionMode::InTableText;
            }
            Token::Comment { data } => self.insert_comment(data),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "caption" => {
                    self.clear_stack_to_table_context();
                    let _ = self.insert_element(name, attrs);
                    self.mode = InsertionMode::InCaption;
                }
                "colgroup" => {
                    self.clear_stack_to_table_context();
                    let _ = self.insert_element(name, attrs);
                    self.mode = InsertionMode::InColumnGroup;
                }
                "col" => {
                    self.clear_stack_to_table_context();
                    let _ = self.insert_element("colgroup", &[]);
                    self.mode = InsertionMode::InColumnGroup;
                    self.dispatch(token);
                }
                "tbody" | "tfoot" | "thead" => {
                    self.clear_stack_to_table_context();
                    let _ = self.insert_element(name, attrs);
                    self.mode = InsertionMode::InTableBody;
                }
                "td" | "th" | "tr" => {
                    // "Act as if a 'tbody' start tag token had been seen."
                    self.clear_stack_to_table_context();
                    let _ = self.insert_element("tbody", &[]);
                    self.mode = InsertionMode::InTableBody;
                    self.dispatch(token);
                }
                "table" => {
                    self.parse_error("<table> inside <table>");
                    if self.has_in_table_scope("table") {
                        self.pop_until_inclusive("table");
                        self.reset_insertion_mode();
                        self.dispatch(token);
                    }
                }
                "style" | "script" | "template" => self.handle_in_head(token),
                "input" => {
                    let hidden = attrs
                        .iter()
                        .find(|a| a.name == "type")
                        .is_some_and(|a| a.value.eq_ignore_ascii_case("hidden"));
                    if hidden {
                        self.insert_void_element(name, attrs);
                    } else {
                        self.foster_parented_in_body(token);
                    }
                }
                "form" => {
                    self.parse_error("<form> inside <table>");
                    self.insert_void_element(name, attrs);
                }
                _ => self.foster_parented_in_body(token),
            },
            Token::EndTag { name } => match name.as_str() {
                "table" => {
                    if self.has_in_table_scope("table") {
                        self.pop_until_inclusive("table");
                        self.reset_insertion_mode();
                    } else {
                        self.parse_error("</table> without open table");
                    }
                }
                "body" | "caption" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot"
                | "th" | "thead" | "tr" => {
                    self.parse_error("unexpected end tag in table");
                }
                "template" => self.handle_in_head(token),
                _ => self.foster_parented_in_body(token),
            },
        }
    }

    /// "Anything else" in table context: process using the "in body" rules
    /// with foster parenting enabled.
    fn foster_parented_in_body(&mut self, token: &Token) {
        self.parse_error("content misplaced in table is foster-parented");
        self.foster_parenting = true;
        self.handle_in_body(token);
        self.foster_parenting = false;
    }

    /// [§ 13.2.6.4.10 The "in table text" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intabletext)
    fn handle_in_table_text(&mut self, token: &Token) {
        if let Token::Text { data } = token {
            self.pending_table_text.push_str(data);
            return;
        }
        self.flush_pending_table_text();
        self.mode = self.table_text_return;
        self.dispatch(token);
    }

    /// "If any of the tokens ... are character tokens that are not ASCII
    /// whitespace, then ... reprocess using the 'anything else' entry"
    /// (foster parenting); otherwise insert the characters normally.
    fn flush_pending_table_text(&mut self) {
        let pending = std::mem::take(&mut self.pending_table_text);
        if pending.is_empty() {
            return;
        }
        if pending.chars().all(|c| c.is_ascii_whitespace()) {
            self.insert_text(&pending);
        } else {
            self.parse_error("non-whitespace text in table is foster-parented");
            self.foster_parenting = true;
            self.insert_text(&pending);
            self.foster_parenting = false;
        }
    }

    /// [§ 13.2.6.4.11 The "in caption" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incaption)
    fn handle_in_caption(&mut self, token: &Token) {
        match token {
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                if self.close_caption() {
                    self.dispatch(token);
                }
            }
            Token::EndTag { name } => match name.as_str() {
                "caption" => {
                    let _ = self.close_caption();
                }
                "table" => {
                    if self.close_caption() {
                        self.dispatch(token);
                    }
                }
                "body" | "col" | "colgroup" | "html" | "tbody" | "td" | "tfoot" | "th" | "thead"
                | "tr" => self.parse_error("unexpected end tag in <caption>"),
                _ => self.handle_in_body(token),
            },
            _ => self.handle_in_body(token),
        }
    }

    fn close_caption(&mut self) -> bool {
        if self.has_in_table_scope("caption") {
            self.generate_implied_end_tags(&[]);
            self.pop_until_inclusive("caption");
            self.mode = InsertionMode::InTable;
            true
        } else {
            self.parse_error("caption close without open <caption>");
            false
        }
    }

    /// [§ 13.2.6.4.12 The "in column group" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incolumngroup)
    fn handle_in_column_group(&mut self, token: &Token) {
        match token {
            Token::Text { data } => {
                let (ws, rest) = Self::split_leading_whitespace(data);
                if !ws.is_empty() {
                    self.insert_text(ws);
                }
                if !rest.is_empty() {
                    self.leave_column_group(&Token::Text {
                        data: rest.to_string(),
                    });
                }
            }
            Token::Comment { data } => self.insert_comment(data),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "html" => {
                    let html = self.open_elements[0];
                    self.merge_attrs_into(html, attrs);
                }
                "col" => self.insert_void_element(name, attrs),
                "template" => self.handle_in_head(token),
                _ => self.leave_column_group(token),
            },
            Token::EndTag { name } => match name.as_str() {
                "colgroup" => {
                    if self.current_tag() == "colgroup" {
                        let _ = self.open_elements.pop();
                        self.mode = InsertionMode::InTable;
                    } else {
                        self.parse_error("</colgroup> with nothing to close");
                    }
                }
                "col" => self.parse_error("</col> ignored"),
                "template" => self.handle_in_head(token),
                _ => self.leave_column_group(token),
            },
        }
    }

    fn leave_column_group(&mut self, token: &Token) {
        if self.current_tag() == "colgroup" {
            let _ = self.open_elements.pop();
            self.mode = InsertionMode::InTable;
            self.dispatch(token);
        } else {
            self.parse_error("token ignored in column group");
        }
    }

    /// [§ 13.2.6.4.13 The "in table body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-intablebody)
    fn handle_in_table_body(&mut self, token: &Token) {
        match token {
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "tr" => {
                    self.clear_stack_to_table_body_context();
                    let _ = self.insert_element(name, attrs);
                    self.mode = InsertionMode::InRow;
                }
                "th" | "td" => {
                    // "Act as if a 'tr' start tag token had been seen."
                    self.parse_error("cell without <tr> gets an implicit row");
                    self.clear_stack_to_table_body_context();
                    let _ = self.insert_element("tr", &[]);
                    self.mode = InsertionMode::InRow;
                    self.dispatch(token);
                }
                "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" => {
                    if self.leave_table_body() {
                        self.dispatch(token);
                    }
                }
                _ => self.handle_in_table(token),
            },
            Token::EndTag { name } => match name.as_str() {
                "tbody" | "tfoot" | "thead" => {
                    if self.has_in_table_scope(name) {
                        self.clear_stack_to_table_body_context();
                        let _ = self.open_elements.pop();
                        self.mode = InsertionMode::InTable;
                    } else {
                        self.parse_error("unmatched table-section end tag");
                    }
                }
                "table" => {
                    if self.leave_table_body() {
                        self.dispatch(token);
                    }
                }
                "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" | "tr" => {
                    self.parse_error("unexpected end tag in table body");
                }
                _ => self.handle_in_table(token),
            },
            _ => self.handle_in_table(token),
        }
    }

    fn leave_table_body(&mut self) -> bool {
        if ["tbody", "thead", "tfoot"]
            .iter()
            .any(|t| self.has_in_table_scope(t))
        {
            self.clear_stack_to_table_body_context();
            let _ = self.open_elements.pop();
            self.mode = InsertionMode::InTable;
            true
        } else {
            self.parse_error("table-section close with no open section");
            false
        }
    }

    /// [§ 13.2.6.4.14 The "in row" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inrow)
    fn handle_in_row(&mut self, token: &Token) {
        match token {
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "th" | "td" => {
                    self.clear_stack_to_table_row_context();
                    let _ = self.insert_element(name, attrs);
                    self.mode = InsertionMode::InCell;
                }
                "caption" | "col" | "colgroup" | "tbody" | "tfoot" | "thead" | "tr" => {
                    if self.close_row() {
                        self.dispatch(token);
                    }
                }
                _ => self.handle_in_table(token),
            },
            Token::EndTag { name } => match name.as_str() {
                "tr" => {
                    let _ = self.close_row();
                }
                "table" => {
                    if self.close_row() {
                        self.dispatch(token);
                    }
                }
                "tbody" | "tfoot" | "thead" => {
                    if self.has_in_table_scope(name) {
                        if self.close_row() {
                            self.dispatch(token);
                        }
                    } else {
                        self.parse_error("unmatched table-section end tag in row");
                    }
                }
                "body" | "caption" | "col" | "colgroup" | "html" | "td" | "th" => {
                    self.parse_error("unexpected end tag in table row");
                }
                _ => self.handle_in_table(token),
            },
            _ => self.handle_in_table(token),
        }
    }

    fn close_row(&mut self) -> bool {
        if self.has_in_table_scope("tr") {
            self.clear_stack_to_table_row_context();
            let _ = self.open_elements.pop();
            self.mode = InsertionMode::InTableBody;
            true
        } else {
            self.parse_error("row close without open <tr>");
            false
        }
    }

    /// [§ 13.2.6.4.15 The "in cell" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-incell)
    fn handle_in_cell(&mut self, token: &Token) {
        match token {
            Token::StartTag { name, .. }
                if matches!(
                    name.as_str(),
                    "caption" | "col" | "colgroup" | "tbody" | "td" | "tfoot" | "th" | "thead"
                        | "tr"
                ) =>
            {
                if self.has_in_table_scope("td") || self.has_in_table_scope("th") {
                    self.close_cell();
                    self.dispatch(token);
                } else {
                    self.parse_error("table-structure tag with no open cell");
                }
            }
            Token::EndTag { name } => match name.as_str() {
                "td" | "th" => {
                    if self.has_in_table_scope(name) {
                        self.generate_implied_end_tags(&[name]);
                        self.pop_until_inclusive(name);
                        self.mode = InsertionMode::InRow;
                    } else {
                        self.parse_error("unmatched cell end tag");
                    }
                }
                "table" | "tbody" | "tfoot" | "thead" | "tr" => {
                    if self.has_in_table_scope(name) {
                        self.close_cell();
                        self.dispatch(token);
                    } else {
                        self.parse_error("unmatched table end tag in cell");
                    }
                }
                "body" | "caption" | "col" | "colgroup" | "html" => {
                    self.parse_error("unexpected end tag in table cell");
                }
                _ => self.handle_in_body(token),
            },
            _ => self.handle_in_body(token),
        }
    }

    /// [§ 13.2.6.4.16 The "in select" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselect)
    fn handle_in_select(&mut self, token: &Token) {
        match token {
            Token::Text { data } => self.insert_text(data),
            Token::Comment { data } => self.insert_comment(data),
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "option" => {
                    if self.current_tag() == "option" {
                        let _ = self.open_elements.pop();
                    }
                    let _ = self.insert_element(name, attrs);
                }
                "optgroup" => {
                    if self.current_tag() == "option" {
                        let _ = self.open_elements.pop();
                    }
                    if self.current_tag() == "optgroup" {
                        let _ = self.open_elements.pop();
                    }
                    let _ = self.insert_element(name, attrs);
                }
                "select" => {
                    // "Act as if the token had been an end tag."
                    self.parse_error("<select> inside <select> closes it");
                    self.close_select();
                }
                "input" | "keygen" | "textarea" => {
                    self.parse_error("form control inside <select> closes it");
                    if self.has_in_scope("select") {
                        self.close_select();
                        self.dispatch(token);
                    }
                }
                "script" | "template" => self.handle_in_head(token),
                _ => self.parse_error("start tag ignored in <select>"),
            },
            Token::EndTag { name } => match name.as_str() {
                "option" => {
                    if self.current_tag() == "option" {
                        let _ = self.open_elements.pop();
                    }
                }
                "optgroup" => {
                    if self.current_tag() == "option" {
                        let _ = self.open_elements.pop();
                    }
                    if self.current_tag() == "optgroup" {
                        let _ = self.open_elements.pop();
                    }
                }
                "select" => self.close_select(),
                "template" => self.handle_in_head(token),
                _ => self.parse_error("end tag ignored in <select>"),
            },
        }
    }

    fn close_select(&mut self) {
        if self.has_in_scope("select") {
            self.pop_until_inclusive("select");
            self.reset_insertion_mode();
        } else {
            self.parse_error("</select> without open select");
        }
    }

    /// [§ 13.2.6.4.17 The "in select in table" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inselectintable)
    fn handle_in_select_in_table(&mut self, token: &Token) {
        let table_tag = |name: &str| {
            matches!(
                name,
                "caption" | "table" | "tbody" | "tfoot" | "thead" | "tr" | "td" | "th"
            )
        };
        match token {
            Token::StartTag { name, .. } if table_tag(name) => {
                self.parse_error("table-structure tag closes open <select>");
                self.close_select();
                self.dispatch(token);
            }
            Token::EndTag { name } if table_tag(name) => {
                self.parse_error("table-structure end tag closes open <select>");
                if self.has_in_table_scope(name) {
                    self.close_select();
                    self.dispatch(token);
                }
            }
            _ => self.handle_in_select(token),
        }
    }

    /// [§ 13.2.6.4.19 The "after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterbody)
    fn handle_after_body(&mut self, token: &Token) {
        match token {
            Token::Text { .. } if token.is_whitespace_text() => self.handle_in_body(token),
            Token::Comment { data } => {
                let html = self.open_elements.first().copied().unwrap_or(NodeId::ROOT);
                self.append_comment_to(html, data);
            }
            Token::Doctype { .. } => self.parse_error("unexpected DOCTYPE"),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            Token::EndTag { name } if name == "html" => {
                self.mode = InsertionMode::AfterAfterBody;
            }
            _ => {
                self.parse_error("content after </body> reopens the body");
                self.mode = InsertionMode::InBody;
                self.dispatch(token);
            }
        }
    }

    /// [§ 13.2.6.4.20 The "in frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-inframeset)
    fn handle_in_frameset(&mut self, token: &Token) {
        match token {
            Token::Text { data } => {
                let ws: String = data.chars().filter(char::is_ascii_whitespace).collect();
                if !ws.is_empty() {
                    self.insert_text(&ws);
                }
            }
            Token::Comment { data } => self.insert_comment(data),
            Token::StartTag { name, attrs, .. } => match name.as_str() {
                "frameset" => {
                    let _ = self.insert_element(name, attrs);
                }
                "frame" => self.insert_void_element(name, attrs),
                "noframes" => self.handle_in_head(token),
                _ => self.parse_error("start tag ignored in frameset"),
            },
            Token::EndTag { name } if name == "frameset" => {
                if self.current_tag() == "frameset" {
                    let _ = self.open_elements.pop();
                }
                if self.current_tag() != "frameset" {
                    self.mode = InsertionMode::AfterFrameset;
                }
            }
            _ => self.parse_error("token ignored in frameset"),
        }
    }

    /// [§ 13.2.6.4.21 The "after frameset" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#parsing-main-afterframeset)
    ///
    /// Reduced rules: only whitespace, comments, and `<noframes>` do
    /// anything here.
    fn handle_after_frameset(&mut self, token: &Token) {
        match token {
            Token::Text { .. } if token.is_whitespace_text() => self.handle_in_body(token),
            Token::Comment { data } => self.insert_comment(data),
            Token::StartTag { name, .. } if name == "noframes" => self.handle_in_head(token),
            Token::EndTag { name } if name == "html" => {}
            _ => self.parse_error("token ignored after frameset"),
        }
    }

    /// [§ 13.2.6.4.22 The "after after body" insertion mode](https://html.spec.whatwg.org/multipage/parsing.html#the-after-after-body-insertion-mode)
    fn handle_after_after_body(&mut self, token: &Token) {
        match token {
            Token::Comment { data } => self.append_comment_to(NodeId::ROOT, data),
            Token::Doctype { .. } => {}
            Token::Text { .. } if token.is_whitespace_text() => self.handle_in_body(token),
            Token::StartTag { name, .. } if name == "html" => self.handle_in_body(token),
            _ => {
                self.parse_error("content after the document reopens the body");
                self.mode = InsertionMode::InBody;
                self.dispatch(token);
            }
        }
    }

    /// Complete the document once the token stream ends: flush buffered
    /// table text, leave raw-text content, and synthesize any missing
    /// `<html>`, `<head>`, `<body>` structure.
    fn finish(&mut self) {
        if self.mode == InsertionMode::InTableText {
            self.flush_pending_table_text();
            self.mode = self.table_text_return;
        }
        if self.mode == InsertionMode::Text {
            let _ = self.open_elements.pop();
            self.mode = self.original_mode.take().unwrap_or(InsertionMode::InBody);
        }
        loop {
            match self.mode {
                InsertionMode::Initial => self.mode = InsertionMode::BeforeHtml,
                InsertionMode::BeforeHtml => {
                    self.synthesize_html();
                    self.mode = InsertionMode::BeforeHead;
                }
                InsertionMode::BeforeHead => {
                    self.synthesize_head();
                    self.mode = InsertionMode::InHead;
                }
                InsertionMode::InHead => {
                    let _ = self.open_elements.pop();
                    self.mode = InsertionMode::AfterHead;
                }
                InsertionMode::AfterHead => {
                    self.synthesize_body();
                    self.mode = InsertionMode::InBody;
                    return;
                }
                _ => return,
            }
        }
    }
}
