//! HTML tree construction per
//! [WHATWG § 13.2.6](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction).

mod core;
mod tag_sets;

pub use core::{InsertionMode, ParseIssue, TreeBuilder};
pub use tag_sets::{CLOSES_OPEN_P, IMPLIED_END_TAGS, VOID_ELEMENTS, is_special};
