//! HTML tokenization per
//! [WHATWG § 13.2.5](https://html.spec.whatwg.org/multipage/parsing.html#tokenization).

mod entities;
mod state_machine;
mod token;

pub use entities::{lookup_named_entity, numeric_reference};
pub use state_machine::{Tokenizer, TokenizerState};
pub use token::{AttrEntry, Token};
