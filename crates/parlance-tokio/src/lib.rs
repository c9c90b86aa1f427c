//
// lib.rs
//

//! The ambient, tokio-flavored half of `parlance`: a real [`Clock`]
//! and a reference line tokenizer, kept in their own crate so the
//! conversation engine itself never takes on an async runtime
//! dependency (§10.5).

pub mod clock;
pub mod line_tokenizer;

pub use crate::clock::{TokioClock, TokioHandle};
pub use crate::line_tokenizer::LineTokenizer;
