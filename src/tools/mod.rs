//! In-process tool serving.

mod builtin;

pub use builtin::{extract_title, BuiltinToolServer};
