//! Input and output formats: line readers, record adapters and stage stores.

pub mod lines;
pub mod store;
pub mod util;
