//! Metadata streams.
//!
//! The metadata root lists its streams by name. This crate reads the stream directory and
//! the tables stream; heap contents (`#Strings`, `#Blob`, `#GUID`, `#US`) are exposed only as
//! raw indices.

mod streamheader;
mod tablesheader;

pub use streamheader::{StreamHeader, STREAM_NAMES};
pub use tablesheader::TablesStream;
