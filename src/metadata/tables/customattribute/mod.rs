//! CustomAttribute table (0x0C) and its entities.
//!
//! Custom attributes are found through their parent: every entity that can carry
//! attributes scans this table for rows whose `Parent` column references it, and exposes
//! the result as a [`CustomAttributeCollection`].
//!
//! # Reference
//! - [ECMA-335 II.22.10](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

mod collection;
mod owned;
mod raw;
mod reader;

pub use collection::CustomAttributeCollection;
pub use owned::{CustomAttribute, CustomAttributeRc};
pub use raw::CustomAttributeRaw;
