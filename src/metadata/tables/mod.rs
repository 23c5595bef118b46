//! Metadata tables.
//!
//! The [`types`] module holds what every table shares: identifiers, the sizing context,
//! coded indices, the column schema and generic raw rows. Tables that back entities have
//! their own module with a typed raw row and the entities built on it.
//!
//! # Key Components
//!
//! - [`RawRow`] - the undecoded columns of any row
//! - [`RowReadable`] - typed rows decoded straight from table bytes
//! - [`InterfaceImpl`] - interface implementations, lazily resolved or built in memory
//! - [`CustomAttributeCollection`] - the custom attributes of an entity

mod customattribute;
mod interfaceimpl;
pub mod types;

pub use customattribute::{
    CustomAttribute, CustomAttributeCollection, CustomAttributeRaw, CustomAttributeRc,
};
pub use interfaceimpl::{InterfaceImpl, InterfaceImplMd, InterfaceImplRaw, InterfaceImplUser};
pub use types::{
    schema, CodedIndex, CodedIndexType, HeapSizes, RawRow, RowReadable, TableId, TableInfo,
    TableInfoRef, TableRowInfo, TABLE_SLOTS,
};
