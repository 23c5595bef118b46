//! Metadata parsing and lazy materialization for managed images.
//!
//! # Key Components
//!
//! - [`cilmodule`] - the owning container, opens the CLR header, metadata root and tables
//! - [`streams`] - the stream directory and the tables stream row reader
//! - [`tables`] - table identifiers, row layouts and the table-backed entities
//! - [`lazy`] - the once-computed cells every lazy field is built on
//! - [`entity`] - the accessor contract shared by materialized and user-created entities
//! - [`generics`] - binding generic parameter references to their declaration
//! - [`typesystem`] - the type objects cross references resolve to
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilimage::metadata::{cilmodule::CilModule, config::LoaderOptions, tables::TableId};
//! use cilimage::metadata::entity::MetadataSource;
//!
//! let module = CilModule::from_mem(std::fs::read("tests/samples/sample.dll")?, LoaderOptions::racy())?;
//! println!("InterfaceImpl rows: {}", module.row_count(TableId::InterfaceImpl));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// The owning container of a module's metadata
pub mod cilmodule;
/// Loader options
pub mod config;
/// The CLR runtime header
pub mod cor20header;
/// Contracts between entities and their source
pub mod entity;
/// Generic parameter binding
pub mod generics;
/// Once-computed values
pub mod lazy;
/// Row-id sequences
pub mod ridlist;
/// The metadata root
pub mod root;
/// Metadata streams
pub mod streams;
/// Metadata tables and their entities
pub mod tables;
/// Metadata tokens
pub mod token;
/// Resolved type references
pub mod typesystem;
