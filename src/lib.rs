// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # cilimage
//!
//! A lazy, thread-safe reader for managed (.NET) PE images.
//!
//! `cilimage` opens a PE container, maps between raw file offsets and relative virtual
//! addresses, locates the CLR metadata and exposes the rows of its tables as entities
//! whose fields are only decoded on first access. Entities read from disk and entities
//! built by the caller share a single accessor contract, so downstream code never needs to
//! know where a value came from.
//!
//! ## Architecture
//!
//! - [`file`] - the image container: [`file::PeImage`], the [`file::AddressSpace`] trait
//!   and bounded [`file::ByteStream`] views
//! - [`metadata`] - metadata root, tables stream, the [`metadata::lazy::LazyCell`]
//!   primitive and the table-backed entity families
//! - [`Error`] / [`Result`] - the crate wide error type
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cilimage::prelude::*;
//! use std::path::Path;
//!
//! let module = CilModule::from_file(Path::new("tests/samples/sample.dll"), LoaderOptions::default())?;
//! for entry in module.interface_impls(&GenericParamContext::empty())? {
//!     if let Some(interface) = entry.interface()? {
//!         println!("{} implements {}", entry.token(), interface.token);
//!     }
//! }
//! # Ok::<(), cilimage::Error>(())
//! ```
//!
//! ## Laziness
//!
//! Every lazily computed field is a [`metadata::lazy::LazyCell`]. Its synchronization
//! policy is chosen once per module through [`metadata::config::LoaderOptions`]: the
//! locking policy runs each recipe exactly once, the racy policy lets concurrent callers
//! compute in parallel and keeps the first published result.

#[macro_use]
pub(crate) mod error;
#[cfg(test)]
pub(crate) mod test;

pub mod file;
pub mod metadata;
pub mod prelude;

pub use error::Error;

/// The crate wide result type.
pub type Result<T> = std::result::Result<T, Error>;
