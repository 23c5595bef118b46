//! # cilimage Prelude
//!
//! The types most programs reading managed images need, in one import.
//!
//! ```rust,no_run
//! use cilimage::prelude::*;
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cilimage operations
pub use crate::Error;

/// The result type used throughout cilimage
pub use crate::Result;

// ================================================================================================
// Image Access
// ================================================================================================

pub use crate::file::{AddressSpace, ByteStream, FileOffset, PeImage, Rva};

// ================================================================================================
// Metadata
// ================================================================================================

pub use crate::metadata::{
    cilmodule::CilModule,
    config::LoaderOptions,
    entity::{MetadataEntity, MetadataSource},
    generics::{GenericParamContext, GenericVar},
    lazy::{LazyCell, LazyPolicy, LazyState},
    ridlist::RidList,
    tables::{
        CustomAttribute, CustomAttributeCollection, CustomAttributeRc, InterfaceImpl,
        InterfaceImplMd, InterfaceImplUser, TableId,
    },
    token::Token,
    typesystem::{TypeDefOrRef, TypeDefOrRefKind, TypeDefOrRefRc},
};
