//! The minimal type objects cross references resolve to.
//!
//! Metadata entities referencing a type through a `TypeDefOrRef` coded index resolve it to
//! a shared [`TypeDefOrRef`]. Full type semantics (names, members, signatures) are layered on
//! top by callers; this module only fixes identity and the originating row.

mod typedeforref;

pub use typedeforref::{TypeDefOrRef, TypeDefOrRefKind, TypeDefOrRefRc};
