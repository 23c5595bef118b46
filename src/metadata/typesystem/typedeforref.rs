use std::sync::Arc;

use crate::{
    metadata::{
        generics::GenericParamContext,
        tables::{RawRow, TableId},
        token::Token,
    },
    Result,
};

/// Reference to a [`TypeDefOrRef`]
pub type TypeDefOrRefRc = Arc<TypeDefOrRef>;

/// Which table a [`TypeDefOrRef`] lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeDefOrRefKind {
    /// A type defined in this module
    TypeDef,
    /// A reference to a type defined elsewhere
    TypeRef,
    /// A type signature (generic instantiation, array, pointer, ...), bound to the generic
    /// context it was resolved in
    TypeSpec(GenericParamContext),
}

/// A type reached through a `TypeDefOrRef` coded index.
///
/// Instances resolved by a module carry the raw row they were read from. Instances built by
/// the caller carry none. A module hands out one shared instance per token (and, for type
/// specifications, per generic context), so identity can be checked with `Arc::ptr_eq`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDefOrRef {
    /// Token of the type
    pub token: Token,
    /// Table the type lives in
    pub kind: TypeDefOrRefKind,
    /// The row the type was read from, `None` for caller-built types
    pub row: Option<RawRow>,
}

impl TypeDefOrRef {
    /// A caller-built type for `token`, resolved in `context`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the token is null or does not point into the
    /// `TypeDef`, `TypeRef` or `TypeSpec` table
    pub fn new(token: Token, context: GenericParamContext) -> Result<TypeDefOrRef> {
        let kind = Self::kind_of(token, context)?;
        Ok(TypeDefOrRef {
            token,
            kind,
            row: None,
        })
    }

    /// A type read from `row`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `row` is not a `TypeDef`, `TypeRef` or
    /// `TypeSpec` row
    pub fn from_row(row: RawRow, context: GenericParamContext) -> Result<TypeDefOrRef> {
        let token = row.token();
        let kind = Self::kind_of(token, context)?;
        Ok(TypeDefOrRef {
            token,
            kind,
            row: Some(row),
        })
    }

    fn kind_of(token: Token, context: GenericParamContext) -> Result<TypeDefOrRefKind> {
        if token.is_null() {
            return Err(malformed_error!("A type can not have a null token"));
        }

        match token.table_id() {
            Some(TableId::TypeDef) => Ok(TypeDefOrRefKind::TypeDef),
            Some(TableId::TypeRef) => Ok(TypeDefOrRefKind::TypeRef),
            Some(TableId::TypeSpec) => Ok(TypeDefOrRefKind::TypeSpec(context)),
            _ => Err(malformed_error!("Token {} is not a TypeDefOrRef", token)),
        }
    }

    /// The row-id of the type
    #[must_use]
    pub fn rid(&self) -> u32 {
        self.token.row()
    }

    /// The generic context of a type specification
    #[must_use]
    pub fn generic_context(&self) -> Option<&GenericParamContext> {
        match &self.kind {
            TypeDefOrRefKind::TypeSpec(context) => Some(context),
            _ => None,
        }
    }

    /// `#Strings` index of the type name, for `TypeDef` and `TypeRef` rows
    #[must_use]
    pub fn name_index(&self) -> Option<u32> {
        match (&self.kind, &self.row) {
            (TypeDefOrRefKind::TypeDef, Some(row)) | (TypeDefOrRefKind::TypeRef, Some(row)) => {
                row.column(1)
            }
            _ => None,
        }
    }

    /// `#Blob` index of the signature, for `TypeSpec` rows
    #[must_use]
    pub fn signature_index(&self) -> Option<u32> {
        match (&self.kind, &self.row) {
            (TypeDefOrRefKind::TypeSpec(_), Some(row)) => row.column(0),
            _ => None,
        }
    }
}
