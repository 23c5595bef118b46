//! Binding of generic parameter references to their declaring entity.
//!
//! A signature may refer to "generic parameter #N of the enclosing type" (`!N`) or "of the
//! enclosing method" (`!!N`). Which declaration that is depends on where the signature is
//! used, so resolution carries a [`GenericParamContext`] naming the enclosing type and
//! method.

use crate::metadata::{tables::TableId, token::Token};

/// A generic parameter reference as it appears in a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GenericVar {
    /// `!N`, a parameter of the enclosing type
    Type(u32),
    /// `!!N`, a parameter of the enclosing method
    Method(u32),
}

/// A generic parameter reference bound to its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundGenericParam {
    /// The declaring `TypeDef` or `MethodDef`
    pub owner: Token,
    /// Position in the owner's parameter list
    pub number: u32,
}

/// The generic declarations enclosing a resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct GenericParamContext {
    type_def: Option<Token>,
    method: Option<Token>,
}

impl GenericParamContext {
    /// A context without enclosing declarations
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The context of a type's own signatures
    #[must_use]
    pub fn for_type(type_def: Token) -> Self {
        GenericParamContext {
            type_def: Some(type_def),
            method: None,
        }
    }

    /// The context of a method declared by `type_def`
    #[must_use]
    pub fn for_method(type_def: Option<Token>, method: Token) -> Self {
        GenericParamContext {
            type_def,
            method: Some(method),
        }
    }

    /// The enclosing type, if any
    #[must_use]
    pub fn type_def(&self) -> Option<Token> {
        self.type_def
    }

    /// The enclosing method, if any
    #[must_use]
    pub fn method(&self) -> Option<Token> {
        self.method
    }

    /// Returns true if neither a type nor a method encloses the resolution
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.type_def.is_none() && self.method.is_none()
    }

    /// Bind `var` to its owner. Returns `None` if the context has no matching declaration.
    #[must_use]
    pub fn bind(&self, var: GenericVar) -> Option<BoundGenericParam> {
        match var {
            GenericVar::Type(number) => {
                self.type_def.map(|owner| BoundGenericParam { owner, number })
            }
            GenericVar::Method(number) => {
                self.method.map(|owner| BoundGenericParam { owner, number })
            }
        }
    }
}

impl BoundGenericParam {
    /// Returns true if the owner is a method
    #[must_use]
    pub fn is_method_param(&self) -> bool {
        self.owner.table_id() == Some(TableId::MethodDef)
    }
}
