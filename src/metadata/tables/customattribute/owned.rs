use std::sync::Arc;

use crate::{
    metadata::{
        tables::{CodedIndex, CodedIndexType, TableId},
        token::Token,
    },
    Result,
};

/// A shared [`CustomAttribute`]
pub type CustomAttributeRc = Arc<CustomAttribute>;

/// A custom attribute attached to a metadata entity.
///
/// The value blob is kept as a heap index; decoding the constructor arguments needs the
/// constructor's signature and is left to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomAttribute {
    /// The current row-id
    pub rid: u32,
    /// The row-id this attribute was read from, `None` if built in memory
    pub orig_rid: Option<u32>,
    /// The owning entity
    pub parent: CodedIndex,
    /// The attribute constructor, a `MethodDef` or `MemberRef`
    pub constructor: CodedIndex,
    /// `#Blob` index of the attribute value
    pub value: u32,
}

impl CustomAttribute {
    /// A new attribute on `parent`, created by calling `constructor` with the arguments
    /// stored at blob index `value`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `parent` can not carry custom attributes or
    /// `constructor` is neither a `MethodDef` nor a `MemberRef`
    pub fn new(parent: Token, constructor: Token, value: u32) -> Result<CustomAttribute> {
        let parent = Self::coded(parent, CodedIndexType::HasCustomAttribute)?;
        let constructor = Self::coded(constructor, CodedIndexType::CustomAttributeType)?;

        Ok(CustomAttribute {
            rid: 0,
            orig_rid: None,
            parent,
            constructor,
            value,
        })
    }

    fn coded(token: Token, ci_type: CodedIndexType) -> Result<CodedIndex> {
        let coded = CodedIndex::try_from(token)?;
        if ci_type.encode(coded.tag, coded.row).is_none() {
            return Err(malformed_error!(
                "Token {} can not be encoded as {:?}",
                token,
                ci_type
            ));
        }

        Ok(coded)
    }

    /// The token built from the current row-id
    #[must_use]
    pub fn token(&self) -> Token {
        Token::from_parts(TableId::CustomAttribute, self.rid)
    }

    /// Returns true if this attribute was built in memory
    #[must_use]
    pub fn is_user_created(&self) -> bool {
        self.orig_rid.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_created() {
        let attribute =
            CustomAttribute::new(Token(0x0200_0001), Token(0x0A00_0004), 0x10).unwrap();

        assert!(attribute.is_user_created());
        assert_eq!(attribute.parent, CodedIndex::new(TableId::TypeDef, 1));
        assert_eq!(attribute.constructor, CodedIndex::new(TableId::MemberRef, 4));

        assert!(CustomAttribute::new(Token(0x0200_0001), Token(0x0200_0002), 0).is_err());
        assert!(CustomAttribute::new(Token(0x0C00_0001), Token(0x0600_0001), 0).is_err());
        assert!(CustomAttribute::new(Token(0), Token(0x0600_0001), 0).is_err());
    }
}
