//! The contract between table-backed entities and the module they were read from.
//!
//! Entities come in two flavours that answer the same accessors:
//!
//! - *Materialized* entities are created for an existing row. They remember the row-id they
//!   were read from (`orig_rid`), read the row on first use and resolve each field lazily
//!   through a [`MetadataSource`].
//! - *User-created* entities are built in memory. They have no `orig_rid`, store plain
//!   values and never touch image bytes.
//!
//! A materialized entity holds its source only weakly. Once the module is dropped, any
//! field that still needs the image fails with [`crate::Error::ContainerDropped`], while
//! already resolved fields stay readable.

use std::sync::{Arc, Weak};

use crate::{
    metadata::{
        config::LoaderOptions,
        generics::GenericParamContext,
        ridlist::RidList,
        tables::{CodedIndex, CustomAttributeCollection, CustomAttributeRc, RawRow, TableId},
        token::Token,
        typesystem::TypeDefOrRefRc,
    },
    Error::ContainerDropped,
    Result,
};

/// Row access and cross-reference resolution for materialized entities.
///
/// Implemented by [`crate::metadata::cilmodule::CilModule`]. Every method must be safe to
/// call from any thread.
pub trait MetadataSource: Send + Sync {
    /// The options entities created from this source follow
    fn options(&self) -> LoaderOptions;

    /// Number of rows of `table`
    fn row_count(&self, table: TableId) -> u32;

    /// Read row `rid` of `table`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidRowId`] or [`crate::Error::MalformedTable`] if the
    /// row can not be read
    fn read_row(&self, table: TableId, rid: u32) -> Result<RawRow>;

    /// Row-ids of all `CustomAttribute` rows whose parent is `parent`.
    ///
    /// # Errors
    /// Returns an error if `parent` can not carry custom attributes or the table scan fails
    fn custom_attribute_rids(&self, parent: Token) -> Result<RidList>;

    /// The custom attribute stored in row `rid`.
    ///
    /// # Errors
    /// Returns an error if the row can not be read
    fn read_custom_attribute(&self, rid: u32) -> Result<CustomAttributeRc>;

    /// Resolve a `TypeDefOrRef` reference under `context`.
    ///
    /// Returns `None` for a null reference, or for a row-id beyond its table unless the
    /// source is strict about references.
    ///
    /// # Errors
    /// Returns an error if the referenced row can not be read
    fn resolve_type_def_or_ref(
        &self,
        coded: &CodedIndex,
        context: &GenericParamContext,
    ) -> Result<Option<TypeDefOrRefRc>>;
}

/// Upgrade the back-reference of a materialized entity.
pub(crate) fn upgrade(source: &Weak<dyn MetadataSource>) -> Result<Arc<dyn MetadataSource>> {
    source.upgrade().ok_or(ContainerDropped)
}

/// Accessors shared by every table-backed entity.
pub trait MetadataEntity {
    /// The table rows of this entity live in
    const TABLE: TableId;

    /// Tag of this entity's table within the `HasCustomAttribute` coded index
    const HAS_CUSTOM_ATTRIBUTE_TAG: u32;

    /// The current row-id
    fn rid(&self) -> u32;

    /// Assign a new row-id, e.g. when rows are reordered before writing
    fn set_rid(&mut self, rid: u32);

    /// The row-id this entity was read from, `None` for user-created entities
    fn orig_rid(&self) -> Option<u32>;

    /// The custom attributes attached to this entity.
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table can not be scanned
    fn custom_attributes(&self) -> Result<&CustomAttributeCollection>;

    /// The token built from the current row-id
    fn token(&self) -> Token {
        Token::from_parts(Self::TABLE, self.rid())
    }

    /// Tag of this entity's table within the `HasCustomAttribute` coded index
    fn has_custom_attribute_tag(&self) -> u32 {
        Self::HAS_CUSTOM_ATTRIBUTE_TAG
    }

    /// Returns true if at least one custom attribute is attached.
    ///
    /// # Errors
    /// Same as [`MetadataEntity::custom_attributes`]
    fn has_custom_attributes(&self) -> Result<bool> {
        Ok(!self.custom_attributes()?.is_empty())
    }
}
