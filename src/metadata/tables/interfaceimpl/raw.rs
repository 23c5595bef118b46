//! Raw InterfaceImpl table rows.
//!
//! [`InterfaceImplRaw`] is the direct representation of one `InterfaceImpl` row, with the
//! class index and the interface coded index decoded but not resolved.

use crate::{
    metadata::{
        tables::{CodedIndex, CodedIndexType, RawRow, TableId},
        token::Token,
    },
    Error::MalformedTable,
    Result,
};

/// Raw InterfaceImpl table entry with unresolved references.
///
/// # Table Structure (ECMA-335 §22.23)
/// | Column | Size | Description |
/// |--------|------|-------------|
/// | Class | TypeDef index | Type that implements the interface |
/// | Interface | TypeDefOrRef coded index | Interface being implemented |
///
/// The table is sorted by `Class`, and then by `Interface`, in images produced by
/// conforming compilers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceImplRaw {
    /// Row identifier within the InterfaceImpl table
    pub rid: u32,

    /// Metadata token for this entry (TableId 0x09)
    pub token: Token,

    /// Byte offset of this entry within the tables stream
    pub offset: usize,

    /// TypeDef table index of the implementing type, 0 if absent
    pub class: u32,

    /// TypeDefOrRef coded index of the implemented interface.
    ///
    /// - **Tag 0**: TypeDef table (interfaces in the current module)
    /// - **Tag 1**: TypeRef table (interfaces from other modules)
    /// - **Tag 2**: TypeSpec table (generic interface instantiations)
    pub interface: CodedIndex,
}

impl InterfaceImplRaw {
    /// Convert a generic [`RawRow`] of the InterfaceImpl table.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedTable`] if `row` belongs to another table or its
    /// interface column carries an invalid tag
    pub fn from_raw(row: &RawRow) -> Result<InterfaceImplRaw> {
        if row.table != TableId::InterfaceImpl {
            return Err(MalformedTable {
                table: TableId::InterfaceImpl,
                message: format!("row {} of {:?} is not an InterfaceImpl", row.rid, row.table),
            });
        }

        let class = row.column(0).ok_or_else(|| MalformedTable {
            table: TableId::InterfaceImpl,
            message: format!("row {} has no Class column", row.rid),
        })?;
        let interface = row
            .coded(1, CodedIndexType::TypeDefOrRef)
            .map_err(|error| MalformedTable {
                table: TableId::InterfaceImpl,
                message: format!("row {} - {}", row.rid, error),
            })?;

        Ok(InterfaceImplRaw {
            rid: row.rid,
            token: row.token(),
            offset: row.offset,
            class,
            interface,
        })
    }

    /// Token of the implementing `TypeDef`, `None` if the column is null
    #[must_use]
    pub fn class_token(&self) -> Option<Token> {
        (self.class != 0).then(|| Token::from_parts(TableId::TypeDef, self.class))
    }
}
