//! Raw CustomAttribute table rows.

use crate::{
    metadata::{
        tables::{CodedIndex, CodedIndexType, CustomAttribute, RawRow, TableId},
        token::Token,
    },
    Error::MalformedTable,
    Result,
};

/// Raw CustomAttribute table entry.
///
/// # Table Structure (ECMA-335 §22.10)
/// | Column | Size | Description |
/// |--------|------|-------------|
/// | Parent | HasCustomAttribute coded index | The entity the attribute is attached to |
/// | Type | CustomAttributeType coded index | The attribute constructor (`MethodDef` or `MemberRef`) |
/// | Value | Blob heap index | The encoded constructor arguments |
///
/// The table is sorted by `Parent` in images produced by conforming compilers, which lets
/// all attributes of one entity be found with a binary search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustomAttributeRaw {
    /// Row identifier within the CustomAttribute table
    pub rid: u32,
    /// Metadata token for this entry (TableId 0x0C)
    pub token: Token,
    /// Byte offset of this entry within the tables stream
    pub offset: usize,
    /// The owning entity
    pub parent: CodedIndex,
    /// The attribute constructor
    pub constructor: CodedIndex,
    /// `#Blob` index of the attribute value
    pub value: u32,
}

impl CustomAttributeRaw {
    /// Convert a generic [`RawRow`] of the CustomAttribute table.
    ///
    /// # Errors
    /// Returns [`crate::Error::MalformedTable`] if `row` belongs to another table or a coded
    /// index carries an invalid tag
    pub fn from_raw(row: &RawRow) -> Result<CustomAttributeRaw> {
        let malformed = |message: String| MalformedTable {
            table: TableId::CustomAttribute,
            message,
        };

        if row.table != TableId::CustomAttribute {
            return Err(malformed(format!(
                "row {} of {:?} is not a CustomAttribute",
                row.rid, row.table
            )));
        }

        let parent = row
            .coded(0, CodedIndexType::HasCustomAttribute)
            .map_err(|error| malformed(format!("row {} parent - {}", row.rid, error)))?;
        let constructor = row
            .coded(1, CodedIndexType::CustomAttributeType)
            .map_err(|error| malformed(format!("row {} type - {}", row.rid, error)))?;
        let value = row
            .column(2)
            .ok_or_else(|| malformed(format!("row {} has no Value column", row.rid)))?;

        Ok(CustomAttributeRaw {
            rid: row.rid,
            token: row.token(),
            offset: row.offset,
            parent,
            constructor,
            value,
        })
    }

    /// The owned form of this row
    #[must_use]
    pub fn to_attribute(&self) -> CustomAttribute {
        CustomAttribute {
            rid: self.rid,
            orig_rid: Some(self.rid),
            parent: self.parent.clone(),
            constructor: self.constructor.clone(),
            value: self.value,
        }
    }
}
