//! Table identifiers, sizing context, coded indices and column layouts.

mod codedindex;
mod rawrow;
pub mod schema;
mod tableid;
mod tableinfo;

pub use codedindex::{CodedIndex, CodedIndexType};
pub use rawrow::RawRow;
pub use tableid::{TableId, TABLE_SLOTS};
pub use tableinfo::{HeapSizes, TableInfo, TableInfoRef, TableRowInfo};

use crate::Result;

/// A typed row that can be decoded straight from table bytes.
///
/// Implemented by the `*Raw` structs of the table modules. The layout must match the
/// table's column layout for the given [`TableInfo`].
pub trait RowReadable: Sized + Send {
    /// The table rows of this type live in
    const TABLE: TableId;

    /// Size of one row in bytes
    fn row_size(info: &TableInfoRef) -> u32;

    /// Decode one row at `offset`, advancing `offset` past it.
    ///
    /// # Errors
    /// Returns an error if the row is out of bounds or contains invalid coded indices
    fn row_read(data: &[u8], offset: &mut usize, rid: u32, info: &TableInfoRef) -> Result<Self>;
}
