use std::sync::Arc;

use bitflags::bitflags;
use strum::{EnumCount, IntoEnumIterator};

use crate::metadata::tables::{
    types::schema::{columns, ColumnKind},
    CodedIndexType, TableId, TABLE_SLOTS,
};

bitflags! {
    /// The `HeapSizes` byte of the tables stream header
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct HeapSizes: u8 {
        /// `#Strings` indices are 4 bytes wide
        const LARGE_STRINGS = 0x01;
        /// `#GUID` indices are 4 bytes wide
        const LARGE_GUID = 0x02;
        /// `#Blob` indices are 4 bytes wide
        const LARGE_BLOB = 0x04;
        /// Tables were written with padding (ENC)
        const PADDING = 0x08;
        /// Only deltas are stored (ENC)
        const DELTA_ONLY = 0x20;
        /// An extra dword follows the row counts
        const EXTRA_DATA = 0x40;
        /// Rows may be marked as deleted (ENC)
        const HAS_DELETE = 0x80;
    }
}

/// Row count and index width of one table.
#[derive(Clone, Copy, Default, PartialEq, Debug)]
pub struct TableRowInfo {
    /// Number of rows
    pub rows: u32,
    /// Bits needed to address every row
    pub bits: u8,
    /// Returns true if indices into this table are 4 bytes wide
    pub is_large: bool,
}

impl TableRowInfo {
    /// Size information for a table with `rows` rows
    #[must_use]
    pub fn new(rows: u32) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let bits = if rows == 0 {
            1
        } else {
            (32 - rows.leading_zeros()) as u8
        };

        Self {
            rows,
            bits,
            is_large: bits > 16,
        }
    }
}

/// Global sizing context of a tables stream.
///
/// Whether a heap or table index is stored in 2 or 4 bytes is decided once for the whole
/// metadata store, from the heap size flags and the row counts of every table. Row layouts
/// of all tables depend on it.
#[derive(Clone, Default, Debug)]
pub struct TableInfo {
    rows: Vec<TableRowInfo>,
    coded_indexes: Vec<u8>,
    heap_sizes: HeapSizes,
}

/// A shared [`TableInfo`]
pub type TableInfoRef = Arc<TableInfo>;

impl TableInfo {
    /// Build the sizing context from the row counts of the present tables.
    #[must_use]
    pub fn new(row_counts: &[(TableId, u32)], heap_sizes: HeapSizes) -> Self {
        let mut table_info = TableInfo {
            rows: vec![TableRowInfo::default(); TABLE_SLOTS],
            coded_indexes: vec![0; CodedIndexType::COUNT],
            heap_sizes,
        };

        for (table, rows) in row_counts {
            table_info.rows[*table as usize] = TableRowInfo::new(*rows);
        }

        table_info.calculate_coded_index_bits();
        table_info
    }

    #[cfg(test)]
    pub(crate) fn new_test(
        valid_tables: &[(TableId, u32)],
        large_str: bool,
        large_blob: bool,
        large_guid: bool,
    ) -> Self {
        let mut heap_sizes = HeapSizes::empty();
        heap_sizes.set(HeapSizes::LARGE_STRINGS, large_str);
        heap_sizes.set(HeapSizes::LARGE_BLOB, large_blob);
        heap_sizes.set(HeapSizes::LARGE_GUID, large_guid);

        Self::new(valid_tables, heap_sizes)
    }

    /// Size information of `table`
    #[must_use]
    pub fn get(&self, table: TableId) -> &TableRowInfo {
        &self.rows[table as usize]
    }

    /// The heap size flags
    #[must_use]
    pub fn heap_sizes(&self) -> HeapSizes {
        self.heap_sizes
    }

    /// Returns true if indices into `table` are 4 bytes wide
    #[must_use]
    pub fn is_large(&self, table: TableId) -> bool {
        self.rows[table as usize].is_large
    }

    /// Width of a `#Strings` index
    #[must_use]
    pub fn str_bytes(&self) -> u8 {
        if self.heap_sizes.contains(HeapSizes::LARGE_STRINGS) {
            4
        } else {
            2
        }
    }

    /// Width of a `#GUID` index
    #[must_use]
    pub fn guid_bytes(&self) -> u8 {
        if self.heap_sizes.contains(HeapSizes::LARGE_GUID) {
            4
        } else {
            2
        }
    }

    /// Width of a `#Blob` index
    #[must_use]
    pub fn blob_bytes(&self) -> u8 {
        if self.heap_sizes.contains(HeapSizes::LARGE_BLOB) {
            4
        } else {
            2
        }
    }

    /// Width of a simple index into `table`
    #[must_use]
    pub fn table_index_bytes(&self, table: TableId) -> u8 {
        if self.rows[table as usize].bits > 16 {
            4
        } else {
            2
        }
    }

    /// Bits needed by a coded index of `coded_index_type`
    #[must_use]
    pub fn coded_index_bits(&self, coded_index_type: CodedIndexType) -> u8 {
        self.coded_indexes[coded_index_type as usize]
    }

    /// Width of a coded index of `coded_index_type`
    #[must_use]
    pub fn coded_index_bytes(&self, coded_index_type: CodedIndexType) -> u8 {
        if self.coded_indexes[coded_index_type as usize] > 16 {
            4
        } else {
            2
        }
    }

    /// Width of one column
    #[must_use]
    pub fn column_bytes(&self, kind: ColumnKind) -> u8 {
        match kind {
            ColumnKind::U8 => 1,
            ColumnKind::U16 => 2,
            ColumnKind::U32 => 4,
            ColumnKind::Str => self.str_bytes(),
            ColumnKind::Guid => self.guid_bytes(),
            ColumnKind::Blob => self.blob_bytes(),
            ColumnKind::Table(table) => self.table_index_bytes(table),
            ColumnKind::Coded(coded) => self.coded_index_bytes(coded),
        }
    }

    /// Width of one row of `table`
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        columns(table)
            .iter()
            .map(|column| u32::from(self.column_bytes(column.kind)))
            .sum()
    }

    fn calculate_coded_index_bits(&mut self) {
        for coded_index in CodedIndexType::iter() {
            let max_bits = coded_index
                .tables()
                .iter()
                .flatten()
                .map(|table| self.rows[*table as usize].bits)
                .max()
                .unwrap_or(1);

            self.coded_indexes[coded_index as usize] = max_bits + coded_index.tag_bits();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_info() {
        assert_eq!(TableRowInfo::new(0).bits, 1);
        assert_eq!(TableRowInfo::new(1).bits, 1);
        assert_eq!(TableRowInfo::new(3).bits, 2);
        assert_eq!(TableRowInfo::new(0xFFFF).bits, 16);
        assert!(!TableRowInfo::new(0xFFFF).is_large);
        assert_eq!(TableRowInfo::new(0x1_0000).bits, 17);
        assert!(TableRowInfo::new(0x1_0000).is_large);
    }

    #[test]
    fn small() {
        let info = TableInfo::new_test(&[(TableId::InterfaceImpl, 3)], false, false, false);

        assert_eq!(info.get(TableId::InterfaceImpl).rows, 3);
        assert_eq!(info.str_bytes(), 2);
        assert_eq!(info.table_index_bytes(TableId::TypeDef), 2);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);
        assert_eq!(info.row_size(TableId::InterfaceImpl), 4);
        assert_eq!(info.row_size(TableId::CustomAttribute), 6);
        assert_eq!(info.row_size(TableId::TypeDef), 14);
    }

    #[test]
    fn large() {
        let info = TableInfo::new_test(
            &[(TableId::TypeDef, u32::MAX), (TableId::TypeSpec, 0x4000)],
            true,
            true,
            true,
        );

        assert_eq!(info.table_index_bytes(TableId::TypeDef), 4);
        assert_eq!(info.table_index_bytes(TableId::TypeSpec), 2);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
        assert_eq!(info.row_size(TableId::InterfaceImpl), 8);
        assert_eq!(info.row_size(TableId::Module), 2 + 4 * 4);
    }

    #[test]
    fn coded_index_threshold() {
        // 14 bits of rows + 2 tag bits still fit into 2 bytes
        let info = TableInfo::new_test(&[(TableId::TypeSpec, 0x3FFF)], false, false, false);
        assert_eq!(info.coded_index_bits(CodedIndexType::TypeDefOrRef), 16);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 2);

        let info = TableInfo::new_test(&[(TableId::TypeSpec, 0x4000)], false, false, false);
        assert_eq!(info.coded_index_bits(CodedIndexType::TypeDefOrRef), 17);
        assert_eq!(info.coded_index_bytes(CodedIndexType::TypeDefOrRef), 4);
    }
}
