//! The compressed metadata tables stream (`#~`, and the uncompressed `#-` variant).
//!
//! The stream starts with a fixed header followed by one row count for every table present
//! in the `valid` mask. Rows of all present tables follow back to back, in ascending table
//! order, each table packed with a fixed row size.
//!
//! # Layout
//!
//! | Offset | Size | Field        | Description                                  |
//! |--------|------|--------------|----------------------------------------------|
//! | 0      | 4    | Reserved     | Always 0                                     |
//! | 4      | 1    | MajorVersion | Major version of the table schema            |
//! | 5      | 1    | MinorVersion | Minor version of the table schema            |
//! | 6      | 1    | HeapSizes    | Index widths of the heaps, see [`HeapSizes`] |
//! | 7      | 1    | Reserved     | Always 1                                     |
//! | 8      | 8    | Valid        | Bit mask of present tables                   |
//! | 16     | 8    | Sorted       | Bit mask of sorted tables                    |
//! | 24     | 4*n  | Rows         | Row count of each present table              |
//!
//! If [`HeapSizes::EXTRA_DATA`] is set, an additional 4 byte value follows the row counts.
//!
//! Row reads are pure. Nothing is cached here, every call decodes from the stream bytes.

use crate::{
    file::{io::read_le_at_dyn, ByteStream},
    metadata::{
        ridlist::RidList,
        tables::{
            schema::columns, HeapSizes, RawRow, RowReadable, TableId, TableInfo, TableInfoRef,
            TABLE_SLOTS,
        },
    },
    Error::{InvalidRowId, MalformedTable},
    Result,
};

use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default)]
struct TableLayout {
    offset: usize,
    rows: u32,
    row_size: u32,
}

/// Row access into a metadata tables stream.
///
/// # Example
///
/// ```rust,ignore
/// use cilimage::metadata::{streams::TablesStream, tables::TableId};
///
/// let tables = TablesStream::from(stream)?;
/// for rid in 1..=tables.row_count(TableId::InterfaceImpl) {
///     let row = tables.read_row(TableId::InterfaceImpl, rid)?;
///     println!("{:?}", row.columns);
/// }
/// ```
#[derive(Clone, Debug)]
pub struct TablesStream {
    data: ByteStream,
    /// Major version of the table schema
    pub major_version: u8,
    /// Minor version of the table schema
    pub minor_version: u8,
    /// Index width flags of the heaps
    pub heap_sizes: HeapSizes,
    /// Bit mask of present tables
    pub valid: u64,
    /// Bit mask of sorted tables
    pub sorted: u64,
    info: TableInfoRef,
    tables: Vec<TableLayout>,
}

impl TablesStream {
    /// Parse the header of a tables stream and compute the position of every table.
    ///
    /// Row data is not validated here. A table that extends past the stream is reported
    /// by the first read that touches the missing bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the header or the row counts are truncated,
    /// or a table unknown to this crate has rows
    pub fn from(data: ByteStream) -> Result<TablesStream> {
        let bytes = data.data();
        if bytes.len() < 24 {
            return Err(malformed_error!(
                "Tables stream too short - {} bytes",
                bytes.len()
            ));
        }

        let mut cursor = data.clone();
        cursor.seek(4)?;
        let major_version = cursor.read_le::<u8>()?;
        let minor_version = cursor.read_le::<u8>()?;
        let heap_sizes = HeapSizes::from_bits_truncate(cursor.read_le::<u8>()?);
        cursor.seek(8)?;
        let valid = cursor.read_le::<u64>()?;
        let sorted = cursor.read_le::<u64>()?;

        let mut row_counts = Vec::with_capacity(valid.count_ones() as usize);
        for bit in 0..64u8 {
            if valid & (1u64 << bit) == 0 {
                continue;
            }

            let rows = cursor
                .read_le::<u32>()
                .map_err(|_| malformed_error!("Row count of table 0x{:02x} is truncated", bit))?;

            match TableId::from_u8(bit) {
                Some(table) => row_counts.push((table, rows)),
                None if rows == 0 => {}
                None => {
                    return Err(malformed_error!(
                        "Unknown table 0x{:02x} with {} rows",
                        bit,
                        rows
                    ))
                }
            }
        }

        if heap_sizes.contains(HeapSizes::EXTRA_DATA) {
            cursor
                .advance_by(4)
                .map_err(|_| malformed_error!("Extra data of the tables stream is truncated"))?;
        }

        let info = Arc::new(TableInfo::new(&row_counts, heap_sizes));
        let mut tables = vec![TableLayout::default(); TABLE_SLOTS];
        let mut offset = cursor.pos() as u64;
        for (table, rows) in &row_counts {
            let row_size = info.row_size(*table);
            tables[*table as usize] = TableLayout {
                offset: usize::try_from(offset)
                    .map_err(|_| malformed_error!("Table {:?} starts out of range", table))?,
                rows: *rows,
                row_size,
            };

            offset = offset
                .checked_add(u64::from(*rows) * u64::from(row_size))
                .ok_or_else(|| malformed_error!("Table {:?} is too large", table))?;
        }

        tracing::debug!(
            "tables stream v{}.{} - {} tables, {} bytes of rows",
            major_version,
            minor_version,
            row_counts.len(),
            offset.saturating_sub(cursor.pos() as u64)
        );

        Ok(TablesStream {
            data,
            major_version,
            minor_version,
            heap_sizes,
            valid,
            sorted,
            info,
            tables,
        })
    }

    /// The sizing context shared by every row of this stream
    #[must_use]
    pub fn info(&self) -> &TableInfoRef {
        &self.info
    }

    /// Number of tables present in the stream
    #[must_use]
    pub fn table_count(&self) -> u32 {
        self.valid.count_ones()
    }

    /// Number of rows of `table`, 0 if the table is not present
    #[must_use]
    pub fn row_count(&self, table: TableId) -> u32 {
        self.tables[table as usize].rows
    }

    /// Returns true if the `sorted` mask marks `table` as sorted by its key column
    #[must_use]
    pub fn is_sorted(&self, table: TableId) -> bool {
        self.sorted & (1u64 << (table as u8)) != 0
    }

    /// Size of one row of `table` in bytes
    #[must_use]
    pub fn row_size(&self, table: TableId) -> u32 {
        self.tables[table as usize].row_size
    }

    fn row_range(&self, table: TableId, rid: u32) -> Result<(usize, usize)> {
        let layout = &self.tables[table as usize];
        if rid == 0 || rid > layout.rows {
            return Err(InvalidRowId { table, rid });
        }

        let start = (rid as usize - 1)
            .checked_mul(layout.row_size as usize)
            .and_then(|delta| delta.checked_add(layout.offset));
        let end = start.and_then(|start| start.checked_add(layout.row_size as usize));

        match (start, end) {
            (Some(start), Some(end)) if end <= self.data.len() => Ok((start, end)),
            _ => Err(MalformedTable {
                table,
                message: format!(
                    "row {} extends past the end of the stream (0x{:x} bytes)",
                    rid,
                    self.data.len()
                ),
            }),
        }
    }

    /// Decode row `rid` of `table`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidRowId`] for rid 0 or a rid beyond the row count, and
    /// [`crate::Error::MalformedTable`] if the row extends past the stream
    pub fn read_row(&self, table: TableId, rid: u32) -> Result<RawRow> {
        let (start, _) = self.row_range(table, rid)?;
        let mut offset = start;
        RawRow::read(table, self.data.data(), &mut offset, rid, &self.info)
    }

    /// Decode row `rid` into its typed form.
    ///
    /// # Errors
    /// Same as [`TablesStream::read_row`], plus any decoding error of `T`
    pub fn read<T: RowReadable>(&self, rid: u32) -> Result<T> {
        let (start, _) = self.row_range(T::TABLE, rid)?;
        let mut offset = start;
        T::row_read(self.data.data(), &mut offset, rid, &self.info)
    }

    /// Read a single column of row `rid`.
    ///
    /// # Errors
    /// Same as [`TablesStream::read_row`], or [`crate::Error::Malformed`] if `table` has no
    /// column `column`
    pub fn column(&self, table: TableId, rid: u32, column: usize) -> Result<u32> {
        let layout = columns(table);
        let Some(target) = layout.get(column) else {
            return Err(malformed_error!("{:?} has no column {}", table, column));
        };

        let (start, _) = self.row_range(table, rid)?;
        let mut offset = start
            + layout[..column]
                .iter()
                .map(|c| self.info.column_bytes(c.kind) as usize)
                .sum::<usize>();

        match self.info.column_bytes(target.kind) {
            1 => self
                .data
                .data()
                .get(offset)
                .map(|value| u32::from(*value))
                .ok_or(crate::Error::OutOfBounds),
            width => read_le_at_dyn(self.data.data(), &mut offset, width == 4),
        }
    }

    /// All rows of `table` whose `column` equals `key`, in table order.
    ///
    /// Tables flagged as sorted are searched with a binary search and yield a
    /// [`RidList::Range`]. Everything else is scanned linearly.
    ///
    /// # Errors
    /// Returns an error if a visited row can not be read
    pub fn find_rows(&self, table: TableId, column: usize, key: u32) -> Result<RidList> {
        let rows = self.row_count(table);
        if rows == 0 {
            return Ok(RidList::empty());
        }

        if self.is_sorted(table) {
            let start = self.partition_point(table, column, rows, |value| value < key)?;
            let end = self.partition_point(table, column, rows, |value| value <= key)?;
            if start == end {
                return Ok(RidList::empty());
            }

            let start = u32::try_from(start)
                .map_err(|_| malformed_error!("Table {:?} has too many rows", table))?;
            let len = u32::try_from(end - u64::from(start))
                .map_err(|_| malformed_error!("Table {:?} has too many rows", table))?;
            return Ok(RidList::Range { start, len });
        }

        let mut rids = Vec::new();
        for rid in 1..=rows {
            if self.column(table, rid, column)? == key {
                rids.push(rid);
            }
        }

        Ok(RidList::from(rids))
    }

    /// First rid in `1..=rows + 1` for which `before` no longer holds
    fn partition_point<F>(&self, table: TableId, column: usize, rows: u32, before: F) -> Result<u64>
    where
        F: Fn(u32) -> bool,
    {
        let mut low = 1u64;
        let mut high = u64::from(rows) + 1;
        while low < high {
            let mid = low + (high - low) / 2;
            let rid = u32::try_from(mid)
                .map_err(|_| malformed_error!("Row-id {} of {:?} out of range", mid, table))?;
            if before(self.column(table, rid, column)?) {
                low = mid + 1;
            } else {
                high = mid;
            }
        }

        Ok(low)
    }
}
