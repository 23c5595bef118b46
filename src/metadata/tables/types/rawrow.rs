use crate::{
    file::io::read_le_at_dyn,
    metadata::{
        tables::{
            types::schema::{columns, ColumnKind},
            CodedIndex, CodedIndexType, TableId, TableInfo,
        },
        token::Token,
    },
    Result,
};

/// The undecoded column values of one row.
///
/// Heap indices and table indices are stored as read; coded indices keep their encoded
/// value and are decoded on request with [`RawRow::coded`]. A `RawRow` carries no identity
/// beyond its position and resolves nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRow {
    /// The table the row belongs to
    pub table: TableId,
    /// The row-id
    pub rid: u32,
    /// Offset of the row within the tables stream
    pub offset: usize,
    /// Column values in storage order
    pub columns: Vec<u32>,
}

impl RawRow {
    /// Decode one row of `table` starting at `offset` and advance `offset` past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the row extends past `data`
    pub fn read(
        table: TableId,
        data: &[u8],
        offset: &mut usize,
        rid: u32,
        info: &TableInfo,
    ) -> Result<RawRow> {
        let start = *offset;
        let layout = columns(table);
        let mut values = Vec::with_capacity(layout.len());

        for column in layout {
            let value = match column.kind {
                ColumnKind::U8 => {
                    let value = data.get(*offset).copied().ok_or(crate::Error::OutOfBounds)?;
                    *offset += 1;
                    u32::from(value)
                }
                kind => read_le_at_dyn(data, offset, info.column_bytes(kind) == 4)?,
            };
            values.push(value);
        }

        Ok(RawRow {
            table,
            rid,
            offset: start,
            columns: values,
        })
    }

    /// The token of this row
    #[must_use]
    pub fn token(&self) -> Token {
        Token::from_parts(self.table, self.rid)
    }

    /// The value of column `index`
    #[must_use]
    pub fn column(&self, index: usize) -> Option<u32> {
        self.columns.get(index).copied()
    }

    /// Decode column `index` as a coded index of kind `ci_type`.
    ///
    /// # Errors
    /// Returns an error if the column does not exist or its tag is invalid
    pub fn coded(&self, index: usize, ci_type: CodedIndexType) -> Result<CodedIndex> {
        let Some(value) = self.column(index) else {
            return Err(malformed_error!(
                "{:?} has no column {}",
                self.table,
                index
            ));
        };

        let (tag, row) = ci_type.decode(value)?;
        Ok(CodedIndex::new(tag, row))
    }
}
