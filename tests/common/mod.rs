//! Crafted images for the integration tests.
#![allow(dead_code)]

use cilimage::metadata::tables::{schema::columns, CodedIndexType, HeapSizes, TableId, TableInfo};

/// Encode a `#~` stream from explicit column values, tables in any order.
pub fn tables_stream(tables: &[(TableId, Vec<Vec<u32>>)], sorted: &[TableId]) -> Vec<u8> {
    let mut tables = tables.to_vec();
    tables.sort_by_key(|(table, _)| *table);

    let counts: Vec<(TableId, u32)> = tables
        .iter()
        .map(|(table, rows)| (*table, rows.len() as u32))
        .collect();
    let info = TableInfo::new(&counts, HeapSizes::empty());
    let valid = counts
        .iter()
        .fold(0u64, |mask, (table, _)| mask | 1 << (*table as u8));
    let sorted = sorted
        .iter()
        .fold(0u64, |mask, table| mask | 1 << (*table as u8));

    let mut data = vec![0, 0, 0, 0, 2, 0, 0, 1];
    data.extend_from_slice(&valid.to_le_bytes());
    data.extend_from_slice(&sorted.to_le_bytes());
    for (_, rows) in &counts {
        data.extend_from_slice(&rows.to_le_bytes());
    }

    for (table, rows) in &tables {
        for row in rows {
            for (column, value) in columns(*table).iter().zip(row) {
                match info.column_bytes(column.kind) {
                    1 => data.push(*value as u8),
                    2 => data.extend_from_slice(&(*value as u16).to_le_bytes()),
                    _ => data.extend_from_slice(&value.to_le_bytes()),
                }
            }
        }
    }

    data
}

fn zeroed(table: TableId, rows: usize) -> (TableId, Vec<Vec<u32>>) {
    (table, vec![vec![0; columns(table).len()]; rows])
}

/// `TypeDef` x3, `TypeRef` x2, a 3 row `InterfaceImpl` table and custom attributes on
/// `InterfaceImpl` 1 (two) and 3 (one).
pub fn interface_impl_tables(sorted: bool) -> Vec<u8> {
    let tdor = |table, rid| CodedIndexType::TypeDefOrRef.encode(table, rid).unwrap();
    let parent = |rid| {
        CodedIndexType::HasCustomAttribute
            .encode(TableId::InterfaceImpl, rid)
            .unwrap()
    };
    let ctor = CodedIndexType::CustomAttributeType
        .encode(TableId::MethodDef, 1)
        .unwrap();

    // unsorted images store the attributes out of parent order
    let attributes = if sorted {
        vec![
            vec![parent(1), ctor, 1],
            vec![parent(1), ctor, 2],
            vec![parent(3), ctor, 3],
        ]
    } else {
        vec![
            vec![parent(3), ctor, 3],
            vec![parent(1), ctor, 1],
            vec![parent(1), ctor, 2],
        ]
    };

    let mut sorted_tables = vec![TableId::InterfaceImpl];
    if sorted {
        sorted_tables.push(TableId::CustomAttribute);
    }

    tables_stream(
        &[
            zeroed(TableId::TypeRef, 2),
            zeroed(TableId::TypeDef, 3),
            zeroed(TableId::MethodDef, 1),
            (
                TableId::InterfaceImpl,
                vec![
                    vec![1, tdor(TableId::TypeRef, 1)],
                    vec![1, tdor(TableId::TypeRef, 2)],
                    vec![2, tdor(TableId::TypeDef, 3)],
                ],
            ),
            (TableId::CustomAttribute, attributes),
        ],
        &sorted_tables,
    )
}

fn put(data: &mut [u8], offset: usize, bytes: &[u8]) {
    data[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// A PE32 image with `.text` at RVA 0x2000 (0x800 bytes in memory, 0x600 on disk at 0x400)
/// and `.rsrc` at RVA 0x3000 (0x200 bytes at 0xA00). With `tables`, a CLR header at RVA
/// 0x2008 and a metadata root at RVA 0x2050 holding them as the `#~` stream.
pub fn image(tables: Option<&[u8]>) -> Vec<u8> {
    let mut data = vec![0u8; 0xC00];

    put(&mut data, 0, b"MZ");
    put(&mut data, 0x3C, &0x80u32.to_le_bytes());
    put(&mut data, 0x80, b"PE\0\0");
    put(&mut data, 0x84, &0x014Cu16.to_le_bytes());
    put(&mut data, 0x86, &2u16.to_le_bytes());
    put(&mut data, 0x94, &0xE0u16.to_le_bytes());
    put(&mut data, 0x96, &0x2102u16.to_le_bytes());

    let optional = 0x98;
    put(&mut data, optional, &0x010Bu16.to_le_bytes());
    put(&mut data, optional + 0x1C, &0x0040_0000u32.to_le_bytes());
    put(&mut data, optional + 0x20, &0x1000u32.to_le_bytes());
    put(&mut data, optional + 0x24, &0x200u32.to_le_bytes());
    put(&mut data, optional + 0x28, &4u16.to_le_bytes());
    put(&mut data, optional + 0x30, &4u16.to_le_bytes());
    put(&mut data, optional + 0x38, &0x4000u32.to_le_bytes());
    put(&mut data, optional + 0x3C, &0x400u32.to_le_bytes());
    put(&mut data, optional + 0x44, &3u16.to_le_bytes());
    put(&mut data, optional + 0x5C, &16u32.to_le_bytes());

    #[rustfmt::skip]
    let sections: [(&[u8; 8], u32, u32, u32, u32); 2] = [
        (b".text\0\0\0", 0x800, 0x2000, 0x600, 0x400),
        (b".rsrc\0\0\0", 0x200, 0x3000, 0x200, 0xA00),
    ];
    for (index, (name, vsize, va, raw_size, raw_ptr)) in sections.iter().enumerate() {
        let entry = 0x178 + index * 40;
        put(&mut data, entry, *name);
        put(&mut data, entry + 8, &vsize.to_le_bytes());
        put(&mut data, entry + 12, &va.to_le_bytes());
        put(&mut data, entry + 16, &raw_size.to_le_bytes());
        put(&mut data, entry + 20, &raw_ptr.to_le_bytes());
    }

    if let Some(tables) = tables {
        let version = b"v4.0.30319\0\0";
        let stream_offset = 16 + version.len() + 4 + 12;
        let stream_size = (tables.len() + 3) & !3;

        let mut root = Vec::new();
        root.extend_from_slice(b"BSJB");
        root.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0, 0]);
        root.extend_from_slice(&(version.len() as u32).to_le_bytes());
        root.extend_from_slice(version);
        root.extend_from_slice(&[0, 0, 1, 0]);
        root.extend_from_slice(&(stream_offset as u32).to_le_bytes());
        root.extend_from_slice(&(stream_size as u32).to_le_bytes());
        root.extend_from_slice(b"#~\0\0");
        root.extend_from_slice(tables);
        root.resize(stream_offset + stream_size, 0);

        // CLR runtime header directory
        put(&mut data, optional + 0xD0, &0x2008u32.to_le_bytes());
        put(&mut data, optional + 0xD4, &72u32.to_le_bytes());

        put(&mut data, 0x408, &72u32.to_le_bytes());
        put(&mut data, 0x40C, &[2, 0, 5, 0]);
        put(&mut data, 0x410, &0x2050u32.to_le_bytes());
        put(&mut data, 0x414, &(root.len() as u32).to_le_bytes());
        put(&mut data, 0x418, &1u32.to_le_bytes());
        put(&mut data, 0x450, &root);
    }

    data
}
