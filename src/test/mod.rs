//! Shared test tooling: crafted PE images, crafted tables streams and a counting metadata
//! source.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crate::{
    file::ByteStream,
    metadata::{
        config::LoaderOptions,
        entity::MetadataSource,
        generics::GenericParamContext,
        ridlist::RidList,
        streams::TablesStream,
        tables::{
            schema::columns, CodedIndex, CodedIndexType, CustomAttributeRaw, CustomAttributeRc,
            HeapSizes, RawRow, TableId, TableInfo,
        },
        token::Token,
        typesystem::{TypeDefOrRef, TypeDefOrRefRc},
    },
    Error, Result,
};

const PE_OFFSET: usize = 0x80;
const OPTIONAL_HEADER: usize = PE_OFFSET + 0x18;
const SECTION_TABLE: usize = OPTIONAL_HEADER + 0xE0;
const CLR_DIRECTORY: usize = OPTIONAL_HEADER + 0xD0;

/// RVA of the CLR header placed by [`PeBuilder::metadata`]
pub const CLR_RVA: u32 = 0x2008;
/// RVA of the metadata root placed by [`PeBuilder::metadata`]
pub const METADATA_RVA: u32 = 0x2050;

struct Section {
    name: [u8; 8],
    virtual_address: u32,
    virtual_size: u32,
    pointer_to_raw_data: u32,
    size_of_raw_data: u32,
}

/// Builds minimal PE32 images.
pub struct PeBuilder {
    sections: Vec<Section>,
    file_len: usize,
    clr: Option<(u32, u32)>,
    patches: Vec<(usize, Vec<u8>)>,
}

impl PeBuilder {
    pub fn new() -> Self {
        PeBuilder {
            sections: Vec::new(),
            file_len: 0x400,
            clr: None,
            patches: Vec::new(),
        }
    }

    /// Two sections: `.text` (RVA 0x2000, 0x800 bytes in memory, 0x600 on disk at 0x400) and
    /// `.rsrc` (RVA 0x3000, 0x200 bytes at 0xA00), 0xC00 bytes in total
    pub fn scenario() -> Self {
        PeBuilder::new()
            .section(b".text", 0x2000, 0x800, 0x400, 0x600)
            .section(b".rsrc", 0x3000, 0x200, 0xA00, 0x200)
            .file_len(0xC00)
    }

    pub fn section(
        mut self,
        name: &[u8],
        virtual_address: u32,
        virtual_size: u32,
        pointer_to_raw_data: u32,
        size_of_raw_data: u32,
    ) -> Self {
        let mut padded = [0u8; 8];
        padded[..name.len()].copy_from_slice(name);
        self.sections.push(Section {
            name: padded,
            virtual_address,
            virtual_size,
            pointer_to_raw_data,
            size_of_raw_data,
        });
        self
    }

    pub fn file_len(mut self, len: usize) -> Self {
        self.file_len = len;
        self
    }

    pub fn clr(mut self, rva: u32, size: u32) -> Self {
        self.clr = Some((rva, size));
        self
    }

    /// Overwrite bytes at a file offset after the headers are written
    pub fn patch(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.patches.push((offset, bytes.to_vec()));
        self
    }

    /// Place a CLR header at [`CLR_RVA`] and a metadata root with a single `#~` stream holding
    /// `tables` at [`METADATA_RVA`]. Expects the `.text` section of [`PeBuilder::scenario`].
    pub fn metadata(self, tables: Vec<u8>) -> Self {
        let root = metadata_root(&tables);
        let root_len = root.len() as u32;

        let mut cor20 = vec![0u8; 72];
        cor20[0..4].copy_from_slice(&72u32.to_le_bytes());
        cor20[4..6].copy_from_slice(&2u16.to_le_bytes());
        cor20[6..8].copy_from_slice(&5u16.to_le_bytes());
        cor20[8..12].copy_from_slice(&METADATA_RVA.to_le_bytes());
        cor20[12..16].copy_from_slice(&root_len.to_le_bytes());
        cor20[16..20].copy_from_slice(&1u32.to_le_bytes());

        assert!(0x450 + root.len() <= 0xA00, "metadata does not fit into .text");
        self.clr(CLR_RVA, 72)
            .patch(0x408, &cor20)
            .patch(0x450, &root)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.file_len];

        // DOS header
        data[0..2].copy_from_slice(b"MZ");
        put_u32(&mut data, 0x3C, PE_OFFSET as u32);

        // COFF file header
        data[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");
        put_u16(&mut data, PE_OFFSET + 4, 0x014C);
        put_u16(&mut data, PE_OFFSET + 6, self.sections.len() as u16);
        put_u16(&mut data, PE_OFFSET + 20, 0xE0);
        put_u16(&mut data, PE_OFFSET + 22, 0x2102);

        // PE32 optional header
        let size_of_image = self
            .sections
            .iter()
            .map(|s| s.virtual_address + s.virtual_size.max(s.size_of_raw_data))
            .max()
            .unwrap_or(0x1000);
        put_u16(&mut data, OPTIONAL_HEADER, 0x010B);
        put_u32(&mut data, OPTIONAL_HEADER + 0x1C, 0x0040_0000);
        put_u32(&mut data, OPTIONAL_HEADER + 0x20, 0x1000);
        put_u32(&mut data, OPTIONAL_HEADER + 0x24, 0x200);
        put_u16(&mut data, OPTIONAL_HEADER + 0x28, 4);
        put_u16(&mut data, OPTIONAL_HEADER + 0x30, 4);
        put_u32(&mut data, OPTIONAL_HEADER + 0x38, (size_of_image + 0xFFF) & !0xFFF);
        put_u32(&mut data, OPTIONAL_HEADER + 0x3C, 0x400);
        put_u16(&mut data, OPTIONAL_HEADER + 0x44, 3);
        put_u32(&mut data, OPTIONAL_HEADER + 0x5C, 16);

        if let Some((rva, size)) = self.clr {
            put_u32(&mut data, CLR_DIRECTORY, rva);
            put_u32(&mut data, CLR_DIRECTORY + 4, size);
        }

        for (index, section) in self.sections.iter().enumerate() {
            let entry = SECTION_TABLE + index * 40;
            data[entry..entry + 8].copy_from_slice(&section.name);
            put_u32(&mut data, entry + 8, section.virtual_size);
            put_u32(&mut data, entry + 12, section.virtual_address);
            put_u32(&mut data, entry + 16, section.size_of_raw_data);
            put_u32(&mut data, entry + 20, section.pointer_to_raw_data);
            put_u32(&mut data, entry + 36, 0x6000_0020);
        }

        for (offset, bytes) in &self.patches {
            data[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }

        data
    }
}

fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// A `BSJB` metadata root with version `v4.0.30319` and one `#~` stream holding `tables`
pub fn metadata_root(tables: &[u8]) -> Vec<u8> {
    let version = b"v4.0.30319\0\0";
    let stream_offset = 16 + version.len() + 4 + 12;
    let stream_size = (tables.len() + 3) & !3;

    let mut root = Vec::with_capacity(stream_offset + stream_size);
    root.extend_from_slice(&0x424A_5342u32.to_le_bytes());
    root.extend_from_slice(&1u16.to_le_bytes());
    root.extend_from_slice(&1u16.to_le_bytes());
    root.extend_from_slice(&0u32.to_le_bytes());
    root.extend_from_slice(&(version.len() as u32).to_le_bytes());
    root.extend_from_slice(version);
    root.extend_from_slice(&0u16.to_le_bytes());
    root.extend_from_slice(&1u16.to_le_bytes());
    root.extend_from_slice(&(stream_offset as u32).to_le_bytes());
    root.extend_from_slice(&(stream_size as u32).to_le_bytes());
    root.extend_from_slice(b"#~\0\0");
    root.extend_from_slice(tables);
    root.resize(stream_offset + stream_size, 0);
    root
}

/// Builds `#~` streams from column values.
#[derive(Default)]
pub struct TablesBuilder {
    tables: Vec<(TableId, Vec<Vec<u32>>)>,
    sorted: u64,
    heap_sizes: u8,
    extra_data: Option<u32>,
}

impl TablesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table of `rows` rows with every column 0
    pub fn table(self, table: TableId, rows: usize) -> Self {
        let width = columns(table).len();
        self.table_rows(table, vec![vec![0; width]; rows])
    }

    /// A table with explicit column values, one `Vec` per row
    pub fn table_rows(mut self, table: TableId, rows: Vec<Vec<u32>>) -> Self {
        self.tables.retain(|(existing, _)| *existing != table);
        self.tables.push((table, rows));
        self
    }

    pub fn sorted(mut self, table: TableId) -> Self {
        self.sorted |= 1u64 << (table as u8);
        self
    }

    pub fn heap_sizes(mut self, flags: u8) -> Self {
        self.heap_sizes |= flags;
        self
    }

    pub fn extra_data(mut self, value: u32) -> Self {
        self.extra_data = Some(value);
        self.heap_sizes |= HeapSizes::EXTRA_DATA.bits();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut tables = self.tables.clone();
        tables.sort_by_key(|(table, _)| *table);

        let counts: Vec<(TableId, u32)> = tables
            .iter()
            .map(|(table, rows)| (*table, rows.len() as u32))
            .collect();
        let info = TableInfo::new(&counts, HeapSizes::from_bits_truncate(self.heap_sizes));
        let valid = tables
            .iter()
            .fold(0u64, |mask, (table, _)| mask | (1u64 << (*table as u8)));

        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(2);
        data.push(0);
        data.push(self.heap_sizes);
        data.push(1);
        data.extend_from_slice(&valid.to_le_bytes());
        data.extend_from_slice(&self.sorted.to_le_bytes());
        for (_, rows) in &counts {
            data.extend_from_slice(&rows.to_le_bytes());
        }
        if let Some(extra) = self.extra_data {
            data.extend_from_slice(&extra.to_le_bytes());
        }

        for (table, rows) in &tables {
            let layout = columns(*table);
            for row in rows {
                assert_eq!(row.len(), layout.len(), "{:?} row has wrong column count", table);
                for (column, value) in layout.iter().zip(row) {
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
}

/// Tables shared by the entity tests.
///
/// - `TypeDef` 3 rows, `TypeRef` 2 rows, `TypeSpec` 1 row, `MethodDef` 1 row
/// - `InterfaceImpl` (sorted): `1 -> TypeRef 1`, `1 -> TypeRef 2`, `2 -> TypeSpec 1`
/// - `CustomAttribute` (sorted): two on `InterfaceImpl 1`, one on `InterfaceImpl 3`
/// - `GenericParam` (unsorted): `!0`, `!1` of `TypeDef 2`, `!!0` of `MethodDef 1`
pub fn interface_impl_tables() -> Vec<u8> {
    let has_ca = |table, rid| {
        CodedIndexType::HasCustomAttribute
            .encode(table, rid)
            .unwrap()
    };
    let ca_type = |table, rid| {
        CodedIndexType::CustomAttributeType
            .encode(table, rid)
            .unwrap()
    };
    let owner = |table, rid| CodedIndexType::TypeOrMethodDef.encode(table, rid).unwrap();
    let tdor = |table, rid| CodedIndexType::TypeDefOrRef.encode(table, rid).unwrap();

    TablesBuilder::new()
        .table(TableId::TypeRef, 2)
        .table(TableId::TypeDef, 3)
        .table(TableId::MethodDef, 1)
        .table_rows(
            TableId::InterfaceImpl,
            vec![
                vec![1, tdor(TableId::TypeRef, 1)],
                vec![1, tdor(TableId::TypeRef, 2)],
                vec![2, tdor(TableId::TypeSpec, 1)],
            ],
        )
        .table_rows(
            TableId::CustomAttribute,
            vec![
                vec![
                    has_ca(TableId::InterfaceImpl, 1),
                    ca_type(TableId::MethodDef, 1),
                    0x10,
                ],
                vec![
                    has_ca(TableId::InterfaceImpl, 1),
                    ca_type(TableId::MemberRef, 1),
                    0x11,
                ],
                vec![
                    has_ca(TableId::InterfaceImpl, 3),
                    ca_type(TableId::MethodDef, 1),
                    0x12,
                ],
            ],
        )
        .table(TableId::TypeSpec, 1)
        .table_rows(
            TableId::GenericParam,
            vec![
                vec![0, 0, owner(TableId::TypeDef, 2), 0],
                vec![1, 0, owner(TableId::TypeDef, 2), 0],
                vec![0, 0, owner(TableId::MethodDef, 1), 0],
            ],
        )
        .sorted(TableId::InterfaceImpl)
        .sorted(TableId::CustomAttribute)
        .build()
}

/// A [`MetadataSource`] over a crafted tables stream that counts what it is asked to do.
///
/// Type references are resolved to a fresh object on every call, so identity seen by a
/// caller comes from its own caching.
pub struct StubSource {
    tables: TablesStream,
    options: LoaderOptions,
    row_reads: Mutex<HashMap<TableId, usize>>,
    resolutions: AtomicUsize,
    scans: AtomicUsize,
}

impl StubSource {
    pub fn new(tables: Vec<u8>, options: LoaderOptions) -> Arc<StubSource> {
        Arc::new(StubSource {
            tables: TablesStream::from(ByteStream::from_vec(tables)).unwrap(),
            options,
            row_reads: Mutex::new(HashMap::new()),
            resolutions: AtomicUsize::new(0),
            scans: AtomicUsize::new(0),
        })
    }

    /// Rows read from any table
    pub fn row_reads(&self) -> usize {
        self.row_reads.lock().unwrap().values().sum()
    }

    /// Rows read from `table`
    pub fn row_reads_of(&self, table: TableId) -> usize {
        self.row_reads
            .lock()
            .unwrap()
            .get(&table)
            .copied()
            .unwrap_or(0)
    }

    /// Calls to `resolve_type_def_or_ref` with a non-null reference
    pub fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }

    /// Custom attribute table scans
    pub fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    fn count_read(&self, table: TableId) {
        *self.row_reads.lock().unwrap().entry(table).or_default() += 1;
    }
}

impl MetadataSource for StubSource {
    fn options(&self) -> LoaderOptions {
        self.options
    }

    fn row_count(&self, table: TableId) -> u32 {
        self.tables.row_count(table)
    }

    fn read_row(&self, table: TableId, rid: u32) -> Result<RawRow> {
        self.count_read(table);
        self.tables.read_row(table, rid)
    }

    fn custom_attribute_rids(&self, parent: Token) -> Result<RidList> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        let Some(key) = parent
            .table_id()
            .and_then(|table| CodedIndexType::HasCustomAttribute.encode(table, parent.row()))
        else {
            return Err(Error::Error(format!("{} can not carry attributes", parent)));
        };

        self.tables.find_rows(TableId::CustomAttribute, 0, key)
    }

    fn read_custom_attribute(&self, rid: u32) -> Result<CustomAttributeRc> {
        let row = self.read_row(TableId::CustomAttribute, rid)?;
        Ok(Arc::new(CustomAttributeRaw::from_raw(&row)?.to_attribute()))
    }

    fn resolve_type_def_or_ref(
        &self,
        coded: &CodedIndex,
        context: &GenericParamContext,
    ) -> Result<Option<TypeDefOrRefRc>> {
        if coded.is_null() {
            return Ok(None);
        }

        self.resolutions.fetch_add(1, Ordering::SeqCst);
        if coded.row > self.tables.row_count(coded.tag) {
            return Ok(None);
        }

        let row = self.read_row(coded.tag, coded.row)?;
        Ok(Some(Arc::new(TypeDefOrRef::from_row(row, *context)?)))
    }
}
