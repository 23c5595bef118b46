//! Column layouts of every metadata table.
//!
//! Only the column *kinds* are fixed; their widths depend on the [`super::TableInfo`] of the
//! stream they are read from.

use crate::metadata::tables::{CodedIndexType, TableId};

/// The kind of value stored in a column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// A 1 byte constant
    U8,
    /// A 2 byte constant
    U16,
    /// A 4 byte constant
    U32,
    /// An index into the `#Strings` heap
    Str,
    /// An index into the `#GUID` heap
    Guid,
    /// An index into the `#Blob` heap
    Blob,
    /// A row-id of the given table
    Table(TableId),
    /// A coded index
    Coded(CodedIndexType),
}

/// One column of a table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    /// Column name as used in ECMA-335
    pub name: &'static str,
    /// What the column stores
    pub kind: ColumnKind,
}

const fn col(name: &'static str, kind: ColumnKind) -> Column {
    Column { name, kind }
}

// Evaluates the column list in a const context so the slice is `'static`
macro_rules! layout {
    ($($column:expr),* $(,)?) => {{
        const COLUMNS: &[Column] = &[$($column),*];
        COLUMNS
    }};
}

use ColumnKind::{Blob, Coded, Guid, Str, Table, U16, U32, U8};

/// The columns of `table`, in storage order.
#[must_use]
pub fn columns(table: TableId) -> &'static [Column] {
    match table {
        TableId::Module => layout![
            col("Generation", U16),
            col("Name", Str),
            col("Mvid", Guid),
            col("EncId", Guid),
            col("EncBaseId", Guid),
        ],
        TableId::TypeRef => layout![
            col("ResolutionScope", Coded(CodedIndexType::ResolutionScope)),
            col("TypeName", Str),
            col("TypeNamespace", Str),
        ],
        TableId::TypeDef => layout![
            col("Flags", U32),
            col("TypeName", Str),
            col("TypeNamespace", Str),
            col("Extends", Coded(CodedIndexType::TypeDefOrRef)),
            col("FieldList", Table(TableId::Field)),
            col("MethodList", Table(TableId::MethodDef)),
        ],
        TableId::FieldPtr => layout![col("Field", Table(TableId::Field))],
        TableId::Field => layout![col("Flags", U16), col("Name", Str), col("Signature", Blob)],
        TableId::MethodPtr => layout![col("Method", Table(TableId::MethodDef))],
        TableId::MethodDef => layout![
            col("RVA", U32),
            col("ImplFlags", U16),
            col("Flags", U16),
            col("Name", Str),
            col("Signature", Blob),
            col("ParamList", Table(TableId::Param)),
        ],
        TableId::ParamPtr => layout![col("Param", Table(TableId::Param))],
        TableId::Param => layout![col("Flags", U16), col("Sequence", U16), col("Name", Str)],
        TableId::InterfaceImpl => layout![
            col("Class", Table(TableId::TypeDef)),
            col("Interface", Coded(CodedIndexType::TypeDefOrRef)),
        ],
        TableId::MemberRef => layout![
            col("Class", Coded(CodedIndexType::MemberRefParent)),
            col("Name", Str),
            col("Signature", Blob),
        ],
        TableId::Constant => layout![
            col("Type", U8),
            col("Padding", U8),
            col("Parent", Coded(CodedIndexType::HasConstant)),
            col("Value", Blob),
        ],
        TableId::CustomAttribute => layout![
            col("Parent", Coded(CodedIndexType::HasCustomAttribute)),
            col("Type", Coded(CodedIndexType::CustomAttributeType)),
            col("Value", Blob),
        ],
        TableId::FieldMarshal => layout![
            col("Parent", Coded(CodedIndexType::HasFieldMarshal)),
            col("NativeType", Blob),
        ],
        TableId::DeclSecurity => layout![
            col("Action", U16),
            col("Parent", Coded(CodedIndexType::HasDeclSecurity)),
            col("PermissionSet", Blob),
        ],
        TableId::ClassLayout => layout![
            col("PackingSize", U16),
            col("ClassSize", U32),
            col("Parent", Table(TableId::TypeDef)),
        ],
        TableId::FieldLayout => layout![col("Offset", U32), col("Field", Table(TableId::Field))],
        TableId::StandAloneSig => layout![col("Signature", Blob)],
        TableId::EventMap => layout![
            col("Parent", Table(TableId::TypeDef)),
            col("EventList", Table(TableId::Event)),
        ],
        TableId::EventPtr => layout![col("Event", Table(TableId::Event))],
        TableId::Event => layout![
            col("EventFlags", U16),
            col("Name", Str),
            col("EventType", Coded(CodedIndexType::TypeDefOrRef)),
        ],
        TableId::PropertyMap => layout![
            col("Parent", Table(TableId::TypeDef)),
            col("PropertyList", Table(TableId::Property)),
        ],
        TableId::PropertyPtr => layout![col("Property", Table(TableId::Property))],
        TableId::Property => layout![col("Flags", U16), col("Name", Str), col("Type", Blob)],
        TableId::MethodSemantics => layout![
            col("Semantics", U16),
            col("Method", Table(TableId::MethodDef)),
            col("Association", Coded(CodedIndexType::HasSemantics)),
        ],
        TableId::MethodImpl => layout![
            col("Class", Table(TableId::TypeDef)),
            col("MethodBody", Coded(CodedIndexType::MethodDefOrRef)),
            col("MethodDeclaration", Coded(CodedIndexType::MethodDefOrRef)),
        ],
        TableId::ModuleRef => layout![col("Name", Str)],
        TableId::TypeSpec => layout![col("Signature", Blob)],
        TableId::ImplMap => layout![
            col("MappingFlags", U16),
            col("MemberForwarded", Coded(CodedIndexType::MemberForwarded)),
            col("ImportName", Str),
            col("ImportScope", Table(TableId::ModuleRef)),
        ],
        TableId::FieldRVA => layout![col("RVA", U32), col("Field", Table(TableId::Field))],
        TableId::EncLog => layout![col("Token", U32), col("FuncCode", U32)],
        TableId::EncMap => layout![col("Token", U32)],
        TableId::Assembly => layout![
            col("HashAlgId", U32),
            col("MajorVersion", U16),
            col("MinorVersion", U16),
            col("BuildNumber", U16),
            col("RevisionNumber", U16),
            col("Flags", U32),
            col("PublicKey", Blob),
            col("Name", Str),
            col("Culture", Str),
        ],
        TableId::AssemblyProcessor => layout![col("Processor", U32)],
        TableId::AssemblyOS => layout![
            col("OSPlatformID", U32),
            col("OSMajorVersion", U32),
            col("OSMinorVersion", U32),
        ],
        TableId::AssemblyRef => layout![
            col("MajorVersion", U16),
            col("MinorVersion", U16),
            col("BuildNumber", U16),
            col("RevisionNumber", U16),
            col("Flags", U32),
            col("PublicKeyOrToken", Blob),
            col("Name", Str),
            col("Culture", Str),
            col("HashValue", Blob),
        ],
        TableId::AssemblyRefProcessor => layout![
            col("Processor", U32),
            col("AssemblyRef", Table(TableId::AssemblyRef)),
        ],
        TableId::AssemblyRefOS => layout![
            col("OSPlatformID", U32),
            col("OSMajorVersion", U32),
            col("OSMinorVersion", U32),
            col("AssemblyRef", Table(TableId::AssemblyRef)),
        ],
        TableId::File => layout![col("Flags", U32), col("Name", Str), col("HashValue", Blob)],
        TableId::ExportedType => layout![
            col("Flags", U32),
            col("TypeDefId", U32),
            col("TypeName", Str),
            col("TypeNamespace", Str),
            col("Implementation", Coded(CodedIndexType::Implementation)),
        ],
        TableId::ManifestResource => layout![
            col("Offset", U32),
            col("Flags", U32),
            col("Name", Str),
            col("Implementation", Coded(CodedIndexType::Implementation)),
        ],
        TableId::NestedClass => layout![
            col("NestedClass", Table(TableId::TypeDef)),
            col("EnclosingClass", Table(TableId::TypeDef)),
        ],
        TableId::GenericParam => layout![
            col("Number", U16),
            col("Flags", U16),
            col("Owner", Coded(CodedIndexType::TypeOrMethodDef)),
            col("Name", Str),
        ],
        TableId::MethodSpec => layout![
            col("Method", Coded(CodedIndexType::MethodDefOrRef)),
            col("Instantiation", Blob),
        ],
        TableId::GenericParamConstraint => layout![
            col("Owner", Table(TableId::GenericParam)),
            col("Constraint", Coded(CodedIndexType::TypeDefOrRef)),
        ],
        TableId::Document => layout![
            col("Name", Blob),
            col("HashAlgorithm", Guid),
            col("Hash", Blob),
            col("Language", Guid),
        ],
        TableId::MethodDebugInformation => layout![
            col("Document", Table(TableId::Document)),
            col("SequencePoints", Blob),
        ],
        TableId::LocalScope => layout![
            col("Method", Table(TableId::MethodDef)),
            col("ImportScope", Table(TableId::ImportScope)),
            col("VariableList", Table(TableId::LocalVariable)),
            col("ConstantList", Table(TableId::LocalConstant)),
            col("StartOffset", U32),
            col("Length", U32),
        ],
        TableId::LocalVariable => layout![
            col("Attributes", U16),
            col("Index", U16),
            col("Name", Str),
        ],
        TableId::LocalConstant => layout![col("Name", Str), col("Signature", Blob)],
        TableId::ImportScope => layout![
            col("Parent", Table(TableId::ImportScope)),
            col("Imports", Blob),
        ],
        TableId::StateMachineMethod => layout![
            col("MoveNextMethod", Table(TableId::MethodDef)),
            col("KickoffMethod", Table(TableId::MethodDef)),
        ],
        TableId::CustomDebugInformation => layout![
            col("Parent", Coded(CodedIndexType::HasCustomDebugInformation)),
            col("Kind", Guid),
            col("Value", Blob),
        ],
    }
}

/// Index of the column named `name` in `table`
#[must_use]
pub fn column_index(table: TableId, name: &str) -> Option<usize> {
    columns(table).iter().position(|column| column.name == name)
}
