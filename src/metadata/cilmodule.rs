//! The owning container of a module's metadata.
//!
//! [`CilModule`] opens the CLR runtime header, the metadata root and the tables stream of
//! an image, and hands out entities bound to it. Entities keep only a weak reference to
//! their module; the module in turn caches resolved type references so every entity
//! referencing the same row sees the same shared object.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilimage::metadata::{
//!     cilmodule::CilModule, config::LoaderOptions, entity::MetadataEntity,
//!     generics::GenericParamContext,
//! };
//! use std::path::Path;
//!
//! let module = CilModule::from_file(Path::new("tests/samples/sample.dll"), LoaderOptions::default())?;
//! for entry in module.interface_impls(&GenericParamContext::empty())? {
//!     if let Some(interface) = entry.interface()? {
//!         println!("{} implements {}", entry.token(), interface.token);
//!     }
//! }
//! # Ok::<(), cilimage::Error>(())
//! ```

use std::{
    path::Path,
    sync::{Arc, Weak},
};

use dashmap::DashMap;
use rayon::prelude::*;

use crate::{
    file::{AddressSpace, ByteStream, PeImage, Rva},
    metadata::{
        config::LoaderOptions,
        cor20header::Cor20Header,
        entity::MetadataSource,
        generics::{GenericParamContext, GenericVar},
        ridlist::RidList,
        root::Root,
        streams::TablesStream,
        tables::{
            CodedIndex, CodedIndexType, CustomAttributeRaw, CustomAttributeRc, InterfaceImpl,
            InterfaceImplMd, RawRow, TableId,
        },
        token::Token,
        typesystem::{TypeDefOrRef, TypeDefOrRefRc},
    },
    Error::{InvalidRowId, NotSupported},
    Result,
};

const INTERFACE_IMPL_CLASS: usize = 0;
const CUSTOM_ATTRIBUTE_PARENT: usize = 0;
const GENERIC_PARAM_NUMBER: usize = 0;
const GENERIC_PARAM_OWNER: usize = 2;

/// The metadata of one module.
///
/// Always handled through an `Arc`, entities created from it refer back to it weakly.
pub struct CilModule {
    image: Option<Arc<PeImage>>,
    cor20: Option<Cor20Header>,
    root: Option<Root>,
    tables: TablesStream,
    options: LoaderOptions,
    /// `TypeDef` and `TypeRef` objects by token
    types: DashMap<Token, TypeDefOrRefRc>,
    /// `TypeSpec` objects by token and the context they were resolved in
    type_specs: DashMap<(Token, GenericParamContext), TypeDefOrRefRc>,
    me: Weak<CilModule>,
}

impl CilModule {
    /// Open the module stored in the file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file can not be read, is not a PE image, has no CLR runtime
    /// header or its metadata headers are corrupted
    pub fn from_file(path: &Path, options: LoaderOptions) -> Result<Arc<CilModule>> {
        Self::from_image(Arc::new(PeImage::from_file(path)?), options)
    }

    /// Open the module stored in `data`.
    ///
    /// # Errors
    /// Same as [`CilModule::from_file`]
    pub fn from_mem(data: Vec<u8>, options: LoaderOptions) -> Result<Arc<CilModule>> {
        Self::from_image(Arc::new(PeImage::from_mem(data)?), options)
    }

    /// Open the module of an already loaded image.
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the image has no CLR runtime header, and an
    /// error if the CLR header, the metadata root or the tables stream are corrupted
    pub fn from_image(image: Arc<PeImage>, options: LoaderOptions) -> Result<Arc<CilModule>> {
        let Some((clr_rva, clr_size)) = image.clr_directory() else {
            return Err(NotSupported);
        };

        let mut clr = image.create_stream_rva(clr_rva, Some(u64::from(clr_size)))?;
        let cor20 = Cor20Header::read(&mut clr)?;

        let metadata = image.create_stream_rva(
            Rva(cor20.meta_data_rva),
            Some(u64::from(cor20.meta_data_size)),
        )?;
        let root = Root::read(metadata.data())?;

        let Some(header) = root.tables_stream() else {
            return Err(malformed_error!("Metadata root has no tables stream"));
        };
        let tables = TablesStream::from(
            metadata.sub_stream(header.offset as usize, header.size as usize)?,
        )?;

        tracing::debug!(
            runtime = %root.version,
            streams = root.stream_headers.len(),
            tables = tables.table_count(),
            "opened module"
        );

        Ok(Self::build(Some(image), Some(cor20), Some(root), tables, options))
    }

    /// Open a bare tables stream, for callers that locate the metadata themselves.
    ///
    /// # Errors
    /// Returns an error if the tables stream header is corrupted
    pub fn from_tables(stream: ByteStream, options: LoaderOptions) -> Result<Arc<CilModule>> {
        let tables = TablesStream::from(stream)?;
        tracing::debug!("opened tables stream - {} tables", tables.table_count());

        Ok(Self::build(None, None, None, tables, options))
    }

    fn build(
        image: Option<Arc<PeImage>>,
        cor20: Option<Cor20Header>,
        root: Option<Root>,
        tables: TablesStream,
        options: LoaderOptions,
    ) -> Arc<CilModule> {
        Arc::new_cyclic(|me| CilModule {
            image,
            cor20,
            root,
            tables,
            options,
            types: DashMap::new(),
            type_specs: DashMap::new(),
            me: me.clone(),
        })
    }

    /// The image this module was read from, `None` when opened from a bare tables stream
    #[must_use]
    pub fn image(&self) -> Option<&Arc<PeImage>> {
        self.image.as_ref()
    }

    /// The CLR runtime header
    #[must_use]
    pub fn cor20(&self) -> Option<&Cor20Header> {
        self.cor20.as_ref()
    }

    /// The metadata root and stream directory
    #[must_use]
    pub fn root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    /// The tables stream
    #[must_use]
    pub fn tables(&self) -> &TablesStream {
        &self.tables
    }

    fn source(&self) -> Weak<dyn MetadataSource> {
        self.me.clone()
    }

    /// The `InterfaceImpl` entry of row `rid`. No bytes are read until a field is accessed.
    ///
    /// # Errors
    /// Returns [`crate::Error::BadImageFormat`] if `rid` is 0 or beyond the table
    pub fn interface_impl(&self, rid: u32, context: GenericParamContext) -> Result<InterfaceImpl> {
        Ok(InterfaceImplMd::new(self.source(), rid, context)?.into())
    }

    /// All `InterfaceImpl` entries, in table order.
    ///
    /// # Errors
    /// Same as [`CilModule::interface_impl`]
    pub fn interface_impls(&self, context: &GenericParamContext) -> Result<Vec<InterfaceImpl>> {
        (1..=self.tables.row_count(TableId::InterfaceImpl))
            .map(|rid| self.interface_impl(rid, *context))
            .collect()
    }

    /// All `InterfaceImpl` entries, created and fully resolved on the rayon thread pool.
    ///
    /// # Errors
    /// Returns the first error met while creating or resolving an entry
    pub fn par_interface_impls(&self, context: &GenericParamContext) -> Result<Vec<InterfaceImpl>> {
        (1..=self.tables.row_count(TableId::InterfaceImpl))
            .into_par_iter()
            .map(|rid| {
                let entry = self.interface_impl(rid, *context)?;
                entry.class()?;
                entry.interface()?;
                Ok(entry)
            })
            .collect()
    }

    /// Row-ids of the `InterfaceImpl` entries of the type `type_def_rid`
    ///
    /// # Errors
    /// Returns an error if the table can not be scanned
    pub fn interface_impl_rids(&self, type_def_rid: u32) -> Result<RidList> {
        self.tables
            .find_rows(TableId::InterfaceImpl, INTERFACE_IMPL_CLASS, type_def_rid)
    }

    /// The `InterfaceImpl` entries of the type `type_def_rid`, in table order.
    ///
    /// # Errors
    /// Returns an error if the table can not be scanned
    pub fn interface_impls_for_type(
        &self,
        type_def_rid: u32,
        context: &GenericParamContext,
    ) -> Result<Vec<InterfaceImpl>> {
        self.interface_impl_rids(type_def_rid)?
            .iter()
            .map(|rid| self.interface_impl(rid, *context))
            .collect()
    }

    /// Row-ids of the generic parameters declared by `owner`, a `TypeDef` or `MethodDef`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `owner` can not declare generic parameters
    pub fn generic_param_rids(&self, owner: Token) -> Result<RidList> {
        let key = Self::encode(owner, CodedIndexType::TypeOrMethodDef)?;
        self.tables
            .find_rows(TableId::GenericParam, GENERIC_PARAM_OWNER, key)
    }

    /// The `GenericParam` row a generic variable refers to under `context`.
    ///
    /// Returns `None` if the context has no matching declaration or the declaration has no
    /// parameter with that number.
    ///
    /// # Errors
    /// Returns an error if the `GenericParam` table can not be scanned
    pub fn resolve_generic_param(
        &self,
        context: &GenericParamContext,
        var: GenericVar,
    ) -> Result<Option<u32>> {
        let Some(bound) = context.bind(var) else {
            return Ok(None);
        };

        for rid in self.generic_param_rids(bound.owner)?.iter() {
            if self
                .tables
                .column(TableId::GenericParam, rid, GENERIC_PARAM_NUMBER)?
                == bound.number
            {
                return Ok(Some(rid));
            }
        }

        Ok(None)
    }

    fn encode(token: Token, ci_type: CodedIndexType) -> Result<u32> {
        token
            .table_id()
            .and_then(|table| ci_type.encode(table, token.row()))
            .ok_or_else(|| malformed_error!("Token {} can not be encoded as {:?}", token, ci_type))
    }

    fn resolve_cached<K>(
        &self,
        cache: &DashMap<K, TypeDefOrRefRc>,
        key: K,
        coded: &CodedIndex,
        context: GenericParamContext,
    ) -> Result<TypeDefOrRefRc>
    where
        K: Eq + std::hash::Hash,
    {
        if let Some(found) = cache.get(&key) {
            return Ok(found.value().clone());
        }

        let row = self.tables.read_row(coded.tag, coded.row)?;
        let resolved = Arc::new(TypeDefOrRef::from_row(row, context)?);

        // a concurrent resolution may have inserted first, keep that one
        Ok(cache.entry(key).or_insert(resolved).value().clone())
    }
}

impl MetadataSource for CilModule {
    fn options(&self) -> LoaderOptions {
        self.options
    }

    fn row_count(&self, table: TableId) -> u32 {
        self.tables.row_count(table)
    }

    fn read_row(&self, table: TableId, rid: u32) -> Result<RawRow> {
        self.tables.read_row(table, rid)
    }

    fn custom_attribute_rids(&self, parent: Token) -> Result<RidList> {
        let key = Self::encode(parent, CodedIndexType::HasCustomAttribute)?;
        self.tables
            .find_rows(TableId::CustomAttribute, CUSTOM_ATTRIBUTE_PARENT, key)
    }

    fn read_custom_attribute(&self, rid: u32) -> Result<CustomAttributeRc> {
        Ok(Arc::new(
            self.tables.read::<CustomAttributeRaw>(rid)?.to_attribute(),
        ))
    }

    fn resolve_type_def_or_ref(
        &self,
        coded: &CodedIndex,
        context: &GenericParamContext,
    ) -> Result<Option<TypeDefOrRefRc>> {
        if coded.is_null() {
            return Ok(None);
        }

        let rows = self.tables.row_count(coded.tag);
        if coded.row > rows {
            if self.options.strict_references {
                return Err(InvalidRowId {
                    table: coded.tag,
                    rid: coded.row,
                });
            }

            tracing::warn!(token = %coded.token, table = ?coded.tag, rows, "unresolved reference");
            return Ok(None);
        }

        let resolved = match coded.tag {
            TableId::TypeDef | TableId::TypeRef => self.resolve_cached(
                &self.types,
                coded.token,
                coded,
                GenericParamContext::empty(),
            )?,
            TableId::TypeSpec => self.resolve_cached(
                &self.type_specs,
                (coded.token, *context),
                coded,
                *context,
            )?,
            table => {
                return Err(malformed_error!(
                    "{:?} is not a TypeDefOrRef table",
                    table
                ))
            }
        };

        Ok(Some(resolved))
    }
}
