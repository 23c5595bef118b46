use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    metadata::{
        entity::{upgrade, MetadataSource},
        generics::GenericParamContext,
        lazy::LazyCell,
        tables::{CodedIndex, CustomAttributeCollection, InterfaceImplRaw, TableId},
        token::Token,
        typesystem::TypeDefOrRefRc,
    },
    Error::BadImageFormat,
    Result,
};

/// What every field recipe of one [`InterfaceImplMd`] needs. Shared by all recipes.
struct RowContext {
    source: Weak<dyn MetadataSource>,
    orig_rid: u32,
    context: GenericParamContext,
    row: LazyCell<InterfaceImplRaw>,
}

impl RowContext {
    fn row(&self) -> Result<&InterfaceImplRaw> {
        self.row.value()
    }

    fn resolve(&self, coded: &CodedIndex) -> Result<Option<TypeDefOrRefRc>> {
        if coded.is_null() {
            return Ok(None);
        }

        upgrade(&self.source)?.resolve_type_def_or_ref(coded, &self.context)
    }
}

/// An `InterfaceImpl` backed by a row of the image.
///
/// Creating one performs no I/O. The row is read on first access to any field and kept for
/// the other fields, each of which is resolved at most once.
pub struct InterfaceImplMd {
    shared: Arc<RowContext>,
    rid: u32,
    class: LazyCell<Option<TypeDefOrRefRc>>,
    interface: LazyCell<Option<TypeDefOrRefRc>>,
    custom_attributes: LazyCell<CustomAttributeCollection>,
}

impl InterfaceImplMd {
    /// Bind row `rid` of `source`, resolving references under `context`.
    ///
    /// # Errors
    /// Returns [`crate::Error::BadImageFormat`] if `rid` is 0 or beyond the row count, and
    /// [`crate::Error::ContainerDropped`] if `source` is gone
    pub fn new(
        source: Weak<dyn MetadataSource>,
        rid: u32,
        context: GenericParamContext,
    ) -> Result<InterfaceImplMd> {
        let strong = upgrade(&source)?;
        let rows = strong.row_count(TableId::InterfaceImpl);
        if rid == 0 || rid > rows {
            return Err(BadImageFormat(format!(
                "InterfaceImpl row-id {} out of range, table has {} rows",
                rid, rows
            )));
        }

        let policy = strong.options().lazy_policy;
        let row_source = source.clone();
        let shared = Arc::new(RowContext {
            source,
            orig_rid: rid,
            context,
            row: LazyCell::new(policy, move || {
                let source = upgrade(&row_source)?;
                InterfaceImplRaw::from_raw(&source.read_row(TableId::InterfaceImpl, rid)?)
            }),
        });

        let class = {
            let shared = shared.clone();
            LazyCell::new(policy, move || {
                let row = shared.row()?;
                shared.resolve(&CodedIndex::new(TableId::TypeDef, row.class))
            })
        };

        let interface = {
            let shared = shared.clone();
            LazyCell::new(policy, move || {
                let interface = shared.row()?.interface.clone();
                shared.resolve(&interface)
            })
        };

        let custom_attributes = {
            let shared = shared.clone();
            LazyCell::new(policy, move || {
                let source = upgrade(&shared.source)?;
                let parent = Token::from_parts(TableId::InterfaceImpl, shared.orig_rid);
                let rids = source.custom_attribute_rids(parent)?;
                Ok(CustomAttributeCollection::from_rids(
                    shared.source.clone(),
                    &rids,
                    policy,
                ))
            })
        };

        Ok(InterfaceImplMd {
            shared,
            rid,
            class,
            interface,
            custom_attributes,
        })
    }

    /// The current row-id
    #[must_use]
    pub fn rid(&self) -> u32 {
        self.rid
    }

    /// Assign a new row-id. Reads keep using the original one.
    pub fn set_rid(&mut self, rid: u32) {
        self.rid = rid;
    }

    /// The row-id this entry was read from
    #[must_use]
    pub fn orig_rid(&self) -> u32 {
        self.shared.orig_rid
    }

    /// The generic context references of this entry are resolved in
    #[must_use]
    pub fn generic_context(&self) -> &GenericParamContext {
        &self.shared.context
    }

    /// The undecoded row.
    ///
    /// # Errors
    /// Returns an error if the row can not be read
    pub fn raw(&self) -> Result<&InterfaceImplRaw> {
        self.shared.row()
    }

    /// The implemented interface.
    ///
    /// # Errors
    /// Returns an error if the row can not be read or the reference can not be resolved
    pub fn interface(&self) -> Result<Option<TypeDefOrRefRc>> {
        self.interface.value().cloned()
    }

    /// Replace the implemented interface
    pub fn set_interface(&mut self, interface: Option<TypeDefOrRefRc>) {
        self.interface.set(interface);
    }

    /// The implementing type.
    ///
    /// # Errors
    /// Returns an error if the row can not be read or the reference can not be resolved
    pub fn class(&self) -> Result<Option<TypeDefOrRefRc>> {
        self.class.value().cloned()
    }

    /// Replace the implementing type
    pub fn set_class(&mut self, class: Option<TypeDefOrRefRc>) {
        self.class.set(class);
    }

    /// The attached custom attributes, scanned on first access.
    ///
    /// # Errors
    /// Returns an error if the `CustomAttribute` table can not be scanned
    pub fn custom_attributes(&self) -> Result<&CustomAttributeCollection> {
        self.custom_attributes.value()
    }

    #[cfg(test)]
    pub(crate) fn interface_cell(&self) -> &LazyCell<Option<TypeDefOrRefRc>> {
        &self.interface
    }
}

impl fmt::Debug for InterfaceImplMd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceImplMd")
            .field("rid", &self.rid)
            .field("orig_rid", &self.shared.orig_rid)
            .field("context", &self.shared.context)
            .field("row", &self.shared.row.get())
            .field("class", &self.class)
            .field("interface", &self.interface)
            .finish_non_exhaustive()
    }
}
