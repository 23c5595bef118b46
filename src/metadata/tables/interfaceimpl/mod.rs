//! InterfaceImpl table (0x09) and its entities.
//!
//! Each row states that a `TypeDef` (the `Class` column) implements an interface (the
//! `Interface` column, a `TypeDefOrRef` coded index).
//!
//! # Entities
//!
//! - [`InterfaceImplRaw`] - the decoded row, references unresolved
//! - [`InterfaceImplMd`] - an entry backed by a row, every field resolved lazily
//! - [`InterfaceImplUser`] - an entry built in memory
//! - [`InterfaceImpl`] - either of the two, behind one set of accessors
//!
//! # Reference
//! - [ECMA-335 II.22.23](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    metadata::{
        entity::MetadataEntity,
        tables::{CustomAttributeCollection, TableId},
        typesystem::TypeDefOrRefRc,
    },
    Result,
};

mod materialized;
mod raw;
mod reader;
mod user;

pub use materialized::InterfaceImplMd;
pub use raw::InterfaceImplRaw;
pub use user::InterfaceImplUser;

/// An interface implementation, read from an image or built in memory.
///
/// Both variants answer the same accessors. Setters take effect immediately, a value set
/// on a materialized entry replaces whatever its row holds.
#[derive(Debug)]
pub enum InterfaceImpl {
    /// Backed by a row of the image
    Materialized(InterfaceImplMd),
    /// Built in memory
    User(InterfaceImplUser),
}

impl InterfaceImpl {
    /// The implemented interface.
    ///
    /// # Errors
    /// Returns an error if a materialized entry can not read its row or resolve the reference
    pub fn interface(&self) -> Result<Option<TypeDefOrRefRc>> {
        match self {
            InterfaceImpl::Materialized(entry) => entry.interface(),
            InterfaceImpl::User(entry) => Ok(entry.interface()),
        }
    }

    /// Replace the implemented interface
    pub fn set_interface(&mut self, interface: Option<TypeDefOrRefRc>) {
        match self {
            InterfaceImpl::Materialized(entry) => entry.set_interface(interface),
            InterfaceImpl::User(entry) => entry.set_interface(interface),
        }
    }

    /// The implementing type.
    ///
    /// # Errors
    /// Returns an error if a materialized entry can not read its row or resolve the reference
    pub fn class(&self) -> Result<Option<TypeDefOrRefRc>> {
        match self {
            InterfaceImpl::Materialized(entry) => entry.class(),
            InterfaceImpl::User(entry) => Ok(entry.class()),
        }
    }

    /// Replace the implementing type
    pub fn set_class(&mut self, class: Option<TypeDefOrRefRc>) {
        match self {
            InterfaceImpl::Materialized(entry) => entry.set_class(class),
            InterfaceImpl::User(entry) => entry.set_class(class),
        }
    }

    /// Returns true for entries built in memory
    #[must_use]
    pub fn is_user_created(&self) -> bool {
        matches!(self, InterfaceImpl::User(_))
    }
}

impl MetadataEntity for InterfaceImpl {
    const TABLE: TableId = TableId::InterfaceImpl;
    const HAS_CUSTOM_ATTRIBUTE_TAG: u32 = 5;

    fn rid(&self) -> u32 {
        match self {
            InterfaceImpl::Materialized(entry) => entry.rid(),
            InterfaceImpl::User(entry) => entry.rid(),
        }
    }

    fn set_rid(&mut self, rid: u32) {
        match self {
            InterfaceImpl::Materialized(entry) => entry.set_rid(rid),
            InterfaceImpl::User(entry) => entry.set_rid(rid),
        }
    }

    fn orig_rid(&self) -> Option<u32> {
        match self {
            InterfaceImpl::Materialized(entry) => Some(entry.orig_rid()),
            InterfaceImpl::User(_) => None,
        }
    }

    fn custom_attributes(&self) -> Result<&CustomAttributeCollection> {
        match self {
            InterfaceImpl::Materialized(entry) => entry.custom_attributes(),
            InterfaceImpl::User(entry) => Ok(entry.custom_attributes()),
        }
    }
}

impl From<InterfaceImplMd> for InterfaceImpl {
    fn from(entry: InterfaceImplMd) -> Self {
        InterfaceImpl::Materialized(entry)
    }
}

impl From<InterfaceImplUser> for InterfaceImpl {
    fn from(entry: InterfaceImplUser) -> Self {
        InterfaceImpl::User(entry)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Weak};

    use super::*;
    use crate::{
        metadata::{
            config::LoaderOptions,
            entity::MetadataSource,
            generics::GenericParamContext,
            lazy::LazyState,
            tables::{CodedIndex, CodedIndexType, CustomAttribute},
            token::Token,
            typesystem::{TypeDefOrRef, TypeDefOrRefKind},
        },
        test::{interface_impl_tables, StubSource},
        Error,
    };

    fn weak(stub: &Arc<StubSource>) -> Weak<dyn MetadataSource> {
        let source: Arc<dyn MetadataSource> = stub.clone();
        Arc::downgrade(&source)
    }

    fn user_type(token: u32) -> TypeDefOrRefRc {
        Arc::new(TypeDefOrRef::new(Token(token), GenericParamContext::empty()).unwrap())
    }

    /// Assertions both variants must pass for an entry claiming `class` implements `interface`
    /// and carrying one attribute per `(constructor, value)` of `attributes`
    fn check_uniform(
        entry: &mut InterfaceImpl,
        class: Token,
        interface: Token,
        attributes: &[(CodedIndex, u32)],
    ) {
        assert_eq!(entry.class().unwrap().unwrap().token, class);
        assert_eq!(entry.interface().unwrap().unwrap().token, interface);
        assert_eq!(entry.has_custom_attribute_tag(), 5);
        assert_eq!(entry.token(), Token::from_parts(TableId::InterfaceImpl, entry.rid()));

        let collection = entry.custom_attributes().unwrap();
        assert_eq!(collection.len(), attributes.len());
        assert_eq!(entry.has_custom_attributes().unwrap(), !attributes.is_empty());
        for (index, (constructor, value)) in attributes.iter().enumerate() {
            let attribute = collection.get(index).unwrap().unwrap();
            assert_eq!(attribute.parent, CodedIndex::new(TableId::InterfaceImpl, entry.rid()));
            assert_eq!(&attribute.constructor, constructor);
            assert_eq!(attribute.value, *value);
        }
        assert!(collection.get(attributes.len()).unwrap().is_none());

        let replacement = user_type(0x0100_0002);
        entry.set_interface(Some(replacement.clone()));
        assert!(Arc::ptr_eq(&entry.interface().unwrap().unwrap(), &replacement));
        entry.set_interface(None);
        assert!(entry.interface().unwrap().is_none());

        let rid = entry.rid();
        entry.set_rid(rid + 10);
        assert_eq!(entry.rid(), rid + 10);
        assert_eq!(entry.token().row(), rid + 10);
    }

    #[test]
    fn variants_are_uniform() {
        let attributes = [
            (CodedIndex::new(TableId::MethodDef, 1), 0x10),
            (CodedIndex::new(TableId::MemberRef, 1), 0x11),
        ];

        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::default());
        let mut materialized: InterfaceImpl =
            InterfaceImplMd::new(weak(&stub), 1, GenericParamContext::empty())
                .unwrap()
                .into();
        let mut user: InterfaceImpl = InterfaceImplUser::new(
            1,
            Some(user_type(0x0200_0001)),
            Some(user_type(0x0100_0001)),
        )
        .into();
        for (constructor, value) in &attributes {
            let attribute =
                CustomAttribute::new(Token(0x0900_0001), constructor.token, *value).unwrap();
            user.custom_attributes().unwrap().push(Arc::new(attribute));
        }

        check_uniform(&mut materialized, Token(0x0200_0001), Token(0x0100_0001), &attributes);
        check_uniform(&mut user, Token(0x0200_0001), Token(0x0100_0001), &attributes);

        assert_eq!(materialized.orig_rid(), Some(1));
        assert_eq!(user.orig_rid(), None);
        assert!(!materialized.is_user_created());
        assert!(user.is_user_created());
    }

    #[test]
    fn variants_are_uniform_without_attributes() {
        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::default());
        let mut materialized: InterfaceImpl =
            InterfaceImplMd::new(weak(&stub), 2, GenericParamContext::empty())
                .unwrap()
                .into();
        let mut user: InterfaceImpl = InterfaceImplUser::new(
            2,
            Some(user_type(0x0200_0001)),
            Some(user_type(0x0100_0002)),
        )
        .into();

        check_uniform(&mut materialized, Token(0x0200_0001), Token(0x0100_0002), &[]);
        check_uniform(&mut user, Token(0x0200_0001), Token(0x0100_0002), &[]);
    }

    #[test]
    fn materialized_is_lazy() {
        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::default());
        let entry = InterfaceImplMd::new(weak(&stub), 2, GenericParamContext::empty()).unwrap();

        assert_eq!(stub.row_reads(), 0);
        assert_eq!(entry.interface_cell().state(), LazyState::Unresolved);

        let first = entry.interface().unwrap().unwrap();
        assert_eq!(first.kind, TypeDefOrRefKind::TypeRef);
        assert_eq!(first.rid(), 2);
        assert_eq!(entry.interface_cell().state(), LazyState::Resolved);

        for _ in 0..5 {
            assert!(Arc::ptr_eq(&first, &entry.interface().unwrap().unwrap()));
        }

        // the row is shared between fields
        entry.class().unwrap();
        assert_eq!(stub.row_reads_of(TableId::InterfaceImpl), 1);
        assert_eq!(stub.resolutions(), 2);
        assert_eq!(entry.raw().unwrap().class, 1);
    }

    #[test]
    fn construction_validates_rid() {
        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::default());

        for rid in [0, 4] {
            assert!(matches!(
                InterfaceImplMd::new(weak(&stub), rid, GenericParamContext::empty()),
                Err(Error::BadImageFormat(_))
            ));
        }
        assert_eq!(stub.row_reads(), 0);
    }

    #[test]
    fn set_before_read_skips_io() {
        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::racy());
        let mut entry =
            InterfaceImplMd::new(weak(&stub), 1, GenericParamContext::empty()).unwrap();

        entry.set_interface(Some(user_type(0x1B00_0001)));
        assert_eq!(
            entry.interface().unwrap().unwrap().token,
            Token(0x1B00_0001)
        );
        assert_eq!(stub.row_reads(), 0);
    }

    #[test]
    fn type_spec_keeps_context() {
        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::default());
        let context = GenericParamContext::for_type(Token(0x0200_0002));
        let entry = InterfaceImplMd::new(weak(&stub), 3, context).unwrap();

        let interface = entry.interface().unwrap().unwrap();
        assert_eq!(interface.kind, TypeDefOrRefKind::TypeSpec(context));
        assert_eq!(entry.generic_context(), &context);
    }

    #[test]
    fn container_dropped() {
        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::default());
        let entry = InterfaceImplMd::new(weak(&stub), 1, GenericParamContext::empty()).unwrap();
        let class = entry.class().unwrap();
        drop(stub);

        assert!(matches!(entry.interface(), Err(Error::ContainerDropped)));
        assert_eq!(entry.class().unwrap(), class);
    }

    #[test]
    fn custom_attributes() {
        let stub = StubSource::new(interface_impl_tables(), LoaderOptions::default());
        let entry: InterfaceImpl =
            InterfaceImplMd::new(weak(&stub), 1, GenericParamContext::empty())
                .unwrap()
                .into();

        assert!(entry.has_custom_attributes().unwrap());
        let attributes = entry.custom_attributes().unwrap();
        assert_eq!(attributes.len(), 2);
        assert_eq!(stub.scans(), 1);

        let first = attributes.get(0).unwrap().unwrap();
        assert_eq!(first.orig_rid, Some(1));
        assert_eq!(
            first.parent,
            CodedIndex::new(TableId::InterfaceImpl, 1)
        );
        assert_eq!(stub.row_reads_of(TableId::CustomAttribute), 1);

        entry.custom_attributes().unwrap();
        assert_eq!(stub.scans(), 1);

        let user = InterfaceImplUser::new(1, None, None);
        assert!(user.custom_attributes().is_empty());
        user.custom_attributes().push(Arc::new(
            CustomAttribute::new(Token(0x0900_0001), Token(0x0600_0001), 0).unwrap(),
        ));
        assert_eq!(user.custom_attributes().len(), 1);

        let expected = CodedIndexType::HasCustomAttribute
            .encode(TableId::InterfaceImpl, 1)
            .unwrap();
        assert_eq!(expected & 0x1F, entry.has_custom_attribute_tag());
    }
}
