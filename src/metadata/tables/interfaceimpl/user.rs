use crate::metadata::{tables::CustomAttributeCollection, typesystem::TypeDefOrRefRc};

/// An `InterfaceImpl` built in memory.
///
/// Fields are plain values. Nothing is ever read from an image.
#[derive(Debug, Default)]
pub struct InterfaceImplUser {
    rid: u32,
    class: Option<TypeDefOrRefRc>,
    interface: Option<TypeDefOrRefRc>,
    custom_attributes: CustomAttributeCollection,
}

impl InterfaceImplUser {
    /// A new entry stating that `class` implements `interface`
    #[must_use]
    pub fn new(
        rid: u32,
        class: Option<TypeDefOrRefRc>,
        interface: Option<TypeDefOrRefRc>,
    ) -> InterfaceImplUser {
        InterfaceImplUser {
            rid,
            class,
            interface,
            custom_attributes: CustomAttributeCollection::empty(),
        }
    }

    /// The current row-id
    #[must_use]
    pub fn rid(&self) -> u32 {
        self.rid
    }

    /// Assign a new row-id
    pub fn set_rid(&mut self, rid: u32) {
        self.rid = rid;
    }

    /// The implemented interface
    #[must_use]
    pub fn interface(&self) -> Option<TypeDefOrRefRc> {
        self.interface.clone()
    }

    /// Replace the implemented interface
    pub fn set_interface(&mut self, interface: Option<TypeDefOrRefRc>) {
        self.interface = interface;
    }

    /// The implementing type
    #[must_use]
    pub fn class(&self) -> Option<TypeDefOrRefRc> {
        self.class.clone()
    }

    /// Replace the implementing type
    pub fn set_class(&mut self, class: Option<TypeDefOrRefRc>) {
        self.class = class;
    }

    /// The attached custom attributes, always available and growable
    #[must_use]
    pub fn custom_attributes(&self) -> &CustomAttributeCollection {
        &self.custom_attributes
    }
}
