use std::{fmt, sync::Weak};

use crate::{
    metadata::{
        entity::{upgrade, MetadataSource},
        lazy::{LazyCell, LazyPolicy},
        ridlist::RidList,
        tables::CustomAttributeRc,
    },
    Result,
};

/// The custom attributes of one entity, in table order.
///
/// A collection read from an image knows its length up front and resolves each attribute on
/// first access. Attributes can be appended through a shared reference at any time.
#[derive(Default)]
pub struct CustomAttributeCollection {
    items: boxcar::Vec<LazyCell<CustomAttributeRc>>,
}

impl CustomAttributeCollection {
    /// A collection without attributes
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// One lazily resolved entry per rid of `rids`.
    pub fn from_rids(source: Weak<dyn MetadataSource>, rids: &RidList, policy: LazyPolicy) -> Self {
        let items = boxcar::Vec::with_capacity(rids.len());
        for rid in rids.iter() {
            let source = source.clone();
            items.push(LazyCell::new(policy, move || {
                upgrade(&source)?.read_custom_attribute(rid)
            }));
        }

        CustomAttributeCollection { items }
    }

    /// Append an attribute, returns its index
    pub fn push(&self, attribute: CustomAttributeRc) -> usize {
        self.items.push(LazyCell::with_value(attribute))
    }

    /// Number of attributes
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.count()
    }

    /// Returns true if there are no attributes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The attribute at `index`, resolving it if needed.
    ///
    /// # Errors
    /// Returns an error if the attribute's row can not be read
    pub fn get(&self, index: usize) -> Result<Option<CustomAttributeRc>> {
        match self.items.get(index) {
            Some(cell) => Ok(Some(cell.value()?.clone())),
            None => Ok(None),
        }
    }

    /// Iterate over all attributes, resolving each in turn
    pub fn iter(&self) -> impl Iterator<Item = Result<CustomAttributeRc>> + '_ {
        self.items.iter().map(|(_, cell)| cell.value().cloned())
    }

    /// Number of attributes resolved so far
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.items.iter().filter(|(_, cell)| cell.is_resolved()).count()
    }
}

impl fmt::Debug for CustomAttributeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAttributeCollection")
            .field("len", &self.len())
            .field("resolved", &self.resolved())
            .finish()
    }
}
