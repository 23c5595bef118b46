//! Ordered row-id sequences produced by table scans.

use std::sync::Arc;

/// An ordered, read-only list of row-ids.
///
/// A scan of a sorted table yields a contiguous [`RidList::Range`], a scan of an unsorted one
/// an explicit [`RidList::List`]. Both have their length known up front.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RidList {
    /// `len` consecutive rids starting at `start`
    Range {
        /// First rid
        start: u32,
        /// Number of rids
        len: u32,
    },
    /// Explicit rids, in table order
    List(Arc<[u32]>),
}

impl Default for RidList {
    fn default() -> Self {
        RidList::empty()
    }
}

impl RidList {
    /// A list without entries
    #[must_use]
    pub fn empty() -> Self {
        RidList::Range { start: 0, len: 0 }
    }

    /// Number of rids
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            RidList::Range { len, .. } => *len as usize,
            RidList::List(rids) => rids.len(),
        }
    }

    /// Returns true if the list has no rids
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rid at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u32> {
        match self {
            RidList::Range { start, len } => {
                let index = u32::try_from(index).ok()?;
                (index < *len).then(|| start + index)
            }
            RidList::List(rids) => rids.get(index).copied(),
        }
    }

    /// Iterate over all rids in order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(|index| self.get(index))
    }
}

impl From<Vec<u32>> for RidList {
    fn from(rids: Vec<u32>) -> Self {
        RidList::List(rids.into())
    }
}
