//! Options controlling how a module materializes its entities.

use crate::metadata::lazy::LazyPolicy;

/// Loader configuration, fixed when a module is opened and applied to every entity and
/// lazy field created from it.
///
/// # Examples
///
/// ```rust
/// use cilimage::metadata::{config::LoaderOptions, lazy::LazyPolicy};
///
/// let options = LoaderOptions::racy().with_strict_references(true);
/// assert_eq!(options.lazy_policy, LazyPolicy::Racy);
/// assert!(options.strict_references);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    /// Synchronization policy of every lazy field
    pub lazy_policy: LazyPolicy,

    /// Fail instead of yielding `None` when a cross reference points past the end of its
    /// target table
    pub strict_references: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            lazy_policy: LazyPolicy::Locking,
            strict_references: false,
        }
    }
}

impl LoaderOptions {
    /// Exactly-once resolution for every lazy field, the default
    #[must_use]
    pub fn locking() -> Self {
        Self::default()
    }

    /// Lock-free resolution; racing threads may compute a field more than once
    #[must_use]
    pub fn racy() -> Self {
        Self {
            lazy_policy: LazyPolicy::Racy,
            ..Self::default()
        }
    }

    /// Reject every dangling reference
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict_references: true,
            ..Self::default()
        }
    }

    /// Override the lazy policy
    #[must_use]
    pub fn with_lazy_policy(mut self, policy: LazyPolicy) -> Self {
        self.lazy_policy = policy;
        self
    }

    /// Override reference strictness
    #[must_use]
    pub fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }
}
