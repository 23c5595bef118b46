//! Thread-safe, once-computed values.
//!
//! A [`LazyCell`] starts out either resolved (built with [`LazyCell::with_value`]) or with a
//! recipe that computes its value on first access. Once a value is published it never
//! changes again through a shared reference; reading it takes no lock.
//!
//! Two synchronization policies exist, selected per cell at construction:
//!
//! - [`LazyPolicy::Locking`] serializes first access behind a per-cell mutex. The recipe runs
//!   exactly once, no matter how many threads race for the value.
//! - [`LazyPolicy::Racy`] lets every racing thread run the recipe. The first result to be
//!   published wins, the others are dropped and their callers receive the winner.
//!
//! Recipes with observable side effects must use the locking policy.
//!
//! Failed recipes are not cached. The error goes to the caller that ran the recipe and the
//! cell stays unresolved, so a later access retries.
//!
//! # Example
//!
//! ```rust
//! use cilimage::metadata::lazy::{LazyCell, LazyPolicy, LazyState};
//!
//! let cell = LazyCell::new(LazyPolicy::Locking, || Ok(6 * 7));
//! assert_eq!(cell.state(), LazyState::Unresolved);
//! assert_eq!(*cell.value()?, 42);
//! assert_eq!(cell.state(), LazyState::Resolved);
//! # Ok::<(), cilimage::Error>(())
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, OnceLock,
    },
};

use crate::{Error::LockError, Result};

/// How concurrent first accesses to a [`LazyCell`] are synchronized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LazyPolicy {
    /// Serialize first access; the recipe runs exactly once
    #[default]
    Locking,
    /// Compute concurrently and keep the first published result
    Racy,
}

/// Observable state of a [`LazyCell`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LazyState {
    /// No value, no recipe running
    Unresolved,
    /// At least one thread is running the recipe
    Resolving,
    /// A value has been published
    Resolved,
}

type Recipe<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

/// A value computed at most once, on first access.
pub struct LazyCell<T> {
    value: OnceLock<T>,
    recipe: Option<Recipe<T>>,
    lock: Option<Mutex<()>>,
    policy: LazyPolicy,
    in_flight: AtomicUsize,
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        InFlight(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<T> LazyCell<T> {
    /// A cell that runs `recipe` on first access.
    pub fn new<F>(policy: LazyPolicy, recipe: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        LazyCell {
            value: OnceLock::new(),
            recipe: Some(Box::new(recipe)),
            lock: match policy {
                LazyPolicy::Locking => Some(Mutex::new(())),
                LazyPolicy::Racy => None,
            },
            policy,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// A cell that is resolved from the start.
    pub fn with_value(value: T) -> Self {
        LazyCell {
            value: OnceLock::from(value),
            recipe: None,
            lock: None,
            policy: LazyPolicy::Locking,
            in_flight: AtomicUsize::new(0),
        }
    }

    /// The value, computing it first if needed.
    ///
    /// # Errors
    /// Returns the error of the recipe if it fails, or [`crate::Error::LockError`] if a
    /// previous recipe panicked while holding the cell's lock
    pub fn value(&self) -> Result<&T> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let Some(recipe) = &self.recipe else {
            return Err(crate::Error::Error(
                "LazyCell has neither a value nor a recipe".to_string(),
            ));
        };

        match (&self.lock, self.policy) {
            (Some(lock), LazyPolicy::Locking) => {
                let _guard = lock.lock().map_err(|_| LockError)?;
                if let Some(value) = self.value.get() {
                    return Ok(value);
                }

                let candidate = {
                    let _in_flight = InFlight::enter(&self.in_flight);
                    recipe()?
                };

                tracing::trace!("lazy value resolved under lock");
                Ok(self.value.get_or_init(|| candidate))
            }
            _ => {
                let candidate = {
                    let _in_flight = InFlight::enter(&self.in_flight);
                    recipe()?
                };

                // a concurrent caller may have published first, `candidate` is dropped then
                let mut published = false;
                let value = self.value.get_or_init(|| {
                    published = true;
                    candidate
                });
                if published {
                    tracing::trace!("lazy value resolved");
                }
                Ok(value)
            }
        }
    }

    /// The value if it has been computed, without running the recipe.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Returns true once a value has been published
    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Current state of the cell.
    pub fn state(&self) -> LazyState {
        if self.value.get().is_some() {
            LazyState::Resolved
        } else if self.in_flight.load(Ordering::Acquire) > 0 {
            LazyState::Resolving
        } else {
            LazyState::Unresolved
        }
    }

    /// The synchronization policy of this cell
    pub fn policy(&self) -> LazyPolicy {
        self.policy
    }

    /// Replace the value. The recipe is discarded, the cell is resolved afterwards.
    pub fn set(&mut self, value: T) {
        self.value = OnceLock::from(value);
        self.recipe = None;
    }
}

impl<T: fmt::Debug> fmt::Debug for LazyCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyCell")
            .field("value", &self.value.get())
            .field("policy", &self.policy)
            .field("state", &self.state())
            .finish()
    }
}
