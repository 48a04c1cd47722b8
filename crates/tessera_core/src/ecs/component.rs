//! # Component System
//!
//! Components are plain data attached to entities. Any `'static` type
//! qualifies; it only has to be registered before first use.

use std::sync::atomic::{AtomicU64, Ordering};

/// Marker trait for ECS components.
///
/// Blanket-implemented for every `'static` type, so strings, numbers and
/// user structs can all be attached without ceremony.
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

static NEXT_UNIQUE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide unique identifier component.
///
/// Each construction draws the next value from a global counter; the first
/// id handed out is `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniqueId(u64);

impl UniqueId {
    /// Draws a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_UNIQUE_ID.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Default for UniqueId {
    fn default() -> Self {
        Self::next()
    }
}

/// Two-sided team membership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Team {
    /// `true` for side X, `false` for side O.
    pub is_x: bool,
}

impl Default for Team {
    fn default() -> Self {
        Self { is_x: true }
    }
}
