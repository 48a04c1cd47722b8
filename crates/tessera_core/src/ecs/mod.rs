//! # Entity Component System
//!
//! Generational handles plus per-type packed stores.
//!
//! ## Design Philosophy
//!
//! - Entities are `(index, generation)` pairs; reusing an index bumps its
//!   generation so old handles are caught, not aliased
//! - Each component type lives in its own dense array with a sparse index
//! - Multi-type queries intersect sorted index lists instead of probing
//!   every entity
//! - Single-threaded: every operation runs to completion synchronously

mod allocator;
mod component;
mod entity;
mod packed_array;
pub mod query;
mod registry;
mod world;

pub use allocator::{AllocatorEntry, GenerationalIndexAllocator};
pub use component::{Component, Team, UniqueId};
pub use entity::{Entity, GenerationalIndex};
pub use packed_array::GenerationalIndexArray;
pub use query::{ComponentMeta, ComponentSet, EntityQueryFn, QueryFn};
pub use registry::{Accessor, AccessorMut, ComponentRegistry, ErasedStore};
pub use world::{Ecs, Registry, World};
