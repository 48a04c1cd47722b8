//! # TESSERA Core Engine
//!
//! Entity identity and attached-data storage for large, churning populations:
//! - Entities are opaque generational handles, safe to hold after destruction
//! - Components of each type are packed densely for iteration
//! - "Who has {A, B, C}?" is answered by intersecting per-type index lists
//!
//! ## Architecture Rules
//!
//! 1. **Stale handles are detected** - a destroyed-and-reused slot yields
//!    `StaleHandle`, never another entity's data
//! 2. **No gaps** - removal swap-compacts the dense array in O(1)
//! 3. **Loud programming errors** - touching an unregistered type panics
//!
//! ## Example
//!
//! ```rust
//! use tessera_core::{ComponentRegistry, Ecs};
//!
//! struct Position { x: i32, y: i32 }
//! struct Velocity { x: i32, y: i32 }
//!
//! let mut ecs = Ecs::new();
//! let mut registry = ComponentRegistry::new();
//! registry.register_type::<Position>();
//! registry.register_type::<Velocity>();
//!
//! for i in 0..4 {
//!     let entity = ecs.create();
//!     registry.attach(entity, Position { x: i, y: i });
//!     if i % 2 == 0 {
//!         registry.attach(entity, Velocity { x: 1, y: 2 });
//!     }
//! }
//!
//! assert_eq!(registry.has_attribute::<(Position, Velocity)>().len(), 2);
//! registry.foreach::<(Position, Velocity), _>(|pos: &mut Position, vel: &mut Velocity| {
//!     pos.x += vel.x;
//!     pos.y += vel.y;
//! });
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::{EcsConfig, MAX_ENTITIES};
pub use ecs::{
    Accessor, AccessorMut, AllocatorEntry, Component, ComponentMeta, ComponentRegistry,
    ComponentSet, Ecs, Entity, EntityQueryFn, ErasedStore, GenerationalIndex,
    GenerationalIndexAllocator, GenerationalIndexArray, QueryFn, Registry, Team, UniqueId, World,
};
pub use error::{
    ConfigError, ConfigResult, RegistryError, RegistryResult, StoreError, StoreResult,
};
