//! # ECS World
//!
//! [`Ecs`] mints handles and [`ComponentRegistry`] stores data; the two never
//! call each other. [`World`] pairs them for callers that want destruction
//! to also drop the entity's components, so no stale entry outlives its
//! handle.

use crate::config::EcsConfig;
use crate::error::StoreResult;

use super::allocator::GenerationalIndexAllocator;
use super::component::Component;
use super::entity::Entity;
use super::query::{ComponentSet, EntityQueryFn, QueryFn};
use super::registry::ComponentRegistry;

/// Entity lifecycle: creation and destruction of handles.
#[derive(Debug, Default)]
pub struct Ecs {
    entity_allocator: GenerationalIndexAllocator,
}

impl Ecs {
    /// Creates an empty entity table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a new entity handle.
    #[inline]
    pub fn create(&mut self) -> Entity {
        self.entity_allocator.allocate()
    }

    /// Retires an entity handle. `false` if it was already dead or stale.
    #[inline]
    pub fn destroy(&mut self, entity: Entity) -> bool {
        self.entity_allocator.destroy(entity)
    }

    /// Whether the entity's slot is live, regardless of generation.
    #[inline]
    #[must_use]
    pub fn is_live(&self, entity: Entity) -> bool {
        self.entity_allocator.is_live(entity)
    }

    /// Whether this exact handle is the slot's live occupant.
    #[inline]
    #[must_use]
    pub fn is_current(&self, entity: Entity) -> bool {
        self.entity_allocator.is_current(entity)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.entity_allocator.live_count()
    }

    /// The underlying allocator.
    #[inline]
    #[must_use]
    pub fn allocator(&self) -> &GenerationalIndexAllocator {
        &self.entity_allocator
    }
}

/// Bundle of the per-program registries.
#[derive(Debug)]
pub struct Registry {
    /// Component stores.
    pub components: ComponentRegistry,
}

impl Registry {
    /// Creates a registry with the stock components registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: ComponentRegistry::with_defaults(),
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Entities and their components in one place.
///
/// # Example
///
/// ```rust
/// use tessera_core::World;
///
/// struct Position(i32);
///
/// let mut world = World::new();
/// world.register_type::<Position>();
///
/// let entity = world.spawn();
/// world.attach(entity, Position(4));
/// assert!(world.despawn(entity));
///
/// // The slot is reused, but the old component went with the old entity.
/// let next = world.spawn();
/// assert_eq!(next.index(), entity.index());
/// assert!(world.components().get::<Position>(next).is_err());
/// ```
#[derive(Debug, Default)]
pub struct World {
    ecs: Ecs,
    components: ComponentRegistry,
}

impl World {
    /// Creates an empty world with default store capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty world whose stores are sized from `config`.
    #[must_use]
    pub fn with_config(config: EcsConfig) -> Self {
        Self {
            ecs: Ecs::new(),
            components: ComponentRegistry::with_config(config),
        }
    }

    /// Entity lifecycle state.
    #[inline]
    #[must_use]
    pub fn ecs(&self) -> &Ecs {
        &self.ecs
    }

    /// Component stores.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Mutable component stores.
    #[inline]
    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.ecs.alive_count()
    }

    /// Registers a component type. `false` if already registered.
    pub fn register_type<C: Component>(&mut self) -> bool {
        self.components.register_type::<C>()
    }

    /// Spawns a new entity with no components.
    pub fn spawn(&mut self) -> Entity {
        self.ecs.create()
    }

    /// Spawns up to `count` entities, attaching `init(i)` to the i-th one.
    ///
    /// Every returned entity carries a `C`. The batch stops at the first
    /// entity the store rejects (capacity reached); that entity is despawned
    /// again and is not returned.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    pub fn spawn_batch_with<C, F>(&mut self, count: usize, mut init: F) -> Vec<Entity>
    where
        C: Component,
        F: FnMut(usize) -> C,
    {
        let mut spawned = Vec::with_capacity(count);
        for i in 0..count {
            let entity = self.ecs.create();
            if !self.components.attach(entity, init(i)) {
                self.ecs.destroy(entity);
                tracing::warn!(
                    %entity,
                    requested = count,
                    spawned = spawned.len(),
                    "batch spawn stopped: component store rejected entity"
                );
                break;
            }
            spawned.push(entity);
        }
        spawned
    }

    /// Despawns an entity, dropping all of its components first.
    ///
    /// Returns `false` and changes nothing if the handle is dead or stale.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.ecs.is_current(entity) {
            return false;
        }
        self.components.purge(entity);
        self.ecs.destroy(entity)
    }

    /// Whether this exact handle is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.ecs.is_current(entity)
    }

    /// Attaches a component to a live entity.
    ///
    /// Returns `false` if the handle is dead or stale, or the store rejects
    /// it (already present, beyond capacity).
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    pub fn attach<C: Component>(&mut self, entity: Entity, component: C) -> bool {
        if !self.ecs.is_current(entity) {
            tracing::debug!(%entity, "attach to dead entity ignored");
            return false;
        }
        self.components.attach(entity, component)
    }

    /// Removes and returns the entity's `C`.
    ///
    /// # Errors
    ///
    /// See [`ComponentRegistry::detach`].
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    pub fn detach<C: Component>(&mut self, entity: Entity) -> StoreResult<C> {
        self.components.detach(entity)
    }

    /// Handles carrying every component in `Q`, sorted by index.
    ///
    /// # Panics
    ///
    /// Panics if any type in `Q` is not registered.
    #[must_use]
    pub fn has_attribute<Q: ComponentSet>(&self) -> Vec<Entity> {
        self.components.has_attribute::<Q>()
    }

    /// Runs `f` over every entity carrying all of `Q`.
    pub fn foreach<Q, F>(&mut self, f: F) -> usize
    where
        Q: ComponentSet,
        F: QueryFn<Q>,
    {
        self.components.foreach::<Q, F>(f)
    }

    /// Like [`Self::foreach`], passing the entity handle first.
    pub fn foreach_with_handle<Q, F>(&mut self, f: F) -> usize
    where
        Q: ComponentSet,
        F: EntityQueryFn<Q>,
    {
        self.components.foreach_with_handle::<Q, F>(f)
    }
}
