//! # Component Registry
//!
//! Maps each registered component type to its own packed store.
//!
//! Stores are held type-erased behind [`ErasedStore`] and recovered by
//! downcasting on `TypeId`. Each store sits in its own `RefCell` so that a
//! multi-type [`foreach`](ComponentRegistry::foreach) can hold `&mut`
//! borrows of several stores at once. Structural changes (`attach`,
//! `detach`, `purge`) need `&mut self`, which rules them out while any
//! accessor or iteration is alive.
//!
//! Touching a type that was never registered is a programming error and
//! panics. The `try_*` variants report it as [`RegistryError::Unregistered`]
//! instead.

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;

use crate::config::EcsConfig;
use crate::error::{RegistryError, RegistryResult, StoreError, StoreResult};

use super::component::{Component, UniqueId};
use super::entity::Entity;
use super::packed_array::GenerationalIndexArray;
use super::query::{self, ComponentMeta, ComponentSet, EntityQueryFn, QueryFn};

/// Type-erased view of one component store.
pub trait ErasedStore: Any {
    /// Name of the stored component type.
    fn type_name(&self) -> &'static str;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Whether the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The store's handles, sorted by index.
    fn sorted_indices(&self) -> Vec<Entity>;

    /// Removes the component held by exactly this handle, if any.
    fn purge(&mut self, entity: Entity) -> bool;

    /// Converts to Any for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Converts to mutable Any for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStore for RefCell<GenerationalIndexArray<C>> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn len(&self) -> usize {
        self.borrow().len()
    }

    fn sorted_indices(&self) -> Vec<Entity> {
        let mut indices = self.borrow().indices().to_vec();
        indices.sort_unstable();
        indices
    }

    fn purge(&mut self, entity: Entity) -> bool {
        let store = self.get_mut();
        store.holds(entity) && store.remove(entity).is_ok()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Type-keyed collection of packed component stores.
///
/// # Example
///
/// ```rust
/// use tessera_core::{ComponentRegistry, Ecs};
///
/// struct Name(String);
///
/// let mut ecs = Ecs::new();
/// let mut registry = ComponentRegistry::new();
/// assert!(registry.register_type::<Name>());
///
/// let entity = ecs.create();
/// assert!(registry.attach(entity, Name("Entity 0".into())));
/// assert_eq!(registry.get::<Name>(entity).unwrap().0, "Entity 0");
/// ```
pub struct ComponentRegistry {
    stores: HashMap<TypeId, Box<dyn ErasedStore>>,
    config: EcsConfig,
}

impl ComponentRegistry {
    /// Creates an empty registry with the default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EcsConfig::default())
    }

    /// Creates an empty registry whose stores are sized from `config`.
    #[must_use]
    pub fn with_config(config: EcsConfig) -> Self {
        Self {
            stores: HashMap::new(),
            config,
        }
    }

    /// Creates a registry with the stock components registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_type::<UniqueId>();
        registry
    }

    /// The config every store is sized from.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &EcsConfig {
        &self.config
    }

    /// Installs an empty store for `C`.
    ///
    /// Returns `false` and changes nothing if `C` is already registered.
    pub fn register_type<C: Component>(&mut self) -> bool {
        let meta = ComponentMeta::of::<C>();
        if self.stores.contains_key(&meta.id) {
            tracing::warn!(component = meta.name, "component type registered twice");
            return false;
        }
        let store = GenerationalIndexArray::<C>::with_capacity(self.config.max_entities());
        self.stores.insert(meta.id, Box::new(RefCell::new(store)));
        tracing::debug!(
            component = meta.name,
            capacity = self.config.max_entities(),
            "registered component type"
        );
        true
    }

    /// Whether `C` has been registered.
    #[must_use]
    pub fn is_registered<C: Component>(&self) -> bool {
        self.stores.contains_key(&TypeId::of::<C>())
    }

    /// Number of registered component types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.stores.len()
    }

    fn erased(&self, meta: ComponentMeta) -> &dyn ErasedStore {
        match self.stores.get(&meta.id) {
            Some(store) => store.as_ref(),
            None => unregistered(meta.name),
        }
    }

    fn try_cell<C: Component>(&self) -> RegistryResult<&RefCell<GenerationalIndexArray<C>>> {
        self.stores
            .get(&TypeId::of::<C>())
            .and_then(|store| store.as_any().downcast_ref())
            .ok_or(RegistryError::Unregistered {
                type_name: std::any::type_name::<C>(),
            })
    }

    fn cell<C: Component>(&self) -> &RefCell<GenerationalIndexArray<C>> {
        match self.try_cell::<C>() {
            Ok(cell) => cell,
            Err(_) => unregistered(std::any::type_name::<C>()),
        }
    }

    /// Exclusive access to `C`'s store.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    pub fn store_mut<C: Component>(&mut self) -> &mut GenerationalIndexArray<C> {
        let name = std::any::type_name::<C>();
        match self
            .stores
            .get_mut(&TypeId::of::<C>())
            .and_then(|store| store.as_any_mut().downcast_mut::<RefCell<GenerationalIndexArray<C>>>())
        {
            Some(cell) => cell.get_mut(),
            None => unregistered(name),
        }
    }

    /// Shared access to `C`'s store.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered or its store is mutably borrowed.
    #[must_use]
    pub fn store<C: Component>(&self) -> Ref<'_, GenerationalIndexArray<C>> {
        self.cell::<C>().borrow()
    }

    pub(crate) fn borrow_store_mut<C: Component>(&self) -> RefMut<'_, GenerationalIndexArray<C>> {
        match self.cell::<C>().try_borrow_mut() {
            Ok(store) => store,
            Err(_) => panic!(
                "component store `{}` is already borrowed: a type may appear only once \
                 in a foreach signature and not while an accessor is alive",
                std::any::type_name::<C>()
            ),
        }
    }

    /// Attaches a component to an entity.
    ///
    /// Returns `false` and changes nothing if the entity's index already
    /// holds a `C` or lies beyond the store capacity.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    pub fn attach<C: Component>(&mut self, entity: Entity, component: C) -> bool {
        self.store_mut::<C>().emplace(entity, component)
    }

    /// Fallible variant of [`Self::attach`].
    ///
    /// Returns `Ok(false)` only when the entity's index already holds a `C`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unregistered`] if `C` is not registered, and
    /// [`StoreError::CapacityExceeded`](crate::StoreError::CapacityExceeded)
    /// (wrapped in [`RegistryError::Store`]) if the index lies beyond the
    /// store capacity.
    pub fn try_attach<C: Component>(&mut self, entity: Entity, component: C) -> RegistryResult<bool> {
        let store = self
            .stores
            .get_mut(&TypeId::of::<C>())
            .and_then(|store| store.as_any_mut().downcast_mut::<RefCell<GenerationalIndexArray<C>>>())
            .ok_or(RegistryError::Unregistered {
                type_name: std::any::type_name::<C>(),
            })?
            .get_mut();
        if entity.slot() >= store.capacity() {
            return Err(StoreError::CapacityExceeded {
                index: entity.index(),
                capacity: store.capacity(),
            }
            .into());
        }
        Ok(store.emplace(entity, component))
    }

    /// Removes and returns the entity's `C`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) or
    /// [`StoreError::StaleHandle`](crate::StoreError::StaleHandle).
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    pub fn detach<C: Component>(&mut self, entity: Entity) -> StoreResult<C> {
        self.store_mut::<C>().remove(entity)
    }

    /// Borrows the entity's `C`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) or
    /// [`StoreError::StaleHandle`](crate::StoreError::StaleHandle).
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered or its store is mutably borrowed.
    pub fn get<C: Component>(&self, entity: Entity) -> StoreResult<Ref<'_, C>> {
        let store = self.store::<C>();
        let dense = store.locate(entity)?;
        Ok(Ref::map(store, |store| &store.values()[dense]))
    }

    /// Fallible variant of [`Self::get`].
    ///
    /// # Errors
    ///
    /// [`RegistryError::Unregistered`] if `C` is not registered, otherwise
    /// the store fault wrapped in [`RegistryError::Store`].
    pub fn try_get<C: Component>(&self, entity: Entity) -> RegistryResult<Ref<'_, C>> {
        let store = self.try_cell::<C>()?.borrow();
        let dense = store.locate(entity)?;
        Ok(Ref::map(store, |store| &store.values()[dense]))
    }

    /// Mutably borrows the entity's `C`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get`].
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    pub fn get_mut<C: Component>(&mut self, entity: Entity) -> StoreResult<&mut C> {
        self.store_mut::<C>().get_mut(entity)
    }

    /// Whether the entity's index holds a `C`. The generation is not checked.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered.
    #[must_use]
    pub fn contains<C: Component>(&self, entity: Entity) -> bool {
        self.store::<C>().contains(entity)
    }

    /// Removes every component held by exactly this handle.
    ///
    /// Returns how many components were removed.
    pub fn purge(&mut self, entity: Entity) -> usize {
        let removed = self
            .stores
            .values_mut()
            .map(|store| store.purge(entity))
            .filter(|removed| *removed)
            .count();
        if removed > 0 {
            tracing::debug!(%entity, removed, "purged entity components");
        }
        removed
    }

    /// Handles carrying every component in `Q`, sorted by index.
    ///
    /// `Q` is a tuple such as `(Position,)` or `(Position, Velocity)`.
    /// Membership is decided by index alone. Each returned handle is the one
    /// stored by the first type in `Q`; if a stale entry was never purged,
    /// another type may hold a different generation at that index.
    ///
    /// # Panics
    ///
    /// Panics if any type in `Q` is not registered.
    #[must_use]
    pub fn has_attribute<Q: ComponentSet>(&self) -> Vec<Entity> {
        let metas = Q::metas();
        // Resolve every type up front so an unregistered one always panics.
        let stores: Vec<&dyn ErasedStore> = metas.iter().map(|meta| self.erased(*meta)).collect();
        if stores.iter().any(|store| store.is_empty()) {
            return Vec::new();
        }
        query::intersect_all(stores.into_iter().map(|store| store.sorted_indices()))
    }

    /// Read-only accessor for `C`, resolving the store once.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered or its store is mutably borrowed.
    #[must_use]
    pub fn accessor<C: Component>(&self) -> Accessor<'_, C> {
        Accessor {
            store: self.store::<C>(),
        }
    }

    /// Mutable accessor for `C`, resolving the store once.
    ///
    /// Accessors for different types may be alive at the same time. While
    /// this one is alive, queries touching `C` panic; run them first.
    ///
    /// # Panics
    ///
    /// Panics if `C` is not registered or its store is already borrowed.
    #[must_use]
    pub fn accessor_mut<C: Component>(&self) -> AccessorMut<'_, C> {
        AccessorMut {
            store: self.borrow_store_mut::<C>(),
        }
    }

    /// Runs `f` over every entity carrying all of `Q`. See [`query::foreach`].
    pub fn foreach<Q, F>(&mut self, f: F) -> usize
    where
        Q: ComponentSet,
        F: QueryFn<Q>,
    {
        query::foreach::<Q, F>(self, f)
    }

    /// Like [`Self::foreach`], passing the entity handle first.
    pub fn foreach_with_handle<Q, F>(&mut self, f: F) -> usize
    where
        Q: ComponentSet,
        F: EntityQueryFn<Q>,
    {
        query::foreach_with_handle::<Q, F>(self, f)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.stores.values().map(|store| (store.type_name(), store.len())))
            .finish()
    }
}

#[cold]
#[track_caller]
fn unregistered(type_name: &str) -> ! {
    panic!("component type `{type_name}` was not registered")
}

/// Shared handle-to-component lookup for one type.
pub struct Accessor<'r, C> {
    store: Ref<'r, GenerationalIndexArray<C>>,
}

impl<C> Accessor<'_, C> {
    /// Validated lookup. See [`GenerationalIndexArray::get`].
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`](crate::StoreError::NotFound) or
    /// [`StoreError::StaleHandle`](crate::StoreError::StaleHandle).
    pub fn get(&self, entity: Entity) -> StoreResult<&C> {
        self.store.get(entity)
    }

    /// Whether the entity's index holds a value.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.store.contains(entity)
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Exclusive handle-to-component lookup for one type.
pub struct AccessorMut<'r, C> {
    store: RefMut<'r, GenerationalIndexArray<C>>,
}

impl<C> AccessorMut<'_, C> {
    /// Validated lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Accessor::get`].
    pub fn get(&self, entity: Entity) -> StoreResult<&C> {
        self.store.get(entity)
    }

    /// Validated mutable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Accessor::get`].
    pub fn get_mut(&mut self, entity: Entity) -> StoreResult<&mut C> {
        self.store.get_mut(entity)
    }

    /// Whether the entity's index holds a value.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.store.contains(entity)
    }
}
