//! # Intersection Queries
//!
//! "Which entities carry all of {A, B, C}?" is answered from the stores'
//! index lists alone: each list is sorted by index, then the lists are
//! folded together with a sorted-merge intersection. The running result only
//! shrinks, and an empty store short-circuits the whole query. Cost is
//! O(sum of store sizes), independent of how many entities exist overall.
//!
//! Component signatures are tuples: `(Position,)`, `(Position, Velocity)`,
//! up to eight types.
//!
//! ## Iteration
//!
//! [`foreach`] drives a callback over the intersection, handing it `&mut`
//! references into the dense arrays. It needs `&mut ComponentRegistry`, so
//! the callback cannot attach or detach anything while the walk is in
//! progress. Callback parameters must be annotated:
//!
//! ```rust
//! use tessera_core::{ComponentRegistry, Ecs};
//!
//! struct Health(u32);
//! struct Regen(u32);
//!
//! let mut ecs = Ecs::new();
//! let mut registry = ComponentRegistry::new();
//! registry.register_type::<Health>();
//! registry.register_type::<Regen>();
//!
//! let entity = ecs.create();
//! registry.attach(entity, Health(10));
//! registry.attach(entity, Regen(2));
//!
//! let visited = registry.foreach::<(Health, Regen), _>(|health: &mut Health, regen: &mut Regen| {
//!     health.0 += regen.0;
//! });
//! assert_eq!(visited, 1);
//! ```

use std::any::TypeId;
use std::cell::RefMut;
use std::cmp::Ordering;

use crate::error::StoreResult;

use super::component::Component;
use super::entity::Entity;
use super::packed_array::GenerationalIndexArray;
use super::registry::ComponentRegistry;

/// Identity of one component type within a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentMeta {
    /// Runtime type key.
    pub id: TypeId,
    /// Type name, for diagnostics.
    pub name: &'static str,
}

impl ComponentMeta {
    /// Metadata for `C`.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: std::any::type_name::<C>(),
        }
    }
}

/// A tuple of component types usable as a query signature.
pub trait ComponentSet: 'static {
    /// Exclusive borrows of every store in the signature.
    type Stores<'r>;

    /// The component types, in signature order.
    fn metas() -> Vec<ComponentMeta>;

    /// Borrows every store in the signature mutably.
    ///
    /// # Panics
    ///
    /// Panics if a type is unregistered, or if a store is already borrowed
    /// (a type repeated in the signature, or held by a live accessor).
    fn borrow_stores(registry: &ComponentRegistry) -> Self::Stores<'_>;
}

/// A callback taking `&mut` references to every component of `Q`.
///
/// Implemented for `FnMut(&mut C1, .., &mut Cn)`.
pub trait QueryFn<Q: ComponentSet> {
    /// Fetches the entity's components and invokes the callback.
    ///
    /// # Errors
    ///
    /// Propagates the first store fault; the callback is not invoked.
    fn call(&mut self, entity: Entity, stores: &mut Q::Stores<'_>) -> StoreResult<()>;
}

/// Like [`QueryFn`], with the entity handle passed first.
///
/// Implemented for `FnMut(Entity, &mut C1, .., &mut Cn)`.
pub trait EntityQueryFn<Q: ComponentSet> {
    /// Fetches the entity's components and invokes the callback.
    ///
    /// # Errors
    ///
    /// Propagates the first store fault; the callback is not invoked.
    fn call(&mut self, entity: Entity, stores: &mut Q::Stores<'_>) -> StoreResult<()>;
}

macro_rules! impl_component_set {
    ($(($ty:ident, $store:ident)),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            type Stores<'r> = ($(RefMut<'r, GenerationalIndexArray<$ty>>,)+);

            fn metas() -> Vec<ComponentMeta> {
                vec![$(ComponentMeta::of::<$ty>()),+]
            }

            fn borrow_stores(registry: &ComponentRegistry) -> Self::Stores<'_> {
                ($(registry.borrow_store_mut::<$ty>(),)+)
            }
        }

        impl<Func, $($ty: Component),+> QueryFn<($($ty,)+)> for Func
        where
            Func: FnMut($(&mut $ty),+),
        {
            fn call(
                &mut self,
                entity: Entity,
                stores: &mut ($(RefMut<'_, GenerationalIndexArray<$ty>>,)+),
            ) -> StoreResult<()> {
                let ($($store,)+) = stores;
                (self)($($store.get_mut(entity)?),+);
                Ok(())
            }
        }

        impl<Func, $($ty: Component),+> EntityQueryFn<($($ty,)+)> for Func
        where
            Func: FnMut(Entity, $(&mut $ty),+),
        {
            fn call(
                &mut self,
                entity: Entity,
                stores: &mut ($(RefMut<'_, GenerationalIndexArray<$ty>>,)+),
            ) -> StoreResult<()> {
                let ($($store,)+) = stores;
                (self)(entity, $($store.get_mut(entity)?),+);
                Ok(())
            }
        }
    };
}

impl_component_set!((A, a));
impl_component_set!((A, a), (B, b));
impl_component_set!((A, a), (B, b), (C, c));
impl_component_set!((A, a), (B, b), (C, c), (D, d));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g));
impl_component_set!((A, a), (B, b), (C, c), (D, d), (E, e), (F, f), (G, g), (H, h));

/// Sorted-merge intersection of two index-sorted lists.
///
/// Membership is decided by index alone; the handle kept is the one from
/// `left`, whatever generation `right` holds at that index.
#[must_use]
pub fn intersect(left: &[Entity], right: &[Entity]) -> Vec<Entity> {
    let mut result = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        match left[i].index().cmp(&right[j].index()) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                result.push(left[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

/// Intersects index lists left to right.
///
/// Each list is sorted by index before merging. Lists are pulled lazily and
/// the fold stops as soon as the running intersection is empty. Returned
/// handles come from the first list.
pub fn intersect_all<I>(lists: I) -> Vec<Entity>
where
    I: IntoIterator<Item = Vec<Entity>>,
{
    let mut lists = lists.into_iter();
    let Some(mut acc) = lists.next() else {
        return Vec::new();
    };
    acc.sort_unstable();
    while !acc.is_empty() {
        let Some(mut list) = lists.next() else {
            break;
        };
        list.sort_unstable();
        acc = intersect(&acc, &list);
    }
    acc
}

/// Runs `f` over every entity carrying all of `Q`, in index order.
///
/// Returns the number of entities the callback saw. An entity whose stores
/// disagree on its generation is skipped and logged.
pub fn foreach<Q, F>(registry: &mut ComponentRegistry, mut f: F) -> usize
where
    Q: ComponentSet,
    F: QueryFn<Q>,
{
    let matched = registry.has_attribute::<Q>();
    if matched.is_empty() {
        return 0;
    }
    let mut stores = Q::borrow_stores(registry);
    tally(
        matched
            .into_iter()
            .map(|entity| (entity, QueryFn::<Q>::call(&mut f, entity, &mut stores))),
    )
}

/// Like [`foreach`], passing each entity's handle to the callback first.
pub fn foreach_with_handle<Q, F>(registry: &mut ComponentRegistry, mut f: F) -> usize
where
    Q: ComponentSet,
    F: EntityQueryFn<Q>,
{
    let matched = registry.has_attribute::<Q>();
    if matched.is_empty() {
        return 0;
    }
    let mut stores = Q::borrow_stores(registry);
    tally(
        matched
            .into_iter()
            .map(|entity| (entity, EntityQueryFn::<Q>::call(&mut f, entity, &mut stores))),
    )
}

fn tally(outcomes: impl Iterator<Item = (Entity, StoreResult<()>)>) -> usize {
    let mut visited = 0;
    for (entity, outcome) in outcomes {
        match outcome {
            Ok(()) => visited += 1,
            Err(err) => tracing::warn!(%entity, %err, "foreach skipped entity"),
        }
    }
    visited
}
