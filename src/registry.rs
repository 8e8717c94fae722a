// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Runtime capability registry.
//!
//! Typed calls (`enqueue`, `sync`, `fetch`) are checked at compile time. The
//! mutation hook and the `*_dyn` entry points receive `&dyn Any` from a
//! surrounding system that mutates many entity types, only some of which are
//! replicated. This registry answers "is this value syncable?" at run time:
//! registering `R` records one adapter per [`Shape`] that can hold an `R`,
//! keyed by the shape's `TypeId`. Anything unregistered is not syncable.
//!
//! Erased indirections (`Box<dyn Any>`, `Arc<dyn Any>`) are peeled by
//! [`resolve`](crate::resolve::resolve) before the lookup; typed pointers to a
//! record (`Arc<R>`, `Box<R>`) are shapes of their own.

use crate::engine::fetch_into;
use crate::error::{MirrorError, Result};
use crate::model::{ErasedRecord, Syncable};
use crate::store::KvStore;
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed fetch future returned through the registry.
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Records extracted from one value (one for a record, N for a batch).
pub(crate) type Extracted<S> = Vec<Arc<dyn ErasedRecord<S>>>;

/// Number of shapes installed per registered record type.
const SHAPES_PER_MODEL: usize = 7;

/// A concrete type that holds zero or more `R`s.
pub(crate) trait Shape<R>: Send + Sync + 'static {
    /// Borrow the held records. `None` when the value is absent.
    fn records(&self) -> Option<Vec<&R>>;

    /// The single record a fetch can write into, if any.
    fn target(&mut self) -> Option<&mut R>;
}

impl<R: Syncable> Shape<R> for R {
    fn records(&self) -> Option<Vec<&R>> {
        Some(vec![self])
    }

    fn target(&mut self) -> Option<&mut R> {
        Some(self)
    }
}

impl<R: Syncable> Shape<R> for Arc<R> {
    fn records(&self) -> Option<Vec<&R>> {
        Some(vec![&**self])
    }

    // Shared records cannot be written in place.
    fn target(&mut self) -> Option<&mut R> {
        Arc::get_mut(self)
    }
}

impl<R: Syncable> Shape<R> for Box<R> {
    fn records(&self) -> Option<Vec<&R>> {
        Some(vec![&**self])
    }

    fn target(&mut self) -> Option<&mut R> {
        Some(&mut **self)
    }
}

impl<R: Syncable> Shape<R> for Option<R> {
    fn records(&self) -> Option<Vec<&R>> {
        self.as_ref().map(|record| vec![record])
    }

    fn target(&mut self) -> Option<&mut R> {
        self.as_mut()
    }
}

impl<R: Syncable> Shape<R> for Vec<R> {
    fn records(&self) -> Option<Vec<&R>> {
        Some(self.iter().collect())
    }

    // A batch has no keys of its own.
    fn target(&mut self) -> Option<&mut R> {
        None
    }
}

impl<R: Syncable> Shape<R> for Vec<Arc<R>> {
    fn records(&self) -> Option<Vec<&R>> {
        Some(self.iter().map(|record| &**record).collect())
    }

    fn target(&mut self) -> Option<&mut R> {
        None
    }
}

impl<R: Syncable> Shape<R> for Vec<Box<R>> {
    fn records(&self) -> Option<Vec<&R>> {
        Some(self.iter().map(|record| &**record).collect())
    }

    fn target(&mut self) -> Option<&mut R> {
        None
    }
}

/// Type-specific operations reachable from an erased value.
pub(crate) trait Adapter<S: KvStore>: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Clone the record(s) out of `value`.
    ///
    /// `None` if `value` is absent or has another type.
    fn extract(&self, value: &dyn Any) -> Option<Extracted<S>>;

    /// Fetch into `dest`, which must have the adapter's shape.
    fn fetch<'a>(&self, store: &'a S, dest: &'a mut dyn Any, key_name: &'a str) -> FetchFuture<'a>;
}

struct Shaped<W, R>(PhantomData<fn() -> (W, R)>);

impl<W, R, S> Adapter<S> for Shaped<W, R>
where
    W: Shape<R>,
    R: Syncable,
    S: KvStore,
{
    fn type_name(&self) -> &'static str {
        std::any::type_name::<W>()
    }

    fn extract(&self, value: &dyn Any) -> Option<Extracted<S>> {
        let shape = value.downcast_ref::<W>()?;
        let records = <W as Shape<R>>::records(shape)?;
        Some(
            records
                .into_iter()
                .map(|record| Arc::new(record.clone()) as Arc<dyn ErasedRecord<S>>)
                .collect(),
        )
    }

    fn fetch<'a>(&self, store: &'a S, dest: &'a mut dyn Any, key_name: &'a str) -> FetchFuture<'a> {
        let target = match dest.downcast_mut::<W>() {
            Some(shape) => <W as Shape<R>>::target(shape),
            None => None,
        };

        match target {
            Some(dest) => Box::pin(fetch_into(store, dest, key_name)),
            None => Box::pin(std::future::ready(Err(MirrorError::InvalidDestination(
                format!("{} cannot receive a fetched record", std::any::type_name::<W>()),
            )))),
        }
    }
}

/// Registered record types for one engine.
pub(crate) struct Registry<S: KvStore> {
    adapters: DashMap<TypeId, Arc<dyn Adapter<S>>>,
}

impl<S: KvStore> Registry<S> {
    pub(crate) fn new() -> Self {
        Self {
            adapters: DashMap::new(),
        }
    }

    /// Register `R` in every shape. Registering twice is harmless.
    pub(crate) fn register<R: Syncable>(&self) {
        self.install::<R, R>();
        self.install::<Arc<R>, R>();
        self.install::<Box<R>, R>();
        self.install::<Option<R>, R>();
        self.install::<Vec<R>, R>();
        self.install::<Vec<Arc<R>>, R>();
        self.install::<Vec<Box<R>>, R>();
    }

    fn install<W: Shape<R>, R: Syncable>(&self) {
        self.adapters
            .insert(TypeId::of::<W>(), Arc::new(Shaped::<W, R>(PhantomData)));
    }

    pub(crate) fn contains(&self, type_id: TypeId) -> bool {
        self.adapters.contains_key(&type_id)
    }

    /// Adapter for a concrete type, if registered.
    pub(crate) fn lookup(&self, type_id: TypeId) -> Option<Arc<dyn Adapter<S>>> {
        self.adapters
            .get(&type_id)
            .map(|adapter| Arc::clone(adapter.value()))
    }

    /// Number of registered record types.
    pub(crate) fn len(&self) -> usize {
        self.adapters.len() / SHAPES_PER_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SyncKeys;
    use crate::store::InMemoryStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u32,
    }

    impl Syncable for Order {
        fn sync_keys(&self) -> SyncKeys {
            SyncKeys::from([("id".to_string(), format!("order:{}", self.id))])
        }
    }

    #[test]
    fn test_register_adds_every_shape() {
        let registry = Registry::<InMemoryStore>::new();
        assert_eq!(registry.len(), 0);

        registry.register::<Order>();
        registry.register::<Order>();

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(TypeId::of::<Order>()));
        assert!(registry.contains(TypeId::of::<Arc<Order>>()));
        assert!(registry.contains(TypeId::of::<Box<Order>>()));
        assert!(registry.contains(TypeId::of::<Option<Order>>()));
        assert!(registry.contains(TypeId::of::<Vec<Order>>()));
        assert!(registry.contains(TypeId::of::<Vec<Arc<Order>>>()));
        assert!(registry.contains(TypeId::of::<Vec<Box<Order>>>()));
        assert!(!registry.contains(TypeId::of::<String>()));
        assert!(!registry.contains(TypeId::of::<Vec<Option<Order>>>()));
    }

    #[test]
    fn test_extract_single_and_batch() {
        let registry = Registry::<InMemoryStore>::new();
        registry.register::<Order>();

        let single = registry.lookup(TypeId::of::<Order>()).unwrap();
        let extracted = single.extract(&Order { id: 1 }).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].physical_keys()["id"], "order:1");

        let batch = registry.lookup(TypeId::of::<Vec<Order>>()).unwrap();
        let orders = vec![Order { id: 1 }, Order { id: 2 }, Order { id: 3 }];
        assert_eq!(batch.extract(&orders).unwrap().len(), 3);
    }

    #[test]
    fn test_extract_through_typed_pointers() {
        let registry = Registry::<InMemoryStore>::new();
        registry.register::<Order>();

        let arc = registry.lookup(TypeId::of::<Arc<Order>>()).unwrap();
        let extracted = arc.extract(&Arc::new(Order { id: 7 })).unwrap();
        assert_eq!(extracted[0].physical_keys()["id"], "order:7");

        let boxed = registry.lookup(TypeId::of::<Box<Order>>()).unwrap();
        assert_eq!(boxed.extract(&Box::new(Order { id: 8 })).unwrap().len(), 1);

        let arcs = registry.lookup(TypeId::of::<Vec<Arc<Order>>>()).unwrap();
        let orders = vec![Arc::new(Order { id: 1 }), Arc::new(Order { id: 2 })];
        assert_eq!(arcs.extract(&orders).unwrap().len(), 2);

        let boxes = registry.lookup(TypeId::of::<Vec<Box<Order>>>()).unwrap();
        let orders = vec![Box::new(Order { id: 3 })];
        assert_eq!(boxes.extract(&orders).unwrap().len(), 1);
    }

    #[test]
    fn test_extract_option() {
        let registry = Registry::<InMemoryStore>::new();
        registry.register::<Order>();

        let optional = registry.lookup(TypeId::of::<Option<Order>>()).unwrap();
        assert_eq!(optional.extract(&Some(Order { id: 4 })).unwrap().len(), 1);
        assert!(optional.extract(&Option::<Order>::None).is_none());
    }

    #[test]
    fn test_extract_wrong_type_is_none() {
        let registry = Registry::<InMemoryStore>::new();
        registry.register::<Order>();

        let single = registry.lookup(TypeId::of::<Order>()).unwrap();
        assert!(single.extract(&"not an order".to_string()).is_none());
    }

    #[tokio::test]
    async fn test_batch_fetch_is_invalid_destination() {
        let registry = Registry::<InMemoryStore>::new();
        registry.register::<Order>();
        let store = InMemoryStore::new();

        let batch = registry.lookup(TypeId::of::<Vec<Order>>()).unwrap();
        let mut dest: Vec<Order> = Vec::new();
        let err = batch.fetch(&store, &mut dest, "id").await.unwrap_err();
        assert!(matches!(err, MirrorError::InvalidDestination(_)));
    }

    #[tokio::test]
    async fn test_fetch_into_box_and_unique_arc() {
        let registry = Registry::<InMemoryStore>::new();
        registry.register::<Order>();
        let store = InMemoryStore::new();
        store.put("order:5", &Order { id: 5 }).await.unwrap();

        let boxed = registry.lookup(TypeId::of::<Box<Order>>()).unwrap();
        let mut dest = Box::new(Order { id: 5 });
        boxed.fetch(&store, &mut dest, "id").await.unwrap();

        let arc = registry.lookup(TypeId::of::<Arc<Order>>()).unwrap();
        let mut unique = Arc::new(Order { id: 5 });
        arc.fetch(&store, &mut unique, "id").await.unwrap();

        let _other = Arc::clone(&unique);
        let err = arc.fetch(&store, &mut unique, "id").await.unwrap_err();
        assert!(matches!(err, MirrorError::InvalidDestination(_)));
    }

    #[tokio::test]
    async fn test_fetch_into_none_is_invalid_destination() {
        let registry = Registry::<InMemoryStore>::new();
        registry.register::<Order>();
        let store = InMemoryStore::new();

        let optional = registry.lookup(TypeId::of::<Option<Order>>()).unwrap();
        let mut dest: Option<Order> = None;
        let err = optional.fetch(&store, &mut dest, "id").await.unwrap_err();
        assert!(matches!(err, MirrorError::InvalidDestination(_)));
    }
}
