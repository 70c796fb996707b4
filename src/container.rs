//! Dependency container: keys map to factories with a lifetime policy.
//!
//! Singletons are built at most once, under a per-key mutex, the first time they are resolved.
//! Factories receive a [`ResolveContext`] carrying the chain of keys being resolved, which is
//! how cycles are caught before they deadlock on a singleton cell.

use crate::connection::Database;
use crate::error::{ContainerError, FactoryError};
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// A constructed, type-erased dependency.
pub type Dependency = Arc<dyn Any + Send + Sync>;

pub trait Factory: Send + Sync {
    fn build(&self, ctx: &ResolveContext<'_>) -> Result<Dependency, FactoryError>;
}

/// Adapts a closure returning a concrete type into a [`Factory`].
struct FnFactory<F, T> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T> Factory for FnFactory<F, T>
where
    F: Fn(&ResolveContext<'_>) -> Result<T, FactoryError> + Send + Sync,
    T: Any + Send + Sync,
{
    fn build(&self, ctx: &ResolveContext<'_>) -> Result<Dependency, FactoryError> {
        let value = (self.f)(ctx)?;
        Ok(Arc::new(value))
    }
}

struct ValueFactory(Dependency);

impl Factory for ValueFactory {
    fn build(&self, _ctx: &ResolveContext<'_>) -> Result<Dependency, FactoryError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Wrap a closure as a shareable factory.
pub fn factory_fn<F, T>(f: F) -> Arc<dyn Factory>
where
    F: Fn(&ResolveContext<'_>) -> Result<T, FactoryError> + Send + Sync + 'static,
    T: Any + Send + Sync,
{
    Arc::new(FnFactory {
        f,
        _marker: PhantomData,
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifetime {
    /// Built once, cached for the container's lifetime.
    #[default]
    Singleton,
    /// Built on every resolution.
    Transient,
}

pub struct Registration {
    lifetime: Lifetime,
    factory: Arc<dyn Factory>,
    cell: Mutex<Option<Dependency>>,
}

impl Registration {
    pub fn new(lifetime: Lifetime, factory: Arc<dyn Factory>) -> Self {
        Registration {
            lifetime,
            factory,
            cell: Mutex::new(None),
        }
    }

    pub fn singleton(factory: impl Factory + 'static) -> Self {
        Self::new(Lifetime::Singleton, Arc::new(factory))
    }

    pub fn transient(factory: impl Factory + 'static) -> Self {
        Self::new(Lifetime::Transient, Arc::new(factory))
    }

    pub fn singleton_fn<F, T>(f: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> Result<T, FactoryError> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self::new(Lifetime::Singleton, factory_fn(f))
    }

    pub fn transient_fn<F, T>(f: F) -> Self
    where
        F: Fn(&ResolveContext<'_>) -> Result<T, FactoryError> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Self::new(Lifetime::Transient, factory_fn(f))
    }

    /// An already-built singleton.
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        let value: Dependency = Arc::new(value);
        Registration {
            lifetime: Lifetime::Singleton,
            factory: Arc::new(ValueFactory(Arc::clone(&value))),
            cell: Mutex::new(Some(value)),
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

pub struct Container {
    registrations: RwLock<HashMap<String, Arc<Registration>>>,
    database: Database,
}

impl Container {
    pub fn new(database: Database) -> Self {
        Container {
            registrations: RwLock::new(HashMap::new()),
            database,
        }
    }

    /// Process-wide database handle given to model binders.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Register `key`. A key can be registered once.
    pub fn register(&self, key: impl Into<String>, registration: Registration) -> Result<(), ContainerError> {
        let key = key.into();
        let mut registrations = self.registrations.write().map_err(|_| ContainerError::Poisoned)?;
        if registrations.contains_key(&key) {
            return Err(ContainerError::DuplicateKey(key));
        }
        tracing::trace!(key = %key, lifetime = ?registration.lifetime, "registered");
        registrations.insert(key, Arc::new(registration));
        Ok(())
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.registrations
            .read()
            .map(|r| r.contains_key(key))
            .unwrap_or(false)
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .registrations
            .read()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Root context with an empty resolution path.
    pub fn context(&self) -> ResolveContext<'_> {
        ResolveContext {
            container: self,
            path: Vec::new(),
        }
    }

    pub fn resolve(&self, key: &str) -> Result<Dependency, ContainerError> {
        self.context().resolve(key)
    }

    pub fn resolve_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, ContainerError> {
        self.context().resolve_as(key)
    }

    fn registration(&self, key: &str) -> Result<Arc<Registration>, ContainerError> {
        let registrations = self.registrations.read().map_err(|_| ContainerError::Poisoned)?;
        registrations
            .get(key)
            .cloned()
            .ok_or_else(|| ContainerError::Unknown(key.to_string()))
    }
}

/// Resolution scope handed to factories. Resolving through it extends the chain of keys in flight.
pub struct ResolveContext<'a> {
    container: &'a Container,
    path: Vec<String>,
}

impl<'a> ResolveContext<'a> {
    pub fn container(&self) -> &'a Container {
        self.container
    }

    pub fn database(&self) -> &'a Database {
        &self.container.database
    }

    /// Keys currently being resolved, outermost first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn resolve(&self, key: &str) -> Result<Dependency, ContainerError> {
        if self.path.iter().any(|k| k == key) {
            let mut cycle = self.path.clone();
            cycle.push(key.to_string());
            return Err(ContainerError::Cycle(cycle));
        }
        let registration = self.container.registration(key)?;
        let mut path = self.path.clone();
        path.push(key.to_string());
        let child = ResolveContext {
            container: self.container,
            path,
        };
        let construct = |ctx: &ResolveContext<'_>| {
            registration
                .factory
                .build(ctx)
                .map_err(|source| ContainerError::Construction {
                    key: key.to_string(),
                    source,
                })
        };

        match registration.lifetime {
            Lifetime::Transient => construct(&child),
            Lifetime::Singleton => {
                // A factory that panicked never filled the cell, so a poisoned cell is still empty or valid.
                let mut cell = registration.cell.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(value) = cell.as_ref() {
                    return Ok(Arc::clone(value));
                }
                let value = construct(&child)?;
                tracing::debug!(key = %key, "singleton constructed");
                *cell = Some(Arc::clone(&value));
                Ok(value)
            }
        }
    }

    pub fn resolve_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, ContainerError> {
        self.resolve(key)?
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn container() -> Container {
        Container::new(Database::new())
    }

    #[test]
    fn singleton_is_built_once() {
        let c = container();
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        c.register(
            "counterValue",
            Registration::singleton_fn(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))),
        )
        .unwrap();
        let a = c.resolve_as::<usize>("counterValue").unwrap();
        let b = c.resolve_as::<usize>("counterValue").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_resolvers_share_one_singleton() {
        let c = container();
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        c.register(
            "slow",
            Registration::singleton_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(String::from("built"))
            }),
        )
        .unwrap();
        let resolved: Vec<Arc<String>> = std::thread::scope(|s| {
            let c = &c;
            let handles: Vec<_> = (0..8).map(|_| s.spawn(move || c.resolve_as::<String>("slow").unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(resolved.iter().all(|r| Arc::ptr_eq(r, &resolved[0])));
    }

    #[test]
    fn transient_is_built_every_time() {
        let c = container();
        let builds = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&builds);
        c.register(
            "tick",
            Registration::transient_fn(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst))),
        )
        .unwrap();
        assert_eq!(*c.resolve_as::<usize>("tick").unwrap(), 0);
        assert_eq!(*c.resolve_as::<usize>("tick").unwrap(), 1);
    }

    #[test]
    fn nested_resolution_and_values() {
        let c = container();
        c.register("greeting", Registration::value(String::from("hello"))).unwrap();
        c.register(
            "shout",
            Registration::singleton_fn(|ctx| {
                let greeting = ctx.resolve_as::<String>("greeting")?;
                Ok(greeting.to_uppercase())
            }),
        )
        .unwrap();
        assert_eq!(c.resolve_as::<String>("shout").unwrap().as_str(), "HELLO");
    }

    #[test]
    fn duplicate_and_unknown_keys() {
        let c = container();
        c.register("a", Registration::value(1u8)).unwrap();
        assert!(matches!(
            c.register("a", Registration::value(2u8)),
            Err(ContainerError::DuplicateKey(k)) if k == "a"
        ));
        assert!(matches!(c.resolve("b"), Err(ContainerError::Unknown(k)) if k == "b"));
        assert_eq!(c.keys(), vec!["a".to_string()]);
    }

    #[test]
    fn cycles_are_reported_with_their_path() {
        let c = container();
        c.register("a", Registration::singleton_fn(|ctx| ctx.resolve("b").map(|_| ()).map_err(Into::into)))
            .unwrap();
        c.register("b", Registration::singleton_fn(|ctx| ctx.resolve("a").map(|_| ()).map_err(Into::into)))
            .unwrap();
        let err = c.resolve("a").unwrap_err();
        let mut source: &(dyn std::error::Error + 'static) = &err;
        while let Some(next) = source.source() {
            source = next;
        }
        assert_eq!(source.to_string(), "circular dependency: a -> b -> a");
    }

    #[test]
    fn failed_singleton_is_retried_on_next_resolve() {
        let c = container();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        c.register(
            "flaky",
            Registration::singleton_fn(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("first attempt fails".into())
                } else {
                    Ok(7u32)
                }
            }),
        )
        .unwrap();
        assert!(matches!(c.resolve("flaky"), Err(ContainerError::Construction { .. })));
        assert_eq!(*c.resolve_as::<u32>("flaky").unwrap(), 7);
    }

    #[test]
    fn panicking_factory_does_not_wedge_the_key() {
        let c = container();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        c.register(
            "fragile",
            Registration::singleton_fn(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    panic!("first build panics");
                }
                Ok(3u16)
            }),
        )
        .unwrap();
        let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| c.resolve("fragile")));
        assert!(first.is_err());
        assert_eq!(*c.resolve_as::<u16>("fragile").unwrap(), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn wrong_type_is_a_mismatch() {
        let c = container();
        c.register("n", Registration::value(5i64)).unwrap();
        assert!(matches!(
            c.resolve_as::<String>("n"),
            Err(ContainerError::TypeMismatch { .. })
        ));
    }
}
