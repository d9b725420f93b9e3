//! Instances are contained in [Repository]s created by [Scope]s - policies which decide when to
//! reuse or create an instance. Every injector initializes one repository per scope and shares it
//! between all bindings in that scope. There's an application-wide one for singletons, one for
//! per-call instances, one keeping separate singletons for each thread, and several caching by
//! keys deduced from the request.
//!
//! Each scope reports an [Expiry]. An instance must never be injected into one which lives longer,
//! e.g. a per-call instance cannot be fed into an application singleton, since the singleton would
//! pin a single instance forever.

use crate::dependency::Demand;
use crate::error::InjectionError;
use crate::resolver::AnyPtr;
use fxhash::FxHashMap;
use itertools::Itertools;
#[cfg(test)]
use mockall::automock;
use once_cell::sync::OnceCell;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, ThreadId};
use tracing::debug;

/// Name of the [InjectionScope].
pub const INJECTION: &str = "INJECTION";

/// Name of the [ApplicationScope].
pub const APPLICATION: &str = "APPLICATION";

/// Name of the [ThreadScope].
pub const THREAD: &str = "THREAD";

/// Name of the [KeyDeductionScope] keyed by [DependencyTypeKey].
pub const DEPENDENCY_TYPE: &str = "DEPENDENCY_TYPE";

/// Name of the [KeyDeductionScope] keyed by [DependencyInstanceKey].
pub const DEPENDENCY_INSTANCE: &str = "DEPENDENCY_INSTANCE";

/// Name of the [KeyDeductionScope] keyed by [TargetInstanceKey].
pub const TARGET_INSTANCE: &str = "TARGET_INSTANCE";

/// Name of the [KeyDeductionScope] keyed by both dependency instance and target path.
pub const DEPENDENCY: &str = "DEPENDENCY";

/// How often instances of a scope are replaced. Greater values expire more frequently.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expiry(Option<u32>);

impl Expiry {
    /// Not taken into account when checking expiry of receivers.
    pub const IGNORE: Expiry = Expiry(None);
    pub const NEVER: Expiry = Expiry(Some(0));
    pub const THREAD: Expiry = Expiry(Some(1000));
    pub const INJECTION: Expiry = Expiry(Some(u32::MAX));

    pub const fn expires(frequency: u32) -> Self {
        Self(Some(frequency))
    }

    #[inline]
    pub fn is_ignored(self) -> bool {
        self.0.is_none()
    }

    pub fn more_frequent_than(self, other: Expiry) -> bool {
        match (self.0, other.0) {
            (Some(frequency), Some(other)) => frequency > other,
            _ => false,
        }
    }
}

impl Display for Expiry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Expiry::IGNORE => f.write_str("ignore"),
            Expiry::NEVER => f.write_str("never"),
            Expiry::THREAD => f.write_str("thread"),
            Expiry::INJECTION => f.write_str("injection"),
            Expiry(Some(frequency)) => write!(f, "expires({frequency})"),
        }
    }
}

/// Creates a new instance on cache miss.
#[cfg_attr(test, automock)]
pub trait Injectable {
    fn instance_for(&self, demand: &Demand) -> Result<AnyPtr, InjectionError>;
}

/// Cache of instances of a single scope session.
pub trait Repository {
    /// Returns a cached instance for the demand or creates one using the injectable.
    fn serve(&self, demand: &Demand, injectable: &dyn Injectable)
        -> Result<AnyPtr, InjectionError>;
}

pub type RepositoryPtr = Arc<dyn Repository + Send + Sync>;

/// Factory for [Repository]s.
#[cfg_attr(test, automock)]
pub trait Scope {
    fn init(&self) -> RepositoryPtr;

    fn expiry(&self) -> Expiry;
}

pub type ScopePtr = Arc<dyn Scope + Send + Sync>;

/// Scopes known by an injector, by name.
pub type ScopeRegistry = FxHashMap<String, ScopePtr>;

/// All built-in scopes, registered under their names.
pub fn default_scopes() -> ScopeRegistry {
    let mut scopes = ScopeRegistry::default();
    scopes.insert(INJECTION.to_string(), Arc::new(InjectionScope));
    scopes.insert(APPLICATION.to_string(), Arc::new(ApplicationScope));
    scopes.insert(THREAD.to_string(), Arc::new(ThreadScope));
    scopes.insert(
        DEPENDENCY_TYPE.to_string(),
        Arc::new(KeyDeductionScope::new(Arc::new(DependencyTypeKey))),
    );
    scopes.insert(
        DEPENDENCY_INSTANCE.to_string(),
        Arc::new(KeyDeductionScope::new(Arc::new(DependencyInstanceKey))),
    );
    scopes.insert(
        TARGET_INSTANCE.to_string(),
        Arc::new(KeyDeductionScope::new(Arc::new(TargetInstanceKey))),
    );
    scopes.insert(
        DEPENDENCY.to_string(),
        Arc::new(KeyDeductionScope::new(Arc::new(ConcatKeys(vec![
            Arc::new(DependencyInstanceKey),
            Arc::new(TargetInstanceKey),
        ])))),
    );
    scopes
}

/// A scope which creates a new instance on each request.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct InjectionScope;

impl Scope for InjectionScope {
    fn init(&self) -> RepositoryPtr {
        Arc::new(InjectionRepository)
    }

    #[inline]
    fn expiry(&self) -> Expiry {
        Expiry::INJECTION
    }
}

#[derive(Default, Copy, Clone, Debug)]
struct InjectionRepository;

impl Repository for InjectionRepository {
    #[inline]
    fn serve(
        &self,
        demand: &Demand,
        injectable: &dyn Injectable,
    ) -> Result<AnyPtr, InjectionError> {
        injectable.instance_for(demand)
    }
}

/// A scope sharing a single instance per binding for the whole lifetime of the injector.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct ApplicationScope;

impl Scope for ApplicationScope {
    fn init(&self) -> RepositoryPtr {
        Arc::new(ResourceRepository::default())
    }

    #[inline]
    fn expiry(&self) -> Expiry {
        Expiry::NEVER
    }
}

/// Caches one instance per binding in a slot array indexed by serial number. Each slot is
/// initialized at most once: concurrent callers for the same slot wait for the first construction,
/// while other slots stay available. Failed constructions are not cached.
#[derive(Default, Debug)]
pub struct ResourceRepository {
    instances: OnceCell<Box<[OnceCell<AnyPtr>]>>,
}

impl Repository for ResourceRepository {
    fn serve(
        &self,
        demand: &Demand,
        injectable: &dyn Injectable,
    ) -> Result<AnyPtr, InjectionError> {
        let instances = self
            .instances
            .get_or_init(|| (0..demand.cardinality).map(|_| OnceCell::new()).collect());

        let Some(slot) = instances.get(demand.serial_number) else {
            return injectable.instance_for(demand);
        };

        slot.get_or_try_init(|| injectable.instance_for(demand)).cloned()
    }
}

/// A scope keeping separate application-like instances for every calling thread.
#[derive(Default, Copy, Clone, Eq, PartialEq, Debug)]
pub struct ThreadScope;

impl Scope for ThreadScope {
    fn init(&self) -> RepositoryPtr {
        Arc::new(ThreadRepository::default())
    }

    #[inline]
    fn expiry(&self) -> Expiry {
        Expiry::THREAD
    }
}

/// Keeps a [ResourceRepository] per thread. Repositories of finished threads are not released
/// until the whole repository is dropped together with its injector.
#[derive(Default)]
struct ThreadRepository {
    repositories: RwLock<FxHashMap<ThreadId, RepositoryPtr>>,
}

impl ThreadRepository {
    fn current(&self) -> RepositoryPtr {
        let id = thread::current().id();
        if let Some(repository) = self
            .repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
        {
            return repository.clone();
        }

        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id)
            .or_insert_with(|| {
                debug!(?id, "Creating repository for thread.");
                Arc::new(ResourceRepository::default())
            })
            .clone()
    }
}

impl Repository for ThreadRepository {
    fn serve(
        &self,
        demand: &Demand,
        injectable: &dyn Injectable,
    ) -> Result<AnyPtr, InjectionError> {
        self.current().serve(demand, injectable)
    }
}

/// Derives cache keys from demands.
pub trait KeyDeduction {
    fn deduce(&self, demand: &Demand) -> String;
}

pub type KeyDeductionPtr = Arc<dyn KeyDeduction + Send + Sync>;

/// Keys by the requested type.
#[derive(Default, Copy, Clone, Debug)]
pub struct DependencyTypeKey;

impl KeyDeduction for DependencyTypeKey {
    fn deduce(&self, demand: &Demand) -> String {
        demand.dependency.instance().ty().to_string()
    }
}

/// Keys by the requested type and name.
#[derive(Default, Copy, Clone, Debug)]
pub struct DependencyInstanceKey;

impl KeyDeduction for DependencyInstanceKey {
    fn deduce(&self, demand: &Demand) -> String {
        let instance = demand.dependency.instance();
        format!("{}@{}", instance.name(), instance.ty())
    }
}

/// Keys by the path of receivers the instance is injected into.
#[derive(Default, Copy, Clone, Debug)]
pub struct TargetInstanceKey;

impl KeyDeduction for TargetInstanceKey {
    fn deduce(&self, demand: &Demand) -> String {
        demand
            .dependency
            .injections()
            .iter()
            .rev()
            .map(|injection| injection.target().instance())
            .join(" <- ")
    }
}

/// Concatenation of multiple keys.
#[derive(Clone)]
pub struct ConcatKeys(pub Vec<KeyDeductionPtr>);

impl KeyDeduction for ConcatKeys {
    fn deduce(&self, demand: &Demand) -> String {
        self.0
            .iter()
            .map(|deduction| deduction.deduce(demand))
            .join("|")
    }
}

/// A scope caching instances by keys deduced from the demand.
#[derive(Clone)]
pub struct KeyDeductionScope {
    deduction: KeyDeductionPtr,
}

impl KeyDeductionScope {
    pub fn new(deduction: KeyDeductionPtr) -> Self {
        Self { deduction }
    }
}

impl Scope for KeyDeductionScope {
    fn init(&self) -> RepositoryPtr {
        Arc::new(KeyRepository {
            deduction: self.deduction.clone(),
            instances: Default::default(),
        })
    }

    #[inline]
    fn expiry(&self) -> Expiry {
        Expiry::NEVER
    }
}

/// Every key gets its own cell, so construction for one key never blocks others.
struct KeyRepository {
    deduction: KeyDeductionPtr,
    instances: RwLock<FxHashMap<(usize, String), Arc<OnceCell<AnyPtr>>>>,
}

impl KeyRepository {
    fn cell(&self, key: (usize, String)) -> Arc<OnceCell<AnyPtr>> {
        if let Some(cell) = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return cell.clone();
        }

        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .clone()
    }
}

impl Repository for KeyRepository {
    fn serve(
        &self,
        demand: &Demand,
        injectable: &dyn Injectable,
    ) -> Result<AnyPtr, InjectionError> {
        let cell = self.cell((demand.serial_number, self.deduction.deduce(demand)));
        cell.get_or_try_init(|| injectable.instance_for(demand)).cloned()
    }
}

/// Combines two repositories, so `dest` asks `src` for missing instances at most once and keeps
/// them afterwards.
pub fn as_snapshot(src: RepositoryPtr, dest: RepositoryPtr) -> RepositoryPtr {
    Arc::new(SnapshotRepository { src, dest })
}

struct SnapshotRepository {
    src: RepositoryPtr,
    dest: RepositoryPtr,
}

impl Repository for SnapshotRepository {
    fn serve(
        &self,
        demand: &Demand,
        injectable: &dyn Injectable,
    ) -> Result<AnyPtr, InjectionError> {
        self.dest.serve(
            demand,
            &SnapshotInjectable {
                src: self.src.as_ref(),
                injectable,
            },
        )
    }
}

struct SnapshotInjectable<'a> {
    src: &'a (dyn Repository + Send + Sync),
    injectable: &'a dyn Injectable,
}

impl Injectable for SnapshotInjectable<'_> {
    fn instance_for(&self, demand: &Demand) -> Result<AnyPtr, InjectionError> {
        self.src.serve(demand, self.injectable)
    }
}
