//! Type-erased access to resolved instances.

use crate::dependency::Dependency;
use crate::error::InjectionError;
use crate::instance::{Instance, Name};
use crate::types::Type;
#[cfg(test)]
use mockall::automock;
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub type InstancePtr<T> = Arc<T>;

pub type AnyPtr = InstancePtr<dyn Any + Send + Sync + 'static>;

/// Resolved value of an array type. Arrays are resolved as `InstancePtr<Sequence>`.
pub type Sequence = Vec<AnyPtr>;

/// Resolves dependencies to type-erased instances.
#[cfg_attr(test, automock)]
pub trait Resolver {
    fn resolve(&self, dependency: &Dependency) -> Result<AnyPtr, InjectionError>;
}

/// Helper trait for [Resolver] providing strongly-typed access.
pub trait TypedResolver {
    /// Resolves the given instance and downcasts it to `T`.
    fn resolve_typed<T: Any + Send + Sync>(
        &self,
        name: Name,
        ty: Type,
    ) -> Result<InstancePtr<T>, InjectionError>;

    /// Resolves all instances applicable for the given type and downcasts each to `T`.
    fn resolve_all_typed<T: Any + Send + Sync>(
        &self,
        ty: Type,
    ) -> Result<Vec<InstancePtr<T>>, InjectionError>;
}

impl<R: Resolver + ?Sized> TypedResolver for R {
    fn resolve_typed<T: Any + Send + Sync>(
        &self,
        name: Name,
        ty: Type,
    ) -> Result<InstancePtr<T>, InjectionError> {
        let dependency = Dependency::new(Instance::new(name, ty));
        self.resolve(&dependency)
            .and_then(|instance| downcast(instance, &dependency))
    }

    fn resolve_all_typed<T: Any + Send + Sync>(
        &self,
        ty: Type,
    ) -> Result<Vec<InstancePtr<T>>, InjectionError> {
        let dependency = Dependency::any_typed(Type::array_of(ty));
        let sequence = downcast::<Sequence>(self.resolve(&dependency)?, &dependency)?;

        sequence
            .iter()
            .map(|instance| downcast(instance.clone(), &dependency))
            .collect()
    }
}

pub type ResolverPtr = Arc<dyn Resolver + Send + Sync>;

/// Lazy handle for a dependency, resolved anew on each [Provider::provide] call. Values of
/// provider types are resolved as `InstancePtr<Provider>`.
#[derive(Clone)]
pub struct Provider {
    dependency: Dependency,
    resolver: ResolverPtr,
}

impl Provider {
    pub fn new(dependency: Dependency, resolver: ResolverPtr) -> Self {
        Self {
            dependency,
            resolver,
        }
    }

    #[inline]
    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }

    pub fn provide(&self) -> Result<AnyPtr, InjectionError> {
        self.resolver.resolve(&self.dependency)
    }

    pub fn provide_typed<T: Any + Send + Sync>(&self) -> Result<InstancePtr<T>, InjectionError> {
        downcast(self.provide()?, &self.dependency)
    }
}

impl Debug for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "provides<{}>", self.dependency)
    }
}

pub(crate) fn downcast<T: Any + Send + Sync>(
    instance: AnyPtr,
    dependency: &Dependency,
) -> Result<InstancePtr<T>, InjectionError> {
    instance
        .downcast::<T>()
        .map_err(|_| InjectionError::IncompatibleInstance(dependency.to_string()))
}
