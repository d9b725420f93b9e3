//! Construction strategies. Every finished declaration carries a [Supplier], which creates the
//! bound value on cache miss, resolving its own dependencies within the current injection
//! context.

use crate::dependency::Dependency;
use crate::error::InjectionError;
use crate::inspector::{Constructor, FactoryMethod};
use crate::instance::Instance;
use crate::resolver::{downcast, AnyPtr, InstancePtr, Resolver, Sequence};
use crate::types::Type;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

/// Creates instances for a binding. The given dependency is the request being satisfied, with the
/// bound resource already pushed as its receiver.
pub trait Supplier {
    fn supply(&self, dependency: &Dependency, resolver: &dyn Resolver)
        -> Result<AnyPtr, InjectionError>;
}

pub type SupplierPtr = Arc<dyn Supplier + Send + Sync>;

/// External source of configuration values.
#[cfg_attr(test, automock)]
pub trait Configuration {
    /// Returns a value of the given type stored under `key`, if present and convertible.
    fn value(&self, ty: &Type, key: &str) -> Option<AnyPtr>;
}

pub type ConfigurationPtr = Arc<dyn Configuration + Send + Sync>;

/// A constructor or method argument.
#[derive(Clone)]
pub enum Argument {
    /// Resolved up front.
    Constant(AnyPtr),
    /// Resolved on each construction.
    Instance(Instance),
    /// Created on each construction by a dedicated supplier.
    Supplied { ty: Type, supplier: SupplierPtr },
}

impl Argument {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        match self {
            Argument::Constant(value) => Ok(value.clone()),
            Argument::Instance(instance) => {
                resolver.resolve(&dependency.instanced(instance.clone()))
            }
            Argument::Supplied { ty, supplier } => {
                supplier.supply(&dependency.instanced(Instance::default_of(ty.clone())), resolver)
            }
        }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Argument::Constant(_))
    }
}

fn supply_all(
    arguments: &[Argument],
    dependency: &Dependency,
    resolver: &dyn Resolver,
) -> Result<Vec<AnyPtr>, InjectionError> {
    arguments
        .iter()
        .map(|argument| argument.supply(dependency, resolver))
        .collect()
}

/// Always returns the same value.
pub struct ConstantSupplier(pub AnyPtr);

impl Supplier for ConstantSupplier {
    fn supply(
        &self,
        _dependency: &Dependency,
        _resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        Ok(self.0.clone())
    }
}

/// Invokes a constructor with its arguments.
pub struct ConstructorSupplier {
    constructor: Constructor,
    arguments: Vec<Argument>,
}

impl ConstructorSupplier {
    pub fn new(constructor: Constructor, arguments: Vec<Argument>) -> Self {
        Self {
            constructor,
            arguments,
        }
    }
}

impl Supplier for ConstructorSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        let arguments = supply_all(&self.arguments, dependency, resolver)?;
        (self.constructor.invoke)(&arguments).map_err(|error| InjectionError::ConstructionFailed {
            dependency: dependency.to_string(),
            error,
        })
    }
}

/// Invokes a factory method, on the resolved instance of its declaring type unless static.
pub struct FactoryMethodSupplier {
    method: FactoryMethod,
    arguments: Vec<Argument>,
}

impl FactoryMethodSupplier {
    pub fn new(method: FactoryMethod, arguments: Vec<Argument>) -> Self {
        Self { method, arguments }
    }
}

impl Supplier for FactoryMethodSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        let owner = if self.method.is_static {
            None
        } else {
            Some(resolver.resolve(&dependency.instanced(Instance::default_of(
                self.method.declaring_type.clone(),
            )))?)
        };

        let arguments = supply_all(&self.arguments, dependency, resolver)?;
        (self.method.invoke)(owner.as_ref(), &arguments).map_err(|error| {
            InjectionError::ConstructionFailed {
                dependency: dependency.to_string(),
                error,
            }
        })
    }
}

/// Delegates to another binding.
pub struct InstanceSupplier(pub Instance);

impl Supplier for InstanceSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        resolver.resolve(&dependency.instanced(self.0.clone()))
    }
}

/// Resolves a bound [Supplier] of the given type under any name and lets it supply the value.
/// Suppliers are resolved as `InstancePtr<SupplierPtr>`.
pub struct ReferenceSupplier(pub Type);

impl Supplier for ReferenceSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        let reference = dependency.any_of(self.0.clone());
        let supplier = downcast::<SupplierPtr>(resolver.resolve(&reference)?, &reference)?;
        supplier.supply(dependency, resolver)
    }
}

/// Looks up a value in the bound [Configuration].
pub struct ConfigurationSupplier {
    ty: Type,
    key: String,
}

impl ConfigurationSupplier {
    pub fn new(ty: Type, key: String) -> Self {
        Self { ty, key }
    }
}

impl Supplier for ConfigurationSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        let source = dependency.instanced(Instance::default_of(Type::configuration()));
        let configuration = downcast::<ConfigurationPtr>(resolver.resolve(&source)?, &source)?;

        configuration
            .value(&self.ty, &self.key)
            .ok_or_else(|| InjectionError::NoConfiguredValue {
                key: self.key.clone(),
                ty: self.ty.to_string(),
            })
    }
}

/// Resolves any instance of a narrower type. Raw targets take over the type parameters of the
/// request.
pub struct ForwardSupplier(pub Type);

impl Supplier for ForwardSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        let requested = dependency.instance().ty();
        let target = if !self.0.is_parameterized() && requested.is_parameterized() {
            self.0.clone().parameterized(requested.parameters().iter().cloned())
        } else {
            self.0.clone()
        };

        resolver.resolve(&dependency.any_of(target))
    }
}

/// Creates a [Sequence] from per-element strategies, in declared order.
pub struct ElementsSupplier(pub Vec<Argument>);

impl Supplier for ElementsSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        let elements: Sequence = supply_all(&self.0, dependency, resolver)?;
        Ok(InstancePtr::new(elements) as AnyPtr)
    }
}

/// Placeholder of a required binding which was not provided.
pub struct RequiredSupplier;

impl Supplier for RequiredSupplier {
    fn supply(
        &self,
        dependency: &Dependency,
        _resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        Err(InjectionError::UnmetRequirement(dependency.to_string()))
    }
}
