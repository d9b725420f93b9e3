//! [Injectron]s are the live handles for finalized declarations inside one injector.

use crate::bindings::Declaration;
use crate::declaration::Source;
use crate::dependency::{Demand, Dependency};
use crate::error::InjectionError;
use crate::resolver::{AnyPtr, Resolver};
use crate::resource::{Resource, Resourced};
use crate::scope::{Expiry, Injectable, RepositoryPtr};
use crate::supplier::{Supplier, SupplierPtr};
use derivative::Derivative;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// A finalized declaration bound to the repository of its scope. The serial number is unique
/// within the owning injector and, together with the cardinality, indexes repository caches.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Injectron {
    resource: Resource,
    source: Source,
    scope: Cow<'static, str>,
    expiry: Expiry,
    serial_number: usize,
    cardinality: usize,
    #[derivative(Debug = "ignore")]
    supplier: SupplierPtr,
    #[derivative(Debug = "ignore")]
    repository: RepositoryPtr,
}

impl Injectron {
    pub(crate) fn new(
        declaration: Declaration,
        expiry: Expiry,
        repository: RepositoryPtr,
        serial_number: usize,
        cardinality: usize,
    ) -> Self {
        Self {
            resource: declaration.resource,
            source: declaration.source,
            scope: declaration.scope,
            expiry,
            serial_number,
            cardinality,
            supplier: declaration.supplier,
            repository,
        }
    }

    #[inline]
    pub fn source(&self) -> &Source {
        &self.source
    }

    #[inline]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[inline]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    #[inline]
    pub fn serial_number(&self) -> usize {
        self.serial_number
    }

    #[inline]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Returns the instance for the given dependency from the repository, constructing it on
    /// cache miss. No checks are performed - callers are responsible for applicability, cycles
    /// and expiry.
    pub fn instance_for(
        &self,
        dependency: &Dependency,
        resolver: &dyn Resolver,
    ) -> Result<AnyPtr, InjectionError> {
        let demand = Demand {
            resource: self.resource.clone(),
            dependency: dependency.clone(),
            serial_number: self.serial_number,
            cardinality: self.cardinality,
        };

        self.repository.serve(
            &demand,
            &SupplyingInjectable {
                supplier: self.supplier.as_ref(),
                context: dependency.injecting_into(&self.resource, self.expiry),
                resolver,
            },
        )
    }
}

impl Resourced for Injectron {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

impl Display for Injectron {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] {}", self.resource, self.scope, self.source)
    }
}

struct SupplyingInjectable<'a> {
    supplier: &'a (dyn Supplier + Send + Sync),
    context: Dependency,
    resolver: &'a dyn Resolver,
}

impl Injectable for SupplyingInjectable<'_> {
    fn instance_for(&self, _demand: &Demand) -> Result<AnyPtr, InjectionError> {
        self.supplier.supply(&self.context, self.resolver)
    }
}

#[cfg(test)]
mod tests {
    use crate::bindings::Binding;
    use crate::declaration::{DeclarationType, Source};
    use crate::dependency::Dependency;
    use crate::injectron::Injectron;
    use crate::instance::Instance;
    use crate::resolver::MockResolver;
    use crate::resource::Resource;
    use crate::scope::{ApplicationScope, Expiry, Scope};
    use crate::supplier::ConstantSupplier;
    use crate::types::Type;
    use std::sync::Arc;

    #[test]
    fn should_serve_from_repository() {
        let declaration = Binding::new(
            Resource::everywhere(Instance::default_of(Type::of::<i32>())),
            "APPLICATION",
            Source::new("test", 0, DeclarationType::Explicit),
        )
        .supplied_by(Arc::new(ConstantSupplier(Arc::new(1_i32))));
        let injectron = Injectron::new(declaration, Expiry::NEVER, ApplicationScope.init(), 0, 1);

        let dependency = Dependency::of(Type::of::<i32>());
        let first = injectron
            .instance_for(&dependency, &MockResolver::new())
            .unwrap();
        let second = injectron
            .instance_for(&dependency, &MockResolver::new())
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first.downcast::<i32>().unwrap(), 1);
        assert_eq!(injectron.to_string(), "i32 [APPLICATION] test#0[EXPLICIT]");
    }
}
