//! Resolution requests. A [Dependency] carries the requested [Instance] along with the chain of
//! receivers currently being constructed, which is needed for target availability, cycle and
//! expiry checks, and for meaningful error messages.

use crate::instance::{Instance, Name};
use crate::resource::Resource;
use crate::scope::Expiry;
use crate::types::Type;
use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// A single frame of an injection chain: the receiver resource being constructed, the instance it
/// was requested as and the expiry of its binding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Injection {
    dependency: Instance,
    target: Resource,
    expiry: Expiry,
}

impl Injection {
    #[inline]
    pub fn dependency(&self) -> &Instance {
        &self.dependency
    }

    #[inline]
    pub fn target(&self) -> &Resource {
        &self.target
    }

    #[inline]
    pub fn expiry(&self) -> Expiry {
        self.expiry
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dependency {
    instance: Instance,
    injections: Vec<Injection>,
}

impl Dependency {
    /// Top-level request for the given instance.
    pub fn new(instance: Instance) -> Self {
        Self {
            instance,
            injections: vec![],
        }
    }

    /// Top-level request for the default instance of the given type.
    pub fn of(ty: Type) -> Self {
        Self::new(Instance::default_of(ty))
    }

    pub fn named(name: Name, ty: Type) -> Self {
        Self::new(Instance::new(name, ty))
    }

    /// Top-level request for any instance of the given type.
    pub fn any_typed(ty: Type) -> Self {
        Self::new(Instance::any_of(ty))
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    #[inline]
    pub fn injections(&self) -> &[Injection] {
        &self.injections
    }

    /// Request for another instance within the same injection context.
    pub fn instanced(&self, instance: Instance) -> Self {
        Self {
            instance,
            injections: self.injections.clone(),
        }
    }

    /// Request for another type with the same name within the same injection context.
    pub fn typed(&self, ty: Type) -> Self {
        self.instanced(self.instance.typed(ty))
    }

    /// Request for any instance of the given type within the same injection context.
    pub fn any_of(&self, ty: Type) -> Self {
        self.instanced(Instance::any_of(ty))
    }

    /// Context for dependencies of `target`, which is injected to satisfy this dependency.
    pub fn injecting_into(&self, target: &Resource, expiry: Expiry) -> Self {
        let mut injections = self.injections.clone();
        injections.push(Injection {
            dependency: self.instance.clone(),
            target: target.clone(),
            expiry,
        });

        Self {
            instance: self.instance.clone(),
            injections,
        }
    }

    /// Checks if the given instance is already being constructed on this chain.
    pub fn is_injecting_into(&self, instance: &Instance) -> bool {
        self.injections
            .iter()
            .any(|injection| injection.target.instance() == instance)
    }

    /// The resource receiving this dependency directly, if any.
    pub fn receiver(&self) -> Option<&Resource> {
        self.injections.last().map(|injection| &injection.target)
    }

    /// The nearest receiver frame whose expiry is relevant.
    pub fn expiring_receiver(&self) -> Option<&Injection> {
        self.injections
            .iter()
            .rev()
            .find(|injection| !injection.expiry.is_ignored())
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.instance)?;
        if !self.injections.is_empty() {
            write!(
                f,
                " <- {}",
                self.injections
                    .iter()
                    .rev()
                    .map(|injection| &injection.target)
                    .join(" <- ")
            )?;
        }

        Ok(())
    }
}

/// A dependency paired with the binding chosen to satisfy it. Repositories use the serial
/// number and cardinality to index their caches.
#[derive(Clone, Debug)]
pub struct Demand {
    pub resource: Resource,
    pub dependency: Dependency,
    pub serial_number: usize,
    pub cardinality: usize,
}
