//! [Resource]s are the unit of uniqueness among bindings: an [Instance] plus a [Target] which
//! restricts the injection context it is available in.

use crate::dependency::Dependency;
use crate::instance::{Instance, Name};
use crate::precision::{more_precise_than2, PreciserThan};
use crate::types::Type;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Describes which receivers may get a resource injected. A target without a receiver is
/// available everywhere, including top-level requests.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Target {
    receiver: Option<Instance>,
    indirect: bool,
}

impl Target {
    pub fn everywhere() -> Self {
        Self::default()
    }

    /// Only available when directly injected into the given receiver.
    pub fn injecting_into(receiver: Instance) -> Self {
        Self {
            receiver: Some(receiver),
            indirect: false,
        }
    }

    /// Available anywhere within the dependency graph of the given receiver.
    pub fn within(receiver: Instance) -> Self {
        Self {
            receiver: Some(receiver),
            indirect: true,
        }
    }

    #[inline]
    pub fn receiver(&self) -> Option<&Instance> {
        self.receiver.as_ref()
    }

    #[inline]
    pub fn is_everywhere(&self) -> bool {
        self.receiver.is_none()
    }

    #[inline]
    pub fn is_indirect(&self) -> bool {
        self.indirect
    }

    pub fn is_available_for(&self, dependency: &Dependency) -> bool {
        let Some(receiver) = &self.receiver else {
            return true;
        };

        let matches = |frame: &Instance| {
            frame.ty().is_assignable_to(receiver.ty())
                && receiver.name().is_applicable_for(frame.name())
        };

        if self.indirect {
            dependency
                .injections()
                .iter()
                .any(|injection| matches(injection.target().instance()))
        } else {
            dependency
                .receiver()
                .map(|target| matches(target.instance()))
                .unwrap_or(false)
        }
    }
}

impl PreciserThan for Target {
    fn more_precise_than(&self, other: &Target) -> bool {
        match (&self.receiver, &other.receiver) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(receiver), Some(other_receiver)) => {
                if self.indirect != other.indirect {
                    return !self.indirect;
                }

                receiver.more_precise_than(other_receiver)
            }
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.receiver {
            None => f.write_str("everywhere"),
            Some(receiver) if self.indirect => write!(f, "within {receiver}"),
            Some(receiver) => write!(f, "into {receiver}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Resource {
    instance: Instance,
    target: Target,
}

impl Resource {
    pub fn new(instance: Instance, target: Target) -> Self {
        Self { instance, target }
    }

    pub fn everywhere(instance: Instance) -> Self {
        Self::new(instance, Target::everywhere())
    }

    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    #[inline]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[inline]
    pub fn name(&self) -> &Name {
        self.instance.name()
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        self.instance.ty()
    }

    /// Checks if this resource can satisfy the given dependency in its current injection
    /// context. [Name::ANY] requests accept every name.
    pub fn is_applicable_for(&self, dependency: &Dependency) -> bool {
        let requested = dependency.instance();

        self.ty().is_assignable_to(requested.ty())
            && (requested.name().is_any() || self.name().is_applicable_for(requested.name()))
            && self.target.is_available_for(dependency)
    }
}

impl PreciserThan for Resource {
    fn more_precise_than(&self, other: &Resource) -> bool {
        more_precise_than2(&self.instance, &other.instance, &self.target, &other.target)
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.target.is_everywhere() {
            write!(f, "{}", self.instance)
        } else {
            write!(f, "{} {}", self.instance, self.target)
        }
    }
}

/// Anything associated with a single [Resource].
pub trait Resourced {
    fn resource(&self) -> &Resource;
}

impl Resourced for Resource {
    fn resource(&self) -> &Resource {
        self
    }
}

impl<T: Resourced + ?Sized> Resourced for Arc<T> {
    fn resource(&self) -> &Resource {
        self.as_ref().resource()
    }
}
