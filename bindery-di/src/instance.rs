//! Identity of bindable and requestable things: a [Name] and a [Type] form an [Instance].

use crate::precision::{more_precise_than2, PreciserThan};
use crate::types::Type;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Distinguishes multiple bindings of the same type.
///
/// [Name::DEFAULT] is used for unqualified requests, [Name::ANY] matches every name. A name ending
/// with `*` is a prefix pattern, e.g. `db-*` is applicable for `db-main` and `db-replica`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Cow<'static, str>);

impl Name {
    pub const DEFAULT: Name = Name(Cow::Borrowed(""));
    pub const ANY: Name = Name(Cow::Borrowed("*"));

    pub fn named<N: Into<Cow<'static, str>>>(name: N) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn value(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        self.0 == "*"
    }

    #[inline]
    pub fn is_pattern(&self) -> bool {
        !self.is_any() && self.0.ends_with('*')
    }

    /// Checks if a binding with this name can serve a request for `other`.
    pub fn is_applicable_for(&self, other: &Name) -> bool {
        if self.is_any() || self == other {
            return true;
        }

        self.is_pattern()
            && !other.is_default()
            && other.0.starts_with(&self.0[..self.0.len() - 1])
    }

    fn rank(&self) -> u8 {
        if self.is_any() {
            0
        } else if self.is_default() {
            1
        } else if self.is_pattern() {
            2
        } else {
            3
        }
    }
}

impl PreciserThan for Name {
    fn more_precise_than(&self, other: &Name) -> bool {
        let (rank, other_rank) = (self.rank(), other.rank());
        if rank != other_rank {
            return rank > other_rank;
        }

        self.is_pattern() && self.0.len() > other.0.len() && self.is_applicable_for_pattern(other)
    }
}

impl Name {
    fn is_applicable_for_pattern(&self, pattern: &Name) -> bool {
        self.0.starts_with(&pattern.0[..pattern.0.len() - 1])
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Name {
    fn from(value: &'static str) -> Self {
        Self::named(value)
    }
}

/// A typed, optionally named thing which can be bound or requested. The [Name::ANY] name (and
/// the wildcard type) match everything when checking applicability, but not for equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Instance {
    name: Name,
    ty: Type,
}

impl Instance {
    pub fn new(name: Name, ty: Type) -> Self {
        Self { name, ty }
    }

    pub fn default_of(ty: Type) -> Self {
        Self::new(Name::DEFAULT, ty)
    }

    pub fn any_of(ty: Type) -> Self {
        Self::new(Name::ANY, ty)
    }

    /// Matches every name and type.
    pub fn any() -> Self {
        Self::any_of(Type::wildcard())
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn is_any(&self) -> bool {
        self.name.is_any() && self.ty.is_wildcard()
    }

    /// Same type, different name.
    pub fn named(&self, name: Name) -> Self {
        Self::new(name, self.ty.clone())
    }

    /// Same name, different type.
    pub fn typed(&self, ty: Type) -> Self {
        Self::new(self.name.clone(), ty)
    }
}

impl PreciserThan for Instance {
    fn more_precise_than(&self, other: &Instance) -> bool {
        more_precise_than2(&self.ty, &other.ty, &self.name, &other.name)
    }
}

impl Display for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.name.is_default() {
            write!(f, "{}", self.ty)
        } else {
            write!(f, "{} {}", self.name, self.ty)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::instance::{Instance, Name};
    use crate::precision::PreciserThan;
    use crate::types::{RawType, Type};

    #[test]
    fn should_apply_names() {
        assert!(Name::ANY.is_applicable_for(&Name::named("a")));
        assert!(Name::ANY.is_applicable_for(&Name::DEFAULT));
        assert!(Name::DEFAULT.is_applicable_for(&Name::DEFAULT));
        assert!(!Name::DEFAULT.is_applicable_for(&Name::named("a")));
        assert!(!Name::named("a").is_applicable_for(&Name::DEFAULT));
    }

    #[test]
    fn should_apply_name_patterns() {
        let pattern = Name::named("db-*");

        assert!(pattern.is_applicable_for(&Name::named("db-main")));
        assert!(!pattern.is_applicable_for(&Name::named("cache")));
        assert!(!pattern.is_applicable_for(&Name::DEFAULT));
    }

    #[test]
    fn should_order_name_precision() {
        assert!(Name::named("a").more_precise_than(&Name::DEFAULT));
        assert!(Name::DEFAULT.more_precise_than(&Name::ANY));
        assert!(Name::named("db-main").more_precise_than(&Name::named("db-*")));
        assert!(Name::named("db-m*").more_precise_than(&Name::named("db-*")));
        assert!(!Name::named("a").more_precise_than(&Name::named("b")));
    }

    #[test]
    fn should_not_equal_wildcards() {
        let ty = Type::new(RawType::class("Number"));
        assert_ne!(Instance::any_of(ty.clone()), Instance::default_of(ty));
        assert!(Instance::any().is_any());
    }

    #[test]
    fn should_display_instances() {
        let ty = Type::new(RawType::class("Number"));
        assert_eq!(Instance::default_of(ty.clone()).to_string(), "Number");
        assert_eq!(Instance::new(Name::named("a"), ty).to_string(), "a Number");
    }
}
