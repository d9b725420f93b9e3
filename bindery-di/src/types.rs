//! Reified type descriptors. A [Type] is a structural value: a [RawType] (name, kind, declared
//! supertypes), a parameter list and a [Variance] flag. Types are compared structurally, which
//! makes it possible to reason about assignability and specificity of generic types without any
//! reflection support.
//!
//! ```
//! use bindery_di::types::{RawType, Type};
//!
//! let number = Type::new(RawType::class("Number"));
//! let integer = Type::new(RawType::final_class("Integer").extending(number.clone()));
//! let list = RawType::interface("List");
//!
//! assert!(integer.is_assignable_to(&number));
//! assert!(Type::new(list.clone())
//!     .parameterized([integer])
//!     .is_assignable_to(&Type::new(list).parameterized([number.covariant()])));
//! ```

use crate::precision::PreciserThan;
use itertools::Itertools;
use std::any::type_name;
use std::borrow::Cow;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

const WILDCARD_NAME: &str = "?";
const ARRAY_NAME: &str = "[]";
const INJECTRON_NAME: &str = "bindery_di::Injectron";
const SUPPLIER_NAME: &str = "bindery_di::Supplier";
const CONFIGURATION_NAME: &str = "bindery_di::Configuration";
const LIST_NAME: &str = "bindery_di::List";
const SET_NAME: &str = "bindery_di::Set";
const PROVIDER_NAME: &str = "bindery_di::Provider";

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Class,
    Interface,
    Array,
    Wildcard,
}

/// Direction in which a type parameter may vary.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Variance {
    #[default]
    Exact,
    /// `? extends T` - accepts `T` and its subtypes.
    Covariant,
    /// `? super T` - accepts `T` and its supertypes.
    Contravariant,
}

/// The unparameterized part of a type. Raw types are identified by their name; two raw types with
/// the same name are considered the same type.
#[derive(Clone, Debug)]
pub struct RawType {
    name: Cow<'static, str>,
    kind: TypeKind,
    is_final: bool,
    supertypes: Vec<Type>,
}

impl RawType {
    /// A non-final class.
    pub fn class<N: Into<Cow<'static, str>>>(name: N) -> Self {
        Self::with_kind(name, TypeKind::Class, false)
    }

    /// A class which cannot be extended.
    pub fn final_class<N: Into<Cow<'static, str>>>(name: N) -> Self {
        Self::with_kind(name, TypeKind::Class, true)
    }

    pub fn interface<N: Into<Cow<'static, str>>>(name: N) -> Self {
        Self::with_kind(name, TypeKind::Interface, false)
    }

    fn with_kind<N: Into<Cow<'static, str>>>(name: N, kind: TypeKind, is_final: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            is_final,
            supertypes: vec![],
        }
    }

    /// Adds a direct supertype (superclass or implemented interface).
    pub fn extending(mut self, supertype: Type) -> Self {
        self.supertypes.push(supertype);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    #[inline]
    pub fn supertypes(&self) -> &[Type] {
        &self.supertypes
    }

    /// Strict subtype relation between raw types. Every raw type except the wildcard itself is a
    /// subtype of the wildcard.
    pub fn is_subtype_of(&self, other: &RawType) -> bool {
        if self == other {
            return false;
        }

        other.kind == TypeKind::Wildcard
            || self
                .supertypes
                .iter()
                .any(|supertype| {
                    supertype.raw.as_ref() == other || supertype.raw.is_subtype_of(other)
                })
    }
}

impl PartialEq for RawType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for RawType {}

impl Hash for RawType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A possibly generic type: raw type, type parameters and variance.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    raw: Arc<RawType>,
    parameters: Vec<Type>,
    variance: Variance,
}

impl Type {
    pub fn new(raw: RawType) -> Self {
        Self {
            raw: Arc::new(raw),
            parameters: vec![],
            variance: Variance::Exact,
        }
    }

    /// Type for a concrete Rust type, named after [type_name]. Such types have no declared
    /// supertypes.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(RawType::final_class(type_name::<T>()))
    }

    /// The top type - every other type is assignable to it.
    pub fn wildcard() -> Self {
        Self::new(RawType::with_kind(WILDCARD_NAME, TypeKind::Wildcard, false))
    }

    pub fn array_of(element: Type) -> Self {
        Self::new(RawType::with_kind(ARRAY_NAME, TypeKind::Array, true)).parameterized([element])
    }

    /// Type of the injector-resident handles for bindings.
    pub fn injectron() -> Self {
        Self::new(RawType::final_class(INJECTRON_NAME))
    }

    /// Array of injectrons applicable to the given type.
    pub fn injectrons_of(ty: Type) -> Self {
        Self::array_of(Self::injectron().parameterized([ty]))
    }

    /// Interface type of construction strategies - see [Supplier](crate::supplier::Supplier).
    pub fn supplier() -> Self {
        Self::new(RawType::interface(SUPPLIER_NAME))
    }

    /// Interface type of the configuration source used by configuration lookups - see
    /// [Configuration](crate::supplier::Configuration).
    pub fn configuration() -> Self {
        Self::new(RawType::interface(CONFIGURATION_NAME))
    }

    /// Ordered collection of elements, resolved like an array of the element type unless bound
    /// explicitly.
    pub fn list_of(element: Type) -> Self {
        Self::new(RawType::interface(LIST_NAME)).parameterized([element])
    }

    /// Collection of distinct elements, resolved like an array of the element type unless bound
    /// explicitly.
    pub fn set_of(element: Type) -> Self {
        Self::new(RawType::interface(SET_NAME)).parameterized([element])
    }

    /// Lazy handle resolving the given type on demand - see [Provider](crate::resolver::Provider).
    pub fn provider_of(ty: Type) -> Self {
        Self::new(RawType::interface(PROVIDER_NAME)).parameterized([ty])
    }

    pub fn parameterized<I: IntoIterator<Item = Type>>(mut self, parameters: I) -> Self {
        self.parameters = parameters.into_iter().collect();
        self
    }

    pub fn covariant(mut self) -> Self {
        self.variance = Variance::Covariant;
        self
    }

    pub fn contravariant(mut self) -> Self {
        self.variance = Variance::Contravariant;
        self
    }

    pub fn exact(mut self) -> Self {
        self.variance = Variance::Exact;
        self
    }

    #[inline]
    pub fn raw_type(&self) -> &RawType {
        &self.raw
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.raw.name()
    }

    #[inline]
    pub fn parameters(&self) -> &[Type] {
        &self.parameters
    }

    #[inline]
    pub fn variance(&self) -> Variance {
        self.variance
    }

    #[inline]
    pub fn is_parameterized(&self) -> bool {
        !self.parameters.is_empty()
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.raw.kind == TypeKind::Array
    }

    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.raw.kind == TypeKind::Wildcard
    }

    #[inline]
    pub fn is_interface(&self) -> bool {
        self.raw.kind == TypeKind::Interface
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.raw.is_final
    }

    pub fn is_injectron(&self) -> bool {
        self.raw.name == INJECTRON_NAME
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        self.raw.name == LIST_NAME
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.raw.name == SET_NAME
    }

    #[inline]
    pub fn is_provider(&self) -> bool {
        self.raw.name == PROVIDER_NAME
    }

    /// Element type of an array type.
    pub fn element_type(&self) -> Option<&Type> {
        if self.is_array() {
            self.parameters.first()
        } else {
            None
        }
    }

    /// Checks if a value of this type can be used where `other` is expected. Arrays are
    /// covariant, other type parameters follow the variance of the parameters of `other`. The
    /// top-level variance of both types is not relevant.
    pub fn is_assignable_to(&self, other: &Type) -> bool {
        if other.is_wildcard() {
            return true;
        }

        if self.raw == other.raw {
            if self.is_array() {
                return match (self.element_type(), other.element_type()) {
                    (Some(element), Some(other_element)) => {
                        element.is_assignable_to(other_element)
                    }
                    _ => true,
                };
            }

            // raw types accept any parameterization
            return self.parameters.is_empty()
                || other.parameters.is_empty()
                || (self.parameters.len() == other.parameters.len()
                    && self
                        .parameters
                        .iter()
                        .zip(&other.parameters)
                        .all(|(parameter, other)| parameter.is_parameter_assignable_to(other)));
        }

        self.raw
            .supertypes
            .iter()
            .any(|supertype| supertype.is_assignable_to(other))
    }

    fn is_parameter_assignable_to(&self, other: &Type) -> bool {
        match other.variance {
            Variance::Exact => self == other,
            Variance::Covariant => {
                self.variance != Variance::Contravariant && self.is_assignable_to(other)
            }
            Variance::Contravariant => {
                self.variance != Variance::Covariant && other.is_assignable_to(self)
            }
        }
    }
}

impl From<RawType> for Type {
    fn from(raw: RawType) -> Self {
        Self::new(raw)
    }
}

impl PreciserThan for Type {
    fn more_precise_than(&self, other: &Type) -> bool {
        if self.raw != other.raw {
            return self.raw.is_subtype_of(&other.raw);
        }

        if self.variance != other.variance {
            return self.variance == Variance::Exact;
        }

        match (self.is_parameterized(), other.is_parameterized()) {
            (true, false) => true,
            (false, _) => false,
            (true, true) => {
                self.parameters.len() == other.parameters.len()
                    && self
                        .parameters
                        .iter()
                        .zip(&other.parameters)
                        .all(|(parameter, other)| !other.more_precise_than(parameter))
                    && self
                        .parameters
                        .iter()
                        .zip(&other.parameters)
                        .any(|(parameter, other)| parameter.more_precise_than(other))
            }
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.variance {
            Variance::Exact => {}
            Variance::Covariant => write!(f, "? extends ")?,
            Variance::Contravariant => write!(f, "? super ")?,
        }

        if let Some(element) = self.element_type() {
            return write!(f, "{element}[]");
        }

        write!(f, "{}", self.raw.name)?;
        if self.is_parameterized() {
            write!(f, "<{}>", self.parameters.iter().join(","))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::precision::PreciserThan;
    use crate::types::{RawType, Type};

    fn number() -> Type {
        Type::new(RawType::class("Number"))
    }

    fn integer() -> Type {
        Type::new(RawType::final_class("Integer").extending(number()))
    }

    fn list() -> Type {
        Type::new(RawType::interface("List"))
    }

    #[test]
    fn should_assign_subtypes() {
        assert!(integer().is_assignable_to(&number()));
        assert!(!number().is_assignable_to(&integer()));
        assert!(integer().is_assignable_to(&Type::wildcard()));
    }

    #[test]
    fn should_respect_parameter_variance() {
        let integers = list().parameterized([integer()]);

        assert!(integers.is_assignable_to(&list().parameterized([number().covariant()])));
        assert!(!integers.is_assignable_to(&list().parameterized([number()])));
        assert!(list()
            .parameterized([number()])
            .is_assignable_to(&list().parameterized([integer().contravariant()])));
        assert!(integers.is_assignable_to(&list()));
    }

    #[test]
    fn should_treat_arrays_covariantly() {
        assert!(Type::array_of(integer()).is_assignable_to(&Type::array_of(number())));
        assert!(!Type::array_of(number()).is_assignable_to(&Type::array_of(integer())));
    }

    #[test]
    fn should_prefer_narrower_types() {
        assert!(integer().more_precise_than(&number()));
        assert!(!number().more_precise_than(&integer()));
        assert!(number().more_precise_than(&Type::wildcard()));
        assert!(!number().more_precise_than(&number()));
    }

    #[test]
    fn should_prefer_exact_and_parameterized_types() {
        assert!(number().more_precise_than(&number().covariant()));
        assert!(list()
            .parameterized([integer()])
            .more_precise_than(&list()));
        assert!(list()
            .parameterized([integer()])
            .more_precise_than(&list().parameterized([number()])));
    }

    #[test]
    fn should_display_types() {
        assert_eq!(
            list().parameterized([integer().covariant()]).to_string(),
            "List<? extends Integer>"
        );
        assert_eq!(Type::array_of(number()).to_string(), "Number[]");
        assert_eq!(
            Type::provider_of(number()).to_string(),
            "bindery_di::Provider<Number>"
        );
    }

    #[test]
    fn should_recognize_bridged_types() {
        assert!(Type::list_of(number()).is_list());
        assert!(Type::set_of(number()).is_set());
        assert!(Type::provider_of(number()).is_provider());
        assert!(!Type::list_of(number()).is_set());
        assert!(!Type::array_of(number()).is_list());
        assert!(Type::list_of(integer()).is_assignable_to(&Type::list_of(number().covariant())));
    }
}
