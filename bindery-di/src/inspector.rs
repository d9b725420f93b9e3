//! Type inspection: finding usable constructors for concrete types. Constructors can be
//! registered statically with [submit] and are picked up by the [StaticInspector]:
//!
//! ```
//! use bindery_di::inspector::{submit, Constructor, ConstructorRegisterer};
//! use bindery_di::resolver::AnyPtr;
//! use bindery_di::types::Type;
//! use std::sync::Arc;
//!
//! struct Greeter;
//!
//! fn greeter_constructor() -> Constructor {
//!     Constructor::new(Type::of::<Greeter>(), vec![], |_| Ok(Arc::new(Greeter) as AnyPtr))
//! }
//!
//! submit! {
//!     ConstructorRegisterer {
//!         register: greeter_constructor
//!     }
//! }
//! # fn main() {}
//! ```

use crate::error::ErrorPtr;
use crate::resolver::AnyPtr;
use crate::types::Type;
use derivative::Derivative;
use fxhash::FxHashMap;
use inventory::collect;
pub use inventory::submit;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;

pub type ConstructorFn = dyn Fn(&[AnyPtr]) -> Result<AnyPtr, ErrorPtr> + Send + Sync;

pub type MethodFn = dyn Fn(Option<&AnyPtr>, &[AnyPtr]) -> Result<AnyPtr, ErrorPtr> + Send + Sync;

/// A constructor of a concrete type, invoked with resolved arguments in declared order.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Constructor {
    pub declaring_type: Type,
    pub parameter_types: Vec<Type>,
    #[derivative(Debug = "ignore")]
    pub invoke: Arc<ConstructorFn>,
}

impl Constructor {
    pub fn new<F>(declaring_type: Type, parameter_types: Vec<Type>, invoke: F) -> Self
    where
        F: Fn(&[AnyPtr]) -> Result<AnyPtr, ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            declaring_type,
            parameter_types,
            invoke: Arc::new(invoke),
        }
    }
}

/// A factory method. Instance methods are invoked on the resolved instance of their declaring
/// type, static ones get no receiver.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct FactoryMethod {
    pub name: String,
    pub declaring_type: Type,
    pub return_type: Type,
    pub parameter_types: Vec<Type>,
    pub is_static: bool,
    #[derivative(Debug = "ignore")]
    pub invoke: Arc<MethodFn>,
}

impl FactoryMethod {
    pub fn new<N, F>(
        name: N,
        declaring_type: Type,
        return_type: Type,
        parameter_types: Vec<Type>,
        invoke: F,
    ) -> Self
    where
        N: Into<String>,
        F: Fn(Option<&AnyPtr>, &[AnyPtr]) -> Result<AnyPtr, ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declaring_type,
            return_type,
            parameter_types,
            is_static: false,
            invoke: Arc::new(invoke),
        }
    }

    pub fn new_static<N, F>(
        name: N,
        declaring_type: Type,
        return_type: Type,
        parameter_types: Vec<Type>,
        invoke: F,
    ) -> Self
    where
        N: Into<String>,
        F: Fn(&[AnyPtr]) -> Result<AnyPtr, ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            is_static: true,
            ..Self::new(
                name,
                declaring_type,
                return_type,
                parameter_types,
                move |_, arguments| invoke(arguments),
            )
        }
    }
}

/// Finds constructors for types which are bound without an explicit construction strategy.
#[cfg_attr(test, automock)]
pub trait Inspector {
    fn constructor_for(&self, ty: &Type) -> Option<Constructor>;
}

pub type InspectorPtr = Arc<dyn Inspector + Send + Sync>;

/// Registration entry collected by the [StaticInspector].
#[derive(Clone, Copy)]
pub struct ConstructorRegisterer {
    pub register: fn() -> Constructor,
}

collect!(ConstructorRegisterer);

/// Inspector backed by statically registered constructors, keyed by raw type name.
#[derive(Clone, Debug, Default)]
pub struct StaticInspector {
    constructors: FxHashMap<String, Constructor>,
}

impl StaticInspector {
    /// Creates an inspector with all constructors registered via [submit].
    pub fn new() -> Self {
        inventory::iter::<ConstructorRegisterer>
            .into_iter()
            .map(|registerer| (registerer.register)())
            .fold(Self::default(), Self::with_constructor)
    }

    pub fn with_constructor(mut self, constructor: Constructor) -> Self {
        self.constructors
            .insert(constructor.declaring_type.name().to_string(), constructor);
        self
    }
}

impl Inspector for StaticInspector {
    fn constructor_for(&self, ty: &Type) -> Option<Constructor> {
        if ty.is_interface() || ty.is_wildcard() || ty.is_array() {
            return None;
        }

        self.constructors.get(ty.name()).cloned()
    }
}
