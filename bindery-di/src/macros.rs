//! The expansion pipeline turns declared values into finished
//! [Declaration](crate::bindings::Declaration)s. Recognized kinds of values form the closed
//! [Declared] enum; anything else can be plugged in as [Declared::Custom] and is dispatched to a
//! [Macro] registered for its kind.

use crate::bindings::{Binding, Bindings};
use crate::declaration::DeclarationType;
use crate::error::ConfigurationError;
use crate::inspector::{Constructor, FactoryMethod};
use crate::instance::Instance;
use crate::resolver::AnyPtr;
use crate::resource::Resource;
use crate::supplier::{
    Argument, ConfigurationSupplier, ConstantSupplier, ConstructorSupplier, ElementsSupplier,
    FactoryMethodSupplier, ForwardSupplier, InstanceSupplier, ReferenceSupplier,
    RequiredSupplier, SupplierPtr,
};
use crate::types::Type;
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::sync::Arc;
use tracing::debug;

/// A typed constructor or method argument hint.
#[derive(Clone)]
pub enum Parameter {
    Constant { ty: Type, value: AnyPtr },
    Instance(Instance),
    Supplied { ty: Type, supplier: SupplierPtr },
}

impl Parameter {
    pub fn ty(&self) -> &Type {
        match self {
            Parameter::Constant { ty, .. } | Parameter::Supplied { ty, .. } => ty,
            Parameter::Instance(instance) => instance.ty(),
        }
    }

    fn into_argument(self) -> Argument {
        match self {
            Parameter::Constant { value, .. } => Argument::Constant(value),
            Parameter::Instance(instance) => Argument::Instance(instance),
            Parameter::Supplied { ty, supplier } => Argument::Supplied { ty, supplier },
        }
    }
}

/// A constructor with hints for some of its arguments. Parameters without a hint are resolved as
/// default instances of their type.
#[derive(Clone)]
pub struct Constructible {
    pub constructor: Constructor,
    pub hints: Vec<Parameter>,
}

/// A factory method with hints for some of its arguments.
#[derive(Clone)]
pub struct Producible {
    pub method: FactoryMethod,
    pub hints: Vec<Parameter>,
}

/// A value bound to a resource, before expansion.
#[derive(Clone)]
pub enum Declared {
    /// A ready instance.
    Constant(AnyPtr),
    Constructor(Constructible),
    Method(Producible),
    /// Use another instance, constructing it if nothing else binds it.
    Substitute(Instance),
    /// Look up the configuration value under the given key.
    Configure(String),
    /// Resolve the same name as a narrower type.
    Forward(Type),
    /// Array of per-element strategies.
    Elements(Vec<Parameter>),
    /// A finished strategy.
    Supplier(SupplierPtr),
    /// Placeholder which must be satisfied by another declaration.
    Required,
    /// Dispatched to the [Macro] registered for `kind`.
    Custom { kind: String, value: AnyPtr },
}

impl Declared {
    /// Binds to the constructor of the bound type, as found by the inspector.
    pub fn constructed() -> Self {
        Declared::Custom {
            kind: CONSTRUCTED.to_string(),
            value: Arc::new(()),
        }
    }
}

const CONSTRUCTED: &str = "constructed";

/// Expansion of custom declared values.
pub trait Macro {
    fn expand(
        &self,
        binding: Binding,
        value: AnyPtr,
        bindings: &mut Bindings,
    ) -> Result<(), ConfigurationError>;
}

pub type MacroPtr = Arc<dyn Macro + Send + Sync>;

/// The expansion pipeline.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Macros {
    #[derivative(Debug = "ignore")]
    custom: FxHashMap<String, MacroPtr>,
    eager_supplier_substitution: bool,
}

impl Default for Macros {
    fn default() -> Self {
        let mut custom = FxHashMap::<String, MacroPtr>::default();
        custom.insert(CONSTRUCTED.to_string(), Arc::new(ConstructedMacro));

        Self {
            custom,
            eager_supplier_substitution: false,
        }
    }
}

impl Macros {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a macro for [Declared::Custom] values of the given kind.
    pub fn with_macro<K: Into<String>>(mut self, kind: K, expansion: MacroPtr) -> Self {
        self.custom.insert(kind.into(), expansion);
        self
    }

    /// When enabled, substituting a binding with a final supplier type which has a
    /// parameterless constructor creates the supplier up front, instead of resolving it on each
    /// construction.
    pub fn with_eager_supplier_substitution(mut self, eager_supplier_substitution: bool) -> Self {
        self.eager_supplier_substitution = eager_supplier_substitution;
        self
    }

    pub fn expand(
        &self,
        binding: Binding,
        declared: Declared,
        bindings: &mut Bindings,
    ) -> Result<(), ConfigurationError> {
        match declared {
            Declared::Constant(value) => {
                bindings.add(binding.supplied_by(Arc::new(ConstantSupplier(value))));
            }
            Declared::Constructor(Constructible { constructor, hints }) => {
                check_assignable(&constructor.declaring_type, binding.resource.ty())?;

                let arguments = match_arguments(&constructor.parameter_types, hints);
                bindings.add(
                    binding.supplied_by(Arc::new(ConstructorSupplier::new(constructor, arguments))),
                );
            }
            Declared::Method(Producible { method, hints }) => {
                if !method.return_type.is_assignable_to(binding.resource.ty()) {
                    return Err(ConfigurationError::FactoryReturnTypeMismatch {
                        method: format!("{}::{}", method.declaring_type, method.name),
                        return_type: method.return_type.to_string(),
                        bound_type: binding.resource.ty().to_string(),
                    });
                }

                let arguments = match_arguments(&method.parameter_types, hints);
                bindings.add(
                    binding.supplied_by(Arc::new(FactoryMethodSupplier::new(method, arguments))),
                );
            }
            Declared::Substitute(with) => self.substitute(binding, with, bindings)?,
            Declared::Configure(key) => {
                let supplier = ConfigurationSupplier::new(binding.resource.ty().clone(), key);
                bindings.add(binding.supplied_by(Arc::new(supplier)));
            }
            Declared::Forward(ty) => {
                check_assignable(&ty, binding.resource.ty())?;
                bindings.add(binding.supplied_by(Arc::new(ForwardSupplier(ty))));
            }
            Declared::Elements(elements) => {
                let element_type = binding
                    .resource
                    .ty()
                    .element_type()
                    .ok_or_else(|| {
                        ConfigurationError::NotAnArrayType(binding.resource.ty().to_string())
                    })?;

                for element in &elements {
                    check_assignable(element.ty(), element_type)?;
                }

                let elements = elements
                    .into_iter()
                    .map(Parameter::into_argument)
                    .collect_vec();
                bindings.add(binding.supplied_by(Arc::new(ElementsSupplier(elements))));
            }
            Declared::Supplier(supplier) => bindings.add(binding.supplied_by(supplier)),
            Declared::Required => bindings.add(binding.supplied_by(Arc::new(RequiredSupplier))),
            Declared::Custom { kind, value } => {
                let expansion = self
                    .custom
                    .get(&kind)
                    .cloned()
                    .ok_or(ConfigurationError::NoMacroForKind(kind))?;
                expansion.expand(binding, value, bindings)?;
            }
        }

        Ok(())
    }

    fn substitute(
        &self,
        binding: Binding,
        with: Instance,
        bindings: &mut Bindings,
    ) -> Result<(), ConfigurationError> {
        let bound = binding.resource.instance().clone();
        let supplier_type = Type::supplier();

        if with.ty().is_assignable_to(&supplier_type)
            && !bound.ty().is_assignable_to(&supplier_type)
        {
            if let Some(supplier) = self.eager_supplier(&with, bindings)? {
                debug!(
                    resource = %binding.resource,
                    supplier = %with,
                    "Substituting supplier eagerly."
                );
                bindings.add(binding.supplied_by(supplier));
                return Ok(());
            }

            add_implicit_constructor(&binding, &with, bindings);
            bindings.add(binding.supplied_by(Arc::new(ReferenceSupplier(with.ty().clone()))));
            return Ok(());
        }

        if with.ty() != bound.ty() || !with.name().is_applicable_for(bound.name()) {
            check_assignable(with.ty(), bound.ty())?;

            add_implicit_constructor(&binding, &with, bindings);
            bindings.add(binding.supplied_by(Arc::new(InstanceSupplier(with))));
            return Ok(());
        }

        if bound.ty().is_interface() {
            return Err(ConfigurationError::SubstitutionLoop(bound.to_string()));
        }

        let constructor = bindings
            .inspector()
            .constructor_for(bound.ty())
            .ok_or_else(|| ConfigurationError::NotConstructible(bound.ty().to_string()))?;

        let arguments = match_arguments(&constructor.parameter_types, vec![]);
        bindings.add(
            binding.supplied_by(Arc::new(ConstructorSupplier::new(constructor, arguments))),
        );
        Ok(())
    }

    fn eager_supplier(
        &self,
        with: &Instance,
        bindings: &Bindings,
    ) -> Result<Option<SupplierPtr>, ConfigurationError> {
        if !self.eager_supplier_substitution || !with.ty().is_final() {
            return Ok(None);
        }

        let Some(constructor) = bindings
            .inspector()
            .constructor_for(with.ty())
            .filter(|constructor| constructor.parameter_types.is_empty())
        else {
            return Ok(None);
        };

        let supplier = (constructor.invoke)(&[])
            .map_err(|_| ConfigurationError::NotConstructible(with.ty().to_string()))?
            .downcast::<SupplierPtr>()
            .map_err(|_| ConfigurationError::IncompatibleImplementation {
                implementation: with.ty().to_string(),
                bound_type: Type::supplier().to_string(),
            })?;

        Ok(Some(supplier.as_ref().clone()))
    }
}

/// Binds [Declared::constructed] values to the inspected constructor of the bound type.
struct ConstructedMacro;

impl Macro for ConstructedMacro {
    fn expand(
        &self,
        binding: Binding,
        _value: AnyPtr,
        bindings: &mut Bindings,
    ) -> Result<(), ConfigurationError> {
        let with = binding.resource.instance().clone();
        bindings.declare(binding, Declared::Substitute(with))
    }
}

fn check_assignable(implementation: &Type, bound_type: &Type) -> Result<(), ConfigurationError> {
    if implementation.is_assignable_to(bound_type) {
        Ok(())
    } else {
        Err(ConfigurationError::IncompatibleImplementation {
            implementation: implementation.to_string(),
            bound_type: bound_type.to_string(),
        })
    }
}

/// Fallback binding which makes a substitute resolvable when nothing else binds it.
fn add_implicit_constructor(binding: &Binding, with: &Instance, bindings: &mut Bindings) {
    let Some(constructor) = bindings.inspector().constructor_for(with.ty()) else {
        return;
    };

    let arguments = match_arguments(&constructor.parameter_types, vec![]);
    let implicit = Binding::new(
        Resource::everywhere(with.clone()),
        binding.scope.clone(),
        binding.source.typed(DeclarationType::Implicit),
    );

    bindings.add(implicit.supplied_by(Arc::new(ConstructorSupplier::new(constructor, arguments))));
}

/// Assigns each parameter the first unused hint of an assignable type, falling back to the
/// default instance of the parameter type.
fn match_arguments(parameter_types: &[Type], hints: Vec<Parameter>) -> Vec<Argument> {
    let mut hints = hints.into_iter().map(Some).collect_vec();

    parameter_types
        .iter()
        .map(|ty| {
            hints
                .iter_mut()
                .find(|hint| {
                    hint.as_ref()
                        .map(|hint| hint.ty().is_assignable_to(ty))
                        .unwrap_or(false)
                })
                .and_then(Option::take)
                .map(Parameter::into_argument)
                .unwrap_or_else(|| Argument::Instance(Instance::default_of(ty.clone())))
        })
        .collect()
}
