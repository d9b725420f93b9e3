//! The [Injector] resolves dependencies using a finalized binding table. It is created by an
//! [InjectorBuilder], which expands and folds all declarations, and creates one repository for
//! every scope in use:
//!
//! ```
//! use bindery_di::bindings::Binding;
//! use bindery_di::declaration::{DeclarationType, Source};
//! use bindery_di::injector::InjectorBuilder;
//! use bindery_di::instance::{Instance, Name};
//! use bindery_di::macros::Declared;
//! use bindery_di::resolver::TypedResolver;
//! use bindery_di::resource::Resource;
//! use bindery_di::scope::APPLICATION;
//! use bindery_di::types::Type;
//! use std::sync::Arc;
//!
//! let injector = InjectorBuilder::new()
//!     .with_binding(
//!         Binding::new(
//!             Resource::everywhere(Instance::default_of(Type::of::<u32>())),
//!             APPLICATION,
//!             Source::new("demo", 0, DeclarationType::Explicit),
//!         ),
//!         Declared::Constant(Arc::new(42_u32)),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let value = injector
//!     .resolve_typed::<u32>(Name::DEFAULT, Type::of::<u32>())
//!     .unwrap();
//! assert_eq!(*value, 42);
//! ```

use crate::bindings::{Binding, Bindings};
use crate::dependency::Dependency;
use crate::error::{ConfigurationError, InjectionError};
use crate::injectron::Injectron;
use crate::inspector::{InspectorPtr, StaticInspector};
use crate::instance::{Instance, Name};
use crate::macros::{Declared, Macros};
use crate::precision::{most_precise, sort_by_precision};
use crate::resolver::{downcast, AnyPtr, InstancePtr, Provider, Resolver, Sequence};
use crate::resource::Resourced;
use crate::scope::{default_scopes, Expiry, RepositoryPtr, ScopePtr, ScopeRegistry};
use crate::types::Type;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{info, trace};

/// Collects scopes and declarations for a new [Injector].
pub struct InjectorBuilder {
    macros: Macros,
    inspector: Option<InspectorPtr>,
    scopes: ScopeRegistry,
    bindings: Vec<(Binding, Declared)>,
}

impl Default for InjectorBuilder {
    fn default() -> Self {
        Self {
            macros: Macros::new(),
            inspector: None,
            scopes: default_scopes(),
            bindings: vec![],
        }
    }
}

impl InjectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the expansion pipeline.
    pub fn with_macros(mut self, macros: Macros) -> Self {
        self.macros = macros;
        self
    }

    pub fn with_eager_supplier_substitution(mut self, eager_supplier_substitution: bool) -> Self {
        self.macros = self
            .macros
            .with_eager_supplier_substitution(eager_supplier_substitution);
        self
    }

    /// Replaces the type inspection service. Defaults to a [StaticInspector] with all statically
    /// registered constructors.
    pub fn with_inspector(mut self, inspector: InspectorPtr) -> Self {
        self.inspector = Some(inspector);
        self
    }

    /// Replaces all known scopes.
    pub fn with_scopes(mut self, scopes: ScopeRegistry) -> Self {
        self.scopes = scopes;
        self
    }

    /// Adds or replaces a single scope.
    pub fn with_scope<N: Into<String>>(mut self, name: N, scope: ScopePtr) -> Self {
        self.scopes.insert(name.into(), scope);
        self
    }

    pub fn with_binding(mut self, binding: Binding, declared: Declared) -> Self {
        self.bindings.push((binding, declared));
        self
    }

    pub fn with_bindings<I>(mut self, bindings: I) -> Self
    where
        I: IntoIterator<Item = (Binding, Declared)>,
    {
        self.bindings.extend(bindings);
        self
    }

    pub fn build(self) -> Result<Injector, ConfigurationError> {
        let inspector = self
            .inspector
            .unwrap_or_else(|| Arc::new(StaticInspector::new()));

        let mut bindings = Bindings::new(Arc::new(self.macros), inspector);
        for (binding, declared) in self.bindings {
            bindings.declare(binding, declared)?;
        }

        let declarations = sort_by_precision(bindings.finalize()?);
        let cardinality = declarations.len();

        let mut repositories: FxHashMap<String, (RepositoryPtr, Expiry)> = FxHashMap::default();
        let mut injectrons = Vec::with_capacity(cardinality);

        for (serial_number, declaration) in declarations.into_iter().enumerate() {
            let (repository, expiry) = match repositories.get(declaration.scope.as_ref()) {
                Some(initialized) => initialized.clone(),
                None => {
                    let scope = self.scopes.get(declaration.scope.as_ref()).ok_or_else(|| {
                        ConfigurationError::UnrecognizedScope {
                            scope: declaration.scope.to_string(),
                            source_ident: declaration.source.to_string(),
                        }
                    })?;

                    let initialized = (scope.init(), scope.expiry());
                    repositories.insert(declaration.scope.to_string(), initialized.clone());
                    initialized
                }
            };

            injectrons.push(Arc::new(Injectron::new(
                declaration,
                expiry,
                repository,
                serial_number,
                cardinality,
            )));
        }

        let mut by_raw_type: FxHashMap<String, Vec<Arc<Injectron>>> = FxHashMap::default();
        for injectron in &injectrons {
            by_raw_type
                .entry(injectron.resource().ty().name().to_string())
                .or_default()
                .push(injectron.clone());
        }

        info!(
            injectrons = cardinality,
            scopes = repositories.len(),
            "Built injector."
        );

        Ok(Injector {
            injectrons: injectrons.into(),
            by_raw_type: Arc::new(by_raw_type),
        })
    }
}

/// Resolves instances from a finalized set of [Injectron]s. Safe to share between threads.
/// Clones share all bindings and cached instances.
#[derive(Clone, Debug)]
pub struct Injector {
    injectrons: Arc<[Arc<Injectron>]>,
    by_raw_type: Arc<FxHashMap<String, Vec<Arc<Injectron>>>>,
}

impl Injector {
    /// Resolves a single instance at the top level.
    pub fn resolve_instance(&self, instance: Instance) -> Result<AnyPtr, InjectionError> {
        self.resolve(&Dependency::new(instance))
    }

    /// Resolves all instances applicable for the given type, most precise first.
    pub fn resolve_all(&self, ty: Type) -> Result<Vec<AnyPtr>, InjectionError> {
        let dependency = Dependency::any_typed(Type::array_of(ty));
        let sequence = downcast::<Sequence>(self.resolve(&dependency)?, &dependency)?;
        Ok(sequence.to_vec())
    }

    /// All live bindings, most precise first within each raw type.
    pub fn resolve_meta(&self) -> Vec<Arc<Injectron>> {
        self.injectrons.to_vec()
    }

    /// Creates all instances of scopes which never expire.
    pub fn initialize_eagerly(&self) -> Result<(), InjectionError> {
        let mut initialized = 0;
        for injectron in self
            .injectrons
            .iter()
            .filter(|injectron| injectron.expiry() == Expiry::NEVER)
        {
            trace!(injectron = %injectron, "Initializing eagerly.");
            let dependency = Dependency::new(injectron.resource().instance().clone());
            injectron.instance_for(&dependency, self)?;
            initialized += 1;
        }

        info!(initialized, "Initialized instances eagerly.");
        Ok(())
    }

    fn applicable(&self, dependency: &Dependency) -> Vec<&Arc<Injectron>> {
        let ty = dependency.instance().ty();
        let group = if ty.is_wildcard() {
            &self.injectrons[..]
        } else {
            self.by_raw_type
                .get(ty.name())
                .map(Vec::as_slice)
                .unwrap_or_default()
        };

        group
            .iter()
            .filter(|injectron| injectron.resource().is_applicable_for(dependency))
            .collect()
    }

    fn select(&self, dependency: &Dependency) -> Result<&Arc<Injectron>, InjectionError> {
        match most_precise(&self.applicable(dependency)) {
            Ok(Some(injectron)) => Ok(injectron),
            Ok(None) => Err(InjectionError::NoResourceForDependency(
                dependency.to_string(),
            )),
            Err((one, other)) => Err(InjectionError::AmbiguousDependency {
                dependency: dependency.to_string(),
                one: one.to_string(),
                other: other.to_string(),
            }),
        }
    }

    fn serve(
        &self,
        dependency: &Dependency,
        injectron: &Injectron,
    ) -> Result<AnyPtr, InjectionError> {
        if dependency.is_injecting_into(injectron.resource().instance()) {
            return Err(InjectionError::DependencyCycle(dependency.to_string()));
        }

        if let Some(receiver) = dependency.expiring_receiver() {
            if injectron.expiry().more_frequent_than(receiver.expiry()) {
                return Err(InjectionError::MoreFrequentExpiry {
                    resource: injectron.resource().to_string(),
                    receiver: receiver.target().to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }

        trace!(%dependency, injectron = %injectron, "Resolving dependency.");
        injectron.instance_for(dependency, self)
    }

    /// Element requests for array fallbacks. Unnamed array requests collect elements of any name.
    fn element_dependency(dependency: &Dependency, element: &Type) -> Dependency {
        let name = dependency.instance().name();
        let name = if name.is_default() {
            Name::ANY
        } else {
            name.clone()
        };

        dependency.instanced(Instance::new(name, element.clone()))
    }

    fn resolve_elements(
        &self,
        dependency: &Dependency,
        element: &Type,
    ) -> Result<AnyPtr, InjectionError> {
        let element_dependency = Self::element_dependency(dependency, element);
        let elements = self
            .applicable(&element_dependency)
            .into_iter()
            .map(|injectron| {
                self.serve(
                    &element_dependency.instanced(injectron.resource().instance().clone()),
                    injectron,
                )
            })
            .collect::<Result<Sequence, _>>()?;

        Ok(InstancePtr::new(elements) as AnyPtr)
    }

    /// Resolves a list or set through the array of its element type. Sets keep each distinct
    /// instance once.
    fn resolve_collection(&self, dependency: &Dependency) -> Result<AnyPtr, InjectionError> {
        let ty = dependency.instance().ty();
        let element = ty.parameters().first().cloned().unwrap_or_else(Type::wildcard);

        let array = dependency.any_of(Type::array_of(element));
        let elements = downcast::<Sequence>(self.resolve(&array)?, &array)?;
        if !ty.is_set() {
            return Ok(elements as AnyPtr);
        }

        let distinct: Sequence = elements
            .iter()
            .unique_by(|element| Arc::as_ptr(*element) as *const () as usize)
            .cloned()
            .collect();
        Ok(InstancePtr::new(distinct) as AnyPtr)
    }

    fn resolve_provider(&self, dependency: &Dependency) -> Result<AnyPtr, InjectionError> {
        let Some(provided) = dependency.instance().ty().parameters().first() else {
            return Err(InjectionError::NoResourceForDependency(
                dependency.to_string(),
            ));
        };

        let provider = Provider::new(dependency.typed(provided.clone()), Arc::new(self.clone()));
        Ok(InstancePtr::new(provider) as AnyPtr)
    }

    fn resolve_injectrons(&self, dependency: &Dependency, element: &Type) -> AnyPtr {
        let injectrons: Sequence = match element.parameters().first() {
            Some(ty) => self
                .applicable(&Self::element_dependency(dependency, ty))
                .into_iter()
                .map(|injectron| injectron.clone() as AnyPtr)
                .collect(),
            None => self
                .injectrons
                .iter()
                .map(|injectron| injectron.clone() as AnyPtr)
                .collect(),
        };

        InstancePtr::new(injectrons) as AnyPtr
    }
}

impl Resolver for Injector {
    fn resolve(&self, dependency: &Dependency) -> Result<AnyPtr, InjectionError> {
        let ty = dependency.instance().ty();

        if ty.is_injectron() {
            let Some(target) = ty.parameters().first() else {
                return Err(InjectionError::NoResourceForDependency(
                    dependency.to_string(),
                ));
            };

            return self
                .select(&dependency.typed(target.clone()))
                .map(|injectron| injectron.clone() as AnyPtr);
        }

        if let Some(element) = ty.element_type() {
            if element.is_injectron() {
                return Ok(self.resolve_injectrons(dependency, element));
            }

            if self.applicable(dependency).is_empty() {
                return self.resolve_elements(dependency, element);
            }
        }

        if (ty.is_list() || ty.is_set() || ty.is_provider())
            && self.applicable(dependency).is_empty()
        {
            return if ty.is_provider() {
                self.resolve_provider(dependency)
            } else {
                self.resolve_collection(dependency)
            };
        }

        let injectron = self.select(dependency)?;
        self.serve(dependency, injectron)
    }
}

#[cfg(test)]
mod tests {
    use crate::bindings::Binding;
    use crate::declaration::{DeclarationType, Source};
    use crate::dependency::Dependency;
    use crate::error::{ConfigurationError, InjectionError};
    use crate::injector::{Injector, InjectorBuilder};
    use crate::injectron::Injectron;
    use crate::inspector::{Constructor, StaticInspector};
    use crate::instance::{Instance, Name};
    use crate::macros::{Declared, Parameter};
    use crate::resolver::{AnyPtr, Provider, Resolver, Sequence, TypedResolver};
    use crate::resource::{Resource, Resourced, Target};
    use crate::scope::{ApplicationScope, MockScope, Scope, APPLICATION, INJECTION};
    use crate::types::{RawType, Type};
    use itertools::Itertools;
    use std::sync::Arc;

    fn number() -> Type {
        Type::new(RawType::class("Number"))
    }

    fn integer() -> Type {
        Type::new(RawType::final_class("Integer").extending(number()))
    }

    fn constant(name: Name, ty: Type, value: i32) -> (Binding, Declared) {
        (
            Binding::new(
                Resource::everywhere(Instance::new(name, ty)),
                APPLICATION,
                Source::new("test", value as usize, DeclarationType::Explicit),
            ),
            Declared::Constant(Arc::new(value)),
        )
    }

    fn build(bindings: Vec<(Binding, Declared)>) -> Injector {
        InjectorBuilder::new()
            .with_inspector(Arc::new(StaticInspector::default()))
            .with_bindings(bindings)
            .build()
            .unwrap()
    }

    fn value(injector: &Injector, name: Name, ty: Type) -> Result<i32, InjectionError> {
        injector.resolve_typed::<i32>(name, ty).map(|value| *value)
    }

    #[test]
    fn should_select_by_name() {
        let injector = build(vec![
            constant(Name::DEFAULT, number(), 1),
            constant(Name::named("two"), number(), 2),
        ]);

        assert_eq!(value(&injector, Name::DEFAULT, number()).unwrap(), 1);
        assert_eq!(value(&injector, Name::named("two"), number()).unwrap(), 2);
        assert!(matches!(
            value(&injector, Name::named("three"), number()),
            Err(InjectionError::NoResourceForDependency(_))
        ));
    }

    #[test]
    fn should_report_ambiguity() {
        let injector = build(vec![
            constant(Name::named("one"), number(), 1),
            constant(Name::named("two"), number(), 2),
        ]);

        assert!(matches!(
            value(&injector, Name::ANY, number()),
            Err(InjectionError::AmbiguousDependency { .. })
        ));
    }

    #[test]
    fn should_resolve_pattern_names() {
        let injector = build(vec![
            constant(Name::named("db-*"), number(), 1),
            constant(Name::named("db-main"), number(), 2),
        ]);

        assert_eq!(value(&injector, Name::named("db-main"), number()).unwrap(), 2);
        assert_eq!(value(&injector, Name::named("db-replica"), number()).unwrap(), 1);
    }

    #[test]
    fn should_fall_back_to_elements() {
        let injector = build(vec![
            constant(Name::named("one"), number(), 1),
            constant(Name::named("two"), number(), 2),
        ]);

        let values = injector
            .resolve_all_typed::<i32>(number())
            .unwrap()
            .into_iter()
            .map(|value| *value)
            .collect::<Vec<_>>();
        assert_eq!(values.len(), 2);
        assert!(injector.resolve_all(integer()).unwrap().is_empty());
    }

    #[test]
    fn should_forward_to_narrower_types() {
        let injector = build(vec![
            constant(Name::DEFAULT, integer(), 3),
            (
                Binding::new(
                    Resource::everywhere(Instance::default_of(number())),
                    APPLICATION,
                    Source::new("test", 0, DeclarationType::Explicit),
                ),
                Declared::Forward(integer()),
            ),
        ]);

        assert_eq!(value(&injector, Name::DEFAULT, number()).unwrap(), 3);
    }

    #[test]
    fn should_forward_to_named_narrower_types() {
        let injector = build(vec![
            constant(Name::named("x"), integer(), 3),
            (
                Binding::new(
                    Resource::everywhere(Instance::default_of(number())),
                    APPLICATION,
                    Source::new("test", 0, DeclarationType::Explicit),
                ),
                Declared::Forward(integer()),
            ),
        ]);

        assert_eq!(value(&injector, Name::DEFAULT, number()).unwrap(), 3);
    }

    #[test]
    fn should_respect_targets() {
        let service = Type::new(RawType::class("Service"));
        let injector = InjectorBuilder::new()
            .with_inspector(Arc::new(StaticInspector::default().with_constructor(
                Constructor::new(service.clone(), vec![integer()], |arguments| {
                    Ok(arguments[0].clone())
                }),
            )))
            .with_binding(
                Binding::new(
                    Resource::everywhere(Instance::default_of(service.clone())),
                    INJECTION,
                    Source::new("test", 0, DeclarationType::Explicit),
                ),
                Declared::constructed(),
            )
            .with_bindings([constant(Name::DEFAULT, integer(), 1)])
            .with_binding(
                Binding::new(
                    Resource::new(
                        Instance::default_of(integer()),
                        Target::injecting_into(Instance::default_of(service.clone())),
                    ),
                    APPLICATION,
                    Source::new("test", 2, DeclarationType::Explicit),
                ),
                Declared::Constant(Arc::new(2_i32)),
            )
            .build()
            .unwrap();

        assert_eq!(value(&injector, Name::DEFAULT, integer()).unwrap(), 1);
        assert_eq!(value(&injector, Name::DEFAULT, service).unwrap(), 2);
    }

    #[test]
    fn should_resolve_injectrons() {
        let injector = build(vec![
            constant(Name::DEFAULT, number(), 1),
            constant(Name::named("two"), number(), 2),
            constant(Name::DEFAULT, integer(), 3),
        ]);

        let numbers = injector
            .resolve_all(Type::injectron().parameterized([number()]))
            .unwrap();
        assert_eq!(numbers.len(), 2);

        let integers = injector
            .resolve(&Dependency::of(Type::injectrons_of(integer())))
            .unwrap()
            .downcast::<Vec<AnyPtr>>()
            .unwrap();
        assert_eq!(integers.len(), 1);
        let integer_injectron = integers[0].clone().downcast::<Injectron>().unwrap();
        assert_eq!(integer_injectron.resource().ty(), &integer());

        let all = injector
            .resolve(&Dependency::of(Type::array_of(Type::injectron())))
            .unwrap()
            .downcast::<Vec<AnyPtr>>()
            .unwrap();
        assert_eq!(all.len(), 3);

        let single = injector
            .resolve(&Dependency::named(
                Name::named("two"),
                Type::injectron().parameterized([number()]),
            ))
            .unwrap()
            .downcast::<Injectron>()
            .unwrap();
        assert_eq!(single.resource().name(), &Name::named("two"));
    }

    fn values(injector: &Injector, ty: Type) -> Vec<i32> {
        injector
            .resolve(&Dependency::of(ty))
            .unwrap()
            .downcast::<Sequence>()
            .unwrap()
            .iter()
            .map(|value| *value.clone().downcast::<i32>().unwrap())
            .sorted()
            .collect()
    }

    #[test]
    fn should_bridge_collections_to_elements() {
        let injector = build(vec![
            constant(Name::named("one"), number(), 1),
            constant(Name::named("two"), number(), 2),
        ]);

        assert_eq!(values(&injector, Type::list_of(number())), vec![1, 2]);
        assert_eq!(values(&injector, Type::set_of(number())), vec![1, 2]);
        assert!(values(&injector, Type::list_of(integer())).is_empty());
    }

    #[test]
    fn should_bridge_collections_to_bound_arrays() {
        let one = Instance::new(Name::named("one"), number());
        let injector = build(vec![
            constant(Name::named("one"), number(), 1),
            (
                Binding::new(
                    Resource::everywhere(Instance::default_of(Type::array_of(number()))),
                    APPLICATION,
                    Source::new("test", 0, DeclarationType::Explicit),
                ),
                Declared::Elements(vec![
                    Parameter::Instance(one.clone()),
                    Parameter::Instance(one),
                ]),
            ),
        ]);

        assert_eq!(values(&injector, Type::list_of(number())), vec![1, 1]);
        assert_eq!(values(&injector, Type::set_of(number())), vec![1]);
    }

    #[test]
    fn should_provide_lazily() {
        let injector = build(vec![constant(Name::DEFAULT, integer(), 3)]);
        let provider = |ty| {
            injector
                .resolve(&Dependency::of(Type::provider_of(ty)))
                .unwrap()
                .downcast::<Provider>()
                .unwrap()
        };

        assert_eq!(*provider(integer()).provide_typed::<i32>().unwrap(), 3);
        assert!(matches!(
            provider(number()).provide(),
            Err(InjectionError::NoResourceForDependency(_))
        ));
    }

    #[test]
    fn should_fail_on_unknown_scopes() {
        let result = InjectorBuilder::new()
            .with_inspector(Arc::new(StaticInspector::default()))
            .with_binding(
                Binding::new(
                    Resource::everywhere(Instance::default_of(number())),
                    "SESSION",
                    Source::new("test", 0, DeclarationType::Explicit),
                ),
                Declared::Constant(Arc::new(1_i32)),
            )
            .build();

        assert!(matches!(
            result,
            Err(ConfigurationError::UnrecognizedScope { .. })
        ));
    }

    #[test]
    fn should_initialize_custom_scopes_once() {
        let mut scope = MockScope::new();
        scope
            .expect_init()
            .times(1)
            .returning(|| ApplicationScope.init());
        scope
            .expect_expiry()
            .returning(|| ApplicationScope.expiry());

        let injector = InjectorBuilder::new()
            .with_inspector(Arc::new(StaticInspector::default()))
            .with_scope("CUSTOM", Arc::new(scope))
            .with_bindings((0..3).map(|value| {
                (
                    Binding::new(
                        Resource::everywhere(Instance::new(
                            Name::named(format!("n{value}")),
                            number(),
                        )),
                        "CUSTOM",
                        Source::new("test", value, DeclarationType::Explicit),
                    ),
                    Declared::Constant(Arc::new(value) as AnyPtr),
                )
            }))
            .build()
            .unwrap();

        injector.initialize_eagerly().unwrap();
        assert_eq!(
            *injector
                .resolve_typed::<usize>(Name::named("n2"), number())
                .unwrap(),
            2
        );
    }
}
