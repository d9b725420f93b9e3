//! Assembly of the binding table. Declarations are collected in source order, expanded by the
//! [Macros] pipeline and finally folded into a list where every [Resource] is bound once,
//! applying the rules of [DeclarationType]:
//!
//! - duplicated `AUTO` or `PROVIDED` declarations cancel each other out, and the resource stays
//!   unbound for declarations of equal or weaker strength,
//! - clashing declarations fail the whole build,
//! - otherwise the stronger (or the later implicit) declaration wins,
//! - `MULTI` declarations co-exist,
//! - `REQUIRED` declarations must be satisfied by some concrete declaration.

use crate::declaration::{DeclarationType, Source};
use crate::error::ConfigurationError;
use crate::inspector::InspectorPtr;
use crate::macros::{Declared, Macros};
use crate::resource::{Resource, Resourced};
use crate::supplier::SupplierPtr;
use derivative::Derivative;
use fxhash::FxHashMap;
use itertools::Itertools;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::debug;

/// A declaration in progress: what is bound, in which scope and where it comes from.
#[derive(Clone, Debug)]
pub struct Binding {
    pub resource: Resource,
    pub scope: Cow<'static, str>,
    pub source: Source,
}

impl Binding {
    pub fn new<S: Into<Cow<'static, str>>>(resource: Resource, scope: S, source: Source) -> Self {
        Self {
            resource,
            scope: scope.into(),
            source,
        }
    }

    /// Finishes the binding with a construction strategy.
    pub fn supplied_by(self, supplier: SupplierPtr) -> Declaration {
        Declaration {
            resource: self.resource,
            scope: self.scope,
            source: self.source,
            supplier,
        }
    }
}

/// A finished declaration.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Declaration {
    pub resource: Resource,
    pub scope: Cow<'static, str>,
    pub source: Source,
    #[derivative(Debug = "ignore")]
    pub supplier: SupplierPtr,
}

impl Declaration {
    #[inline]
    pub fn declaration_type(&self) -> DeclarationType {
        self.source.declaration_type
    }
}

impl Resourced for Declaration {
    fn resource(&self) -> &Resource {
        &self.resource
    }
}

/// Collects declarations before they are finalized.
pub struct Bindings {
    macros: Arc<Macros>,
    inspector: InspectorPtr,
    declarations: Vec<Declaration>,
}

impl Bindings {
    pub fn new(macros: Arc<Macros>, inspector: InspectorPtr) -> Self {
        Self {
            macros,
            inspector,
            declarations: vec![],
        }
    }

    /// Expands a declared value and collects the resulting declarations.
    pub fn declare(
        &mut self,
        binding: Binding,
        declared: Declared,
    ) -> Result<(), ConfigurationError> {
        let macros = self.macros.clone();
        macros.expand(binding, declared, self)
    }

    /// Collects a finished declaration.
    pub fn add(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }

    #[inline]
    pub fn inspector(&self) -> &InspectorPtr {
        &self.inspector
    }

    #[inline]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Folds collected declarations into the final list, in source order.
    pub fn finalize(self) -> Result<Vec<Declaration>, ConfigurationError> {
        let mut entries: Vec<Option<Declaration>> = Vec::with_capacity(self.declarations.len());
        let mut bound: FxHashMap<Resource, Vec<usize>> = FxHashMap::default();
        let mut nullified: FxHashMap<Resource, DeclarationType> = FxHashMap::default();

        for declaration in self.declarations {
            let declaration_type = declaration.declaration_type();

            if let Some(strength) = nullified.get(&declaration.resource) {
                if declaration_type != DeclarationType::Required && declaration_type <= *strength {
                    debug!(
                        resource = %declaration.resource,
                        source = %declaration.source,
                        "Dropping declaration of a nullified resource."
                    );
                    continue;
                }
            }

            let indices = bound.entry(declaration.resource.clone()).or_default();
            let Some(existing) = indices.first().and_then(|index| entries[*index].as_ref()) else {
                indices.push(entries.len());
                entries.push(Some(declaration));
                continue;
            };

            let existing_type = existing.declaration_type();

            if declaration_type == DeclarationType::Required {
                continue;
            }

            if existing_type == DeclarationType::Required {
                replace(&mut entries, indices, declaration);
                continue;
            }

            if existing_type.nullified_by(declaration_type) {
                debug!(
                    resource = %declaration.resource,
                    existing = %existing.source,
                    nullifying = %declaration.source,
                    "Nullifying duplicated declarations."
                );

                for index in indices.drain(..) {
                    entries[index] = None;
                }
                nullified.insert(declaration.resource, declaration_type);
                continue;
            }

            if existing_type.clashes_with(declaration_type) {
                return Err(ConfigurationError::ClashingDeclarations {
                    resource: declaration.resource.to_string(),
                    existing: existing.source.to_string(),
                    clashing: declaration.source.to_string(),
                });
            }

            if existing_type == DeclarationType::Multi && declaration_type == DeclarationType::Multi
            {
                indices.push(entries.len());
                entries.push(Some(declaration));
                continue;
            }

            if existing_type.replaced_by(declaration_type) {
                debug!(
                    resource = %declaration.resource,
                    replaced = %existing.source,
                    replacement = %declaration.source,
                    "Replacing declaration."
                );
                replace(&mut entries, indices, declaration);
            } else {
                debug!(
                    resource = %declaration.resource,
                    kept = %existing.source,
                    dropped = %declaration.source,
                    "Dropping weaker declaration."
                );
            }
        }

        let missing = entries
            .iter()
            .flatten()
            .filter(|entry| entry.declaration_type() == DeclarationType::Required)
            .map(|entry| entry.resource.to_string())
            .collect_vec();

        if !missing.is_empty() {
            return Err(ConfigurationError::MissingRequiredResources(missing));
        }

        Ok(entries.into_iter().flatten().collect())
    }
}

fn replace(entries: &mut Vec<Option<Declaration>>, indices: &mut Vec<usize>, with: Declaration) {
    for index in indices.drain(..) {
        entries[index] = None;
    }

    indices.push(entries.len());
    entries.push(Some(with));
}

#[cfg(test)]
mod tests {
    use crate::bindings::{Binding, Bindings, Declaration};
    use crate::declaration::{DeclarationType, Source};
    use crate::dependency::Dependency;
    use crate::error::ConfigurationError;
    use crate::inspector::StaticInspector;
    use crate::instance::Instance;
    use crate::macros::{Declared, Macros};
    use crate::resolver::{AnyPtr, MockResolver};
    use crate::resource::Resource;
    use crate::types::Type;
    use std::sync::Arc;

    fn finalize(
        declared: Vec<(DeclarationType, i32)>,
    ) -> Result<Vec<Declaration>, ConfigurationError> {
        let mut bindings = Bindings::new(
            Arc::new(Macros::new()),
            Arc::new(StaticInspector::default()),
        );
        for (declaration_no, (declaration_type, value)) in declared.into_iter().enumerate() {
            let binding = Binding::new(
                Resource::everywhere(Instance::default_of(Type::of::<i32>())),
                "APPLICATION",
                Source::new("test", declaration_no, declaration_type),
            );
            let declared = if declaration_type == DeclarationType::Required {
                Declared::Required
            } else {
                Declared::Constant(Arc::new(value) as AnyPtr)
            };
            bindings.declare(binding, declared)?;
        }

        bindings.finalize()
    }

    fn values(declarations: &[Declaration]) -> Vec<i32> {
        declarations
            .iter()
            .map(|declaration| {
                *declaration
                    .supplier
                    .supply(&Dependency::of(Type::of::<i32>()), &MockResolver::new())
                    .unwrap()
                    .downcast::<i32>()
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn should_replace_weaker_declarations() {
        use DeclarationType::*;

        assert_eq!(values(&finalize(vec![(Auto, 1), (Explicit, 2)]).unwrap()), vec![2]);
        assert_eq!(values(&finalize(vec![(Explicit, 2), (Auto, 1)]).unwrap()), vec![2]);
        assert_eq!(values(&finalize(vec![(Default, 1), (Multi, 2)]).unwrap()), vec![2]);
    }

    #[test]
    fn should_let_last_implicit_win() {
        use DeclarationType::*;

        assert_eq!(values(&finalize(vec![(Implicit, 1), (Implicit, 2)]).unwrap()), vec![2]);
    }

    #[test]
    fn should_fail_on_clashes() {
        use DeclarationType::*;

        for pair in [(Explicit, Explicit), (Default, Default), (Multi, Explicit)] {
            assert!(matches!(
                finalize(vec![(pair.0, 1), (pair.1, 2)]),
                Err(ConfigurationError::ClashingDeclarations { .. })
            ));
        }
    }

    #[test]
    fn should_nullify_duplicated_auto_declarations() {
        use DeclarationType::*;

        assert!(finalize(vec![(Auto, 42), (Auto, 8)]).unwrap().is_empty());
        assert!(finalize(vec![(Provided, 1), (Provided, 2), (Default, 3)])
            .unwrap()
            .is_empty());
        assert_eq!(
            values(&finalize(vec![(Auto, 42), (Auto, 8), (Explicit, 6)]).unwrap()),
            vec![6]
        );
    }

    #[test]
    fn should_keep_multi_declarations() {
        use DeclarationType::*;

        assert_eq!(
            values(&finalize(vec![(Multi, 1), (Multi, 2), (Auto, 3)]).unwrap()),
            vec![1, 2]
        );
    }

    #[test]
    fn should_satisfy_requirements() {
        use DeclarationType::*;

        assert_eq!(values(&finalize(vec![(Required, 0), (Auto, 1)]).unwrap()), vec![1]);
        assert_eq!(values(&finalize(vec![(Implicit, 1), (Required, 0)]).unwrap()), vec![1]);
        assert!(matches!(
            finalize(vec![(Required, 0)]),
            Err(ConfigurationError::MissingRequiredResources(missing)) if missing.len() == 1
        ));
    }
}
