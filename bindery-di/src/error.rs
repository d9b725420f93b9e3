use std::error::Error;
use std::sync::Arc;
use thiserror::Error;

/// Opaque error reported by external collaborators, e.g. constructor invokers.
pub type ErrorPtr = Arc<dyn Error + Send + Sync>;

/// Build-time errors. Any of them aborts building an injector.
#[derive(Error, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConfigurationError {
    #[error("Clashing declarations for resource {resource}: {existing} and {clashing}")]
    ClashingDeclarations {
        resource: String,
        existing: String,
        clashing: String,
    },
    #[error("Required resources are not provided: {}", .0.join(", "))]
    MissingRequiredResources(Vec<String>),
    #[error("No macro registered for declared values of kind: {0}")]
    NoMacroForKind(String),
    #[error("Cannot substitute interface {0} with itself")]
    SubstitutionLoop(String),
    #[error(
        "Factory method {method} returns {return_type}, which is not assignable to {bound_type}"
    )]
    FactoryReturnTypeMismatch {
        method: String,
        return_type: String,
        bound_type: String,
    },
    #[error("Implementation {implementation} is not assignable to bound type {bound_type}")]
    IncompatibleImplementation {
        implementation: String,
        bound_type: String,
    },
    #[error("No usable constructor found for type: {0}")]
    NotConstructible(String),
    #[error("Array elements bound to non-array type: {0}")]
    NotAnArrayType(String),
    #[error("Unrecognized scope '{scope}' used by: {source_ident}")]
    UnrecognizedScope { scope: String, source_ident: String },
}

/// Errors related to resolving and constructing instances.
#[derive(Error, Clone, Debug)]
pub enum InjectionError {
    #[error("No resource found for dependency: {0}")]
    NoResourceForDependency(String),
    #[error("Ambiguous dependency {dependency} - both {one} and {other} are applicable")]
    AmbiguousDependency {
        dependency: String,
        one: String,
        other: String,
    },
    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),
    #[error("Cannot inject {resource} into {receiver} - it expires more frequently: {dependency}")]
    MoreFrequentExpiry {
        resource: String,
        receiver: String,
        dependency: String,
    },
    #[error("Resolved instance for {0} has an incompatible type")]
    IncompatibleInstance(String),
    #[error("Error constructing {dependency}: {error}")]
    ConstructionFailed { dependency: String, error: ErrorPtr },
    #[error("No configured value for key '{key}' of type {ty}")]
    NoConfiguredValue { key: String, ty: String },
    #[error("Required resource was not provided: {0}")]
    UnmetRequirement(String),
}
