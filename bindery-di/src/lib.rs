//! Dependency injection engine resolving typed, named requests against a table of bindings.
//!
//! Bindings are declared as [Binding](bindings::Binding)s paired with a
//! [Declared](macros::Declared) construction strategy. Declarations are expanded by
//! [Macros](macros::Macros) and folded by their [DeclarationType](declaration::DeclarationType),
//! so that each [Resource](resource::Resource) ends up bound once (or multiple times, when bound
//! as `MULTI`). The resulting [Injector](injector::Injector) picks the most precise applicable
//! binding for every request, taking the type, the name and the injection context into account.
//!
//! Instances are kept in repositories provided by [Scope](scope::Scope)s. Default scopes include:
//!
//! * `INJECTION` - a new instance for each injection,
//! * `APPLICATION` - a single instance for the lifetime of the injector,
//! * `THREAD` - a single instance per thread,
//! * `DEPENDENCY_TYPE`, `DEPENDENCY_INSTANCE`, `TARGET_INSTANCE` and `DEPENDENCY` - instances
//!   keyed by a property of the request.
//!
//! Injection checks dependency cycles and forbids injecting instances which expire more often
//! than their receivers.
//!
//! Concrete constructors can be registered statically with [inventory], which makes them
//! available to the default [StaticInspector](inspector::StaticInspector) - see
//! [inspector] for an example.

pub mod bindings;
pub mod declaration;
pub mod dependency;
mod error;
pub mod injector;
pub mod injectron;
pub mod inspector;
pub mod instance;
pub mod macros;
pub mod precision;
pub mod resolver;
pub mod resource;
pub mod scope;
pub mod supplier;
pub mod types;

pub use error::{ConfigurationError, ErrorPtr, InjectionError};
