use bindery::bootstrap::Bootstrap;
use bindery_di::bindings::Binding;
use bindery_di::declaration::{DeclarationType, Source};
use bindery_di::injector::InjectorBuilder;
use bindery_di::instance::{Instance, Name};
use bindery_di::macros::Declared;
use bindery_di::resolver::TypedResolver;
use bindery_di::resource::Resource;
use bindery_di::scope::APPLICATION;
use bindery_di::types::Type;

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // the configuration is read from "bindery.json", if present, and overwritten by environment
    // variables prefixed with "BINDERY_", e.g. try running this example with
    // BINDERY_GREETING="Hello world!" RUST_LOG=debug
    let bootstrap = Bootstrap::from_environment().expect("error reading configuration");

    let injector = bootstrap
        .injector(InjectorBuilder::new().with_binding(
            Binding::new(
                Resource::everywhere(Instance::new(Name::named("greeting"), Type::of::<String>())),
                APPLICATION,
                Source::new("bootstrap", 0, DeclarationType::Explicit),
            ),
            // configuration values are looked up by key and converted to the bound type
            Declared::Configure("greeting".to_string()),
        ))
        .expect("error building injector");

    match injector.resolve_typed::<String>(Name::named("greeting"), Type::of::<String>()) {
        Ok(greeting) => println!("{greeting}"),
        Err(error) => println!("No greeting configured: {error}"),
    }
}
