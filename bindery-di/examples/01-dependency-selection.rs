use bindery_di::bindings::Binding;
use bindery_di::declaration::{DeclarationType, Source};
use bindery_di::injector::InjectorBuilder;
use bindery_di::instance::{Instance, Name};
use bindery_di::macros::Declared;
use bindery_di::resolver::TypedResolver;
use bindery_di::resource::{Resource, Target};
use bindery_di::scope::APPLICATION;
use bindery_di::types::{RawType, Type};
use std::sync::Arc;

fn bind(resource: Resource, declaration_no: usize) -> Binding {
    Binding::new(
        resource,
        APPLICATION,
        Source::new("selection", declaration_no, DeclarationType::Explicit),
    )
}

//noinspection DuplicatedCode
fn main() {
    // types don't need to be Rust types - the injector works with reified descriptions, which
    // may carry supertypes
    let greeting = Type::new(RawType::class("Greeting"));
    let polite = Type::new(RawType::final_class("PoliteGreeting").extending(greeting.clone()));
    let mailer = Instance::default_of(Type::new(RawType::class("Mailer")));

    let injector = InjectorBuilder::new()
        .with_binding(
            bind(Resource::everywhere(Instance::default_of(greeting.clone())), 0),
            Declared::Constant(Arc::new("Hello")),
        )
        // names ending with "*" are patterns matching all names with the given prefix
        .with_binding(
            bind(
                Resource::everywhere(Instance::new(Name::named("formal-*"), greeting.clone())),
                1,
            ),
            Declared::Constant(Arc::new("Good day")),
        )
        // exact names are more precise than patterns
        .with_binding(
            bind(
                Resource::everywhere(Instance::new(
                    Name::named("formal-evening"),
                    greeting.clone(),
                )),
                2,
            ),
            Declared::Constant(Arc::new("Good evening")),
        )
        // targeted bindings are only available when injecting into a specific receiver, and are
        // more precise than the ones available everywhere
        .with_binding(
            bind(
                Resource::new(Instance::default_of(greeting.clone()), Target::within(mailer)),
                3,
            ),
            Declared::Constant(Arc::new("Dear Sir or Madam")),
        )
        // a narrower type can be used where the wider one is bound
        .with_binding(
            bind(Resource::everywhere(Instance::default_of(polite.clone())), 4),
            Declared::Constant(Arc::new("Pleased to meet you")),
        )
        .build()
        .expect("error building injector");

    let resolve = |name: Name, ty: &Type| {
        injector
            .resolve_typed::<&'static str>(name, ty.clone())
            .expect("error resolving greeting")
    };

    // prints "Hello"
    println!("{}", resolve(Name::DEFAULT, &greeting));
    // prints "Good day"
    println!("{}", resolve(Name::named("formal-morning"), &greeting));
    // prints "Good evening"
    println!("{}", resolve(Name::named("formal-evening"), &greeting));
    // prints "Pleased to meet you"
    println!("{}", resolve(Name::DEFAULT, &polite));

    // all greetings of any name, most precise first
    for greeting in injector
        .resolve_all_typed::<&'static str>(greeting)
        .expect("error resolving greetings")
    {
        println!("- {greeting}");
    }
}
