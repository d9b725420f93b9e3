// note: this example assumes you've analyzed the previous ones

use bindery_di::bindings::Binding;
use bindery_di::declaration::{DeclarationType, Source};
use bindery_di::injector::InjectorBuilder;
use bindery_di::inspector::{Constructor, StaticInspector};
use bindery_di::instance::{Instance, Name};
use bindery_di::macros::Declared;
use bindery_di::resolver::{AnyPtr, TypedResolver};
use bindery_di::resource::Resource;
use bindery_di::scope::{
    DependencyTypeKey, KeyDeductionScope, APPLICATION, DEPENDENCY_INSTANCE, INJECTION, THREAD,
};
use bindery_di::types::{RawType, Type};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static CREATED: AtomicUsize = AtomicUsize::new(0);

// every constructed instance gets a new id, so we can see when instances are reused
struct Session {
    id: usize,
}

fn session_type() -> Type {
    Type::new(RawType::final_class("Session"))
}

fn session_constructor() -> Constructor {
    Constructor::new(session_type(), vec![], |_| {
        println!("Session created!");
        Ok(Arc::new(Session {
            id: CREATED.fetch_add(1, Ordering::SeqCst),
        }) as AnyPtr)
    })
}

//noinspection DuplicatedCode
fn main() {
    // scopes are containers for instances and decide when to create and when to reuse instances
    // the same type can be bound under different names in different scopes
    let scopes = [
        // "INJECTION" creates a new instance for every injection
        INJECTION,
        // "APPLICATION" creates a single instance for the lifetime of the injector
        APPLICATION,
        // "THREAD" creates a single instance per thread
        THREAD,
        // "DEPENDENCY_INSTANCE" creates a single instance per requested name and type
        DEPENDENCY_INSTANCE,
        // custom scopes can be registered with the builder
        "BY_TYPE",
    ];

    let injector = InjectorBuilder::new()
        .with_inspector(Arc::new(
            StaticInspector::default().with_constructor(session_constructor()),
        ))
        .with_scope(
            "BY_TYPE",
            Arc::new(KeyDeductionScope::new(Arc::new(DependencyTypeKey))),
        )
        .with_bindings(scopes.iter().enumerate().map(|(declaration_no, scope)| {
            (
                Binding::new(
                    Resource::everywhere(Instance::new(Name::named(*scope), session_type())),
                    *scope,
                    Source::new("scopes", declaration_no, DeclarationType::Explicit),
                ),
                Declared::constructed(),
            )
        }))
        .build()
        .expect("error building injector");

    // eager initialization creates all instances which never expire up front
    // prints "Session created!" for "APPLICATION", "DEPENDENCY_INSTANCE" and "BY_TYPE"
    injector
        .initialize_eagerly()
        .expect("error initializing injector");

    for scope in scopes {
        let first = injector
            .resolve_typed::<Session>(Name::named(scope), session_type())
            .expect("error resolving Session");
        let second = injector
            .resolve_typed::<Session>(Name::named(scope), session_type())
            .expect("error resolving Session");

        // only "INJECTION" prints different ids
        println!("{scope}: {} {}", first.id, second.id);
    }
}
