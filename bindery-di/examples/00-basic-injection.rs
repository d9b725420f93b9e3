use bindery_di::bindings::Binding;
use bindery_di::declaration::{DeclarationType, Source};
use bindery_di::injector::InjectorBuilder;
use bindery_di::inspector::{submit, Constructor, ConstructorRegisterer};
use bindery_di::instance::{Instance, Name};
use bindery_di::macros::Declared;
use bindery_di::resolver::{AnyPtr, TypedResolver};
use bindery_di::resource::Resource;
use bindery_di::types::Type;
use bindery_di::ErrorPtr;
use std::sync::Arc;

// this is a dependency which will be constructed by the injector
struct TestDependency;

impl TestDependency {
    fn foo(&self) {
        println!("Hello world!");
    }
}

// this is another type, but with a dependency
struct TestComponent {
    dependency: Arc<TestDependency>,
}

impl TestComponent {
    fn call_foo(&self) {
        self.dependency.foo();
    }
}

// constructors tell the injector which parameters to resolve and how to create the value
fn test_dependency_constructor() -> Constructor {
    Constructor::new(Type::of::<TestDependency>(), vec![], |_| {
        Ok(Arc::new(TestDependency) as AnyPtr)
    })
}

fn test_component_constructor() -> Constructor {
    Constructor::new(
        Type::of::<TestComponent>(),
        vec![Type::of::<TestDependency>()],
        |arguments| {
            let dependency = arguments[0]
                .clone()
                .downcast::<TestDependency>()
                .map_err(|_| Arc::new(std::fmt::Error) as ErrorPtr)?;
            Ok(Arc::new(TestComponent { dependency }) as AnyPtr)
        },
    )
}

// statically registered constructors are found by the default inspector
submit! {
    ConstructorRegisterer {
        register: test_dependency_constructor
    }
}

submit! {
    ConstructorRegisterer {
        register: test_component_constructor
    }
}

fn bind(ty: Type, declaration_no: usize) -> Binding {
    Binding::new(
        Resource::everywhere(Instance::default_of(ty)),
        "APPLICATION",
        Source::new("basic", declaration_no, DeclarationType::Explicit),
    )
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // each binding is paired with a construction strategy - here, the registered constructor of
    // the bound type itself
    let injector = InjectorBuilder::new()
        .with_binding(bind(Type::of::<TestDependency>(), 0), Declared::constructed())
        .with_binding(bind(Type::of::<TestComponent>(), 1), Declared::constructed())
        .build()
        .expect("error building injector");

    let component = injector
        .resolve_typed::<TestComponent>(Name::DEFAULT, Type::of::<TestComponent>())
        .expect("error creating TestComponent");

    // prints "Hello world!"
    component.call_foo();
}
