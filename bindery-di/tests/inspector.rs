mod inspector_test {
    use bindery_di::bindings::Binding;
    use bindery_di::declaration::{DeclarationType, Source};
    use bindery_di::injector::InjectorBuilder;
    use bindery_di::inspector::{
        submit, Constructor, ConstructorRegisterer, Inspector, StaticInspector,
    };
    use bindery_di::instance::{Instance, Name};
    use bindery_di::macros::Declared;
    use bindery_di::resolver::{AnyPtr, TypedResolver};
    use bindery_di::resource::Resource;
    use bindery_di::types::Type;
    use bindery_di::ErrorPtr;
    use std::sync::Arc;

    struct Repository {
        url: String,
    }

    struct Service {
        repository: Arc<Repository>,
    }

    fn repository_constructor() -> Constructor {
        Constructor::new(Type::of::<Repository>(), vec![], |_| {
            Ok(Arc::new(Repository {
                url: "memory://".to_string(),
            }) as AnyPtr)
        })
    }

    fn service_constructor() -> Constructor {
        Constructor::new(
            Type::of::<Service>(),
            vec![Type::of::<Repository>()],
            |arguments| {
                let repository = arguments[0]
                    .clone()
                    .downcast::<Repository>()
                    .map_err(|_| Arc::new(std::fmt::Error) as ErrorPtr)?;
                Ok(Arc::new(Service { repository }) as AnyPtr)
            },
        )
    }

    submit! {
        ConstructorRegisterer {
            register: repository_constructor
        }
    }

    submit! {
        ConstructorRegisterer {
            register: service_constructor
        }
    }

    fn constructed(ty: Type, declaration_no: usize) -> (Binding, Declared) {
        (
            Binding::new(
                Resource::everywhere(Instance::default_of(ty)),
                "APPLICATION",
                Source::new("inspector_test", declaration_no, DeclarationType::Explicit),
            ),
            Declared::constructed(),
        )
    }

    #[test]
    fn should_find_registered_constructors() {
        let inspector = StaticInspector::new();

        assert!(inspector.constructor_for(&Type::of::<Service>()).is_some());
        assert!(inspector.constructor_for(&Type::of::<String>()).is_none());
    }

    #[test]
    fn should_construct_with_registered_constructors() {
        let injector = InjectorBuilder::new()
            .with_bindings([
                constructed(Type::of::<Service>(), 0),
                constructed(Type::of::<Repository>(), 1),
            ])
            .build()
            .unwrap();

        let service = injector
            .resolve_typed::<Service>(Name::DEFAULT, Type::of::<Service>())
            .unwrap();
        let repository = injector
            .resolve_typed::<Repository>(Name::DEFAULT, Type::of::<Repository>())
            .unwrap();

        assert!(Arc::ptr_eq(&service.repository, &repository));
        assert_eq!(repository.url, "memory://");
    }
}
