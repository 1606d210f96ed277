use optimport_core::{
    declaration, AugmentError, ClassAugmentor, ClassBuilder, CollectingWarningSink,
    DefinedClass, FailureKind, Module, ModuleRegistry, Value, DECLARATION_FORMAT_MESSAGE,
    IMPORTS_ROUTINE,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry
        .register_module(Module::new("random").with_attr("seed", 1234_i64))
        .expect("register random");
    registry
        .register_module(Module::new("json").with_attr("indent", 2_i64))
        .expect("register json");
    registry
}

fn augmentor_with_sink(
    registry: &ModuleRegistry,
) -> (ClassAugmentor<'_>, Arc<CollectingWarningSink>) {
    let sink = Arc::new(CollectingWarningSink::new());
    let augmentor = ClassAugmentor::new(registry).with_warning_sink(sink.clone());
    (augmentor, sink)
}

#[test]
fn class_without_declaration_matches_plain_class() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let builder = ClassBuilder::new("Plain").attr("mode", "fast");
    let plain = builder.clone().finish();
    let defined = augmentor.define(builder).expect("define plain class");

    let class = defined.class().expect("plain class is usable");
    assert_eq!(class.own_attrs(), plain.own_attrs());
    assert!(!class.has_attr(IMPORTS_ROUTINE));
    assert!(sink.warnings().is_empty());
}

#[test]
fn existing_package_import_binds_module_and_removes_routine() {
    let registry = registry();
    let (augmentor, _sink) = augmentor_with_sink(&registry);

    let defined = augmentor
        .define(ClassBuilder::new("TestClass").imports(declaration!(
            "def __imports__(self):\n    import random\n"
        )))
        .expect("define class");

    let instance = defined.instantiate().expect("instantiate class");
    assert!(!instance.has_attr(IMPORTS_ROUTINE));
    let module = instance
        .get("random")
        .and_then(Value::as_module)
        .expect("random bound on class");
    assert_eq!(module.attr("seed"), Some(&Value::Int(1234)));
}

#[test]
fn two_line_declaration_binds_each_name() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let defined = augmentor
        .define(
            ClassBuilder::new("Pair")
                .attr("label", "pair")
                .imports(declaration!(r#"
    def __imports__(self):
        a = 1
        b = 2
"#)),
        )
        .expect("define class");

    let instance = defined.instantiate().expect("instantiate class");
    assert_eq!(instance.get("a"), Some(&Value::Int(1)));
    assert_eq!(instance.get("b"), Some(&Value::Int(2)));
    assert_eq!(instance.get("label"), Some(&Value::from("pair")));
    assert!(!instance.has_attr(IMPORTS_ROUTINE));

    let class = defined.class().expect("class is usable");
    assert_eq!(
        class.own_attrs().names().collect::<Vec<_>>(),
        vec!["a", "b", "label"]
    );
    assert!(sink.warnings().is_empty());
}

#[test]
fn missing_package_defers_resolution_failure_to_instantiation() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let defined = augmentor
        .define(ClassBuilder::new("TestClass").imports(declaration!(
            "def __imports__(self):\n    import nonexistent_pkg\n"
        )))
        .expect("definition succeeds despite missing package");
    assert!(matches!(defined, DefinedClass::Unavailable(_)));
    assert_eq!(defined.name(), "TestClass");
    assert!(sink.warnings().is_empty());

    let first = defined
        .instantiate()
        .expect_err("instantiation must fail");
    assert_eq!(
        first.error().kind,
        FailureKind::ModuleNotFound {
            module: "nonexistent_pkg".to_string(),
        }
    );
    assert!(first.to_string().contains("nonexistent_pkg"));

    for _ in 0..3 {
        let again = defined
            .instantiate()
            .expect_err("instantiation keeps failing");
        assert!(again.is_same(&first));
    }
}

#[test]
fn multi_line_literal_fails_definition_immediately() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let err = augmentor
        .define(ClassBuilder::new("Split").imports(declaration!(
            "def __imports__(self):\n    x = [1,\n         2, 3]\n"
        )))
        .expect_err("multi-line literal must fail definition");

    let AugmentError::DeclarationFormat(format_err) = err else {
        panic!("expected declaration format error");
    };
    assert_eq!(format_err.to_string(), DECLARATION_FORMAT_MESSAGE);
    assert_eq!(format_err.line, "x = [1,");
    assert!(sink.warnings().is_empty());
}

#[test]
fn every_multi_line_construct_is_structural() {
    let registry = registry();
    let (augmentor, _sink) = augmentor_with_sink(&registry);
    let bodies = [
        "    from json import (\n        indent,\n    )\n",
        "    if True:\n        x = 1\n",
        "    try:\n        import json\n    except ImportError:\n        pass\n",
        "    doc = \"\"\"first\n    second\"\"\"\n",
        "    import json, \\\n        random\n",
        "    values = (1,\n              2)\n",
    ];

    for body in bodies {
        let text = format!("def __imports__(self):\n{body}");
        let err = augmentor
            .define(ClassBuilder::new("Multi").imports(declaration!(text)))
            .expect_err("multi-line construct must fail definition");
        assert!(
            matches!(err, AugmentError::DeclarationFormat(_)),
            "unexpected error for body {body:?}: {err:?}"
        );
    }
}

#[test]
fn other_failure_warns_once_and_defers_captured_error() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let declaration = declaration!(
        "def __imports__(self):\n    import json\n    from json import dumps\n    after = 1\n"
    );
    let origin = declaration.origin().clone();
    let defined = augmentor
        .define(ClassBuilder::new("Encoder").imports(declaration))
        .expect("definition succeeds");

    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].class_name, "Encoder");
    assert_eq!(warnings[0].location.file, origin.file);
    assert_eq!(warnings[0].location.line, origin.line + 2);

    let err = defined.instantiate().expect_err("instantiation must fail");
    assert_eq!(
        err.error().kind,
        FailureKind::ImportName {
            module: "json".to_string(),
            name: "dumps".to_string(),
        }
    );
    assert!(!err.is_resolution_failure());
    assert_eq!(warnings[0].message, err.to_string());
}

#[test]
fn warning_reports_the_failing_line_of_this_file() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let anchor = line!();
    let declaration = declaration!(r#"
        def __imports__(self):
            import json
            b = missing
"#);
    augmentor
        .define(ClassBuilder::new("Located").imports(declaration))
        .expect("definition succeeds");

    let warnings = sink.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].location.file.ends_with("class_augment.rs"));
    assert_eq!(warnings[0].location.line, anchor + 4);
}

#[test]
fn semicolon_separated_imports_complete_normally() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let defined = augmentor
        .define(ClassBuilder::new("Both").imports(declaration!(
            "def __imports__(self):\n    import json; import random\n"
        )))
        .expect("single-line statements must define");

    let instance = defined.instantiate().expect("instantiate class");
    assert!(instance.get("json").and_then(Value::as_module).is_some());
    assert!(instance.get("random").and_then(Value::as_module).is_some());
    assert!(sink.warnings().is_empty());
}

#[test]
fn complete_unsupported_lines_defer_with_warning() {
    let registry = registry();
    let (augmentor, sink) = augmentor_with_sink(&registry);
    let lines = ["x = 1 + 2", "x = {}", "x = 10000000000000000000", ";"];

    for line in lines {
        let text = format!("def __imports__(self):\n    import json\n    {line}\n");
        let defined = augmentor
            .define(ClassBuilder::new("Unsupported").imports(declaration!(text)))
            .expect("complete line must not fail definition");
        let err = defined
            .instantiate()
            .expect_err("unsupported line defers its failure");
        assert!(
            matches!(err.error().kind, FailureKind::UnsupportedStatement { .. }),
            "unexpected failure for {line:?}: {err:?}"
        );
        assert_eq!(err.error().line, line);
    }
    assert_eq!(sink.warnings().len(), lines.len());
}

#[test]
fn failing_loader_is_deferred_with_warning() {
    let mut registry = registry();
    registry
        .register_loader("cuda", || Err("libcuda.so not found".to_string()))
        .expect("register cuda loader");
    let (augmentor, sink) = augmentor_with_sink(&registry);

    let defined = augmentor
        .define(ClassBuilder::new("Gpu").imports(declaration!(
            "def __imports__(self):\n    import cuda\n"
        )))
        .expect("definition succeeds");

    assert_eq!(sink.warnings().len(), 1);
    let err = defined.instantiate().expect_err("instantiation must fail");
    assert!(matches!(err.error().kind, FailureKind::LoadFailed { .. }));
}

#[test]
fn subclass_with_empty_declaration_inherits_without_reevaluation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = registry();
    registry
        .register_module(Module::new("plugins"))
        .expect("register plugins package");
    registry
        .register_loader("plugins.fast", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Module::new("plugins.fast").with_attr("speed", 9_i64))
        })
        .expect("register loader");
    let (augmentor, _sink) = augmentor_with_sink(&registry);

    let parent = augmentor
        .define(ClassBuilder::new("Parent").imports(declaration!(
            "def __imports__(self):\n    from plugins.fast import speed\n"
        )))
        .expect("define parent");
    let parent_class = parent.class().expect("parent is usable");

    let child = augmentor
        .define(
            ClassBuilder::new("Child")
                .base(parent_class)
                .imports(declaration!("def __imports__(self):\n    pass\n")),
        )
        .expect("define child");

    let instance = child.instantiate().expect("instantiate child");
    assert_eq!(instance.get("speed"), Some(&Value::Int(9)));
    let child_class = child.class().expect("child is usable");
    assert!(!child_class.own_attrs().contains("speed"));
    assert!(child_class.is_subclass_of(parent_class));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn subclass_with_failing_declaration_hides_inherited_attributes() {
    let registry = registry();
    let (augmentor, _sink) = augmentor_with_sink(&registry);

    let parent = augmentor
        .define(ClassBuilder::new("Parent").imports(declaration!(
            "def __imports__(self):\n    import json\n"
        )))
        .expect("define parent");
    let child = augmentor
        .define(
            ClassBuilder::new("Child")
                .base(parent.class().expect("parent is usable"))
                .imports(declaration!(
                    "def __imports__(self):\n    import missing_backend\n"
                )),
        )
        .expect("define child");

    assert!(!child.is_available());
    let err = child.class().expect_err("child is a placeholder");
    assert!(err.is_resolution_failure());
}

#[test]
fn failed_evaluation_never_exposes_partial_bindings() {
    let registry = registry();
    let (augmentor, _sink) = augmentor_with_sink(&registry);

    let defined = augmentor
        .define(ClassBuilder::new("Partial").attr("kept", 1_i64).imports(declaration!(
            "def __imports__(self):\n    early = 1\n    import absent\n"
        )))
        .expect("definition succeeds");

    assert!(defined.instantiate().is_err());
    assert!(defined.class().is_err());
}

#[test]
fn modules_are_not_cached_across_classes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut registry = ModuleRegistry::new();
    registry
        .register_loader("counted", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Module::new("counted"))
        })
        .expect("register loader");
    let (augmentor, _sink) = augmentor_with_sink(&registry);

    for name in ["First", "Second"] {
        augmentor
            .define(ClassBuilder::new(name).imports(declaration!(
                "def __imports__(self):\n    import counted\n    import counted as again\n"
            )))
            .expect("define class");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn distinct_classes_can_be_defined_concurrently() {
    let registry = registry();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|index| {
                let registry = &registry;
                scope.spawn(move || {
                    let augmentor = ClassAugmentor::new(registry);
                    augmentor
                        .define(
                            ClassBuilder::new(format!("Worker{index}")).imports(declaration!(
                                "def __imports__(self):\n    import random\n    slot = random.seed\n"
                            )),
                        )
                        .expect("define worker class")
                })
            })
            .collect();

        for handle in handles {
            let defined = handle.join().expect("worker thread");
            let instance = defined.instantiate().expect("instantiate worker");
            assert_eq!(instance.get("slot"), Some(&Value::Int(1234)));
        }
    });
}
