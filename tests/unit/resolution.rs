use dcgen_cli::catalog::{Calculator, Catalog, Source, Target, VariableDef, VariableKind, validators};
use dcgen_cli::core::{ArgumentDictionary, GenError};
use dcgen_cli::resolver::{Resolver, resolve};
use dcgen_cli::test_utils::{bootstrap_sources, bootstrap_target, init_test_logging};
use std::sync::Arc;

fn dict(pairs: &[(&str, &str)]) -> ArgumentDictionary {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

fn bootstrap_user() -> ArgumentDictionary {
    dict(&[("resolvers", r#"["168.63.129.16"]"#), ("cluster_name", "test")])
}

#[test]
fn test_bootstrap_id_from_calculator() {
    init_test_logging(None);
    let resolution = resolve(&bootstrap_user(), &bootstrap_sources(true), &[bootstrap_target()]).unwrap();

    assert_eq!(resolution.get("bootstrap_id"), Some("test-bootstrap"));
    assert_eq!(resolution.get("cluster_name"), Some("test"));
    assert_eq!(resolution.get("resolvers"), Some(r#"["168.63.129.16"]"#));
}

#[test]
fn test_bootstrap_id_missing_is_reported_alone() {
    let err = resolve(&bootstrap_user(), &bootstrap_sources(false), &[bootstrap_target()]).unwrap_err();
    assert_eq!(err.missing_variables(), vec!["bootstrap_id"]);
    assert!(err.invalid_variables().is_empty());
}

#[test]
fn test_resolution_is_deterministic() {
    let first = resolve(&bootstrap_user(), &bootstrap_sources(true), &[bootstrap_target()]).unwrap();
    let second = resolve(&bootstrap_user(), &bootstrap_sources(true), &[bootstrap_target()]).unwrap();

    assert_eq!(first.arguments(), second.arguments());
    assert_eq!(
        serde_json::to_string(first.arguments()).unwrap(),
        serde_json::to_string(second.arguments()).unwrap()
    );
}

#[test]
fn test_user_value_wins_over_calculator() {
    let mut user = bootstrap_user();
    user.insert("bootstrap_id".to_string(), "custom".to_string());

    let resolution = resolve(&user, &bootstrap_sources(true), &[bootstrap_target()]).unwrap();
    assert_eq!(resolution.get("bootstrap_id"), Some("custom"));
    assert_eq!(resolution.kind("bootstrap_id"), Some(VariableKind::UserProvided));
}

#[test]
fn test_user_value_wins_over_default() {
    let source = Source::new("s").with(VariableDef::default_value("port", "80")).unwrap();
    let target = Target::new("t", ["port"], "");

    let resolution = resolve(&dict(&[("port", "8080")]), &[source.clone()], &[target.clone()]).unwrap();
    assert_eq!(resolution.get("port"), Some("8080"));

    let resolution = resolve(&ArgumentDictionary::new(), &[source], &[target]).unwrap();
    assert_eq!(resolution.get("port"), Some("80"));
    assert_eq!(resolution.kind("port"), Some(VariableKind::Default));
}

#[test]
fn test_cycle_is_fatal() {
    let source = Source::new("loop")
        .with(VariableDef::calculated("a", Calculator::new(["b"], |i| Ok(i.get("b")?.to_string()))))
        .unwrap()
        .with(VariableDef::calculated("b", Calculator::new(["a"], |i| Ok(i.get("a")?.to_string()))))
        .unwrap();

    let err = resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["a"], "")]).unwrap_err();
    match err {
        GenError::CircularDependency {
            unresolved,
            cycle,
        } => {
            assert_eq!(unresolved, vec!["a", "b"]);
            assert_eq!(cycle, vec!["a", "b", "a"]);
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_every_problem_is_collected() {
    let source = Source::new("s")
        .with(VariableDef::required("x"))
        .unwrap()
        .with(VariableDef::required("y"))
        .unwrap()
        .with(VariableDef::required("z").with_validator(validators::integer()))
        .unwrap();
    let target = Target::new("t", ["x", "y", "z"], "");

    let err = resolve(&dict(&[("z", "abc")]), &[source], &[target]).unwrap_err();
    let GenError::ValidationFailed {
        errors,
    } = &err
    else {
        panic!("expected an aggregate, got {err:?}");
    };
    assert_eq!(errors.len(), 3);
    assert_eq!(err.missing_variables(), vec!["x", "y"]);
    assert_eq!(err.invalid_variables(), vec!["z"]);
}

#[test]
fn test_blocked_dependents_are_not_reported() {
    let source = Source::new("s")
        .with(VariableDef::required("m"))
        .unwrap()
        .with(VariableDef::calculated("c", Calculator::new(["m"], |i| Ok(i.get("m")?.to_uppercase()))))
        .unwrap()
        .with(VariableDef::calculated("d", Calculator::new(["c"], |i| Ok(i.get("c")?.to_lowercase()))))
        .unwrap();

    let err = resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["d"], "")]).unwrap_err();
    assert_eq!(
        err,
        GenError::ValidationFailed {
            errors: vec![GenError::MissingRequiredVariable {
                name: "m".to_string(),
            }],
        }
    );
}

#[test]
fn test_failing_calculator_is_an_invalid_value() {
    let source = Source::new("s")
        .with(VariableDef::default_value("masters", "two"))
        .unwrap()
        .with(VariableDef::calculated(
            "quorum",
            Calculator::new(["masters"], |i| {
                let masters: u32 = i.get("masters")?.parse()?;
                Ok((masters / 2 + 1).to_string())
            }),
        ))
        .unwrap();

    let err = resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["quorum"], "")]).unwrap_err();
    assert_eq!(err.invalid_variables(), vec!["quorum"]);
}

#[test]
fn test_undeclared_input_is_fatal() {
    let source = Source::new("s")
        .with(VariableDef::default_value("secret_key", "k"))
        .unwrap()
        .with(VariableDef::default_value("cluster_name", "c"))
        .unwrap()
        .with(VariableDef::calculated(
            "sneaky",
            Calculator::new(["cluster_name"], |i| Ok(format!("{}{}", i.get("cluster_name")?, i.get("secret_key")?))),
        ))
        .unwrap();

    let err = resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["secret_key", "sneaky"], "")])
        .unwrap_err();
    assert_eq!(
        err,
        GenError::UndeclaredInput {
            calculator: "sneaky".to_string(),
            input: "secret_key".to_string(),
        }
    );
}

fn provider_source() -> Source {
    let mut source = Source::new("cloud");
    source.register(VariableDef::default_value("provider", "onprem")).unwrap();
    source.register(VariableDef::default_value("location", "local")).unwrap();
    source.when("provider", "azure", [VariableDef::default_value("location", "westus")]).unwrap();
    source.when("provider", "aws", [VariableDef::default_value("location", "us-west-2")]).unwrap();
    source
}

#[test]
fn test_switch_selects_matching_definition() {
    let target = Target::new("t", ["location"], "");
    let cases = [(None, "local"), (Some("azure"), "westus"), (Some("aws"), "us-west-2"), (Some("gcp"), "local")];

    for (provider, expected) in cases {
        let user = match provider {
            Some(p) => dict(&[("provider", p)]),
            None => ArgumentDictionary::new(),
        };
        let resolution = resolve(&user, &[provider_source()], &[target.clone()]).unwrap();
        assert_eq!(resolution.get("location"), Some(expected), "provider {provider:?}");
        assert!(resolution.get("provider").is_some());
    }
}

#[test]
fn test_conditional_target_requirements() {
    let source = Source::new("s")
        .with(VariableDef::default_value("provider", "onprem"))
        .unwrap()
        .with(VariableDef::required("azure_key").secret())
        .unwrap();
    let target = Target::new("t", Vec::<String>::new(), "").when("provider", "azure", ["azure_key"]);

    let resolution = resolve(&ArgumentDictionary::new(), &[source.clone()], &[target.clone()]).unwrap();
    assert!(resolution.get("azure_key").is_none());

    let err = resolve(&dict(&[("provider", "azure")]), &[source], &[target]).unwrap_err();
    assert_eq!(err.missing_variables(), vec!["azure_key"]);
}

#[test]
fn test_reserved_user_key_is_rejected() {
    let err = resolve(&dict(&[("expanded_config", "forged")]), &bootstrap_sources(true), &[bootstrap_target()])
        .unwrap_err();
    assert!(err.invalid_variables().contains(&"expanded_config"));
}

#[test]
fn test_placeholder_marker_in_user_value_is_rejected() {
    let mut user = bootstrap_user();
    user.insert("cluster_name".to_string(), "<LATE_BIND_PLACEHOLDER_START>x".to_string());

    let err = resolve(&user, &bootstrap_sources(true), &[bootstrap_target()]).unwrap_err();
    assert_eq!(err.invalid_variables(), vec!["cluster_name"]);
    assert!(err.missing_variables().is_empty());
}

#[test]
fn test_invalid_user_value_is_reported() {
    let user = dict(&[("resolvers", "not-a-list"), ("cluster_name", "test")]);
    let err = resolve(&user, &bootstrap_sources(true), &[bootstrap_target()]).unwrap_err();
    assert_eq!(err.invalid_variables(), vec!["resolvers"]);
}

#[test]
fn test_unused_user_arguments_are_returned() {
    let mut user = bootstrap_user();
    user.insert("legacy_flag".to_string(), "true".to_string());

    let resolution = resolve(&user, &bootstrap_sources(true), &[bootstrap_target()]).unwrap();
    assert_eq!(resolution.unused_arguments(), ["legacy_flag".to_string()]);
}

#[test]
fn test_composition_errors() {
    let calc = || Calculator::new(["a"], |i| Ok(i.get("a")?.to_string()));
    let first = Source::new("first").with(VariableDef::calculated("x", calc())).unwrap();
    let second = Source::new("second").with(VariableDef::calculated("x", calc())).unwrap();
    assert!(matches!(Catalog::compose(&[first.clone(), second]), Err(GenError::DuplicateVariable { .. })));

    let default = Source::new("defaults").with(VariableDef::default_value("x", "1")).unwrap();
    assert!(matches!(Catalog::compose(&[default, first]), Err(GenError::ConflictingDefinition { .. })));
}

#[test]
fn test_shared_catalog_across_threads() {
    let resolver = Resolver::from_sources(&bootstrap_sources(true)).unwrap();
    let catalog = Arc::clone(resolver.catalog());

    let handles: Vec<_> = (0..4)
        .map(|n| {
            let resolver = Resolver::new(Arc::clone(&catalog));
            std::thread::spawn(move || {
                let user = dict(&[("resolvers", r#"["10.0.0.1"]"#), ("cluster_name", &format!("c{n}"))]);
                resolver.resolve(&user, &[bootstrap_target()]).map(|r| r.get("bootstrap_id").map(str::to_string))
            })
        })
        .collect();

    for (n, handle) in handles.into_iter().enumerate() {
        let id = handle.join().unwrap().unwrap();
        assert_eq!(id, Some(format!("c{n}-bootstrap")));
    }
}

#[test]
fn test_user_value_checked_against_active_case() {
    let mut source = Source::new("cloud");
    source.register(VariableDef::default_value("provider", "onprem")).unwrap();
    source.register(VariableDef::default_value("location", "local")).unwrap();
    source
        .when(
            "provider",
            "azure",
            [VariableDef::default_value("location", "westus")
                .with_validator(validators::one_of(vec!["westus".to_string(), "eastus".to_string()]))],
        )
        .unwrap();
    let target = Target::new("t", ["location"], "");

    let err = resolve(&dict(&[("provider", "azure"), ("location", "mars")]), &[source.clone()], &[target.clone()])
        .unwrap_err();
    assert_eq!(err.invalid_variables(), vec!["location"]);

    let resolution = resolve(&dict(&[("provider", "onprem"), ("location", "mars")]), &[source.clone()], &[target])
        .unwrap();
    assert_eq!(resolution.get("location"), Some("mars"));
    assert_eq!(resolution.kind("location"), Some(VariableKind::UserProvided));

    let err = resolve(&dict(&[("provider", "azure"), ("location", "mars")]), &[source], &[Target::new("t", ["provider"], "")])
        .unwrap_err();
    assert_eq!(err.invalid_variables(), vec!["location"]);
}

#[test]
fn test_invalid_secret_is_masked_in_the_report() {
    let source = Source::new("auth")
        .with(VariableDef::required("superuser_password").secret().with_validator(validators::integer()))
        .unwrap();
    let err = resolve(
        &dict(&[("superuser_password", "hunter2secret")]),
        &[source],
        &[Target::new("t", ["superuser_password"], "")],
    )
    .unwrap_err();

    assert_eq!(err.invalid_variables(), vec!["superuser_password"]);
    let report = err.to_string();
    assert!(!report.contains("hunter2secret"), "report leaked the secret: {report}");
    assert!(report.contains("**HIDDEN**"));
}
