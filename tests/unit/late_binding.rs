use dcgen_cli::catalog::{Calculator, Source, Target, VariableDef, VariableKind};
use dcgen_cli::constants::{EXPANDED_CONFIG, LATE_BIND_PLACEHOLDER_START};
use dcgen_cli::core::{ArgumentDictionary, GenError};
use dcgen_cli::resolver::resolve;
use dcgen_cli::test_utils::late_sources;

#[test]
fn test_late_root_and_dependent_are_computed() {
    let target = Target::new("report", ["cluster_name", "config_report"], "");
    let resolution = resolve(&ArgumentDictionary::new(), &late_sources(), &[target]).unwrap();

    assert_eq!(resolution.get(EXPANDED_CONFIG), Some("  cluster_name: prod\n"));
    assert_eq!(resolution.get("config_lines"), Some("1"));
    assert_eq!(resolution.get("config_report"), Some("1 line(s)"));
    assert_eq!(resolution.kind("config_lines"), Some(VariableKind::LateBound));
    assert_eq!(resolution.kind("config_report"), Some(VariableKind::LateBound));
    assert!(resolution.arguments().values().all(|v| !v.contains(LATE_BIND_PLACEHOLDER_START)));
}

#[test]
fn test_expanded_config_omits_deferred_values() {
    let target = Target::new("report", ["cluster_name", "config_report"], "");
    let resolution = resolve(&ArgumentDictionary::new(), &late_sources(), &[target]).unwrap();

    let expanded = resolution.get(EXPANDED_CONFIG).unwrap();
    assert!(!expanded.contains("config_lines"));
    assert!(!expanded.contains("config_report"));
}

#[test]
fn test_nested_late_binding_fails() {
    let source = Source::new("s")
        .with(VariableDef::calculated(
            "summary",
            Calculator::new([EXPANDED_CONFIG], |i| Ok(i.get(EXPANDED_CONFIG)?.len().to_string())),
        ))
        .unwrap()
        .with(VariableDef::calculated(
            "summary_of_summary",
            Calculator::new(["summary"], |i| Ok(format!("<{}>", i.get("summary")?))).late(),
        ))
        .unwrap();

    let err = resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["summary_of_summary"], "")])
        .unwrap_err();
    assert_eq!(
        err,
        GenError::NestedLateBinding {
            name: "summary_of_summary".to_string(),
            depends_on: "summary".to_string(),
        }
    );
}

#[test]
fn test_explicitly_late_calculator() {
    let source = Source::new("s")
        .with(VariableDef::default_value("cluster_name", "prod"))
        .unwrap()
        .with(VariableDef::calculated(
            "banner",
            Calculator::new(["cluster_name"], |i| Ok(format!("== {} ==", i.get("cluster_name")?))).late(),
        ))
        .unwrap();

    let resolution =
        resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["cluster_name", "banner"], "")]).unwrap();
    assert_eq!(resolution.get("banner"), Some("== prod =="));
    assert_eq!(resolution.kind("banner"), Some(VariableKind::LateBound));
}

#[test]
fn test_late_switch_is_rejected() {
    let mut source = Source::new("s");
    source
        .register(VariableDef::calculated(
            "mode",
            Calculator::new([EXPANDED_CONFIG], |i| {
                let mode = if i.get(EXPANDED_CONFIG)?.is_empty() { "a" } else { "b" };
                Ok(mode.to_string())
            }),
        ))
        .unwrap();
    source.register(VariableDef::default_value("x", "base")).unwrap();
    source.when("mode", "a", [VariableDef::default_value("x", "from-a")]).unwrap();

    let err = resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["x"], "")]).unwrap_err();
    assert!(matches!(err, GenError::ConflictingDefinition { ref name, .. } if name == "mode"));
}

#[test]
fn test_late_validation_failure_is_reported() {
    let source = Source::new("s")
        .with(
            VariableDef::calculated(
                "config_size",
                Calculator::new([EXPANDED_CONFIG], |i| Ok(i.get(EXPANDED_CONFIG)?.len().to_string())),
            )
            .with_validator(dcgen_cli::catalog::validators::one_of(vec!["0".to_string()])),
        )
        .unwrap()
        .with(VariableDef::default_value("cluster_name", "prod"))
        .unwrap();

    let err = resolve(&ArgumentDictionary::new(), &[source], &[Target::new("t", ["cluster_name", "config_size"], "")])
        .unwrap_err();
    assert_eq!(err.invalid_variables(), vec!["config_size"]);
}
