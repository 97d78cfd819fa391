use dcgen_cli::catalog::{Calculator, Source, Target, VariableDef};
use dcgen_cli::constants::{
    CONFIG_YAML, CONFIG_YAML_FULL, EXPANDED_CONFIG, EXPANDED_CONFIG_FULL, MASKED_VALUE, USER_ARGUMENTS,
    USER_ARGUMENTS_FULL,
};
use dcgen_cli::core::ArgumentDictionary;
use dcgen_cli::resolver::{Resolution, resolve};

const PASSWORD: &str = "correct-horse-battery";

fn secret_sources() -> Vec<Source> {
    let source = Source::new("auth")
        .with(VariableDef::required("superuser_password").secret())
        .unwrap()
        .with(VariableDef::default_value("db_host", "db.internal"))
        .unwrap()
        .with(VariableDef::calculated(
            "db_url",
            Calculator::new(["db_host", "superuser_password"], |i| {
                Ok(format!("postgres://admin:{}@{}/dcos", i.get("superuser_password")?, i.get("db_host")?))
            }),
        ))
        .unwrap()
        .with(VariableDef::calculated(
            "password_hash",
            Calculator::digest(["superuser_password"]),
        ))
        .unwrap()
        .with(VariableDef::calculated(
            "config_backup",
            Calculator::new([EXPANDED_CONFIG_FULL], |i| Ok(i.get(EXPANDED_CONFIG_FULL)?.to_string())),
        ))
        .unwrap();
    vec![source]
}

fn resolve_secrets() -> Resolution {
    let mut user = ArgumentDictionary::new();
    user.insert("superuser_password".to_string(), PASSWORD.to_string());
    user.insert("cluster_name".to_string(), "prod".to_string());

    let target = Target::new(
        "t",
        ["cluster_name", "db_url", "password_hash", "config_backup", EXPANDED_CONFIG, CONFIG_YAML, USER_ARGUMENTS],
        "",
    );
    let mut sources = secret_sources();
    sources.push(Source::new("common").with(VariableDef::required("cluster_name")).unwrap());
    resolve(&user, &sources, &[target]).unwrap()
}

#[test]
fn test_flagged_and_builtin_secrets() {
    let resolution = resolve_secrets();
    for name in ["superuser_password", EXPANDED_CONFIG_FULL, USER_ARGUMENTS_FULL, CONFIG_YAML_FULL] {
        assert!(resolution.is_secret(name), "{name} should be secret");
    }
    for name in [EXPANDED_CONFIG, CONFIG_YAML, USER_ARGUMENTS, "cluster_name", "db_host"] {
        assert!(!resolution.is_secret(name), "{name} should not be secret");
    }
}

#[test]
fn test_composite_values_become_secret() {
    let resolution = resolve_secrets();
    assert!(resolution.is_secret("db_url"));
    assert!(resolution.is_secret("config_backup"));
    assert!(!resolution.is_secret("password_hash"));
}

#[test]
fn test_masked_arguments_never_contain_a_secret() {
    let resolution = resolve_secrets();
    let masked = resolution.masked_arguments();

    assert_eq!(masked.len(), resolution.arguments().len());
    for (name, value) in &masked {
        assert!(!value.contains(PASSWORD), "masked '{name}' leaked the password");
    }
    assert_eq!(masked["superuser_password"], MASKED_VALUE);
    assert_eq!(masked["db_url"], MASKED_VALUE);
}

#[test]
fn test_scrubbed_views() {
    let resolution = resolve_secrets();

    let expanded = resolution.get(EXPANDED_CONFIG).unwrap();
    assert!(expanded.contains("db_host: db.internal"));
    assert!(!expanded.contains("superuser_password"));
    assert!(!expanded.contains("db_url"));

    let full = resolution.get(EXPANDED_CONFIG_FULL).unwrap();
    assert!(full.contains(PASSWORD));

    let user_json = resolution.get(USER_ARGUMENTS).unwrap();
    assert!(user_json.contains(MASKED_VALUE));
    assert!(user_json.contains("\"cluster_name\": \"prod\""));

    assert!(resolution.get(CONFIG_YAML).unwrap().contains(MASKED_VALUE));
    assert!(resolution.get(CONFIG_YAML_FULL).unwrap().contains(PASSWORD));
}

#[test]
fn test_line_copied_from_full_view_is_masked() {
    let source = Source::new("auth")
        .with(VariableDef::required("superuser_password").secret())
        .unwrap()
        .with(VariableDef::calculated(
            "password_line",
            Calculator::new([EXPANDED_CONFIG_FULL], |i| {
                let full = i.get(EXPANDED_CONFIG_FULL)?;
                Ok(full.lines().find(|line| line.contains("superuser_password")).unwrap_or_default().trim().to_string())
            }),
        ))
        .unwrap();
    let mut user = ArgumentDictionary::new();
    user.insert("superuser_password".to_string(), "hunter2secret".to_string());

    let resolution =
        resolve(&user, &[source], &[Target::new("t", ["superuser_password", "password_line"], "")]).unwrap();

    assert_eq!(resolution.get("password_line"), Some("superuser_password: hunter2secret"));
    assert!(resolution.is_secret("password_line"));
    for (name, value) in resolution.masked_arguments() {
        assert!(!value.contains("hunter2secret"), "masked '{name}' leaked the password");
    }
}
