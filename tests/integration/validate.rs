use dcgen_cli::test_utils::{ConfigFixture, ManifestFixture};
use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_validate_valid_project() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    project
        .run_dcgen(&["validate"])
        .assert_success()
        .assert_stdout_contains("✓ dcgen.toml:")
        .assert_stdout_contains("2 target(s) rendered");
    assert!(!project.output_dir().exists());
}

#[test]
fn test_validate_reports_every_problem() {
    let project = TestProject::with_cluster(ConfigFixture {
        content: "resolvers: not-a-list\nprovider: gcp\n".to_string(),
    })
    .unwrap();

    let output = project.run_dcgen(&["validate"]);
    output
        .assert_failure()
        .assert_stdout_contains("✗ Missing required variable 'cluster_name'")
        .assert_stdout_contains("✗ Missing required variable 'superuser_password'")
        .assert_stdout_contains("✗ Invalid value for 'resolvers'")
        .assert_stdout_contains("✗ Invalid value for 'provider'");
}

#[test]
fn test_validate_json_output() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    let output = project.command().args(["validate", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results["valid"], true);
    assert_eq!(results["targets"], 2);
    assert!(results["errors"].as_array().unwrap().is_empty());
}

#[test]
fn test_validate_json_output_on_failure() {
    let project = TestProject::with_cluster(ConfigFixture {
        content: "cluster_name: test\nresolvers: '[\"1.2.3.4\"]'\n".to_string(),
    })
    .unwrap();

    let output = project.command().args(["validate", "--format", "json"]).output().unwrap();
    assert!(!output.status.success());

    let results: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(results["valid"], false);
    assert_eq!(results["errors"], serde_json::json!(["Missing required variable 'superuser_password'"]));
}

#[test]
fn test_validate_warns_about_unused_arguments() {
    let mut config = ConfigFixture::cluster();
    config.content.push_str("legacy_flag: true\n");
    let project = TestProject::with_cluster(config).unwrap();

    project.run_dcgen(&["validate"]).assert_success().assert_stdout_contains("Unused argument: legacy_flag");

    project
        .command()
        .args(["validate", "--strict"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗ Unused argument: legacy_flag"));
}

#[test]
fn test_validate_cycle() {
    let project = TestProject::new().unwrap();
    ManifestFixture::cyclic().write_to(project.path()).unwrap();
    project.write_config("{}\n").unwrap();

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Circular dependency"))
        .stdout(predicate::str::contains("a, b"));
}

#[test]
fn test_validate_reserved_key_in_configuration() {
    let mut config = ConfigFixture::cluster();
    config.content.push_str("expanded_config: forged\n");
    let project = TestProject::with_cluster(config).unwrap();

    project.run_dcgen(&["validate"]).assert_failure().assert_stdout_contains("✗ Invalid value for 'expanded_config'");
}
