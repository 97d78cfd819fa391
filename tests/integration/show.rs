use dcgen_cli::test_utils::ConfigFixture;
use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_show_masks_secrets() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    let output = project.run_dcgen(&["show"]);
    output
        .assert_success()
        .assert_stdout_contains("\"bootstrap_id\": \"test-bootstrap\"")
        .assert_stdout_contains("\"superuser_password\": \"**HIDDEN**\"");
    assert!(!output.stdout.contains("s3cr3t-pw"));

    let arguments: serde_json::Value = serde_json::from_str(&output.stdout).unwrap();
    assert_eq!(arguments["expanded_config_full"], "**HIDDEN**");
    assert_eq!(arguments["config_yaml_full"], "**HIDDEN**");
}

#[test]
fn test_show_expanded_config() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    project
        .command()
        .args(["show", "--expanded"])
        .assert()
        .success()
        .stdout(predicate::str::contains("  cluster_name: test"))
        .stdout(predicate::str::contains("  bootstrap_id: test-bootstrap"))
        .stdout(predicate::str::contains("superuser_password").not())
        .stdout(predicate::str::contains("config_summary").not());
}

#[test]
fn test_show_kinds() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    let output = project.command().args(["show", "--kinds"]).output().unwrap();
    assert!(output.status.success());

    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing["cluster_name"]["kind"], "user-provided");
    assert_eq!(listing["provider"]["kind"], "default");
    assert_eq!(listing["bootstrap_id"]["kind"], "calculated");
    assert_eq!(listing["config_summary"]["kind"], "late-bound");
    assert_eq!(listing["expanded_config"]["kind"], "synthesized");
    assert_eq!(listing["superuser_password"]["value"], "**HIDDEN**");
}

#[test]
fn test_show_dependency_tree() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    project
        .command()
        .args(["show", "--tree", "bootstrap_id"])
        .assert()
        .success()
        .stdout("└── bootstrap_id\n    └── cluster_name\n");

    project
        .command()
        .args(["show", "--tree", "nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nonexistent"));
}
