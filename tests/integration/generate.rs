use dcgen_cli::test_utils::ConfigFixture;
use predicates::prelude::*;

use crate::common::TestProject;

/// The bootstrap scenario: a calculated id lands in the rendered document.
#[test]
fn test_generate_writes_documents() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    project
        .run_dcgen(&["generate"])
        .assert_success()
        .assert_stdout_contains("✓ Generated 2 document(s) in genconf/serve");

    let cloud_config = project.read_output("cloud-config.yaml").unwrap();
    assert_eq!(
        cloud_config,
        "#cloud-config\ncluster: test\nbootstrap_id: test-bootstrap\nresolvers: [\"168.63.129.16\"]\n"
    );

    let dcos_config = project.read_output("dcos-config.yaml").unwrap();
    assert!(dcos_config.starts_with("provider: onprem\npassword: s3cr3t-pw\nsummary: "));
    assert!(!dcos_config.contains("location:"));
    assert!(!dcos_config.contains("LATE_BIND_PLACEHOLDER"));
}

#[test]
fn test_generate_late_bound_summary_is_a_number() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();
    project.run_dcgen(&["generate"]).assert_success();

    let dcos_config = project.read_output("dcos-config.yaml").unwrap();
    let summary = dcos_config
        .lines()
        .find_map(|line| line.strip_prefix("summary: "))
        .expect("summary line present");
    let length: usize = summary.parse().expect("summary is a length");
    assert!(length > 0);
}

#[test]
fn test_generate_azure_case() {
    let project = TestProject::with_cluster(ConfigFixture::azure()).unwrap();
    project.run_dcgen(&["generate"]).assert_success();

    let dcos_config = project.read_output("dcos-config.yaml").unwrap();
    assert!(dcos_config.starts_with("provider: azure\nlocation: westus\n"));
}

#[test]
fn test_generate_set_overrides_configuration() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    project
        .command()
        .args(["generate", "--set", "cluster_name=edge", "--set", "azure_location=eastus", "--set", "provider=azure"])
        .assert()
        .success();

    assert!(project.read_output("cloud-config.yaml").unwrap().contains("bootstrap_id: edge-bootstrap"));
    assert!(project.read_output("dcos-config.yaml").unwrap().contains("location: eastus"));
}

#[test]
fn test_generate_custom_output_dir() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    project.command().args(["generate", "-o", "out"]).assert().success();

    assert!(project.path().join("out").join("cloud-config.yaml").exists());
    assert!(!project.output_dir().exists());
}

#[test]
fn test_generate_dry_run_writes_nothing() {
    let project = TestProject::with_cluster(ConfigFixture::cluster()).unwrap();

    project
        .command()
        .args(["generate", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would write"))
        .stdout(predicate::str::contains("cloud-config.yaml"))
        .stdout(predicate::str::contains("dcos-config.yaml"));

    assert!(!project.output_dir().exists());
}

#[test]
fn test_generate_failure_writes_nothing() {
    let project = TestProject::with_cluster(ConfigFixture {
        content: "resolvers:\n  - 168.63.129.16\nsuperuser_password: pw\n".to_string(),
    })
    .unwrap();

    let output = project.run_dcgen(&["generate"]);
    output.assert_failure().assert_stderr_contains("cluster_name");
    assert_eq!(output.code, Some(1));
    assert!(!project.output_dir().exists());
}

#[test]
fn test_generate_is_deterministic() {
    let first = TestProject::with_cluster(ConfigFixture::azure()).unwrap();
    let second = TestProject::with_cluster(ConfigFixture::azure()).unwrap();
    first.run_dcgen(&["generate"]).assert_success();
    second.run_dcgen(&["generate"]).assert_success();

    for name in ["cloud-config.yaml", "dcos-config.yaml"] {
        assert_eq!(first.read_output(name).unwrap(), second.read_output(name).unwrap());
    }
}
