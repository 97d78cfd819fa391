use dcgen_cli::test_utils::{ConfigFixture, ManifestFixture};
use predicates::prelude::*;

use crate::common::TestProject;

#[test]
fn test_missing_manifest() {
    let project = TestProject::new().unwrap();
    project.write_config("cluster_name: test\n").unwrap();

    project.run_dcgen(&["validate"]).assert_failure().assert_stderr_contains("not found");
}

#[test]
fn test_missing_configuration() {
    let project = TestProject::new().unwrap();
    ManifestFixture::cluster().write_to(project.path()).unwrap();

    project.run_dcgen(&["generate"]).assert_failure().assert_stderr_contains("config.yaml");
}

#[test]
fn test_set_only_without_configuration() {
    let project = TestProject::new().unwrap();
    project
        .write_manifest("[[source]]\nname = \"s\"\n\n[[source.variable]]\nname = \"greeting\"\n\n[[target]]\nname = \"hello.txt\"\nbody = \"{{ greeting }}, world\\n\"\n")
        .unwrap();

    project.command().args(["generate", "--set", "greeting=hello"]).assert().success();
    assert_eq!(project.read_output("hello.txt").unwrap(), "hello, world\n");
}

#[test]
fn test_malformed_manifest() {
    let project = TestProject::new().unwrap();
    project.write_manifest("[[source]\nname = ").unwrap();
    project.write_config("{}\n").unwrap();

    project
        .command()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse manifest"))
        .stderr(predicate::str::contains("dcgen.toml"));
}

#[test]
fn test_unknown_manifest_field() {
    let project = TestProject::new().unwrap();
    project.write_manifest("[[source]]\nname = \"s\"\nflavour = \"x\"\n").unwrap();
    project.write_config("{}\n").unwrap();

    project.run_dcgen(&["validate"]).assert_failure().assert_stderr_contains("flavour");
}

#[test]
fn test_missing_template_file() {
    let project = TestProject::new().unwrap();
    project
        .write_manifest("[[target]]\nname = \"out.yaml\"\ntemplate = \"templates/absent.yaml\"\n")
        .unwrap();
    project.write_config("{}\n").unwrap();

    project.run_dcgen(&["validate"]).assert_failure().assert_stderr_contains("templates/absent.yaml");
}

#[test]
fn test_configuration_must_be_a_mapping() {
    let project = TestProject::new().unwrap();
    ManifestFixture::cluster().write_to(project.path()).unwrap();
    project.write_config("- cluster_name\n- resolvers\n").unwrap();

    project.run_dcgen(&["validate"]).assert_failure().assert_stderr_contains("Failed to parse configuration");
}

#[test]
fn test_manifest_and_config_from_environment() {
    let project = TestProject::new().unwrap();
    let nested = project.path().join("deploy");
    std::fs::create_dir_all(&nested).unwrap();
    ManifestFixture::cluster().write_to(&nested).unwrap();
    ConfigFixture::cluster().write_to(&nested).unwrap();

    project
        .command()
        .arg("validate")
        .env("DCGEN_MANIFEST", nested.join("dcgen.toml"))
        .env("DCGEN_CONFIG", nested.join("config.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 target(s) rendered"));
}
