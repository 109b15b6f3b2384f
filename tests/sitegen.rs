mod common;

use std::path::{Path, PathBuf};

use graphdoc::sitegen::{SiteGenError, SiteGenOutcome, SiteGenRequest, run_site_generator};

use common::fixtures::{test_settings, write_stub_tool};

fn request_for(tool: PathBuf, dir: &Path) -> SiteGenRequest {
    SiteGenRequest::from_settings(tool, &test_settings(dir))
}

#[test]
fn stub_generator_runs_to_a_clean_exit() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_stub_tool(
        dir.path(),
        "#!/bin/sh\nfor arg in \"$@\"; do echo \"$arg\"; done\nexit 0\n",
    );
    let outcome = run_site_generator(&request_for(tool, dir.path())).unwrap();
    assert_eq!(outcome, SiteGenOutcome::Success);
}

#[test]
fn stub_generator_nonzero_exit_maps_to_success_with_errors() {
    let dir = tempfile::tempdir().unwrap();
    let tool = write_stub_tool(dir.path(), "#!/bin/sh\necho partial\nexit 3\n");
    let outcome = run_site_generator(&request_for(tool, dir.path())).unwrap();
    assert_eq!(outcome, SiteGenOutcome::SuccessWithErrors(3));
    assert!(outcome.is_success());
}

#[test]
fn missing_tool_fails_to_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let request = request_for(dir.path().join("does-not-exist"), dir.path());
    assert!(matches!(
        run_site_generator(&request),
        Err(SiteGenError::Spawn { .. })
    ));
}
