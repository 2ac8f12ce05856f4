//! Integration tests for CLI commands that need neither helm nor a cluster

use std::path::Path;
use std::process::Command;

/// Helper to run chartlock against the manifest in `dir`
fn chartlock(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_chartlock"))
        .current_dir(dir)
        .env_remove("CHARTLOCK_MANIFEST")
        .env_remove("CHARTLOCK_LOG")
        .args(args)
        .output()
        .expect("Failed to execute chartlock")
}

fn initialized() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let output = chartlock(dir.path(), &["init"]);
    assert!(output.status.success(), "init failed: {:?}", output);
    dir
}

mod init_command {
    use super::*;

    #[test]
    fn test_init_creates_manifest_and_directories() {
        let dir = initialized();

        assert!(dir.path().join("chartlock.yaml").is_file());
        assert!(dir.path().join("releases").is_dir());
        assert!(dir.path().join("singles").is_dir());
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = initialized();
        let output = chartlock(dir.path(), &["init"]);

        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let output = chartlock(dir.path(), &["env", "list"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("No environment variables are allowed"));
        assert!(!dir.path().join("chartlock.yaml").exists());
    }
}

mod env_command {
    use super::*;

    #[test]
    fn test_allow_and_list() {
        let dir = initialized();

        let output = chartlock(dir.path(), &["env", "allow", "db_password", "api_token"]);
        assert!(output.status.success());

        std::fs::write(dir.path().join(".env"), "DB_PASSWORD=s3cret\n").unwrap();
        let output = chartlock(dir.path(), &["env", "list"]);
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("DB_PASSWORD"));
        assert!(stdout.contains("API_TOKEN (not set)"));
        assert!(!stdout.contains("s3cret"));

        let manifest = std::fs::read_to_string(dir.path().join("chartlock.yaml")).unwrap();
        assert!(manifest.contains("DB_PASSWORD"));
    }

    #[test]
    fn test_disallow() {
        let dir = initialized();
        chartlock(dir.path(), &["env", "allow", "TOKEN"]);

        let output = chartlock(dir.path(), &["env", "disallow", "token"]);
        assert!(output.status.success());

        let manifest = std::fs::read_to_string(dir.path().join("chartlock.yaml")).unwrap();
        assert!(!manifest.contains("TOKEN"));
    }

    #[test]
    fn test_explicit_env_file_must_exist() {
        let dir = initialized();
        chartlock(dir.path(), &["env", "allow", "TOKEN"]);

        let output = chartlock(dir.path(), &["--env-file", "missing.env", "env", "list"]);
        assert_eq!(output.status.code(), Some(6));
    }
}

mod upgrade_command {
    use super::*;

    #[test]
    fn test_ignore_and_only_is_a_usage_error() {
        let dir = initialized();
        let output = chartlock(dir.path(), &["upgrade", "--ignore", "a", "--only", "b"]);

        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_missing_env_stops_before_any_work() {
        let dir = initialized();
        chartlock(dir.path(), &["env", "allow", "CHARTLOCK_TEST_UNSET_VARIABLE"]);

        let output = chartlock(dir.path(), &["upgrade", "--helm", "/nonexistent/helm"]);

        assert_eq!(output.status.code(), Some(6));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("CHARTLOCK_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn test_empty_manifest_upgrade_succeeds() {
        let dir = initialized();
        let output = chartlock(dir.path(), &["upgrade", "--helm", "/nonexistent/helm"]);

        assert!(output.status.success(), "{:?}", output);
    }
}
