//! Foundry adapter
//!
//! Runs synthesized invariant tests with `forge test` against a fork pinned at
//! the deployment block, and flattens multi-file explorer sources with
//! `forge flatten`. The forge project is a singleton working directory, so
//! callers must not run two verifications at once (the pipeline never does).

use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::core::interpreter::TestReport;
use crate::core::traits::VerificationEngine;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::utils::constants::TEST_FILE_PATH;

const FOUNDRY_TOML: &str = r#"[profile.default]
src = "src"
out = "out"
libs = ["lib"]

[invariant]
runs = 64
depth = 32
fail_on_revert = false
"#;

/// Removes the test file and build artifacts on every exit path
struct WorkspaceGuard {
    root: PathBuf,
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.root.join(TEST_FILE_PATH));
        for dir in ["out", "cache"] {
            let path = self.root.join(dir);
            if path.exists() {
                if let Err(e) = std::fs::remove_dir_all(&path) {
                    warn!("⚠️ Failed to clean {}: {}", path.display(), e);
                }
            }
        }
    }
}

/// `forge` invocation settings
pub struct ForgeRunner {
    forge_bin: String,
    project_root: PathBuf,
    fork_url: String,
}

impl ForgeRunner {
    pub fn new(
        forge_bin: impl Into<String>,
        project_root: impl Into<PathBuf>,
        fork_url: impl Into<String>,
    ) -> Self {
        Self {
            forge_bin: forge_bin.into(),
            project_root: project_root.into(),
            fork_url: fork_url.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Create the project skeleton if it does not exist yet
    pub fn ensure_project(&self) -> AppResult<()> {
        std::fs::create_dir_all(self.project_root.join("test"))?;
        let manifest = self.project_root.join("foundry.toml");
        if !manifest.exists() {
            std::fs::write(&manifest, FOUNDRY_TOML)?;
            info!("📝 Wrote {}", manifest.display());
        }
        if !self.project_root.join("lib").join("forge-std").exists() {
            warn!(
                "⚠️ forge-std not installed under {}, run `forge install foundry-rs/forge-std`",
                self.project_root.display()
            );
        }
        Ok(())
    }

    async fn execute(&self, test_source: &str, block_number: u64) -> AppResult<TestReport> {
        self.ensure_project()?;
        let _guard = WorkspaceGuard {
            root: self.project_root.clone(),
        };
        tokio::fs::write(self.project_root.join(TEST_FILE_PATH), test_source).await?;

        let output = Command::new(&self.forge_bin)
            .arg("test")
            .arg("--root")
            .arg(&self.project_root)
            .args(["--match-path", TEST_FILE_PATH])
            .args(["--fork-url", &self.fork_url])
            .args(["--fork-block-number", &block_number.to_string()])
            .arg("--json")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::engine_failed(format!("failed to spawn {}: {}", self.forge_bin, e)))?;

        // failing tests also exit non-zero; only missing JSON is a tool failure
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_report(&stdout).map_err(|err| {
            let stderr = String::from_utf8_lossy(&output.stderr);
            AppError::new(
                err.code,
                format!("{} (exit {:?}): {}", err.message, output.status.code(), stderr.trim()),
            )
        })
    }

    /// Flatten a multi-file source, keeping the longest output
    pub async fn flatten(&self, files: &IndexMap<String, String>) -> AppResult<String> {
        let scratch = tempfile::TempDir::new()?;
        let root = scratch.path();

        let mut paths = Vec::with_capacity(files.len());
        for (path, content) in files {
            let relative = sanitize_relative(path)?;
            let target = root.join(&relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, content).await?;
            paths.push(relative);
        }
        tokio::fs::write(root.join("remappings.txt"), remappings(files.keys())).await?;

        let mut best: Option<String> = None;
        for relative in &paths {
            let output = Command::new(&self.forge_bin)
                .arg("flatten")
                .arg("--root")
                .arg(root)
                .arg(root.join(relative))
                .kill_on_drop(true)
                .output()
                .await;

            match output {
                Ok(out) if out.status.success() => {
                    let flattened = String::from_utf8_lossy(&out.stdout).into_owned();
                    if best.as_ref().map(|b| flattened.len() > b.len()).unwrap_or(true) {
                        best = Some(flattened);
                    }
                }
                Ok(out) => debug!(
                    "forge flatten {} failed: {}",
                    relative.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                ),
                Err(e) => {
                    return Err(AppError::new(
                        ErrorCode::FlattenFailed,
                        format!("failed to spawn {}: {}", self.forge_bin, e),
                    ))
                }
            }
        }

        best.filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            AppError::new(ErrorCode::FlattenFailed, "forge flatten failed for every file")
        })
    }
}

#[async_trait]
impl VerificationEngine for ForgeRunner {
    async fn run(&self, test_source: &str, block_number: u64) -> TestReport {
        match self.execute(test_source, block_number).await {
            Ok(report) => report,
            Err(err) => {
                warn!("🔧 Verification engine failed: {}", err);
                TestReport::default()
            }
        }
    }
}

/// Parse a single JSON blob, or line-delimited JSON objects
pub fn parse_report(stdout: &str) -> AppResult<TestReport> {
    let trimmed = stdout.trim();
    if let Ok(report) = serde_json::from_str::<TestReport>(trimmed) {
        return Ok(report);
    }

    let mut report = TestReport::default();
    let mut parsed_any = false;
    for line in trimmed.lines().map(str::trim).filter(|l| l.starts_with('{')) {
        if let Ok(part) = serde_json::from_str::<TestReport>(line) {
            report.merge(part);
            parsed_any = true;
        }
    }

    if parsed_any {
        Ok(report)
    } else {
        Err(AppError::new(
            ErrorCode::EngineOutputInvalid,
            "forge produced no JSON report",
        ))
    }
}

/// Reject absolute paths and parent traversal in explorer-supplied file names
fn sanitize_relative(path: &str) -> AppResult<PathBuf> {
    let candidate = Path::new(path);
    let mut clean = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(AppError::new(
                    ErrorCode::MalformedSourceBundle,
                    format!("unsafe source path {}", path),
                ))
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(AppError::new(
            ErrorCode::MalformedSourceBundle,
            "empty source path",
        ));
    }
    Ok(clean)
}

/// `@scope/=@scope/` for every scoped package directory among the files
fn remappings<'a>(paths: impl Iterator<Item = &'a String>) -> String {
    let mut scopes: Vec<&str> = paths
        .filter_map(|p| p.split('/').next())
        .filter(|first| first.starts_with('@'))
        .collect();
    scopes.sort_unstable();
    scopes.dedup();
    scopes
        .iter()
        .map(|scope| format!("{scope}/={scope}/\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_blob() {
        let stdout = r#"{"test/test.sol:DynamicHoneypotTest":{"duration":"1s","test_results":{"invariant_honeypot()":{"status":"Success","reason":null,"counterexample":null}}}}"#;
        let report = parse_report(stdout).unwrap();
        assert_eq!(report.contracts.len(), 1);
    }

    #[test]
    fn test_parse_line_delimited_with_noise() {
        let stdout = "Compiling 42 files with 0.8.20\n\
            {\"test/test.sol:DynamicHoneypotTest\":{\"test_results\":{}}}\n\
            {\"test/test.sol:DynamicHiddenMintTest\":{\"test_results\":{}}}\n";
        let report = parse_report(stdout).unwrap();
        assert_eq!(report.contracts.len(), 2);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = parse_report("Error: compiler run failed").unwrap_err();
        assert_eq!(err.code, ErrorCode::EngineOutputInvalid);
        assert!(parse_report("").is_err());
    }

    #[test]
    fn test_sanitize_paths() {
        assert_eq!(
            sanitize_relative("contracts/./Token.sol").unwrap(),
            PathBuf::from("contracts/Token.sol")
        );
        assert!(sanitize_relative("../etc/passwd").is_err());
        assert!(sanitize_relative("/etc/passwd").is_err());
        assert!(sanitize_relative("a/../../b.sol").is_err());
        assert!(sanitize_relative("").is_err());
    }

    #[test]
    fn test_remappings_for_scoped_packages() {
        let paths = vec![
            "@openzeppelin/contracts/token/ERC20/ERC20.sol".to_string(),
            "@openzeppelin/contracts/access/Ownable.sol".to_string(),
            "contracts/Token.sol".to_string(),
        ];
        assert_eq!(remappings(paths.iter()), "@openzeppelin/=@openzeppelin/\n");
    }

    #[test]
    fn test_ensure_project_writes_manifest_once() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ForgeRunner::new("forge", dir.path(), "http://localhost:8545");
        runner.ensure_project().unwrap();
        let manifest = dir.path().join("foundry.toml");
        assert!(manifest.exists());
        assert!(dir.path().join("test").is_dir());

        std::fs::write(&manifest, "# custom").unwrap();
        runner.ensure_project().unwrap();
        assert_eq!(std::fs::read_to_string(&manifest).unwrap(), "# custom");
    }

    #[tokio::test]
    async fn test_missing_binary_yields_empty_report_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("out")).unwrap();
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();

        let runner = ForgeRunner::new(
            "/nonexistent/forge-binary",
            dir.path(),
            "http://localhost:8545",
        );
        let report = runner.run("contract A {}", 1).await;

        assert!(report.is_empty());
        assert!(!dir.path().join(TEST_FILE_PATH).exists());
        assert!(!dir.path().join("out").exists());
        assert!(!dir.path().join("cache").exists());
    }

    #[tokio::test]
    async fn test_flatten_rejects_traversal() {
        let runner = ForgeRunner::new("forge", "/tmp", "http://localhost:8545");
        let mut files = IndexMap::new();
        files.insert("../evil.sol".to_string(), "contract E {}".to_string());
        let err = runner.flatten(&files).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::MalformedSourceBundle);
    }
}
