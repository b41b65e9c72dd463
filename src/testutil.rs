#![cfg(test)]

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub const COMMIT_DATE: &'static str = "2024-03-01T12:34:56+00:00";
    /// `COMMIT_DATE` as `git show --pretty=format:%ai` renders it.
    pub const COMMIT_DATE_DISPLAY: &'static str = "2024-03-01 12:34:56 +0000";

    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Creates a repo holding one commit of `README.md`, with fixed identity
    /// and dates and no user or system git config in play.
    pub fn create_repo(&self, name: &str) -> PathBuf {
        let repo_path = self.dir.path().join(name);
        std::fs::create_dir_all(&repo_path).unwrap();

        self.git(&repo_path, &["init", "--quiet"]);
        self.commit_file(&repo_path, "README.md", "initial\n");

        repo_path
    }

    pub fn commit_file(&self, repo: &Path, file: &str, contents: &str) {
        self.write_file(repo, file, contents);
        self.git(repo, &["add", file]);
        self.git(repo, &["commit", "--quiet", "-m", &format!("update {}", file)]);
    }

    pub fn write_file(&self, repo: &Path, file: &str, contents: &str) {
        std::fs::write(repo.join(file), contents).expect("failed to write file");
    }

    pub fn tag(&self, repo: &Path, tag: &str) {
        self.git(repo, &["tag", tag]);
    }

    pub fn head(&self, repo: &Path) -> String {
        self.git(repo, &["rev-parse", "HEAD"])
    }

    pub fn git(&self, repo: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo)
            .env("GIT_CONFIG_GLOBAL", "/dev/null")
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_AUTHOR_NAME", "Test")
            .env("GIT_AUTHOR_EMAIL", "test@test.com")
            .env("GIT_AUTHOR_DATE", Self::COMMIT_DATE)
            .env("GIT_COMMITTER_NAME", "Test")
            .env("GIT_COMMITTER_EMAIL", "test@test.com")
            .env("GIT_COMMITTER_DATE", Self::COMMIT_DATE)
            .output()
            .expect("failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}
