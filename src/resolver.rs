use serde::Serialize;
use tracing::{debug, warn};

use crate::fields::Field;
use crate::git::{CommandResult, GitCommand, InvocationError};

/// How a single metadata query ended, before fallback is applied.
#[derive(Debug)]
pub enum Outcome {
    Success(String),
    /// Exit 0, but nothing left after trimming.
    Empty,
    NonZeroExit(Option<i32>),
    InvocationFailure(InvocationError),
}

impl From<CommandResult> for Outcome {
    fn from(result: CommandResult) -> Self {
        if !result.success() {
            return Outcome::NonZeroExit(result.exit_code);
        }
        let trimmed = result.output.trim();
        if trimmed.is_empty() {
            Outcome::Empty
        } else {
            Outcome::Success(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub value: String,
    pub fallback_used: bool,
}

impl Resolved {
    fn live(value: String) -> Self {
        Self {
            value,
            fallback_used: false,
        }
    }

    fn fallback(fallback: &str) -> Self {
        Self {
            value: fallback.to_string(),
            fallback_used: true,
        }
    }
}

/// One resolved field, in the shape every output format works from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StampEntry {
    pub key: String,
    pub value: String,
    pub fallback_used: bool,
}

/// Runs metadata queries against the version-control tool. Every query is a
/// fresh process; nothing is cached between calls.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    git: GitCommand,
}

impl Resolver {
    pub fn new(git: GitCommand) -> Self {
        Self { git }
    }

    pub fn git(&self) -> &GitCommand {
        &self.git
    }

    pub fn outcome<S: AsRef<str>>(&self, args: &[S]) -> Outcome {
        let args: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        match self.git.run(args.as_slice()) {
            Ok(result) => Outcome::from(result),
            Err(err) => Outcome::InvocationFailure(err),
        }
    }

    /// Never fails: anything short of a zero exit with non-empty output
    /// yields `fallback` and a warning.
    pub fn resolve<S: AsRef<str>>(&self, args: &[S], fallback: &str) -> Resolved {
        let program = self.git.program();
        let joined = args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");

        match self.outcome(args) {
            Outcome::Success(value) => {
                debug!(program, args = %joined, %value, "resolved");
                Resolved::live(value)
            }
            Outcome::Empty => {
                warn!(
                    program,
                    args = %joined,
                    "Warning: {} command produced no output",
                    program
                );
                Resolved::fallback(fallback)
            }
            Outcome::NonZeroExit(code) => {
                let code = code.map_or("signal".to_string(), |c| c.to_string());
                warn!(
                    program,
                    args = %joined,
                    "Warning: {} command exited with non-zero status: {}",
                    program,
                    code
                );
                Resolved::fallback(fallback)
            }
            Outcome::InvocationFailure(err) => {
                warn!(
                    program,
                    args = %joined,
                    "Warning: {} command failed: {}",
                    program,
                    err
                );
                Resolved::fallback(fallback)
            }
        }
    }

    pub fn resolve_field(&self, field: &Field) -> StampEntry {
        let resolved = self.resolve(field.args.as_slice(), &field.fallback);
        StampEntry {
            key: field.key.clone(),
            value: resolved.value,
            fallback_used: resolved.fallback_used,
        }
    }

    pub fn stamp(&self, fields: &[Field]) -> Vec<StampEntry> {
        fields.iter().map(|f| self.resolve_field(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::default_fields;
    use crate::testutil::TestEnv;
    use std::time::Duration;

    fn sh() -> Resolver {
        crate::logging::init_test();
        Resolver::new(GitCommand::new("sh"))
    }

    fn script(body: &str) -> [&str; 2] {
        ["-c", body]
    }

    #[test]
    fn trims_trailing_newline_from_describe_output() {
        let resolved = sh().resolve(
            &script("printf 'v1.2.3-4-gabc1234\\n'"),
            "No version info",
        );
        assert_eq!(resolved.value, "v1.2.3-4-gabc1234");
        assert!(!resolved.fallback_used);
    }

    #[test]
    fn keeps_interior_whitespace() {
        let resolved = sh().resolve(&script("printf '  \\n a  b\\tc \\n\\n'"), "fallback");
        assert_eq!(resolved.value, "a  b\tc");
    }

    #[test]
    fn exit_one_returns_fallback() {
        let resolved = sh().resolve(&script("exit 1"), "No version info");
        assert_eq!(resolved.value, "No version info");
        assert!(resolved.fallback_used);
    }

    #[test]
    fn nonzero_exit_with_output_still_returns_fallback() {
        let resolved = sh().resolve(
            &script("echo 'fatal: not a git repository'; exit 128"),
            "No git hash info",
        );
        assert_eq!(resolved.value, "No git hash info");
        assert!(resolved.fallback_used);
    }

    #[test]
    fn empty_output_returns_fallback() {
        let resolved = sh().resolve(&script("true"), "No git hash info");
        assert_eq!(resolved.value, "No git hash info");
        assert!(resolved.fallback_used);
    }

    #[test]
    fn whitespace_only_output_returns_fallback() {
        let resolved = sh().resolve(&script("printf '  \\n\\t\\n'"), "No git date info");
        assert_eq!(resolved.value, "No git date info");
        assert!(resolved.fallback_used);
    }

    #[test]
    fn fallback_is_returned_unmodified() {
        let fallback = "  odd fallback\n";
        let resolved = sh().resolve(&script("exit 2"), fallback);
        assert_eq!(resolved.value, fallback);
    }

    #[test]
    fn missing_program_returns_fallback() {
        crate::logging::init_test();
        let resolver = Resolver::new(GitCommand::new("git-stamp-no-such-program-xyz"));
        let resolved = resolver.resolve(&["describe", "--always"], "No version info");
        assert_eq!(resolved.value, "No version info");
        assert!(resolved.fallback_used);
    }

    #[test]
    fn outcome_distinguishes_failure_kinds() {
        let resolver = sh();
        assert!(matches!(
            resolver.outcome(&script("echo ok")),
            Outcome::Success(ref s) if s == "ok"
        ));
        assert!(matches!(resolver.outcome(&script(":")), Outcome::Empty));
        assert!(matches!(
            resolver.outcome(&script("exit 7")),
            Outcome::NonZeroExit(Some(7))
        ));
        let missing = Resolver::new(GitCommand::new("git-stamp-no-such-program-xyz"));
        assert!(matches!(
            missing.outcome(&["show"]),
            Outcome::InvocationFailure(InvocationError::Spawn { .. })
        ));
    }

    #[test]
    fn killed_by_signal_is_nonzero_exit() {
        assert!(matches!(
            sh().outcome(&script("kill -9 $$")),
            Outcome::NonZeroExit(None)
        ));
    }

    #[test]
    fn timeout_returns_fallback() {
        crate::logging::init_test();
        let resolver = Resolver::new(
            GitCommand::new("sh").timeout(Some(Duration::from_millis(50))),
        );
        let resolved = resolver.resolve(&script("exec sleep 5"), "No git date info");
        assert_eq!(resolved.value, "No git date info");
        assert!(resolved.fallback_used);
    }

    #[test]
    fn stamp_resolves_every_default_field_in_a_repo() {
        crate::logging::init_test();
        let env = TestEnv::new();
        let repo = env.create_repo("app");
        env.tag(&repo, "v1.0.0");

        let resolver = Resolver::new(GitCommand::default().current_dir(&repo));
        let stamp = resolver.stamp(&default_fields());

        let keys: Vec<&str> = stamp.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["VERSION_NAME", "GIT_HASH", "GIT_DATE"]);
        assert!(stamp.iter().all(|e| !e.fallback_used), "{stamp:?}");
        assert_eq!(stamp[0].value, "v1.0.0");
        assert_eq!(stamp[1].value, env.head(&repo));
        assert_eq!(stamp[2].value, TestEnv::COMMIT_DATE_DISPLAY);
    }

    #[test]
    fn describe_reports_commit_distance_and_dirty_tree() {
        let env = TestEnv::new();
        let repo = env.create_repo("app");
        env.tag(&repo, "v1.0.0");
        env.commit_file(&repo, "CHANGES.md", "second\n");
        env.write_file(&repo, "README.md", "edited\n");

        let resolver = Resolver::new(GitCommand::default().current_dir(&repo));
        let resolved = resolver.resolve(&["describe", "--always", "--tags", "--dirty"], "x");

        let head = env.head(&repo);
        let expected_prefix = "v1.0.0-1-g";
        assert!(resolved.value.starts_with(expected_prefix), "{resolved:?}");
        assert!(resolved.value.ends_with("-dirty"), "{resolved:?}");
        let abbrev = resolved
            .value
            .trim_start_matches(expected_prefix)
            .trim_end_matches("-dirty");
        assert!(head.starts_with(abbrev));
    }

    #[test]
    fn describe_without_tags_falls_back_to_abbreviated_hash() {
        let env = TestEnv::new();
        let repo = env.create_repo("app");

        let resolver = Resolver::new(GitCommand::default().current_dir(&repo));
        let resolved = resolver.resolve(&["describe", "--always", "--tags", "--dirty"], "x");
        assert!(!resolved.fallback_used);
        assert!(env.head(&repo).starts_with(&resolved.value));
    }

    #[test]
    fn outside_a_repository_every_field_falls_back() {
        crate::logging::init_test();
        let dir = tempfile::tempdir().unwrap();
        let resolver = Resolver::new(GitCommand::default().current_dir(dir.path()));
        let stamp = resolver.stamp(&default_fields());
        let values: Vec<&str> = stamp.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(
            values,
            ["No version info", "No git hash info", "No git date info"]
        );
        assert!(stamp.iter().all(|e| e.fallback_used));
    }
}
