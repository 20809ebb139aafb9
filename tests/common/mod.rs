//! Shared test helpers for subsync integration tests.
//!
//! All tests use temp directories and never touch the real repo.
//! A typical fixture is an upstream repository plus a local repository that
//! has it configured as a remote and carries a copy of it under `lib/foo`.

#![allow(dead_code)]

use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;

/// Commit timestamps increase monotonically so `git log` order is stable.
static CLOCK: AtomicU64 = AtomicU64::new(1_700_000_000);

fn next_date() -> String {
    format!("@{} +0000", CLOCK.fetch_add(60, Ordering::SeqCst))
}

/// Run git in `dir`. Panics on failure. Returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let date = next_date();
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .output()
        .unwrap_or_else(|e| panic!("failed to run git {}: {e}", args.join(" ")));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "git {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.trim().to_string()
}

/// Create a git repo on branch `main` with a test identity.
pub fn init_repo(dir: &Path) {
    git(dir, &["init", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.email", "test@test.com"]);
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

/// Write a file (creating parent directories).
pub fn write(dir: &Path, rel_path: &str, content: &str) {
    let path = dir.join(rel_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
}

/// Read a file. Returns None if it doesn't exist.
pub fn read(dir: &Path, rel_path: &str) -> Option<String> {
    std::fs::read_to_string(dir.join(rel_path)).ok()
}

/// Stage everything and commit. Returns the new HEAD sha.
pub fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "--quiet", "-m", message]);
    head(dir)
}

pub fn head(dir: &Path) -> String {
    git(dir, &["rev-parse", "HEAD"])
}

pub fn current_branch(dir: &Path) -> String {
    git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

pub fn branch_exists(dir: &Path, name: &str) -> bool {
    Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{name}")])
        .current_dir(dir)
        .output()
        .unwrap()
        .status
        .success()
}

pub fn state_dir_exists(dir: &Path) -> bool {
    dir.join(".git").join("subsync").exists()
}

pub fn state_json(dir: &Path) -> String {
    std::fs::read_to_string(dir.join(".git").join("subsync").join("state.json")).unwrap()
}

/// Subject line of the newest commit on `rev`.
pub fn subject(dir: &Path, rev: &str) -> String {
    git(dir, &["log", "-1", "--format=%s", rev])
}

/// Upstream + local pair.
///
/// Upstream holds `README` and `src/a.c` on `master`. Local `main` holds
/// `app.c` and an identical copy of upstream under `lib/foo`, with upstream
/// configured as remote `foolib`.
pub struct Fixture {
    pub upstream: TempDir,
    pub local: TempDir,
    /// Upstream commit the local copy was taken from.
    pub imported: String,
}

pub const README: &str = "foolib\n\nline one\nline two\nline three\n";
pub const A_C: &str = "int a(void) { return 1; }\n";

impl Fixture {
    pub fn new() -> Self {
        let upstream = TempDir::new().expect("failed to create upstream dir");
        init_repo(upstream.path());
        git(upstream.path(), &["symbolic-ref", "HEAD", "refs/heads/master"]);
        write(upstream.path(), "README", README);
        write(upstream.path(), "src/a.c", A_C);
        let imported = commit_all(upstream.path(), "foolib: initial");

        let local = TempDir::new().expect("failed to create local dir");
        init_repo(local.path());
        write(local.path(), "app.c", "int main(void) { return 0; }\n");
        write(local.path(), "lib/foo/README", README);
        write(local.path(), "lib/foo/src/a.c", A_C);
        commit_all(local.path(), "import foolib");
        git(
            local.path(),
            &["remote", "add", "foolib", &upstream.path().display().to_string()],
        );

        Self {
            upstream,
            local,
            imported,
        }
    }

    pub fn up(&self) -> &Path {
        self.upstream.path()
    }

    pub fn loc(&self) -> &Path {
        self.local.path()
    }

    /// Write a manifest file into a separate temp dir (so the local tree
    /// stays clean). Returns the dir guard and the manifest path.
    pub fn manifest(&self, text: &str) -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("remotes.txt");
        std::fs::write(&path, text).unwrap();
        let path = path.display().to_string();
        (dir, path)
    }

    /// The usual manifest: upstream root into `lib/foo`.
    pub fn root_manifest(&self) -> (TempDir, String) {
        self.manifest("# upstream libraries\nfoolib\tmaster\tlib/foo\t/\n")
    }
}

/// Run subsync with the given args in the given directory.
pub fn subsync_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_subsync"))
        .args(args)
        .current_dir(dir)
        .env_remove("SUBSYNC_LOG")
        .output()
        .expect("failed to execute subsync")
}

/// Run subsync feeding `stdin`.
pub fn subsync_with_stdin(dir: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_subsync"))
        .args(args)
        .current_dir(dir)
        .env_remove("SUBSYNC_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn subsync");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

/// Run subsync and assert it succeeds. Returns stdout as string.
pub fn subsync_ok(dir: &Path, args: &[&str]) -> String {
    let out = subsync_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "subsync {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run subsync and assert it fails. Returns stderr as string.
pub fn subsync_fails(dir: &Path, args: &[&str]) -> String {
    let out = subsync_in(dir, args);
    assert!(
        !out.status.success(),
        "Expected subsync {} to fail, but it succeeded.\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}
