//! One-shot repository bootstrap.
//!
//! Turns a plain directory into a git repository with a single initial
//! commit: `git init`, rename the default branch, stage everything, commit.
//! Every step is checked; any git failure stops the sequence with that
//! step's stderr. The remote add and push are left to the operator because
//! they need a remote URL we cannot guess, so the command finishes by
//! printing the follow-up instructions instead.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Command;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_MESSAGE: &str = "Initial commit";

/// Run the full bootstrap sequence in `dir`.
pub fn run_bootstrap(dir: &Path, branch: &str, message: &str) -> Result<()> {
    if !dir.is_dir() {
        bail!("Not a directory: {}", dir.display());
    }
    if branch.trim().is_empty() {
        bail!("Branch name must not be empty");
    }
    if message.trim().is_empty() {
        bail!("Commit message must not be empty");
    }

    git_init(dir)?;
    git_add_all(dir)?;
    git_commit(dir, message)?;
    // Rename after the first commit; renaming an unborn branch is not
    // supported on older git versions.
    git_rename_branch(dir, branch)?;

    println!("Initialized repository in {}", dir.display());
    println!("Committed on branch '{}': {}", branch, message);
    println!();
    println!("Next steps:");
    println!("  git remote add origin <REMOTE_URL>");
    println!("  git push -u origin {}", branch);

    Ok(())
}

fn git_init(dir: &Path) -> Result<()> {
    let output = Command::new("git")
        .arg("init")
        .current_dir(dir)
        .output()
        .with_context(|| "Failed to execute 'git init'. Is git installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git init failed: {}", stderr.trim());
    }

    Ok(())
}

fn git_rename_branch(dir: &Path, branch: &str) -> Result<()> {
    let output = Command::new("git")
        .args(["branch", "-M", branch])
        .current_dir(dir)
        .output()
        .with_context(|| "Failed to execute 'git branch'")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git branch -M {} failed: {}", branch, stderr.trim());
    }

    Ok(())
}

fn git_add_all(dir: &Path) -> Result<()> {
    let output = Command::new("git")
        .args(["add", "-A"])
        .current_dir(dir)
        .output()
        .with_context(|| "Failed to execute 'git add'")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git add failed: {}", stderr.trim());
    }

    Ok(())
}

fn git_commit(dir: &Path, message: &str) -> Result<()> {
    let output = Command::new("git")
        .args(["commit", "-m", message])
        .current_dir(dir)
        .output()
        .with_context(|| "Failed to execute 'git commit'")?;

    if !output.status.success() {
        // git prints "nothing to commit" on stdout, not stderr
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        bail!("git commit failed: {}", detail);
    }

    Ok(())
}
