//! `ensemble patches`: keep local patches on top of a vendored git checkout.
//!
//! - `setup`: clone if needed, reset to the target tag, apply every patch, install
//! - `create patch`: stage the current patches, let the user edit the checkout,
//!   then save the new diff as the next numbered patch file
//!
//! Patches are applied in file-name order; new ones are named
//! `NNN-new-patch.diff` with the first three-digit prefix not yet taken.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use ensemble_core::config::load_config;
use ensemble_core::config::schema::PatchesConfig;

const COMMIT_MESSAGE: &str = "Current patches staged";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Choice {
    Setup,
    CreatePatch,
}

/// Interpret a menu answer by its first non-blank letter.
pub fn parse_choice(input: &str) -> Option<Choice> {
    match input.trim_start().chars().next()?.to_ascii_lowercase() {
        's' => Some(Choice::Setup),
        'c' | 'p' => Some(Choice::CreatePatch),
        _ => None,
    }
}

/// Run the workflow for `choice` (prompting when absent). Returns the exit code.
pub async fn run(choice: Option<String>) -> Result<i32> {
    let choice = match choice {
        Some(choice) => choice,
        None => prompt("Choose command (setup or create/patch): ")?,
    };
    let Some(choice) = parse_choice(&choice) else {
        println!("Invalid choice");
        return Ok(1);
    };

    let workflow = PatchWorkflow::from_config(&load_config(None).patches);
    match choice {
        Choice::Setup => workflow.setup().await?,
        Choice::CreatePatch => {
            let path = workflow
                .create_patch(|| {
                    println!();
                    println!("-----------------------------------------------");
                    prompt("Do your changes and press enter to create patch").map(|_| ())
                })
                .await?;
            println!("  {} wrote {}", "✓".green(), path.display());
        }
    }
    Ok(0)
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line)
}

// ─────────────────────────────────────────────
// Workflow
// ─────────────────────────────────────────────

pub struct PatchWorkflow {
    repo_dir: PathBuf,
    patches_dir: PathBuf,
    git_url: String,
    target_tag: String,
    install_command: Option<String>,
    uninstall_command: Option<String>,
}

impl PatchWorkflow {
    pub fn from_config(config: &PatchesConfig) -> Self {
        Self {
            repo_dir: config.repo_dir(),
            patches_dir: config.patches_dir(),
            git_url: config.git_url.clone(),
            target_tag: config.target_tag.clone(),
            install_command: config.install_command.clone(),
            uninstall_command: config.uninstall_command.clone(),
        }
    }

    pub async fn setup(&self) -> Result<()> {
        println!("Setting up repo for use");
        self.ensure_repo().await?;
        self.clean_repo().await?;
        self.apply_patches().await?;
        self.install().await
    }

    /// Stage the existing patches, wait for the user's edits, and save them
    /// as a new patch. The checkout is left clean with all patches applied.
    pub async fn create_patch(&self, wait_for_changes: impl FnOnce() -> Result<()>) -> Result<PathBuf> {
        println!("Creating new patch");
        self.ensure_repo().await?;
        self.clean_repo().await?;
        self.uninstall().await?;
        self.install().await?;
        self.apply_patches().await?;
        self.commit().await?;

        wait_for_changes()?;

        let path = self.next_patch_path()?;
        self.create_patch_from_changes(&path).await?;

        self.uninstall().await?;
        self.clean_repo().await?;
        self.apply_patches().await?;
        self.install().await?;
        Ok(path)
    }

    async fn ensure_repo(&self) -> Result<()> {
        if self.repo_dir.join(".git").exists() {
            return Ok(());
        }
        println!("Cloning {}", self.git_url);
        if let Some(parent) = self.repo_dir.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let target = self.repo_dir.to_string_lossy().to_string();
        git(None, &["clone", &self.git_url, &target]).await?;
        Ok(())
    }

    /// Drop local changes and check out the target tag.
    async fn clean_repo(&self) -> Result<()> {
        self.ensure_repo().await?;
        println!("Cleaning repo");
        self.git(&["reset", "--hard"]).await?;
        self.git(&["clean", "-fd"]).await?;
        println!("Updating repo");
        self.git(&["checkout", &self.target_tag, "-f"]).await?;
        Ok(())
    }

    async fn apply_patches(&self) -> Result<()> {
        println!("Applying patches");
        for patch in patch_files(&self.patches_dir)? {
            println!("\tApplying patch {}", patch.display());
            let path = patch.to_string_lossy().to_string();
            self.git(&["apply", "--ignore-space-change", "--ignore-whitespace", &path])
                .await?;
        }
        Ok(())
    }

    /// Commit everything so the next diff only holds the user's edits.
    async fn commit(&self) -> Result<()> {
        self.git(&["add", "--all"]).await?;
        if git_succeeds(&self.repo_dir, &["diff", "--cached", "--quiet", "HEAD"]).await? {
            debug!("nothing to stage");
            return Ok(());
        }
        println!("Staging changes");
        self.git(&["commit", "-m", COMMIT_MESSAGE]).await?;
        Ok(())
    }

    async fn create_patch_from_changes(&self, path: &Path) -> Result<()> {
        println!("Creating patch from changes");
        let diff = self.git(&["diff", "--patch"]).await?;
        if diff.trim().is_empty() {
            warn!("no changes found, the new patch will be empty");
        }
        std::fs::create_dir_all(&self.patches_dir)?;
        std::fs::write(path, format!("{diff}\n"))
            .with_context(|| format!("writing patch {}", path.display()))?;
        Ok(())
    }

    fn next_patch_path(&self) -> Result<PathBuf> {
        next_patch_path(&self.patches_dir)
    }

    async fn install(&self) -> Result<()> {
        match &self.install_command {
            Some(cmd) => {
                println!("Installing {}", self.repo_dir.display());
                shell(&self.repo_dir, cmd).await
            }
            None => Ok(()),
        }
    }

    async fn uninstall(&self) -> Result<()> {
        match &self.uninstall_command {
            Some(cmd) => {
                println!("Uninstalling");
                shell(&self.repo_dir, cmd).await
            }
            None => Ok(()),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        git(Some(&self.repo_dir), args).await
    }
}

// ─────────────────────────────────────────────
// Patch files
// ─────────────────────────────────────────────

/// Patch files in `dir`, sorted by name. A missing directory has none.
pub fn patch_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        warn!(dir = %dir.display(), "patches directory not found");
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// First `NNN-new-patch.diff` whose prefix no existing file starts with.
pub fn next_patch_path(dir: &Path) -> Result<PathBuf> {
    let names: Vec<String> = if dir.exists() {
        std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect()
    } else {
        Vec::new()
    };

    for num in 0..1000u32 {
        let prefix = format!("{num:03}");
        if !names.iter().any(|n| n.starts_with(&prefix)) {
            return Ok(dir.join(format!("{prefix}-new-patch.diff")));
        }
    }
    bail!("no free patch number left in {}", dir.display())
}

// ─────────────────────────────────────────────
// Processes
// ─────────────────────────────────────────────

async fn git(cwd: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    debug!(args = ?args, "running git");
    let output = cmd
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to spawn git: {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git {} failed: {}", args.join(" "), stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Whether git exits with status 0; spawn failures are errors.
async fn git_succeeds(cwd: &Path, args: &[&str]) -> Result<bool> {
    let status = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to spawn git: {e}"))?;
    Ok(status.success())
}

async fn shell(cwd: &Path, command: &str) -> Result<()> {
    info!(command = %command, cwd = %cwd.display(), "running install hook");
    let status = Command::new(if cfg!(target_os = "windows") { "cmd" } else { "sh" })
        .args(if cfg!(target_os = "windows") {
            vec!["/C", command]
        } else {
            vec!["-c", command]
        })
        .current_dir(cwd)
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to spawn command: {e}"))?;
    if !status.success() {
        bail!("`{command}` exited with {status}");
    }
    Ok(())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
