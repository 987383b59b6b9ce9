//! Per-run release context shared by every step of a pipeline.

use crate::config::ProjectConfig;
use crate::error::Result;
use crate::git::GitOperations;
use crate::metadata::PackageMetadata;
use crate::pipeline::ModuleTarget;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which module formats are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DualTargets {
    /// Produce CommonJS output
    pub generate_commonjs: bool,
    /// Produce ES-module output
    pub generate_esmodule: bool,
}

impl DualTargets {
    /// Both formats
    pub const BOTH: DualTargets = DualTargets {
        generate_commonjs: true,
        generate_esmodule: true,
    };

    /// Whether `target` is generated
    pub fn is_enabled(&self, target: ModuleTarget) -> bool {
        match target {
            ModuleTarget::CommonJs => self.generate_commonjs,
            ModuleTarget::EsModule => self.generate_esmodule,
        }
    }

    /// Neither format is generated
    pub fn none_enabled(&self) -> bool {
        !self.generate_commonjs && !self.generate_esmodule
    }
}

/// Settle delays applied after git staging and registry publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleTimeouts {
    /// Pause after `git add`
    pub git_settle: Duration,
    /// Pause after `npm publish`
    pub npm_settle: Duration,
}

impl Default for SettleTimeouts {
    fn default() -> Self {
        Self {
            git_settle: Duration::from_millis(100),
            npm_settle: Duration::from_millis(5000),
        }
    }
}

/// Everything a pipeline run needs to know about the project.
///
/// Created once per invocation. Steps read the flags and may mutate the
/// package metadata (the version bump does); nothing else changes mid-run.
#[derive(Debug, Clone)]
pub struct ReleaseSpec {
    /// Project root every relative path resolves against
    pub project_root: PathBuf,
    /// Parsed `package.json`
    pub package: PackageMetadata,
    /// Generated module formats
    pub targets: DualTargets,
    /// Whether test steps run
    pub run_tests: bool,
    /// Branch pushes go to
    pub main_branch: String,
    /// Settle delays
    pub timeouts: SettleTimeouts,
    commit_message: Option<String>,
}

impl ReleaseSpec {
    /// A context with both targets, tests enabled, default delays and no commit message
    pub fn new(
        project_root: &Path,
        package: PackageMetadata,
        main_branch: impl Into<String>,
    ) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            package,
            targets: DualTargets::BOTH,
            run_tests: true,
            main_branch: main_branch.into(),
            timeouts: SettleTimeouts::default(),
            commit_message: None,
        }
    }

    /// Set the commit message used by the git steps
    pub fn with_commit_message(mut self, message: impl Into<String>) -> Self {
        self.commit_message = Some(message.into());
        self
    }

    /// Replace the generated targets
    pub fn with_targets(mut self, targets: DualTargets) -> Self {
        self.targets = targets;
        self
    }

    /// Enable or disable test steps
    pub fn with_tests(mut self, run_tests: bool) -> Self {
        self.run_tests = run_tests;
        self
    }

    /// Replace the settle delays
    pub fn with_timeouts(mut self, timeouts: SettleTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Commit message, if one was given and is not blank
    pub fn commit_message(&self) -> Option<&str> {
        self.commit_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }

    /// Build the release context for a run: load the package file, resolve the push
    /// branch and copy the flags out of the configuration.
    pub async fn resolve<G: GitOperations>(
        project_root: &Path,
        config: &ProjectConfig,
        git: &G,
        commit_message: Option<String>,
    ) -> Result<Self> {
        let package = PackageMetadata::load(&project_root.join(&config.layout.package_file))?;
        let main_branch = resolve_branch(git, &config.git.default_branch).await;

        let mut spec = Self::new(project_root, package, main_branch)
            .with_targets(DualTargets {
                generate_commonjs: config.targets.commonjs.enabled,
                generate_esmodule: config.targets.esmodule.enabled,
            })
            .with_tests(config.test.enabled)
            .with_timeouts(SettleTimeouts {
                git_settle: config.git_settle(),
                npm_settle: config.npm_settle(),
            });
        spec.commit_message = commit_message;

        if spec.targets.none_enabled() {
            log::warn!(
                "Both CommonJS and ES-module output are disabled; target steps will be skipped"
            );
        }
        Ok(spec)
    }
}

/// The checked-out branch, or `fallback` when it cannot be determined
pub async fn resolve_branch<G: GitOperations>(git: &G, fallback: &str) -> String {
    match git.current_branch().await {
        Ok(Some(branch)) => branch,
        Ok(None) => {
            log::warn!("Could not detect the current branch, using '{}'", fallback);
            fallback.to_string()
        }
        Err(e) => {
            log::warn!("Branch detection failed ({}), using '{}'", e, fallback);
            fallback.to_string()
        }
    }
}
