//! Executes pipeline steps against a real project directory.

use super::runner::{StepExecutor, StepOutcome};
use super::step::{NpmTask, PipelineStep, StepOperation, VcsOperation};
use crate::config::{ProjectConfig, TestConfig, ToolsConfig};
use crate::error::{CliError, PublishError, Result};
use crate::files;
use crate::git::GitOperations;
use crate::process::{CommandOutput, CommandRunner, ExternalCommand, log_output, run_checked};
use crate::release::ReleaseSpec;
use crate::version::{self, BumpOutcome};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Step executor backed by the file system, external tools and git
#[derive(Debug, Clone)]
pub struct WorkspaceExecutor<R, G> {
    root: PathBuf,
    runner: R,
    git: G,
    tools: ToolsConfig,
    test: TestConfig,
    remote: String,
    strict_version: bool,
}

impl<R: CommandRunner, G: GitOperations> WorkspaceExecutor<R, G> {
    /// Executor for the project at `root`
    pub fn new(root: &Path, config: &ProjectConfig, runner: R, git: G) -> Self {
        Self {
            root: root.to_path_buf(),
            runner,
            git,
            tools: config.tools.clone(),
            test: config.test.clone(),
            remote: config.git.remote.clone(),
            strict_version: config.version.strict,
        }
    }

    fn command(&self, parts: &[String]) -> Result<ExternalCommand> {
        ExternalCommand::from_parts(parts, &self.root)
    }

    fn npm(&self) -> ExternalCommand {
        ExternalCommand::new(self.tools.npm.clone(), &self.root)
    }

    async fn compile(&self, tsconfig: &Path, out_dir: &Path) -> Result<StepOutcome> {
        files::ensure_dir(&self.root.join(out_dir)).await?;
        let command = self
            .command(&self.tools.compiler)?
            .arg("--project")
            .arg(tsconfig.to_string_lossy())
            .arg("--outDir")
            .arg(out_dir.to_string_lossy());
        run_checked(&self.runner, &command).await?;
        Ok(StepOutcome::done())
    }

    async fn write_module_marker(&self, dir: &Path, package_type: &str) -> Result<StepOutcome> {
        let dir = self.root.join(dir);
        files::ensure_dir(&dir).await?;
        let mut text = serde_json::to_string_pretty(&serde_json::json!({ "type": package_type }))?;
        text.push('\n');
        tokio::fs::write(dir.join("package.json"), text).await?;
        Ok(StepOutcome::with_detail(format!("type \"{}\"", package_type)))
    }

    async fn run_tests(&self, dir: &Path, patterns: &[String]) -> Result<StepOutcome> {
        let found = files::match_files(&self.root.join(dir), patterns, &[])?;
        if found.is_empty() {
            log::warn!("No test files matching {:?} under {}", patterns, dir.display());
            return Ok(StepOutcome::with_detail("no test files"));
        }
        let command = self
            .command(&self.test.command)?
            .arg("--timeout")
            .arg(self.test.timeout_ms.to_string())
            .args(
                found
                    .iter()
                    .map(|file| dir.join(file).to_string_lossy().into_owned()),
            );
        run_checked(&self.runner, &command).await?;
        Ok(StepOutcome::with_detail(format!("{} test file(s)", found.len())))
    }

    async fn publish(&self, dir: &Path, spec: &ReleaseSpec) -> Result<StepOutcome> {
        let package = spec.package.name().unwrap_or("package").to_string();
        if files::list_files(&self.root.join(dir))?.is_empty() {
            return Err(PublishError::EmptyArtifact {
                path: dir.to_path_buf(),
            }
            .into());
        }

        let command = self.npm().arg("publish").arg(dir.to_string_lossy());
        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(classify_publish_failure(
                &package,
                spec.package.version().unwrap_or_default(),
                &output,
            )
            .into());
        }
        log_output(&output);

        log::info!(
            "Waiting {} ms for the registry to settle",
            spec.timeouts.npm_settle.as_millis()
        );
        tokio::time::sleep(spec.timeouts.npm_settle).await;

        Ok(StepOutcome::with_detail(format!(
            "{}@{}",
            package,
            spec.package.version().unwrap_or("?")
        )))
    }

    async fn vcs(&self, operation: VcsOperation, spec: &ReleaseSpec) -> Result<StepOutcome> {
        match operation {
            VcsOperation::Add => {
                require_message(spec)?;
                let paths = self.git.changed_paths().await?;
                self.git.stage(&paths).await?;
                tokio::time::sleep(spec.timeouts.git_settle).await;
                Ok(StepOutcome::with_detail(format!("staged {} path(s)", paths.len())))
            }
            VcsOperation::Commit => {
                let message = require_message(spec)?;
                let info = self.git.commit(message).await?;
                Ok(match info.short_hash {
                    Some(hash) => StepOutcome::with_detail(format!("commit {}", hash)),
                    None => StepOutcome::done(),
                })
            }
            VcsOperation::Push => {
                let info = self.git.push(&self.remote, &spec.main_branch).await?;
                Ok(StepOutcome::with_detail(format!("{}/{}", info.remote, info.branch)))
            }
        }
    }

    async fn npm_task(&self, task: NpmTask, spec: &ReleaseSpec) -> Result<StepOutcome> {
        let package_file = spec
            .package
            .path()
            .strip_prefix(&self.root)
            .unwrap_or(spec.package.path())
            .to_string_lossy()
            .into_owned();
        let command = match task {
            NpmTask::Install => self.npm().arg("install"),
            NpmTask::Update => self.npm().arg("update"),
            NpmTask::CheckUpdates => self
                .command(&self.tools.ncu)?
                .arg("--packageFile")
                .arg(package_file),
            NpmTask::UpgradeDependencies => self
                .command(&self.tools.ncu)?
                .arg("-u")
                .arg("--packageFile")
                .arg(package_file),
        };
        run_checked(&self.runner, &command).await?;
        Ok(StepOutcome::done())
    }
}

impl<R: CommandRunner, G: GitOperations> StepExecutor for WorkspaceExecutor<R, G> {
    async fn execute(&self, step: &PipelineStep, spec: &mut ReleaseSpec) -> Result<StepOutcome> {
        match &step.operation {
            StepOperation::Clean { dir } => {
                let removed = files::remove_dir_all(&self.root.join(dir)).await?;
                Ok(StepOutcome::with_detail(if removed {
                    "removed"
                } else {
                    "nothing to remove"
                }))
            }
            StepOperation::Compile { tsconfig, out_dir } => self.compile(tsconfig, out_dir).await,
            StepOperation::Copy {
                from,
                include,
                exclude,
                to,
            } => {
                let copied =
                    files::copy_globs(&self.root.join(from), include, exclude, &self.root.join(to))
                        .await?;
                Ok(StepOutcome::with_detail(format!("{} file(s)", copied)))
            }
            StepOperation::ModuleMarker { dir, target } => {
                self.write_module_marker(dir, target.package_type()).await
            }
            StepOperation::Transform { dir, rules } => {
                let stats = files::transform_globs(&self.root.join(dir), rules).await?;
                Ok(StepOutcome::with_detail(format!("{} file(s) rewritten", stats.changed)))
            }
            StepOperation::Test { dir, patterns } => self.run_tests(dir, patterns).await,
            StepOperation::VersionBump(kind) => {
                let outcome =
                    version::bump_and_persist(&mut spec.package, *kind, self.strict_version).await?;
                match outcome {
                    BumpOutcome::Bumped { from, to } => {
                        Ok(StepOutcome::with_detail(format!("{} -> {}", from, to)))
                    }
                    BumpOutcome::Skipped { version, .. } => {
                        Ok(StepOutcome::with_detail(format!("left '{}' unchanged", version)))
                    }
                }
            }
            StepOperation::CopyPackageJson { to } => {
                let source = spec.package.path();
                let file_name = source.file_name().unwrap_or(OsStr::new("package.json"));
                files::copy_file(source, &self.root.join(to).join(file_name)).await?;
                Ok(StepOutcome::done())
            }
            StepOperation::Publish { dir } => self.publish(dir, spec).await,
            StepOperation::Vcs(operation) => self.vcs(*operation, spec).await,
            StepOperation::Npm(task) => self.npm_task(*task, spec).await,
        }
    }
}

fn require_message(spec: &ReleaseSpec) -> Result<&str> {
    spec.commit_message().ok_or_else(|| {
        CliError::MissingArgument {
            argument: "-m/--message".to_string(),
        }
        .into()
    })
}

/// Map npm's failure output onto a publish error; the raw output is logged.
fn classify_publish_failure(package: &str, version: &str, output: &CommandOutput) -> PublishError {
    let text = output.combined();
    log::error!("{}", text);
    if text.contains("E401") || text.contains("ENEEDAUTH") {
        PublishError::AuthenticationError
    } else if text.contains("EPUBLISHCONFLICT")
        || text.contains("cannot publish over the previously published")
    {
        PublishError::AlreadyPublished {
            package: package.to_string(),
            version: version.to_string(),
        }
    } else {
        PublishError::PublishFailed {
            package: package.to_string(),
            reason: text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_publish_failure() {
        let auth = CommandOutput::failed(1, "npm ERR! code ENEEDAUTH\nnpm ERR! need auth");
        assert!(matches!(
            classify_publish_failure("pkg", "1.0.0", &auth),
            PublishError::AuthenticationError
        ));

        let conflict = CommandOutput::failed(
            1,
            "npm ERR! 403 You cannot publish over the previously published versions: 1.0.0.",
        );
        assert!(matches!(
            classify_publish_failure("pkg", "1.0.0", &conflict),
            PublishError::AlreadyPublished { .. }
        ));

        let other = CommandOutput::failed(1, "npm ERR! network timeout");
        match classify_publish_failure("pkg", "1.0.0", &other) {
            PublishError::PublishFailed { reason, .. } => {
                assert!(reason.contains("network timeout"))
            }
            e => panic!("unexpected {e:?}"),
        }
    }
}
