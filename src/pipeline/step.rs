//! Typed pipeline steps.

use crate::config::TransformRule;
use crate::release::ReleaseSpec;
use crate::version::BumpKind;
use std::fmt;
use std::path::{Path, PathBuf};

/// One of the two parallel module formats a package is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleTarget {
    /// `require`-style output
    CommonJs,
    /// `import`-style output
    EsModule,
}

impl ModuleTarget {
    /// Both targets, in execution order
    pub const ALL: [ModuleTarget; 2] = [ModuleTarget::CommonJs, ModuleTarget::EsModule];

    /// Suffix appended to a dual step's name to form its id
    pub fn id_suffix(self) -> &'static str {
        match self {
            ModuleTarget::CommonJs => "commonjs",
            ModuleTarget::EsModule => "esmodule",
        }
    }

    /// Value of the `type` field in the target's `package.json` marker
    pub fn package_type(self) -> &'static str {
        match self {
            ModuleTarget::CommonJs => "commonjs",
            ModuleTarget::EsModule => "module",
        }
    }
}

impl fmt::Display for ModuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleTarget::CommonJs => f.write_str("CommonJS"),
            ModuleTarget::EsModule => f.write_str("ES module"),
        }
    }
}

/// Predicate deciding whether a step runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCondition {
    /// Only when the target is generated
    Target(ModuleTarget),
    /// Only when the target is generated and tests are enabled
    TargetTests(ModuleTarget),
}

impl StepCondition {
    /// Evaluate against the current flags
    pub fn holds(&self, spec: &ReleaseSpec) -> bool {
        match *self {
            StepCondition::Target(target) => spec.targets.is_enabled(target),
            StepCondition::TargetTests(target) => spec.targets.is_enabled(target) && spec.run_tests,
        }
    }
}

/// Version control operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsOperation {
    /// Stage every changed or untracked path
    Add,
    /// Commit with the operator's message
    Commit,
    /// Push to the resolved main branch
    Push,
}

/// Package-manager maintenance tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpmTask {
    /// `npm install`
    Install,
    /// `npm update` (respects semver ranges)
    Update,
    /// List outdated dependencies with npm-check-updates
    CheckUpdates,
    /// Rewrite package.json ranges with npm-check-updates
    UpgradeDependencies,
}

/// Broad kind of work a step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepCategory {
    /// Delete a directory
    Clean,
    /// Run the compiler
    Compile,
    /// Copy or write files into a directory
    Copy,
    /// Rewrite files in place
    Transform,
    /// Run the test runner
    Test,
    /// Mutate and persist the version
    VersionBump,
    /// Push to the package registry
    Publish,
    /// Stage, commit or push
    Vcs,
    /// Dependency maintenance
    PackageManager,
}

/// What a step does. Paths are relative to the project root.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOperation {
    /// Recursively delete `dir` if present
    Clean {
        /// Directory to remove
        dir: PathBuf,
    },
    /// Compile with `tsconfig`, writing to `out_dir`
    Compile {
        /// Compiler configuration reference
        tsconfig: PathBuf,
        /// Output directory
        out_dir: PathBuf,
    },
    /// Copy matching files from `from` into `to`, keeping relative paths
    Copy {
        /// Source root the patterns are relative to
        from: PathBuf,
        /// Globs to copy
        include: Vec<String>,
        /// Globs to leave out
        exclude: Vec<String>,
        /// Destination root
        to: PathBuf,
    },
    /// Write a `package.json` declaring the module type into `dir`
    ModuleMarker {
        /// Target build directory
        dir: PathBuf,
        /// Module format
        target: ModuleTarget,
    },
    /// Apply text substitutions in place under `dir`
    Transform {
        /// Directory the rules' globs are relative to
        dir: PathBuf,
        /// Substitutions
        rules: Vec<TransformRule>,
    },
    /// Run the test runner over `patterns` under `dir`
    Test {
        /// Build directory holding compiled tests
        dir: PathBuf,
        /// Test file globs relative to `dir`
        patterns: Vec<String>,
    },
    /// Bump and persist the package version
    VersionBump(BumpKind),
    /// Copy the package file into `to`
    CopyPackageJson {
        /// Publish root
        to: PathBuf,
    },
    /// Publish `dir` to the registry, then wait for it to settle
    Publish {
        /// Artifact directory
        dir: PathBuf,
    },
    /// Version control
    Vcs(VcsOperation),
    /// Dependency maintenance
    Npm(NpmTask),
}

impl StepOperation {
    /// Broad kind of work
    pub fn category(&self) -> StepCategory {
        match self {
            StepOperation::Clean { .. } => StepCategory::Clean,
            StepOperation::Compile { .. } => StepCategory::Compile,
            StepOperation::Copy { .. }
            | StepOperation::ModuleMarker { .. }
            | StepOperation::CopyPackageJson { .. } => StepCategory::Copy,
            StepOperation::Transform { .. } => StepCategory::Transform,
            StepOperation::Test { .. } => StepCategory::Test,
            StepOperation::VersionBump(_) => StepCategory::VersionBump,
            StepOperation::Publish { .. } => StepCategory::Publish,
            StepOperation::Vcs(_) => StepCategory::Vcs,
            StepOperation::Npm(_) => StepCategory::PackageManager,
        }
    }

    /// Directory this step writes new files into
    pub fn populated_dir(&self) -> Option<&Path> {
        match self {
            StepOperation::Compile { out_dir, .. } => Some(out_dir),
            StepOperation::Copy { to, .. } | StepOperation::CopyPackageJson { to } => Some(to),
            StepOperation::ModuleMarker { dir, .. } => Some(dir),
            _ => None,
        }
    }

    /// Directory this step deletes
    pub fn cleaned_dir(&self) -> Option<&Path> {
        match self {
            StepOperation::Clean { dir } => Some(dir),
            _ => None,
        }
    }

    /// Whether the step cannot run without a commit message
    pub fn requires_commit_message(&self) -> bool {
        matches!(
            self,
            StepOperation::Vcs(VcsOperation::Add) | StepOperation::Vcs(VcsOperation::Commit)
        )
    }
}

impl fmt::Display for StepOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOperation::Clean { dir } => write!(f, "clean {}", dir.display()),
            StepOperation::Compile { tsconfig, out_dir } => {
                write!(f, "compile {} -> {}", tsconfig.display(), out_dir.display())
            }
            StepOperation::Copy { from, include, to, .. } => write!(
                f,
                "copy {} from {} -> {}",
                include.join(", "),
                from.display(),
                to.display()
            ),
            StepOperation::ModuleMarker { dir, target } => write!(
                f,
                "mark {} as \"{}\"",
                dir.display(),
                target.package_type()
            ),
            StepOperation::Transform { dir, rules } => {
                write!(f, "apply {} rule(s) under {}", rules.len(), dir.display())
            }
            StepOperation::Test { dir, .. } => write!(f, "test {}", dir.display()),
            StepOperation::VersionBump(kind) => write!(f, "bump {} version", kind),
            StepOperation::CopyPackageJson { to } => {
                write!(f, "copy package.json -> {}", to.display())
            }
            StepOperation::Publish { dir } => write!(f, "publish {}", dir.display()),
            StepOperation::Vcs(VcsOperation::Add) => f.write_str("git add"),
            StepOperation::Vcs(VcsOperation::Commit) => f.write_str("git commit"),
            StepOperation::Vcs(VcsOperation::Push) => f.write_str("git push"),
            StepOperation::Npm(NpmTask::Install) => f.write_str("npm install"),
            StepOperation::Npm(NpmTask::Update) => f.write_str("npm update"),
            StepOperation::Npm(NpmTask::CheckUpdates) => f.write_str("check dependency updates"),
            StepOperation::Npm(NpmTask::UpgradeDependencies) => {
                f.write_str("upgrade dependency ranges")
            }
        }
    }
}

/// A named unit of work inside a pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStep {
    /// Conceptual step name shared by dual-target twins (e.g. `compile`)
    pub name: String,
    /// Unique id within a pipeline (e.g. `compile.esmodule`)
    pub id: String,
    /// Module format this variant produces, for dual-target steps
    pub target: Option<ModuleTarget>,
    /// The work itself
    pub operation: StepOperation,
    /// Run only when this holds
    pub condition: Option<StepCondition>,
}

impl PipelineStep {
    /// An unconditional step whose id equals its name
    pub fn single(name: impl Into<String>, operation: StepOperation) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            target: None,
            operation,
            condition: None,
        }
    }

    /// One variant of a dual-target step
    pub fn for_target(
        name: impl Into<String>,
        target: ModuleTarget,
        operation: StepOperation,
        requires_tests: bool,
    ) -> Self {
        let name = name.into();
        let condition = if requires_tests {
            StepCondition::TargetTests(target)
        } else {
            StepCondition::Target(target)
        };
        Self {
            id: format!("{}.{}", name, target.id_suffix()),
            name,
            target: Some(target),
            operation,
            condition: Some(condition),
        }
    }

    /// Whether the step should run under `spec`
    pub fn is_enabled(&self, spec: &ReleaseSpec) -> bool {
        self.condition.is_none_or(|c| c.holds(spec))
    }
}
