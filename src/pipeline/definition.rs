//! Pipeline kinds and their resolved, ordered step lists.

use super::registry::StepRegistry;
use super::step::{PipelineStep, StepCategory};
use crate::error::{CliError, PipelineError, Result};
use crate::version::BumpKind;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const BUILD_STEPS: &[&str] = &[
    "clean-build",
    "clean-publish",
    "compile",
    "copy-static",
    "mark-module-type",
    "copy-generated",
    "transform",
    "test",
];

const RELEASE_TAIL: &[&str] = &[
    "copy-package-json",
    "publish",
    "git-add",
    "git-commit",
    "git-push",
];

/// The tasks a user can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    /// Clean, compile, copy, transform and test both targets
    Build,
    /// Build, bump patch, publish and push
    Patch,
    /// Build, bump minor, publish and push
    Minor,
    /// Build, bump major, publish and push
    Major,
    /// Compile and run the tests only
    Test,
    /// Remove the build and publish trees
    Clean,
    /// `npm install`
    Install,
    /// `npm update`
    Update,
    /// List outdated dependencies
    Ncu,
    /// Upgrade dependency ranges in package.json
    NcuUpgrade,
}

impl PipelineKind {
    /// Every task
    pub const ALL: [PipelineKind; 10] = [
        PipelineKind::Build,
        PipelineKind::Patch,
        PipelineKind::Minor,
        PipelineKind::Major,
        PipelineKind::Test,
        PipelineKind::Clean,
        PipelineKind::Install,
        PipelineKind::Update,
        PipelineKind::Ncu,
        PipelineKind::NcuUpgrade,
    ];

    /// Task name as typed on the command line
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Build => "build",
            PipelineKind::Patch => "patch",
            PipelineKind::Minor => "minor",
            PipelineKind::Major => "major",
            PipelineKind::Test => "test",
            PipelineKind::Clean => "clean",
            PipelineKind::Install => "install",
            PipelineKind::Update => "update",
            PipelineKind::Ncu => "ncu",
            PipelineKind::NcuUpgrade => "ncuu",
        }
    }

    /// Version bump this task performs, if it is a release
    pub fn bump_kind(self) -> Option<BumpKind> {
        match self {
            PipelineKind::Patch => Some(BumpKind::Patch),
            PipelineKind::Minor => Some(BumpKind::Minor),
            PipelineKind::Major => Some(BumpKind::Major),
            _ => None,
        }
    }

    /// Step names in execution order
    pub fn step_names(self) -> Vec<&'static str> {
        if let Some(kind) = self.bump_kind() {
            let bump = match kind {
                BumpKind::Patch => "version-bump-patch",
                BumpKind::Minor => "version-bump-minor",
                BumpKind::Major => "version-bump-major",
            };
            let mut names = BUILD_STEPS.to_vec();
            names.push(bump);
            names.extend_from_slice(RELEASE_TAIL);
            return names;
        }
        match self {
            PipelineKind::Build => BUILD_STEPS.to_vec(),
            PipelineKind::Test => vec![
                "clean-build",
                "compile",
                "copy-static",
                "mark-module-type",
                "test",
            ],
            PipelineKind::Clean => vec!["clean-build", "clean-publish"],
            PipelineKind::Install => vec!["npm-install"],
            PipelineKind::Update => vec!["npm-update"],
            PipelineKind::Ncu => vec!["ncu"],
            PipelineKind::NcuUpgrade => vec!["ncu-upgrade"],
            PipelineKind::Patch | PipelineKind::Minor | PipelineKind::Major => Vec::new(),
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = CliError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "default" => Ok(PipelineKind::Build),
            "ncu-upgrade" => Ok(PipelineKind::NcuUpgrade),
            _ => PipelineKind::ALL
                .into_iter()
                .find(|k| k.as_str() == s)
                .ok_or_else(|| CliError::InvalidArguments {
                    reason: format!("unknown task '{}'", s),
                }),
        }
    }
}

/// An ordered, validated list of steps
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Assemble a pipeline from explicit steps; ids must be unique
    pub fn new(name: impl Into<String>, steps: Vec<PipelineStep>) -> Result<Self> {
        let name = name.into();
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.as_str()) {
                return Err(PipelineError::DuplicateStep {
                    pipeline: name,
                    step: step.id.clone(),
                }
                .into());
            }
        }
        Ok(Self { name, steps })
    }

    /// Resolve step names through the registry, then check ordering
    pub fn from_names(
        name: impl Into<String>,
        names: &[&str],
        registry: &StepRegistry,
    ) -> Result<Self> {
        let name = name.into();
        let mut steps = Vec::new();
        for step_name in names {
            let expanded = registry
                .expand(step_name)
                .ok_or_else(|| PipelineError::UnknownStep {
                    pipeline: name.clone(),
                    step: step_name.to_string(),
                })?;
            steps.extend(expanded);
        }
        let pipeline = Self::new(name, steps)?;
        pipeline.verify_invariants()?;
        Ok(pipeline)
    }

    /// The standard pipeline for a task
    pub fn for_kind(kind: PipelineKind, registry: &StepRegistry) -> Result<Self> {
        Self::from_names(kind.as_str(), &kind.step_names(), registry)
    }

    /// Pipeline name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Steps in execution order
    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// No steps at all
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step ids in execution order
    pub fn ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// Index of the step with `id`
    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }

    /// First step that cannot run without a commit message
    pub fn first_step_requiring_message(&self) -> Option<&PipelineStep> {
        self.steps
            .iter()
            .find(|s| s.operation.requires_commit_message())
    }

    /// Check the ordering rules every pipeline must satisfy:
    /// a directory is cleaned before anything writes into it, tests run
    /// before the version bump, and the bump precedes copying package.json.
    pub fn verify_invariants(&self) -> Result<()> {
        let invalid = |reason: String| PipelineError::InvalidOrder {
            pipeline: self.name.clone(),
            reason,
        };

        for (index, step) in self.steps.iter().enumerate() {
            let Some(populated) = step.operation.populated_dir() else {
                continue;
            };
            let cleaned_earlier = self.steps[..index]
                .iter()
                .filter_map(|s| s.operation.cleaned_dir())
                .any(|cleaned| populated.starts_with(cleaned));
            if !cleaned_earlier {
                return Err(invalid(format!(
                    "'{}' writes into {} before it is cleaned",
                    step.id,
                    populated.display()
                ))
                .into());
            }
        }

        let positions_of = |category: StepCategory| -> Vec<usize> {
            self.steps
                .iter()
                .enumerate()
                .filter(|(_, s)| s.operation.category() == category)
                .map(|(i, _)| i)
                .collect()
        };
        let tests = positions_of(StepCategory::Test);
        let bumps = positions_of(StepCategory::VersionBump);
        if let (Some(&last_test), Some(&first_bump)) = (tests.iter().max(), bumps.iter().min())
            && last_test > first_bump
        {
            return Err(invalid(format!(
                "'{}' runs after the version bump '{}'",
                self.steps[last_test].id, self.steps[first_bump].id
            ))
            .into());
        }

        if let (Some(bump), Some(copy)) = (
            bumps.first(),
            self.position("copy-package-json"),
        ) && copy < *bump
        {
            return Err(invalid(
                "package.json is copied before the version bump".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::pipeline::step::{NpmTask, StepOperation};
    use std::path::PathBuf;

    fn registry() -> StepRegistry {
        StepRegistry::standard(&ProjectConfig::default())
    }

    #[test]
    fn test_build_ids_in_order() {
        let pipeline = Pipeline::for_kind(PipelineKind::Build, &registry()).unwrap();
        assert_eq!(
            pipeline.ids(),
            vec![
                "clean-build",
                "clean-publish",
                "compile.commonjs",
                "compile.esmodule",
                "copy-static.commonjs",
                "copy-static.esmodule",
                "mark-module-type.commonjs",
                "mark-module-type.esmodule",
                "copy-generated.commonjs",
                "copy-generated.esmodule",
                "transform.commonjs",
                "transform.esmodule",
                "test.commonjs",
                "test.esmodule",
            ]
        );
        assert!(pipeline.first_step_requiring_message().is_none());
    }

    #[test]
    fn test_release_tail_follows_bump() {
        let pipeline = Pipeline::for_kind(PipelineKind::Minor, &registry()).unwrap();
        let ids = pipeline.ids();
        assert_eq!(
            &ids[ids.len() - 6..],
            &[
                "version-bump-minor",
                "copy-package-json",
                "publish",
                "git-add",
                "git-commit",
                "git-push",
            ]
        );
        assert_eq!(pipeline.first_step_requiring_message().unwrap().id, "git-add");
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        let err =
            Pipeline::from_names("custom", &["clean-build", "deploy"], &registry()).unwrap_err();
        assert!(err.to_string().contains("unknown step 'deploy'"));
    }

    #[test]
    fn test_repeated_step_is_rejected() {
        let result = Pipeline::from_names("custom", &["clean-build", "clean-build"], &registry());
        assert!(result.is_err());
    }

    #[test]
    fn test_populate_before_clean_is_rejected() {
        let result = Pipeline::from_names("custom", &["compile", "clean-build"], &registry());
        assert!(result.unwrap_err().to_string().contains("before it is cleaned"));
    }

    #[test]
    fn test_bump_before_tests_is_rejected() {
        let names = [
            "clean-build",
            "compile",
            "version-bump-patch",
            "test",
        ];
        let result = Pipeline::from_names("custom", &names, &registry());
        assert!(result.unwrap_err().to_string().contains("after the version bump"));
    }

    #[test]
    fn test_explicit_steps_need_unique_ids() {
        let step = PipelineStep::single("install", StepOperation::Npm(NpmTask::Install));
        assert!(Pipeline::new("p", vec![step.clone(), step]).is_err());
        let clean = PipelineStep::single(
            "clean",
            StepOperation::Clean {
                dir: PathBuf::from("build"),
            },
        );
        assert_eq!(Pipeline::new("p", vec![clean]).unwrap().len(), 1);
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in PipelineKind::ALL {
            assert_eq!(kind.as_str().parse::<PipelineKind>().unwrap(), kind);
            assert!(Pipeline::for_kind(kind, &registry()).is_ok());
        }
        assert_eq!("default".parse::<PipelineKind>().unwrap(), PipelineKind::Build);
        assert!("deploy".parse::<PipelineKind>().is_err());
    }
}
