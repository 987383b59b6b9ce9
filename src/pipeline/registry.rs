//! Named step definitions pipelines are assembled from.

use super::step::{ModuleTarget, NpmTask, PipelineStep, StepOperation, VcsOperation};
use crate::config::{ProjectConfig, TargetConfig};
use crate::error::{PipelineError, Result};
use crate::version::BumpKind;
use std::collections::BTreeMap;

/// How a step name expands into concrete pipeline steps
#[derive(Debug, Clone, PartialEq)]
pub enum StepDefinition {
    /// One unconditional step
    Single(StepOperation),
    /// One variant per module target, CommonJS first
    Dual {
        /// CommonJS variant
        commonjs: StepOperation,
        /// ES-module variant
        esmodule: StepOperation,
        /// Variants additionally require tests to be enabled
        requires_tests: bool,
    },
}

/// Step definitions by name
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: BTreeMap<String, StepDefinition>,
}

impl StepRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition; names must be unique
    pub fn register(&mut self, name: impl Into<String>, definition: StepDefinition) -> Result<()> {
        let name = name.into();
        if self.steps.contains_key(&name) {
            return Err(PipelineError::DuplicateStep {
                pipeline: "registry".to_string(),
                step: name,
            }
            .into());
        }
        self.steps.insert(name, definition);
        Ok(())
    }

    /// Concrete steps for `name`: one for a single step, two for a dual one
    pub fn expand(&self, name: &str) -> Option<Vec<PipelineStep>> {
        let steps = match self.steps.get(name)? {
            StepDefinition::Single(operation) => {
                vec![PipelineStep::single(name, operation.clone())]
            }
            StepDefinition::Dual {
                commonjs,
                esmodule,
                requires_tests,
            } => vec![
                PipelineStep::for_target(
                    name,
                    ModuleTarget::CommonJs,
                    commonjs.clone(),
                    *requires_tests,
                ),
                PipelineStep::for_target(
                    name,
                    ModuleTarget::EsModule,
                    esmodule.clone(),
                    *requires_tests,
                ),
            ],
        };
        Some(steps)
    }

    /// Every step the standard pipelines use, laid out per `config`
    pub fn standard(config: &ProjectConfig) -> Self {
        let layout = &config.layout;
        let build_dir = |t: &TargetConfig| layout.build_dir.join(&t.dir);
        let publish_dir = |t: &TargetConfig| layout.publish_dir.join(&t.dir);

        let definitions = [
            (
                "clean-build",
                StepDefinition::Single(StepOperation::Clean {
                    dir: layout.build_dir.clone(),
                }),
            ),
            (
                "clean-publish",
                StepDefinition::Single(StepOperation::Clean {
                    dir: layout.publish_dir.clone(),
                }),
            ),
            (
                "compile",
                dual(config, false, |t, _| StepOperation::Compile {
                    tsconfig: t.tsconfig.clone(),
                    out_dir: build_dir(t),
                }),
            ),
            (
                "copy-static",
                dual(config, false, |t, _| StepOperation::Copy {
                    from: layout.src_dir.clone(),
                    include: layout.static_patterns.clone(),
                    exclude: Vec::new(),
                    to: build_dir(t),
                }),
            ),
            (
                "mark-module-type",
                dual(config, false, |t, target| StepOperation::ModuleMarker {
                    dir: build_dir(t),
                    target,
                }),
            ),
            (
                "copy-generated",
                dual(config, false, |t, _| StepOperation::Copy {
                    from: build_dir(t),
                    include: layout.publish_patterns.clone(),
                    exclude: layout.publish_exclude.clone(),
                    to: publish_dir(t),
                }),
            ),
            (
                "transform",
                dual(config, false, |t, _| StepOperation::Transform {
                    dir: publish_dir(t),
                    rules: config.transforms.clone(),
                }),
            ),
            (
                "test",
                dual(config, true, |t, _| StepOperation::Test {
                    dir: build_dir(t),
                    patterns: config.test.patterns.clone(),
                }),
            ),
            (
                "version-bump-patch",
                StepDefinition::Single(StepOperation::VersionBump(BumpKind::Patch)),
            ),
            (
                "version-bump-minor",
                StepDefinition::Single(StepOperation::VersionBump(BumpKind::Minor)),
            ),
            (
                "version-bump-major",
                StepDefinition::Single(StepOperation::VersionBump(BumpKind::Major)),
            ),
            (
                "copy-package-json",
                StepDefinition::Single(StepOperation::CopyPackageJson {
                    to: layout.publish_dir.clone(),
                }),
            ),
            (
                "publish",
                StepDefinition::Single(StepOperation::Publish {
                    dir: layout.publish_dir.clone(),
                }),
            ),
            ("git-add", StepDefinition::Single(StepOperation::Vcs(VcsOperation::Add))),
            ("git-commit", StepDefinition::Single(StepOperation::Vcs(VcsOperation::Commit))),
            ("git-push", StepDefinition::Single(StepOperation::Vcs(VcsOperation::Push))),
            ("npm-install", StepDefinition::Single(StepOperation::Npm(NpmTask::Install))),
            ("npm-update", StepDefinition::Single(StepOperation::Npm(NpmTask::Update))),
            ("ncu", StepDefinition::Single(StepOperation::Npm(NpmTask::CheckUpdates))),
            (
                "ncu-upgrade",
                StepDefinition::Single(StepOperation::Npm(NpmTask::UpgradeDependencies)),
            ),
        ];

        let mut registry = Self::new();
        for (name, definition) in definitions {
            registry.steps.insert(name.to_string(), definition);
        }
        registry
    }
}

fn dual(
    config: &ProjectConfig,
    requires_tests: bool,
    op: impl Fn(&TargetConfig, ModuleTarget) -> StepOperation,
) -> StepDefinition {
    StepDefinition::Dual {
        commonjs: op(&config.targets.commonjs, ModuleTarget::CommonJs),
        esmodule: op(&config.targets.esmodule, ModuleTarget::EsModule),
        requires_tests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_dual_step_expands_commonjs_first() {
        let registry = StepRegistry::standard(&ProjectConfig::default());
        let steps = registry.expand("compile").unwrap();
        let ids: Vec<_> = steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["compile.commonjs", "compile.esmodule"]);
        assert_eq!(
            steps[1].operation,
            StepOperation::Compile {
                tsconfig: PathBuf::from("tsconfig.esm.json"),
                out_dir: PathBuf::from("build/esm"),
            }
        );
    }

    #[test]
    fn test_single_step_keeps_its_name() {
        let registry = StepRegistry::standard(&ProjectConfig::default());
        let steps = registry.expand("publish").unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].id, "publish");
        assert!(steps[0].condition.is_none());
        assert!(registry.expand("deploy").is_none());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = StepRegistry::new();
        let def = StepDefinition::Single(StepOperation::Npm(NpmTask::Install));
        registry.register("install", def.clone()).unwrap();
        assert!(registry.register("install", def).is_err());
        assert_eq!(registry.expand("install").unwrap()[0].id, "install");
    }
}
