//! Pipeline definition and runner tests using a recording step executor.

use node_release_base::config::ProjectConfig;
use node_release_base::error::{CliError, Result};
use node_release_base::metadata::PackageMetadata;
use node_release_base::pipeline::{
    Pipeline, PipelineKind, PipelineRunner, PipelineStep, StepExecutor, StepOutcome,
    StepRegistry, StepStatus,
};
use node_release_base::release::{DualTargets, ReleaseSpec};
use std::cell::RefCell;
use std::path::Path;

const DUAL_STEPS: [&str; 6] = [
    "compile",
    "copy-static",
    "mark-module-type",
    "copy-generated",
    "transform",
    "test",
];

#[derive(Default)]
struct RecordingExecutor {
    calls: RefCell<Vec<String>>,
    fail_on: Option<&'static str>,
}

impl RecordingExecutor {
    fn failing_on(id: &'static str) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_on: Some(id),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl StepExecutor for RecordingExecutor {
    async fn execute(&self, step: &PipelineStep, _spec: &mut ReleaseSpec) -> Result<StepOutcome> {
        self.calls.borrow_mut().push(step.id.clone());
        if self.fail_on == Some(step.id.as_str()) {
            return Err(CliError::ExecutionFailed {
                command: "npx tsc".to_string(),
                reason: "src/index.ts(3,7): error TS2322".to_string(),
            }
            .into());
        }
        Ok(StepOutcome::done())
    }
}

fn spec() -> ReleaseSpec {
    let package = PackageMetadata::from_json(
        Path::new("/project/package.json"),
        r#"{"name":"demo-lib","version":"1.4.9"}"#,
    )
    .unwrap();
    ReleaseSpec::new(Path::new("/project"), package, "main")
}

fn pipeline(kind: PipelineKind) -> Pipeline {
    Pipeline::for_kind(kind, &StepRegistry::standard(&ProjectConfig::default())).unwrap()
}

fn pos(pipeline: &Pipeline, id: &str) -> usize {
    pipeline
        .position(id)
        .unwrap_or_else(|| panic!("{} missing from {:?}", id, pipeline.ids()))
}

#[test]
fn test_release_pipelines_test_before_bump_before_publish_before_commit() {
    for (kind, bump) in [
        (PipelineKind::Patch, "version-bump-patch"),
        (PipelineKind::Minor, "version-bump-minor"),
        (PipelineKind::Major, "version-bump-major"),
    ] {
        let p = pipeline(kind);
        let bump_at = pos(&p, bump);
        assert!(pos(&p, "test.commonjs") < bump_at);
        assert!(pos(&p, "test.esmodule") < bump_at);
        assert!(bump_at < pos(&p, "copy-package-json"));
        assert!(pos(&p, "copy-package-json") < pos(&p, "publish"));
        assert!(pos(&p, "publish") < pos(&p, "git-add"));
        assert!(pos(&p, "git-add") < pos(&p, "git-commit"));
        assert!(pos(&p, "git-commit") < pos(&p, "git-push"));
    }
}

#[test]
fn test_every_populated_directory_is_cleaned_first() {
    for kind in PipelineKind::ALL {
        let p = pipeline(kind);
        for (index, step) in p.steps().iter().enumerate() {
            let Some(dir) = step.operation.populated_dir() else {
                continue;
            };
            let cleaned = p.steps()[..index]
                .iter()
                .filter_map(|s| s.operation.cleaned_dir())
                .any(|c| dir.starts_with(c));
            assert!(cleaned, "{} writes {} uncleaned in {}", step.id, dir.display(), kind);
        }
    }
}

#[test]
fn test_commonjs_variant_precedes_esmodule_variant() {
    let p = pipeline(PipelineKind::Build);
    for name in DUAL_STEPS {
        assert!(pos(&p, &format!("{name}.commonjs")) < pos(&p, &format!("{name}.esmodule")));
    }
}

#[tokio::test]
async fn test_failure_stops_the_pipeline() {
    let p = pipeline(PipelineKind::Patch);
    let mut runner = PipelineRunner::new(
        spec().with_commit_message("release"),
        RecordingExecutor::failing_on("compile.commonjs"),
    );

    let err = runner.run(&p).await.unwrap_err();

    assert_eq!(err.failed_step(), Some("compile.commonjs"));
    assert!(err.to_string().contains("error TS2322"));
    assert_eq!(
        runner.executor().calls(),
        vec!["clean-build", "clean-publish", "compile.commonjs"]
    );
}

#[tokio::test]
async fn test_failing_tests_never_reach_publish() {
    let p = pipeline(PipelineKind::Minor);
    let mut runner = PipelineRunner::new(
        spec().with_commit_message("release"),
        RecordingExecutor::failing_on("test.esmodule"),
    );

    runner.run(&p).await.unwrap_err();

    let calls = runner.executor().calls();
    assert_eq!(calls.last().map(String::as_str), Some("test.esmodule"));
    assert!(!calls.iter().any(|c| c.starts_with("version-bump") || c == "publish"));
}

#[tokio::test]
async fn test_missing_commit_message_fails_before_any_step() {
    for kind in [PipelineKind::Patch, PipelineKind::Minor, PipelineKind::Major] {
        let mut runner = PipelineRunner::new(spec(), RecordingExecutor::default());
        let err = runner.run(&pipeline(kind)).await.unwrap_err();
        assert_eq!(err.failed_step(), Some("git-add"));
        assert!(err.to_string().contains("-m/--message"));
        assert!(runner.executor().calls().is_empty());
    }
}

#[tokio::test]
async fn test_blank_commit_message_counts_as_missing() {
    let mut runner = PipelineRunner::new(
        spec().with_commit_message("   "),
        RecordingExecutor::default(),
    );
    assert!(runner.run(&pipeline(PipelineKind::Patch)).await.is_err());
    assert!(runner.executor().calls().is_empty());
}

#[tokio::test]
async fn test_build_does_not_need_a_commit_message() {
    let mut runner = PipelineRunner::new(spec(), RecordingExecutor::default());
    let report = runner.run(&pipeline(PipelineKind::Build)).await.unwrap();
    assert_eq!(report.executed().count(), 14);
}

#[tokio::test]
async fn test_disabled_target_is_skipped() {
    let targets = DualTargets {
        generate_commonjs: false,
        generate_esmodule: true,
    };
    let mut runner =
        PipelineRunner::new(spec().with_targets(targets), RecordingExecutor::default());

    let report = runner.run(&pipeline(PipelineKind::Build)).await.unwrap();

    let calls = runner.executor().calls();
    assert!(!calls.iter().any(|c| c.ends_with(".commonjs")));
    for name in DUAL_STEPS {
        let id = format!("{name}.esmodule");
        assert_eq!(calls.iter().filter(|c| **c == id).count(), 1, "{id}");
    }
    assert_eq!(report.skipped().count(), 6);
    assert!(report.skipped().all(|s| s.id.ends_with(".commonjs")));
}

#[tokio::test]
async fn test_both_targets_disabled_only_cleans() {
    let targets = DualTargets {
        generate_commonjs: false,
        generate_esmodule: false,
    };
    let mut runner =
        PipelineRunner::new(spec().with_targets(targets), RecordingExecutor::default());

    let report = runner.run(&pipeline(PipelineKind::Build)).await.unwrap();

    assert_eq!(runner.executor().calls(), vec!["clean-build", "clean-publish"]);
    assert_eq!(report.skipped().count(), 12);
}

#[tokio::test]
async fn test_disabled_tests_skip_only_test_steps() {
    let mut runner = PipelineRunner::new(spec().with_tests(false), RecordingExecutor::default());

    let report = runner.run(&pipeline(PipelineKind::Test)).await.unwrap();

    let skipped: Vec<_> = report.skipped().map(|s| s.id.as_str()).collect();
    assert_eq!(skipped, vec!["test.commonjs", "test.esmodule"]);
    assert_eq!(runner.executor().calls().len(), 7);
}

#[tokio::test]
async fn test_report_serializes_statuses() {
    let mut runner = PipelineRunner::new(spec().with_tests(false), RecordingExecutor::default());
    let report = runner.run(&pipeline(PipelineKind::Clean)).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["pipeline"], "clean");
    assert_eq!(json["steps"][0]["id"], "clean-build");
    assert_eq!(json["steps"][0]["status"], "success");
    assert!(report.steps.iter().all(|s| s.status == StepStatus::Success));
}
