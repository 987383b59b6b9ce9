//! Project configuration loaded from `release.toml`.
//!
//! Every field has a default, so a project without the file gets the
//! standard dual CommonJS/ES-module layout. Settle delays and target
//! toggles can be overridden from the environment.

use crate::error::{ConfigError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the optional configuration file in the project root
pub const CONFIG_FILE_NAME: &str = "release.toml";

const MAX_GIT_SETTLE_MS: u64 = 60_000;
const MAX_NPM_SETTLE_MS: u64 = 600_000;

/// Complete project configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory layout and copy patterns
    pub layout: LayoutConfig,
    /// CommonJS / ES-module build targets
    pub targets: TargetsConfig,
    /// Test runner settings
    pub test: TestConfig,
    /// External tool commands
    pub tools: ToolsConfig,
    /// Version control settings
    pub git: GitConfig,
    /// Post-operation settle delays
    pub timeouts: TimeoutConfig,
    /// Version bump behavior
    pub version: VersionConfig,
    /// In-place rewrite rules for published files
    #[serde(rename = "transform")]
    pub transforms: Vec<TransformRule>,
}

/// Directory layout, relative to the project root
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    /// TypeScript sources and static assets
    pub src_dir: PathBuf,
    /// Compiler output root (one subdirectory per target)
    pub build_dir: PathBuf,
    /// Publish artifact root
    pub publish_dir: PathBuf,
    /// Persisted package metadata
    pub package_file: PathBuf,
    /// Static assets copied from `src_dir` into each build target
    pub static_patterns: Vec<String>,
    /// Generated files copied from each build target into the publish tree
    pub publish_patterns: Vec<String>,
    /// Build files never published
    pub publish_exclude: Vec<String>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            build_dir: PathBuf::from("build"),
            publish_dir: PathBuf::from("publish"),
            package_file: PathBuf::from("package.json"),
            static_patterns: vec!["**/*.json".to_string()],
            publish_patterns: vec![
                "**/*.js".to_string(),
                "**/*.d.ts".to_string(),
                "**/*.json".to_string(),
            ],
            publish_exclude: vec!["test/**".to_string()],
        }
    }
}

/// Both build targets
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetsConfig {
    /// CommonJS output
    pub commonjs: TargetConfig,
    /// ES-module output
    pub esmodule: TargetConfig,
}

impl Default for TargetsConfig {
    fn default() -> Self {
        Self {
            commonjs: TargetConfig {
                enabled: true,
                tsconfig: PathBuf::from("tsconfig.cjs.json"),
                dir: "cjs".to_string(),
            },
            esmodule: TargetConfig {
                enabled: true,
                tsconfig: PathBuf::from("tsconfig.esm.json"),
                dir: "esm".to_string(),
            },
        }
    }
}

/// One build target
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Whether this target is generated
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Compiler configuration passed to the compile step
    pub tsconfig: PathBuf,
    /// Subdirectory name under the build and publish roots
    pub dir: String,
}

/// Test runner settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    /// Run tests at all
    pub enabled: bool,
    /// Runner program and leading arguments
    pub command: Vec<String>,
    /// Test file globs, relative to each target's build directory
    pub patterns: Vec<String>,
    /// Per-test timeout handed to the runner
    pub timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["npx".to_string(), "mocha".to_string()],
            patterns: vec!["test/**/*.test.js".to_string()],
            timeout_ms: 2000,
        }
    }
}

/// External tool commands
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// TypeScript compiler invocation
    pub compiler: Vec<String>,
    /// Package manager program
    pub npm: String,
    /// npm-check-updates invocation
    pub ncu: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            compiler: vec!["npx".to_string(), "tsc".to_string()],
            npm: "npm".to_string(),
            ncu: vec!["npx".to_string(), "npm-check-updates".to_string()],
        }
    }
}

/// Version control settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitConfig {
    /// Push target when the current branch cannot be detected
    pub default_branch: String,
    /// Remote to push to
    pub remote: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            default_branch: "main".to_string(),
            remote: "origin".to_string(),
        }
    }
}

/// Settle delays applied after eventually-consistent side effects
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Pause after staging files
    pub git_settle_ms: u64,
    /// Pause after a registry publish
    pub npm_settle_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            git_settle_ms: 100,
            npm_settle_ms: 5000,
        }
    }
}

/// Version bump behavior
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersionConfig {
    /// Fail on a malformed version instead of skipping the bump
    pub strict: bool,
}

/// In-place text substitution applied to published files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformRule {
    /// File globs, relative to each target's publish directory
    pub files: Vec<String>,
    /// Regular expression to replace
    pub pattern: String,
    /// Replacement text (supports `$1` captures)
    #[serde(default)]
    pub replacement: String,
}

fn default_true() -> bool {
    true
}

/// Rules used when `release.toml` declares no `[[transform]]`
pub fn default_transforms() -> Vec<TransformRule> {
    vec![TransformRule {
        files: vec!["**/*.js".to_string()],
        pattern: r"(?m)^//# sourceMappingURL=.*(\r?\n)?".to_string(),
        replacement: String::new(),
    }]
}

impl ProjectConfig {
    /// Load `release.toml` from the project root, falling back to defaults
    /// when the file is absent, then apply environment overrides.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE_NAME);
        let mut config = if path.is_file() {
            let content = std::fs::read_to_string(&path)?;
            Self::parse(&content, &path)?
        } else {
            log::debug!("No {} found, using defaults", path.display());
            Self::with_default_transforms(Self::default())
        };
        config.apply_env_overrides();
        config.validate(&path)?;
        Ok(config)
    }

    /// Parse configuration text; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: ProjectConfig = toml::from_str(content).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self::with_default_transforms(config))
    }

    fn with_default_transforms(mut config: Self) -> Self {
        if config.transforms.is_empty() {
            config.transforms = default_transforms();
        }
        config
    }

    /// Apply `NODE_RELEASE_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = parse_millis(lookup("NODE_RELEASE_GIT_SETTLE_MS"), MAX_GIT_SETTLE_MS) {
            self.timeouts.git_settle_ms = ms;
        }
        if let Some(ms) = parse_millis(lookup("NODE_RELEASE_NPM_SETTLE_MS"), MAX_NPM_SETTLE_MS) {
            self.timeouts.npm_settle_ms = ms;
        }
        if let Some(flag) = lookup("NODE_RELEASE_COMMONJS").and_then(|v| parse_flag(&v)) {
            self.targets.commonjs.enabled = flag;
        }
        if let Some(flag) = lookup("NODE_RELEASE_ESMODULE").and_then(|v| parse_flag(&v)) {
            self.targets.esmodule.enabled = flag;
        }
    }

    /// Reject configurations that cannot produce a consistent build
    pub fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: String| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        };

        let layout = &self.layout;
        let roots = [
            ("layout.src_dir", &layout.src_dir),
            ("layout.build_dir", &layout.build_dir),
            ("layout.publish_dir", &layout.publish_dir),
        ];
        for (i, (name, dir)) in roots.iter().enumerate() {
            for (other_name, other) in &roots[i + 1..] {
                if overlaps(dir, other) {
                    return Err(invalid(format!(
                        "{} '{}' and {} '{}' must not be the same or nested",
                        name,
                        dir.display(),
                        other_name,
                        other.display()
                    ))
                    .into());
                }
            }
        }

        if self.targets.commonjs.dir == self.targets.esmodule.dir {
            return Err(invalid(format!(
                "targets.commonjs.dir and targets.esmodule.dir are both '{}'",
                self.targets.commonjs.dir
            ))
            .into());
        }
        for (name, dir) in [
            ("commonjs", &self.targets.commonjs.dir),
            ("esmodule", &self.targets.esmodule.dir),
        ] {
            if dir.is_empty() || dir.contains(['/', '\\']) || dir == ".." || dir == "." {
                return Err(invalid(format!(
                    "targets.{}.dir must be a plain directory name, got '{}'",
                    name, dir
                ))
                .into());
            }
        }
        if self.tools.compiler.is_empty() || self.tools.ncu.is_empty() {
            return Err(invalid("tool commands must not be empty".to_string()).into());
        }
        if self.tools.npm.trim().is_empty() {
            return Err(invalid("tools.npm must not be empty".to_string()).into());
        }
        if self.test.enabled && self.test.command.is_empty() {
            return Err(invalid("test.command must not be empty".to_string()).into());
        }
        for rule in &self.transforms {
            regex::Regex::new(&rule.pattern)?;
        }
        Ok(())
    }

    /// Pause after staging files
    pub fn git_settle(&self) -> Duration {
        Duration::from_millis(self.timeouts.git_settle_ms)
    }

    /// Pause after publishing
    pub fn npm_settle(&self) -> Duration {
        Duration::from_millis(self.timeouts.npm_settle_ms)
    }
}

/// Whether one layout root equals or contains the other, ignoring `.` segments
fn overlaps(a: &Path, b: &Path) -> bool {
    let normalize = |p: &Path| -> PathBuf {
        p.components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .collect()
    };
    let (a, b) = (normalize(a), normalize(b));
    a.starts_with(&b) || b.starts_with(&a)
}

fn parse_millis(value: Option<String>, max: u64) -> Option<u64> {
    value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|v| v.min(max))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_describe_dual_layout() {
        let config = ProjectConfig::with_default_transforms(ProjectConfig::default());
        assert!(config.targets.commonjs.enabled);
        assert!(config.targets.esmodule.enabled);
        assert_eq!(config.targets.commonjs.dir, "cjs");
        assert_eq!(config.targets.esmodule.dir, "esm");
        assert_eq!(config.timeouts.git_settle_ms, 100);
        assert_eq!(config.timeouts.npm_settle_ms, 5000);
        assert_eq!(config.transforms, default_transforms());
    }

    #[test]
    fn test_parse_partial_file() {
        let toml = r#"
            [targets.commonjs]
            enabled = false
            tsconfig = "tsconfig.json"
            dir = "cjs"

            [timeouts]
            npm_settle_ms = 8000

            [[transform]]
            files = ["**/*.js"]
            pattern = "export \\{\\};"
        "#;
        let config = ProjectConfig::parse(toml, Path::new("release.toml")).unwrap();
        assert!(!config.targets.commonjs.enabled);
        assert!(config.targets.esmodule.enabled);
        assert_eq!(config.timeouts.npm_settle_ms, 8000);
        assert_eq!(config.timeouts.git_settle_ms, 100);
        assert_eq!(config.transforms.len(), 1);
        assert_eq!(config.transforms[0].replacement, "");
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = ProjectConfig::parse("[layout]\nsrcdir = \"x\"\n", Path::new("release.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_are_clamped() {
        let env: HashMap<&str, &str> = [
            ("NODE_RELEASE_GIT_SETTLE_MS", "999999999"),
            ("NODE_RELEASE_NPM_SETTLE_MS", "250"),
            ("NODE_RELEASE_ESMODULE", "false"),
            ("NODE_RELEASE_COMMONJS", "maybe"),
        ]
        .into_iter()
        .collect();
        let mut config = ProjectConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.timeouts.git_settle_ms, MAX_GIT_SETTLE_MS);
        assert_eq!(config.timeouts.npm_settle_ms, 250);
        assert!(!config.targets.esmodule.enabled);
        assert!(config.targets.commonjs.enabled);
    }

    #[test]
    fn test_validate_rejects_shared_target_dir() {
        let mut config = ProjectConfig::default();
        config.targets.esmodule.dir = "cjs".to_string();
        assert!(config.validate(Path::new("release.toml")).is_err());
    }

    #[test]
    fn test_validate_rejects_overlapping_layout_roots() {
        let mut config = ProjectConfig::default();
        config.layout.build_dir = PathBuf::from("dist");
        config.layout.publish_dir = PathBuf::from("./dist");
        let err = config.validate(Path::new("release.toml")).unwrap_err();
        assert!(err.to_string().contains("layout.build_dir 'dist'"));

        config.layout.publish_dir = PathBuf::from("dist/package");
        assert!(config.validate(Path::new("release.toml")).is_err());

        config.layout.publish_dir = PathBuf::from("publish");
        config.layout.src_dir = PathBuf::from("dist/src");
        assert!(config.validate(Path::new("release.toml")).is_err());

        config.layout.src_dir = PathBuf::from("src");
        config.layout.publish_dir = PathBuf::from("dist-publish");
        assert!(config.validate(Path::new("release.toml")).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_transform_pattern() {
        let mut config = ProjectConfig::default();
        config.transforms = vec![TransformRule {
            files: vec!["**/*.js".to_string()],
            pattern: "(unclosed".to_string(),
            replacement: String::new(),
        }];
        assert!(config.validate(Path::new("release.toml")).is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.layout.build_dir, PathBuf::from("build"));
        assert_eq!(config.git.default_branch, "main");
    }
}
