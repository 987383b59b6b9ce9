//! Error types for node_release_base operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for node_release_base operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all node_release_base operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Pipeline construction and execution errors
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Version management errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Git operation errors
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// Publishing errors
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Package metadata errors
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument and external command errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid glob pattern
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// Invalid transform expression
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed; no later step ran
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        /// Id of the failing step
        step: String,
        /// Underlying cause
        #[source]
        source: Box<ReleaseError>,
    },

    /// Pipeline references a step that is not registered
    #[error("Pipeline '{pipeline}' references unknown step '{step}'")]
    UnknownStep {
        /// Pipeline name
        pipeline: String,
        /// Step name
        step: String,
    },

    /// Two steps share an id within one pipeline
    #[error("Duplicate step id '{step}' in pipeline '{pipeline}'")]
    DuplicateStep {
        /// Pipeline name
        pipeline: String,
        /// Step id
        step: String,
    },

    /// Ordering invariant broken by a pipeline definition
    #[error("Pipeline '{pipeline}' violates ordering: {reason}")]
    InvalidOrder {
        /// Pipeline name
        pipeline: String,
        /// Which invariant failed
        reason: String,
    },
}

/// Version management errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Invalid version format
    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        /// Version string
        version: String,
        /// Reason for the error
        reason: String,
    },

    /// Version parsing failed
    #[error("Failed to parse version '{version}': {source}")]
    ParseFailed {
        /// Version string
        version: String,
        /// Parsing error
        #[source]
        source: semver::Error,
    },

    /// Unknown bump kind
    #[error("Version bump '{bump}' not supported (expected patch, minor or major)")]
    UnsupportedBump {
        /// Bump type
        bump: String,
    },
}

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// Not a git repository
    #[error("Not a git repository. Please initialize git first.")]
    NotRepository,

    /// Staging failed
    #[error("Git add failed: {reason}")]
    StageFailed {
        /// Reason for the error
        reason: String,
    },

    /// Commit failed
    #[error("Git commit failed: {reason}")]
    CommitFailed {
        /// Reason for the error
        reason: String,
    },

    /// Push failed
    #[error("Git push to '{remote}/{branch}' failed: {reason}")]
    PushFailed {
        /// Remote name
        remote: String,
        /// Branch name
        branch: String,
        /// Reason for the error
        reason: String,
    },
}

/// Publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    /// Package already published
    #[error("Package '{package}' version '{version}' is already published")]
    AlreadyPublished {
        /// Package name
        package: String,
        /// Version string
        version: String,
    },

    /// Publish command failed
    #[error("npm publish failed for '{package}': {reason}")]
    PublishFailed {
        /// Package name
        package: String,
        /// Reason for the error
        reason: String,
    },

    /// Authentication error for the registry
    #[error("Authentication error: Please ensure you're logged in with 'npm login'")]
    AuthenticationError,

    /// Artifact directory missing or empty
    #[error("Nothing to publish in {path}")]
    EmptyArtifact {
        /// Publish directory
        path: PathBuf,
    },
}

/// Package metadata errors
#[derive(Error, Debug)]
pub enum PackageError {
    /// package.json missing
    #[error("No package metadata found at {path}")]
    NotFound {
        /// Expected location
        path: PathBuf,
    },

    /// package.json unreadable or not an object
    #[error("Malformed package metadata at {path}: {reason}")]
    Malformed {
        /// File path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid configuration in {path}: {reason}")]
    Invalid {
        /// Config file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command}\n{reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Program not found on PATH
    #[error("Program '{program}' not found: {reason}")]
    ProgramNotFound {
        /// Program name
        program: String,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Pipeline(PipelineError::StepFailed { source, .. }) => {
                let mut suggestions = source.recovery_suggestions();
                suggestions.push(
                    "Fix the issue and re-run the same task (clean and copy steps are idempotent)"
                        .to_string(),
                );
                suggestions
            }
            ReleaseError::Cli(CliError::MissingArgument { argument }) => vec![format!(
                "Pass {} with a commit message, e.g. node_release_base patch -m \"fix: message\"",
                argument
            )],
            ReleaseError::Cli(CliError::ProgramNotFound { program, .. }) => vec![
                format!("Install '{}' or add it to PATH", program),
                "Override the tool command in release.toml under [tools]".to_string(),
            ],
            ReleaseError::Package(PackageError::NotFound { .. }) => vec![
                "Run from the root of a Node.js package".to_string(),
                "Create one with: npm init".to_string(),
            ],
            ReleaseError::Publish(PublishError::AuthenticationError) => vec![
                "Login to the registry: npm login".to_string(),
                "Verify the token in ~/.npmrc has publish rights".to_string(),
            ],
            ReleaseError::Publish(PublishError::AlreadyPublished { .. }) => vec![
                "Bump the version again: node_release_base patch -m \"...\"".to_string(),
            ],
            ReleaseError::Git(GitError::NotRepository) => {
                vec!["Initialize a repository: git init".to_string()]
            }
            ReleaseError::Git(GitError::PushFailed { remote, branch, .. }) => vec![
                format!("Check the remote: git remote get-url {}", remote),
                format!("Pull and retry: git pull {} {}", remote, branch),
            ],
            ReleaseError::Version(VersionError::InvalidVersion { .. })
            | ReleaseError::Version(VersionError::ParseFailed { .. }) => vec![
                "Set a MAJOR.MINOR.PATCH version in package.json".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Id of the failing step, when this error came out of a pipeline run
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            ReleaseError::Pipeline(PipelineError::StepFailed { step, .. }) => Some(step),
            _ => None,
        }
    }
}
