//! File system helpers for the clean, copy and transform steps.
//!
//! All of them are idempotent: removing an absent directory succeeds, copies
//! overwrite, and a glob with no matches copies nothing.

use crate::config::TransformRule;
use crate::error::Result;
use anyhow::Context;
use glob::{MatchOptions, Pattern};
use regex::Regex;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Removes the directory and its contents if it exists.
///
/// Returns whether anything was removed.
pub async fn remove_dir_all(path: &Path) -> Result<bool> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Creates all of the directories of the specified path; existing directories are fine.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    match fs::create_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Copies a regular file, creating any parent directories of the destination.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(dest_dir) = to.parent() {
        ensure_dir(dest_dir).await?;
    }
    fs::copy(from, to)
        .await
        .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
    Ok(())
}

/// Files under `base` matching any of `include` and none of `exclude`,
/// as paths relative to `base`, sorted and without duplicates.
pub fn match_files(base: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let excluded: Vec<Pattern> = exclude
        .iter()
        .map(|p| Pattern::new(p))
        .collect::<std::result::Result<_, _>>()?;
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let escaped_base = Pattern::escape(&base.to_string_lossy());
    let mut matched = BTreeSet::new();

    for pattern in include {
        let full = format!("{}/{}", escaped_base.trim_end_matches('/'), pattern);
        for entry in glob::glob_with(&full, options)? {
            let path = entry.map_err(glob::GlobError::into_error)?;
            if !path.is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(base) else {
                continue;
            };
            if excluded.iter().any(|p| p.matches_path_with(relative, options)) {
                continue;
            }
            matched.insert(relative.to_path_buf());
        }
    }

    Ok(matched.into_iter().collect())
}

/// Copies files matching `include` (minus `exclude`) from `base` into `dest`,
/// preserving their paths relative to `base`. Returns the number copied.
pub async fn copy_globs(
    base: &Path,
    include: &[String],
    exclude: &[String],
    dest: &Path,
) -> Result<usize> {
    let files = match_files(base, include, exclude)?;
    if files.is_empty() {
        log::debug!("No files matched {:?} under {}", include, base.display());
        return Ok(0);
    }
    for relative in &files {
        copy_file(&base.join(relative), &dest.join(relative)).await?;
        log::debug!("Copied {}", relative.display());
    }
    Ok(files.len())
}

/// Result of applying transform rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    /// Files rewritten
    pub changed: usize,
    /// Files left alone because they could not be read as text
    pub skipped: usize,
}

/// Applies each rule in place to the files under `base` it selects.
///
/// Files that are not valid UTF-8 are skipped.
pub async fn transform_globs(base: &Path, rules: &[TransformRule]) -> Result<TransformStats> {
    let mut stats = TransformStats::default();
    for rule in rules {
        let regex = Regex::new(&rule.pattern)?;
        for relative in match_files(base, &rule.files, &[])? {
            let path = base.join(&relative);
            let bytes = fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let Ok(text) = String::from_utf8(bytes) else {
                log::debug!("Skipping non-text file {}", relative.display());
                stats.skipped += 1;
                continue;
            };
            let rewritten = regex.replace_all(&text, rule.replacement.as_str());
            if rewritten != text {
                fs::write(&path, rewritten.as_bytes())
                    .await
                    .with_context(|| format!("Failed to rewrite {}", path.display()))?;
                stats.changed += 1;
            }
        }
    }
    Ok(stats)
}

/// All regular files under `dir`, relative to it and sorted; empty when `dir` is absent.
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file()
            && let Ok(relative) = entry.path().strip_prefix(dir)
        {
            files.push(relative.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_remove_missing_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_dir_all(&dir.path().join("nope")).await.unwrap());
        write(dir.path(), "build/a/b.js", "x");
        assert!(remove_dir_all(&dir.path().join("build")).await.unwrap());
        assert!(!dir.path().join("build").exists());
    }

    #[tokio::test]
    async fn test_ensure_dir_twice() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b");
        ensure_dir(&target).await.unwrap();
        ensure_dir(&target).await.unwrap();
        assert!(target.is_dir());
    }

    #[tokio::test]
    async fn test_copy_preserves_structure_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "build/index.js", "a");
        write(root, "build/util/strings.js", "b");
        write(root, "build/util/strings.d.ts", "c");
        write(root, "build/test/index.test.js", "d");
        write(root, "build/notes.md", "e");

        let copied = copy_globs(
            &root.join("build"),
            &strings(&["**/*.js", "**/*.d.ts"]),
            &strings(&["test/**"]),
            &root.join("publish"),
        )
        .await
        .unwrap();

        assert_eq!(copied, 3);
        assert_eq!(
            list_files(&root.join("publish")).unwrap(),
            vec![
                PathBuf::from("index.js"),
                PathBuf::from("util/strings.d.ts"),
                PathBuf::from("util/strings.js"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_source_copies_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let copied = copy_globs(
            &dir.path().join("does-not-exist"),
            &strings(&["**/*.json"]),
            &[],
            &dir.path().join("out"),
        )
        .await
        .unwrap();
        assert_eq!(copied, 0);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_overlapping_patterns_match_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.json", "{}");
        let files = match_files(dir.path(), &strings(&["*.json", "**/*.json"]), &[]).unwrap();
        assert_eq!(files, vec![PathBuf::from("a.json")]);
    }

    #[tokio::test]
    async fn test_transform_rewrites_text_and_skips_binary() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "index.js", "export const a = 1;\n//# sourceMappingURL=index.js.map\n");
        write(root, "clean.js", "export const b = 2;\n");
        std::fs::write(root.join("blob.js"), [0xff_u8, 0xfe, 0x00]).unwrap();

        let stats = transform_globs(root, &crate::config::default_transforms())
            .await
            .unwrap();

        assert_eq!(stats, TransformStats { changed: 1, skipped: 1 });
        assert_eq!(
            std::fs::read_to_string(root.join("index.js")).unwrap(),
            "export const a = 1;\n"
        );
        assert_eq!(std::fs::read(root.join("blob.js")).unwrap(), vec![0xff, 0xfe, 0x00]);
    }
}
