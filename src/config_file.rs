//! Per-run configuration file parsing — JSON / YAML / Markdown-with-
//! frontmatter, all reducible to a `RunRequest` (spec §6). This is the
//! assumed external collaborator the Create and Bulk views call into; kept
//! intentionally small, the same way the teacher keeps `github.rs` to one
//! function per remote operation rather than a general-purpose library.

use crate::model::{FileHash, RunType};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub prompt: String,
    pub repository: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "runType")]
    pub run_type: String,
    pub title: String,
    pub context: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BulkRunEntry {
    pub title: String,
    pub prompt: String,
    pub source: String,
    pub target: String,
    pub context: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    #[serde(rename = "repositoryName")]
    pub repository_name: String,
    #[serde(rename = "batchTitle")]
    pub batch_title: String,
    #[serde(rename = "runType")]
    pub run_type: String,
    #[serde(rename = "sourceBranch")]
    pub source_branch: String,
    pub force: bool,
    pub runs: Vec<BulkRunEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Json,
    Yaml,
    Markdown,
}

fn detect_format(path: &Path) -> Result<FileFormat, String> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(FileFormat::Json),
        Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
        Some("md") | Some("markdown") => Ok(FileFormat::Markdown),
        _ => Err(format!(
            "Unrecognized config file extension: {}",
            path.display()
        )),
    }
}

/// Splits a Markdown file on its `---`-delimited YAML frontmatter block.
/// The body is informational only and discarded (spec §6).
fn split_frontmatter(contents: &str) -> Result<&str, String> {
    let trimmed = contents.trim_start();
    let rest = trimmed
        .strip_prefix("---")
        .ok_or_else(|| "Markdown config is missing a frontmatter block".to_string())?;
    let end = rest
        .find("\n---")
        .ok_or_else(|| "Markdown config frontmatter is not closed".to_string())?;
    Ok(&rest[..end])
}

fn parse_value<T: for<'de> Deserialize<'de>>(
    contents: &str,
    format: FileFormat,
) -> Result<T, String> {
    match format {
        FileFormat::Json => {
            serde_json::from_str(contents).map_err(|e| format!("Invalid JSON config: {e}"))
        }
        FileFormat::Yaml => {
            serde_yaml::from_str(contents).map_err(|e| format!("Invalid YAML config: {e}"))
        }
        FileFormat::Markdown => {
            let frontmatter = split_frontmatter(contents)?;
            serde_yaml::from_str(frontmatter)
                .map_err(|e| format!("Invalid Markdown frontmatter: {e}"))
        }
    }
}

pub fn parse_run_config(path: &Path) -> Result<RunConfig, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let format = detect_format(path)?;
    parse_value(&contents, format)
}

pub fn parse_bulk_config(path: &Path) -> Result<BulkConfig, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let format = detect_format(path)?;
    parse_value(&contents, format)
}

pub fn hash_file(path: &Path) -> Result<FileHash, String> {
    let bytes = std::fs::read(path).map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Slug generation used by Create view defaulting (spec §4.7): lowercase,
/// non-alphanumerics collapsed to single hyphens, prefixed with
/// `repobird/`.
pub fn target_slug(seed: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;
    for ch in seed.to_ascii_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("run");
    }
    format!("repobird/{slug}")
}

pub fn run_type_or_default(s: &str) -> RunType {
    if s.is_empty() {
        RunType::Run
    } else {
        RunType::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_config() {
        let dir = std::env::temp_dir();
        let path = dir.join("repobird-test-config.json");
        std::fs::write(
            &path,
            r#"{"prompt":"fix the bug","repository":"acme/widgets","files":["a.rs"]}"#,
        )
        .unwrap();
        let cfg = parse_run_config(&path).expect("parses");
        assert_eq!(cfg.prompt, "fix the bug");
        assert_eq!(cfg.repository, "acme/widgets");
        assert_eq!(cfg.files, vec!["a.rs".to_string()]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn parses_yaml_config() {
        let dir = std::env::temp_dir();
        let path = dir.join("repobird-test-config.yaml");
        std::fs::write(&path, "prompt: |\n  multi\n  line\nrepository: acme/widgets\n").unwrap();
        let cfg = parse_run_config(&path).expect("parses");
        assert!(cfg.prompt.contains("multi"));
        assert_eq!(cfg.repository, "acme/widgets");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn parses_markdown_frontmatter_config() {
        let dir = std::env::temp_dir();
        let path = dir.join("repobird-test-config.md");
        std::fs::write(
            &path,
            "---\nprompt: do it\nrepository: acme/widgets\n---\n\nBody is informational.\n",
        )
        .unwrap();
        let cfg = parse_run_config(&path).expect("parses");
        assert_eq!(cfg.prompt, "do it");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn rejects_markdown_without_closed_frontmatter() {
        let dir = std::env::temp_dir();
        let path = dir.join("repobird-test-config-bad.md");
        std::fs::write(&path, "---\nprompt: nope\n").unwrap();
        assert!(parse_run_config(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn target_slug_is_stable_and_prefixed() {
        assert_eq!(target_slug("Fix the Login Bug!!"), "repobird/fix-the-login-bug");
        assert_eq!(target_slug(""), "repobird/run");
    }
}
