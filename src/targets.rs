//! Scan target loading.
//!
//! Targets come from bug bounty program exports: each JSON document is a
//! list of programs, and each program carries a `targets.in_scope` list of
//! entries with a name, a type and a URI.
//! Only entry types that map to something a web scanner can probe are kept;
//! hardware, mobile apps and the like are silently skipped, as are entries
//! without a URI.
//!
//! [`load_targets`] accepts either a single JSON file or a directory of
//! them, in which case the files are read in name order so runs over the
//! same data set enumerate targets deterministically.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::core::ScanError;

/// Category of an in-scope target entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// An HTTP API endpoint.
    Api,
    /// A website.
    Website,
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Website => write!(f, "website"),
        }
    }
}

impl FromStr for TargetType {
    type Err = UnsupportedTargetType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api" => Ok(Self::Api),
            "website" => Ok(Self::Website),
            _ => Err(UnsupportedTargetType),
        }
    }
}

/// Marker error for target types a web scanner cannot probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnsupportedTargetType;

/// A single scannable target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Display name from the program export.
    pub name: String,
    /// What kind of endpoint this is.
    pub kind: TargetType,
    /// The URI to hand to the scanner.
    pub resource: String,
}

#[derive(Debug, Deserialize)]
struct RawProgram {
    targets: RawTargets,
}

#[derive(Debug, Deserialize)]
struct RawTargets {
    in_scope: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    uri: String,
}

/// Loads targets from a JSON file or a directory of JSON files.
///
/// Directories are traversed non-recursively and only `.json` files are
/// read, in lexicographic name order. Entries whose type is not scannable
/// or whose URI is empty are skipped with a debug log line.
pub fn load_targets(path: &Path) -> Result<Vec<Target>, ScanError> {
    if !path.exists() {
        return Err(ScanError::TargetPathMissing {
            path: path.to_path_buf(),
        });
    }

    let mut files = Vec::new();
    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file = entry.path();
            if file.extension().is_some_and(|ext| ext == "json") {
                files.push(file);
            }
        }
        files.sort();
    } else {
        files.push(path.to_path_buf());
    }

    let mut targets = Vec::new();
    for file in &files {
        targets.extend(load_file(file)?);
    }
    tracing::info!(count = targets.len(), path = %path.display(), "loaded scan targets");
    Ok(targets)
}

fn load_file(path: &Path) -> Result<Vec<Target>, ScanError> {
    let text = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|err| ScanError::malformed_targets(path, err.to_string()))?;

    // Parse via Value first so a top-level shape mismatch reports what was
    // found instead of a byte offset.
    if !value.is_array() {
        return Err(ScanError::malformed_targets(
            path,
            "expected a JSON list of programs at the top level",
        ));
    }
    let programs: Vec<RawProgram> = serde_json::from_value(value)
        .map_err(|err| ScanError::malformed_targets(path, err.to_string()))?;

    let mut targets = Vec::new();
    for program in programs {
        for raw in program.targets.in_scope {
            let Ok(kind) = raw.kind.parse::<TargetType>() else {
                tracing::debug!(name = %raw.name, kind = %raw.kind, "skipping non-scannable target");
                continue;
            };
            if raw.uri.is_empty() {
                tracing::debug!(name = %raw.name, "skipping target without a uri");
                continue;
            }
            targets.push(Target {
                name: raw.name,
                kind,
                resource: raw.uri,
            });
        }
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const PROGRAMS: &str = r#"[
        {
            "targets": {
                "in_scope": [
                    {"name": "Main site", "type": "website", "uri": "https://example.com"},
                    {"name": "API", "type": "api", "uri": "https://api.example.com"},
                    {"name": "Android app", "type": "android", "uri": "https://play.example.com"},
                    {"name": "Nameless", "type": "website", "uri": ""}
                ]
            }
        },
        {
            "targets": {
                "in_scope": [
                    {"name": "Sister site", "type": "website", "uri": "https://sister.example.com"}
                ]
            }
        }
    ]"#;

    #[test]
    fn test_load_programs_from_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "programs.json", PROGRAMS);

        let targets = load_targets(&path).unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].name, "Main site");
        assert_eq!(targets[0].kind, TargetType::Website);
        assert_eq!(targets[0].resource, "https://example.com");
        assert_eq!(targets[1].kind, TargetType::Api);
        // Targets from every program in the list are collected.
        assert_eq!(targets[2].name, "Sister site");
    }

    #[test]
    fn test_load_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "b.json",
            r#"[{"targets": {"in_scope": [
                {"name": "second", "type": "website", "uri": "https://b.example.com"}
            ]}}]"#,
        );
        write_file(
            dir.path(),
            "a.json",
            r#"[{"targets": {"in_scope": [
                {"name": "first", "type": "website", "uri": "https://a.example.com"}
            ]}}]"#,
        );
        write_file(dir.path(), "notes.txt", "not a program export");

        let targets = load_targets(dir.path()).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].name, "first");
        assert_eq!(targets[1].name, "second");
    }

    #[test]
    fn test_load_directory_skips_json_named_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("archive.json")).unwrap();
        write_file(
            dir.path(),
            "a.json",
            r#"[{"targets": {"in_scope": [
                {"name": "only", "type": "website", "uri": "https://a.example.com"}
            ]}}]"#,
        );

        let targets = load_targets(dir.path()).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "only");
    }

    #[test]
    fn test_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_targets(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(ScanError::TargetPathMissing { .. })));
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "broken.json", "{not json");
        let result = load_targets(&path);
        assert!(matches!(result, Err(ScanError::MalformedTargets { .. })));
    }

    #[test]
    fn test_wrong_top_level_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            dir.path(),
            "object.json",
            r#"{"targets": {"in_scope": []}}"#,
        );
        let err = load_targets(&path).unwrap_err();
        assert!(err.to_string().contains("expected a JSON list"));
    }

    #[test]
    fn test_missing_in_scope_section() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "empty.json", r#"[{"targets": {}}]"#);
        let result = load_targets(&path);
        assert!(matches!(result, Err(ScanError::MalformedTargets { .. })));
    }
}
