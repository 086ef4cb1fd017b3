//! Source tree walk
//!
//! Finds page-object source files under a root, skipping build, dependency and
//! version-control directories.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::MiningSettings;

/// Directory name fragments that mark a folder of screen models
const SCREEN_DIR_MARKERS: &[&str] = &["screens", "pages"];
/// File stem suffixes that mark a screen model
const SCREEN_FILE_SUFFIXES: &[&str] = &["Screen", "Page"];

/// A candidate file for extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the scanned root, with `/` separators
    pub relative_path: String,
}

/// Files found plus entries that could not be read
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<SourceFile>,
    pub errors: Vec<String>,
}

fn is_excluded_dir(entry: &DirEntry, excluded: &[String]) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excluded.iter().any(|e| e == name))
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a file models a UI screen, judged from its name and location
pub fn is_screen_model(relative_path: &str) -> bool {
    let mut components: Vec<&str> = relative_path.split('/').collect();
    let Some(file_name) = components.pop() else {
        return false;
    };
    let stem = file_name.split('.').next().unwrap_or(file_name);

    if SCREEN_FILE_SUFFIXES.iter().any(|s| stem.ends_with(s)) {
        return true;
    }
    components.iter().any(|dir| {
        let dir = dir.to_lowercase();
        SCREEN_DIR_MARKERS.iter().any(|m| dir.contains(m))
    })
}

/// Walk `root` and collect eligible source files in file-name order
pub fn scan(root: &Path, settings: &MiningSettings) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_excluded_dir(entry, &settings.excluded_dirs));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                outcome.errors.push(format!("walk error: {}", e));
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let has_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| settings.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)));
        if !has_extension {
            continue;
        }

        let relative_path = relative(root, path);
        if !is_screen_model(&relative_path) {
            continue;
        }

        match entry.metadata() {
            Ok(metadata) if metadata.len() > settings.max_file_bytes => {
                debug!(file = %relative_path, size = metadata.len(), "skipping oversized file");
                continue;
            }
            Ok(_) => {}
            Err(e) => {
                outcome.errors.push(format!("{}: {}", relative_path, e));
                continue;
            }
        }

        outcome.files.push(SourceFile {
            path: path.to_path_buf(),
            relative_path,
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "class X {}").unwrap();
    }

    #[test]
    fn test_is_screen_model() {
        assert!(is_screen_model("src/PlayerScreen.java"));
        assert!(is_screen_model("src/LoginPage.kt"));
        assert!(is_screen_model("ctvscreens/pplus/Helpers.java"));
        assert!(!is_screen_model("src/util/StringUtils.java"));
        assert!(!is_screen_model("src/Screenshot.java"));
    }

    #[test]
    fn test_scan_filters_and_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "ctvscreens/pplus/PlayerScreen.java");
        touch(root, "mobile/LoginPage.kt");
        touch(root, "mobile/LoginPage.txt");
        touch(root, "util/StringUtils.java");
        touch(root, "build/generated/HomeScreen.java");
        touch(root, "node_modules/x/SearchPage.java");

        let outcome = scan(root, &MiningSettings::default());
        let found: Vec<_> = outcome.files.iter().map(|f| f.relative_path.as_str()).collect();

        assert_eq!(found, vec!["ctvscreens/pplus/PlayerScreen.java", "mobile/LoginPage.kt"]);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_oversized_files_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "PlayerScreen.java");

        let settings = MiningSettings {
            max_file_bytes: 1,
            ..MiningSettings::default()
        };
        assert!(scan(dir.path(), &settings).files.is_empty());
    }
}
