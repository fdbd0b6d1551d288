//! Per-task config file paths.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use super::TaskSet;
use crate::error::ResolveError;

/// Resolve the config file of every enabled task against
/// `config_directory` and canonicalize it.
///
/// Absolute paths are kept as they are before canonicalization.
///
/// # Errors
///
/// Returns [`ResolveError::MissingConfigFile`] for the first file that does
/// not exist.
pub fn finalize_paths(
    tasks: &TaskSet,
    config_directory: &Path,
) -> Result<IndexMap<String, PathBuf>, ResolveError> {
    let mut resolved = IndexMap::new();
    for task in tasks.values().filter(|t| t.enabled) {
        let Some(file) = task.config_file.as_deref() else {
            continue;
        };
        let joined = config_directory.join(file);
        let path = dunce::canonicalize(&joined).map_err(|_| ResolveError::MissingConfigFile {
            task: task.name.clone(),
            path: joined.display().to_string(),
        })?;
        resolved.insert(task.name.clone(), path);
    }
    Ok(resolved)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::resolver::test_support::{set, task};
    use std::fs;

    #[test]
    fn relative_paths_resolve_against_config_directory() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("conf")).unwrap();
        fs::write(tmp.path().join("conf/git.yaml"), "user: me\n").unwrap();
        let mut a = task("a", &[]);
        a.config_file = Some("conf/git.yaml".to_string());

        let files = finalize_paths(&set([a, task("b", &[])]), tmp.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(
            files["a"],
            dunce::canonicalize(tmp.path().join("conf/git.yaml")).unwrap()
        );
    }

    #[test]
    fn absolute_paths_are_kept() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("abs.yaml");
        fs::write(&file, "").unwrap();
        let mut a = task("a", &[]);
        a.config_file = Some(file.display().to_string());
        let files = finalize_paths(&set([a]), Path::new("/nonexistent")).unwrap();
        assert_eq!(files["a"], dunce::canonicalize(&file).unwrap());
    }

    #[test]
    fn missing_file_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = task("a", &[]);
        a.config_file = Some("missing.yaml".to_string());
        let err = finalize_paths(&set([a]), tmp.path()).unwrap_err();
        assert!(matches!(err, ResolveError::MissingConfigFile { ref task, .. } if task == "a"));
    }

    #[test]
    fn disabled_tasks_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let mut a = task("a", &[]);
        a.enabled = false;
        a.config_file = Some("missing.yaml".to_string());
        assert!(finalize_paths(&set([a]), tmp.path()).unwrap().is_empty());
    }
}
