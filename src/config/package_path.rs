//! Resolution of `package://<name>/<relative>` references.
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

/// Environment variable listing directories that contain packages.
pub const PACKAGE_PATH_ENV: &str = "PROVISION_PACKAGE_PATH";

#[allow(clippy::expect_used)]
static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^package://([^/]+)/(.*)$").expect("package path pattern is valid")
});

/// Locates installed packages on the filesystem.
#[cfg_attr(test, mockall::automock)]
pub trait PackageLocator: Send + Sync {
    /// Root directory of `package`, if it is installed.
    fn locate(&self, package: &str) -> Option<PathBuf>;
}

/// Looks packages up as sub-directories of a list of search directories.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    dirs: Vec<PathBuf>,
}

impl SearchPathLocator {
    /// Search exactly `dirs`, in order.
    #[must_use]
    pub const fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Search the directories listed in `PROVISION_PACKAGE_PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        let dirs = std::env::var_os(PACKAGE_PATH_ENV)
            .map(|v| std::env::split_paths(&v).collect())
            .unwrap_or_default();
        Self { dirs }
    }
}

impl PackageLocator for SearchPathLocator {
    fn locate(&self, package: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(package))
            .find(|candidate| candidate.is_dir())
    }
}

/// Resolve a string that may reference a package resource.
///
/// `package://<name>/<rest>` becomes `<package root>/<rest>`, or `None` when
/// the package cannot be located. A leading `~` is expanded to the home
/// directory. Any other string is returned unchanged.
pub fn resolve(raw: &str, locator: &dyn PackageLocator) -> Option<String> {
    if let Some(caps) = PACKAGE_RE.captures(raw) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let rel = caps.get(2).map_or("", |m| m.as_str());
        let root = locator.locate(name)?;
        return Some(root.join(rel).to_string_lossy().into_owned());
    }
    Some(expand_home(raw))
}

fn expand_home(raw: &str) -> String {
    let rest = if raw == "~" {
        ""
    } else if let Some(rest) = raw.strip_prefix("~/") {
        rest
    } else {
        return raw.to_string();
    };
    match std::env::var_os("HOME") {
        Some(home) if rest.is_empty() => PathBuf::from(home).to_string_lossy().into_owned(),
        Some(home) => PathBuf::from(home).join(rest).to_string_lossy().into_owned(),
        None => raw.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn package_path_resolves_against_locator() {
        let mut locator = MockPackageLocator::new();
        locator
            .expect_locate()
            .with(eq("tools"))
            .returning(|_| Some(PathBuf::from("/opt/pkgs/tools")));
        assert_eq!(
            resolve("package://tools/scripts/install.bash", &locator).as_deref(),
            Some("/opt/pkgs/tools/scripts/install.bash")
        );
    }

    #[test]
    fn unknown_package_is_unresolvable() {
        let mut locator = MockPackageLocator::new();
        locator.expect_locate().returning(|_| None);
        assert_eq!(resolve("package://missing/x.py", &locator), None);
    }

    #[test]
    fn plain_strings_pass_through() {
        let locator = SearchPathLocator::default();
        assert_eq!(
            resolve("--opt", &locator).as_deref(),
            Some("--opt")
        );
        assert_eq!(
            resolve("https://example.com/a", &locator).as_deref(),
            Some("https://example.com/a")
        );
    }

    #[test]
    fn package_without_relative_part_is_not_a_package_path() {
        let locator = SearchPathLocator::default();
        assert_eq!(
            resolve("package://tools", &locator).as_deref(),
            Some("package://tools")
        );
    }

    #[test]
    fn search_path_locator_finds_directories() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("tools")).unwrap();
        std::fs::write(tmp.path().join("file-not-dir"), "").unwrap();
        let locator = SearchPathLocator::new(vec![
            tmp.path().join("nonexistent"),
            tmp.path().to_path_buf(),
        ]);
        assert_eq!(locator.locate("tools"), Some(tmp.path().join("tools")));
        assert_eq!(locator.locate("file-not-dir"), None);
    }

    #[test]
    fn tilde_is_expanded() {
        let Some(home) = std::env::var_os("HOME") else {
            return;
        };
        let locator = SearchPathLocator::default();
        let expected = PathBuf::from(home).join("x.yaml");
        assert_eq!(
            resolve("~/x.yaml", &locator),
            Some(expected.to_string_lossy().into_owned())
        );
    }
}
