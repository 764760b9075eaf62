use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::util::strip_trailing_separator;

/// Ordered, duplicate-free collection of the source directories picked so far.
///
/// Two paths are the same entry only when their normalized text is identical
/// (one trailing separator stripped). Symlinks and `.`/`..` segments are not
/// resolved, so `/a/docs` and `/a/./docs` are kept as two entries.
#[derive(Debug, Default, Clone)]
pub struct PathSet {
    paths: Vec<PathBuf>,
}

impl PathSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already present. Returns whether it was added.
    pub fn add<P: AsRef<Path>>(&mut self, path: P) -> bool {
        let normalized = strip_trailing_separator(path.as_ref());
        if self.contains(&normalized) {
            return false;
        }
        self.paths.push(normalized);
        true
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        let normalized = strip_trailing_separator(path.as_ref());
        self.paths.iter().any(|p| p.as_os_str() == normalized.as_os_str())
    }

    /// Remove every entry that appears in `paths`; returns how many were removed.
    /// Survivors keep their relative order.
    pub fn remove_all<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let doomed: HashSet<OsString> = paths
            .into_iter()
            .map(|p| strip_trailing_separator(p.as_ref()).into_os_string())
            .collect();
        let before = self.paths.len();
        self.paths.retain(|p| !doomed.contains(p.as_os_str()));
        before - self.paths.len()
    }

    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Current entries in insertion order. The iterator borrows the set and can
    /// be cloned to walk it again.
    pub fn list(&self) -> impl Iterator<Item = &Path> + Clone {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Most recently added entry, used as the parent for the subfolder picker.
    pub fn last(&self) -> Option<&Path> {
        self.paths.last().map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(set: &PathSet) -> Vec<String> {
        set.list().map(|p| p.display().to_string()).collect()
    }

    #[test]
    fn add_rejects_duplicates_and_keeps_order() {
        let mut set = PathSet::new();
        assert!(set.add("/a/docs"));
        assert!(set.add("/a/proj"));
        assert!(!set.add("/a/docs"));
        assert!(set.add("/b"));
        assert!(!set.add("/a/proj"));
        assert_eq!(collect(&set), vec!["/a/docs", "/a/proj", "/b"]);
        assert_eq!(set.count(), 3);
    }

    #[test]
    fn trailing_separator_does_not_make_a_new_entry() {
        let mut set = PathSet::new();
        assert!(set.add("/a/docs/"));
        assert!(!set.add("/a/docs"));
        assert!(set.contains("/a/docs/"));
        assert_eq!(collect(&set), vec!["/a/docs"]);
    }

    #[test]
    fn textual_variants_stay_distinct() {
        let mut set = PathSet::new();
        assert!(set.add("/a/docs"));
        assert!(set.add("/a/./docs"));
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn remove_all_keeps_survivor_order() {
        let mut set = PathSet::new();
        for p in ["/1", "/2", "/3", "/4", "/5"] {
            set.add(p);
        }
        let removed = set.remove_all(["/2", "/4"]);
        assert_eq!(removed, 2);
        assert_eq!(set.count(), 3);
        assert_eq!(collect(&set), vec!["/1", "/3", "/5"]);
    }

    #[test]
    fn remove_all_ignores_unknown_paths() {
        let mut set = PathSet::new();
        set.add("/1");
        assert_eq!(set.remove_all(["/nope"]), 0);
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn clear_always_empties() {
        let mut set = PathSet::new();
        set.clear();
        assert_eq!(set.count(), 0);
        set.add("/x");
        set.add("/y");
        set.clear();
        assert_eq!(set.count(), 0);
        assert!(set.last().is_none());
    }

    #[test]
    fn list_is_restartable() {
        let mut set = PathSet::new();
        set.add("/x");
        set.add("/y");
        let it = set.list();
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
        assert_eq!(set.last(), Some(Path::new("/y")));
    }
}
