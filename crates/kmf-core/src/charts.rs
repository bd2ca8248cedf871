//! Index of Helm charts exported from release storage

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

/// namespace -> release name -> chart directory
///
/// Namespaces keep the order they were exported in; releases within a
/// namespace are ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelmReleaseIndex {
    entries: IndexMap<String, BTreeMap<String, PathBuf>>,
}

impl HelmReleaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an exported chart, replacing any earlier path for the same release
    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        release: impl Into<String>,
        path: impl Into<PathBuf>,
    ) {
        self.entries
            .entry(namespace.into())
            .or_default()
            .insert(release.into(), path.into());
    }

    pub fn get(&self, namespace: &str, release: &str) -> Option<&Path> {
        self.entries
            .get(namespace)
            .and_then(|releases| releases.get(release))
            .map(PathBuf::as_path)
    }

    /// Releases of one namespace, ordered by name
    pub fn releases_in<'a>(&'a self, namespace: &str) -> impl Iterator<Item = (&'a str, &'a Path)> {
        self.entries
            .get(namespace)
            .into_iter()
            .flat_map(|releases| releases.iter())
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Every `(namespace, release, path)` in index order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &Path)> {
        self.entries.iter().flat_map(|(namespace, releases)| {
            releases
                .iter()
                .map(move |(name, path)| (namespace.as_str(), name.as_str(), path.as_path()))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order() {
        let mut index = HelmReleaseIndex::new();
        index.insert("b", "zeta", "/charts/b/zeta");
        index.insert("b", "alpha", "/charts/b/alpha");
        index.insert("a", "web", "/charts/a/web");

        let order: Vec<(&str, &str)> = index.iter().map(|(ns, rel, _)| (ns, rel)).collect();
        assert_eq!(order, vec![("b", "alpha"), ("b", "zeta"), ("a", "web")]);
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_lookup() {
        let mut index = HelmReleaseIndex::new();
        assert!(index.is_empty());
        index.insert("a", "web", "/old");
        index.insert("a", "web", "/new");

        assert_eq!(index.get("a", "web"), Some(Path::new("/new")));
        assert_eq!(index.get("a", "db"), None);
        assert_eq!(index.releases_in("a").count(), 1);
        assert_eq!(index.releases_in("missing").count(), 0);
    }
}
