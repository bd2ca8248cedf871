//! Run configuration, built once and passed by reference

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::image::RegistryClass;
use crate::kind::{Kind, KindSelector};
use crate::namespace::{NamespaceSpec, DEFAULT_RESERVED_NAMESPACES};

/// What replication does on the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    #[default]
    Deploy,
    Delete,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deploy" | "apply" => Ok(Action::Deploy),
            "delete" => Ok(Action::Delete),
            other => Err(format!("unknown action '{}' (expected deploy or delete)", other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Deploy => f.write_str("deploy"),
            Action::Delete => f.write_str("delete"),
        }
    }
}

/// Objects dropped during collection, by kind and `(namespace, name)`
///
/// Cluster-scoped objects use an empty namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    entries: BTreeMap<Kind, BTreeSet<(String, String)>>,
}

const IGNORED_SERVICES: &[(&str, &str)] = &[
    ("default", "kubernetes"),
    ("kube-system", "default-http-backend"),
    ("kube-system", "kube-dns"),
    ("kube-system", "metrics-server"),
];

const IGNORED_DEPLOYMENTS: &[&str] = &[
    "event-exporter-gke",
    "fluentd-gke-scaler",
    "kube-dns",
    "kube-dns-autoscaler",
    "l7-default-backend",
    "metrics-server-v0.3.6",
    "stackdriver-metadata-agent-cluster-level",
];

const IGNORED_DAEMONSETS: &[&str] = &[
    "fluentd-gke",
    "gke-metrics-agent",
    "gke-metrics-agent-windows",
    "kube-proxy",
    "metadata-proxy-v0.1",
    "nvidia-gpu-device-plugin",
    "prometheus-to-sd",
];

impl IgnoreList {
    /// An ignore list with nothing in it
    pub fn empty() -> Self {
        Self::default()
    }

    /// Managed-cluster system objects that must not be copied
    pub fn defaults() -> Self {
        let mut list = Self::empty();
        for (namespace, name) in IGNORED_SERVICES {
            list.add(Kind::Service, namespace, name);
        }
        for name in IGNORED_DEPLOYMENTS {
            list.add(Kind::Deployment, "kube-system", name);
        }
        for name in IGNORED_DAEMONSETS {
            list.add(Kind::DaemonSet, "kube-system", name);
        }
        list
    }

    pub fn add(&mut self, kind: Kind, namespace: &str, name: &str) {
        self.entries
            .entry(kind)
            .or_default()
            .insert((namespace.to_string(), name.to_string()));
    }

    pub fn is_ignored(&self, kind: Kind, namespace: Option<&str>, name: &str) -> bool {
        self.entries.get(&kind).is_some_and(|set| {
            set.contains(&(namespace.unwrap_or_default().to_string(), name.to_string()))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which third-party registries get their images copied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorSettings {
    pub registries: BTreeSet<RegistryClass>,
    /// Override for the private registry region
    pub region: Option<String>,
}

impl MirrorSettings {
    /// Parse a comma separated allow-list such as `gcr,dockerhub`
    pub fn parse(raw: &str) -> Result<Self> {
        let registries = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(RegistryClass::from_short_name)
            .collect::<Result<BTreeSet<_>>>()?;
        if registries.is_empty() {
            return Err(CoreError::UnknownRegistry {
                name: raw.to_string(),
            });
        }
        Ok(Self {
            registries,
            region: None,
        })
    }

    pub fn allows(&self, class: RegistryClass) -> bool {
        class != RegistryClass::Other && self.registries.contains(&class)
    }
}

/// Everything a migration run is configured with
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub namespaces: NamespaceSpec,
    pub kinds: KindSelector,
    pub reserved_namespaces: Vec<String>,
    pub ignore: IgnoreList,
    /// Where Helm charts are exported; `None` skips chart export
    pub chart_root: Option<PathBuf>,
    /// `None` leaves image references untouched
    pub mirror: Option<MirrorSettings>,
    pub action: Action,
}

impl MigrationSettings {
    pub fn new(namespaces: NamespaceSpec, kinds: KindSelector) -> Self {
        Self {
            namespaces,
            kinds,
            reserved_namespaces: DEFAULT_RESERVED_NAMESPACES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignore: IgnoreList::defaults(),
            chart_root: None,
            mirror: None,
            action: Action::Deploy,
        }
    }

    pub fn with_chart_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.chart_root = Some(root.into());
        self
    }

    pub fn with_mirror(mut self, mirror: MirrorSettings) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreList) -> Self {
        self.ignore = ignore;
        self
    }

    /// Extra reserved namespaces on top of the defaults
    pub fn with_reserved(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        for name in extra {
            if !self.reserved_namespaces.contains(&name) {
                self.reserved_namespaces.push(name);
            }
        }
        self
    }

    pub fn is_reserved(&self, namespace: &str) -> bool {
        self.reserved_namespaces.iter().any(|r| r == namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!("Deploy".parse::<Action>().unwrap(), Action::Deploy);
        assert_eq!("delete".parse::<Action>().unwrap(), Action::Delete);
        assert!("destroy".parse::<Action>().is_err());
    }

    #[test]
    fn test_default_ignore_list() {
        let ignore = IgnoreList::defaults();
        assert!(ignore.is_ignored(Kind::Service, Some("default"), "kubernetes"));
        assert!(ignore.is_ignored(Kind::DaemonSet, Some("kube-system"), "kube-proxy"));
        assert!(ignore.is_ignored(Kind::Deployment, Some("kube-system"), "kube-dns"));
        assert!(!ignore.is_ignored(Kind::Service, Some("shop"), "kubernetes"));
        assert!(!ignore.is_ignored(Kind::ConfigMap, Some("default"), "kubernetes"));
        assert_eq!(ignore.len(), 18);
    }

    #[test]
    fn test_cluster_scoped_ignore() {
        let mut ignore = IgnoreList::empty();
        ignore.add(Kind::StorageClass, "", "standard");
        assert!(ignore.is_ignored(Kind::StorageClass, None, "standard"));
    }

    #[test]
    fn test_mirror_settings() {
        let mirror = MirrorSettings::parse("gcr, gitlab").unwrap();
        assert!(mirror.allows(RegistryClass::Gcr));
        assert!(mirror.allows(RegistryClass::Gitlab));
        assert!(!mirror.allows(RegistryClass::DockerHub));
        assert!(!mirror.allows(RegistryClass::Other));
        assert!(MirrorSettings::parse("quay").is_err());
        assert!(MirrorSettings::parse(" ").is_err());
    }

    #[test]
    fn test_settings_defaults() {
        let settings = MigrationSettings::new(NamespaceSpec::All, KindSelector::All)
            .with_reserved(vec!["istio-system".to_string(), "kube-system".to_string()]);
        assert!(settings.is_reserved("kube-public"));
        assert!(settings.is_reserved("istio-system"));
        assert_eq!(settings.reserved_namespaces.len(), 4);
        assert_eq!(settings.action, Action::Deploy);
        assert!(settings.chart_root.is_none());
    }
}
