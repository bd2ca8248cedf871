//! The fixed set of object kinds a migration understands

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A category of cluster object that kmf can collect and replicate
///
/// The declaration order is the inventory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Namespace,
    Deployment,
    DaemonSet,
    Service,
    Secret,
    ConfigMap,
    Ingress,
    StorageClass,
    PersistentVolumeClaim,
    Job,
    CronJob,
    Role,
    RoleBinding,
    ClusterRole,
    ClusterRoleBinding,
    HorizontalPodAutoscaler,
    PodSecurityPolicy,
    ServiceAccount,
    MutatingWebhookConfiguration,
    ValidatingWebhookConfiguration,
}

impl Kind {
    /// Every kind, in inventory order
    pub const ALL: [Kind; 20] = [
        Kind::Namespace,
        Kind::Deployment,
        Kind::DaemonSet,
        Kind::Service,
        Kind::Secret,
        Kind::ConfigMap,
        Kind::Ingress,
        Kind::StorageClass,
        Kind::PersistentVolumeClaim,
        Kind::Job,
        Kind::CronJob,
        Kind::Role,
        Kind::RoleBinding,
        Kind::ClusterRole,
        Kind::ClusterRoleBinding,
        Kind::HorizontalPodAutoscaler,
        Kind::PodSecurityPolicy,
        Kind::ServiceAccount,
        Kind::MutatingWebhookConfiguration,
        Kind::ValidatingWebhookConfiguration,
    ];

    /// The API kind name (e.g. `Deployment`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Namespace => "Namespace",
            Kind::Deployment => "Deployment",
            Kind::DaemonSet => "DaemonSet",
            Kind::Service => "Service",
            Kind::Secret => "Secret",
            Kind::ConfigMap => "ConfigMap",
            Kind::Ingress => "Ingress",
            Kind::StorageClass => "StorageClass",
            Kind::PersistentVolumeClaim => "PersistentVolumeClaim",
            Kind::Job => "Job",
            Kind::CronJob => "CronJob",
            Kind::Role => "Role",
            Kind::RoleBinding => "RoleBinding",
            Kind::ClusterRole => "ClusterRole",
            Kind::ClusterRoleBinding => "ClusterRoleBinding",
            Kind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            Kind::PodSecurityPolicy => "PodSecurityPolicy",
            Kind::ServiceAccount => "ServiceAccount",
            Kind::MutatingWebhookConfiguration => "MutatingWebhookConfiguration",
            Kind::ValidatingWebhookConfiguration => "ValidatingWebhookConfiguration",
        }
    }

    /// API group (empty for the core group)
    pub fn group(&self) -> &'static str {
        match self {
            Kind::Namespace
            | Kind::Service
            | Kind::Secret
            | Kind::ConfigMap
            | Kind::PersistentVolumeClaim
            | Kind::ServiceAccount => "",
            Kind::Deployment | Kind::DaemonSet => "apps",
            Kind::Ingress => "networking.k8s.io",
            Kind::StorageClass => "storage.k8s.io",
            Kind::Job | Kind::CronJob => "batch",
            Kind::Role | Kind::RoleBinding | Kind::ClusterRole | Kind::ClusterRoleBinding => {
                "rbac.authorization.k8s.io"
            }
            Kind::HorizontalPodAutoscaler => "autoscaling",
            Kind::PodSecurityPolicy => "policy",
            Kind::MutatingWebhookConfiguration | Kind::ValidatingWebhookConfiguration => {
                "admissionregistration.k8s.io"
            }
        }
    }

    /// API version within the group
    pub fn version(&self) -> &'static str {
        match self {
            Kind::PodSecurityPolicy => "v1beta1",
            _ => "v1",
        }
    }

    /// `apiVersion` as it appears in manifests
    pub fn api_version(&self) -> String {
        match self.group() {
            "" => self.version().to_string(),
            group => format!("{}/{}", group, self.version()),
        }
    }

    /// Plural resource name used in API paths
    pub fn plural(&self) -> &'static str {
        match self {
            Kind::Namespace => "namespaces",
            Kind::Deployment => "deployments",
            Kind::DaemonSet => "daemonsets",
            Kind::Service => "services",
            Kind::Secret => "secrets",
            Kind::ConfigMap => "configmaps",
            Kind::Ingress => "ingresses",
            Kind::StorageClass => "storageclasses",
            Kind::PersistentVolumeClaim => "persistentvolumeclaims",
            Kind::Job => "jobs",
            Kind::CronJob => "cronjobs",
            Kind::Role => "roles",
            Kind::RoleBinding => "rolebindings",
            Kind::ClusterRole => "clusterroles",
            Kind::ClusterRoleBinding => "clusterrolebindings",
            Kind::HorizontalPodAutoscaler => "horizontalpodautoscalers",
            Kind::PodSecurityPolicy => "podsecuritypolicies",
            Kind::ServiceAccount => "serviceaccounts",
            Kind::MutatingWebhookConfiguration => "mutatingwebhookconfigurations",
            Kind::ValidatingWebhookConfiguration => "validatingwebhookconfigurations",
        }
    }

    /// Whether objects of this kind live inside a namespace
    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            Kind::Namespace
                | Kind::StorageClass
                | Kind::ClusterRole
                | Kind::ClusterRoleBinding
                | Kind::PodSecurityPolicy
                | Kind::MutatingWebhookConfiguration
                | Kind::ValidatingWebhookConfiguration
        )
    }

    /// Whether sanitization keeps the `deprecated.daemonset.template.generation` annotation
    pub fn keeps_generation_annotation(&self) -> bool {
        matches!(
            self,
            Kind::HorizontalPodAutoscaler | Kind::PodSecurityPolicy | Kind::ServiceAccount
        )
    }

    /// Lowercase names accepted on the command line
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Kind::Namespace => &["namespace", "namespaces", "ns"],
            Kind::Deployment => &["deployment", "deployments", "deploy"],
            Kind::DaemonSet => &["daemonset", "daemonsets", "ds"],
            Kind::Service => &["service", "services", "svc"],
            Kind::Secret => &["secret", "secrets"],
            Kind::ConfigMap => &["configmap", "configmaps", "cm"],
            Kind::Ingress => &["ingress", "ingresses", "ing"],
            Kind::StorageClass => &["storageclass", "storageclasses", "sc"],
            Kind::PersistentVolumeClaim => {
                &["persistentvolumeclaim", "persistentvolumeclaims", "pvc"]
            }
            Kind::Job => &["job", "jobs"],
            Kind::CronJob => &["cronjob", "cronjobs", "cj"],
            Kind::Role => &["role", "roles"],
            Kind::RoleBinding => &["rolebinding", "rolebindings"],
            Kind::ClusterRole => &["clusterrole", "clusterroles"],
            Kind::ClusterRoleBinding => &["clusterrolebinding", "clusterrolebindings"],
            Kind::HorizontalPodAutoscaler => {
                &["horizontalpodautoscaler", "horizontalpodautoscalers", "hpa"]
            }
            Kind::PodSecurityPolicy => &["podsecuritypolicy", "podsecuritypolicies", "psp"],
            Kind::ServiceAccount => &["serviceaccount", "serviceaccounts", "sa"],
            Kind::MutatingWebhookConfiguration => &[
                "mutatingwebhookconfiguration",
                "mutatingwebhookconfigurations",
            ],
            Kind::ValidatingWebhookConfiguration => &[
                "validatingwebhookconfiguration",
                "validatingwebhookconfigurations",
            ],
        }
    }

    /// Look up a kind by alias, ignoring case
    pub fn from_alias(alias: &str) -> Option<Kind> {
        let alias = alias.trim().to_ascii_lowercase();
        Kind::ALL
            .into_iter()
            .find(|kind| kind.aliases().contains(&alias.as_str()))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Kind::from_alias(s).ok_or_else(|| CoreError::UnknownKind {
            alias: s.to_string(),
        })
    }
}

/// Which kinds a run collects and replicates
///
/// Namespaces are always in scope: they define where everything else goes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KindSelector {
    /// The `all` wildcard
    #[default]
    All,
    /// An explicit set of kinds
    Only(BTreeSet<Kind>),
}

impl KindSelector {
    /// Parse a comma separated list of aliases, or `all`
    ///
    /// Whitespace anywhere in the input is ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let tokens: Vec<&str> = compact.split(',').filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            return Err(CoreError::EmptyKindSelection);
        }

        if tokens.iter().any(|t| t.eq_ignore_ascii_case("all")) {
            return Ok(KindSelector::All);
        }

        let kinds = tokens
            .into_iter()
            .map(Kind::from_str)
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(KindSelector::Only(kinds))
    }

    /// Build a selector from an explicit list
    pub fn only(kinds: impl IntoIterator<Item = Kind>) -> Self {
        KindSelector::Only(kinds.into_iter().collect())
    }

    /// Whether a kind is selected
    pub fn contains(&self, kind: Kind) -> bool {
        match self {
            KindSelector::All => true,
            KindSelector::Only(kinds) => kind == Kind::Namespace || kinds.contains(&kind),
        }
    }

    /// Selected kinds in inventory order (always includes `Namespace`)
    pub fn selected(&self) -> Vec<Kind> {
        Kind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
            .collect()
    }
}

impl FromStr for KindSelector {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        KindSelector::parse(s)
    }
}
