//! Turning the user's namespace input into the namespaces a run covers

use kmf_core::{Kind, NamespaceSpec};
use kube::api::DynamicObject;

use crate::cluster::ClusterApi;
use crate::error::{api_not_found, KubeError, Result};
use crate::kinds::KindDescriptor;

/// The namespaces a run operates over, with their source objects
#[derive(Debug, Clone, Default)]
pub struct NamespaceScope {
    namespaces: Vec<DynamicObject>,
}

impl NamespaceScope {
    pub fn names(&self) -> Vec<String> {
        self.namespaces
            .iter()
            .filter_map(|ns| ns.metadata.name.clone())
            .collect()
    }

    pub fn objects(&self) -> &[DynamicObject] {
        &self.namespaces
    }

    pub fn into_objects(self) -> Vec<DynamicObject> {
        self.namespaces
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

/// Resolve `spec` against the cluster, dropping reserved namespaces
///
/// Explicit names keep the order the user gave them; `all` keeps the order
/// the cluster lists them in. Reserved namespaces are dropped even when they
/// are named explicitly. A named namespace that does not exist is an error.
pub async fn resolve_namespaces(
    cluster: &dyn ClusterApi,
    spec: &NamespaceSpec,
    reserved: &[String],
) -> Result<NamespaceScope> {
    let is_reserved = |name: &str| reserved.iter().any(|r| r == name);
    let type_meta = KindDescriptor::for_kind(Kind::Namespace).type_meta();

    let mut namespaces = Vec::new();
    match spec {
        NamespaceSpec::All => {
            let listed = cluster
                .list(Kind::Namespace, None, None)
                .await
                .map_err(|e| KubeError::Connection {
                    message: format!("listing namespaces: {}", e),
                })?;
            for mut ns in listed {
                let name = ns.metadata.name.as_deref().unwrap_or_default();
                if is_reserved(name) {
                    tracing::debug!(namespace = name, "skipping reserved namespace");
                    continue;
                }
                ns.types = Some(type_meta.clone());
                namespaces.push(ns);
            }
        }
        NamespaceSpec::Explicit(names) => {
            for name in names {
                if is_reserved(name) {
                    tracing::warn!(namespace = %name, "reserved namespace is never migrated");
                    continue;
                }
                let found = cluster
                    .get(Kind::Namespace, None, name)
                    .await
                    .map_err(|e| {
                        if api_not_found(&e) {
                            KubeError::NamespaceNotFound {
                                namespace: name.clone(),
                            }
                        } else {
                            KubeError::Connection {
                                message: format!("reading namespace {}: {}", name, e),
                            }
                        }
                    })?;
                let mut ns = found.ok_or_else(|| KubeError::NamespaceNotFound {
                    namespace: name.clone(),
                })?;
                ns.types = Some(type_meta.clone());
                namespaces.push(ns);
            }
        }
    }

    let scope = NamespaceScope { namespaces };
    tracing::info!(namespaces = ?scope.names(), "resolved namespaces");
    Ok(scope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockCluster;
    use kmf_core::DEFAULT_RESERVED_NAMESPACES;

    fn reserved() -> Vec<String> {
        DEFAULT_RESERVED_NAMESPACES.iter().map(|s| s.to_string()).collect()
    }

    fn cluster() -> MockCluster {
        let cluster = MockCluster::new();
        for name in ["kube-system", "shop", "kube-public", "billing", "kube-node-lease"] {
            cluster.insert_namespace(name);
        }
        cluster
    }

    #[tokio::test]
    async fn test_all_keeps_cluster_order() {
        let scope = resolve_namespaces(&cluster(), &NamespaceSpec::All, &reserved())
            .await
            .unwrap();
        assert_eq!(scope.names(), vec!["shop", "billing"]);
        assert!(scope.objects().iter().all(|ns| ns.types.is_some()));
    }

    #[tokio::test]
    async fn test_explicit_keeps_user_order() {
        let spec = NamespaceSpec::parse("billing,shop").unwrap();
        let scope = resolve_namespaces(&cluster(), &spec, &reserved()).await.unwrap();
        assert_eq!(scope.names(), vec!["billing", "shop"]);
    }

    #[tokio::test]
    async fn test_explicit_reserved_is_dropped() {
        let spec = NamespaceSpec::parse("kube-system,shop,kube-public").unwrap();
        let cluster = cluster();
        let scope = resolve_namespaces(&cluster, &spec, &reserved()).await.unwrap();
        assert_eq!(scope.names(), vec!["shop"]);
        assert_eq!(cluster.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_namespace() {
        let spec = NamespaceSpec::parse("shop,ghost").unwrap();
        let err = resolve_namespaces(&cluster(), &spec, &reserved())
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::NamespaceNotFound { namespace } if namespace == "ghost"));
    }

    #[tokio::test]
    async fn test_unreachable_cluster() {
        let cluster = cluster();
        cluster.set_unreachable();
        let err = resolve_namespaces(&cluster, &NamespaceSpec::All, &reserved())
            .await
            .unwrap_err();
        assert!(matches!(err, KubeError::Connection { .. }));

        let spec = NamespaceSpec::parse("shop").unwrap();
        let err = resolve_namespaces(&cluster, &spec, &reserved()).await.unwrap_err();
        assert!(matches!(err, KubeError::Connection { .. }));
    }
}
