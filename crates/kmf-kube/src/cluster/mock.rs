//! In-memory cluster for testing
//!
//! Objects are kept in insertion order, so listing returns them the way
//! they were seeded. Every call is recorded for ordering assertions.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use kmf_core::Kind;
use kube::api::DynamicObject;
use kube::core::ErrorResponse;

use super::ClusterApi;
use crate::kinds::KindDescriptor;

/// One call made against a [`MockCluster`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterCall {
    Get { kind: Kind, namespace: Option<String>, name: String },
    List { kind: Kind, namespace: Option<String> },
    Create { kind: Kind, namespace: Option<String>, name: String },
    Delete { kind: Kind, namespace: Option<String>, name: String },
}

#[derive(Default)]
struct State {
    objects: Vec<(Kind, DynamicObject)>,
    calls: Vec<ClusterCall>,
    failing_lists: Vec<Kind>,
    failing_writes: Vec<String>,
    unreachable: bool,
}

/// In-memory [`ClusterApi`]
#[derive(Clone, Default)]
pub struct MockCluster {
    state: Arc<RwLock<State>>,
}

fn api_error(code: u16, reason: &str, message: String) -> kube::Error {
    kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message,
        reason: reason.to_string(),
        code,
    })
}

fn scoped(kind: Kind, namespace: Option<&str>) -> Option<String> {
    if kind.is_namespaced() {
        namespace.map(str::to_string)
    } else {
        None
    }
}

fn matches_selector(obj: &DynamicObject, selector: Option<&str>) -> bool {
    let Some(selector) = selector else {
        return true;
    };
    let labels = obj.metadata.labels.clone().unwrap_or_default();
    selector
        .split(',')
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => labels.get(key).map(String::as_str) == Some(value),
            None => labels.contains_key(term),
        })
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object, setting its type meta from `kind`
    pub fn insert(&self, kind: Kind, mut obj: DynamicObject) -> &Self {
        obj.types = Some(KindDescriptor::for_kind(kind).type_meta());
        self.state.write().unwrap().objects.push((kind, obj));
        self
    }

    /// Seed a bare namespace
    pub fn insert_namespace(&self, name: &str) -> &Self {
        let obj = DynamicObject::new(name, &KindDescriptor::for_kind(Kind::Namespace).resource);
        self.insert(Kind::Namespace, obj)
    }

    /// Make listing `kind` fail with a server error
    pub fn fail_list(&self, kind: Kind) {
        self.state.write().unwrap().failing_lists.push(kind);
    }

    /// Make creating or deleting an object named `name` fail
    pub fn fail_writes_to(&self, name: &str) {
        self.state.write().unwrap().failing_writes.push(name.to_string());
    }

    /// Make every call fail as if the API server were down
    pub fn set_unreachable(&self) {
        self.state.write().unwrap().unreachable = true;
    }

    pub fn calls(&self) -> Vec<ClusterCall> {
        self.state.read().unwrap().calls.clone()
    }

    /// Only create calls, as `(kind, namespace, name)`
    pub fn created(&self) -> Vec<(Kind, Option<String>, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClusterCall::Create { kind, namespace, name } => Some((kind, namespace, name)),
                _ => None,
            })
            .collect()
    }

    /// Only delete calls, as `(kind, namespace, name)`
    pub fn deleted(&self) -> Vec<(Kind, Option<String>, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ClusterCall::Delete { kind, namespace, name } => Some((kind, namespace, name)),
                _ => None,
            })
            .collect()
    }

    /// Stored objects of one kind
    pub fn objects(&self, kind: Kind) -> Vec<DynamicObject> {
        self.state
            .read()
            .unwrap()
            .objects
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, obj)| obj.clone())
            .collect()
    }

    fn check_reachable(state: &State) -> kube::Result<()> {
        if state.unreachable {
            return Err(api_error(503, "ServiceUnavailable", "connection refused".to_string()));
        }
        Ok(())
    }

    fn position(state: &State, kind: Kind, namespace: Option<&str>, name: &str) -> Option<usize> {
        let namespace = scoped(kind, namespace);
        state.objects.iter().position(|(k, obj)| {
            *k == kind
                && obj.metadata.name.as_deref() == Some(name)
                && scoped(kind, obj.metadata.namespace.as_deref()) == namespace
        })
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    async fn get(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<Option<DynamicObject>> {
        let mut state = self.state.write().unwrap();
        state.calls.push(ClusterCall::Get {
            kind,
            namespace: scoped(kind, namespace),
            name: name.to_string(),
        });
        Self::check_reachable(&state)?;
        Ok(Self::position(&state, kind, namespace, name).map(|i| state.objects[i].1.clone()))
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>> {
        let mut state = self.state.write().unwrap();
        let namespace = scoped(kind, namespace);
        state.calls.push(ClusterCall::List {
            kind,
            namespace: namespace.clone(),
        });
        Self::check_reachable(&state)?;
        if state.failing_lists.contains(&kind) {
            return Err(api_error(500, "InternalError", format!("listing {} failed", kind)));
        }

        Ok(state
            .objects
            .iter()
            .filter(|(k, obj)| {
                *k == kind
                    && (namespace.is_none() || obj.metadata.namespace == namespace)
                    && matches_selector(obj, label_selector)
            })
            .map(|(_, obj)| {
                let mut item = obj.clone();
                // list items come back without type meta
                item.types = None;
                item
            })
            .collect())
    }

    async fn create(&self, kind: Kind, obj: &DynamicObject) -> kube::Result<DynamicObject> {
        let mut state = self.state.write().unwrap();
        let name = obj.metadata.name.clone().unwrap_or_default();
        let namespace = scoped(kind, obj.metadata.namespace.as_deref());
        state.calls.push(ClusterCall::Create {
            kind,
            namespace: namespace.clone(),
            name: name.clone(),
        });
        Self::check_reachable(&state)?;
        if state.failing_writes.contains(&name) {
            return Err(api_error(422, "Invalid", format!("{} {} is invalid", kind, name)));
        }
        if Self::position(&state, kind, namespace.as_deref(), &name).is_some() {
            return Err(api_error(
                409,
                "AlreadyExists",
                format!("{} \"{}\" already exists", kind, name),
            ));
        }

        let mut stored = obj.clone();
        stored.types = Some(KindDescriptor::for_kind(kind).type_meta());
        state.objects.push((kind, stored.clone()));
        Ok(stored)
    }

    async fn delete(&self, kind: Kind, namespace: Option<&str>, name: &str) -> kube::Result<()> {
        let mut state = self.state.write().unwrap();
        state.calls.push(ClusterCall::Delete {
            kind,
            namespace: scoped(kind, namespace),
            name: name.to_string(),
        });
        Self::check_reachable(&state)?;
        if state.failing_writes.iter().any(|n| n == name) {
            return Err(api_error(403, "Forbidden", format!("cannot delete {}", name)));
        }
        match Self::position(&state, kind, namespace, name) {
            Some(i) => {
                state.objects.remove(i);
                Ok(())
            }
            None => Err(api_error(404, "NotFound", format!("{} \"{}\" not found", kind, name))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configmap(name: &str, namespace: &str) -> DynamicObject {
        let mut obj = DynamicObject::new(name, &KindDescriptor::for_kind(Kind::ConfigMap).resource);
        obj.metadata.namespace = Some(namespace.to_string());
        obj
    }

    #[tokio::test]
    async fn test_list_by_namespace() {
        let cluster = MockCluster::new();
        cluster
            .insert(Kind::ConfigMap, configmap("one", "a"))
            .insert(Kind::ConfigMap, configmap("two", "b"));

        let in_a = cluster.list(Kind::ConfigMap, Some("a"), None).await.unwrap();
        assert_eq!(in_a.len(), 1);
        assert!(in_a[0].types.is_none());
        assert_eq!(cluster.list(Kind::ConfigMap, None, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_label_selector() {
        let cluster = MockCluster::new();
        let mut labelled = configmap("labelled", "a");
        labelled.metadata.labels = Some([("owner".to_string(), "helm".to_string())].into());
        cluster
            .insert(Kind::ConfigMap, labelled)
            .insert(Kind::ConfigMap, configmap("plain", "a"));

        let found = cluster
            .list(Kind::ConfigMap, Some("a"), Some("owner=helm"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].metadata.name.as_deref(), Some("labelled"));
    }

    #[tokio::test]
    async fn test_create_conflict_and_delete() {
        let cluster = MockCluster::new();
        cluster.create(Kind::ConfigMap, &configmap("one", "a")).await.unwrap();
        let err = cluster
            .create(Kind::ConfigMap, &configmap("one", "a"))
            .await
            .unwrap_err();
        assert!(crate::error::api_conflict(&err));

        cluster.delete(Kind::ConfigMap, Some("a"), "one").await.unwrap();
        let err = cluster.delete(Kind::ConfigMap, Some("a"), "one").await.unwrap_err();
        assert!(crate::error::api_not_found(&err));
    }

    #[tokio::test]
    async fn test_unreachable() {
        let cluster = MockCluster::new();
        cluster.insert_namespace("a");
        cluster.set_unreachable();
        assert!(cluster.get(Kind::Namespace, None, "a").await.is_err());
        assert_eq!(cluster.calls().len(), 1);
    }
}
