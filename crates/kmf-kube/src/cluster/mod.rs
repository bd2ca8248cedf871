//! Access to a cluster's objects
//!
//! Collection, export and replication only talk to a cluster through
//! [`ClusterApi`]. [`KubeCluster`] is the real implementation; the in-memory
//! [`MockCluster`] backs the tests.

use async_trait::async_trait;
use kmf_core::Kind;
use kube::{
    Client,
    api::{Api, DeleteParams, DynamicObject, ListParams, PostParams},
};

use crate::kinds::KindDescriptor;

mod mock;

pub use mock::{ClusterCall, MockCluster};

/// Object operations a migration needs, for any supported kind
///
/// `namespace` is ignored for cluster-scoped kinds. Listing a namespaced kind
/// with no namespace lists across all namespaces.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<Option<DynamicObject>>;

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>>;

    async fn create(&self, kind: Kind, obj: &DynamicObject) -> kube::Result<DynamicObject>;

    async fn delete(&self, kind: Kind, namespace: Option<&str>, name: &str) -> kube::Result<()>;
}

/// A cluster reached through a kube client
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api(&self, kind: Kind, namespace: Option<&str>) -> Api<DynamicObject> {
        let descriptor = KindDescriptor::for_kind(kind);
        match namespace {
            Some(ns) if descriptor.namespaced => {
                Api::namespaced_with(self.client.clone(), ns, &descriptor.resource)
            }
            _ => Api::all_with(self.client.clone(), &descriptor.resource),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        name: &str,
    ) -> kube::Result<Option<DynamicObject>> {
        self.api(kind, namespace).get_opt(name).await
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> kube::Result<Vec<DynamicObject>> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.api(kind, namespace).list(&params).await?;
        Ok(list.items)
    }

    async fn create(&self, kind: Kind, obj: &DynamicObject) -> kube::Result<DynamicObject> {
        self.api(kind, obj.metadata.namespace.as_deref())
            .create(&PostParams::default(), obj)
            .await
    }

    async fn delete(&self, kind: Kind, namespace: Option<&str>, name: &str) -> kube::Result<()> {
        self.api(kind, namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        Ok(())
    }
}
