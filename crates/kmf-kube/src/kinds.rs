//! Per-kind API metadata and handling rules
//!
//! One [`KindDescriptor`] per [`Kind`] drives the generic collect, sanitize
//! and replicate routines, so no code path matches on kind names.

use kmf_core::Kind;
use kube::api::DynamicObject;
use kube::core::{GroupVersionKind, TypeMeta};
use kube::discovery::ApiResource;

use crate::sanitize;

/// Everything generic code needs to handle one kind
#[derive(Clone)]
pub struct KindDescriptor {
    pub kind: Kind,
    pub resource: ApiResource,
    pub namespaced: bool,
    /// Kind-specific sanitization, run after the common identity cleanup
    pub sanitize: fn(&mut DynamicObject),
}

impl KindDescriptor {
    pub fn for_kind(kind: Kind) -> Self {
        let gvk = GroupVersionKind::gvk(kind.group(), kind.version(), kind.as_str());
        let sanitize: fn(&mut DynamicObject) = match kind {
            Kind::Service => sanitize::service_fields,
            Kind::Job => sanitize::job_fields,
            _ => sanitize::no_kind_fields,
        };
        Self {
            kind,
            resource: ApiResource::from_gvk_with_plural(&gvk, kind.plural()),
            namespaced: kind.is_namespaced(),
            sanitize,
        }
    }

    pub fn type_meta(&self) -> TypeMeta {
        TypeMeta {
            api_version: self.resource.api_version.clone(),
            kind: self.resource.kind.clone(),
        }
    }
}

impl std::fmt::Debug for KindDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KindDescriptor")
            .field("kind", &self.kind)
            .field("api_version", &self.resource.api_version)
            .field("plural", &self.resource.plural)
            .field("namespaced", &self.namespaced)
            .finish()
    }
}

/// Descriptors for every kind, in inventory order
pub fn descriptor_table() -> Vec<KindDescriptor> {
    Kind::ALL.into_iter().map(KindDescriptor::for_kind).collect()
}

/// `Kind ns/name` (or `Kind name` for cluster-scoped objects)
pub fn display_name(kind: Kind, obj: &DynamicObject) -> String {
    let name = obj.metadata.name.as_deref().unwrap_or("<unnamed>");
    match obj.metadata.namespace.as_deref() {
        Some(ns) if kind.is_namespaced() => format!("{} {}/{}", kind, ns, name),
        _ => format!("{} {}", kind, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_every_kind() {
        let table = descriptor_table();
        assert_eq!(table.len(), Kind::ALL.len());
        for (descriptor, kind) in table.iter().zip(Kind::ALL) {
            assert_eq!(descriptor.kind, kind);
            assert_eq!(descriptor.resource.kind, kind.as_str());
            assert_eq!(descriptor.resource.api_version, kind.api_version());
            assert_eq!(descriptor.namespaced, kind.is_namespaced());
        }
    }

    #[test]
    fn test_resource_paths() {
        let cronjob = KindDescriptor::for_kind(Kind::CronJob);
        assert_eq!(cronjob.resource.group, "batch");
        assert_eq!(cronjob.resource.plural, "cronjobs");

        let secret = KindDescriptor::for_kind(Kind::Secret);
        assert_eq!(secret.resource.group, "");
        assert_eq!(secret.resource.api_version, "v1");

        let hpa = KindDescriptor::for_kind(Kind::HorizontalPodAutoscaler);
        assert_eq!(hpa.type_meta().api_version, "autoscaling/v1");
    }

    #[test]
    fn test_display_name() {
        let mut obj = DynamicObject::new("web", &KindDescriptor::for_kind(Kind::Service).resource);
        assert_eq!(display_name(Kind::Service, &obj), "Service web");
        obj.metadata.namespace = Some("shop".to_string());
        assert_eq!(display_name(Kind::Service, &obj), "Service shop/web");
        assert_eq!(display_name(Kind::ClusterRole, &obj), "ClusterRole web");
    }
}
