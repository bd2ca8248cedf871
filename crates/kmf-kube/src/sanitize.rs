//! Removing server-assigned identity so objects can be created elsewhere

use kmf_core::Kind;
use kube::api::DynamicObject;
use serde_json::Value;

use crate::inventory::ResourceInventory;
use crate::kinds::KindDescriptor;

pub const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";
pub const TEMPLATE_GENERATION_ANNOTATION: &str = "deprecated.daemonset.template.generation";

/// Labels the job controller stamps on selectors and pod templates
const JOB_CONTROLLER_LABELS: [&str; 2] = ["controller-uid", "batch.kubernetes.io/controller-uid"];

/// Sanitize one object of `kind`; running it again changes nothing
pub fn sanitize(kind: Kind, obj: &mut DynamicObject) {
    let descriptor = KindDescriptor::for_kind(kind);
    sanitize_with(&descriptor, obj);
}

fn sanitize_with(descriptor: &KindDescriptor, obj: &mut DynamicObject) {
    identity_fields(obj, descriptor.kind.keeps_generation_annotation());
    (descriptor.sanitize)(obj);
}

/// Sanitize every object in the inventory, returning how many were touched
pub fn sanitize_inventory(inventory: &mut ResourceInventory) -> usize {
    let mut count = 0;
    for kind in Kind::ALL {
        let descriptor = KindDescriptor::for_kind(kind);
        for obj in inventory.objects_mut(kind) {
            sanitize_with(&descriptor, obj);
            count += 1;
        }
    }
    tracing::debug!(objects = count, "sanitized inventory");
    count
}

fn identity_fields(obj: &mut DynamicObject, keep_generation_annotation: bool) {
    let meta = &mut obj.metadata;
    meta.uid = None;
    meta.resource_version = None;
    meta.self_link = None;
    meta.generation = None;
    meta.creation_timestamp = None;
    meta.managed_fields = None;

    if let Some(annotations) = meta.annotations.as_mut() {
        annotations.remove(LAST_APPLIED_ANNOTATION);
        if !keep_generation_annotation {
            annotations.remove(TEMPLATE_GENERATION_ANNOTATION);
        }
        if annotations.is_empty() {
            meta.annotations = None;
        }
    }
}

pub(crate) fn no_kind_fields(_obj: &mut DynamicObject) {}

/// Cluster IPs and node ports are allocated by the destination
pub(crate) fn service_fields(obj: &mut DynamicObject) {
    let Some(spec) = obj.data.get_mut("spec").and_then(Value::as_object_mut) else {
        return;
    };
    spec.insert("clusterIP".to_string(), Value::String(String::new()));
    spec.remove("clusterIPs");
    if let Some(ports) = spec.get_mut("ports").and_then(Value::as_array_mut) {
        for port in ports.iter_mut().filter_map(Value::as_object_mut) {
            port.insert("nodePort".to_string(), Value::from(0));
        }
    }
}

/// Controller-uid labels would not match the job created on the destination
pub(crate) fn job_fields(obj: &mut DynamicObject) {
    for pointer in ["/spec/selector/matchLabels", "/spec/template/metadata/labels"] {
        if let Some(labels) = obj.data.pointer_mut(pointer).and_then(Value::as_object_mut) {
            for label in JOB_CONTROLLER_LABELS {
                labels.remove(label);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::descriptor_table;
    use serde_json::json;

    fn object(kind: Kind, value: Value) -> DynamicObject {
        let mut obj: DynamicObject = serde_json::from_value(value).unwrap();
        obj.types = Some(KindDescriptor::for_kind(kind).type_meta());
        obj
    }

    fn with_identity(kind: Kind, extra: Value) -> DynamicObject {
        let mut value = json!({
            "metadata": {
                "name": "web",
                "namespace": "shop",
                "uid": "0b6f2ba4-1111-2222-3333-444455556666",
                "resourceVersion": "123456",
                "selfLink": "/api/v1/namespaces/shop/things/web",
                "generation": 4,
                "creationTimestamp": "2023-05-01T10:00:00Z",
                "annotations": {
                    "kubectl.kubernetes.io/last-applied-configuration": "{}",
                    "deprecated.daemonset.template.generation": "3",
                    "team": "payments"
                },
                "labels": { "app": "web" }
            }
        });
        if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        object(kind, value)
    }

    #[test]
    fn test_identity_fields_cleared() {
        let mut obj = with_identity(Kind::ConfigMap, json!({"data": {"k": "v"}}));
        sanitize(Kind::ConfigMap, &mut obj);

        let meta = &obj.metadata;
        assert!(meta.uid.is_none());
        assert!(meta.resource_version.is_none());
        assert!(meta.self_link.is_none());
        assert!(meta.generation.is_none());
        assert!(meta.creation_timestamp.is_none());
        let annotations = meta.annotations.as_ref().unwrap();
        assert!(!annotations.contains_key(LAST_APPLIED_ANNOTATION));
        assert!(!annotations.contains_key(TEMPLATE_GENERATION_ANNOTATION));
        assert_eq!(annotations.get("team").map(String::as_str), Some("payments"));
        assert_eq!(meta.namespace.as_deref(), Some("shop"));
        assert_eq!(obj.data["data"]["k"], "v");
    }

    #[test]
    fn test_generation_annotation_kept_for_some_kinds() {
        for kind in [
            Kind::HorizontalPodAutoscaler,
            Kind::PodSecurityPolicy,
            Kind::ServiceAccount,
        ] {
            let mut obj = with_identity(kind, json!({}));
            sanitize(kind, &mut obj);
            let annotations = obj.metadata.annotations.as_ref().unwrap();
            assert!(annotations.contains_key(TEMPLATE_GENERATION_ANNOTATION), "{kind}");
            assert!(!annotations.contains_key(LAST_APPLIED_ANNOTATION), "{kind}");
        }
    }

    #[test]
    fn test_empty_annotations_removed() {
        let mut obj = object(
            Kind::Secret,
            json!({
                "metadata": {
                    "name": "creds",
                    "annotations": { "kubectl.kubernetes.io/last-applied-configuration": "{}" }
                }
            }),
        );
        sanitize(Kind::Secret, &mut obj);
        assert!(obj.metadata.annotations.is_none());
    }

    #[test]
    fn test_service_ips_and_node_ports() {
        let mut obj = with_identity(
            Kind::Service,
            json!({
                "spec": {
                    "type": "NodePort",
                    "clusterIP": "10.0.12.7",
                    "clusterIPs": ["10.0.12.7"],
                    "ports": [
                        { "name": "http", "port": 80, "nodePort": 30080 },
                        { "name": "https", "port": 443, "nodePort": 30443 },
                        { "name": "metrics", "port": 9090 }
                    ]
                }
            }),
        );
        sanitize(Kind::Service, &mut obj);

        let spec = &obj.data["spec"];
        assert_eq!(spec["clusterIP"], "");
        assert!(spec.get("clusterIPs").is_none());
        let ports = spec["ports"].as_array().unwrap();
        assert_eq!(ports.len(), 3);
        for port in ports {
            assert_eq!(port["nodePort"], 0);
        }
        assert_eq!(spec["type"], "NodePort");
    }

    #[test]
    fn test_job_controller_uid_removed() {
        let mut obj = with_identity(
            Kind::Job,
            json!({
                "spec": {
                    "selector": { "matchLabels": {
                        "controller-uid": "abc",
                        "batch.kubernetes.io/controller-uid": "abc"
                    }},
                    "template": { "metadata": { "labels": {
                        "controller-uid": "abc",
                        "batch.kubernetes.io/controller-uid": "abc",
                        "job-name": "migrate"
                    }}}
                }
            }),
        );
        sanitize(Kind::Job, &mut obj);

        let selector = obj.data.pointer("/spec/selector/matchLabels").unwrap();
        assert!(selector.get("controller-uid").is_none());
        assert!(selector.get("batch.kubernetes.io/controller-uid").is_none());
        let labels = obj.data.pointer("/spec/template/metadata/labels").unwrap();
        assert!(labels.get("controller-uid").is_none());
        assert_eq!(labels["job-name"], "migrate");
    }

    #[test]
    fn test_job_without_selector() {
        let mut obj = with_identity(Kind::Job, json!({"spec": {"template": {}}}));
        sanitize(Kind::Job, &mut obj);
        assert!(obj.data.pointer("/spec/selector").is_none());
    }

    #[test]
    fn test_idempotent() {
        let extra = json!({
            "spec": {
                "clusterIP": "10.0.0.1",
                "clusterIPs": ["10.0.0.1"],
                "ports": [{"port": 80, "nodePort": 31000}],
                "replicas": 2,
                "selector": {"matchLabels": {"controller-uid": "x", "app": "web"}},
                "template": {"metadata": {"labels": {
                    "controller-uid": "x",
                    "batch.kubernetes.io/controller-uid": "x",
                    "job-name": "web"
                }}}
            },
            "provisioner": "ebs.csi.aws.com",
            "status": {"phase": "Active"}
        });
        let table = descriptor_table();
        assert_eq!(table.len(), Kind::ALL.len());
        for descriptor in table {
            let mut once = with_identity(descriptor.kind, extra.clone());
            sanitize_with(&descriptor, &mut once);
            let mut twice = once.clone();
            sanitize_with(&descriptor, &mut twice);
            assert_eq!(
                serde_json::to_value(&once).unwrap(),
                serde_json::to_value(&twice).unwrap(),
                "{}",
                descriptor.kind
            );
        }
    }
}
