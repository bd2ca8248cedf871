//! Whole-pipeline tests against in-memory clusters

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kmf_core::{Action, Kind, KindSelector, MigrationSettings, MirrorSettings, NamespaceSpec, RegistryClass};
use kmf_kube::{KindDescriptor, KubeError, Migration, MockCluster};
use kmf_repo::ImageMirror;
use kmf_repo::mock::{ChartCall, MockChartManager, MockIdentity, MockRegistry, MockRuntime};
use kube::api::DynamicObject;
use serde_json::{json, Value};

fn object(kind: Kind, value: Value) -> DynamicObject {
    let mut obj: DynamicObject = serde_json::from_value(value).unwrap();
    obj.types = Some(KindDescriptor::for_kind(kind).type_meta());
    obj
}

fn identity(name: &str, namespace: &str) -> Value {
    json!({
        "name": name,
        "namespace": namespace,
        "uid": format!("uid-{}-{}", namespace, name),
        "resourceVersion": "4242",
        "generation": 2,
        "creationTimestamp": "2023-05-01T10:00:00Z",
        "annotations": { "kubectl.kubernetes.io/last-applied-configuration": "{}" }
    })
}

fn configmap(name: &str, namespace: &str) -> DynamicObject {
    object(
        Kind::ConfigMap,
        json!({ "metadata": identity(name, namespace), "data": { "key": "value" } }),
    )
}

fn service(name: &str, namespace: &str) -> DynamicObject {
    object(
        Kind::Service,
        json!({
            "metadata": identity(name, namespace),
            "spec": {
                "type": "NodePort",
                "clusterIP": "10.0.0.12",
                "clusterIPs": ["10.0.0.12"],
                "ports": [
                    { "name": "http", "port": 80, "nodePort": 30080 },
                    { "name": "https", "port": 443, "nodePort": 30443 }
                ]
            }
        }),
    )
}

fn source_cluster() -> MockCluster {
    let cluster = MockCluster::new();
    cluster
        .insert_namespace("kube-system")
        .insert_namespace("a")
        .insert_namespace("b")
        .insert_namespace("c");
    cluster
        .insert(Kind::ConfigMap, configmap("settings", "a"))
        .insert(Kind::ConfigMap, configmap("settings", "b"))
        .insert(Kind::ConfigMap, configmap("coredns", "kube-system"))
        .insert(Kind::ConfigMap, configmap("other", "c"))
        .insert(Kind::Service, service("web", "b"))
        .insert(Kind::Service, service("web", "a"))
        .insert(Kind::Secret, configmap("creds", "a"));
    cluster
}

#[tokio::test]
async fn test_configmaps_and_services_between_two_namespaces() {
    let source = source_cluster();
    let destination = MockCluster::new();
    let settings = MigrationSettings::new(
        NamespaceSpec::parse("a, b").unwrap(),
        KindSelector::parse("configmap,service").unwrap(),
    );

    let report = Migration::new(&source, &settings)
        .with_destination(&destination)
        .run()
        .await
        .unwrap();

    assert_eq!(report.namespaces, vec!["a", "b"]);
    assert_eq!(
        report.collected,
        vec![(Kind::Namespace, 2), (Kind::Service, 2), (Kind::ConfigMap, 2)]
    );
    assert!(report.is_success());

    let created: Vec<_> = destination
        .created()
        .into_iter()
        .map(|(kind, ns, name)| format!("{} {}/{}", kind, ns.unwrap_or_default(), name))
        .collect();
    assert_eq!(
        created,
        vec![
            "Namespace /a",
            "Namespace /b",
            "ConfigMap a/settings",
            "Service a/web",
            "ConfigMap b/settings",
            "Service b/web",
        ]
    );

    for obj in destination
        .objects(Kind::ConfigMap)
        .iter()
        .chain(destination.objects(Kind::Service).iter())
    {
        assert!(obj.metadata.uid.is_none());
        assert!(obj.metadata.resource_version.is_none());
        assert!(obj.metadata.generation.is_none());
        assert!(obj.metadata.creation_timestamp.is_none());
        assert!(obj.metadata.annotations.is_none());
    }
    for svc in destination.objects(Kind::Service) {
        assert_eq!(svc.data["spec"]["clusterIP"], "");
        assert!(svc.data["spec"].get("clusterIPs").is_none());
        for port in svc.data["spec"]["ports"].as_array().unwrap() {
            assert_eq!(port["nodePort"], 0);
        }
    }
    assert!(destination.objects(Kind::Secret).is_empty());
}

#[tokio::test]
async fn test_reserved_namespace_never_reaches_destination() {
    let source = source_cluster();
    let destination = MockCluster::new();
    let settings = MigrationSettings::new(NamespaceSpec::All, KindSelector::parse("cm").unwrap());

    let report = Migration::new(&source, &settings)
        .with_destination(&destination)
        .run()
        .await
        .unwrap();

    assert_eq!(report.namespaces, vec!["a", "b", "c"]);
    assert!(destination
        .created()
        .iter()
        .all(|(_, ns, name)| ns.as_deref() != Some("kube-system") && name != "kube-system"));
}

#[tokio::test]
async fn test_missing_namespace_aborts_before_any_write() {
    let source = source_cluster();
    let destination = MockCluster::new();
    let settings = MigrationSettings::new(
        NamespaceSpec::parse("a,ghost").unwrap(),
        KindSelector::All,
    );

    let err = Migration::new(&source, &settings)
        .with_destination(&destination)
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, KubeError::NamespaceNotFound { .. }));
    assert!(destination.calls().is_empty());
}

fn release_secret(namespace: &str, name: &str, status: &str) -> DynamicObject {
    let release = json!({
        "name": name,
        "namespace": namespace,
        "version": 1,
        "chart": {
            "metadata": { "apiVersion": "v2", "name": name, "version": "0.1.0" },
            "templates": [{ "name": "templates/cm.yaml", "data": STANDARD.encode("kind: ConfigMap\n") }],
            "values": { "replicas": 2 }
        },
        "config": {}
    });
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&serde_json::to_vec(&release).unwrap()).unwrap();
    let helm_text = STANDARD.encode(encoder.finish().unwrap());

    let mut value = json!({
        "metadata": {
            "name": format!("sh.helm.release.v1.{}.v1", name),
            "namespace": namespace,
            "labels": { "owner": "helm", "status": status, "name": name }
        },
        "type": "helm.sh/release.v1",
        "data": { "release": STANDARD.encode(helm_text) }
    });
    value["metadata"]["uid"] = json!("secret-uid");
    object(Kind::Secret, value)
}

#[tokio::test]
async fn test_charts_mirrored_images_and_install() {
    let source = source_cluster();
    source
        .insert(Kind::Secret, release_secret("a", "shop", "deployed"))
        .insert(Kind::Secret, release_secret("a", "legacy", "superseded"))
        .insert(
            Kind::Deployment,
            object(
                Kind::Deployment,
                json!({
                    "metadata": identity("api", "a"),
                    "spec": { "template": { "spec": { "containers": [
                        { "name": "api", "image": "gcr.io/acme/api:2.4" }
                    ]}}}
                }),
            ),
        );
    let destination = MockCluster::new();
    let charts = MockChartManager::new();
    let runtime = MockRuntime::new();
    let mirror = ImageMirror::new(
        MirrorSettings {
            registries: [RegistryClass::Gcr].into(),
            region: None,
        },
        "us-east-1",
        Arc::new(MockRegistry::new()),
        Arc::new(MockIdentity::new("111122223333")),
        Arc::new(runtime.clone()),
    );
    let root = tempfile::tempdir().unwrap();
    let settings = MigrationSettings::new(
        NamespaceSpec::parse("a").unwrap(),
        KindSelector::parse("deploy").unwrap(),
    )
    .with_chart_root(root.path());

    let report = Migration::new(&source, &settings)
        .with_destination(&destination)
        .with_charts(&charts)
        .with_mirror(&mirror)
        .run()
        .await
        .unwrap();

    let chart = root.path().join("KMFHelmCharts/namespaces/a/shop");
    assert_eq!(report.charts.len(), 1);
    assert!(chart.join("templates/cm.yaml").is_file());
    assert!(!root.path().join("KMFHelmCharts/namespaces/a/legacy").exists());
    assert_eq!(
        charts.calls(),
        vec![
            ChartCall::DependencyBuild { chart_dir: PathBuf::from(&chart) },
            ChartCall::UpgradeInstall {
                release: "shop".to_string(),
                namespace: "a".to_string(),
                chart_dir: PathBuf::from(&chart),
            },
        ]
    );

    let mirrored = "111122223333.dkr.ecr.us-east-1.amazonaws.com/acme/api:2.4";
    assert_eq!(report.mirrored.len(), 1);
    assert_eq!(report.mirrored[0].mirrored, mirrored);
    let deployment = &destination.objects(Kind::Deployment)[0];
    assert_eq!(
        deployment.data["spec"]["template"]["spec"]["containers"][0]["image"],
        mirrored
    );
    assert_eq!(runtime.calls().len(), 3);
}

#[tokio::test]
async fn test_delete_removes_namespaces_last() {
    let source = source_cluster();
    let destination = source_cluster();
    let settings = MigrationSettings::new(
        NamespaceSpec::parse("a").unwrap(),
        KindSelector::parse("cm,svc").unwrap(),
    )
    .with_action(Action::Delete);

    let report = Migration::new(&source, &settings)
        .with_destination(&destination)
        .run()
        .await
        .unwrap();

    let deleted: Vec<_> = destination
        .deleted()
        .into_iter()
        .map(|(kind, _, name)| format!("{} {}", kind, name))
        .collect();
    assert_eq!(deleted, vec!["Service web", "ConfigMap settings", "Namespace a"]);
    assert!(report.is_success());
    assert_eq!(destination.objects(Kind::ConfigMap).len(), 3);
}

#[tokio::test]
async fn test_delete_leaves_images_alone() {
    let api = || {
        object(
            Kind::Deployment,
            json!({
                "metadata": identity("api", "a"),
                "spec": { "template": { "spec": { "containers": [
                    { "name": "api", "image": "gcr.io/acme/api:2.4" }
                ]}}}
            }),
        )
    };
    let source = source_cluster();
    source.insert(Kind::Deployment, api());
    let destination = source_cluster();
    destination.insert(Kind::Deployment, api());
    let registry = MockRegistry::new();
    let runtime = MockRuntime::new();
    let mirror = ImageMirror::new(
        MirrorSettings {
            registries: [RegistryClass::Gcr].into(),
            region: None,
        },
        "us-east-1",
        Arc::new(registry.clone()),
        Arc::new(MockIdentity::new("111122223333")),
        Arc::new(runtime.clone()),
    );
    let settings = MigrationSettings::new(
        NamespaceSpec::parse("a").unwrap(),
        KindSelector::parse("deploy").unwrap(),
    )
    .with_action(Action::Delete);

    let report = Migration::new(&source, &settings)
        .with_destination(&destination)
        .with_mirror(&mirror)
        .run()
        .await
        .unwrap();

    assert!(runtime.calls().is_empty());
    assert!(registry.created().is_empty());
    assert!(report.mirrored.is_empty());
    assert!(destination.objects(Kind::Deployment).is_empty());
}
