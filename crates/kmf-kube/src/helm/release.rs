//! Decoding Helm release secrets
//!
//! Helm stores each release revision in a Secret labelled `owner=helm`.
//! The `release` key holds base64 text of a gzip-compressed JSON document;
//! payloads written without compression are plain JSON after the base64 step.

use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::api::core::v1::Secret;
use kube::api::DynamicObject;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{KubeError, Result};

/// Label selector matching release storage secrets
pub const RELEASE_SELECTOR: &str = "owner=helm";

/// Status a release must be in to be exported
pub const DEPLOYED_STATUS: &str = "deployed";

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// A decoded release revision
#[derive(Debug, Clone, Deserialize)]
pub struct HelmRelease {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub version: u32,
    pub chart: HelmChart,
    /// User-supplied values for this revision
    #[serde(default)]
    pub config: JsonValue,
    #[serde(default)]
    pub manifest: String,
}

/// The chart a release was installed from
#[derive(Debug, Clone, Deserialize)]
pub struct HelmChart {
    pub metadata: JsonValue,
    #[serde(default)]
    pub lock: Option<JsonValue>,
    #[serde(default)]
    pub templates: Vec<ChartFile>,
    /// Chart default values
    #[serde(default)]
    pub values: JsonValue,
    /// `values.schema.json`, base64 encoded
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub files: Vec<ChartFile>,
}

/// One template or auxiliary file, path relative to the chart root
#[derive(Debug, Clone, Deserialize)]
pub struct ChartFile {
    pub name: String,
    /// File contents, base64 encoded
    #[serde(default)]
    pub data: String,
}

impl ChartFile {
    pub fn contents(&self) -> std::result::Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Whether a release secret's `status` label marks a deployed revision
///
/// Only the text before an optional `:` counts.
pub fn is_deployed(secret: &DynamicObject) -> bool {
    secret
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get("status"))
        .and_then(|status| status.split(':').next())
        .is_some_and(|status| status == DEPLOYED_STATUS)
}

/// Decode the release stored in a Helm secret
pub fn decode_release(secret: DynamicObject) -> Result<HelmRelease> {
    let namespace = secret.metadata.namespace.clone().unwrap_or_default();
    let name = secret.metadata.name.clone().unwrap_or_default();
    let fail = |message: String| KubeError::Decode {
        namespace: namespace.clone(),
        secret: name.clone(),
        message,
    };

    let secret: Secret = secret
        .try_parse()
        .map_err(|e| fail(format!("not a secret: {}", e)))?;
    let payload = secret
        .data
        .as_ref()
        .and_then(|data| data.get("release"))
        .ok_or_else(|| fail("missing 'release' key".to_string()))?;

    decode_payload(&payload.0).map_err(fail)
}

/// base64 text -> optional gzip -> release JSON
fn decode_payload(payload: &[u8]) -> std::result::Result<HelmRelease, String> {
    let text: Vec<u8> = payload
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let compressed = STANDARD
        .decode(&text)
        .map_err(|e| format!("base64 decode error: {}", e))?;

    let json = if compressed.starts_with(&GZIP_MAGIC) {
        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .map_err(|e| format!("gzip error: {}", e))?;
        decompressed
    } else {
        compressed
    };

    serde_json::from_slice(&json).map_err(|e| format!("invalid release JSON: {}", e))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use super::*;
    use crate::kinds::KindDescriptor;
    use kmf_core::Kind;
    use serde_json::json;

    /// A release secret as the API server returns it
    pub(crate) fn release_secret(
        namespace: &str,
        release: &JsonValue,
        status: &str,
        gzip: bool,
    ) -> DynamicObject {
        let json = serde_json::to_vec(release).unwrap();
        let body = if gzip {
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&json).unwrap();
            encoder.finish().unwrap()
        } else {
            json
        };
        let helm_text = STANDARD.encode(body);
        let name = format!(
            "sh.helm.release.v1.{}.v{}",
            release["name"].as_str().unwrap(),
            release["version"].as_u64().unwrap_or(1)
        );

        let mut secret = DynamicObject::new(&name, &KindDescriptor::for_kind(Kind::Secret).resource)
            .data(json!({
                "type": "helm.sh/release.v1",
                "data": { "release": STANDARD.encode(helm_text) }
            }));
        secret.metadata.namespace = Some(namespace.to_string());
        secret.metadata.labels = Some(
            [
                ("owner".to_string(), "helm".to_string()),
                ("status".to_string(), status.to_string()),
                ("name".to_string(), release["name"].as_str().unwrap().to_string()),
            ]
            .into(),
        );
        secret
    }

    pub(crate) fn sample_release(name: &str) -> JsonValue {
        json!({
            "name": name,
            "namespace": "shop",
            "version": 3,
            "info": { "status": "deployed" },
            "chart": {
                "metadata": { "apiVersion": "v2", "name": "web", "version": "1.2.0" },
                "templates": [
                    { "name": "templates/deployment.yaml", "data": STANDARD.encode("kind: Deployment\n") },
                    { "name": "templates/tests/test-connection.yaml", "data": STANDARD.encode("kind: Pod\n") }
                ],
                "values": { "replicas": 1, "image": { "tag": "1.0" } },
                "files": [ { "name": "README.md", "data": STANDARD.encode("# web\n") } ]
            },
            "config": { "image": { "tag": "1.1" } },
            "manifest": "---\nkind: Deployment\n"
        })
    }

    #[test]
    fn test_decode_gzip_release() {
        let secret = release_secret("shop", &sample_release("web"), "deployed", true);
        let release = decode_release(secret).unwrap();
        assert_eq!(release.name, "web");
        assert_eq!(release.version, 3);
        assert_eq!(release.chart.templates.len(), 2);
        assert_eq!(release.chart.files[0].contents().unwrap(), b"# web\n");
        assert_eq!(release.config["image"]["tag"], "1.1");
    }

    #[test]
    fn test_decode_uncompressed_release() {
        let secret = release_secret("shop", &sample_release("web"), "deployed", false);
        assert_eq!(decode_release(secret).unwrap().name, "web");
    }

    #[test]
    fn test_decode_corrupt_payload() {
        let mut secret = release_secret("shop", &sample_release("web"), "deployed", true);
        secret.data["data"]["release"] = json!(STANDARD.encode("!!not base64!!"));
        let err = decode_release(secret).unwrap_err();
        assert!(matches!(err, KubeError::Decode { namespace, .. } if namespace == "shop"));
    }

    #[test]
    fn test_missing_release_key() {
        let mut secret = release_secret("shop", &sample_release("web"), "deployed", true);
        secret.data["data"] = json!({});
        assert!(matches!(decode_release(secret), Err(KubeError::Decode { .. })));
    }

    #[test]
    fn test_status_label() {
        let release = sample_release("web");
        assert!(is_deployed(&release_secret("shop", &release, "deployed", true)));
        assert!(is_deployed(&release_secret("shop", &release, "deployed:1", true)));
        assert!(!is_deployed(&release_secret("shop", &release, "superseded", true)));
        assert!(!is_deployed(&release_secret("shop", &release, "pending-upgrade", true)));
    }
}
