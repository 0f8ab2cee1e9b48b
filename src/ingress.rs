//! Ingress Builder (§4.6): a headless Service plus an Ingress fronting the
//! Spark UI, both owned by the driver pod so Kubernetes garbage-collects
//! them when it goes away.
//!
//! The `serde_json::json!` -> `from_value` construction follows
//! `resource_manager/k8s_client.rs`'s Service manifest; the owner reference
//! follows `storage-operator/src/shards/actions.rs`'s use of
//! `controller_owner_ref`.

use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Resource, ResourceExt};
use serde_json::json;

use crate::config::Config;
use crate::consts::{
    CREATED_BY_LABEL, CREATED_BY_VALUE, SPARK_APP_TAG_LABEL, SPARK_ROLE_DRIVER, SPARK_ROLE_LABEL,
    SPARK_UI_PORT, SPARK_UI_PORT_NAME,
};
use crate::model::Application;
use crate::utils::parse_kv_pairs;

const MAX_NAME_LENGTH: usize = 63;

fn ingress_name(driver_pod_name: &str) -> String {
    let full = format!("{driver_pod_name}-ui").to_ascii_lowercase();
    let truncated: String = full.chars().take(MAX_NAME_LENGTH).collect();
    truncated.trim_end_matches('-').to_owned()
}

fn traefik_annotations(config: &Config) -> serde_json::Map<String, serde_json::Value> {
    let mut annotations = serde_json::Map::new();
    annotations.insert(
        "traefik.ingress.kubernetes.io/router.entrypoints".into(),
        json!("websecure"),
    );
    annotations.insert(
        "traefik.ingress.kubernetes.io/router.tls".into(),
        json!("true"),
    );
    if let Some(snippet) = &config.ingress_additional_conf_snippet {
        annotations.insert(
            "traefik.ingress.kubernetes.io/router.middlewares".into(),
            json!(snippet),
        );
    }
    for (key, value) in parse_kv_pairs(&config.ingress_additional_annotations) {
        annotations.insert(key, json!(value));
    }
    annotations
}

/// Builds the Service + Ingress pair for `app`, both owned by the driver pod.
pub fn build_service_and_ingress(
    app: &Application,
    config: &Config,
) -> eyre::Result<(Service, Ingress)> {
    let driver_name = app.driver.name_any();
    let owner = app
        .driver
        .controller_owner_ref(&())
        .ok_or_else(|| eyre::eyre!("driver pod '{driver_name}' has no resolvable owner reference"))?;
    let ingress_name = ingress_name(&driver_name);

    let service: Service = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": driver_name,
            "namespace": app.namespace,
            "labels": {
                SPARK_APP_TAG_LABEL: app.tag,
                CREATED_BY_LABEL: CREATED_BY_VALUE,
            },
            "ownerReferences": [owner],
        },
        "spec": {
            "type": "ClusterIP",
            "clusterIP": "None",
            "selector": {
                SPARK_APP_TAG_LABEL: app.tag,
                SPARK_ROLE_LABEL: SPARK_ROLE_DRIVER,
            },
            "ports": [
                {
                    "name": SPARK_UI_PORT_NAME,
                    "port": SPARK_UI_PORT,
                    "targetPort": SPARK_UI_PORT,
                }
            ],
        },
    }))?;

    let mut tls = serde_json::Value::Null;
    if config.ingress_protocol.ends_with('s') {
        if let Some(secret_name) = &config.ingress_tls_secret_name {
            tls = json!([{
                "hosts": [config.ingress_host],
                "secretName": secret_name,
            }]);
        }
    }

    let mut ingress_spec = json!({
        "rules": [{
            "host": config.ingress_host,
            "http": {
                "paths": [{
                    "path": format!("/{}/", app.tag),
                    "pathType": "Prefix",
                    "backend": {
                        "service": {
                            "name": driver_name,
                            "port": { "name": SPARK_UI_PORT_NAME },
                        },
                    },
                }],
            },
        }],
    });
    if !tls.is_null() {
        ingress_spec["tls"] = tls;
    }

    let ingress: Ingress = serde_json::from_value(json!({
        "apiVersion": "networking.k8s.io/v1",
        "kind": "Ingress",
        "metadata": {
            "name": ingress_name,
            "namespace": app.namespace,
            "labels": {
                SPARK_APP_TAG_LABEL: app.tag,
                CREATED_BY_LABEL: CREATED_BY_VALUE,
            },
            "annotations": traefik_annotations(config),
            "ownerReferences": [owner],
        },
        "spec": ingress_spec,
    }))?;

    Ok((service, ingress))
}
