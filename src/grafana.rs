//! Grafana/Loki explore-view URL construction (§4.5, §6).
//!
//! Reuses `percent_encoding::utf8_percent_encode`, the same crate
//! `api_resolver.rs` uses to encode impersonation header values.

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::json;

use crate::config::Config;
use crate::consts::{SPARK_APP_TAG_LABEL, SPARK_EXEC_ID_LABEL, SPARK_ROLE_LABEL};

/// `spark-app-tag` -> `spark_app_tag`: LogQL label names can't contain `-`.
fn to_logql_label(label: &str) -> String {
    label.replace('-', "_")
}

fn explore_url(config: &Config, expr: &str) -> String {
    let base = config.grafana_url.as_deref().unwrap_or_default();
    let datasource = config.grafana_loki_datasource.as_deref().unwrap_or_default();
    let left = json!([
        format!("now-{}", config.grafana_time_range),
        "now",
        datasource,
        { "expr": expr },
        { "ui": [true, true, true, "exact"] },
    ]);
    let encoded = utf8_percent_encode(&left.to_string(), NON_ALPHANUMERIC).to_string();
    format!("{base}/explore?left={encoded}")
}

/// `driverLogUrl` (§4.5): none unless Loki is enabled and the driver carries
/// a tag label.
pub fn driver_log_url(driver: &Pod, config: &Config) -> Option<String> {
    if !config.grafana_loki_enabled {
        return None;
    }
    let tag = driver.labels().get(SPARK_APP_TAG_LABEL)?;
    let expr = format!(
        r#"{{{}="{tag}",{}="driver"}}"#,
        to_logql_label(SPARK_APP_TAG_LABEL),
        to_logql_label(SPARK_ROLE_LABEL),
    );
    Some(explore_url(config, &expr))
}

/// `executorsLogUrls` (§4.5): `;`-joined `executor-<execId>#<url>` entries,
/// skipping executors missing either the tag or exec-id label.
pub fn executor_log_urls(executors: &[Pod], config: &Config) -> Option<String> {
    if !config.grafana_loki_enabled {
        return None;
    }
    let entries: Vec<String> = executors
        .iter()
        .filter_map(|pod| {
            let tag = pod.labels().get(SPARK_APP_TAG_LABEL)?;
            let exec_id = pod.labels().get(SPARK_EXEC_ID_LABEL)?;
            let expr = format!(
                r#"{{{}="{tag}",{}="executor",{}="{exec_id}"}}"#,
                to_logql_label(SPARK_APP_TAG_LABEL),
                to_logql_label(SPARK_ROLE_LABEL),
                to_logql_label(SPARK_EXEC_ID_LABEL),
            );
            Some(format!("executor-{exec_id}#{}", explore_url(config, &expr)))
        })
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(entries.join(";"))
    }
}
