use std::fs;
use std::sync::Arc;

use kube::config::AuthInfo;
use kube::{Client, Config as KubeConfig};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::Config;
use crate::error::ClientError;

use super::k8s::K8sClusterClient;

static CLIENT: OnceCell<Arc<K8sClusterClient>> = OnceCell::const_new();

/// Strip a `k8s://` scheme and add `https://` when the master URL carries
/// none, mirroring how `spark-submit` accepts `k8s://host:port` but the
/// Kubernetes client expects a plain URL.
pub fn normalize_master_url(spark_master: &str) -> String {
    let stripped = spark_master.strip_prefix("k8s://").unwrap_or(spark_master);
    if stripped.starts_with("http://") || stripped.starts_with("https://") {
        stripped.to_owned()
    } else {
        format!("https://{stripped}")
    }
}

/// Builds the process-wide [`kube::Client`] from [`Config`], starting from
/// whatever ambient kubeconfig or in-cluster service account is available
/// and layering the explicit overrides on top.
pub async fn build_client(config: &Config) -> Result<Client, ClientError> {
    if config.oauth_token_file.is_some() && config.oauth_token_value.is_some() {
        return Err(ClientError::ConflictingCredentials);
    }

    let mut kube_config = KubeConfig::infer()
        .await
        .unwrap_or_else(|_| KubeConfig::new(normalize_master_url(&config.spark_master).parse().expect("valid master url")));

    kube_config.cluster_url = normalize_master_url(&config.spark_master)
        .parse()
        .expect("valid master url");
    kube_config.default_namespace = config.default_namespace.clone();

    let mut auth_info = AuthInfo::default();
    let mut auth_overridden = false;
    if let Some(path) = &config.oauth_token_file {
        let token = fs::read_to_string(path).map_err(|source| ClientError::TokenFileUnreadable {
            path: path.clone(),
            source,
        })?;
        auth_info.token = Some(token.trim().to_owned().into());
        auth_overridden = true;
    } else if let Some(token) = &config.oauth_token_value {
        auth_info.token = Some(token.clone().into());
        auth_overridden = true;
    }
    if let Some(ca) = &config.ca_cert_file {
        auth_info.certificate_authority = Some(ca.clone());
        auth_overridden = true;
    }
    if let Some(cert) = &config.client_cert_file {
        auth_info.client_certificate = Some(cert.clone());
        auth_overridden = true;
    }
    if let Some(key) = &config.client_key_file {
        auth_info.client_key = Some(key.clone());
        auth_overridden = true;
    }
    if auth_overridden {
        kube_config.auth_info = auth_info;
    }

    info!(cluster_url = %kube_config.cluster_url, "connecting to kubernetes");
    Client::try_from(kube_config).map_err(ClientError::Kube)
}

/// Initializes the process-wide client singleton. Must be called exactly
/// once, before the first [`get`].
pub async fn init(config: &Config) -> Result<(), ClientError> {
    let client = build_client(config).await?;
    let cluster_client = Arc::new(K8sClusterClient::new(client, config.namespaces.clone()));
    CLIENT
        .set(cluster_client)
        .map_err(|_| ())
        .expect("client::init called more than once");
    Ok(())
}

/// Returns the process-wide cluster client. Panics if [`init`] has not run;
/// every entry point calls it first.
pub fn get() -> Arc<K8sClusterClient> {
    CLIENT
        .get()
        .expect("client::init must run before client::get")
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_k8s_scheme_and_adds_https() {
        assert_eq!(
            normalize_master_url("k8s://https://kubernetes.default.svc"),
            "https://kubernetes.default.svc"
        );
        assert_eq!(
            normalize_master_url("k8s://kubernetes.default.svc:443"),
            "https://kubernetes.default.svc:443"
        );
    }

    #[test]
    fn leaves_explicit_scheme_alone() {
        assert_eq!(
            normalize_master_url("http://localhost:8080"),
            "http://localhost:8080"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_master_url("k8s://https://kubernetes.default.svc");
        let twice = normalize_master_url(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn bare_host_gets_https_prepended() {
        assert_eq!(
            normalize_master_url("kubernetes.default.svc"),
            "https://kubernetes.default.svc"
        );
    }
}

