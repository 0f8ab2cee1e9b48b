use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{ListParams, LogParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, warn};

use super::ClusterClient;
use crate::config::Config;
use crate::consts::{
    SPARK_APP_SELECTOR_LABEL, SPARK_APP_TAG_LABEL, SPARK_ROLE_DRIVER, SPARK_ROLE_EXECUTOR,
    SPARK_ROLE_LABEL,
};
use crate::error::{ClusterError, is_404_not_found_error};
use crate::ingress::build_service_and_ingress;
use crate::model::{Application, ApplicationReport, PodRole};

/// Kubernetes-backed [`ClusterClient`], scoped to the configured namespace
/// set (empty means all namespaces, §4.1).
pub struct K8sClusterClient {
    client: Client,
    namespaces: Vec<String>,
}

impl K8sClusterClient {
    pub fn new(client: Client, namespaces: Vec<String>) -> Self {
        Self { client, namespaces }
    }

    fn driver_apis(&self) -> Vec<Api<Pod>> {
        if self.namespaces.is_empty() {
            vec![Api::all(self.client.clone())]
        } else {
            self.namespaces
                .iter()
                .map(|ns| Api::namespaced(self.client.clone(), ns))
                .collect()
        }
    }

    async fn list_with_selector(&self, selector: &str) -> Result<Vec<Pod>, ClusterError> {
        let mut pods = Vec::new();
        for api in self.driver_apis() {
            let list = api.list(&ListParams::default().labels(selector)).await?;
            pods.extend(list.items);
        }
        Ok(pods)
    }

    fn to_application(pod: Pod) -> Application {
        let tag = pod
            .labels()
            .get(SPARK_APP_TAG_LABEL)
            .cloned()
            .unwrap_or_default();
        let app_id = pod.labels().get(SPARK_APP_SELECTOR_LABEL).cloned();
        let namespace = pod.namespace().unwrap_or_default();
        Application {
            tag,
            namespace,
            app_id,
            driver: pod,
        }
    }
}

impl ClusterClient for K8sClusterClient {
    async fn list_applications(&self) -> Result<Vec<Application>, ClusterError> {
        let selector = format!(
            "{SPARK_ROLE_LABEL}={SPARK_ROLE_DRIVER},{SPARK_APP_TAG_LABEL},{SPARK_APP_SELECTOR_LABEL}"
        );
        let pods = self.list_with_selector(&selector).await?;
        Ok(pods.into_iter().map(Self::to_application).collect())
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Application>, ClusterError> {
        let selector = format!("{SPARK_ROLE_LABEL}={SPARK_ROLE_DRIVER},{SPARK_APP_TAG_LABEL}={tag}");
        let pods = self.list_with_selector(&selector).await?;
        Ok(pods.into_iter().map(Self::to_application).collect())
    }

    async fn get_report(
        &self,
        app: &Application,
        log_window: usize,
    ) -> Result<ApplicationReport, ClusterError> {
        let pods_api: Api<Pod> = Api::namespaced(self.client.clone(), &app.namespace);
        let selector = format!("{SPARK_APP_TAG_LABEL}={}", app.tag);
        let list = pods_api
            .list(&ListParams::default().labels(&selector))
            .await?;

        let mut driver = None;
        let mut executors = Vec::new();
        for pod in list.items {
            match pod.labels().get(SPARK_ROLE_LABEL).and_then(|role| PodRole::from_label(role)) {
                Some(PodRole::Driver) if driver.is_none() => driver = Some(pod),
                Some(PodRole::Executor) => executors.push(pod),
                _ => {}
            }
        }
        executors.sort_by(|a, b| a.name_any().cmp(&b.name_any()));

        let log_window_lines = if let Some(driver) = &driver {
            let log_params = LogParams {
                tail_lines: Some(log_window as i64),
                ..Default::default()
            };
            match pods_api.logs(&driver.name_any(), &log_params).await {
                Ok(text) => text.lines().map(str::to_owned).collect(),
                Err(err) => {
                    warn!(tag = %app.tag, %err, "failed to fetch driver log window, using empty window");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let ingress_api: Api<Ingress> = Api::namespaced(self.client.clone(), &app.namespace);
        let ingress = ingress_api
            .list(&ListParams::default().labels(&selector))
            .await?
            .items
            .into_iter()
            .next();

        Ok(ApplicationReport {
            driver,
            executors,
            log_window: log_window_lines,
            ingress,
        })
    }

    async fn kill_application(&self, app: &Application) -> Result<bool, ClusterError> {
        let pods_api: Api<Pod> = Api::namespaced(self.client.clone(), &app.namespace);
        let name = app.driver.name_any();
        debug!(tag = %app.tag, pod = %name, "deleting driver pod");
        match pods_api.delete(&name, &Default::default()).await {
            Ok(_) => Ok(true),
            Err(err) if is_404_not_found_error(&err) => {
                debug!(tag = %app.tag, pod = %name, "pod already gone");
                Ok(true)
            }
            Err(err) => Err(ClusterError::Kube(err)),
        }
    }

    async fn create_spark_ui_ingress(
        &self,
        app: &Application,
        config: &Config,
    ) -> Result<(), ClusterError> {
        let (service, ingress) = build_service_and_ingress(app, config).map_err(ClusterError::Other)?;

        let services_api: Api<k8s_openapi::api::core::v1::Service> =
            Api::namespaced(self.client.clone(), &app.namespace);
        let ingress_api: Api<Ingress> = Api::namespaced(self.client.clone(), &app.namespace);

        let params = PatchParams::apply("spark-driver-monitor").force();
        services_api
            .patch(&service.name_any(), &params, &Patch::Apply(&service))
            .await?;
        ingress_api
            .patch(&ingress.name_any(), &params, &Patch::Apply(&ingress))
            .await?;

        Ok(())
    }
}
