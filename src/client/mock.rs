//! An in-memory [`ClusterClient`] driven by a shared pod inventory, standing
//! in for `mockall` (the trait's five methods don't warrant pulling in the
//! macro crate just for test doubles).

use std::collections::BTreeMap;
use std::sync::Mutex;

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::networking::v1::Ingress;
use kube::ResourceExt;

use super::ClusterClient;
use crate::config::Config;
use crate::consts::{SPARK_APP_TAG_LABEL, SPARK_ROLE_LABEL};
use crate::error::ClusterError;
use crate::model::{Application, ApplicationReport, PodRole};

#[derive(Default)]
struct Inventory {
    pods: BTreeMap<String, Pod>,
    ingresses: BTreeMap<String, Ingress>,
    log_lines: BTreeMap<String, Vec<String>>,
}

/// Test double for [`ClusterClient`]. Pods are keyed by name; `kill` removes
/// them, `create_spark_ui_ingress` records an ingress keyed by tag.
pub struct MockClusterClient {
    inventory: Mutex<Inventory>,
}

impl Default for MockClusterClient {
    fn default() -> Self {
        Self {
            inventory: Mutex::new(Inventory::default()),
        }
    }
}

impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pod(&self, pod: Pod) {
        self.inventory
            .lock()
            .unwrap()
            .pods
            .insert(pod.name_any(), pod);
    }

    pub fn set_log_lines(&self, pod_name: &str, lines: Vec<String>) {
        self.inventory
            .lock()
            .unwrap()
            .log_lines
            .insert(pod_name.to_owned(), lines);
    }

    pub fn remove_pod(&self, name: &str) {
        self.inventory.lock().unwrap().pods.remove(name);
    }

    pub fn insert_ingress(&self, tag: &str, ingress: Ingress) {
        self.inventory
            .lock()
            .unwrap()
            .ingresses
            .insert(tag.to_owned(), ingress);
    }

    pub fn pod_exists(&self, name: &str) -> bool {
        self.inventory.lock().unwrap().pods.contains_key(name)
    }

    pub fn ingress_count(&self) -> usize {
        self.inventory.lock().unwrap().ingresses.len()
    }

    fn to_application(pod: &Pod) -> Application {
        Application {
            tag: pod
                .labels()
                .get(SPARK_APP_TAG_LABEL)
                .cloned()
                .unwrap_or_default(),
            namespace: pod.namespace().unwrap_or_default(),
            app_id: pod
                .labels()
                .get(crate::consts::SPARK_APP_SELECTOR_LABEL)
                .cloned(),
            driver: pod.clone(),
        }
    }
}

fn is_role(pod: &Pod, role: PodRole) -> bool {
    pod.labels()
        .get(SPARK_ROLE_LABEL)
        .and_then(|value| PodRole::from_label(value))
        == Some(role)
}

impl ClusterClient for MockClusterClient {
    async fn list_applications(&self) -> Result<Vec<Application>, ClusterError> {
        let inventory = self.inventory.lock().unwrap();
        Ok(inventory
            .pods
            .values()
            .filter(|pod| is_role(pod, PodRole::Driver))
            .map(Self::to_application)
            .collect())
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Application>, ClusterError> {
        let inventory = self.inventory.lock().unwrap();
        Ok(inventory
            .pods
            .values()
            .filter(|pod| {
                is_role(pod, PodRole::Driver)
                    && pod.labels().get(SPARK_APP_TAG_LABEL).map(String::as_str) == Some(tag)
            })
            .map(Self::to_application)
            .collect())
    }

    async fn get_report(
        &self,
        app: &Application,
        log_window: usize,
    ) -> Result<ApplicationReport, ClusterError> {
        let inventory = self.inventory.lock().unwrap();
        let mut driver = None;
        let mut executors = Vec::new();
        for pod in inventory.pods.values() {
            if pod.labels().get(SPARK_APP_TAG_LABEL).map(String::as_str) != Some(app.tag.as_str()) {
                continue;
            }
            match pod.labels().get(SPARK_ROLE_LABEL).and_then(|role| PodRole::from_label(role)) {
                Some(PodRole::Driver) if driver.is_none() => driver = Some(pod.clone()),
                Some(PodRole::Executor) => executors.push(pod.clone()),
                _ => {}
            }
        }
        executors.sort_by(|a, b| a.name_any().cmp(&b.name_any()));

        let log_window_lines = driver
            .as_ref()
            .and_then(|pod| inventory.log_lines.get(&pod.name_any()))
            .map(|lines| {
                lines
                    .iter()
                    .rev()
                    .take(log_window)
                    .rev()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let ingress = inventory.ingresses.get(&app.tag).cloned();

        Ok(ApplicationReport {
            driver,
            executors,
            log_window: log_window_lines,
            ingress,
        })
    }

    async fn kill_application(&self, app: &Application) -> Result<bool, ClusterError> {
        let mut inventory = self.inventory.lock().unwrap();
        inventory.pods.remove(&app.driver.name_any());
        Ok(true)
    }

    async fn create_spark_ui_ingress(
        &self,
        app: &Application,
        config: &Config,
    ) -> Result<(), ClusterError> {
        let (_, ingress) = crate::ingress::build_service_and_ingress(app, config)
            .map_err(ClusterError::Other)?;
        self.inventory
            .lock()
            .unwrap()
            .ingresses
            .insert(app.tag.clone(), ingress);
        Ok(())
    }
}
