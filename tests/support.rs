//! Shared fixtures for the end-to-end lifecycle tests: pod builders and
//! recording test doubles for [`Listener`]/[`ChildProcess`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use k8s_openapi::api::core::v1::{Pod, PodSpec, PodStatus};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressRule, IngressSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use spark_driver_monitor::child_process::ChildProcess;
use spark_driver_monitor::client::ClusterClient;
use spark_driver_monitor::config::Config;
use spark_driver_monitor::error::ClusterError;
use spark_driver_monitor::model::{AppInfo, Application, ApplicationReport, ApplicationState};
use spark_driver_monitor::Listener;

pub fn driver_pod(name: &str, tag: &str, app_id: &str, phase: &str) -> Pod {
    let mut labels = BTreeMap::new();
    labels.insert("spark-role".to_owned(), "driver".to_owned());
    labels.insert("spark-app-tag".to_owned(), tag.to_owned());
    labels.insert("spark-app-selector".to_owned(), app_id.to_owned());
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some("default".to_owned()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(PodSpec::default()),
        status: Some(PodStatus {
            phase: Some(phase.to_owned()),
            ..Default::default()
        }),
    }
}

pub fn ingress_with_host(host: &str) -> Ingress {
    Ingress {
        metadata: ObjectMeta::default(),
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_owned()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/t/".to_owned()),
                        path_type: "Prefix".to_owned(),
                        backend: Default::default(),
                    }],
                }),
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    AppIdKnown(String),
    StateChanged(ApplicationState, ApplicationState),
    InfoChanged(AppInfo),
}

/// Records every callback it receives, in order, behind a shared lock so the
/// driving test can inspect them after the monitor task finishes.
#[derive(Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingListener {
    pub fn new() -> (Self, Arc<Mutex<Vec<Event>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                events: events.clone(),
            },
            events,
        )
    }
}

impl Listener for RecordingListener {
    fn app_id_known(&self, app_id: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::AppIdKnown(app_id.to_owned()));
    }

    fn state_changed(&self, old: ApplicationState, new: ApplicationState) {
        self.events
            .lock()
            .unwrap()
            .push(Event::StateChanged(old, new));
    }

    fn info_changed(&self, info: &AppInfo) {
        self.events
            .lock()
            .unwrap()
            .push(Event::InfoChanged(info.clone()));
    }
}

#[derive(Default)]
pub struct RecordingChildProcess {
    destroyed: AtomicBool,
}

impl RecordingChildProcess {
    pub fn was_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

impl ChildProcess for RecordingChildProcess {
    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }

    fn input_lines(&self) -> Vec<String> {
        Vec::new()
    }

    fn error_lines(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Wraps a [`ClusterClient`] but makes `get_report` fail unconditionally,
/// standing in for a cluster that has become permanently unreachable
/// (permission revoked, namespace deleted) mid-poll.
pub struct FailingReportClusterClient<C> {
    inner: C,
}

impl<C> FailingReportClusterClient<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: ClusterClient> ClusterClient for FailingReportClusterClient<C> {
    async fn list_applications(&self) -> Result<Vec<Application>, ClusterError> {
        self.inner.list_applications().await
    }

    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Application>, ClusterError> {
        self.inner.find_by_tag(tag).await
    }

    async fn get_report(
        &self,
        _app: &Application,
        _log_window: usize,
    ) -> Result<ApplicationReport, ClusterError> {
        Err(ClusterError::Other(eyre::eyre!("cluster unreachable")))
    }

    async fn kill_application(&self, app: &Application) -> Result<bool, ClusterError> {
        self.inner.kill_application(app).await
    }

    async fn create_spark_ui_ingress(
        &self,
        app: &Application,
        config: &Config,
    ) -> Result<(), ClusterError> {
        self.inner.create_spark_ui_ingress(app, config).await
    }
}
