use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::networking::v1::Ingress;
use tracing::warn;

use crate::consts::{SPARK_ROLE_DRIVER, SPARK_ROLE_EXECUTOR};

/// A submitted Spark job, identified by `(tag, namespace)` (§3).
#[derive(Clone, Debug)]
pub struct Application {
    pub tag: String,
    pub namespace: String,
    pub app_id: Option<String>,
    pub driver: Pod,
}

/// Finite application lifecycle (§3). `Finished`, `Failed` and `Killed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplicationState {
    Starting,
    Running,
    Finished,
    Failed,
    Killed,
}

impl ApplicationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationState::Finished | ApplicationState::Failed | ApplicationState::Killed
        )
    }

    /// Case-insensitive pod-phase -> state mapping (§3). Anything outside the
    /// known set maps to `Failed`, with a diagnostic logged against `tag`.
    pub fn from_pod_phase(phase: &str, tag: &str) -> Self {
        match phase.to_ascii_lowercase().as_str() {
            "pending" => ApplicationState::Starting,
            "running" => ApplicationState::Running,
            "succeeded" => ApplicationState::Finished,
            "failed" => ApplicationState::Failed,
            other => {
                warn!(tag, phase = other, "unknown pod phase, treating as Failed");
                ApplicationState::Failed
            }
        }
    }
}

/// Driver vs executor, distinguished by the `spark-role` label (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PodRole {
    Driver,
    Executor,
}

impl PodRole {
    /// Parses a `spark-role` label value; `None` for anything else.
    pub fn from_label(value: &str) -> Option<Self> {
        if value == SPARK_ROLE_DRIVER {
            Some(PodRole::Driver)
        } else if value == SPARK_ROLE_EXECUTOR {
            Some(PodRole::Executor)
        } else {
            None
        }
    }
}

/// Immutable per-poll snapshot of cluster state for one application (§3, §4.5).
#[derive(Clone, Debug)]
pub struct ApplicationReport {
    pub driver: Option<Pod>,
    pub executors: Vec<Pod>,
    pub log_window: Vec<String>,
    pub ingress: Option<Ingress>,
}

/// Fields surfaced to the listener; only re-emitted when they change (§3).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppInfo {
    pub driver_log_url: Option<String>,
    pub tracking_url: Option<String>,
    pub executors_log_urls: Option<String>,
    pub spark_ui_url: Option<String>,
}
