//! The Cluster Client (§4.1): a thin typed facade over the Kubernetes API
//! that the rest of the crate talks to exclusively through this trait, so
//! monitors and the leak reaper can be driven against [`MockClusterClient`]
//! in tests the same way `pod-graceful-drain`'s reconciler is driven against
//! a recorded `ApiResolver`.

pub mod factory;
pub mod k8s;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

use crate::config::Config;
use crate::error::ClusterError;
use crate::model::{Application, ApplicationReport};

/// Every method here must be safe to call concurrently (§5) and retry-safe
/// at the caller (§4.1): list/get are naturally idempotent, `kill` is
/// idempotent in effect (deleting an already-deleted pod is not an error),
/// and ingress creation is create-or-replace.
pub trait ClusterClient: Send + Sync + 'static {
    /// List driver pods across the configured namespace scope, filtered to
    /// those carrying both the tag and app-id labels.
    async fn list_applications(&self) -> Result<Vec<Application>, ClusterError>;

    /// List driver pods across the configured namespace scope that carry
    /// `tag` in their tag label, first match preserved by namespace then
    /// pod-name iteration order. Used by tag resolution and by the reaper
    /// to find *all* drivers for a leaked tag (duplicate-tag semantics, §9).
    async fn find_by_tag(&self, tag: &str) -> Result<Vec<Application>, ClusterError>;

    /// Snapshot of driver/executors/log window/ingress for one application.
    async fn get_report(
        &self,
        app: &Application,
        log_window: usize,
    ) -> Result<ApplicationReport, ClusterError>;

    /// Delete the driver pod. Returns whether the cluster reports success;
    /// deleting an already-gone pod counts as success.
    async fn kill_application(&self, app: &Application) -> Result<bool, ClusterError>;

    /// Create-or-replace the Service+Ingress pair fronting the Spark UI.
    async fn create_spark_ui_ingress(
        &self,
        app: &Application,
        config: &Config,
    ) -> Result<(), ClusterError>;
}
