//! Application Report (§4.5): a pure function of `(driver?, executors, log
//! window, ingress?, config)` producing the fields surfaced to monitors and
//! listeners.

use std::fmt::Write as _;

use k8s_openapi::api::core::v1::{Container, Pod};
use kube::ResourceExt;

use try_some::try_some;

use crate::child_process::ChildProcess;
use crate::config::Config;
use crate::grafana;
use crate::model::{AppInfo, ApplicationReport, ApplicationState};

/// `state` (§4.5): lower-case driver phase, `unknown` (-> `Failed`) if there
/// is no driver pod yet.
pub fn state(report: &ApplicationReport, tag: &str) -> ApplicationState {
    let phase = report
        .driver
        .as_ref()
        .and_then(|pod| pod.status.as_ref())
        .and_then(|status| status.phase.as_deref())
        .unwrap_or("unknown");
    ApplicationState::from_pod_phase(phase, tag)
}

/// `trackingUrl` (§4.5): `<protocol>://<host>/<tag>` if the ingress exists
/// and its first rule carries a host.
pub fn tracking_url(report: &ApplicationReport, config: &Config, tag: &str) -> Option<String> {
    let host: &String = try_some!(report.ingress?.spec?.rules?.first()?.host?)?;
    Some(format!("{}://{host}/{tag}", config.ingress_protocol))
}

/// Builds the [`AppInfo`] surfaced to the listener while the application is
/// still running; `sparkUiUrl` is left unset until [`final_app_info`].
pub fn app_info(report: &ApplicationReport, config: &Config, tag: &str) -> AppInfo {
    AppInfo {
        driver_log_url: report.driver.as_ref().and_then(|pod| grafana::driver_log_url(pod, config)),
        tracking_url: tracking_url(report, config, tag),
        executors_log_urls: grafana::executor_log_urls(&report.executors, config),
        spark_ui_url: None,
    }
}

/// The one final [`AppInfo`] emitted on termination (§4.3): only
/// `sparkUiUrl`, pointing at the history server, is set.
pub fn final_app_info(config: &Config, app_id: Option<&str>) -> AppInfo {
    let spark_ui_url = config.ui_history_server_url.as_ref().map(|base| {
        format!("{base}/history/{}", app_id.unwrap_or("unknown"))
    });
    AppInfo {
        spark_ui_url,
        ..AppInfo::default()
    }
}

fn write_container(out: &mut String, container: &Container) {
    let _ = writeln!(out, "    - container: {}", container.name);
    if let Some(image) = &container.image {
        let _ = writeln!(out, "      image: {image}");
    }
    if let Some(resources) = &container.resources {
        if let Some(requests) = &resources.requests {
            let _ = writeln!(out, "      requests: {requests:?}");
        }
        if let Some(limits) = &resources.limits {
            let _ = writeln!(out, "      limits: {limits:?}");
        }
    }
    if let Some(command) = &container.command {
        let _ = writeln!(out, "      command: {}", command.join(" "));
    }
    if let Some(args) = &container.args {
        let _ = writeln!(out, "      args: {}", args.join(" "));
    }
}

fn write_pod(out: &mut String, pod: &Pod) {
    let _ = writeln!(out, "{}.{}", pod.name_any(), pod.namespace().unwrap_or_default());
    if let Some(spec) = &pod.spec {
        if let Some(node) = &spec.node_name {
            let _ = writeln!(out, "  node: {node}");
        }
        if let Some(hostname) = &spec.hostname {
            let _ = writeln!(out, "  hostname: {hostname}");
        }
    }
    if let Some(status) = &pod.status {
        if let Some(pod_ip) = &status.pod_ip {
            let _ = writeln!(out, "  podIp: {pod_ip}");
        }
        if let Some(start_time) = &status.start_time {
            let _ = writeln!(out, "  startTime: {}", start_time.0);
        }
        if let Some(phase) = &status.phase {
            let _ = writeln!(out, "  phase: {phase}");
        }
        if let Some(reason) = &status.reason {
            let _ = writeln!(out, "  reason: {reason}");
        }
        if let Some(message) = &status.message {
            let _ = writeln!(out, "  message: {message}");
        }
        if let Some(conditions) = &status.conditions {
            for condition in conditions {
                let _ = writeln!(out, "  condition: {}={}", condition.type_, condition.status);
            }
        }
    }
    if !pod.labels().is_empty() {
        let _ = writeln!(out, "  labels: {:?}", pod.labels());
    }
    if let Some(spec) = &pod.spec {
        for container in &spec.containers {
            write_container(out, container);
        }
    }
}

/// `diagnostics` (§4.5): driver first, then executors (caller passes them
/// pre-sorted by pod name, as [`crate::client::ClusterClient::get_report`]
/// returns them).
pub fn diagnostics(report: &ApplicationReport) -> String {
    let mut out = String::new();
    match &report.driver {
        Some(driver) => write_pod(&mut out, driver),
        None => out.push_str("no driver pod\n"),
    }
    for executor in &report.executors {
        write_pod(&mut out, executor);
    }
    out
}

/// `log` (§6): the three-part combined log sequence surfaced to the
/// submitter -- driver log window, child process stdio, then cluster
/// diagnostics.
pub fn combined_log(report: &ApplicationReport, child_process: &dyn ChildProcess) -> Vec<String> {
    let mut stdout = String::from("stdout:");
    for line in &report.log_window {
        stdout.push('\n');
        stdout.push_str(line);
    }

    let mut stderr = String::from("\nstderr:");
    for line in child_process
        .input_lines()
        .iter()
        .chain(child_process.error_lines().iter())
    {
        stderr.push('\n');
        stderr.push_str(line);
    }

    let diagnostics = format!("\nKubernetes Diagnostics:\n{}", diagnostics(report));

    vec![stdout, stderr, diagnostics]
}
