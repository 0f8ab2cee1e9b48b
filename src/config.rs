use std::time::Duration;

use clap::Parser;
use humantime::parse_duration;

/// Process-wide configuration (§6). Every duration-valued option is parsed
/// with [`humantime::parse_duration`], the same as the teacher's
/// `delete_after` option.
#[derive(Clone, Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Deadline for resolving a submitted tag to a driver pod.
    #[arg(long, default_value = "2m", value_parser = parse_duration)]
    pub app_lookup_timeout: Duration,

    /// Interval between cluster polls, both during resolution and while running.
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub poll_interval: Duration,

    /// How often the leak reaper sweeps the leaked-tag table.
    #[arg(long, default_value = "1m", value_parser = parse_duration)]
    pub leakage_check_interval: Duration,

    /// How long a leaked tag with no matching pod is kept before it expires.
    #[arg(long, default_value = "10m", value_parser = parse_duration)]
    pub leakage_check_timeout: Duration,

    /// Maximum number of driver log lines retained in a report's log window.
    #[arg(long, default_value_t = 200)]
    pub spark_logs_cache_size: usize,

    /// Namespaces to scope list operations to; empty means all namespaces.
    #[arg(long, value_delimiter = ',')]
    pub namespaces: Vec<String>,

    #[arg(long, default_value_t = false)]
    pub ingress_create: bool,

    #[arg(long, default_value = "http")]
    pub ingress_protocol: String,

    #[arg(long, default_value = "")]
    pub ingress_host: String,

    #[arg(long)]
    pub ingress_tls_secret_name: Option<String>,

    /// `k=v;k2=v2` form, merged with the fixed traefik annotation set.
    #[arg(long, default_value = "")]
    pub ingress_additional_annotations: String,

    #[arg(long)]
    pub ingress_additional_conf_snippet: Option<String>,

    #[arg(long, default_value_t = false)]
    pub grafana_loki_enabled: bool,

    #[arg(long)]
    pub grafana_url: Option<String>,

    #[arg(long, default_value = "1h")]
    pub grafana_time_range: String,

    #[arg(long)]
    pub grafana_loki_datasource: Option<String>,

    #[arg(long)]
    pub ui_history_server_url: Option<String>,

    #[arg(long, default_value = "k8s://https://kubernetes.default.svc")]
    pub spark_master: String,

    #[arg(long)]
    pub oauth_token_file: Option<String>,

    #[arg(long)]
    pub oauth_token_value: Option<String>,

    #[arg(long)]
    pub ca_cert_file: Option<String>,

    #[arg(long)]
    pub client_key_file: Option<String>,

    #[arg(long)]
    pub client_cert_file: Option<String>,

    #[arg(long, default_value = "default")]
    pub default_namespace: String,
}
