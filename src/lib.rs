pub mod child_process;
pub mod client;
pub mod config;
pub mod consts;
pub mod error;
pub mod grafana;
pub mod ingress;
pub mod leak_reaper;
pub mod listener;
pub mod model;
pub mod monitor;
pub mod report;
pub mod retry;
pub mod utils;

pub use config::Config;
pub use leak_reaper::{new_leaked_tags, LeakReaper, LeakedTags};
pub use listener::Listener;
pub use model::{Application, ApplicationState};
pub use monitor::MonitorHandle;
