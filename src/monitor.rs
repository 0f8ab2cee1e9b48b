//! App Monitor (§4.3): per-application worker owning tag resolution, the
//! poll loop, state transitions, and teardown.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, span, warn, Instrument, Level};

use crate::client::ClusterClient;
use crate::config::Config;
use crate::child_process::ChildProcess;
use crate::leak_reaper::LeakedTags;
use crate::listener::{DedupingListener, Listener};
use crate::model::{Application, ApplicationState};
use crate::report;
use crate::retry::retry;

/// A value produced exactly once, observable by any number of awaiters
/// through a cloned [`Shared`] future. Built on `tokio::sync::oneshot` plus
/// `tokio::time::timeout` rather than a process-wide shutdown primitive,
/// since this is a single-value promise, not a broadcast signal.
struct Resolved<T: Clone + Send + 'static> {
    tx: Mutex<Option<oneshot::Sender<T>>>,
    shared: Shared<BoxFuture<'static, Option<T>>>,
}

impl<T: Clone + Send + 'static> Resolved<T> {
    fn new() -> Self {
        let (tx, rx) = oneshot::channel::<T>();
        let shared: Pin<Box<dyn Future<Output = Option<T>> + Send>> =
            async move { rx.await.ok() }.boxed();
        Self {
            tx: Mutex::new(Some(tx)),
            shared: shared.shared(),
        }
    }

    fn set(&self, value: T) {
        if let Some(tx) = self.tx.lock().unwrap().take() {
            let _ = tx.send(value);
        }
    }

    async fn wait(&self, timeout: Duration) -> Option<T> {
        tokio::time::timeout(timeout, self.shared.clone())
            .await
            .ok()
            .flatten()
    }
}

/// External handle to a running monitor task.
pub struct MonitorHandle {
    cancellation: CancellationToken,
    resolved: Arc<Resolved<Application>>,
    child_process: Arc<dyn ChildProcess>,
    app_lookup_timeout: Duration,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Kill contract (§4.3): bounded wait on resolution, then best-effort
    /// `killApplication`, then unconditional task cancellation and child
    /// process teardown.
    pub async fn kill<C: ClusterClient>(&self, client: &C) {
        match self.resolved.wait(self.app_lookup_timeout).await {
            Some(app) => match retry(&self.cancellation, || client.kill_application(&app)).await {
                Ok(_) => info!(tag = %app.tag, "kill requested"),
                Err(err) => warn!(tag = %app.tag, %err, "failed to kill application"),
            },
            None => warn!("kill() called before application resolved; cancelling monitor anyway"),
        }
        self.cancellation.cancel();
        self.child_process.destroy();
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

struct MonitorContext<C: ClusterClient, L: Listener> {
    client: Arc<C>,
    config: Arc<Config>,
    leaked_tags: LeakedTags,
    listener: DedupingListener<L>,
    child_process: Arc<dyn ChildProcess>,
    cancellation: CancellationToken,
    resolved: Arc<Resolved<Application>>,
}

/// Spawns the monitor task for `tag`, returning a handle to observe/kill it.
pub fn spawn<C, L>(
    tag: String,
    client: Arc<C>,
    config: Arc<Config>,
    leaked_tags: LeakedTags,
    listener: L,
    child_process: Arc<dyn ChildProcess>,
) -> MonitorHandle
where
    C: ClusterClient,
    L: Listener + 'static,
{
    let cancellation = CancellationToken::new();
    let resolved = Arc::new(Resolved::new());
    let app_lookup_timeout = config.app_lookup_timeout;

    let ctx = MonitorContext {
        client,
        config,
        leaked_tags,
        listener: DedupingListener::new(listener),
        child_process: child_process.clone(),
        cancellation: cancellation.clone(),
        resolved: resolved.clone(),
    };

    let span = span!(Level::INFO, "monitor", tag = %tag);
    let task = tokio::spawn(run(tag, ctx).instrument(span));

    MonitorHandle {
        cancellation,
        resolved,
        child_process,
        app_lookup_timeout,
        task,
    }
}

async fn run<C: ClusterClient, L: Listener>(tag: String, mut ctx: MonitorContext<C, L>) {
    let app = match resolve(&tag, &ctx).await {
        Resolution::Found(app) => app,
        Resolution::TimedOut => {
            ctx.child_process.destroy();
            ctx.leaked_tags.lock().unwrap().insert(tag.clone(), chrono::Utc::now());
            warn!(tag, "tag resolution timed out; recorded as leaked");
            ctx.listener.state_changed(ApplicationState::Failed);
            emit_final(&mut ctx, None).await;
            return;
        }
        Resolution::Cancelled => {
            info!(tag, "Application stopped by user");
            ctx.listener.state_changed(ApplicationState::Killed);
            emit_final(&mut ctx, None).await;
            return;
        }
    };
    ctx.resolved.set(app.clone());
    if let Some(app_id) = &app.app_id {
        ctx.listener.app_id_known(app_id);
    }

    if ctx.config.ingress_create {
        let ingress_result = retry(&ctx.cancellation, || {
            ctx.client.create_spark_ui_ingress(&app, &ctx.config)
        })
        .await;
        if let Err(err) = ingress_result {
            warn!(tag = %app.tag, %err, "failed to create spark ui ingress");
            ctx.listener.state_changed(ApplicationState::Failed);
            emit_final(&mut ctx, app.app_id.as_deref()).await;
            return;
        }
    }

    poll_until_terminal(&app, &mut ctx).await;
    emit_final(&mut ctx, app.app_id.as_deref()).await;
}

enum Resolution {
    Found(Application),
    TimedOut,
    Cancelled,
}

async fn resolve<C: ClusterClient, L: Listener>(tag: &str, ctx: &MonitorContext<C, L>) -> Resolution {
    let deadline = tokio::time::Instant::now() + ctx.config.app_lookup_timeout;
    loop {
        match retry(&ctx.cancellation, || ctx.client.find_by_tag(tag)).await {
            Ok(apps) => {
                if let Some(app) = apps.into_iter().next() {
                    return Resolution::Found(app);
                }
            }
            Err(err) => warn!(tag, %err, "error while resolving application, retrying"),
        }

        if tokio::time::Instant::now() >= deadline {
            return Resolution::TimedOut;
        }

        tokio::select! {
            _ = tokio::time::sleep(ctx.config.poll_interval) => {}
            _ = ctx.cancellation.cancelled() => return Resolution::Cancelled,
        }
    }
}

async fn poll_until_terminal<C: ClusterClient, L: Listener>(
    app: &Application,
    ctx: &mut MonitorContext<C, L>,
) -> ApplicationState {
    loop {
        let report = match retry(&ctx.cancellation, || {
            ctx.client.get_report(app, ctx.config.spark_logs_cache_size)
        })
        .await
        {
            Ok(report) => report,
            Err(err) => {
                warn!(tag = %app.tag, %err, "exhausted retries fetching application report, marking Failed");
                ctx.listener.state_changed(ApplicationState::Failed);
                return ApplicationState::Failed;
            }
        };

        let state = report::state(&report, &app.tag);
        ctx.listener.state_changed(state);
        let info = report::app_info(&report, &ctx.config, &app.tag);
        ctx.listener.info_changed(info);

        if state.is_terminal() {
            return state;
        }

        tokio::select! {
            _ = tokio::time::sleep(ctx.config.poll_interval) => {}
            _ = ctx.cancellation.cancelled() => {
                info!(tag = %app.tag, "Application stopped by user");
                ctx.listener.state_changed(ApplicationState::Killed);
                return ApplicationState::Killed;
            }
        }
    }
}

async fn emit_final<C: ClusterClient, L: Listener>(ctx: &mut MonitorContext<C, L>, app_id: Option<&str>) {
    let info = report::final_app_info(&ctx.config, app_id);
    ctx.listener.info_changed(info);
}
