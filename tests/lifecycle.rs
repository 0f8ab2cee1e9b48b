//! End-to-end lifecycle scenarios, run against [`MockClusterClient`] instead
//! of a real cluster (mirroring the role `ApiResolver` test fixtures play in
//! the teacher's own integration tests, just without a `kind` cluster behind
//! them). Requires the `test-util` feature, which is what exposes
//! `spark_driver_monitor::client::mock` outside the crate's own test builds.
#![cfg(feature = "test-util")]

mod support;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use spark_driver_monitor::client::mock::MockClusterClient;
use spark_driver_monitor::client::ClusterClient;
use spark_driver_monitor::config::Config;
use spark_driver_monitor::leak_reaper::{new_leaked_tags, LeakReaper};
use spark_driver_monitor::model::ApplicationState;
use spark_driver_monitor::monitor;

use support::{
    driver_pod, ingress_with_host, Event, FailingReportClusterClient, RecordingChildProcess,
    RecordingListener,
};

fn config(extra: &[&str]) -> Arc<Config> {
    let mut args = vec!["spark-driver-monitor"];
    args.extend_from_slice(extra);
    Arc::new(Config::parse_from(args))
}

#[tokio::test]
async fn happy_path() {
    let client = Arc::new(MockClusterClient::new());
    client.insert_pod(driver_pod("driver-t1", "T1", "app-T1", "pending"));
    client.insert_ingress("T1", ingress_with_host("h"));

    let config = config(&[
        "--poll-interval",
        "20ms",
        "--ui-history-server-url",
        "http://hist",
    ]);
    let (listener, events) = RecordingListener::new();
    let child_process = Arc::new(RecordingChildProcess::default());

    let handle = monitor::spawn(
        "T1".to_owned(),
        client.clone(),
        config,
        new_leaked_tags(),
        listener,
        child_process,
    );

    // let resolution + the first poll (phase "pending" -> Starting) settle.
    tokio::time::sleep(Duration::from_millis(40)).await;
    client.insert_pod(driver_pod("driver-t1", "T1", "app-T1", "running"));

    tokio::time::sleep(Duration::from_millis(60)).await;
    client.insert_pod(driver_pod("driver-t1", "T1", "app-T1", "succeeded"));

    handle.join().await;

    let events = events.lock().unwrap();
    assert_eq!(events[0], Event::AppIdKnown("app-T1".to_owned()));
    assert!(events.contains(&Event::StateChanged(
        ApplicationState::Starting,
        ApplicationState::Running
    )));
    assert!(events.contains(&Event::StateChanged(
        ApplicationState::Running,
        ApplicationState::Finished
    )));

    let tracking_url_seen = events.iter().any(|event| {
        matches!(event, Event::InfoChanged(info) if info.tracking_url.as_deref() == Some("http://h/T1"))
    });
    assert!(tracking_url_seen, "expected a trackingUrl infoChanged event: {events:?}");

    let final_info_seen = events.iter().any(|event| {
        matches!(event, Event::InfoChanged(info) if info.spark_ui_url.as_deref() == Some("http://hist/history/app-T1"))
    });
    assert!(final_info_seen, "expected the final sparkUiUrl infoChanged event: {events:?}");

    // terminal: no further state transitions may follow Finished.
    let last_state_change = events.iter().rev().find_map(|event| match event {
        Event::StateChanged(_, new) => Some(*new),
        _ => None,
    });
    assert_eq!(last_state_change, Some(ApplicationState::Finished));
}

#[tokio::test]
async fn lookup_timeout_records_leaked_tag_and_terminates_failed() {
    let client = Arc::new(MockClusterClient::new());
    let config = config(&[
        "--app-lookup-timeout",
        "150ms",
        "--poll-interval",
        "20ms",
    ]);
    let (listener, events) = RecordingListener::new();
    let child_process = Arc::new(RecordingChildProcess::default());
    let leaked_tags = new_leaked_tags();

    let handle = monitor::spawn(
        "T2".to_owned(),
        client,
        config,
        leaked_tags.clone(),
        listener,
        child_process.clone(),
    );

    handle.join().await;

    assert!(child_process.was_destroyed());
    assert!(leaked_tags.lock().unwrap().contains_key("T2"));

    let events = events.lock().unwrap();
    assert!(events.contains(&Event::StateChanged(
        ApplicationState::Starting,
        ApplicationState::Failed
    )));
}

#[tokio::test]
async fn reaper_kills_leaked_tag_whose_pod_reappeared() {
    let client = Arc::new(MockClusterClient::new());
    client.insert_pod(driver_pod("driver-t3", "T3", "app-T3", "running"));

    let leaked_tags = new_leaked_tags();
    leaked_tags
        .lock()
        .unwrap()
        .insert("T3".to_owned(), chrono::Utc::now());

    let cancellation = tokio_util::sync::CancellationToken::new();
    let reaper = LeakReaper::new(
        client.clone(),
        leaked_tags.clone(),
        config(&["--leakage-check-interval", "20ms"]),
        cancellation.clone(),
    );
    let task = tokio::spawn(reaper.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancellation.cancel();
    task.await.unwrap();

    assert!(!leaked_tags.lock().unwrap().contains_key("T3"));
    assert!(!client.pod_exists("driver-t3"));
}

#[tokio::test]
async fn reaper_expires_leaked_tag_after_timeout() {
    let client = Arc::new(MockClusterClient::new());
    let leaked_tags = new_leaked_tags();
    leaked_tags.lock().unwrap().insert(
        "T4".to_owned(),
        chrono::Utc::now() - chrono::Duration::seconds(6),
    );

    let cancellation = tokio_util::sync::CancellationToken::new();
    let reaper = LeakReaper::new(
        client,
        leaked_tags.clone(),
        config(&[
            "--leakage-check-interval",
            "20ms",
            "--leakage-check-timeout",
            "5s",
        ]),
        cancellation.clone(),
    );
    let task = tokio::spawn(reaper.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancellation.cancel();
    task.await.unwrap();

    assert!(!leaked_tags.lock().unwrap().contains_key("T4"));
}

#[tokio::test]
async fn unknown_phase_terminates_failed_with_phase_in_diagnostics() {
    let client = Arc::new(MockClusterClient::new());
    client.insert_pod(driver_pod("driver-t5", "T5", "app-T5", "CrashLoopBackOff"));

    let report = client
        .get_report(
            &spark_driver_monitor::model::Application {
                tag: "T5".to_owned(),
                namespace: "default".to_owned(),
                app_id: Some("app-T5".to_owned()),
                driver: driver_pod("driver-t5", "T5", "app-T5", "CrashLoopBackOff"),
            },
            200,
        )
        .await
        .unwrap();
    assert!(spark_driver_monitor::report::diagnostics(&report).contains("CrashLoopBackOff"));

    let config = config(&["--poll-interval", "20ms"]);
    let (listener, events) = RecordingListener::new();
    let child_process = Arc::new(RecordingChildProcess::default());

    let handle = monitor::spawn(
        "T5".to_owned(),
        client,
        config,
        new_leaked_tags(),
        listener,
        child_process,
    );
    handle.join().await;

    let events = events.lock().unwrap();
    assert!(events.contains(&Event::StateChanged(
        ApplicationState::Starting,
        ApplicationState::Failed
    )));
}

#[tokio::test]
async fn persistent_report_errors_terminate_failed_instead_of_polling_forever() {
    let mock = MockClusterClient::new();
    mock.insert_pod(driver_pod("driver-t7", "T7", "app-T7", "pending"));
    let client = Arc::new(FailingReportClusterClient::new(mock));

    let config = config(&["--poll-interval", "10ms"]);
    let (listener, events) = RecordingListener::new();
    let child_process = Arc::new(RecordingChildProcess::default());

    let handle = monitor::spawn(
        "T7".to_owned(),
        client,
        config,
        new_leaked_tags(),
        listener,
        child_process.clone(),
    );

    handle.join().await;

    let events = events.lock().unwrap();
    assert!(events.contains(&Event::StateChanged(
        ApplicationState::Starting,
        ApplicationState::Failed
    )));

    // terminal: no further state transitions may follow Failed.
    let last_state_change = events.iter().rev().find_map(|event| match event {
        Event::StateChanged(_, new) => Some(*new),
        _ => None,
    });
    assert_eq!(last_state_change, Some(ApplicationState::Failed));
}

#[tokio::test]
async fn kill_before_resolution_interrupts_the_monitor() {
    let client = Arc::new(MockClusterClient::new());
    let config = config(&[
        "--app-lookup-timeout",
        "150ms",
        "--poll-interval",
        "20ms",
    ]);
    let (listener, _events) = RecordingListener::new();
    let child_process = Arc::new(RecordingChildProcess::default());

    let handle = monitor::spawn(
        "T6".to_owned(),
        client.clone(),
        config,
        new_leaked_tags(),
        listener,
        child_process.clone(),
    );

    handle.kill(client.as_ref()).await;

    assert!(child_process.was_destroyed());
}
