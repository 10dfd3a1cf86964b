//! Streaming session tests driving real child processes through `sh`.

#![cfg(unix)]

use std::time::Duration;

use netprobe::traceroute::COMPLETED_MESSAGE;
use netprobe::{PingSupervisor, ProbeCommand, SessionError, StreamEvent, TracerouteRunner};
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn sh(script: &str) -> ProbeCommand {
    ProbeCommand::new("sh").arg("-c").arg(script)
}

async fn next(rx: &mut mpsc::Receiver<StreamEvent>) -> Option<StreamEvent> {
    timeout(WAIT, rx.recv()).await.expect("Timeout waiting for stream event")
}

fn line(text: &str) -> Option<StreamEvent> {
    Some(StreamEvent::Line(text.to_string()))
}

fn is_alive(pid: &str) -> bool {
    std::process::Command::new("sh")
        .arg("-c")
        .arg(format!("kill -0 {pid} 2>/dev/null"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(WAIT, async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}

#[tokio::test]
async fn test_ping_stream_then_stop_returns_summary() {
    let _ = tracing_subscriber::fmt::try_init();

    let supervisor = PingSupervisor::default();
    let script = "echo 'Reply from 8.8.8.8: bytes=32 time=10ms TTL=117'; \
                  echo 'Reply from 8.8.8.8: bytes=32 time=20ms TTL=117'; \
                  echo 'Request timed out.'; \
                  echo 'Reply from 8.8.8.8: bytes=32 time=30ms TTL=117'; \
                  exec sleep 30";
    let mut rx = supervisor.start_command("abc", sh(script)).await.unwrap();

    assert_eq!(next(&mut rx).await, line("Reply from 8.8.8.8: bytes=32 time=10ms TTL=117"));
    assert_eq!(next(&mut rx).await, line("Reply from 8.8.8.8: bytes=32 time=20ms TTL=117"));
    assert_eq!(next(&mut rx).await, line("Request timed out."));
    assert_eq!(next(&mut rx).await, line("Reply from 8.8.8.8: bytes=32 time=30ms TTL=117"));
    assert!(supervisor.registry().contains("abc").await);

    let summary = supervisor.stop("abc").await.expect("session should be running");
    assert_eq!(summary.sent, 4);
    assert_eq!(summary.received, 3);
    assert_eq!(summary.lost, 1);
    assert_eq!(summary.loss_rate_display(), "25.00");
    assert_eq!(summary.min, 10);
    assert_eq!(summary.max, 30);
    assert_eq!(summary.average_display(), "20.00");

    // Stopping closes the client's stream.
    assert_eq!(next(&mut rx).await, None);

    assert!(!supervisor.registry().contains("abc").await);
    assert!(supervisor.stop("abc").await.is_none());
}

#[tokio::test]
async fn test_duplicate_id_rejected_while_active() {
    let supervisor = PingSupervisor::default();
    let mut rx = supervisor.start_command("dup", sh("echo ready; exec sleep 30")).await.unwrap();
    assert_eq!(next(&mut rx).await, line("ready"));

    let second = supervisor.start_command("dup", sh("echo second")).await;
    assert!(matches!(second, Err(SessionError::AlreadyRunning(id)) if id == "dup"));

    assert!(supervisor.stop("dup").await.is_some());
    assert_eq!(next(&mut rx).await, None);

    // The identifier is free again once the first session is gone.
    let mut rx = supervisor.start_command("dup", sh("echo again")).await.unwrap();
    assert_eq!(next(&mut rx).await, line("again"));
}

#[tokio::test]
async fn test_client_disconnect_kills_process_and_releases_entry() {
    let supervisor = PingSupervisor::default();
    let mut rx = supervisor.start_command("gone", sh("echo $$; exec sleep 30")).await.unwrap();

    let pid = match next(&mut rx).await {
        Some(StreamEvent::Line(pid)) => pid,
        other => panic!("expected pid line, got {other:?}"),
    };
    assert!(is_alive(&pid));

    drop(rx);

    let registry = supervisor.registry().clone();
    wait_until(|| {
        let registry = registry.clone();
        async move { !registry.contains("gone").await }
    })
    .await;
    wait_until(|| {
        let pid = pid.clone();
        async move { !is_alive(&pid) }
    })
    .await;

    assert!(supervisor.stop("gone").await.is_none());
}

#[tokio::test]
async fn test_process_exit_completes_stream() {
    let supervisor = PingSupervisor::default();
    let mut rx = supervisor
        .start_command("short", sh("echo first; echo 'oops' >&2; printf 'second\\nunterminated'"))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = next(&mut rx).await {
        events.push(event);
    }

    let lines: Vec<_> = events.iter().filter(|e| matches!(e, StreamEvent::Line(_))).cloned().collect();
    assert_eq!(
        lines,
        vec![StreamEvent::Line("first".into()), StreamEvent::Line("second".into())]
    );
    assert!(events.contains(&StreamEvent::Error { prefix: "Error", message: "oops".into() }));
    assert!(!supervisor.registry().contains("short").await);
}

#[tokio::test]
async fn test_unterminated_error_output_reaches_ping_client() {
    let supervisor = PingSupervisor::default();
    let mut rx = supervisor.start_command("bad", sh("printf 'ping: bad' >&2; exit 2")).await.unwrap();

    assert_eq!(
        next(&mut rx).await,
        Some(StreamEvent::Error { prefix: "Error", message: "ping: bad".into() })
    );
    assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn test_stop_answered_while_client_not_reading() {
    let supervisor = PingSupervisor::default().with_buffer(1);
    let script = "for i in 1 2 3 4 5 6 7 8; do echo \"Reply from 8.8.8.8: time=${i}ms\"; done; exec sleep 30";
    let mut rx = supervisor.start_command("slow", sh(script)).await.unwrap();

    // One line fills the channel; the session is now blocked on the next one.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let summary = timeout(WAIT, supervisor.stop("slow"))
        .await
        .expect("stop should not wait for the client")
        .expect("session should be running");
    assert_eq!(summary.received, 2);
    assert_eq!(summary.min, 1);
    assert_eq!(summary.max, 2);

    assert_eq!(next(&mut rx).await, line("Reply from 8.8.8.8: time=1ms"));
    assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let supervisor = PingSupervisor::default();
    let mut a = supervisor.start_command("a", sh("echo a; exec sleep 30")).await.unwrap();
    let mut b = supervisor.start_command("b", sh("echo b; exec sleep 30")).await.unwrap();

    assert_eq!(next(&mut a).await, line("a"));
    assert_eq!(next(&mut b).await, line("b"));

    assert!(supervisor.stop("a").await.is_some());
    assert_eq!(next(&mut a).await, None);
    assert!(supervisor.registry().contains("b").await);

    assert!(supervisor.stop("b").await.is_some());
    assert!(supervisor.registry().is_empty().await);
}

#[tokio::test]
async fn test_traceroute_ends_with_completed_event() {
    let runner = TracerouteRunner::default();
    let script = "echo 'traceroute to example.com (93.184.216.34), 30 hops max'; \
                  echo ' 1  gateway (192.168.1.1)  1.123 ms'; \
                  echo ' 2  93.184.216.34  12.456 ms'";
    let mut rx = runner.start_command(sh(script));

    assert_eq!(next(&mut rx).await, line("traceroute to example.com (93.184.216.34), 30 hops max"));
    assert_eq!(next(&mut rx).await, line("1  gateway (192.168.1.1)  1.123 ms"));
    assert_eq!(next(&mut rx).await, line("2  93.184.216.34  12.456 ms"));
    assert_eq!(next(&mut rx).await, Some(StreamEvent::Completed(COMPLETED_MESSAGE)));
    assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn test_traceroute_error_output_is_tagged() {
    let runner = TracerouteRunner::default();
    let mut rx = runner.start_command(sh("echo 'unknown host' >&2; exit 1"));

    assert_eq!(
        next(&mut rx).await,
        Some(StreamEvent::Error { prefix: "ERROR", message: "unknown host".into() })
    );
    assert_eq!(next(&mut rx).await, Some(StreamEvent::Completed(COMPLETED_MESSAGE)));
    assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn test_traceroute_unterminated_error_is_reported() {
    let runner = TracerouteRunner::default();
    let mut rx = runner.start_command(sh("printf 'unknown host foo' >&2; exit 2"));

    assert_eq!(
        next(&mut rx).await,
        Some(StreamEvent::Error { prefix: "ERROR", message: "unknown host foo".into() })
    );
    assert_eq!(next(&mut rx).await, Some(StreamEvent::Completed(COMPLETED_MESSAGE)));
    assert_eq!(next(&mut rx).await, None);
}

#[tokio::test]
async fn test_traceroute_disconnect_kills_process() {
    let runner = TracerouteRunner::default();
    let mut rx = runner.start_command(sh("echo $$; exec sleep 30"));

    let pid = match next(&mut rx).await {
        Some(StreamEvent::Line(pid)) => pid,
        other => panic!("expected pid line, got {other:?}"),
    };
    drop(rx);

    wait_until(|| {
        let pid = pid.clone();
        async move { !is_alive(&pid) }
    })
    .await;
}
