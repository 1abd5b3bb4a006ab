//! End-to-end scenarios against a real (mock) HTTP target, exercising the
//! orchestrator in `slinger::run` rather than any single component.

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use slinger::config::Args;
use slinger::error::GunError;
use slinger::run;

fn write_ammo(bullets: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for raw in bullets {
        write!(file, "{}\n{}", raw.len(), raw).unwrap();
    }
    file.flush().unwrap();
    file
}

fn args_for(ammo: &NamedTempFile, server: &MockServer) -> Args {
    Args {
        ammo: ammo.path().to_path_buf(),
        target: server.address().to_string(),
        tls: false,
        workers: 4,
        low: 5.0,
        high: 5.0,
        duration: Duration::from_millis(300),
        cycle: false,
        timeout: Duration::from_secs(1),
        log_level: Some("slinger=warn".into()),
    }
}

const GET_ROOT: &str = "GET / HTTP/1.1\r\nHost: x\r\n\r\n";

#[tokio::test]
async fn aborts_before_any_wire_traffic_when_corpus_is_too_small() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // One bullet can't sustain 5 RPS for 10s without --cycle.
    let ammo = write_ammo(&[GET_ROOT]);
    let mut args = args_for(&ammo, &server);
    args.duration = Duration::from_secs(10);

    let err = run::run(args).await.unwrap_err();
    assert!(matches!(err, GunError::Shortfall { .. }));
}

#[tokio::test]
async fn one_shot_run_replays_the_whole_corpus_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let bullets: Vec<&str> = std::iter::repeat(GET_ROOT).take(50).collect();
    let ammo = write_ammo(&bullets);
    let mut args = args_for(&ammo, &server);
    args.low = 500.0;
    args.high = 500.0;
    args.duration = Duration::from_secs(1);

    let stats = run::run(args).await.unwrap();
    assert_eq!(stats.total_count, 50);
}

#[tokio::test]
async fn cyclic_run_keeps_replaying_a_small_corpus_for_the_whole_schedule() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let ammo = write_ammo(&[GET_ROOT]);
    let mut args = args_for(&ammo, &server);
    args.cycle = true;
    args.low = 20.0;
    args.high = 20.0;
    args.duration = Duration::from_millis(500);

    let stats = run::run(args).await.unwrap();
    // a single-bullet corpus cycled at ~20 RPS for 0.5s should clear it many
    // times over; just assert forward progress past the corpus length.
    assert!(stats.total_count > 1, "total_count={}", stats.total_count);
}

#[tokio::test]
async fn invalid_target_is_rejected_as_a_configuration_error() {
    let server = MockServer::start().await;
    let ammo = write_ammo(&[GET_ROOT]);
    let mut args = args_for(&ammo, &server);
    args.cycle = true; // avoid the shortfall precondition entirely
    args.target = "not a valid authority/// ".to_string();

    let err = run::run(args).await.unwrap_err();
    assert!(matches!(err, GunError::InvalidTarget(..)));
}

#[tokio::test]
async fn transport_errors_abort_the_run() {
    let server = MockServer::start().await;
    // No mock mounted: every request gets a 404 body from wiremock's
    // default responder, which is a transport success (not a GunError).
    // Instead, point at a target with nothing listening to force a
    // connection-level failure.
    drop(server);
    let unreachable = "127.0.0.1:1";

    let ammo = write_ammo(&[GET_ROOT]);
    let mut args = Args {
        ammo: ammo.path().to_path_buf(),
        target: unreachable.to_string(),
        tls: false,
        workers: 2,
        low: 50.0,
        high: 50.0,
        duration: Duration::from_millis(200),
        cycle: false,
        timeout: Duration::from_millis(200),
        log_level: Some("slinger=warn".into()),
    };
    args.cycle = true; // avoid the shortfall precondition entirely

    let err = run::run(args).await.unwrap_err();
    assert!(matches!(err, GunError::Transport(_)));
}
