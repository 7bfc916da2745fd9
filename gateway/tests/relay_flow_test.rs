//! Real relay flow tests
//!
//! These tests start an actual tweet service and an actual gateway on
//! ephemeral ports, post readings over HTTP, and check what comes out the
//! other end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use clima_core::proto::{TweetService, TweetServiceClient};
use clima_core::{CallError, TweetRequest, TweetResponse};
use clima_gateway::{Ack, AppState, CircuitBreakerSink, GrpcSink, TweetSink, serve};
use clima_service::{RpcServer, ServiceConfig, ShutdownOutcome, TweetHandler, TweetJournal};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::{Code, Request, Response, Status};

const DEADLINE: Duration = Duration::from_secs(5);

// ============================================================================
// Slow service - answers after a fixed delay, counting completions
// ============================================================================

#[derive(Clone)]
struct SlowService {
    delay: Duration,
    completed: Arc<AtomicU64>,
}

#[tonic::async_trait]
impl TweetService for SlowService {
    async fn send_tweet(
        &self,
        request: Request<TweetRequest>,
    ) -> Result<Response<TweetResponse>, Status> {
        tokio::time::sleep(self.delay).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(TweetResponse {
            status: format!("late ack for {}", request.into_inner().country),
        }))
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

struct RunningService {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<clima_service::Result<ShutdownOutcome>>,
}

impl RunningService {
    async fn stop(self) {
        self.stop.send(()).unwrap();
        self.handle.await.unwrap().unwrap();
    }
}

async fn start_service_at<S: TweetService>(addr: SocketAddr, service: S) -> RunningService {
    let config = ServiceConfig {
        listen_addr: addr,
        drain_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let server = RpcServer::bind(&config, service).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(server.serve_with_shutdown(async move {
        let _ = stop_rx.await;
    }));

    RunningService { addr, stop, handle }
}

async fn start_service<S: TweetService>(service: S) -> RunningService {
    start_service_at("127.0.0.1:0".parse().unwrap(), service).await
}

/// Start a gateway relaying to `sink`; runs until the test ends
async fn start_gateway(sink: Arc<dyn TweetSink>, deadline: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(sink, deadline);

    tokio::spawn(async move {
        serve(listener, state, std::future::pending()).await.ok();
    });

    format!("http://{addr}")
}

async fn grpc_sink(addr: SocketAddr) -> Arc<dyn TweetSink> {
    Arc::new(
        GrpcSink::connect(&addr.to_string(), Duration::from_secs(1))
            .await
            .expect("Failed to connect"),
    )
}

async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn reading(location: &str, condition: &str) -> serde_json::Value {
    serde_json::json!({
        "name": location,
        "temperatura": 22,
        "humedad": 55,
        "clima": condition,
    })
}

async fn post_reading(
    http: &reqwest::Client,
    gateway: &str,
    body: &serde_json::Value,
) -> (reqwest::StatusCode, Ack) {
    let response = http
        .post(format!("{gateway}/clima"))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status();
    (status, response.json::<Ack>().await.unwrap())
}

// ============================================================================
// REAL FLOW TESTS
// ============================================================================

/// One reading in, one tweet logged on the service
#[tokio::test]
async fn test_reading_flows_end_to_end() {
    let handler = TweetHandler::new(TweetJournal::new(16));
    let journal = handler.journal();
    let service = start_service(handler).await;
    let gateway = start_gateway(grpc_sink(service.addr).await, DEADLINE).await;

    let http = reqwest::Client::new();
    let (status, ack) = post_reading(&http, &gateway, &reading("guatemala", "soleado")).await;

    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(ack.status, "success");
    assert_eq!(
        ack.message,
        "Tweet from guatemala received and processed correctly"
    );

    let recent = journal.recent();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].country, "guatemala");
    assert_eq!(recent[0].weather, "soleado");
    assert_eq!(
        recent[0].description,
        "Weather in guatemala: soleado, Temperature: 22°C, Humidity: 55%"
    );

    service.stop().await;
}

/// Empty location/condition pass the gateway but are rejected by the service
#[tokio::test]
async fn test_incomplete_reading_is_rejected_by_service() {
    let handler = TweetHandler::new(TweetJournal::new(16));
    let journal = handler.journal();
    let service = start_service(handler).await;
    let gateway = start_gateway(grpc_sink(service.addr).await, DEADLINE).await;

    let http = reqwest::Client::new();
    for body in [reading("", "soleado"), reading("mexico", "")] {
        let (status, ack) = post_reading(&http, &gateway, &body).await;
        assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ack.message, "internal processing error");
    }

    assert_eq!(journal.rejected_count(), 2);
    assert_eq!(journal.accepted_count(), 0);

    // The raw status still reads "Error: ..." for anyone inspecting text
    let mut raw = TweetServiceClient::connect(format!("http://{}", service.addr))
        .await
        .unwrap();
    let status = raw
        .send_tweet(TweetRequest {
            description: "d".into(),
            country: String::new(),
            weather: "w".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
    assert!(status.message().starts_with("Error:"));
}

/// Missing keys are not malformed; the service rejects the incomplete tweet
#[tokio::test]
async fn test_missing_keys_reach_service_and_are_rejected() {
    let handler = TweetHandler::new(TweetJournal::new(16));
    let journal = handler.journal();
    let service = start_service(handler).await;
    let gateway = start_gateway(grpc_sink(service.addr).await, DEADLINE).await;

    let (status, ack) = post_reading(
        &reqwest::Client::new(),
        &gateway,
        &serde_json::json!({ "name": "x" }),
    )
    .await;

    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ack.status, "error");
    assert_eq!(journal.rejected_count(), 1);
    assert_eq!(journal.accepted_count(), 0);
}

/// The sink surfaces the rejection as a typed error
#[tokio::test]
async fn test_sink_classifies_rejection() {
    let service = start_service(TweetHandler::new(TweetJournal::new(4))).await;
    let sink = grpc_sink(service.addr).await;

    let err = sink
        .send(
            TweetRequest {
                description: "Weather in x".into(),
                country: "x".into(),
                weather: String::new(),
            },
            DEADLINE,
        )
        .await
        .unwrap_err();

    match err {
        CallError::Rejected {
            reason,
            missing_fields,
        } => {
            assert_eq!(reason, "incomplete data");
            assert_eq!(missing_fields, vec!["weather"]);
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

/// Malformed bodies are answered locally, the service never sees them
#[tokio::test]
async fn test_malformed_body_makes_no_call() {
    let completed = Arc::new(AtomicU64::new(0));
    let service = start_service(SlowService {
        delay: Duration::ZERO,
        completed: Arc::clone(&completed),
    })
    .await;
    let gateway = start_gateway(grpc_sink(service.addr).await, DEADLINE).await;

    let http = reqwest::Client::new();
    let response = http
        .post(format!("{gateway}/clima"))
        .body("{\"name\": \"guatemala\", \"temperatura\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    assert_eq!(completed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wrong_method_is_405() {
    let sink: Arc<dyn TweetSink> = Arc::new(
        GrpcSink::connect_lazy(&dead_addr().await.to_string(), Duration::from_millis(200)).unwrap(),
    );
    let gateway = start_gateway(sink, DEADLINE).await;

    let response = reqwest::Client::new()
        .get(format!("{gateway}/clima"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);
}

/// A dead service yields 500 quickly instead of hanging
#[tokio::test]
async fn test_unreachable_service_is_bounded_500() {
    let sink: Arc<dyn TweetSink> = Arc::new(
        GrpcSink::connect_lazy(&dead_addr().await.to_string(), Duration::from_secs(1)).unwrap(),
    );
    let gateway = start_gateway(sink, DEADLINE).await;

    let started = Instant::now();
    let (status, ack) =
        post_reading(&reqwest::Client::new(), &gateway, &reading("peru", "nublado")).await;

    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ack.status, "error");
    assert!(started.elapsed() < DEADLINE + Duration::from_secs(1));
}

/// Liveness never depends on the service
#[tokio::test]
async fn test_health_ok_while_service_down() {
    let sink: Arc<dyn TweetSink> = Arc::new(
        GrpcSink::connect_lazy(&dead_addr().await.to_string(), Duration::from_secs(1)).unwrap(),
    );
    let gateway = start_gateway(sink, DEADLINE).await;

    let response = reqwest::get(format!("{gateway}/health")).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

/// Timeout is reported to the producer; the service may still finish later
#[tokio::test]
async fn test_slow_service_hits_deadline_and_completes_late() {
    let completed = Arc::new(AtomicU64::new(0));
    let service = start_service(SlowService {
        delay: Duration::from_millis(800),
        completed: Arc::clone(&completed),
    })
    .await;
    let gateway = start_gateway(grpc_sink(service.addr).await, Duration::from_millis(200)).await;

    let started = Instant::now();
    let (status, _) =
        post_reading(&reqwest::Client::new(), &gateway, &reading("bolivia", "lluvioso")).await;

    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(started.elapsed() < Duration::from_millis(700));

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(completed.load(Ordering::SeqCst), 1);
}

/// Same reading twice: two acknowledgments, two journal entries
#[tokio::test]
async fn test_identical_readings_are_not_deduplicated() {
    let handler = TweetHandler::new(TweetJournal::new(16));
    let journal = handler.journal();
    let service = start_service(handler).await;
    let gateway = start_gateway(grpc_sink(service.addr).await, DEADLINE).await;

    let http = reqwest::Client::new();
    let body = reading("honduras", "soleado");
    let (first, _) = post_reading(&http, &gateway, &body).await;
    let (second, _) = post_reading(&http, &gateway, &body).await;

    assert_eq!(first, reqwest::StatusCode::OK);
    assert_eq!(second, reqwest::StatusCode::OK);

    let entries = journal.for_country("honduras");
    assert_eq!(entries.len(), 2);
    assert_ne!(entries[0].sequence, entries[1].sequence);
}

/// Concurrent readings each get their own answer
#[tokio::test]
async fn test_concurrent_readings_have_no_cross_talk() {
    let handler = TweetHandler::new(TweetJournal::new(64));
    let journal = handler.journal();
    let service = start_service(handler).await;
    let gateway = start_gateway(grpc_sink(service.addr).await, DEADLINE).await;

    let http = reqwest::Client::new();
    let mut tasks = Vec::new();
    for i in 0..25 {
        let http = http.clone();
        let gateway = gateway.clone();
        tasks.push(tokio::spawn(async move {
            let location = format!("loc-{i}");
            let (status, ack) =
                post_reading(&http, &gateway, &reading(&location, "nublado")).await;
            (location, status, ack)
        }));
    }

    for task in tasks {
        let (location, status, ack) = task.await.unwrap();
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(
            ack.message,
            format!("Tweet from {location} received and processed correctly")
        );
    }
    assert_eq!(journal.accepted_count(), 25);
}

/// After a service restart the supervised channel reaches the new process
#[tokio::test]
async fn test_gateway_recovers_after_service_restart() {
    let service = start_service(TweetHandler::new(TweetJournal::new(4))).await;
    let addr = service.addr;
    let sink: Arc<dyn TweetSink> = Arc::new(CircuitBreakerSink::new(
        grpc_sink(addr).await,
        clima_gateway::CircuitBreakerConfig {
            failure_threshold: 100,
            ..Default::default()
        },
    ));
    let gateway = start_gateway(sink, Duration::from_secs(1)).await;
    let http = reqwest::Client::new();

    let (status, _) = post_reading(&http, &gateway, &reading("cuba", "soleado")).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    service.stop().await;

    let (status, _) = post_reading(&http, &gateway, &reading("cuba", "soleado")).await;
    assert_eq!(status, reqwest::StatusCode::INTERNAL_SERVER_ERROR);

    let handler = TweetHandler::new(TweetJournal::new(4));
    let journal = handler.journal();
    let _restarted = start_service_at(addr, handler).await;

    // The producer retries; the gateway itself never does
    let mut recovered = false;
    for _ in 0..20 {
        let (status, _) = post_reading(&http, &gateway, &reading("cuba", "soleado")).await;
        if status == reqwest::StatusCode::OK {
            recovered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert!(recovered, "gateway never reached the restarted service");
    assert_eq!(journal.accepted_count(), 1);
}
