//! The sequencer process: HTTP order admission on one port, Prometheus
//! metrics on another, settlement submission running in the background.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use prometheus::{Encoder, TextEncoder};
use sequencer_bins::common::{init_logging, CommonArgs};
use sequencer_core::config::Config;
use sequencer_core::coordinator::Coordinator;
use sequencer_core::metrics::Metrics;
use sequencer_core::order::WireOrder;
use sequencer_core::signer::ThresholdSigner;
use sequencer_core::submission::{BackoffConfig, EthersChainClient, FailedQueue, MockChainClient, SubmissionPipeline};
use sequencer_core::Order;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logging(&args.log_level, args.json_logs)?;

    let config = Config::load();
    let metrics = Metrics::new().context("failed to initialize metrics registry")?;

    let pipeline = Arc::new(build_pipeline(&args, &config, metrics.clone()).await?);
    let coordinator = Arc::new(
        Coordinator::new(
            ThresholdSigner::from_hex_keys(&config.bls_keys),
            pipeline.clone(),
            config.max_batch,
        )
        .with_metrics(metrics.clone()),
    );

    let admission_addr: SocketAddr = args.admission_addr.parse().context("invalid --admission-addr")?;
    let metrics_addr: SocketAddr = args.metrics_addr.parse().context("invalid --metrics-addr")?;

    let admission_task = tokio::spawn(serve_admission(admission_addr, coordinator.clone()));
    let metrics_task = tokio::spawn(serve_metrics(metrics_addr, metrics.clone()));

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = shutdown_tx.try_send(());
    })
    .context("failed to install signal handler")?;

    tokio::select! {
        _ = shutdown_rx.recv() => {
            info!("shutdown signal received");
        }
        result = admission_task => {
            result.context("admission server task panicked")??;
        }
        result = metrics_task => {
            result.context("metrics server task panicked")??;
        }
    }

    Ok(())
}

async fn build_pipeline(args: &CommonArgs, config: &Config, metrics: Arc<Metrics>) -> Result<SubmissionPipeline> {
    let failed_queue = Arc::new(FailedQueue::new());

    if args.mock_chain {
        warn!("running with a mock chain client; nothing will be broadcast on-chain");
        let chain = Arc::new(MockChainClient::always_succeeds());
        return Ok(SubmissionPipeline::new(chain, config.backoff, failed_queue).with_metrics(metrics));
    }

    let private_key = config.require_private_key().context("PRIVATE_KEY is required outside --mock-chain")?;
    let contract_address = config.parse_contract_address().context("invalid CONTRACT_ADDRESS")?;
    let chain = Arc::new(
        EthersChainClient::connect(&config.rpc_url, private_key, contract_address)
            .await
            .context("failed to connect chain client")?,
    );
    Ok(SubmissionPipeline::new(chain, config.backoff, failed_queue).with_metrics(metrics))
}

async fn serve_admission(addr: SocketAddr, coordinator: Arc<Coordinator>) -> Result<()> {
    let listener = TcpListener::bind(addr).await.context("failed to bind admission server")?;
    info!(%addr, "admission server listening");

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                error!(%err, "failed to accept admission connection");
                continue;
            }
        };

        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| {
                let coordinator = coordinator.clone();
                async move { handle_admission(req, coordinator).await }
            });
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%remote_addr, %err, "admission connection closed with error");
            }
        });
    }
}

async fn handle_admission(
    req: Request<Incoming>,
    coordinator: Arc<Coordinator>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/health") => Ok(text_response(StatusCode::OK, "OK")),
        (&Method::POST, "/orders") => Ok(handle_order_submission(req, coordinator).await),
        _ => Ok(text_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")),
    }
}

async fn handle_order_submission(req: Request<Incoming>, coordinator: Arc<Coordinator>) -> Response<Full<Bytes>> {
    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "Invalid order"),
    };

    let wire: WireOrder = match serde_json::from_slice(&body) {
        Ok(order) => order,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "Invalid order"),
    };

    let order: Order = match wire.try_into() {
        Ok(order) => order,
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "Invalid order"),
    };

    match coordinator.admit_and_drain(order).await {
        Ok(_) => json_success(),
        Err(_) => json_error(StatusCode::BAD_REQUEST, "Invalid order"),
    }
}

async fn serve_metrics(addr: SocketAddr, metrics: Arc<Metrics>) -> Result<()> {
    let listener = TcpListener::bind(addr).await.context("failed to bind metrics server")?;
    info!(%addr, "metrics server listening");

    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                error!(%err, "failed to accept metrics connection");
                continue;
            }
        };

        let metrics = metrics.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req: Request<Incoming>| {
                let metrics = metrics.clone();
                async move { handle_metrics(req, metrics).await }
            });
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                debug!(%remote_addr, %err, "metrics connection closed with error");
            }
        });
    }
}

async fn handle_metrics(req: Request<Incoming>, metrics: Arc<Metrics>) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.uri().path() != "/metrics" {
        return Ok(text_response(StatusCode::NOT_FOUND, "Not Found"));
    }

    let encoder = TextEncoder::new();
    let families = metrics.registry().gather();
    let mut buffer = Vec::new();
    if encoder.encode(&families, &mut buffer).is_err() {
        return Ok(text_response(StatusCode::INTERNAL_SERVER_ERROR, "encoding error"));
    }

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(Full::new(Bytes::from(buffer)))
        .unwrap())
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder().status(status).body(Full::new(Bytes::from(body))).unwrap()
}

fn json_success() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(r#"{"success":true}"#)))
        .unwrap()
}

fn json_error(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
