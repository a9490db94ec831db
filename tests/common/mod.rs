//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use faiss_gateway::backend::{BackendError, BackendResult, FaissBackend};
use faiss_gateway::codec::messages::*;
use faiss_gateway::config::GatewayConfig;
use faiss_gateway::lifecycle::{Gateway, Shutdown};
use faiss_gateway::resilience::timeouts::with_deadline;

pub const DB_NOT_FOUND: i64 = 1;
pub const DB_EXISTS: i64 = 2;
pub const ID_NOT_FOUND: i64 = 3;
pub const DB_FULL: i64 = 4;
pub const BAD_FEATURE: i64 = 5;

#[derive(Debug, Default)]
struct Database {
    max_size: u64,
    model: String,
    next_id: u64,
    vectors: BTreeMap<u64, Vec<u8>>,
}

/// How the fake backend misbehaves.
#[derive(Debug, Clone, Copy, Default)]
pub enum Fault {
    #[default]
    None,
    /// Sleep this long before answering.
    Delay(Duration),
    /// Fail every call as unreachable.
    Unavailable,
}

/// In-memory stand-in for the vector service. Counts every call.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    databases: Mutex<HashMap<String, Database>>,
    calls: AtomicUsize,
    fault: Mutex<Fault>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }

    /// Count the call and apply the current fault within `timeout`.
    async fn enter(&self, timeout: Duration) -> BackendResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fault = *self.fault.lock().unwrap();
        match fault {
            Fault::None => Ok(()),
            Fault::Delay(d) => with_deadline(timeout, tokio::time::sleep(d)).await,
            Fault::Unavailable => Err(BackendError::Unavailable("connection refused".into())),
        }
    }

    fn with_db<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Database) -> T,
    ) -> Option<T> {
        self.databases.lock().unwrap().get_mut(name).map(f)
    }
}

fn decode_f32(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

#[async_trait]
impl FaissBackend for MemoryBackend {
    async fn ping(&self, req: PingRequest, timeout: Duration) -> BackendResult<PingResponse> {
        self.enter(timeout).await?;
        let payload = if req.payload == "ping" { "pong".to_string() } else { req.payload };
        Ok(PingResponse { payload })
    }

    async fn db_new(&self, req: DbNewRequest, timeout: Duration) -> BackendResult<EmptyResponse> {
        self.enter(timeout).await?;
        let mut dbs = self.databases.lock().unwrap();
        let error_code = if dbs.contains_key(&req.db_name) {
            DB_EXISTS
        } else {
            dbs.insert(
                req.db_name,
                Database {
                    max_size: req.max_size,
                    model: req.model,
                    next_id: 1,
                    vectors: BTreeMap::new(),
                },
            );
            0
        };
        Ok(EmptyResponse { request_id: req.request_id, error_code })
    }

    async fn db_list(&self, req: DbListRequest, timeout: Duration) -> BackendResult<DbListResponse> {
        self.enter(timeout).await?;
        let dbs = self.databases.lock().unwrap();
        let mut db_status: Vec<DbStatus> = dbs
            .iter()
            .map(|(name, db)| DbStatus {
                db_name: name.clone(),
                max_size: db.max_size,
                curr_size: db.vectors.len() as u64,
                model: db.model.clone(),
            })
            .collect();
        db_status.sort_by(|a, b| a.db_name.cmp(&b.db_name));
        Ok(DbListResponse { request_id: req.request_id, error_code: 0, db_status })
    }

    async fn db_del(&self, req: DbDelRequest, timeout: Duration) -> BackendResult<EmptyResponse> {
        self.enter(timeout).await?;
        let removed = self.databases.lock().unwrap().remove(&req.db_name).is_some();
        Ok(EmptyResponse {
            request_id: req.request_id,
            error_code: if removed { 0 } else { DB_NOT_FOUND },
        })
    }

    async fn hset(&self, req: HSetRequest, timeout: Duration) -> BackendResult<HSetResponse> {
        self.enter(timeout).await?;
        let outcome = self.with_db(&req.db_name, |db| {
            if decode_f32(&req.feature).is_none() {
                return Err(BAD_FEATURE);
            }
            if db.vectors.len() as u64 >= db.max_size {
                return Err(DB_FULL);
            }
            let id = db.next_id;
            db.next_id += 1;
            db.vectors.insert(id, req.feature.clone());
            Ok(id)
        });
        let (error_code, id) = match outcome {
            None => (DB_NOT_FOUND, 0),
            Some(Err(code)) => (code, 0),
            Some(Ok(id)) => (0, id),
        };
        Ok(HSetResponse { request_id: req.request_id, error_code, id })
    }

    async fn hget(&self, req: HGetDelRequest, timeout: Duration) -> BackendResult<HGetResponse> {
        self.enter(timeout).await?;
        let found = self.with_db(&req.db_name, |db| db.vectors.get(&req.id).cloned());
        let response = match found {
            None => HGetResponse { error_code: DB_NOT_FOUND, ..HGetResponse::default() },
            Some(None) => HGetResponse { error_code: ID_NOT_FOUND, ..HGetResponse::default() },
            Some(Some(feature)) => HGetResponse {
                dimension: (feature.len() / 4) as u64,
                feature,
                ..HGetResponse::default()
            },
        };
        Ok(HGetResponse { request_id: req.request_id, ..response })
    }

    async fn hsearch(&self, req: HSearchRequest, timeout: Duration) -> BackendResult<HSearchResponse> {
        self.enter(timeout).await?;
        let Some(query) = decode_f32(&req.feature) else {
            return Ok(HSearchResponse {
                request_id: req.request_id,
                error_code: BAD_FEATURE,
                results: vec![],
            });
        };
        let results = self.with_db(&req.db_name, |db| {
            let mut results: Vec<SearchResult> = db
                .vectors
                .iter()
                .filter_map(|(id, bytes)| {
                    let v = decode_f32(bytes)?;
                    (v.len() == query.len()).then(|| SearchResult {
                        id: *id,
                        distance: v.iter().zip(&query).map(|(a, b)| (a - b) * (a - b)).sum(),
                    })
                })
                .collect();
            results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            results.truncate(10);
            results
        });
        Ok(match results {
            Some(results) => HSearchResponse { request_id: req.request_id, error_code: 0, results },
            None => HSearchResponse {
                request_id: req.request_id,
                error_code: DB_NOT_FOUND,
                results: vec![],
            },
        })
    }

    async fn hdel(&self, req: HGetDelRequest, timeout: Duration) -> BackendResult<EmptyResponse> {
        self.enter(timeout).await?;
        let removed = self.with_db(&req.db_name, |db| db.vectors.remove(&req.id).is_some());
        let error_code = match removed {
            None => DB_NOT_FOUND,
            Some(false) => ID_NOT_FOUND,
            Some(true) => 0,
        };
        Ok(EmptyResponse { request_id: req.request_id, error_code })
    }
}

/// A gateway serving on an ephemeral local port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: tokio::task::JoinHandle<()>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to drain.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

/// Boot the real HTTP stack in front of `backend`.
pub async fn start_gateway_with(
    backend: Arc<dyn FaissBackend>,
    configure: impl FnOnce(&mut GatewayConfig),
) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    configure(&mut config);

    let gateway = Gateway::bind(&config, backend).await.unwrap();
    let addr = gateway.local_addr();
    let shutdown = Shutdown::new();
    let signal = shutdown.wait();

    let handle = tokio::spawn(async move {
        gateway.serve(signal).await.unwrap();
    });

    TestGateway { addr, shutdown, handle }
}

pub async fn start_gateway(backend: Arc<dyn FaissBackend>) -> TestGateway {
    start_gateway_with(backend, |_| {}).await
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// `dim` little-endian float32 values.
pub fn feature(dim: usize, seed: f32) -> Vec<u8> {
    (0..dim)
        .flat_map(|i| (seed + i as f32 * 0.5).to_le_bytes())
        .collect()
}

pub fn b64(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn unb64(text: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(text).unwrap()
}
