//! Server loop (§6 "Wire protocol", §5 concurrency model).
//!
//! One worker per accepted TCP connection. Each exchange is one request
//! object and one response object, both JSON: the connection handler
//! accumulates bytes until the buffer parses as a JSON object (matching
//! the source's `recv`-until-it-parses framing), dispatches through the
//! [`crate::router::Router`], and writes the serialized response back.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::router::dto::{WireRequest, WireResponse};
use crate::router::Router;
use crate::support::ShutdownSignal;

/// Bounded receive timeout per exchange (§5 "Timeouts"): a connection
/// that sends nothing for this long is dropped rather than held open
/// forever.
const RECV_TIMEOUT: Duration = Duration::from_secs(300);

/// Accepts driver and admin clients and dispatches their requests
/// through a shared [`Router`].
pub struct StationServer {
    router: Arc<Router>,
}

impl StationServer {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// Binds `addr` and serves connections until `shutdown` fires. On
    /// shutdown, stops accepting new connections and lets in-flight
    /// connections drain their current exchange before returning.
    pub async fn run(&self, addr: &str, shutdown: ShutdownSignal) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr, "station server listening");

        let shutdown_wait = shutdown.notified();
        tokio::pin!(shutdown_wait);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_connection(stream, peer),
                        Err(e) => error!(%e, "accept failed"),
                    }
                }
                _ = &mut shutdown_wait => {
                    info!("station server stopping on shutdown signal");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let router = self.router.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, router).await {
                debug!(%peer, %e, "connection closed");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, router: Arc<Router>) -> std::io::Result<()> {
    loop {
        let request = match read_one_request(&mut stream).await? {
            Some(request) => request,
            None => return Ok(()),
        };

        let response = router.dispatch(request).await;
        write_response(&mut stream, &response).await?;
    }
}

/// Reads until the accumulated buffer parses as a JSON object, or the
/// connection closes / goes quiet for longer than [`RECV_TIMEOUT`].
async fn read_one_request(stream: &mut TcpStream) -> std::io::Result<Option<WireRequest>> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let read = match tokio::time::timeout(RECV_TIMEOUT, stream.read(&mut chunk)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("connection idle past receive timeout, closing");
                return Ok(None);
            }
        };
        if read == 0 {
            if !buffer.is_empty() {
                warn!("connection closed mid-message, discarding partial buffer");
            }
            return Ok(None);
        }
        buffer.extend_from_slice(&chunk[..read]);

        match serde_json::from_slice::<WireRequest>(&buffer) {
            Ok(request) => return Ok(Some(request)),
            Err(e) if e.is_eof() => continue,
            Err(e) => {
                warn!(%e, "malformed request, closing connection");
                return Ok(None);
            }
        }
    }
}

async fn write_response(stream: &mut TcpStream, response: &WireResponse) -> std::io::Result<()> {
    let payload = serde_json::to_vec(response).expect("WireResponse always serializes");
    stream.write_all(&payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charging::ChargingService;
    use crate::domain::{Bill, ChargingPile, ChargingRequest, ChargingSession, User};
    use crate::identity::IdentityService;
    use crate::queue::QueueManager;
    use crate::reports::ReportService;
    use crate::store::InMemoryStore;
    use crate::support::SystemClock;
    use serde_json::json;
    use tokio::net::TcpListener;

    fn build_router() -> Arc<Router> {
        let users: Arc<dyn crate::store::Store<User>> = Arc::new(InMemoryStore::new());
        let piles: Arc<dyn crate::store::Store<ChargingPile>> = Arc::new(InMemoryStore::new());
        let sessions: Arc<dyn crate::store::Store<ChargingSession>> = Arc::new(InMemoryStore::new());
        let bills: Arc<dyn crate::store::Store<Bill>> = Arc::new(InMemoryStore::new());
        let requests: Arc<dyn crate::store::Store<ChargingRequest>> = Arc::new(InMemoryStore::new());
        let queues = Arc::new(QueueManager::new(10));
        let clock: Arc<dyn crate::support::Clock> = Arc::new(SystemClock);
        let wake = Arc::new(tokio::sync::Notify::new());

        let charging = Arc::new(ChargingService::new(
            users.clone(),
            piles,
            sessions,
            bills.clone(),
            requests,
            queues,
            clock,
            wake,
        ));
        let identity = Arc::new(IdentityService::new(users));
        let reports = Arc::new(ReportService::new(bills));
        Arc::new(Router::new(identity, charging, reports))
    }

    #[tokio::test]
    async fn one_exchange_round_trips_over_a_real_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            handle_connection(stream, router).await.ok();
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        let request = json!({
            "action": "register",
            "data": {"user_id": "alice", "password": "hunter2", "car_id": "CAR-A", "battery_capacity": 60.0}
        });
        client.write_all(&serde_json::to_vec(&request).unwrap()).await.unwrap();

        let mut buf = [0u8; 4096];
        let n = client.read(&mut buf).await.unwrap();
        let response: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(response["status"], "success");
    }

    #[tokio::test]
    async fn run_stops_promptly_once_shutdown_is_triggered() {
        let router = build_router();
        let server = StationServer::new(router);
        let shutdown = ShutdownSignal::new();

        let shutdown_for_run = shutdown.clone();
        let handle = tokio::spawn(async move { server.run("127.0.0.1:0", shutdown_for_run).await });

        shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("run() should return promptly after shutdown")
            .expect("task should not panic");
        assert!(result.is_ok());
    }
}
