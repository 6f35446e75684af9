//! Local demo backends
//!
//! Starts HTTP servers on loopback where backend `i` answers every request
//! after `i * latency_step`. The router should learn to prefer the fast ones.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Clone)]
struct BackendState {
    addr: SocketAddr,
    latency: Duration,
}

/// A running demo backend
pub struct DemoBackend {
    pub addr: SocketAddr,
    pub latency: Duration,
    handle: JoinHandle<()>,
}

impl DemoBackend {
    /// Host identifier clients should route to
    pub fn host(&self) -> String {
        self.addr.to_string()
    }
}

impl Drop for DemoBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(State(state): State<BackendState>) -> String {
    tokio::time::sleep(state.latency).await;
    format!("{}\n", state.addr)
}

/// Bind and start `count` backends
///
/// Ports are `base_port, base_port + 1, ...`; a `base_port` of 0 lets the
/// OS pick a free port for every backend. Listeners are bound before this
/// returns, so the backends accept connections immediately.
pub async fn spawn_backends(
    count: usize,
    base_port: u16,
    latency_step: Duration,
) -> anyhow::Result<Vec<DemoBackend>> {
    let mut backends = Vec::with_capacity(count);

    for i in 0..count {
        let port = if base_port == 0 {
            0
        } else {
            u16::try_from(i)
                .ok()
                .and_then(|offset| base_port.checked_add(offset))
                .ok_or_else(|| anyhow::anyhow!("Port range starting at {} overflows", base_port))?
        };

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port))).await?;
        let addr = listener.local_addr()?;
        let latency = latency_step * i as u32;

        let app = Router::new()
            .fallback(handle_request)
            .with_state(BackendState { addr, latency });

        info!(addr = %addr, latency_ms = latency.as_millis() as u64, "Starting demo backend");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!(addr = %addr, error = %e, "Demo backend stopped");
            }
        });

        backends.push(DemoBackend {
            addr,
            latency,
            handle,
        });
    }

    Ok(backends)
}
