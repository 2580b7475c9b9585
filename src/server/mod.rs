//! HTTPS / WebSocket server
//!
//! Ties the pieces together: a pointer backend, the packet controller that
//! drives it, and an axum router served over rustls.
//!
//! # Routes
//!
//! ```text
//! GET /ws   WebSocket upgrade, one authenticated session per connection
//! GET /*    static files from server.static_dir (the phone client)
//! ```
//!
//! All sessions share the same controller, so two phones connected at once
//! steer the same cursor.
//!
//! # Lifecycle
//!
//! ```text
//! new()  ─► TLS + auth key ─► backend ─► controller (tick task starts)
//! run()  ─► bind ─► serve until SIGINT/SIGTERM ─► graceful drain ─► controller.close()
//! ```

pub mod session;

pub use session::{run_session, RejectReason, SessionContext, SessionOutcome};

use anyhow::{Context, Result};
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use futures::StreamExt;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::controller::PacketController;
use crate::pointer::{create_backend, BackendKind};
use crate::protocol::JsonCodec;
use crate::security::SecurityContext;

/// Time allowed for open connections to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    session: Arc<SessionContext>,
    sessions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(session: Arc<SessionContext>) -> Self {
        Self {
            session,
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of sessions currently connected
    pub fn active_sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }
}

/// Main server
pub struct QuickMouseServer {
    config: Arc<Config>,
    security: SecurityContext,
    controller: Arc<PacketController>,
}

impl QuickMouseServer {
    /// Create the TLS context, backend and controller
    ///
    /// Must be called inside a tokio runtime, the controller starts its
    /// tick task immediately.
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing quick-mouse server");

        // TLS first, so a bad certificate never leaves a device behind
        let security = SecurityContext::new(&config).context("Failed to initialize TLS")?;

        let kind = BackendKind::parse(&config.pointer.backend)
            .with_context(|| format!("Invalid pointer backend: {}", config.pointer.backend))?;
        let backend = create_backend(kind, &config.pointer.device_name)
            .context("Failed to create pointer backend")?;
        info!("Pointer backend ready: {}", backend.name());

        let controller = PacketController::new(backend, config.physics.clone());

        Ok(Self {
            config: Arc::new(config),
            security,
            controller,
        })
    }

    /// Connection URL including the auth key
    pub fn connect_url(&self) -> String {
        format!(
            "https://{}/?key={}",
            self.config.server.listen_addr,
            self.security.auth_key().as_str()
        )
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .server
            .listen_addr
            .parse()
            .context("Invalid listen address")?;

        let session = Arc::new(SessionContext {
            controller: Arc::clone(&self.controller),
            auth_key: self.security.auth_key().clone(),
            codec: Arc::new(JsonCodec),
            keep_alive: self.config.session.keep_alive(),
        });
        let state = AppState::new(session);
        let app = router(state.clone(), &self.config.server.static_dir);

        let tls = RustlsConfig::from_config(self.security.tls_config().server_config());
        let handle = Handle::new();
        tokio::spawn(shutdown_on_signal(handle.clone()));

        info!("Listening on {}", addr);
        info!("Serving static files from {:?}", self.config.server.static_dir);
        info!("Connect with: {}", self.connect_url());

        let served = axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .with_context(|| format!("Failed to bind {}", addr));

        if state.active_sessions() > 0 {
            debug!("{} sessions still open at shutdown", state.active_sessions());
        }

        info!("Shutting down controller");
        if let Err(e) = self.controller.close().await {
            warn!("Failed to close controller: {}", e);
        }

        served?;
        info!("Server stopped");
        Ok(())
    }
}

/// Build the HTTP router
pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

async fn handle_socket(socket: WebSocket, state: AppState, peer: SocketAddr) {
    let id = Uuid::new_v4();
    let span = info_span!("session", id = %id, peer = %peer);

    async move {
        let _active = ActiveSession::enter(&state.sessions);
        info!("WebSocket connected ({} active)", state.active_sessions());

        let (sink, stream) = socket.split();
        match run_session(stream, sink, &state.session).await {
            SessionOutcome::Closed => info!("Session closed"),
            SessionOutcome::Rejected(reason) => info!("Session rejected: {}", reason),
            SessionOutcome::TransportError(e) => warn!("Session ended: {}", e),
        }
    }
    .instrument(span)
    .await
}

/// Counts a session as active for as long as it lives
struct ActiveSession {
    counter: Arc<AtomicUsize>,
}

impl ActiveSession {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn shutdown_on_signal(handle: Handle) {
    wait_for_signal().await;
    info!("Received shutdown signal");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
            }
            return;
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for ctrl-c: {}", e);
            }
        }
        _ = term.recv() => {
            debug!("SIGTERM");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PhysicsConfig;
    use crate::pointer::MockPointerBackend;
    use crate::security::AuthKey;

    fn test_state() -> AppState {
        let controller = PacketController::manual(
            Arc::new(MockPointerBackend::new()),
            PhysicsConfig::default(),
        );
        AppState::new(Arc::new(SessionContext {
            controller,
            auth_key: AuthKey::generate(),
            codec: Arc::new(JsonCodec),
            keep_alive: Duration::from_secs(25),
        }))
    }

    #[test]
    fn test_active_session_guard_counts() {
        let state = test_state();
        assert_eq!(state.active_sessions(), 0);

        let first = ActiveSession::enter(&state.sessions);
        let second = ActiveSession::enter(&state.sessions);
        assert_eq!(state.active_sessions(), 2);

        drop(first);
        assert_eq!(state.active_sessions(), 1);
        drop(second);
        assert_eq!(state.active_sessions(), 0);
    }

    #[test]
    fn test_state_clones_share_counter() {
        let state = test_state();
        let clone = state.clone();
        let _guard = ActiveSession::enter(&clone.sessions);
        assert_eq!(state.active_sessions(), 1);
    }

    #[test]
    fn test_tls_failure_precedes_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default_config().unwrap();
        config.security.cert_path = dir.path().join("missing.pem");
        config.security.key_path = dir.path().join("missing-key.pem");
        // Would fail with "Invalid pointer backend" if the backend came first
        config.pointer.backend = "no-such-backend".to_string();

        let err = QuickMouseServer::new(config).err().unwrap();
        assert_eq!(err.to_string(), "Failed to initialize TLS");
    }

    #[test]
    fn test_router_builds() {
        let dir = tempfile::tempdir().unwrap();
        let _router = router(test_state(), dir.path());
    }
}
