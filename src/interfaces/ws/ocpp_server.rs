//! OCPP 1.6 WebSocket server
//!
//! Accepts charge-point connections at `ws://<host>:<port>{ocpp_path}/{charge_point_id}`.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::FrameHandler;
use crate::application::{SharedCommandSender, SharedSessionManager, SharedSessionRegistry};
use crate::config::ServerConfig;
use crate::shared::shutdown::ShutdownSignal;

/// OCPP 1.6 WebSocket subprotocol
const OCPP_SUBPROTOCOL: &str = "ocpp1.6";

/// How long a closing connection waits for queued frames to flush.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

type ServerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// OCPP WebSocket Server
pub struct OcppServer {
    config: ServerConfig,
    session_registry: SharedSessionRegistry,
    session_manager: SharedSessionManager,
    command_sender: SharedCommandSender,
    shutdown_signal: Option<ShutdownSignal>,
}

impl OcppServer {
    pub fn new(
        config: ServerConfig,
        session_registry: SharedSessionRegistry,
        session_manager: SharedSessionManager,
        command_sender: SharedCommandSender,
    ) -> Self {
        Self {
            config,
            session_registry,
            session_manager,
            command_sender,
            shutdown_signal: None,
        }
    }

    /// Set the shutdown signal for graceful shutdown
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown_signal = Some(signal);
        self
    }

    /// Bind and serve until the shutdown signal fires.
    pub async fn run(&self) -> ServerResult {
        let addr = self.config.ws_address();
        let listener = TcpListener::bind(&addr).await?;

        info!(address = addr.as_str(), "OCPP 1.6 Central System started");
        info!(
            "Charge points should connect to: ws://{}{}/{{charge_point_id}}",
            addr,
            self.config.ocpp_path.trim_end_matches('/')
        );

        self.serve(listener).await
    }

    /// Serve on an already bound listener. Returns once the shutdown signal
    /// has fired and every connection task has finished or been aborted.
    pub async fn serve(&self, listener: TcpListener) -> ServerResult {
        let shutdown = wait_for(self.shutdown_signal.clone());
        tokio::pin!(shutdown);
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, addr)) => {
                        connections.spawn(self.connection_task(stream, addr));
                    }
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                _ = &mut shutdown => {
                    info!("WebSocket server received shutdown signal");
                    self.graceful_shutdown(connections).await;
                    return Ok(());
                }
            }
        }
    }

    fn connection_task(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
    ) -> impl Future<Output = ()> + Send + 'static {
        let ctx = ConnectionContext {
            ocpp_path: self.config.ocpp_path.clone(),
            session_registry: self.session_registry.clone(),
            session_manager: self.session_manager.clone(),
            command_sender: self.command_sender.clone(),
            shutdown: self.shutdown_signal.clone(),
        };

        async move {
            if let Err(e) = handle_connection(stream, addr, ctx).await {
                warn!(remote_addr = %addr, error = %e, "Connection ended with error");
            }
        }
    }

    /// Connection tasks observe the same signal. Each one finishes the frame
    /// it is handling, records the disconnect and exits.
    async fn graceful_shutdown(&self, mut connections: JoinSet<()>) {
        let timeout = Duration::from_secs(self.config.shutdown_timeout);
        info!(
            connections = connections.len(),
            pending_commands = self.command_sender.pending_count(),
            "Waiting for charge point connections to close"
        );

        let drained = tokio::time::timeout(timeout, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = connections.len(),
                timeout_secs = timeout.as_secs(),
                "Connections still open after shutdown timeout, aborting"
            );
            connections.shutdown().await;
        }

        info!(
            registered = self.session_registry.count(),
            "WebSocket server shutdown complete"
        );
    }
}

/// Resolves when `signal` fires; never, when there is none.
async fn wait_for(signal: Option<ShutdownSignal>) {
    match signal {
        Some(signal) => signal.wait().await,
        None => std::future::pending::<()>().await,
    }
}

struct ConnectionContext {
    ocpp_path: String,
    session_registry: SharedSessionRegistry,
    session_manager: SharedSessionManager,
    command_sender: SharedCommandSender,
    shutdown: Option<ShutdownSignal>,
}

/// Extract the charge point id from a request path of the form
/// `{ocpp_path}/{charge_point_id}`.
pub fn extract_charge_point_id(path: &str, ocpp_path: &str) -> Option<String> {
    let prefix = ocpp_path.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    let id = rest.strip_prefix('/')?.trim_end_matches('/');

    if id.is_empty() || id.contains('/') {
        return None;
    }
    Some(id.to_string())
}

fn bad_request(reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

/// Handle a single WebSocket connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, ctx: ConnectionContext) -> ServerResult {
    debug!(remote_addr = %addr, "New TCP connection");

    let mut charge_point_id: Option<String> = None;
    let ocpp_path = ctx.ocpp_path.as_str();

    let ws_stream = tokio_tungstenite::accept_hdr_async(
        stream,
        |req: &Request, mut response: Response| {
            let path = req.uri().path();

            let Some(id) = extract_charge_point_id(path, ocpp_path) else {
                warn!(remote_addr = %addr, path, "Rejecting handshake without charge point id");
                return Err(bad_request("Missing charge point id in path"));
            };

            let requested_protocols = req
                .headers()
                .get("Sec-WebSocket-Protocol")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");

            let supports_ocpp16 = requested_protocols
                .split(',')
                .map(str::trim)
                .any(|p| p == OCPP_SUBPROTOCOL);

            if supports_ocpp16 {
                response.headers_mut().insert(
                    "Sec-WebSocket-Protocol",
                    HeaderValue::from_static(OCPP_SUBPROTOCOL),
                );
            } else if !requested_protocols.is_empty() {
                warn!(
                    charge_point_id = id.as_str(),
                    requested = requested_protocols,
                    "Client did not offer ocpp1.6"
                );
            }

            charge_point_id = Some(id);
            Ok(response)
        },
    )
    .await?;

    let Some(charge_point_id) = charge_point_id else {
        return Ok(());
    };
    info!(charge_point_id = charge_point_id.as_str(), remote_addr = %addr, "Charge point connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let connection_id = ctx.session_registry.register(&charge_point_id, tx.clone());
    ctx.session_manager.connect(&charge_point_id).await;

    let handler = FrameHandler::new(
        charge_point_id.clone(),
        ctx.session_manager.clone(),
        ctx.command_sender.clone(),
    );

    // Outgoing frames: replies and commands share one ordered channel.
    let cp_id_send = charge_point_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            debug!(charge_point_id = cp_id_send.as_str(), frame = frame.as_str(), "->");
            if let Err(e) = ws_sender.send(Message::Text(frame)).await {
                error!(charge_point_id = cp_id_send.as_str(), error = %e, "Send error");
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Incoming frames are handled one at a time, in arrival order. Only the
    // wait for the next frame races shutdown; a frame already being handled
    // runs to completion so its store writes are not cut short.
    let shutdown = wait_for(ctx.shutdown.clone());
    tokio::pin!(shutdown);
    let mut writer_done = false;

    loop {
        let next = tokio::select! {
            msg = ws_receiver.next() => msg,
            _ = &mut send_task => {
                writer_done = true;
                break;
            }
            _ = &mut shutdown => {
                info!(charge_point_id = charge_point_id.as_str(), "Closing connection for server shutdown");
                break;
            }
        };
        let Some(msg) = next else { break };

        match msg {
            Ok(Message::Text(text)) => {
                debug!(charge_point_id = handler.charge_point_id(), frame = text.as_str(), "<-");

                if let Some(reply) = handler.handle(&text).await {
                    if tx.send(reply).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                debug!(charge_point_id = handler.charge_point_id(), ?frame, "Close frame received");
                break;
            }
            Ok(Message::Binary(data)) => {
                warn!(
                    charge_point_id = handler.charge_point_id(),
                    bytes = data.len(),
                    "Binary frame ignored"
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
            Err(e) => {
                warn!(charge_point_id = handler.charge_point_id(), error = %e, "WebSocket error");
                break;
            }
        }
    }

    // A newer connection for the same id owns the session from here on.
    let released = ctx
        .session_manager
        .disconnect(&charge_point_id, || {
            ctx.session_registry.unregister(&charge_point_id, connection_id)
        })
        .await;
    if released {
        ctx.command_sender.cleanup_charge_point(&charge_point_id);
        info!(charge_point_id = charge_point_id.as_str(), "Charge point disconnected");
    } else {
        info!(
            charge_point_id = charge_point_id.as_str(),
            connection_id, "Replaced connection closed"
        );
    }

    // The writer exits once every sender is gone, then closes the socket.
    drop(tx);
    if !writer_done && tokio::time::timeout(DRAIN_GRACE, &mut send_task).await.is_err() {
        send_task.abort();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::application::audit::AuditLogger;
    use crate::application::{CommandSender, SessionManager, SessionRegistry, TransactionIdAllocator};
    use crate::domain::StateStore;
    use crate::infrastructure::storage::scripted::{ScriptedStore, Write};

    #[test]
    fn extracts_id_under_configured_path() {
        assert_eq!(
            extract_charge_point_id("/ocpp/CP-001", "/ocpp").as_deref(),
            Some("CP-001")
        );
        assert_eq!(
            extract_charge_point_id("/ocpp/CP-001/", "/ocpp/").as_deref(),
            Some("CP-001")
        );
        assert_eq!(
            extract_charge_point_id("/steve/websocket/CP7", "/steve/websocket").as_deref(),
            Some("CP7")
        );
        assert_eq!(extract_charge_point_id("/CP9", "").as_deref(), Some("CP9"));
    }

    #[test]
    fn rejects_paths_without_id() {
        assert_eq!(extract_charge_point_id("/ocpp", "/ocpp"), None);
        assert_eq!(extract_charge_point_id("/ocpp/", "/ocpp"), None);
        assert_eq!(extract_charge_point_id("/other/CP-1", "/ocpp"), None);
        assert_eq!(extract_charge_point_id("/ocppCP-1", "/ocpp"), None);
        assert_eq!(extract_charge_point_id("/ocpp/a/b", "/ocpp"), None);
    }

    #[test]
    fn handshake_rejection_is_bad_request() {
        let response = bad_request("Missing charge point id in path");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.body().as_deref(),
            Some("Missing charge point id in path")
        );
    }

    #[tokio::test]
    async fn shutdown_lets_in_flight_write_commit() {
        let store = Arc::new(ScriptedStore::new());
        let audit = AuditLogger::spawn(store.clone(), 256);
        let registry = SessionRegistry::shared();
        let manager = Arc::new(SessionManager::new(
            store.clone(),
            audit.clone(),
            Arc::new(TransactionIdAllocator::new(1000)),
        ));
        let sender = Arc::new(CommandSender::new(
            registry.clone(),
            audit,
            Duration::from_secs(5),
        ));
        let signal = ShutdownSignal::new();
        let server = OcppServer::new(ServerConfig::default(), registry.clone(), manager, sender)
            .with_shutdown(signal.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let serving = tokio::spawn(async move { server.serve(listener).await.is_ok() });

        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ocpp/CP-1"))
            .await
            .unwrap();
        store.hold_next(Write::Transaction);
        client
            .send(Message::Text(
                r#"[2,"1","StartTransaction",{"connectorId":1,"idTag":"TAG1","meterStart":0,"timestamp":"2024-01-01T00:00:00Z"}]"#
                    .to_string(),
            ))
            .await
            .unwrap();

        store.held().await;
        signal.trigger();
        tokio::time::sleep(Duration::from_millis(50)).await;
        store.release();

        let stopped = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .unwrap()
            .unwrap();
        assert!(stopped);

        let tx = store.inner().get_transaction(1001).await.unwrap();
        assert!(tx.is_some());
        let cp = store.inner().get_charge_point("CP-1").await.unwrap().unwrap();
        assert!(!cp.is_connected);
        assert_eq!(registry.count(), 0);
    }
}
