//! Serving the double over connections.
//!
//! [`ProtocolDouble`] is the shared handle: clone it freely, [`attach`]
//! in-memory clients to it, or hand it accepted connections. A
//! [`DoubleServer`] adds a WebSocket listener in front.
//!
//! [`attach`]: ProtocolDouble::attach

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dipwire_protocol::{
    Codec, ErrorType, GameId, JsonCodec, Message, Request, RequestBody, Response,
    salvage_request_id,
};
use dipwire_session::{Authenticator, StaticCredentials};
use dipwire_transport::{Connection, ConnectionId, MemoryConnection, Transport, WebSocketTransport};
use tokio::sync::mpsc;

use crate::world::World;
use crate::{DoubleConfig, DoubleError};

/// State shared by every connection task.
struct DoubleState<A: Authenticator> {
    world: Mutex<World>,
    auth: A,
    codec: JsonCodec,
}

impl<A: Authenticator> DoubleState<A> {
    fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A running protocol double.
///
/// ```rust
/// use dipwire_double::{DoubleConfig, ProtocolDouble};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let double = ProtocolDouble::new(DoubleConfig::default());
/// let conn = double.attach();
/// # drop(conn);
/// assert_eq!(double.game_count(), 0);
/// # }
/// ```
pub struct ProtocolDouble<A: Authenticator = StaticCredentials> {
    state: Arc<DoubleState<A>>,
}

impl<A: Authenticator> Clone for ProtocolDouble<A> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl ProtocolDouble<StaticCredentials> {
    /// Creates a double that accepts the accounts listed in `config`.
    pub fn new(config: DoubleConfig) -> Self {
        let auth = config.credentials();
        Self::with_authenticator(config, auth)
    }
}

impl<A: Authenticator> ProtocolDouble<A> {
    /// Creates a double that checks `sign_in` with `auth` instead of
    /// `config.users`.
    pub fn with_authenticator(config: DoubleConfig, auth: A) -> Self {
        Self {
            state: Arc::new(DoubleState {
                world: Mutex::new(World::new(config)),
                auth,
                codec: JsonCodec,
            }),
        }
    }

    /// Opens an in-memory connection to the double and returns the client
    /// end. Must be called inside a Tokio runtime.
    pub fn attach(&self) -> MemoryConnection {
        let (client_end, server_end) = MemoryConnection::pair();
        let double = self.clone();
        tokio::spawn(async move { double.serve(server_end).await });
        client_end
    }

    /// Serves one connection until it closes.
    pub async fn serve<C: Connection>(&self, conn: C) {
        if let Err(e) = serve_connection(&self.state, conn).await {
            tracing::debug!(error = %e, "connection ended with error");
        }
    }

    pub fn game_count(&self) -> usize {
        self.state.world().game_count()
    }

    /// Number of connections currently being served.
    pub fn connection_count(&self) -> usize {
        self.state.world().connection_count()
    }

    pub fn game_phase(&self, game_id: &GameId) -> Option<String> {
        self.state.world().game_phase(game_id)
    }

    /// The orders `power_name` has submitted for the current phase.
    pub fn game_orders(&self, game_id: &GameId, power_name: &str) -> Option<Vec<String>> {
        self.state.world().game_orders(game_id, power_name)
    }
}

/// Removes a connection from the world when its task ends, however it ends.
struct ConnectionGuard<'a, A: Authenticator> {
    state: &'a DoubleState<A>,
    conn_id: ConnectionId,
}

impl<A: Authenticator> Drop for ConnectionGuard<'_, A> {
    fn drop(&mut self) {
        self.state.world().disconnect(self.conn_id);
        tracing::debug!(conn_id = %self.conn_id, "connection detached");
    }
}

/// Answers requests and forwards notifications on one connection.
async fn serve_connection<A, C>(state: &DoubleState<A>, conn: C) -> Result<(), DoubleError>
where
    A: Authenticator,
    C: Connection,
{
    let conn_id = conn.id();
    let (outbox, mut notifications) = mpsc::unbounded_channel();
    state.world().connect(conn_id, outbox);
    let _guard = ConnectionGuard { state, conn_id };
    tracing::info!(%conn_id, "client connected");

    loop {
        tokio::select! {
            frame = conn.recv() => match frame {
                Ok(Some(frame)) => {
                    if let Some(response) = answer_frame(state, conn_id, &frame).await {
                        let bytes = state.codec.encode(&Message::Response(response))?;
                        conn.send(&bytes).await?;
                    }
                }
                Ok(None) => {
                    tracing::info!(%conn_id, "client disconnected");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%conn_id, error = %e, "recv error");
                    break;
                }
            },
            Some(notification) = notifications.recv() => {
                let bytes = state.codec.encode(&Message::Notification(notification))?;
                conn.send(&bytes).await?;
            }
        }
    }
    Ok(())
}

/// Turns one inbound frame into the response to send, if any.
async fn answer_frame<A: Authenticator>(
    state: &DoubleState<A>,
    conn_id: ConnectionId,
    frame: &[u8],
) -> Option<Response> {
    match state.codec.decode(frame) {
        Ok(Message::Request(request)) => {
            tracing::debug!(
                %conn_id,
                request_id = %request.request_id,
                name = %request.name(),
                re_sent = request.re_sent,
                "request received"
            );
            Some(answer_request(state, conn_id, request).await)
        }
        Ok(other) => {
            tracing::warn!(%conn_id, name = %other.name(), "ignoring non-request from client");
            None
        }
        Err(e) => match salvage_request_id(frame) {
            Some(request_id) => {
                tracing::debug!(%conn_id, %request_id, error = %e, "answering unparsable request");
                Some(Response::error(request_id, ErrorType::Parsing, e.to_string()))
            }
            None => {
                tracing::warn!(%conn_id, error = %e, "dropping unparsable frame");
                None
            }
        },
    }
}

async fn answer_request<A: Authenticator>(
    state: &DoubleState<A>,
    conn_id: ConnectionId,
    request: Request,
) -> Response {
    // Credentials are checked before taking the world lock.
    let sign_in = match &request.body {
        RequestBody::SignIn { username, password } => {
            Some(state.auth.authenticate(username, password).await)
        }
        _ => None,
    };
    state.world().handle(conn_id, request, sign_in)
}

// ---------------------------------------------------------------------------
// WebSocket server
// ---------------------------------------------------------------------------

/// Builder for a [`DoubleServer`].
///
/// # Example
///
/// ```rust,no_run
/// use dipwire_double::DoubleServer;
///
/// # async fn run() -> Result<(), dipwire_double::DoubleError> {
/// let server = DoubleServer::builder().bind("127.0.0.1:0").build().await?;
/// println!("listening on {}", server.local_addr()?);
/// server.run().await
/// # }
/// ```
pub struct DoubleServerBuilder {
    bind_addr: String,
    config: DoubleConfig,
}

impl DoubleServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8433".to_string(),
            config: DoubleConfig::default(),
        }
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn config(mut self, config: DoubleConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener.
    pub async fn build(self) -> Result<DoubleServer, DoubleError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        Ok(DoubleServer {
            transport,
            double: ProtocolDouble::new(self.config),
        })
    }
}

impl Default for DoubleServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The double behind a WebSocket listener.
pub struct DoubleServer {
    transport: WebSocketTransport,
    double: ProtocolDouble,
}

impl DoubleServer {
    pub fn builder() -> DoubleServerBuilder {
        DoubleServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, DoubleError> {
        Ok(self.transport.local_addr()?)
    }

    /// A handle to the double's state, for inspection in tests.
    pub fn double(&self) -> ProtocolDouble {
        self.double.clone()
    }

    /// Accepts connections until the process ends, serving each on its own
    /// task.
    pub async fn run(mut self) -> Result<(), DoubleError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "protocol double running");
        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let double = self.double.clone();
                    tokio::spawn(async move { double.serve(conn).await });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
