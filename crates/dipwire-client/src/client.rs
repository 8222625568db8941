//! The correlation engine: one client per connection.
//!
//! A [`Client`] owns a connection, a receive-loop task, the pending-request
//! table and the session. Callers may issue requests from many tasks at
//! once; every inbound frame goes through the single receive loop, which
//! either resolves a waiter or hands the frame to the dispatcher.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dipwire_protocol::{
    Codec, JsonCodec, Message, MessageName, Notification, Request, RequestId,
    Response, salvage_request_id,
};
use dipwire_session::{Session, SessionState};
use dipwire_transport::Connection;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::dispatch::{Dispatcher, HandlerId};
use crate::pending::{PendingTable, Ticket};
use crate::{ClientConfig, ClientError};

/// Everything guarded by the per-connection lock.
///
/// Held only for short, synchronous sections; never across an `.await`.
struct ConnState {
    pending: PendingTable,
    session: Session,
}

/// State shared between the client handle and its receive loop.
struct Inner<C: Connection> {
    conn: C,
    state: Mutex<ConnState>,
    dispatcher: Dispatcher,
    codec: JsonCodec,
    config: ClientConfig,
}

/// A protocol client bound to one connection.
///
/// Dropping the client stops its receive loop and closes the connection.
pub struct Client<C: Connection> {
    inner: Arc<Inner<C>>,
    reader: JoinHandle<()>,
}

#[cfg(feature = "websocket")]
impl Client<dipwire_transport::ClientWebSocket> {
    /// Opens a WebSocket connection to `url` and starts a client on it.
    ///
    /// # Errors
    /// Returns [`ClientError::Transport`] if the connection cannot be
    /// established.
    pub async fn connect(
        url: &str,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let conn = dipwire_transport::ClientWebSocket::connect(url).await?;
        tracing::info!(url, conn_id = %conn.id(), "connected");
        Ok(Self::new(conn, config))
    }
}

impl<C: Connection> Client<C> {
    /// Starts a client on an already open connection.
    ///
    /// The session begins in `Connected`. Must be called inside a Tokio
    /// runtime; the receive loop is spawned immediately.
    pub fn new(conn: C, config: ClientConfig) -> Self {
        let inner = Arc::new(Inner {
            conn,
            state: Mutex::new(ConnState {
                pending: PendingTable::new(),
                session: Session::connected(),
            }),
            dispatcher: Dispatcher::new(),
            codec: JsonCodec,
            config,
        });
        let reader = tokio::spawn(receive_loop(Arc::clone(&inner)));
        Self { inner, reader }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// A snapshot of the session.
    pub fn session(&self) -> Session {
        self.inner.lock().session.clone()
    }

    /// The current session state.
    pub fn state(&self) -> SessionState {
        self.inner.lock().session.state().clone()
    }

    /// Number of requests still waiting for a response.
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Sends one request and waits for its response.
    ///
    /// An empty `request_id` is replaced with a fresh one. Whatever the
    /// outcome, the request's waiter is gone from the pending table when
    /// this returns, and it is also removed if the future is dropped early.
    /// Error responses are returned as responses; mapping them is left to
    /// the caller.
    ///
    /// # Errors
    /// - [`ClientError::DuplicateRequestId`] if the id is still pending
    /// - [`ClientError::Timeout`] if no response arrived in
    ///   [`ClientConfig::request_timeout`]
    /// - [`ClientError::ConnectionClosed`] if the connection went away first
    /// - [`ClientError::Protocol`] if the request could not be encoded, or
    ///   the response to it could not be decoded
    pub async fn send_request(
        &self,
        mut request: Request,
    ) -> Result<Response, ClientError> {
        if request.request_id.is_empty() {
            request.request_id = RequestId::generate();
        }
        let request_id = request.request_id.clone();
        let name = request.name();
        let re_sent = request.re_sent;
        let frame = self.inner.codec.encode(&Message::Request(request))?;

        let (tx, rx) = oneshot::channel();
        let ticket = self.inner.lock().pending.insert(request_id.clone(), tx)?;
        let _guard = WaiterGuard {
            inner: &self.inner,
            request_id: &request_id,
            ticket,
        };

        tracing::debug!(%request_id, %name, re_sent, "sending request");
        self.inner
            .conn
            .send(&frame)
            .await
            .map_err(ClientError::from_transport)?;

        let after = self.inner.config.request_timeout;
        match tokio::time::timeout(after, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                tracing::warn!(%request_id, %name, ?after, "request timed out");
                Err(ClientError::Timeout {
                    request_id: request_id.clone(),
                    after,
                })
            }
        }
    }

    /// Like [`send_request`](Self::send_request), re-sending after a
    /// timeout according to [`ClientConfig::retry`].
    ///
    /// Every attempt carries the same `request_id`; attempts after the
    /// first set `re_sent`. Errors other than a timeout are returned at
    /// once.
    pub async fn send_request_with_retry(
        &self,
        mut request: Request,
    ) -> Result<Response, ClientError> {
        if request.request_id.is_empty() {
            request.request_id = RequestId::generate();
        }
        let retry = self.inner.config.retry;
        let mut attempt = 1;
        loop {
            match self.send_request(request.clone()).await {
                Err(e) if e.is_timeout() && attempt < retry.max_attempts => {
                    attempt += 1;
                    tracing::info!(
                        request_id = %request.request_id,
                        name = %request.name(),
                        attempt,
                        "re-sending request"
                    );
                    request.re_sent = true;
                    tokio::time::sleep(retry.backoff).await;
                }
                outcome => return outcome,
            }
        }
    }

    // -- Notifications ------------------------------------------------------

    /// Runs `handler` for every notification named `name`.
    ///
    /// See [`Dispatcher::register`].
    pub fn on_notification<F, Fut>(&self, name: MessageName, handler: F) -> HandlerId
    where
        F: Fn(Notification) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.dispatcher.register(name, handler)
    }

    /// Returns a queue of every notification named `name`.
    ///
    /// The queue ends when the connection closes.
    pub fn subscribe(
        &self,
        name: MessageName,
    ) -> (HandlerId, mpsc::UnboundedReceiver<Notification>) {
        self.inner.dispatcher.subscribe(name)
    }

    /// Removes a handler or subscription. Returns `true` if it existed.
    pub fn unregister(&self, id: HandlerId) -> bool {
        self.inner.dispatcher.unregister(id)
    }

    /// Closes the connection.
    ///
    /// Every in-flight request fails with `ConnectionClosed` and the session
    /// returns to `Disconnected`.
    pub async fn close(&self) -> Result<(), ClientError> {
        let result = self.inner.conn.close().await;
        self.inner.shutdown();
        match result {
            Err(e) if !e.is_closed() => Err(ClientError::Transport(e)),
            _ => Ok(()),
        }
    }

    /// Runs `f` against the session under the connection lock.
    pub(crate) fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.inner.lock().session)
    }
}

impl<C: Connection> Drop for Client<C> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Removes a request's waiter when `send_request` returns or is dropped.
///
/// Only its own entry: once resolved, the id may already belong to a newer
/// request.
struct WaiterGuard<'a, C: Connection> {
    inner: &'a Inner<C>,
    request_id: &'a RequestId,
    ticket: Ticket,
}

impl<C: Connection> Drop for WaiterGuard<'_, C> {
    fn drop(&mut self) {
        self.inner
            .lock()
            .pending
            .remove(self.request_id, self.ticket);
    }
}

// ---------------------------------------------------------------------------
// Receive loop
// ---------------------------------------------------------------------------

async fn receive_loop<C: Connection>(inner: Arc<Inner<C>>) {
    let conn_id = inner.conn.id();
    loop {
        match inner.conn.recv().await {
            Ok(Some(frame)) => inner.handle_frame(&frame),
            Ok(None) => {
                tracing::info!(%conn_id, "connection closed");
                break;
            }
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "receive failed");
                break;
            }
        }
    }
    inner.shutdown();
}

impl<C: Connection> Inner<C> {
    fn lock(&self) -> MutexGuard<'_, ConnState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Routes one inbound frame. Never ends the loop.
    fn handle_frame(&self, frame: &[u8]) {
        match self.codec.decode(frame) {
            Ok(Message::Response(response)) => {
                tracing::debug!(
                    request_id = %response.request_id,
                    name = %response.name(),
                    "response received"
                );
                if let Some(orphan) = self.lock().pending.resolve(response) {
                    tracing::warn!(
                        request_id = %orphan.request_id,
                        name = %orphan.name(),
                        "dropping response with no pending request"
                    );
                }
            }
            Ok(Message::Notification(notification)) => {
                let delivered = self.dispatcher.dispatch(&notification);
                tracing::debug!(
                    name = %notification.name(),
                    delivered,
                    "notification received"
                );
            }
            Ok(Message::Request(request)) => {
                tracing::warn!(name = %request.name(), "dropping request from server");
            }
            Err(error) => {
                let reason = error.to_string();
                let salvaged = salvage_request_id(frame);
                let failed = salvaged.as_ref().is_some_and(|id| {
                    self.lock().pending.fail(id, ClientError::Protocol(error))
                });
                match salvaged {
                    Some(request_id) if failed => tracing::warn!(
                        %request_id,
                        error = %reason,
                        "failing request with undecodable response"
                    ),
                    _ => tracing::warn!(error = %reason, "dropping undecodable frame"),
                }
            }
        }
    }

    /// Fails every waiter, disconnects the session and ends all
    /// notification queues. Safe to call more than once.
    fn shutdown(&self) {
        let failed = {
            let mut state = self.lock();
            state.session.disconnected();
            state.pending.fail_all()
        };
        self.dispatcher.close();
        if failed > 0 {
            tracing::info!(failed, "failed in-flight requests on close");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::Poll;
    use std::time::Duration;

    use dipwire_protocol::{RequestBody, Scope};
    use dipwire_transport::MemoryConnection;

    use super::*;

    fn sign_in() -> Request {
        Request::new(
            Scope::Connection,
            RequestBody::SignIn {
                username: "u".into(),
                password: "p".into(),
            },
        )
    }

    #[tokio::test]
    async fn test_new_client_starts_connected() {
        let (conn, _peer) = MemoryConnection::pair();
        let client = Client::new(conn, ClientConfig::default());
        assert_eq!(client.state(), SessionState::Connected);
        assert_eq!(client.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_send_request_generates_id_when_empty() {
        let (conn, peer) = MemoryConnection::pair();
        let client = Client::new(conn, ClientConfig::default());

        let server = tokio::spawn(async move {
            let frame = peer.recv().await.unwrap().unwrap();
            let Message::Request(request) = JsonCodec.decode(&frame).unwrap() else {
                panic!("expected a request");
            };
            assert!(!request.request_id.is_empty());
            let reply = Message::Response(Response::ok(request.request_id));
            peer.send(&JsonCodec.encode(&reply).unwrap()).await.unwrap();
            peer
        });

        let response = client.send_request(sign_in()).await.unwrap();
        assert_eq!(response.name(), MessageName::Ok);
        assert_eq!(client.pending_len(), 0);
        drop(server.await.unwrap());
    }

    #[tokio::test]
    async fn test_dropped_request_future_removes_waiter() {
        let (conn, _peer) = MemoryConnection::pair();
        let client = Client::new(conn, ClientConfig::default());

        let fut = client.send_request(sign_in());
        // Abandon the request once it has been sent.
        let _ = tokio::time::timeout(Duration::from_millis(20), fut).await;
        assert_eq!(client.pending_len(), 0);
    }

    /// Polls `fut` exactly once.
    async fn poll_once<F: Future + Unpin>(fut: &mut F) -> Poll<F::Output> {
        std::future::poll_fn(|cx| Poll::Ready(Pin::new(&mut *fut).poll(cx))).await
    }

    #[tokio::test]
    async fn test_finished_request_does_not_remove_reused_id_waiter() {
        let (conn, peer) = MemoryConnection::pair();
        let client = Client::new(conn, ClientConfig::default());
        let id = || RequestId::new("x");

        // First request is sent and waiting.
        let mut first = Box::pin(client.send_request(sign_in().with_request_id(id())));
        assert!(poll_once(&mut first).await.is_pending());
        let frame = peer.recv().await.unwrap().unwrap();
        assert!(matches!(JsonCodec.decode(&frame).unwrap(), Message::Request(_)));

        // Its response is resolved, but the first future is not polled yet.
        let reply = Message::Response(Response::ok(id()));
        peer.send(&JsonCodec.encode(&reply).unwrap()).await.unwrap();
        while client.pending_len() > 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        // A second request legally reuses the id.
        let mut second = Box::pin(client.send_request(sign_in().with_request_id(id())));
        assert!(poll_once(&mut second).await.is_pending());
        assert_eq!(client.pending_len(), 1);

        // Finishing the first request leaves the second waiter in place.
        assert_eq!(first.await.unwrap().name(), MessageName::Ok);
        assert_eq!(client.pending_len(), 1);

        let reply = Message::Response(Response::new(
            id(),
            dipwire_protocol::ResponseBody::DataPort { data: 7 },
        ));
        peer.send(&JsonCodec.encode(&reply).unwrap()).await.unwrap();
        let response = second.await.unwrap();
        assert_eq!(
            response.body,
            dipwire_protocol::ResponseBody::DataPort { data: 7 }
        );
        assert_eq!(client.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_close_moves_session_to_disconnected() {
        let (conn, _peer) = MemoryConnection::pair();
        let client = Client::new(conn, ClientConfig::default());
        client.close().await.unwrap();
        assert_eq!(client.state(), SessionState::Disconnected);

        let err = client.send_request(sign_in()).await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed));
    }
}
