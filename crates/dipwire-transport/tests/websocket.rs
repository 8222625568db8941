//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it with
//! both a raw `tokio-tungstenite` client and our own client connection.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use dipwire_transport::{
        ClientWebSocket, Connection, Transport, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr").to_string();
        (transport, addr)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (mut client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends, client receives a text frame ---
        server_conn
            .send(br#"{"name":"ok","request_id":"1"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text(), "JSON should travel as a text frame");
        assert_eq!(
            msg.into_data().as_ref(),
            br#"{"name":"ok","request_id":"1"}"#,
        );

        // --- Client sends, server receives ---
        client_ws
            .send(Message::text(r#"{"name":"logout"}"#))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"name":"logout"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (mut client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_client_connection_send_while_recv_pending() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let client = Arc::new(
            ClientWebSocket::connect(&format!("ws://{addr}"))
                .await
                .expect("connect"),
        );
        let server_conn = server_handle.await.unwrap();

        // Park a reader on the client before sending anything.
        let reader = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // A parked reader must not block the writer.
        tokio::time::timeout(Duration::from_secs(1), client.send(b"hello"))
            .await
            .expect("send must not wait on recv")
            .expect("send should succeed");
        assert_eq!(server_conn.recv().await.unwrap(), Some(b"hello".to_vec()));

        server_conn.send(b"world").await.unwrap();
        let got = reader.await.unwrap().unwrap();
        assert_eq!(got, Some(b"world".to_vec()));
    }

    #[tokio::test]
    async fn test_client_connect_to_closed_port_fails() {
        let (transport, addr) = bind().await;
        drop(transport);

        let result = ClientWebSocket::connect(&format!("ws://{addr}")).await;
        assert!(result.is_err());
    }
}
