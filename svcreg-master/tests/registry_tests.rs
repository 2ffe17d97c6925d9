//! End-to-end tests: a real listener on an ephemeral port, the real client,
//! and the in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use svcreg_client::{ClientError, RegistryClient};
use svcreg_core::protocol::{decode_response, read_frame, ErrorKind};
use svcreg_core::{Endpoint, MemoryRegistryStore, ServerIdentity};
use svcreg_master::{MasterContext, MasterListener};

struct TestMaster {
    addr: SocketAddr,
    store: Arc<MemoryRegistryStore>,
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<()>,
}

impl TestMaster {
    async fn start() -> Self {
        let store = Arc::new(MemoryRegistryStore::new());
        let ctx = Arc::new(MasterContext::with_store(store.clone()));
        let listener = MasterListener::bind("127.0.0.1:0", ctx).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(listener.serve_with_shutdown(async move {
            let _ = stopped.await;
        }));

        Self {
            addr,
            store,
            stop: Some(stop),
            task,
        }
    }

    fn client(&self) -> RegistryClient {
        RegistryClient::new(self.addr.ip().to_string(), self.addr.port())
    }

    async fn raw_exchange(&self, frame: &[u8]) -> svcreg_core::protocol::Response {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(frame).await.unwrap();
        let payload = read_frame(&mut stream, 64 * 1024).await.unwrap();
        decode_response(&payload).unwrap()
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(Duration::from_secs(15), self.task)
            .await
            .unwrap()
            .unwrap();
    }
}

fn frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = u32::try_from(payload.len()).unwrap().to_be_bytes().to_vec();
    framed.extend_from_slice(payload);
    framed
}

#[tokio::test]
async fn test_register_then_discover_scenario() {
    let master = TestMaster::start().await;
    let client = master.client();

    let accepted = client
        .register(ServerIdentity::new("web", "api1"), Endpoint::new("10.0.0.5", 8080))
        .await
        .unwrap();
    assert!(accepted);

    let found = client.discover(ServerIdentity::new("web", "api1")).await.unwrap();
    assert_eq!(found, Some(Endpoint::new("10.0.0.5", 8080)));

    let missing = client.discover(ServerIdentity::new("web", "api2")).await.unwrap();
    assert_eq!(missing, None);

    master.stop().await;
}

#[tokio::test]
async fn test_reregistration_is_last_write_wins() {
    let master = TestMaster::start().await;
    let client = master.client();
    let identity = ServerIdentity::new("web", "api1");

    client
        .register(identity.clone(), Endpoint::new("10.0.0.5", 8080))
        .await
        .unwrap();
    client
        .register(identity.clone(), Endpoint::new("10.0.0.6", 9090))
        .await
        .unwrap();

    assert_eq!(
        client.discover(identity).await.unwrap(),
        Some(Endpoint::new("10.0.0.6", 9090))
    );
    assert_eq!(master.store.len(), 1);

    master.stop().await;
}

#[tokio::test]
async fn test_type_distinguishes_same_named_servers() {
    let master = TestMaster::start().await;
    let client = master.client();

    client
        .register(ServerIdentity::new("web", "api1"), Endpoint::new("10.0.0.5", 8080))
        .await
        .unwrap();
    client
        .register(ServerIdentity::new("grpc", "api1"), Endpoint::new("10.0.0.9", 50051))
        .await
        .unwrap();

    assert_eq!(
        client.discover(ServerIdentity::new("web", "api1")).await.unwrap(),
        Some(Endpoint::new("10.0.0.5", 8080))
    );
    assert_eq!(
        client.discover(ServerIdentity::new("grpc", "api1")).await.unwrap(),
        Some(Endpoint::new("10.0.0.9", 50051))
    );
    assert_eq!(
        client.discover(ServerIdentity::new("db", "api1")).await.unwrap(),
        None
    );

    master.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_all_persist() {
    let master = TestMaster::start().await;
    let client = master.client();

    let registrations = (0..48u16).map(|i| {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .register(
                    ServerIdentity::new("worker", format!("w{i}")),
                    Endpoint::new(format!("10.0.2.{i}"), 7000 + i),
                )
                .await
        })
    });
    for result in futures::future::join_all(registrations).await {
        assert!(result.unwrap().unwrap());
    }

    assert_eq!(master.store.len(), 48);
    for i in 0..48u16 {
        let found = client
            .discover(ServerIdentity::new("worker", format!("w{i}")))
            .await
            .unwrap();
        assert_eq!(found, Some(Endpoint::new(format!("10.0.2.{i}"), 7000 + i)));
    }

    master.stop().await;
}

#[tokio::test]
async fn test_malformed_requests_get_error_responses() {
    let master = TestMaster::start().await;

    let missing_name = json!({"type": "register", "target_server_type": "web", "ip": "10.0.0.5", "port": 8080});
    let response = master.raw_exchange(&frame(missing_name.to_string().as_bytes())).await;
    assert_eq!(response.error_kind(), Some(ErrorKind::MalformedRequest));

    let bad_port = json!({
        "type": "register",
        "target_server_type": "web",
        "target_server_name": "api1",
        "ip": "10.0.0.5",
        "port": "not-a-port"
    });
    let response = master.raw_exchange(&frame(bad_port.to_string().as_bytes())).await;
    assert_eq!(response.error_kind(), Some(ErrorKind::MalformedRequest));

    let response = master.raw_exchange(&frame(b"{\"server_name\": \"api1\"")).await;
    assert_eq!(response.error_kind(), Some(ErrorKind::MalformedRequest));

    // The master keeps serving after malformed input
    assert!(master.store.is_empty());
    let accepted = master
        .client()
        .register(ServerIdentity::new("web", "api1"), Endpoint::new("10.0.0.5", 8080))
        .await
        .unwrap();
    assert!(accepted);

    master.stop().await;
}

#[tokio::test]
async fn test_oversized_request_gets_framing_error() {
    let master = TestMaster::start().await;

    // Header only: the master rejects on the declared length alone
    let response = master.raw_exchange(&8192u32.to_be_bytes()).await;
    assert_eq!(response.error_kind(), Some(ErrorKind::Framing));

    master.stop().await;
}

#[tokio::test]
async fn test_client_half_close_before_full_frame_gets_framing_error() {
    let master = TestMaster::start().await;

    let mut stream = TcpStream::connect(master.addr).await.unwrap();
    stream.write_all(&64u32.to_be_bytes()).await.unwrap();
    stream.write_all(b"{\"type\":").await.unwrap();
    stream.shutdown().await.unwrap();

    let response = decode_response(&read_frame(&mut stream, 1024).await.unwrap()).unwrap();
    assert_eq!(response.error_kind(), Some(ErrorKind::Framing));

    master.stop().await;
}

#[tokio::test]
async fn test_stopped_master_yields_communication_error() {
    let master = TestMaster::start().await;
    let client = master.client();
    master.stop().await;

    let err = client
        .discover(ServerIdentity::new("web", "api1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Communication { .. }));
}
