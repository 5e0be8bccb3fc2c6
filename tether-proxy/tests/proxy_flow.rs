//! End-to-end: client -> tether -> demo backend, with runtime reconfiguration.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use tether_admin::{Command, ControlHandle, ControlPlane, Report};
use tether_core::{BackendId, KeyMode, ProbeSet, SharedRoutingTable, StrategyKind, Topology};
use tether_proxy::{demo, ProxyServer};

async fn spawn_backend() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(demo::serve(listener));
    port
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

struct Harness {
    addr: SocketAddr,
    handle: ControlHandle,
    routing: SharedRoutingTable,
    reports: mpsc::UnboundedReceiver<Report>,
    shutdown: watch::Receiver<bool>,
    server: tokio::task::JoinHandle<Result<(), tether_proxy::ProxyError>>,
}

impl Harness {
    async fn start(ports: &[u16], kind: StrategyKind) -> Self {
        let topology =
            Topology::new(ports.iter().map(|port| BackendId::new("127.0.0.1", *port))).unwrap();
        let (reports_tx, reports) = mpsc::unbounded_channel();
        let plane = ControlPlane::new(topology, kind, ProbeSet::demo()).with_reports(reports_tx);

        let routing = plane.routing();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = ProxyServer::from_listener(listener, routing.clone(), KeyMode::ClientIp);
        let addr = server.local_addr().unwrap();

        let (handle, commands) = ControlHandle::channel();
        let (shutdown_tx, shutdown) = watch::channel(false);
        tokio::spawn(plane.run(commands, shutdown_tx));
        let server = tokio::spawn(server.run(shutdown.clone()));

        Self {
            addr,
            handle,
            routing,
            reports,
            shutdown,
            server,
        }
    }

    async fn apply(&mut self, command: Command) -> Report {
        self.handle.send(command).unwrap();
        self.reports.recv().await.unwrap()
    }

    async fn get(&self, path: &str) -> String {
        let client = reqwest::Client::builder()
            .no_proxy()
            .pool_max_idle_per_host(0)
            .build()
            .unwrap();
        client
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    async fn raw(&self) -> String {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        reply
    }
}

#[tokio::test]
async fn relays_to_the_selected_backend_and_follows_reconfiguration() {
    let first = spawn_backend().await;
    let second = spawn_backend().await;
    let mut harness = Harness::start(&[first, second], StrategyKind::Static).await;

    assert_eq!(harness.get("/hello").await, demo::greeting(first, "/hello"));

    let report = harness
        .apply(Command::RemoveBackend(BackendId::new("127.0.0.1", first)))
        .await;
    assert!(matches!(report, Report::Remap { ref label, .. } if label == "REMOVE"));
    assert_eq!(harness.get("/again").await, demo::greeting(second, "/again"));

    harness.apply(Command::Exit).await;
    harness.server.await.unwrap().unwrap();
    assert!(*harness.shutdown.borrow());
}

#[tokio::test]
async fn round_robin_spreads_connections() {
    let first = spawn_backend().await;
    let second = spawn_backend().await;
    let harness = Harness::start(&[first, second], StrategyKind::RoundRobin).await;

    let replies = [harness.get("/").await, harness.get("/").await];
    assert_eq!(replies[0], demo::greeting(second, "/"));
    assert_eq!(replies[1], demo::greeting(first, "/"));
}

#[tokio::test]
async fn empty_topology_closes_with_a_diagnostic() {
    let harness = Harness::start(&[], StrategyKind::ConsistentHash).await;
    assert_eq!(harness.raw().await, "no backend available");
}

#[tokio::test]
async fn unreachable_backend_closes_without_failover() {
    let dead = closed_port().await;
    let live = spawn_backend().await;
    let harness = Harness::start(&[dead, live], StrategyKind::Static).await;

    assert_eq!(harness.raw().await, "backend not available");

    let strategy = harness.routing.current();
    let backends = strategy.backends();
    assert_eq!(backends[0].id().port(), dead);
    assert_eq!(backends[0].requests(), 0);
    assert_eq!(backends[1].id().port(), live);
    assert_eq!(backends[1].requests(), 0);
    assert_eq!(backends[1].active(), 0);
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_relays() {
    let upstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = upstream.local_addr().unwrap().port();
    let mut harness = Harness::start(&[port], StrategyKind::Static).await;

    let mut client = TcpStream::connect(harness.addr).await.unwrap();
    let (mut backend, _) = upstream.accept().await.unwrap();
    let mut buf = [0u8; 4];
    client.write_all(b"ping").await.unwrap();
    backend.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"ping");

    assert_eq!(harness.apply(Command::Exit).await, Report::Exited);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(*harness.shutdown.borrow());
    assert!(!harness.server.is_finished());

    // The relay still carries bytes after the accept loop stopped.
    backend.write_all(b"pong").await.unwrap();
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"pong");

    drop(backend);
    drop(client);
    tokio::time::timeout(Duration::from_secs(5), harness.server)
        .await
        .expect("server returns once the relay has drained")
        .unwrap()
        .unwrap();
}
