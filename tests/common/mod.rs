//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use memproxy::config::{load_settings, Settings};
use memproxy::lifecycle::{initialize, Shutdown, Startup};
use memproxy::net::connection::ConnectionTracker;
use memproxy::{ConfigError, ProxyServer, TcpProxyHost};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Start a mock memcached that answers `version` and rejects everything else.
pub async fn start_mock_memcached(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (read, mut write) = socket.into_split();
                let mut lines = BufReader::new(read).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let reply: &[u8] = if line.trim() == "version" {
                        b"VERSION mock\r\n"
                    } else {
                        b"ERROR\r\n"
                    };
                    if write.write_all(reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    });
}

/// Settings that bind proxies on loopback only.
#[allow(dead_code)]
pub fn loopback_settings() -> Settings {
    Settings { listen_hosts: vec!["127.0.0.1".to_string()], ..Settings::default() }
}

/// A running proxy set and the handles to stop it.
#[allow(dead_code)]
pub struct RunningProxies {
    pub shutdown: Shutdown,
    pub tracker: ConnectionTracker,
    pub handles: Vec<JoinHandle<()>>,
}

/// Initialize proxies from the given strings and start their accept loops.
#[allow(dead_code)]
pub fn start_proxies(topology: &str, behavior: Option<&str>) -> Result<RunningProxies, ConfigError> {
    let settings = loopback_settings();
    let mut host = TcpProxyHost::new(settings.listen_hosts.clone());

    let proxies = match initialize(Some(topology), behavior, &settings, &mut host, None)? {
        Startup::Started { proxies, .. } => proxies,
        Startup::Skipped => Vec::new(),
    };

    let shutdown = Shutdown::new();
    let tracker = ConnectionTracker::new();
    let handles = ProxyServer::new(proxies, settings.max_connections)
        .spawn(&shutdown, &tracker)
        .map_err(ConfigError::Runtime)?;

    Ok(RunningProxies { shutdown, tracker, handles })
}

/// Send one command line and read one reply line.
#[allow(dead_code)]
pub async fn roundtrip(stream: &mut TcpStream, command: &str) -> String {
    stream.write_all(command.as_bytes()).await.unwrap();
    read_line(stream).await
}

/// Read a single CRLF-terminated line, with a test deadline.
#[allow(dead_code)]
pub async fn read_line(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(2), reader.read_line(&mut line))
        .await
        .expect("reply timed out")
        .unwrap();
    line
}

/// Load settings from TOML text written to a temp file.
#[allow(dead_code)]
pub fn settings_from_toml(text: &str) -> Result<Settings, ConfigError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memproxy.toml");
    std::fs::write(&path, text).unwrap();
    load_settings(&path)
}
