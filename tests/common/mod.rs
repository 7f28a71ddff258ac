//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use agrismart::remote::{Auth, HttpFetcher};
use agrismart::{RemoteService, RetryExecutor, RetryOptions};

/// Raw text of one request received by the mock backend.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    /// Request line and headers, lowercased.
    pub head: String,
    pub body: String,
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives each request and returns the status code and JSON body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(ReceivedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let request = match read_request(&mut socket).await {
                            Ok(request) => request,
                            Err(_) => return,
                        };
                        let (status, body) = f(request).await;
                        let reason = reqwest::StatusCode::from_u16(status)
                            .ok()
                            .and_then(|code| code.canonical_reason())
                            .unwrap_or("Unknown");

                        let response_str = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<ReceivedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            if buf.len() >= end + 4 + content_length {
                let body = String::from_utf8_lossy(&buf[end + 4..end + 4 + content_length]).into_owned();
                return Ok(ReceivedRequest { head, body });
            }
        }
    }

    Ok(ReceivedRequest {
        head: String::from_utf8_lossy(&buf).to_lowercase(),
        body: String::new(),
    })
}

/// Build a service pointed at a mock backend.
pub fn service_for(addr: SocketAddr, auth: Auth, options: RetryOptions) -> RemoteService {
    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    let fetcher = HttpFetcher::new(
        "weather",
        format!("http://{}", addr),
        auth,
        Duration::from_secs(5),
        client,
    )
    .unwrap();

    RemoteService::new("weather", Arc::new(fetcher), RetryExecutor::new(options))
}

/// Fast retry options so tests do not wait on real backoff.
#[allow(dead_code)]
pub fn fast_retries(max_attempts: u32) -> RetryOptions {
    RetryOptions {
        max_attempts,
        base_delay_ms: 10,
        attempt_timeout_ms: None,
    }
}
