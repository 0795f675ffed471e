// src/testing.rs
// =============================================================================
// Loopback HTTP server for tests.
//
// Serves a fixed route table over plain HTTP/1.1 on 127.0.0.1 with
// `Connection: close`, counts every request it reads, and can stall a route
// forever to exercise client timeouts. Unknown paths answer 404.
//
// `{base}` in a route's body or header values is replaced with the server's
// own origin, so pages can link to themselves absolutely.
//
// `Route::drop_first(n)` closes the first n connections to that route without
// answering, which the client sees as a network error; later requests are
// served normally. This is how retries are exercised.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Route {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    stall: bool,
    // Shared by every clone of the route, so the count survives lookups
    drops_left: Arc<AtomicUsize>,
}

impl Route {
    pub fn html(status: u16, body: &str) -> Self {
        Route {
            status,
            headers: vec![("Content-Type".to_string(), "text/html; charset=utf-8".to_string())],
            body: body.to_string(),
            stall: false,
            drops_left: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Route {
            status,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: body.to_string(),
            stall: false,
            drops_left: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Route {
            status,
            headers: vec![("Location".to_string(), location.to_string())],
            body: String::new(),
            stall: false,
            drops_left: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reads the request, then never answers.
    pub fn stall() -> Self {
        Route {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
            stall: true,
            drops_left: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Hangs up on the first `n` requests, then serves this route.
    pub fn drop_first(self, n: usize) -> Self {
        self.drops_left.store(n, Ordering::SeqCst);
        self
    }

    // Consumes one pending drop, if any are left.
    fn take_drop(&self) -> bool {
        self.drops_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct TestServer {
    base: String,
    hits: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let routes: Arc<HashMap<String, Route>> = Arc::new(
            routes
                .into_iter()
                .map(|(path, route)| (path.to_string(), route))
                .collect(),
        );
        let hits = Arc::new(AtomicUsize::new(0));

        let base = format!("http://{addr}");

        let accept_hits = hits.clone();
        let accept_base = base.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let routes = routes.clone();
                let hits = accept_hits.clone();
                let base = accept_base.clone();
                tokio::spawn(async move {
                    serve(stream, &routes, &hits, &base).await;
                });
            }
        });

        TestServer {
            base,
            hits,
            handle,
        }
    }

    /// Origin without a trailing slash, usable as `AuditConfig::site`.
    pub fn base(&self) -> String {
        self.base.clone()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    hits: &AtomicUsize,
    base: &str,
) {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        match stream.read(&mut tmp).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&tmp[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    hits.fetch_add(1, Ordering::SeqCst);

    let head = String::from_utf8_lossy(&buf);
    let mut parts = head.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("GET").to_string();
    let target = parts.next().unwrap_or("/").to_string();
    let path = target.split('?').next().unwrap_or("/").to_string();

    let route = routes
        .get(&target)
        .or_else(|| routes.get(&path))
        .cloned()
        .unwrap_or_else(|| Route::text(404, "not found"));

    if route.take_drop() {
        // Dropping the stream closes it with no response at all
        return;
    }

    if route.stall {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        return;
    }

    let mut response = format!("HTTP/1.1 {} Test\r\n", route.status);
    for (name, value) in &route.headers {
        response.push_str(&format!("{name}: {}\r\n", value.replace("{base}", base)));
    }
    let body = route.body.replace("{base}", base);
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    if method != "HEAD" {
        response.push_str(&body);
    }

    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}
