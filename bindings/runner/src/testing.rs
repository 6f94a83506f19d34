//! A stub HTTP server for scenario tests.
//!
//! Every request is answered by a handler function and recorded, so tests can drive a scenario
//! against canned responses and then inspect what was sent.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

/// A request as seen by the stub server.
#[derive(Debug, Clone)]
pub struct StubRequest {
    pub method: String,
    /// The request target, including any query string.
    pub target: String,
    pub body: Vec<u8>,
}

impl StubRequest {
    /// The request target without its query string.
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: String,
    /// Close the connection once the request is read, without answering it.
    pub disconnect: bool,
}

impl StubResponse {
    pub fn status(status: u16) -> Self {
        Self::text(status, "")
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::text(status, body.to_string())
    }

    /// Answer with `body` as is, whether or not it is valid JSON.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            disconnect: false,
        }
    }

    /// Drop the connection, which the client sees as a network error.
    pub fn disconnect() -> Self {
        Self {
            disconnect: true,
            ..Self::status(0)
        }
    }
}

type Handler = Arc<dyn Fn(&StubRequest) -> StubResponse + Send + Sync>;

/// A running stub server. It stops when dropped.
pub struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<StubRequest>>>,
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for StubServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl StubServer {
    /// Start a server on a random local port that answers every request with `handler`.
    pub fn start<F>(handler: F) -> std::io::Result<Self>
    where
        F: Fn(&StubRequest) -> StubResponse + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let handler: Handler = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let thread = {
            let requests = requests.clone();
            thread::spawn(move || loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                match listener.accept() {
                    Ok((stream, _)) => {
                        let handler = handler.clone();
                        let requests = requests.clone();
                        thread::spawn(move || handle_client(stream, handler, requests));
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            })
        };

        Ok(Self {
            base_url: format!("http://{}", addr),
            requests,
            shutdown: shutdown_tx,
            thread: Some(thread),
        })
    }

    /// Start a server that answers every request with the same status and an empty body.
    pub fn with_status(status: u16) -> std::io::Result<Self> {
        Self::start(move |_| StubResponse::status(status))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<StubRequest> {
        self.requests.lock().clone()
    }
}

fn handle_client(
    mut stream: TcpStream,
    handler: Handler,
    requests: Arc<Mutex<Vec<StubRequest>>>,
) {
    if stream.set_nonblocking(false).is_err()
        || stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .is_err()
    {
        return;
    }

    let Some(request) = read_request(&mut stream) else {
        return;
    };

    let response = handler(&request);
    requests.lock().push(request);

    if response.disconnect {
        let _ = stream.shutdown(Shutdown::Both);
        return;
    }

    let head = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        response.body.len()
    );
    if stream.write_all(head.as_bytes()).is_err()
        || stream.write_all(response.body.as_bytes()).is_err()
        || stream.flush().is_err()
    {
        return;
    }
    let _ = stream.shutdown(Shutdown::Both);
}

fn read_request(stream: &mut TcpStream) -> Option<StubRequest> {
    let mut received = Vec::new();
    let mut buffer = [0u8; 1024];

    let header_end = loop {
        if let Some(pos) = find_header_end(&received) {
            break pos;
        }
        let read = stream.read(&mut buffer).ok()?;
        if read == 0 {
            return None;
        }
        received.extend_from_slice(&buffer[..read]);
    };

    let head = String::from_utf8_lossy(&received[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = received[header_end + 4..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut buffer).ok()?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&buffer[..read]);
    }
    body.truncate(content_length);

    Some(StubRequest {
        method,
        target,
        body,
    })
}

fn find_header_end(received: &[u8]) -> Option<usize> {
    received.windows(4).position(|window| window == b"\r\n\r\n")
}
