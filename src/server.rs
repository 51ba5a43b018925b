// this_file: src/server.rs
//! HTTP surface: `GET /generate?quote=..&author=..` returns a JPEG card.

use crate::compose::QuoteRenderer;
use crate::config::QuoteDefaults;
use crate::encode::Encoder;
use crate::error::{Error, Result};
use crate::source::ImageSource;
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tiny_http::{Header, Method, Request, Response, Server};
use url::Url;

/// Everything a request needs; shared read-only across handler threads.
pub struct AppState {
    pub renderer: QuoteRenderer,
    pub source: Box<dyn ImageSource>,
    pub encoder: Box<dyn Encoder>,
    pub defaults: QuoteDefaults,
}

/// A response before it is handed to tiny_http.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json_error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self {
            status,
            content_type: "application/json",
            body: body.into_bytes(),
        }
    }
}

/// Route one request. `target` is the raw request target (path and query).
pub fn handle(state: &AppState, method: &Method, target: &str) -> Reply {
    let url = match Url::parse("http://localhost").and_then(|base| base.join(target)) {
        Ok(url) => url,
        Err(e) => return Reply::json_error(400, &format!("Malformed request target: {}", e)),
    };

    if url.path() != "/generate" {
        return Reply::json_error(404, "Not found");
    }
    if *method != Method::Get {
        return Reply::json_error(405, "Method not allowed");
    }

    let (text, author) = query_quote(&url);
    let quote = state.defaults.quote(text, author);

    match render(state, &quote) {
        Ok(body) => Reply {
            status: 200,
            content_type: state.encoder.content_type(),
            body,
        },
        Err(e) => {
            error!("Failed to generate quote image: {}", e);
            Reply::json_error(500, &e.to_string())
        }
    }
}

/// Non-empty `quote` and `author` query values; empty ones count as absent.
fn query_quote(url: &Url) -> (Option<String>, Option<String>) {
    let mut text = None;
    let mut author = None;
    for (key, value) in url.query_pairs() {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "quote" => text = Some(value.into_owned()),
            "author" => author = Some(value.into_owned()),
            _ => {}
        }
    }
    (text, author)
}

fn render(state: &AppState, quote: &crate::layout::Quote) -> Result<Vec<u8>> {
    let source = state.source.fetch()?;
    let surface = state.renderer.compose_quote_image(quote, &source)?;
    state.encoder.encode_to_vec(&surface)
}

/// Blocking HTTP server. Requests are answered on the rayon pool, so at most
/// `rayon::current_num_threads()` renders run at once.
pub struct QuoteServer {
    server: Server,
    state: Arc<AppState>,
}

impl QuoteServer {
    pub fn bind(addr: &str, state: AppState) -> Result<Self> {
        let server = Server::http(addr)
            .map_err(|e| Error::Config(format!("Failed to bind {}: {}", addr, e)))?;
        Ok(Self {
            server,
            state: Arc::new(state),
        })
    }

    /// Bound address; useful after binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until the listener shuts down.
    pub fn run(self) -> Result<()> {
        match self.local_addr() {
            Some(addr) => info!("Server listening on http://{}", addr),
            None => info!("Server listening"),
        }
        for request in self.server.incoming_requests() {
            let state = Arc::clone(&self.state);
            rayon::spawn(move || respond(&state, request));
        }
        Ok(())
    }
}

fn respond(state: &AppState, request: Request) {
    let method = request.method().clone();
    let target = request.url().to_string();
    debug!("{} {}", method, target);

    let reply = handle(state, &method, &target);
    let response = Response::from_data(reply.body).with_status_code(reply.status);
    let response = match Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    };
    if let Err(e) = request.respond(response) {
        warn!("Failed to send response for {}: {}", target, e);
    }
}
