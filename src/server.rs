//! Development server with live reload
//!
//! Serves the working tree as static files. Browsers load a small client
//! script (injected into every HTML page) that listens on a Server-Sent Events
//! stream and either reloads the page or swaps a rebuilt stylesheet.

use crate::build::TaskContext;
use crate::reload::{LiveReload, ReloadEvent};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Router,
};
use std::convert::Infallible;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Server-Sent Events endpoint.
pub const EVENTS_PATH: &str = "/__assetflow/events";

/// Live-reload client script endpoint.
pub const CLIENT_PATH: &str = "/__assetflow/client.js";

/// Tag inserted into served HTML.
pub const CLIENT_TAG: &str = r#"<script src="/__assetflow/client.js"></script>"#;

const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__assetflow/events");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function (event) {
    var target = "/" + event.data;
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    var swapped = false;
    for (var i = 0; i < links.length; i++) {
      if (new URL(links[i].href).pathname === target) {
        links[i].href = target + "?v=" + Date.now();
        swapped = true;
      }
    }
    if (!swapped) {
      window.location.reload();
    }
  });
})();
"#;

/// Dev server failure
#[derive(Debug, Error)]
pub enum ServerError {
    /// Directory to serve does not exist
    #[error("serve root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    /// Could not bind the listening socket
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// The server stopped with an error
    #[error("server stopped: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build the router: live-reload endpoints plus static files from `root`.
pub fn create_router(root: &Path, hub: LiveReload) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(events))
        .route(CLIENT_PATH, get(client_script))
        .fallback_service(ServeDir::new(root))
        .layer(middleware::from_fn(inject_reload_client))
        .layer(TraceLayer::new_for_http())
        .with_state(hub)
}

/// Serve the configured root until the process exits.
///
/// Streams events from the context's live-reload hub; without one, pages are
/// served but never reloaded.
pub async fn serve(ctx: &TaskContext) -> Result<(), ServerError> {
    let root = ctx.serve_root();
    if !root.is_dir() {
        return Err(ServerError::RootNotFound(root));
    }

    let hub = ctx.live_reload().cloned().unwrap_or_default();
    let server = &ctx.config().server;
    let listener = bind(&server.host, server.port).await?;

    tracing::info!(
        "Serving {} at http://{}",
        ctx.relative(&root).display(),
        display_addr(&server.host, server.port)
    );
    axum::serve(listener, create_router(&root, hub)).await.map_err(ServerError::Serve)
}

/// `host:port`, with IPv6 literals bracketed.
fn display_addr(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Bind a listener on a host name, IPv4 or IPv6 literal.
async fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    TcpListener::bind((host, port))
        .await
        .map_err(|source| ServerError::Bind { addr: display_addr(host, port), source })
}

async fn events(
    State(hub): State<LiveReload>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = hub.subscribe();
    tracing::debug!("live reload client connected ({} open)", hub.subscriber_count());
    let stream = BroadcastStream::new(receiver).map(|message| {
        // A lagging client missed events; a full reload brings it up to date
        let event = message.unwrap_or(ReloadEvent::Reload);
        Ok(Event::default().event(event.name()).data(event.data()))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_JS,
    )
}

/// Insert the client tag into full HTML responses.
async fn inject_reload_client(request: Request, next: Next) -> Response {
    let is_head = request.method() == Method::HEAD;
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if is_head || !is_html || response.status() != StatusCode::OK {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("failed to read HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_client_tag(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

/// Insert [`CLIENT_TAG`] before the last `</body>`, or append it.
pub fn inject_client_tag(html: &str) -> String {
    if html.contains(CLIENT_TAG) {
        return html.to_string();
    }
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(pos) => format!("{}{}{}", &html[..pos], CLIENT_TAG, &html[pos..]),
        None => format!("{}{}", html, CLIENT_TAG),
    }
}
