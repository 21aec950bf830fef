//! Read-only web dashboard for co2dash.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - A server-rendered overview page that reloads itself
//! - JSON endpoints for the same snapshot and for backend health
//!
//! Launched via `co2dash web` (default: `http://127.0.0.1:9750`).

mod api;
mod frontend;

pub use api::{CardView, LatestView, Snapshot, ThresholdsView, ZonesView, build_snapshot};
pub use frontend::render_page;

use std::io::Cursor;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Response, Server, StatusCode};

use crate::api::ApiClient;
use crate::config::schema::DashConfig;
use crate::events;

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the dashboard server on the configured address.
///
/// Blocks the current thread and handles requests sequentially. A failing
/// request is answered with a 500 and never stops the server.
pub fn serve(config: &DashConfig, open: bool) -> Result<()> {
    let addr = config.web.addr.as_str();
    let client = ApiClient::from_config(&config.backend);
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    println!("co2dash dashboard running at http://{addr}");
    println!("Backend: {}", client.base_url());
    println!("Press Ctrl+C to stop.\n");
    events::info("web", &format!("serving on {addr}"));

    if open {
        let url = format!("http://{addr}");
        if let Err(e) = open_browser(&url) {
            events::warn("web", &format!("{e:#}"));
        }
    }

    for request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let resp = match dispatch(&method, &url, &client, config.web.refresh_secs) {
            Ok(resp) => resp,
            Err(e) => {
                events::warn("web", &format!("{method} {url}: {e:#}"));
                let body = serde_json::json!({ "error": e.to_string() }).to_string();
                with_content_type(
                    Response::from_data(body.into_bytes()).with_status_code(StatusCode(500)),
                    JSON,
                )
            }
        };
        let status = resp.status_code().0;
        let _ = request.respond(resp);

        println!(
            "{} {} {} {}",
            method,
            url,
            status,
            chrono::Local::now().format("%H:%M:%S")
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn dispatch(
    method: &Method,
    url: &str,
    client: &ApiClient,
    refresh_secs: u64,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => {
            let snapshot = build_snapshot(client);
            Ok(html_response(frontend::render_page(&snapshot, refresh_secs)))
        }
        (&Method::Get, "/api/snapshot") => api::get_snapshot(client),
        (&Method::Get, "/api/health") => api::get_health(client),
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

const JSON: &str = "application/json; charset=utf-8";

fn html_response(html: String) -> Response<Cursor<Vec<u8>>> {
    with_content_type(
        Response::from_data(html.into_bytes()).with_status_code(StatusCode(200)),
        "text/html; charset=utf-8",
    )
}

fn not_found() -> Response<Cursor<Vec<u8>>> {
    let body = r#"{"error": "not found"}"#;
    with_content_type(
        Response::from_data(body.as_bytes().to_vec()).with_status_code(StatusCode(404)),
        JSON,
    )
}

/// Attach a `Content-Type` header. An unparsable value leaves the response
/// without one.
pub(crate) fn with_content_type(
    resp: Response<Cursor<Vec<u8>>>,
    value: &str,
) -> Response<Cursor<Vec<u8>>> {
    match Header::from_bytes("Content-Type", value) {
        Ok(header) => resp.with_header(header),
        Err(()) => resp,
    }
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}
