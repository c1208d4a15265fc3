//! HTTP server for the RetailX assistant UI
//! Simple HTTP server using tokio and basic HTTP handling

use anyhow::Result;
use clap::Parser;
use retailx_assistant::config::AppConfig;
use retailx_assistant::Workflow;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const MAX_REQUEST_BYTES: usize = 64 * 1024;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>RetailX AI Assistant</title>
<style>
  body { font-family: sans-serif; max-width: 720px; margin: 3rem auto; padding: 0 1rem; }
  input { width: 100%; padding: 0.5rem; font-size: 1rem; box-sizing: border-box; }
  button { margin-top: 0.75rem; padding: 0.5rem 1.5rem; font-size: 1rem; }
  #answer { margin-top: 1.5rem; white-space: pre-wrap; }
  .error { color: #b00020; }
</style>
</head>
<body>
<h1>RetailX AI Assistant</h1>
<p>Ask a question about RetailX customers, products, and sales:</p>
<label for="question">Question</label>
<input id="question" type="text" autocomplete="off">
<button id="submit">Submit</button>
<div id="answer"></div>
<script>
  const box = document.getElementById('question');
  const out = document.getElementById('answer');
  async function ask() {
    out.className = '';
    out.textContent = 'Thinking...';
    try {
      const res = await fetch('/api/ask', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({ question: box.value })
      });
      const data = await res.json();
      if (data.answer.startsWith('An error occurred:')) { out.className = 'error'; }
      out.textContent = data.answer.startsWith('Please enter') ? data.answer : 'Answer: ' + data.answer;
    } catch (e) {
      out.className = 'error';
      out.textContent = 'An error occurred: ' + e;
    }
  }
  document.getElementById('submit').addEventListener('click', ask);
  box.addEventListener('keydown', (e) => { if (e.key === 'Enter') ask(); });
</script>
</body>
</html>
"#;

#[derive(Parser)]
#[command(name = "retailx-server")]
#[command(about = "Serve the RetailX AI Assistant over HTTP")]
struct Args {
    /// Address to listen on (or set RETAILX_BIND)
    #[arg(long)]
    bind: Option<String>,

    /// Path to the SQLite dataset (or set RETAILX_DB_PATH)
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

struct HttpRequest {
    method: String,
    path: String,
    body: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(db) = args.db {
        config.db_path = db;
    }

    let workflow = Arc::new(retailx_assistant::build_workflow(&config)?);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("RetailX assistant listening on http://{}", config.bind_addr);

    loop {
        let (stream, addr) = listener.accept().await?;
        debug!("New connection from: {}", addr);
        tokio::spawn(handle_connection(stream, Arc::clone(&workflow)));
    }
}

async fn handle_connection(mut stream: TcpStream, workflow: Arc<Workflow>) {
    let raw = match read_request(&mut stream).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read from stream: {}", e);
            return;
        }
    };

    let response = match parse_request(&raw) {
        Some(request) => handle_request(&request, &workflow).await,
        None => create_response(400, "Bad Request", "application/json", r#"{"error":"Malformed request"}"#),
    };

    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!("Failed to write response: {}", e);
    }
}

/// Read headers, then as much body as `Content-Length` announces.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(header_end) = find_header_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..header_end]);
            if buf.len() >= header_end + 4 + content_length(&head) {
                break;
            }
        }
        if buf.len() > MAX_REQUEST_BYTES {
            break;
        }
    }

    Ok(buf)
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn content_length(head: &str) -> usize {
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

fn parse_request(raw: &[u8]) -> Option<HttpRequest> {
    let header_end = find_header_end(raw).unwrap_or(raw.len());
    let head = String::from_utf8_lossy(&raw[..header_end]);
    let mut parts = head.lines().next()?.split_whitespace();

    let method = parts.next()?.to_string();
    let target = parts.next()?;
    let path = target.split('?').next().unwrap_or("/").trim_end_matches('/');
    let path = if path.is_empty() { "/".to_string() } else { path.to_string() };

    let body_start = (header_end + 4).min(raw.len());
    let body = String::from_utf8_lossy(&raw[body_start..]).into_owned();

    Some(HttpRequest { method, path, body })
}

async fn handle_request(request: &HttpRequest, workflow: &Workflow) -> String {
    debug!("Request: {} {}", request.method, request.path);

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => create_response(200, "OK", "text/html; charset=utf-8", INDEX_HTML),
        ("GET", "/api/health") => {
            create_response(200, "OK", "application/json", r#"{"status":"ok","service":"retailx-assistant"}"#)
        }
        ("OPTIONS", _) => create_response(204, "No Content", "text/plain", ""),
        ("POST", "/api/ask") => {
            let ask: AskRequest = match serde_json::from_str(&request.body) {
                Ok(ask) => ask,
                Err(e) => {
                    let body = serde_json::json!({ "error": format!("Invalid request body: {}", e) });
                    return create_response(400, "Bad Request", "application/json", &body.to_string());
                }
            };

            let answer = if ask.question.trim().is_empty() {
                "Please enter a question.".to_string()
            } else {
                workflow.process_question(&ask.question).await
            };

            let body = serde_json::json!({ "answer": answer });
            create_response(200, "OK", "application/json", &body.to_string())
        }
        _ => {
            warn!("No route for {} {}", request.method, request.path);
            create_response(404, "Not Found", "application/json", r#"{"error":"Not found"}"#)
        }
    }
}

fn create_response(status: u16, status_text: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
         Access-Control-Allow-Headers: Content-Type\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    )
}
