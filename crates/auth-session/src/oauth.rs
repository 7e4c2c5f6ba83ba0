//! Loopback server receiving the sign-in redirect.

use crate::{AuthError, AuthResult};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, info};

/// Path the identity provider redirects to.
pub const CALLBACK_PATH: &str = "/auth/callback";

/// How long to wait for the user to finish signing in.
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 120;

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthorizationCallback {
    /// Parse a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        Self {
            code: params.remove("code"),
            state: params.remove("state"),
            error: params.remove("error"),
            error_description: params.remove("error_description"),
        }
    }
}

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<AuthorizationCallback>>>>;

/// One-shot HTTP listener for the authorization redirect.
pub struct OAuthCallbackServer {
    listener: TcpListener,
    port: u16,
    timeout: Duration,
}

impl OAuthCallbackServer {
    /// Bind on `127.0.0.1:<port>`. Port 0 picks a free port.
    pub async fn bind(port: u16, timeout: Duration) -> AuthResult<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AuthError::OAuth(format!("Failed to bind to {}: {}", addr, e)))?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            listener,
            port,
            timeout,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI to register with the identity provider.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port, CALLBACK_PATH)
    }

    /// Wait for the redirect and return its parameters.
    ///
    /// The caller is responsible for opening the browser to the
    /// authorization URL.
    pub async fn wait_for_callback(self) -> AuthResult<AuthorizationCallback> {
        info!(port = self.port, "OAuth callback server listening");

        let (tx, rx) = oneshot::channel::<AuthorizationCallback>();
        let tx: CallbackSender = Arc::new(Mutex::new(Some(tx)));
        let listener = self.listener;

        let server_handle = tokio::spawn({
            let tx = tx.clone();
            async move {
                loop {
                    match listener.accept().await {
                        Ok((socket, _)) => {
                            let tx = tx.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(socket, tx).await {
                                    error!("Error handling callback connection: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                            break;
                        }
                    }
                }
            }
        });

        let result = match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(callback)) => Ok(callback),
            Ok(Err(_)) => Err(AuthError::OAuth("callback channel closed".to_string())),
            Err(_) => Err(AuthError::Timeout),
        };

        server_handle.abort();
        result
    }
}

async fn handle_connection(mut socket: TcpStream, tx: CallbackSender) -> AuthResult<()> {
    let (reader, mut writer) = socket.split();
    let mut reader = BufReader::new(reader);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    debug!(request = %request_line.trim(), "Received request");

    // GET /auth/callback?code=...&state=... HTTP/1.1
    let Some(target) = request_line
        .strip_prefix("GET ")
        .and_then(|rest| rest.split_whitespace().next())
    else {
        send_response(&mut writer, 405, "Method Not Allowed", "Method Not Allowed").await?;
        return Ok(());
    };

    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    if path != CALLBACK_PATH {
        send_response(&mut writer, 404, "Not Found", "Not Found").await?;
        return Ok(());
    }

    let callback = AuthorizationCallback::from_query(query);
    let page = match (&callback.error, &callback.code) {
        (Some(error), _) => error_page(callback.error_description.as_deref().unwrap_or(error)),
        (None, Some(_)) => success_page(),
        (None, None) => error_page("Missing authorization code"),
    };
    send_response(&mut writer, 200, "OK", &page).await?;

    if let Some(tx) = tx.lock().await.take() {
        let _ = tx.send(callback);
    }

    Ok(())
}

async fn send_response(
    writer: &mut tokio::net::tcp::WriteHalf<'_>,
    status_code: u16,
    status_text: &str,
    body: &str,
) -> AuthResult<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_code,
        status_text,
        body.len(),
        body
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

fn success_page() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Storefront - Signed in</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Signed in</h1>
<p>You can close this window and return to the terminal.</p>
<script>setTimeout(() => window.close(), 2000);</script>
</body>
</html>"#
        .to_string()
}

fn error_page(error: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Storefront - Sign-in failed</title></head>
<body style="font-family: system-ui; text-align: center; padding: 50px;">
<h1>Sign-in failed</h1>
<p>{}</p>
<p>You can close this window and try again.</p>
</body>
</html>"#,
        html_escape(error)
    )
}

fn html_escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
