use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use reqwest::{header, Client, Method, RequestBuilder, Response};

use crate::logging;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Installs ring as the process-wide rustls crypto provider.
///
/// reqwest is built without a bundled provider, so this has to run before the first
/// client is created. Calling it again is a no-op.
pub fn init_crypto() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
///
/// No overall timeout is set on the client itself; callers decide per request.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        init_crypto();
        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 重定向 =====
            .redirect(reqwest::redirect::Policy::limited(5))
            // ===== Headers =====
            .referer(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and returns the response as text.
///
/// # Arguments
///
/// * `url`: The URL to send the GET request to.
/// * `headers`: An optional set of headers to include with the request.
/// * `timeout`: An optional limit for the whole request; `None` waits as long as the
///   server takes.
///
/// The HTTP status is logged but not checked: only transport failures are errors.
pub async fn get(
    url: &str,
    headers: Option<header::HeaderMap>,
    timeout: Option<Duration>,
) -> Result<String> {
    send(Method::GET, url, headers, timeout)
        .await?
        .text()
        .await
        .map_err(|why| anyhow!("Error parsing response text from {}: {:?}", url, why))
}

/// Sends a single HTTP request. There is no retry; the first failure is returned.
async fn send(
    method: Method,
    url: &str,
    headers: Option<header::HeaderMap>,
    timeout: Option<Duration>,
) -> Result<Response> {
    let visit_log = format!("{method}:{url}");
    let client = get_client()?;
    let mut rb: RequestBuilder = client.request(method, url);

    if let Some(h) = headers {
        rb = rb.headers(h);
    }

    if let Some(t) = timeout {
        rb = rb.timeout(t);
    }

    let start = Instant::now();
    let res = rb.send().await;
    let elapsed = start.elapsed().as_millis();

    match res {
        Ok(response) => {
            logging::info_file_async(format!(
                "{} {} {} ms",
                visit_log,
                response.status(),
                elapsed
            ));
            Ok(response)
        }
        Err(why) => {
            logging::error_file_async(format!(
                "{} failed because {:?}. {} ms",
                visit_log, why, elapsed
            ));
            Err(anyhow!("Failed to send request to {} because {:?}", url, why))
        }
    }
}
