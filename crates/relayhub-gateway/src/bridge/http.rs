//! Minimal HTTP/1 client over an already-dialed overlay stream.

use std::error::Error as StdError;

use bytes::Bytes;
use http_body_util::Empty;
use hyper::body::{Body, Incoming};
use hyper::header::HOST;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};

use relayhub_core::error::{RelayError, Result};

/// One request on a fresh connection. The connection task lives until the
/// response body has been consumed or dropped.
pub async fn send<S, B>(stream: S, req: Request<B>) -> Result<Response<Incoming>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| RelayError::Transport(format!("http handshake failed: {e}")))?;

    tokio::spawn(async move {
        if let Err(e) = conn.await {
            tracing::debug!(error = %e, "http connection ended with error");
        }
    });

    sender
        .send_request(req)
        .await
        .map_err(|e| RelayError::Transport(format!("http request failed: {e}")))
}

/// `GET {path}` with an explicit `Host`, returning only the status.
pub async fn get_status<S>(stream: S, host: &str, path: &str) -> Result<StatusCode>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let req = Request::builder()
        .uri(path)
        .header(HOST, host)
        .body(Empty::<Bytes>::new())
        .map_err(|e| RelayError::Internal(format!("request build failed: {e}")))?;
    let resp = send(stream, req).await?;
    Ok(resp.status())
}
