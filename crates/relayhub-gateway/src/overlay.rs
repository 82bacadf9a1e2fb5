//! Overlay transport collaborator.
//!
//! The hub listens and the bridge dials through this trait. The core only
//! hands it `host:port` strings; membership and key material belong to the
//! overlay itself.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use relayhub_core::error::{RelayError, Result};

/// Byte stream produced by an overlay dial.
pub trait OverlayIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> OverlayIo for T {}

pub type OverlayStream = Box<dyn OverlayIo>;

#[async_trait]
pub trait Overlay: Send + Sync {
    async fn dial(&self, addr: &str) -> Result<OverlayStream>;
    async fn listen(&self, addr: &str) -> Result<TcpListener>;
}

/// Overlay whose addresses are routed by the host network stack (a tailnet
/// interface, a VPN device, or plain loopback in tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct HostOverlay;

#[async_trait]
impl Overlay for HostOverlay {
    async fn dial(&self, addr: &str) -> Result<OverlayStream> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| RelayError::Transport(format!("dial {addr} failed: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| RelayError::Transport(format!("set_nodelay failed: {e}")))?;
        Ok(Box::new(stream))
    }

    async fn listen(&self, addr: &str) -> Result<TcpListener> {
        TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::Transport(format!("listen {addr} failed: {e}")))
    }
}
