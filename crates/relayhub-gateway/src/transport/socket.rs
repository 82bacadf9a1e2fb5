//! Per-socket egress tasks.

use std::time::Duration;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use crate::shutdown;

const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Drain the outbound queue into the socket until it is closed. Every write
/// is cancellable by the close signal; after it, whatever is still queued
/// gets one bounded flush before the close frame.
pub async fn write_loop<S>(
    mut sink: S,
    mut out_rx: mpsc::Receiver<Message>,
    mut closed: watch::Receiver<bool>,
) where
    S: Sink<Message> + Unpin,
{
    loop {
        tokio::select! {
            biased;
            _ = shutdown::requested(&mut closed) => break,
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                tokio::select! {
                    r = sink.send(m) => {
                        if r.is_err() {
                            break;
                        }
                    }
                    _ = shutdown::requested(&mut closed) => break,
                }
            }
        }
    }

    // Flush what was queued before the close (final notices), bounded.
    let _ = timeout(CLOSE_GRACE, async {
        while let Ok(m) = out_rx.try_recv() {
            if sink.send(m).await.is_err() {
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    })
    .await;
    let _ = timeout(CLOSE_GRACE, sink.close()).await;
}

/// Queue a WS ping every `every` until the socket closes. A full queue skips
/// the tick; the peer's read deadline handles the rest.
pub async fn keepalive(
    out_tx: mpsc::Sender<Message>,
    every: Duration,
    mut closed: watch::Receiver<bool>,
) {
    let mut tick = interval_at(Instant::now() + every, every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown::requested(&mut closed) => break,
            _ = tick.tick() => {
                if let Err(mpsc::error::TrySendError::Closed(_)) =
                    out_tx.try_send(Message::Ping(Vec::new()))
                {
                    break;
                }
            }
        }
    }
}
