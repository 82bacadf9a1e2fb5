use relayhub_core::error::Result;
use relayhub_core::protocol::{CallPhase, CallSignal, Event};

use crate::realtime::{Delivery, RealtimeCtx};

/// Call signaling relay. Nothing is persisted.
#[derive(Default)]
pub struct CallService;

impl CallService {
    pub fn new() -> Self {
        Self
    }

    /// Forward to `toId` with `fromId` set to the sending session's user,
    /// overriding whatever the client put there.
    pub async fn relay(
        &self,
        ctx: &RealtimeCtx,
        phase: CallPhase,
        mut signal: CallSignal,
    ) -> Result<Delivery> {
        signal.from_id = Some(ctx.user().to_string());
        let to = signal.to_id.clone();
        let delivery = ctx.send_to(&to, &Event::call(phase, signal)).await?;
        tracing::debug!(phase = phase.as_wire(), to = %to, ?delivery, "call signal relayed");
        Ok(delivery)
    }
}
