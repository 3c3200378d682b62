//! Shared buffer slot
//!
//! Producers, the dispatcher and the consent logic all reach the active
//! buffer through one [`BufferSlot`]. Which implementation sits in the slot
//! only changes at consent transitions; every swap bumps a generation counter
//! so an upload that started before the swap can tell its watermark no longer
//! applies.

use std::sync::Arc;

use parking_lot::Mutex;
use tally_client::{Buffer, EventBuffer, Identity, RevokedBuffer};
use tracing::debug;

/// The buffer currently installed in a slot
#[derive(Debug)]
pub enum ActiveBuffer {
    Recording(EventBuffer),
    Revoked(RevokedBuffer),
}

impl ActiveBuffer {
    pub fn as_buffer(&self) -> &dyn Buffer {
        match self {
            Self::Recording(buffer) => buffer,
            Self::Revoked(buffer) => buffer,
        }
    }

    pub fn as_buffer_mut(&mut self) -> &mut dyn Buffer {
        match self {
            Self::Recording(buffer) => buffer,
            Self::Revoked(buffer) => buffer,
        }
    }
}

#[derive(Debug)]
struct SlotState {
    active: ActiveBuffer,
    generation: u64,
}

/// Cloneable handle to the active buffer
#[derive(Debug, Clone)]
pub struct BufferSlot {
    state: Arc<Mutex<SlotState>>,
}

impl BufferSlot {
    /// Slot that starts out recording into `buffer`
    pub fn recording(buffer: EventBuffer) -> Self {
        Self::with_active(ActiveBuffer::Recording(buffer))
    }

    /// Slot that starts out discarding everything
    pub fn revoked() -> Self {
        Self::with_active(ActiveBuffer::Revoked(RevokedBuffer))
    }

    fn with_active(active: ActiveBuffer) -> Self {
        Self {
            state: Arc::new(Mutex::new(SlotState {
                active,
                generation: 0,
            })),
        }
    }

    /// Run `f` against the active buffer
    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Buffer) -> R) -> R {
        f(self.state.lock().active.as_buffer_mut())
    }

    /// Run `f` against the active buffer if no swap happened since `generation`
    pub fn with_generation<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut dyn Buffer) -> R,
    ) -> Option<R> {
        let mut state = self.state.lock();
        (state.generation == generation).then(|| f(state.active.as_buffer_mut()))
    }

    /// Run `f` against the active buffer and report the current generation
    pub fn with_current<R>(&self, f: impl FnOnce(&mut dyn Buffer) -> R) -> (u64, R) {
        let mut state = self.state.lock();
        let generation = state.generation;
        (generation, f(state.active.as_buffer_mut()))
    }

    /// Run `f` against the recording buffer, if there is one
    pub fn with_recording<R>(&self, f: impl FnOnce(&mut EventBuffer) -> R) -> Option<R> {
        match &mut self.state.lock().active {
            ActiveBuffer::Recording(buffer) => Some(f(buffer)),
            ActiveBuffer::Revoked(_) => None,
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state.lock().active, ActiveBuffer::Recording(_))
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Install the revoked buffer
    ///
    /// The outgoing recording buffer is emptied in memory and on disk, then
    /// handed back so it can be reinstated later with its identity and
    /// configuration intact. Returns `None` if the slot was already revoked.
    pub fn revoke(&self) -> Option<EventBuffer> {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut state.active, ActiveBuffer::Revoked(RevokedBuffer));
        match previous {
            ActiveBuffer::Recording(mut buffer) => {
                buffer.clear();
                buffer.clear_disk_cache();
                state.generation += 1;
                debug!(generation = state.generation, "buffer revoked");
                Some(buffer)
            }
            ActiveBuffer::Revoked(_) => None,
        }
    }

    /// Install a recording buffer
    ///
    /// Any recording buffer already in the slot is returned.
    pub fn reinstate(&self, buffer: EventBuffer) -> Option<EventBuffer> {
        let mut state = self.state.lock();
        let previous = std::mem::replace(&mut state.active, ActiveBuffer::Recording(buffer));
        state.generation += 1;
        debug!(generation = state.generation, "recording buffer installed");
        match previous {
            ActiveBuffer::Recording(buffer) => Some(buffer),
            ActiveBuffer::Revoked(_) => None,
        }
    }

    /// Replace the identity on the recording buffer
    pub fn set_identity(&self, identity: Identity) {
        self.with(|buffer| buffer.set_identity(identity));
    }
}
