use std::sync::Arc;

use ferrite_digit::Session;

/// Everything the handlers share. The session does its own locking.
pub struct StudioState {
    pub session: Session,
}

impl StudioState {
    pub fn new(session: Session) -> Self {
        StudioState { session }
    }

    /// Side length raw canvas uploads must have.
    pub fn canvas_size(&self) -> usize {
        self.session.config().canvas_size as usize
    }
}

/// Shared state type: an `Arc<StudioState>` passed to every handler.
pub type SharedState = Arc<StudioState>;
