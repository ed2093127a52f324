// ── Feedback scheduler ──
//
// Time-boxed "processing" animation driven after a confirmed unlock.
// Purely cosmetic: it is not tied to the backend round trip. The run
// blinks the four step indicators in random order, 4 rounds of 4
// indices, 75 ms on / 25 ms off, strictly one at a time, then resets
// the selection state to its initial values. A run always completes
// once started; a second trigger while one is in flight is rejected.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::seq::SliceRandom;
use tokio::time::sleep;
use tracing::debug;

use crate::error::SelectionError;
use crate::selection::{EngineInner, SelectionEngine, SelectionState};

const BLINK_ROUNDS: usize = 4;
const STEP_COUNT: u8 = 4;
const BLINK_ON: Duration = Duration::from_millis(75);
const BLINK_OFF: Duration = Duration::from_millis(25);

impl SelectionEngine {
    /// `true` while a feedback run is in flight.
    pub fn feedback_in_flight(&self) -> bool {
        self.inner.feedback_active.load(Ordering::Acquire)
    }

    /// Claim the single feedback slot. Rejects when a run is in flight.
    pub(crate) fn reserve_feedback(&self) -> Result<(), SelectionError> {
        self.inner
            .feedback_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| SelectionError::FeedbackInFlight)
    }

    /// Give the slot back without running (submission failed).
    pub(crate) fn release_feedback(&self) {
        self.inner.feedback_active.store(false, Ordering::Release);
    }

    /// Spawn the reserved feedback run on its own task, detached. The
    /// run owns its completion: it resets the state and releases the
    /// slot itself.
    pub(crate) fn spawn_feedback(&self) {
        let _detached = tokio::spawn(run_feedback(Arc::clone(&self.inner)));
    }
}

async fn run_feedback(inner: Arc<EngineInner>) {
    debug!("feedback animation started");
    inner.state.send_modify(|s| s.step_hidden = true);

    for _ in 0..BLINK_ROUNDS {
        let mut order: Vec<u8> = (0..STEP_COUNT).collect();
        order.shuffle(&mut rand::thread_rng());
        for index in order {
            inner.state.send_modify(|s| s.blinking_step = Some(index));
            sleep(BLINK_ON).await;
            inner.state.send_modify(|s| s.blinking_step = None);
            sleep(BLINK_OFF).await;
        }
    }

    // Back to a fresh selection once the animation is done.
    inner.state.send_modify(|s| *s = SelectionState::default());
    inner.feedback_active.store(false, Ordering::Release);
    debug!("feedback animation finished, selection reset");
}
