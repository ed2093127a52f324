// ── Selection engine ──
//
// Four-step state machine over (building, level, device). Owns the
// selection state behind a `watch` channel and enforces cascading
// invalidation and step gating in response to discrete user intents.
// Selections are stored as keys, never as catalog objects: the catalog
// can be replaced wholesale at any time, and staleness is detected
// lazily when a dependent operation (`set_device`, `confirm`) runs.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::error::SelectionError;
use crate::store::CatalogStore;

/// Index of the confirmation step.
pub const FINAL_STEP: u8 = 3;

/// The observable selection state.
///
/// `step_hidden` and `blinking_step` exist for the feedback animation:
/// while a run is in flight the normal step highlight is suppressed and
/// the blink index cycles. Presentation reads
/// [`displayed_step`](Self::displayed_step) rather than `step` directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub building: Option<String>,
    pub level: Option<i64>,
    pub device_id: Option<String>,
    pub step: u8,
    pub step_hidden: bool,
    pub blinking_step: Option<u8>,
}

impl SelectionState {
    /// The step indicator to highlight, if any.
    pub fn displayed_step(&self) -> Option<u8> {
        if self.step_hidden { None } else { Some(self.step) }
    }

    /// Gating rule: is the selection required at `step` present?
    fn step_requirement_met(&self, step: u8) -> bool {
        match step {
            0 => self.building.is_some(),
            1 => self.level.is_some(),
            2 => self.device_id.is_some(),
            _ => self.building.is_some() && self.level.is_some() && self.device_id.is_some(),
        }
    }
}

/// Immutable snapshot of the confirmed tuple at confirm time.
///
/// A snapshot by value: the catalog may be replaced after confirmation
/// without invalidating an already-issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationToken {
    pub building: String,
    pub level: i64,
    pub device_id: String,
}

/// The selection engine. Cheaply cloneable via `Arc` internals.
///
/// Constructed with the catalog store it validates against and the
/// unlock submission channel (the external collaborator receives a
/// [`ConfirmationToken`] per confirmed selection). All intents arrive
/// from a single interaction context; the engine is the sole writer of
/// its state channel apart from the feedback task it spawns.
#[derive(Clone)]
pub struct SelectionEngine {
    pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) store: Arc<CatalogStore>,
    pub(crate) state: watch::Sender<SelectionState>,
    pub(crate) unlock_tx: mpsc::Sender<ConfirmationToken>,
    pub(crate) feedback_active: AtomicBool,
}

impl SelectionEngine {
    pub fn new(store: Arc<CatalogStore>, unlock_tx: mpsc::Sender<ConfirmationToken>) -> Self {
        let (state, _) = watch::channel(SelectionState::default());
        Self {
            inner: Arc::new(EngineInner {
                store,
                state,
                unlock_tx,
                feedback_active: AtomicBool::new(false),
            }),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> SelectionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<SelectionState> {
        self.inner.state.subscribe()
    }

    /// The catalog store this engine validates against.
    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.inner.store
    }

    // ── Intents ──────────────────────────────────────────────────────

    /// Select a building.
    ///
    /// Picking a building when none was selected, or a different one
    /// than before, cascades: level and device are cleared. Re-picking
    /// the current building leaves them alone. Never changes `step`.
    pub fn set_building(&self, name: &str) {
        self.inner.state.send_if_modified(|s| {
            if s.building.as_deref() == Some(name) {
                return false;
            }
            debug!(building = name, "building selected, downstream cleared");
            s.building = Some(name.to_owned());
            s.level = None;
            s.device_id = None;
            true
        });
    }

    /// Select a level. Requires a building; cascades: device cleared.
    pub fn set_level(&self, level: i64) -> Result<(), SelectionError> {
        let mut result = Ok(());
        self.inner.state.send_if_modified(|s| {
            if s.building.is_none() {
                result = Err(SelectionError::BuildingRequired);
                return false;
            }
            debug!(level, "level selected, device cleared");
            s.level = Some(level);
            s.device_id = None;
            true
        });
        result
    }

    /// Select a device by id.
    ///
    /// The id must belong to a device under the currently selected
    /// building + level in the *current* catalog. A dangling id (e.g.
    /// the catalog was replaced underneath the selection) is rejected
    /// and the previous device selection stays cleared.
    pub fn set_device(&self, id: &str) -> Result<(), SelectionError> {
        let catalog = self.inner.store.current();
        let mut result = Ok(());
        self.inner.state.send_if_modified(|s| {
            let Some(building) = s.building.as_deref() else {
                result = Err(SelectionError::BuildingRequired);
                return false;
            };
            let Some(level) = s.level else {
                result = Err(SelectionError::LevelRequired);
                return false;
            };
            if catalog.resolve(building, level, id).is_none() {
                result = Err(SelectionError::DeviceUnavailable {
                    building: building.to_owned(),
                    level,
                    device_id: id.to_owned(),
                });
                return false;
            }
            debug!(device = id, "device selected");
            s.device_id = Some(id.to_owned());
            true
        });
        result
    }

    /// Advance to the next step, gated on the current step's selection.
    ///
    /// Presentation is expected to only invoke this when the gate is
    /// open (disabled-action precondition); the engine re-checks and
    /// rejects anyway. Clamps at the final step.
    pub fn advance(&self) -> Result<(), SelectionError> {
        let mut result = Ok(());
        self.inner.state.send_if_modified(|s| {
            if !s.step_requirement_met(s.step) {
                result = Err(SelectionError::StepIncomplete { step: s.step });
                return false;
            }
            let next = (s.step + 1).min(FINAL_STEP);
            if next == s.step {
                return false;
            }
            s.step = next;
            true
        });
        result
    }

    /// Go back one step. Always permitted; clamps at step 0.
    pub fn retreat(&self) {
        self.inner.state.send_if_modified(|s| {
            if s.step == 0 {
                return false;
            }
            s.step -= 1;
            true
        });
    }

    /// Confirm the selection and submit the unlock request.
    ///
    /// Valid only at the final step with all three selections present
    /// and the device id still resolvable in the current catalog.
    /// On success the confirmed tuple is snapshotted into a
    /// [`ConfirmationToken`], handed to the unlock collaborator, and
    /// the feedback animation is started (which resets the selection
    /// when it completes). Must be called within a tokio runtime.
    pub fn confirm(&self) -> Result<ConfirmationToken, SelectionError> {
        let snapshot = self.state();
        if snapshot.step != FINAL_STEP {
            return Err(SelectionError::NotAtConfirmStep);
        }
        let building = snapshot.building.ok_or(SelectionError::BuildingRequired)?;
        let level = snapshot.level.ok_or(SelectionError::LevelRequired)?;
        let device_id = snapshot.device_id.ok_or(SelectionError::DeviceRequired)?;

        // Lazy staleness check against the catalog as of right now.
        let catalog = self.inner.store.current();
        if catalog.resolve(&building, level, &device_id).is_none() {
            return Err(SelectionError::DeviceUnavailable {
                building,
                level,
                device_id,
            });
        }

        let token = ConfirmationToken {
            building,
            level,
            device_id,
        };

        // Reserve the feedback run before submitting, so a rejected
        // re-trigger never produces a duplicate submission.
        self.reserve_feedback()?;
        if self.inner.unlock_tx.try_send(token.clone()).is_err() {
            self.release_feedback();
            return Err(SelectionError::SubmissionChannelClosed);
        }

        debug!(
            building = %token.building,
            level = token.level,
            device = %token.device_id,
            "unlock submitted"
        );
        self.spawn_feedback();
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    use roomlock_api::{Building, Catalog, Device, Level};

    use super::*;

    fn device(id: &str, name: &str, room: &str) -> Device {
        Device {
            id: id.into(),
            name: name.into(),
            room: room.into(),
        }
    }

    fn two_building_catalog() -> Catalog {
        Catalog {
            smart: None,
            buildings: vec![
                Building {
                    building: "A".into(),
                    levels: vec![
                        Level {
                            level: 0,
                            devices: vec![device("u1", "AppleTV-1", "12")],
                        },
                        Level {
                            level: 1,
                            devices: vec![device("u2", "AppleTV-2", "3")],
                        },
                    ],
                },
                Building {
                    building: "B".into(),
                    levels: vec![Level {
                        level: 2,
                        devices: vec![device("u9", "AppleTV-9", "21")],
                    }],
                },
            ],
        }
    }

    fn engine() -> (SelectionEngine, mpsc::Receiver<ConfirmationToken>) {
        let store = Arc::new(CatalogStore::new());
        store.replace(two_building_catalog());
        let (tx, rx) = mpsc::channel(4);
        (SelectionEngine::new(store, tx), rx)
    }

    /// "if level is set then building is set" and
    /// "if device is set then level is set".
    fn assert_cascade_invariants(state: &SelectionState) {
        if state.level.is_some() {
            assert!(state.building.is_some());
        }
        if state.device_id.is_some() {
            assert!(state.level.is_some());
        }
    }

    #[test]
    fn initial_state_is_default() {
        let (engine, _rx) = engine();
        assert_eq!(engine.state(), SelectionState::default());
        assert_eq!(engine.state().displayed_step(), Some(0));
    }

    #[test]
    fn switching_building_cascades() {
        let (engine, _rx) = engine();
        engine.set_building("A");
        engine.set_level(1).unwrap();
        engine.set_device("u2").unwrap();

        engine.set_building("B");
        let state = engine.state();
        assert_eq!(state.building.as_deref(), Some("B"));
        assert_eq!(state.level, None);
        assert_eq!(state.device_id, None);
        assert_cascade_invariants(&state);
    }

    #[test]
    fn reselecting_same_building_preserves_downstream() {
        let (engine, _rx) = engine();
        engine.set_building("A");
        engine.set_level(0).unwrap();
        engine.set_device("u1").unwrap();

        engine.set_building("A");
        let state = engine.state();
        assert_eq!(state.level, Some(0));
        assert_eq!(state.device_id.as_deref(), Some("u1"));
    }

    #[test]
    fn selecting_level_clears_device() {
        let (engine, _rx) = engine();
        engine.set_building("A");
        engine.set_level(0).unwrap();
        engine.set_device("u1").unwrap();

        engine.set_level(1).unwrap();
        let state = engine.state();
        assert_eq!(state.level, Some(1));
        assert_eq!(state.device_id, None);
        assert_cascade_invariants(&state);
    }

    #[test]
    fn level_without_building_is_rejected() {
        let (engine, _rx) = engine();
        assert_eq!(
            engine.set_level(0).unwrap_err(),
            SelectionError::BuildingRequired
        );
        assert_eq!(engine.state(), SelectionState::default());
    }

    #[test]
    fn device_without_level_is_rejected() {
        let (engine, _rx) = engine();
        engine.set_building("A");
        assert_eq!(
            engine.set_device("u1").unwrap_err(),
            SelectionError::LevelRequired
        );
        assert_eq!(engine.state().device_id, None);
    }

    #[test]
    fn device_outside_selected_location_is_rejected() {
        let (engine, _rx) = engine();
        engine.set_building("A");
        engine.set_level(0).unwrap();

        // u9 exists, but under B/2.
        let err = engine.set_device("u9").unwrap_err();
        assert!(matches!(err, SelectionError::DeviceUnavailable { .. }));
        assert_eq!(engine.state().device_id, None);
    }

    #[test]
    fn invariants_hold_across_arbitrary_sequences() {
        let (engine, _rx) = engine();
        engine.set_building("A");
        let _ = engine.set_level(1);
        assert_cascade_invariants(&engine.state());
        let _ = engine.set_device("u2");
        assert_cascade_invariants(&engine.state());
        engine.set_building("B");
        assert_cascade_invariants(&engine.state());
        let _ = engine.set_device("u9"); // no level yet, rejected
        assert_cascade_invariants(&engine.state());
        let _ = engine.set_level(2);
        assert_cascade_invariants(&engine.state());
        let _ = engine.set_device("u9");
        assert_cascade_invariants(&engine.state());
    }

    #[test]
    fn advance_is_gated_on_current_step() {
        let (engine, _rx) = engine();

        // Step 0 with no building: step must not move.
        assert_eq!(
            engine.advance().unwrap_err(),
            SelectionError::StepIncomplete { step: 0 }
        );
        assert_eq!(engine.state().step, 0);

        engine.set_building("A");
        engine.advance().unwrap();
        assert_eq!(engine.state().step, 1);

        // Step 1 without a level.
        assert_eq!(
            engine.advance().unwrap_err(),
            SelectionError::StepIncomplete { step: 1 }
        );
    }

    #[test]
    fn retreat_always_allowed_and_clamped() {
        let (engine, _rx) = engine();
        engine.retreat();
        assert_eq!(engine.state().step, 0);

        engine.set_building("A");
        engine.advance().unwrap();
        engine.retreat();
        assert_eq!(engine.state().step, 0);
    }

    #[test]
    fn confirm_requires_final_step() {
        let (engine, _rx) = engine();
        engine.set_building("A");
        assert_eq!(
            engine.confirm().unwrap_err(),
            SelectionError::NotAtConfirmStep
        );
    }

    #[tokio::test]
    async fn full_walkthrough_yields_token() {
        let (engine, mut rx) = engine();

        engine.set_building("A");
        engine.advance().unwrap();
        engine.set_level(0).unwrap();
        engine.advance().unwrap();
        engine.set_device("u1").unwrap();
        engine.advance().unwrap();

        let token = engine.confirm().unwrap();
        assert_eq!(
            token,
            ConfirmationToken {
                building: "A".into(),
                level: 0,
                device_id: "u1".into(),
            }
        );
        // The collaborator receives the same snapshot.
        assert_eq!(rx.recv().await.unwrap(), token);
    }

    #[tokio::test]
    async fn stale_selection_is_rejected_lazily() {
        let (engine, mut rx) = engine();

        engine.set_building("A");
        engine.advance().unwrap();
        engine.set_level(0).unwrap();
        engine.advance().unwrap();
        engine.set_device("u1").unwrap();
        engine.advance().unwrap();

        // Catalog replaced underneath: u1 is gone. The selection state
        // is NOT eagerly reset...
        engine.store().replace(Catalog::default());
        let state = engine.state();
        assert_eq!(state.device_id.as_deref(), Some("u1"));
        assert_eq!(state.step, FINAL_STEP);

        // ...but confirm detects the dangling id and produces no token.
        let err = engine.confirm().unwrap_err();
        assert!(matches!(err, SelectionError::DeviceUnavailable { .. }));
        assert!(rx.try_recv().is_err());
        assert!(!engine.feedback_in_flight());
    }

    #[tokio::test]
    async fn closed_submission_channel_is_surfaced() {
        let (engine, rx) = engine();
        drop(rx);

        engine.set_building("A");
        engine.advance().unwrap();
        engine.set_level(0).unwrap();
        engine.advance().unwrap();
        engine.set_device("u1").unwrap();
        engine.advance().unwrap();

        assert_eq!(
            engine.confirm().unwrap_err(),
            SelectionError::SubmissionChannelClosed
        );
        // The failed confirm released the feedback slot.
        assert!(!engine.feedback_in_flight());
    }
}
