use thiserror::Error;

/// Rejection of an invalid user intent by the selection engine.
///
/// These are expected outcomes, not crashes: the presentation layer is
/// supposed to only emit valid intents, but the engine re-checks every
/// precondition and rejects instead of panicking when it is invoked
/// incorrectly (or when the catalog changed underneath a selection).
/// State is left untouched on every rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no building selected")]
    BuildingRequired,

    #[error("no level selected")]
    LevelRequired,

    #[error("no device selected")]
    DeviceRequired,

    /// The device id does not resolve under the selected building and
    /// level in the current catalog -- the dangling-reference case
    /// after a catalog replace.
    #[error("device {device_id} is not available in building {building}, level {level}")]
    DeviceUnavailable {
        building: String,
        level: i64,
        device_id: String,
    },

    #[error("step {step} requires a selection before advancing")]
    StepIncomplete { step: u8 },

    #[error("confirmation is only available at the final step")]
    NotAtConfirmStep,

    /// A feedback animation is already running; it runs to completion
    /// and is never restarted mid-flight.
    #[error("an unlock feedback run is already in flight")]
    FeedbackInFlight,

    /// The unlock submission collaborator went away.
    #[error("unlock submission channel is closed")]
    SubmissionChannelClosed,
}

/// Top-level error type for the `roomlock-core` crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] roomlock_api::Error),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}
