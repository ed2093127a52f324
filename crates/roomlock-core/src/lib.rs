//! Domain layer between `roomlock-api` and presentation consumers.
//!
//! This crate owns the selection business logic and the reactive data
//! infrastructure for the roomlock workspace:
//!
//! - **[`CatalogStore`]** — Reactive single-value storage for the
//!   decoded device catalog (`tokio::sync::watch`). Replaced wholesale
//!   per successful fetch via [`refresh_catalog`]; failures leave the
//!   previous catalog in place.
//!
//! - **[`SelectionEngine`]** — Four-step state machine over
//!   (building, level, device) enforcing cascading invalidation, step
//!   gating, and lazy staleness detection against the current catalog.
//!   Publishes [`SelectionState`] snapshots through a `watch` channel
//!   for UI consumers.
//!
//! - **[`ConfirmationToken`]** — Immutable snapshot of the confirmed
//!   tuple, delivered to the unlock collaborator through an `mpsc`
//!   channel injected at engine construction.
//!
//! - **Feedback scheduler** — run-to-completion blink animation spawned
//!   by a confirmed unlock; suppresses the step display, cycles the
//!   blink index, then resets the selection. Re-triggering while a run
//!   is in flight is rejected.

pub mod error;
pub mod feedback;
pub mod selection;
pub mod store;

pub use error::{CoreError, SelectionError};
pub use selection::{ConfirmationToken, FINAL_STEP, SelectionEngine, SelectionState};
pub use store::{CatalogStore, refresh_catalog};

// Re-export the catalog model for consumers that only depend on core.
pub use roomlock_api::{Building, Catalog, Device, Level};
