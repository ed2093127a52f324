// ── Reactive catalog store ──
//
// Single-value container for the decoded catalog with push-based
// change notification via `watch` channels. The catalog is replaced
// wholesale on every successful fetch -- no incremental merge -- and a
// failed fetch leaves the previous value (possibly empty) in place.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use roomlock_api::{Catalog, CatalogClient};

use crate::error::CoreError;

/// Shared, reactive holder of the current device catalog.
///
/// Created empty at startup and held for the process lifetime. Every
/// mutation bumps a version counter and broadcasts the new snapshot to
/// subscribers.
pub struct CatalogStore {
    snapshot: watch::Sender<Arc<Catalog>>,
    version: watch::Sender<u64>,
}

impl CatalogStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Catalog::default()));
        let (version, _) = watch::channel(0u64);
        Self { snapshot, version }
    }

    /// Replace the catalog wholesale.
    ///
    /// Selection state referencing keys absent from the new catalog is
    /// NOT reset here; staleness is detected lazily by the selection
    /// engine the next time a dependent operation runs.
    pub fn replace(&self, catalog: Catalog) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(catalog));
        self.version.send_modify(|v| *v += 1);
    }

    /// Get the current catalog snapshot (cheap `Arc` clone).
    pub fn current(&self) -> Arc<Catalog> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to catalog changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Catalog>> {
        self.snapshot.subscribe()
    }

    /// Number of wholesale replacements so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one catalog fetch and replace the store's contents on success.
///
/// Any failure is surfaced to the caller and the store keeps its
/// previous catalog. No retries -- re-invoke to try again.
pub async fn refresh_catalog(client: &CatalogClient, store: &CatalogStore) -> Result<(), CoreError> {
    debug!("refreshing device catalog");
    let catalog = client.fetch_catalog().await?;
    info!(
        buildings = catalog.buildings.len(),
        "device catalog replaced"
    );
    store.replace(catalog);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use roomlock_api::{Building, Device, Level};

    use super::*;

    fn one_building() -> Catalog {
        Catalog {
            smart: None,
            buildings: vec![Building {
                building: "A".into(),
                levels: vec![Level {
                    level: 0,
                    devices: vec![Device {
                        id: "u1".into(),
                        name: "AppleTV-1".into(),
                        room: "12".into(),
                    }],
                }],
            }],
        }
    }

    #[test]
    fn starts_empty() {
        let store = CatalogStore::new();
        assert!(store.current().is_empty());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn replace_is_wholesale() {
        let store = CatalogStore::new();
        store.replace(one_building());
        assert_eq!(store.version(), 1);
        assert_eq!(store.current().devices("A", 0).len(), 1);

        // A second replace does not merge: the old building is gone.
        store.replace(Catalog {
            smart: None,
            buildings: vec![Building {
                building: "B".into(),
                levels: vec![],
            }],
        });
        assert_eq!(store.version(), 2);
        assert!(store.current().building("A").is_none());
        assert!(store.current().building("B").is_some());
    }

    #[tokio::test]
    async fn subscribers_see_replacements() {
        let store = CatalogStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_empty());

        store.replace(one_building());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().buildings.len(), 1);
    }

    #[test]
    fn failed_decode_leaves_catalog_unchanged() {
        let store = CatalogStore::new();
        store.replace(one_building());
        let before = store.current();

        // A decode failure never reaches `replace`; the store still
        // holds the exact previous value.
        assert!(Catalog::from_slice(b"{\"devices\": [{}]}").is_err());
        assert_eq!(*store.current(), *before);
        assert_eq!(store.version(), 1);
    }
}
