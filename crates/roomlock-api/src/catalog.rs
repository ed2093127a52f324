// ── Device catalog model ──
//
// Typed representation of the building -> level -> device hierarchy
// and its decode contract. Decoding is all-or-nothing: a payload either
// yields a complete `Catalog` or an error, never a partial hierarchy.

use serde::Deserialize;

use crate::error::Error;

/// A single lockable device.
///
/// `id` is the backend's opaque identifier (wire key `UDID`), unique
/// within the catalog. `room` is an ordering key the backend sends as a
/// string; it is compared, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Device {
    #[serde(rename = "UDID")]
    pub id: String,
    pub name: String,
    pub room: String,
}

/// One level of a building. Levels can be negative (basements).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Level {
    pub level: i64,
    pub devices: Vec<Device>,
}

/// A building with its levels, unique by `level` value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Building {
    pub building: String,
    pub levels: Vec<Level>,
}

/// The decoded device-list payload.
///
/// - `smart`: optionally the device pre-associated with the caller's
///   own room, if the backend could resolve one. Part of the payload
///   contract but not consumed by the selection flow.
/// - `buildings`: the full hierarchy, order-preserved from the wire
///   (wire key `devices`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub smart: Option<Device>,
    #[serde(rename = "devices")]
    pub buildings: Vec<Building>,
}

impl Catalog {
    /// Decode a catalog from a raw response body.
    ///
    /// Fails with [`Error::MalformedCatalog`] when any required field is
    /// absent or has the wrong shape. Callers holding a previous catalog
    /// keep it untouched on failure.
    pub fn from_slice(body: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(body).map_err(|e| Error::MalformedCatalog {
            message: e.to_string(),
            body: String::from_utf8_lossy(body).into_owned(),
        })
    }

    /// Look up a building by name.
    pub fn building(&self, name: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.building == name)
    }

    /// Devices available in `building` on `level`, order-preserved.
    ///
    /// Returns an empty slice when the building or level is absent --
    /// "no devices" and "unknown location" are deliberately not
    /// distinguished here. Use [`building`](Self::building) when the
    /// distinction matters.
    pub fn devices(&self, building: &str, level: i64) -> &[Device] {
        self.building(building)
            .and_then(|b| b.levels.iter().find(|l| l.level == level))
            .map_or(&[], |l| l.devices.as_slice())
    }

    /// Resolve a device id under a specific building + level.
    ///
    /// The dangling-reference check: selection state stores only keys,
    /// and the catalog may have been replaced since they were picked.
    pub fn resolve(&self, building: &str, level: i64, device_id: &str) -> Option<&Device> {
        self.devices(building, level)
            .iter()
            .find(|d| d.id == device_id)
    }

    /// `true` when no buildings have been loaded yet.
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}
