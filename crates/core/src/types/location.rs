//! Geographic location of a reported issue.

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Location`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LocationError {
    #[error("latitude must be between -90 and 90 (got {0})")]
    LatitudeOutOfRange(f64),
    #[error("longitude must be between -180 and 180 (got {0})")]
    LongitudeOutOfRange(f64),
}

/// A WGS84 point plus a free-text address label.
///
/// Locations are immutable once created. A blank address is replaced by the
/// coordinates themselves so the label is never empty.
///
/// ```
/// use civic_pulse_core::Location;
///
/// let loc = Location::new(40.7128, -74.006, "").unwrap();
/// assert_eq!(loc.address(), "40.712800, -74.006000");
/// assert!(Location::new(91.0, 0.0, "North of north").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    latitude: f64,
    longitude: f64,
    address: String,
}

#[derive(Deserialize)]
struct RawLocation {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    address: String,
}

impl TryFrom<RawLocation> for Location {
    type Error = LocationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude, &raw.address)
    }
}

impl Location {
    /// Create a location, validating the coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns `LocationError` if either coordinate is not finite or out of
    /// range.
    pub fn new(latitude: f64, longitude: f64, address: &str) -> Result<Self, LocationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::LatitudeOutOfRange(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::LongitudeOutOfRange(longitude));
        }

        let address = address.trim();
        let address = if address.is_empty() {
            format!("{latitude:.6}, {longitude:.6}")
        } else {
            address.to_owned()
        };

        Ok(Self {
            latitude,
            longitude,
            address,
        })
    }

    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// OpenStreetMap link centred on this point.
    #[must_use]
    pub fn map_url(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={lat:.6}&mlon={lng:.6}#map=17/{lat:.6}/{lng:.6}",
            lat = self.latitude,
            lng = self.longitude
        )
    }
}
