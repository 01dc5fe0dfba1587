//! Axis-aligned latitude/longitude bounding boxes.
//!
//! A [`Region`] doubles as a cache key and as the listings site's `viewport`
//! query parameter, so its canonical string form is fixed:
//! `"{min_lat}:{max_lat}:{min_lon}:{max_lon}"` with every value rounded to
//! five decimal places.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of decimal places kept in the canonical string form.
pub const COORD_DECIMALS: i32 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("{axis} bounds are inverted or empty: min {min} >= max {max}")]
    Inverted {
        axis: &'static str,
        min: f64,
        max: f64,
    },

    #[error("region bounds must be finite numbers")]
    NonFinite,

    #[error("malformed region string \"{0}\": expected min_lat:max_lat:min_lon:max_lon")]
    Malformed(String),
}

/// Rounds a coordinate to [`COORD_DECIMALS`] places.
#[must_use]
pub fn round_coord(value: f64) -> f64 {
    let scale = 10f64.powi(COORD_DECIMALS);
    (value * scale).round() / scale
}

/// An immutable lat/lng bounding box with `min < max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Region {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Region {
    /// Builds a region, rejecting non-finite or inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::NonFinite`] if any bound is NaN or infinite and
    /// [`RegionError::Inverted`] if `min >= max` on either axis.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self, RegionError> {
        if ![min_lat, max_lat, min_lon, max_lon]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(RegionError::NonFinite);
        }
        if min_lat >= max_lat {
            return Err(RegionError::Inverted {
                axis: "latitude",
                min: min_lat,
                max: max_lat,
            });
        }
        if min_lon >= max_lon {
            return Err(RegionError::Inverted {
                axis: "longitude",
                min: min_lon,
                max: max_lon,
            });
        }
        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    #[must_use]
    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    #[must_use]
    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    #[must_use]
    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    #[must_use]
    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }

    /// Longitude span in degrees.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Latitude span in degrees.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Returns `true` if `other` lies inside `self`, allowing for the
    /// five-decimal rounding applied to canonical strings.
    #[must_use]
    pub fn contains(&self, other: &Region) -> bool {
        let tolerance = 0.5 * 10f64.powi(-COORD_DECIMALS);
        other.min_lat >= self.min_lat - tolerance
            && other.max_lat <= self.max_lat + tolerance
            && other.min_lon >= self.min_lon - tolerance
            && other.max_lon <= self.max_lon + tolerance
    }
}

/// Writes a rounded coordinate, keeping at least one decimal place so whole
/// degrees render as `49.0` rather than `49`.
fn write_coord(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let rounded = round_coord(value);
    if rounded.fract().abs() < f64::EPSILON {
        write!(f, "{rounded:.1}")
    } else {
        write!(f, "{rounded}")
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_coord(f, self.min_lat)?;
        f.write_str(":")?;
        write_coord(f, self.max_lat)?;
        f.write_str(":")?;
        write_coord(f, self.min_lon)?;
        f.write_str(":")?;
        write_coord(f, self.max_lon)
    }
}

impl FromStr for Region {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 4 {
            return Err(RegionError::Malformed(s.to_owned()));
        }
        let mut values = [0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .trim()
                .parse::<f64>()
                .map_err(|_| RegionError::Malformed(s.to_owned()))?;
        }
        let [min_lat, max_lat, min_lon, max_lon] = values;
        Region::new(min_lat, max_lat, min_lon, max_lon)
    }
}

impl TryFrom<String> for Region {
    type Error = RegionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_string_uses_colon_order_lat_then_lon() {
        let region = Region::new(49.2, 49.3, -123.2, -123.1).unwrap();
        assert_eq!(region.to_string(), "49.2:49.3:-123.2:-123.1");
    }

    #[test]
    fn canonical_string_rounds_to_five_decimals() {
        let region = Region::new(49.198_765_4, 49.3, -123.224_999_9, -123.1).unwrap();
        assert_eq!(region.to_string(), "49.19877:49.3:-123.225:-123.1");
    }

    #[test]
    fn whole_degree_bounds_keep_one_decimal() {
        let region = Region::new(49.0, 49.5, -123.0, -122.999_999).unwrap();
        assert_eq!(region.to_string(), "49.0:49.5:-123.0:-123.0");
        let parsed: Region = "49:50:-124:-123".parse().unwrap();
        assert_eq!(parsed.to_string(), "49.0:50.0:-124.0:-123.0");
    }

    #[test]
    fn parse_then_format_round_trips_to_five_decimals() {
        let original = Region::new(49.123_456_78, 49.234_567_89, -123.198_765_4, -123.087_654_3)
            .unwrap();
        let reparsed: Region = original.to_string().parse().unwrap();
        assert!((reparsed.min_lat() - round_coord(original.min_lat())).abs() < 1e-9);
        assert!((reparsed.max_lat() - round_coord(original.max_lat())).abs() < 1e-9);
        assert!((reparsed.min_lon() - round_coord(original.min_lon())).abs() < 1e-9);
        assert!((reparsed.max_lon() - round_coord(original.max_lon())).abs() < 1e-9);
        assert_eq!(reparsed.to_string(), original.to_string());
    }

    #[test]
    fn rejects_inverted_latitude() {
        let err = Region::new(49.3, 49.2, -123.2, -123.1).unwrap_err();
        assert!(matches!(err, RegionError::Inverted { axis: "latitude", .. }));
    }

    #[test]
    fn rejects_zero_width_longitude() {
        let err = Region::new(49.2, 49.3, -123.1, -123.1).unwrap_err();
        assert!(matches!(err, RegionError::Inverted { axis: "longitude", .. }));
    }

    #[test]
    fn rejects_nan_bounds() {
        assert_eq!(
            Region::new(f64::NAN, 49.3, -123.2, -123.1).unwrap_err(),
            RegionError::NonFinite
        );
    }

    #[test]
    fn parse_rejects_wrong_segment_count() {
        let err = "49.2:49.3:-123.2".parse::<Region>().unwrap_err();
        assert!(matches!(err, RegionError::Malformed(_)));
    }

    #[test]
    fn parse_rejects_non_numeric_segment() {
        let err = "49.2:north:-123.2:-123.1".parse::<Region>().unwrap_err();
        assert!(matches!(err, RegionError::Malformed(_)));
    }

    #[test]
    fn serializes_as_canonical_string() {
        let region = Region::new(49.2, 49.3, -123.2, -123.1).unwrap();
        let json = serde_json::to_string(&region).unwrap();
        assert_eq!(json, "\"49.2:49.3:-123.2:-123.1\"");
        let back: Region = serde_json::from_str(&json).unwrap();
        assert_eq!(back, region);
    }

    #[test]
    fn contains_accepts_rounded_child() {
        let parent = Region::new(49.000_001, 49.5, -123.5, -123.0).unwrap();
        let child = Region::new(49.0, 49.25, -123.5, -123.25).unwrap();
        assert!(parent.contains(&child));
        let outside = Region::new(48.9, 49.25, -123.5, -123.25).unwrap();
        assert!(!parent.contains(&outside));
    }
}
