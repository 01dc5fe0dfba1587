//! Uniform grid partitioning of a [`Region`].
//!
//! Cells are emitted longitude-major: the outer loop walks longitude columns,
//! the inner loop walks latitude rows. Every cell edge is computed from the
//! parent's minimum by linear interpolation and rounded on its own, so a
//! shared edge between neighbours is always the same rounded value.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::region::{round_coord, Region};

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("grid divisions must be at least 1 on both axes (got {lon}x{lat})")]
    ZeroDivisions { lon: u32, lat: u32 },

    #[error("malformed grid spec \"{0}\": expected <lon>x<lat>, e.g. 6x6")]
    Malformed(String),

    #[error("cell ({i}, {j}) of {parent} collapses at five-decimal precision")]
    DegenerateCell { parent: String, i: u32, j: u32 },
}

/// Number of cells along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    lon_divisions: u32,
    lat_divisions: u32,
}

impl GridSpec {
    /// # Errors
    ///
    /// Returns [`GridError::ZeroDivisions`] if either count is zero.
    pub fn new(lon_divisions: u32, lat_divisions: u32) -> Result<Self, GridError> {
        if lon_divisions == 0 || lat_divisions == 0 {
            return Err(GridError::ZeroDivisions {
                lon: lon_divisions,
                lat: lat_divisions,
            });
        }
        Ok(Self {
            lon_divisions,
            lat_divisions,
        })
    }

    #[must_use]
    pub fn lon_divisions(&self) -> u32 {
        self.lon_divisions
    }

    #[must_use]
    pub fn lat_divisions(&self) -> u32 {
        self.lat_divisions
    }

    /// Total number of cells a partition produces.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.lon_divisions as usize * self.lat_divisions as usize
    }
}

impl fmt::Display for GridSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.lon_divisions, self.lat_divisions)
    }
}

impl FromStr for GridSpec {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lon, lat) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| GridError::Malformed(s.to_owned()))?;
        let lon = lon
            .trim()
            .parse::<u32>()
            .map_err(|_| GridError::Malformed(s.to_owned()))?;
        let lat = lat
            .trim()
            .parse::<u32>()
            .map_err(|_| GridError::Malformed(s.to_owned()))?;
        GridSpec::new(lon, lat)
    }
}

/// Splits `region` into `grid.lon_divisions() * grid.lat_divisions()` cells.
///
/// Used both for the initial city grid and for re-splitting a single
/// oversized region.
///
/// # Errors
///
/// Returns [`GridError::DegenerateCell`] when the region is too small for the
/// requested grid and a cell's rounded edges coincide.
pub fn partition(region: &Region, grid: GridSpec) -> Result<Vec<Region>, GridError> {
    let lon_step = region.width() / f64::from(grid.lon_divisions);
    let lat_step = region.height() / f64::from(grid.lat_divisions);

    let mut cells = Vec::with_capacity(grid.cell_count());
    for i in 0..grid.lon_divisions {
        for j in 0..grid.lat_divisions {
            let min_lat = round_coord(region.min_lat() + f64::from(j) * lat_step);
            let max_lat = round_coord(region.min_lat() + f64::from(j + 1) * lat_step);
            let min_lon = round_coord(region.min_lon() + f64::from(i) * lon_step);
            let max_lon = round_coord(region.min_lon() + f64::from(i + 1) * lon_step);

            let cell = Region::new(min_lat, max_lat, min_lon, max_lon).map_err(|_| {
                GridError::DegenerateCell {
                    parent: region.to_string(),
                    i,
                    j,
                }
            })?;
            cells.push(cell);
        }
    }
    Ok(cells)
}

#[cfg(test)]
#[path = "grid_test.rs"]
mod tests;
