use serde::Deserialize;
use serde_json::Value;
use tilescout_core::Region;

use super::ListingsClient;
use crate::error::ScraperError;

#[derive(Debug, Deserialize)]
struct BoundaryResponse {
    #[serde(default)]
    results: Vec<BoundaryRecord>,
}

#[derive(Debug, Deserialize)]
struct BoundaryRecord {
    geom: BoundaryGeom,
}

#[derive(Debug, Deserialize)]
struct BoundaryGeom {
    geometry: BoundaryGeometry,
}

/// `coordinates` nests differently for `Polygon` and `MultiPolygon`, so it is
/// kept untyped and flattened afterwards.
#[derive(Debug, Deserialize)]
struct BoundaryGeometry {
    coordinates: Value,
}

impl ListingsClient {
    /// Fetches the city boundary polygon and returns its axis-aligned
    /// bounding box.
    ///
    /// Only the first record of the response is used.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::BoundaryUnavailable`] for any failure: a
    /// transport error, a non-2xx status, a body that is not the expected
    /// JSON shape, or a polygon with no vertices.
    pub async fn resolve_bounding_box(&self, boundary_url: &str) -> Result<Region, ScraperError> {
        let body = self
            .get_text(boundary_url)
            .await
            .map_err(|e| ScraperError::BoundaryUnavailable {
                reason: e.to_string(),
            })?;

        let region = bounding_box_of(&body)
            .map_err(|reason| ScraperError::BoundaryUnavailable { reason })?;
        tracing::info!(url = boundary_url, %region, "resolved city bounding box");
        Ok(region)
    }
}

/// Parses a boundary API body and reduces its first polygon to a bounding
/// box.
pub(crate) fn bounding_box_of(body: &str) -> Result<Region, String> {
    let response: BoundaryResponse =
        serde_json::from_str(body).map_err(|e| format!("malformed boundary response: {e}"))?;
    let record = response
        .results
        .into_iter()
        .next()
        .ok_or_else(|| "boundary response has no results".to_owned())?;

    let mut vertices = Vec::new();
    collect_vertices(&record.geom.geometry.coordinates, &mut vertices)?;
    if vertices.is_empty() {
        return Err("boundary polygon has no vertices".to_owned());
    }

    let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
    for (lon, lat) in vertices {
        min_lon = min_lon.min(lon);
        max_lon = max_lon.max(lon);
        min_lat = min_lat.min(lat);
        max_lat = max_lat.max(lat);
    }

    Region::new(min_lat, max_lat, min_lon, max_lon).map_err(|e| e.to_string())
}

/// Walks nested coordinate arrays, collecting every `[lon, lat, ..]`
/// position.
fn collect_vertices(node: &Value, out: &mut Vec<(f64, f64)>) -> Result<(), String> {
    let Value::Array(items) = node else {
        return Err(format!("expected coordinate array, found {node}"));
    };

    match items.as_slice() {
        [Value::Number(lon), Value::Number(lat), ..] => {
            let lon = lon.as_f64().ok_or("longitude is not a float")?;
            let lat = lat.as_f64().ok_or("latitude is not a float")?;
            out.push((lon, lat));
        }
        _ => {
            for item in items {
                collect_vertices(item, out)?;
            }
        }
    }
    Ok(())
}
