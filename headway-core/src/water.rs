//! Impassable-water barrier for walking edges.
//!
//! Built from river-centerline polylines; a candidate walking edge is
//! rejected when its straight segment crosses any of them.

use std::path::Path;

use geo::Coord;
use geojson::{GeoJson, Value};
use log::info;

use crate::error::Error;
use crate::geometry::segments_intersect;

#[derive(Debug, Clone, Default)]
pub struct WaterFilter {
    segments: Vec<(Coord<f64>, Coord<f64>)>,
}

impl WaterFilter {
    /// Reads a GeoJSON `FeatureCollection` of `LineString` features. Any
    /// other geometry kind in the file is a fatal configuration error.
    pub fn from_geojson_str(raw: &str) -> Result<Self, Error> {
        let geojson: GeoJson = raw
            .parse()
            .map_err(|e| Error::InvalidWaterGeometry(format!("unparseable GeoJSON: {e}")))?;
        let GeoJson::FeatureCollection(collection) = geojson else {
            return Err(Error::InvalidWaterGeometry(
                "expected a FeatureCollection".to_string(),
            ));
        };

        let mut polylines = Vec::with_capacity(collection.features.len());
        for feature in collection.features {
            let geometry = feature.geometry.ok_or_else(|| {
                Error::InvalidWaterGeometry("feature without geometry".to_string())
            })?;
            match geometry.value {
                Value::LineString(positions) => {
                    let line: Vec<Coord<f64>> = positions
                        .iter()
                        .map(|pos| Coord {
                            x: pos[0],
                            y: pos[1],
                        })
                        .collect();
                    polylines.push(line);
                }
                other => {
                    return Err(Error::InvalidWaterGeometry(format!(
                        "expected LineString features, found {}",
                        other.type_name()
                    )));
                }
            }
        }
        Ok(Self::from_polylines(polylines))
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        let filter = Self::from_geojson_str(&raw)?;
        info!(
            "Loaded water barrier from {}: {} segments",
            path.display(),
            filter.segments.len()
        );
        Ok(filter)
    }

    /// Flattens polylines of `(lng, lat)` coordinates into a segment set.
    pub fn from_polylines(polylines: Vec<Vec<Coord<f64>>>) -> Self {
        let segments = polylines
            .iter()
            .flat_map(|line| line.windows(2).map(|w| (w[0], w[1])))
            .collect();
        WaterFilter { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True iff the straight segment between the two coordinates crosses a
    /// water centerline.
    pub fn crosses(&self, lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> bool {
        let a = Coord { x: lng1, y: lat1 };
        let b = Coord { x: lng2, y: lat2 };
        self.segments
            .iter()
            .any(|&(w1, w2)| segments_intersect(a, b, w1, w2))
    }
}
