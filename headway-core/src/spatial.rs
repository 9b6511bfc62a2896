//! R-tree index over stop coordinates.
//!
//! Range queries use a local flat-earth approximation: a degree bounding box
//! is derived from the requested km radius at the query latitude, the tree is
//! probed with that rectangle, and candidates are then filtered by planar km
//! distance. Good within the few tens of km a walking radius ever spans;
//! haversine is reserved for reported itinerary distances.

use hashbrown::HashMap;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

/// Kilometers per degree of latitude on the spherical earth used here.
pub const KM_PER_DEG_LAT: f64 = 10000.0 / 90.0;

fn km_per_deg_lng(lat: f64) -> f64 {
    KM_PER_DEG_LAT * (lat * std::f64::consts::PI / 180.0).cos()
}

type IndexedPoint = GeomWithData<[f64; 2], String>;

/// A point within range of a query, with its planar distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub km: f64,
}

/// R-tree of points keyed by (longitude, latitude), carrying stop ids.
#[derive(Debug, Clone, Default)]
pub struct StopIndex {
    tree: RTree<IndexedPoint>,
}

impl StopIndex {
    /// Bulk-load an index from `(id, lat, lng)` triples.
    pub fn build(points: impl IntoIterator<Item = (String, f64, f64)>) -> Self {
        let entries = points
            .into_iter()
            .map(|(id, lat, lng)| IndexedPoint::new([lng, lat], id))
            .collect();
        StopIndex {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn insert(&mut self, id: String, lat: f64, lng: f64) {
        self.tree.insert(IndexedPoint::new([lng, lat], id));
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// All indexed points within `radius_km` of `(lat, lng)`, sorted by
    /// distance then id for deterministic iteration.
    pub fn search(&self, lat: f64, lng: f64, radius_km: f64) -> Vec<Neighbor> {
        if radius_km <= 0.0 || radius_km.is_nan() {
            return Vec::new();
        }
        // An unbounded radius still needs a finite envelope for the tree.
        let radius_km = radius_km.min(40_000.0);
        let d_lat = radius_km / KM_PER_DEG_LAT;
        let d_lng = radius_km / km_per_deg_lng(lat);
        let envelope =
            AABB::from_corners([lng - d_lng, lat - d_lat], [lng + d_lng, lat + d_lat]);

        let mut hits: Vec<Neighbor> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| {
                let [p_lng, p_lat] = *entry.geom();
                let dy = (p_lat - lat) * KM_PER_DEG_LAT;
                let dx = (p_lng - lng) * km_per_deg_lng(lat);
                let d2 = dx * dx + dy * dy;
                if d2 > radius_km * radius_km {
                    None
                } else {
                    Some(Neighbor {
                        id: entry.data.clone(),
                        km: d2.sqrt(),
                    })
                }
            })
            .collect();
        hits.sort_by(|a, b| a.km.total_cmp(&b.km).then_with(|| a.id.cmp(&b.id)));
        hits
    }

    /// For every point in `self`, all points of `other` within `radius_km`.
    /// Points with no neighbors are omitted from the result.
    pub fn intersect(&self, other: &StopIndex, radius_km: f64) -> HashMap<String, Vec<Neighbor>> {
        let entries: Vec<&IndexedPoint> = self.tree.iter().collect();
        let pairs: Vec<(String, Vec<Neighbor>)> = entries
            .par_iter()
            .filter_map(|entry| {
                let [lng, lat] = *entry.geom();
                let neighbors = other.search(lat, lng, radius_km);
                if neighbors.is_empty() {
                    None
                } else {
                    Some((entry.data.clone(), neighbors))
                }
            })
            .collect();
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> StopIndex {
        // ~0.9 km per 0.01 deg lng at this latitude, ~1.11 km per 0.01 deg lat.
        StopIndex::build([
            ("center".to_string(), 47.0, 8.0),
            ("east".to_string(), 47.0, 8.01),
            ("north".to_string(), 47.01, 8.0),
            ("far".to_string(), 47.5, 8.5),
        ])
    }

    #[test]
    fn search_respects_radius() {
        let idx = index();
        let hits = idx.search(47.0, 8.0, 1.0);
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["center", "east"]);

        let hits = idx.search(47.0, 8.0, 1.2);
        let ids: Vec<&str> = hits.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["center", "east", "north"]);
    }

    #[test]
    fn search_reports_planar_distance() {
        let idx = index();
        let hits = idx.search(47.0, 8.0, 1.0);
        assert_eq!(hits[0].km, 0.0);
        let east_km = 0.01 * KM_PER_DEG_LAT * (47.0_f64.to_radians()).cos();
        assert!((hits[1].km - east_km).abs() < 1e-9);
    }

    #[test]
    fn degenerate_radii() {
        let idx = index();
        assert!(idx.search(47.0, 8.0, 0.0).is_empty());
        assert_eq!(idx.search(47.0, 8.0, f64::INFINITY).len(), 4);
    }

    #[test]
    fn intersect_pairs_both_indices() {
        let idx = index();
        let pairs = idx.intersect(&idx, 1.0);
        assert_eq!(pairs["center"].len(), 2); // itself + east
        assert_eq!(pairs["east"].len(), 2);
        assert_eq!(pairs["far"].len(), 1); // itself only
    }

    #[test]
    fn clone_is_independent() {
        let idx = index();
        let mut copy = idx.clone();
        copy.insert("extra".to_string(), 47.0, 8.001);
        assert_eq!(idx.len(), 4);
        assert_eq!(copy.len(), 5);
    }
}
