use geo::{Coord, MapCoords, Polygon};
use std::f64::consts::PI;

// Constants for Web Mercator (EPSG:3857)
const EARTH_RADIUS: f64 = 6378137.0;
const HALF_SIZE: f64 = PI * EARTH_RADIUS;

/// EPSG:4326 lon/lat degrees to EPSG:3857 meters.
/// Latitudes near the poles are clamped to the edge of the projected square.
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> Coord<f64> {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    Coord {
        x,
        y: y.clamp(-HALF_SIZE, HALF_SIZE),
    }
}

pub fn project_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    polygon.map_coords(|c| lon_lat_to_mercator(c.x, c.y))
}

/// [min_x, min_y, max_x, max_y] of a square of `half_span` degrees around a center.
pub fn extent_around(center_lon: f64, center_lat: f64, half_span: f64) -> [f64; 4] {
    let min = lon_lat_to_mercator(center_lon - half_span, center_lat - half_span);
    let max = lon_lat_to_mercator(center_lon + half_span, center_lat + half_span);
    [min.x, min.y, max.x, max.y]
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn origin_stays_at_origin() {
        let c = lon_lat_to_mercator(0.0, 0.0);
        assert!(close(c.x, 0.0));
        assert!(close(c.y, 0.0));
    }

    #[test]
    fn antimeridian_hits_half_size() {
        let c = lon_lat_to_mercator(180.0, 0.0);
        assert!(close(c.x, 20037508.342789244));
    }

    #[test]
    fn known_city_coordinates() {
        // Dublin
        let c = lon_lat_to_mercator(-6.2603, 53.3498);
        assert!((c.x - -696893.41).abs() < 1.0, "x = {}", c.x);
        assert!((c.y - 7047965.39).abs() < 1.0, "y = {}", c.y);
    }

    #[test]
    fn poles_are_clamped() {
        let c = lon_lat_to_mercator(0.0, 90.0);
        assert!(c.y.is_finite());
        assert!(close(c.y, HALF_SIZE));
    }

    #[test]
    fn polygon_projection_maps_every_vertex() {
        let poly = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let projected = project_polygon(&poly);
        assert_eq!(projected.exterior().0.len(), poly.exterior().0.len());
        assert!(close(projected.exterior().0[1].x, 111319.4908));
    }

    #[test]
    fn extent_is_ordered() {
        let [min_x, min_y, max_x, max_y] = extent_around(10.0, 45.0, 0.02);
        assert!(min_x < max_x);
        assert!(min_y < max_y);
    }
}
