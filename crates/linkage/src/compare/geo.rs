use tracing::debug;

use crate::resources::GeocodeTable;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two `(latitude, longitude)` points in degrees.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let h = ((lat2 - lat1) / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub(super) fn distance(table: &GeocodeTable, x: &str, y: &str, max_distance: f64) -> Option<f64> {
    let lookup = |key: &str| {
        let found = table.get(key);
        if found.is_none() {
            debug!(key, "no geocode entry, treated as missing");
        }
        found
    };
    let (px, py) = (lookup(x)?, lookup(y)?);
    Some(haversine_km(px, py) / max_distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> GeocodeTable {
        let mut t = GeocodeTable::new("postcodes");
        t.insert("2600", -35.30, 149.13);
        t.insert("2000", -33.87, 151.21);
        t
    }

    #[test]
    fn canberra_to_sydney() {
        let d = haversine_km((-35.30, 149.13), (-33.87, 151.21));
        assert!((d - 246.0).abs() < 5.0, "got {d}");
        assert_eq!(haversine_km((10.0, 20.0), (10.0, 20.0)), 0.0);
    }

    #[test]
    fn table_lookups() {
        let t = table();
        assert_eq!(distance(&t, "2600", "2600", 50.0), Some(0.0));
        let f = distance(&t, "2600", "2000", 500.0).unwrap();
        assert!(f > 0.4 && f < 0.6);
        assert_eq!(distance(&t, "2600", "9999", 50.0), None);
    }
}
