use crate::models::GeoPoint;

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle (Haversine) distance between two points in kilometers
#[inline]
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_zero_for_same_point() {
        let casablanca = GeoPoint {
            lat: 33.5731,
            lon: -7.5898,
        };
        assert!(haversine_km(casablanca, casablanca) < 0.01);
    }

    #[test]
    fn test_haversine_casablanca_to_marrakech() {
        // Casablanca to Marrakech is roughly 195 km as the crow flies
        let casablanca = GeoPoint {
            lat: 33.5731,
            lon: -7.5898,
        };
        let marrakech = GeoPoint {
            lat: 31.6295,
            lon: -7.9811,
        };

        let distance = haversine_km(casablanca, marrakech);
        assert!(
            (distance - 195.0).abs() < 25.0,
            "distance should be ~195km, got {}",
            distance
        );
    }
}
