//! Unit conversions and the planar distance estimate used for tracks that
//! carry no distance of their own.

/// Mean earth radius in centimeters.
pub const EARTH_RADIUS_CM: f64 = 6.3675e8;

const SEMICIRCLES_PER_DEGREE: f64 = 2_147_483_648.0 / 180.0;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// `round(degrees * 2^31 / 180)`, saturating at the `i32` bounds (+180° would
/// otherwise overflow by one).
pub fn degrees_to_semicircles(degrees: f64) -> i32 {
    let scaled = (degrees * SEMICIRCLES_PER_DEGREE).round();
    scaled.clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
    semicircles as f64 / SEMICIRCLES_PER_DEGREE
}

/// Meters to whole centimeters, truncating toward zero. Negative or
/// non-finite input has no centimeter value.
pub fn meters_to_cm(meters: f64) -> Option<u32> {
    if !meters.is_finite() || meters < 0.0 {
        return None;
    }
    let cm = (meters * 100.0).trunc();
    (cm <= u32::MAX as f64).then_some(cm as u32)
}

/// Equirectangular distance between two nearby points, in centimeters.
///
/// Only meaningful for consecutive, closely spaced samples; the error grows
/// quickly with separation and near the poles.
pub fn distance_cm(from: LatLon, to: LatLon) -> u32 {
    let (lat1, lon1) = (from.lat.to_radians(), from.lon.to_radians());
    let (lat2, lon2) = (to.lat.to_radians(), to.lon.to_radians());

    let dx = (lon2 - lon1) * ((lat1 + lat2) / 2.0).cos();
    let dy = lat2 - lat1;

    // Float-to-int `as` saturates, so an absurd span cannot wrap.
    (dx.hypot(dy) * EARTH_RADIUS_CM) as u32
}

/// Running distance for a sequence of positions; the first point is at 0.
pub fn cumulative_distances(positions: &[LatLon]) -> Vec<u32> {
    let mut total: u32 = 0;
    let mut previous: Option<LatLon> = None;

    positions
        .iter()
        .map(|&position| {
            if let Some(last) = previous {
                total = total.saturating_add(distance_cm(last, position));
            }
            previous = Some(position);
            total
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEMICIRCLE_TOLERANCE: f64 = 180.0 / 2_147_483_648.0 + 1e-9;

    #[test]
    fn semicircle_round_trip_stays_within_one_unit() {
        let mut degrees = -180.0;
        while degrees <= 180.0 {
            let back = semicircles_to_degrees(degrees_to_semicircles(degrees));
            assert!(
                (back - degrees).abs() <= SEMICIRCLE_TOLERANCE,
                "{degrees} came back as {back}"
            );
            degrees += 0.37;
        }

        for degrees in [-180.0, -90.0, 0.0, 45.123456789, 90.0, 179.999999, 180.0] {
            let back = semicircles_to_degrees(degrees_to_semicircles(degrees));
            assert!((back - degrees).abs() <= SEMICIRCLE_TOLERANCE);
        }
    }

    #[test]
    fn semicircles_saturate_at_positive_half_turn() {
        assert_eq!(degrees_to_semicircles(180.0), i32::MAX);
        assert_eq!(degrees_to_semicircles(-180.0), i32::MIN);
        assert_eq!(degrees_to_semicircles(0.0), 0);
        assert_eq!(degrees_to_semicircles(90.0), 1 << 30);
    }

    #[test]
    fn semicircles_round_to_nearest() {
        // 0.001° is 11930.464... semicircles
        assert_eq!(degrees_to_semicircles(0.001), 11930);
        assert_eq!(degrees_to_semicircles(-0.001), -11930);
        // 0.002° is 23860.929... semicircles
        assert_eq!(degrees_to_semicircles(0.002), 23861);
    }

    #[test]
    fn meters_truncate_to_centimeters() {
        assert_eq!(meters_to_cm(12.349), Some(1234));
        assert_eq!(meters_to_cm(0.0), Some(0));
        assert_eq!(meters_to_cm(-1.0), None);
        assert_eq!(meters_to_cm(f64::NAN), None);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_identity() {
        let a = LatLon::new(47.3769, 8.5417);
        let b = LatLon::new(47.3779, 8.5437);

        assert_eq!(distance_cm(a, b), distance_cm(b, a));
        assert_eq!(distance_cm(a, a), 0);
        assert_eq!(distance_cm(b, b), 0);
    }

    #[test]
    fn distance_matches_arc_length_along_equator() {
        // 0.001° of longitude on the equator: 6.3675e8 * 0.001 * pi / 180
        let d = distance_cm(LatLon::new(0.0, 0.0), LatLon::new(0.0, 0.001));
        assert_eq!(d, 11113);
    }

    #[test]
    fn cumulative_distance_starts_at_zero_and_never_decreases() {
        let positions = [
            LatLon::new(0.0, 0.0),
            LatLon::new(0.001, 0.001),
            LatLon::new(0.002, 0.0),
            LatLon::new(0.002, 0.0),
        ];
        let distances = cumulative_distances(&positions);

        assert_eq!(distances.len(), 4);
        assert_eq!(distances[0], 0);
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(distances[2], distances[3]);
        assert_eq!(
            distances[1],
            distance_cm(positions[0], positions[1])
        );
    }

    #[test]
    fn validity_covers_closed_ranges() {
        assert!(LatLon::new(90.0, 180.0).is_valid());
        assert!(LatLon::new(-90.0, -180.0).is_valid());
        assert!(!LatLon::new(90.1, 0.0).is_valid());
        assert!(!LatLon::new(0.0, -180.5).is_valid());
        assert!(!LatLon::new(f64::NAN, 0.0).is_valid());
    }
}
