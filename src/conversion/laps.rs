use crate::conversion::types::{PartialLap, ResolvedLap, TrackPoint};

/// Tie each lap to the timestamp of the first trackpoint sitting exactly on
/// its start coordinate.
///
/// Comparison is on the quantized semicircle values. Laps without an exact
/// match are dropped rather than snapped to the nearest point.
pub fn resolve_laps(partial_laps: &[PartialLap], points: &[TrackPoint]) -> Vec<ResolvedLap> {
    partial_laps
        .iter()
        .filter_map(|lap| {
            let matched = points.iter().find(|point| {
                point.latitude == lap.start_latitude && point.longitude == lap.start_longitude
            });

            if matched.is_none() {
                tracing::warn!(
                    start_latitude = lap.start_latitude,
                    start_longitude = lap.start_longitude,
                    "lap start matches no trackpoint, dropping lap"
                );
            }

            matched.map(|point| ResolvedLap::at(point.timestamp))
        })
        .collect()
}
