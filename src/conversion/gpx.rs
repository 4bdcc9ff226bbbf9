//! GPX adapter. GPX carries no distance, so the running distance is estimated
//! from consecutive positions; timestamps come from `<time>` when every point
//! has one and are synthesized otherwise.

use serde::Deserialize;

use crate::conversion::epoch::{parse_timestamp, to_fit_seconds};
use crate::conversion::geo::{LatLon, cumulative_distances, degrees_to_semicircles};
use crate::conversion::types::{ConversionError, ConversionOptions, ParsedTrack, TrackPoint};
use crate::conversion::xml;

/// Parse a GPX document into a track with no laps.
pub fn parse_gpx(document: &str, options: &ConversionOptions) -> Result<ParsedTrack, ConversionError> {
    let gpx: Gpx = xml::deserialize(document)?;

    let name = gpx
        .tracks
        .iter()
        .find_map(|track| non_empty(track.name.as_deref()))
        .or_else(|| {
            gpx.metadata
                .as_ref()
                .and_then(|metadata| non_empty(metadata.name.as_deref()))
        })
        .ok_or_else(|| ConversionError::malformed("GPX track has no name"))?;

    let raw_points: Vec<&TrackPointXml> = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points)
        .collect();

    let positions = raw_points
        .iter()
        .enumerate()
        .map(|(index, point)| point_position(index, point))
        .collect::<Result<Vec<_>, _>>()?;

    let timestamps = point_timestamps(&raw_points, options.gpx_point_spacing)?;
    let distances = cumulative_distances(&positions);

    let points = positions
        .iter()
        .zip(timestamps)
        .zip(distances)
        .map(|((position, timestamp), cumulative_distance)| TrackPoint {
            timestamp,
            latitude: degrees_to_semicircles(position.lat),
            longitude: degrees_to_semicircles(position.lon),
            cumulative_distance,
        })
        .collect();

    Ok(ParsedTrack {
        name,
        points,
        partial_laps: Vec::new(),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_owned)
}

fn point_position(index: usize, point: &TrackPointXml) -> Result<LatLon, ConversionError> {
    let (Some(lat), Some(lon)) = (point.lat, point.lon) else {
        return Err(ConversionError::malformed(format!(
            "trkpt #{index} is missing its lat/lon attributes"
        )));
    };
    let position = LatLon::new(lat, lon);
    if !position.is_valid() {
        return Err(ConversionError::malformed(format!(
            "trkpt #{index} has out-of-range coordinates ({lat}, {lon})"
        )));
    }
    Ok(position)
}

fn point_timestamps(points: &[&TrackPointXml], spacing: u32) -> Result<Vec<u32>, ConversionError> {
    let all_timed = !points.is_empty() && points.iter().all(|point| point.time.is_some());

    if !all_timed {
        return (0..points.len())
            .map(|index| {
                u32::try_from(index)
                    .ok()
                    .and_then(|index| index.checked_mul(spacing))
                    .ok_or_else(|| {
                        ConversionError::malformed("synthetic timestamps overflow the FIT range")
                    })
            })
            .collect();
    }

    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let raw = point.time.as_deref().unwrap_or_default();
            parse_timestamp(raw)
                .and_then(to_fit_seconds)
                .ok_or_else(|| {
                    ConversionError::malformed(format!(
                        "trkpt #{index} has an unusable time {raw:?}"
                    ))
                })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct Gpx {
    #[serde(rename = "metadata")]
    metadata: Option<Metadata>,
    #[serde(rename = "trk", default)]
    tracks: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    #[serde(rename = "name")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Track {
    #[serde(rename = "name")]
    name: Option<String>,
    #[serde(rename = "trkseg", default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(rename = "trkpt", default)]
    points: Vec<TrackPointXml>,
}

#[derive(Debug, Deserialize)]
struct TrackPointXml {
    #[serde(rename = "@lat")]
    lat: Option<f64>,
    #[serde(rename = "@lon")]
    lon: Option<f64>,
    #[serde(rename = "time")]
    time: Option<String>,
}
