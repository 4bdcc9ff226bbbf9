//! TCX course adapter.

use serde::Deserialize;

use crate::conversion::epoch::{parse_timestamp, to_fit_seconds};
use crate::conversion::geo::{LatLon, cumulative_distances, degrees_to_semicircles, meters_to_cm};
use crate::conversion::types::{ConversionError, ParsedTrack, PartialLap, TrackPoint};
use crate::conversion::xml;

/// Parse the first `<Course>` of a TCX document.
///
/// Trackpoints must carry `Time` and `Position`. `DistanceMeters` must be on
/// every trackpoint or on none; in the latter case distance is estimated from
/// the positions. Laps without a `BeginPosition` cannot be matched and are
/// skipped.
pub fn parse_tcx(document: &str) -> Result<ParsedTrack, ConversionError> {
    let tcx: TrainingCenterDatabase = xml::deserialize(document)?;

    let course = tcx
        .courses
        .and_then(|courses| courses.course.into_iter().next())
        .ok_or_else(|| ConversionError::malformed("TCX document has no Courses/Course"))?;

    let name = course
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ConversionError::malformed("TCX course has no Name"))?;

    let trackpoints: Vec<&Trackpoint> = course
        .tracks
        .iter()
        .flat_map(|track| &track.trackpoints)
        .collect();

    let points = build_points(&trackpoints)?;

    let partial_laps = course
        .laps
        .iter()
        .enumerate()
        .filter_map(|(index, lap)| build_lap(index, lap).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedTrack {
        name,
        points,
        partial_laps,
    })
}

fn build_points(trackpoints: &[&Trackpoint]) -> Result<Vec<TrackPoint>, ConversionError> {
    let mut timestamps = Vec::with_capacity(trackpoints.len());
    let mut positions = Vec::with_capacity(trackpoints.len());

    for (index, trackpoint) in trackpoints.iter().enumerate() {
        let raw_time = trackpoint.time.as_deref().ok_or_else(|| {
            ConversionError::malformed(format!("Trackpoint #{index} has no Time"))
        })?;
        let timestamp = parse_timestamp(raw_time)
            .and_then(to_fit_seconds)
            .ok_or_else(|| {
                ConversionError::malformed(format!(
                    "Trackpoint #{index} has an unusable Time {raw_time:?}"
                ))
            })?;

        let position = trackpoint
            .position
            .as_ref()
            .ok_or_else(|| ConversionError::malformed(format!("Trackpoint #{index} has no Position")))
            .and_then(|position| position.to_lat_lon(&format!("Trackpoint #{index}")))?;

        timestamps.push(timestamp);
        positions.push(position);
    }

    let distances = trackpoint_distances(trackpoints, &positions)?;

    Ok(positions
        .iter()
        .zip(timestamps)
        .zip(distances)
        .map(|((position, timestamp), cumulative_distance)| TrackPoint {
            timestamp,
            latitude: degrees_to_semicircles(position.lat),
            longitude: degrees_to_semicircles(position.lon),
            cumulative_distance,
        })
        .collect())
}

fn trackpoint_distances(
    trackpoints: &[&Trackpoint],
    positions: &[LatLon],
) -> Result<Vec<u32>, ConversionError> {
    if trackpoints.iter().all(|tp| tp.distance_meters.is_none()) {
        tracing::debug!("TCX course carries no distances, estimating from positions");
        return Ok(cumulative_distances(positions));
    }

    trackpoints
        .iter()
        .enumerate()
        .map(|(index, trackpoint)| {
            let meters = trackpoint.distance_meters.ok_or_else(|| {
                ConversionError::malformed(format!("Trackpoint #{index} has no DistanceMeters"))
            })?;
            meters_to_cm(meters).ok_or_else(|| {
                ConversionError::malformed(format!(
                    "Trackpoint #{index} has an invalid DistanceMeters {meters}"
                ))
            })
        })
        .collect()
}

fn build_lap(index: usize, lap: &Lap) -> Result<Option<PartialLap>, ConversionError> {
    let Some(begin) = lap.begin_position.as_ref() else {
        tracing::warn!(lap = index, "TCX lap has no BeginPosition, skipping");
        return Ok(None);
    };
    let start = begin.to_lat_lon(&format!("Lap #{index} BeginPosition"))?;

    let total_distance = match lap.distance_meters {
        Some(meters) => meters_to_cm(meters).ok_or_else(|| {
            ConversionError::malformed(format!("Lap #{index} has an invalid DistanceMeters {meters}"))
        })?,
        None => 0,
    };

    Ok(Some(PartialLap {
        total_time: lap.total_time_seconds.unwrap_or(0.0),
        total_distance,
        start_latitude: degrees_to_semicircles(start.lat),
        start_longitude: degrees_to_semicircles(start.lon),
    }))
}

// TCX XML structures

#[derive(Debug, Deserialize)]
struct TrainingCenterDatabase {
    #[serde(rename = "Courses")]
    courses: Option<Courses>,
}

#[derive(Debug, Deserialize)]
struct Courses {
    #[serde(rename = "Course", default)]
    course: Vec<Course>,
}

#[derive(Debug, Deserialize)]
struct Course {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Lap", default)]
    laps: Vec<Lap>,
    #[serde(rename = "Track", default)]
    tracks: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct Lap {
    #[serde(rename = "TotalTimeSeconds")]
    total_time_seconds: Option<f64>,
    #[serde(rename = "DistanceMeters")]
    distance_meters: Option<f64>,
    #[serde(rename = "BeginPosition")]
    begin_position: Option<Position>,
}

#[derive(Debug, Deserialize)]
struct Track {
    #[serde(rename = "Trackpoint", default)]
    trackpoints: Vec<Trackpoint>,
}

#[derive(Debug, Deserialize)]
struct Trackpoint {
    #[serde(rename = "Time")]
    time: Option<String>,
    #[serde(rename = "Position")]
    position: Option<Position>,
    #[serde(rename = "DistanceMeters")]
    distance_meters: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Position {
    #[serde(rename = "LatitudeDegrees")]
    latitude_degrees: Option<f64>,
    #[serde(rename = "LongitudeDegrees")]
    longitude_degrees: Option<f64>,
}

impl Position {
    fn to_lat_lon(&self, context: &str) -> Result<LatLon, ConversionError> {
        let (Some(lat), Some(lon)) = (self.latitude_degrees, self.longitude_degrees) else {
            return Err(ConversionError::malformed(format!(
                "{context} is missing LatitudeDegrees/LongitudeDegrees"
            )));
        };
        let position = LatLon::new(lat, lon);
        if !position.is_valid() {
            return Err(ConversionError::malformed(format!(
                "{context} has out-of-range coordinates ({lat}, {lon})"
            )));
        }
        Ok(position)
    }
}
