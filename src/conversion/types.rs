use thiserror::Error;

/// Default spacing (seconds) between synthetic GPX timestamps.
pub const GPX_POINT_SPACING_SECS: u32 = 100;

/// A single timestamped position on the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackPoint {
    /// Seconds since the FIT epoch (1989-12-31T00:00:00Z).
    pub timestamp: u32,
    /// Latitude in semicircles.
    pub latitude: i32,
    /// Longitude in semicircles.
    pub longitude: i32,
    /// Cumulative distance in centimeters.
    pub cumulative_distance: u32,
}

/// Lap boundary as read from the source document, before it is tied to a trackpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartialLap {
    /// Informational only, never encoded.
    pub total_time: f64,
    /// Centimeters.
    pub total_distance: u32,
    pub start_latitude: i32,
    pub start_longitude: i32,
}

/// Lap resolved against the trackpoint stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLap {
    /// Always 0.
    pub start_timestamp: u32,
    /// Timestamp of the first trackpoint at the lap's start coordinate.
    pub timestamp: u32,
}

impl ResolvedLap {
    pub fn at(timestamp: u32) -> Self {
        Self {
            start_timestamp: 0,
            timestamp,
        }
    }
}

/// Normalized course handed from an input adapter to the encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    /// Course name without the NUL terminator; the encoder appends it.
    pub name: String,
    pub points: Vec<TrackPoint>,
    pub laps: Vec<ResolvedLap>,
}

/// Output of an adapter: the course plus any lap boundaries still to be matched.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTrack {
    pub name: String,
    pub points: Vec<TrackPoint>,
    pub partial_laps: Vec<PartialLap>,
}

/// Source formats the converter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Tcx,
    Gpx,
}

/// Knobs that adjust how a document is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Seconds between synthetic timestamps for GPX points without `<time>`.
    pub gpx_point_spacing: u32,
    /// `file_id.time_created` in FIT epoch seconds. `None` uses the current time.
    pub time_created: Option<u32>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            gpx_point_spacing: GPX_POINT_SPACING_SECS,
            time_created: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unrecognized root tag: {0}")]
    UnsupportedFormat(String),

    #[error("Cannot encode course: {0}")]
    Encoding(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ConversionError::MalformedInput(msg.into())
    }
}
