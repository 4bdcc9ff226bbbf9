pub mod encode;
pub mod epoch;
pub mod geo;
pub mod gpx;
pub mod laps;
pub mod tcx;
pub mod types;
pub mod xml;

use std::io::Write;
use std::path::Path;

use encode::encode_course;
use laps::resolve_laps;

pub use types::{
    ConversionError, ConversionOptions, Course, ParsedTrack, PartialLap, ResolvedLap,
    SourceFormat, TrackPoint,
};

/// Result of converting one document.
#[derive(Debug, Clone)]
pub struct ConvertedFit {
    pub format: SourceFormat,
    pub course: Course,
    pub bytes: Vec<u8>,
}

/// Turn a TCX or GPX document into a FIT course file.
///
/// The stages are:
/// 1. [`xml::detect_format`] picks the adapter from the root element.
/// 2. [`tcx::parse_tcx`] or [`gpx::parse_gpx`] normalize the document into a
///    [`ParsedTrack`].
/// 3. [`build_course`] checks the point ordering and resolves laps against
///    the trackpoints.
/// 4. [`encode::encode_course`] serializes the course.
pub fn convert_document(
    document: &str,
    options: &ConversionOptions,
) -> Result<ConvertedFit, ConversionError> {
    let document = document.strip_prefix('\u{feff}').unwrap_or(document);

    let format = xml::detect_format(document)?;
    let track = match format {
        SourceFormat::Tcx => tcx::parse_tcx(document)?,
        SourceFormat::Gpx => gpx::parse_gpx(document, options)?,
    };
    tracing::debug!(
        ?format,
        points = track.points.len(),
        partial_laps = track.partial_laps.len(),
        "parsed track"
    );

    let course = build_course(track)?;
    let time_created = options.time_created.unwrap_or_else(epoch::now_fit_seconds);
    let bytes = encode_course(&course, time_created)?;

    Ok(ConvertedFit {
        format,
        course,
        bytes,
    })
}

/// Byte-oriented entry point for uploads; the document must be UTF-8.
pub fn convert_bytes(
    bytes: &[u8],
    options: &ConversionOptions,
) -> Result<ConvertedFit, ConversionError> {
    let document = std::str::from_utf8(bytes)
        .map_err(|err| ConversionError::malformed(format!("document is not UTF-8: {err}")))?;
    convert_document(document, options)
}

/// Validate a parsed track and match its laps.
pub fn build_course(track: ParsedTrack) -> Result<Course, ConversionError> {
    if track.points.is_empty() {
        return Err(ConversionError::malformed("track has no trackpoints"));
    }

    for (index, pair) in track.points.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(ConversionError::malformed(format!(
                "trackpoint #{} is earlier than the one before it",
                index + 1
            )));
        }
        if pair[1].cumulative_distance < pair[0].cumulative_distance {
            return Err(ConversionError::malformed(format!(
                "trackpoint #{} has a smaller distance than the one before it",
                index + 1
            )));
        }
    }

    let laps = resolve_laps(&track.partial_laps, &track.points);
    if laps.len() < track.partial_laps.len() {
        tracing::warn!(
            dropped = track.partial_laps.len() - laps.len(),
            "some laps could not be matched to a trackpoint"
        );
    }

    Ok(Course {
        name: track.name,
        points: track.points,
        laps,
    })
}

/// Replace `path` with `bytes` via a temporary file in the same directory, so
/// readers never see a half-written file.
pub fn write_fit_file(path: &Path, bytes: &[u8]) -> Result<(), ConversionError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = tempfile::NamedTempFile::new_in(directory)?;
    staged.write_all(bytes)?;
    staged.as_file().sync_all()?;
    staged.persist(path).map_err(|err| ConversionError::Io(err.error))?;
    Ok(())
}

/// Read `input`, convert it and write the FIT file to `output`.
///
/// Nothing is written unless the conversion succeeds.
pub fn convert_file(
    input: &Path,
    output: &Path,
    options: &ConversionOptions,
) -> Result<ConvertedFit, ConversionError> {
    let bytes = std::fs::read(input)?;
    let converted = convert_bytes(&bytes, options)?;
    write_fit_file(output, &converted.bytes)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        course = %converted.course.name,
        points = converted.course.points.len(),
        laps = converted.course.laps.len(),
        bytes = converted.bytes.len(),
        "wrote FIT course"
    );
    Ok(converted)
}
