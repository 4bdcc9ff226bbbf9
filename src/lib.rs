pub mod conversion;
pub mod templates;

use axum::{
    Router,
    extract::Multipart,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use conversion::{ConversionError, ConversionOptions, ConvertedFit, convert_bytes};
use templates::{render_conversion_error, render_landing_page};

pub const FIT_CONTENT_TYPE: &str = "application/vnd.ant.fit";

pub fn build_app() -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/convert", post(handle_convert))
}

async fn landing_page() -> Html<String> {
    Html(render_landing_page())
}

async fn handle_convert(mut multipart: Multipart) -> Response {
    let mut uploaded: Option<Vec<u8>> = None;
    let mut options = ConversionOptions::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("file") => match field.bytes().await {
                Ok(bytes) => {
                    uploaded = Some(bytes.to_vec());
                }
                Err(err) => {
                    return (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read uploaded file: {err}"),
                    )
                        .into_response();
                }
            },
            Some("gpx_spacing") => {
                if let Ok(value) = field.text().await {
                    match value.trim().parse::<u32>() {
                        Ok(spacing) if spacing > 0 => options.gpx_point_spacing = spacing,
                        _ => {
                            return (
                                StatusCode::BAD_REQUEST,
                                format!("Invalid gpx_spacing: {value:?}"),
                            )
                                .into_response();
                        }
                    }
                }
            }
            _ => {}
        }
    }

    let file_bytes = match uploaded {
        Some(bytes) => bytes,
        None => return (StatusCode::BAD_REQUEST, "No file provided").into_response(),
    };

    match convert_bytes(&file_bytes, &options) {
        Ok(converted) => fit_download(converted),
        Err(err) => conversion_error_response(err),
    }
}

fn fit_download(converted: ConvertedFit) -> Response {
    tracing::info!(
        course = %converted.course.name,
        bytes = converted.bytes.len(),
        "converted upload"
    );
    let disposition = format!(
        "attachment; filename=\"{}\"",
        fit_file_name(&converted.course.name)
    );
    (
        [
            (header::CONTENT_TYPE, FIT_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        converted.bytes,
    )
        .into_response()
}

fn conversion_error_response(error: ConversionError) -> Response {
    let status = match &error {
        ConversionError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ConversionError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ConversionError::MalformedInput(_) | ConversionError::Encoding(_) => {
            StatusCode::BAD_REQUEST
        }
    };
    tracing::debug!(%error, "rejected upload");
    (status, render_conversion_error(&error.to_string())).into_response()
}

/// Download name derived from the course name, restricted to filename-safe characters.
pub fn fit_file_name(course_name: &str) -> String {
    let stem: String = course_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "course.fit".to_string()
    } else {
        format!("{stem}.fit")
    }
}
