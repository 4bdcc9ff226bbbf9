use axum::{body::Body, http::Request, http::StatusCode, http::header};
use coursefit::{FIT_CONTENT_TYPE, build_app};
use http_body_util::BodyExt;
use tower::ServiceExt;

const BOUNDARY: &str = "coursefit-boundary";

fn multipart_request(parts: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (name, content) in parts {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}.dat\"\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method("POST")
        .uri("/convert")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

const GPX: &str = r#"<gpx><trk><name>Loop</name><trkseg>
<trkpt lat="0" lon="0"/><trkpt lat="0.001" lon="0.001"/>
</trkseg></trk></gpx>"#;

#[tokio::test]
async fn landing_page_responds() {
    let app = build_app();
    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("CourseFit"));
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let app = build_app();
    let req = Request::builder()
        .method("POST")
        .uri("/convert")
        .header("content-type", "multipart/form-data; boundary=--boundary")
        .body(Body::from("----boundary--"))
        .unwrap();

    let response = app.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn gpx_upload_returns_fit_download() {
    let app = build_app();
    let response = app.oneshot(multipart_request(&[("file", GPX)])).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        FIT_CONTENT_TYPE
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap(),
        "attachment; filename=\"Loop.fit\""
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(body[0], 14);
    assert_eq!(&body[8..12], b".FIT");
}

#[tokio::test]
async fn unsupported_upload_is_415() {
    let app = build_app();
    let response = app
        .oneshot(multipart_request(&[("file", "<kml/>")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("Unrecognized root tag: kml"));
}

#[tokio::test]
async fn malformed_upload_is_bad_request() {
    let app = build_app();
    let response = app
        .oneshot(multipart_request(&[("file", "<gpx><trk><trkseg/></trk></gpx>")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_spacing_is_rejected() {
    let app = build_app();
    let response = app
        .oneshot(multipart_request(&[("gpx_spacing", "soon"), ("file", GPX)]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
