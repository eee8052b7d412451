/*!
 * Tests for the HTTP upload endpoint
 */

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

use rentura::aggregation::prompts::ANSWERS_HEADING;
use rentura::app_config::ServerConfig;
use rentura::pipeline::AnalysisPipeline;
use rentura::providers::mock::MockOracle;
use rentura::server::{self, NOT_A_PDF_MESSAGE, TOO_LARGE_MESSAGE};

use crate::common;

const BOUNDARY: &str = "rentura-test-boundary";

fn app(oracle: MockOracle) -> Result<(Router, tempfile::TempDir)> {
    app_with_server_config(oracle, ServerConfig::default())
}

fn app_with_server_config(oracle: MockOracle, server_config: ServerConfig) -> Result<(Router, tempfile::TempDir)> {
    let dir = common::create_temp_dir()?;
    let questions = common::create_question_dir(dir.path(), &[("01_kaution", "Ist die Kaution zulässig?")])?;
    let mut config = common::test_config(&questions);
    config.acquisition.short_text_threshold = 10;

    let pipeline = AnalysisPipeline::with_oracle(&config, Arc::new(oracle))?;
    Ok((server::router(Arc::new(pipeline), &server_config), dir))
}

fn multipart_upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/analyse")
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .expect("request should build")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_shouldReturnOk() -> Result<()> {
    let (app, _dir) = app(MockOracle::working())?;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_upload_withNonPdfName_shouldReturn400WithoutCallingOracle() -> Result<()> {
    let oracle = MockOracle::working();
    let (app, _dir) = app(oracle.clone())?;

    let response = app.oneshot(multipart_upload("file", "vertrag.docx", b"PK\x03\x04")).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["detail"], NOT_A_PDF_MESSAGE);
    assert_eq!(oracle.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_upload_withPdf_shouldReturnChecksAndSummary() -> Result<()> {
    let (app, _dir) = app(MockOracle::working())?;
    let pdf = common::make_text_pdf(&["Paragraph 2 Kaution: vier Nettokaltmieten als Sicherheit."]);

    let response = app.oneshot(multipart_upload("file", "Mietvertrag.PDF", &pdf)).await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["checks"][0]["prompt"], "01_kaution");
    assert_eq!(json["checks"][0]["answer"], "Antwort zu: Ist die Kaution zulässig?");
    assert!(json["summary"].as_str().unwrap_or_default().contains("/10"));
    Ok(())
}

#[tokio::test]
async fn test_upload_withoutFileField_shouldReturn400() -> Result<()> {
    let (app, _dir) = app(MockOracle::working())?;

    let response = app.oneshot(multipart_upload("attachment", "vertrag.pdf", b"%PDF")).await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_upload_withUnreadablePdf_shouldReturn422() -> Result<()> {
    let (app, _dir) = app(MockOracle::working())?;

    let response = app.oneshot(multipart_upload("file", "vertrag.pdf", b"not a pdf at all")).await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"], "acquisition_error");
    Ok(())
}

#[tokio::test]
async fn test_upload_withFailingSynthesis_shouldReturn502() -> Result<()> {
    let (app, _dir) = app(MockOracle::failing_for(ANSWERS_HEADING))?;
    let pdf = common::make_text_pdf(&["Paragraph 2 Kaution: vier Nettokaltmieten als Sicherheit."]);

    let response = app.oneshot(multipart_upload("file", "vertrag.pdf", &pdf)).await?;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "aggregation_error");
    Ok(())
}

#[tokio::test]
async fn test_upload_overSizeLimit_shouldReturn413WithFixedMessage() -> Result<()> {
    let oracle = MockOracle::working();
    let server_config = ServerConfig {
        max_upload_bytes: 4 * 1024,
        ..ServerConfig::default()
    };
    let (app, _dir) = app_with_server_config(oracle.clone(), server_config)?;
    let oversized = vec![b'x'; 64 * 1024];

    let response = app.oneshot(multipart_upload("file", "vertrag.pdf", &oversized)).await?;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = json_body(response).await;
    assert_eq!(body["error"], "payload_too_large");
    assert_eq!(body["detail"], TOO_LARGE_MESSAGE);
    assert_eq!(oracle.call_count(), 0);
    Ok(())
}
