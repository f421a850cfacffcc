use super::*;
use crate::utils::test_utils::{serve_once, CannedResponse};
use base64::engine::general_purpose::STANDARD;

const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

fn gateway_for(base: &str) -> HttpMediaGateway {
    HttpMediaGateway::new(
        reqwest::Client::new(),
        format!("{base}/api/images"),
        format!("{base}/api/audio"),
        None,
    )
}

#[test]
fn decodes_json_object_with_image_field() {
    let body = format!(r#"{{"image":"{}"}}"#, STANDARD.encode(JPEG_BYTES));
    let payload = decode_image_body(body.as_bytes(), Some("application/json")).unwrap();
    assert_eq!(payload.bytes(), JPEG_BYTES);
    assert_eq!(payload.mime(), "image/jpeg");
}

#[test]
fn decodes_bare_json_string_and_data_url() {
    let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let body = format!(r#""data:image/png;base64,{}""#, STANDARD.encode(png));
    let payload = decode_image_body(body.as_bytes(), None).unwrap();
    assert_eq!(payload.bytes(), png);
    assert_eq!(payload.mime(), "image/png");
}

#[test]
fn decodes_openai_style_data_array() {
    let body = format!(r#"{{"data":[{{"b64_json":"{}"}}]}}"#, STANDARD.encode(JPEG_BYTES));
    let payload = decode_image_body(body.as_bytes(), Some("application/json")).unwrap();
    assert_eq!(payload.bytes(), JPEG_BYTES);
}

#[test]
fn decodes_plain_base64_text_with_line_breaks() {
    let encoded = STANDARD.encode(JPEG_BYTES);
    let (head, tail) = encoded.split_at(4);
    let body = format!("{head}\n{tail}\n");
    let payload = decode_image_body(body.as_bytes(), Some("text/plain")).unwrap();
    assert_eq!(payload.bytes(), JPEG_BYTES);
}

#[test]
fn unknown_bytes_fall_back_to_jpeg_mime() {
    let body = STANDARD.encode(b"not really an image");
    let payload = decode_image_body(body.as_bytes(), None).unwrap();
    assert_eq!(payload.mime(), "image/jpeg");
}

#[test]
fn image_decode_failures_are_reported() {
    let missing_field = decode_image_body(br#"{"status":"ok"}"#, Some("application/json"));
    assert!(matches!(missing_field, Err(GatewayError::Decode(_))));

    let bad_base64 = decode_image_body(b"!!!not base64!!!", None);
    assert!(matches!(bad_base64, Err(GatewayError::Decode(_))));

    let empty = decode_image_body(br#"{"image":""}"#, Some("application/json"));
    assert!(matches!(empty, Err(GatewayError::Decode(_))));

    let broken_json = decode_image_body(b"{\"image\":", Some("application/json"));
    assert!(matches!(broken_json, Err(GatewayError::Decode(_))));
}

#[test]
fn audio_uses_content_type_or_default() {
    let payload = decode_audio_body(vec![1, 2, 3], Some("audio/wav; codecs=1")).unwrap();
    assert_eq!(payload.mime(), "audio/wav");

    let payload = decode_audio_body(vec![1, 2, 3], Some("application/octet-stream")).unwrap();
    assert_eq!(payload.mime(), "audio/mpeg");
}

#[test]
fn audio_rejects_empty_and_json_bodies() {
    assert!(matches!(
        decode_audio_body(Vec::new(), Some("audio/mpeg")),
        Err(GatewayError::Decode(_))
    ));
    assert!(matches!(
        decode_audio_body(br#"{"error":"x"}"#.to_vec(), Some("application/json")),
        Err(GatewayError::Decode(_))
    ));
}

#[test]
fn endpoint_error_display_summarizes_body() {
    let error = GatewayError::Endpoint {
        status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
        body: r#"{"error":{"message":"upstream exploded"}}"#.to_string(),
    };
    assert_eq!(
        error.to_string(),
        "endpoint returned 500 Internal Server Error: upstream exploded"
    );
}

#[tokio::test]
async fn image_request_posts_message_and_decodes_response() {
    let body = format!(r#"{{"image":"{}"}}"#, STANDARD.encode(JPEG_BYTES));
    let (base, request) = serve_once(CannedResponse::ok("application/json", body.into_bytes())).await;

    let payload = gateway_for(&base)
        .generate_image("Pancakes: whisk and fry.")
        .await
        .expect("image generated");
    assert_eq!(payload.bytes(), JPEG_BYTES);

    let request = request.await.expect("server task");
    assert!(request.head.starts_with("POST /api/images "));
    let sent: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(sent["message"], "Pancakes: whisk and fry.");
}

#[tokio::test]
async fn audio_request_returns_raw_bytes() {
    let audio = vec![0x49, 0x44, 0x33, 0x04, 0x00];
    let (base, request) = serve_once(CannedResponse::ok("audio/mpeg", audio.clone())).await;

    let payload = gateway_for(&base)
        .generate(MediaKind::Audio, "Narrate this")
        .await
        .expect("audio generated");
    assert_eq!(payload.bytes(), audio.as_slice());
    assert_eq!(payload.mime(), "audio/mpeg");

    let request = request.await.expect("server task");
    assert!(request.head.starts_with("POST /api/audio "));
}

#[tokio::test]
async fn server_error_status_is_an_endpoint_failure() {
    let (base, _request) = serve_once(CannedResponse::status(
        500,
        "Internal Server Error",
        "application/json",
        br#"{"error":"boom"}"#.to_vec(),
    ))
    .await;

    let err = gateway_for(&base)
        .generate_image("anything")
        .await
        .expect_err("500 must fail");
    match err {
        GatewayError::Endpoint { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected endpoint failure, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = gateway_for(&format!("http://{addr}"))
        .generate_audio("anything")
        .await
        .expect_err("closed port must fail");
    assert!(matches!(err, GatewayError::Transport(_)));
}
