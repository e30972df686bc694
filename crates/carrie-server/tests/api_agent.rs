mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::Engine;
use common::{delete, get, post_json, send, TestApp, VOICE};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header as header_is, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUDIO: &[u8] = b"ID3-fake-mp3";

async fn mount_tts(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/text-to-speech/{}", VOICE)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_check_returns_ok() {
    let server = MockServer::start().await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let (status, json) = send(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn agent_lifecycle_over_http() {
    let server = MockServer::start().await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let (status, deployed) = send(
        &router,
        post_json("/agent/deploy", json!({ "roomName": "lobby" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deployed["success"], true);
    let agent = &deployed["agent"];
    let id = agent["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("agent-"));
    assert_eq!(agent["roomName"], "lobby");
    assert_eq!(agent["identity"], "ai-agent");
    assert_eq!(agent["status"], "pending");
    assert!(agent.get("token").is_none(), "join token must not leak");

    send(
        &router,
        post_json(
            "/agent/deploy",
            json!({ "roomName": "other", "agentIdentity": "helper" }),
        ),
    )
    .await;

    let (_, list) = send(&router, get("/agent/list")).await;
    assert_eq!(list["count"], 2);

    let (status, room) = send(&router, get("/agent/room/lobby")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(room["roomName"], "lobby");
    assert_eq!(room["count"], 1);
    assert_eq!(room["agents"][0]["id"], id.as_str());

    let (status, fetched) = send(&router, get(&format!("/agent/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["agent"]["id"], id.as_str());

    let (status, removed) = send(&router, delete(&format!("/agent/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(removed["success"], true);

    let (status, missing) = send(&router, get(&format!("/agent/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["error"], "not_found");

    // Removing again is still a success.
    let (status, _) = send(&router, delete(&format!("/agent/{}", id))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = send(&router, get("/agent/list")).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["agents"][0]["identity"], "helper");
}

#[tokio::test]
async fn deploy_requires_room_name() {
    let server = MockServer::start().await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let (status, json) = send(&router, post_json("/agent/deploy", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["message"], "roomName is required");

    let (status, _) = send(&router, post_json("/agent/deploy", json!({ "roomName": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method("POST")
        .uri("/agent/deploy")
        .header("Content-Type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&router, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test]
async fn deploy_without_livekit_credentials_is_configuration_error() {
    let server = MockServer::start().await;
    let router = TestApp::new(&server.uri(), &server.uri())
        .without_livekit()
        .router();

    let request = post_json("/agent/deploy", json!({ "roomName": "lobby" }));
    let (status, json) = send(&router, request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "configuration_error");

    let (_, list) = send(&router, get("/agent/list")).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn speak_returns_buffered_audio() {
    let server = MockServer::start().await;
    mount_tts(&server).await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let response = router
        .oneshot(post_json("/agent/speak", json!({ "text": "Hello there" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], AUDIO);
}

#[tokio::test]
async fn speak_can_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/text-to-speech/{}/stream", VOICE)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(AUDIO.to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let response = router
        .oneshot(post_json(
            "/agent/speak",
            json!({ "text": "Hello there", "stream": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], AUDIO);
}

#[tokio::test]
async fn speak_errors_use_stable_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/text-to-speech/{}", VOICE)))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let (status, json) = send(&router, post_json("/agent/speak", json!({ "text": "hi" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "synthesis_failed");

    let (status, json) = send(&router, post_json("/agent/speak", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "text is required");
}

#[tokio::test]
async fn message_uses_rule_based_reply_without_agent() {
    let server = MockServer::start().await;
    mount_tts(&server).await;
    Mock::given(method("POST"))
        .and(path("/convai/conversation"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let (status, json) = send(
        &router,
        post_json(
            "/agent/message",
            json!({ "text": "hello", "roomName": "lobby", "conversationId": "conv_1" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["input"], "hello");
    assert_eq!(json["response"], "Hey there! How can I help you today?");
    assert_eq!(json["conversationId"], "conv_1");
    assert_eq!(json["source"], "rule_based");
    assert_eq!(json["audioContentType"], "audio/mpeg");
    assert!(json.get("emotion").is_none());

    let audio = base64::engine::general_purpose::STANDARD
        .decode(json["audio"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, AUDIO);

    let turns = json["turns"].as_array().unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[1]["role"], "assistant");
}

#[tokio::test]
async fn message_forwards_to_hosted_agent() {
    let server = MockServer::start().await;
    mount_tts(&server).await;
    Mock::given(method("POST"))
        .and(path("/convai/conversation"))
        .and(body_partial_json(json!({
            "agent_id": "agent_abc",
            "text": "what's new?",
            "dynamic_variables": { "user_name": "Sam", "system__room": "lobby" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Not much, Sam!",
            "conversation_id": "conv_new"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri())
        .with_agent("agent_abc")
        .router();

    let (status, json) = send(
        &router,
        post_json(
            "/agent/message",
            json!({
                "text": "what's new?",
                "roomName": "lobby",
                "dynamicVariables": { "user_name": "Sam" }
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Not much, Sam!");
    assert_eq!(json["conversationId"], "conv_new");
    assert_eq!(json["source"], "hosted_agent");
}

#[tokio::test]
async fn message_requires_text() {
    let server = MockServer::start().await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    for uri in ["/agent/message", "/agent/message-with-emotion"] {
        let (status, json) = send(&router, post_json(uri, json!({ "roomName": "lobby" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(json["message"], "text is required");
    }
}

fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "carrie-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/webm\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/agent/transcribe")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn transcribe_accepts_audio_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/speech-to-text"))
        .and(header_is("xi-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "hello world" })))
        .expect(1)
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let request = multipart_request("audio", "clip.webm", b"webm-bytes");
    let (status, json) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["transcription"], "hello world");
}

#[tokio::test]
async fn transcribe_accepts_uploads_past_the_default_body_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/speech-to-text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "long take" })))
        .expect(1)
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let recording = vec![0x1a_u8; 3 * 1024 * 1024];
    let request = multipart_request("audio", "take.webm", &recording);
    let (status, json) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    assert_eq!(json["transcription"], "long take");
}

#[tokio::test]
async fn transcribe_without_audio_field_is_bad_request() {
    let server = MockServer::start().await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let (status, json) = send(&router, multipart_request("video", "clip.webm", b"x")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "audio file is required");
}

#[tokio::test]
async fn transcribe_failure_carries_vendor_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/speech-to-text"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "detail": "unsupported audio" })),
        )
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    let (status, json) = send(&router, multipart_request("audio", "clip.webm", b"x")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "transcription_failed");
    assert_eq!(json["message"], "unsupported audio");
}

#[tokio::test]
async fn voices_and_session_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/voices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "voices": [{ "voice_id": "v1", "name": "Rachel" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/convai/conversation/token"))
        .and(query_param("agent_id", "agent_abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok_1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/convai/conversation/get-signed-url"))
        .and(query_param("agent_id", "agent_abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "signed_url": "wss://signed" })),
        )
        .mount(&server)
        .await;
    let router = TestApp::new(&server.uri(), &server.uri())
        .with_agent("agent_abc")
        .router();

    let (status, json) = send(&router, get("/agent/voices")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["voices"][0]["voice_id"], "v1");

    let (_, json) = send(&router, get("/agent/conversation-token")).await;
    assert_eq!(json["conversationToken"], "tok_1");

    let (_, json) = send(&router, get("/agent/signed-url")).await;
    assert_eq!(json["signedUrl"], "wss://signed");
}

#[tokio::test]
async fn session_credentials_need_agent_id() {
    let server = MockServer::start().await;
    let router = TestApp::new(&server.uri(), &server.uri()).router();

    for uri in ["/agent/conversation-token", "/agent/signed-url"] {
        let (status, json): (StatusCode, Value) = send(&router, get(uri)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert_eq!(json["error"], "configuration_error");
    }
}
