use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

mod common;

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", common::TEST_TOKEN))
        .body(Body::empty())
        .unwrap()
}

fn authed_delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {}", common::TEST_TOKEN))
        .body(Body::empty())
        .unwrap()
}

fn authed_post(uri: &str, payload: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", common::TEST_TOKEN))
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = common::create_test_app();

    for uri in ["/health", "/health/live", "/health/info"] {
        let response = send(&app, get(uri)).await;
        assert_eq!(response.status(), StatusCode::OK, "unexpected status for {uri}");
    }
}

#[tokio::test]
async fn test_unauthorized_without_token() {
    let app = common::create_test_app();

    let response = send(&app, get("/api/progress")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unauthorized_with_wrong_token() {
    let app = common::create_test_app();

    let request = Request::builder()
        .uri("/api/progress")
        .header("authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_404_fallback_is_json() {
    let app = common::create_test_app();

    let response = send(&app, get("/nonexistent/path")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_get_dialogues_for_seeded_lesson() {
    let app = common::create_test_app();

    let response = send(&app, authed_get("/api/lessons/starter/1/colours/dialogues")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let dialogues = body["data"]["dialogues"].as_array().unwrap();
    assert!(!dialogues.is_empty());
    assert_eq!(dialogues[0]["turns"][0]["role"], "teacher");
}

#[tokio::test]
async fn test_get_dialogues_for_unknown_lesson_is_404() {
    let app = common::create_test_app();

    let response = send(&app, authed_get("/api/lessons/starter/9/nothing/dialogues")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_evaluate_answer_exact_match_path() {
    let app = common::create_test_app();

    let payload = serde_json::json!({
        "dialogueId": "colours-1",
        "turnIndex": 1,
        "expectedAnswer": "I'm fine",
        "acceptedAnswers": ["I'm fine", "i am fine"],
        "userAnswer": "I am fine",
        "targetStructures": ["I'm ..."],
        "context": {
            "teacherQuestion": "How are you today?",
            "lessonTitle": "Saying hello"
        }
    });
    let response = send(&app, authed_post("/api/evaluation/answer", payload)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["isCorrect"], true);
    assert_eq!(body["data"]["correctAnswer"], "I'm fine");
    assert_eq!(body["data"]["details"]["grammarOk"], true);
    assert!(body["data"]["feedbackAudio"].is_null());
}

#[tokio::test]
async fn test_evaluate_answer_close_match_without_llm() {
    let app = common::create_test_app();

    let payload = serde_json::json!({
        "dialogueId": "colours-1",
        "turnIndex": 1,
        "expectedAnswer": "red",
        "acceptedAnswers": ["red"],
        "userAnswer": "red colour",
        "targetStructures": [],
        "context": {
            "teacherQuestion": "What colour is it?",
            "lessonTitle": "Colours"
        }
    });
    let response = send(&app, authed_post("/api/evaluation/answer", payload)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["isCorrect"], false);
    let feedback = body["data"]["feedbackText"].as_str().unwrap();
    assert!(feedback.contains("很接近"), "feedback was: {feedback}");
}

#[tokio::test]
async fn test_evaluate_answer_validation_errors() {
    let app = common::create_test_app();

    let valid_context = serde_json::json!({
        "teacherQuestion": "Q",
        "lessonTitle": "T"
    });

    let too_long = "a".repeat(501);
    let cases = [
        serde_json::json!({
            "dialogueId": "d", "turnIndex": 0, "expectedAnswer": "x",
            "acceptedAnswers": ["x"], "userAnswer": "   ",
            "context": valid_context
        }),
        serde_json::json!({
            "dialogueId": "d", "turnIndex": 0, "expectedAnswer": "x",
            "acceptedAnswers": ["x"], "userAnswer": too_long,
            "context": valid_context
        }),
        serde_json::json!({
            "dialogueId": "d", "turnIndex": 0, "expectedAnswer": "x",
            "acceptedAnswers": [], "userAnswer": "hello",
            "context": valid_context
        }),
        serde_json::json!({
            "dialogueId": "d", "turnIndex": -1, "expectedAnswer": "x",
            "acceptedAnswers": ["x"], "userAnswer": "hello",
            "context": valid_context
        }),
    ];

    for payload in cases {
        let response = send(&app, authed_post("/api/evaluation/answer", payload.clone())).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "payload should be rejected: {payload}"
        );
    }
}

#[tokio::test]
async fn test_progress_crud_roundtrip() {
    let app = common::create_test_app();

    let payload = serde_json::json!({
        "dialogueId": "colours-1",
        "totalTurns": 4,
        "correctTurns": 3,
        "durationSeconds": 182
    });
    let response = send(&app, authed_post("/api/progress", payload)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["score"], 75);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let response = send(&app, authed_get("/api/progress")).await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = send(&app, authed_get(&format!("/api/progress/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, authed_delete(&format!("/api/progress/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, authed_get(&format!("/api/progress/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_progress_rejects_more_correct_than_total() {
    let app = common::create_test_app();

    let payload = serde_json::json!({
        "dialogueId": "colours-1",
        "totalTurns": 2,
        "correctTurns": 3,
        "durationSeconds": 30
    });
    let response = send(&app, authed_post("/api/progress", payload)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lesson_session_http_flow_reaches_summary() {
    let app = common::create_test_app();

    // feelings 课只有一个对话：teacher(repeat+hint) → student → teacher → student
    let payload = serde_json::json!({ "level": "starter", "stage": "2", "lessonId": "feelings" });
    let response = send(&app, authed_post("/api/lesson-sessions", payload)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["phase"], "teacher_speaking");
    assert_eq!(body["data"]["teacherPhase"], "question");
    let session_id = body["data"]["sessionId"].as_str().unwrap().to_string();
    let events_uri = format!("/api/lesson-sessions/{session_id}/events");

    let audio_ended = serde_json::json!({ "type": "audio_ended" });

    // 第一回合带重复和提示，需要三次播放完成才轮到学生
    let body = body_json(send(&app, authed_post(&events_uri, audio_ended.clone())).await).await;
    assert_eq!(body["data"]["teacherPhase"], "repeat");
    let body = body_json(send(&app, authed_post(&events_uri, audio_ended.clone())).await).await;
    assert_eq!(body["data"]["teacherPhase"], "hint");
    let body = body_json(send(&app, authed_post(&events_uri, audio_ended.clone())).await).await;
    assert_eq!(body["data"]["phase"], "student_turn");

    let answer = serde_json::json!({ "type": "answer_changed", "text": "He is happy" });
    send(&app, authed_post(&events_uri, answer)).await;
    let body = body_json(send(&app, authed_post(&events_uri, serde_json::json!({ "type": "submit" }))).await).await;
    assert_eq!(body["data"]["phase"], "feedback");
    assert_eq!(body["data"]["evaluation"]["isCorrect"], true);
    assert_eq!(body["data"]["score"]["total"], 1);

    let body = body_json(send(&app, authed_post(&events_uri, serde_json::json!({ "type": "next" }))).await).await;
    assert_eq!(body["data"]["phase"], "teacher_speaking");

    let body = body_json(send(&app, authed_post(&events_uri, audio_ended)).await).await;
    assert_eq!(body["data"]["phase"], "student_turn");

    let answer = serde_json::json!({ "type": "answer_changed", "text": "yes i'm happy" });
    send(&app, authed_post(&events_uri, answer)).await;
    let body = body_json(send(&app, authed_post(&events_uri, serde_json::json!({ "type": "submit" }))).await).await;
    assert_eq!(body["data"]["evaluation"]["isCorrect"], true);

    let body = body_json(send(&app, authed_post(&events_uri, serde_json::json!({ "type": "next" }))).await).await;
    assert_eq!(body["data"]["phase"], "summary");
    assert_eq!(body["data"]["summary"]["percentage"], 100);
    assert_eq!(body["data"]["progressSaveWarning"], false);

    // 每个覆盖到的对话各有一条进度记录
    let body = body_json(send(&app, authed_get("/api/progress")).await).await;
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["dialogueId"], "feelings-1");
    assert_eq!(records[0]["score"], 100);
}

#[tokio::test]
async fn test_lesson_session_for_unknown_lesson_is_terminal_error() {
    let app = common::create_test_app();

    let payload = serde_json::json!({ "level": "starter", "stage": "9", "lessonId": "nothing" });
    let response = send(&app, authed_post("/api/lesson-sessions", payload)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["data"]["phase"], "error");
    assert!(body["data"]["error"].is_string());
}

#[tokio::test]
async fn test_lesson_session_of_another_owner_is_invisible() {
    let app = common::create_test_app();

    let response = send(&app, authed_get("/api/lesson-sessions/no-such-session")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
