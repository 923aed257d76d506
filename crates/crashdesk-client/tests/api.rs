//! End-to-end tests of the client application HTTP surface

use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crashdesk_analyzer::{KnowledgeBase, ScanConfig, SignatureClassifier};
use crashdesk_assistant::ScriptedAssistant;
use crashdesk_client::sync::RecordingGateway;
use crashdesk_client::{build_router, AppState, ClientStore};

struct Harness {
    server: TestServer,
    gateway: Arc<RecordingGateway>,
    _dirs: (tempfile::TempDir, tempfile::TempDir),
}

fn harness(assistant_replies: Vec<&str>) -> Harness {
    let kb_dir = tempfile::tempdir().unwrap();
    let dump_dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(RecordingGateway::default());
    let state = Arc::new(AppState {
        store: ClientStore::new(),
        kb: KnowledgeBase::open(kb_dir.path().join("kb.json")).unwrap(),
        classifier: SignatureClassifier::new(),
        assistant: Arc::new(ScriptedAssistant::new(assistant_replies)),
        support: gateway.clone(),
        scan: ScanConfig {
            locations: vec![dump_dir.path().to_path_buf()],
            max_dump_size: 1024 * 1024,
        },
    });
    Harness {
        server: TestServer::new(build_router(state)).unwrap(),
        gateway,
        _dirs: (kb_dir, dump_dir),
    }
}

async fn register_user(server: &TestServer) -> u64 {
    let response = server
        .post("/api/users")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "system_config": {
                "os_version": "Windows 11 23H2",
                "processor": "Intel i7-13700K",
                "ram_size": "32GB",
                "storage_type": "nvme"
            }
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"]["id"].as_u64().unwrap()
}

async fn file_ticket(server: &TestServer, user_id: u64) -> String {
    let response = server
        .post("/api/tickets")
        .json(&json!({
            "user_id": user_id,
            "title": "Blue screen when gaming",
            "description": "Machine bugchecks within minutes of starting any 3D game.",
            "error_code": "0x0000001E",
            "priority": "high",
            "steps_tried": "Reinstalled GPU drivers"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["data"]["ticket_id"].as_str().unwrap().to_string()
}

async fn wait_for<F: Fn() -> bool>(check: F) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within a second");
}

#[tokio::test]
async fn filing_a_ticket_notifies_support_with_full_payload() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;
    let ticket_id = file_ticket(&h.server, user_id).await;
    assert!(ticket_id.starts_with("DUMP-"));

    let gateway = h.gateway.clone();
    wait_for(move || !gateway.notifications.lock().is_empty()).await;

    let notifications = h.gateway.notifications.lock();
    assert_eq!(notifications.len(), 1);
    let n = &notifications[0];
    assert_eq!(n.ticket_id, ticket_id);
    assert_eq!(n.username, "alice");
    assert_eq!(n.error_code.as_deref(), Some("0x0000001E"));
    assert!(n.system_config.is_some());
}

#[tokio::test]
async fn invalid_drafts_are_rejected_with_the_field_named() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;

    let response = h
        .server
        .post("/api/tickets")
        .json(&json!({
            "user_id": user_id,
            "title": "hey",
            "description": "Machine bugchecks within minutes of starting any 3D game."
        }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("title"));

    // Nothing was persisted.
    let list = h
        .server
        .get("/api/tickets")
        .add_query_param("user_id", user_id)
        .await
        .json::<Value>();
    assert_eq!(list["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn ticket_detail_includes_initial_system_message() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;
    let ticket_id = file_ticket(&h.server, user_id).await;

    let body = h.server.get(&format!("/api/tickets/{ticket_id}")).await.json::<Value>();
    let messages = body["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["sender_type"], "system");
    let text = messages[0]["body"].as_str().unwrap();
    assert!(text.contains("Steps already tried:"));
    assert!(text.contains("OS: Windows 11 23H2"));
}

#[tokio::test]
async fn status_filter_narrows_ticket_list() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;
    file_ticket(&h.server, user_id).await;

    let open = h
        .server
        .get("/api/tickets")
        .add_query_param("user_id", user_id)
        .add_query_param("status", "open")
        .await
        .json::<Value>();
    assert_eq!(open["data"].as_array().unwrap().len(), 1);

    let resolved = h
        .server
        .get("/api/tickets")
        .add_query_param("user_id", user_id)
        .add_query_param("status", "resolved")
        .await
        .json::<Value>();
    assert_eq!(resolved["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn user_message_reopens_resolved_ticket_and_pushes_update() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;
    let ticket_id = file_ticket(&h.server, user_id).await;

    // Support resolves the ticket via inbound sync.
    let resolve = h
        .server
        .put(&format!("/api/tickets/{ticket_id}/status"))
        .json(&json!({
            "status": "resolved",
            "solution": "Updated drivers",
            "updated_at": chrono::Utc::now() + chrono::Duration::seconds(30)
        }))
        .await;
    assert_eq!(resolve.json::<Value>()["data"]["applied"], true);

    let response = h
        .server
        .post(&format!("/api/tickets/{ticket_id}/messages"))
        .json(&json!({ "user_id": user_id, "body": "Still crashing after the fix" }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["data"]["reopened"], true);

    let gateway = h.gateway.clone();
    wait_for(move || !gateway.user_updates.lock().is_empty()).await;
    let updates = h.gateway.user_updates.lock();
    assert_eq!(updates[0].0, ticket_id);
    assert_eq!(updates[0].1.status, crashdesk_core::TicketStatus::InProgress);
}

#[tokio::test]
async fn stale_status_sync_is_dropped() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;
    let ticket_id = file_ticket(&h.server, user_id).await;

    let stale = h
        .server
        .put(&format!("/api/tickets/{ticket_id}/status"))
        .json(&json!({
            "status": "closed",
            "solution": null,
            "updated_at": chrono::Utc::now() - chrono::Duration::hours(1)
        }))
        .await;
    assert_eq!(stale.json::<Value>()["data"]["applied"], false);

    let detail = h.server.get(&format!("/api/tickets/{ticket_id}")).await.json::<Value>();
    assert_eq!(detail["data"]["ticket"]["status"], "open");
}

#[tokio::test]
async fn status_sync_for_unknown_ticket_is_404() {
    let h = harness(vec![]);
    let response = h
        .server
        .put("/api/tickets/DUMP-20250101-DEADBEEF/status")
        .json(&json!({
            "status": "resolved",
            "solution": "n/a",
            "updated_at": chrono::Utc::now()
        }))
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["code"], "ticket_not_found");
}

#[tokio::test]
async fn chat_escalates_when_the_assistant_gives_up() {
    let h = harness(vec![
        "Try updating your GPU driver first.",
        "This needs hands-on service. [ESCALATE: suspected hardware failure]",
    ]);
    let user_id = register_user(&h.server).await;

    let conversation = h
        .server
        .post("/api/conversations")
        .json(&json!({ "user_id": user_id, "error_code": "0x0000001E" }))
        .await
        .json::<Value>();
    let conv_id = conversation["data"]["conversation_id"].as_str().unwrap().to_string();

    let first = h
        .server
        .post("/api/chat")
        .json(&json!({ "conversation_id": conv_id, "message": "My PC blue screens" }))
        .await
        .json::<Value>();
    assert_eq!(first["data"]["escalated"], false);
    assert_eq!(first["data"]["reply"], "Try updating your GPU driver first.");

    let second = h
        .server
        .post("/api/chat")
        .json(&json!({ "conversation_id": conv_id, "message": "Did not help" }))
        .await
        .json::<Value>();
    assert_eq!(second["data"]["escalated"], true);
    assert_eq!(second["data"]["escalation_reason"], "suspected hardware failure");
    assert_eq!(second["data"]["conversation_status"], "escalated");

    let detail = h
        .server
        .get(&format!("/api/conversations/{conv_id}"))
        .await
        .json::<Value>();
    assert_eq!(detail["data"]["messages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn knowledge_sync_appends_solution_and_feedback_tracks_unknown_codes() {
    let h = harness(vec![]);

    let update = h
        .server
        .post("/api/knowledge_base/update")
        .json(&json!({
            "error_code": "0x0000001E",
            "solution": "Rolled back the GPU driver",
            "source": "support_dashboard"
        }))
        .await;
    update.assert_status_ok();

    let entry = h.server.get("/api/knowledge_base/0x0000001E").await.json::<Value>();
    let steps = entry["data"]["solutions"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[3]["description"], "Rolled back the GPU driver");

    let missing = h.server.get("/api/knowledge_base/0xBADC0DE0").await;
    missing.assert_status(axum::http::StatusCode::NOT_FOUND);

    let feedback = h
        .server
        .post("/api/feedback")
        .json(&json!({ "error_code": "0xBADC0DE0", "feedback": "solved" }))
        .await
        .json::<Value>();
    assert_eq!(feedback["data"]["known"], false);
}

#[tokio::test]
async fn scan_classifies_new_dumps_once() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;

    let mut contents = vec![0x4D, 0x44, 0x4D, 0x50];
    contents.extend_from_slice(&[0xAB; 32]);
    contents.extend_from_slice(&[0x00, 0x00, 0x00, 0x1E]);
    std::fs::write(h._dirs.1.path().join("crash.dmp"), &contents).unwrap();

    let first = h
        .server
        .post("/api/scan")
        .json(&json!({ "user_id": user_id }))
        .await
        .json::<Value>();
    assert_eq!(first["data"]["scanned"], 1);
    assert_eq!(first["data"]["new_analyses"], 1);
    let verdict = &first["data"]["analyses"][0]["verdict"];
    assert_eq!(verdict["error_code"], "0X0000001E");
    assert_eq!(verdict["category"], "driver");

    let second = h
        .server
        .post("/api/scan")
        .json(&json!({ "user_id": user_id }))
        .await
        .json::<Value>();
    assert_eq!(second["data"]["new_analyses"], 0);
}

#[tokio::test]
async fn triage_report_beside_the_dump_outranks_signature_matching() {
    let h = harness(vec![]);
    let user_id = register_user(&h.server).await;

    // Header carries the 0x1E signature, but the sibling report names a
    // different bug check and should win with high confidence.
    let mut contents = vec![0x4D, 0x44, 0x4D, 0x50];
    contents.extend_from_slice(&[0x00, 0x00, 0x00, 0x1E]);
    std::fs::write(h._dirs.1.path().join("crash.dmp"), &contents).unwrap();
    std::fs::write(
        h._dirs.1.path().join("crash.txt"),
        "BUGCHECK_CODE:  50\nBUGCHECK_STR:  PAGE_FAULT_IN_NONPAGED_AREA\nMODULE_NAME:  ntoskrnl.exe\n",
    )
    .unwrap();

    let body = h
        .server
        .post("/api/scan")
        .json(&json!({ "user_id": user_id }))
        .await
        .json::<Value>();
    let verdict = &body["data"]["analyses"][0]["verdict"];
    assert_eq!(verdict["error_code"], "0X00000050");
    assert_eq!(verdict["method"], "debugger_report");
    assert_eq!(verdict["confidence"], "high");
}
