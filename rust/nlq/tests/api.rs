mod support;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use support::{harness, harness_with, read_json};

#[tokio::test]
async fn healthz_reports_ok() {
    let harness = harness();
    let (status, body) = read_json(harness.get("/healthz").await).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn filter_translates_priority_template() {
    let harness = harness();
    let response = harness
        .post("/api/filter", &json!({ "query": "P1 and P2 incidents" }))
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    assert_eq!(body["table"], json!("incident"));
    assert_eq!(body["template_used"], json!("p1_p2_all_states"));
    assert_eq!(body["filters"]["priority"], json!("priority=1^ORpriority=2"));
    assert_eq!(body["query"], json!("priority=1^ORpriority=2"));
    assert_eq!(body["filters_from_context"], json!({}));
    assert_eq!(
        body["sql_equivalent"],
        json!("SELECT * FROM incident WHERE (priority = '1' OR priority = '2')")
    );
}

#[tokio::test]
async fn filter_resolves_week_numbers() {
    let harness = harness();
    let response = harness
        .post(
            "/api/filter",
            &json!({ "query": "week 35 2025 incidents", "table": "incident" }),
        )
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    let created = body["filters"]["sys_created_on"]
        .as_str()
        .expect("date filter should be present");
    assert!(created.contains("dateGenerate('2025-08-25','00:00:00')"));
    assert!(created.contains("dateGenerate('2025-08-31','23:59:59')"));
}

#[tokio::test]
async fn filter_merges_context_without_overwriting() {
    let harness = harness();
    let response = harness
        .post(
            "/api/filter",
            &json!({
                "query": "urgent tickets",
                "context": { "exclude_resolved": true }
            }),
        )
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filters"]["priority"], json!("1"));
    assert_eq!(
        body["filters_from_context"],
        json!({ "_complete_state_exclusion": "state!=6^state!=7^state!=8" })
    );
    assert_eq!(body["filters_from_nl"], json!({ "priority": "1" }));
}

#[tokio::test]
async fn filter_rejects_invalid_table() {
    let harness = harness_with(|config| {
        config.allowed_tables = Some(vec!["incident".to_string()]);
    });
    let response = harness
        .post(
            "/api/filter",
            &json!({ "query": "p1 incidents", "table": "change_request" }),
        )
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        json!("invalid request: table 'change_request' is not enabled")
    );
}

#[tokio::test]
async fn explain_flags_comma_priorities() {
    let harness = harness();
    let response = harness
        .post("/api/explain", &json!({ "filters": { "priority": "1,2" } }))
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["compiled_query"], json!("priority=1^ORpriority=2"));
    let issues = body["potential_issues"]
        .as_array()
        .expect("potential_issues should be an array");
    assert_eq!(issues.len(), 1);
    assert!(issues[0].as_str().is_some_and(|issue| issue.contains("comma")));
    assert_eq!(body["analysis"]["original_filter_count"], json!(1));
}

#[tokio::test]
async fn debug_reports_old_comparison_syntax() {
    let harness = harness();
    let response = harness
        .post(
            "/api/debug",
            &json!({ "query": "sys_created_on>=2025-08-25^priority=1" }),
        )
        .await;
    let (status, body) = read_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["condition_count"], json!(2));
    assert!(!body["potential_issues"]
        .as_array()
        .expect("potential_issues should be an array")
        .is_empty());
}

#[tokio::test]
async fn catalogues_are_served() {
    let harness = harness();

    let (status, templates) = read_json(harness.get("/api/templates").await).await;
    assert_eq!(status, StatusCode::OK);
    let templates = templates.as_array().expect("templates should be an array");
    assert_eq!(templates.len(), 6);
    assert!(templates
        .iter()
        .any(|entry| entry["name"] == json!("p1_p2_all_states")));

    let (status, examples) = read_json(harness.get("/api/examples").await).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!examples["examples"].as_array().unwrap().is_empty());
    assert!(!examples["tips"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn api_key_is_enforced() {
    let harness = harness();

    let response = harness
        .post_without_api_key("/api/filter", &json!({ "query": "p1" }))
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("authentication failed"));

    let (status, _) = read_json(harness.get_without_api_key("/api/templates").await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = read_json(harness.get_without_api_key("/healthz").await).await;
    assert_eq!(status, StatusCode::OK);
}
