use std::time::Duration;

use quay_core::catalog::{GET_VESSEL_DETAILS, GET_VISITS_TODAY};
use quay_core::conversation::{ConversationError, Orchestrator, OrchestratorConfig, SYSTEM_PROMPT};
use quay_core::llm::{ConversationMessage, ModelError};
use quay_core::testing::{ScriptedModel, StaticStore, usage};
use quay_core::tools::ToolExecutor;
use quay_store::Query;
use serde_json::{Value, json};

fn orchestrator(
    model: &ScriptedModel,
    store: &StaticStore,
) -> Orchestrator<ScriptedModel, StaticStore> {
    Orchestrator::new(
        model.clone(),
        ToolExecutor::new(store.clone()),
        OrchestratorConfig::default(),
    )
}

fn rows(value: Value) -> Vec<quay_store::Row> {
    let Value::Array(items) = value else {
        panic!("rows fixture must be an array");
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => map,
            other => panic!("row fixture must be an object, got {other}"),
        })
        .collect()
}

fn tool_messages(messages: &[ConversationMessage]) -> Vec<(String, Value)> {
    messages
        .iter()
        .filter_map(|message| match message {
            ConversationMessage::Tool {
                tool_call_id,
                content,
            } => Some((
                tool_call_id.clone(),
                serde_json::from_str(content).expect("tool content is JSON"),
            )),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn direct_answer_needs_one_model_call() {
    let model = ScriptedModel::new().answer("Hello, how can I help?");
    let store = StaticStore::new();

    let reply = orchestrator(&model, &store)
        .respond(vec![ConversationMessage::user("hi")])
        .await
        .expect("reply");

    assert_eq!(reply.message.as_deref(), Some("Hello, how can I help?"));
    assert!(reply.tools_used.is_empty());
    assert!(store.calls().is_empty());

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].tools.len(), 9);
    assert_eq!(requests[0].messages[0], ConversationMessage::system(SYSTEM_PROMPT));
}

#[tokio::test]
async fn visits_today_question_runs_one_lookup() {
    let model = ScriptedModel::new()
        .invoke(&[("call_1", GET_VISITS_TODAY, "{}")])
        .answer("Two vessels are working today.");
    let store = StaticStore::new().with_rows(
        Query::VisitsToday,
        rows(json!([
            { "visitId": "TNG001", "phase": "WORKING" },
            { "visitId": "TNG002", "phase": "ARRIVED" },
        ])),
    );

    let reply = orchestrator(&model, &store)
        .respond(vec![ConversationMessage::user(
            "What visits are at the terminal today?",
        )])
        .await
        .expect("reply");

    assert_eq!(reply.message.as_deref(), Some("Two vessels are working today."));
    assert_eq!(reply.tools_used, vec![GET_VISITS_TODAY.to_string()]);
    assert_eq!(reply.usage, Some(usage(10)));
    assert_eq!(store.calls(), vec![(Query::VisitsToday, Vec::new())]);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].tools.is_empty(), "follow-up round offers no tools");

    let results = tool_messages(&requests[1].messages);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call_1");
    assert_eq!(results[0].1.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn failing_invocation_does_not_stop_siblings() {
    let model = ScriptedModel::new()
        .invoke(&[
            ("call_1", "get_berth_schedule", "{}"),
            ("call_2", GET_VESSEL_DETAILS, "{not json"),
            ("call_3", GET_VESSEL_DETAILS, r#"{"visitId":"NOPE01"}"#),
            ("call_4", GET_VISITS_TODAY, "{}"),
        ])
        .answer("Some lookups failed.");
    let store = StaticStore::new().with_failure(Query::VisitsToday, "connection reset");

    let reply = orchestrator(&model, &store)
        .respond(vec![ConversationMessage::user("status?")])
        .await
        .expect("tool failures are absorbed");

    assert_eq!(reply.tools_used.len(), 4);
    assert_eq!(
        store.calls().iter().map(|(query, _)| *query).collect::<Vec<_>>(),
        vec![Query::VesselDetails, Query::VisitsToday]
    );

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    let results = tool_messages(&requests[1].messages);
    let ids: Vec<_> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, vec!["call_1", "call_2", "call_3", "call_4"]);

    assert_eq!(results[0].1, json!({ "error": "Unknown function: get_berth_schedule" }));
    assert!(results[1].1["error"].is_string());
    assert_eq!(results[2].1, json!("No vessel found with visit ID: NOPE01"));
    assert_eq!(
        results[3].1,
        json!({ "error": "database query failed: connection reset" })
    );
}

#[tokio::test]
async fn assistant_invocations_precede_results_in_transcript() {
    let model = ScriptedModel::new()
        .invoke(&[("call_1", GET_VISITS_TODAY, "")])
        .answer("done");
    let store = StaticStore::new();

    orchestrator(&model, &store)
        .respond(vec![ConversationMessage::user("today?")])
        .await
        .expect("reply");

    let second = &model.requests()[1].messages;
    assert_eq!(second.len(), 4);
    assert!(matches!(
        &second[2],
        ConversationMessage::Assistant { tool_calls, .. } if tool_calls.len() == 1
    ));
    assert!(matches!(&second[3], ConversationMessage::Tool { tool_call_id, .. } if tool_call_id == "call_1"));
}

#[tokio::test]
async fn second_round_tool_calls_are_not_executed() {
    let model = ScriptedModel::new()
        .invoke(&[("call_1", GET_VISITS_TODAY, "{}")])
        .invoke(&[("call_2", GET_VISITS_TODAY, "{}")]);
    let store = StaticStore::new();

    let reply = orchestrator(&model, &store)
        .respond(vec![ConversationMessage::user("today?")])
        .await
        .expect("reply");

    assert_eq!(reply.message, None);
    assert_eq!(store.calls().len(), 1);
    assert_eq!(model.requests().len(), 2);
}

#[tokio::test]
async fn model_fault_aborts_the_turn() {
    let model = ScriptedModel::new().fail(ModelError::Status {
        status: 500,
        body: "upstream down".into(),
    });
    let store = StaticStore::new();

    let err = orchestrator(&model, &store)
        .respond(vec![ConversationMessage::user("hi")])
        .await
        .expect_err("model fault");

    assert!(matches!(err, ConversationError::Model(ModelError::Status { status: 500, .. })));
}

#[tokio::test]
async fn follow_up_fault_aborts_after_tools_ran() {
    let model = ScriptedModel::new()
        .invoke(&[("call_1", GET_VISITS_TODAY, "{}")])
        .fail(ModelError::EmptyResponse);
    let store = StaticStore::new();

    let err = orchestrator(&model, &store)
        .respond(vec![ConversationMessage::user("today?")])
        .await
        .expect_err("model fault");

    assert!(matches!(err, ConversationError::Model(ModelError::EmptyResponse)));
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn slow_model_times_out() {
    let model = ScriptedModel::new()
        .answer("too late")
        .with_delay(Duration::from_millis(500));
    let store = StaticStore::new();
    let orchestrator = Orchestrator::new(
        model,
        ToolExecutor::new(store),
        OrchestratorConfig::default().with_model_timeout(Duration::from_millis(20)),
    );

    let err = orchestrator
        .respond(vec![ConversationMessage::user("hi")])
        .await
        .expect_err("timeout");

    assert!(err.is_timeout());
}

#[tokio::test]
async fn orphaned_tool_history_is_rejected_before_model_call() {
    let model = ScriptedModel::new().answer("unused");
    let store = StaticStore::new();

    let err = orchestrator(&model, &store)
        .respond(vec![
            ConversationMessage::user("hi"),
            ConversationMessage::tool("call_x", "[]"),
        ])
        .await
        .expect_err("validation");

    assert!(matches!(err, ConversationError::Validation(_)));
    assert!(model.requests().is_empty());
}
