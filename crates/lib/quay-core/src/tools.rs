//! Tool executor.
//!
//! Decodes a tool name and argument object into a typed [`Lookup`], binds it
//! to its statement and shapes the rows into a [`ToolOutput`]. Every failure
//! is returned as a [`ToolError`] that callers render as data; nothing here
//! aborts a sibling invocation.

use std::time::Instant;

use quay_store::{Query, Row, SqlParam};
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{
    self,
    GET_CRANE_DELAYS,
    GET_INBOUND_VESSELS_CURRENT_YEAR,
    GET_INBOUND_VESSELS_DATE_RANGE,
    GET_VESSEL_CRANES,
    GET_VESSEL_DETAILS,
    GET_VESSEL_LONGEST_CRANE,
    GET_VESSEL_PRODUCTIVITY,
    GET_VESSEL_VISITS,
    GET_VISITS_TODAY,
};
use crate::store::{StoreError, TerminalStore};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown function: {0}")]
    UnknownTool(String),
    #[error("{argument} is required")]
    MissingArgument { tool: String, argument: &'static str },
    #[error("{argument} must be a string")]
    InvalidArgument { tool: String, argument: &'static str },
    #[error("arguments for {tool} are not a JSON object: {message}")]
    MalformedArguments { tool: String, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ToolError {
    /// The `{"error": ...}` marker handed back in place of a result.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

/// Result of a lookup that ran to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    Rows(Vec<Row>),
    Record(Row),
    /// Domain-level empty result, not a failure.
    NotFound(String),
}

impl ToolOutput {
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Rows(rows) => Value::Array(rows.iter().cloned().map(Value::Object).collect()),
            Self::Record(row) => Value::Object(row.clone()),
            Self::NotFound(message) => Value::String(message.clone()),
        }
    }

    /// Pretty JSON for row results, the bare message otherwise.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::NotFound(message) => message.clone(),
            other => serde_json::to_string_pretty(&other.to_value())
                .unwrap_or_else(|err| format!("failed to render rows: {err}")),
        }
    }
}

pub type ToolOutcome = Result<ToolOutput, ToolError>;

/// Payload for a tool message: the output, or its error marker.
#[must_use]
pub fn outcome_payload(outcome: &ToolOutcome) -> Value {
    match outcome {
        Ok(output) => output.to_value(),
        Err(err) => err.to_payload(),
    }
}

/// A catalog tool with its arguments decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    VesselVisits,
    InboundVesselsCurrentYear,
    VesselDetails { visit_id: String },
    VisitsToday,
    VesselProductivity { vessel_name: String },
    VesselCranes { visit_id: String },
    VesselLongestCrane,
    InboundVesselsDateRange { start_date: String, end_date: String },
    CraneDelays { visit_id: Option<String> },
}

impl Lookup {
    /// One lookup of every variant, with placeholder arguments.
    #[must_use]
    pub fn samples() -> Vec<Self> {
        let mut samples = Vec::new();
        let mut next = Some(Self::VesselVisits);
        while let Some(lookup) = next {
            next = lookup.successor();
            samples.push(lookup);
        }
        samples
    }

    /// Every tool name this executor handles.
    pub fn tool_names() -> impl Iterator<Item = &'static str> {
        Self::samples().into_iter().map(|lookup| lookup.tool_name())
    }

    // Exhaustive so a new variant has to be chained into `samples`.
    fn successor(&self) -> Option<Self> {
        let sample = || "sample".to_string();
        match self {
            Self::VesselVisits => Some(Self::InboundVesselsCurrentYear),
            Self::InboundVesselsCurrentYear => Some(Self::VesselDetails { visit_id: sample() }),
            Self::VesselDetails { .. } => Some(Self::VisitsToday),
            Self::VisitsToday => Some(Self::VesselProductivity {
                vessel_name: sample(),
            }),
            Self::VesselProductivity { .. } => Some(Self::VesselCranes { visit_id: sample() }),
            Self::VesselCranes { .. } => Some(Self::VesselLongestCrane),
            Self::VesselLongestCrane => Some(Self::InboundVesselsDateRange {
                start_date: sample(),
                end_date: sample(),
            }),
            Self::InboundVesselsDateRange { .. } => Some(Self::CraneDelays { visit_id: None }),
            Self::CraneDelays { .. } => None,
        }
    }

    /// Decodes `arguments` against the descriptor registered for `name`.
    ///
    /// # Errors
    /// Returns `UnknownTool` for names outside the catalog, `MissingArgument`
    /// when a required parameter is absent or null, and `InvalidArgument`
    /// when a parameter is an object or array.
    pub fn decode(name: &str, arguments: &Map<String, Value>) -> Result<Self, ToolError> {
        let Some(descriptor) = catalog::descriptor(name) else {
            return Err(ToolError::UnknownTool(name.to_string()));
        };
        let args = Arguments {
            tool: descriptor.name,
            values: arguments,
        };

        let lookup = match descriptor.name {
            GET_VESSEL_VISITS => Self::VesselVisits,
            GET_INBOUND_VESSELS_CURRENT_YEAR => Self::InboundVesselsCurrentYear,
            GET_VESSEL_DETAILS => Self::VesselDetails {
                visit_id: args.required("visitId")?,
            },
            GET_VISITS_TODAY => Self::VisitsToday,
            GET_VESSEL_PRODUCTIVITY => Self::VesselProductivity {
                vessel_name: args.required("vesselName")?,
            },
            GET_VESSEL_CRANES => Self::VesselCranes {
                visit_id: args.required("visitId")?,
            },
            GET_VESSEL_LONGEST_CRANE => Self::VesselLongestCrane,
            GET_INBOUND_VESSELS_DATE_RANGE => Self::InboundVesselsDateRange {
                start_date: args.required("startDate")?,
                end_date: args.required("endDate")?,
            },
            GET_CRANE_DELAYS => Self::CraneDelays {
                visit_id: args.optional("visitId")?.filter(|id| !id.is_empty()),
            },
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(lookup)
    }

    #[must_use]
    pub const fn tool_name(&self) -> &'static str {
        match self {
            Self::VesselVisits => GET_VESSEL_VISITS,
            Self::InboundVesselsCurrentYear => GET_INBOUND_VESSELS_CURRENT_YEAR,
            Self::VesselDetails { .. } => GET_VESSEL_DETAILS,
            Self::VisitsToday => GET_VISITS_TODAY,
            Self::VesselProductivity { .. } => GET_VESSEL_PRODUCTIVITY,
            Self::VesselCranes { .. } => GET_VESSEL_CRANES,
            Self::VesselLongestCrane => GET_VESSEL_LONGEST_CRANE,
            Self::InboundVesselsDateRange { .. } => GET_INBOUND_VESSELS_DATE_RANGE,
            Self::CraneDelays { .. } => GET_CRANE_DELAYS,
        }
    }

    /// Statement and positional parameters in descriptor order.
    #[must_use]
    pub fn statement(&self) -> (Query, Vec<SqlParam>) {
        match self {
            Self::VesselVisits => (Query::VesselVisits, Vec::new()),
            Self::InboundVesselsCurrentYear => (Query::InboundCurrentYear, Vec::new()),
            Self::VesselDetails { visit_id } => {
                (Query::VesselDetails, vec![SqlParam::text(visit_id.as_str())])
            }
            Self::VisitsToday => (Query::VisitsToday, Vec::new()),
            Self::VesselProductivity { vessel_name } => (
                Query::VesselProductivity,
                vec![SqlParam::text(format!("%{vessel_name}%"))],
            ),
            Self::VesselCranes { visit_id } => {
                (Query::VesselCranes, vec![SqlParam::text(visit_id.as_str())])
            }
            Self::VesselLongestCrane => (Query::LongestCrane, Vec::new()),
            Self::InboundVesselsDateRange {
                start_date,
                end_date,
            } => (
                Query::InboundDateRange,
                vec![
                    SqlParam::text(start_date.as_str()),
                    SqlParam::text(end_date.as_str()),
                ],
            ),
            // The filter is `(? IS NULL OR id = ?)`, so the same value binds twice.
            Self::CraneDelays { visit_id } => {
                let param = SqlParam::optional(visit_id.as_deref());
                (Query::CraneDelays, vec![param.clone(), param])
            }
        }
    }

    fn shape(&self, rows: Vec<Row>) -> ToolOutput {
        match self {
            Self::VesselDetails { visit_id } => rows.into_iter().next().map_or_else(
                || ToolOutput::NotFound(format!("No vessel found with visit ID: {visit_id}")),
                ToolOutput::Record,
            ),
            Self::VesselProductivity { vessel_name } if rows.is_empty() => ToolOutput::NotFound(
                format!("No productivity data found for vessel: {vessel_name}"),
            ),
            _ => ToolOutput::Rows(rows),
        }
    }
}

struct Arguments<'a> {
    tool: &'static str,
    values: &'a Map<String, Value>,
}

impl Arguments<'_> {
    fn required(&self, name: &'static str) -> Result<String, ToolError> {
        self.optional(name)?.ok_or_else(|| ToolError::MissingArgument {
            tool: self.tool.to_string(),
            argument: name,
        })
    }

    // Scalars are passed through as text; the driver's parameter binding
    // decides how they compare.
    fn optional(&self, name: &'static str) -> Result<Option<String>, ToolError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(Value::Number(value)) => Ok(Some(value.to_string())),
            Some(Value::Bool(value)) => Ok(Some(value.to_string())),
            Some(Value::Array(_) | Value::Object(_)) => Err(ToolError::InvalidArgument {
                tool: self.tool.to_string(),
                argument: name,
            }),
        }
    }
}

/// Runs catalog lookups against a [`TerminalStore`].
#[derive(Debug, Clone)]
pub struct ToolExecutor<S> {
    store: S,
}

impl<S: TerminalStore> ToolExecutor<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Decodes and runs one invocation.
    ///
    /// # Errors
    /// Returns `ToolError` for unknown tools, bad arguments, or store faults.
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> ToolOutcome {
        let lookup = Lookup::decode(name, arguments).inspect_err(|err| {
            warn!(tool = name, error = %err, "rejected tool invocation");
        })?;
        self.run(&lookup).await
    }

    /// Like [`execute`](Self::execute), taking the argument object as JSON
    /// text the way a model emits it. Blank text means no arguments.
    ///
    /// # Errors
    /// Returns `MalformedArguments` if the text is not a JSON object, otherwise
    /// as [`execute`](Self::execute).
    pub async fn execute_json(&self, name: &str, arguments: &str) -> ToolOutcome {
        let arguments = parse_arguments(name, arguments).inspect_err(|err| {
            warn!(tool = name, error = %err, "rejected tool invocation");
        })?;
        self.execute(name, &arguments).await
    }

    /// Runs an already decoded lookup.
    ///
    /// # Errors
    /// Returns `ToolError::Store` if the query fails or times out.
    pub async fn run(&self, lookup: &Lookup) -> ToolOutcome {
        let tool = lookup.tool_name();
        let (query, params) = lookup.statement();
        let started = Instant::now();

        let rows = self.store.fetch(query, params).await.inspect_err(|err| {
            warn!(tool, error = %err, "lookup failed");
        })?;
        debug!(
            tool,
            rows = rows.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "lookup complete"
        );
        Ok(lookup.shape(rows))
    }
}

fn parse_arguments(tool: &str, text: &str) -> Result<Map<String, Value>, ToolError> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    let malformed = |message: String| ToolError::MalformedArguments {
        tool: tool.to_string(),
        message,
    };
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(malformed(format!("expected an object, got {other}"))),
        Err(err) => Err(malformed(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticStore;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("arguments must be an object"),
        }
    }

    fn row(value: Value) -> Row {
        args(value)
    }

    #[tokio::test]
    async fn unknown_tool_never_reaches_the_store() {
        let store = StaticStore::new();
        let executor = ToolExecutor::new(store.clone());

        let outcome = executor.execute("drop_tables", &Map::new()).await;

        assert_eq!(
            outcome_payload(&outcome),
            json!({ "error": "Unknown function: drop_tables" })
        );
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_required_argument_is_reported() {
        let store = StaticStore::new();
        let executor = ToolExecutor::new(store.clone());

        let outcome = executor.execute(GET_VESSEL_DETAILS, &Map::new()).await;

        assert!(matches!(
            outcome,
            Err(ToolError::MissingArgument { argument: "visitId", .. })
        ));
        assert_eq!(
            outcome_payload(&outcome),
            json!({ "error": "visitId is required" })
        );
        assert!(store.calls().is_empty());

        let outcome = executor
            .execute(GET_VESSEL_CRANES, &args(json!({ "visitId": null })))
            .await;
        assert!(matches!(outcome, Err(ToolError::MissingArgument { .. })));
    }

    #[tokio::test]
    async fn structured_argument_is_rejected() {
        let executor = ToolExecutor::new(StaticStore::new());
        let outcome = executor
            .execute(GET_VESSEL_DETAILS, &args(json!({ "visitId": ["TNG001"] })))
            .await;
        assert!(matches!(outcome, Err(ToolError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn numeric_argument_binds_as_text() {
        let store = StaticStore::new();
        let executor = ToolExecutor::new(store.clone());

        let _ = executor
            .execute(GET_VESSEL_CRANES, &args(json!({ "visitId": 42 })))
            .await;

        assert_eq!(
            store.calls(),
            vec![(Query::VesselCranes, vec![SqlParam::text("42")])]
        );
    }

    #[tokio::test]
    async fn crane_delays_binds_null_twice_without_filter() {
        let store = StaticStore::new();
        let executor = ToolExecutor::new(store.clone());

        let _ = executor.execute(GET_CRANE_DELAYS, &Map::new()).await;
        let _ = executor
            .execute(GET_CRANE_DELAYS, &args(json!({ "visitId": "" })))
            .await;
        let _ = executor
            .execute(GET_CRANE_DELAYS, &args(json!({ "visitId": "TNG001" })))
            .await;

        assert_eq!(
            store.calls(),
            vec![
                (Query::CraneDelays, vec![SqlParam::Null, SqlParam::Null]),
                (Query::CraneDelays, vec![SqlParam::Null, SqlParam::Null]),
                (
                    Query::CraneDelays,
                    vec![SqlParam::text("TNG001"), SqlParam::text("TNG001")]
                ),
            ]
        );
    }

    #[tokio::test]
    async fn parameters_follow_descriptor_order() {
        let store = StaticStore::new();
        let executor = ToolExecutor::new(store.clone());

        let _ = executor
            .execute(
                GET_INBOUND_VESSELS_DATE_RANGE,
                &args(json!({ "endDate": "2024-02-01", "startDate": "2024-01-01" })),
            )
            .await;
        let _ = executor
            .execute(GET_VESSEL_PRODUCTIVITY, &args(json!({ "vesselName": "MAERSK" })))
            .await;

        assert_eq!(
            store.calls(),
            vec![
                (
                    Query::InboundDateRange,
                    vec![SqlParam::text("2024-01-01"), SqlParam::text("2024-02-01")]
                ),
                (Query::VesselProductivity, vec![SqlParam::text("%MAERSK%")]),
            ]
        );
    }

    #[tokio::test]
    async fn unmatched_visit_is_a_textual_result() {
        let executor = ToolExecutor::new(StaticStore::new());

        let outcome = executor
            .execute(GET_VESSEL_DETAILS, &args(json!({ "visitId": "NOPE01" })))
            .await
            .expect("empty result is not an error");

        assert_eq!(
            outcome,
            ToolOutput::NotFound("No vessel found with visit ID: NOPE01".to_string())
        );
        assert_eq!(outcome.to_text(), "No vessel found with visit ID: NOPE01");
    }

    #[tokio::test]
    async fn vessel_details_returns_first_row() {
        let store = StaticStore::new().with_rows(
            Query::VesselDetails,
            vec![
                row(json!({ "visitId": "TNG001", "phase": "WORKING" })),
                row(json!({ "visitId": "TNG001", "phase": "DUPLICATE" })),
            ],
        );
        let executor = ToolExecutor::new(store);

        let outcome = executor
            .execute(GET_VESSEL_DETAILS, &args(json!({ "visitId": "TNG001" })))
            .await;

        assert_eq!(
            outcome_payload(&outcome),
            json!({ "visitId": "TNG001", "phase": "WORKING" })
        );
    }

    #[tokio::test]
    async fn store_fault_is_folded_into_payload() {
        let store = StaticStore::new().with_failure(Query::VisitsToday, "connection reset");
        let executor = ToolExecutor::new(store);

        let outcome = executor.execute(GET_VISITS_TODAY, &Map::new()).await;

        assert_eq!(
            outcome_payload(&outcome),
            json!({ "error": "database query failed: connection reset" })
        );
    }

    #[tokio::test]
    async fn repeated_invocation_is_idempotent() {
        let store = StaticStore::new().with_rows(
            Query::VesselVisits,
            vec![row(json!({ "visitId": "TNG001", "totalExecutedMoves": 120 }))],
        );
        let executor = ToolExecutor::new(store);

        let first = executor.execute(GET_VESSEL_VISITS, &Map::new()).await;
        let second = executor.execute(GET_VESSEL_VISITS, &Map::new()).await;

        assert_eq!(outcome_payload(&first), outcome_payload(&second));
    }

    #[test]
    fn every_lookup_binds_its_statement_arity() {
        for descriptor in catalog::CATALOG {
            let sample: Map<String, Value> = descriptor
                .params
                .iter()
                .map(|param| (param.name.to_string(), json!("2024-01-01")))
                .collect();
            let lookup = Lookup::decode(descriptor.name, &sample).expect("decodes");
            let (query, params) = lookup.statement();
            assert_eq!(params.len(), query.arity(), "{}", descriptor.name);
        }
    }

    #[test]
    fn samples_cover_every_catalog_tool_once() {
        let names: Vec<&str> = Lookup::tool_names().collect();
        let unique: std::collections::HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len());
        assert_eq!(names.len(), catalog::CATALOG.len());
        for descriptor in catalog::CATALOG {
            assert!(names.contains(&descriptor.name), "{} has no sample", descriptor.name);
        }
    }

    #[test]
    fn every_sample_binds_its_statement_arity() {
        for lookup in Lookup::samples() {
            let (query, params) = lookup.statement();
            assert_eq!(params.len(), query.arity(), "{}", lookup.tool_name());
        }
    }

    #[tokio::test]
    async fn argument_text_must_be_an_object() {
        let store = StaticStore::new();
        let executor = ToolExecutor::new(store.clone());

        let outcome = executor.execute_json(GET_VESSEL_DETAILS, "{not json").await;
        assert!(matches!(outcome, Err(ToolError::MalformedArguments { .. })));

        let outcome = executor.execute_json(GET_VESSEL_DETAILS, "[1, 2]").await;
        assert!(matches!(outcome, Err(ToolError::MalformedArguments { .. })));

        let outcome = executor.execute_json(GET_VISITS_TODAY, "").await;
        assert!(outcome.is_ok());
        assert_eq!(store.calls().len(), 1);
    }
}
