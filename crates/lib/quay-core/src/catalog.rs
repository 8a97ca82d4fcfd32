//! Static catalog of the lookups a caller may invoke.
//!
//! One descriptor per tool, shared by every boundary adapter. Adapters pick a
//! subset through [`Surface`]. Each descriptor must have a matching
//! [`Lookup`](crate::tools::Lookup) variant; [`verify`] checks both directions
//! and is run once at start-up.

use std::collections::HashSet;

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::tools::{Lookup, ToolError};

pub const GET_VESSEL_VISITS: &str = "get_vessel_visits";
pub const GET_INBOUND_VESSELS_CURRENT_YEAR: &str = "get_inbound_vessels_current_year";
pub const GET_VESSEL_DETAILS: &str = "get_vessel_details";
pub const GET_VISITS_TODAY: &str = "get_visits_today";
pub const GET_VESSEL_PRODUCTIVITY: &str = "get_vessel_productivity";
pub const GET_VESSEL_CRANES: &str = "get_vessel_cranes";
pub const GET_VESSEL_LONGEST_CRANE: &str = "get_vessel_longest_crane";
pub const GET_INBOUND_VESSELS_DATE_RANGE: &str = "get_inbound_vessels_date_range";
pub const GET_CRANE_DELAYS: &str = "get_crane_delays";

/// Boundary adapter a descriptor is exposed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// Offered to the language model by the chat endpoint.
    Chat,
    /// Listed by the direct tool protocol server.
    Protocol,
}

const BOTH: &[Surface] = &[Surface::Chat, Surface::Protocol];
const CHAT_ONLY: &[Surface] = &[Surface::Chat];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Text,
    /// Calendar date as `YYYY-MM-DD` text.
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    pub surfaces: &'static [Surface],
}

impl ToolDescriptor {
    #[must_use]
    pub fn exposed_on(&self, surface: Surface) -> bool {
        self.surfaces.contains(&surface)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter().filter(|param| param.required)
    }

    /// JSON Schema for the argument object, as sent to the model.
    #[must_use]
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in self.params {
            let mut property = json!({
                "type": "string",
                "description": param.description,
            });
            if param.kind == ParamKind::Date {
                property["format"] = Value::from("date");
            }
            properties.insert(param.name.to_string(), property);
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        let required: Vec<&str> = self.required_params().map(|param| param.name).collect();
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

const VISIT_ID: ParamSpec = ParamSpec {
    name: "visitId",
    kind: ParamKind::Text,
    required: true,
    description: "The visit ID of the vessel (e.g., \"TNG001\")",
};

pub const CATALOG: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: GET_VESSEL_VISITS,
        description: "Get all vessel visits with their status, planned and executed moves. Returns up to 100 most recent visits, including inbound, arrived, working, complete, departed, and closed vessels.",
        params: &[],
        surfaces: BOTH,
    },
    ToolDescriptor {
        name: GET_INBOUND_VESSELS_CURRENT_YEAR,
        description: "Get all inbound vessels for the current year with details including ETA, ETD, port hours, and estimated moves.",
        params: &[],
        surfaces: BOTH,
    },
    ToolDescriptor {
        name: GET_VESSEL_DETAILS,
        description: "Get detailed information about a specific vessel visit including service, phase, times (allfast, first lift, first line, ATD), port hours, estimated moves, and idle times.",
        params: &[VISIT_ID],
        surfaces: BOTH,
    },
    ToolDescriptor {
        name: GET_VISITS_TODAY,
        description: "Get all vessel visits scheduled for today at the terminal. Useful for answering questions like \"what visits are at Tangier terminal today?\"",
        params: &[],
        surfaces: BOTH,
    },
    ToolDescriptor {
        name: GET_VESSEL_PRODUCTIVITY,
        description: "Get vessel productivity metrics including CMPH (Container Moves Per Hour) for a specific vessel. Returns total moves, working hours, and CMPH calculation.",
        params: &[ParamSpec {
            name: "vesselName",
            kind: ParamKind::Text,
            required: true,
            description: "The name of the vessel (partial match supported, e.g., \"MAERSK\")",
        }],
        surfaces: BOTH,
    },
    ToolDescriptor {
        name: GET_VESSEL_CRANES,
        description: "Get all cranes that worked on a specific vessel visit with their first and last move times. Shows crane allocation and timing.",
        params: &[VISIT_ID],
        surfaces: CHAT_ONLY,
    },
    ToolDescriptor {
        name: GET_VESSEL_LONGEST_CRANE,
        description: "Get the crane with the longest estimated move time for vessels currently in WORKING phase. Useful for identifying the critical path crane.",
        params: &[],
        surfaces: CHAT_ONLY,
    },
    ToolDescriptor {
        name: GET_INBOUND_VESSELS_DATE_RANGE,
        description: "Get all inbound vessels within a specific date range. Returns vessel details with ETA, ETD, port hours, and estimated moves.",
        params: &[
            ParamSpec {
                name: "startDate",
                kind: ParamKind::Date,
                required: true,
                description: "Start date in YYYY-MM-DD format",
            },
            ParamSpec {
                name: "endDate",
                kind: ParamKind::Date,
                required: true,
                description: "End date in YYYY-MM-DD format",
            },
        ],
        surfaces: CHAT_ONLY,
    },
    ToolDescriptor {
        name: GET_CRANE_DELAYS,
        description: "Get historical crane delay information including delay codes, descriptions, and durations. Can be filtered by vessel visit ID.",
        params: &[ParamSpec {
            name: "visitId",
            kind: ParamKind::Text,
            required: false,
            description: "Optional vessel visit ID to filter delays. If not provided, returns all delays.",
        }],
        surfaces: CHAT_ONLY,
    },
];

/// Looks up a descriptor by tool name.
#[must_use]
pub fn descriptor(name: &str) -> Option<&'static ToolDescriptor> {
    CATALOG.iter().find(|descriptor| descriptor.name == name)
}

/// Descriptors exposed on `surface`, in catalog order.
pub fn for_surface(surface: Surface) -> impl Iterator<Item = &'static ToolDescriptor> {
    CATALOG
        .iter()
        .filter(move |descriptor| descriptor.exposed_on(surface))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("tool {0} is declared more than once")]
    DuplicateTool(&'static str),
    #[error("tool {name} has no executor: {reason}")]
    OrphanedDescriptor { name: &'static str, reason: String },
    #[error("executor handles {0} but the catalog does not declare it")]
    OrphanedExecutor(&'static str),
    #[error("{surface:?} surface mismatch (missing: {missing:?}, unexpected: {unexpected:?})")]
    SurfaceMismatch {
        surface: Surface,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
}

/// Checks the catalog and the executor agree on the tool set.
///
/// # Errors
/// Returns the first `CatalogError` found.
pub fn verify() -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for descriptor in CATALOG {
        if !seen.insert(descriptor.name) {
            return Err(CatalogError::DuplicateTool(descriptor.name));
        }
        check_descriptor(descriptor)?;
    }
    for name in Lookup::tool_names() {
        if descriptor(name).is_none() {
            return Err(CatalogError::OrphanedExecutor(name));
        }
    }
    Ok(())
}

/// Checks an adapter's registered tool names against the catalog's surface.
///
/// # Errors
/// Returns `CatalogError::SurfaceMismatch` listing the differences.
pub fn verify_surface<'a>(
    surface: Surface,
    registered: impl IntoIterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let registered: HashSet<&str> = registered.into_iter().collect();
    let declared: HashSet<&str> = for_surface(surface).map(|descriptor| descriptor.name).collect();

    let mut missing: Vec<String> = declared
        .difference(&registered)
        .map(|name| (*name).to_string())
        .collect();
    let mut unexpected: Vec<String> = registered
        .difference(&declared)
        .map(|name| (*name).to_string())
        .collect();
    if missing.is_empty() && unexpected.is_empty() {
        return Ok(());
    }
    missing.sort();
    unexpected.sort();
    Err(CatalogError::SurfaceMismatch {
        surface,
        missing,
        unexpected,
    })
}

fn check_descriptor(descriptor: &'static ToolDescriptor) -> Result<(), CatalogError> {
    let sample: Map<String, Value> = descriptor
        .params
        .iter()
        .map(|param| (param.name.to_string(), Value::from("sample")))
        .collect();
    let orphaned = |reason: String| CatalogError::OrphanedDescriptor {
        name: descriptor.name,
        reason,
    };

    let lookup = Lookup::decode(descriptor.name, &sample).map_err(|err| orphaned(err.to_string()))?;
    if lookup.tool_name() != descriptor.name {
        return Err(orphaned(format!("decodes as {}", lookup.tool_name())));
    }

    for param in descriptor.required_params() {
        let mut partial = sample.clone();
        partial.remove(param.name);
        match Lookup::decode(descriptor.name, &partial) {
            Err(ToolError::MissingArgument { .. }) => {}
            _ => {
                return Err(orphaned(format!(
                    "required parameter {} is not enforced",
                    param.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_and_executor_agree() {
        assert_eq!(verify(), Ok(()));
    }

    #[test]
    fn protocol_surface_is_the_narrower_subset() {
        let chat: Vec<&str> = for_surface(Surface::Chat).map(|d| d.name).collect();
        let protocol: Vec<&str> = for_surface(Surface::Protocol).map(|d| d.name).collect();

        assert_eq!(chat.len(), CATALOG.len());
        assert_eq!(
            protocol,
            [
                GET_VESSEL_VISITS,
                GET_INBOUND_VESSELS_CURRENT_YEAR,
                GET_VESSEL_DETAILS,
                GET_VISITS_TODAY,
                GET_VESSEL_PRODUCTIVITY,
            ]
        );
    }

    #[test]
    fn schema_lists_required_parameters_only() {
        let range = descriptor(GET_INBOUND_VESSELS_DATE_RANGE).expect("range tool");
        let schema = range.parameters_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["startDate", "endDate"]));
        assert_eq!(schema["properties"]["startDate"]["format"], "date");

        let delays = descriptor(GET_CRANE_DELAYS).expect("delays tool");
        let schema = delays.parameters_schema();
        assert!(schema.get("required").is_none());
        assert_eq!(schema["properties"]["visitId"]["type"], "string");

        let visits = descriptor(GET_VESSEL_VISITS).expect("visits tool");
        assert_eq!(visits.parameters_schema()["properties"], json!({}));
    }

    #[test]
    fn surface_check_reports_differences() {
        let err = verify_surface(Surface::Protocol, [GET_VESSEL_VISITS, GET_CRANE_DELAYS])
            .expect_err("mismatch expected");
        let CatalogError::SurfaceMismatch {
            missing, unexpected, ..
        } = err
        else {
            panic!("unexpected error variant");
        };
        assert_eq!(missing.len(), 4);
        assert_eq!(unexpected, vec![GET_CRANE_DELAYS.to_string()]);

        let names = for_surface(Surface::Protocol).map(|d| d.name);
        assert_eq!(verify_surface(Surface::Protocol, names), Ok(()));
    }
}
