pub const TABLE_CARRIER_VISIT: &str = "argo_carrier_visit";

/// Table whose presence marks the schema as installed.
pub const SENTINEL_TABLE: &str = TABLE_CARRIER_VISIT;

/// Binds: schema name, table name.
pub const SCHEMA_PROBE_SQL: &str =
    "SELECT COUNT(*) AS count FROM information_schema.tables WHERE table_schema = ? AND table_name = ?";
