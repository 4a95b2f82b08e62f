//! Fixed schema definition submitted verbatim to the store.
//!
//! Every clause uses IF NOT EXISTS so reruns against an already-provisioned
//! store are no-ops.

pub const SPACE_NAME: &str = "bgm";

const CREATE_SPACE: &str = "CREATE SPACE IF NOT EXISTS bgm;";
const USE_SPACE: &str = "USE bgm;";
const CREATE_NODE_TAG: &str = "CREATE TAG IF NOT EXISTS node(\
name                string,\
labels              string DEFAULT \"\",\
type                int,\
rating_score        double DEFAULT 0.0\
);";
const CREATE_RELATED_EDGE: &str = "CREATE EDGE IF NOT EXISTS related(type string);";

/// Trivial statement that only succeeds once the schema change has become
/// queryable; used by the post-schema readiness probe.
pub const SCHEMA_PROBE: &str = "USE bgm;DESCRIBE TAG node;";

/// The complete multi-statement schema block, assembled once from the named
/// sub-clauses above.
pub fn schema_statement() -> String {
    [CREATE_SPACE, USE_SPACE, CREATE_NODE_TAG, CREATE_RELATED_EDGE].concat()
}
