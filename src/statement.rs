//! Statement synthesis for the graph store's textual mutation language.
//!
//! The store only accepts a closed set of scalar kinds in property values, so
//! the serializer is a closed enum rather than an any-JSON converter: a field
//! that is not text, integer, or floating-point cannot be represented at all
//! instead of being silently dropped.

/// A scalar property value, in the only three kinds the store schema uses.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl ScalarValue {
    /// Render the literal form for embedding in a statement.
    ///
    /// Text is double-quoted with backslashes and embedded quotes escaped;
    /// newlines are deleted outright because the statement language does not
    /// allow them inside quoted literals. Floats are fixed-point with exactly
    /// 20 fractional digits so rendering never falls back to scientific
    /// notation or locale-dependent truncation.
    pub fn to_literal(&self) -> String {
        match self {
            ScalarValue::Text(s) => {
                let cleaned = s.replace('\n', "");
                format!("\"{}\"", cleaned.replace('\\', "\\\\").replace('"', "\\\""))
            }
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(f) => format!("{:.20}", f),
        }
    }
}

/// Build an idempotent vertex insert. `NO OVERWRITE` makes a re-insert of an
/// existing id a silent no-op, never a property update.
pub fn build_vertex_statement(id: i64, properties: &[(&str, ScalarValue)]) -> String {
    let names: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    let values: Vec<String> = properties.iter().map(|(_, v)| v.to_literal()).collect();
    format!(
        "INSERT VERTEX NO OVERWRITE node({}) VALUES {}:({});",
        names.join(","),
        id,
        values.join(",")
    )
}

/// Build an idempotent edge insert between two vertex ids. The store rejects
/// the statement if either endpoint vertex does not exist yet.
pub fn build_edge_statement(from_id: i64, to_id: i64, properties: &[(&str, ScalarValue)]) -> String {
    let names: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    let values: Vec<String> = properties.iter().map(|(_, v)| v.to_literal()).collect();
    format!(
        "INSERT EDGE NO OVERWRITE related({}) VALUES {} -> {}:({});",
        names.join(","),
        from_id,
        to_id,
        values.join(",")
    )
}
