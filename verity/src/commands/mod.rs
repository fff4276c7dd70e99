// verity/src/commands/mod.rs

mod context;

pub mod deps;
pub mod list;
pub mod plan;
pub mod run;
pub mod serve;
pub mod validate;

/// Parses a `--var name=value` value into a typed JSON value: numbers,
/// booleans, `null`, and quoted strings round-trip through their JSON
/// syntax; anything else is taken as a literal string (so `--var
/// region=EMEA` doesn't require quoting).
pub(crate) fn infer_var_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
