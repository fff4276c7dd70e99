// verity-core/src/infrastructure/compiler/jinja.rs
//
// Bridges templated model SQL ({{ ref(...) }}, {{ source(...) }}) into
// plain SQL with opaque placeholders the materializer resolves later.
// `ref`/`source` do not resolve to real names here: at parse time we only
// know a model's own graph position, not the active connection's
// database/schema, so resolution is deferred to the `Materializer`.

use crate::application::ports::TemplateEngine;
use crate::error::VerityError;
use crate::infrastructure::error::InfrastructureError;
use minijinja::Environment;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

pub struct RenderedTemplate {
    pub rendered_source: String,
    pub refs: BTreeSet<String>,
    pub sources: BTreeSet<(String, String)>,
}

/// Stable placeholder emitted for a `ref(name)` call; resolved to the
/// model's fully-qualified warehouse name by the materializer.
pub fn ref_placeholder(name: &str) -> String {
    format!("__REF_{name}__")
}

/// Stable placeholder emitted for a `source(src, tbl)` call.
pub fn source_placeholder(src: &str, tbl: &str) -> String {
    format!("__SOURCE_{src}_{tbl}__")
}

pub const THIS_PLACEHOLDER: &str = "__THIS__";

pub struct JinjaRenderer;

impl JinjaRenderer {
    pub fn new() -> Self {
        JinjaRenderer
    }

    /// Renders one model's raw SQL, recording every `ref`/`source` call
    /// encountered along the way. `is_incremental()` always evaluates to
    /// `false` during parsing; the runtime value is only meaningful once a
    /// materialization strategy is actually executing.
    pub fn render_model(&self, raw_sql: &str) -> Result<RenderedTemplate, InfrastructureError> {
        let refs: Rc<RefCell<BTreeSet<String>>> = Rc::new(RefCell::new(BTreeSet::new()));
        let sources: Rc<RefCell<BTreeSet<(String, String)>>> = Rc::new(RefCell::new(BTreeSet::new()));

        let mut env = Environment::new();

        {
            let refs = Rc::clone(&refs);
            env.add_function("ref", move |name: String| -> String {
                refs.borrow_mut().insert(name.clone());
                ref_placeholder(&name)
            });
        }
        {
            let sources = Rc::clone(&sources);
            env.add_function("source", move |src: String, tbl: String| -> String {
                sources.borrow_mut().insert((src.clone(), tbl.clone()));
                source_placeholder(&src, &tbl)
            });
        }
        env.add_function("this", || -> String { THIS_PLACEHOLDER.to_string() });
        env.add_function("is_incremental", || -> bool { false });

        // Domain macros are pure text templates: they expand inline and
        // carry no semantics the parser needs to track.
        env.add_function(
            "cdc_merge",
            |target: String, staging: String, key: String| -> String {
                format!(
                    "MERGE INTO {target} USING {staging} ON {target}.{key} = {staging}.{key}"
                )
            },
        );
        env.add_function("cdc_filter", |column: String, value: String| -> String {
            format!("{column} = '{value}'")
        });
        env.add_function("bronze", |table: String| -> String { format!("bronze.{table}") });
        env.add_function("silver", |table: String| -> String { format!("silver.{table}") });
        env.add_function("gold", |table: String| -> String { format!("gold.{table}") });

        env.add_filter("upper", |value: &str| Ok(value.to_uppercase()));
        env.add_filter("lower", |value: &str| Ok(value.to_lowercase()));

        let rendered = env
            .render_str(raw_sql, ())
            .map_err(InfrastructureError::TemplateError)?;

        let refs = Rc::try_unwrap(refs)
            .map(RefCell::into_inner)
            .unwrap_or_default();
        let sources = Rc::try_unwrap(sources)
            .map(RefCell::into_inner)
            .unwrap_or_default();

        Ok(RenderedTemplate {
            rendered_source: rendered,
            refs,
            sources,
        })
    }
}

impl Default for JinjaRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for JinjaRenderer {
    fn render(&self, template: &str, context: &serde_json::Value) -> Result<String, VerityError> {
        let env = Environment::new();
        env.render_str(template, context)
            .map_err(|e| VerityError::Infrastructure(InfrastructureError::TemplateError(e)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ref_emits_placeholder_and_is_recorded() {
        let renderer = JinjaRenderer::new();
        let result = renderer
            .render_model("SELECT * FROM {{ ref('stg_users') }}")
            .unwrap();
        assert_eq!(result.rendered_source, "SELECT * FROM __REF_stg_users__");
        assert!(result.refs.contains("stg_users"));
    }

    #[test]
    fn source_emits_placeholder_and_is_recorded() {
        let renderer = JinjaRenderer::new();
        let result = renderer
            .render_model("SELECT * FROM {{ source('shopify', 'orders') }}")
            .unwrap();
        assert_eq!(
            result.rendered_source,
            "SELECT * FROM __SOURCE_shopify_orders__"
        );
        assert!(result.sources.contains(&("shopify".to_string(), "orders".to_string())));
    }

    #[test]
    fn is_incremental_is_always_false_at_parse_time() {
        let renderer = JinjaRenderer::new();
        let result = renderer
            .render_model("{% if is_incremental() %}WHERE 1=1{% else %}{% endif %}")
            .unwrap();
        assert_eq!(result.rendered_source, "");
    }

    #[test]
    fn this_emits_stable_placeholder() {
        let renderer = JinjaRenderer::new();
        let result = renderer.render_model("{{ this() }}").unwrap();
        assert_eq!(result.rendered_source, THIS_PLACEHOLDER);
    }
}
