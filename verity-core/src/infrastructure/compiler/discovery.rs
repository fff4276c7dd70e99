// verity-core/src/infrastructure/compiler/discovery.rs
//
// `SqlParser`: turns a directory of `.sql` model files into `ParsedModel`s.
// Pipeline per file: read source -> scan header comments for inline config
// and static depends_on -> render through `JinjaRenderer` (ref/source become
// stable placeholders) -> extract `$variable` references -> walk the
// rendered SELECT's AST for column lineage -> hash the raw content.
//
// A file-level cache keyed by `(path, content_hash)` skips re-parsing work
// for files that have not changed since the last scan.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use walkdir::WalkDir;

use crate::domain::compiler::extract_column_lineage;
use crate::domain::error::DomainError;
use crate::domain::lineage::ModelLineage;
use crate::domain::ports::ManifestLoader;
use crate::domain::project::manifest::{Manifest, ManifestNode, ParsedModel, ResourceType};
use crate::domain::project::model_config::ConfigOverrides;
use crate::domain::project::ProjectConfig;
use crate::domain::ports::SchemaSource;
use crate::infrastructure::compiler::jinja::JinjaRenderer;
use crate::infrastructure::config::{load_sources, ModelRegistry};
use crate::infrastructure::error::InfrastructureError;

fn header_config_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^--\s*config:\s*(.+)$").expect("static header config pattern is valid")
    })
}

fn header_depends_on_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^--\s*depends_on:\s*(.+)$")
            .expect("static header depends_on pattern is valid")
    })
}

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)").expect("static variable pattern is valid")
    })
}

struct CacheEntry {
    content_hash: String,
    parsed: ParsedModel,
}

/// Parses `.sql` model files, one at a time or a whole directory, caching
/// results by `(path, content_hash)` so an unchanged file is never
/// re-rendered or re-walked.
pub struct SqlParser {
    renderer: JinjaRenderer,
    cache: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl SqlParser {
    pub fn new() -> Self {
        SqlParser {
            renderer: JinjaRenderer::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Parses a single model file. Uses the cache when the file's content
    /// hash matches a previously-parsed entry for the same path.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedModel, InfrastructureError> {
        let raw_source = std::fs::read_to_string(path)?;
        let content_hash = hash_content(&raw_source);

        if let Some(cached) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(path) {
            if cached.content_hash == content_hash {
                return Ok(cached.parsed.clone());
            }
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| {
                InfrastructureError::ConfigError(format!("invalid model filename: {:?}", path))
            })?;

        let config_overrides = parse_header_config(&raw_source);
        let static_depends_on = parse_header_depends_on(&raw_source);

        let rendered = self.renderer.render_model(&raw_source)?;

        let variables: BTreeSet<String> = variable_re()
            .captures_iter(&rendered.rendered_source)
            .map(|c| c[1].to_string())
            .collect();

        let columns = extract_column_lineage(&rendered.rendered_source).unwrap_or_default();
        let mut lineage = ModelLineage::new(&name);
        for column in columns {
            lineage.add_column(column);
        }
        for dep in rendered.refs.iter().chain(static_depends_on.iter()) {
            lineage.dependencies.insert(dep.clone());
        }

        let mut refs = rendered.refs;
        refs.remove(&name);

        let parsed = ParsedModel {
            name: name.clone(),
            file_path: path.to_path_buf(),
            raw_source,
            rendered_source: rendered.rendered_source,
            variables,
            refs,
            sources: rendered.sources,
            config_overrides,
            static_depends_on,
            lineage,
            content_hash: content_hash.clone(),
        };

        self.cache.lock().unwrap_or_else(|e| e.into_inner()).insert(
            path.to_path_buf(),
            CacheEntry {
                content_hash,
                parsed: parsed.clone(),
            },
        );

        Ok(parsed)
    }

    /// Parses every `.sql` file under `dir`. A single bad file does not
    /// abort the scan: its error is recorded and the rest continue.
    pub fn parse_directory(
        &self,
        dir: &Path,
    ) -> (HashMap<String, ParsedModel>, Vec<(PathBuf, InfrastructureError)>) {
        let mut parsed = HashMap::new();
        let mut errors = Vec::new();

        if !dir.exists() {
            return (parsed, errors);
        }

        for entry in WalkDir::new(dir).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "sql") {
                match self.parse_file(path) {
                    Ok(model) => {
                        parsed.insert(model.name.clone(), model);
                    }
                    Err(e) => errors.push((path.to_path_buf(), e)),
                }
            }
        }

        (parsed, errors)
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `-- config: materialized=table, unique_key=id` -> `{"materialized": "table", "unique_key": "id"}`.
fn parse_header_config(source: &str) -> ConfigOverrides {
    let mut overrides = ConfigOverrides::new();
    for caps in header_config_re().captures_iter(source) {
        for pair in caps[1].split(',') {
            if let Some((k, v)) = pair.split_once('=') {
                overrides.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }
    overrides
}

/// `-- depends_on: stg_orders, stg_customers` -> `["stg_orders", "stg_customers"]`.
fn parse_header_depends_on(source: &str) -> Vec<String> {
    let mut deps = Vec::new();
    for caps in header_depends_on_re().captures_iter(source) {
        for name in caps[1].split(',') {
            let name = name.trim();
            if !name.is_empty() {
                deps.push(name.to_string());
            }
        }
    }
    deps
}

/// Combines `SqlParser` with a `SchemaSource` and the sources file to
/// implement the `ManifestLoader` port: a full directory scan merged
/// with YAML-sourced `ModelConfig`s into one `Manifest`.
pub struct GraphDiscovery {
    parser: SqlParser,
    registry: ModelRegistry,
}

impl GraphDiscovery {
    pub fn new() -> Self {
        GraphDiscovery {
            parser: SqlParser::new(),
            registry: ModelRegistry::new(),
        }
    }
}

impl Default for GraphDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestLoader for GraphDiscovery {
    fn load(&self, root: &Path, config: &ProjectConfig) -> Result<Manifest, DomainError> {
        let models_dir = config
            .model_paths
            .first()
            .map(|p| root.join(p))
            .unwrap_or_else(|| root.join("models"));

        let (parsed_models, errors) = self.parser.parse_directory(&models_dir);
        for (path, err) in &errors {
            tracing::warn!(path = ?path, error = %err, "skipping model that failed to parse");
        }

        let configs = self.registry.load_configs(root)?;

        let mut nodes = HashMap::new();
        for (name, parsed) in parsed_models {
            let config = configs
                .get(&name)
                .cloned()
                .unwrap_or_default()
                .with_overrides(&parsed.config_overrides);
            nodes.insert(
                name.clone(),
                ManifestNode {
                    name,
                    resource_type: ResourceType::Model,
                    parsed,
                    config,
                },
            );
        }

        let sources = load_sources(root)
            .map_err(|e| DomainError::ManifestError(format!("failed to load sources: {e}")))?;

        Ok(Manifest {
            project_name: config.name.clone(),
            nodes,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_header_config_and_depends_on() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("revenue.sql"),
            "-- config: materialized=table, unique_key=order_id\n-- depends_on: stg_orders\nSELECT order_id, amount FROM {{ ref('stg_orders') }}",
        )
        .unwrap();

        let parser = SqlParser::new();
        let model = parser.parse_file(&dir.path().join("revenue.sql")).unwrap();

        assert_eq!(model.config_overrides.get("materialized").unwrap(), "table");
        assert_eq!(model.config_overrides.get("unique_key").unwrap(), "order_id");
        assert_eq!(model.static_depends_on, vec!["stg_orders".to_string()]);
        assert!(model.refs.contains("stg_orders"));
    }

    #[test]
    fn extracts_dollar_variables() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("m.sql"),
            "SELECT * FROM orders WHERE region = $region",
        )
        .unwrap();

        let parser = SqlParser::new();
        let model = parser.parse_file(&dir.path().join("m.sql")).unwrap();
        assert!(model.variables.contains("region"));
    }

    #[test]
    fn cache_hit_returns_same_content_hash_without_rereading_refs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.sql");
        std::fs::write(&path, "SELECT 1 AS one").unwrap();

        let parser = SqlParser::new();
        let first = parser.parse_file(&path).unwrap();
        let second = parser.parse_file(&path).unwrap();
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn header_config_overrides_win_over_schema_yaml() {
        use crate::domain::project::model_config::MaterializationType;

        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(
            dir.path().join("models/revenue.sql"),
            "-- config: materialized=table\nSELECT 1 AS amount",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("schema.yml"),
            "models:\n  - name: revenue\n    config:\n      materialized: view\n",
        )
        .unwrap();

        let discovery = GraphDiscovery::new();
        let config = ProjectConfig {
            name: "test".into(),
            version: "1".into(),
            profile: "dev".into(),
            engine: Default::default(),
            config_paths: Vec::new(),
            model_paths: vec!["models".into()],
            target_path: "target".into(),
            clean_targets: vec!["target".into()],
            max_parallelism: 8,
            fail_fast: false,
            defaults: HashMap::new(),
        };
        let manifest = discovery.load(dir.path(), &config).unwrap();
        let node = manifest.nodes.get("revenue").unwrap();
        assert_eq!(node.config.materialized, MaterializationType::Table);
    }

    #[test]
    fn directory_scan_skips_bad_files_and_keeps_good_ones() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("good.sql"), "SELECT 1").unwrap();
        std::fs::write(dir.path().join("bad.sql"), "{{ unknown_fn(").unwrap();

        let parser = SqlParser::new();
        let (parsed, errors) = parser.parse_directory(dir.path());
        assert!(parsed.contains_key("good"));
        assert_eq!(errors.len(), 1);
    }
}
