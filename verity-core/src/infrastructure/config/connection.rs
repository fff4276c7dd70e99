// verity-core/src/infrastructure/config/connection.rs
//
// Loads `profiles.yml`: per-target warehouse credentials plus the pool
// knobs the connection pool needs (`pool_size`, `max_retries`,
// `retry_delay`, `query_timeout`, `lazy_init`), grounded in the original
// Python `ConnectionPool` constructor arguments. `${VAR}` / `${VAR:-default}`
// placeholders in string values are substituted from the process
// environment so credentials never need to be committed to the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::domain::project::ProjectConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub target: String,
    pub outputs: HashMap<String, ConnectionOutput>,
}

impl ConnectionProfile {
    /// The output selected by `ProjectConfig::profile`, falling back to
    /// `target` when the profile itself names the active output.
    pub fn active<'a>(&'a self, profile: &str) -> Option<&'a ConnectionOutput> {
        self.outputs.get(profile).or_else(|| self.outputs.get(&self.target))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionOutput {
    #[serde(rename = "type", default = "default_output_type")]
    pub output_type: String,

    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: f64,
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_lazy_init")]
    pub lazy_init: bool,
}

fn default_output_type() -> String {
    "duckdb".to_string()
}
fn default_pool_size() -> usize {
    1
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay() -> f64 {
    1.0
}
fn default_query_timeout() -> u64 {
    300
}
fn default_lazy_init() -> bool {
    true
}

const CANDIDATE_FILENAMES: [&str; 2] = ["profiles.yml", "profiles.yaml"];

/// Loads and resolves the connection profile for the active
/// `ProjectConfig.profile`, substituting `${VAR}`/`${VAR:-default}`
/// placeholders in every string field from the process environment.
pub fn load_connections(project_dir: &Path, config: &ProjectConfig) -> Result<ConnectionProfile> {
    let config_dir = config
        .config_paths
        .first()
        .map(|p| project_dir.join(p))
        .unwrap_or_else(|| project_dir.to_path_buf());

    let path = CANDIDATE_FILENAMES
        .iter()
        .map(|f| config_dir.join(f))
        .chain(CANDIDATE_FILENAMES.iter().map(|f| project_dir.join(f)))
        .find(|p| p.exists())
        .with_context(|| format!("no profiles.yml found under {:?}", config_dir))?;

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read connection profile at {:?}", path))?;
    let substituted = substitute_env(&raw);

    let profile: ConnectionProfile = serde_yaml::from_str(&substituted)
        .with_context(|| format!("failed to parse connection profile at {:?}", path))?;

    Ok(profile)
}

/// Replaces `${VAR}` with the value of `VAR`, and `${VAR:-default}` with
/// `default` when `VAR` is unset. Unknown/unset `${VAR}` (no default)
/// is left untouched — `serde_yaml` will surface it as a literal string,
/// which is preferable to silently producing an empty credential.
fn substitute_env(input: &str) -> String {
    let re = regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .expect("static substitution pattern is valid");

    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        match std::env::var(var) {
            Ok(val) => val,
            Err(_) => caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| caps[0].to_string()),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::project::ProjectConfig;
    use tempfile::tempdir;

    fn project_config() -> ProjectConfig {
        serde_yaml::from_str("name: demo\nversion: \"1.0\"").unwrap()
    }

    #[test]
    fn substitutes_env_var_with_default() {
        std::env::remove_var("VERITY_TEST_DB");
        let out = substitute_env("database: ${VERITY_TEST_DB:-analytics}");
        assert_eq!(out, "database: analytics");
    }

    #[test]
    fn substitutes_env_var_when_set() {
        std::env::set_var("VERITY_TEST_DB", "override_db");
        let out = substitute_env("database: ${VERITY_TEST_DB:-analytics}");
        std::env::remove_var("VERITY_TEST_DB");
        assert_eq!(out, "database: override_db");
    }

    #[test]
    fn loads_profile_with_pool_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("profiles.yml"),
            r#"
target: dev
outputs:
  dev:
    type: duckdb
    path: "./target/dev.duckdb"
"#,
        )
        .unwrap();

        let config = project_config();
        let profile = load_connections(dir.path(), &config).unwrap();
        let dev = profile.active("dev").unwrap();
        assert_eq!(dev.pool_size, 1);
        assert_eq!(dev.max_retries, 3);
        assert!(dev.lazy_init);
    }
}
