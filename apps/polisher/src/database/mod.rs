//! Resume Database: the candidate's master profile plus precomputed indices.
//!
//! A database is a directory holding:
//! - `master_resume.yaml` (required): the full profile
//! - `master_resume.index.json` (required): lookup indices built offline
//! - `evidence_map.json` (optional): claim → evidence mapping

pub mod handlers;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

pub const MASTER_RESUME_FILE: &str = "master_resume.yaml";
pub const INDEX_FILE: &str = "master_resume.index.json";
pub const EVIDENCE_MAP_FILE: &str = "evidence_map.json";

/// The parts of `master_resume.index.json` the tailoring prompt draws on.
/// Missing sections deserialize as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseIndex {
    #[serde(default)]
    pub query_paths: QueryPaths,
    #[serde(default)]
    pub indices: Indices,
    #[serde(default)]
    pub lookup_tables: LookupTables,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPaths {
    /// Achievements pre-sorted by impact, highest first.
    #[serde(default)]
    pub get_top_achievements_by_impact: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Indices {
    #[serde(default)]
    pub skills: SkillIndex,
    #[serde(default)]
    pub technologies: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillIndex {
    #[serde(default)]
    pub primary: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupTables {
    /// Companies in file order. Roles may be plain titles or richer objects.
    #[serde(default)]
    pub role_by_company: IndexMap<String, Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeDatabase {
    pub master_resume: Value,
    pub index: DatabaseIndex,
    pub evidence_map: Option<Value>,
    pub path: PathBuf,
}

/// Counts returned to callers after a successful load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseSummary {
    pub path: PathBuf,
    pub achievements: usize,
    pub primary_skills: usize,
    pub technologies: usize,
    pub companies: usize,
    pub has_evidence_map: bool,
}

impl ResumeDatabase {
    pub fn summary(&self) -> DatabaseSummary {
        DatabaseSummary {
            path: self.path.clone(),
            achievements: self.index.query_paths.get_top_achievements_by_impact.len(),
            primary_skills: self.index.indices.skills.primary.len(),
            technologies: self.index.indices.technologies.len(),
            companies: self.index.lookup_tables.role_by_company.len(),
            has_evidence_map: self.evidence_map.is_some(),
        }
    }
}

/// Renders an index entry for a prompt: strings verbatim, anything else as JSON.
pub fn display_entry(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Loads a resume database directory.
pub async fn load_database(dir: &Path) -> Result<ResumeDatabase> {
    info!("Loading resume database from {}", dir.display());

    let yaml_path = dir.join(MASTER_RESUME_FILE);
    let yaml = tokio::fs::read_to_string(&yaml_path)
        .await
        .with_context(|| format!("Failed to read {}", yaml_path.display()))?;
    let master_resume: Value = serde_yaml::from_str(&yaml)
        .with_context(|| format!("Invalid YAML in {}", yaml_path.display()))?;

    let index_path = dir.join(INDEX_FILE);
    let index_json = tokio::fs::read_to_string(&index_path)
        .await
        .with_context(|| format!("Failed to read {}", index_path.display()))?;
    let index: DatabaseIndex = serde_json::from_str(&index_json)
        .with_context(|| format!("Invalid JSON in {}", index_path.display()))?;

    let evidence_map = load_evidence_map(&dir.join(EVIDENCE_MAP_FILE)).await;

    let database = ResumeDatabase {
        master_resume,
        index,
        evidence_map,
        path: dir.to_path_buf(),
    };

    let summary = database.summary();
    info!(
        "Resume database loaded: {} achievements, {} skills, {} technologies, {} companies",
        summary.achievements, summary.primary_skills, summary.technologies, summary.companies
    );

    Ok(database)
}

async fn load_evidence_map(path: &Path) -> Option<Value> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Skipping evidence map {}: {e}", path.display());
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(map) => Some(map),
        Err(e) => {
            warn!("Skipping malformed evidence map {}: {e}", path.display());
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::write_database;
    use super::*;

    #[tokio::test]
    async fn test_load_full_database() {
        let dir = tempfile::tempdir().unwrap();
        write_database(dir.path(), true);

        let db = load_database(dir.path()).await.unwrap();
        assert_eq!(db.master_resume["name"], "Alex Example");
        assert_eq!(
            db.summary(),
            DatabaseSummary {
                path: dir.path().to_path_buf(),
                achievements: 2,
                primary_skills: 3,
                technologies: 2,
                companies: 2,
                has_evidence_map: true,
            }
        );
    }

    #[tokio::test]
    async fn test_evidence_map_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        write_database(dir.path(), false);

        let db = load_database(dir.path()).await.unwrap();
        assert!(db.evidence_map.is_none());
    }

    #[tokio::test]
    async fn test_malformed_evidence_map_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_database(dir.path(), false);
        std::fs::write(dir.path().join(EVIDENCE_MAP_FILE), "{oops").unwrap();

        let db = load_database(dir.path()).await.unwrap();
        assert!(db.evidence_map.is_none());
    }

    #[tokio::test]
    async fn test_missing_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MASTER_RESUME_FILE), "name: x\n").unwrap();

        let err = load_database(dir.path()).await.unwrap_err();
        assert!(err.to_string().contains(INDEX_FILE));
    }

    #[tokio::test]
    async fn test_sparse_index_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MASTER_RESUME_FILE), "name: x\n").unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{}").unwrap();

        let db = load_database(dir.path()).await.unwrap();
        assert_eq!(db.summary().achievements, 0);
        assert_eq!(db.summary().companies, 0);
    }

    #[tokio::test]
    async fn test_roles_keep_file_order_and_accept_objects() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MASTER_RESUME_FILE), "name: x\n").unwrap();
        std::fs::write(
            dir.path().join(INDEX_FILE),
            r#"{"lookup_tables": {"role_by_company": {
                "Zeta Labs": ["Engineer"],
                "Acme": [{"title": "Analyst", "years": "2020-2022"}]
            }}}"#,
        )
        .unwrap();

        let db = load_database(dir.path()).await.unwrap();
        let companies: Vec<&str> = db
            .index
            .lookup_tables
            .role_by_company
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(companies, vec!["Zeta Labs", "Acme"]);
        assert_eq!(
            db.index.lookup_tables.role_by_company["Acme"][0]["title"],
            "Analyst"
        );
    }

    #[test]
    fn test_display_entry() {
        assert_eq!(display_entry(&Value::String("SQL".to_string())), "SQL");
        assert_eq!(display_entry(&serde_json::json!({"a": 1})), r#"{"a":1}"#);
    }
}
