//! Configuration bundles
//!
//! A bundle is one JSON or YAML document holding pipelines, the external
//! system registry, lookup tables and standalone mappings:
//!
//! ```yaml
//! systems:
//!   - code: rater
//!     baseUrl: https://rater.example.com/api
//!     format: json
//! lookups:
//!   state-territory: { CA: "T1", NY: "T2" }
//! pipelines:
//!   - id: gl-quote
//!     routingRules: [{ productLine: GL }]
//!     steps:
//!       - { stepOrder: 1, stepType: map_request }
//!       - { stepOrder: 2, stepType: call_system, config: { system: rater } }
//! ```
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::ConfigProvider;
use crate::error::{Error, Result};
use crate::http::ExternalSystem;
use crate::lookup::{InMemoryLookup, LookupResolver};
use crate::pipeline::{Pipeline, StepKind};
use crate::transform::{Mapping, Transformation};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct BundleDocument {
    #[serde(default)]
    pipelines: Vec<Pipeline>,
    #[serde(default)]
    systems: Vec<ExternalSystem>,
    #[serde(default)]
    lookups: HashMap<String, HashMap<String, Value>>,
    #[serde(default)]
    mappings: Vec<Mapping>,
}

/// In-memory configuration loaded from one document
#[derive(Debug, Clone, Default)]
pub struct ConfigBundle {
    pipelines: Vec<Arc<Pipeline>>,
    systems: HashMap<String, ExternalSystem>,
    lookups: InMemoryLookup,
    mappings: Vec<Mapping>,
}

impl ConfigBundle {
    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
            message: format!("Failed to read bundle {}: {}", path.display(), e),
            source: e,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Self::from_json_str(&content),
            "yaml" | "yml" => Self::from_yaml_str(&content),
            other => Err(Error::configuration(format!(
                "Unsupported bundle format '{}' for {}; expected .json, .yaml or .yml",
                other,
                path.display()
            ))),
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: BundleDocument = serde_json::from_str(content).map_err(|e| Error::Configuration {
            message: format!("Invalid bundle: {}", e),
            source: Some(e.into()),
        })?;
        Self::from_document(document)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let document: BundleDocument = serde_yaml::from_str(content).map_err(|e| Error::Configuration {
            message: format!("Invalid bundle: {}", e),
            source: Some(e.into()),
        })?;
        Self::from_document(document)
    }

    fn from_document(document: BundleDocument) -> Result<Self> {
        let mut seen = HashSet::new();
        for pipeline in &document.pipelines {
            if !seen.insert(pipeline.id.as_str()) {
                return Err(Error::configuration(format!("Duplicate pipeline id '{}'", pipeline.id)));
            }
        }

        let mut systems = HashMap::new();
        for system in document.systems {
            if systems.contains_key(&system.code) {
                return Err(Error::configuration(format!("Duplicate system code '{}'", system.code)));
            }
            systems.insert(system.code.clone(), system);
        }

        Ok(Self {
            pipelines: document.pipelines.into_iter().map(Arc::new).collect(),
            systems,
            lookups: InMemoryLookup::from_tables(document.lookups),
            mappings: document.mappings,
        })
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipelines.push(Arc::new(pipeline));
        self
    }

    pub fn with_system(mut self, system: ExternalSystem) -> Self {
        self.systems.insert(system.code.clone(), system);
        self
    }

    pub fn with_lookups(mut self, lookups: InMemoryLookup) -> Self {
        self.lookups = lookups;
        self
    }

    pub fn pipeline_list(&self) -> &[Arc<Pipeline>] {
        &self.pipelines
    }

    pub fn systems(&self) -> impl Iterator<Item = &ExternalSystem> {
        self.systems.values()
    }

    pub fn lookups(&self) -> &InMemoryLookup {
        &self.lookups
    }

    /// Find a mapping by id, standalone mappings first, then pipeline mappings
    pub fn find_mapping(&self, id: &str) -> Option<&Mapping> {
        self.mappings
            .iter()
            .chain(self.pipelines.iter().flat_map(|p| p.mappings.iter()))
            .find(|m| m.id == id)
    }

    pub fn mapping_ids(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .chain(self.pipelines.iter().flat_map(|p| p.mappings.iter()))
            .map(|m| m.id.as_str())
            .collect()
    }

    /// Cross-reference problems that do not prevent loading
    ///
    /// Reports `call_system` steps naming unregistered systems, lookups
    /// against unknown tables, unknown step types and pipelines without
    /// active steps.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let known_table = |table: &str| self.lookups.table_len(table).is_some();

        for pipeline in &self.pipelines {
            if pipeline.active_steps().is_empty() {
                issues.push(format!("pipeline '{}' has no active steps", pipeline.id));
            }
            for step in &pipeline.steps {
                match &step.kind {
                    StepKind::CallSystem(call) if !self.systems.contains_key(&call.system) => {
                        issues.push(format!(
                            "pipeline '{}' step {} calls unregistered system '{}'",
                            pipeline.id, step.step_order, call.system
                        ));
                    }
                    StepKind::Enrich { lookups } => {
                        for lookup in lookups.iter().filter(|l| !known_table(&l.table_key)) {
                            issues.push(format!(
                                "pipeline '{}' step {} enriches from unknown table '{}'",
                                pipeline.id, step.step_order, lookup.table_key
                            ));
                        }
                    }
                    StepKind::Unsupported { step_type } => {
                        issues.push(format!(
                            "pipeline '{}' step {} has unknown type '{}'",
                            pipeline.id, step.step_order, step_type
                        ));
                    }
                    _ => {}
                }
            }
        }

        let all_mappings = self
            .mappings
            .iter()
            .chain(self.pipelines.iter().flat_map(|p| p.mappings.iter()));
        for mapping in all_mappings {
            for field in &mapping.field_mappings {
                if let Transformation::Lookup { table_key, .. } = &field.transformation {
                    if !known_table(table_key) {
                        issues.push(format!(
                            "mapping '{}' field '{}' looks up unknown table '{}'",
                            mapping.id, field.source_path, table_key
                        ));
                    }
                }
            }
        }

        issues
    }
}

#[async_trait]
impl ConfigProvider for ConfigBundle {
    async fn pipeline(&self, id: &str) -> Result<Option<Arc<Pipeline>>> {
        Ok(self.pipelines.iter().find(|p| p.id == id).cloned())
    }

    async fn pipelines(&self) -> Result<Vec<Arc<Pipeline>>> {
        Ok(self.pipelines.clone())
    }

    async fn system(&self, code: &str) -> Result<Option<ExternalSystem>> {
        Ok(self.systems.get(code).cloned())
    }
}

#[async_trait]
impl LookupResolver for ConfigBundle {
    async fn lookup(&self, table: &str, key: &str) -> Result<Option<Value>> {
        self.lookups.get(table, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::WireFormat;
    use serde_json::json;
    use std::io::Write;

    const BUNDLE: &str = r#"
systems:
  - code: rater
    baseUrl: https://rater.example.com/api
    format: soap
lookups:
  state-territory:
    CA: T1
pipelines:
  - id: gl-quote
    routingRules:
      - productLine: GL
    mappings:
      - id: gl-request
        direction: request
        fieldMappings:
          - sourcePath: state
            targetPath: territory
            transformationType: lookup
            transformationConfig:
              tableKey: state-territory
    steps:
      - stepOrder: 1
        stepType: map_request
      - stepOrder: 2
        stepType: call_system
        config:
          system: rater
          operation: GetRate
"#;

    #[tokio::test]
    async fn test_load_yaml_bundle() {
        let bundle = ConfigBundle::from_yaml_str(BUNDLE).unwrap();

        let pipeline = bundle.pipeline("gl-quote").await.unwrap().unwrap();
        assert_eq!(pipeline.steps.len(), 2);
        assert!(bundle.find_mapping("gl-request").is_some());

        let system = bundle.system("rater").await.unwrap().unwrap();
        assert_eq!(system.format, WireFormat::Soap);
        assert!(system.is_active);

        assert_eq!(bundle.lookup("state-territory", "CA").await.unwrap(), Some(json!("T1")));
        assert!(bundle.diagnostics().is_empty());
    }

    #[test]
    fn test_load_from_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        file.write_all(BUNDLE.as_bytes()).unwrap();
        let bundle = ConfigBundle::from_file(file.path()).unwrap();
        assert_eq!(bundle.pipeline_list().len(), 1);

        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"{}").unwrap();
        assert!(matches!(
            ConfigBundle::from_file(file.path()),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_missing_transformation_parameter_fails_at_load() {
        let err = ConfigBundle::from_json_str(
            r#"{"mappings": [{"id": "m", "fieldMappings": [
                {"sourcePath": "a", "targetPath": "b", "transformationType": "expression"}
            ]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_duplicate_pipeline_ids_are_rejected() {
        let err = ConfigBundle::from_json_str(r#"{"pipelines": [{"id": "p"}, {"id": "p"}]}"#).unwrap_err();
        assert!(err.to_string().contains("Duplicate pipeline id 'p'"));
    }

    #[test]
    fn test_diagnostics_report_dangling_references() {
        let bundle = ConfigBundle::from_json_str(
            r#"{"pipelines": [{"id": "p", "steps": [
                {"stepOrder": 1, "stepType": "call_system", "config": {"system": "ghost"}},
                {"stepOrder": 2, "stepType": "enrich", "config": {"lookups": [
                    {"sourceField": "a", "tableKey": "nope", "targetField": "b"}
                ]}},
                {"stepOrder": 3, "stepType": "teleport"}
            ]}]}"#,
        )
        .unwrap();
        let issues = bundle.diagnostics();
        assert_eq!(issues.len(), 3);
        assert!(issues[0].contains("unregistered system 'ghost'"));
        assert!(issues[1].contains("unknown table 'nope'"));
        assert!(issues[2].contains("unknown type 'teleport'"));
    }
}
