//! Phase identities and the typed payloads exchanged between phases.
//!
//! Structured oracle payloads (`ParsedSpec`, `ArchitectureOutput`) are checked
//! against a JSON Schema before deserialization so that a malformed payload
//! fails at the phase that produced it instead of somewhere downstream.

use std::collections::BTreeMap;
use std::fmt;

use jsonschema::Draft;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::types::{
    BackendOutput, ConfigOutput, DatabaseOutput, FrontendOutput, TestingOutput,
};
use crate::error::PipelineError;

pub const PARSED_SPEC_SCHEMA: &str = include_str!("../../schemas/parsed_spec.schema.json");
pub const ARCHITECTURE_SCHEMA: &str = include_str!("../../schemas/architecture.schema.json");

/// Stable identity of a pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    SpecParser,
    Architecture,
    Database,
    Frontend,
    Backend,
    Testing,
    Config,
}

impl PhaseName {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseName::SpecParser => "spec_parser",
            PhaseName::Architecture => "architecture",
            PhaseName::Database => "database",
            PhaseName::Frontend => "frontend",
            PhaseName::Backend => "backend",
            PhaseName::Testing => "testing",
            PhaseName::Config => "config",
        }
    }

    /// File name used when the phase output is persisted to the temp dir.
    pub fn output_file_name(self) -> &'static str {
        match self {
            PhaseName::SpecParser => "parsed-spec.json",
            PhaseName::Architecture => "architecture.json",
            PhaseName::Database => "database.json",
            PhaseName::Frontend => "frontend.json",
            PhaseName::Backend => "backend.json",
            PhaseName::Testing => "testing.json",
            PhaseName::Config => "config.json",
        }
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one phase, tagged with the phase that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "output", rename_all = "snake_case")]
pub enum PhaseOutput {
    SpecParser(ParsedSpec),
    Architecture(ArchitectureOutput),
    Database(DatabaseOutput),
    Frontend(FrontendOutput),
    Backend(BackendOutput),
    Testing(TestingOutput),
    Config(ConfigOutput),
}

impl PhaseOutput {
    pub fn phase(&self) -> PhaseName {
        match self {
            PhaseOutput::SpecParser(_) => PhaseName::SpecParser,
            PhaseOutput::Architecture(_) => PhaseName::Architecture,
            PhaseOutput::Database(_) => PhaseName::Database,
            PhaseOutput::Frontend(_) => PhaseName::Frontend,
            PhaseOutput::Backend(_) => PhaseName::Backend,
            PhaseOutput::Testing(_) => PhaseName::Testing,
            PhaseOutput::Config(_) => PhaseName::Config,
        }
    }

    /// Number of files the phase wrote to the project (0 for planning phases).
    pub fn files_generated(&self) -> usize {
        match self {
            PhaseOutput::SpecParser(_) | PhaseOutput::Architecture(_) => 0,
            PhaseOutput::Database(out) => out.files_generated,
            PhaseOutput::Frontend(out) => out.files_generated,
            PhaseOutput::Backend(out) => out.files_generated,
            PhaseOutput::Testing(out) => out.files_generated,
            PhaseOutput::Config(out) => out.files_generated,
        }
    }
}

/// Structured form of the user's application specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSpec {
    pub project_name: String,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    pub tech_stack: TechStack,
    #[serde(default)]
    pub data_models: Vec<DataModel>,
    #[serde(default)]
    pub api_endpoints: Vec<ApiEndpoint>,
    #[serde(default)]
    pub ui_components: Vec<UiComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Requirements>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechStack {
    pub frontend: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    pub styling: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub method: HttpMethod,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiComponentKind {
    Page,
    Component,
    Layout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: UiComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirements {
    #[serde(default)]
    pub functional: Vec<String>,
    #[serde(default)]
    pub non_functional: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Planned layout of the generated project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureOutput {
    pub project_name: String,
    pub project_structure: ProjectStructure,
    pub dependencies: Dependencies,
    #[serde(default)]
    pub config_files: Vec<ConfigFileSpec>,
    pub file_list: Vec<FileSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStructure {
    pub root_dir: String,
    #[serde(default)]
    pub directories: Vec<DirectorySpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorySpec {
    pub path: String,
    pub purpose: String,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependencies {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFileSpec {
    pub filename: String,
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Page,
    Component,
    Api,
    Lib,
    Config,
    Style,
    Type,
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub purpose: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub exports: Vec<String>,
}

/// Validate `instance` against a JSON Schema (Draft 2020-12) and deserialize it.
///
/// Violations are reported together as one extraction error naming `what`.
pub fn validate_payload<T: DeserializeOwned>(
    what: &str,
    instance: Value,
    schema_raw: &str,
) -> Result<T, PipelineError> {
    let schema: Value = serde_json::from_str(schema_raw)
        .map_err(|err| PipelineError::configuration(format!("parse {what} schema: {err}")))?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .map_err(|err| PipelineError::configuration(format!("compile {what} schema: {err}")))?;
    let messages: Vec<String> = compiled
        .iter_errors(&instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(PipelineError::Extraction(format!(
            "{what} failed schema validation:\n- {}",
            messages.join("\n- ")
        )));
    }
    serde_json::from_value(instance)
        .map_err(|err| PipelineError::Extraction(format!("decode {what}: {err}")))
}
