//! Shared data types for generated artifacts and repair reports.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::diagnostics::ErrorInfo;
use crate::error::{DiagnosticToolError, RepairRequestError};

/// A file written to the project, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub content: String,
    pub size: usize,
}

impl Artifact {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.len(),
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orm {
    Prisma,
    Drizzle,
}

impl Orm {
    pub fn as_str(self) -> &'static str {
        match self {
            Orm::Prisma => "prisma",
            Orm::Drizzle => "drizzle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFile {
    pub path: String,
    pub orm: Orm,
    pub models: Vec<String>,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationFile {
    pub path: String,
    pub name: String,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFile {
    pub path: String,
    pub models: Vec<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientFileKind {
    Client,
    Helper,
    Types,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientFile {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ClientFileKind,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseOutput {
    pub project_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orm: Option<Orm>,
    pub schema_files: Vec<SchemaFile>,
    pub migration_files: Vec<MigrationFile>,
    pub seed_files: Vec<SeedFile>,
    pub client_files: Vec<ClientFile>,
    pub files_generated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentLevel {
    Atom,
    Molecule,
    Organism,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedComponent {
    pub path: String,
    pub name: String,
    pub level: ComponentLevel,
    pub is_client: bool,
    pub has_accessibility: bool,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPage {
    pub path: String,
    pub route: String,
    pub is_client: bool,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedProvider {
    pub path: String,
    pub name: String,
    pub provides: Vec<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontendOutput {
    pub project_path: PathBuf,
    pub components: Vec<GeneratedComponent>,
    pub pages: Vec<GeneratedPage>,
    pub providers: Vec<GeneratedProvider>,
    pub files_generated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRoute {
    pub path: String,
    pub endpoint: String,
    pub methods: Vec<String>,
    pub has_validation: bool,
    pub has_auth: bool,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAction {
    pub path: String,
    pub name: String,
    pub has_validation: bool,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MiddlewarePurpose {
    Authentication,
    #[serde(rename = "CORS")]
    Cors,
    Logging,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Middleware {
    pub path: String,
    pub name: String,
    pub purpose: MiddlewarePurpose,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utility {
    pub path: String,
    pub name: String,
    pub functions: Vec<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOutput {
    pub project_path: PathBuf,
    pub api_routes: Vec<ApiRoute>,
    pub server_actions: Vec<ServerAction>,
    pub middleware: Vec<Middleware>,
    pub utilities: Vec<Utility>,
    pub files_generated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Component,
    Api,
    E2e,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTest {
    pub path: String,
    pub test_type: TestKind,
    /// File under test, derived from the test's path.
    pub target_file: String,
    pub test_count: usize,
    /// Names of the `describe` blocks.
    pub coverage: Vec<String>,
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestConfigKind {
    #[serde(rename = "vitest.config")]
    Vitest,
    #[serde(rename = "playwright.config")]
    Playwright,
    #[serde(rename = "test-setup")]
    Setup,
    #[serde(rename = "test-utils")]
    Utils,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedTestConfig {
    pub path: String,
    pub config_type: TestConfigKind,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestingOutput {
    pub project_path: PathBuf,
    pub component_tests: Vec<GeneratedTest>,
    pub api_tests: Vec<GeneratedTest>,
    pub e2e_tests: Vec<GeneratedTest>,
    pub config_files: Vec<GeneratedTestConfig>,
    pub files_generated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFileKind {
    Package,
    Typescript,
    Next,
    Tailwind,
    Postcss,
    Eslint,
    Env,
    Git,
    Docs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedConfigFile {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ConfigFileKind,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOutput {
    pub project_path: PathBuf,
    pub config_files: Vec<GeneratedConfigFile>,
    pub files_generated: usize,
}

/// Record of one pass through the repair loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixAttempt {
    pub attempt_number: u32,
    pub errors_found: usize,
    pub errors_fixed: usize,
    pub files_modified: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,
    /// File groups whose repair failed and were left untouched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<RepairRequestError>,
}

/// Why the repair loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStop {
    /// A check found zero errors.
    Converged,
    /// An attempt fixed nothing.
    NoProgress,
    /// `max_attempts` passes ran.
    BudgetExhausted,
}

/// Final result of a repair session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub success: bool,
    pub attempts: u32,
    pub fixed_errors: Vec<ErrorInfo>,
    pub remaining_errors: Vec<ErrorInfo>,
    pub files_modified: Vec<String>,
    pub fix_results: Vec<FixAttempt>,
    pub stop: RepairStop,
    /// Checker failures seen during the final collection.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_failures: Vec<DiagnosticToolError>,
}
