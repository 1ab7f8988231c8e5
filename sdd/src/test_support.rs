//! Scripted collaborators and fixtures for tests.
//!
//! Nothing here talks to a real oracle or checker.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

use anyhow::{Result, anyhow};

use crate::core::diagnostics::{ErrorInfo, ErrorKind, Severity};
use crate::core::schema::{
    ApiEndpoint, ArchitectureOutput, DataModel, Dependencies, DirectorySpec, Field, FileKind,
    FileSpec, HttpMethod, ParsedSpec, ProjectStructure, Relation, RelationKind, TechStack,
    UiComponent, UiComponentKind,
};
use crate::io::checkers::{Diagnostics, DiagnosticsCollector};
use crate::io::oracle::GenerationOracle;

/// One request seen by a scripted oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCall {
    pub prompt: String,
    pub instructions: Option<String>,
}

/// Oracle that replays queued responses in order. `Err` entries become oracle
/// failures; an empty queue is also a failure.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    responses: RefCell<VecDeque<Result<String, String>>>,
    calls: RefCell<Vec<OracleCall>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<OracleCall> {
        self.calls.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl GenerationOracle for ScriptedOracle {
    fn generate(&self, prompt: &str, instructions: Option<&str>) -> Result<String> {
        self.calls.borrow_mut().push(OracleCall {
            prompt: prompt.to_string(),
            instructions: instructions.map(str::to_string),
        });
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted oracle has no responses left")),
        }
    }
}

/// Oracle that answers with a closure, for responses that depend on the prompt.
pub struct FnOracle<F> {
    respond: F,
}

impl<F> FnOracle<F>
where
    F: Fn(&str, Option<&str>) -> Result<String>,
{
    pub fn new(respond: F) -> Self {
        Self { respond }
    }
}

impl<F> GenerationOracle for FnOracle<F>
where
    F: Fn(&str, Option<&str>) -> Result<String>,
{
    fn generate(&self, prompt: &str, instructions: Option<&str>) -> Result<String> {
        (self.respond)(prompt, instructions)
    }
}

/// Collector that replays queued diagnostics. The last entry repeats once the
/// queue is drained; an empty script always reports a clean project.
#[derive(Debug, Default)]
pub struct ScriptedCollector {
    script: RefCell<VecDeque<Diagnostics>>,
    collections: RefCell<usize>,
}

impl ScriptedCollector {
    pub fn new(script: Vec<Diagnostics>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            collections: RefCell::new(0),
        }
    }

    /// Number of times `collect` ran.
    pub fn collections(&self) -> usize {
        *self.collections.borrow()
    }
}

impl DiagnosticsCollector for ScriptedCollector {
    fn collect(&self, _project_dir: &Path) -> Diagnostics {
        *self.collections.borrow_mut() += 1;
        let mut script = self.script.borrow_mut();
        if script.len() > 1 {
            script.pop_front().unwrap_or_default()
        } else {
            script.front().cloned().unwrap_or_default()
        }
    }
}

pub fn type_error(file: &str, line: u32) -> ErrorInfo {
    ErrorInfo {
        file: file.to_string(),
        line,
        column: Some(1),
        message: format!("Cannot find name 'x{line}'."),
        code: Some("TS2304".to_string()),
        kind: ErrorKind::Type,
        severity: Severity::Error,
    }
}

pub fn lint_error(file: &str, line: u32) -> ErrorInfo {
    ErrorInfo {
        file: file.to_string(),
        line,
        column: Some(1),
        message: "'unused' is assigned a value but never used.".to_string(),
        code: Some("no-unused-vars".to_string()),
        kind: ErrorKind::Lint,
        severity: Severity::Error,
    }
}

fn field(name: &str, field_type: &str) -> Field {
    Field {
        name: name.to_string(),
        field_type: field_type.to_string(),
        required: Some(true),
        default: None,
        description: None,
    }
}

/// Parsed spec for a small todo application with two models.
pub fn parsed_spec() -> ParsedSpec {
    ParsedSpec {
        project_name: "todo-app".to_string(),
        description: "Track todos".to_string(),
        features: vec!["Create todos".to_string(), "Complete todos".to_string()],
        tech_stack: TechStack {
            frontend: "Next.js 14".to_string(),
            backend: Some("Next.js API Routes".to_string()),
            database: Some("PostgreSQL".to_string()),
            styling: "Tailwind CSS".to_string(),
            authentication: Some("NextAuth.js".to_string()),
            deployment: None,
            other: BTreeMap::new(),
        },
        data_models: vec![
            DataModel {
                name: "User".to_string(),
                description: None,
                fields: vec![field("id", "string"), field("email", "string")],
                relations: vec![Relation {
                    kind: RelationKind::OneToMany,
                    model: "Todo".to_string(),
                    field: Some("todos".to_string()),
                }],
            },
            DataModel {
                name: "Todo".to_string(),
                description: None,
                fields: vec![field("id", "string"), field("title", "string")],
                relations: Vec::new(),
            },
        ],
        api_endpoints: vec![ApiEndpoint {
            method: HttpMethod::Get,
            path: "/api/todos".to_string(),
            description: Some("List todos".to_string()),
            request: None,
            response: None,
        }],
        ui_components: vec![UiComponent {
            name: "TodoList".to_string(),
            kind: UiComponentKind::Component,
            description: None,
            props: BTreeMap::new(),
        }],
        requirements: None,
    }
}

pub fn parsed_spec_json() -> String {
    serde_json::to_string_pretty(&parsed_spec()).expect("serialize parsed spec")
}

fn file(path: &str, kind: FileKind, purpose: &str) -> FileSpec {
    FileSpec {
        path: path.to_string(),
        kind,
        purpose: purpose.to_string(),
        dependencies: Vec::new(),
        exports: Vec::new(),
    }
}

/// Architecture for [`parsed_spec`] touching every phase.
pub fn architecture() -> ArchitectureOutput {
    ArchitectureOutput {
        project_name: "todo-app".to_string(),
        project_structure: ProjectStructure {
            root_dir: "todo-app".to_string(),
            directories: vec![DirectorySpec {
                path: "app".to_string(),
                purpose: "App Router".to_string(),
                files: Vec::new(),
            }],
        },
        dependencies: Dependencies::default(),
        config_files: Vec::new(),
        file_list: vec![
            file("app/page.tsx", FileKind::Page, "home page"),
            file("components/ui/Button.tsx", FileKind::Component, "button"),
            file("app/api/todos/route.ts", FileKind::Api, "todo collection"),
            file("lib/database/client.ts", FileKind::Lib, "database client"),
            file("tailwind.config.ts", FileKind::Config, "tailwind"),
        ],
    }
}

pub fn architecture_json() -> String {
    serde_json::to_string_pretty(&architecture()).expect("serialize architecture")
}

/// Create a project directory and write `files` into it.
pub fn project_with_files(files: &[(&str, &str)]) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    for (path, contents) in files {
        crate::io::materialize::write_file(&dir.path().join(path), contents)?;
    }
    Ok(dir)
}
