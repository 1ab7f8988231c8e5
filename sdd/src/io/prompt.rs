//! Prompt and text-template rendering.
//!
//! Templates are embedded at compile time and rendered with minijinja. Each
//! oracle-backed phase gets a prompt template; spec parsing and architecture
//! also carry static instructions, and the code phases share one instruction
//! template that fixes the artifact output protocol.

use std::path::Path;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::diagnostics::{ErrorGroup, format_error_list};
use crate::core::plan::{BackendPlan, ComponentPlan, DatabasePlan, TEST_CONFIG_FILES, TestPlan};
use crate::core::schema::{FileSpec, ParsedSpec, TechStack};

const SPEC_PARSER_SYSTEM: &str = include_str!("prompts/spec_parser_system.md");
const ARCHITECTURE_SYSTEM: &str = include_str!("prompts/architecture_system.md");

const TEMPLATES: [(&str, &str); 10] = [
    ("spec_parser", include_str!("prompts/spec_parser.md")),
    ("architecture", include_str!("prompts/architecture.md")),
    ("codegen_system", include_str!("prompts/codegen_system.md")),
    ("database", include_str!("prompts/database.md")),
    ("frontend", include_str!("prompts/frontend.md")),
    ("backend", include_str!("prompts/backend.md")),
    ("testing", include_str!("prompts/testing.md")),
    ("fix", include_str!("prompts/fix.md")),
    ("readme", include_str!("prompts/readme.md")),
    ("env_example", include_str!("prompts/env_example")),
];

/// One titled bucket of paths in a generation plan.
#[derive(Debug, Clone, Serialize)]
struct PlanSection<'a> {
    title: &'static str,
    paths: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptLine {
    pub name: String,
    pub command: String,
}

/// Values rendered into the generated README.
#[derive(Debug, Clone, Serialize)]
pub struct ReadmeContext {
    pub project_name: String,
    pub description: String,
    pub framework: String,
    pub styling: String,
    pub database: String,
    pub scripts: Vec<ScriptLine>,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .expect("embedded template should be valid");
        }
        Self { env }
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String> {
        let template = self.env.get_template(name)?;
        let rendered = template
            .render(ctx)
            .with_context(|| format!("render {name} template"))?;
        debug!(template = name, bytes = rendered.len(), "rendered template");
        Ok(rendered)
    }

    pub fn spec_parser_instructions(&self) -> &'static str {
        SPEC_PARSER_SYSTEM
    }

    pub fn architecture_instructions(&self) -> &'static str {
        ARCHITECTURE_SYSTEM
    }

    /// Instructions shared by every phase that answers with code artifacts.
    pub fn codegen_instructions(&self, role: &str) -> Result<String> {
        self.render("codegen_system", context! { role => role })
    }

    pub fn render_spec_parser(&self, spec: &str) -> Result<String> {
        self.render("spec_parser", context! { spec => spec.trim() })
    }

    pub fn render_architecture(&self, parsed_spec: &ParsedSpec) -> Result<String> {
        let parsed_spec =
            serde_json::to_string_pretty(parsed_spec).context("serialize parsed spec")?;
        self.render("architecture", context! { parsed_spec => parsed_spec })
    }

    pub fn render_database(&self, spec: &ParsedSpec, plan: &DatabasePlan) -> Result<String> {
        let data_models =
            serde_json::to_string_pretty(&spec.data_models).context("serialize data models")?;
        self.render(
            "database",
            context! {
                project_name => &spec.project_name,
                description => &spec.description,
                plan => plan,
                data_models => data_models,
            },
        )
    }

    pub fn render_frontend(
        &self,
        spec: &ParsedSpec,
        plan: &ComponentPlan,
        files: &[FileSpec],
    ) -> Result<String> {
        let sections = [
            PlanSection { title: "UI Components (Atoms)", paths: &plan.atoms },
            PlanSection { title: "Feature Components (Molecules)", paths: &plan.molecules },
            PlanSection { title: "Layout Components (Organisms)", paths: &plan.organisms },
            PlanSection { title: "Pages", paths: &plan.pages },
            PlanSection { title: "Providers", paths: &plan.providers },
        ];
        self.render(
            "frontend",
            context! {
                project_name => &spec.project_name,
                description => &spec.description,
                framework => non_blank(&spec.tech_stack.frontend, "Next.js 14"),
                styling => non_blank(&spec.tech_stack.styling, "Tailwind CSS"),
                sections => sections,
                files => files,
            },
        )
    }

    pub fn render_backend(
        &self,
        spec: &ParsedSpec,
        plan: &BackendPlan,
        files: &[FileSpec],
    ) -> Result<String> {
        let stack = &spec.tech_stack;
        let sections = [
            PlanSection { title: "API Routes", paths: &plan.api_routes },
            PlanSection { title: "Server Actions", paths: &plan.server_actions },
            PlanSection { title: "Middleware", paths: &plan.middleware },
            PlanSection { title: "Database Layer", paths: &plan.database },
            PlanSection { title: "Utilities", paths: &plan.utilities },
        ];
        self.render(
            "backend",
            context! {
                project_name => &spec.project_name,
                description => &spec.description,
                framework => non_blank(stack.backend.as_deref().unwrap_or(""), "Next.js 14 API Routes"),
                database => non_blank(stack.database.as_deref().unwrap_or(""), "PostgreSQL"),
                orm => non_blank(stack.other.get("orm").map(String::as_str).unwrap_or(""), "Prisma"),
                sections => sections,
                files => files,
            },
        )
    }

    pub fn render_testing(&self, spec: &ParsedSpec, plan: &TestPlan) -> Result<String> {
        let sections = [
            PlanSection { title: "Components to Test", paths: &plan.component_tests },
            PlanSection { title: "API Routes to Test", paths: &plan.api_tests },
            PlanSection { title: "E2E Scenarios", paths: &plan.e2e_scenarios },
        ];
        self.render(
            "testing",
            context! {
                project_name => &spec.project_name,
                description => &spec.description,
                sections => sections,
                config_files => TEST_CONFIG_FILES,
                total => plan.total(),
            },
        )
    }

    /// Repair request for one file: its errors as a numbered list plus the
    /// current contents.
    pub fn render_fix(&self, group: &ErrorGroup, content: &str) -> Result<String> {
        self.render(
            "fix",
            context! {
                file => &group.file,
                error_count => group.errors.len(),
                error_list => format_error_list(&group.errors),
                language => fence_language(&group.file),
                content => content.trim_end(),
            },
        )
    }

    pub fn render_readme(&self, readme: &ReadmeContext) -> Result<String> {
        self.render("readme", readme)
    }

    pub fn render_env_example(&self, stack: &TechStack) -> Result<String> {
        let database = stack.database.as_deref().unwrap_or("").to_lowercase();
        let auth = stack.authentication.as_deref().unwrap_or("").to_lowercase();
        let supabase = database.contains("supabase");
        self.render(
            "env_example",
            context! {
                supabase => supabase,
                postgres => !supabase && database.contains("postgres"),
                nextauth => auth.contains("nextauth"),
            },
        )
    }
}

fn non_blank<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Fence language for a source path, based on its extension.
pub fn fence_language(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("tsx") => "tsx",
        Some("js" | "jsx" | "mjs" | "cjs") => "javascript",
        Some("json") => "json",
        Some("prisma") => "prisma",
        _ => "typescript",
    }
}
