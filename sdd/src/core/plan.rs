//! Per-phase generation plans derived from earlier phase outputs.
//!
//! A plan narrows the architecture's file list to what one phase owns and
//! buckets it so the prompt can ask for each kind of file explicitly.

use serde::Serialize;

use crate::core::schema::{FileSpec, ParsedSpec};
use crate::core::types::{BackendOutput, FrontendOutput, Orm};

const DEFAULT_DATABASE: &str = "postgresql";
const DEFAULT_E2E_SCENARIO: &str = "user-flow";

/// Config files every generated test suite carries.
pub const TEST_CONFIG_FILES: [&str; 4] = [
    "vitest.config.ts",
    "vitest.setup.ts",
    "playwright.config.ts",
    "tsconfig.test.json",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabasePlan {
    pub orm: Orm,
    pub database: String,
    pub models: Vec<String>,
}

/// Plan database generation, or `None` when the spec declares no data models.
///
/// Prisma is used unless `techStack.other.orm` asks for Drizzle.
pub fn plan_database(spec: &ParsedSpec) -> Option<DatabasePlan> {
    if spec.data_models.is_empty() {
        return None;
    }
    let stack = &spec.tech_stack;
    let database = stack
        .database
        .as_deref()
        .map(str::to_lowercase)
        .filter(|db| !db.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
    let orm = match stack.other.get("orm").map(|orm| orm.to_lowercase()) {
        Some(orm) if orm == "drizzle" => Orm::Drizzle,
        _ => Orm::Prisma,
    };
    Some(DatabasePlan {
        orm,
        database,
        models: spec.data_models.iter().map(|m| m.name.clone()).collect(),
    })
}

/// Files owned by the frontend phase: everything under `app/` except API
/// routes, components, contexts, and any other `.tsx`/`.jsx` outside `app/api/`.
pub fn filter_frontend_files(files: &[FileSpec]) -> Vec<FileSpec> {
    files
        .iter()
        .filter(|file| {
            let path = file.path.to_lowercase();
            let is_api = path.starts_with("app/api/");
            (path.starts_with("app/") && !is_api)
                || path.starts_with("components/")
                || path.starts_with("contexts/")
                || ((path.ends_with(".tsx") || path.ends_with(".jsx")) && !is_api)
        })
        .cloned()
        .collect()
}

/// Files owned by the backend phase: API routes, server-side `lib/` modules,
/// middleware, and any other plain `.ts` file.
pub fn filter_backend_files(files: &[FileSpec]) -> Vec<FileSpec> {
    const BACKEND_DIRS: [&str; 6] = [
        "app/api/",
        "lib/actions/",
        "lib/database/",
        "lib/auth/",
        "lib/validations/",
        "lib/utils/",
    ];
    files
        .iter()
        .filter(|file| {
            let path = file.path.to_lowercase();
            BACKEND_DIRS.iter().any(|dir| path.starts_with(dir))
                || path == "middleware.ts"
                || (path.ends_with(".ts") && !path.ends_with(".tsx"))
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentPlan {
    pub atoms: Vec<String>,
    pub molecules: Vec<String>,
    pub organisms: Vec<String>,
    pub pages: Vec<String>,
    pub providers: Vec<String>,
}

impl ComponentPlan {
    pub fn total(&self) -> usize {
        self.atoms.len()
            + self.molecules.len()
            + self.organisms.len()
            + self.pages.len()
            + self.providers.len()
    }
}

pub fn plan_components(files: &[FileSpec]) -> ComponentPlan {
    let mut plan = ComponentPlan::default();
    for file in files {
        let path = file.path.to_lowercase();
        if path.contains("components/ui/") {
            plan.atoms.push(file.path.clone());
        } else if path.contains("components/forms/") {
            plan.molecules.push(file.path.clone());
        } else if path.contains("components/") {
            plan.organisms.push(file.path.clone());
        } else if path.contains("/page.tsx") {
            plan.pages.push(file.path.clone());
        } else if path.contains("contexts/") || path.contains("providers") {
            plan.providers.push(file.path.clone());
        }
    }
    plan
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackendPlan {
    pub api_routes: Vec<String>,
    pub server_actions: Vec<String>,
    pub middleware: Vec<String>,
    pub utilities: Vec<String>,
    pub database: Vec<String>,
}

impl BackendPlan {
    pub fn total(&self) -> usize {
        self.api_routes.len()
            + self.server_actions.len()
            + self.middleware.len()
            + self.utilities.len()
            + self.database.len()
    }
}

pub fn plan_backend(files: &[FileSpec]) -> BackendPlan {
    let mut plan = BackendPlan::default();
    for file in files {
        let path = file.path.to_lowercase();
        if path.starts_with("app/api/") {
            plan.api_routes.push(file.path.clone());
        } else if path.starts_with("lib/actions/") {
            plan.server_actions.push(file.path.clone());
        } else if path.contains("middleware") {
            plan.middleware.push(file.path.clone());
        } else if path.starts_with("lib/database/") {
            plan.database.push(file.path.clone());
        } else if path.starts_with("lib/utils/")
            || path.starts_with("lib/validations/")
            || path.starts_with("lib/auth/")
        {
            plan.utilities.push(file.path.clone());
        }
    }
    plan
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestPlan {
    pub component_tests: Vec<String>,
    pub api_tests: Vec<String>,
    pub e2e_scenarios: Vec<String>,
}

impl TestPlan {
    /// Test files plus the fixed config files.
    pub fn total(&self) -> usize {
        self.component_tests.len()
            + self.api_tests.len()
            + self.e2e_scenarios.len()
            + TEST_CONFIG_FILES.len()
    }
}

/// One component test per generated component, one API test per route, and
/// one end-to-end scenario per feature (at least one).
pub fn plan_tests(
    spec: &ParsedSpec,
    frontend: Option<&FrontendOutput>,
    backend: Option<&BackendOutput>,
) -> TestPlan {
    let component_tests = frontend
        .map(|out| out.components.iter().map(|c| c.path.clone()).collect())
        .unwrap_or_default();
    let api_tests = backend
        .map(|out| out.api_routes.iter().map(|r| r.path.clone()).collect())
        .unwrap_or_default();
    let mut e2e_scenarios: Vec<String> = Vec::new();
    for slug in spec.features.iter().map(String::as_str).map(scenario_slug) {
        if !slug.is_empty() && !e2e_scenarios.contains(&slug) {
            e2e_scenarios.push(slug);
        }
    }
    if e2e_scenarios.is_empty() {
        e2e_scenarios.push(DEFAULT_E2E_SCENARIO.to_string());
    }
    TestPlan {
        component_tests,
        api_tests,
        e2e_scenarios,
    }
}

/// `"Create & edit todos"` -> `"create-edit-todos"`.
pub fn scenario_slug(feature: &str) -> String {
    feature
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
