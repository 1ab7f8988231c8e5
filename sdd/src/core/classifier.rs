//! Heuristic classification of generated files.
//!
//! These functions look at paths and a few content markers to summarize what a
//! code-generation phase produced. They are best-effort: a file that does not
//! follow the usual Next.js layout is simply left out of a category. Nothing
//! downstream depends on the classification being complete.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{
    ApiRoute, Artifact, ClientFile, ClientFileKind, ComponentLevel, GeneratedComponent,
    GeneratedPage, GeneratedProvider, GeneratedTest, GeneratedTestConfig, Middleware,
    MiddlewarePurpose, MigrationFile, Orm, SchemaFile, SeedFile, ServerAction, TestConfigKind,
    TestKind, Utility,
};

static PRISMA_MODEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"model\s+(\w+)\s*\{").unwrap());
static DRIZZLE_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export const (\w+) = .*Table").unwrap());
static SEED_MODEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"prisma\.(\w+)\.create|db\.insert\((\w+)\)").unwrap());
static EXPORTED_FN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"export (?:async )?function (\w+)").unwrap());
static ACCESSIBILITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"aria-|role=|alt=").unwrap());
static ROUTE_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").unwrap());
static TEST_CASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:test|it)\s*\(").unwrap());
static DESCRIBE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"describe\s*\(\s*['"`]([^'"`]+)['"`]"#).unwrap());

const HTTP_METHODS: [&str; 5] = ["GET", "POST", "PUT", "DELETE", "PATCH"];
const PROVIDED_FEATURES: [&str; 4] = ["QueryClient", "AuthContext", "ThemeContext", "Toaster"];

/// File name without directory or extension.
pub fn file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_client_module(content: &str) -> bool {
    content.contains("'use client'") || content.contains("\"use client\"")
}

fn has_validation(content: &str) -> bool {
    content.contains("z.object") || content.contains(".parse(")
}

pub fn classify_schema_files(files: &[Artifact], orm: Orm) -> Vec<SchemaFile> {
    files
        .iter()
        .filter(|file| match orm {
            Orm::Prisma => file.path.ends_with("schema.prisma"),
            Orm::Drizzle => file.path.contains("lib/database/schema.ts"),
        })
        .map(|file| {
            let pattern = match orm {
                Orm::Prisma => &*PRISMA_MODEL_RE,
                Orm::Drizzle => &*DRIZZLE_TABLE_RE,
            };
            let models = pattern
                .captures_iter(&file.content)
                .map(|caps| caps[1].to_string())
                .collect();
            SchemaFile {
                path: file.path.clone(),
                orm,
                models,
                size: file.size,
            }
        })
        .collect()
}

pub fn classify_migration_files(files: &[Artifact]) -> Vec<MigrationFile> {
    files
        .iter()
        .filter(|file| file.path.contains("migrations/"))
        .map(|file| MigrationFile {
            path: file.path.clone(),
            name: Path::new(&file.path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: file.size,
        })
        .collect()
}

pub fn classify_seed_files(files: &[Artifact]) -> Vec<SeedFile> {
    files
        .iter()
        .filter(|file| file.path.contains("seed.ts"))
        .map(|file| {
            let mut models: Vec<String> = Vec::new();
            for caps in SEED_MODEL_RE.captures_iter(&file.content) {
                let model = caps.get(1).or_else(|| caps.get(2));
                if let Some(model) = model
                    && !models.iter().any(|seen| seen == model.as_str())
                {
                    models.push(model.as_str().to_string());
                }
            }
            SeedFile {
                path: file.path.clone(),
                models,
                size: file.size,
            }
        })
        .collect()
}

pub fn classify_client_files(files: &[Artifact]) -> Vec<ClientFile> {
    files
        .iter()
        .filter(|file| {
            file.path.contains("lib/database/")
                && !file.path.contains("schema.ts")
                && !file.path.contains("seed.ts")
        })
        .map(|file| {
            let kind = if file.path.contains("index.ts") {
                ClientFileKind::Helper
            } else if file.path.contains("types.ts") {
                ClientFileKind::Types
            } else {
                ClientFileKind::Client
            };
            ClientFile {
                path: file.path.clone(),
                kind,
                size: file.size,
            }
        })
        .collect()
}

pub fn classify_components(files: &[Artifact]) -> Vec<GeneratedComponent> {
    files
        .iter()
        .filter(|file| file.path.contains("components/"))
        .map(|file| {
            let level = if file.path.contains("components/ui/") {
                ComponentLevel::Atom
            } else if file.path.contains("components/forms/") {
                ComponentLevel::Molecule
            } else {
                ComponentLevel::Organism
            };
            GeneratedComponent {
                path: file.path.clone(),
                name: file_stem(&file.path),
                level,
                is_client: is_client_module(&file.content),
                has_accessibility: ACCESSIBILITY_RE.is_match(&file.content),
                size: file.size,
            }
        })
        .collect()
}

pub fn classify_pages(files: &[Artifact]) -> Vec<GeneratedPage> {
    files
        .iter()
        .filter(|file| file.path.ends_with("page.tsx") && file.path.starts_with("app/"))
        .map(|file| GeneratedPage {
            path: file.path.clone(),
            route: page_route(&file.path),
            is_client: is_client_module(&file.content),
            size: file.size,
        })
        .collect()
}

/// `app/(auth)/login/page.tsx` -> `/login`. Route groups are dropped.
pub fn page_route(path: &str) -> String {
    let trimmed = path
        .strip_prefix("app")
        .unwrap_or(path)
        .trim_end_matches("page.tsx");
    let without_groups = ROUTE_GROUP_RE.replace_all(trimmed, "");
    let segments: Vec<&str> = without_groups
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

pub fn classify_providers(files: &[Artifact]) -> Vec<GeneratedProvider> {
    files
        .iter()
        .filter(|file| {
            file.path.contains("contexts/") || file.path.to_lowercase().contains("provider")
        })
        .map(|file| GeneratedProvider {
            path: file.path.clone(),
            name: file_stem(&file.path),
            provides: PROVIDED_FEATURES
                .iter()
                .filter(|feature| file.content.contains(*feature))
                .map(|feature| (*feature).to_string())
                .collect(),
            size: file.size,
        })
        .collect()
}

pub fn classify_api_routes(files: &[Artifact]) -> Vec<ApiRoute> {
    files
        .iter()
        .filter(|file| file.path.starts_with("app/api/"))
        .map(|file| ApiRoute {
            path: file.path.clone(),
            endpoint: api_endpoint(&file.path),
            methods: HTTP_METHODS
                .iter()
                .filter(|method| {
                    file.content
                        .contains(&format!("export async function {method}"))
                })
                .map(|method| (*method).to_string())
                .collect(),
            has_validation: has_validation(&file.content),
            has_auth: file.content.contains("getCurrentUser")
                || file.content.contains("requireAuth"),
            size: file.size,
        })
        .collect()
}

/// `app/api/todos/[id]/route.ts` -> `/api/todos/:id`.
pub fn api_endpoint(path: &str) -> String {
    let trimmed = path
        .strip_prefix("app/")
        .unwrap_or(path)
        .trim_end_matches(".ts")
        .trim_end_matches("route")
        .trim_end_matches('/');
    let segments: Vec<String> = trimmed
        .split('/')
        .map(|segment| match segment.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(param) => format!(":{param}"),
            None => segment.to_string(),
        })
        .collect();
    format!("/{}", segments.join("/"))
}

pub fn classify_server_actions(files: &[Artifact]) -> Vec<ServerAction> {
    files
        .iter()
        .filter(|file| file.path.starts_with("lib/actions/"))
        .map(|file| ServerAction {
            path: file.path.clone(),
            name: file_stem(&file.path),
            has_validation: has_validation(&file.content),
            size: file.size,
        })
        .collect()
}

pub fn classify_middleware(files: &[Artifact]) -> Vec<Middleware> {
    files
        .iter()
        .filter(|file| file.path.to_lowercase().contains("middleware"))
        .map(|file| {
            let content = &file.content;
            let purpose = if content.contains("auth") || content.contains("session") {
                MiddlewarePurpose::Authentication
            } else if content.contains("cors") {
                MiddlewarePurpose::Cors
            } else if content.contains("log") {
                MiddlewarePurpose::Logging
            } else {
                MiddlewarePurpose::General
            };
            Middleware {
                path: file.path.clone(),
                name: file_stem(&file.path),
                purpose,
                size: file.size,
            }
        })
        .collect()
}

pub fn classify_utilities(files: &[Artifact]) -> Vec<Utility> {
    const UTILITY_DIRS: [&str; 4] = [
        "lib/utils/",
        "lib/validations/",
        "lib/auth/",
        "lib/database/",
    ];
    files
        .iter()
        .filter(|file| UTILITY_DIRS.iter().any(|dir| file.path.starts_with(dir)))
        .map(|file| Utility {
            path: file.path.clone(),
            name: file_stem(&file.path),
            functions: EXPORTED_FN_RE
                .captures_iter(&file.content)
                .map(|caps| caps[1].to_string())
                .collect(),
            size: file.size,
        })
        .collect()
}

fn is_test_of(kind: TestKind, path: &str) -> bool {
    match kind {
        TestKind::Component => path.contains("components/") && path.ends_with(".test.tsx"),
        TestKind::Api => path.contains("app/api/") && path.ends_with(".test.ts"),
        TestKind::E2e => path.contains("e2e/") && path.ends_with(".spec.ts"),
    }
}

/// Test files of one kind, with their case count and `describe` names.
pub fn classify_tests(files: &[Artifact], kind: TestKind) -> Vec<GeneratedTest> {
    files
        .iter()
        .filter(|file| is_test_of(kind, &file.path))
        .map(|file| GeneratedTest {
            path: file.path.clone(),
            test_type: kind,
            target_file: test_target(&file.path),
            test_count: TEST_CASE_RE.find_iter(&file.content).count(),
            coverage: DESCRIBE_RE
                .captures_iter(&file.content)
                .map(|caps| caps[1].to_string())
                .collect(),
            size: file.size,
        })
        .collect()
}

/// `components/ui/Button.test.tsx` -> `components/ui/Button.tsx`. End-to-end
/// specs have no single target and map to themselves.
pub fn test_target(path: &str) -> String {
    for ext in ["ts", "tsx"] {
        if let Some(stem) = path.strip_suffix(&format!(".test.{ext}")) {
            return format!("{stem}.{ext}");
        }
    }
    path.to_string()
}

pub fn classify_test_configs(files: &[Artifact]) -> Vec<GeneratedTestConfig> {
    const CONFIGS: [(&str, TestConfigKind); 4] = [
        ("vitest.config.ts", TestConfigKind::Vitest),
        ("vitest.setup.ts", TestConfigKind::Setup),
        ("playwright.config.ts", TestConfigKind::Playwright),
        ("tsconfig.test.json", TestConfigKind::Utils),
    ];
    files
        .iter()
        .filter_map(|file| {
            let (_, kind) = CONFIGS
                .iter()
                .find(|(name, _)| file.path.ends_with(name))?;
            Some(GeneratedTestConfig {
                path: file.path.clone(),
                config_type: *kind,
                size: file.size,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prisma_schema_lists_models() {
        let files = vec![
            Artifact::new(
                "prisma/schema.prisma",
                "model User {\n  id String @id\n}\n\nmodel Todo {\n}\n",
            ),
            Artifact::new("lib/database/client.ts", "export const prisma = 1;"),
        ];
        let schemas = classify_schema_files(&files, Orm::Prisma);
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].models, vec!["User", "Todo"]);
    }

    #[test]
    fn drizzle_schema_lists_tables() {
        let files = vec![Artifact::new(
            "lib/database/schema.ts",
            "export const users = pgTable('users', {});\nexport const helper = 1;\n",
        )];
        let schemas = classify_schema_files(&files, Orm::Drizzle);
        assert_eq!(schemas[0].models, vec!["users"]);
    }

    #[test]
    fn seed_models_are_unique_in_order() {
        let files = vec![Artifact::new(
            "prisma/seed.ts",
            "await prisma.user.create({});\nawait prisma.todo.create({});\nawait prisma.user.create({});\nawait db.insert(tags)",
        )];
        let seeds = classify_seed_files(&files);
        assert_eq!(seeds[0].models, vec!["user", "todo", "tags"]);
    }

    #[test]
    fn client_files_by_name() {
        let files = vec![
            Artifact::new("lib/database/client.ts", ""),
            Artifact::new("lib/database/index.ts", ""),
            Artifact::new("lib/database/types.ts", ""),
            Artifact::new("lib/database/schema.ts", ""),
        ];
        let kinds: Vec<ClientFileKind> =
            classify_client_files(&files).iter().map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ClientFileKind::Client,
                ClientFileKind::Helper,
                ClientFileKind::Types
            ]
        );
    }

    #[test]
    fn components_levels_follow_directory() {
        let files = vec![
            Artifact::new(
                "components/ui/Button.tsx",
                "'use client'\n<button aria-label=\"x\" />",
            ),
            Artifact::new("components/forms/TodoForm.tsx", "<form />"),
            Artifact::new("components/layout/Header.tsx", "<header />"),
        ];
        let components = classify_components(&files);
        assert_eq!(components[0].level, ComponentLevel::Atom);
        assert_eq!(components[0].name, "Button");
        assert!(components[0].is_client);
        assert!(components[0].has_accessibility);
        assert_eq!(components[1].level, ComponentLevel::Molecule);
        assert_eq!(components[2].level, ComponentLevel::Organism);
        assert!(!components[2].has_accessibility);
    }

    #[test]
    fn page_routes_drop_groups() {
        assert_eq!(page_route("app/page.tsx"), "/");
        assert_eq!(page_route("app/todos/page.tsx"), "/todos");
        assert_eq!(page_route("app/(auth)/login/page.tsx"), "/login");
    }

    #[test]
    fn providers_report_known_features() {
        let files = vec![Artifact::new(
            "components/providers/AppProvider.tsx",
            "const client = new QueryClient(); <Toaster />",
        )];
        let providers = classify_providers(&files);
        assert_eq!(providers[0].provides, vec!["QueryClient", "Toaster"]);
    }

    #[test]
    fn api_routes_report_methods_and_guards() {
        let files = vec![Artifact::new(
            "app/api/todos/[id]/route.ts",
            "export async function GET() {}\nexport async function DELETE() { await requireAuth(); }\nconst s = z.object({});",
        )];
        let routes = classify_api_routes(&files);
        assert_eq!(routes[0].endpoint, "/api/todos/:id");
        assert_eq!(routes[0].methods, vec!["GET", "DELETE"]);
        assert!(routes[0].has_validation);
        assert!(routes[0].has_auth);
    }

    #[test]
    fn middleware_purpose_prefers_auth() {
        let files = vec![
            Artifact::new("middleware.ts", "const session = getSession();"),
            Artifact::new("lib/middleware/cors.ts", "cors headers"),
            Artifact::new("lib/middleware/trace.ts", "nothing special"),
        ];
        let purposes: Vec<MiddlewarePurpose> = classify_middleware(&files)
            .iter()
            .map(|m| m.purpose)
            .collect();
        assert_eq!(
            purposes,
            vec![
                MiddlewarePurpose::Authentication,
                MiddlewarePurpose::Cors,
                MiddlewarePurpose::General
            ]
        );
    }

    #[test]
    fn utilities_list_exported_functions() {
        let files = vec![
            Artifact::new(
                "lib/utils/format.ts",
                "export function formatDate() {}\nexport async function load() {}\nfunction hidden() {}",
            ),
            Artifact::new("lib/actions/todos.ts", "export async function createTodo() {}"),
        ];
        let utilities = classify_utilities(&files);
        assert_eq!(utilities.len(), 1);
        assert_eq!(utilities[0].functions, vec!["formatDate", "load"]);
        assert_eq!(classify_server_actions(&files)[0].name, "todos");
    }

    #[test]
    fn tests_are_bucketed_by_kind() {
        let files = vec![
            Artifact::new(
                "components/ui/Button.test.tsx",
                "describe('Button', () => {\n  it('renders', () => {});\n  it ('clicks', () => {});\n});\n",
            ),
            Artifact::new(
                "app/api/todos/route.test.ts",
                "describe(\"GET /api/todos\", () => { test('lists', async () => {}); });",
            ),
            Artifact::new("e2e/add-todos.spec.ts", "test.describe('Add todos', () => {});"),
            Artifact::new("vitest.config.ts", "export default {};"),
            Artifact::new("tsconfig.test.json", "{}"),
        ];

        let components = classify_tests(&files, TestKind::Component);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].target_file, "components/ui/Button.tsx");
        assert_eq!(components[0].test_count, 2);
        assert_eq!(components[0].coverage, vec!["Button"]);

        let api = classify_tests(&files, TestKind::Api);
        assert_eq!(api[0].target_file, "app/api/todos/route.ts");
        assert_eq!(api[0].coverage, vec!["GET /api/todos"]);

        let e2e = classify_tests(&files, TestKind::E2e);
        assert_eq!(e2e[0].target_file, "e2e/add-todos.spec.ts");
        assert_eq!(e2e[0].coverage, vec!["Add todos"]);

        let configs: Vec<TestConfigKind> = classify_test_configs(&files)
            .iter()
            .map(|config| config.config_type)
            .collect();
        assert_eq!(configs, vec![TestConfigKind::Vitest, TestConfigKind::Utils]);
    }
}
