//! Project configuration files.
//!
//! This phase is template-driven and never calls the oracle. `package.json`
//! is assembled from the tech stack, the detected ORM, and the dependencies
//! the architecture asked for; the remaining files are fixed templates or
//! small minijinja renders.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::core::schema::{ArchitectureOutput, ParsedSpec, PhaseName, PhaseOutput};
use crate::core::types::{ConfigFileKind, ConfigOutput, GeneratedConfigFile, Orm};
use crate::io::materialize::write_file;
use crate::io::prompt::{ReadmeContext, ScriptLine};

use super::{Phase, PhaseInput, PhaseInputs, PhaseSettings};

const TSCONFIG: &str = include_str!("templates/tsconfig.json");
const ESLINTRC: &str = include_str!("templates/eslintrc.json");
const NEXT_CONFIG: &str = include_str!("templates/next.config.js");
const TAILWIND_CONFIG: &str = include_str!("templates/tailwind.config.ts");
const POSTCSS_CONFIG: &str = include_str!("templates/postcss.config.js");
const GITIGNORE: &str = include_str!("templates/gitignore");

const INPUTS: &[PhaseInput] = &[
    PhaseInput::required(PhaseName::SpecParser),
    PhaseInput::required(PhaseName::Architecture),
    PhaseInput::optional(PhaseName::Database),
    PhaseInput::optional(PhaseName::Testing),
];

const BASE_DEPENDENCIES: [(&str, &str); 3] = [
    ("next", "^14.0.0"),
    ("react", "^18.0.0"),
    ("react-dom", "^18.0.0"),
];
const TAILWIND_DEPENDENCIES: [(&str, &str); 3] = [
    ("tailwindcss", "^3.4.0"),
    ("autoprefixer", "^10.4.0"),
    ("postcss", "^8.4.0"),
];
const SUPABASE_DEPENDENCIES: [(&str, &str); 2] = [
    ("@supabase/supabase-js", "^2.0.0"),
    ("@supabase/ssr", "^0.0.10"),
];
const COMMON_DEPENDENCIES: [(&str, &str); 3] = [
    ("zod", "^3.22.0"),
    ("lucide-react", "^0.294.0"),
    ("clsx", "^2.0.0"),
];
const DEV_DEPENDENCIES: [(&str, &str); 6] = [
    ("typescript", "^5.0.0"),
    ("@types/node", "^20.0.0"),
    ("@types/react", "^18.0.0"),
    ("@types/react-dom", "^18.0.0"),
    ("eslint", "^8.0.0"),
    ("eslint-config-next", "^14.0.0"),
];
const TEST_DEV_DEPENDENCIES: [(&str, &str); 7] = [
    ("vitest", "^1.2.0"),
    ("@vitejs/plugin-react", "^4.2.0"),
    ("jsdom", "^24.0.0"),
    ("@testing-library/react", "^14.1.0"),
    ("@testing-library/jest-dom", "^6.2.0"),
    ("@testing-library/user-event", "^14.5.0"),
    ("@playwright/test", "^1.41.0"),
];
const TEST_SCRIPTS: [(&str, &str); 2] = [("test", "vitest run"), ("test:e2e", "playwright test")];
const BASE_SCRIPTS: [(&str, &str); 4] = [
    ("dev", "next dev"),
    ("build", "next build"),
    ("start", "next start"),
    ("lint", "next lint"),
];
const PRISMA_SCRIPTS: [(&str, &str); 5] = [
    ("db:generate", "prisma generate"),
    ("db:push", "prisma db push"),
    ("db:migrate", "prisma migrate dev"),
    ("db:seed", "tsx prisma/seed.ts"),
    ("db:studio", "prisma studio"),
];
const DRIZZLE_SCRIPTS: [(&str, &str); 5] = [
    ("db:generate", "drizzle-kit generate:pg"),
    ("db:push", "drizzle-kit push:pg"),
    ("db:migrate", "tsx lib/database/migrate.ts"),
    ("db:seed", "tsx lib/database/seed.ts"),
    ("db:studio", "drizzle-kit studio"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    pub name: String,
    pub version: String,
    pub private: bool,
    pub description: String,
    pub scripts: IndexMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
}

fn uses_tailwind(spec: &ParsedSpec) -> bool {
    spec.tech_stack.styling.to_lowercase().contains("tailwind")
}

fn extend(map: &mut BTreeMap<String, String>, entries: &[(&str, &str)]) {
    for (name, version) in entries {
        map.insert((*name).to_string(), (*version).to_string());
    }
}

/// npm package name: lowercase, whitespace runs replaced by `-`.
pub fn package_name(project_name: &str) -> String {
    project_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

/// Assemble `package.json`. Entries from the architecture are added when the
/// base set does not already pin them.
pub fn package_json(
    spec: &ParsedSpec,
    architecture: &ArchitectureOutput,
    orm: Option<Orm>,
) -> PackageJson {
    let mut dependencies = BTreeMap::new();
    let mut dev_dependencies = BTreeMap::new();
    let mut scripts: IndexMap<String, String> = BASE_SCRIPTS
        .iter()
        .map(|(name, command)| ((*name).to_string(), (*command).to_string()))
        .collect();

    extend(&mut dependencies, &BASE_DEPENDENCIES);
    if uses_tailwind(spec) {
        extend(&mut dependencies, &TAILWIND_DEPENDENCIES);
    }
    let orm_scripts: &[(&str, &str)] = match orm {
        Some(Orm::Prisma) => {
            extend(&mut dependencies, &[("@prisma/client", "^5.0.0")]);
            extend(&mut dev_dependencies, &[("prisma", "^5.0.0"), ("tsx", "^4.7.0")]);
            &PRISMA_SCRIPTS
        }
        Some(Orm::Drizzle) => {
            extend(
                &mut dependencies,
                &[("drizzle-orm", "^0.29.0"), ("postgres", "^3.4.0")],
            );
            extend(
                &mut dev_dependencies,
                &[("drizzle-kit", "^0.20.0"), ("tsx", "^4.7.0")],
            );
            &DRIZZLE_SCRIPTS
        }
        None => {
            let database = spec.tech_stack.database.as_deref().unwrap_or("");
            if database.to_lowercase().contains("supabase") {
                extend(&mut dependencies, &SUPABASE_DEPENDENCIES);
            }
            &[]
        }
    };
    for (name, command) in orm_scripts {
        scripts.insert((*name).to_string(), (*command).to_string());
    }
    extend(&mut dependencies, &COMMON_DEPENDENCIES);
    extend(&mut dev_dependencies, &DEV_DEPENDENCIES);

    for (name, version) in &architecture.dependencies.dependencies {
        dependencies
            .entry(name.clone())
            .or_insert_with(|| version.clone());
    }
    for (name, version) in &architecture.dependencies.dev_dependencies {
        if !dependencies.contains_key(name) {
            dev_dependencies
                .entry(name.clone())
                .or_insert_with(|| version.clone());
        }
    }

    PackageJson {
        name: package_name(&spec.project_name),
        version: "0.1.0".to_string(),
        private: true,
        description: spec.description.clone(),
        scripts,
        dependencies,
        dev_dependencies,
    }
}

/// Add the runners and libraries the generated test suite imports.
pub fn add_test_tooling(package: &mut PackageJson) {
    extend(&mut package.dev_dependencies, &TEST_DEV_DEPENDENCIES);
    for (name, command) in TEST_SCRIPTS {
        package.scripts.insert(name.to_string(), command.to_string());
    }
}

pub struct ConfigPhase {
    settings: PhaseSettings,
}

impl ConfigPhase {
    pub fn new(settings: PhaseSettings) -> Self {
        Self { settings }
    }
}

/// Collects written config files for the phase output.
struct ConfigWriter<'a> {
    project_path: &'a Path,
    files: Vec<GeneratedConfigFile>,
}

impl ConfigWriter<'_> {
    fn write(&mut self, relative: &str, kind: ConfigFileKind, contents: &str) -> Result<()> {
        write_file(&self.project_path.join(relative), contents)?;
        debug!(path = relative, bytes = contents.len(), "wrote config file");
        self.files.push(GeneratedConfigFile {
            path: relative.to_string(),
            kind,
            size: contents.len(),
        });
        Ok(())
    }
}

impl Phase for ConfigPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Config
    }

    fn inputs(&self) -> &'static [PhaseInput] {
        INPUTS
    }

    #[instrument(skip_all, fields(phase = %self.name()))]
    fn run(&self, inputs: &PhaseInputs<'_>) -> Result<PhaseOutput> {
        let spec = inputs.parsed_spec()?;
        let architecture = inputs.architecture()?;
        let orm = inputs.database()?.and_then(|database| database.orm);
        let project_path = self
            .settings
            .project_dir(self.name(), &architecture.project_name)?;
        let prompts = &self.settings.prompts;

        let mut package = package_json(spec, architecture, orm);
        if inputs
            .testing()?
            .is_some_and(|testing| testing.files_generated > 0)
        {
            add_test_tooling(&mut package);
        }
        let mut package_text =
            serde_json::to_string_pretty(&package).context("serialize package.json")?;
        package_text.push('\n');

        let readme = prompts.render_readme(&ReadmeContext {
            project_name: spec.project_name.clone(),
            description: spec.description.clone(),
            framework: spec.tech_stack.frontend.clone(),
            styling: spec.tech_stack.styling.clone(),
            database: spec
                .tech_stack
                .database
                .clone()
                .unwrap_or_else(|| "None".to_string()),
            scripts: package
                .scripts
                .iter()
                .map(|(name, command)| ScriptLine {
                    name: name.clone(),
                    command: command.clone(),
                })
                .collect(),
        })?;
        let env_example = prompts.render_env_example(&spec.tech_stack)?;

        let mut writer = ConfigWriter {
            project_path: &project_path,
            files: Vec::new(),
        };
        writer.write("package.json", ConfigFileKind::Package, &package_text)?;
        writer.write("tsconfig.json", ConfigFileKind::Typescript, TSCONFIG)?;
        writer.write("next.config.js", ConfigFileKind::Next, NEXT_CONFIG)?;
        if uses_tailwind(spec) {
            writer.write("tailwind.config.ts", ConfigFileKind::Tailwind, TAILWIND_CONFIG)?;
            writer.write("postcss.config.js", ConfigFileKind::Postcss, POSTCSS_CONFIG)?;
        }
        writer.write(".eslintrc.json", ConfigFileKind::Eslint, ESLINTRC)?;
        writer.write(".gitignore", ConfigFileKind::Git, GITIGNORE)?;
        writer.write(".env.example", ConfigFileKind::Env, &env_example)?;
        writer.write("README.md", ConfigFileKind::Docs, &readme)?;

        let config_files = writer.files;
        info!(files = config_files.len(), "generated config files");
        Ok(PhaseOutput::Config(ConfigOutput {
            project_path,
            files_generated: config_files.len(),
            config_files,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DatabaseOutput;
    use crate::test_support::{ScriptedOracle, architecture, parsed_spec};
    use serde_json::Value;
    use std::fs;
    use std::rc::Rc;

    #[test]
    fn package_name_is_lowercase_kebab() {
        assert_eq!(package_name("My Todo  App"), "my-todo-app");
        assert_eq!(package_name("todo-app"), "todo-app");
    }

    #[test]
    fn prisma_adds_client_and_db_scripts() {
        let package = package_json(&parsed_spec(), &architecture(), Some(Orm::Prisma));
        assert_eq!(package.dependencies["@prisma/client"], "^5.0.0");
        assert_eq!(package.dev_dependencies["prisma"], "^5.0.0");
        assert_eq!(package.scripts["db:seed"], "tsx prisma/seed.ts");
        let names: Vec<&str> = package.scripts.keys().map(String::as_str).collect();
        assert_eq!(&names[..4], ["dev", "build", "start", "lint"]);
    }

    #[test]
    fn supabase_without_orm_adds_supabase_client() {
        let mut spec = parsed_spec();
        spec.tech_stack.database = Some("Supabase".to_string());
        let package = package_json(&spec, &architecture(), None);
        assert!(package.dependencies.contains_key("@supabase/supabase-js"));
        assert!(!package.scripts.contains_key("db:push"));
    }

    #[test]
    fn architecture_dependencies_never_override_base_pins() {
        let mut arch = architecture();
        arch.dependencies
            .dependencies
            .insert("next".to_string(), "^13.0.0".to_string());
        arch.dependencies
            .dependencies
            .insert("date-fns".to_string(), "^3.0.0".to_string());
        let package = package_json(&parsed_spec(), &arch, None);
        assert_eq!(package.dependencies["next"], "^14.0.0");
        assert_eq!(package.dependencies["date-fns"], "^3.0.0");
    }

    #[test]
    fn writes_config_files_without_the_oracle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let oracle = Rc::new(ScriptedOracle::new(Vec::new()));
        let phase = ConfigPhase::new(PhaseSettings::new(dir.path(), ".temp", oracle.clone()));
        let spec = PhaseOutput::SpecParser(parsed_spec());
        let arch = PhaseOutput::Architecture(architecture());
        let database = PhaseOutput::Database(DatabaseOutput {
            orm: Some(Orm::Drizzle),
            ..DatabaseOutput::default()
        });
        let inputs = PhaseInputs::new(PhaseName::Config, "")
            .with(&spec)
            .with(&arch)
            .with(&database);

        let PhaseOutput::Config(output) = phase.run(&inputs).expect("run") else {
            panic!("unexpected output variant");
        };
        assert!(oracle.calls().is_empty());
        assert_eq!(output.files_generated, 9);

        let project = dir.path().join("todo-app");
        let package: Value = serde_json::from_str(
            &fs::read_to_string(project.join("package.json")).expect("read"),
        )
        .expect("json");
        assert_eq!(package["name"], "todo-app");
        assert_eq!(package["scripts"]["db:push"], "drizzle-kit push:pg");
        assert_eq!(package["devDependencies"]["drizzle-kit"], "^0.20.0");

        let tsconfig: Value = serde_json::from_str(
            &fs::read_to_string(project.join("tsconfig.json")).expect("read"),
        )
        .expect("json");
        assert_eq!(tsconfig["compilerOptions"]["paths"]["@/*"][0], "./*");

        let readme = fs::read_to_string(project.join("README.md")).expect("read");
        assert!(readme.starts_with("# todo-app"));
        assert!(readme.contains("- `npm run db:seed` - `tsx lib/database/seed.ts`"));
    }

    #[test]
    fn generated_tests_pull_in_test_tooling() {
        use crate::core::types::TestingOutput;

        let dir = tempfile::tempdir().expect("tempdir");
        let oracle = Rc::new(ScriptedOracle::new(Vec::new()));
        let phase = ConfigPhase::new(PhaseSettings::new(dir.path(), ".temp", oracle));
        let spec = PhaseOutput::SpecParser(parsed_spec());
        let arch = PhaseOutput::Architecture(architecture());
        let testing = PhaseOutput::Testing(TestingOutput {
            files_generated: 2,
            ..TestingOutput::default()
        });
        let inputs = PhaseInputs::new(PhaseName::Config, "")
            .with(&spec)
            .with(&arch)
            .with(&testing);

        phase.run(&inputs).expect("run");
        let package: Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("todo-app/package.json")).expect("read"),
        )
        .expect("json");
        assert_eq!(package["scripts"]["test"], "vitest run");
        assert_eq!(package["devDependencies"]["@playwright/test"], "^1.41.0");
    }

    #[test]
    fn no_test_tooling_without_tests() {
        let package = package_json(&parsed_spec(), &architecture(), None);
        assert!(!package.scripts.contains_key("test"));
        assert!(!package.dev_dependencies.contains_key("vitest"));
    }
}
