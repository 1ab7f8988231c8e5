//! Backend generation: API routes, server actions, middleware, and utilities.

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::classifier::{
    classify_api_routes, classify_middleware, classify_server_actions, classify_utilities,
};
use crate::core::extract::extract_code_blocks;
use crate::core::plan::{filter_backend_files, plan_backend};
use crate::core::schema::{FileKind, PhaseName, PhaseOutput};
use crate::core::types::BackendOutput;
use crate::io::materialize::write_artifacts;

use super::{Phase, PhaseInput, PhaseInputs, PhaseSettings, database_paths};

const INPUTS: &[PhaseInput] = &[
    PhaseInput::required(PhaseName::SpecParser),
    PhaseInput::required(PhaseName::Architecture),
    PhaseInput::optional(PhaseName::Database),
];

pub struct BackendPhase {
    settings: PhaseSettings,
}

impl BackendPhase {
    pub fn new(settings: PhaseSettings) -> Self {
        Self { settings }
    }
}

impl Phase for BackendPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Backend
    }

    fn inputs(&self) -> &'static [PhaseInput] {
        INPUTS
    }

    #[instrument(skip_all, fields(phase = %self.name()))]
    fn run(&self, inputs: &PhaseInputs<'_>) -> Result<PhaseOutput> {
        let spec = inputs.parsed_spec()?;
        let architecture = inputs.architecture()?;
        let owned_by_database = database_paths(inputs.database()?);
        let project_path = self
            .settings
            .project_dir(self.name(), &architecture.project_name)?;

        // Config files belong to the config phase; database files are kept as generated.
        let files: Vec<_> = filter_backend_files(&architecture.file_list)
            .into_iter()
            .filter(|file| file.kind != FileKind::Config)
            .filter(|file| !owned_by_database.contains(&file.path.as_str()))
            .collect();
        if files.is_empty() {
            info!("architecture lists no backend files");
            return Ok(PhaseOutput::Backend(BackendOutput {
                project_path,
                ..BackendOutput::default()
            }));
        }
        let plan = plan_backend(&files);
        debug!(
            api_routes = plan.api_routes.len(),
            server_actions = plan.server_actions.len(),
            skipped_database_files = owned_by_database.len(),
            "backend plan"
        );

        let prompts = &self.settings.prompts;
        let prompt = prompts.render_backend(spec, &plan, &files)?;
        let instructions = prompts.codegen_instructions("backend API generator")?;
        let response = self
            .settings
            .generate(self.name(), &prompt, Some(&instructions))?;

        let mut blocks = extract_code_blocks(&response);
        blocks.retain(|path, _| {
            let keep = !owned_by_database.contains(&path.as_str());
            if !keep {
                warn!(path = %path, "leaving database file untouched");
            }
            keep
        });
        let written = write_artifacts(&project_path, &blocks)?;
        let output = BackendOutput {
            api_routes: classify_api_routes(&written),
            server_actions: classify_server_actions(&written),
            middleware: classify_middleware(&written),
            utilities: classify_utilities(&written),
            files_generated: written.len(),
            project_path,
        };
        info!(
            files = output.files_generated,
            api_routes = output.api_routes.len(),
            planned = plan.total(),
            "generated backend"
        );
        Ok(PhaseOutput::Backend(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ClientFile, ClientFileKind, DatabaseOutput};
    use crate::test_support::{ScriptedOracle, architecture, parsed_spec};
    use std::fs;
    use std::rc::Rc;

    const RESPONSE: &str = "```typescript:app/api/todos/route.ts
import { z } from 'zod';
export async function GET() {}
export async function POST() { z.object({}); }
```

```typescript:lib/database/client.ts
overwritten
```
";

    #[test]
    fn keeps_database_files_and_classifies_routes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = dir.path().join("todo-app");
        fs::create_dir_all(project.join("lib/database")).expect("mkdir");
        fs::write(project.join("lib/database/client.ts"), "original\n").expect("write");

        let oracle = Rc::new(ScriptedOracle::new(vec![Ok(RESPONSE.to_string())]));
        let phase = BackendPhase::new(PhaseSettings::new(dir.path(), ".temp", oracle.clone()));
        let spec = PhaseOutput::SpecParser(parsed_spec());
        let arch = PhaseOutput::Architecture(architecture());
        let database = PhaseOutput::Database(DatabaseOutput {
            project_path: project.clone(),
            client_files: vec![ClientFile {
                path: "lib/database/client.ts".to_string(),
                kind: ClientFileKind::Client,
                size: 9,
            }],
            files_generated: 1,
            ..DatabaseOutput::default()
        });
        let inputs = PhaseInputs::new(PhaseName::Backend, "")
            .with(&spec)
            .with(&arch)
            .with(&database);

        let PhaseOutput::Backend(output) = phase.run(&inputs).expect("run") else {
            panic!("unexpected output variant");
        };
        assert_eq!(output.files_generated, 1);
        assert_eq!(output.api_routes[0].endpoint, "/api/todos");
        assert_eq!(output.api_routes[0].methods, vec!["GET", "POST"]);
        assert!(output.api_routes[0].has_validation);
        assert_eq!(
            fs::read_to_string(project.join("lib/database/client.ts")).expect("read"),
            "original\n"
        );
        assert!(!oracle.calls()[0].prompt.contains("- lib/database/client.ts"));
    }
}
