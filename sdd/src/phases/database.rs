//! Database layer generation: schema, client, and seed files for the chosen ORM.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::classifier::{
    classify_client_files, classify_migration_files, classify_schema_files, classify_seed_files,
};
use crate::core::extract::extract_code_blocks;
use crate::core::plan::plan_database;
use crate::core::schema::{PhaseName, PhaseOutput};
use crate::core::types::DatabaseOutput;
use crate::io::materialize::write_artifacts;

use super::{Phase, PhaseInput, PhaseInputs, PhaseSettings};

const INPUTS: &[PhaseInput] = &[
    PhaseInput::required(PhaseName::SpecParser),
    PhaseInput::required(PhaseName::Architecture),
];

pub struct DatabasePhase {
    settings: PhaseSettings,
}

impl DatabasePhase {
    pub fn new(settings: PhaseSettings) -> Self {
        Self { settings }
    }
}

impl Phase for DatabasePhase {
    fn name(&self) -> PhaseName {
        PhaseName::Database
    }

    fn inputs(&self) -> &'static [PhaseInput] {
        INPUTS
    }

    #[instrument(skip_all, fields(phase = %self.name()))]
    fn run(&self, inputs: &PhaseInputs<'_>) -> Result<PhaseOutput> {
        let spec = inputs.parsed_spec()?;
        let architecture = inputs.architecture()?;
        let project_path = self
            .settings
            .project_dir(self.name(), &architecture.project_name)?;

        let Some(plan) = plan_database(spec) else {
            info!("no data models; skipping database generation");
            return Ok(PhaseOutput::Database(DatabaseOutput {
                project_path,
                ..DatabaseOutput::default()
            }));
        };

        let prompts = &self.settings.prompts;
        let prompt = prompts.render_database(spec, &plan)?;
        let instructions = prompts.codegen_instructions("database schema generator")?;
        let response = self
            .settings
            .generate(self.name(), &prompt, Some(&instructions))?;

        let blocks = extract_code_blocks(&response);
        if blocks.is_empty() {
            warn!("oracle response contained no code blocks");
        }
        let written = write_artifacts(&project_path, &blocks)?;
        let output = DatabaseOutput {
            orm: Some(plan.orm),
            schema_files: classify_schema_files(&written, plan.orm),
            migration_files: classify_migration_files(&written),
            seed_files: classify_seed_files(&written),
            client_files: classify_client_files(&written),
            files_generated: written.len(),
            project_path,
        };
        info!(
            orm = plan.orm.as_str(),
            files = output.files_generated,
            models = plan.models.len(),
            "generated database layer"
        );
        Ok(PhaseOutput::Database(output))
    }
}
