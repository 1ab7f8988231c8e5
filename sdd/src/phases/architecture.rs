//! Plans the project layout and file list from the parsed spec.

use anyhow::Result;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::extract::extract_json;
use crate::core::schema::{
    ARCHITECTURE_SCHEMA, ArchitectureOutput, PhaseName, PhaseOutput, validate_payload,
};

use super::{Phase, PhaseInput, PhaseInputs, PhaseSettings};

const INPUTS: &[PhaseInput] = &[PhaseInput::required(PhaseName::SpecParser)];

pub struct ArchitecturePhase {
    settings: PhaseSettings,
}

impl ArchitecturePhase {
    pub fn new(settings: PhaseSettings) -> Self {
        Self { settings }
    }
}

impl Phase for ArchitecturePhase {
    fn name(&self) -> PhaseName {
        PhaseName::Architecture
    }

    fn inputs(&self) -> &'static [PhaseInput] {
        INPUTS
    }

    #[instrument(skip_all, fields(phase = %self.name()))]
    fn run(&self, inputs: &PhaseInputs<'_>) -> Result<PhaseOutput> {
        let spec = inputs.parsed_spec()?;
        let prompts = &self.settings.prompts;
        let prompt = prompts.render_architecture(spec)?;
        let response = self.settings.generate(
            self.name(),
            &prompt,
            Some(prompts.architecture_instructions()),
        )?;

        let payload: Value = extract_json(&response)?;
        let architecture: ArchitectureOutput =
            validate_payload("architecture", payload, ARCHITECTURE_SCHEMA)?;
        if architecture.project_name != spec.project_name {
            warn!(
                planned = %architecture.project_name,
                parsed = %spec.project_name,
                "architecture renamed the project"
            );
        }
        info!(
            project = %architecture.project_name,
            files = architecture.file_list.len(),
            directories = architecture.project_structure.directories.len(),
            "planned architecture"
        );
        Ok(PhaseOutput::Architecture(architecture))
    }
}
