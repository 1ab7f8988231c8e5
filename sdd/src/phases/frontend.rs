//! Frontend generation: components, pages, and providers.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::classifier::{classify_components, classify_pages, classify_providers};
use crate::core::extract::extract_code_blocks;
use crate::core::plan::{filter_frontend_files, plan_components};
use crate::core::schema::{PhaseName, PhaseOutput};
use crate::core::types::FrontendOutput;
use crate::io::materialize::write_artifacts;

use super::{Phase, PhaseInput, PhaseInputs, PhaseSettings};

const INPUTS: &[PhaseInput] = &[
    PhaseInput::required(PhaseName::SpecParser),
    PhaseInput::required(PhaseName::Architecture),
];

pub struct FrontendPhase {
    settings: PhaseSettings,
}

impl FrontendPhase {
    pub fn new(settings: PhaseSettings) -> Self {
        Self { settings }
    }
}

impl Phase for FrontendPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Frontend
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

        let files = filter_frontend_files(&architecture.file_list);
        if files.is_empty() {
            info!("architecture lists no frontend files");
            return Ok(PhaseOutput::Frontend(FrontendOutput {
                project_path,
                ..FrontendOutput::default()
            }));
        }
        let plan = plan_components(&files);

        let prompts = &self.settings.prompts;
        let prompt = prompts.render_frontend(spec, &plan, &files)?;
        let instructions = prompts.codegen_instructions("frontend component generator")?;
        let response = self
            .settings
            .generate(self.name(), &prompt, Some(&instructions))?;

        let blocks = extract_code_blocks(&response);
        if blocks.len() < files.len() {
            warn!(
                expected = files.len(),
                received = blocks.len(),
                "oracle returned fewer files than planned"
            );
        }
        let written = write_artifacts(&project_path, &blocks)?;
        let output = FrontendOutput {
            components: classify_components(&written),
            pages: classify_pages(&written),
            providers: classify_providers(&written),
            files_generated: written.len(),
            project_path,
        };
        info!(
            files = output.files_generated,
            components = output.components.len(),
            pages = output.pages.len(),
            planned = plan.total(),
            "generated frontend"
        );
        Ok(PhaseOutput::Frontend(output))
    }
}
