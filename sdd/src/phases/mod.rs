//! Generation phases and the typed boundary between them.
//!
//! Each phase declares which earlier outputs it reads, receives a
//! [`PhaseInputs`] view holding exactly those outputs, and returns its own
//! [`PhaseOutput`] variant. Phases never see the pipeline's full output map.

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use indexmap::IndexMap;

use crate::core::schema::{ArchitectureOutput, ParsedSpec, PhaseName, PhaseOutput};
use crate::core::types::{BackendOutput, DatabaseOutput, FrontendOutput, TestingOutput};
use crate::error::PipelineError;
use crate::io::materialize::resolve_under;
use crate::io::oracle::GenerationOracle;
use crate::io::prompt::PromptEngine;

pub mod architecture;
pub mod backend;
pub mod config;
pub mod database;
pub mod frontend;
pub mod spec_parser;
pub mod testing;

pub use architecture::ArchitecturePhase;
pub use backend::BackendPhase;
pub use config::ConfigPhase;
pub use database::DatabasePhase;
pub use frontend::FrontendPhase;
pub use spec_parser::SpecParserPhase;
pub use testing::TestingPhase;

/// One earlier output a phase reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInput {
    pub phase: PhaseName,
    pub required: bool,
}

impl PhaseInput {
    pub const fn required(phase: PhaseName) -> Self {
        Self {
            phase,
            required: true,
        }
    }

    pub const fn optional(phase: PhaseName) -> Self {
        Self {
            phase,
            required: false,
        }
    }
}

/// A single generation stage.
pub trait Phase {
    fn name(&self) -> PhaseName;

    /// Earlier outputs this phase reads. Checked once when the pipeline is built.
    fn inputs(&self) -> &'static [PhaseInput];

    fn run(&self, inputs: &PhaseInputs<'_>) -> Result<PhaseOutput>;
}

/// Shared, read-only settings handed to every phase at construction.
#[derive(Clone)]
pub struct PhaseSettings {
    /// Generated projects land in `output_dir/<project name>`.
    pub output_dir: PathBuf,
    /// Run log directory.
    pub temp_dir: PathBuf,
    pub oracle: Rc<dyn GenerationOracle>,
    pub prompts: Rc<PromptEngine>,
}

impl PhaseSettings {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        oracle: Rc<dyn GenerationOracle>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            temp_dir: temp_dir.into(),
            oracle,
            prompts: Rc::new(PromptEngine::new()),
        }
    }

    /// Project directory for `project_name`, which must be a plain relative
    /// path under the output dir.
    pub fn project_dir(&self, phase: PhaseName, project_name: &str) -> Result<PathBuf> {
        resolve_under(&self.output_dir, project_name).ok_or_else(|| {
            PipelineError::phase(phase, format!("unusable project name {project_name:?}")).into()
        })
    }

    /// Call the oracle, reporting failures as a phase execution error.
    pub(crate) fn generate(
        &self,
        phase: PhaseName,
        prompt: &str,
        instructions: Option<&str>,
    ) -> Result<String> {
        self.oracle.generate(prompt, instructions).map_err(|err| {
            PipelineError::phase(phase, format!("oracle request failed: {err:#}")).into()
        })
    }
}

/// Outputs accumulated over one run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct PhaseOutputs {
    outputs: IndexMap<PhaseName, PhaseOutput>,
}

impl PhaseOutputs {
    pub fn insert(&mut self, output: PhaseOutput) {
        self.outputs.insert(output.phase(), output);
    }

    pub fn get(&self, phase: PhaseName) -> Option<&PhaseOutput> {
        self.outputs.get(&phase)
    }

    pub fn phases(&self) -> impl Iterator<Item = PhaseName> + '_ {
        self.outputs.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseOutput> {
        self.outputs.values()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Total files written by the code-producing phases.
    pub fn files_generated(&self) -> usize {
        self.iter().map(PhaseOutput::files_generated).sum()
    }

    /// Narrow the accumulated outputs to what `inputs` declares.
    pub fn view<'a>(
        &'a self,
        phase: PhaseName,
        spec: &'a str,
        inputs: &[PhaseInput],
    ) -> PhaseInputs<'a> {
        let outputs = inputs
            .iter()
            .filter_map(|input| {
                self.outputs
                    .get(&input.phase)
                    .map(|output| (input.phase, output))
            })
            .collect();
        PhaseInputs {
            phase,
            spec,
            outputs,
        }
    }
}

/// Read-only view of the outputs one phase declared.
#[derive(Debug, Clone)]
pub struct PhaseInputs<'a> {
    phase: PhaseName,
    spec: &'a str,
    outputs: IndexMap<PhaseName, &'a PhaseOutput>,
}

impl<'a> PhaseInputs<'a> {
    /// View with no prior outputs; used by the first phase and in tests.
    pub fn new(phase: PhaseName, spec: &'a str) -> Self {
        Self {
            phase,
            spec,
            outputs: IndexMap::new(),
        }
    }

    pub fn with(mut self, output: &'a PhaseOutput) -> Self {
        self.outputs.insert(output.phase(), output);
        self
    }

    /// Raw specification text of the request.
    pub fn spec(&self) -> &'a str {
        self.spec
    }

    pub fn contains(&self, phase: PhaseName) -> bool {
        self.outputs.contains_key(&phase)
    }

    fn missing(&self, input: PhaseName) -> anyhow::Error {
        PipelineError::phase(self.phase, format!("declared input {input} is not available")).into()
    }

    fn mismatched(&self, input: PhaseName, found: &PhaseOutput) -> anyhow::Error {
        PipelineError::phase(
            self.phase,
            format!("input {input} holds a {} output", found.phase()),
        )
        .into()
    }

    pub fn parsed_spec(&self) -> Result<&'a ParsedSpec> {
        match self.outputs.get(&PhaseName::SpecParser).copied() {
            Some(PhaseOutput::SpecParser(spec)) => Ok(spec),
            Some(other) => Err(self.mismatched(PhaseName::SpecParser, other)),
            None => Err(self.missing(PhaseName::SpecParser)),
        }
    }

    pub fn architecture(&self) -> Result<&'a ArchitectureOutput> {
        match self.outputs.get(&PhaseName::Architecture).copied() {
            Some(PhaseOutput::Architecture(architecture)) => Ok(architecture),
            Some(other) => Err(self.mismatched(PhaseName::Architecture, other)),
            None => Err(self.missing(PhaseName::Architecture)),
        }
    }

    /// Database output when the database phase ran.
    pub fn database(&self) -> Result<Option<&'a DatabaseOutput>> {
        match self.outputs.get(&PhaseName::Database).copied() {
            Some(PhaseOutput::Database(database)) => Ok(Some(database)),
            Some(other) => Err(self.mismatched(PhaseName::Database, other)),
            None => Ok(None),
        }
    }

    pub fn frontend(&self) -> Result<Option<&'a FrontendOutput>> {
        match self.outputs.get(&PhaseName::Frontend).copied() {
            Some(PhaseOutput::Frontend(frontend)) => Ok(Some(frontend)),
            Some(other) => Err(self.mismatched(PhaseName::Frontend, other)),
            None => Ok(None),
        }
    }

    pub fn backend(&self) -> Result<Option<&'a BackendOutput>> {
        match self.outputs.get(&PhaseName::Backend).copied() {
            Some(PhaseOutput::Backend(backend)) => Ok(Some(backend)),
            Some(other) => Err(self.mismatched(PhaseName::Backend, other)),
            None => Ok(None),
        }
    }

    /// Testing output when the testing phase ran.
    pub fn testing(&self) -> Result<Option<&'a TestingOutput>> {
        match self.outputs.get(&PhaseName::Testing).copied() {
            Some(PhaseOutput::Testing(testing)) => Ok(Some(testing)),
            Some(other) => Err(self.mismatched(PhaseName::Testing, other)),
            None => Ok(None),
        }
    }
}

/// Paths recorded by the database phase, so later phases leave them alone.
pub(crate) fn database_paths(database: Option<&DatabaseOutput>) -> Vec<&str> {
    let Some(database) = database else {
        return Vec::new();
    };
    database
        .schema_files
        .iter()
        .map(|file| file.path.as_str())
        .chain(database.migration_files.iter().map(|file| file.path.as_str()))
        .chain(database.seed_files.iter().map(|file| file.path.as_str()))
        .chain(database.client_files.iter().map(|file| file.path.as_str()))
        .collect()
}
