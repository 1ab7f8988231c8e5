//! Orchestration of the generation phases.
//!
//! A [`Pipeline`] runs a fixed list of phases in order. The list is checked
//! when the pipeline is built: every phase may only read outputs of phases
//! that come before it. A failing phase stops the run; files already written
//! stay on disk.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use tracing::{error, info, instrument, warn};

use crate::core::schema::{PhaseName, PhaseOutput};
use crate::error::PipelineError;
use crate::io::config::PhaseToggles;
use crate::io::run_log::RunLog;
use crate::phases::{
    ArchitecturePhase, BackendPhase, ConfigPhase, DatabasePhase, FrontendPhase, Phase,
    PhaseOutputs, PhaseSettings, SpecParserPhase, TestingPhase,
};

/// What to generate.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Raw specification text.
    pub spec: String,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub outputs: PhaseOutputs,
}

impl PipelineOutcome {
    /// Directory of the generated project, once a code-producing phase ran.
    pub fn project_dir(&self) -> Option<&Path> {
        self.outputs.iter().find_map(|output| match output {
            PhaseOutput::Database(out) => Some(out.project_path.as_path()),
            PhaseOutput::Frontend(out) => Some(out.project_path.as_path()),
            PhaseOutput::Backend(out) => Some(out.project_path.as_path()),
            PhaseOutput::Testing(out) => Some(out.project_path.as_path()),
            PhaseOutput::Config(out) => Some(out.project_path.as_path()),
            PhaseOutput::SpecParser(_) | PhaseOutput::Architecture(_) => None,
        })
    }

    pub fn files_generated(&self) -> usize {
        self.outputs.files_generated()
    }
}

pub struct Pipeline {
    phases: Vec<Box<dyn Phase>>,
    run_log: Option<RunLog>,
}

impl Pipeline {
    /// Build a pipeline from `phases`, rejecting input declarations that
    /// cannot be satisfied by the phase order.
    pub fn new(phases: Vec<Box<dyn Phase>>) -> Result<Self> {
        validate_phase_order(&phases)?;
        Ok(Self {
            phases,
            run_log: None,
        })
    }

    /// The standard sequence: spec, architecture, the enabled code and test
    /// phases, then config. Phase outputs are logged under the settings' temp dir.
    pub fn standard(settings: &PhaseSettings, toggles: PhaseToggles) -> Result<Self> {
        let mut phases: Vec<Box<dyn Phase>> = vec![
            Box::new(SpecParserPhase::new(settings.clone())),
            Box::new(ArchitecturePhase::new(settings.clone())),
        ];
        if toggles.database {
            phases.push(Box::new(DatabasePhase::new(settings.clone())));
        }
        if toggles.frontend {
            phases.push(Box::new(FrontendPhase::new(settings.clone())));
        }
        if toggles.backend {
            phases.push(Box::new(BackendPhase::new(settings.clone())));
        }
        if toggles.testing {
            phases.push(Box::new(TestingPhase::new(settings.clone())));
        }
        phases.push(Box::new(ConfigPhase::new(settings.clone())));
        Ok(Self::new(phases)?.with_run_log(RunLog::new(&settings.temp_dir)))
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn phase_names(&self) -> Vec<PhaseName> {
        self.phases.iter().map(|phase| phase.name()).collect()
    }

    pub fn run(&self, request: &PipelineRequest) -> Result<PipelineOutcome> {
        self.run_with(request, |_| {})
    }

    /// Run every phase in order, calling `on_phase` after each one succeeds.
    #[instrument(skip_all, fields(phases = self.phases.len()))]
    pub fn run_with<F: FnMut(&PhaseOutput)>(
        &self,
        request: &PipelineRequest,
        mut on_phase: F,
    ) -> Result<PipelineOutcome> {
        let mut outputs = PhaseOutputs::default();
        for phase in &self.phases {
            let name = phase.name();
            info!(phase = %name, "starting phase");
            let inputs = outputs.view(name, &request.spec, phase.inputs());
            let output = match phase.run(&inputs) {
                Ok(output) => output,
                Err(err) => {
                    error!(phase = %name, err = %format!("{err:#}"), "phase failed");
                    if let Some(run_log) = &self.run_log
                        && let Err(log_err) = run_log.write_error(name, &err)
                    {
                        warn!(err = %format!("{log_err:#}"), "could not write error log");
                    }
                    return Err(err);
                }
            };
            if output.phase() != name {
                return Err(PipelineError::phase(
                    name,
                    format!("returned a {} output", output.phase()),
                )
                .into());
            }
            if let Some(run_log) = &self.run_log {
                run_log.write_phase_output(&output)?;
            }
            info!(phase = %name, files = output.files_generated(), "phase finished");
            on_phase(&output);
            outputs.insert(output);
        }
        Ok(PipelineOutcome { outputs })
    }
}

/// Check that each phase reads only outputs of earlier phases.
///
/// Required inputs must come from an earlier phase. Optional inputs may be
/// missing from the list entirely but may not come from a later phase.
pub fn validate_phase_order(phases: &[Box<dyn Phase>]) -> Result<(), PipelineError> {
    let all: HashSet<PhaseName> = phases.iter().map(|phase| phase.name()).collect();
    if all.len() != phases.len() {
        return Err(PipelineError::configuration(
            "pipeline lists the same phase more than once",
        ));
    }
    let mut earlier: HashSet<PhaseName> = HashSet::new();
    for phase in phases {
        for input in phase.inputs() {
            if earlier.contains(&input.phase) {
                continue;
            }
            if input.required || all.contains(&input.phase) {
                return Err(PipelineError::configuration(format!(
                    "phase {} reads {} which does not run before it",
                    phase.name(),
                    input.phase
                )));
            }
        }
        earlier.insert(phase.name());
    }
    Ok(())
}
