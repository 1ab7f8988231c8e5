//! Turns the free-form specification into a validated [`ParsedSpec`].

use anyhow::Result;
use serde_json::Value;
use tracing::{info, instrument};

use crate::core::extract::extract_json;
use crate::core::schema::{PARSED_SPEC_SCHEMA, ParsedSpec, PhaseName, PhaseOutput, validate_payload};
use crate::error::PipelineError;

use super::{Phase, PhaseInput, PhaseInputs, PhaseSettings};

pub struct SpecParserPhase {
    settings: PhaseSettings,
}

impl SpecParserPhase {
    pub fn new(settings: PhaseSettings) -> Self {
        Self { settings }
    }
}

impl Phase for SpecParserPhase {
    fn name(&self) -> PhaseName {
        PhaseName::SpecParser
    }

    fn inputs(&self) -> &'static [PhaseInput] {
        &[]
    }

    #[instrument(skip_all, fields(phase = %self.name()))]
    fn run(&self, inputs: &PhaseInputs<'_>) -> Result<PhaseOutput> {
        let spec = inputs.spec();
        if spec.trim().is_empty() {
            return Err(PipelineError::phase(self.name(), "specification is empty").into());
        }
        let prompts = &self.settings.prompts;
        let prompt = prompts.render_spec_parser(spec)?;
        let response = self.settings.generate(
            self.name(),
            &prompt,
            Some(prompts.spec_parser_instructions()),
        )?;

        let payload: Value = extract_json(&response)?;
        let parsed: ParsedSpec = validate_payload("parsed spec", payload, PARSED_SPEC_SCHEMA)?;
        info!(
            project = %parsed.project_name,
            features = parsed.features.len(),
            models = parsed.data_models.len(),
            endpoints = parsed.api_endpoints.len(),
            "parsed specification"
        );
        Ok(PhaseOutput::SpecParser(parsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedOracle, parsed_spec_json};
    use std::rc::Rc;

    fn phase(oracle: Rc<ScriptedOracle>) -> SpecParserPhase {
        SpecParserPhase::new(PhaseSettings::new("out", ".temp", oracle))
    }

    #[test]
    fn parses_fenced_json_payload() {
        let response = format!("Here you go:\n```json\n{}\n```\n", parsed_spec_json());
        let oracle = Rc::new(ScriptedOracle::new(vec![Ok(response)]));
        let output = phase(oracle.clone())
            .run(&PhaseInputs::new(PhaseName::SpecParser, "# Todo app\nTrack todos."))
            .expect("run");

        let PhaseOutput::SpecParser(spec) = output else {
            panic!("unexpected output variant");
        };
        assert_eq!(spec.project_name, "todo-app");
        let calls = oracle.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("Track todos."));
        assert!(calls[0].instructions.is_some());
    }

    #[test]
    fn schema_violation_is_an_extraction_error() {
        let oracle = Rc::new(ScriptedOracle::new(vec![Ok(
            r#"{"projectName": "x"}"#.to_string()
        )]));
        let err = phase(oracle)
            .run(&PhaseInputs::new(PhaseName::SpecParser, "spec"))
            .expect_err("invalid payload");
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Extraction(message)) if message.contains("schema validation")
        ));
    }

    #[test]
    fn oracle_failure_is_a_phase_error() {
        let oracle = Rc::new(ScriptedOracle::new(vec![Err("boom".to_string())]));
        let err = phase(oracle)
            .run(&PhaseInputs::new(PhaseName::SpecParser, "spec"))
            .expect_err("oracle failure");
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::PhaseExecution {
                phase: PhaseName::SpecParser,
                ..
            })
        ));
    }

    #[test]
    fn empty_spec_never_reaches_the_oracle() {
        let oracle = Rc::new(ScriptedOracle::new(Vec::new()));
        assert!(
            phase(oracle.clone())
                .run(&PhaseInputs::new(PhaseName::SpecParser, "  \n"))
                .is_err()
        );
        assert!(oracle.calls().is_empty());
    }
}
