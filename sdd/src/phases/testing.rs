//! Test suite generation for the code the earlier phases produced.
//!
//! Component and API tests are planned from the frontend and backend outputs;
//! end-to-end scenarios come from the spec's feature list. Only test files and
//! test config files are written, so a stray block cannot overwrite generated
//! application code.

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::classifier::{classify_test_configs, classify_tests};
use crate::core::extract::extract_code_blocks;
use crate::core::plan::{TEST_CONFIG_FILES, plan_tests};
use crate::core::schema::{PhaseName, PhaseOutput};
use crate::core::types::{TestKind, TestingOutput};
use crate::io::materialize::write_artifacts;

use super::{Phase, PhaseInput, PhaseInputs, PhaseSettings};

const INPUTS: &[PhaseInput] = &[
    PhaseInput::required(PhaseName::SpecParser),
    PhaseInput::required(PhaseName::Architecture),
    PhaseInput::optional(PhaseName::Frontend),
    PhaseInput::optional(PhaseName::Backend),
];

const TEST_SUFFIXES: [&str; 3] = [".test.ts", ".test.tsx", ".spec.ts"];

fn is_test_artifact(path: &str) -> bool {
    TEST_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
        || TEST_CONFIG_FILES.contains(&path)
}

pub struct TestingPhase {
    settings: PhaseSettings,
}

impl TestingPhase {
    pub fn new(settings: PhaseSettings) -> Self {
        Self { settings }
    }
}

impl Phase for TestingPhase {
    fn name(&self) -> PhaseName {
        PhaseName::Testing
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

        let plan = plan_tests(spec, inputs.frontend()?, inputs.backend()?);
        debug!(
            component_tests = plan.component_tests.len(),
            api_tests = plan.api_tests.len(),
            e2e_scenarios = plan.e2e_scenarios.len(),
            "test plan"
        );

        let prompts = &self.settings.prompts;
        let prompt = prompts.render_testing(spec, &plan)?;
        let instructions = prompts.codegen_instructions("test suite generator")?;
        let response = self
            .settings
            .generate(self.name(), &prompt, Some(&instructions))?;

        let mut blocks = extract_code_blocks(&response);
        blocks.retain(|path, _| {
            let keep = is_test_artifact(path);
            if !keep {
                warn!(path = %path, "skipping non-test file");
            }
            keep
        });
        if blocks.len() < plan.total() {
            warn!(
                expected = plan.total(),
                received = blocks.len(),
                "oracle returned fewer files than planned"
            );
        }
        let written = write_artifacts(&project_path, &blocks)?;
        let output = TestingOutput {
            component_tests: classify_tests(&written, TestKind::Component),
            api_tests: classify_tests(&written, TestKind::Api),
            e2e_tests: classify_tests(&written, TestKind::E2e),
            config_files: classify_test_configs(&written),
            files_generated: written.len(),
            project_path,
        };
        info!(
            files = output.files_generated,
            component_tests = output.component_tests.len(),
            api_tests = output.api_tests.len(),
            e2e_tests = output.e2e_tests.len(),
            "generated tests"
        );
        Ok(PhaseOutput::Testing(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ApiRoute, BackendOutput};
    use crate::test_support::{ScriptedOracle, architecture, parsed_spec};
    use std::fs;
    use std::rc::Rc;

    const RESPONSE: &str = "```typescript:app/api/todos/route.test.ts
import { describe, it } from 'vitest';
describe('GET /api/todos', () => {
  it('lists todos', async () => {});
  it('rejects anonymous users', async () => {});
});
```

```typescript:e2e/create-todos.spec.ts
import { test } from '@playwright/test';
test('creates a todo', async () => {});
```

```typescript:vitest.config.ts
export default {};
```

```typescript:app/api/todos/route.ts
export async function GET() { return null }
```
";

    #[test]
    fn writes_and_classifies_tests_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = dir.path().join("todo-app");
        fs::create_dir_all(project.join("app/api/todos")).expect("mkdir");
        fs::write(project.join("app/api/todos/route.ts"), "original\n").expect("write");

        let oracle = Rc::new(ScriptedOracle::new(vec![Ok(RESPONSE.to_string())]));
        let phase = TestingPhase::new(PhaseSettings::new(dir.path(), ".temp", oracle.clone()));
        let spec = PhaseOutput::SpecParser(parsed_spec());
        let arch = PhaseOutput::Architecture(architecture());
        let backend = PhaseOutput::Backend(BackendOutput {
            project_path: project.clone(),
            api_routes: vec![ApiRoute {
                path: "app/api/todos/route.ts".to_string(),
                endpoint: "/api/todos".to_string(),
                methods: vec!["GET".to_string()],
                has_validation: false,
                has_auth: false,
                size: 9,
            }],
            files_generated: 1,
            ..BackendOutput::default()
        });
        let inputs = PhaseInputs::new(PhaseName::Testing, "")
            .with(&spec)
            .with(&arch)
            .with(&backend);

        let PhaseOutput::Testing(output) = phase.run(&inputs).expect("run") else {
            panic!("unexpected output variant");
        };
        assert_eq!(output.files_generated, 3);
        assert_eq!(output.api_tests.len(), 1);
        assert_eq!(output.api_tests[0].test_count, 2);
        assert_eq!(output.api_tests[0].target_file, "app/api/todos/route.ts");
        assert_eq!(output.e2e_tests.len(), 1);
        assert_eq!(output.config_files.len(), 1);
        assert!(output.component_tests.is_empty());
        assert_eq!(
            fs::read_to_string(project.join("app/api/todos/route.ts")).expect("read"),
            "original\n"
        );

        let prompt = &oracle.calls()[0].prompt;
        assert!(prompt.contains("## API Routes to Test - 1\n- app/api/todos/route.ts"));
        assert!(prompt.contains("- create-todos"));
    }

    #[test]
    fn oracle_failure_is_a_phase_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let oracle = Rc::new(ScriptedOracle::new(vec![Err("boom".to_string())]));
        let phase = TestingPhase::new(PhaseSettings::new(dir.path(), ".temp", oracle));
        let spec = PhaseOutput::SpecParser(parsed_spec());
        let arch = PhaseOutput::Architecture(architecture());
        let inputs = PhaseInputs::new(PhaseName::Testing, "")
            .with(&spec)
            .with(&arch);

        let err = phase.run(&inputs).expect_err("oracle fails");
        assert!(matches!(
            err.downcast_ref::<crate::error::PipelineError>(),
            Some(crate::error::PipelineError::PhaseExecution {
                phase: PhaseName::Testing,
                ..
            })
        ));
    }
}
