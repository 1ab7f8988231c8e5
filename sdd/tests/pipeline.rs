//! End-to-end pipeline runs against a prompt-aware fake oracle.

use std::fs;
use std::rc::Rc;

use anyhow::anyhow;
use sdd::core::schema::PhaseName;
use sdd::error::PipelineError;
use sdd::io::config::PhaseToggles;
use sdd::phases::PhaseSettings;
use sdd::pipeline::{Pipeline, PipelineRequest};
use sdd::test_support::{FnOracle, ScriptedOracle, architecture_json, parsed_spec_json};

const SPEC: &str = "# Todo app\n\nUsers sign in and keep a list of todos.\n";

fn respond(prompt: &str) -> anyhow::Result<String> {
    if prompt.contains("# Specification Document") {
        return Ok(format!("```json\n{}\n```", parsed_spec_json()));
    }
    if prompt.contains("# Parsed Specification") {
        return Ok(architecture_json());
    }
    if prompt.contains("# Database Configuration") {
        return Ok("```prisma:prisma/schema.prisma\nmodel User {\n}\n```\n".to_string());
    }
    if prompt.contains("# Component Plan") {
        return Ok("```tsx:app/page.tsx\nexport default function Home() {}\n```\n".to_string());
    }
    if prompt.contains("# Backend Plan") {
        return Ok(
            "```typescript:app/api/todos/route.ts\nexport async function GET() {}\n```\n"
                .to_string(),
        );
    }
    if prompt.contains("# Test Plan") {
        return Ok(concat!(
            "```typescript:app/api/todos/route.test.ts\n",
            "describe('GET /api/todos', () => { it('lists', async () => {}); });\n```\n\n",
            "```typescript:vitest.config.ts\nexport default {};\n```\n",
        )
        .to_string());
    }
    Err(anyhow!("unexpected prompt"))
}

#[test]
fn standard_pipeline_writes_project_and_run_log() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output_dir = temp.path().join("output");
    let temp_dir = temp.path().join(".temp");
    let oracle = Rc::new(FnOracle::new(|prompt: &str, _: Option<&str>| respond(prompt)));
    let settings = PhaseSettings::new(&output_dir, &temp_dir, oracle);
    let pipeline = Pipeline::standard(&settings, PhaseToggles::default()).expect("pipeline");

    let mut order = Vec::new();
    let outcome = pipeline
        .run_with(
            &PipelineRequest {
                spec: SPEC.to_string(),
            },
            |output| order.push(output.phase()),
        )
        .expect("run");

    assert_eq!(
        order,
        vec![
            PhaseName::SpecParser,
            PhaseName::Architecture,
            PhaseName::Database,
            PhaseName::Frontend,
            PhaseName::Backend,
            PhaseName::Config,
        ]
    );
    let project = output_dir.join("todo-app");
    assert_eq!(outcome.project_dir(), Some(project.as_path()));
    for path in [
        "prisma/schema.prisma",
        "app/page.tsx",
        "app/api/todos/route.ts",
        "package.json",
        "README.md",
    ] {
        assert!(project.join(path).is_file(), "missing {path}");
    }
    for name in ["parsed-spec.json", "architecture.json", "database.json", "config.json"] {
        assert!(temp_dir.join(name).is_file(), "missing {name}");
    }
    assert_eq!(outcome.files_generated(), 3 + 9);
}

#[test]
fn testing_phase_runs_before_config_when_enabled() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output_dir = temp.path().join("output");
    let temp_dir = temp.path().join(".temp");
    let oracle = Rc::new(FnOracle::new(|prompt: &str, _: Option<&str>| respond(prompt)));
    let settings = PhaseSettings::new(&output_dir, &temp_dir, oracle);
    let toggles = PhaseToggles {
        testing: true,
        ..PhaseToggles::default()
    };
    let pipeline = Pipeline::standard(&settings, toggles).expect("pipeline");

    let outcome = pipeline
        .run(&PipelineRequest {
            spec: SPEC.to_string(),
        })
        .expect("run");

    let phases: Vec<PhaseName> = outcome.outputs.phases().collect();
    assert_eq!(&phases[4..], [PhaseName::Backend, PhaseName::Testing, PhaseName::Config]);
    let project = output_dir.join("todo-app");
    assert!(project.join("app/api/todos/route.test.ts").is_file());
    assert!(temp_dir.join("testing.json").is_file());
    let package = fs::read_to_string(project.join("package.json")).expect("package.json");
    assert!(package.contains("\"test\": \"vitest run\""));
    assert_eq!(outcome.files_generated(), 3 + 2 + 9);
}

#[test]
fn failing_phase_stops_the_run_and_keeps_earlier_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output_dir = temp.path().join("output");
    let temp_dir = temp.path().join(".temp");
    let oracle = Rc::new(FnOracle::new(|prompt: &str, _: Option<&str>| {
        if prompt.contains("# Component Plan") {
            return Err(anyhow!("oracle exited with status 1"));
        }
        respond(prompt)
    }));
    let settings = PhaseSettings::new(&output_dir, &temp_dir, oracle);
    let pipeline = Pipeline::standard(&settings, PhaseToggles::default()).expect("pipeline");

    let mut order = Vec::new();
    let err = pipeline
        .run_with(
            &PipelineRequest {
                spec: SPEC.to_string(),
            },
            |output| order.push(output.phase()),
        )
        .expect_err("frontend fails");

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::PhaseExecution {
            phase: PhaseName::Frontend,
            ..
        })
    ));
    assert_eq!(
        order,
        vec![PhaseName::SpecParser, PhaseName::Architecture, PhaseName::Database]
    );
    let project = output_dir.join("todo-app");
    assert!(project.join("prisma/schema.prisma").is_file());
    assert!(!project.join("package.json").exists());
    assert!(!temp_dir.join("backend.json").exists());
    let log = fs::read_to_string(temp_dir.join("error.log")).expect("error log");
    assert!(log.contains("oracle exited with status 1"));
}

#[test]
fn unparsable_spec_payload_is_an_extraction_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let oracle = Rc::new(ScriptedOracle::new(vec![Ok("I cannot do that.".to_string())]));
    let settings = PhaseSettings::new(temp.path(), temp.path().join(".temp"), oracle.clone());
    let pipeline = Pipeline::standard(&settings, PhaseToggles::default()).expect("pipeline");

    let err = pipeline
        .run(&PipelineRequest {
            spec: SPEC.to_string(),
        })
        .expect_err("no json");

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Extraction(_))
    ));
    assert_eq!(oracle.calls().len(), 1);
}

#[test]
fn phase_error_survives_an_unwritable_run_log() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blocked = temp.path().join("not-a-dir");
    fs::write(&blocked, "").expect("write");
    let oracle = Rc::new(ScriptedOracle::new(vec![Err("boom".to_string())]));
    let settings = PhaseSettings::new(temp.path().join("output"), &blocked, oracle);
    let pipeline = Pipeline::standard(&settings, PhaseToggles::default()).expect("pipeline");

    let err = pipeline
        .run(&PipelineRequest {
            spec: SPEC.to_string(),
        })
        .expect_err("spec parser fails");

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::PhaseExecution {
            phase: PhaseName::SpecParser,
            ..
        })
    ));
    assert!(format!("{err:#}").contains("boom"));
    assert!(blocked.is_file());
}
