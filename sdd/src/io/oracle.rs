//! Generation oracle abstraction.
//!
//! The [`GenerationOracle`] trait decouples phases and the repair loop from
//! the backend that actually produces text. Production runs spawn a CLI
//! ([`CommandOracle`]); tests use scripted oracles from `test_support`.

use std::env;
use std::process::Command;

use anyhow::{Result, anyhow};
use tracing::{debug, info, instrument, warn};

use crate::error::PipelineError;
use crate::io::config::OracleConfig;
use crate::io::process::run_bounded;

/// Produces response text for a prompt.
pub trait GenerationOracle {
    /// Return the oracle's text response. `instructions` carries phase-level
    /// guidance that should apply to the whole exchange.
    fn generate(&self, prompt: &str, instructions: Option<&str>) -> Result<String>;
}

impl<T: GenerationOracle + ?Sized> GenerationOracle for &T {
    fn generate(&self, prompt: &str, instructions: Option<&str>) -> Result<String> {
        (**self).generate(prompt, instructions)
    }
}

impl<T: GenerationOracle + ?Sized> GenerationOracle for std::rc::Rc<T> {
    fn generate(&self, prompt: &str, instructions: Option<&str>) -> Result<String> {
        (**self).generate(prompt, instructions)
    }
}

/// Oracle backed by an external CLI that reads the prompt from stdin and
/// prints the response on stdout.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    config: OracleConfig,
}

impl CommandOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    fn build(&self, prompt: &str, instructions: Option<&str>) -> Result<(Command, String)> {
        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("oracle command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args);

        let input = match (instructions, self.config.system_prompt_arg.as_deref()) {
            (Some(text), Some(flag)) => {
                cmd.arg(flag).arg(text);
                prompt.to_string()
            }
            (Some(text), None) => format!("{}\n\n---\n\n{prompt}", text.trim_end()),
            (None, _) => prompt.to_string(),
        };
        Ok((cmd, input))
    }
}

impl GenerationOracle for CommandOracle {
    #[instrument(skip_all, fields(prompt_bytes = prompt.len(), with_instructions = instructions.is_some()))]
    fn generate(&self, prompt: &str, instructions: Option<&str>) -> Result<String> {
        let (cmd, input) = self.build(prompt, instructions)?;
        info!("calling oracle");

        let output = run_bounded(cmd, Some(input.into_bytes()), self.config.limits())?;
        if output.timed_out {
            warn!(timeout_secs = self.config.timeout_secs, "oracle timed out");
            return Err(anyhow!(
                "oracle timed out after {}s",
                self.config.timeout_secs
            ));
        }
        if !output.status.success() {
            let detail = output.stderr_summary().unwrap_or_default();
            warn!(exit_code = ?output.status.code(), %detail, "oracle failed");
            return Err(anyhow!(
                "oracle exited with status {:?}: {detail}",
                output.status.code()
            ));
        }

        if output.stdout_truncated > 0 {
            warn!(
                limit = self.config.output_limit_bytes,
                dropped = output.stdout_truncated,
                "oracle response truncated"
            );
            return Err(anyhow!(
                "oracle response truncated after {} bytes ({} bytes dropped)",
                self.config.output_limit_bytes,
                output.stdout_truncated
            ));
        }

        let text = output.stdout_text();
        if text.trim().is_empty() {
            return Err(anyhow!("oracle returned a non-text response (empty stdout)"));
        }
        debug!(response_bytes = text.len(), "oracle call succeeded");
        Ok(text)
    }
}

/// Fail unless every variable in `required` is set to a non-empty value.
pub fn check_credentials(required: &[String]) -> Result<(), PipelineError> {
    let missing: Vec<&str> = required
        .iter()
        .filter(|name| !env::var(name.as_str()).is_ok_and(|value| !value.trim().is_empty()))
        .map(String::as_str)
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(PipelineError::configuration(format!(
        "missing required environment variable(s): {}",
        missing.join(", ")
    )))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn oracle(command: &[&str], system_prompt_arg: Option<&str>) -> CommandOracle {
        limited_oracle(command, system_prompt_arg, 10_000)
    }

    fn limited_oracle(
        command: &[&str],
        system_prompt_arg: Option<&str>,
        output_limit_bytes: usize,
    ) -> CommandOracle {
        CommandOracle::new(OracleConfig {
            command: command.iter().map(|s| s.to_string()).collect(),
            system_prompt_arg: system_prompt_arg.map(str::to_string),
            required_env: Vec::new(),
            timeout_secs: 10,
            output_limit_bytes,
        })
    }

    #[test]
    fn prompt_goes_to_stdin() {
        let response = oracle(&["cat"], None).generate("hello", None).expect("cat");
        assert_eq!(response, "hello");
    }

    #[test]
    fn instructions_are_prepended_without_flag() {
        let response = oracle(&["cat"], None)
            .generate("prompt", Some("rules\n"))
            .expect("cat");
        assert_eq!(response, "rules\n\n---\n\nprompt");
    }

    #[test]
    fn instructions_use_flag_when_configured() {
        // $1 is the flag, $2 its value.
        let response = oracle(&["sh", "-c", "printf '%s|' \"$2\"; cat", "sh"], Some("--sys"))
            .generate("prompt", Some("rules"))
            .expect("sh");
        assert_eq!(response, "rules|prompt");
    }

    #[test]
    fn empty_stdout_is_an_error() {
        let err = oracle(&["true"], None).generate("x", None).unwrap_err();
        assert!(err.to_string().contains("non-text response"));
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let err = oracle(&["sh", "-c", "echo boom >&2; exit 4"], None)
            .generate("x", None)
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn oversized_response_is_an_error() {
        let err = limited_oracle(&["cat"], None, 12)
            .generate("```ts\nconst a = 1;\n```\n", None)
            .unwrap_err();
        assert!(err.to_string().contains("truncated after 12 bytes"));
    }

    #[test]
    fn response_at_the_limit_is_kept() {
        let response = limited_oracle(&["cat"], None, 5)
            .generate("hello", None)
            .expect("cat");
        assert_eq!(response, "hello");
    }

    #[test]
    fn credentials_report_missing_names() {
        let name = "SDD_TEST_SURELY_UNSET_VARIABLE";
        let err = check_credentials(&[name.to_string()]).unwrap_err();
        assert!(err.to_string().contains(name));
        check_credentials(&[]).expect("nothing required");
    }
}
