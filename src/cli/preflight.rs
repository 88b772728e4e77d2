//! Pre-flight checks before starting the tutor.
//!
//! Validates that the configured LLM backend can run before the server starts accepting
//! requests that would otherwise fail midway.

use crate::config::{require_env, LlmBackendKind, Settings};
use crate::error::{LingoError, Result};
use std::process::Command;

/// Check that the selected LLM backend is usable.
pub fn check_llm(settings: &Settings) -> Result<()> {
    match settings.llm.backend {
        LlmBackendKind::Cloud => {
            require_env(&settings.llm.cloud.api_key_env)?;
        }
        LlmBackendKind::Local => {
            let local = &settings.llm.local;
            check_tool(&local.executable)?;
            let model = Settings::expand_path(&local.model_path);
            if !model.exists() {
                return Err(LingoError::Config(format!(
                    "Model file not found: {}. Set llm.local.model_path.",
                    model.display()
                )));
            }
        }
        // Reachability is only known on the first request.
        LlmBackendKind::Ollama => {}
    }
    Ok(())
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(LingoError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LingoError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(LingoError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_needs_nothing_upfront() {
        let mut settings = Settings::default();
        settings.llm.backend = LlmBackendKind::Ollama;
        assert!(check_llm(&settings).is_ok());
    }

    #[test]
    fn test_local_missing_executable() {
        let mut settings = Settings::default();
        settings.llm.backend = LlmBackendKind::Local;
        settings.llm.local.executable = "lingo-test-no-such-llama".to_string();

        let err = check_llm(&settings).unwrap_err();
        assert!(matches!(err, LingoError::ToolNotFound(_)));
    }

    #[test]
    fn test_cloud_requires_key_variable() {
        let mut settings = Settings::default();
        settings.llm.cloud.api_key_env = "LINGO_TEST_UNSET_KEY".to_string();

        let err = check_llm(&settings).unwrap_err();
        assert!(matches!(err, LingoError::Config(_)));
    }
}
