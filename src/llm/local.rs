//! llama.cpp `llama-cli` subprocess backend.

use super::{LlmBackend, LlmRequest};
use crate::config::{LocalLlmSettings, Settings};
use crate::error::{LingoError, Result};
use crate::models::Role;
use crate::process::{BoundedCommand, ProcessLimiter, Termination};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Exit code llama-cli reports when stopped with SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

pub struct LocalBackend {
    settings: LocalLlmSettings,
    limiter: ProcessLimiter,
}

impl LocalBackend {
    pub fn new(settings: &LocalLlmSettings, limiter: ProcessLimiter) -> Self {
        Self {
            settings: settings.clone(),
            limiter,
        }
    }

    fn command(&self, prompt: String) -> BoundedCommand {
        let s = &self.settings;
        let model_path = Settings::expand_path(&s.model_path);

        BoundedCommand::new(&s.executable)
            .arg("-m")
            .arg(model_path.to_string_lossy())
            .args(["-ngl".to_string(), s.gpu_layers.to_string()])
            .args(["-c".to_string(), s.context_size.to_string()])
            .args(["-t".to_string(), s.threads.to_string()])
            .args(["-n".to_string(), s.max_tokens.to_string()])
            .args(["--temp".to_string(), s.temperature.to_string()])
            .args(["--repeat-penalty".to_string(), s.repeat_penalty.to_string()])
            .arg("--no-display-prompt")
            .arg("-p")
            .arg(prompt)
            .timeout(Duration::from_secs(s.timeout_seconds))
            .max_output_bytes(s.max_output_bytes)
            .limiter(self.limiter.clone())
    }
}

#[async_trait]
impl LlmBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    #[instrument(skip(self, request))]
    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        request.validate()?;

        let output = self.command(render_prompt(request)).run().await?;
        let markers = &self.settings.stop_markers;

        match output.termination {
            Termination::Exited(_) if output.success() => {
                let answer = clean_output(&output.stdout, markers);
                if answer.is_empty() {
                    return Err(LingoError::UpstreamFailure(
                        "llama-cli produced no output".to_string(),
                    ));
                }
                debug!(elapsed_ms = output.elapsed.as_millis() as u64, "llama-cli finished");
                Ok(answer)
            }
            Termination::Exited(_) if output.exit_code() == Some(INTERRUPTED_EXIT_CODE) => Err(
                LingoError::UpstreamFailure("llama-cli was interrupted".to_string()),
            ),
            Termination::Exited(_) => Err(LingoError::UpstreamFailure(format!(
                "llama-cli exited with {:?}: {}",
                output.exit_code(),
                output.stderr_tail(300)
            ))),
            Termination::TimedOut => match salvage(&output.stdout, markers) {
                Some(answer) => {
                    warn!("llama-cli timed out; using output up to the last stop marker");
                    Ok(answer)
                }
                None => Err(LingoError::UpstreamTimeout(format!(
                    "llama-cli did not finish within {}s",
                    self.settings.timeout_seconds
                ))),
            },
            Termination::OutputLimit => match salvage(&output.stdout, markers) {
                Some(answer) => {
                    warn!("llama-cli hit the output cap; using output up to the last stop marker");
                    Ok(answer)
                }
                None => Err(LingoError::UpstreamFailure(
                    "llama-cli exceeded the output limit".to_string(),
                )),
            },
        }
    }
}

/// Render a request as the plain-text transcript llama-cli continues.
fn render_prompt(request: &LlmRequest) -> String {
    let mut prompt = String::new();

    if let Some(system) = &request.system {
        prompt.push_str("System: ");
        prompt.push_str(system.trim());
        prompt.push_str("\n\n");
    }

    for message in &request.history {
        let speaker = match message.role {
            Role::User => "User",
            Role::Assistant => "Assistant",
        };
        prompt.push_str(&format!("{}: {}\n", speaker, message.content.trim()));
    }

    prompt.push_str(&format!("User: {}\nAssistant:", request.prompt.trim()));
    prompt
}

/// Trim the output and cut it at the first stop marker.
fn clean_output(output: &str, markers: &[String]) -> String {
    let end = markers
        .iter()
        .filter(|m| !m.is_empty())
        .filter_map(|m| output.find(m.as_str()))
        .min()
        .unwrap_or(output.len());

    output[..end].trim().to_string()
}

/// Recover an answer from a run that was killed: everything before the last stop
/// marker, with any earlier markers removed.
fn salvage(output: &str, markers: &[String]) -> Option<String> {
    let markers: Vec<&str> = markers
        .iter()
        .map(String::as_str)
        .filter(|m| !m.is_empty())
        .collect();
    let last = markers.iter().filter_map(|m| output.rfind(*m)).max()?;

    let answer = markers
        .iter()
        .fold(output[..last].to_string(), |text, m| text.replace(*m, "\n"))
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!answer.is_empty()).then_some(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;

    fn markers() -> Vec<String> {
        LocalLlmSettings::default().stop_markers
    }

    #[test]
    fn test_render_prompt() {
        let request = LlmRequest::new("And now?")
            .with_system("You are a tutor.")
            .with_history(vec![ChatMessage::user("Hi"), ChatMessage::assistant("Hello!")]);

        assert_eq!(
            render_prompt(&request),
            "System: You are a tutor.\n\nUser: Hi\nAssistant: Hello!\nUser: And now?\nAssistant:"
        );
    }

    #[test]
    fn test_clean_output_cuts_at_first_marker() {
        let out = "  Paris is the capital. [end of text]\nUser: more";
        assert_eq!(clean_output(out, &markers()), "Paris is the capital.");
        assert_eq!(clean_output("  plain answer \n", &markers()), "plain answer");
    }

    #[test]
    fn test_salvage() {
        assert_eq!(
            salvage("The answer.<|im_end|> rambling on and on", &markers()).as_deref(),
            Some("The answer.")
        );
        assert_eq!(salvage("no marker at all", &markers()), None);
        assert_eq!(salvage("[end of text]", &markers()), None);
    }

    #[test]
    fn test_salvage_keeps_text_up_to_last_marker() {
        let out = "First turn.<|im_end|>\nSecond turn. [end of text] trailing noise";
        assert_eq!(
            salvage(out, &markers()).as_deref(),
            Some("First turn.\nSecond turn.")
        );

        // A clean exit still stops at the first marker.
        assert_eq!(clean_output(out, &markers()), "First turn.");
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn fake_llama(dir: &std::path::Path, script: &str) -> LocalLlmSettings {
            let path = dir.join("llama-cli");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

            LocalLlmSettings {
                executable: path.to_string_lossy().into_owned(),
                model_path: dir.join("model.gguf").to_string_lossy().into_owned(),
                timeout_seconds: 1,
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn test_generate_with_clean_exit() {
            let dir = tempfile::tempdir().unwrap();
            let settings = fake_llama(dir.path(), "echo 'Bonjour means hello. [end of text]'");
            let backend = LocalBackend::new(&settings, ProcessLimiter::new(1));

            let answer = backend.generate(&LlmRequest::new("bonjour?")).await.unwrap();
            assert_eq!(answer, "Bonjour means hello.");
        }

        #[tokio::test]
        async fn test_timeout_salvages_marked_output() {
            let dir = tempfile::tempdir().unwrap();
            let settings = fake_llama(dir.path(), "echo 'Short answer. [end of text]'; sleep 30");
            let backend = LocalBackend::new(&settings, ProcessLimiter::new(1));

            let answer = backend.generate(&LlmRequest::new("q")).await.unwrap();
            assert_eq!(answer, "Short answer.");
        }

        #[tokio::test]
        async fn test_timeout_without_marker() {
            let dir = tempfile::tempdir().unwrap();
            let settings = fake_llama(dir.path(), "echo 'still thinking'; sleep 30");
            let backend = LocalBackend::new(&settings, ProcessLimiter::new(1));

            let err = backend.generate(&LlmRequest::new("q")).await.unwrap_err();
            assert!(matches!(err, LingoError::UpstreamTimeout(_)));
        }

        #[tokio::test]
        async fn test_interrupted_exit() {
            let dir = tempfile::tempdir().unwrap();
            let settings = fake_llama(dir.path(), "exit 130");
            let backend = LocalBackend::new(&settings, ProcessLimiter::new(1));

            let err = backend.generate(&LlmRequest::new("q")).await.unwrap_err();
            assert!(err.to_string().contains("interrupted"));
        }
    }
}
