//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{LlmBackendKind, Settings};
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    /// The same result reported as a warning, for optional requirements.
    fn optional(mut self) -> Self {
        if self.status == CheckStatus::Error {
            self.status = CheckStatus::Warning;
        }
        self
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Lingo Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    // yt-dlp is the first transcript strategy; the others work without it.
    println!("{}", style("Transcript Tools").bold());
    let ytdlp = check_tool(
        &settings.transcript.ytdlp_path,
        "Install with: pip install yt-dlp (or your package manager)",
    )
    .optional();
    ytdlp.print();
    checks.push(ytdlp);

    println!();

    println!("{}", style(format!("LLM Backend ({})", settings.llm.backend)).bold());
    let llm_checks = check_llm_backend(settings);
    for check in &llm_checks {
        check.print();
    }
    checks.extend(llm_checks);

    println!();

    println!("{}", style("Retrieval").bold());
    let rag_check = if settings.rag.enabled {
        check_env_key(&settings.embedding.api_key_env).optional()
    } else {
        CheckResult::ok("Retrieval", "disabled")
    };
    rag_check.print();
    checks.push(rag_check);

    println!();

    println!("{}", style("Storage").bold());
    let db_check = check_database(&settings.sqlite_path());
    db_check.print();
    checks.push(db_check);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Lingo.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Lingo is ready to use.");
    }

    Ok(())
}

fn check_llm_backend(settings: &Settings) -> Vec<CheckResult> {
    match settings.llm.backend {
        LlmBackendKind::Cloud => vec![check_env_key(&settings.llm.cloud.api_key_env)],
        LlmBackendKind::Local => {
            let local = &settings.llm.local;
            let model = Settings::expand_path(&local.model_path);
            let model_check = if model.exists() {
                CheckResult::ok("Model", &model.display().to_string())
            } else {
                CheckResult::error(
                    "Model",
                    &format!("{} not found", model.display()),
                    "Download a GGUF model and set llm.local.model_path",
                )
            };
            vec![
                check_tool(&local.executable, "Build llama.cpp or install it with your package manager"),
                model_check,
            ]
        }
        LlmBackendKind::Ollama => vec![CheckResult::ok(
            "Ollama",
            &format!("{} (model {})", settings.llm.ollama.base_url, settings.llm.ollama.model),
        )],
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str, hint: &str) -> CheckResult {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version = stdout.lines().next().unwrap_or("installed").trim();
            CheckResult::ok(name, &truncate(version, 50))
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, "not found", hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// Check that an API key variable is set, showing a masked value.
fn check_env_key(var: &str) -> CheckResult {
    let hint = format!("Set with: export {}='...'", var);
    match std::env::var(var) {
        Ok(key) if key.trim().is_empty() => CheckResult::error(var, "empty", &hint),
        Ok(key) => CheckResult::ok(var, &format!("configured ({})", mask(&key))),
        Err(_) => CheckResult::error(var, "not set", &hint),
    }
}

fn check_database(db_path: &Path) -> CheckResult {
    if db_path.exists() {
        let size = std::fs::metadata(db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        CheckResult::ok("Database", &format!("{} ({})", db_path.display(), size))
    } else {
        CheckResult::warning(
            "Database",
            &format!("{} (not created yet)", db_path.display()),
            "Database will be created on first start",
        )
    }
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override settings", config_path.display()),
        )
    }
}

/// First and last four characters of a secret.
fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_downgrades_errors() {
        let result = CheckResult::error("yt-dlp", "not found", "install it").optional();
        assert_eq!(result.status, CheckStatus::Warning);
        assert_eq!(result.hint, Some("install it".to_string()));

        let result = CheckResult::ok("yt-dlp", "2024.08.06").optional();
        assert_eq!(result.status, CheckStatus::Ok);
    }

    #[test]
    fn test_missing_tool_is_error() {
        let result = check_tool("lingo-test-no-such-tool", "hint");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.message, "not found");
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("gsk_abcdefghijklmnop"), "gsk_...mnop");
        assert_eq!(mask("short"), "****");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }
}
