//! `gemini` command line client.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError};

static ANSI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1B\[[0-?]*[ -/]*[@-~]").unwrap());

/// Status lines the CLI prints on stdout in non-interactive mode.
static NOISE_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^Loaded cached credentials\.\s*$",
        r"(?i)^Using model\b.*$",
        r"(?i)^Authenticated as\b.*$",
        r"(?i)^Checkpoint.*$",
        r"(?i)^>GEMINI\b.*$",
        r"(?i)^\[Sandbox\].*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Strip ANSI escapes, blank lines and CLI status lines, keeping model text.
pub fn clean_cli_output(raw: &str) -> String {
    let stripped = ANSI_RE.replace_all(raw, "");
    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !NOISE_RES.iter().any(|re| re.is_match(line)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Runs `gemini [--sandbox] -m <model> -p <prompt>`.
pub struct GeminiCliClient {
    cli_path: PathBuf,
    model: String,
    sandbox: bool,
    timeout: Duration,
}

impl GeminiCliClient {
    pub fn new(cli_path: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            model: model.into(),
            sandbox: false,
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn args(&self, prompt: &str, sandbox: bool) -> Vec<String> {
        let mut args = Vec::with_capacity(5);
        if sandbox {
            args.push("--sandbox".to_string());
        }
        args.extend([
            "-m".to_string(),
            self.model.clone(),
            "-p".to_string(),
            prompt.to_string(),
        ]);
        args
    }

    async fn run(&self, prompt: &str, sandbox: bool) -> Result<String, LlmError> {
        let child = Command::new(&self.cli_path)
            .args(self.args(prompt, sandbox))
            .env("NO_COLOR", "1")
            .env("CI", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    LlmError::CliNotFound(self.cli_path.display().to_string())
                } else {
                    LlmError::Http(e.to_string())
                }
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))?
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(200)
                .collect();
            return Err(LlmError::CliFailed {
                code: output.status.code(),
                stderr,
            });
        }

        let text = clean_cli_output(&String::from_utf8_lossy(&output.stdout));
        if text.is_empty() {
            return Err(LlmError::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl LlmClient for GeminiCliClient {
    fn provider(&self) -> &str {
        "gemini-cli"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request.full_prompt();
        let text = if self.sandbox {
            match self.run(&prompt, true).await {
                Ok(text) => text,
                Err(LlmError::CliNotFound(path)) => return Err(LlmError::CliNotFound(path)),
                Err(e) => {
                    warn!(error = %e, "Sandboxed gemini run failed, retrying without sandbox");
                    self.run(&prompt, false).await?
                }
            }
        } else {
            self.run(&prompt, false).await?
        };

        debug!(model = %self.model, chars = text.chars().count(), "Gemini CLI answered");
        Ok(CompletionResponse {
            text,
            model: self.model.clone(),
            provider: self.provider().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_cli_output_drops_noise() {
        let raw = "\x1b[32mLoaded cached credentials.\x1b[0m\n\
                   Using model gemini-2.5-pro\n\
                   \n\
                   [Sandbox] starting\n\
                   翻译：新作发表\n\
                   标签：动画, 新作\n";
        assert_eq!(clean_cli_output(raw), "翻译：新作发表\n标签：动画, 新作");
    }

    #[test]
    fn test_clean_cli_output_only_noise() {
        assert_eq!(clean_cli_output("Loaded cached credentials.\n\n"), "");
    }

    #[test]
    fn test_args_layout() {
        let client = GeminiCliClient::new("gemini", "gemini-2.5-flash");
        assert_eq!(
            client.args("hi", true),
            vec!["--sandbox", "-m", "gemini-2.5-flash", "-p", "hi"]
        );
        assert_eq!(client.args("hi", false)[0], "-m");
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let client = GeminiCliClient::new("/nonexistent/gemini", "m");
        let err = client.complete(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, LlmError::CliNotFound(_)));
    }

    #[tokio::test]
    async fn test_runs_binary_and_returns_stdout() {
        // `echo` stands in for the CLI and prints its own arguments.
        let client = GeminiCliClient::new("echo", "m1");
        let response = client.complete(CompletionRequest::new("hello")).await.unwrap();
        assert_eq!(response.text, "-m m1 -p hello");
        assert_eq!(response.provider, "gemini-cli");
    }

    #[tokio::test]
    async fn test_non_zero_exit() {
        let client = GeminiCliClient::new("false", "m");
        let err = client.complete(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, LlmError::CliFailed { .. }));
    }
}
