//! One-line summaries through an external text-generation CLI
//!
//! The prompt goes to the child's stdin and the summary comes back on stdout.
//! The child is killed if it outlives the configured timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{error, info};

use crate::SummarizerConfig;
use crate::pipeline::ScrapeResult;
use crate::utils::constants::TRUNCATION_MARKER;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("summarizer I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),

    #[error("summarizer timed out after {0:?}")]
    TimedOut(Duration),
}

/// Keep the first `max_chars` characters, marking the cut
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &content[..cut], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

/// Build the summarization prompt for `result`
pub fn render_prompt(url: &str, result: &ScrapeResult, max_chars: usize) -> String {
    let content = truncate_content(&result.content, max_chars);
    let metadata = &result.metadata;
    format!(
        r#"
Summarize the web page at {url} as a single line of markdown followed by a one sentence description.
Keep it short.
<example>[page title or short url]({url}) a very short summary of what the page is about.</example>
Reply with the markdown line only and nothing about how it was produced.
Do not open the page yourself. Work only from the extracted information below, already reduced to basic markdown.
If a summary is impossible, reply in plain text with a brief reason.
For a video page (YouTube or similar) use <example>[Site name: video title]({url}) short description of the video if possible</example>
<url>{url}</url>
<title>{title}</title>
<site-name>{site_name}</site-name>
<description>{description}</description>
<content-markdown>{content}</content-markdown>
"#,
        url = url,
        title = metadata.title,
        site_name = metadata.site_name,
        description = metadata.description,
        content = content,
    )
}

/// Runs the configured summarizer program
#[derive(Debug, Clone)]
pub struct Summarizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Summarizer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &SummarizerConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Feed `prompt` to the program and return its stdout
    ///
    /// One trailing newline is stripped from the output.
    ///
    /// # Errors
    /// Spawn and pipe failures, a non-zero exit (carrying stderr) and the
    /// timeout.
    pub async fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
        let started = Instant::now();
        info!(
            "Running summarizer {} (prompt {} bytes)",
            self.program,
            prompt.len()
        );

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SummarizeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Feeding stdin and draining stdout run together under one deadline;
        // kill_on_drop reaps the child when the timeout drops this future
        let stdin = child.stdin.take();
        let exchange = async move {
            let feed = async move {
                match stdin {
                    Some(stdin) => write_prompt(stdin, prompt).await,
                    None => Ok(()),
                }
            };
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            let output = output?;
            match fed {
                Ok(()) => Ok((output, true)),
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok((output, false)),
                Err(e) => Err(e),
            }
        };

        let (output, prompt_delivered) = match tokio::time::timeout(self.timeout, exchange).await {
            Ok(exchanged) => exchanged?,
            Err(_) => {
                error!("Summarizer {} timed out after {:?}", self.program, self.timeout);
                return Err(SummarizeError::TimedOut(self.timeout));
            }
        };

        if output.status.success() && !prompt_delivered {
            error!("Summarizer {} exited before reading the prompt", self.program);
            return Err(SummarizeError::Failed(format!(
                "{} exited before reading the prompt",
                self.program
            )));
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            };
            error!("Summarizer failed: {}", truncate_content(&message, 200));
            return Err(SummarizeError::Failed(message));
        }

        let mut stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.ends_with('\n') {
            stdout.pop();
            if stdout.ends_with('\r') {
                stdout.pop();
            }
        }

        info!(
            "Summarizer finished in {:?} ({} bytes)",
            started.elapsed(),
            stdout.len()
        );
        Ok(stdout)
    }
}

/// Closing stdin signals end of prompt
async fn write_prompt(mut stdin: tokio::process::ChildStdin, prompt: &str) -> std::io::Result<()> {
    stdin.write_all(prompt.as_bytes()).await?;
    stdin.shutdown().await
}
