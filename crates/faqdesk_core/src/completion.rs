//! The optional generative fallback used when no FAQ entry is close enough.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{FaqError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Prompt in, text out. Implementations may fail; callers degrade to a
/// fixed fallback message.
pub trait TextCompletion: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String>;
}

impl<F> TextCompletion for F
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> Result<String> {
        self(prompt)
    }
}

/// Runs a local command (e.g. `ollama run mistral`), feeding the prompt on
/// stdin and taking trimmed stdout as the answer.
#[derive(Debug, Clone)]
pub struct CommandCompletion {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCompletion {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Split a shell-style command line into program and arguments.
    pub fn parse(command_line: &str, timeout: Duration) -> Result<Self> {
        let mut words = shell_words::split(command_line)
            .map_err(|err| FaqError::Config(format!("completion command: {err}")))?;
        if words.is_empty() {
            return Err(FaqError::Config("completion command is empty".to_string()));
        }
        let program = words.remove(0);
        Ok(Self::new(program, words, timeout))
    }

    pub fn command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(self.args.iter()))
    }
}

impl TextCompletion for CommandCompletion {
    fn complete(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| FaqError::Completion(format!("spawn {}: {err}", self.program)))?;

        // Feed stdin and drain stdout off-thread so a chatty child cannot
        // block on a full pipe while we poll for exit.
        let mut stdin = child.stdin.take();
        let input = prompt.to_string();
        let writer = thread::spawn(move || {
            if let Some(stdin) = stdin.as_mut() {
                let _ = stdin.write_all(input.as_bytes());
            }
        });
        let mut stdout = child.stdout.take();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(out) = stdout.as_mut() {
                let _ = out.read_to_end(&mut buf);
            }
            buf
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(FaqError::CompletionTimeout(self.timeout));
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let _ = writer.join();
        let output = reader
            .join()
            .map_err(|_| FaqError::Completion("stdout reader panicked".to_string()))?;

        if !status.success() {
            return Err(FaqError::Completion(format!(
                "{} exited with {}",
                self.program,
                status.code().map_or_else(|| "signal".to_string(), |c| c.to_string())
            )));
        }

        let text = String::from_utf8_lossy(&output).trim().to_string();
        debug!(program = %self.program, bytes = text.len(), "completion finished");
        Ok(text)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_program_and_args() {
        let c = CommandCompletion::parse("ollama run 'mistral 7b'", Duration::from_secs(5)).unwrap();
        assert_eq!(c.program, "ollama");
        assert_eq!(c.args, vec!["run", "mistral 7b"]);
        assert_eq!(c.command_line(), "ollama run 'mistral 7b'");
    }

    #[test]
    fn parse_rejects_empty_command() {
        assert!(matches!(
            CommandCompletion::parse("   ", Duration::from_secs(1)),
            Err(FaqError::Config(_))
        ));
    }

    #[test]
    fn pipes_prompt_through_command() {
        let c = CommandCompletion::parse("cat", Duration::from_secs(5)).unwrap();
        assert_eq!(c.complete("  echo me \n").unwrap(), "echo me");
    }

    #[test]
    fn nonzero_exit_is_an_error() {
        let c = CommandCompletion::parse("sh -c 'exit 3'", Duration::from_secs(5)).unwrap();
        let err = c.complete("prompt").unwrap_err();
        assert!(err.to_string().contains("exited with 3"), "{err}");
    }

    #[test]
    fn missing_program_is_an_error() {
        let c = CommandCompletion::parse("definitely-not-a-real-binary-xyz", Duration::from_secs(1))
            .unwrap();
        assert!(matches!(c.complete("prompt"), Err(FaqError::Completion(_))));
    }

    #[test]
    fn slow_command_times_out() {
        let c = CommandCompletion::parse("sleep 5", Duration::from_millis(100)).unwrap();
        let started = Instant::now();
        assert!(matches!(
            c.complete("prompt"),
            Err(FaqError::CompletionTimeout(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn closures_are_completions() {
        let echo = |prompt: &str| -> Result<String> { Ok(prompt.len().to_string()) };
        assert_eq!(echo.complete("abc").unwrap(), "3");
    }
}
