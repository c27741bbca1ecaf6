//! System clipboard access

use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};
#[cfg(test)]
use std::sync::Mutex;
use thiserror::Error;

/// Clipboard errors
#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("No clipboard command is available on this platform")]
    Unavailable,

    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

/// Destination for copied text
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard backed by the platform's copy command
pub struct SystemClipboard {
    commands: Vec<Vec<String>>,
}

impl SystemClipboard {
    /// Use `command` if given, otherwise the platform defaults in order
    pub fn new(command: Option<Vec<String>>) -> Self {
        let commands = match command {
            Some(command) if !command.is_empty() => vec![command],
            _ => platform_commands(),
        };
        Self { commands }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn platform_commands() -> Vec<Vec<String>> {
    #[cfg(target_os = "macos")]
    {
        vec![argv(&["pbcopy"])]
    }

    #[cfg(target_os = "windows")]
    {
        vec![argv(&["clip"])]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        // Try Wayland first, then xclip, then xsel
        vec![
            argv(&["wl-copy"]),
            argv(&["xclip", "-selection", "clipboard"]),
            argv(&["xsel", "--clipboard", "--input"]),
        ]
    }
}

fn run_copy_command(argv: &[String], text: &str) -> Result<(), ClipboardError> {
    let (program, args) = argv.split_first().ok_or(ClipboardError::Unavailable)?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| ClipboardError::Spawn {
            program: program.clone(),
            source,
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(text.as_bytes())
            .map_err(|source| ClipboardError::Spawn {
                program: program.clone(),
                source,
            })?;
    }

    let status = child.wait().map_err(|source| ClipboardError::Spawn {
        program: program.clone(),
        source,
    })?;

    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::Failed {
            program: program.clone(),
            status,
        })
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut last_error = ClipboardError::Unavailable;

        for argv in &self.commands {
            match run_copy_command(argv, text) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!("Clipboard command failed: {}", e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// Clipboard that keeps every write in memory
#[cfg(test)]
#[derive(Default)]
pub struct MemoryClipboard {
    writes: Mutex<Vec<String>>,
}

#[cfg(test)]
impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[cfg(test)]
impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.writes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
}
