use std::io::Write;
use std::process::{Command, Stdio};
use anyhow::{Result, anyhow};

// Tried in order; the first one that starts wins.
const COPY_COMMANDS: &[(&str, &[&str])] = &[
    ("pbcopy", &[]),
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("clip.exe", &[]),
];

pub fn copy_to_clipboard(text: &str) -> Result<()> {
    for (program, args) in COPY_COMMANDS {
        let Ok(mut child) = Command::new(program)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        else {
            continue;
        };

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }
        let status = child.wait()?;
        if status.success() {
            tracing::debug!(program, bytes = text.len(), "copied to clipboard");
            return Ok(());
        }
    }
    Err(anyhow!("no clipboard command available (tried pbcopy, wl-copy, xclip, xsel)"))
}
