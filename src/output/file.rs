//! Plain text file sink.
//!
//! Overwrites a file with the rendered text on every delivery. Suitable
//! for encoders and scripts that watch a file for the current song line.

use std::{path::PathBuf, time::Duration};

use async_trait::async_trait;

use crate::{error::Result, output::Output, text::StructuredText};

/// An output that drops the rendered text into a file.
pub struct FileOutput {
    name: String,
    delay: Duration,
    path: PathBuf,
}

impl FileOutput {
    /// Creates the output. The file is only written on delivery, never at
    /// construction.
    #[must_use]
    pub fn new(name: impl Into<String>, delay: Duration, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            delay,
            path,
        }
    }
}

#[async_trait]
impl Output for FileOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "file"
    }

    fn delay(&self) -> Duration {
        self.delay
    }

    async fn send(&self, text: &StructuredText) -> Result<()> {
        let mut contents = text.to_string();
        contents.push('\n');
        tokio::fs::write(&self.path, contents).await?;
        debug!("{}: wrote {}", self.name, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_the_rendered_line() {
        let path = std::env::temp_dir().join(format!("airtext-file-{}.txt", std::process::id()));
        let output = FileOutput::new("file", Duration::ZERO, path.clone());

        let mut text = StructuredText::new("Queen", "One Vision");
        text.prefix = "Nu: ".to_string();
        output.send(&text).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, "Nu: Queen - One Vision\n");
        let _ = tokio::fs::remove_file(&path).await;
    }
}
