use std::{io::ErrorKind, path::Path, time::Duration};

use rand::Rng;
use tokio::io::AsyncBufReadExt;

use crate::errors::ConfigError;

pub async fn read_file_lines(path: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    let file = tokio::fs::read(path).await?;
    let mut lines = file.lines();

    let mut contents = vec![];
    while let Some(line) = lines.next_line().await? {
        contents.push(line);
    }

    Ok(contents)
}

/// Like [`read_file_lines`], but a missing file reads as empty.
pub async fn read_optional_file_lines(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    match read_file_lines(path).await {
        Ok(lines) => Ok(lines),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
        Err(source) => Err(ConfigError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Trims every line and drops blanks and `#` comments.
pub fn meaningful_lines<S: AsRef<str>>(lines: &[S]) -> Vec<&str> {
    lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

/// Uniformly random duration in `[min, max]`, millisecond resolution.
pub fn random_duration(min: Duration, max: Duration) -> Duration {
    let (min, max) = (min.as_millis() as u64, max.as_millis() as u64);
    if min >= max {
        return Duration::from_millis(min);
    }

    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}
