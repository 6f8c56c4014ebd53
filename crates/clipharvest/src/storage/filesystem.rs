use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Writes downloaded videos to `{output_directory}/{platform}/{name}.{ext}`.
#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    output_directory: PathBuf,
}

impl ArtifactStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Stores `content` without ever overwriting: an existing file gets a
    /// numbered sibling (`name_2.mp4`, `name_3.mp4`, ...).
    pub fn store(
        &self,
        content: &[u8],
        relative_directory: &str,
        filename: &str,
        extension: &str,
    ) -> Result<PathBuf, StorageError> {
        let dir_path = self.output_directory.join(sanitize_segment(relative_directory));
        ensure_directory(&dir_path)?;

        let base = sanitize_segment(filename);
        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                format!("{}.{}", base, extension)
            } else {
                format!("{}_{}.{}", base, counter, extension)
            };
            let try_path = dir_path.join(&try_filename);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    file.write_all(content)
                        .map_err(|e| StorageError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    log::debug!("Stored {} bytes at {}", content.len(), try_path.display());
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(
            dir_path.join(format!("{}.{}", base, extension)),
        ))
    }
}

fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Keeps a single path segment: separators and parent references are replaced.
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        s => s.to_string(),
    }
}
