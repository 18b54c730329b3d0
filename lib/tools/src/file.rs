//! Plain-text file tools.
//!
//! File names resolve against the session's working directory. No path
//! restrictions are applied.

use async_trait::async_trait;
use parley_conversation::{
    NoArgs, ParameterKind, ParameterSpec, Tool, ToolContext, ToolFailure,
};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Returned when a read targets a missing file.
pub const FILE_NOT_FOUND: &str = "File not found";

/// Returned when the directory holds no text files.
pub const NO_TEXT_FILES: &str = "No text files found";

/// Extension matched by [`ListFiles`].
pub const LISTED_EXTENSION: &str = "txt";

/// Writes text to a file, replacing existing content.
pub struct SaveToFile;

/// Arguments for [`SaveToFile`].
#[derive(Debug, Deserialize)]
pub struct SaveToFileArgs {
    /// Target file name.
    pub filename: String,
    /// Text to write.
    pub content: String,
}

#[async_trait]
impl Tool for SaveToFile {
    type Args = SaveToFileArgs;

    fn name(&self) -> &'static str {
        "save_to_file"
    }

    fn description(&self) -> &'static str {
        "Saves text content to a file"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("filename", ParameterKind::String, "The filename to save to"),
            ParameterSpec::required(
                "content",
                ParameterKind::String,
                "The content to save in the file",
            ),
        ]
    }

    async fn call(&self, ctx: &ToolContext, args: SaveToFileArgs) -> Result<String, ToolFailure> {
        let path = ctx.resolve(&args.filename);
        Ok(match tokio::fs::write(&path, args.content.as_bytes()).await {
            Ok(()) => {
                debug!(path = %path.display(), bytes = args.content.len(), "saved file");
                format!("Successfully saved content to {}", args.filename)
            }
            Err(e) => format!("Error saving file: {e}"),
        })
    }
}

/// Reads a text file.
pub struct ReadFromFile;

/// Arguments for [`ReadFromFile`].
#[derive(Debug, Deserialize)]
pub struct ReadFromFileArgs {
    /// File to read.
    pub filename: String,
}

#[async_trait]
impl Tool for ReadFromFile {
    type Args = ReadFromFileArgs;

    fn name(&self) -> &'static str {
        "read_from_file"
    }

    fn description(&self) -> &'static str {
        "Reads content from a file"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "filename",
            ParameterKind::String,
            "The filename to read from",
        )]
    }

    async fn call(&self, ctx: &ToolContext, args: ReadFromFileArgs) -> Result<String, ToolFailure> {
        Ok(match tokio::fs::read_to_string(ctx.resolve(&args.filename)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => FILE_NOT_FOUND.to_string(),
            Err(e) => format!("Error reading file: {e}"),
        })
    }
}

/// Lists the text files in the working directory.
pub struct ListFiles;

#[async_trait]
impl Tool for ListFiles {
    type Args = NoArgs;

    fn name(&self) -> &'static str {
        "list_files"
    }

    fn description(&self) -> &'static str {
        "Lists all text files in the current directory"
    }

    async fn call(&self, ctx: &ToolContext, _args: NoArgs) -> Result<String, ToolFailure> {
        match text_files_in(ctx.working_dir()).await {
            Ok(names) if names.is_empty() => Ok(NO_TEXT_FILES.to_string()),
            Ok(names) => Ok(names.join(", ")),
            Err(e) => {
                debug!(error = %e, "listing failed");
                Ok(format!("Error listing files: {e}"))
            }
        }
    }
}

/// Sorted names of the text files directly inside `dir`.
///
/// Fails on the first unreadable entry rather than returning a partial list.
async fn text_files_in(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_text = path.extension().is_some_and(|ext| ext == LISTED_EXTENSION);
        let is_file = entry.file_type().await?.is_file();
        if is_text && is_file {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}
