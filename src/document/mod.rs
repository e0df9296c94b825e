//! Transactions document loading
//!
//! The file is read as opaque UTF-8 text. No CSV parsing happens here;
//! whatever is in the file is what gets chunked and embedded.

pub mod splitter;

pub use splitter::ChunkSplitter;

use crate::error::AgentError;
use crate::Result;
use std::path::Path;
use tracing::{debug, info};

/// Read the whole transactions file as a single text blob.
pub async fn load_document(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading transactions file");

    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AgentError::DocumentError {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        path = %path.display(),
        bytes = text.len(),
        "Transactions file loaded"
    );

    Ok(text)
}
