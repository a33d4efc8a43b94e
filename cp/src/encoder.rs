//! Document Encoder
//!
//! Turns a user-selected file into base64 plus its MIME type, the form the
//! vision provider accepts as inline data.

use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading or encoding a document
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// A selected file, read fully into memory
///
/// This is the upload session's source handle: name, declared MIME type and
/// raw bytes.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub path: PathBuf,
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    /// Read a file from disk, guessing its MIME type from the extension
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, EncodingError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "DocumentUpload::read: called");

        let bytes = tokio::fs::read(path).await.map_err(|source| EncodingError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(Self {
            path: path.to_path_buf(),
            filename,
            mime_type: guess_mime_type(path),
            bytes,
        })
    }

    /// Base64 form of the raw bytes
    pub fn encode(&self) -> EncodedDocument {
        debug!(filename = %self.filename, len = self.bytes.len(), "DocumentUpload::encode: called");
        EncodedDocument {
            data: STANDARD.encode(&self.bytes),
            mime_type: self.mime_type.clone(),
            filename: self.filename.clone(),
        }
    }
}

/// Base64 document payload with no `data:` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedDocument {
    pub data: String,
    pub mime_type: String,
    pub filename: String,
}

impl EncodedDocument {
    /// Build from a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str, filename: impl Into<String>) -> Result<Self, EncodingError> {
        debug!(len = url.len(), "EncodedDocument::from_data_url: called");
        let header = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .map(|(header, _)| header)
            .ok_or_else(|| EncodingError::InvalidDataUrl("missing data: header".to_string()))?;

        let mime_type = header.strip_suffix(";base64").unwrap_or(header);
        let mime_type = if mime_type.is_empty() {
            "application/octet-stream"
        } else {
            mime_type
        };

        let document = Self {
            data: strip_data_url_prefix(url).to_string(),
            mime_type: mime_type.to_string(),
            filename: filename.into(),
        };
        document.decode()?;
        Ok(document)
    }

    /// Decode back to raw bytes
    pub fn decode(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(STANDARD.decode(&self.data)?)
    }
}

/// Read and encode a file in one step
pub async fn encode_file(path: impl AsRef<Path>) -> Result<EncodedDocument, EncodingError> {
    Ok(DocumentUpload::read(path).await?.encode())
}

/// Drop a leading `data:<mime>;base64,` header if present
pub fn strip_data_url_prefix(data: &str) -> &str {
    if data.starts_with("data:")
        && let Some((_, payload)) = data.split_once(',')
    {
        return payload;
    }
    data
}

fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().essence_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_encode_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("scan.png");
        std::fs::write(&path, b"hello").unwrap();

        let encoded = encode_file(&path).await.unwrap();
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/png");
        assert_eq!(encoded.filename, "scan.png");
        assert!(!encoded.data.starts_with("data:"));
    }

    #[tokio::test]
    async fn test_unknown_extension_is_octet_stream() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("report.zzz");
        std::fs::write(&path, [0u8, 159, 146, 150]).unwrap();

        let upload = DocumentUpload::read(&path).await.unwrap();
        assert_eq!(upload.mime_type, "application/octet-stream");
        assert_eq!(upload.encode().decode().unwrap(), vec![0u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let temp = tempdir().unwrap();
        let err = encode_file(temp.path().join("missing.pdf")).await.unwrap_err();
        assert!(matches!(err, EncodingError::Io { .. }));
        assert!(err.to_string().contains("missing.pdf"));
    }

    #[test]
    fn test_strip_data_url_prefix() {
        assert_eq!(strip_data_url_prefix("data:image/png;base64,aGVsbG8="), "aGVsbG8=");
        assert_eq!(strip_data_url_prefix("aGVsbG8="), "aGVsbG8=");
    }

    #[test]
    fn test_from_data_url() {
        let doc = EncodedDocument::from_data_url("data:image/jpeg;base64,aGVsbG8=", "x.jpg").unwrap();
        assert_eq!(doc.mime_type, "image/jpeg");
        assert_eq!(doc.data, "aGVsbG8=");

        assert!(matches!(
            EncodedDocument::from_data_url("aGVsbG8=", "x.jpg"),
            Err(EncodingError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            EncodedDocument::from_data_url("data:image/png;base64,!!!", "x.png"),
            Err(EncodingError::InvalidBase64(_))
        ));
    }
}
