//! Base64 attachments for upload payloads

use crate::config::model::DEFAULT_MAX_ATTACHMENT_BYTES;
use crate::error::{EssError, EssResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use std::path::Path;

/// A file encoded as a `data:` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    /// Size of the raw file in bytes
    pub size: usize,
    data_url: String,
}

impl Attachment {
    /// Encode in-memory bytes; `max_bytes` bounds the raw size
    pub fn from_bytes(
        file_name: impl Into<String>,
        bytes: &[u8],
        max_bytes: usize,
    ) -> EssResult<Self> {
        let file_name = file_name.into();
        check_size(&file_name, bytes.len(), max_bytes)?;

        let mime_type = mime_for(&file_name).to_string();
        let data_url = format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes));
        Ok(Self {
            file_name,
            mime_type,
            size: bytes.len(),
            data_url,
        })
    }

    /// Read and encode a file
    pub async fn from_path(path: impl AsRef<Path>, max_bytes: usize) -> EssResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| EssError::invalid_input_field("Not a file path", "file"))?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| EssError::io_with_path(e.to_string(), display.clone()))?;
        if !metadata.is_file() {
            return Err(EssError::invalid_input_field(
                format!("'{}' is not a file", display),
                "file",
            ));
        }
        check_size(&file_name, metadata.len() as usize, max_bytes)?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| EssError::io_with_path(e.to_string(), display))?;
        Self::from_bytes(file_name, &bytes, max_bytes)
    }

    /// Encode with the default size limit
    pub fn from_bytes_default(file_name: impl Into<String>, bytes: &[u8]) -> EssResult<Self> {
        Self::from_bytes(file_name, bytes, DEFAULT_MAX_ATTACHMENT_BYTES)
    }

    /// `data:<mime>;base64,<payload>`
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Payload fragment for upload bodies
    pub fn to_json(&self) -> Value {
        json!({
            "fileName": self.file_name,
            "mimeType": self.mime_type,
            "size": self.size,
            "data": self.data_url,
        })
    }
}

fn check_size(file_name: &str, size: usize, max_bytes: usize) -> EssResult<()> {
    if size == 0 {
        return Err(EssError::invalid_input_field(
            format!("'{}' is empty", file_name),
            "file",
        ));
    }
    if size > max_bytes {
        return Err(EssError::invalid_input_field(
            format!(
                "'{}' is {} bytes; the limit is {} bytes",
                file_name, size, max_bytes
            ),
            "file",
        ));
    }
    Ok(())
}

/// MIME type by file extension
pub fn mime_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_data_url() {
        let attachment = Attachment::from_bytes_default("receipt.PNG", b"hello").unwrap();
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.data_url(), "data:image/png;base64,aGVsbG8=");
        assert_eq!(attachment.to_json()["size"], 5);
    }

    #[test]
    fn test_size_limits() {
        assert!(Attachment::from_bytes("a.pdf", b"", 10).is_err());
        assert!(Attachment::from_bytes("a.pdf", &[0u8; 11], 10).is_err());
        assert!(Attachment::from_bytes("a.pdf", &[0u8; 10], 10).is_ok());
    }

    #[tokio::test]
    async fn test_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("medical-note.pdf");
        std::fs::write(&file, b"%PDF-1.4").unwrap();

        let attachment = Attachment::from_path(&file, 1024).await.unwrap();
        assert_eq!(attachment.file_name, "medical-note.pdf");
        assert!(attachment.data_url().starts_with("data:application/pdf;base64,"));

        assert!(Attachment::from_path(&file, 4).await.is_err());
        assert!(Attachment::from_path(temp_dir.path(), 1024).await.is_err());
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(mime_for("notes"), "application/octet-stream");
    }
}
