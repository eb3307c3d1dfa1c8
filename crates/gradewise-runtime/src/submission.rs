//! Turning submissions and rubrics into request content.
//!
//! Inputs are inline text, a file on disk, or (rubrics only) a structured
//! descriptor. Files are checked before anything is sent upstream:
//! - must exist, be non-empty, and fit within the configured size limit
//! - `.txt` is read as text
//! - PDF and common image formats are uploaded and referenced by URI
//! - anything else is read as UTF-8 text, or rejected
//!
//! Uploads are recorded in an [`UploadSet`] and must be released once the
//! generation call is over, whatever its outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use gradewise_core::RubricDescriptor;

use crate::providers::{ContentPart, LlmProvider, ProviderError, UploadedFile};

/// Errors from preparing request content.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Submission input is empty.")]
    EmptyInput,

    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("File is empty: {0}")]
    EmptyFile(PathBuf),

    #[error("File exceeds {limit_mb:.0}MB limit: {path} ({size_mb:.1}MB)")]
    TooLarge {
        path: PathBuf,
        size_mb: f64,
        limit_mb: f64,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize rubric: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Upload(#[from] ProviderError),
}

/// MIME type for formats the upstream reads natively.
pub fn native_mime_type(extension: &str) -> Option<&'static str> {
    match extension {
        ".pdf" => Some("application/pdf"),
        ".png" => Some("image/png"),
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".gif" => Some("image/gif"),
        ".webp" => Some("image/webp"),
        _ => None,
    }
}

/// Lower-cased extension with its leading dot, or "" when there is none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// The work being graded.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionInput {
    Text(String),
    File(PathBuf),
}

impl SubmissionInput {
    /// Treat `arg` as a path when such a file exists, otherwise as inline text.
    pub fn from_arg(arg: impl Into<String>) -> Self {
        let arg = arg.into();
        if Path::new(&arg).is_file() {
            SubmissionInput::File(PathBuf::from(arg))
        } else {
            SubmissionInput::Text(arg)
        }
    }

    /// Short label for logs and batch reports.
    pub fn label(&self) -> String {
        match self {
            SubmissionInput::File(path) => path.display().to_string(),
            SubmissionInput::Text(text) => {
                let preview: String = text.chars().take(40).collect();
                if preview.len() < text.len() {
                    format!("{}...", preview)
                } else {
                    preview
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SubmissionInput::Text(text) => text.trim().is_empty(),
            SubmissionInput::File(path) => path.as_os_str().is_empty(),
        }
    }

    /// Plain text of the submission, when it has any.
    ///
    /// Binary formats (PDF, images) and unreadable files yield `None`.
    pub async fn text_content(&self, max_file_size: u64) -> Option<String> {
        match self {
            SubmissionInput::Text(text) => Some(text.clone()),
            SubmissionInput::File(path) => {
                if native_mime_type(&file_extension(path)).is_some() {
                    return None;
                }
                let data = read_checked(path, max_file_size).await.ok()?;
                decode_text(path, data).ok()
            }
        }
    }
}

/// The rubric for a grading request.
#[derive(Debug, Clone, PartialEq)]
pub enum RubricInput {
    /// Sent as pretty JSON and used for normalization
    Structured(RubricDescriptor),

    /// Free-text rubric, sent verbatim
    Text(String),

    /// Rubric document on disk (PDF, image or text)
    File(PathBuf),
}

impl Default for RubricInput {
    fn default() -> Self {
        RubricInput::Structured(RubricDescriptor::default_essay())
    }
}

impl RubricInput {
    /// The descriptor that drives normalization and the mock fallback.
    ///
    /// Unstructured rubrics fall back to the default essay rubric.
    pub fn descriptor(&self) -> RubricDescriptor {
        match self {
            RubricInput::Structured(rubric) => rubric.clone(),
            RubricInput::Text(_) | RubricInput::File(_) => RubricDescriptor::default_essay(),
        }
    }
}

/// Uploads made for one grading request.
///
/// Call [`UploadSet::release`] after generation on every path. Release is
/// best-effort: failures are logged and never returned.
pub struct UploadSet {
    provider: Arc<dyn LlmProvider>,
    files: Vec<UploadedFile>,
    max_file_size: u64,
}

impl UploadSet {
    pub fn new(provider: Arc<dyn LlmProvider>, max_file_size: u64) -> Self {
        Self {
            provider,
            files: Vec::new(),
            max_file_size,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Content parts for a submission.
    pub async fn prepare_submission(
        &mut self,
        input: &SubmissionInput,
    ) -> Result<Vec<ContentPart>, SubmissionError> {
        if input.is_empty() {
            return Err(SubmissionError::EmptyInput);
        }

        match input {
            SubmissionInput::Text(text) => Ok(vec![ContentPart::text(text.clone())]),
            SubmissionInput::File(path) => self.prepare_file(path, "submission").await,
        }
    }

    /// Content parts for a rubric.
    pub async fn prepare_rubric(&mut self, input: &RubricInput) -> Result<Vec<ContentPart>, SubmissionError> {
        match input {
            RubricInput::Structured(rubric) => {
                Ok(vec![ContentPart::Text(serde_json::to_string_pretty(rubric)?)])
            }
            RubricInput::Text(text) => Ok(vec![ContentPart::text(text.clone())]),
            RubricInput::File(path) => self.prepare_file(path, "rubric").await,
        }
    }

    async fn prepare_file(&mut self, path: &Path, display_name: &str) -> Result<Vec<ContentPart>, SubmissionError> {
        let extension = file_extension(path);
        let data = read_checked(path, self.max_file_size).await?;

        if let Some(mime_type) = native_mime_type(&extension) {
            let file = self.provider.upload(data, mime_type, display_name).await?;
            tracing::info!(file = %file.name, path = %path.display(), "Uploaded {}", display_name);
            self.files.push(file.clone());
            return Ok(vec![ContentPart::File(file)]);
        }

        Ok(vec![ContentPart::Text(decode_text(path, data)?)])
    }

    /// Delete every upload. Failures are logged and swallowed.
    pub async fn release(self) {
        for file in &self.files {
            match self.provider.delete(file).await {
                Ok(()) => tracing::debug!(file = %file.name, "Deleted uploaded file"),
                Err(e) => tracing::warn!(file = %file.name, error = %e, "Failed to delete uploaded file"),
            }
        }
    }
}

/// Read a file after checking it exists, is non-empty and within `limit`.
async fn read_checked(path: &Path, limit: u64) -> Result<Vec<u8>, SubmissionError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => return Err(SubmissionError::NotFound(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SubmissionError::NotFound(path.to_path_buf()))
        }
        Err(source) => {
            return Err(SubmissionError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let size = metadata.len();
    if size == 0 {
        return Err(SubmissionError::EmptyFile(path.to_path_buf()));
    }
    if size > limit {
        return Err(SubmissionError::TooLarge {
            path: path.to_path_buf(),
            size_mb: size as f64 / 1024.0 / 1024.0,
            limit_mb: limit as f64 / 1024.0 / 1024.0,
        });
    }

    tokio::fs::read(path).await.map_err(|source| SubmissionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `.txt` is decoded leniently; other extensions must be valid UTF-8.
fn decode_text(path: &Path, data: Vec<u8>) -> Result<String, SubmissionError> {
    let extension = file_extension(path);
    if extension == ".txt" {
        return Ok(String::from_utf8_lossy(&data).into_owned());
    }

    String::from_utf8(data).map_err(|_| {
        SubmissionError::UnsupportedFormat(if extension.is_empty() {
            path.display().to_string()
        } else {
            extension
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{GenerationRequest, GenerationResponse};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::io::Write;

    #[derive(Default)]
    struct RecordingProvider {
        uploads: Mutex<Vec<String>>,
        deletes: Mutex<Vec<String>>,
        fail_deletes: bool,
    }

    #[async_trait]
    impl LlmProvider for RecordingProvider {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
            Ok(GenerationResponse::default())
        }

        async fn upload(
            &self,
            data: Vec<u8>,
            mime_type: &str,
            display_name: &str,
        ) -> Result<UploadedFile, ProviderError> {
            let mut uploads = self.uploads.lock();
            let name = format!("files/{}-{}", display_name, uploads.len());
            uploads.push(format!("{}:{}:{}", name, mime_type, data.len()));
            Ok(UploadedFile {
                uri: format!("https://files.test/{}", name),
                name,
                mime_type: mime_type.to_string(),
            })
        }

        async fn delete(&self, file: &UploadedFile) -> Result<(), ProviderError> {
            self.deletes.lock().push(file.name.clone());
            if self.fail_deletes {
                Err(ProviderError::HttpError("gone".to_string()))
            } else {
                Ok(())
            }
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    fn temp_file(suffix: &str, content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_native_mime_types() {
        assert_eq!(native_mime_type(".pdf"), Some("application/pdf"));
        assert_eq!(native_mime_type(".jpeg"), Some("image/jpeg"));
        assert_eq!(native_mime_type(".jpg"), Some("image/jpeg"));
        assert_eq!(native_mime_type(".txt"), None);
        assert_eq!(native_mime_type(".docx"), None);
        assert_eq!(file_extension(Path::new("Essay.PDF")), ".pdf");
        assert_eq!(file_extension(Path::new("README")), "");
    }

    #[test]
    fn test_unstructured_rubric_uses_default_essay() {
        let rubric = RubricInput::Text("Be clear.".to_string());
        assert_eq!(rubric.descriptor(), RubricDescriptor::default_essay());
    }

    #[tokio::test]
    async fn test_text_inputs_need_no_upload() {
        let provider = Arc::new(RecordingProvider::default());
        let mut uploads = UploadSet::new(provider.clone(), 1024);

        let parts = uploads
            .prepare_submission(&SubmissionInput::Text("My essay.".to_string()))
            .await
            .unwrap();
        assert_eq!(parts, vec![ContentPart::text("My essay.")]);

        let rubric_parts = uploads.prepare_rubric(&RubricInput::default()).await.unwrap();
        let rubric_json = rubric_parts[0].as_text().unwrap();
        assert!(rubric_json.contains("\"thesis\""));
        assert!(rubric_json.contains('\n'));

        assert!(uploads.is_empty());
    }

    #[tokio::test]
    async fn test_empty_submission_rejected() {
        let provider = Arc::new(RecordingProvider::default());
        let mut uploads = UploadSet::new(provider, 1024);
        let err = uploads
            .prepare_submission(&SubmissionInput::Text("   ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::EmptyInput));
    }

    #[tokio::test]
    async fn test_pdf_is_uploaded_and_released() {
        let provider = Arc::new(RecordingProvider::default());
        let mut uploads = UploadSet::new(provider.clone(), 1024);
        let pdf = temp_file(".pdf", b"%PDF-1.4 fake");

        let parts = uploads
            .prepare_submission(&SubmissionInput::File(pdf.path().to_path_buf()))
            .await
            .unwrap();

        match &parts[0] {
            ContentPart::File(file) => assert_eq!(file.mime_type, "application/pdf"),
            other => panic!("expected upload, got {other:?}"),
        }
        assert_eq!(uploads.len(), 1);

        uploads.release().await;
        assert_eq!(provider.deletes.lock().as_slice(), ["files/submission-0"]);
    }

    #[tokio::test]
    async fn test_release_swallows_delete_failures() {
        let provider = Arc::new(RecordingProvider {
            fail_deletes: true,
            ..Default::default()
        });
        let mut uploads = UploadSet::new(provider.clone(), 1024);
        let png = temp_file(".png", b"\x89PNG");
        let jpg = temp_file(".jpg", b"\xff\xd8\xff");

        uploads
            .prepare_rubric(&RubricInput::File(png.path().to_path_buf()))
            .await
            .unwrap();
        uploads
            .prepare_submission(&SubmissionInput::File(jpg.path().to_path_buf()))
            .await
            .unwrap();

        uploads.release().await;
        assert_eq!(provider.deletes.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_file_validation() {
        let provider = Arc::new(RecordingProvider::default());
        let mut uploads = UploadSet::new(provider.clone(), 8);

        let missing = uploads
            .prepare_submission(&SubmissionInput::File(PathBuf::from("/no/such/essay.txt")))
            .await
            .unwrap_err();
        assert!(matches!(missing, SubmissionError::NotFound(_)));

        let empty = temp_file(".txt", b"");
        let err = uploads
            .prepare_submission(&SubmissionInput::File(empty.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::EmptyFile(_)));

        let big = temp_file(".txt", b"way more than eight bytes");
        let err = uploads
            .prepare_submission(&SubmissionInput::File(big.path().to_path_buf()))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::TooLarge { .. }));
        assert!(provider.uploads.lock().is_empty());
    }

    #[tokio::test]
    async fn test_other_extensions_read_as_text_or_rejected() {
        let provider = Arc::new(RecordingProvider::default());
        let mut uploads = UploadSet::new(provider, 1024);

        let markdown = temp_file(".md", b"# Essay\nBody");
        let parts = uploads
            .prepare_submission(&SubmissionInput::File(markdown.path().to_path_buf()))
            .await
            .unwrap();
        assert_eq!(parts[0].as_text(), Some("# Essay\nBody"));

        let docx = temp_file(".docx", b"PK\x03\x04\xff\xfe binary");
        let err = uploads
            .prepare_submission(&SubmissionInput::File(docx.path().to_path_buf()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: .docx");
    }

    #[tokio::test]
    async fn test_text_content() {
        let txt = temp_file(".txt", b"Plain essay text");
        let pdf = temp_file(".pdf", b"%PDF");

        let from_file = SubmissionInput::File(txt.path().to_path_buf());
        assert_eq!(from_file.text_content(1024).await.as_deref(), Some("Plain essay text"));

        let binary = SubmissionInput::File(pdf.path().to_path_buf());
        assert_eq!(binary.text_content(1024).await, None);

        let inline = SubmissionInput::Text("inline".to_string());
        assert_eq!(inline.text_content(1024).await.as_deref(), Some("inline"));
    }

    #[test]
    fn test_from_arg_and_label() {
        let txt = temp_file(".txt", b"x");
        let path = txt.path().display().to_string();
        assert!(matches!(SubmissionInput::from_arg(path), SubmissionInput::File(_)));

        let inline = SubmissionInput::from_arg("The Industrial Revolution transformed labour markets across Europe.");
        assert!(matches!(inline, SubmissionInput::Text(_)));
        assert_eq!(inline.label(), "The Industrial Revolution transformed la...");
    }
}
