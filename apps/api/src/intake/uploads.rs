use aws_sdk_s3::primitives::ByteStream;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{self, DocumentFormat, ExtractError};
use crate::matching::Upload;

/// Per-file upload limit.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// One file part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name of the form field the file arrived in.
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// Format from the filename extension, else from the part's content type.
    pub fn format(&self) -> Result<DocumentFormat, ExtractError> {
        DocumentFormat::from_filename(&self.filename).or_else(|e| match &self.content_type {
            Some(content_type) => DocumentFormat::from_content_type(content_type),
            None => Err(e),
        })
    }

    pub fn to_upload(&self, format: DocumentFormat) -> Upload {
        Upload {
            bytes: self.bytes.clone(),
            format,
        }
    }
}

/// Text fields and file parts of a multipart form, in arrival order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<UploadedFile>,
}

impl MultipartForm {
    /// Drains the request. Parts with a filename are files; everything else is text.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read '{filename}': {e}"))
                    })?;
                    if bytes.len() > MAX_UPLOAD_BYTES {
                        return Err(AppError::Validation(format!(
                            "'{filename}' is too large (maximum is {} MB)",
                            MAX_UPLOAD_BYTES / (1024 * 1024)
                        )));
                    }
                    if bytes.is_empty() {
                        return Err(AppError::Validation(format!("'{filename}' is empty")));
                    }
                    form.files.push(UploadedFile {
                        field: name,
                        filename,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let value = field.text().await.map_err(|e| {
                        AppError::Validation(format!("Failed to read field '{name}': {e}"))
                    })?;
                    form.fields.push((name, value));
                }
            }
        }
        Ok(form)
    }

    /// First non-blank value of a text field, trimmed.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.trim())
            .find(|value| !value.is_empty())
            .map(String::from)
    }

    /// First file part sent under field `name`.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.field == name)
    }
}

/// Extracts text for caching on the resume. Failures are logged and yield `None`
/// so the resume can still be stored and analyzed later.
pub fn extract_for_cache(file: &UploadedFile, format: DocumentFormat) -> Option<String> {
    match extraction::extract(&file.bytes, format) {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => {
            warn!("No text could be extracted from '{}'", file.filename);
            None
        }
        Err(e) => {
            warn!("Extraction failed for '{}': {}", file.filename, e);
            None
        }
    }
}

/// Candidate name from an upload filename: `jane_doe-cv.pdf` → `Jane Doe Cv`.
pub fn candidate_name_from_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };

    let name = stem
        .split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        "Unknown Candidate".to_string()
    } else {
        name
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// S3 archive for original upload files.
#[derive(Clone)]
pub struct UploadArchive {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl UploadArchive {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Uploads the original file and returns its object key.
    pub async fn store(&self, job_id: Uuid, file: &UploadedFile) -> Result<String, AppError> {
        let key = archive_key(job_id, &file.filename);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.clone()))
            .content_type(
                file.content_type
                    .as_deref()
                    .unwrap_or("application/octet-stream"),
            )
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Upload of '{}' failed: {e}", file.filename)))?;

        info!("Archived upload to s3://{}/{}", self.bucket, key);
        Ok(key)
    }

    /// Archives every file, or none: keys already written are removed when a
    /// later upload fails.
    pub async fn store_all(
        &self,
        job_id: Uuid,
        files: &[UploadedFile],
    ) -> Result<Vec<String>, AppError> {
        let mut keys = Vec::with_capacity(files.len());
        for file in files {
            match self.store(job_id, file).await {
                Ok(key) => keys.push(key),
                Err(e) => {
                    for key in &keys {
                        self.remove(key).await;
                    }
                    return Err(e);
                }
            }
        }
        Ok(keys)
    }

    /// Best-effort delete; failures only leave an orphaned object behind.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            warn!("Failed to remove s3://{}/{}: {e}", self.bucket, key);
        }
    }
}

/// `uploads/<job>/<random>-<sanitized filename>`; unique per call.
pub fn archive_key(job_id: Uuid, filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("uploads/{}/{}-{}", job_id, Uuid::new_v4(), safe)
}
