use std::fs;
use std::path::Path;

use anyhow::Context;
use rand::Rng;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;
const PDF_MAGIC: &[u8] = b"%PDF-";
const LOCAL_ID_SUFFIX_LEN: usize = 6;

/// A file the user picked for upload
#[derive(Clone, Debug)]
pub struct UploadCandidate {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadCandidate {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, sniffing its content type
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {path:?}"))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let content_type = sniff_content_type(&name, &bytes);
        Ok(Self::new(name, content_type, bytes))
    }

    #[must_use]
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("Please select PDF files only.")]
    NotPdf { name: String },

    #[error("The file is too large (max {} MB).", .max_bytes / (1024 * 1024))]
    TooLarge { name: String, size: u64, max_bytes: u64 },
}

impl UploadRejection {
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::NotPdf { name } | Self::TooLarge { name, .. } => name,
        }
    }
}

/// Content type check first, then size
pub fn validate_upload(candidate: &UploadCandidate, max_bytes: u64) -> Result<(), UploadRejection> {
    if candidate.content_type != PDF_CONTENT_TYPE {
        return Err(UploadRejection::NotPdf {
            name: candidate.name.clone(),
        });
    }
    if candidate.size() > max_bytes {
        return Err(UploadRejection::TooLarge {
            name: candidate.name.clone(),
            size: candidate.size(),
            max_bytes,
        });
    }
    Ok(())
}

#[must_use]
pub fn sniff_content_type(name: &str, bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PDF_MAGIC) || name.to_lowercase().ends_with(".pdf") {
        PDF_CONTENT_TYPE
    } else {
        "application/octet-stream"
    }
}

/// `local-<unix millis>-<6 base36 chars>`
#[must_use]
pub fn new_local_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..LOCAL_ID_SUFFIX_LEN)
        .filter_map(|_| std::char::from_digit(rng.gen_range(0..36), 36))
        .collect();
    format!("local-{}-{suffix}", chrono::Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn rejects_non_pdf_before_size() {
        let candidate = UploadCandidate::new("notes.txt", "text/plain", vec![0; 64]);
        let err = validate_upload(&candidate, 16).unwrap_err();
        assert_eq!(err.to_string(), "Please select PDF files only.");
        assert_eq!(err.file_name(), "notes.txt");
    }

    #[test]
    fn rejects_oversized_pdf() {
        let candidate = UploadCandidate::new(
            "big.pdf",
            PDF_CONTENT_TYPE,
            vec![0; (DEFAULT_MAX_UPLOAD_BYTES + 1) as usize],
        );
        let err = validate_upload(&candidate, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert_eq!(err.to_string(), "The file is too large (max 20 MB).");

        let at_limit = UploadCandidate::new("ok.pdf", PDF_CONTENT_TYPE, vec![0; 1024]);
        assert!(validate_upload(&at_limit, 1024).is_ok());
    }

    #[test]
    fn sniffs_magic_or_extension() {
        assert_eq!(sniff_content_type("scan", b"%PDF-1.7\n"), PDF_CONTENT_TYPE);
        assert_eq!(sniff_content_type("REPORT.PDF", b""), PDF_CONTENT_TYPE);
        assert_eq!(
            sniff_content_type("image.png", b"\x89PNG"),
            "application/octet-stream"
        );
    }

    #[test]
    fn local_id_format() {
        let re = Regex::new(r"^local-\d+-[0-9a-z]{6}$").unwrap();
        let id = new_local_id();
        assert!(re.is_match(&id), "{id}");
        assert_ne!(new_local_id(), new_local_id());
    }
}
