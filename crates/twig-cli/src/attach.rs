use std::io;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use twig_tree::{Attachment, AttachmentKind};

const MAX_ATTACHMENT_BYTES: u64 = 20 * 1024 * 1024;

/// Read `path` and encode it as an inline `data:` URI attachment.
pub fn load(path: &Path) -> io::Result<Attachment> {
    let size = std::fs::metadata(path)?.len();
    if size > MAX_ATTACHMENT_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "{} is {size} bytes; attachments are limited to {MAX_ATTACHMENT_BYTES}",
                path.display()
            ),
        ));
    }
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(from_bytes(&name, &bytes))
}

pub fn from_bytes(name: &str, bytes: &[u8]) -> Attachment {
    let mime = mime_type(name);
    let kind = if mime.starts_with("image/") {
        AttachmentKind::Image
    } else {
        AttachmentKind::File
    };
    Attachment::new(kind, name, data_uri(&mime, bytes))
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Guess a MIME type from the file extension.
pub fn mime_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
