/// Minimal `multipart/form-data` reader for `/predict`: the request carries
/// one uploaded image and nothing else is looked at.

/// Why an upload body could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    NoBoundary,
    Malformed,
    NoFilePart,
}

impl UploadError {
    pub fn message(self) -> &'static str {
        match self {
            UploadError::NoBoundary => "multipart request without a boundary",
            UploadError::Malformed => "malformed multipart body",
            UploadError::NoFilePart => "no image file was uploaded",
        }
    }
}

/// Returns the body of the first part whose `Content-Disposition` names a
/// `filename`, i.e. the uploaded image.
pub fn uploaded_image<'a>(body: &'a [u8], content_type: &str) -> Result<&'a [u8], UploadError> {
    let boundary = boundary_of(content_type).ok_or(UploadError::NoBoundary)?;
    let delimiter = format!("--{}", boundary).into_bytes();

    let mut cursor = position(body, &delimiter, 0).ok_or(UploadError::Malformed)? + delimiter.len();
    // `--boundary--` closes the body.
    while !body[cursor..].starts_with(b"--") {
        let end = position(body, &delimiter, cursor).ok_or(UploadError::Malformed)?;
        let part = trim_crlf(&body[cursor..end]);

        if let Some(split) = position(part, b"\r\n\r\n", 0) {
            if names_a_file(&part[..split]) {
                let content = &part[split + 4..];
                if content.is_empty() {
                    return Err(UploadError::NoFilePart);
                }
                return Ok(content);
            }
        }
        cursor = end + delimiter.len();
    }
    Err(UploadError::NoFilePart)
}

fn boundary_of(content_type: &str) -> Option<&str> {
    let (_, rest) = content_type.split_once("boundary=")?;
    let value = rest.split(';').next()?.trim().trim_matches('"');
    (!value.is_empty()).then_some(value)
}

fn names_a_file(headers: &[u8]) -> bool {
    String::from_utf8_lossy(headers).lines().any(|line| {
        let line = line.to_ascii_lowercase();
        line.starts_with("content-disposition:") && line.contains("filename=")
    })
}

fn position(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn trim_crlf(part: &[u8]) -> &[u8] {
    let part = part.strip_prefix(b"\r\n").unwrap_or(part);
    part.strip_suffix(b"\r\n").unwrap_or(part)
}
