//! The materialized value source: scalar and file mappings of one request.
//!
//! [`FormData`] is what the binding entry points consume. It can be built
//! from an `application/x-www-form-urlencoded` body (or query string), from
//! a `multipart/form-data` body, or programmatically by a framework adapter.
//! Whatever the encoding was, binding always sees the same two mappings:
//! key to text values and key to file parts.

use std::collections::HashMap;

use bytes::Bytes;
use facet::Facet;
use log::trace;

use crate::error::{FormError, FormErrorKind};

/// One uploaded file part: filename, content type and the part's bytes.
///
/// A destination field of type `FilePart` (or `Option<FilePart>`,
/// `Vec<FilePart>`, ...) receives the part directly, without any coercion.
/// The part owns its bytes, so the bound destination stays valid after the
/// request body is gone.
#[derive(Facet, Clone, Default, PartialEq)]
pub struct FilePart {
    file_name: Option<String>,
    content_type: Option<String>,
    content: Vec<u8>,
}

impl FilePart {
    /// Create a part from its metadata and content.
    pub fn new(
        file_name: Option<String>,
        content_type: Option<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name,
            content_type,
            content: content.into(),
        }
    }

    /// The filename announced by the client, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The content type announced by the client, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The raw bytes of the part.
    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    /// Number of bytes in the part.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether the part is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl core::fmt::Debug for FilePart {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.content.len())
            .finish()
    }
}

/// The scalar and file mappings of one form submission.
///
/// Keys map to *ordered sequences* of values, since HTML forms may submit
/// one name several times. Enumeration order across different keys is
/// unspecified; binding does not depend on it.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pub(crate) values: HashMap<String, Vec<String>>,
    pub(crate) files: HashMap<String, Vec<FilePart>>,
}

impl FormData {
    /// Default maximum accepted payload size: 32 MiB.
    pub const DEFAULT_SIZE_LIMIT: usize = 32 << 20;

    /// An empty submission.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one text value under a key.
    pub fn add_value(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    /// Append one file part under a key.
    pub fn add_file(&mut self, key: impl Into<String>, part: FilePart) {
        self.files.entry(key.into()).or_default().push(part);
    }

    /// Iterate over the scalar mapping.
    pub fn values(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Iterate over the file mapping.
    pub fn files(&self) -> impl Iterator<Item = (&str, &[FilePart])> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Whether both mappings are empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }

    /// Decode an urlencoded body or query string. Percent-escapes and `+`
    /// are resolved; this never fails, malformed escapes decode lossily.
    pub fn from_urlencoded(input: impl AsRef<[u8]>) -> Self {
        let mut form = Self::new();
        for (key, value) in form_urlencoded::parse(input.as_ref()) {
            form.add_value(key.into_owned(), value.into_owned());
        }
        form
    }

    /// Decode a `multipart/form-data` body. Text fields land in the scalar
    /// mapping; parts that announce a filename land in the file mapping.
    ///
    /// `content_type` must be the full header value, since it carries the
    /// boundary parameter.
    pub fn from_multipart(content_type: &str, body: impl Into<Bytes>) -> Result<Self, FormError> {
        let boundary = multer::parse_boundary(content_type)
            .map_err(|e| FormError::new(FormErrorKind::Multipart(e)))?;
        let body = body.into();

        // multer is stream-driven; the whole body is already buffered, so
        // driving it to completion never blocks on I/O.
        futures_executor::block_on(async move {
            let stream = futures_util::stream::once(async move {
                Ok::<Bytes, core::convert::Infallible>(body)
            });
            let mut multipart = multer::Multipart::new(stream, boundary);
            let mut form = Self::new();

            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| FormError::new(FormErrorKind::Multipart(e)))?
            {
                let Some(name) = field.name().map(str::to_string) else {
                    trace!("Skipping multipart field without a name");
                    continue;
                };
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(|m| m.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| FormError::new(FormErrorKind::Multipart(e)))?;

                if file_name.is_some() {
                    trace!(
                        "Multipart file part {name:?} ({} bytes, file name {file_name:?})",
                        bytes.len()
                    );
                    form.add_file(name, FilePart::new(file_name, content_type, bytes.to_vec()));
                } else {
                    form.add_value(name, String::from_utf8_lossy(&bytes).into_owned());
                }
            }

            Ok(form)
        })
    }

    /// Materialize the mappings from a raw request body, dispatching on the
    /// content type, with the [default size limit](Self::DEFAULT_SIZE_LIMIT).
    pub fn parse(content_type: &str, body: impl Into<Bytes>) -> Result<Self, FormError> {
        Self::parse_with_limit(content_type, body, Self::DEFAULT_SIZE_LIMIT)
    }

    /// Like [`parse`](Self::parse), with an explicit maximum accepted
    /// payload size in bytes.
    pub fn parse_with_limit(
        content_type: &str,
        body: impl Into<Bytes>,
        limit: usize,
    ) -> Result<Self, FormError> {
        let body = body.into();
        if body.len() > limit {
            return Err(FormError::new(FormErrorKind::PayloadTooLarge {
                size: body.len(),
                limit,
            }));
        }

        let normalized = content_type.trim().to_ascii_lowercase();
        if normalized.starts_with("application/x-www-form-urlencoded") {
            Ok(Self::from_urlencoded(&body))
        } else if normalized.starts_with("multipart/form-data") {
            Self::from_multipart(content_type, body)
        } else {
            Err(FormError::new(FormErrorKind::UnsupportedMediaType {
                content_type: content_type.to_string(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencoded_decodes_escapes_and_repeats() {
        let form = FormData::from_urlencoded("Name=Felix&Tag=a+b%21&Tag=c");
        let values: &Vec<String> = &form.values["Tag"];
        assert_eq!(values, &["a b!", "c"]);
        assert_eq!(form.values["Name"], ["Felix"]);
        assert!(form.files.is_empty());
    }

    #[test]
    fn multipart_splits_text_and_file_parts() {
        let boundary = "----WebKitFormBoundarySHaDkk90eMKgsVUj";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"Name\"\r\n\r\n\
             \u{79e6}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"Photo\"; filename=\"filea.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             the file content a\r\n\
             --{boundary}--\r\n"
        );
        let content_type = format!("multipart/form-data; boundary={boundary}");

        let form = FormData::from_multipart(&content_type, body.into_bytes()).unwrap();
        assert_eq!(form.values["Name"], ["\u{79e6}"]);
        let photo = &form.files["Photo"][0];
        assert_eq!(photo.file_name(), Some("filea.txt"));
        assert_eq!(photo.content_type(), Some("text/plain"));
        assert_eq!(photo.bytes(), b"the file content a");
    }

    #[test]
    fn parse_enforces_the_size_limit() {
        let err = FormData::parse_with_limit(
            "application/x-www-form-urlencoded",
            "Name=Felix".as_bytes().to_vec(),
            4,
        )
        .unwrap_err();
        assert!(matches!(err.kind, FormErrorKind::PayloadTooLarge { .. }));
    }

    #[test]
    fn parse_rejects_other_media_types() {
        let err = FormData::parse("application/json", "{}".as_bytes().to_vec()).unwrap_err();
        assert!(matches!(err.kind, FormErrorKind::UnsupportedMediaType { .. }));
    }
}
