use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;

/// A file part from the upload form.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Whether the part was declared as `application/pdf`.
    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                ct.split(';')
                    .next()
                    .unwrap_or("")
                    .trim()
                    .eq_ignore_ascii_case("application/pdf")
            })
            .unwrap_or(false)
    }
}

/// Parsed fields of the `/upload` form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub text: Option<String>,
}

/// Parse the `file` and `text` parts; other parts are ignored.
///
/// A file part with no filename and no bytes (what browsers send for an
/// empty file input) counts as absent, and so does an empty text part.
///
/// Read errors keep their own status (413 for a body over the limit).
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadForm, MultipartError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?.to_vec();

                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            "text" => {
                let val = field.text().await?;
                if !val.is_empty() {
                    form.text = Some(val);
                }
            }
            _ => {
                field.bytes().await?;
            }
        }
    }

    Ok(form)
}
