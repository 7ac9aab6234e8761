// Image upload: sends one local file to `images/upload` and reports the
// public URL the platform assigned to it.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::error::{GhostError, Result};
use crate::transport::{ApiRequest, FileUpload, RequestBody, Transport};

/// Metadata of an uploaded image as returned by the platform.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
}

impl<T: Transport> ApiClient<T> {
    /// Upload `file_path` as an image. `reference` is stored alongside it
    /// and helps find the image again later.
    pub fn upload_image(&self, file_path: &Path, reference: &str) -> Result<UploadedImage> {
        let mime_type = mime_guess::from_path(file_path)
            .first_or_octet_stream()
            .to_string();
        debug!(%mime_type, path = %file_path.display(), "using image mime type");

        let file_name = file_path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                GhostError::Validation(format!("{} has no file name", file_path.display()))
            })?
            .to_string();

        let contents = read_binary(file_path)?;
        let req = ApiRequest::new(Method::POST, self.endpoint(&["images", "upload"])).body(
            RequestBody::Multipart(FileUpload {
                file_name,
                mime_type,
                contents,
                reference: reference.to_string(),
            }),
        );

        let body = self.send(req)?.expect_status(201)?;
        let image = body
            .get("images")
            .and_then(Value::as_array)
            .and_then(|images| images.first())
            .cloned()
            .ok_or_else(|| {
                GhostError::UnexpectedResponse("image upload returned no images".to_string())
            })?;
        let image: UploadedImage = serde_json::from_value(image).map_err(|e| {
            GhostError::UnexpectedResponse(format!("image upload response: {e}"))
        })?;

        info!(url = %image.url, "image available");
        Ok(image)
    }
}

/// Read a whole file; the handle is closed before this returns.
fn read_binary(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| GhostError::io(path, e))?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .map_err(|e| GhostError::io(path, e))?;
    Ok(contents)
}
