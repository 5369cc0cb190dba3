// Image upload endpoint

use std::path::Path;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::client::AvhClient;
use crate::error::Error;
use crate::types::{Image, NewImage};

impl AvhClient {
    /// Upload a local file as an image.
    ///
    /// `POST v1/images` as `multipart/form-data` with the fields `type`,
    /// `encoding`, `name`, optional `instance`/`project`, and `file`.
    pub async fn create_image(&self, image: &NewImage, file: &Path) -> Result<Image, Error> {
        let content = tokio::fs::read(file).await.map_err(|source| Error::File {
            path: file.to_path_buf(),
            source,
        })?;
        debug!(
            name = %image.name,
            kind = %image.kind,
            bytes = content.len(),
            "uploading image"
        );

        let mut form = Form::new()
            .text("type", image.kind.to_string())
            .text("encoding", image.encoding.to_string())
            .text("name", image.name.clone());
        if let Some(instance) = image.instance {
            form = form.text("instance", instance.to_string());
        }
        if let Some(project) = image.project {
            form = form.text("project", project.to_string());
        }
        let part = Part::bytes(content).file_name(image.name.clone());
        form = form.part("file", part);

        self.post_multipart("v1/images", form).await
    }
}
