// Hardware model and software catalog endpoints

use tracing::debug;

use crate::client::AvhClient;
use crate::error::Error;
use crate::types::{Model, ModelSoftware};

impl AvhClient {
    /// List the hardware models offered by the service.
    ///
    /// `GET v1/models`
    pub async fn list_models(&self) -> Result<Vec<Model>, Error> {
        debug!("listing models");
        self.get("v1/models").await
    }

    /// List the software builds available for a model.
    ///
    /// `model` is [`Model::model`], not the flavor. It is sent as a single
    /// percent-encoded path segment.
    ///
    /// `GET v1/models/{model}/software`
    pub async fn list_model_software(&self, model: &str) -> Result<Vec<ModelSoftware>, Error> {
        debug!(model, "listing model software");
        let url = self.url_from_segments(&["v1", "models", model, "software"])?;
        self.get_url(url).await
    }
}
