// Project endpoints

use tracing::debug;

use crate::client::AvhClient;
use crate::error::Error;
use crate::types::Project;

impl AvhClient {
    /// List the projects visible to the authenticated account, in the
    /// order the service returns them.
    ///
    /// `GET v1/projects`
    pub async fn list_projects(&self) -> Result<Vec<Project>, Error> {
        debug!("listing projects");
        self.get("v1/projects").await
    }
}
