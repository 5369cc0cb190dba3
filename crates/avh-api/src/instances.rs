// Instance lifecycle endpoints

use tracing::debug;
use uuid::Uuid;

use crate::client::AvhClient;
use crate::error::Error;
use crate::types::{ConsoleEndpoint, CreatedInstance, Instance, InstanceState, NewInstance};

impl AvhClient {
    /// Create a virtual device. The instance starts provisioning right away;
    /// poll [`get_instance_state`](Self::get_instance_state) to see it come up.
    ///
    /// `POST v1/instances`
    pub async fn create_instance(&self, request: &NewInstance) -> Result<CreatedInstance, Error> {
        debug!(name = %request.name, flavor = %request.flavor, "creating instance");
        self.post("v1/instances", request).await
    }

    /// `GET v1/instances/{id}`
    pub async fn get_instance(&self, id: Uuid) -> Result<Instance, Error> {
        self.get(&format!("v1/instances/{id}")).await
    }

    /// Current lifecycle state. The body is a bare JSON string.
    ///
    /// `GET v1/instances/{id}/state`
    pub async fn get_instance_state(&self, id: Uuid) -> Result<InstanceState, Error> {
        self.get(&format!("v1/instances/{id}/state")).await
    }

    /// WebSocket URL of the instance's UART console.
    ///
    /// `GET v1/instances/{id}/console`
    pub async fn get_instance_console(&self, id: Uuid) -> Result<ConsoleEndpoint, Error> {
        self.get(&format!("v1/instances/{id}/console")).await
    }

    /// `POST v1/instances/{id}/reboot`
    pub async fn reboot_instance(&self, id: Uuid) -> Result<(), Error> {
        debug!(%id, "rebooting instance");
        self.post_empty(&format!("v1/instances/{id}/reboot")).await
    }

    /// `DELETE v1/instances/{id}`
    pub async fn delete_instance(&self, id: Uuid) -> Result<(), Error> {
        debug!(%id, "deleting instance");
        self.delete(&format!("v1/instances/{id}")).await
    }
}
