// Peripheral and GPIO endpoints

use uuid::Uuid;

use crate::client::AvhClient;
use crate::error::Error;
use crate::types::{GpioState, Peripherals, PeripheralsUpdate};

impl AvhClient {
    /// `GET v1/instances/{id}/peripherals`
    pub async fn get_instance_peripherals(&self, id: Uuid) -> Result<Peripherals, Error> {
        self.get(&format!("v1/instances/{id}/peripherals")).await
    }

    /// Apply a partial update; fields left `None` are not sent.
    ///
    /// `PUT v1/instances/{id}/peripherals`
    pub async fn set_instance_peripherals(
        &self,
        id: Uuid,
        update: &PeripheralsUpdate,
    ) -> Result<Peripherals, Error> {
        self.put(&format!("v1/instances/{id}/peripherals"), update)
            .await
    }

    /// `GET v1/instances/{id}/gpios`
    pub async fn get_instance_gpios(&self, id: Uuid) -> Result<GpioState, Error> {
        self.get(&format!("v1/instances/{id}/gpios")).await
    }
}
