// ── Remote collaborator seam ──
//
// The run only needs a fixed set of remote operations. `VirtualHardware`
// names them so the orchestration can be driven by the real client or by
// an in-memory double.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use avh_api::{
    AvhClient, ConsoleConnection, ConsoleEndpoint, CreatedInstance, Error, GpioState, Image,
    Instance, InstanceState, Model, ModelSoftware, NewImage, NewInstance, Peripherals,
    PeripheralsUpdate, Project, Session, TlsMode,
};
use secrecy::SecretString;
use uuid::Uuid;

/// Remote operations of the hardware-emulation service.
pub trait VirtualHardware: Sync {
    type Console: ConsoleStream + Send;

    fn login(&self, api_token: &SecretString) -> impl Future<Output = Result<Session, Error>> + Send;

    fn list_projects(&self) -> impl Future<Output = Result<Vec<Project>, Error>> + Send;

    fn list_models(&self) -> impl Future<Output = Result<Vec<Model>, Error>> + Send;

    fn list_model_software(
        &self,
        model: &str,
    ) -> impl Future<Output = Result<Vec<ModelSoftware>, Error>> + Send;

    fn create_instance(
        &self,
        request: &NewInstance,
    ) -> impl Future<Output = Result<CreatedInstance, Error>> + Send;

    fn get_instance(&self, id: Uuid) -> impl Future<Output = Result<Instance, Error>> + Send;

    fn get_instance_state(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<InstanceState, Error>> + Send;

    fn get_instance_console(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<ConsoleEndpoint, Error>> + Send;

    fn open_console(
        &self,
        url: &str,
        tls: &TlsMode,
    ) -> impl Future<Output = Result<Self::Console, Error>> + Send;

    fn create_image(
        &self,
        image: &NewImage,
        file: &Path,
    ) -> impl Future<Output = Result<Image, Error>> + Send;

    fn reboot_instance(&self, id: Uuid) -> impl Future<Output = Result<(), Error>> + Send;

    fn get_instance_peripherals(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Peripherals, Error>> + Send;

    fn set_instance_peripherals(
        &self,
        id: Uuid,
        update: &PeripheralsUpdate,
    ) -> impl Future<Output = Result<Peripherals, Error>> + Send;

    fn get_instance_gpios(&self, id: Uuid) -> impl Future<Output = Result<GpioState, Error>> + Send;

    fn delete_instance(&self, id: Uuid) -> impl Future<Output = Result<(), Error>> + Send;
}

/// An open console stream.
pub trait ConsoleStream {
    /// Next data frame, or `None` once the stream has ended.
    fn next_chunk(&mut self) -> impl Future<Output = Option<Result<Vec<u8>, Error>>> + Send;

    /// Drop frames that have already arrived; returns how many.
    fn discard_buffered(&mut self) -> usize;

    /// Close the stream, waiting at most `close_timeout` for the handshake.
    fn close(self, close_timeout: Duration) -> impl Future<Output = Result<(), Error>> + Send;
}

// ── Real client ──────────────────────────────────────────────────────

impl VirtualHardware for AvhClient {
    type Console = ConsoleConnection;

    async fn login(&self, api_token: &SecretString) -> Result<Session, Error> {
        AvhClient::login(self, api_token).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>, Error> {
        AvhClient::list_projects(self).await
    }

    async fn list_models(&self) -> Result<Vec<Model>, Error> {
        AvhClient::list_models(self).await
    }

    async fn list_model_software(&self, model: &str) -> Result<Vec<ModelSoftware>, Error> {
        AvhClient::list_model_software(self, model).await
    }

    async fn create_instance(&self, request: &NewInstance) -> Result<CreatedInstance, Error> {
        AvhClient::create_instance(self, request).await
    }

    async fn get_instance(&self, id: Uuid) -> Result<Instance, Error> {
        AvhClient::get_instance(self, id).await
    }

    async fn get_instance_state(&self, id: Uuid) -> Result<InstanceState, Error> {
        AvhClient::get_instance_state(self, id).await
    }

    async fn get_instance_console(&self, id: Uuid) -> Result<ConsoleEndpoint, Error> {
        AvhClient::get_instance_console(self, id).await
    }

    async fn open_console(&self, url: &str, tls: &TlsMode) -> Result<ConsoleConnection, Error> {
        ConsoleConnection::connect(url, tls).await
    }

    async fn create_image(&self, image: &NewImage, file: &Path) -> Result<Image, Error> {
        AvhClient::create_image(self, image, file).await
    }

    async fn reboot_instance(&self, id: Uuid) -> Result<(), Error> {
        AvhClient::reboot_instance(self, id).await
    }

    async fn get_instance_peripherals(&self, id: Uuid) -> Result<Peripherals, Error> {
        AvhClient::get_instance_peripherals(self, id).await
    }

    async fn set_instance_peripherals(
        &self,
        id: Uuid,
        update: &PeripheralsUpdate,
    ) -> Result<Peripherals, Error> {
        AvhClient::set_instance_peripherals(self, id, update).await
    }

    async fn get_instance_gpios(&self, id: Uuid) -> Result<GpioState, Error> {
        AvhClient::get_instance_gpios(self, id).await
    }

    async fn delete_instance(&self, id: Uuid) -> Result<(), Error> {
        AvhClient::delete_instance(self, id).await
    }
}

impl ConsoleStream for ConsoleConnection {
    async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, Error>> {
        ConsoleConnection::next_chunk(self).await
    }

    fn discard_buffered(&mut self) -> usize {
        ConsoleConnection::discard_buffered(self)
    }

    async fn close(self, close_timeout: Duration) -> Result<(), Error> {
        ConsoleConnection::close(self, close_timeout).await
    }
}
