// avh-api: Async Rust client for the Arm Virtual Hardware REST API and instance console

pub mod auth;
pub mod catalog;
pub mod client;
pub mod console;
pub mod error;
pub mod images;
pub mod instances;
pub mod peripherals;
pub mod projects;
pub mod transport;
pub mod types;

pub use auth::Session;
pub use client::AvhClient;
pub use console::ConsoleConnection;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
pub use types::{
    ConsoleEndpoint, CreatedInstance, GpioState, Image, ImageEncoding, ImageKind, Instance,
    InstanceState, LedState, Model, ModelSoftware, NewImage, NewInstance, Peripherals,
    PeripheralsUpdate, Project,
};
