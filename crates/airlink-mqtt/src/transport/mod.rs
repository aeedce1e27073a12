//! Transport collaborator implementations.

#[cfg(feature = "rumqttc")]
pub mod mqtt;

#[cfg(feature = "rumqttc")]
pub use mqtt::MqttTransport;
