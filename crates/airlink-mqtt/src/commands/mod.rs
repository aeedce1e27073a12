//! Command modules dispatched by the [`crate::router::CommandRouter`].

pub mod wifi;
