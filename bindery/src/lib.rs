//! Bootstrapping for [bindery_di] injectors.
//!
//! Applications usually create a single injector at startup, which requires some supporting
//! infrastructure to be in place, e.g. logging or configuration. This crate provides such
//! entrypoint in the form of [Bootstrap](bootstrap::Bootstrap), which reads
//! [BootstrapConfig](config::BootstrapConfig) from the environment, installs a tracing logger and
//! exposes configuration values to the injector.

pub mod bootstrap;
pub mod config;
