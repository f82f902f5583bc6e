//! Core domain + application logic for WhatsaLink.
//!
//! Opens a WhatsApp chat with any phone number without saving a contact.
//! This crate is intentionally framework-agnostic: the extraction service,
//! the platform URL opener and history persistence live behind ports (traits)
//! implemented in adapter crates or in the binary.

pub mod config;
pub mod domain;
pub mod errors;
pub mod history;
pub mod logging;
pub mod phone;
pub mod ports;
pub mod session;
pub mod storage;
pub mod store;

pub use errors::{Error, Result};
