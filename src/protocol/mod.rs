//! Payment gateway wire protocol.

pub mod models;
