//! Types shared between the alumni portal backend and its clients.

pub mod account;
pub mod profile;
