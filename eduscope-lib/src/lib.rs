pub mod base64;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod join;
pub mod models;
pub mod session;
pub mod store;
pub mod submission;
pub mod validators;

#[cfg(test)]
mod testing;
