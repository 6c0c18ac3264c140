pub mod app_state;
pub mod config;
pub mod errors;
pub mod gateways;
pub mod logging;
pub mod models;
pub mod services;

#[cfg(test)]
pub mod test_utils;
