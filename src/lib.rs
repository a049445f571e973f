pub mod config;
pub mod data;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
