pub mod api;
pub mod auth;
pub mod chip;
pub mod config;
pub mod deadline;
pub mod demo_backend;
pub mod error;
pub mod fixtures;
pub mod ledger;
pub mod persist;
pub mod prophecy;
pub mod provider;
pub mod receipts;
pub mod session;
pub mod state;
pub mod window;
