pub mod activity;
pub mod config;
pub mod logging;

pub mod index;
pub mod manager;
pub mod operation;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod task;
pub mod transport;
