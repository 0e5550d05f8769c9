//! SDM schema service library exports

pub mod catalog;
pub mod config;
pub mod schema;
pub mod service;
