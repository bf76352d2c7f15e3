//! Core library modules for butterfly-place
//!
//! Network model and reader, the placement engine, and the writers for the
//! files handed to SUMO and ns-3.

pub mod buildings;
pub mod config;
pub mod emit;
pub mod error;
pub mod feasibility;
pub mod network;
pub mod placement;
pub mod poly;
pub mod sensors;
pub mod sumo;
pub mod traversal;
