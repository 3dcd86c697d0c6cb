#![allow(clippy::module_name_repetitions)]

pub mod apply;
pub mod config;
pub mod error;
pub mod invoker;
pub mod policy;
pub mod resource;
pub mod store;
