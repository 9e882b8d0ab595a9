pub mod analyst;
pub mod batch;
pub mod cache;
pub mod config;
pub mod data;
pub mod domain;
pub mod form;
pub mod head_to_head;
pub mod pool;
pub mod predictor;
pub mod print;
pub mod quota;
pub mod registry;
pub mod scoregrid;
pub mod service;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
