//! Numeric building blocks for goal-count models: dense matrices, the Poisson distribution,
//! probability slice arithmetic with integer apportioning, and computation timing.

pub mod file;
pub mod linear;
pub mod poisson;
pub mod probs;
pub mod timed;

#[doc = include_str!("../../README.md")]
#[cfg(doc)]
fn readme() {}
