//! Probability distributions.
//!
//! Only the standard normal is needed by the pricing core; its error
//! function comes from the `statrs` crate.

pub mod normal;

pub use normal::{normal_cdf, normal_pdf};
