//! Portable, exact implementation of scaled dot-product attention.
//!
//! This path favours clarity over absolute performance and is the primitive
//! every multi-head block calls into.

pub mod exact;

pub use exact::{scaled_dot_product_attention, MASK_FILL_VALUE};
