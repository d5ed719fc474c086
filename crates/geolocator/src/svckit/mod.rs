//! Service Kit - Agent Tools
//!
//! Adapters that implement the `recon_core` tool traits for the geolocation
//! agent.

mod crop;
mod web_search;

pub use crop::{ImageCropper, derived_path};
pub use web_search::{MAX_SHOWN_RESULTS, WebSearch};
