//! Neuramp - Neural Amp-Modeling DSP Core
//!
//! The real-time heart of an amplifier-and-cabinet modeling effect: a
//! fixed-topology chain of classical filter stages around a dynamically
//! loadable neural network emulating nonlinear amp behavior.
//!
//! # Architecture
//!
//! - [`dsp`] — biquad filters, exponential gain smoothing, and the tone
//!   stack built from them
//! - [`model`] — the supported network architectures, the JSON model
//!   document, the off-real-time loader, and the lock-free active-model
//!   slot
//! - [`params`] — the 18-control parameter surface
//! - [`pipeline`] — the per-block stage ordering tying it all together
//!
//! The audio path ([`AudioPipeline::process`]) never blocks, allocates,
//! or contends on a lock; model loading and reclamation happen entirely
//! on the control path.

pub mod dsp;
pub mod error;
pub mod model;
pub mod params;
pub mod pipeline;

pub use error::{NeurampError, Result};
pub use pipeline::AudioPipeline;
