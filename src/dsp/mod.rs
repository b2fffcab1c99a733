//! DSP primitives
//!
//! The classical filter stages and smoothing that surround the neural
//! model: biquad filters, exponential gain ramps, and the tone stack
//! built from them.

mod biquad;
mod smoother;
mod tone_stack;

pub use biquad::{Biquad, FilterType};
pub use smoother::ExpSmoother;
pub use tone_stack::{EqPosition, MidEqType, ToneStack, COMMON_Q};
