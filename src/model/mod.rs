//! Neural model abstraction
//!
//! The supported network architectures, the JSON document they are built
//! from, the off-real-time loader, and the lock-free slot that hands a
//! freshly loaded model to the audio thread without stalling it.

mod document;
mod loader;
mod network;
mod slot;

pub use document::{LayerDocument, ModelDocument};
pub use loader::{ModelLoader, PRIME_SAMPLES};
pub use network::{DenseLayer, DynamicModel, GruCell, LstmCell, Network};
pub use slot::ModelSlot;
