//! Model loading
//!
//! Everything here runs off the real-time path: parsing, construction,
//! priming, and publication into the shared [`ModelSlot`]. A failed load
//! is logged and leaves the previously active model untouched.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::document::ModelDocument;
use super::slot::ModelSlot;
use crate::error::Result;

/// Length of the silent warm-up buffer run once over every freshly built
/// model. The output is discarded; the point is to let any internal
/// transient settle so the first real block starts without a pop.
pub const PRIME_SAMPLES: usize = 2048;

/// Loads model documents and publishes them as active
///
/// Cheap to clone-per-use: holds only the shared slot handle. Obtain one
/// from [`AudioPipeline::loader`](crate::pipeline::AudioPipeline::loader)
/// and drive it from any control thread.
#[derive(Debug, Clone)]
pub struct ModelLoader {
    slot: Arc<ModelSlot>,
}

impl ModelLoader {
    pub fn new(slot: Arc<ModelSlot>) -> Self {
        Self { slot }
    }

    /// Load a model file and, on success, swap it in as the active model
    ///
    /// Fails fast on an absent or malformed document, an input width
    /// greater than one, an unsupported skip value, or an unrecognized
    /// architecture; none of these disturb the active model.
    pub fn load_file(&self, path: &Path) -> Result<()> {
        let result = self.try_load_file(path);
        match &result {
            Ok(()) => tracing::info!("Successfully loaded model file: {}", path.display()),
            Err(e) => tracing::warn!(
                code = e.error_code(),
                "Unable to load model file {}: {}",
                path.display(),
                e
            ),
        }
        result
    }

    fn try_load_file(&self, path: &Path) -> Result<()> {
        let bytes = fs::read(path)?;
        let document: ModelDocument = serde_json::from_slice(&bytes)?;
        self.load_document(&document)
    }

    /// Build, prime, and publish a model from an already-parsed document
    pub fn load_document(&self, document: &ModelDocument) -> Result<()> {
        let mut model = document.build()?;
        model.reset();

        // Pre-buffer to avoid clicks on first real use
        let mut silence = vec![0.0_f32; PRIME_SAMPLES];
        model.apply(&mut silence);

        self.slot.publish(Box::new(model));
        Ok(())
    }
}
