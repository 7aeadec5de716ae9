//! Options passed to the decoders and encoders.

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Decode parameters and composites on the rayon pool.
    pub parallel: bool,
    /// Report composites whose id is not the hash of their name.
    pub verify_names: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { parallel: true, verify_names: true }
    }
}

impl DecodeOptions {
    /// Single-threaded decode with default checks.
    pub fn sequential() -> Self {
        Self { parallel: false, ..Self::default() }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Run per-composite preparation on the rayon pool.
    pub parallel: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}
