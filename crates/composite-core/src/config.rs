//! Engine-wide configuration knobs exposed to the host.
//!
//! Modeled on `crates/compiler/src/config.rs`'s `CompilerConfig` builder:
//! a small, cheaply-cloned struct with `with_*` methods rather than a
//! global or a config file, since the only knob this engine has
//! (`expand_array_view_threshold`) is meant to be set per call site by the
//! embedding host, not read from disk.

/// Configuration for the composite engine's text I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Variable-array length at or above which the serializer emits
    /// extended form (`{size: N, data: [...]}`) instead of the compact
    /// `[...]` form.
    expand_array_view_threshold: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expand_threshold(mut self, threshold: usize) -> Self {
        self.expand_array_view_threshold = threshold;
        self
    }

    pub fn expand_array_view_threshold(&self) -> usize {
        self.expand_array_view_threshold
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        // Implementation-defined default; kept small so the threshold is
        // easy to exercise in tests.
        Self {
            expand_array_view_threshold: 3,
        }
    }
}
