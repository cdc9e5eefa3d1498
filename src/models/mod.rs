pub mod filter_spec;
pub mod offer;

// Re-exports for convenience
pub use filter_spec::*;
pub use offer::*;
