//! Backend provider implementations

pub mod replicate;

// Re-export for convenience
pub use replicate::ReplicateClient;
