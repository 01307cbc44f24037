// Library interface for the ezballot command-line host
// This exposes the internal modules for testing and external use

pub mod cli;
pub mod config;

// Re-export commonly used types for convenience
pub use config::AppConfig;
