//! Utility helpers shared by the CLI commands.

pub mod fs;

pub use fs::{atomic_write, ensure_dir, output_path, write_documents};
