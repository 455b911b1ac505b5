pub mod setup;

pub use setup::{setup, setup_at_path};
