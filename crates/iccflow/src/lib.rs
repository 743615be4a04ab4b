//! Batch JPEG color-space conversion through ICC profiles: reads a source
//! JPEG's embedded or EXIF-inferred color profile, transforms every pixel
//! into a destination profile, and re-embeds that profile in the output.

pub mod batch;
pub mod config;
pub mod default_profiles;
pub mod error;
pub mod extract;
pub mod profile;
pub mod session;

pub use config::ConverterConfig;
pub use error::{CliError, ExtractError, ProfileError, SessionError};
pub use profile::{Profile, ProfileSource};
