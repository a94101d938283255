//! Storage module for rendered media and spooled uploads
//!
//! Everything lives on the local filesystem under the media root.

mod media;
mod temp_upload;
mod types;

pub use media::MediaStore;
pub use temp_upload::TempUpload;
pub use types::*;
