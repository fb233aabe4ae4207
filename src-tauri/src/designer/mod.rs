//! AI interior-design engine: image preparation, prompts, and the
//! generative-model gateway.

pub mod gateway;
pub mod image_prep;
pub mod prompts;
pub mod types;

pub use gateway::{DesignGateway, LiveGateway};
pub use image_prep::prepare_upload;
pub use types::*;
