//! Upload of the finished artifact.

mod biliup;
mod config;
mod error;
mod traits;

pub use biliup::BiliupPublisher;
pub use config::BiliupConfig;
pub use error::PublishError;
pub use traits::{PublishRequest, Publisher};
