pub mod client;
pub mod error;
pub mod models;

pub use client::SyncClient;
pub use error::ApiError;
pub use models::Video;
