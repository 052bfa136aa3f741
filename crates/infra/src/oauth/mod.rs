//! Platform OAuth token endpoint

pub mod client;

pub use client::HttpOAuthClient;
