//! Periodic still-image grabber for network cameras.
//!
//! A [`grabber::Grabber`] polls one snapshot URL on a fixed interval, decodes
//! the image, and hands the result to a chain of [`handlers::ResultHandler`]s,
//! the default one saving it under a timestamped path.

pub mod config;
pub mod download;
pub mod grabber;
pub mod handlers;
pub mod observability;
pub mod storage;
pub mod template;
