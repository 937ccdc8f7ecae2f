//! Conversation logic of the marketplace assistant: intent classification,
//! the image-to-product pipeline, and per-event dispatch.

pub mod cards;
pub mod cart;
pub mod dispatch;
pub mod error;
pub mod image;
pub mod intent;
pub mod links;

pub use {
    dispatch::Dispatcher,
    error::{Error, Result},
    image::ImagePipeline,
    intent::{Intent, IntentClassifier},
    links::PublicUrl,
};
