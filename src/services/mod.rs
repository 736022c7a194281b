pub mod aggregate;
pub mod catalog;
pub mod collector;
pub mod credentials;
pub mod fal;
pub mod generator;
pub mod image_ref;
pub mod jobs;
pub mod poller;
pub mod resolver;
