pub mod analytics;
pub mod gallery;
pub mod message;
pub mod moderation;
pub mod visitor;
pub mod wish;
