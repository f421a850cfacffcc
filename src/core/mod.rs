pub mod app;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod media;
pub mod message;
pub mod stage;
pub mod view;
