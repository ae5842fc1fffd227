#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod conversation;
pub mod corpus;
pub mod details;
pub mod embed;
pub mod error;
pub mod index;
pub mod librarian;
pub mod logging;
pub mod moderation;
pub mod openai;
pub mod server;
