pub mod aws;
pub mod choice;
pub mod config;
pub mod environment;
pub mod export;
pub mod image;
pub mod table;
