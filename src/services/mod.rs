pub mod auth;
pub mod category;
pub mod file_storage;
pub mod image_validation;
pub mod server;
pub mod server_query;
