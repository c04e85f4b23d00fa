pub mod category;
pub mod server;
pub mod server_member;
pub mod user;
