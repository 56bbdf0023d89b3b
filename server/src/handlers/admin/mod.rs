pub mod articles;
pub mod auth;
pub mod categories;
pub mod root;
pub mod users;
