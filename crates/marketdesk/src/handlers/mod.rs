pub mod auth;
pub mod inbox;
pub mod intelligence;
pub mod settings;
pub mod tasks;
