pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod db_ops;
pub mod error;
pub mod handlers;
pub mod intelligence;
pub mod storage;

pub use marketdesk_models as models;
