pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod rules;
pub mod storage;
