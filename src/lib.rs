pub mod app;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod form;
pub mod job;
pub mod layout;
pub mod output;
pub mod portal;
pub mod provision;
