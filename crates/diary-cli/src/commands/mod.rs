pub mod account;
pub mod add;
pub mod admin;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod edit;
pub mod export;
pub mod list;
pub mod shell;
pub mod unlock;
