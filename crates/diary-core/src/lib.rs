//! diary-core - Core library for the diary
//!
//! This crate contains the models, backend adapters and application logic
//! shared by every diary front end. Display and platform integration are
//! reached only through the [`app::Surface`] and [`export::Platform`] traits.

pub mod actions;
pub mod app;
pub mod backend;
pub mod config;
pub mod debounce;
pub mod error;
pub mod export;
pub mod lock;
pub mod models;
pub mod profile;
pub mod render;
pub mod repository;
pub mod session;
pub mod util;

pub use error::{Error, Result};
pub use models::{Identity, NoteId, NoteRecord, Role};
