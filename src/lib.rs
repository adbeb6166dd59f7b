//! Material flow documents
//!
//! Assembles warehouse movement documents (receipts, releases, transfers,
//! internal movements, returns) together with their positions and persists
//! them inside a caller-owned unit of work.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod models;
pub mod services;

pub use db::{TransactionOutcome, UnitOfWork};
pub use errors::{DocumentBuildError, ServiceError};
pub use models::{Document, DocumentState, DocumentType, Location, Position, PositionDraft, Product, User};
pub use services::{DocumentBuilder, DocumentManagementService, InvalidDocumentStrategy};
