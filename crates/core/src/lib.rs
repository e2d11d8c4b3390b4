//! Civic Pulse Core - Domain types and rules.
//!
//! This crate provides the types shared by every Civic Pulse component:
//! - `web` - Citizen and administrator web application
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Everything here is deterministic and cheap to test.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, statuses, roles and locations
//! - [`issue`] - Issues, comments and the upvote set
//! - [`user`] - Users and profiles
//! - [`filter`] - Search/status filtering of the working set
//! - [`stats`] - Per-status counts for the admin overview
//! - [`draft`] - Validation of new issue submissions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod draft;
pub mod filter;
pub mod issue;
pub mod stats;
pub mod types;
pub mod user;

pub use draft::{DraftError, ImageUpload, IssueDraft};
pub use filter::{IssueFilter, StatusSet};
pub use issue::{Comment, Issue, NewComment, NewIssue, Upvotes};
pub use stats::IssueStats;
pub use types::*;
pub use user::{CurrentUser, Profile, User};
