//! State management module
//!
//! This module handles all catalog state, including:
//! - Part records as they appear in images.json (data.rs)
//! - Submitted add/edit form values (edit.rs)
//! - The record store and its probe rounds (library.rs)
//! - Visible-set and customer-summary computation (filter.rs)
//! - The session controller the view layer drives (session.rs)

pub mod data;
pub mod edit;
pub mod filter;
pub mod library;
pub mod session;
