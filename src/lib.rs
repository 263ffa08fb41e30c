//! Ticket lifecycle engine and role-based workflow core for a vending
//! machine service desk.
//!
//! Clients report malfunctioning machines through a chat-style intake flow;
//! engineers and dispatchers claim, resolve and reopen tickets on two
//! independent per-role resolution tracks; managers get union views and a
//! spreadsheet export. The crate is transport-agnostic: conversations come
//! in through [`intake`] and [`session`], deliveries go out through the
//! [`notify::NotifySink`] seam, and persistence sits behind [`db::Database`].

pub mod config;
pub mod db;
pub mod error;
pub mod intake;
pub mod models;
pub mod notify;
pub mod report;
pub mod session;
pub mod workflow;
