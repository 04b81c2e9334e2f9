//! Talk to Waterkotte EcoTouch heat pump controllers over their CGI tag protocol.
//!
//! The controller exposes every sensor and setting as a numbered wire tag (`A1`,
//! `I51`, `D420`). This crate names the useful ones, handles the cookie-backed login
//! session, batches reads and writes under the controller's per-request tag limit,
//! and converts between raw register integers and typed values.

pub mod codec;
pub mod commands;
pub mod connection;
pub mod lexicon;
pub mod output;
pub mod protocol;
pub mod tags;
