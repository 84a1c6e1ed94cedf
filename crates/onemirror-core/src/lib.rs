//! onemirror Core - Domain types and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `RawEntry`, `EntryKind`, `RelativePath`, `SyncAction`, `ResolveError`
//! - **Port definitions** - Traits for adapters: `ChangeFeedSource`, `ItemMetadataFetcher`,
//!   `DownloadResolver`
//! - **Configuration** - YAML-backed [`config::Config`]
//!
//! # Architecture
//!
//! The domain module contains pure data types and the per-entry decode logic
//! with no I/O. Ports define trait interfaces that adapter crates implement
//! (the Microsoft Graph adapters live in `onemirror-graph`). The reconciliation
//! engine that wires ports and domain together lives in `onemirror-sync`.

pub mod config;
pub mod domain;
pub mod ports;
