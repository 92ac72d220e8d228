//! Purpose: Library crate behind the `csw-publish` CLI.
//! Exports: `api` (publish flow and capabilities), `core` (request builder, endpoint parsing, errors), `notice`.
//! Role: Embeddable publish handler; the binary is a thin wiring layer over `api`.
//! Invariants: Core modules are pure; all I/O goes through injected capabilities.
pub mod api;
pub mod core;
pub mod notice;
