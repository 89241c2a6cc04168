//! Snapshot relay service layer.
//! - `storage`: one JSON document per tier, file-backed with atomic replace.
//! - `relay`: write authorization, payload validation, dispatch to storage.
//! - Transport-agnostic; the `server` crate maps outcomes to HTTP.

pub mod errors;
pub mod tier;
pub mod payload;
pub mod storage;
pub mod relay;
