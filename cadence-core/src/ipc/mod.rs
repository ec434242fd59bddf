//! Serializable types published to hosts (status events, diagnostics).

pub mod events;
