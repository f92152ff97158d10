//! Flutter-facing bridge over `habitkit_core`.

pub mod api;
