//! System pallet payloads.

/// Emitted once per extrinsic whose dispatch failed.
pub const EXTRINSIC_FAILED: &str = "System.ExtrinsicFailed";
