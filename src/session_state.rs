//! Session state schema.
//!
//! This module holds the versioned document representing one worker's pass
//! over one task, and the integer-keyed containers its labels, tracks and
//! shapes are decoded into.
//!
//! Components:
//! - `id_map`: decimal-keyed maps with per-value lenient decoding.
//! - `label`: the label record and its best-effort field mapper.
//! - `shape`: opaque, kind-dependent shape payloads.
//! - `session`: the session root, its config/cursor/items and storage key.

pub mod id_map;
pub mod label;
pub mod session;
pub mod shape;

pub use id_map::{IdMap, LenientDecode, ObjectId};
pub use label::Label;
pub use session::{Attribute, Item, Session, SessionConfig, SessionCursor};
pub use shape::Shape;
