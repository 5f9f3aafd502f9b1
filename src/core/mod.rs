//! Core catalog types

pub mod item;

pub use item::{Item, ItemId, NewItem};
