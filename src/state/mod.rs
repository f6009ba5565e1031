//! State module for tracking item pipelines
//!
//! - `ItemState`: the stage an item pipeline is in
//! - `ItemProgress`: shared, transition-checked handle on that stage

mod item_state;

pub use item_state::{ItemProgress, ItemState};
