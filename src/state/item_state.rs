/// Item pipeline state definitions
///
/// Every dispatched item moves through
/// `Dispatched -> Fetching -> Extracting -> Persisting -> Done`, or to
/// `Failed` from any of the three working states.
use crate::HarvestError;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Represents the current state of one item pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    /// Item has been handed to a task but has not started work
    Dispatched,

    /// Item page is being fetched into the content cache
    Fetching,

    /// Cached page is being parsed and its media downloaded
    Extracting,

    /// Record is being written to staging
    Persisting,

    /// Record is staged (or was already staged)
    Done,

    /// Pipeline aborted; the item is not staged in this run
    Failed,
}

impl ItemState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if the pipeline is doing I/O in this state
    pub fn is_working(&self) -> bool {
        matches!(self, Self::Fetching | Self::Extracting | Self::Persisting)
    }

    /// Returns true if moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: ItemState) -> bool {
        match (self, next) {
            (Self::Dispatched, Self::Fetching) => true,
            (Self::Fetching, Self::Extracting) => true,
            (Self::Extracting, Self::Persisting) => true,
            (Self::Persisting, Self::Done) => true,
            (from, Self::Failed) => from.is_working(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dispatched => "dispatched",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all item states in pipeline order
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Dispatched,
            Self::Fetching,
            Self::Extracting,
            Self::Persisting,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared view of one item's pipeline state
///
/// The pipeline task advances it; the coordinator keeps a clone so it can
/// tell which stage an item was in if its task dies.
#[derive(Debug, Clone)]
pub struct ItemProgress {
    state: Arc<Mutex<ItemState>>,
}

impl ItemProgress {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ItemState::Dispatched)),
        }
    }

    pub fn state(&self) -> ItemState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn advance(&self, next: ItemState) -> Result<(), HarvestError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if !state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: *state,
                to: next,
            });
        }
        *state = next;
        Ok(())
    }

    /// Marks the item failed and returns the stage it failed in
    pub fn fail(&self) -> ItemState {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let stage = *state;
        if stage.can_transition_to(ItemState::Failed) {
            *state = ItemState::Failed;
        }
        stage
    }
}

impl Default for ItemProgress {
    fn default() -> Self {
        Self::new()
    }
}
