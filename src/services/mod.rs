// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod activity;
pub mod smashrun;
pub mod sync;
pub mod sync_state;
pub mod tokens;

pub use activity::ActivityRepository;
pub use smashrun::{ActivityProvider, SmashrunClient, TokenResponse};
pub use sync::{SyncOptions, SyncOutcome, SyncService, SyncWindow, WindowSpec};
pub use sync_state::SyncStateTracker;
pub use tokens::TokenRepository;
