// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod run;
pub mod source;
pub mod split;
pub mod sync_state;

pub use run::{ProviderActivity, Run};
pub use source::{SourceRecord, SourceTokens, DEFAULT_SOURCE_TYPE};
pub use split::{ProviderSplit, Split, SplitUnit};
pub use sync_state::SyncState;
