//! Explicit moderation lifecycle over the persisted flags.
//!
//! ```text
//! Pending ──approve──▶ ApprovedActive ──promote──▶ Promoted
//!    │                      ▲   │                     │
//!  reject                   │   └──approve (audit)    │
//!    ▼                      └──────────demote─────────┘
//! Rejected (row deleted)
//! ```
//!
//! Transitions never mutate the row themselves; callers apply the resulting state with
//! [`Lifecycle::apply_flags`] and persist it.

use serde::Serialize;

use crate::error::WorkflowError;
use crate::listing::ListingItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    Pending,
    ApprovedActive,
    Promoted,
    Rejected,
}

impl Lifecycle {
    /// Derive the state from flags. Combinations the workflow never produces
    /// (active but unapproved, banner on an unpublished row, approved but inactive)
    /// are rejected rather than guessed at.
    pub fn from_flags(item: &ListingItem) -> Result<Self, WorkflowError> {
        match (item.is_approved, item.is_active, item.show_as_banner) {
            (false, false, false) => Ok(Lifecycle::Pending),
            (true, true, false) => Ok(Lifecycle::ApprovedActive),
            (true, true, true) => Ok(Lifecycle::Promoted),
            _ => Err(WorkflowError::Inconsistent(item.id.clone())),
        }
    }

    pub fn approve(self) -> Result<Self, WorkflowError> {
        match self {
            Lifecycle::Pending | Lifecycle::ApprovedActive => Ok(Lifecycle::ApprovedActive),
            // re-approval keeps the banner slot
            Lifecycle::Promoted => Ok(Lifecycle::Promoted),
            Lifecycle::Rejected => Err(self.invalid("approve")),
        }
    }

    pub fn reject(self) -> Result<Self, WorkflowError> {
        match self {
            Lifecycle::Pending => Ok(Lifecycle::Rejected),
            _ => Err(self.invalid("reject")),
        }
    }

    pub fn promote(self) -> Result<Self, WorkflowError> {
        match self {
            Lifecycle::ApprovedActive | Lifecycle::Promoted => Ok(Lifecycle::Promoted),
            _ => Err(self.invalid("promote")),
        }
    }

    pub fn demote(self) -> Result<Self, WorkflowError> {
        match self {
            Lifecycle::ApprovedActive | Lifecycle::Promoted => Ok(Lifecycle::ApprovedActive),
            _ => Err(self.invalid("demote")),
        }
    }

    pub fn reorder(self) -> Result<Self, WorkflowError> {
        match self {
            Lifecycle::Promoted => Ok(Lifecycle::Promoted),
            _ => Err(self.invalid("reorder")),
        }
    }

    /// Write the state's flags onto the row. Banner location/priority and audit
    /// fields are owned by the caller; only the three flags are touched here,
    /// plus clearing the location when the banner goes away.
    pub fn apply_flags(self, item: &mut ListingItem) {
        let (approved, active, banner) = match self {
            Lifecycle::Pending | Lifecycle::Rejected => (false, false, false),
            Lifecycle::ApprovedActive => (true, true, false),
            Lifecycle::Promoted => (true, true, true),
        };
        item.is_approved = approved;
        item.is_active = active;
        item.show_as_banner = banner;
        if !banner {
            item.banner_location = None;
        }
    }

    fn invalid(self, action: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition { from: self, action }
    }
}
