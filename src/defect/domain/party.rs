//! Users and contracting companies that can carry responsibility for a
//! defect.

use super::{ContractorId, UserId};
use serde::{Deserialize, Serialize};

/// A company that may be responsible for remedying defects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contractor {
    id: ContractorId,
    name: String,
    trade: String,
    active: bool,
}

impl Contractor {
    /// Creates an active contractor.
    #[must_use]
    pub fn new(id: ContractorId, name: impl Into<String>, trade: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            trade: trade.into(),
            active: true,
        }
    }

    /// Returns a copy marked inactive.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the contractor identifier.
    #[must_use]
    pub const fn id(&self) -> ContractorId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the trade or specialism.
    #[must_use]
    pub fn trade(&self) -> &str {
        &self.trade
    }

    /// Returns `true` when the contractor may receive new assignments.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}

/// A user who performs actions and may be assigned defects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    display_name: String,
    contractor_id: Option<ContractorId>,
    active: bool,
}

impl User {
    /// Creates an active user with no contractor affiliation.
    #[must_use]
    pub fn new(id: UserId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            contractor_id: None,
            active: true,
        }
    }

    /// Sets the contractor the user works for.
    #[must_use]
    pub const fn with_contractor(mut self, contractor_id: ContractorId) -> Self {
        self.contractor_id = Some(contractor_id);
        self
    }

    /// Returns a copy marked inactive.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the user identifier.
    #[must_use]
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Returns the contractor affiliation, if any.
    #[must_use]
    pub const fn contractor_id(&self) -> Option<ContractorId> {
        self.contractor_id
    }

    /// Returns `true` when the user may be offered as an assignee.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }
}
