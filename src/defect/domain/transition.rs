//! Lifecycle transition table and acting-user context.
//!
//! Legal transitions are data, not code: a [`TransitionPolicy`] maps every
//! [`TransitionAction`] to the statuses it may start from, the status it
//! lands in, whether a comment is mandatory, and which roles may perform it.

use super::{
    ActivityAction, DefectDomainError, DefectStatus, ParseActorRoleError, TransitionError, UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A guarded lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    /// Accept the defect's resolution.
    Accept,
    /// Reject the defect or its resolution.
    Reject,
    /// Return an accepted or rejected defect to active work.
    Reopen,
    /// Begin remedial work.
    StartWork,
    /// Park the defect while waiting on a third party.
    MarkPending,
    /// Report the remedial work as complete.
    Resolve,
    /// Close the defect administratively.
    Close,
}

impl TransitionAction {
    /// Every action, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Accept,
        Self::Reject,
        Self::Reopen,
        Self::StartWork,
        Self::MarkPending,
        Self::Resolve,
        Self::Close,
    ];

    /// Returns the action's verb as used in messages.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Reopen => "reopen",
            Self::StartWork => "start work on",
            Self::MarkPending => "mark as pending",
            Self::Resolve => "resolve",
            Self::Close => "close",
        }
    }

    /// Returns the activity-log tag written for this action.
    #[must_use]
    pub const fn activity_action(self) -> ActivityAction {
        match self {
            Self::Accept => ActivityAction::Accept,
            Self::Reject => ActivityAction::Reject,
            Self::Reopen => ActivityAction::Reopen,
            Self::StartWork => ActivityAction::StartWork,
            Self::MarkPending => ActivityAction::MarkPending,
            Self::Resolve => ActivityAction::Resolve,
            Self::Close => ActivityAction::Close,
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Role of the user performing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Full administrative rights.
    Administrator,
    /// Manages a project's defect register.
    ProjectManager,
    /// Inspects work on site and signs it off.
    Inspector,
    /// Member of a contracting company.
    Contractor,
}

impl ActorRole {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "administrator",
            Self::ProjectManager => "project_manager",
            Self::Inspector => "inspector",
            Self::Contractor => "contractor",
        }
    }
}

impl TryFrom<&str> for ActorRole {
    type Error = ParseActorRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "administrator" | "admin" => Ok(Self::Administrator),
            "project_manager" => Ok(Self::ProjectManager),
            "inspector" => Ok(Self::Inspector),
            "contractor" => Ok(Self::Contractor),
            _ => Err(ParseActorRoleError(value.to_owned())),
        }
    }
}

/// The user on whose behalf an operation runs.
///
/// Supplied explicitly by the caller on every engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    /// Acting user.
    pub user_id: UserId,
    /// Role the acting user holds.
    pub role: ActorRole,
}

impl Actor {
    /// Creates an actor context.
    #[must_use]
    pub const fn new(user_id: UserId, role: ActorRole) -> Self {
        Self { user_id, role }
    }
}

/// One row of the transition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// Statuses the action may start from.
    pub from: BTreeSet<DefectStatus>,
    /// Status the defect lands in.
    pub to: DefectStatus,
    /// Whether a non-empty comment is mandatory.
    #[serde(default)]
    pub comment_required: bool,
    /// Roles allowed to perform the action.
    pub roles: BTreeSet<ActorRole>,
}

impl TransitionRule {
    /// Creates a rule from explicit source statuses and roles.
    #[must_use]
    pub fn new(
        from: impl IntoIterator<Item = DefectStatus>,
        to: DefectStatus,
        comment_required: bool,
        roles: impl IntoIterator<Item = ActorRole>,
    ) -> Self {
        Self {
            from: from.into_iter().collect(),
            to,
            comment_required,
            roles: roles.into_iter().collect(),
        }
    }

    /// Creates a rule legal from every status except `excluded`.
    #[must_use]
    pub fn from_all_except(
        excluded: DefectStatus,
        to: DefectStatus,
        comment_required: bool,
        roles: impl IntoIterator<Item = ActorRole>,
    ) -> Self {
        let from = DefectStatus::ALL
            .into_iter()
            .filter(|status| *status != excluded);
        Self::new(from, to, comment_required, roles)
    }

    /// Adds a permitted source status.
    #[must_use]
    pub fn allowing_from(mut self, status: DefectStatus) -> Self {
        self.from.insert(status);
        self
    }
}

const SIGN_OFF_ROLES: [ActorRole; 3] = [
    ActorRole::Administrator,
    ActorRole::ProjectManager,
    ActorRole::Inspector,
];

const ALL_ROLES: [ActorRole; 4] = [
    ActorRole::Administrator,
    ActorRole::ProjectManager,
    ActorRole::Inspector,
    ActorRole::Contractor,
];

/// The full transition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionPolicy {
    rules: BTreeMap<TransitionAction, TransitionRule>,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        use DefectStatus::{Accepted, Closed, InProgress, Open, Pending, Rejected, Resolved, Verified};

        let mut rules = BTreeMap::new();
        rules.insert(
            TransitionAction::Accept,
            TransitionRule::from_all_except(Accepted, Accepted, true, SIGN_OFF_ROLES),
        );
        rules.insert(
            TransitionAction::Reject,
            TransitionRule::from_all_except(Rejected, Rejected, true, SIGN_OFF_ROLES),
        );
        rules.insert(
            TransitionAction::Reopen,
            TransitionRule::new([Accepted, Rejected], Open, true, SIGN_OFF_ROLES),
        );
        rules.insert(
            TransitionAction::StartWork,
            TransitionRule::new([Open, Pending], InProgress, false, ALL_ROLES),
        );
        rules.insert(
            TransitionAction::MarkPending,
            TransitionRule::new([Open, InProgress], Pending, false, ALL_ROLES),
        );
        rules.insert(
            TransitionAction::Resolve,
            TransitionRule::new([Open, Pending, InProgress], Resolved, false, ALL_ROLES),
        );
        rules.insert(
            TransitionAction::Close,
            TransitionRule::new(
                [Accepted, Resolved, Verified],
                Closed,
                false,
                [ActorRole::Administrator, ActorRole::ProjectManager],
            ),
        );
        Self { rules }
    }
}

impl TransitionPolicy {
    /// Creates an empty table in which every action is disabled.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Replaces the rule for an action.
    #[must_use]
    pub fn with_rule(mut self, action: TransitionAction, rule: TransitionRule) -> Self {
        self.rules.insert(action, rule);
        self
    }

    /// Makes `closed` defects reopenable.
    #[must_use]
    pub fn with_closed_reopenable(mut self) -> Self {
        if let Some(rule) = self.rules.remove(&TransitionAction::Reopen) {
            self.rules.insert(
                TransitionAction::Reopen,
                rule.allowing_from(DefectStatus::Closed),
            );
        }
        self
    }

    /// Returns the rule for an action, if the action is enabled.
    #[must_use]
    pub fn rule(&self, action: TransitionAction) -> Option<&TransitionRule> {
        self.rules.get(&action)
    }

    /// Validates the caller-supplied comment and role before any store
    /// access.
    ///
    /// Returns the trimmed comment, or `None` when no comment was given and
    /// none is required.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::ActionDisabled`] or
    /// [`TransitionError::RoleNotPermitted`] as a
    /// [`PreflightError::Guard`], and [`DefectDomainError::EmptyComment`] as
    /// a [`PreflightError::Validation`].
    pub fn preflight(
        &self,
        action: TransitionAction,
        actor: &Actor,
        comment: Option<&str>,
    ) -> Result<Option<String>, PreflightError> {
        let rule = self
            .rule(action)
            .ok_or(TransitionError::ActionDisabled(action))?;
        let trimmed = comment.map(str::trim).filter(|text| !text.is_empty());
        if rule.comment_required && trimmed.is_none() {
            return Err(DefectDomainError::EmptyComment(action).into());
        }
        if !rule.roles.contains(&actor.role) {
            return Err(TransitionError::RoleNotPermitted { action }.into());
        }
        Ok(trimmed.map(str::to_owned))
    }

    /// Checks the action against the defect's current status and returns the
    /// target status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::NotPermittedFrom`] when `from` is not a
    /// legal source status, or [`TransitionError::ActionDisabled`] when the
    /// table has no rule for the action.
    pub fn target_for(
        &self,
        action: TransitionAction,
        from: DefectStatus,
    ) -> Result<DefectStatus, TransitionError> {
        let rule = self
            .rule(action)
            .ok_or(TransitionError::ActionDisabled(action))?;
        if rule.from.contains(&from) {
            Ok(rule.to)
        } else {
            Err(TransitionError::NotPermittedFrom { action, from })
        }
    }
}

/// Failure raised by [`TransitionPolicy::preflight`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreflightError {
    /// The request is malformed.
    #[error(transparent)]
    Validation(#[from] DefectDomainError),
    /// The request is well formed but not allowed.
    #[error(transparent)]
    Guard(#[from] TransitionError),
}
