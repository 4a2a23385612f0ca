//! Incoming triggers.

use crate::key::ResourceIdentity;

/// Anything the gate can process.
///
/// A trigger names the resource it contends for and the work item whose
/// persisted state decides whether a held lock is stale.
pub trait Trigger {
    fn resource(&self) -> &ResourceIdentity;
    fn work_item(&self) -> &str;
}

/// A comment posted on an issue, asking for automation in a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentTrigger {
    pub repo: ResourceIdentity,
    /// Talk (work item) the comment belongs to.
    pub talk: String,
    pub body: String,
    pub author: String,
}

impl Trigger for CommentTrigger {
    fn resource(&self) -> &ResourceIdentity {
        &self.repo
    }

    fn work_item(&self) -> &str {
        &self.talk
    }
}
