//! Exit code constants for the alone CLI.
//!
//! - 0: Success (`proceed` or `empty`)
//! - 1: User error (bad args, invalid config)
//! - 2: Work item state could not be read
//! - 3: Lock service failure
//! - 4: Delegate failure
//! - 5: Deferred (`later`): the resource is busy, re-drive the trigger

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, invalid config or workspace.
pub const USER_ERROR: i32 = 1;

/// The persisted work item state could not be read.
pub const STATE_FAILURE: i32 = 2;

/// A lock acquire/release call failed.
pub const LOCK_FAILURE: i32 = 3;

/// The delegate command failed or timed out.
pub const DELEGATE_FAILURE: i32 = 4;

/// The lock is held elsewhere; the trigger was deferred.
pub const DEFERRED: i32 = 5;
