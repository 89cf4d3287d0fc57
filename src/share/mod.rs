//! Administrative share access.
//!
//! This module provides the share transport boundary and the two operations
//! built on it:
//!
//! - [`test_credentials`]: mount and immediately release a share to check
//!   that credentials are accepted
//! - [`stage`] / [`StagedInstall::unstage`]: copy an installer and its
//!   auxiliary files to a host, then remove them

mod credentials;
mod stager;
mod transport;

pub use credentials::test_credentials;
pub use stager::{stage, StageRequest, StagedInstall};
pub use transport::{MountGuard, NetUseTransport, ShareTransport};
