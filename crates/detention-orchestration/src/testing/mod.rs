//! In-memory collaborators for tests.
//!
//! Enabled by the `test-utils` feature. The fakes count their calls and
//! accept injected failures so tests can assert on exactly what the engine
//! asked of the outside world.

pub mod approvals;
pub mod credentials;
pub mod fixtures;
pub mod orders;

pub use approvals::{ScriptedPresenter, ScriptedReply};
pub use credentials::FakeCredentialProvider;
pub use fixtures::TestHarness;
pub use orders::{FakeOrderBackend, FakeTimestampSource};

use std::sync::{Mutex, MutexGuard};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
