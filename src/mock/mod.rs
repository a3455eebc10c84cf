//! In-process fakes for the pipeline's collaborators
//!
//! - [`MemoryStore`]: object store with failure injection and upload counters
//! - fake source control, toolchain, test runner, signer, archiver and
//!   strings check sharing one [`CallLog`]

mod failure;
mod store;
mod tools;

pub use failure::{FailureConfig, FailureInjector, StoreOp};
pub use store::MemoryStore;
pub use tools::{
    CallLog, FakeArchiver, FakeSigner, FakeSourceControl, FakeStringsCheck, FakeTestRunner,
    FakeToolchain,
};
