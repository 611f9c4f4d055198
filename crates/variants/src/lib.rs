//! Builds the subject module in the variants a test run needs, once each,
//! and decides which artifact every test runs against.

pub mod builder;
pub mod command;
pub mod error;
pub mod key;
pub mod layout;
pub mod selector;

pub use builder::{locate_project_root, BuildStatus, BuildVariant, VariantBuilder};
pub use command::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use error::{BuildError, BuildPhase, SelectError};
pub use key::VariantKey;
pub use layout::BuildLayout;
pub use selector::{
    required_variants, ActiveVariantBinding, TestCase, VariantSelector, MARKER_CI,
    MARKER_REQUIRES_RUM, MARKER_SMOKE,
};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
