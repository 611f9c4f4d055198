pub mod protocol;
pub mod session;
pub mod trace;

pub use session::SessionToken;
pub use trace::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
