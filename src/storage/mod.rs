//! Session state storage for jjgate.
//!
//! State is advisory: the jj repository is the source of truth and the
//! store only caches what the last refresh saw.

pub mod memory;
pub mod traits;

pub use memory::MemorySessionStore;
pub use traits::SessionStore;
