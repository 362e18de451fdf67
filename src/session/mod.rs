//! The cutting session: the external interface of the crate.

pub use self::session::{CutSession, IntersectionKind};

mod dump;
mod session;
