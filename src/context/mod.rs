//! GPU context access.

pub use self::context::Context;

mod context;
