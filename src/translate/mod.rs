//! Source rewriting and binding resolution for individual passes.

pub mod bindings;
pub mod channel_rewrite;
pub mod wrapper;
