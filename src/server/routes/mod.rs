//! Route handlers module.

pub mod health;
pub mod labels;
pub mod status;
