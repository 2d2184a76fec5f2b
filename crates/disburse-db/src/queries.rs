//! Database query functions organized by domain.

pub mod assets;
pub mod events;
pub mod state;
