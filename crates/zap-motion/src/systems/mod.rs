pub mod animator;
pub mod events;
pub mod field;
