pub mod target;
pub mod value;
