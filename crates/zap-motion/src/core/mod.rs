pub mod hosts;
pub mod params;
pub mod spring;
pub mod time;
