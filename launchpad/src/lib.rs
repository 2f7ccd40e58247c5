pub mod log;

pub mod launcher;
pub mod observability;
pub mod pause;
pub mod signals;
