// Utility modules

pub mod debug;
pub mod detect;
pub mod encode;
