pub mod math;
pub mod node;
pub mod vision;
