pub mod air;
pub mod analysis;
pub mod config;
pub mod errors;
pub mod evidence;
pub mod extraction;
pub mod forward;
pub mod ir;
pub mod resolution;
pub mod types;
