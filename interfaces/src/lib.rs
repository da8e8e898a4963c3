pub mod defs;
pub mod memory;
