pub mod memory;
pub mod remote;
pub mod store;
pub mod sync;
