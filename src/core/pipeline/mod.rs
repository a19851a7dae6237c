pub mod dispatching;
pub mod running;
