pub mod executor;
pub mod remote;
pub mod runner;
