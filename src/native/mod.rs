/// Native module contains local implementations of the `Runner` trait
/// that spawn interpreters directly as child processes, without containers.
pub mod html;
pub mod process;
pub mod registry;
pub mod workspace;
