pub mod domain;
pub mod language;
pub mod pipeline;
pub mod traits;
