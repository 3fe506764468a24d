pub mod enums;
pub mod profile;
pub mod recommendation;

pub use enums::*;
pub use profile::*;
pub use recommendation::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },
}
