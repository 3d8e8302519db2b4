pub mod error;
pub mod types;

pub use error::SchemError;
pub use types::{BlockPos, Dimensions, Result, Vec3};
