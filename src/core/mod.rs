pub mod catalog;
pub mod etl;
pub mod folders;
pub mod reconciler;

pub use crate::domain::model::{ImageSet, MappingEntry, Position, Record};
pub use crate::domain::ports::{Pipeline, Storage};
pub use crate::utils::error::Result;
