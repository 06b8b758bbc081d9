pub mod classifier;
pub mod router;
pub mod sanitizer;
pub mod session;

pub use crate::domain::model::{AnalysisResult, Answer, Classification, Table};
pub use crate::domain::ports::{Assistant, Storage};
pub use crate::utils::error::Result;
