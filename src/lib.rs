pub mod api;
pub mod error;
pub mod logger;
pub mod metadata;
pub mod parser;
pub mod value;

pub use crate::error::{Error, Result, Section};
pub use api::{ReadOptions, SasFile};
pub use metadata::{Column, ColumnType, DatasetMetadata};
pub use parser::{RowCursor, VisitResult, Visitor};
pub use value::{MissingValue, Value};
