//! Transformation module.
//!
//! Turns a [`RawTable`](crate::parser::RawTable) into a
//! [`RecordSet`](crate::models::RecordSet):
//! - Schema: rename the leading columns, drop the artifact and flag columns
//! - Values: type each column using the configured decimal separator

pub mod schema;
pub mod values;

pub use schema::{derive_columns, OutputColumn};
pub use values::{build_record_set, parse_number};
