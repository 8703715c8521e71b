//! library-core: query translation and record normalization
//!
//! Pure, I/O-free building blocks for the library data-access layer:
//! - `filter`: `filter[<field>][<op>]=<value>` query keys into typed descriptors
//! - `casing` / `dates`: wire <-> storage key casing and date literal normalization
//! - `compile`: descriptors into a parameterized WHERE fragment
//! - `pagination`: `page[number]` / `page[size]` handling
//! - `schema` / `statement`: per-resource column metadata and SQL statement builders

pub mod casing;
pub mod compile;
pub mod dates;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod record;
pub mod schema;
pub mod statement;

pub use casing::{to_storage_casing, to_wire_casing};
pub use compile::{compile, pass_through_operator, BoundParam, WhereClause};
pub use dates::{normalize_date_literal, parse_date_literal, wrap_date_literals_in_sql};
pub use error::{DomainError, DomainErrorKind, Result};
pub use filter::{parse, FilterDescriptor, Operator, ParsedQuery};
pub use pagination::{Paginated, Pagination};
pub use record::Record;
pub use schema::{ColumnType, ResourceSchema, TextCase};
pub use statement::{BindValue, Statement, StatementKind};
