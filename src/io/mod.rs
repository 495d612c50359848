//! IO module for format-specific reading and writing operations.
//!
//! - `csv` - unit records (CSV), the county adjacency table (tab-separated),
//!   and plan assignments (CSV)

pub mod csv;
