//! DataResult — uniform read envelope returned by the Gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uniform envelope wrapping a single gateway read.
///
/// `row_count` is tracked independently of `data` so list-shaped results can
/// report `has_data=false` on an empty (but non-null) list, matching the
/// spec's `has_data ≡ data ≠ null ∧ (not list or non-empty)` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataResult<T> {
    pub data: Option<T>,
    pub source_name: String,
    pub table_name: String,
    pub query_description: String,
    pub query_timestamp: DateTime<Utc>,
    pub row_count: usize,
}

impl<T> DataResult<T> {
    pub fn single(
        data: Option<T>,
        source_name: impl Into<String>,
        table_name: impl Into<String>,
        query_description: impl Into<String>,
        query_timestamp: DateTime<Utc>,
    ) -> Self {
        let row_count = usize::from(data.is_some());
        Self {
            data,
            source_name: source_name.into(),
            table_name: table_name.into(),
            query_description: query_description.into(),
            query_timestamp,
            row_count,
        }
    }

    /// Never null, never an error: `data=None ∧ row_count=0` is itself the
    /// empty-result representation.
    pub fn has_data(&self) -> bool {
        self.data.is_some() && self.row_count > 0
    }
}

impl<T> DataResult<Vec<T>> {
    pub fn list(
        data: Vec<T>,
        source_name: impl Into<String>,
        table_name: impl Into<String>,
        query_description: impl Into<String>,
        query_timestamp: DateTime<Utc>,
    ) -> Self {
        let row_count = data.len();
        let data = if data.is_empty() { None } else { Some(data) };
        Self {
            data,
            source_name: source_name.into(),
            table_name: table_name.into(),
            query_description: query_description.into(),
            query_timestamp,
            row_count,
        }
    }

    /// Borrowed view of the rows, empty slice when there are none.
    pub fn rows(&self) -> &[T] {
        self.data.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_has_no_data() {
        let r: DataResult<Vec<u32>> = DataResult::list(vec![], "mem", "assets", "all assets", Utc::now());
        assert!(!r.has_data());
        assert_eq!(r.row_count, 0);
        assert!(r.rows().is_empty());
    }

    #[test]
    fn nonempty_list_has_data() {
        let r = DataResult::list(vec![1, 2, 3], "mem", "assets", "all assets", Utc::now());
        assert!(r.has_data());
        assert_eq!(r.row_count, 3);
    }

    #[test]
    fn single_none_has_no_data() {
        let r: DataResult<u32> = DataResult::single(None, "mem", "assets", "by id", Utc::now());
        assert!(!r.has_data());
    }
}
