//! Search query construction.
//!
//! A filter is lowered to an explicit list of `(column, operator, value)`
//! predicates, and the predicates to SQL with every value bound as a
//! parameter. User text never reaches the SQL string.

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite};

pub const SELECT_APPLICATIONS: &str = "SELECT id, company, job_title, job_description, \
     upload_date, resume_hash, resume_path FROM applications";

/// Newest first; `id` makes ties deterministic.
pub const RECENCY_ORDER: &str = " ORDER BY upload_date DESC, id DESC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Company,
    JobTitle,
}

impl Column {
    /// Lowercased shadow of the column, written alongside it on insert.
    pub fn folded_sql(self) -> &'static str {
        match self {
            Column::Company => "company_folded",
            Column::JobTitle => "job_title_folded",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Case-insensitive substring match.
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: Column,
    pub operator: Operator,
    pub value: String,
}

impl Predicate {
    pub fn contains(column: Column, value: &str) -> Self {
        Self {
            column,
            operator: Operator::Contains,
            value: value.to_string(),
        }
    }

    fn push_sql(&self, builder: &mut QueryBuilder<'static, Sqlite>) {
        match self.operator {
            Operator::Contains => {
                // SQLite LIKE only folds ASCII, so both sides are folded up front.
                builder.push(self.column.folded_sql());
                builder.push(" LIKE ");
                builder.push_bind(format!("%{}%", escape_like(&fold_case(&self.value))));
                builder.push(" ESCAPE '\\'");
            }
        }
    }
}

/// Search parameters. Blank filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicationFilter {
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub limit: Option<u32>,
}

impl ApplicationFilter {
    pub fn new(company: Option<&str>, job_title: Option<&str>) -> Self {
        Self {
            company: company.map(str::to_string),
            job_title: job_title.map(str::to_string),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        [
            (Column::Company, self.company.as_deref()),
            (Column::JobTitle, self.job_title.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            let value = value?.trim();
            (!value.is_empty()).then(|| Predicate::contains(column, value))
        })
        .collect()
    }

    /// Builds the full `SELECT` for this filter.
    pub fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut builder = QueryBuilder::new(SELECT_APPLICATIONS);
        for (i, predicate) in self.predicates().iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_sql(&mut builder);
        }
        builder.push(RECENCY_ORDER);
        if let Some(limit) = self.limit {
            builder.push(" LIMIT ");
            builder.push_bind(i64::from(limit));
        }
        builder
    }
}

/// Unicode lowercase form used for case-insensitive matching.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Escapes LIKE wildcards so `value` matches literally under `ESCAPE '\'`.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filters_selects_everything_newest_first() {
        let builder = ApplicationFilter::default().build();
        assert_eq!(
            builder.sql(),
            format!("{SELECT_APPLICATIONS} ORDER BY upload_date DESC, id DESC")
        );
    }

    #[test]
    fn test_blank_filters_produce_no_predicates() {
        let filter = ApplicationFilter::new(Some(""), Some("   "));
        assert!(filter.predicates().is_empty());
        assert!(!filter.build().sql().contains("WHERE"));
    }

    #[test]
    fn test_filters_combine_with_and() {
        let filter = ApplicationFilter::new(Some("acme"), Some(" engineer "));
        assert_eq!(
            filter.predicates(),
            vec![
                Predicate::contains(Column::Company, "acme"),
                Predicate::contains(Column::JobTitle, "engineer"),
            ]
        );
        assert_eq!(
            filter.build().sql(),
            format!(
                "{SELECT_APPLICATIONS} WHERE company_folded LIKE ? ESCAPE '\\' \
                 AND job_title_folded LIKE ? ESCAPE '\\' ORDER BY upload_date DESC, id DESC"
            )
        );
    }

    #[test]
    fn test_values_are_bound_not_interpolated() {
        let filter = ApplicationFilter::new(Some("'; DROP TABLE applications; --"), None);
        let builder = filter.build();
        assert!(!builder.sql().contains("DROP"));
    }

    #[test]
    fn test_limit_is_bound() {
        let builder = ApplicationFilter::default().with_limit(5).build();
        assert!(builder.sql().ends_with("ORDER BY upload_date DESC, id DESC LIMIT ?"));
    }

    #[test]
    fn test_fold_case_handles_non_ascii() {
        assert_eq!(fold_case("SOCIÉTÉ Générale"), "société générale");
        assert_eq!(fold_case("STRASSE"), "strasse");
        assert_eq!(fold_case("ÅNGSTRÖM"), "ångström");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("C:\\dir"), "C:\\\\dir");
    }
}
