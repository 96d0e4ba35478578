//! Builds the property search statement from a sparse set of filters.
//!
//! Every present filter contributes one predicate and pushes its value onto the
//! parameter list, so each placeholder ordinal is the parameter count right
//! after the push. The `WHERE`/`AND` keyword is chosen from the number of
//! predicates already written, which stays correct when one filter step pushes
//! more than one parameter.

use bb8_postgres::tokio_postgres::types::ToSql;
use crate::models::property::PropertySearchOptions;
use crate::repositories::{validate_limit, RepoError};

pub const DEFAULT_LIMIT: i64 = 10;

const SELECT_PROPERTIES: &str = "SELECT properties.*, avg(property_reviews.rating)::float8 AS average_rating \
    FROM properties \
    JOIN property_reviews ON properties.id = property_reviews.property_id";

/// A value bound to a positional placeholder.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryParam {
    Text(String),
    Int(i32),
    BigInt(i64),
    Float(f64),
}

impl QueryParam {
    pub fn as_sql(&self) -> &(dyn ToSql + Sync) {
        match self {
            QueryParam::Text(value) => value as &(dyn ToSql + Sync),
            QueryParam::Int(value) => value as &(dyn ToSql + Sync),
            QueryParam::BigInt(value) => value as &(dyn ToSql + Sync),
            QueryParam::Float(value) => value as &(dyn ToSql + Sync),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PropertyQuery {
    pub statement: String,
    pub params: Vec<QueryParam>,
}

impl PropertyQuery {
    pub fn sql_params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(QueryParam::as_sql).collect()
    }
}

struct FilterClause {
    statement: String,
    params: Vec<QueryParam>,
    predicates: usize,
}

impl FilterClause {
    fn new(base: &str) -> Self {
        Self {
            statement: String::from(base),
            params: Vec::new(),
            predicates: 0,
        }
    }

    fn bind(&mut self, param: QueryParam) -> usize {
        self.params.push(param);
        self.params.len()
    }

    /// Appends `<column> <operator> $n`, opening the clause on the first call.
    fn push_predicate(&mut self, column: &str, operator: &str, param: QueryParam) {
        let ordinal = self.bind(param);
        let keyword = if self.predicates == 0 { "WHERE" } else { "AND" };
        self.statement.push_str(&format!(" {} {} {} ${}", keyword, column, operator, ordinal));
        self.predicates += 1;
    }
}

/// Whole cents for a dollar amount, rejecting values `cost_per_night` cannot hold.
fn dollars_to_cents(field: &str, dollars: f64) -> Result<i32, RepoError> {
    let cents = (dollars * 100.0).round();
    if !cents.is_finite() || cents < 0.0 || cents > i32::MAX as f64 {
        return Err(RepoError::InvalidArgument(format!(
            "{} must be a price between 0 and {}, got {}",
            field,
            i32::MAX / 100,
            dollars
        )));
    }
    Ok(cents as i32)
}

pub fn build_property_search(
    options: &PropertySearchOptions,
    limit: i64,
) -> Result<PropertyQuery, RepoError> {
    let limit = validate_limit(limit)?;
    let mut clause = FilterClause::new(SELECT_PROPERTIES);

    if let Some(city) = &options.city {
        clause.push_predicate("city", "LIKE", QueryParam::Text(format!("%{}%", city)));
    }
    if let Some(owner_id) = options.owner_id {
        clause.push_predicate("owner_id", "=", QueryParam::Int(owner_id));
    }
    if let Some(minimum) = options.minimum_price_per_night {
        clause.push_predicate("cost_per_night", ">=", QueryParam::Int(dollars_to_cents("minimum_price_per_night", minimum)?));
    }
    if let Some(maximum) = options.maximum_price_per_night {
        clause.push_predicate("cost_per_night", "<=", QueryParam::Int(dollars_to_cents("maximum_price_per_night", maximum)?));
    }

    clause.statement.push_str(" GROUP BY properties.id");

    if let Some(minimum_rating) = options.minimum_rating {
        if !minimum_rating.is_finite() {
            return Err(RepoError::InvalidArgument(format!(
                "minimum_rating must be a finite number, got {}",
                minimum_rating
            )));
        }
        let ordinal = clause.bind(QueryParam::Float(minimum_rating));
        clause.statement.push_str(&format!(" HAVING avg(property_reviews.rating)::float8 >= ${}", ordinal));
    }

    let ordinal = clause.bind(QueryParam::BigInt(limit));
    clause.statement.push_str(&format!(" ORDER BY cost_per_night LIMIT ${};", ordinal));

    Ok(PropertyQuery {
        statement: clause.statement,
        params: clause.params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_section(statement: &str) -> &str {
        let start = statement.find("property_reviews.property_id").unwrap();
        let end = statement.find("GROUP BY").unwrap();
        &statement[start..end]
    }

    #[test]
    fn test_no_filters() {
        let query = build_property_search(&PropertySearchOptions::default(), DEFAULT_LIMIT).unwrap();

        assert!(!query.statement.contains("WHERE"));
        assert!(!query.statement.contains("HAVING"));
        assert!(query.statement.ends_with("ORDER BY cost_per_night LIMIT $1;"));
        assert_eq!(query.params, vec![QueryParam::BigInt(10)]);
    }

    #[test]
    fn test_city_only_opens_with_where() {
        let options = PropertySearchOptions {
            city: Some("Vancouver".to_string()),
            ..Default::default()
        };
        let query = build_property_search(&options, DEFAULT_LIMIT).unwrap();

        assert_eq!(filter_section(&query.statement).trim_end(), "property_reviews.property_id WHERE city LIKE $1");
        assert!(!query.statement.contains(" AND "));
        assert_eq!(query.params[0], QueryParam::Text("%Vancouver%".to_string()));
    }

    #[test]
    fn test_price_range_binds_min_then_max() {
        let options = PropertySearchOptions {
            minimum_price_per_night: Some(50.0),
            maximum_price_per_night: Some(250.0),
            ..Default::default()
        };
        let query = build_property_search(&options, DEFAULT_LIMIT).unwrap();

        assert!(query.statement.contains("WHERE cost_per_night >= $1 AND cost_per_night <= $2"));
        assert_eq!(
            query.params,
            vec![QueryParam::Int(5000), QueryParam::Int(25000), QueryParam::BigInt(10)]
        );
    }

    #[test]
    fn test_price_range_after_city_uses_and() {
        let options = PropertySearchOptions {
            city: Some("Calgary".to_string()),
            minimum_price_per_night: Some(10.0),
            maximum_price_per_night: Some(99.99),
            ..Default::default()
        };
        let query = build_property_search(&options, DEFAULT_LIMIT).unwrap();

        assert!(query.statement.contains(
            "WHERE city LIKE $1 AND cost_per_night >= $2 AND cost_per_night <= $3"
        ));
        assert_eq!(query.params[1], QueryParam::Int(1000));
        assert_eq!(query.params[2], QueryParam::Int(9999));
        assert_eq!(query.statement.matches("WHERE").count(), 1);
    }

    #[test]
    fn test_single_price_bound() {
        let options = PropertySearchOptions {
            maximum_price_per_night: Some(120.0),
            ..Default::default()
        };
        let query = build_property_search(&options, DEFAULT_LIMIT).unwrap();

        assert!(query.statement.contains("WHERE cost_per_night <= $1"));
        assert!(!query.statement.contains(">="));
        assert_eq!(query.params[0], QueryParam::Int(12000));
    }

    #[test]
    fn test_owner_filter_is_integer_equality() {
        let options = PropertySearchOptions {
            owner_id: Some(42),
            ..Default::default()
        };
        let query = build_property_search(&options, DEFAULT_LIMIT).unwrap();

        assert!(query.statement.contains("WHERE owner_id = $1"));
        assert_eq!(query.params[0], QueryParam::Int(42));
    }

    #[test]
    fn test_minimum_rating_goes_after_group_by() {
        let options = PropertySearchOptions {
            city: Some("Toronto".to_string()),
            minimum_rating: Some(4.0),
            ..Default::default()
        };
        let query = build_property_search(&options, DEFAULT_LIMIT).unwrap();

        let group_by = query.statement.find("GROUP BY properties.id").unwrap();
        let having = query.statement.find("HAVING avg(property_reviews.rating)::float8 >= $2").unwrap();
        assert!(having > group_by);
        assert!(!filter_section(&query.statement).contains("rating"));
        assert_eq!(query.params[1], QueryParam::Float(4.0));
    }

    #[test]
    fn test_limit_is_last_param_with_matching_ordinal() {
        let options = PropertySearchOptions {
            city: Some("Montreal".to_string()),
            owner_id: Some(3),
            minimum_price_per_night: Some(20.0),
            maximum_price_per_night: Some(80.0),
            minimum_rating: Some(3.5),
        };
        let query = build_property_search(&options, 25).unwrap();

        assert_eq!(query.params.len(), 6);
        assert_eq!(query.params.last(), Some(&QueryParam::BigInt(25)));
        assert!(query.statement.ends_with("LIMIT $6;"));
        assert!(query.statement.contains(
            "WHERE city LIKE $1 AND owner_id = $2 AND cost_per_night >= $3 AND cost_per_night <= $4 GROUP BY"
        ));
        assert_eq!(query.sql_params().len(), 6);
    }

    #[test]
    fn test_rejects_prices_cost_per_night_cannot_hold() {
        for (minimum, maximum) in [(f64::NAN, 100.0), (10.0, 1e12), (-5.0, 100.0), (10.0, f64::INFINITY)] {
            let options = PropertySearchOptions {
                minimum_price_per_night: Some(minimum),
                maximum_price_per_night: Some(maximum),
                ..Default::default()
            };
            let result = build_property_search(&options, DEFAULT_LIMIT);
            assert!(
                matches!(result, Err(RepoError::InvalidArgument(_))),
                "expected ({}, {}) to be rejected",
                minimum,
                maximum
            );
        }
    }

    #[test]
    fn test_rejects_non_finite_rating() {
        let options = PropertySearchOptions {
            minimum_rating: Some(f64::NAN),
            ..Default::default()
        };
        let result = build_property_search(&options, DEFAULT_LIMIT);
        assert!(matches!(result, Err(RepoError::InvalidArgument(_))));
    }

    #[test]
    fn test_rejects_non_positive_limit() {
        let result = build_property_search(&PropertySearchOptions::default(), 0);
        assert!(matches!(result, Err(RepoError::InvalidArgument(_))));
    }
}
