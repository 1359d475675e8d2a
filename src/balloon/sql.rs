//! Shorthand parsing and SQL generation
//!
//! Grammar of one statement's text:
//!
//! ```text
//! [FOREACH] TABLE/COL[,COL...][AGGREGATE][CONDITION]
//! ```
//!
//! `AGGREGATE` is one of MAX, MIN, AVG, COUNT, SUM, FIRST, LAST.
//! `CONDITION` is either a 1-based row number or a boolean predicate.

use super::vocabulary::{self, ColumnDef, TableDef};
use crate::domain::TemplateError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Max,
    Min,
    Avg,
    Count,
    Sum,
    First,
    Last,
}

impl Aggregate {
    fn parse(keyword: &str) -> Option<Self> {
        match keyword.trim().to_ascii_uppercase().as_str() {
            "MAX" => Some(Aggregate::Max),
            "MIN" => Some(Aggregate::Min),
            "AVG" => Some(Aggregate::Avg),
            "COUNT" => Some(Aggregate::Count),
            "SUM" => Some(Aggregate::Sum),
            "FIRST" => Some(Aggregate::First),
            "LAST" => Some(Aggregate::Last),
            _ => None,
        }
    }

    /// SQL function name for the wrapping aggregates
    fn function(&self) -> Option<&'static str> {
        match self {
            Aggregate::Max => Some("MAX"),
            Aggregate::Min => Some("MIN"),
            Aggregate::Avg => Some("AVG"),
            Aggregate::Count => Some("COUNT"),
            Aggregate::Sum => Some("SUM"),
            Aggregate::First | Aggregate::Last => None,
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregate::First => "FIRST",
            Aggregate::Last => "LAST",
            other => other.function().unwrap_or_default(),
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// 1-based row of the unwindowed result
    Row(usize),
    Predicate(String),
}

/// Parsed shorthand before vocabulary resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shorthand {
    pub table: String,
    pub columns: Vec<String>,
    pub aggregate: Option<Aggregate>,
    pub condition: Option<Condition>,
}

/// Executable query for one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    pub column_count: usize,
}

/// Strips a leading FOREACH keyword, if present
pub fn strip_foreach(text: &str) -> Option<&str> {
    let trimmed = text.trim_start();
    let head = trimmed.get(..7)?;
    if !head.eq_ignore_ascii_case("FOREACH") {
        return None;
    }
    let rest = &trimmed[7..];
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest),
        _ => None,
    }
}

/// Splits `[a][b]` groups, honouring nested brackets inside a group
///
/// Brackets inside single-quoted literals are ignored. A doubled quote
/// toggles twice and stays inside the literal.
fn bracket_groups<'a>(text: &'a str, reference: &str) -> Result<Vec<&'a str>, TemplateError> {
    let mut groups = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(TemplateError::unsupported(
                reference,
                format!("unexpected text '{rest}' after column list"),
            ));
        }

        let mut depth = 0usize;
        let mut in_literal = false;
        let mut end = None;
        for (i, c) in rest.char_indices() {
            match c {
                '\'' => in_literal = !in_literal,
                _ if in_literal => {}
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i);
                        break;
                    }
                }
                _ => {}
            }
        }

        let end = end.ok_or_else(|| TemplateError::unsupported(reference, "unclosed '['"))?;
        groups.push(&rest[1..end]);
        rest = rest[end + 1..].trim_start();
    }

    Ok(groups)
}

fn parse_condition(text: &str, reference: &str) -> Result<Condition, TemplateError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TemplateError::unsupported(reference, "empty condition"));
    }

    if text.chars().all(|c| c.is_ascii_digit()) {
        return match text.parse::<usize>() {
            Ok(row) if row > 0 => Ok(Condition::Row(row)),
            _ => Err(TemplateError::unsupported(
                reference,
                "row index must be a positive integer",
            )),
        };
    }

    for forbidden in [";", "--", "/*"] {
        if text.contains(forbidden) {
            return Err(TemplateError::unsupported(
                reference,
                format!("'{forbidden}' is not allowed in a condition"),
            ));
        }
    }

    Ok(Condition::Predicate(text.to_string()))
}

/// Parses shorthand text (without the FOREACH keyword)
///
/// # Errors
///
/// Returns `TemplateError::UnsupportedReference` for malformed shorthand.
pub fn parse(text: &str) -> Result<Shorthand, TemplateError> {
    let reference = text.trim();
    let (table, rest) = reference
        .split_once('/')
        .ok_or_else(|| TemplateError::unsupported(reference, "expected TABLE/COLUMN"))?;

    let table = table.trim();
    if table.is_empty() {
        return Err(TemplateError::unsupported(reference, "missing table keyword"));
    }

    let (column_list, brackets) = match rest.find('[') {
        Some(pos) => rest.split_at(pos),
        None => (rest, ""),
    };

    let columns: Vec<String> = column_list
        .split(',')
        .map(|c| c.trim().to_string())
        .collect();
    if columns.iter().any(String::is_empty) {
        return Err(TemplateError::unsupported(reference, "empty column name"));
    }
    if let Some(bad) = columns
        .iter()
        .find(|c| !c.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_'))
    {
        return Err(TemplateError::unsupported(
            reference,
            format!("invalid column name '{bad}'"),
        ));
    }

    let groups = bracket_groups(brackets, reference)?;
    let (aggregate, condition) = match groups.as_slice() {
        [] => (None, None),
        [only] => match Aggregate::parse(only) {
            Some(aggregate) => (Some(aggregate), None),
            None => (None, Some(parse_condition(only, reference)?)),
        },
        [first, second] => {
            let aggregate = Aggregate::parse(first).ok_or_else(|| {
                TemplateError::unsupported(reference, format!("unknown aggregate '{first}'"))
            })?;
            (Some(aggregate), Some(parse_condition(second, reference)?))
        }
        _ => {
            return Err(TemplateError::unsupported(
                reference,
                "at most one aggregate and one condition are allowed",
            ))
        }
    };

    Ok(Shorthand {
        table: table.to_string(),
        columns,
        aggregate,
        condition,
    })
}

fn resolve(
    shorthand: &Shorthand,
    reference: &str,
) -> Result<(&'static TableDef, Vec<&'static ColumnDef>), TemplateError> {
    let table = vocabulary::table(&shorthand.table).ok_or_else(|| {
        TemplateError::unsupported(reference, format!("unknown table '{}'", shorthand.table))
    })?;

    let columns = shorthand
        .columns
        .iter()
        .map(|name| {
            table.column(name).ok_or_else(|| {
                TemplateError::unsupported(
                    reference,
                    format!("unknown column '{}' in table {}", name, table.keyword),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok((table, columns))
}

/// Compiles statement text into an executable query bound to `$1`
///
/// Foreach statements keep a predicate condition but skip aggregation and
/// row windowing.
///
/// # Errors
///
/// Returns `TemplateError::UnsupportedReference` for unknown tables or
/// columns, malformed shorthand, or aggregates that cannot apply.
pub fn compile(text: &str, foreach: bool) -> Result<CompiledQuery, TemplateError> {
    let body = if foreach {
        strip_foreach(text).ok_or_else(|| {
            TemplateError::unsupported(text.trim(), "expected FOREACH keyword")
        })?
    } else {
        text
    };

    let shorthand = parse(body)?;
    let reference = body.trim();
    let (table, columns) = resolve(&shorthand, reference)?;

    let (aggregate, condition) = if foreach {
        let predicate = match shorthand.condition {
            Some(Condition::Predicate(p)) => Some(Condition::Predicate(p)),
            _ => None,
        };
        (None, predicate)
    } else {
        (shorthand.aggregate, shorthand.condition)
    };

    let expressions: Vec<String> = columns.iter().map(|c| table.column_sql(c)).collect();

    let select_list = match aggregate.and_then(|a| a.function().map(|f| (a, f))) {
        Some((aggregate, function)) => {
            if aggregate != Aggregate::Count {
                if let Some(column) = columns.iter().find(|c| c.geometry) {
                    return Err(TemplateError::unsupported(
                        reference,
                        format!("{aggregate} cannot be applied to geometry column {}", column.name),
                    ));
                }
            }
            expressions
                .iter()
                .map(|e| format!("{function}({e})"))
                .collect::<Vec<_>>()
                .join(", ")
        }
        None => expressions.join(", "),
    };

    let mut sql = format!(
        "SELECT {select_list} FROM {} WHERE {}",
        table.from, table.filter
    );

    if let Some(Condition::Predicate(predicate)) = &condition {
        sql.push_str(&format!(" AND ({predicate})"));
    }

    match aggregate {
        Some(Aggregate::First) | Some(Aggregate::Last) => {
            let direction = if aggregate == Some(Aggregate::First) {
                "ASC"
            } else {
                "DESC"
            };
            let ordering = expressions
                .iter()
                .map(|e| format!("{e} {direction}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ORDER BY {ordering} LIMIT 1"));
        }
        Some(_) => {}
        None => sql.push_str(&format!(" ORDER BY {}", table.order_by)),
    }

    if let Some(Condition::Row(row)) = condition {
        sql = format!("SELECT * FROM ({sql}) AS w LIMIT 1 OFFSET {}", row - 1);
    }

    Ok(CompiledQuery {
        sql,
        column_count: columns.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_parse_full_shorthand() {
        let parsed = parse("ADDRESS/STREET, HOUSE_NUMBER[FIRST][city = 'Berlin']").unwrap();
        assert_eq!(parsed.table, "ADDRESS");
        assert_eq!(parsed.columns, vec!["STREET", "HOUSE_NUMBER"]);
        assert_eq!(parsed.aggregate, Some(Aggregate::First));
        assert_eq!(
            parsed.condition,
            Some(Condition::Predicate("city = 'Berlin'".to_string()))
        );
    }

    #[test]
    fn test_brackets_inside_literals_do_not_split_groups() {
        let parsed = parse("CITYOBJECT/NAME[name = 'a]b']").unwrap();
        assert_eq!(parsed.aggregate, None);
        assert_eq!(
            parsed.condition,
            Some(Condition::Predicate("name = 'a]b'".to_string()))
        );

        let parsed = parse("CITYOBJECT/NAME[FIRST][name = 'a]b']").unwrap();
        assert_eq!(
            parsed.condition,
            Some(Condition::Predicate("name = 'a]b'".to_string()))
        );

        let parsed = parse("CITYOBJECT/NAME[name LIKE '[x' OR name = 'it''s]']").unwrap();
        assert_eq!(
            parsed.condition,
            Some(Condition::Predicate(
                "name LIKE '[x' OR name = 'it''s]'".to_string()
            ))
        );
    }

    #[test_case("BUILDING" ; "missing slash")]
    #[test_case("/NAME" ; "missing table")]
    #[test_case("BUILDING/NAME,,CLASS" ; "empty column")]
    #[test_case("BUILDING/NAME[MAX" ; "unclosed bracket")]
    #[test_case("BUILDING/NAME[0]" ; "zero row")]
    #[test_case("BUILDING/NAME[MAX][1][2]" ; "too many groups")]
    #[test_case("BUILDING/NAME junk" ; "trailing text")]
    #[test_case("BUILDING/NAME[1 = 1; DROP TABLE building]" ; "statement separator")]
    #[test_case("BUILDING/NAME[1 = 1 -- comment]" ; "line comment")]
    fn test_parse_rejects(text: &str) {
        assert!(matches!(
            parse(text),
            Err(TemplateError::UnsupportedReference { .. })
        ));
    }

    #[test]
    fn test_aggregate_query_over_building_path() {
        let query = compile("BUILDING/MEASURED_HEIGHT[MAX]", false).unwrap();
        assert_eq!(
            query.sql,
            "SELECT MAX(b.measured_height) FROM building b WHERE b.id = $1"
        );
        assert_eq!(query.column_count, 1);
    }

    #[test]
    fn test_unknown_column_is_unsupported() {
        let err = compile("BUILDING/NOT_A_COLUMN", false).unwrap_err();
        assert!(matches!(err, TemplateError::UnsupportedReference { .. }));
        assert!(err.to_string().contains("NOT_A_COLUMN"));

        let err = compile("PARCEL/ID", false).unwrap_err();
        assert!(err.to_string().contains("unknown table"));
    }

    #[test]
    fn test_row_condition_wraps_unwindowed_query() {
        let query = compile("ADDRESS/STREET[3]", false).unwrap();
        assert_eq!(
            query.sql,
            "SELECT * FROM (SELECT a.street FROM address a JOIN address_to_building atb \
             ON atb.address_id = a.id WHERE atb.building_id = $1 ORDER BY a.id) AS w \
             LIMIT 1 OFFSET 2"
        );
    }

    #[test]
    fn test_first_and_last_order_and_limit() {
        let first = compile("ADDRESS/ZIP_CODE[FIRST]", false).unwrap();
        assert!(first.sql.ends_with("ORDER BY a.zip_code ASC LIMIT 1"));

        let last = compile("ADDRESS/ZIP_CODE,CITY[LAST]", false).unwrap();
        assert!(last
            .sql
            .ends_with("ORDER BY a.zip_code DESC, a.city DESC LIMIT 1"));
        assert_eq!(last.column_count, 2);
    }

    #[test]
    fn test_predicate_is_appended() {
        let query = compile("CITYOBJECT_GENERICATTRIB/STRVAL[attrname = 'roof']", false).unwrap();
        assert!(query
            .sql
            .contains("WHERE ga.cityobject_id = $1 AND (attrname = 'roof')"));
    }

    #[test]
    fn test_foreach_skips_aggregate_and_window() {
        let query = compile("FOREACH ADDRESS/STREET,CITY[COUNT][2]", true).unwrap();
        assert!(!query.sql.contains("COUNT("));
        assert!(!query.sql.contains("OFFSET"));
        assert!(query.sql.ends_with("ORDER BY a.id"));
        assert_eq!(query.column_count, 2);

        let filtered = compile("foreach ADDRESS/STREET[city = 'Bonn']", true).unwrap();
        assert!(filtered.sql.contains("AND (city = 'Bonn')"));
    }

    #[test]
    fn test_geometry_aggregates() {
        assert!(compile("CITYOBJECT/ENVELOPE[MAX]", false).is_err());
        assert!(compile("CITYOBJECT/ENVELOPE[COUNT]", false).is_ok());
    }

    #[test]
    fn test_special_keywords() {
        let query = compile("SPECIAL_KEYWORDS/CENTROID_WGS84_LAT", false).unwrap();
        assert!(query
            .sql
            .starts_with("SELECT ST_Y(ST_Centroid(ST_Transform(co.envelope, 4326)))"));
    }

    #[test]
    fn test_strip_foreach() {
        assert_eq!(strip_foreach("  FOREACH ADDRESS/CITY"), Some(" ADDRESS/CITY"));
        assert_eq!(strip_foreach("ForEach\tX/Y"), Some("\tX/Y"));
        assert_eq!(strip_foreach("FOREACHED/X"), None);
        assert_eq!(strip_foreach("ADDRESS/CITY"), None);
    }
}
