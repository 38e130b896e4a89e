// Query Executor - Execute statements and SELECT query plans
use super::ast::*;
use super::operators::{apply_binary, apply_unary};
use super::planner::{PlanNode, QueryPlan, QueryPlanner};
use super::types::*;
use crate::config::ExecutionConfig;
use crate::error::{Error, Result};
use crate::storage::{Database, Table};
use ahash::AHashSet;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Optional acceleration layer for SELECT plans.
///
/// A backend receives the lowered plan together with the source table and
/// either produces the complete result or returns `Ok(None)` to let the
/// interpreter run the plan.
pub trait ExecutionBackend: Send {
    fn name(&self) -> &str;

    fn execute(&self, plan: &QueryPlan, table: &Table) -> Result<Option<QueryResult>>;
}

/// Column bindings of one stored row.
pub struct RowContext<'a> {
    pub table: &'a Table,
    pub row: &'a Row,
}

impl<'a> RowContext<'a> {
    pub fn new(table: &'a Table, row: &'a Row) -> Self {
        Self { table, row }
    }

    pub fn value(&self, qualifier: Option<&str>, name: &str) -> Result<&'a Value> {
        if let Some(qualifier) = qualifier {
            if qualifier != self.table.name() {
                return Err(Error::ColumnNotFound(format!("{}.{}", qualifier, name)));
            }
        }
        let index = self.table.schema().column_index(name)?;
        self.row
            .get(index)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }
}

/// Evaluates an expression, resolving column references against `context`.
/// Without a row context only constant expressions can be evaluated.
pub fn evaluate(expr: &Expression, context: Option<&RowContext<'_>>) -> Result<Value> {
    match expr {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Column { table, name } => match context {
            Some(context) => context.value(table.as_deref(), name).cloned(),
            None => Err(Error::UnsupportedExpression(format!(
                "column reference {} outside of a row context",
                expr
            ))),
        },
        Expression::BinaryOp { left, op, right } => {
            let left = evaluate(left, context)?;
            let right = evaluate(right, context)?;
            apply_binary(*op, &left, &right)
        }
        Expression::UnaryOp { op, expr } => {
            let operand = evaluate(expr, context)?;
            apply_unary(*op, &operand)
        }
    }
}

pub struct QueryExecutor<'a> {
    database: &'a mut Database,
    config: &'a ExecutionConfig,
    backend: Option<&'a dyn ExecutionBackend>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(database: &'a mut Database, config: &'a ExecutionConfig) -> Self {
        QueryExecutor {
            database,
            config,
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend: Option<&'a dyn ExecutionBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<QueryResult> {
        match statement {
            Statement::CreateTable(stmt) => self.execute_create_table(stmt),
            Statement::DropTable(stmt) => self.execute_drop_table(stmt),
            Statement::Insert(stmt) => self.execute_insert(stmt),
            Statement::Select(stmt) => self.execute_select(stmt),
        }
    }

    fn execute_create_table(&mut self, stmt: &CreateTableStatement) -> Result<QueryResult> {
        let schema = Schema::new(stmt.columns.clone())?;
        self.database.create_table(&stmt.name, schema)?;
        Ok(QueryResult::empty())
    }

    fn execute_drop_table(&mut self, stmt: &DropTableStatement) -> Result<QueryResult> {
        if self.database.drop_table(&stmt.name).is_none() {
            if self.config.error_on_missing_drop {
                return Err(Error::TableNotFound(stmt.name.clone()));
            }
            debug!(table = %stmt.name, "DROP TABLE of missing table ignored");
        }
        Ok(QueryResult::empty())
    }

    fn execute_insert(&mut self, stmt: &InsertStatement) -> Result<QueryResult> {
        let table = self.database.table(&stmt.table)?;
        let schema = table.schema();

        let targets = match &stmt.columns {
            Some(columns) => Some(resolve_insert_columns(schema, columns)?),
            None => None,
        };

        let mut rows = Vec::with_capacity(stmt.values.len());
        for exprs in &stmt.values {
            let values = exprs
                .iter()
                .map(|expr| evaluate(expr, None))
                .collect::<Result<Vec<_>>>()?;

            let row = match &targets {
                Some(targets) => {
                    if values.len() != targets.len() {
                        return Err(Error::RowWidthMismatch {
                            table: stmt.table.clone(),
                            expected: targets.len(),
                            found: values.len(),
                        });
                    }
                    let mut row = vec![Value::Null; schema.len()];
                    for (&index, value) in targets.iter().zip(values) {
                        row[index] = value;
                    }
                    row
                }
                None => values,
            };
            rows.push(row);
        }

        let inserted = self.database.table_mut(&stmt.table)?.insert_rows(rows)?;
        Ok(QueryResult::affected(inserted as u64))
    }

    fn execute_select(&mut self, stmt: &SelectStatement) -> Result<QueryResult> {
        let table = self.database.table(&stmt.from)?;
        let plan = QueryPlanner::new().plan(stmt);
        debug!(plan = %plan.root, "Planned SELECT");

        if self.config.use_backend {
            if let Some(backend) = self.backend {
                match backend.execute(&plan, table) {
                    Ok(Some(result)) => {
                        debug!(backend = backend.name(), rows = result.rows.len(), "Backend produced result");
                        return Ok(result);
                    }
                    Ok(None) => debug!(backend = backend.name(), "Backend declined plan"),
                    Err(e) => {
                        warn!(backend = backend.name(), error = %e, "Backend failed, interpreting plan");
                    }
                }
            }
        }

        execute_node(&plan.root, table)
    }
}

fn resolve_insert_columns(schema: &Schema, columns: &[String]) -> Result<Vec<usize>> {
    let mut seen = AHashSet::with_capacity(columns.len());
    columns
        .iter()
        .map(|name| {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateColumn(name.clone()));
            }
            schema.column_index(name)
        })
        .collect()
}

/// Interprets a plan tree against its source table.
///
/// Every node below the projection yields full table rows with the table's
/// column names; the projection shapes the final output.
pub fn execute_node(node: &PlanNode, table: &Table) -> Result<QueryResult> {
    match node {
        PlanNode::TableScan { filter, .. } => execute_table_scan(table, filter.as_ref()),
        PlanNode::Sort {
            input,
            columns,
            order,
        } => execute_sort(execute_node(input, table)?, table, columns, *order),
        PlanNode::Limit { input, limit } => {
            let mut result = execute_node(input, table)?;
            let limit = usize::try_from(*limit).unwrap_or(usize::MAX);
            result.rows.truncate(limit);
            Ok(result)
        }
        PlanNode::Projection { input, items } => {
            execute_projection(execute_node(input, table)?, table, items)
        }
    }
}

fn execute_table_scan(table: &Table, filter: Option<&Expression>) -> Result<QueryResult> {
    let mut rows = Vec::new();
    for row in table.rows() {
        let keep = match filter {
            Some(filter) => {
                let context = RowContext::new(table, row);
                matches!(evaluate(filter, Some(&context))?, Value::Boolean(true))
            }
            None => true,
        };
        if keep {
            rows.push(row.clone());
        }
    }

    debug!(table = %table.name(), scanned = table.row_count(), kept = rows.len(), "Table scan");
    Ok(QueryResult {
        columns: table.schema().column_names(),
        rows,
        rows_affected: 0,
    })
}

fn execute_sort(
    mut result: QueryResult,
    table: &Table,
    columns: &[String],
    order: SortOrder,
) -> Result<QueryResult> {
    let indices = columns
        .iter()
        .map(|name| table.schema().column_index(name))
        .collect::<Result<Vec<_>>>()?;

    // sort_by is stable, so ties keep insertion order in both directions.
    result.rows.sort_by(|a, b| {
        for &index in &indices {
            let ordering = a[index].cmp(&b[index]);
            if ordering != Ordering::Equal {
                return match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                };
            }
        }
        Ordering::Equal
    });

    Ok(result)
}

fn execute_projection(input: QueryResult, table: &Table, items: &[SelectItem]) -> Result<QueryResult> {
    let mut columns = Vec::new();
    for item in items {
        match item {
            SelectItem::Wildcard => columns.extend(table.schema().column_names()),
            SelectItem::Expression { expr, alias } => columns.push(output_name(expr, alias.as_deref())),
        }
    }

    let mut rows = Vec::with_capacity(input.rows.len());
    for row in &input.rows {
        let context = RowContext::new(table, row);
        let mut projected = Vec::with_capacity(columns.len());
        for item in items {
            match item {
                SelectItem::Wildcard => projected.extend(row.iter().cloned()),
                SelectItem::Expression { expr, .. } => projected.push(evaluate(expr, Some(&context))?),
            }
        }
        rows.push(projected);
    }

    Ok(QueryResult {
        columns,
        rows,
        rows_affected: 0,
    })
}

fn output_name(expr: &Expression, alias: Option<&str>) -> String {
    match (alias, expr) {
        (Some(alias), _) => alias.to_string(),
        (None, Expression::Column { name, .. }) => name.clone(),
        (None, expr) => expr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parser::parse_sql;

    fn run(db: &mut Database, sql: &str) -> Result<QueryResult> {
        let config = ExecutionConfig::default();
        QueryExecutor::new(db, &config).execute(&parse_sql(sql)?)
    }

    fn users() -> Database {
        let mut db = Database::new();
        run(&mut db, "CREATE TABLE users (id INTEGER NOT NULL, name TEXT, age INTEGER)").unwrap();
        run(
            &mut db,
            "INSERT INTO users VALUES (1, 'Alice', 30), (2, 'Bob', 25), (3, 'Carol', 30), (4, 'Dan', NULL)",
        )
        .unwrap();
        db
    }

    fn ids(result: &QueryResult) -> Vec<i64> {
        result.rows.iter().filter_map(|row| row[0].as_integer()).collect()
    }

    #[test]
    fn test_evaluate_constant_expression() {
        let expr = match parse_sql("INSERT INTO t VALUES (-(2 + 3) * 4)").unwrap() {
            Statement::Insert(insert) => insert.values[0][0].clone(),
            _ => unreachable!(),
        };
        assert_eq!(evaluate(&expr, None).unwrap(), Value::Integer(-20));
    }

    #[test]
    fn test_column_outside_row_context_is_unsupported() {
        assert!(matches!(
            evaluate(&Expression::column("id"), None),
            Err(Error::UnsupportedExpression(_))
        ));
    }

    #[test]
    fn test_insert_reports_rows_affected() {
        let mut db = users();
        let result = run(&mut db, "INSERT INTO users VALUES (5, 'Eve', 41)").unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(db.table("users").unwrap().row_count(), 5);
    }

    #[test]
    fn test_insert_with_column_list_fills_nulls() {
        let mut db = users();
        run(&mut db, "INSERT INTO users (name, id) VALUES ('Fay', 6)").unwrap();

        let table = db.table("users").unwrap();
        assert_eq!(
            table.rows()[4],
            vec![Value::Integer(6), Value::Text("Fay".into()), Value::Null]
        );
    }

    #[test]
    fn test_insert_column_list_errors() {
        let mut db = users();
        assert!(matches!(
            run(&mut db, "INSERT INTO users (id, id) VALUES (1, 2)"),
            Err(Error::DuplicateColumn(_))
        ));
        assert!(matches!(
            run(&mut db, "INSERT INTO users (id, email) VALUES (1, 'x')"),
            Err(Error::ColumnNotFound(_))
        ));
        assert!(matches!(
            run(&mut db, "INSERT INTO users (id, name) VALUES (1)"),
            Err(Error::RowWidthMismatch { expected: 2, found: 1, .. })
        ));
        assert!(matches!(
            run(&mut db, "INSERT INTO users (name) VALUES ('no id')"),
            Err(Error::NullConstraintViolation(_))
        ));
        assert_eq!(db.table("users").unwrap().row_count(), 4);
    }

    #[test]
    fn test_insert_rejects_column_reference() {
        let mut db = users();
        assert!(matches!(
            run(&mut db, "INSERT INTO users VALUES (id, 'x', 1)"),
            Err(Error::UnsupportedExpression(_))
        ));
    }

    #[test]
    fn test_failed_multi_row_insert_appends_nothing() {
        let mut db = users();
        assert!(run(&mut db, "INSERT INTO users VALUES (7, 'ok', 1), (8, 'bad', 'x')").is_err());
        assert_eq!(db.table("users").unwrap().row_count(), 4);
    }

    #[test]
    fn test_where_keeps_only_true_rows() {
        let mut db = users();
        let result = run(&mut db, "SELECT * FROM users WHERE age >= 30").unwrap();
        assert_eq!(ids(&result), vec![1, 3]);

        // NULL age compares to NULL and is filtered out
        let result = run(&mut db, "SELECT * FROM users WHERE NOT (age = 30)").unwrap();
        assert_eq!(ids(&result), vec![2]);
    }

    #[test]
    fn test_order_by_is_stable_in_both_directions() {
        let mut db = users();
        let asc = run(&mut db, "SELECT id FROM users ORDER BY age").unwrap();
        assert_eq!(ids(&asc), vec![4, 2, 1, 3]);

        let desc = run(&mut db, "SELECT id FROM users ORDER BY age DESC").unwrap();
        assert_eq!(ids(&desc), vec![1, 3, 2, 4]);

        let top = run(&mut db, "SELECT * FROM users ORDER BY age DESC LIMIT 1").unwrap();
        assert_eq!(ids(&top), vec![1]);
    }

    #[test]
    fn test_order_by_unknown_column() {
        let mut db = users();
        assert!(matches!(
            run(&mut db, "SELECT * FROM users ORDER BY email"),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_projection_names_and_values() {
        let mut db = users();
        let result = run(
            &mut db,
            "SELECT name, age + 1 AS next_age, id * 10 FROM users WHERE id = 2",
        )
        .unwrap();

        assert_eq!(result.columns, vec!["name", "next_age", "id * 10"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Text("Bob".into()), Value::Integer(26), Value::Integer(20)]]
        );
    }

    #[test]
    fn test_qualified_column_must_match_table() {
        let mut db = users();
        let result = run(&mut db, "SELECT users.name FROM users WHERE users.id = 1").unwrap();
        assert_eq!(result.rows, vec![vec![Value::Text("Alice".into())]]);

        assert!(matches!(
            run(&mut db, "SELECT orders.name FROM users"),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_drop_missing_table_follows_config() {
        let mut db = Database::new();
        let strict = ExecutionConfig::default();
        let drop = parse_sql("DROP TABLE ghosts").unwrap();
        assert!(matches!(
            QueryExecutor::new(&mut db, &strict).execute(&drop),
            Err(Error::TableNotFound(_))
        ));

        let lenient = ExecutionConfig {
            error_on_missing_drop: false,
            ..ExecutionConfig::default()
        };
        assert!(QueryExecutor::new(&mut db, &lenient).execute(&drop).is_ok());
    }

    struct FixedBackend(Option<QueryResult>);

    impl ExecutionBackend for FixedBackend {
        fn name(&self) -> &str {
            "fixed"
        }

        fn execute(&self, _plan: &QueryPlan, _table: &Table) -> Result<Option<QueryResult>> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_backend_result_and_decline() {
        let mut db = users();
        let config = ExecutionConfig::default();
        let select = parse_sql("SELECT id FROM users").unwrap();

        let canned = QueryResult {
            columns: vec!["id".into()],
            rows: vec![vec![Value::Integer(99)]],
            rows_affected: 0,
        };
        let backend = FixedBackend(Some(canned.clone()));
        let result = QueryExecutor::new(&mut db, &config)
            .with_backend(Some(&backend))
            .execute(&select)
            .unwrap();
        assert_eq!(result, canned);

        let declining = FixedBackend(None);
        let result = QueryExecutor::new(&mut db, &config)
            .with_backend(Some(&declining))
            .execute(&select)
            .unwrap();
        assert_eq!(ids(&result), vec![1, 2, 3, 4]);
    }
}
