// Abstract Syntax Tree for SQL
use super::types::{Column, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
}

impl Statement {
    /// Short statement label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::DropTable(_) => "DROP TABLE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub columns: Vec<SelectItem>,
    pub from: String,
    pub where_clause: Option<Expression>,
    pub order_by: Vec<String>,
    pub order: SortOrder,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`: every column of the source table, in schema order.
    Wildcard,
    Expression {
        expr: Expression,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Column {
        table: Option<String>,
        name: String,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
}

impl Expression {
    pub fn column(name: impl Into<String>) -> Self {
        Expression::Column {
            table: None,
            name: name.into(),
        }
    }

    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, expr: Expression) -> Self {
        Expression::UnaryOp {
            op,
            expr: Box::new(expr),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,

    // Comparison
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,

    // Logical
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// Explicit target columns; `None` means every column in schema order.
    pub columns: Option<Vec<String>>,
    pub values: Vec<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStatement {
    pub name: String,
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::Less => "<",
            BinaryOperator::Greater => ">",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        };
        f.write_str(symbol)
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => f.write_str("NOT "),
            UnaryOperator::Minus => f.write_str("-"),
        }
    }
}

// Renders back to SQL. Nested binary operations are parenthesized, and so
// is the operand of a minus that would itself start with `-`, since `--`
// opens a comment.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(Value::Text(s)) => {
                write!(f, "'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Column { table: Some(t), name } => write!(f, "{}.{}", t, name),
            Expression::Column { table: None, name } => write!(f, "{}", name),
            Expression::BinaryOp { left, op, right } => {
                write_operand(f, left)?;
                write!(f, " {} ", op)?;
                write_operand(f, right)
            }
            Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr,
            } if expr.starts_with_minus() => write!(f, "-({})", expr),
            Expression::UnaryOp { op, expr } => {
                write!(f, "{}", op)?;
                write_operand(f, expr)
            }
        }
    }
}

impl Expression {
    /// Height of the expression tree; a literal or column is 1.
    pub fn depth(&self) -> usize {
        match self {
            Expression::Literal(_) | Expression::Column { .. } => 1,
            Expression::BinaryOp { left, right, .. } => 1 + left.depth().max(right.depth()),
            Expression::UnaryOp { expr, .. } => 1 + expr.depth(),
        }
    }

    fn starts_with_minus(&self) -> bool {
        match self {
            Expression::UnaryOp { op, .. } => *op == UnaryOperator::Minus,
            Expression::Literal(Value::Integer(i)) => *i < 0,
            Expression::Literal(Value::Real(r)) => r.is_sign_negative(),
            _ => false,
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expression) -> fmt::Result {
    match expr {
        Expression::BinaryOp { .. } => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_display() {
        let expr = Expression::binary(
            Expression::Literal(Value::Integer(1)),
            BinaryOperator::Add,
            Expression::binary(
                Expression::column("price"),
                BinaryOperator::Multiply,
                Expression::Literal(Value::Real(2.5)),
            ),
        );
        assert_eq!(expr.to_string(), "1 + (price * 2.5)");
    }

    #[test]
    fn test_unary_and_text_display() {
        let expr = Expression::unary(
            UnaryOperator::Not,
            Expression::binary(
                Expression::Column {
                    table: Some("users".into()),
                    name: "name".into(),
                },
                BinaryOperator::Equal,
                Expression::Literal(Value::Text("O'Brien".into())),
            ),
        );
        assert_eq!(expr.to_string(), r"NOT (users.name = 'O\'Brien')");
        assert_eq!(
            Expression::unary(UnaryOperator::Minus, Expression::column("x")).to_string(),
            "-x"
        );
    }

    #[test]
    fn test_rendered_text_parses_back() {
        use crate::sql::parser::Parser;

        let reparse = |expr: &Expression| {
            Parser::new(&expr.to_string())
                .unwrap()
                .parse_expression()
                .unwrap()
        };

        let double_minus = Expression::unary(
            UnaryOperator::Minus,
            Expression::unary(UnaryOperator::Minus, Expression::column("x")),
        );
        assert_eq!(double_minus.to_string(), "-(-x)");
        assert_eq!(reparse(&double_minus), double_minus);

        let large = Expression::binary(
            Expression::Literal(Value::Real(1e20)),
            BinaryOperator::Multiply,
            Expression::Literal(Value::Real(3.0)),
        );
        assert_eq!(large.to_string(), "100000000000000000000.0 * 3.0");
        assert_eq!(reparse(&large), large);
    }
}
