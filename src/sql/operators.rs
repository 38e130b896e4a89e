//! Value-level semantics of the expression operators.
//!
//! NULL propagates through arithmetic and comparison. Mixed
//! Integer/Real operands are promoted to Real. Logical operators follow
//! SQL three-valued logic.

use super::ast::{BinaryOperator, UnaryOperator};
use super::types::Value;
use crate::error::{Error, Result};
use std::cmp::Ordering;

pub fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOperator::Add => arithmetic(Arithmetic::Add, left, right),
        BinaryOperator::Subtract => arithmetic(Arithmetic::Subtract, left, right),
        BinaryOperator::Multiply => arithmetic(Arithmetic::Multiply, left, right),
        BinaryOperator::Divide => arithmetic(Arithmetic::Divide, left, right),
        BinaryOperator::Equal => comparison(left, right, Ordering::is_eq),
        BinaryOperator::NotEqual => comparison(left, right, Ordering::is_ne),
        BinaryOperator::Less => comparison(left, right, Ordering::is_lt),
        BinaryOperator::Greater => comparison(left, right, Ordering::is_gt),
        BinaryOperator::LessEqual => comparison(left, right, Ordering::is_le),
        BinaryOperator::GreaterEqual => comparison(left, right, Ordering::is_ge),
        BinaryOperator::And => and(left, right),
        BinaryOperator::Or => or(left, right),
    }
}

pub fn apply_unary(op: UnaryOperator, operand: &Value) -> Result<Value> {
    match (op, operand) {
        (_, Value::Null) => Ok(Value::Null),
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Minus, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::IntegerOverflow(format!("-({})", i))),
        (UnaryOperator::Minus, Value::Real(r)) => Ok(Value::Real(-r)),
        (op, value) => Err(Error::InvalidOperation(format!(
            "unary {:?} is not defined for {}",
            op,
            value.type_name()
        ))),
    }
}

#[derive(Debug, Clone, Copy)]
enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Arithmetic {
    fn operator(self) -> BinaryOperator {
        match self {
            Arithmetic::Add => BinaryOperator::Add,
            Arithmetic::Subtract => BinaryOperator::Subtract,
            Arithmetic::Multiply => BinaryOperator::Multiply,
            Arithmetic::Divide => BinaryOperator::Divide,
        }
    }
}

fn arithmetic(op: Arithmetic, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(op, *a, *b),
        (Value::Integer(a), Value::Real(b)) => real_arithmetic(op, *a as f64, *b),
        (Value::Real(a), Value::Integer(b)) => real_arithmetic(op, *a, *b as f64),
        (Value::Real(a), Value::Real(b)) => real_arithmetic(op, *a, *b),
        _ => Err(type_error(op.operator(), left, right)),
    }
}

fn integer_arithmetic(op: Arithmetic, a: i64, b: i64) -> Result<Value> {
    let result = match op {
        Arithmetic::Add => a.checked_add(b),
        Arithmetic::Subtract => a.checked_sub(b),
        Arithmetic::Multiply => a.checked_mul(b),
        Arithmetic::Divide => {
            if b == 0 {
                return Err(Error::DivisionByZero);
            }
            a.checked_div(b)
        }
    };
    result
        .map(Value::Integer)
        .ok_or_else(|| Error::IntegerOverflow(format!("{} {} {}", a, op.operator(), b)))
}

fn real_arithmetic(op: Arithmetic, a: f64, b: f64) -> Result<Value> {
    let result = match op {
        Arithmetic::Add => a + b,
        Arithmetic::Subtract => a - b,
        Arithmetic::Multiply => a * b,
        Arithmetic::Divide => {
            if b == 0.0 {
                return Err(Error::DivisionByZero);
            }
            a / b
        }
    };
    Ok(Value::Real(result))
}

/// Compares two non-null values. Integer and Real compare numerically;
/// other cross-variant pairs fall back to the variant rank order.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Integer(a), Value::Real(b)) => (*a as f64).partial_cmp(b),
        (Value::Real(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
        _ => Some(left.cmp(right)),
    }
}

fn comparison(left: &Value, right: &Value, holds: fn(Ordering) -> bool) -> Result<Value> {
    Ok(match compare(left, right) {
        Some(ordering) => Value::Boolean(holds(ordering)),
        None => Value::Null,
    })
}

fn logical_operand(op: BinaryOperator, value: &Value, other: &Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        _ => Err(type_error(op, value, other)),
    }
}

fn and(left: &Value, right: &Value) -> Result<Value> {
    let l = logical_operand(BinaryOperator::And, left, right)?;
    let r = logical_operand(BinaryOperator::And, right, left)?;
    Ok(match (l, r) {
        (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
        (Some(true), Some(true)) => Value::Boolean(true),
        _ => Value::Null,
    })
}

fn or(left: &Value, right: &Value) -> Result<Value> {
    let l = logical_operand(BinaryOperator::Or, left, right)?;
    let r = logical_operand(BinaryOperator::Or, right, left)?;
    Ok(match (l, r) {
        (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
        (Some(false), Some(false)) => Value::Boolean(false),
        _ => Value::Null,
    })
}

fn type_error(op: BinaryOperator, left: &Value, right: &Value) -> Error {
    Error::InvalidOperation(format!(
        "{} is not defined for {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(
            apply_binary(BinaryOperator::Add, &Value::Integer(2), &Value::Integer(3)).unwrap(),
            Value::Integer(5)
        );
        assert_eq!(
            apply_binary(BinaryOperator::Divide, &Value::Integer(7), &Value::Integer(2)).unwrap(),
            Value::Integer(3)
        );
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_real() {
        assert_eq!(
            apply_binary(BinaryOperator::Multiply, &Value::Integer(2), &Value::Real(1.5)).unwrap(),
            Value::Real(3.0)
        );
    }

    #[test]
    fn test_arithmetic_errors() {
        assert_eq!(
            apply_binary(BinaryOperator::Divide, &Value::Integer(1), &Value::Integer(0)),
            Err(Error::DivisionByZero)
        );
        assert_eq!(
            apply_binary(BinaryOperator::Divide, &Value::Real(1.0), &Value::Integer(0)),
            Err(Error::DivisionByZero)
        );
        assert!(matches!(
            apply_binary(BinaryOperator::Add, &Value::Integer(i64::MAX), &Value::Integer(1)),
            Err(Error::IntegerOverflow(_))
        ));
        assert!(matches!(
            apply_binary(BinaryOperator::Add, &Value::Text("a".into()), &Value::Integer(1)),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_error_messages_name_the_operator() {
        assert_eq!(
            apply_binary(BinaryOperator::Subtract, &Value::Text("a".into()), &Value::Real(1.0)),
            Err(Error::InvalidOperation("- is not defined for TEXT and REAL".into()))
        );
        assert_eq!(
            apply_binary(BinaryOperator::Multiply, &Value::Integer(i64::MAX), &Value::Integer(2)),
            Err(Error::IntegerOverflow(format!("{} * 2", i64::MAX)))
        );
        assert_eq!(
            apply_binary(BinaryOperator::Subtract, &Value::Real(0.5), &Value::Integer(2)).unwrap(),
            Value::Real(-1.5)
        );
    }

    #[test]
    fn test_null_propagation() {
        assert_eq!(
            apply_binary(BinaryOperator::Add, &Value::Null, &Value::Integer(1)).unwrap(),
            Value::Null
        );
        assert_eq!(
            apply_binary(BinaryOperator::Equal, &Value::Null, &Value::Null).unwrap(),
            Value::Null
        );
        assert_eq!(apply_unary(UnaryOperator::Not, &Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_comparisons() {
        let cmp = |op, l: Value, r: Value| apply_binary(op, &l, &r).unwrap();

        assert_eq!(
            cmp(BinaryOperator::Equal, Value::Integer(1), Value::Real(1.0)),
            Value::Boolean(true)
        );
        assert_eq!(
            cmp(BinaryOperator::Less, Value::Text("a".into()), Value::Text("b".into())),
            Value::Boolean(true)
        );
        assert_eq!(
            cmp(BinaryOperator::GreaterEqual, Value::Integer(3), Value::Integer(3)),
            Value::Boolean(true)
        );
        assert_eq!(
            cmp(BinaryOperator::NotEqual, Value::Text("1".into()), Value::Integer(1)),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_three_valued_logic() {
        let t = Value::Boolean(true);
        let f = Value::Boolean(false);
        let n = Value::Null;

        assert_eq!(apply_binary(BinaryOperator::And, &n, &f).unwrap(), f);
        assert_eq!(apply_binary(BinaryOperator::And, &n, &t).unwrap(), n);
        assert_eq!(apply_binary(BinaryOperator::Or, &n, &t).unwrap(), t);
        assert_eq!(apply_binary(BinaryOperator::Or, &f, &f).unwrap(), f);
        assert!(apply_binary(BinaryOperator::And, &t, &Value::Integer(1)).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            apply_unary(UnaryOperator::Minus, &Value::Integer(5)).unwrap(),
            Value::Integer(-5)
        );
        assert_eq!(
            apply_unary(UnaryOperator::Not, &Value::Boolean(true)).unwrap(),
            Value::Boolean(false)
        );
        assert!(apply_unary(UnaryOperator::Minus, &Value::Text("x".into())).is_err());
        assert!(apply_unary(UnaryOperator::Minus, &Value::Integer(i64::MIN)).is_err());
    }
}
