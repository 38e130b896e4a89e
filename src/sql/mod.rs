// SQL Engine Module
// Lexer, parser, planner and executor for the row-store dialect

pub mod ast;
pub mod executor;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod planner;
pub mod types;

pub use ast::*;
pub use executor::{evaluate, ExecutionBackend, QueryExecutor, RowContext};
pub use lexer::{Lexer, Position, Token, TokenKind};
pub use parser::{parse_sql, Parser};
pub use planner::{PlanNode, QueryPlan, QueryPlanner};
pub use types::*;
