// Query Planner - lowers a SELECT statement into a tree of plan nodes
use super::ast::*;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub root: PlanNode,
    /// Source table every leaf reads from.
    pub table: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    TableScan {
        table: String,
        filter: Option<Expression>,
    },
    Sort {
        input: Box<PlanNode>,
        columns: Vec<String>,
        order: SortOrder,
    },
    Limit {
        input: Box<PlanNode>,
        limit: u64,
    },
    Projection {
        input: Box<PlanNode>,
        items: Vec<SelectItem>,
    },
}

impl PlanNode {
    pub fn input(&self) -> Option<&PlanNode> {
        match self {
            PlanNode::TableScan { .. } => None,
            PlanNode::Sort { input, .. }
            | PlanNode::Limit { input, .. }
            | PlanNode::Projection { input, .. } => Some(input),
        }
    }
}

#[derive(Debug, Default)]
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        QueryPlanner
    }

    /// Scan (with filter) -> Sort -> Limit -> Projection. Sorting and the
    /// row limit run on full table rows so ORDER BY can name any column.
    pub fn plan(&self, stmt: &SelectStatement) -> QueryPlan {
        let mut plan = PlanNode::TableScan {
            table: stmt.from.clone(),
            filter: stmt.where_clause.clone(),
        };

        if !stmt.order_by.is_empty() {
            plan = PlanNode::Sort {
                input: Box::new(plan),
                columns: stmt.order_by.clone(),
                order: stmt.order,
            };
        }

        if let Some(limit) = stmt.limit {
            plan = PlanNode::Limit {
                input: Box::new(plan),
                limit,
            };
        }

        plan = PlanNode::Projection {
            input: Box::new(plan),
            items: stmt.columns.clone(),
        };

        QueryPlan {
            root: plan,
            table: stmt.from.clone(),
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanNode::TableScan { table, filter } => {
                write!(f, "TableScan {}", table)?;
                if let Some(filter) = filter {
                    write!(f, " WHERE {}", filter)?;
                }
                Ok(())
            }
            PlanNode::Sort { columns, order, .. } => {
                let direction = match order {
                    SortOrder::Ascending => "ASC",
                    SortOrder::Descending => "DESC",
                };
                write!(f, "Sort [{}] {}", columns.join(", "), direction)
            }
            PlanNode::Limit { limit, .. } => write!(f, "Limit {}", limit),
            PlanNode::Projection { items, .. } => write!(f, "Projection ({} items)", items.len()),
        }?;

        if let Some(input) = self.input() {
            write!(f, " <- {}", input)?;
        }
        Ok(())
    }
}
