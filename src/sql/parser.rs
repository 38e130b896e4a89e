// SQL Parser: recursive descent for statements, precedence climbing for
// expressions.
use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use super::types::{Column, DataType, Value};
use crate::error::{Error, Result};
use tracing::debug;

/// Deepest expression nesting accepted, counting parentheses, unary
/// operators and binary operator chains. Evaluation and rendering recurse
/// over the tree, so this also bounds their stack use.
pub const MAX_EXPRESSION_DEPTH: usize = 128;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    /// Tokenizes `sql` in strict mode and prepares a parser over it.
    pub fn new(sql: &str) -> Result<Self> {
        let tokens = Lexer::new(sql).tokenize()?;
        Ok(Self::from_tokens(tokens))
    }

    /// Builds a parser over an already scanned token sequence. An end
    /// marker is appended when missing.
    pub fn from_tokens(mut tokens: Vec<Token>) -> Self {
        if !tokens.last().is_some_and(Token::is_eof) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                text: String::new(),
                position,
            });
        }
        Parser {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn current_token(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.position.min(last)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current_token().kind
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn consume_if(&mut self, kind: &TokenKind) -> bool {
        if self.current_kind() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, expected: impl Into<String>) -> Error {
        let token = self.current_token();
        Error::Syntax {
            expected: expected.into(),
            found: token.to_string(),
            token_index: self.position,
            position: token.position,
        }
    }

    fn depth_error(&self) -> Error {
        self.error(format!("nesting depth <= {}", MAX_EXPRESSION_DEPTH))
    }

    /// Runs one nested parse step, failing once the nesting limit is reached.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_EXPRESSION_DEPTH {
            return Err(self.depth_error());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn bounded(&self, expr: Expression) -> Result<Expression> {
        if expr.depth() > MAX_EXPRESSION_DEPTH {
            return Err(self.depth_error());
        }
        Ok(expr)
    }

    fn expect(&mut self, expected: TokenKind) -> Result<()> {
        if self.current_kind() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(expected.to_string()))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String> {
        if let TokenKind::Identifier(name) = self.current_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(what))
        }
    }

    /// Parses exactly one statement, optionally terminated by `;`.
    pub fn parse(&mut self) -> Result<Statement> {
        let statement = match self.current_kind() {
            TokenKind::Select => self.parse_select()?,
            TokenKind::Insert => self.parse_insert()?,
            TokenKind::Create => self.parse_create()?,
            TokenKind::Drop => self.parse_drop()?,
            _ => return Err(self.error("SELECT, INSERT, CREATE or DROP")),
        };

        self.consume_if(&TokenKind::Semicolon);
        if !self.current_token().is_eof() {
            return Err(self.error("end of input"));
        }

        debug!(statement = statement.kind(), "Parsed statement");
        Ok(statement)
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Select)?;

        let columns = self.parse_select_items()?;

        self.expect(TokenKind::From)?;
        let from = self.expect_identifier("table name")?;

        let where_clause = if self.consume_if(&TokenKind::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        let mut order = SortOrder::Ascending;
        if self.consume_if(&TokenKind::Order) {
            self.expect(TokenKind::By)?;
            loop {
                order_by.push(self.expect_identifier("column name in ORDER BY")?);
                if !self.consume_if(&TokenKind::Comma) {
                    break;
                }
            }
            if self.consume_if(&TokenKind::Desc) {
                order = SortOrder::Descending;
            } else {
                self.consume_if(&TokenKind::Asc);
            }
        }

        let limit = if self.consume_if(&TokenKind::Limit) {
            let n = match self.current_kind() {
                TokenKind::IntegerLiteral(n) => *n,
                _ => return Err(self.error("integer after LIMIT")),
            };
            self.advance();
            Some(n as u64)
        } else {
            None
        };

        Ok(Statement::Select(SelectStatement {
            columns,
            from,
            where_clause,
            order_by,
            order,
            limit,
        }))
    }

    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>> {
        let mut items = Vec::new();

        loop {
            if self.consume_if(&TokenKind::Star) {
                items.push(SelectItem::Wildcard);
            } else {
                let expr = self.parse_expression()?;
                let alias = if self.consume_if(&TokenKind::As) {
                    Some(self.expect_identifier("alias after AS")?)
                } else {
                    None
                };
                items.push(SelectItem::Expression { expr, alias });
            }

            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }

        Ok(items)
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Insert)?;
        self.expect(TokenKind::Into)?;
        let table = self.expect_identifier("table name")?;

        let columns = if self.consume_if(&TokenKind::LeftParen) {
            let mut names = Vec::new();
            loop {
                names.push(self.expect_identifier("column name")?);
                if !self.consume_if(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RightParen)?;
            Some(names)
        } else {
            None
        };

        self.expect(TokenKind::Values)?;

        let mut values = Vec::new();
        loop {
            self.expect(TokenKind::LeftParen)?;
            values.push(self.parse_expression_list()?);
            self.expect(TokenKind::RightParen)?;
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            values,
        }))
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Create)?;
        self.expect(TokenKind::Table)?;
        let name = self.expect_identifier("table name")?;

        self.expect(TokenKind::LeftParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_definition()?);
            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightParen)?;

        Ok(Statement::CreateTable(CreateTableStatement { name, columns }))
    }

    fn parse_column_definition(&mut self) -> Result<Column> {
        let name = self.expect_identifier("column name")?;
        let data_type = self.parse_data_type()?;
        let mut column = Column::new(name, data_type);

        // Constraint words: NOT NULL and PRIMARY KEY are understood, any
        // other bare identifier is skipped.
        loop {
            match self.current_kind().clone() {
                TokenKind::Not => {
                    self.advance();
                    self.expect(TokenKind::Null)?;
                    column.nullable = false;
                }
                TokenKind::Identifier(word) => {
                    self.advance();
                    if word.eq_ignore_ascii_case("PRIMARY") {
                        let is_key = matches!(
                            self.current_kind(),
                            TokenKind::Identifier(key) if key.eq_ignore_ascii_case("KEY")
                        );
                        if !is_key {
                            return Err(self.error("KEY after PRIMARY"));
                        }
                        self.advance();
                        column.primary_key = true;
                    } else {
                        debug!(column = %column.name, constraint = %word, "Ignoring column constraint");
                    }
                }
                _ => break,
            }
        }

        Ok(column)
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current_kind() {
            TokenKind::Integer => DataType::Integer,
            TokenKind::Real => DataType::Real,
            TokenKind::Text => DataType::Text,
            TokenKind::Boolean => DataType::Boolean,
            _ => return Err(self.error("data type (INTEGER, REAL, TEXT or BOOLEAN)")),
        };
        self.advance();
        Ok(data_type)
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Drop)?;
        self.expect(TokenKind::Table)?;
        let name = self.expect_identifier("table name")?;
        Ok(Statement::DropTable(DropTableStatement { name }))
    }

    pub fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or_expression()
    }

    fn parse_or_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_and_expression()?;

        while self.consume_if(&TokenKind::Or) {
            let right = self.parse_and_expression()?;
            left = self.bounded(Expression::binary(left, BinaryOperator::Or, right))?;
        }

        Ok(left)
    }

    fn parse_and_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_equality_expression()?;

        while self.consume_if(&TokenKind::And) {
            let right = self.parse_equality_expression()?;
            left = self.bounded(Expression::binary(left, BinaryOperator::And, right))?;
        }

        Ok(left)
    }

    fn parse_equality_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_comparison_expression()?;

        loop {
            let op = match self.current_kind() {
                TokenKind::Equal => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };

            self.advance();
            let right = self.parse_comparison_expression()?;
            left = self.bounded(Expression::binary(left, op, right))?;
        }

        Ok(left)
    }

    fn parse_comparison_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_additive_expression()?;

        loop {
            let op = match self.current_kind() {
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.advance();
            let right = self.parse_additive_expression()?;
            left = self.bounded(Expression::binary(left, op, right))?;
        }

        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative_expression()?;

        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative_expression()?;
            left = self.bounded(Expression::binary(left, op, right))?;
        }

        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary_expression()?;

        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary_expression()?;
            left = self.bounded(Expression::binary(left, op, right))?;
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> Result<Expression> {
        let op = match self.current_kind() {
            TokenKind::Not => UnaryOperator::Not,
            TokenKind::Minus => UnaryOperator::Minus,
            _ => return self.parse_primary_expression(),
        };

        self.advance();
        let expr = self.nested(Self::parse_unary_expression)?;
        self.bounded(Expression::unary(op, expr))
    }

    fn parse_primary_expression(&mut self) -> Result<Expression> {
        let literal = match self.current_kind().clone() {
            TokenKind::True => Value::Boolean(true),
            TokenKind::False => Value::Boolean(false),
            TokenKind::Null => Value::Null,
            TokenKind::IntegerLiteral(n) => Value::Integer(n),
            TokenKind::RealLiteral(f) => Value::Real(f),
            TokenKind::StringLiteral(s) => Value::Text(s),
            TokenKind::Identifier(name) => {
                self.advance();
                if self.consume_if(&TokenKind::Dot) {
                    let column = self.expect_identifier("column name after '.'")?;
                    return Ok(Expression::Column {
                        table: Some(name),
                        name: column,
                    });
                }
                return Ok(Expression::column(name));
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.nested(Self::parse_expression)?;
                self.expect(TokenKind::RightParen)?;
                return Ok(expr);
            }
            _ => return Err(self.error("expression")),
        };

        self.advance();
        Ok(Expression::Literal(literal))
    }

    fn parse_expression_list(&mut self) -> Result<Vec<Expression>> {
        let mut exprs = Vec::new();

        loop {
            exprs.push(self.parse_expression()?);

            if !self.consume_if(&TokenKind::Comma) {
                break;
            }
        }

        Ok(exprs)
    }
}

/// Tokenizes and parses a single statement in strict mode.
pub fn parse_sql(sql: &str) -> Result<Statement> {
    Parser::new(sql)?.parse()
}
