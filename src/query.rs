use crate::ast::{Datum, Document, SortField};
use crate::error::{QueryError, Result};
use crate::exec::{QueryNode, QueryResult, WriteOutcome, extract_field};
use crate::filter::{Combinator, Operator, WhereClause, compile};
use crate::session::Session;

/// Fluent query builder. Chain methods return the builder by value;
/// terminal methods consume it and run the query.
///
/// Argument mistakes made while chaining are remembered and surfaced as an
/// error by the terminal call, so the chain itself stays infallible.
pub struct Builder {
    session: Session,
    table: String,
    wheres: Vec<WhereClause>,
    orders: Vec<SortField>,
    columns: Option<Vec<String>>,
    offset: Option<usize>,
    limit: Option<usize>,
    group: Option<String>,
    distinct: bool,
    invalid: Option<String>,
}

impl Builder {
    pub fn new(session: Session, table: &str) -> Self {
        Self {
            session,
            table: table.to_string(),
            wheres: Vec::new(),
            orders: Vec::new(),
            columns: None,
            offset: None,
            limit: None,
            group: None,
            distinct: false,
            invalid: None,
        }
    }

    pub fn where_eq(self, column: &str, value: impl Into<Datum>) -> Self {
        self.push_basic(Combinator::And, column, Operator::Eq, value.into())
    }

    pub fn or_where_eq(self, column: &str, value: impl Into<Datum>) -> Self {
        self.push_basic(Combinator::Or, column, Operator::Eq, value.into())
    }

    /// Adds a clause with an explicit operator token such as `">="`,
    /// `"like"` or `"mod"`. Unknown tokens and malformed operands fail the
    /// query at its terminal call.
    pub fn where_op(self, column: &str, operator: &str, value: impl Into<Datum>) -> Self {
        self.push_op(Combinator::And, column, operator, value.into())
    }

    pub fn or_where_op(self, column: &str, operator: &str, value: impl Into<Datum>) -> Self {
        self.push_op(Combinator::Or, column, operator, value.into())
    }

    pub fn where_in<V: Into<Datum>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.wheres.push(WhereClause::In {
            boolean: Combinator::And,
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn where_not_in<V: Into<Datum>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.wheres.push(WhereClause::NotIn {
            boolean: Combinator::And,
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn where_null(mut self, column: &str) -> Self {
        self.wheres.push(WhereClause::Null {
            boolean: Combinator::And,
            column: column.to_string(),
        });
        self
    }

    pub fn where_not_null(mut self, column: &str) -> Self {
        self.wheres.push(WhereClause::NotNull {
            boolean: Combinator::And,
            column: column.to_string(),
        });
        self
    }

    pub fn where_between(
        mut self,
        column: &str,
        low: impl Into<Datum>,
        high: impl Into<Datum>,
    ) -> Self {
        self.wheres.push(WhereClause::Between {
            boolean: Combinator::And,
            column: column.to_string(),
            low: low.into(),
            high: high.into(),
            negated: false,
        });
        self
    }

    pub fn where_not_between(
        mut self,
        column: &str,
        low: impl Into<Datum>,
        high: impl Into<Datum>,
    ) -> Self {
        self.wheres.push(WhereClause::Between {
            boolean: Combinator::And,
            column: column.to_string(),
            low: low.into(),
            high: high.into(),
            negated: true,
        });
        self
    }

    /// Groups clauses built in the closure into one parenthesized unit.
    pub fn where_nested(self, build: impl FnOnce(Builder) -> Builder) -> Self {
        self.push_nested(Combinator::And, build)
    }

    pub fn or_where_nested(self, build: impl FnOnce(Builder) -> Builder) -> Self {
        self.push_nested(Combinator::Or, build)
    }

    /// Adds an equality clause per pair, grouped as one AND unit.
    pub fn where_map<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Datum>,
    {
        let clauses: Vec<WhereClause> = pairs
            .into_iter()
            .map(|(column, value)| WhereClause::Basic {
                boolean: Combinator::And,
                column: column.into(),
                operator: Operator::Eq,
                value: value.into(),
            })
            .collect();
        self.wheres.push(WhereClause::Nested {
            boolean: Combinator::And,
            clauses,
        });
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.orders.push(SortField::asc(column));
        self
    }

    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.orders.push(SortField::desc(column));
        self
    }

    /// Orders by a column that carries an index marker. The hint is
    /// advisory; sorting behaves the same either way.
    pub fn order_by_index(mut self, column: &str) -> Self {
        self.orders.push(SortField {
            field: column.to_string(),
            ascending: true,
            index_hint: true,
        });
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.offset = Some(count);
        self
    }

    pub fn take(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Restricts returned documents to the named columns.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(ToString::to_string).collect());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Keeps the first document per distinct value of a column.
    pub fn group_by(mut self, column: &str) -> Self {
        self.group = Some(column.to_string());
        self
    }

    // --- terminals ---

    pub async fn get(self) -> Result<Vec<Document>> {
        self.ensure_ready()?;
        let mut node = self.read_source();
        if let Some(columns) = &self.columns {
            node = QueryNode::Pluck {
                source: Box::new(node),
                fields: columns.clone(),
            };
        }
        if self.distinct {
            node = QueryNode::Distinct {
                source: Box::new(node),
                field: None,
            };
        }
        let result = self.session.run(&node).await?;
        Ok(into_documents(result))
    }

    pub async fn first(self) -> Result<Option<Document>> {
        let docs = self.take(1).get().await?;
        Ok(docs.into_iter().next())
    }

    /// Point lookup by identity, skipping any accumulated clauses.
    pub async fn find(self, id: impl Into<Datum>) -> Result<Option<Document>> {
        self.ensure_ready()?;
        let node = QueryNode::Get {
            table: self.table.clone(),
            key: id.into(),
        };
        match self.session.run(&node).await? {
            QueryResult::Atom(Datum::Object(doc)) => Ok(Some(doc)),
            _ => Ok(None),
        }
    }

    /// The named column of the first matching document.
    pub async fn value(self, column: &str) -> Result<Option<Datum>> {
        let column = column.to_string();
        let doc = self.first().await?;
        Ok(doc.and_then(|doc| extract_field(&doc, &column)))
    }

    /// Deduplicated values of one column across matching documents.
    pub async fn distinct_values(self, column: &str) -> Result<Vec<Datum>> {
        self.ensure_ready()?;
        let node = QueryNode::Distinct {
            source: Box::new(self.read_source()),
            field: Some(column.to_string()),
        };
        match self.session.run(&node).await? {
            QueryResult::Items(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn count(self) -> Result<u64> {
        self.ensure_ready()?;
        let node = QueryNode::Count {
            source: Box::new(self.read_source()),
        };
        match self.session.run(&node).await? {
            QueryResult::Atom(Datum::Integer(n)) => Ok(n.max(0) as u64),
            _ => Ok(0),
        }
    }

    pub async fn sum(self, column: &str) -> Result<Datum> {
        self.aggregate(|source| QueryNode::Sum {
            source,
            field: column.to_string(),
        })
        .await
    }

    pub async fn min(self, column: &str) -> Result<Option<Datum>> {
        let value = self
            .aggregate(|source| QueryNode::Min {
                source,
                field: column.to_string(),
            })
            .await?;
        Ok(non_null(value))
    }

    pub async fn max(self, column: &str) -> Result<Option<Datum>> {
        let value = self
            .aggregate(|source| QueryNode::Max {
                source,
                field: column.to_string(),
            })
            .await?;
        Ok(non_null(value))
    }

    pub async fn avg(self, column: &str) -> Result<Option<Datum>> {
        let value = self
            .aggregate(|source| QueryNode::Avg {
                source,
                field: column.to_string(),
            })
            .await?;
        Ok(non_null(value))
    }

    pub async fn insert(self, documents: Vec<Document>) -> Result<WriteOutcome> {
        self.ensure_ready()?;
        let node = QueryNode::Insert {
            table: self.table.clone(),
            documents,
        };
        self.run_write(node).await
    }

    /// Inserts one document and returns its identity, whether supplied or
    /// generated.
    pub async fn insert_get_id(self, document: Document) -> Result<Option<Datum>> {
        let supplied = document.get("id").cloned();
        let outcome = self.insert(vec![document]).await?;
        if outcome.errors > 0 {
            return Ok(None);
        }
        match supplied {
            Some(id) => Ok(Some(id)),
            None => Ok(outcome.generated_keys.into_iter().next()),
        }
    }

    /// Merges the patch into every matching document. A `Null` value sets
    /// the field to null rather than removing it.
    pub async fn update(self, patch: Document) -> Result<WriteOutcome> {
        self.ensure_ready()?;
        let node = QueryNode::Update {
            source: Box::new(self.read_source()),
            patch,
        };
        self.run_write(node).await
    }

    /// Appends a value to an array column. Missing or null columns are
    /// treated as empty arrays. With `unique`, a value already present is
    /// left alone.
    pub async fn push(self, column: &str, value: impl Into<Datum>, unique: bool) -> Result<WriteOutcome> {
        self.ensure_ready()?;
        let node = QueryNode::Push {
            source: Box::new(self.read_source()),
            field: column.to_string(),
            value: value.into(),
            unique,
        };
        self.run_write(node).await
    }

    /// Removes every occurrence of a value from an array column.
    pub async fn pull(self, column: &str, value: impl Into<Datum>) -> Result<WriteOutcome> {
        self.ensure_ready()?;
        let node = QueryNode::Pull {
            source: Box::new(self.read_source()),
            field: column.to_string(),
            value: value.into(),
        };
        self.run_write(node).await
    }

    /// Removes the named fields from every matching document.
    pub async fn drop_fields(self, columns: &[&str]) -> Result<WriteOutcome> {
        self.ensure_ready()?;
        let node = QueryNode::Without {
            source: Box::new(self.read_source()),
            fields: columns.iter().map(ToString::to_string).collect(),
        };
        self.run_write(node).await
    }

    /// Alias for [`Builder::drop_fields`].
    pub async fn unset(self, columns: &[&str]) -> Result<WriteOutcome> {
        self.drop_fields(columns).await
    }

    pub async fn delete(self) -> Result<WriteOutcome> {
        self.ensure_ready()?;
        let node = QueryNode::Delete {
            source: Box::new(self.read_source()),
        };
        self.run_write(node).await
    }

    pub async fn delete_by_id(self, id: impl Into<Datum>) -> Result<WriteOutcome> {
        self.where_eq("id", id).delete().await
    }

    /// Deletes every document in the table, ignoring accumulated clauses.
    pub async fn truncate(self) -> Result<WriteOutcome> {
        self.ensure_ready()?;
        let node = QueryNode::Delete {
            source: Box::new(QueryNode::Table {
                name: self.table.clone(),
            }),
        };
        self.run_write(node).await
    }

    // --- internals ---

    fn push_basic(mut self, boolean: Combinator, column: &str, operator: Operator, value: Datum) -> Self {
        self.wheres.push(WhereClause::Basic {
            boolean,
            column: column.to_string(),
            operator,
            value,
        });
        self
    }

    fn push_op(mut self, boolean: Combinator, column: &str, operator: &str, value: Datum) -> Self {
        let Some(op) = Operator::parse(operator) else {
            self.invalid
                .get_or_insert_with(|| format!("unknown operator: {operator}"));
            return self;
        };
        match op {
            Operator::Mod => {
                let ok = matches!(
                    &value,
                    Datum::Array(pair) if pair.len() == 2
                        && pair.iter().all(|v| matches!(v, Datum::Integer(_) | Datum::Decimal(_)))
                );
                if !ok {
                    self.invalid.get_or_insert_with(|| {
                        format!("mod on {column} needs a [divisor, remainder] pair")
                    });
                    return self;
                }
            }
            Operator::Size => {
                if !matches!(value, Datum::Integer(_)) {
                    self.invalid
                        .get_or_insert_with(|| format!("size on {column} needs an integer"));
                    return self;
                }
            }
            _ => {}
        }
        self.push_basic(boolean, column, op, value)
    }

    fn push_nested(mut self, boolean: Combinator, build: impl FnOnce(Builder) -> Builder) -> Self {
        let inner = build(Builder::new(self.session.clone(), &self.table));
        if let Some(reason) = inner.invalid.clone() {
            self.invalid.get_or_insert(reason);
        }
        self.wheres.push(WhereClause::Nested {
            boolean,
            clauses: inner.wheres,
        });
        self
    }

    /// The read pipeline shared by get, aggregates and document-rewriting
    /// writes: filter, group, order, skip, limit, in that order.
    fn read_source(&self) -> QueryNode {
        let mut node = QueryNode::Table {
            name: self.table.clone(),
        };
        if let Some(predicate) = compile(&self.wheres) {
            node = QueryNode::Filter {
                source: Box::new(node),
                predicate,
            };
        }
        if let Some(group) = &self.group {
            node = QueryNode::GroupFirst {
                source: Box::new(node),
                field: group.clone(),
            };
        }
        if !self.orders.is_empty() {
            node = QueryNode::OrderBy {
                source: Box::new(node),
                fields: self.orders.clone(),
            };
        }
        if let Some(count) = self.offset {
            node = QueryNode::Skip {
                source: Box::new(node),
                count,
            };
        }
        if let Some(count) = self.limit {
            node = QueryNode::Limit {
                source: Box::new(node),
                count,
            };
        }
        node
    }

    fn ensure_ready(&self) -> Result<()> {
        if let Some(reason) = &self.invalid {
            return Err(QueryError::InvalidArgument(reason.clone()));
        }
        if self.table.is_empty() {
            return Err(QueryError::IllegalState("no table selected".to_string()));
        }
        Ok(())
    }

    async fn aggregate(self, make: impl FnOnce(Box<QueryNode>) -> QueryNode) -> Result<Datum> {
        self.ensure_ready()?;
        let node = make(Box::new(self.read_source()));
        match self.session.run(&node).await? {
            QueryResult::Atom(value) => Ok(value),
            _ => Ok(Datum::Null),
        }
    }

    async fn run_write(self, node: QueryNode) -> Result<WriteOutcome> {
        match self.session.run(&node).await? {
            QueryResult::Write(outcome) => Ok(outcome),
            _ => Ok(WriteOutcome::default()),
        }
    }
}

fn into_documents(result: QueryResult) -> Vec<Document> {
    match result {
        QueryResult::Items(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Datum::Object(doc) => Some(doc),
                _ => None,
            })
            .collect(),
        QueryResult::Atom(Datum::Object(doc)) => vec![doc],
        _ => Vec::new(),
    }
}

fn non_null(value: Datum) -> Option<Datum> {
    match value {
        Datum::Null => None,
        other => Some(other),
    }
}
