use crate::ast::{BinOp, Datum, Document, Expr, SortField, UnOp};
use crate::storage::{Result as StorageResult, StorageBackend};
use futures_util::StreamExt;
use regex::RegexBuilder;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// One node of an executable query tree. Read nodes wrap their source;
/// write nodes consume the documents their source produces.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    Table {
        name: String,
    },
    Get {
        table: String,
        key: Datum,
    },
    Filter {
        source: Box<QueryNode>,
        predicate: Expr,
    },
    OrderBy {
        source: Box<QueryNode>,
        fields: Vec<SortField>,
    },
    Skip {
        source: Box<QueryNode>,
        count: usize,
    },
    Limit {
        source: Box<QueryNode>,
        count: usize,
    },
    /// Keeps the first document seen for each distinct value of a field.
    GroupFirst {
        source: Box<QueryNode>,
        field: String,
    },
    Pluck {
        source: Box<QueryNode>,
        fields: Vec<String>,
    },
    /// With a field, yields that field's deduplicated values; without one,
    /// deduplicates whole documents.
    Distinct {
        source: Box<QueryNode>,
        field: Option<String>,
    },
    Count {
        source: Box<QueryNode>,
    },
    Sum {
        source: Box<QueryNode>,
        field: String,
    },
    Min {
        source: Box<QueryNode>,
        field: String,
    },
    Max {
        source: Box<QueryNode>,
        field: String,
    },
    Avg {
        source: Box<QueryNode>,
        field: String,
    },
    Insert {
        table: String,
        documents: Vec<Document>,
    },
    Update {
        source: Box<QueryNode>,
        patch: Document,
    },
    Push {
        source: Box<QueryNode>,
        field: String,
        value: Datum,
        unique: bool,
    },
    Pull {
        source: Box<QueryNode>,
        field: String,
        value: Datum,
    },
    /// Removes fields from every source document and persists the result.
    Without {
        source: Box<QueryNode>,
        fields: Vec<String>,
    },
    Delete {
        source: Box<QueryNode>,
    },
}

impl std::fmt::Display for QueryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table { name } => write!(f, "table({name})"),
            Self::Get { table, key } => write!(f, "get(table({table}), {key})"),
            Self::Filter { source, predicate } => write!(f, "filter({source}, {predicate})"),
            Self::OrderBy { source, fields } => {
                let order = fields
                    .iter()
                    .map(|s| format!("{s}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "order_by({source}, {order})")
            }
            Self::Skip { source, count } => write!(f, "skip({source}, {count})"),
            Self::Limit { source, count } => write!(f, "limit({source}, {count})"),
            Self::GroupFirst { source, field } => write!(f, "group_first({source}, {field})"),
            Self::Pluck { source, fields } => {
                write!(f, "pluck({source}, [{}])", fields.join(", "))
            }
            Self::Distinct { source, field } => match field {
                Some(field) => write!(f, "distinct({source}, {field})"),
                None => write!(f, "distinct({source})"),
            },
            Self::Count { source } => write!(f, "count({source})"),
            Self::Sum { source, field } => write!(f, "sum({source}, {field})"),
            Self::Min { source, field } => write!(f, "min({source}, {field})"),
            Self::Max { source, field } => write!(f, "max({source}, {field})"),
            Self::Avg { source, field } => write!(f, "avg({source}, {field})"),
            Self::Insert { table, documents } => {
                write!(f, "insert(table({table}), {} docs)", documents.len())
            }
            Self::Update { source, .. } => write!(f, "update({source})"),
            Self::Push { source, field, .. } => write!(f, "push({source}, {field})"),
            Self::Pull { source, field, .. } => write!(f, "pull({source}, {field})"),
            Self::Without { source, fields } => {
                write!(f, "without({source}, [{}])", fields.join(", "))
            }
            Self::Delete { source } => write!(f, "delete({source})"),
        }
    }
}

/// Summary of a write operation, returned as data rather than raised.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct WriteOutcome {
    pub inserted: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub errors: usize,
    pub generated_keys: Vec<Datum>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Items(Vec<Datum>),
    Atom(Datum),
    Write(WriteOutcome),
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ExecStats {
    pub rows_read: usize,
    pub rows_written: usize,
    pub rows_deleted: usize,
    pub error_count: usize,
    pub duration_ms: u128,
}

pub struct Executor {
    storage: Arc<dyn StorageBackend>,
    pub stats: ExecStats,
}

impl Executor {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            stats: ExecStats::default(),
        }
    }

    pub async fn run(&mut self, node: &QueryNode) -> StorageResult<QueryResult> {
        let start = Instant::now();
        let result = self.evaluate(node).await?;
        self.stats.duration_ms = start.elapsed().as_millis();
        Ok(result)
    }

    fn evaluate<'b>(
        &'b mut self,
        node: &'b QueryNode,
    ) -> Pin<Box<dyn Future<Output = StorageResult<QueryResult>> + Send + 'b>> {
        Box::pin(async move {
            match node {
                QueryNode::Get { table, key } => {
                    let datum = match key.as_key() {
                        Some(key) => match self.storage.get(table, &key).await? {
                            Some(doc) => {
                                self.stats.rows_read += 1;
                                Datum::Object(doc)
                            }
                            None => Datum::Null,
                        },
                        None => Datum::Null,
                    };
                    Ok(QueryResult::Atom(datum))
                }
                QueryNode::Distinct { source, field } => {
                    let docs = self.eval_sequence(source).await?;
                    let items = match field {
                        Some(field) => dedup(
                            docs.iter()
                                .map(|doc| extract_field(doc, field).unwrap_or(Datum::Null))
                                .filter(|v| !matches!(v, Datum::Null))
                                .collect(),
                        ),
                        None => dedup(docs.into_iter().map(Datum::Object).collect()),
                    };
                    Ok(QueryResult::Items(items))
                }
                QueryNode::Count { source } => {
                    let docs = self.eval_sequence(source).await?;
                    Ok(QueryResult::Atom(Datum::Integer(docs.len() as i64)))
                }
                QueryNode::Sum { source, field } => {
                    let docs = self.eval_sequence(source).await?;
                    let mut total = Datum::Integer(0);
                    for doc in &docs {
                        if let Some(value) = numeric_field(doc, field) {
                            total = add_numeric(&total, &value);
                        }
                    }
                    Ok(QueryResult::Atom(total))
                }
                QueryNode::Min { source, field } => {
                    let docs = self.eval_sequence(source).await?;
                    Ok(QueryResult::Atom(fold_extreme(&docs, field, Ordering::Less)))
                }
                QueryNode::Max { source, field } => {
                    let docs = self.eval_sequence(source).await?;
                    Ok(QueryResult::Atom(fold_extreme(
                        &docs,
                        field,
                        Ordering::Greater,
                    )))
                }
                QueryNode::Avg { source, field } => {
                    let docs = self.eval_sequence(source).await?;
                    let mut total = Decimal::ZERO;
                    let mut count = 0i64;
                    for doc in &docs {
                        if let Some(value) = numeric_field(doc, field) {
                            total += as_decimal(&value);
                            count += 1;
                        }
                    }
                    let datum = if count == 0 {
                        Datum::Null
                    } else {
                        Datum::Decimal(total / Decimal::from(count))
                    };
                    Ok(QueryResult::Atom(datum))
                }
                QueryNode::Insert { table, documents } => {
                    let outcome = self.eval_insert(table, documents).await?;
                    Ok(QueryResult::Write(outcome))
                }
                QueryNode::Update { source, patch } => {
                    let outcome = self
                        .eval_rewrite(source, |doc| {
                            for (key, value) in patch {
                                doc.insert(key.clone(), value.clone());
                            }
                        })
                        .await?;
                    Ok(QueryResult::Write(outcome))
                }
                QueryNode::Push {
                    source,
                    field,
                    value,
                    unique,
                } => {
                    let outcome = self
                        .eval_rewrite(source, |doc| {
                            let mut items = match doc.get(field) {
                                Some(Datum::Array(items)) => items.clone(),
                                _ => Vec::new(),
                            };
                            if *unique && items.iter().any(|v| datums_equal(v, value)) {
                                return;
                            }
                            items.push(value.clone());
                            doc.insert(field.clone(), Datum::Array(items));
                        })
                        .await?;
                    Ok(QueryResult::Write(outcome))
                }
                QueryNode::Pull {
                    source,
                    field,
                    value,
                } => {
                    let outcome = self
                        .eval_rewrite(source, |doc| {
                            if let Some(Datum::Array(items)) = doc.get(field) {
                                let kept: Vec<Datum> = items
                                    .iter()
                                    .filter(|v| !datums_equal(v, value))
                                    .cloned()
                                    .collect();
                                doc.insert(field.clone(), Datum::Array(kept));
                            }
                        })
                        .await?;
                    Ok(QueryResult::Write(outcome))
                }
                QueryNode::Without { source, fields } => {
                    let outcome = self
                        .eval_rewrite(source, |doc| {
                            for field in fields {
                                doc.remove(field);
                            }
                        })
                        .await?;
                    Ok(QueryResult::Write(outcome))
                }
                QueryNode::Delete { source } => {
                    let table = extract_table(source).to_string();
                    let docs = self.eval_sequence(source).await?;
                    let mut outcome = WriteOutcome::default();
                    for doc in docs {
                        match doc.get("id").and_then(Datum::as_key) {
                            Some(key) => {
                                if self.storage.delete(&table, &key).await.is_ok() {
                                    outcome.deleted += 1;
                                    self.stats.rows_deleted += 1;
                                } else {
                                    outcome.errors += 1;
                                    self.stats.error_count += 1;
                                }
                            }
                            None => {
                                outcome.errors += 1;
                                self.stats.error_count += 1;
                            }
                        }
                    }
                    Ok(QueryResult::Write(outcome))
                }
                _ => {
                    let docs = self.eval_sequence(node).await?;
                    Ok(QueryResult::Items(
                        docs.into_iter().map(Datum::Object).collect(),
                    ))
                }
            }
        })
    }

    /// Evaluates a document-producing node into an in-memory sequence.
    fn eval_sequence<'b>(
        &'b mut self,
        node: &'b QueryNode,
    ) -> Pin<Box<dyn Future<Output = StorageResult<Vec<Document>>> + Send + 'b>> {
        Box::pin(async move {
            match node {
                QueryNode::Table { name } => {
                    let mut stream = self.storage.scan_table(name).await?;
                    let mut docs = Vec::new();
                    while let Some(row) = stream.next().await {
                        match row {
                            Ok(doc) => {
                                self.stats.rows_read += 1;
                                docs.push(doc);
                            }
                            Err(e) => {
                                self.stats.error_count += 1;
                                return Err(e);
                            }
                        }
                    }
                    Ok(docs)
                }
                QueryNode::Get { table, key } => {
                    let Some(key) = key.as_key() else {
                        return Ok(Vec::new());
                    };
                    match self.storage.get(table, &key).await? {
                        Some(doc) => {
                            self.stats.rows_read += 1;
                            Ok(vec![doc])
                        }
                        None => Ok(Vec::new()),
                    }
                }
                QueryNode::Filter { source, predicate } => {
                    let docs = self.eval_sequence(source).await?;
                    Ok(docs
                        .into_iter()
                        .filter(|doc| eval_expr(predicate, doc).is_truthy())
                        .collect())
                }
                QueryNode::OrderBy { source, fields } => {
                    let mut docs = self.eval_sequence(source).await?;
                    docs.sort_by(|a, b| {
                        for sort in fields {
                            let left = extract_field(a, &sort.field).unwrap_or(Datum::Null);
                            let right = extract_field(b, &sort.field).unwrap_or(Datum::Null);
                            let ord = sort_cmp(&left, &right);
                            if ord != Ordering::Equal {
                                return if sort.ascending { ord } else { ord.reverse() };
                            }
                        }
                        Ordering::Equal
                    });
                    Ok(docs)
                }
                QueryNode::Skip { source, count } => {
                    let docs = self.eval_sequence(source).await?;
                    Ok(docs.into_iter().skip(*count).collect())
                }
                QueryNode::Limit { source, count } => {
                    let docs = self.eval_sequence(source).await?;
                    Ok(docs.into_iter().take(*count).collect())
                }
                QueryNode::GroupFirst { source, field } => {
                    let docs = self.eval_sequence(source).await?;
                    let mut seen: Vec<Datum> = Vec::new();
                    let mut kept = Vec::new();
                    for doc in docs {
                        let value = extract_field(&doc, field).unwrap_or(Datum::Null);
                        if seen.iter().any(|v| datums_equal(v, &value)) {
                            continue;
                        }
                        seen.push(value);
                        kept.push(doc);
                    }
                    Ok(kept)
                }
                QueryNode::Pluck { source, fields } => {
                    let docs = self.eval_sequence(source).await?;
                    Ok(docs
                        .into_iter()
                        .map(|doc| {
                            fields
                                .iter()
                                .filter_map(|f| doc.get(f).map(|v| (f.clone(), v.clone())))
                                .collect()
                        })
                        .collect())
                }
                _ => Ok(Vec::new()),
            }
        })
    }

    async fn eval_insert(
        &mut self,
        table: &str,
        documents: &[Document],
    ) -> StorageResult<WriteOutcome> {
        let mut outcome = WriteOutcome::default();
        let mut batch = Vec::new();

        for doc in documents {
            let mut doc = doc.clone();
            let key = match doc.get("id") {
                Some(id) => match id.as_key() {
                    Some(key) => {
                        // A supplied id must not clobber an existing document.
                        let duplicate = batch.iter().any(|(k, _)| *k == key)
                            || self.storage.get(table, &key).await?.is_some();
                        if duplicate {
                            outcome.errors += 1;
                            self.stats.error_count += 1;
                            continue;
                        }
                        key
                    }
                    None => {
                        outcome.errors += 1;
                        self.stats.error_count += 1;
                        continue;
                    }
                },
                None => {
                    let id = Uuid::new_v4().to_string();
                    doc.insert("id".to_string(), Datum::String(id.clone()));
                    outcome.generated_keys.push(Datum::String(id.clone()));
                    id
                }
            };
            batch.push((key, doc));
        }

        if batch.len() > 1 {
            match self.storage.put_batch(table, &batch).await {
                Ok(()) => {
                    outcome.inserted += batch.len();
                    self.stats.rows_written += batch.len();
                }
                Err(_) => {
                    outcome.errors += batch.len();
                    self.stats.error_count += batch.len();
                }
            }
        } else if let Some((key, doc)) = batch.into_iter().next() {
            match self.storage.put(table, &key, &doc).await {
                Ok(()) => {
                    outcome.inserted += 1;
                    self.stats.rows_written += 1;
                }
                Err(_) => {
                    outcome.errors += 1;
                    self.stats.error_count += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Runs a transform over every source document and persists the ones it
    /// actually changed.
    async fn eval_rewrite<F>(&mut self, source: &QueryNode, transform: F) -> StorageResult<WriteOutcome>
    where
        F: Fn(&mut Document),
    {
        let table = extract_table(source).to_string();
        let docs = self.eval_sequence(source).await?;
        let mut outcome = WriteOutcome::default();

        for doc in docs {
            let mut updated = doc.clone();
            transform(&mut updated);
            if updated == doc {
                continue;
            }
            let Some(key) = updated.get("id").and_then(Datum::as_key) else {
                outcome.errors += 1;
                self.stats.error_count += 1;
                continue;
            };
            match self.storage.put(&table, &key, &updated).await {
                Ok(()) => {
                    outcome.replaced += 1;
                    self.stats.rows_written += 1;
                }
                Err(_) => {
                    outcome.errors += 1;
                    self.stats.error_count += 1;
                }
            }
        }

        Ok(outcome)
    }
}

/// The table a read chain scans. Write nodes use this to know where their
/// documents live.
pub fn extract_table(node: &QueryNode) -> &str {
    match node {
        QueryNode::Table { name } => name,
        QueryNode::Get { table, .. } => table,
        QueryNode::Insert { table, .. } => table,
        QueryNode::Filter { source, .. }
        | QueryNode::OrderBy { source, .. }
        | QueryNode::Skip { source, .. }
        | QueryNode::Limit { source, .. }
        | QueryNode::GroupFirst { source, .. }
        | QueryNode::Pluck { source, .. }
        | QueryNode::Distinct { source, .. }
        | QueryNode::Count { source }
        | QueryNode::Sum { source, .. }
        | QueryNode::Min { source, .. }
        | QueryNode::Max { source, .. }
        | QueryNode::Avg { source, .. }
        | QueryNode::Update { source, .. }
        | QueryNode::Push { source, .. }
        | QueryNode::Pull { source, .. }
        | QueryNode::Without { source, .. }
        | QueryNode::Delete { source } => extract_table(source),
    }
}

/// Evaluates a predicate expression against one document. Type mismatches
/// yield `Null`, which is falsy, so they silently fail the filter.
pub fn eval_expr(expr: &Expr, doc: &Document) -> Datum {
    match expr {
        Expr::Literal(d) => d.clone(),
        Expr::Field { path } => extract_path(doc, path).unwrap_or(Datum::Null),
        Expr::Binary { op, left, right } => {
            let left = eval_expr(left, doc);
            let right = eval_expr(right, doc);
            eval_binary(*op, &left, &right)
        }
        Expr::Unary { op: UnOp::Not, expr } => Datum::Bool(!eval_expr(expr, doc).is_truthy()),
        Expr::Match {
            value,
            pattern,
            case_insensitive,
        } => {
            let Datum::String(text) = eval_expr(value, doc) else {
                return Datum::Bool(false);
            };
            match RegexBuilder::new(pattern)
                .case_insensitive(*case_insensitive)
                .build()
            {
                Ok(re) => Datum::Bool(re.is_match(&text)),
                Err(e) => {
                    log::debug!("invalid match pattern {pattern:?}: {e}");
                    Datum::Bool(false)
                }
            }
        }
        Expr::HasField(name) => {
            let path: Vec<String> = name.split('.').map(str::to_string).collect();
            let present = !matches!(extract_path(doc, &path), None | Some(Datum::Null));
            Datum::Bool(present)
        }
        Expr::TypeOf(inner) => Datum::String(eval_expr(inner, doc).type_name().to_string()),
        Expr::Count(inner) => match eval_expr(inner, doc) {
            Datum::Array(items) => Datum::Integer(items.len() as i64),
            _ => Datum::Null,
        },
    }
}

fn eval_binary(op: BinOp, left: &Datum, right: &Datum) -> Datum {
    match op {
        BinOp::Eq => Datum::Bool(datums_equal(left, right)),
        BinOp::Ne => Datum::Bool(!datums_equal(left, right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => match compare(left, right) {
            Some(ord) => Datum::Bool(match op {
                BinOp::Lt => ord == Ordering::Less,
                BinOp::Le => ord != Ordering::Greater,
                BinOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
            None => Datum::Null,
        },
        BinOp::And => Datum::Bool(left.is_truthy() && right.is_truthy()),
        BinOp::Or => Datum::Bool(left.is_truthy() || right.is_truthy()),
        BinOp::Contains => match left {
            Datum::Array(items) => Datum::Bool(items.iter().any(|v| datums_equal(v, right))),
            Datum::String(text) => match right {
                Datum::String(needle) => Datum::Bool(text.contains(needle.as_str())),
                _ => Datum::Null,
            },
            _ => Datum::Null,
        },
        BinOp::Mod => match (as_numeric(left), as_numeric(right)) {
            (Some(a), Some(b)) if !b.is_zero() => Datum::Decimal(a % b),
            _ => Datum::Null,
        },
    }
}

/// Structural equality with integers and decimals comparing by value.
pub fn datums_equal(a: &Datum, b: &Datum) -> bool {
    match (a, b) {
        (Datum::Integer(x), Datum::Decimal(y)) | (Datum::Decimal(y), Datum::Integer(x)) => {
            Decimal::from(*x) == *y
        }
        (Datum::Array(xs), Datum::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| datums_equal(x, y))
        }
        (Datum::Object(xs), Datum::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|((xk, xv), (yk, yv))| xk == yk && datums_equal(xv, yv))
        }
        _ => a == b,
    }
}

/// Comparison between two values of the same kind; `None` when the kinds
/// are not mutually ordered.
pub fn compare(a: &Datum, b: &Datum) -> Option<Ordering> {
    match (a, b) {
        (Datum::Integer(x), Datum::Integer(y)) => Some(x.cmp(y)),
        (Datum::Decimal(x), Datum::Decimal(y)) => Some(x.cmp(y)),
        (Datum::Integer(x), Datum::Decimal(y)) => Some(Decimal::from(*x).cmp(y)),
        (Datum::Decimal(x), Datum::Integer(y)) => Some(x.cmp(&Decimal::from(*y))),
        (Datum::String(x), Datum::String(y)) => Some(x.cmp(y)),
        (Datum::Bool(x), Datum::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order used by sorting: values order within their kind, kinds order
/// as null, bool, number, string, array, object.
pub fn sort_cmp(a: &Datum, b: &Datum) -> Ordering {
    if let Some(ord) = compare(a, b) {
        return ord;
    }
    match (a, b) {
        (Datum::Null, Datum::Null) => Ordering::Equal,
        (Datum::Array(xs), Datum::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                let ord = sort_cmp(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Datum::Object(xs), Datum::Object(ys)) => xs.len().cmp(&ys.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(d: &Datum) -> u8 {
    match d {
        Datum::Null => 0,
        Datum::Bool(_) => 1,
        Datum::Integer(_) | Datum::Decimal(_) => 2,
        Datum::String(_) => 3,
        Datum::Array(_) => 4,
        Datum::Object(_) => 5,
    }
}

/// Walks a dotted path through nested objects.
pub fn extract_field(doc: &Document, path: &str) -> Option<Datum> {
    let parts: Vec<String> = path.split('.').map(str::to_string).collect();
    extract_path(doc, &parts)
}

fn extract_path(doc: &Document, parts: &[String]) -> Option<Datum> {
    let mut current = doc;
    for (i, part) in parts.iter().enumerate() {
        match current.get(part) {
            Some(Datum::Object(obj)) if i < parts.len() - 1 => current = obj,
            Some(datum) if i == parts.len() - 1 => return Some(datum.clone()),
            _ => return None,
        }
    }
    None
}

fn numeric_field(doc: &Document, field: &str) -> Option<Datum> {
    match extract_field(doc, field) {
        Some(d @ (Datum::Integer(_) | Datum::Decimal(_))) => Some(d),
        _ => None,
    }
}

fn as_decimal(d: &Datum) -> Decimal {
    match d {
        Datum::Integer(i) => Decimal::from(*i),
        Datum::Decimal(v) => *v,
        _ => Decimal::ZERO,
    }
}

fn as_numeric(d: &Datum) -> Option<Decimal> {
    match d {
        Datum::Integer(i) => Some(Decimal::from(*i)),
        Datum::Decimal(v) => Some(*v),
        _ => None,
    }
}

/// Adds two numbers, staying integral when both sides are integers and
/// the sum fits; otherwise widens to decimal.
fn add_numeric(a: &Datum, b: &Datum) -> Datum {
    match (a, b) {
        (Datum::Integer(x), Datum::Integer(y)) => match x.checked_add(*y) {
            Some(sum) => Datum::Integer(sum),
            None => Datum::Decimal(as_decimal(a) + as_decimal(b)),
        },
        _ => Datum::Decimal(as_decimal(a) + as_decimal(b)),
    }
}

fn fold_extreme(docs: &[Document], field: &str, keep: Ordering) -> Datum {
    let mut best: Option<Datum> = None;
    for doc in docs {
        let Some(value) = extract_field(doc, field) else {
            continue;
        };
        if matches!(value, Datum::Null) {
            continue;
        }
        best = Some(match best {
            None => value,
            Some(current) => {
                if sort_cmp(&value, &current) == keep {
                    value
                } else {
                    current
                }
            }
        });
    }
    best.unwrap_or(Datum::Null)
}

fn dedup(items: Vec<Datum>) -> Vec<Datum> {
    let mut unique: Vec<Datum> = Vec::new();
    for item in items {
        if !unique.iter().any(|v| datums_equal(v, &item)) {
            unique.push(item);
        }
    }
    unique
}
