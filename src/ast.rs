use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The Document is a map of string keys to datum values.
pub type Document = BTreeMap<String, Datum>;

/// A single value stored in a document field. Non-integer numbers are kept
/// as decimals so aggregates stay exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(Decimal),
    String(String),
    Array(Vec<Datum>),
    Object(Document),
}

impl Datum {
    /// The store's uppercase runtime type name, as used by type guards.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOL",
            Self::Integer(_) | Self::Decimal(_) => "NUMBER",
            Self::String(_) => "STRING",
            Self::Array(_) => "ARRAY",
            Self::Object(_) => "OBJECT",
        }
    }

    /// Only `null` and `false` are falsy; everything else passes a filter.
    pub const fn is_truthy(&self) -> bool {
        !matches!(self, Self::Null | Self::Bool(false))
    }

    /// Canonical string form used as a storage key for identity fields.
    /// Only strings and integers are valid identities.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Integer(i) => Some(i.to_string()),
            _ => None,
        }
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<Decimal> for Datum {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(v: Vec<Datum>) -> Self {
        Self::Array(v)
    }
}

impl From<Document> for Datum {
    fn from(v: Document) -> Self {
        Self::Object(v)
    }
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v}"),
            Self::Array(items) => write!(
                f,
                "[{}]",
                items
                    .iter()
                    .map(|v| format!("{v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Self::Object(fields) => write!(
                f,
                "{{{}}}",
                fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}

/// Binary operators the expression evaluator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Contains,
    Mod,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Contains => "contains",
            Self::Mod => "mod",
        };
        write!(f, "{symbol}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
}

/// A boolean expression over one document binding, evaluated per document by
/// the executor. Produced by the predicate compiler; opaque to the builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Datum),
    /// Field access; dotted names resolve through nested objects.
    Field { path: Vec<String> },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
    },
    /// Regular expression match against a string value.
    Match {
        value: Box<Expr>,
        pattern: String,
        case_insensitive: bool,
    },
    /// True when the document carries the field with a non-null value.
    HasField(String),
    /// Yields the runtime type name of the inner expression.
    TypeOf(Box<Expr>),
    /// Yields the length of an array value.
    Count(Box<Expr>),
}

impl Expr {
    pub fn field(name: &str) -> Self {
        Self::Field {
            path: name.split('.').map(str::to_string).collect(),
        }
    }

    pub fn literal(value: impl Into<Datum>) -> Self {
        Self::Literal(value.into())
    }

    pub fn binary(op: BinOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eq(left: Self, right: Self) -> Self {
        Self::binary(BinOp::Eq, left, right)
    }

    pub fn and(left: Self, right: Self) -> Self {
        Self::binary(BinOp::And, left, right)
    }

    pub fn or(left: Self, right: Self) -> Self {
        Self::binary(BinOp::Or, left, right)
    }

    pub fn not(expr: Self) -> Self {
        Self::Unary {
            op: UnOp::Not,
            expr: Box::new(expr),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(d) => write!(f, "{d}"),
            Self::Field { path } => write!(f, "field({})", path.join(".")),
            Self::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Unary {
                op: UnOp::Not,
                expr,
            } => write!(f, "not({expr})"),
            Self::Match {
                value,
                pattern,
                case_insensitive,
            } => {
                let flag = if *case_insensitive { "i" } else { "" };
                write!(f, "match({value}, /{pattern}/{flag})")
            }
            Self::HasField(name) => write!(f, "has_field({name})"),
            Self::TypeOf(expr) => write!(f, "type_of({expr})"),
            Self::Count(expr) => write!(f, "count({expr})"),
        }
    }
}

/// One field in an ORDER BY chain. The index hint is advisory; the core
/// engine has no secondary indexes and sorts in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub ascending: bool,
    pub index_hint: bool,
}

impl SortField {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: true,
            index_hint: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            ascending: false,
            index_hint: false,
        }
    }
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let direction = if self.ascending { "asc" } else { "desc" };
        write!(f, "{} {direction}", self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_display_scalars() {
        assert_eq!(format!("{}", Datum::Null), "NULL");
        assert_eq!(format!("{}", Datum::Bool(true)), "true");
        assert_eq!(format!("{}", Datum::Integer(-42)), "-42");
        assert_eq!(format!("{}", Datum::String("hello".into())), "hello");
        assert_eq!(format!("{}", Datum::Decimal(Decimal::new(315, 2))), "3.15");
    }

    #[test]
    fn test_datum_display_array() {
        let array = Datum::Array(vec![
            Datum::String("first".into()),
            Datum::Integer(42),
            Datum::Bool(true),
            Datum::Null,
        ]);
        assert_eq!(format!("{array}"), "[first, 42, true, NULL]");
    }

    #[test]
    fn test_datum_display_object() {
        let object = Datum::Object(Document::from([
            ("age".to_string(), Datum::Integer(30)),
            ("name".to_string(), Datum::String("John".into())),
        ]));
        assert_eq!(format!("{object}"), "{age: 30, name: John}");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Datum::Null.type_name(), "NULL");
        assert_eq!(Datum::Bool(false).type_name(), "BOOL");
        assert_eq!(Datum::Integer(1).type_name(), "NUMBER");
        assert_eq!(Datum::Decimal(Decimal::ONE).type_name(), "NUMBER");
        assert_eq!(Datum::String(String::new()).type_name(), "STRING");
        assert_eq!(Datum::Array(vec![]).type_name(), "ARRAY");
        assert_eq!(Datum::Object(Document::new()).type_name(), "OBJECT");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Datum::Null.is_truthy());
        assert!(!Datum::Bool(false).is_truthy());
        assert!(Datum::Bool(true).is_truthy());
        assert!(Datum::Integer(0).is_truthy());
        assert!(Datum::String(String::new()).is_truthy());
    }

    #[test]
    fn test_as_key() {
        assert_eq!(Datum::String("john".into()).as_key(), Some("john".into()));
        assert_eq!(Datum::Integer(7).as_key(), Some("7".into()));
        assert_eq!(Datum::Null.as_key(), None);
        assert_eq!(Datum::Array(vec![]).as_key(), None);
    }

    #[test]
    fn test_field_path_split() {
        let expr = Expr::field("address.city");
        assert_eq!(
            expr,
            Expr::Field {
                path: vec!["address".to_string(), "city".to_string()],
            }
        );
    }

    #[test]
    fn test_expr_display() {
        let expr = Expr::and(
            Expr::eq(Expr::field("name"), Expr::literal("john")),
            Expr::not(Expr::HasField("deleted_at".to_string())),
        );
        assert_eq!(
            format!("{expr}"),
            "((field(name) == john) and not(has_field(deleted_at)))"
        );
    }

    #[test]
    fn test_datum_roundtrip_msgpack() {
        let doc = Document::from([
            ("name".to_string(), Datum::String("John".into())),
            ("age".to_string(), Datum::Integer(30)),
            ("score".to_string(), Datum::Decimal(Decimal::new(175, 1))),
            (
                "tags".to_string(),
                Datum::Array(vec![Datum::String("a".into()), Datum::String("b".into())]),
            ),
            ("note".to_string(), Datum::Null),
        ]);

        let bytes = rmp_serde::to_vec(&doc).unwrap();
        let decoded: Document = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded.get("name"), doc.get("name"));
        assert_eq!(decoded.get("age"), doc.get("age"));
        assert_eq!(
            decoded.get("score"),
            Some(&Datum::Decimal(Decimal::new(175, 1)))
        );
        assert_eq!(decoded.get("tags"), doc.get("tags"));
        assert_eq!(decoded.get("note"), Some(&Datum::Null));
    }
}
