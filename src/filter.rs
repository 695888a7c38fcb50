use crate::ast::{BinOp, Datum, Expr};

/// Comparison and matching operators accepted by the builder's operator
/// tokens. `!=` normalizes to `Ne` at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    Exists,
    TypeOf,
    Mod,
    Size,
    Regexp,
    NotRegexp,
    Like,
    NotLike,
}

impl Operator {
    /// Parses an operator token, case-insensitively. Returns `None` for
    /// anything outside the vocabulary.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "contains" => Some(Self::Contains),
            "exists" => Some(Self::Exists),
            "type" => Some(Self::TypeOf),
            "mod" => Some(Self::Mod),
            "size" => Some(Self::Size),
            "regexp" => Some(Self::Regexp),
            "not regexp" => Some(Self::NotRegexp),
            "like" => Some(Self::Like),
            "not like" => Some(Self::NotLike),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Contains => "contains",
            Self::Exists => "exists",
            Self::TypeOf => "type",
            Self::Mod => "mod",
            Self::Size => "size",
            Self::Regexp => "regexp",
            Self::NotRegexp => "not regexp",
            Self::Like => "like",
            Self::NotLike => "not like",
        };
        write!(f, "{token}")
    }
}

/// How a clause joins the predicate accumulated before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

/// One entry in a builder's where list. Clauses are compiled left to right;
/// each clause's combinator joins it to everything compiled so far.
#[derive(Debug, Clone, PartialEq)]
pub enum WhereClause {
    Basic {
        boolean: Combinator,
        column: String,
        operator: Operator,
        value: Datum,
    },
    Between {
        boolean: Combinator,
        column: String,
        low: Datum,
        high: Datum,
        negated: bool,
    },
    Null {
        boolean: Combinator,
        column: String,
    },
    NotNull {
        boolean: Combinator,
        column: String,
    },
    In {
        boolean: Combinator,
        column: String,
        values: Vec<Datum>,
    },
    NotIn {
        boolean: Combinator,
        column: String,
        values: Vec<Datum>,
    },
    Nested {
        boolean: Combinator,
        clauses: Vec<WhereClause>,
    },
}

impl WhereClause {
    pub const fn boolean(&self) -> Combinator {
        match self {
            Self::Basic { boolean, .. }
            | Self::Between { boolean, .. }
            | Self::Null { boolean, .. }
            | Self::NotNull { boolean, .. }
            | Self::In { boolean, .. }
            | Self::NotIn { boolean, .. }
            | Self::Nested { boolean, .. } => *boolean,
        }
    }
}

/// Compiles a where list into a single predicate expression. The fold is
/// strictly left to right, so `A or B and C` becomes `(A or B) and C`.
/// A single clause is returned bare, never wrapped.
pub fn compile(clauses: &[WhereClause]) -> Option<Expr> {
    let mut compiled: Option<Expr> = None;
    for clause in clauses {
        let expr = clause_expr(clause);
        compiled = Some(match compiled {
            None => expr,
            Some(acc) => match clause.boolean() {
                Combinator::And => Expr::and(acc, expr),
                Combinator::Or => Expr::or(acc, expr),
            },
        });
    }
    compiled
}

fn clause_expr(clause: &WhereClause) -> Expr {
    match clause {
        WhereClause::Basic {
            column,
            operator,
            value,
            ..
        } => basic_expr(column, *operator, value),
        WhereClause::Between {
            column,
            low,
            high,
            negated,
            ..
        } => {
            let field = || Expr::field(column);
            if *negated {
                // Boundary values satisfy the negated range too.
                Expr::or(
                    Expr::binary(BinOp::Le, field(), Expr::Literal(low.clone())),
                    Expr::binary(BinOp::Ge, field(), Expr::Literal(high.clone())),
                )
            } else {
                Expr::and(
                    Expr::binary(BinOp::Ge, field(), Expr::Literal(low.clone())),
                    Expr::binary(BinOp::Le, field(), Expr::Literal(high.clone())),
                )
            }
        }
        WhereClause::Null { column, .. } => Expr::eq(Expr::field(column), Expr::Literal(Datum::Null)),
        WhereClause::NotNull { column, .. } => Expr::not(Expr::eq(
            Expr::field(column),
            Expr::Literal(Datum::Null),
        )),
        WhereClause::In { column, values, .. } => in_expr(column, values),
        WhereClause::NotIn { column, values, .. } => Expr::not(in_expr(column, values)),
        WhereClause::Nested { clauses, .. } => {
            // An empty group matches everything, same as no filter.
            compile(clauses).unwrap_or(Expr::Literal(Datum::Bool(true)))
        }
    }
}

fn in_expr(column: &str, values: &[Datum]) -> Expr {
    Expr::binary(
        BinOp::Contains,
        Expr::Literal(Datum::Array(values.to_vec())),
        Expr::field(column),
    )
}

fn basic_expr(column: &str, operator: Operator, value: &Datum) -> Expr {
    let field = || Expr::field(column);
    let lit = || Expr::Literal(value.clone());
    match operator {
        Operator::Eq => Expr::eq(field(), lit()),
        Operator::Ne => Expr::binary(BinOp::Ne, field(), lit()),
        Operator::Lt => Expr::binary(BinOp::Lt, field(), lit()),
        Operator::Le => Expr::binary(BinOp::Le, field(), lit()),
        Operator::Gt => Expr::binary(BinOp::Gt, field(), lit()),
        Operator::Ge => Expr::binary(BinOp::Ge, field(), lit()),
        Operator::Contains => Expr::binary(BinOp::Contains, field(), lit()),
        Operator::Exists => {
            let has = Expr::HasField(column.to_string());
            if value.is_truthy() { has } else { Expr::not(has) }
        }
        Operator::TypeOf => {
            let name = match value {
                Datum::String(s) => s.to_uppercase(),
                other => other.to_string(),
            };
            Expr::eq(Expr::TypeOf(Box::new(field())), Expr::literal(name))
        }
        Operator::Mod => {
            let (divisor, remainder) = match value {
                Datum::Array(pair) if pair.len() == 2 => (pair[0].clone(), pair[1].clone()),
                other => (other.clone(), Datum::Integer(0)),
            };
            Expr::and(
                type_guard(column, "NUMBER"),
                Expr::eq(
                    Expr::binary(BinOp::Mod, field(), Expr::Literal(divisor)),
                    Expr::Literal(remainder),
                ),
            )
        }
        Operator::Size => Expr::and(
            type_guard(column, "ARRAY"),
            Expr::eq(Expr::Count(Box::new(field())), lit()),
        ),
        Operator::Regexp => regexp_expr(column, value, false, false),
        Operator::NotRegexp => regexp_expr(column, value, false, true),
        Operator::Like => regexp_expr(column, value, true, false),
        Operator::NotLike => regexp_expr(column, value, true, true),
    }
}

fn type_guard(column: &str, type_name: &str) -> Expr {
    Expr::eq(
        Expr::TypeOf(Box::new(Expr::field(column))),
        Expr::literal(type_name),
    )
}

fn regexp_expr(column: &str, value: &Datum, like: bool, negated: bool) -> Expr {
    let raw = match value {
        Datum::String(s) => s.clone(),
        other => other.to_string(),
    };
    let (pattern, case_insensitive) = if like {
        (like_to_regex(&raw), true)
    } else {
        (raw, false)
    };
    let matcher = Expr::Match {
        value: Box::new(Expr::field(column)),
        pattern,
        case_insensitive,
    };
    Expr::and(
        type_guard(column, "STRING"),
        if negated { Expr::not(matcher) } else { matcher },
    )
}

/// Converts a SQL LIKE pattern into an anchored regular expression. Every
/// `%` is stripped; the anchors are dropped on whichever sides the pattern
/// had a leading or trailing wildcard.
fn like_to_regex(pattern: &str) -> String {
    let starts_open = pattern.starts_with('%');
    let ends_open = pattern.ends_with('%');
    let body: String = pattern.chars().filter(|&c| c != '%').collect();
    let mut regex = String::with_capacity(body.len() + 2);
    if !starts_open {
        regex.push('^');
    }
    regex.push_str(&regex_escape(&body));
    if !ends_open {
        regex.push('$');
    }
    regex
}

fn regex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(boolean: Combinator, column: &str, operator: Operator, value: impl Into<Datum>) -> WhereClause {
        WhereClause::Basic {
            boolean,
            column: column.to_string(),
            operator,
            value: value.into(),
        }
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!(Operator::parse("="), Some(Operator::Eq));
        assert_eq!(Operator::parse("!="), Some(Operator::Ne));
        assert_eq!(Operator::parse("<>"), Some(Operator::Ne));
        assert_eq!(Operator::parse("NOT LIKE"), Some(Operator::NotLike));
        assert_eq!(Operator::parse("Type"), Some(Operator::TypeOf));
        assert_eq!(Operator::parse("between"), None);
        assert_eq!(Operator::parse("=="), None);
    }

    #[test]
    fn test_empty_where_list() {
        assert_eq!(compile(&[]), None);
    }

    #[test]
    fn test_single_clause_not_wrapped() {
        let clauses = vec![basic(Combinator::And, "name", Operator::Eq, "john")];
        let expr = compile(&clauses).unwrap();
        assert_eq!(expr, Expr::eq(Expr::field("name"), Expr::literal("john")));
    }

    #[test]
    fn test_left_fold_grouping() {
        // A or B and C folds to (A or B) and C.
        let clauses = vec![
            basic(Combinator::And, "a", Operator::Eq, 1),
            basic(Combinator::Or, "b", Operator::Eq, 2),
            basic(Combinator::And, "c", Operator::Eq, 3),
        ];
        let expr = compile(&clauses).unwrap();
        assert_eq!(
            format!("{expr}"),
            "(((field(a) == 1) or (field(b) == 2)) and (field(c) == 3))"
        );
    }

    #[test]
    fn test_first_combinator_ignored() {
        let clauses = vec![basic(Combinator::Or, "a", Operator::Eq, 1)];
        let expr = compile(&clauses).unwrap();
        assert_eq!(expr, Expr::eq(Expr::field("a"), Expr::literal(1)));
    }

    #[test]
    fn test_exists_truthy_and_falsy() {
        let present = compile(&[basic(Combinator::And, "age", Operator::Exists, true)]).unwrap();
        assert_eq!(present, Expr::HasField("age".to_string()));

        let absent = compile(&[basic(Combinator::And, "age", Operator::Exists, false)]).unwrap();
        assert_eq!(absent, Expr::not(Expr::HasField("age".to_string())));
    }

    #[test]
    fn test_type_operator_uppercases() {
        let expr = compile(&[basic(Combinator::And, "age", Operator::TypeOf, "number")]).unwrap();
        assert_eq!(
            expr,
            Expr::eq(
                Expr::TypeOf(Box::new(Expr::field("age"))),
                Expr::literal("NUMBER"),
            )
        );
    }

    #[test]
    fn test_mod_guarded_by_number_check() {
        let expr = compile(&[basic(
            Combinator::And,
            "age",
            Operator::Mod,
            vec![Datum::Integer(15), Datum::Integer(0)],
        )])
        .unwrap();
        assert_eq!(
            format!("{expr}"),
            "((type_of(field(age)) == NUMBER) and ((field(age) mod 15) == 0))"
        );
    }

    #[test]
    fn test_size_guarded_by_array_check() {
        let expr = compile(&[basic(Combinator::And, "tags", Operator::Size, 4)]).unwrap();
        assert_eq!(
            format!("{expr}"),
            "((type_of(field(tags)) == ARRAY) and (count(field(tags)) == 4))"
        );
    }

    #[test]
    fn test_like_strips_percent_and_anchors() {
        assert_eq!(like_to_regex("john"), "^john$");
        assert_eq!(like_to_regex("%doe"), "doe$");
        assert_eq!(like_to_regex("jo%"), "^jo");
        assert_eq!(like_to_regex("%oh%"), "oh");
        // Interior wildcards are stripped too.
        assert_eq!(like_to_regex("j%n"), "^jn$");
    }

    #[test]
    fn test_like_escapes_regex_metacharacters() {
        assert_eq!(like_to_regex("a.b%"), "^a\\.b");
    }

    #[test]
    fn test_like_compiles_to_guarded_ci_match() {
        let expr = compile(&[basic(Combinator::And, "name", Operator::Like, "jo%")]).unwrap();
        assert_eq!(
            format!("{expr}"),
            "((type_of(field(name)) == STRING) and match(field(name), /^jo/i))"
        );
    }

    #[test]
    fn test_not_like_negates_match_inside_guard() {
        let expr = compile(&[basic(Combinator::And, "name", Operator::NotLike, "jo%")]).unwrap();
        assert_eq!(
            format!("{expr}"),
            "((type_of(field(name)) == STRING) and not(match(field(name), /^jo/i)))"
        );
    }

    #[test]
    fn test_regexp_keeps_pattern_verbatim() {
        let expr = compile(&[basic(
            Combinator::And,
            "name",
            Operator::Regexp,
            "^jo.*n$",
        )])
        .unwrap();
        assert_eq!(
            format!("{expr}"),
            "((type_of(field(name)) == STRING) and match(field(name), /^jo.*n$/))"
        );
    }

    #[test]
    fn test_between_bounds_inclusive() {
        let clauses = vec![WhereClause::Between {
            boolean: Combinator::And,
            column: "age".to_string(),
            low: Datum::Integer(18),
            high: Datum::Integer(65),
            negated: false,
        }];
        let expr = compile(&clauses).unwrap();
        assert_eq!(
            format!("{expr}"),
            "((field(age) >= 18) and (field(age) <= 65))"
        );
    }

    #[test]
    fn test_not_between_includes_bounds() {
        let clauses = vec![WhereClause::Between {
            boolean: Combinator::And,
            column: "age".to_string(),
            low: Datum::Integer(18),
            high: Datum::Integer(65),
            negated: true,
        }];
        let expr = compile(&clauses).unwrap();
        assert_eq!(
            format!("{expr}"),
            "((field(age) <= 18) or (field(age) >= 65))"
        );
    }

    #[test]
    fn test_in_compiles_to_membership() {
        let clauses = vec![WhereClause::In {
            boolean: Combinator::And,
            column: "age".to_string(),
            values: vec![Datum::Integer(13), Datum::Integer(23)],
        }];
        let expr = compile(&clauses).unwrap();
        assert_eq!(
            format!("{expr}"),
            "([13, 23] contains field(age))"
        );
    }

    #[test]
    fn test_nested_group_keeps_its_own_fold() {
        let clauses = vec![
            basic(Combinator::And, "active", Operator::Eq, true),
            WhereClause::Nested {
                boolean: Combinator::And,
                clauses: vec![
                    basic(Combinator::And, "a", Operator::Eq, 1),
                    basic(Combinator::Or, "b", Operator::Eq, 2),
                ],
            },
        ];
        let expr = compile(&clauses).unwrap();
        assert_eq!(
            format!("{expr}"),
            "((field(active) == true) and ((field(a) == 1) or (field(b) == 2)))"
        );
    }

    #[test]
    fn test_empty_nested_group_is_true() {
        let clauses = vec![WhereClause::Nested {
            boolean: Combinator::And,
            clauses: vec![],
        }];
        assert_eq!(compile(&clauses), Some(Expr::Literal(Datum::Bool(true))));
    }

    #[test]
    fn test_null_and_not_null() {
        let null = compile(&[WhereClause::Null {
            boolean: Combinator::And,
            column: "deleted_at".to_string(),
        }])
        .unwrap();
        assert_eq!(format!("{null}"), "(field(deleted_at) == NULL)");

        let not_null = compile(&[WhereClause::NotNull {
            boolean: Combinator::And,
            column: "deleted_at".to_string(),
        }])
        .unwrap();
        assert_eq!(format!("{not_null}"), "not((field(deleted_at) == NULL))");
    }
}
