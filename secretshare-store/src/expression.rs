//! Expression parser and evaluator
//!
//! Supports the subset of the DynamoDB expression language the store contract
//! uses:
//! - KeyConditionExpression (for Query)
//! - FilterExpression (for Query)
//! - ConditionExpression (for conditional puts and deletes)

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

use crate::attribute::{compare, get_path, AttributeValue, Item};

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("Invalid expression: {0}")]
    Invalid(String),

    #[error("Missing expression attribute name: {0}")]
    MissingAttributeName(String),

    #[error("Missing expression attribute value: {0}")]
    MissingAttributeValue(String),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq, // =
    Ne, // <>
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl ComparisonOp {
    fn parse(op: &str) -> Result<Self, ExpressionError> {
        match op {
            "=" => Ok(Self::Eq),
            "<>" => Ok(Self::Ne),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            other => Err(ExpressionError::Invalid(format!("Unknown operator: {}", other))),
        }
    }

    /// Apply to an ordering; `None` (incomparable) only satisfies `<>`.
    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Self::Ne, None) => true,
            (_, None) => false,
            (Self::Eq, Some(o)) => o == Ordering::Equal,
            (Self::Ne, Some(o)) => o != Ordering::Equal,
            (Self::Lt, Some(o)) => o == Ordering::Less,
            (Self::Le, Some(o)) => o != Ordering::Greater,
            (Self::Gt, Some(o)) => o == Ordering::Greater,
            (Self::Ge, Some(o)) => o != Ordering::Less,
        }
    }
}

/// A single key condition
#[derive(Debug, Clone, PartialEq)]
pub enum KeyCondition {
    Compare {
        attribute: String,
        op: ComparisonOp,
        value: String,
    },
    Between {
        attribute: String,
        low: String,
        high: String,
    },
    BeginsWith {
        attribute: String,
        prefix: String,
    },
}

impl KeyCondition {
    pub fn attribute(&self) -> &str {
        match self {
            KeyCondition::Compare { attribute, .. }
            | KeyCondition::Between { attribute, .. }
            | KeyCondition::BeginsWith { attribute, .. } => attribute,
        }
    }
}

/// Parsed filter or condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        path: String,
        op: ComparisonOp,
        value: String,
    },
    Between {
        path: String,
        low: String,
        high: String,
    },
    AttributeExists(String),
    AttributeNotExists(String),
    BeginsWith(String, String), // path, value placeholder
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

/// Placeholder bindings for evaluation
#[derive(Debug, Clone, Copy)]
pub struct ExpressionContext<'a> {
    pub attribute_names: &'a HashMap<String, String>,
    pub attribute_values: &'a HashMap<String, AttributeValue>,
}

impl<'a> ExpressionContext<'a> {
    pub fn new(
        names: &'a HashMap<String, String>,
        values: &'a HashMap<String, AttributeValue>,
    ) -> Self {
        Self {
            attribute_names: names,
            attribute_values: values,
        }
    }

    /// Resolve an attribute name (handles #name placeholders)
    pub fn resolve_name(&self, name: &str) -> Result<String, ExpressionError> {
        if name.starts_with('#') {
            self.attribute_names
                .get(name)
                .cloned()
                .ok_or_else(|| ExpressionError::MissingAttributeName(name.to_string()))
        } else {
            Ok(name.to_string())
        }
    }

    /// Resolve an attribute value (handles :value placeholders)
    pub fn resolve_value(&self, placeholder: &str) -> Result<&'a AttributeValue, ExpressionError> {
        self.attribute_values
            .get(placeholder)
            .ok_or_else(|| ExpressionError::MissingAttributeValue(placeholder.to_string()))
    }
}

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([#\w.]+)\s*(<>|<=|>=|=|<|>)\s*(:\w+)$").expect("comparison pattern")
});

static BETWEEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([#\w.]+)\s+BETWEEN\s+(:\w+)\s+AND\s+(:\w+)$").expect("between pattern")
});

/// Parse a key condition expression
///
/// Key conditions are restricted to:
/// - partition_key = :value
/// - partition_key = :value AND sort_key <op> :value
/// - partition_key = :value AND sort_key BETWEEN :v1 AND :v2
/// - partition_key = :value AND begins_with(sort_key, :v)
pub fn parse_key_condition(expression: &str) -> Result<Vec<KeyCondition>, ExpressionError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(vec![]);
    }

    let mut conditions = Vec::new();
    let mut rest = expression;
    while let Some((left, right)) = split_keyword(rest, "AND") {
        conditions.push(parse_single_key_condition(left)?);
        rest = right;
    }
    conditions.push(parse_single_key_condition(rest)?);

    Ok(conditions)
}

fn parse_single_key_condition(expr: &str) -> Result<KeyCondition, ExpressionError> {
    let expr = expr.trim();

    if let Some(args) = function_args(expr, "begins_with")? {
        let [attribute, prefix] = two_args(&args, "begins_with")?;
        return Ok(KeyCondition::BeginsWith { attribute, prefix });
    }

    if let Some(caps) = BETWEEN.captures(expr) {
        return Ok(KeyCondition::Between {
            attribute: caps[1].to_string(),
            low: caps[2].to_string(),
            high: caps[3].to_string(),
        });
    }

    if let Some(caps) = COMPARISON.captures(expr) {
        let op = ComparisonOp::parse(&caps[2])?;
        if op == ComparisonOp::Ne {
            return Err(ExpressionError::Invalid(
                "<> is not allowed in a key condition".to_string(),
            ));
        }
        return Ok(KeyCondition::Compare {
            attribute: caps[1].to_string(),
            op,
            value: caps[3].to_string(),
        });
    }

    Err(ExpressionError::Invalid(format!(
        "Could not parse key condition: {}",
        expr
    )))
}

/// Parse a filter/condition expression. Empty input means "no condition".
pub fn parse_condition(expression: &str) -> Result<Option<Condition>, ExpressionError> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Ok(None);
    }

    parse_condition_expr(expression).map(Some)
}

fn parse_condition_expr(expr: &str) -> Result<Condition, ExpressionError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(ExpressionError::Invalid("Empty operand".to_string()));
    }

    // Parentheses wrapping the whole expression
    if expr.starts_with('(') && find_matching_paren(expr, 0) == Some(expr.len() - 1) {
        return parse_condition_expr(&expr[1..expr.len() - 1]);
    }

    // OR binds loosest, then AND, then NOT
    if let Some((left, right)) = split_keyword(expr, "OR") {
        return Ok(Condition::Or(
            Box::new(parse_condition_expr(left)?),
            Box::new(parse_condition_expr(right)?),
        ));
    }

    if let Some((left, right)) = split_keyword(expr, "AND") {
        return Ok(Condition::And(
            Box::new(parse_condition_expr(left)?),
            Box::new(parse_condition_expr(right)?),
        ));
    }

    if let Some(inner) = strip_keyword_prefix(expr, "NOT") {
        return Ok(Condition::Not(Box::new(parse_condition_expr(inner)?)));
    }

    if let Some(args) = function_args(expr, "attribute_exists")? {
        return Ok(Condition::AttributeExists(args.trim().to_string()));
    }
    if let Some(args) = function_args(expr, "attribute_not_exists")? {
        return Ok(Condition::AttributeNotExists(args.trim().to_string()));
    }
    if let Some(args) = function_args(expr, "begins_with")? {
        let [path, value] = two_args(&args, "begins_with")?;
        return Ok(Condition::BeginsWith(path, value));
    }

    if let Some(caps) = BETWEEN.captures(expr) {
        return Ok(Condition::Between {
            path: caps[1].to_string(),
            low: caps[2].to_string(),
            high: caps[3].to_string(),
        });
    }

    if let Some(caps) = COMPARISON.captures(expr) {
        return Ok(Condition::Compare {
            path: caps[1].to_string(),
            op: ComparisonOp::parse(&caps[2])?,
            value: caps[3].to_string(),
        });
    }

    Err(ExpressionError::Invalid(format!(
        "Could not parse condition: {}",
        expr
    )))
}

// === Evaluation ===

/// Evaluate a condition against an item
pub fn evaluate_condition(
    condition: &Condition,
    item: &Item,
    ctx: &ExpressionContext,
) -> Result<bool, ExpressionError> {
    match condition {
        Condition::Compare { path, op, value } => {
            let expected = ctx.resolve_value(value)?;
            let actual = get_path(item, &ctx.resolve_name(path)?);
            Ok(match actual {
                Some(actual) => op.holds(compare(actual, expected)),
                None => *op == ComparisonOp::Ne,
            })
        }
        Condition::Between { path, low, high } => {
            let low = ctx.resolve_value(low)?;
            let high = ctx.resolve_value(high)?;
            let actual = get_path(item, &ctx.resolve_name(path)?);
            Ok(actual.is_some_and(|v| between(v, low, high)))
        }
        Condition::AttributeExists(path) => {
            Ok(get_path(item, &ctx.resolve_name(path)?).is_some())
        }
        Condition::AttributeNotExists(path) => {
            Ok(get_path(item, &ctx.resolve_name(path)?).is_none())
        }
        Condition::BeginsWith(path, value) => {
            let prefix = ctx.resolve_value(value)?;
            let actual = get_path(item, &ctx.resolve_name(path)?);
            Ok(begins_with(actual, prefix))
        }
        Condition::And(left, right) => {
            Ok(evaluate_condition(left, item, ctx)? && evaluate_condition(right, item, ctx)?)
        }
        Condition::Or(left, right) => {
            Ok(evaluate_condition(left, item, ctx)? || evaluate_condition(right, item, ctx)?)
        }
        Condition::Not(inner) => Ok(!evaluate_condition(inner, item, ctx)?),
    }
}

/// Evaluate key conditions against an item; all must hold
pub fn evaluate_key_conditions(
    conditions: &[KeyCondition],
    item: &Item,
    ctx: &ExpressionContext,
) -> Result<bool, ExpressionError> {
    for cond in conditions {
        let actual = item.get(&ctx.resolve_name(cond.attribute())?);

        let matches = match cond {
            KeyCondition::Compare { op, value, .. } => {
                let expected = ctx.resolve_value(value)?;
                actual.is_some_and(|v| op.holds(compare(v, expected)))
            }
            KeyCondition::Between { low, high, .. } => {
                let low = ctx.resolve_value(low)?;
                let high = ctx.resolve_value(high)?;
                actual.is_some_and(|v| between(v, low, high))
            }
            KeyCondition::BeginsWith { prefix, .. } => {
                begins_with(actual, ctx.resolve_value(prefix)?)
            }
        };

        if !matches {
            return Ok(false);
        }
    }

    Ok(true)
}

fn between(value: &AttributeValue, low: &AttributeValue, high: &AttributeValue) -> bool {
    ComparisonOp::Ge.holds(compare(value, low)) && ComparisonOp::Le.holds(compare(value, high))
}

fn begins_with(value: Option<&AttributeValue>, prefix: &AttributeValue) -> bool {
    match (value, prefix) {
        (Some(AttributeValue::S { S: s }), AttributeValue::S { S: p }) => s.starts_with(p.as_str()),
        _ => false,
    }
}

// === Helpers ===

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b':' | b'#' | b'.')
}

/// Split at the first top-level occurrence of `keyword` (case-insensitive,
/// whole word). The `AND` of a `BETWEEN x AND y` is never a split point.
fn split_keyword<'a>(expr: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let bytes = expr.as_bytes();
    let len = keyword.len();
    let mut depth = 0usize;
    let mut pending_between = false;

    let word_at = |i: usize, word: &str| -> bool {
        i + word.len() <= bytes.len()
            && bytes[i..i + word.len()].eq_ignore_ascii_case(word.as_bytes())
            && (i == 0 || !is_word_byte(bytes[i - 1]))
            && (i + word.len() == bytes.len() || !is_word_byte(bytes[i + word.len()]))
    };

    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                if word_at(i, "BETWEEN") {
                    pending_between = true;
                    i += "BETWEEN".len();
                    continue;
                }
                if word_at(i, "AND") && pending_between {
                    pending_between = false;
                    i += 3;
                    continue;
                }
                if word_at(i, keyword) {
                    return Some((&expr[..i], &expr[i + len..]));
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

fn strip_keyword_prefix<'a>(expr: &'a str, keyword: &str) -> Option<&'a str> {
    let len = keyword.len();
    let bytes = expr.as_bytes();
    if bytes.len() > len
        && bytes[..len].eq_ignore_ascii_case(keyword.as_bytes())
        && !is_word_byte(bytes[len])
    {
        Some(&expr[len..])
    } else {
        None
    }
}

fn find_matching_paren(expr: &str, start: usize) -> Option<usize> {
    let bytes = expr.as_bytes();
    if bytes.get(start) != Some(&b'(') {
        return None;
    }

    let mut depth = 0;
    for (i, &b) in bytes[start..].iter().enumerate() {
        if b == b'(' {
            depth += 1;
        } else if b == b')' {
            depth -= 1;
            if depth == 0 {
                return Some(start + i);
            }
        }
    }
    None
}

/// If `expr` is exactly a call to `func_name`, return its argument text.
fn function_args(expr: &str, func_name: &str) -> Result<Option<String>, ExpressionError> {
    let len = func_name.len();
    if expr.len() <= len || !expr.as_bytes()[..len].eq_ignore_ascii_case(func_name.as_bytes()) {
        return Ok(None);
    }

    let after = expr[len..].trim_start();
    if !after.starts_with('(') {
        return Ok(None);
    }

    let open = expr.len() - after.len();
    match find_matching_paren(expr, open) {
        Some(close) if close == expr.len() - 1 => Ok(Some(expr[open + 1..close].to_string())),
        Some(_) => Ok(None),
        None => Err(ExpressionError::Invalid(format!(
            "Unbalanced parentheses in {}",
            expr
        ))),
    }
}

fn two_args(args: &str, func_name: &str) -> Result<[String; 2], ExpressionError> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [first, second] if !first.is_empty() && !second.is_empty() => {
            Ok([(*first).to_string(), (*second).to_string()])
        }
        _ => Err(ExpressionError::Invalid(format!(
            "{} requires 2 arguments",
            func_name
        ))),
    }
}
