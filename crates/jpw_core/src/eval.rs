//! Evaluator for path queries and filter expressions

use crate::ast::{
    ArrayAccessor, ChainTerminal, ComparisonOp, Constant, FilterExpr, JsonPath, LogicalOp,
    PathElement, PropertyPath, Slice,
};
use crate::methods;
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use tracing::trace;

static NULL: Value = Value::Null;
static TRUE: Value = Value::Bool(true);
static FALSE: Value = Value::Bool(false);

/// Name of the virtual property on arrays and strings
const LENGTH: &str = "length";

/// Evaluate a parsed path against a JSON value.
///
/// Results borrow from `root` except for values the query computes, such as
/// `length`.
pub fn evaluate<'a>(path: &JsonPath, root: &'a Value) -> Vec<Cow<'a, Value>> {
    let mut elements = path.elements.as_slice();
    if let [PathElement::Property { name, escaped: false }, rest @ ..] = elements
        && name == "$"
    {
        elements = rest;
    }

    let mut current = vec![Cow::Borrowed(root)];
    for element in elements {
        current = evaluate_element(element, current);
        if current.is_empty() {
            break;
        }
    }

    trace!(results = current.len(), "evaluated path");
    current
}

fn evaluate_element<'a>(element: &PathElement, nodes: Vec<Cow<'a, Value>>) -> Vec<Cow<'a, Value>> {
    let mut results = Vec::new();
    for node in nodes {
        match node {
            Cow::Borrowed(node) => results.extend(select(element, node)),
            Cow::Owned(node) => results.extend(
                select(element, &node)
                    .into_iter()
                    .map(|value| Cow::Owned(value.into_owned())),
            ),
        }
    }
    results
}

fn select<'v>(element: &PathElement, node: &'v Value) -> Vec<Cow<'v, Value>> {
    match element {
        PathElement::Property { name, .. } => match node {
            Value::Object(map) => map.get(name).map(Cow::Borrowed).into_iter().collect(),
            _ => virtual_length(node, name).into_iter().collect(),
        },
        PathElement::Wildcard => children(node).map(Cow::Borrowed).collect(),
        PathElement::RecursiveDescent => collect_containers(node)
            .into_iter()
            .map(Cow::Borrowed)
            .collect(),
        PathElement::ArrayAccess(accessor) => match node {
            Value::Array(items) => access(items, accessor)
                .into_iter()
                .map(Cow::Borrowed)
                .collect(),
            _ => Vec::new(),
        },
        PathElement::Filter(filter) => match node {
            Value::Array(_) | Value::Object(_) => children(node)
                .filter(|child| filter_matches(&filter.expression, child))
                .map(Cow::Borrowed)
                .collect(),
            _ => Vec::new(),
        },
    }
}

/// `length` of an array or string
fn virtual_length(node: &Value, name: &str) -> Option<Cow<'static, Value>> {
    if name != LENGTH {
        return None;
    }
    match node {
        Value::Array(items) => Some(Cow::Owned(Value::from(items.len()))),
        Value::String(s) => Some(Cow::Owned(Value::from(s.chars().count()))),
        _ => None,
    }
}

/// Array elements or object member values, in document order
fn children(node: &Value) -> Box<dyn Iterator<Item = &Value> + '_> {
    match node {
        Value::Array(items) => Box::new(items.iter()),
        Value::Object(map) => Box::new(map.values()),
        _ => Box::new(std::iter::empty()),
    }
}

/// Every array and object at or below `node`, pre-order
fn collect_containers(node: &Value) -> Vec<&Value> {
    let mut results = Vec::new();
    let mut stack = vec![node];

    while let Some(current) = stack.pop() {
        match current {
            Value::Array(items) => {
                results.push(current);
                // Push in reverse order to maintain traversal order
                stack.extend(items.iter().rev());
            }
            Value::Object(map) => {
                results.push(current);
                stack.extend(map.values().rev());
            }
            _ => {}
        }
    }
    results
}

/// Elements selected by an accessor
fn access<'v>(items: &'v [Value], accessor: &ArrayAccessor) -> Vec<&'v Value> {
    match accessor {
        ArrayAccessor::All => items.iter().collect(),
        ArrayAccessor::Indexes(indexes) => {
            let mut seen: Vec<usize> = Vec::with_capacity(indexes.len());
            for &index in indexes {
                if let Some(resolved) = normalize_index(index, items.len())
                    && !seen.contains(&resolved)
                {
                    seen.push(resolved);
                }
            }
            seen.into_iter().map(|i| &items[i]).collect()
        }
        ArrayAccessor::Slice(slice) => slice_indices(*slice, items.len())
            .map(|i| &items[i])
            .collect(),
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

/// Indices of `slice`; negative bounds count from the end and every bound is
/// clamped into the array
fn slice_indices(slice: Slice, len: usize) -> impl Iterator<Item = usize> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let step = slice.step.unwrap_or(1).max(1);
    let start = slice.start.map_or(0, |s| normalize_slice_bound(s, len));
    let end = slice.end.map_or(len, |e| normalize_slice_bound(e, len));

    (start..end.max(start))
        .step_by(usize::try_from(step).unwrap_or(1))
        .filter_map(|i| usize::try_from(i).ok())
}

fn normalize_slice_bound(bound: i64, len: i64) -> i64 {
    if bound >= 0 {
        bound.min(len)
    } else {
        (len + bound).max(0)
    }
}

/// Whether `current` passes the filter expression
pub fn filter_matches(expr: &FilterExpr, current: &Value) -> bool {
    is_truthy(&evaluate_expr(expr, current))
}

fn evaluate_expr<'v>(expr: &FilterExpr, current: &'v Value) -> Cow<'v, Value> {
    match expr {
        FilterExpr::Group(inner) => evaluate_expr(inner, current),
        FilterExpr::Negation(inner) => boolean(!filter_matches(inner, current)),
        FilterExpr::Logical { op, left, right } => match op {
            LogicalOp::Or => {
                boolean(filter_matches(left, current) || filter_matches(right, current))
            }
            LogicalOp::And => {
                let left = filter_matches(left, current);
                let right = filter_matches(right, current);
                boolean(left && right)
            }
        },
        FilterExpr::Comparison { op, left, right } => {
            let left = evaluate_expr(left, current);
            let right = evaluate_expr(right, current);
            boolean(compare(&left, *op, &right))
        }
        FilterExpr::Property(path) => resolve_property(path, current),
        FilterExpr::ArrayAccess { target, accessor } => match evaluate_expr(target, current) {
            Cow::Borrowed(target) => access_value(target, accessor),
            Cow::Owned(target) => Cow::Owned(access_value(&target, accessor).into_owned()),
        },
        FilterExpr::MethodCall {
            target,
            method,
            args,
        } => {
            let target = evaluate_expr(target, current);
            let args: Vec<_> = args.iter().map(|arg| evaluate_expr(arg, current)).collect();
            Cow::Owned(methods::call(*method, &target, &args))
        }
        FilterExpr::Constant(constant) => match constant {
            Constant::Bool(b) => boolean(*b),
            Constant::Number(n) => Cow::Owned(Value::from(*n)),
            Constant::String(s) => Cow::Owned(Value::String(s.clone())),
        },
        FilterExpr::Truthy(inner) => boolean(filter_matches(inner, current)),
    }
}

fn boolean(b: bool) -> Cow<'static, Value> {
    Cow::Borrowed(if b { &TRUE } else { &FALSE })
}

/// Walk a property chain; anything missing along the way is null
fn resolve_property<'v>(path: &PropertyPath, current: &'v Value) -> Cow<'v, Value> {
    let mut node = Cow::Borrowed(current);
    for segment in &path.segments {
        node = match node {
            Cow::Borrowed(node) => child(node, segment),
            Cow::Owned(node) => Cow::Owned(child(&node, segment).into_owned()),
        };
    }

    match path.terminal {
        None => node,
        Some(terminal) if node.is_array() || node.is_object() => {
            let values: Vec<Value> = match terminal {
                ChainTerminal::Wildcard => children(&node).cloned().collect(),
                ChainTerminal::RecursiveDescent => {
                    collect_containers(&node).into_iter().cloned().collect()
                }
            };
            Cow::Owned(Value::Array(values))
        }
        Some(_) => Cow::Borrowed(&NULL),
    }
}

fn child<'v>(node: &'v Value, name: &str) -> Cow<'v, Value> {
    match node {
        Value::Object(map) => map.get(name).map_or(Cow::Borrowed(&NULL), Cow::Borrowed),
        _ => virtual_length(node, name).unwrap_or(Cow::Borrowed(&NULL)),
    }
}

/// Array access inside a filter: one exact index yields the element itself,
/// other selections yield a new array
fn access_value<'v>(target: &'v Value, accessor: &ArrayAccessor) -> Cow<'v, Value> {
    let Value::Array(items) = target else {
        return Cow::Borrowed(&NULL);
    };
    match accessor {
        ArrayAccessor::All => Cow::Borrowed(target),
        ArrayAccessor::Indexes(indexes) if indexes.len() == 1 => indexes
            .first()
            .and_then(|&index| normalize_index(index, items.len()))
            .map_or(Cow::Borrowed(&NULL), |i| Cow::Borrowed(&items[i])),
        _ => Cow::Owned(Value::Array(
            access(items, accessor).into_iter().cloned().collect(),
        )),
    }
}

/// JSON truthiness: containers are always truthy, null never is
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Compare two JSON values
fn compare(left: &Value, op: ComparisonOp, right: &Value) -> bool {
    match op {
        ComparisonOp::Eq => values_equal(left, right),
        ComparisonOp::Ne => !values_equal(left, right),
        ComparisonOp::Lt => ordering(left, right) == Some(Ordering::Less),
        ComparisonOp::Gt => ordering(left, right) == Some(Ordering::Greater),
        ComparisonOp::Le => matches!(
            ordering(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        ComparisonOp::Ge => matches!(
            ordering(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

/// Structural equality; numbers compare by value so `10` equals `10.0`
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l
                    .iter()
                    .all(|(key, a)| r.get(key).is_some_and(|b| values_equal(a, b)))
        }
        _ => left == right,
    }
}

/// Order of two values of the same kind; values of different kinds are
/// never ordered
fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            values_equal(left, right).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::Filter;
    use crate::parser::Parser;
    use serde_json::json;

    fn query(path: &str, json: &Value) -> Vec<Value> {
        let parsed = Parser::parse(path).unwrap();
        evaluate(&parsed, json)
            .into_iter()
            .map(Cow::into_owned)
            .collect()
    }

    fn matches(filter: &str, json: &Value) -> bool {
        Filter::parse(filter).unwrap().matches(json)
    }

    fn letters() -> Value {
        json!({"letters": ["a", "b", "c", "d", "e", "f", "g", "h", "i"]})
    }

    #[test]
    fn test_root_only() {
        let json = json!({"foo": "bar"});
        assert_eq!(query("$", &json), vec![json!({"foo": "bar"})]);
    }

    #[test]
    fn test_simple_name() {
        let json = json!({"foo": "bar"});
        assert_eq!(query("$.foo", &json), vec![json!("bar")]);
        assert_eq!(query("foo", &json), vec![json!("bar")]);
    }

    #[test]
    fn test_nested_name() {
        let json = json!({"foo": {"bar": "baz"}});
        assert_eq!(query("$.foo.bar", &json), vec![json!("baz")]);
        assert_eq!(query("$['foo']['bar']", &json), vec![json!("baz")]);
    }

    #[test]
    fn test_missing_property_selects_nothing() {
        let json = json!({"foo": {"bar": "baz"}});
        assert!(query("$.foo.qux", &json).is_empty());
        assert!(query("$.foo.bar.baz", &json).is_empty());
    }

    #[test]
    fn test_array_index() {
        let json = json!({"arr": [1, 2, 3]});
        assert_eq!(query("$.arr[0]", &json), vec![json!(1)]);
        assert_eq!(query("$.arr[-1]", &json), vec![json!(3)]);
        assert_eq!(query("$.arr[:last]", &json), vec![json!(3)]);
        assert!(query("$.arr[5]", &json).is_empty());
        assert!(query("$.arr[-4]", &json).is_empty());
    }

    #[test]
    fn test_index_list_deduplicates() {
        let json = json!({"arr": [1, 2, 3]});
        assert_eq!(
            query("$.arr[2,0,-1,7]", &json),
            vec![json!(3), json!(1)]
        );
    }

    #[test]
    fn test_wildcards() {
        let json = json!({"arr": [1, 2], "obj": {"b": 2, "a": 1}});
        assert_eq!(query("$.arr.*", &json), vec![json!(1), json!(2)]);
        assert_eq!(query("$.obj[*]", &json), vec![json!(2), json!(1)]);
        assert_eq!(query("$.arr[:any]", &json), vec![json!(1), json!(2)]);
        assert!(query("$.arr[:none]", &json).is_empty());
    }

    #[test]
    fn test_slices() {
        let json = letters();
        assert_eq!(
            query("$.letters[0:20:3]", &json),
            vec![json!("a"), json!("d"), json!("g")]
        );
        assert_eq!(query("$.letters[-1:]", &json), vec![json!("i")]);
        assert_eq!(
            query("$.letters[2:-1]", &json),
            vec![
                json!("c"),
                json!("d"),
                json!("e"),
                json!("f"),
                json!("g"),
                json!("h")
            ]
        );
        assert_eq!(query("$.letters[-100:2]", &json), vec![json!("a"), json!("b")]);
        assert!(query("$.letters[5:2]", &json).is_empty());
    }

    #[test]
    fn test_oversized_bounds_clamp() {
        let json = json!({"a": [1, 2, 3]});
        assert!(query("$.a[99999999999999999999]", &json).is_empty());
        assert!(query("$.a[-99999999999999999999]", &json).is_empty());
        assert_eq!(
            query("$.a[-99999999999999999999:]", &json),
            vec![json!(1), json!(2), json!(3)]
        );
        assert_eq!(
            query("$.a[0:99999999999999999999]", &json),
            vec![json!(1), json!(2), json!(3)]
        );
        assert_eq!(
            query("$.a[::99999999999999999999]", &json),
            vec![json!(1)]
        );
        assert!(matches("!@.a[99999999999999999999]", &json));
    }

    #[test]
    fn test_descendant() {
        let json = json!({
            "a": {"author": "x", "b": [{"author": "y"}]},
            "author": "z"
        });
        assert_eq!(
            query("$..author", &json),
            vec![json!("z"), json!("x"), json!("y")]
        );
    }

    #[test]
    fn test_descendant_skips_scalars() {
        let json = json!({"a": [1, {"b": 2}]});
        assert_eq!(
            query("$..", &json),
            vec![json.clone(), json!([1, {"b": 2}]), json!({"b": 2})]
        );
    }

    #[test]
    fn test_length() {
        let json = json!({"arr": [1, 2, 3], "name": "héllo", "obj": {"length": 7}});
        assert_eq!(query("$.arr.length", &json), vec![json!(3)]);
        assert_eq!(query("$.name.length", &json), vec![json!(5)]);
        assert_eq!(query("$.obj.length", &json), vec![json!(7)]);
        assert!(query("$.arr.length.foo", &json).is_empty());
    }

    #[test]
    fn test_filter_existence() {
        let json = json!({
            "items": [
                {"name": "apple", "price": 5},
                {"name": "banana"},
                {"name": "cherry", "price": 15},
                {"name": "durian", "price": 0}
            ]
        });
        let results = query("$.items[?(@.price)]", &json);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["name"], "apple");
        assert_eq!(results[1]["name"], "cherry");
    }

    #[test]
    fn test_filter_on_object_values() {
        let json = json!({"a": {"v": 1}, "b": {"v": 2}, "c": 3});
        assert_eq!(query("$[?(@.v > 1)]", &json), vec![json!({"v": 2})]);
    }

    #[test]
    fn test_filter_comparisons() {
        let json = json!({
            "items": [
                {"name": "apple", "price": 5},
                {"name": "banana", "price": 10},
                {"name": "cherry", "price": 15}
            ]
        });
        let names = |path: &str| -> Vec<Value> {
            query(path, &json)
                .into_iter()
                .map(|item| item["name"].clone())
                .collect()
        };
        assert_eq!(names("$.items[?(@.price < 10)]"), vec![json!("apple")]);
        assert_eq!(names("$.items[?(@.price == 10.0)]"), vec![json!("banana")]);
        assert_eq!(
            names("$.items[?(@.price >= 10)]"),
            vec![json!("banana"), json!("cherry")]
        );
        assert_eq!(names("$.items[?(@.name == \"cherry\")]"), vec![json!("cherry")]);
        assert_eq!(names("$.items[?(@.price > -1 && @.name < 'b')]"), vec![json!("apple")]);
    }

    #[test]
    fn test_mixed_kinds_are_not_ordered() {
        assert!(!matches("@.a < 10", &json!({"a": "5"})));
        assert!(!matches("@.a >= 10", &json!({"a": "50"})));
        assert!(!matches("@.a == 5", &json!({"a": "5"})));
        assert!(matches("@.a != 5", &json!({"a": "5"})));
    }

    #[test]
    fn test_null_comparisons() {
        assert!(matches("@.a == @.b", &json!({})));
        assert!(matches("@.a != 1", &json!({})));
        assert!(!matches("@.a < 1", &json!({})));
        assert!(matches("@.a <= @.b", &json!({})));
    }

    #[test]
    fn test_structural_equality() {
        let json = json!({"a": [1, {"b": 2.0}], "c": [1.0, {"b": 2}]});
        assert!(matches("@.a == @.c", &json));
        assert!(matches("@.a <= @.c", &json));
        assert!(!matches("@.a < @.c", &json));
    }

    #[test]
    fn test_logical_operators() {
        let json = json!({"a": 1, "b": 0});
        assert!(matches("@.a || @.b", &json));
        assert!(!matches("@.a && @.b", &json));
        assert!(matches("!@.b", &json));
        assert!(matches("!(@.a == 2)", &json));
    }

    #[test]
    fn test_or_short_circuit() {
        let json = json!({"a": true});
        assert!(matches("@.a || @.b.contains(5)", &json));
        assert!(!matches("@.b.contains(5)", &json));
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!({})));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!(-1)));
        assert!(!is_truthy(&json!(0.0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
    }

    #[test]
    fn test_filter_chain_terminals() {
        let json = json!({"tags": {"x": 1, "y": 2}});
        assert!(matches("@.tags.*.contains(2)", &json));
        assert!(!matches("@.tags.*.contains(3)", &json));
        assert!(matches("@..", &json));
        assert!(!matches("@.tags.x.*", &json));
    }

    #[test]
    fn test_filter_array_access() {
        let json = json!({"tags": ["red", "green", "blue"]});
        assert!(matches("@.tags[0] == 'red'", &json));
        assert!(matches("@.tags[-1] == 'blue'", &json));
        assert!(matches("@.tags[1:] == @.other || @.tags[1:].contains('blue')", &json));
        assert!(!matches("@.tags[5]", &json));
        assert!(matches("@.tags[:last].startsWith('BL', true)", &json));
    }

    #[test]
    fn test_filter_length() {
        let json = json!({"tags": ["a", "b"], "name": "abc"});
        assert!(matches("@.tags.length == 2", &json));
        assert!(matches("@.name.length > 2", &json));
        assert!(!matches("@.missing.length", &json));
    }

    #[test]
    fn test_method_calls() {
        let json = json!({"title": "Moby Dick", "isbn": "0-553-21311-3"});
        assert!(matches("@.title.toUpper() == 'MOBY DICK'", &json));
        assert!(matches("@.title.toLowerCase().startsWith('moby')", &json));
        assert!(matches("@.title.contains('dick', true)", &json));
        assert!(!matches("@.title.contains('dick')", &json));
        assert!(matches("@.isbn.matches('[0-9-]+')", &json));
        assert!(!matches("@.title.endsWith(5)", &json));
    }

    #[test]
    fn test_current_element_itself() {
        let json = json!({"nums": [0, 1, 2, 5]});
        assert_eq!(
            query("$.nums[?(@ > 1)]", &json),
            vec![json!(2), json!(5)]
        );
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let json = json!({"items": [{"a": 1}, {"a": 2}]});
        let parsed = Parser::parse("$.items[?(@.a >= 1)].a").unwrap();
        let first: Vec<Value> = evaluate(&parsed, &json)
            .into_iter()
            .map(Cow::into_owned)
            .collect();
        let second: Vec<Value> = evaluate(&parsed, &json)
            .into_iter()
            .map(Cow::into_owned)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![json!(1), json!(2)]);
    }
}
