//! AST definitions for path queries and filter expressions

use smallvec::SmallVec;
use std::ops::RangeInclusive;

/// A complete parsed path
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    pub elements: Vec<PathElement>,
}

impl JsonPath {
    pub fn new(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }
}

/// One step of a path
#[derive(Debug, Clone, PartialEq)]
pub enum PathElement {
    /// `name` or `['name']`; `escaped` is set for the bracketed form
    Property { name: String, escaped: bool },
    /// `*` or `[*]`
    Wildcard,
    /// `..`
    RecursiveDescent,
    /// `[0]`, `[1,3]`, `[1:5:2]`, `[:last]`
    ArrayAccess(ArrayAccessor),
    /// `[?( ... )]`
    Filter(Filter),
}

impl PathElement {
    pub fn as_array_accessor(&self) -> Option<&ArrayAccessor> {
        match self {
            PathElement::ArrayAccess(accessor) => Some(accessor),
            _ => None,
        }
    }
}

/// Array element selection
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayAccessor {
    /// Every element, array passed through unchanged
    All,
    /// Exact indices in query order; negative values count from the end
    Indexes(SmallVec<[i64; 4]>),
    Slice(Slice),
}

/// `[start:end:step]`, every bound optional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub end: Option<i64>,
    /// Always greater than zero when present
    pub step: Option<i64>,
}

/// A filter expression with the raw text it was parsed from
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub source: String,
    pub expression: FilterExpr,
}

/// Filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Parenthesized expression
    Group(Box<FilterExpr>),
    /// `!expr`
    Negation(Box<FilterExpr>),
    Logical {
        op: LogicalOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    /// `@`, `@.a.b`, `@.a.*`, `@..`
    Property(PropertyPath),
    /// `@.items[0]`, `@.items[1:]`
    ArrayAccess {
        target: Box<FilterExpr>,
        accessor: ArrayAccessor,
    },
    /// `@.name.startsWith('a', true)`
    MethodCall {
        target: Box<FilterExpr>,
        method: Method,
        args: Vec<FilterExpr>,
    },
    Constant(Constant),
    /// A bare property or array access used as a condition
    Truthy(Box<FilterExpr>),
}

/// A chain of property names relative to the current element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyPath {
    pub segments: SmallVec<[String; 4]>,
    pub terminal: Option<ChainTerminal>,
}

impl PropertyPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            terminal: None,
        }
    }

    pub fn with_terminal(mut self, terminal: ChainTerminal) -> Self {
        self.terminal = Some(terminal);
        self
    }
}

/// Last element of a property chain that fans out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainTerminal {
    /// `.*`: every child value
    Wildcard,
    /// `..`: every object and array below, including the start
    RecursiveDescent,
}

/// Literal values in expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Number(f64),
    String(String),
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    /// Equal: `==`
    Eq,
    /// Not equal: `!=`
    Ne,
    /// Less than: `<`
    Lt,
    /// Greater than: `>`
    Gt,
    /// Less than or equal: `<=`
    Le,
    /// Greater than or equal: `>=`
    Ge,
}

impl ComparisonOp {
    pub fn from_symbols(symbols: &str) -> Option<Self> {
        match symbols {
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            ">" => Some(Self::Gt),
            "<=" => Some(Self::Le),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// Logical AND: `&&`
    And,
    /// Logical OR: `||`
    Or,
}

impl LogicalOp {
    pub fn from_symbols(symbols: &str) -> Option<Self> {
        match symbols {
            "&&" => Some(Self::And),
            "||" => Some(Self::Or),
            _ => None,
        }
    }
}

/// Methods callable on strings and arrays inside filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    ToUpper,
    ToLower,
    StartsWith,
    EndsWith,
    Contains,
    Matches,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "toUpper" | "toUpperCase" => Some(Self::ToUpper),
            "toLower" | "toLowerCase" => Some(Self::ToLower),
            "startsWith" => Some(Self::StartsWith),
            "endsWith" => Some(Self::EndsWith),
            "contains" => Some(Self::Contains),
            "matches" => Some(Self::Matches),
            _ => None,
        }
    }

    /// Number of arguments accepted
    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Self::ToUpper | Self::ToLower => 0..=0,
            Self::StartsWith | Self::EndsWith | Self::Contains => 1..=2,
            Self::Matches => 1..=1,
        }
    }
}
