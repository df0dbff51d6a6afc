//! Second-layer tokens produced by the filter tokenizer

use crate::ast::{ArrayAccessor, ComparisonOp, Constant, LogicalOp, Method, PropertyPath};
use crate::lexer::Token;

/// A filter token, either still primitive or already classified
#[derive(Debug, Clone, PartialEq)]
pub enum ExprToken {
    /// Lexer token not yet claimed by any pass
    Primitive(Token),
    OpenGroup {
        id: usize,
        depth: usize,
        position: usize,
    },
    CloseGroup {
        id: usize,
        depth: usize,
        position: usize,
    },
    Property {
        path: PropertyPath,
        position: usize,
    },
    Constant {
        value: Constant,
        position: usize,
    },
    Negation {
        position: usize,
    },
    Comparison {
        op: ComparisonOp,
        position: usize,
    },
    Logical {
        op: LogicalOp,
        position: usize,
    },
    MethodCall {
        target: Box<ExprToken>,
        method: Method,
        name: String,
        args: Vec<Vec<ExprToken>>,
        position: usize,
    },
    ArrayAccess {
        target: Box<ExprToken>,
        accessor: ArrayAccessor,
        position: usize,
    },
}

impl ExprToken {
    /// Start offset in the source text
    pub fn position(&self) -> usize {
        match self {
            ExprToken::Primitive(token) => token.start,
            ExprToken::OpenGroup { position, .. }
            | ExprToken::CloseGroup { position, .. }
            | ExprToken::Property { position, .. }
            | ExprToken::Constant { position, .. }
            | ExprToken::Negation { position }
            | ExprToken::Comparison { position, .. }
            | ExprToken::Logical { position, .. }
            | ExprToken::MethodCall { position, .. }
            | ExprToken::ArrayAccess { position, .. } => *position,
        }
    }

    /// The character of an unclassified symbol token
    pub fn symbol(&self) -> Option<char> {
        match self {
            ExprToken::Primitive(token) => token.symbol(),
            _ => None,
        }
    }

    pub fn is_symbol(&self, c: char) -> bool {
        self.symbol() == Some(c)
    }

    pub fn is_group_open(&self) -> bool {
        matches!(self, ExprToken::OpenGroup { .. }) || self.is_symbol('(')
    }

    /// Tokens a `.method(...)` call may follow
    pub fn accepts_method(&self) -> bool {
        matches!(
            self,
            ExprToken::Property { .. }
                | ExprToken::Constant { .. }
                | ExprToken::ArrayAccess { .. }
                | ExprToken::MethodCall { .. }
        )
    }

    /// Tokens an `[...]` accessor may follow
    pub fn accepts_accessor(&self) -> bool {
        matches!(
            self,
            ExprToken::Property { .. } | ExprToken::ArrayAccess { .. }
        )
    }

    pub fn describe(&self) -> String {
        match self {
            ExprToken::Primitive(token) => token.describe(),
            ExprToken::OpenGroup { .. } => "'('".to_string(),
            ExprToken::CloseGroup { .. } => "')'".to_string(),
            ExprToken::Property { .. } => "property".to_string(),
            ExprToken::Constant { .. } => "constant".to_string(),
            ExprToken::Negation { .. } => "'!'".to_string(),
            ExprToken::Comparison { .. } => "comparison operator".to_string(),
            ExprToken::Logical { .. } => "logical operator".to_string(),
            ExprToken::MethodCall { name, .. } => format!("call to '{name}'"),
            ExprToken::ArrayAccess { .. } => "array accessor".to_string(),
        }
    }
}
