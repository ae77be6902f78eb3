//! Query expression graph.
//!
//! An owned, immutable tree describing one filter as the host wrote it:
//! member accesses rooted at the iterated record, constants, captured
//! closure state, static reads, comparisons, boolean combinators and a closed
//! set of recognised method calls. Nothing here is schema-aware; resolution
//! happens when a terminal operation translates the graph.
mod build;
mod chain;


use crate::value::{Literal, RecordRef, Timestamp};
use derive_more::Display;
use std::{collections::BTreeMap, fmt, rc::Rc};

// re-exports
pub use build::{
    field, is_null_or_empty, lit, null, object, param, static_member, string_equals,
};
pub use chain::PropertyChain;

///
/// Expr
///

#[derive(Clone, Debug)]
pub enum Expr {
    /// The iterated record.
    Param,
    /// Constant node: a literal, a comparison mode, or a captured object.
    Const(HostValue),
    /// Read of a registered static member.
    Static { owner: String, member: String },
    /// Field or property read on `target`.
    Member { target: Box<Self>, member: String },
    /// Implicit conversion wrapper; transparent to translation.
    Convert(Box<Self>),
    Binary {
        op: BinaryOp,
        left: Box<Self>,
        right: Box<Self>,
    },
    Not(Box<Self>),
    Call {
        method: Method,
        receiver: Option<Box<Self>>,
        args: Vec<Self>,
    },
}

impl Expr {
    /// Strip any `Convert` wrappers.
    #[must_use]
    pub fn unwrap_convert(&self) -> &Self {
        let mut expr = self;
        while let Self::Convert(inner) = expr {
            expr = inner;
        }
        expr
    }

    /// Whether any node in this sub-graph is the iterated record.
    #[must_use]
    pub fn references_param(&self) -> bool {
        match self {
            Self::Param => true,
            Self::Const(_) | Self::Static { .. } => false,
            Self::Member { target, .. } => target.references_param(),
            Self::Convert(inner) | Self::Not(inner) => inner.references_param(),
            Self::Binary { left, right, .. } => left.references_param() || right.references_param(),
            Self::Call { receiver, args, .. } => {
                receiver.as_deref().is_some_and(Self::references_param)
                    || args.iter().any(Self::references_param)
            }
        }
    }

    /// Property name when this node is a direct member of the iterated record
    /// (`x.Name`, possibly behind conversions).
    #[must_use]
    pub fn direct_property(&self) -> Option<&str> {
        match self.unwrap_convert() {
            Self::Member { target, member } if matches!(target.unwrap_convert(), Self::Param) => {
                Some(member.as_str())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Param => write!(f, "x"),
            Self::Const(value) => write!(f, "{value}"),
            Self::Static { owner, member } => write!(f, "{owner}::{member}"),
            Self::Member { target, member } => write!(f, "{target}.{member}"),
            Self::Convert(inner) => write!(f, "{inner}"),
            Self::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            Self::Not(inner) => write!(f, "!{inner}"),
            Self::Call {
                method,
                receiver,
                args,
            } => {
                if let Some(receiver) = receiver {
                    write!(f, "{receiver}.")?;
                }
                write!(f, "{method}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum BinaryOp {
    #[display("&&")]
    AndAlso,
    #[display("||")]
    OrElse,
    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display("<=")]
    Lte,
    #[display(">")]
    Gt,
    #[display(">=")]
    Gte,
}

///
/// Method
/// Method calls the translator recognises; anything else is `Other`.
///

#[derive(Clone, Debug, Display, Eq, Hash, PartialEq)]
pub enum Method {
    Contains,
    StartsWith,
    EndsWith,
    Like,
    FullTextSearch,
    Equals,
    IsNullOrEmpty,
    #[display("{_0}")]
    Other(String),
}

///
/// StringComparison
/// Case/culture mode argument accepted by the string predicates.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum StringComparison {
    CurrentCulture,
    CurrentCultureIgnoreCase,
    InvariantCulture,
    InvariantCultureIgnoreCase,
    Ordinal,
    OrdinalIgnoreCase,
}

///
/// HostObject
///
/// Host-side object reachable from a filter: a closure environment or any
/// captured value whose members the constant evaluator may read.
///

pub trait HostObject: fmt::Debug {
    fn type_name(&self) -> &str;

    fn member(&self, name: &str) -> Option<HostValue>;
}

///
/// HostValue
/// Value produced by constant nodes and by the constant evaluator.
///

#[derive(Clone, Debug)]
pub enum HostValue {
    Literal(Literal),
    Comparison(StringComparison),
    Object(Rc<dyn HostObject>),
}

impl HostValue {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Literal(literal) => literal.kind_label(),
            Self::Comparison(_) => "string-comparison",
            Self::Object(_) => "host-object",
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Literal::Str(s)) => write!(f, "{s:?}"),
            Self::Literal(literal) => write!(f, "{literal:?}"),
            Self::Comparison(mode) => write!(f, "StringComparison::{mode}"),
            Self::Object(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

impl From<Literal> for HostValue {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<StringComparison> for HostValue {
    fn from(value: StringComparison) -> Self {
        Self::Comparison(value)
    }
}

macro_rules! host_value_from_literal {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl From<$ty> for HostValue {
                fn from(value: $ty) -> Self {
                    Self::Literal(Literal::from(value))
                }
            }
        )*
    };
}

host_value_from_literal!(bool, char, i32, i64, f32, f64, &str, String, Timestamp, Vec<u8>, RecordRef);

///
/// StaticRegistry
/// Values of static members the host exposes to filters.
///

#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    members: BTreeMap<(String, String), HostValue>,
}

impl StaticRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        owner: impl Into<String>,
        member: impl Into<String>,
        value: impl Into<HostValue>,
    ) {
        self.members
            .insert((owner.into(), member.into()), value.into());
    }

    #[must_use]
    pub fn get(&self, owner: &str, member: &str) -> Option<&HostValue> {
        self.members.get(&(owner.to_string(), member.to_string()))
    }
}
