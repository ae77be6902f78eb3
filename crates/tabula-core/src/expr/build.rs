use crate::{
    expr::{BinaryOp, Expr, HostObject, HostValue, Method, StringComparison},
    value::{Literal, RecordRef, Timestamp},
};
use std::{
    ops::{BitAnd, BitOr, Not},
    rc::Rc,
};

/// The iterated record.
#[must_use]
pub const fn param() -> Expr {
    Expr::Param
}

/// Direct member of the iterated record (`x.name`).
#[must_use]
pub fn field(name: impl Into<String>) -> Expr {
    param().member(name)
}

/// Constant node.
#[must_use]
pub fn lit(value: impl Into<HostValue>) -> Expr {
    Expr::Const(value.into())
}

/// Constant null.
#[must_use]
pub const fn null() -> Expr {
    Expr::Const(HostValue::Literal(Literal::Null))
}

/// Captured host object, typically a closure environment.
#[must_use]
pub fn object(value: impl HostObject + 'static) -> Expr {
    Expr::Const(HostValue::Object(Rc::new(value)))
}

/// Read of a registered static member.
#[must_use]
pub fn static_member(owner: impl Into<String>, member: impl Into<String>) -> Expr {
    Expr::Static {
        owner: owner.into(),
        member: member.into(),
    }
}

/// Static `IsNullOrEmpty(value)`.
#[must_use]
pub fn is_null_or_empty(value: Expr) -> Expr {
    Expr::Call {
        method: Method::IsNullOrEmpty,
        receiver: None,
        args: vec![value],
    }
}

/// Static `Equals(left, right, mode?)`.
#[must_use]
pub fn string_equals(
    left: impl Into<Expr>,
    right: impl Into<Expr>,
    mode: Option<StringComparison>,
) -> Expr {
    let mut args = vec![left.into(), right.into()];
    args.extend(mode.map(lit));

    Expr::Call {
        method: Method::Equals,
        receiver: None,
        args,
    }
}

impl Expr {
    #[must_use]
    pub fn member(self, name: impl Into<String>) -> Self {
        Self::Member {
            target: Box::new(self),
            member: name.into(),
        }
    }

    /// Wrap in an implicit conversion node.
    #[must_use]
    pub fn convert(self) -> Self {
        Self::Convert(Box::new(self))
    }

    fn binary(self, op: BinaryOp, rhs: impl Into<Self>) -> Self {
        Self::Binary {
            op,
            left: Box::new(self),
            right: Box::new(rhs.into()),
        }
    }

    fn method(self, method: Method, args: Vec<Self>) -> Self {
        Self::Call {
            method,
            receiver: Some(Box::new(self)),
            args,
        }
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    #[must_use]
    pub fn eq(self, rhs: impl Into<Self>) -> Self {
        self.binary(BinaryOp::Eq, rhs)
    }

    #[must_use]
    pub fn ne(self, rhs: impl Into<Self>) -> Self {
        self.binary(BinaryOp::Ne, rhs)
    }

    #[must_use]
    pub fn lt(self, rhs: impl Into<Self>) -> Self {
        self.binary(BinaryOp::Lt, rhs)
    }

    #[must_use]
    pub fn lte(self, rhs: impl Into<Self>) -> Self {
        self.binary(BinaryOp::Lte, rhs)
    }

    #[must_use]
    pub fn gt(self, rhs: impl Into<Self>) -> Self {
        self.binary(BinaryOp::Gt, rhs)
    }

    #[must_use]
    pub fn gte(self, rhs: impl Into<Self>) -> Self {
        self.binary(BinaryOp::Gte, rhs)
    }

    // ------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------

    #[must_use]
    pub fn and(self, rhs: Self) -> Self {
        self.binary(BinaryOp::AndAlso, rhs)
    }

    #[must_use]
    pub fn or(self, rhs: Self) -> Self {
        self.binary(BinaryOp::OrElse, rhs)
    }

    // ------------------------------------------------------------------
    // String predicates
    // ------------------------------------------------------------------

    #[must_use]
    pub fn contains(self, pattern: impl Into<Self>) -> Self {
        self.method(Method::Contains, vec![pattern.into()])
    }

    #[must_use]
    pub fn contains_using(self, pattern: impl Into<Self>, mode: StringComparison) -> Self {
        self.method(Method::Contains, vec![pattern.into(), lit(mode)])
    }

    #[must_use]
    pub fn starts_with(self, pattern: impl Into<Self>) -> Self {
        self.method(Method::StartsWith, vec![pattern.into()])
    }

    #[must_use]
    pub fn starts_with_using(self, pattern: impl Into<Self>, mode: StringComparison) -> Self {
        self.method(Method::StartsWith, vec![pattern.into(), lit(mode)])
    }

    #[must_use]
    pub fn ends_with(self, pattern: impl Into<Self>) -> Self {
        self.method(Method::EndsWith, vec![pattern.into()])
    }

    #[must_use]
    pub fn ends_with_using(self, pattern: impl Into<Self>, mode: StringComparison) -> Self {
        self.method(Method::EndsWith, vec![pattern.into(), lit(mode)])
    }

    /// Wildcard match (`*` any run, `?` one character); case-sensitive.
    #[must_use]
    pub fn like(self, pattern: impl Into<Self>) -> Self {
        self.method(Method::Like, vec![pattern.into()])
    }

    #[must_use]
    pub fn like_using(self, pattern: impl Into<Self>, case_sensitive: bool) -> Self {
        self.method(Method::Like, vec![pattern.into(), lit(case_sensitive)])
    }

    #[must_use]
    pub fn full_text_search(self, terms: impl Into<Self>) -> Self {
        self.method(Method::FullTextSearch, vec![terms.into()])
    }

    #[must_use]
    pub fn equals(self, value: impl Into<Self>) -> Self {
        self.method(Method::Equals, vec![value.into()])
    }

    #[must_use]
    pub fn equals_using(self, value: impl Into<Self>, mode: StringComparison) -> Self {
        self.method(Method::Equals, vec![value.into(), lit(mode)])
    }

    /// Arbitrary instance call; the translator rejects anything it does not
    /// recognise.
    #[must_use]
    pub fn call(self, name: impl Into<String>, args: Vec<Self>) -> Self {
        self.method(Method::Other(name.into()), args)
    }
}

impl Not for Expr {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

impl BitAnd for Expr {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and(rhs)
    }
}

impl BitOr for Expr {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or(rhs)
    }
}

macro_rules! expr_from_const {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Self::Const(HostValue::from(value))
                }
            }
        )*
    };
}

expr_from_const!(
    bool,
    char,
    i32,
    i64,
    f32,
    f64,
    &str,
    String,
    Timestamp,
    Vec<u8>,
    RecordRef,
    Literal,
    StringComparison,
);

impl From<HostValue> for Expr {
    fn from(value: HostValue) -> Self {
        Self::Const(value)
    }
}
