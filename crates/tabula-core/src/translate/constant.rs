use crate::{
    error::QueryError,
    expr::{Expr, HostValue, StaticRegistry},
    value::Literal,
};

///
/// ConstantEvaluator
///
/// Reduces a sub-graph that does not reference the iterated record to a single
/// host value: constants, registered statics and member chains on captured
/// host objects. Anything else bottoms out as `UnsupportedExpression`.
///

#[derive(Clone, Copy, Debug)]
pub struct ConstantEvaluator<'a> {
    statics: &'a StaticRegistry,
}

impl<'a> ConstantEvaluator<'a> {
    #[must_use]
    pub const fn new(statics: &'a StaticRegistry) -> Self {
        Self { statics }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<HostValue, QueryError> {
        match expr {
            Expr::Const(value) => Ok(value.clone()),
            Expr::Convert(inner) => self.evaluate(inner),
            Expr::Static { owner, member } => {
                self.statics.get(owner, member).cloned().ok_or_else(|| {
                    QueryError::unsupported(format!("static member {owner}::{member} is not registered"))
                })
            }
            Expr::Member { target, member } => {
                if target.references_param() {
                    return Err(QueryError::unsupported(format!(
                        "{expr} reads the iterated record where a constant is required"
                    )));
                }

                match self.evaluate(target)? {
                    HostValue::Object(object) => object.member(member).ok_or_else(|| {
                        QueryError::unsupported(format!(
                            "member '{member}' is not readable on {}",
                            object.type_name()
                        ))
                    }),
                    other => Err(QueryError::unsupported(format!(
                        "member '{member}' read on a {} constant",
                        other.label()
                    ))),
                }
            }
            Expr::Param => Err(QueryError::unsupported(
                "the iterated record where a constant is required",
            )),
            Expr::Binary { .. } | Expr::Not(_) | Expr::Call { .. } => Err(
                QueryError::unsupported(format!("{expr} is not a constant expression")),
            ),
        }
    }

    /// Evaluate and require a scalar literal.
    pub fn evaluate_literal(&self, expr: &Expr) -> Result<Literal, QueryError> {
        match self.evaluate(expr)? {
            HostValue::Literal(literal) => Ok(literal),
            other => Err(QueryError::unsupported(format!(
                "{expr} evaluates to a {} where a literal is required",
                other.label()
            ))),
        }
    }
}
