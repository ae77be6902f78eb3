use crate::{
    error::QueryError,
    expr::{BinaryOp, Expr, HostValue, Method, StringComparison},
    model::{PropertyInfo, ScalarKind},
    native::{CompareOp, Opcode, Operand, StringOp},
    translate::{ConstantEvaluator, PredicateSink, TranslateContext},
    value::Literal,
};

///
/// ResolvedProperty
/// Direct persisted property of the iterated type.
///

struct ResolvedProperty<'e> {
    name: &'e str,
    info: PropertyInfo,
}

///
/// PredicateTranslator
///
/// Structural visitor over one filter expression. Emission mirrors the boolean
/// shape of the graph exactly: AND is implicit, OR is grouped, NOT prefixes
/// the next predicate or group.
///

pub struct PredicateTranslator<'a> {
    ctx: TranslateContext<'a>,
    constants: ConstantEvaluator<'a>,
}

impl<'a> PredicateTranslator<'a> {
    #[must_use]
    pub const fn new(ctx: TranslateContext<'a>) -> Self {
        Self {
            ctx,
            constants: ConstantEvaluator::new(ctx.statics),
        }
    }

    pub fn translate<K>(&self, expr: &Expr, sink: &mut K) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        match expr.unwrap_convert() {
            Expr::Binary {
                op: BinaryOp::AndAlso,
                left,
                right,
            } => {
                self.translate(left, sink)?;
                self.translate(right, sink)
            }
            Expr::Binary {
                op: BinaryOp::OrElse,
                left,
                right,
            } => {
                sink.emit(Opcode::GroupBegin)?;
                self.translate(left, sink)?;
                sink.emit(Opcode::Or)?;
                self.translate(right, sink)?;
                sink.emit(Opcode::GroupEnd)
            }
            Expr::Binary { op, left, right } => {
                let op = compare_op(*op)?;
                self.comparison(op, left, right, sink)
            }
            Expr::Not(inner) => self.negation(inner, sink),
            Expr::Call {
                method,
                receiver,
                args,
            } => self.call(method, receiver.as_deref(), args, sink),
            member @ Expr::Member { .. } => self.bare_bool(member, sink),
            other => Err(QueryError::unsupported(format!(
                "{other} is not a predicate"
            ))),
        }
    }

    // Negation binds to the next predicate or group; a conjunction emits
    // several predicates, so it is wrapped to stay under one `Not`.
    fn negation<K>(&self, inner: &Expr, sink: &mut K) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        sink.emit(Opcode::Not)?;

        if matches!(
            inner.unwrap_convert(),
            Expr::Binary {
                op: BinaryOp::AndAlso,
                ..
            }
        ) {
            sink.emit(Opcode::GroupBegin)?;
            self.translate(inner, sink)?;
            sink.emit(Opcode::GroupEnd)
        } else {
            self.translate(inner, sink)
        }
    }

    fn bare_bool<K>(&self, expr: &Expr, sink: &mut K) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        let property = self.resolve_target(expr)?;
        if property.info.kind != ScalarKind::Bool {
            return Err(QueryError::unsupported(format!(
                "{expr} is a {} property, not a predicate",
                property.info.kind
            )));
        }

        sink.emit(Opcode::Compare {
            column: property.info.column,
            op: CompareOp::Eq,
            operand: Operand::Bool(true),
        })
    }

    // ------------------------------------------------------------------
    // Comparisons
    // ------------------------------------------------------------------

    fn comparison<K>(
        &self,
        op: CompareOp,
        left: &Expr,
        right: &Expr,
        sink: &mut K,
    ) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        let (left, right) = (left.unwrap_convert(), right.unwrap_convert());

        // `5 < x.Age` is `x.Age > 5`.
        let (target, value, op) = if left.references_param() {
            (left, right, op)
        } else if right.references_param() {
            (right, left, op.mirror())
        } else {
            return Err(QueryError::unsupported(format!(
                "({left} {op} {right}) does not reference the iterated record"
            )));
        };

        let property = self.resolve_target(target)?;
        let literal = self.constants.evaluate_literal(value)?;
        self.check_compatible(&property, &literal)?;

        let column = property.info.column;
        let operand = match literal {
            Literal::Null if op.is_equality() => Operand::Null,
            Literal::Null => {
                return Err(QueryError::unsupported(format!(
                    "ordering comparison '{op}' against null on '{}'",
                    property.name
                )));
            }
            Literal::Bool(b) if op.is_equality() => Operand::Bool(b),
            Literal::Bool(b) => Operand::Long(i64::from(b)),
            Literal::Char(c) => Operand::Long(i64::from(u32::from(c))),
            Literal::I32(v) => Operand::Int(v),
            Literal::I64(v) => Operand::Long(v),
            Literal::F32(v) => Operand::Float(v),
            Literal::F64(v) => Operand::Double(v),
            Literal::Str(value) => Operand::String {
                value,
                case_sensitive: true,
            },
            Literal::Timestamp(ts) => Operand::Timestamp(ts),
            Literal::Bytes(_) | Literal::Object(_) if !op.is_equality() => {
                return Err(QueryError::unsupported(format!(
                    "ordering comparison '{op}' on {} property '{}'",
                    property.info.kind, property.name
                )));
            }
            Literal::Bytes(bytes) if bytes.is_empty() => Operand::EmptyBinary,
            Literal::Bytes(bytes) => Operand::Binary(bytes),
            Literal::Object(record) => {
                // Identity inequality is the negation of identity equality.
                if op == CompareOp::Ne {
                    sink.emit(Opcode::Not)?;
                }

                return sink.emit(Opcode::Compare {
                    column,
                    op: CompareOp::Eq,
                    operand: Operand::Object(record.row),
                });
            }
        };

        sink.emit(Opcode::Compare {
            column,
            op,
            operand,
        })
    }

    // ------------------------------------------------------------------
    // Method calls
    // ------------------------------------------------------------------

    fn call<K>(
        &self,
        method: &Method,
        receiver: Option<&Expr>,
        args: &[Expr],
        sink: &mut K,
    ) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        match (method, receiver) {
            (Method::Contains | Method::StartsWith | Method::EndsWith | Method::Like, Some(recv)) => {
                self.string_pattern(method, recv, args, sink)
            }
            (Method::Equals, Some(recv)) => self.string_equals(recv, args, sink),
            (Method::Equals, None) => match args {
                [a, b, rest @ ..] if a.references_param() => {
                    self.string_equals(a, &with_rest(b, rest), sink)
                }
                [a, b, rest @ ..] => self.string_equals(b, &with_rest(a, rest), sink),
                _ => Err(QueryError::unsupported(
                    "static Equals requires two arguments",
                )),
            },
            (Method::FullTextSearch, Some(recv)) => self.full_text(recv, args, sink),
            (Method::IsNullOrEmpty, None) => match args {
                [value] => self.null_or_empty(value, sink),
                _ => Err(QueryError::unsupported(
                    "IsNullOrEmpty requires exactly one argument",
                )),
            },
            (Method::Other(name), _) => Err(QueryError::unsupported(format!(
                "method '{name}' is not supported in a filter"
            ))),
            (method, _) => Err(QueryError::unsupported(format!(
                "'{method}' called in an unsupported form"
            ))),
        }
    }

    fn string_pattern<K>(
        &self,
        method: &Method,
        receiver: &Expr,
        args: &[Expr],
        sink: &mut K,
    ) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        let op = match method {
            Method::Contains => StringOp::Contains,
            Method::StartsWith => StringOp::StartsWith,
            Method::EndsWith => StringOp::EndsWith,
            _ => StringOp::Like,
        };

        let property = self.resolve_string_target(receiver, method)?;
        let (pattern, flag) = match args {
            [pattern] => (pattern, None),
            [pattern, flag] => (pattern, Some(flag)),
            _ => {
                return Err(QueryError::unsupported(format!(
                    "'{method}' takes a pattern and an optional case flag"
                )));
            }
        };

        let pattern = self.string_argument(&property, pattern)?;
        let case_sensitive = match (op, flag) {
            (_, None) => true,
            (StringOp::Like, Some(flag)) => self.like_flag(flag)?,
            (_, Some(flag)) => self.comparison_flag(flag)?,
        };

        sink.emit(Opcode::String {
            column: property.info.column,
            op,
            pattern,
            case_sensitive,
        })
    }

    fn string_equals<K>(&self, receiver: &Expr, args: &[Expr], sink: &mut K) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        let property = self.resolve_string_target(receiver, &Method::Equals)?;
        let (value, flag) = match args {
            [value] => (value, None),
            [value, flag] => (value, Some(flag)),
            _ => {
                return Err(QueryError::unsupported(
                    "'Equals' takes a value and an optional comparison mode",
                ));
            }
        };

        let case_sensitive = flag.map_or(Ok(true), |flag| self.comparison_flag(flag))?;
        let literal = self.constants.evaluate_literal(value)?;
        self.check_compatible(&property, &literal)?;

        let operand = match literal {
            Literal::Null => Operand::Null,
            Literal::Str(value) => Operand::String {
                value,
                case_sensitive,
            },
            other => {
                return Err(type_mismatch(&property, other.kind_label()));
            }
        };

        sink.emit(Opcode::Compare {
            column: property.info.column,
            op: CompareOp::Eq,
            operand,
        })
    }

    fn full_text<K>(&self, receiver: &Expr, args: &[Expr], sink: &mut K) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        let property = self.resolve_string_target(receiver, &Method::FullTextSearch)?;
        let [terms] = args else {
            return Err(QueryError::unsupported(
                "'FullTextSearch' takes exactly one argument",
            ));
        };
        let Some(terms) = self.string_argument(&property, terms)? else {
            return Err(QueryError::unsupported(format!(
                "'{}' with a null argument on '{}'",
                Method::FullTextSearch,
                property.name
            )));
        };

        sink.emit(Opcode::FullText {
            column: property.info.column,
            terms,
        })
    }

    fn null_or_empty<K>(&self, value: &Expr, sink: &mut K) -> Result<(), QueryError>
    where
        K: PredicateSink + ?Sized,
    {
        let property = self.resolve_string_target(value, &Method::IsNullOrEmpty)?;
        let column = property.info.column;

        sink.emit(Opcode::GroupBegin)?;
        sink.emit(Opcode::Compare {
            column,
            op: CompareOp::Eq,
            operand: Operand::Null,
        })?;
        sink.emit(Opcode::Or)?;
        sink.emit(Opcode::Compare {
            column,
            op: CompareOp::Eq,
            operand: Operand::String {
                value: String::new(),
                case_sensitive: true,
            },
        })?;
        sink.emit(Opcode::GroupEnd)
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    fn resolve_target<'e>(&self, expr: &'e Expr) -> Result<ResolvedProperty<'e>, QueryError> {
        let Some(name) = expr.direct_property() else {
            return Err(QueryError::invalid_target(
                expr.to_string(),
                format!("not a direct property of '{}'", self.ctx.table),
            ));
        };

        let info = self
            .ctx
            .schema
            .try_find_property(self.ctx.table, name)
            .ok_or_else(|| {
                QueryError::invalid_target(
                    name,
                    format!("no persisted property on '{}'", self.ctx.table),
                )
            })?;

        if info.is_collection() {
            return Err(QueryError::invalid_target(
                name,
                format!("{} collections cannot be compared", info.collection),
            ));
        }

        Ok(ResolvedProperty { name, info })
    }

    fn resolve_string_target<'e>(
        &self,
        expr: &'e Expr,
        method: &Method,
    ) -> Result<ResolvedProperty<'e>, QueryError> {
        if !expr.references_param() {
            return Err(QueryError::unsupported(format!(
                "'{method}' must be called on a property of the iterated record, found {expr}"
            )));
        }

        let property = self.resolve_target(expr)?;
        if property.info.kind != ScalarKind::String {
            return Err(QueryError::TypeMismatch {
                property: property.name.to_string(),
                expected: format!("{} property for '{method}'", ScalarKind::String),
                found: property.info.kind.label(),
            });
        }

        Ok(property)
    }

    // `None` for a null comparand.
    fn string_argument(
        &self,
        property: &ResolvedProperty<'_>,
        arg: &Expr,
    ) -> Result<Option<String>, QueryError> {
        match self.constants.evaluate_literal(arg)? {
            Literal::Str(value) => Ok(Some(value)),
            Literal::Null => Ok(None),
            other => Err(type_mismatch(property, other.kind_label())),
        }
    }

    fn comparison_flag(&self, flag: &Expr) -> Result<bool, QueryError> {
        match self.constants.evaluate(flag)? {
            HostValue::Comparison(StringComparison::Ordinal) => Ok(true),
            HostValue::Comparison(StringComparison::OrdinalIgnoreCase) => Ok(false),
            HostValue::Comparison(mode) => Err(QueryError::unsupported(format!(
                "string comparison mode {mode}; only Ordinal and OrdinalIgnoreCase are supported"
            ))),
            other => Err(QueryError::unsupported(format!(
                "a {} where a string comparison mode is required",
                other.label()
            ))),
        }
    }

    fn like_flag(&self, flag: &Expr) -> Result<bool, QueryError> {
        match self.constants.evaluate_literal(flag)? {
            Literal::Bool(case_sensitive) => Ok(case_sensitive),
            other => Err(QueryError::unsupported(format!(
                "a {} where Like expects a case-sensitivity flag",
                other.kind_label()
            ))),
        }
    }

    fn check_compatible(
        &self,
        property: &ResolvedProperty<'_>,
        literal: &Literal,
    ) -> Result<(), QueryError> {
        if literal.is_compatible_with(&property.info, self.ctx.config.char_int_compat) {
            Ok(())
        } else {
            Err(type_mismatch(property, literal.kind_label()))
        }
    }
}

fn compare_op(op: BinaryOp) -> Result<CompareOp, QueryError> {
    match op {
        BinaryOp::Eq => Ok(CompareOp::Eq),
        BinaryOp::Ne => Ok(CompareOp::Ne),
        BinaryOp::Lt => Ok(CompareOp::Lt),
        BinaryOp::Lte => Ok(CompareOp::Lte),
        BinaryOp::Gt => Ok(CompareOp::Gt),
        BinaryOp::Gte => Ok(CompareOp::Gte),
        BinaryOp::AndAlso | BinaryOp::OrElse => Err(QueryError::unsupported(format!(
            "'{op}' is not a comparison operator"
        ))),
    }
}

fn with_rest(value: &Expr, rest: &[Expr]) -> Vec<Expr> {
    std::iter::once(value).chain(rest).cloned().collect()
}

fn type_mismatch(property: &ResolvedProperty<'_>, found: &'static str) -> QueryError {
    let info = &property.info;
    let mut expected = match &info.linked_type {
        Some(target) => format!("{}<{target}>", info.kind),
        None => info.kind.to_string(),
    };
    if info.nullable {
        expected.push_str(" or null");
    }

    QueryError::TypeMismatch {
        property: property.name.to_string(),
        expected,
        found,
    }
}
