use crate::{text, value::StoredValue};
use std::{cmp::Ordering, collections::BTreeMap, mem};
use tabula_core::{
    model::ColumnIndex,
    native::{CompareOp, NativeError, Opcode, Operand},
};

pub(crate) type Row = BTreeMap<ColumnIndex, StoredValue>;

pub(crate) static NULL: StoredValue = StoredValue::Null;

/// Cell at `column`, or null when the row never stored one.
pub(crate) fn cell(row: &Row, column: ColumnIndex) -> &StoredValue {
    row.get(&column).unwrap_or(&NULL)
}

///
/// Predicate
///
/// Boolean tree rebuilt from a flat query-builder opcode stream. Terms in
/// one group are conjoined, `or` splits the group into disjuncts, and `not`
/// negates the next term or group.
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Predicate {
    All(Vec<Self>),
    Any(Vec<Self>),
    Not(Box<Self>),
    Term(Opcode),
}

impl Predicate {
    pub(crate) fn compile(opcodes: &[Opcode]) -> Result<Self, NativeError> {
        let mut stack = vec![Frame::new(false)];

        for opcode in opcodes {
            let top = stack.last_mut().ok_or(NativeError::UnbalancedGroup)?;

            match opcode {
                Opcode::GroupBegin => {
                    let negated = mem::take(&mut top.pending_not);
                    stack.push(Frame::new(negated));
                }
                Opcode::GroupEnd => {
                    let frame = stack.pop().ok_or(NativeError::UnbalancedGroup)?;
                    let parent = stack.last_mut().ok_or(NativeError::UnbalancedGroup)?;
                    let negated = frame.negated;
                    let group = frame.close()?;

                    parent.push(if negated {
                        Self::Not(Box::new(group))
                    } else {
                        group
                    });
                }
                Opcode::Or => top.split()?,
                Opcode::Not => top.pending_not = !top.pending_not,
                term => top.push(Self::Term(term.clone())),
            }
        }

        let root = stack.pop().ok_or(NativeError::UnbalancedGroup)?;
        if !stack.is_empty() {
            return Err(NativeError::UnbalancedGroup);
        }

        root.close()
    }

    pub(crate) fn eval(&self, row: &Row) -> bool {
        match self {
            Self::All(children) => children.iter().all(|child| child.eval(row)),
            Self::Any(children) => children.iter().any(|child| child.eval(row)),
            Self::Not(inner) => !inner.eval(row),
            Self::Term(opcode) => eval_term(opcode, row),
        }
    }
}

///
/// Frame
/// One open group while compiling.
///

struct Frame {
    disjuncts: Vec<Predicate>,
    current: Vec<Predicate>,
    pending_not: bool,
    negated: bool,
}

impl Frame {
    const fn new(negated: bool) -> Self {
        Self {
            disjuncts: Vec::new(),
            current: Vec::new(),
            pending_not: false,
            negated,
        }
    }

    fn push(&mut self, term: Predicate) {
        let term = if mem::take(&mut self.pending_not) {
            Predicate::Not(Box::new(term))
        } else {
            term
        };
        self.current.push(term);
    }

    fn split(&mut self) -> Result<(), NativeError> {
        if self.current.is_empty() || self.pending_not {
            return Err(NativeError::Engine("'or' has no left operand".into()));
        }
        self.disjuncts
            .push(Predicate::All(mem::take(&mut self.current)));

        Ok(())
    }

    fn close(mut self) -> Result<Predicate, NativeError> {
        if self.pending_not {
            return Err(NativeError::Engine("'not' has no operand".into()));
        }
        if self.disjuncts.is_empty() {
            return Ok(Predicate::All(self.current));
        }
        if self.current.is_empty() {
            return Err(NativeError::Engine("'or' has no right operand".into()));
        }
        self.disjuncts.push(Predicate::All(self.current));

        Ok(Predicate::Any(self.disjuncts))
    }
}

fn eval_term(opcode: &Opcode, row: &Row) -> bool {
    match opcode {
        Opcode::Compare {
            column,
            op,
            operand,
        } => compare(cell(row, *column), *op, operand),
        Opcode::String {
            column,
            op,
            pattern,
            case_sensitive,
        } => text::string_matches(
            *op,
            cell(row, *column).as_str(),
            pattern.as_deref(),
            *case_sensitive,
        ),
        Opcode::FullText { column, terms } => cell(row, *column)
            .as_str()
            .is_some_and(|value| text::full_text(value, terms)),
        Opcode::GroupBegin | Opcode::GroupEnd | Opcode::Or | Opcode::Not => false,
    }
}

// Null only equals null. A non-null operand against a null cell satisfies
// `neq` and nothing else. Mismatched variants never match.
fn compare(value: &StoredValue, op: CompareOp, operand: &Operand) -> bool {
    match (operand, value) {
        (Operand::Null, value) => equality(op, value.is_null()),
        (_, StoredValue::Null) => op == CompareOp::Ne,
        (Operand::EmptyBinary, StoredValue::Data(data)) => equality(op, data.is_empty()),
        (Operand::Binary(bytes), StoredValue::Data(data)) => equality(op, data == bytes),
        (Operand::Object(row), StoredValue::Link(link)) => equality(op, link == row),
        (Operand::Bool(b), StoredValue::Bool(v)) => ordering(op, v.cmp(b)),
        (Operand::Long(n), StoredValue::Bool(v)) => ordering(op, i64::from(*v).cmp(n)),
        (Operand::Int(n), StoredValue::Int(v)) => ordering(op, v.cmp(&i64::from(*n))),
        (Operand::Long(n), StoredValue::Int(v)) => ordering(op, v.cmp(n)),
        (Operand::Float(f), StoredValue::Float(v)) => partial(op, v.partial_cmp(f)),
        (Operand::Double(f), StoredValue::Double(v)) => partial(op, v.partial_cmp(f)),
        (Operand::Timestamp(t), StoredValue::Timestamp(v)) => ordering(op, v.cmp(t)),
        (
            Operand::String {
                value: pattern,
                case_sensitive,
            },
            StoredValue::String(v),
        ) => ordering(
            op,
            text::fold(v, *case_sensitive).cmp(&text::fold(pattern, *case_sensitive)),
        ),
        _ => false,
    }
}

const fn equality(op: CompareOp, equal: bool) -> bool {
    match op {
        CompareOp::Eq => equal,
        CompareOp::Ne => !equal,
        _ => false,
    }
}

fn ordering(op: CompareOp, ord: Ordering) -> bool {
    match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Ne => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Lte => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Gte => ord != Ordering::Less,
    }
}

// NaN compares unequal to everything.
fn partial(op: CompareOp, ord: Option<Ordering>) -> bool {
    ord.map_or(op == CompareOp::Ne, |ord| ordering(op, ord))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(column: u32, value: i64) -> Opcode {
        Opcode::Compare {
            column: ColumnIndex(column),
            op: CompareOp::Eq,
            operand: Operand::Long(value),
        }
    }

    fn row(values: &[i64]) -> Row {
        values
            .iter()
            .zip(0..)
            .map(|(v, c)| (ColumnIndex(c), StoredValue::Int(*v)))
            .collect()
    }

    #[test]
    fn adjacent_terms_are_conjoined() {
        let p = Predicate::compile(&[eq(0, 1), eq(1, 2)]).unwrap();

        assert!(p.eval(&row(&[1, 2])));
        assert!(!p.eval(&row(&[1, 3])));
    }

    #[test]
    fn or_binds_looser_than_and() {
        // a b or c  ==  (a && b) || c
        let p = Predicate::compile(&[eq(0, 1), eq(1, 1), Opcode::Or, eq(2, 1)]).unwrap();

        assert!(p.eval(&row(&[1, 1, 0])));
        assert!(p.eval(&row(&[0, 0, 1])));
        assert!(!p.eval(&row(&[1, 0, 0])));
    }

    #[test]
    fn not_applies_to_next_group() {
        let p = Predicate::compile(&[
            Opcode::Not,
            Opcode::GroupBegin,
            eq(0, 1),
            Opcode::Or,
            eq(1, 1),
            Opcode::GroupEnd,
            eq(2, 1),
        ])
        .unwrap();

        assert!(p.eval(&row(&[0, 0, 1])));
        assert!(!p.eval(&row(&[1, 0, 1])));
        assert!(!p.eval(&row(&[0, 0, 0])));
    }

    #[test]
    fn empty_program_matches_everything() {
        let p = Predicate::compile(&[]).unwrap();

        assert!(p.eval(&row(&[])));
    }

    #[test]
    fn malformed_streams_are_rejected() {
        assert_eq!(
            Predicate::compile(&[Opcode::GroupBegin, eq(0, 1)]),
            Err(NativeError::UnbalancedGroup)
        );
        assert_eq!(
            Predicate::compile(&[eq(0, 1), Opcode::GroupEnd]),
            Err(NativeError::UnbalancedGroup)
        );
        assert!(Predicate::compile(&[Opcode::Or, eq(0, 1)]).is_err());
        assert!(Predicate::compile(&[eq(0, 1), Opcode::Or]).is_err());
        assert!(Predicate::compile(&[eq(0, 1), Opcode::Not]).is_err());
    }

    #[test]
    fn null_cells_only_satisfy_not_equal() {
        let empty = Row::new();
        let cmp = |op| Opcode::Compare {
            column: ColumnIndex(0),
            op,
            operand: Operand::Long(1),
        };

        assert!(eval_term(&cmp(CompareOp::Ne), &empty));
        assert!(!eval_term(&cmp(CompareOp::Eq), &empty));
        assert!(!eval_term(&cmp(CompareOp::Lt), &empty));
        assert!(!eval_term(&cmp(CompareOp::Gte), &empty));
    }

    #[test]
    fn empty_binary_is_not_null() {
        let null = Row::new();
        let empty: Row = [(ColumnIndex(0), StoredValue::Data(Vec::new()))].into();
        let is_null = Opcode::Compare {
            column: ColumnIndex(0),
            op: CompareOp::Eq,
            operand: Operand::Null,
        };
        let is_empty = Opcode::Compare {
            column: ColumnIndex(0),
            op: CompareOp::Eq,
            operand: Operand::EmptyBinary,
        };

        assert!(eval_term(&is_null, &null));
        assert!(!eval_term(&is_null, &empty));
        assert!(eval_term(&is_empty, &empty));
        assert!(!eval_term(&is_empty, &null));
    }
}
