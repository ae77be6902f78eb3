use crate::{
    error::QueryError,
    expr::PropertyChain,
    model::{ColumnIndex, PropertyInfo, SchemaProvider},
};
use std::fmt;

///
/// SortOperator
/// The chaining operator that introduced one sort request.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOperator {
    OrderBy,
    OrderByDescending,
    ThenBy,
    ThenByDescending,
}

impl SortOperator {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::OrderBy => "order_by",
            Self::OrderByDescending => "order_by_descending",
            Self::ThenBy => "then_by",
            Self::ThenByDescending => "then_by_descending",
        }
    }

    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::OrderBy | Self::OrderByDescending)
    }

    #[must_use]
    pub const fn is_ascending(self) -> bool {
        matches!(self, Self::OrderBy | Self::ThenBy)
    }

    /// Secondary operator with the same direction.
    #[must_use]
    pub const fn secondary(self) -> Self {
        if self.is_ascending() {
            Self::ThenBy
        } else {
            Self::ThenByDescending
        }
    }
}

///
/// SortRequest
/// One chained ordering operation, as recorded on the query graph.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortRequest {
    pub chain: PropertyChain,
    pub operator: SortOperator,
}

impl SortRequest {
    #[must_use]
    pub fn new(chain: impl Into<PropertyChain>, operator: SortOperator) -> Self {
        Self {
            chain: chain.into(),
            operator,
        }
    }
}

///
/// SortClause
/// One resolved clause: the column path through to-one links and a direction.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortClause {
    pub chain: PropertyChain,
    pub columns: Vec<ColumnIndex>,
    pub ascending: bool,
}

impl fmt::Display for SortClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self
            .columns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        let direction = if self.ascending { "asc" } else { "desc" };

        write!(f, "{} [{columns}] {direction}", self.chain)
    }
}

///
/// SortPlan
/// Non-empty ordered clause list; the first clause is the primary key.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortPlan {
    pub clauses: Vec<SortClause>,
}

impl SortPlan {
    #[must_use]
    pub fn primary(&self) -> Option<&SortClause> {
        self.clauses.first()
    }
}

///
/// SortClauseBuilder
///
/// Accumulates ordering requests in call order. The first request must be a
/// primary ordering; every later one must be secondary.
///

pub struct SortClauseBuilder<'a> {
    schema: &'a dyn SchemaProvider,
    table: &'a str,
    clauses: Vec<SortClause>,
}

impl<'a> SortClauseBuilder<'a> {
    #[must_use]
    pub fn new(schema: &'a dyn SchemaProvider, table: &'a str) -> Self {
        Self {
            schema,
            table,
            clauses: Vec::new(),
        }
    }

    pub fn add_clause(&mut self, request: &SortRequest) -> Result<(), QueryError> {
        let operator = request.operator;

        match (operator.is_primary(), self.clauses.is_empty()) {
            (true, false) => {
                return Err(QueryError::AmbiguousSortSpecification {
                    operator: operator.label(),
                    use_instead: operator.secondary().label(),
                });
            }
            (false, true) => {
                return Err(QueryError::unsupported(format!(
                    "'{}' without a preceding order_by",
                    operator.label()
                )));
            }
            _ => {}
        }

        let columns = self.resolve_chain(&request.chain)?;

        tracing::debug!(
            table = self.table,
            chain = %request.chain,
            operator = operator.label(),
            hops = columns.len(),
            "registered sort clause"
        );

        self.clauses.push(SortClause {
            chain: request.chain.clone(),
            columns,
            ascending: operator.is_ascending(),
        });

        Ok(())
    }

    /// `None` when no ordering was requested.
    #[must_use]
    pub fn finish(self) -> Option<SortPlan> {
        (!self.clauses.is_empty()).then_some(SortPlan {
            clauses: self.clauses,
        })
    }

    // Walk the chain hop by hop; every hop but the last must be a to-one link
    // and the last must be a sortable scalar.
    fn resolve_chain(&self, chain: &PropertyChain) -> Result<Vec<ColumnIndex>, QueryError> {
        let Some((last, links)) = chain.split_last() else {
            return Err(QueryError::unsupported("sort by an empty property chain"));
        };

        let mut columns = Vec::with_capacity(chain.len());
        let mut owner = self.table.to_string();

        for hop in links {
            let info = self.lookup(&owner, hop, chain)?;
            let target = match (&info.linked_type, info.is_to_one_link()) {
                (Some(target), true) => target.clone(),
                _ => {
                    return Err(QueryError::unsupported(format!(
                        "sort chain '{chain}' crosses '{owner}.{hop}', which is not a to-one link"
                    )));
                }
            };

            columns.push(info.column);
            owner = target;
        }

        let info = self.lookup(&owner, last, chain)?;
        if info.is_collection() || !info.kind.is_sortable() {
            return Err(QueryError::unsupported(format!(
                "sort chain '{chain}' ends on '{owner}.{last}' of kind {}, which is not sortable",
                info.kind
            )));
        }
        columns.push(info.column);

        Ok(columns)
    }

    fn lookup(
        &self,
        owner: &str,
        hop: &str,
        chain: &PropertyChain,
    ) -> Result<PropertyInfo, QueryError> {
        self.schema.try_find_property(owner, hop).ok_or_else(|| {
            QueryError::unsupported(format!(
                "sort chain '{chain}' names '{hop}', which does not exist on '{owner}'"
            ))
        })
    }
}
