use crate::{
    error::{InternalError, QueryError},
    native::{NativeStore, QueryHandle, ResultsHandle, SortHandle},
    value::RecordRef,
};

///
/// ResultsView
///
/// Materialized, possibly sorted, index-addressable match set. Owns the
/// native results handle together with the query and sort handles it was
/// built from; all three are released when the view is dropped.
///

pub struct ResultsView<'s, S: NativeStore + ?Sized> {
    // Field order is release order.
    results: ResultsHandle<'s, S>,
    _sort: Option<SortHandle<'s, S>>,
    _query: QueryHandle<'s, S>,
    table: String,
    len: usize,
}

impl<'s, S: NativeStore + ?Sized> ResultsView<'s, S> {
    pub(crate) fn new(
        table: String,
        results: ResultsHandle<'s, S>,
        sort: Option<SortHandle<'s, S>>,
        query: QueryHandle<'s, S>,
    ) -> Result<Self, QueryError> {
        let len = results.count()?;

        Ok(Self {
            results,
            _sort: sort,
            _query: query,
            table,
            len,
        })
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Row count captured when the view was materialized.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Record at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Result<Option<RecordRef>, QueryError> {
        if index >= self.len {
            return Ok(None);
        }

        match self.results.get(index)? {
            Some(row) => Ok(Some(RecordRef::new(self.table.clone(), row))),
            None => Err(InternalError::executor_invariant(format!(
                "results view for '{}' reported {} rows but has no row at {index}",
                self.table, self.len
            ))
            .into()),
        }
    }

    pub fn first(&self) -> Result<Option<RecordRef>, QueryError> {
        self.get(0)
    }

    pub fn last(&self) -> Result<Option<RecordRef>, QueryError> {
        match self.len.checked_sub(1) {
            Some(index) => self.get(index),
            None => Ok(None),
        }
    }

    #[must_use]
    pub const fn iter(&self) -> ResultsIter<'_, 's, S> {
        ResultsIter {
            view: self,
            next: 0,
        }
    }

    /// Collect every record in view order.
    pub fn to_vec(&self) -> Result<Vec<RecordRef>, QueryError> {
        self.iter().collect()
    }

    /// Release the view and its handles now.
    pub fn close(self) {
        drop(self);
    }
}

impl<'v, 's, S: NativeStore + ?Sized> IntoIterator for &'v ResultsView<'s, S> {
    type Item = Result<RecordRef, QueryError>;
    type IntoIter = ResultsIter<'v, 's, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

///
/// ResultsIter
///

pub struct ResultsIter<'v, 's, S: NativeStore + ?Sized> {
    view: &'v ResultsView<'s, S>,
    next: usize,
}

impl<S: NativeStore + ?Sized> Iterator for ResultsIter<'_, '_, S> {
    type Item = Result<RecordRef, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        if index >= self.view.len {
            return None;
        }
        self.next += 1;

        self.view.get(index).transpose()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.view.len.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}
