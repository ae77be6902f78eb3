use crate::{
    config::LastStrategy,
    error::QueryError,
    executor::{Executor, Terminal, TerminalOutput},
    native::{NativeStore, QueryHandle},
    value::{RecordRef, RowKey},
};

pub(super) fn reduce<S>(
    exec: &Executor<'_, '_, S>,
    terminal: Terminal,
) -> Result<TerminalOutput, QueryError>
where
    S: NativeStore + ?Sized,
{
    let table = &exec.plan.table;

    match terminal {
        Terminal::Count => {
            let query = exec.open_query()?;
            Ok(TerminalOutput::Count(query.count()?))
        }
        Terminal::Any => {
            let query = exec.open_query()?;
            Ok(TerminalOutput::Any(query.find_direct(None)?.is_some()))
        }
        Terminal::First { or_default } => {
            let found = first(exec)?;
            or_empty(exec, found, or_default)
        }
        Terminal::Single { or_default } => {
            let found = single(exec)?;
            or_empty(exec, found, or_default)
        }
        Terminal::Last { or_default } => {
            let found = last(exec)?;
            or_empty(exec, found, or_default)
        }
        Terminal::ElementAt { index, or_default } => match element_at(exec, index)? {
            Some(record) => Ok(TerminalOutput::Record(Some(record))),
            None if or_default => Ok(TerminalOutput::Record(None)),
            None => Err(QueryError::IndexOutOfRange {
                table: table.clone(),
                index,
            }),
        },
    }
}

fn or_empty<S>(
    exec: &Executor<'_, '_, S>,
    found: Option<RecordRef>,
    or_default: bool,
) -> Result<TerminalOutput, QueryError>
where
    S: NativeStore + ?Sized,
{
    match found {
        Some(record) => Ok(TerminalOutput::Record(Some(record))),
        None if or_default => Ok(TerminalOutput::Record(None)),
        None => Err(QueryError::SequenceEmpty {
            table: exec.plan.table.clone(),
        }),
    }
}

// Unsorted reads go straight to the builder; sorted reads need the view.
fn first<S>(exec: &Executor<'_, '_, S>) -> Result<Option<RecordRef>, QueryError>
where
    S: NativeStore + ?Sized,
{
    let query = exec.open_query()?;
    if exec.plan.is_sorted() {
        let sort = exec.open_sort()?;
        return exec.materialize(query, sort)?.first();
    }

    Ok(query.find_direct(None)?.map(|row| exec.record(row)))
}

fn single<S>(exec: &Executor<'_, '_, S>) -> Result<Option<RecordRef>, QueryError>
where
    S: NativeStore + ?Sized,
{
    let query = exec.open_query()?;
    let Some(first) = query.find_direct(None)? else {
        return Ok(None);
    };

    if query.find_direct(Some(first))?.is_some() {
        return Err(QueryError::SequenceHasMultipleMatches {
            table: exec.plan.table.clone(),
        });
    }

    Ok(Some(exec.record(first)))
}

fn last<S>(exec: &Executor<'_, '_, S>) -> Result<Option<RecordRef>, QueryError>
where
    S: NativeStore + ?Sized,
{
    let query = exec.open_query()?;

    match (exec.config.last_strategy, exec.plan.is_sorted()) {
        (LastStrategy::DirectScan, false) => {
            let mut tail = None;
            while let Some(row) = query.find_direct(tail)? {
                tail = Some(row);
            }

            Ok(tail.map(|row| exec.record(row)))
        }
        _ => {
            let sort = exec.open_sort()?;
            exec.materialize(query, sort)?.last()
        }
    }
}

fn element_at<S>(exec: &Executor<'_, '_, S>, index: usize) -> Result<Option<RecordRef>, QueryError>
where
    S: NativeStore + ?Sized,
{
    let query = exec.open_query()?;
    if exec.plan.is_sorted() {
        let sort = exec.open_sort()?;
        return exec.materialize(query, sort)?.get(index);
    }

    Ok(nth_direct(&query, index)?.map(|row| exec.record(row)))
}

// Walk `index + 1` matches in native order.
fn nth_direct<S>(query: &QueryHandle<'_, S>, index: usize) -> Result<Option<RowKey>, QueryError>
where
    S: NativeStore + ?Sized,
{
    let mut cursor = None;
    for _ in 0..=index {
        match query.find_direct(cursor)? {
            Some(row) => cursor = Some(row),
            None => return Ok(None),
        }
    }

    Ok(cursor)
}
