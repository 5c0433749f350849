//! SQL rendering and execution for declarative query intents.
//!
//! # Responsibility
//! - Turn criteria, sort and paging into `SELECT`/`COUNT`/`UPDATE` statements.
//! - Decode rows into entities or projections.
//!
//! # Invariants
//! - A page's count query uses the data query's criteria unless the caller
//!   supplies its own count criteria.
//! - The executor never touches an identity map; callers register entities.
//! - Bulk updates run straight against storage.

use crate::model::entity::{Entity, EntityField};
use crate::projection::Projection;
use crate::query::criteria::{push_join, Criteria, Sort};
use crate::query::page::{total_from_content, Page, PageRequest, Slice};
use crate::repo::crud_repo::{RepoError, RepoResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::time::Instant;

/// Column update applied by a bulk statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment<F> {
    Set(F, Value),
    Increment(F, i64),
}

/// Row window appended as `LIMIT/OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

/// Executes query intents on one connection or transaction.
pub struct QueryExecutor<'conn> {
    conn: &'conn Connection,
}

impl<'conn> QueryExecutor<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Loads full entities matching `criteria` in `sort` order.
    pub fn fetch<E: Entity>(
        &self,
        criteria: &Criteria<E::Field>,
        sort: &Sort<E::Field>,
        window: Option<Window>,
    ) -> RepoResult<Vec<E>> {
        self.fetch_with::<E, E>(&E::select_list(), &[], criteria, sort, window, |row| {
            E::from_row(row, 0)
        })
    }

    /// Loads projection `P` rows matching `criteria`.
    pub fn fetch_projection<E: Entity, P: Projection<E>>(
        &self,
        criteria: &Criteria<E::Field>,
        sort: &Sort<E::Field>,
    ) -> RepoResult<Vec<P>> {
        self.fetch_with::<E, P>(
            &P::select_list(),
            P::joins(),
            criteria,
            sort,
            None,
            |row| P::from_row(row),
        )
    }

    /// Runs a select with a custom select list and row mapper.
    ///
    /// `extra_joins` are emitted before joins required by criteria or sort.
    pub fn fetch_with<E: Entity, T>(
        &self,
        select_list: &str,
        extra_joins: &[&'static str],
        criteria: &Criteria<E::Field>,
        sort: &Sort<E::Field>,
        window: Option<Window>,
        mut map_row: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> RepoResult<Vec<T>> {
        let mut joins: Vec<&'static str> = Vec::new();
        for join in extra_joins {
            push_join(&mut joins, Some(*join));
        }
        criteria.collect_joins(&mut joins);
        sort.collect_joins(&mut joins);

        let mut binds: Vec<Value> = Vec::new();
        let mut sql = format!("SELECT {select_list} FROM {}", E::from_clause());
        for join in &joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql.push_str(&criteria.render_where(&mut binds));
        sql.push_str(&sort.render_order_by(&id_column::<E>()));
        if let Some(window) = window {
            sql.push_str(" LIMIT ? OFFSET ?");
            binds.push(Value::Integer(to_sql_integer(window.limit)?));
            binds.push(Value::Integer(to_sql_integer(window.offset)?));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(map_row(row)?);
        }
        Ok(results)
    }

    /// Counts rows matching `criteria`, joining only what the criteria need.
    pub fn count<E: Entity>(&self, criteria: &Criteria<E::Field>) -> RepoResult<u64> {
        let mut joins = Vec::new();
        criteria.collect_joins(&mut joins);

        let mut binds = Vec::new();
        let mut sql = format!("SELECT COUNT(*) FROM {}", E::from_clause());
        for join in &joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql.push_str(&criteria.render_where(&mut binds));

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    /// Loads one page and the total count.
    ///
    /// `count_criteria` replaces the data criteria for the count query; use it
    /// when the data query joins tables the count does not need.
    pub fn fetch_page<E: Entity>(
        &self,
        criteria: &Criteria<E::Field>,
        request: &PageRequest<E::Field>,
        count_criteria: Option<&Criteria<E::Field>>,
    ) -> RepoResult<Page<E>> {
        let started_at = Instant::now();
        let content = self.fetch::<E>(criteria, request.sort(), Some(page_window(request)))?;
        let total = match total_from_content(request.offset(), request.size(), content.len()) {
            Some(total) => total,
            None => self.count::<E>(count_criteria.unwrap_or(criteria))?,
        };

        debug!(
            "event=query_page module=query status=ok entity={} page={} size={} rows={} total={} duration_ms={}",
            E::NAME,
            request.page(),
            request.size(),
            content.len(),
            total,
            started_at.elapsed().as_millis()
        );
        Ok(Page::new(content, request.page(), request.size(), total))
    }

    /// Loads one slice without a count query.
    pub fn fetch_slice<E: Entity>(
        &self,
        criteria: &Criteria<E::Field>,
        request: &PageRequest<E::Field>,
    ) -> RepoResult<Slice<E>> {
        let window = Window {
            limit: u64::from(request.size()) + 1,
            offset: request.offset(),
        };
        let content = self.fetch::<E>(criteria, request.sort(), Some(window))?;
        Ok(Slice::from_lookahead(content, request.page(), request.size()))
    }

    /// Applies `assignments` to every row matching `criteria`.
    ///
    /// Returns the number of updated rows. Matching rows are selected by id in
    /// a subquery, so criteria may reference joined columns.
    pub fn bulk_update<E: Entity>(
        &self,
        assignments: &[Assignment<E::Field>],
        criteria: &Criteria<E::Field>,
    ) -> RepoResult<usize> {
        if assignments.is_empty() {
            return Err(RepoError::InvalidQuery(
                "bulk update needs at least one assignment".to_string(),
            ));
        }

        let mut binds = Vec::new();
        let mut set_terms = Vec::new();
        for assignment in assignments {
            let (Assignment::Set(field, _) | Assignment::Increment(field, _)) = assignment;
            if field.join().is_some() {
                return Err(RepoError::InvalidQuery(format!(
                    "bulk update cannot assign joined column {}",
                    field.column()
                )));
            }
            match assignment {
                Assignment::Set(field, value) => {
                    set_terms.push(format!("{} = ?", bare_column(field.column())));
                    binds.push(value.clone());
                }
                Assignment::Increment(field, delta) => {
                    let column = bare_column(field.column());
                    set_terms.push(format!("{column} = {column} + ?"));
                    binds.push(Value::Integer(*delta));
                }
            }
        }

        let mut joins = Vec::new();
        criteria.collect_joins(&mut joins);
        let mut sql = format!(
            "UPDATE {table} SET {set} WHERE {id} IN (SELECT {qualified_id} FROM {from}",
            table = E::TABLE,
            set = set_terms.join(", "),
            id = E::ID_COLUMN,
            qualified_id = id_column::<E>(),
            from = E::from_clause(),
        );
        for join in &joins {
            sql.push(' ');
            sql.push_str(join);
        }
        sql.push_str(&criteria.render_where(&mut binds));
        sql.push(')');

        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        debug!(
            "event=bulk_update module=query status=ok entity={} rows={}",
            E::NAME,
            changed
        );
        Ok(changed)
    }

    /// Runs caller-written SQL and maps each row.
    ///
    /// The statement is only checked by SQLite at this point; syntax errors
    /// surface as `RepoError::Db`.
    pub fn native<T>(
        &self,
        sql: &str,
        params: &[Value],
        mut map_row: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(map_row(row)?);
        }
        Ok(results)
    }

    /// Runs a caller-written count statement returning one integer.
    pub fn native_count(&self, sql: &str, params: &[Value]) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row(sql, params_from_iter(params.iter()), |row| row.get(0))?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    /// Takes the storage write lock for the enclosing transaction.
    ///
    /// SQLite grants the write lock to the first write statement of a
    /// transaction; an update matching no rows is enough to hold it until
    /// commit or rollback.
    pub fn acquire_write_lock<E: Entity>(&self) -> RepoResult<()> {
        self.conn.execute(
            &format!(
                "UPDATE {table} SET {id} = {id} WHERE 0;",
                table = E::TABLE,
                id = E::ID_COLUMN
            ),
            [],
        )?;
        Ok(())
    }
}

/// Window covering one requested page.
pub fn page_window<F: EntityField>(request: &PageRequest<F>) -> Window {
    Window {
        limit: u64::from(request.size()),
        offset: request.offset(),
    }
}

pub(crate) fn id_column<E: Entity>() -> String {
    format!("{}.{}", E::ALIAS, E::ID_COLUMN)
}

fn bare_column(column: &str) -> &str {
    column.rsplit('.').next().unwrap_or(column)
}

fn to_sql_integer(value: u64) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidQuery(format!("window value {value} is out of range")))
}
