//! Recording in-memory connection provider for persistence tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use library_core::{Record, Statement};
use library_server::db::{Connection, ConnectionProvider, DbError, ExecOutcome};
use serde_json::Value;

/// Lifecycle events, in the order the fake observed them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Acquired,
    Executed,
    Committed,
    RolledBack,
    Released,
}

enum Scripted {
    Reply(Result<ExecOutcome, DbError>),
    /// Never completes; exercises the statement timeout
    Hang,
}

#[derive(Default)]
struct Inner {
    events: Vec<Event>,
    statements: Vec<Statement>,
    replies: VecDeque<Scripted>,
    fail_acquire: bool,
    stall_rollback: bool,
}

#[derive(Clone, Default)]
pub struct FakeDb {
    inner: Arc<Mutex<Inner>>,
}

impl FakeDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue rows for the next execute.
    pub fn returns(&self, rows: Vec<Value>) -> &Self {
        let rows = rows.into_iter().map(record).collect();
        self.push(Scripted::Reply(Ok(ExecOutcome::rows(rows))))
    }

    /// Queue an affected-row count for the next execute.
    pub fn affects(&self, count: u64) -> &Self {
        self.push(Scripted::Reply(Ok(ExecOutcome::affected(count))))
    }

    pub fn fails_with(&self, err: DbError) -> &Self {
        self.push(Scripted::Reply(Err(err)))
    }

    pub fn hangs(&self) -> &Self {
        self.push(Scripted::Hang)
    }

    /// Rollbacks never complete, like a connection still busy with a
    /// statement the client stopped waiting for.
    pub fn stall_rollbacks(&self) -> &Self {
        self.inner.lock().unwrap().stall_rollback = true;
        self
    }

    pub fn refuse_connections(&self) {
        self.inner.lock().unwrap().fail_acquire = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.inner.lock().unwrap().events.clone()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.inner.lock().unwrap().statements.clone()
    }

    fn push(&self, reply: Scripted) -> &Self {
        self.inner.lock().unwrap().replies.push_back(reply);
        self
    }
}

pub fn record(value: Value) -> Record {
    serde_json::from_value(value).expect("record must be a JSON object")
}

#[async_trait]
impl ConnectionProvider for FakeDb {
    async fn acquire(&self) -> Result<Box<dyn Connection>, DbError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_acquire {
            return Err(DbError::new("connection refused"));
        }
        inner.events.push(Event::Acquired);
        Ok(Box::new(FakeConnection {
            inner: Arc::clone(&self.inner),
        }))
    }
}

struct FakeConnection {
    inner: Arc<Mutex<Inner>>,
}

impl FakeConnection {
    fn record_event(&self, event: Event) {
        self.inner.lock().unwrap().events.push(event);
    }
}

#[async_trait]
impl Connection for FakeConnection {
    async fn execute(&mut self, statement: &Statement) -> Result<ExecOutcome, DbError> {
        let next = {
            let mut inner = self.inner.lock().unwrap();
            inner.events.push(Event::Executed);
            inner.statements.push(statement.clone());
            inner.replies.pop_front()
        };

        match next {
            Some(Scripted::Reply(reply)) => reply,
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(ExecOutcome::default()),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.record_event(Event::Committed);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        let stall = self.inner.lock().unwrap().stall_rollback;
        if stall {
            std::future::pending::<()>().await;
        }
        self.record_event(Event::RolledBack);
        Ok(())
    }
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.events.push(Event::Released);
        }
    }
}
