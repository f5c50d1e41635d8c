//! Serializing server: one connection, one worker thread, a request queue.
//!
//! Callers on any number of tasks submit requests through a cloneable
//! [`Server`] handle. The worker drains the queue in arrival order and runs
//! each request to completion before taking the next, so requests never
//! overlap on the connection.
//!
//! A per-request deadline covers queueing and execution. When it passes the
//! caller gets [`DbError::Timeout`]; the reply channel is dropped with the
//! caller's future, so a late result is discarded by the worker instead of
//! reaching anyone. An engine call that has already started is not
//! interrupted. A request whose caller gave up before it reached the front
//! of the queue is skipped.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::connection::Connection;
use crate::error::{DbError, DbResult};
use crate::ffi;
use crate::row::{Row, RowShape};
use crate::value::Value;

type Reply<T> = oneshot::Sender<DbResult<T>>;

enum Request {
    Query {
        sql: String,
        params: Vec<Value>,
        shape: RowShape,
        reply: Reply<Vec<Row>>,
    },
    Execute {
        sql: String,
        params: Vec<Value>,
        reply: Reply<usize>,
    },
    Batch {
        sql: String,
        reply: Reply<()>,
    },
}

impl Request {
    fn handle(self, conn: &Connection) {
        match self {
            Self::Query {
                sql,
                params,
                shape,
                reply,
            } => respond(reply, || conn.query(&sql, &params, shape)),
            Self::Execute { sql, params, reply } => respond(reply, || conn.execute(&sql, &params)),
            Self::Batch { sql, reply } => respond(reply, || conn.execute_batch(&sql)),
        }
    }
}

fn respond<T>(reply: Reply<T>, run: impl FnOnce() -> DbResult<T>) {
    if reply.is_closed() {
        debug!("skipping request abandoned by its caller");
        return;
    }
    if reply.send(run()).is_err() {
        debug!("caller gone, dropping late reply");
    }
}

struct Shared {
    sender: Mutex<Option<mpsc::UnboundedSender<Request>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a serializing server.
///
/// Clones share one queue and one connection. The worker stops after
/// [`stop`](Self::stop), or once every handle is dropped.
#[derive(Clone)]
pub struct Server {
    shared: Arc<Shared>,
}

impl Server {
    /// Spawns the worker thread and opens the connection on it.
    ///
    /// # Errors
    ///
    /// The connection failed to open, or the worker thread could not be
    /// spawned.
    pub fn start(config: Config) -> DbResult<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Request>();
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<DbResult<()>>(1);

        let worker = std::thread::Builder::new()
            .name("cipherdb-server".to_string())
            .spawn(move || {
                let conn = match Connection::open(config) {
                    Ok(conn) => {
                        let _ = ready_tx.send(Ok(()));
                        conn
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                debug!("server worker started on {}", conn.path());
                while let Some(request) = receiver.blocking_recv() {
                    request.handle(&conn);
                }
                if let Err(err) = conn.close() {
                    warn!("server connection close failed: {err}");
                }
                debug!("server worker stopped");
            })
            .map_err(|e| DbError::new(ffi::SQLITE_CANTOPEN, format!("cannot spawn worker: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = worker.join();
                return Err(err);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(DbError::Closed);
            }
        }

        Ok(Self {
            shared: Arc::new(Shared {
                sender: Mutex::new(Some(sender)),
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    /// Runs a query on the worker and returns its rows.
    ///
    /// # Errors
    ///
    /// [`DbError::Timeout`] when `timeout` elapses first,
    /// [`DbError::Closed`] after [`stop`](Self::stop), otherwise the
    /// query's own error.
    pub async fn query(
        &self,
        sql: impl Into<String>,
        params: &[Value],
        shape: RowShape,
        timeout: Option<Duration>,
    ) -> DbResult<Vec<Row>> {
        let sql = sql.into();
        let params = params.to_vec();
        self.call(timeout, |reply| Request::Query {
            sql,
            params,
            shape,
            reply,
        })
        .await
    }

    /// Runs a statement on the worker and returns the number of changed rows.
    ///
    /// # Errors
    ///
    /// As for [`query`](Self::query).
    pub async fn execute(
        &self,
        sql: impl Into<String>,
        params: &[Value],
        timeout: Option<Duration>,
    ) -> DbResult<usize> {
        let sql = sql.into();
        let params = params.to_vec();
        self.call(timeout, |reply| Request::Execute { sql, params, reply })
            .await
    }

    /// Runs a multi-statement script on the worker.
    ///
    /// # Errors
    ///
    /// As for [`query`](Self::query).
    pub async fn execute_batch(
        &self,
        sql: impl Into<String>,
        timeout: Option<Duration>,
    ) -> DbResult<()> {
        let sql = sql.into();
        self.call(timeout, |reply| Request::Batch { sql, reply }).await
    }

    /// `true` once [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock(&self.shared.sender).is_none()
    }

    /// Closes the queue and waits for the worker to finish the requests
    /// already queued. Blocks the calling thread until then.
    ///
    /// Later calls on any handle fail with [`DbError::Closed`].
    pub fn stop(&self) {
        drop(lock(&self.shared.sender).take());
        let worker = lock(&self.shared.worker).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!("server worker panicked");
            }
        }
    }

    async fn call<T>(
        &self,
        timeout: Option<Duration>,
        request: impl FnOnce(Reply<T>) -> Request,
    ) -> DbResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sender = lock(&self.shared.sender).clone().ok_or(DbError::Closed)?;
        sender
            .send(request(reply_tx))
            .map_err(|_| DbError::Closed)?;

        let reply = match timeout {
            Some(limit) => match tokio::time::timeout(limit, reply_rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    warn!("request timed out after {limit:?}");
                    return Err(DbError::Timeout(limit));
                }
            },
            None => reply_rx.await,
        };
        // A dropped reply sender means the worker died mid-request.
        reply.map_err(|_| DbError::Closed)?
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
