//! Agent 邮箱与串行执行
//! Agent mailbox and serialized execution
//!
//! Every hosted agent owns one [`Mailbox`]. `(queue, processing, closed)`
//! live under a single `parking_lot` mutex that is never held across an
//! `.await`. Enqueue appends and, when no drain loop is running, starts one
//! on the [`WorkerPool`]. The loop pops one message at a time, runs the
//! handler, and exits as soon as the queue is empty, so an idle agent holds
//! no task and no permit.

use crate::pool::WorkerPool;
use crate::router::RouterLink;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_kernel::Aid;
use tessera_kernel::agent::{Agent, AgentContext, AgentError, AgentInitArgs, AgentResult, Wait};
use tessera_kernel::endpoint::{DeliveryError, PostReport};
use tessera_kernel::message::AclMessage;
use tokio::sync::Notify;
use tracing::{debug, error};

#[derive(Default)]
struct MailboxState {
    queue: VecDeque<Arc<AclMessage>>,
    /// A drain loop is scheduled or running.
    processing: bool,
    /// Terminated; enqueue is refused.
    closed: bool,
}

/// Per-mailbox counters.
#[derive(Debug, Default)]
struct Counters {
    handled: AtomicU64,
    faults: AtomicU64,
}

/// Snapshot of a mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailboxStats {
    pub queued: usize,
    pub processing: bool,
    /// Handler invocations that returned `Ok`.
    pub handled: u64,
    /// Handler invocations that returned `Err` or panicked.
    pub faults: u64,
}

pub struct Mailbox {
    aid: Aid,
    state: Mutex<MailboxState>,
    agent: tokio::sync::Mutex<Box<dyn Agent>>,
    arrived: Notify,
    pool: WorkerPool,
    router: RouterLink,
    counters: Counters,
}

impl Mailbox {
    pub(crate) fn new(
        aid: Aid,
        agent: Box<dyn Agent>,
        pool: WorkerPool,
        router: RouterLink,
    ) -> Arc<Self> {
        Arc::new(Self {
            aid,
            state: Mutex::new(MailboxState::default()),
            agent: tokio::sync::Mutex::new(agent),
            arrived: Notify::new(),
            pool,
            router,
            counters: Counters::default(),
        })
    }

    pub fn aid(&self) -> &Aid {
        &self.aid
    }

    // ========================================================================
    // 入队
    // ========================================================================

    /// 入队
    /// Appends `msg` and returns without waiting for it to be handled.
    pub fn enqueue(self: &Arc<Self>, msg: Arc<AclMessage>) -> Result<(), DeliveryError> {
        let start_drain = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(DeliveryError::Terminated(self.aid.clone()));
            }
            state.queue.push_back(msg);
            !std::mem::replace(&mut state.processing, true)
        };

        self.arrived.notify_waiters();
        if start_drain {
            let mailbox = Arc::clone(self);
            self.pool.spawn_drain(async move { mailbox.drain().await });
        }
        Ok(())
    }

    // ========================================================================
    // 串行处理
    // ========================================================================

    async fn drain(self: Arc<Self>) {
        loop {
            let Some(msg) = self.next_message() else {
                return;
            };

            let Some(_permit) = self.pool.acquire().await else {
                // Pool semaphore closed; hand the message back and stop.
                let mut state = self.state.lock();
                state.queue.push_front(msg);
                state.processing = false;
                return;
            };
            self.dispatch(msg).await;
        }
    }

    /// Pops the head, or clears `processing` when there is none.
    fn next_message(&self) -> Option<Arc<AclMessage>> {
        let mut state = self.state.lock();
        let head = state.queue.pop_front();
        if head.is_none() {
            state.processing = false;
        }
        head
    }

    async fn dispatch(&self, msg: Arc<AclMessage>) {
        let mut agent = self.agent.lock().await;
        let closed = self.state.lock().closed;
        if closed {
            return;
        }

        let ctx = HandlerContext { mailbox: self };
        let outcome = AssertUnwindSafe(agent.on_message(&ctx, Arc::clone(&msg)))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => {
                self.counters.handled.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(e)) => {
                self.counters.faults.fetch_add(1, Ordering::Relaxed);
                error!(
                    aid = %self.aid,
                    performative = %msg.performative,
                    sender = ?msg.sender.as_ref().map(ToString::to_string),
                    conversation_id = ?msg.conversation_id,
                    error = %e,
                    "Agent handler failed"
                );
            }
            Err(panic) => {
                self.counters.faults.fetch_add(1, Ordering::Relaxed);
                error!(
                    aid = %self.aid,
                    performative = %msg.performative,
                    sender = ?msg.sender.as_ref().map(ToString::to_string),
                    conversation_id = ?msg.conversation_id,
                    panic = %panic_message(panic.as_ref()),
                    "Agent handler panicked"
                );
            }
        }
    }

    // ========================================================================
    // 主动接收
    // ========================================================================

    /// Takes the next queued message directly. Only the agent's own handler
    /// reaches this, through its [`AgentContext`].
    pub(crate) async fn receive(&self, wait: Wait) -> Option<Arc<AclMessage>> {
        let deadline = match wait {
            Wait::For(d) => Some(tokio::time::Instant::now() + d),
            Wait::Immediate | Wait::Forever => None,
        };

        loop {
            let notified = self.arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(msg) = state.queue.pop_front() {
                    return Some(msg);
                }
                if state.closed {
                    return None;
                }
            }

            match (wait, deadline) {
                (Wait::Immediate, _) => return None,
                (_, Some(deadline)) => {
                    if tokio::time::timeout_at(deadline, notified).await.is_err() {
                        return None;
                    }
                }
                (_, None) => notified.await,
            }
        }
    }

    // ========================================================================
    // 生命周期
    // ========================================================================

    /// Runs `init` before the mailbox is published.
    pub(crate) async fn initialize(&self, args: AgentInitArgs) -> AgentResult<()> {
        let mut agent = self.agent.lock().await;
        let ctx = HandlerContext { mailbox: self };
        match AssertUnwindSafe(agent.init(&ctx, args)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(AgentError::InitializationFailed(format!(
                "init panicked: {}",
                panic_message(panic.as_ref())
            ))),
        }
    }

    /// 终止
    /// Refuses further messages, discards the queue, waits for the in-flight
    /// handler and calls `terminate`. Returns the number of discarded
    /// messages.
    pub(crate) async fn shutdown(&self) -> usize {
        let discarded = {
            let mut state = self.state.lock();
            state.closed = true;
            let n = state.queue.len();
            state.queue.clear();
            n
        };
        self.arrived.notify_waiters();

        let mut agent = self.agent.lock().await;
        agent.terminate().await;

        if discarded > 0 {
            debug!(aid = %self.aid, discarded, "Discarded queued messages on stop");
        }
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> MailboxStats {
        let state = self.state.lock();
        MailboxStats {
            queued: state.queue.len(),
            processing: state.processing,
            handled: self.counters.handled.load(Ordering::Relaxed),
            faults: self.counters.faults.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailbox")
            .field("aid", &self.aid)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Context handed to `init` and `on_message`.
struct HandlerContext<'a> {
    mailbox: &'a Mailbox,
}

#[async_trait]
impl AgentContext for HandlerContext<'_> {
    fn aid(&self) -> &Aid {
        &self.mailbox.aid
    }

    async fn post(&self, msg: AclMessage) -> PostReport {
        match self.mailbox.router.get().and_then(|r| r.upgrade()) {
            Some(router) => router.post(msg).await,
            None => PostReport::all_failed(&msg.receivers, DeliveryError::RouterUnavailable),
        }
    }

    async fn receive(&self, wait: Wait) -> Option<Arc<AclMessage>> {
        self.mailbox.receive(wait).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
