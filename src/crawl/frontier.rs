// src/crawl/frontier.rs
// =============================================================================
// The frontier decides which pages get crawled and notices when we are done.
//
// It is a single tokio task (an "actor") that owns two pieces of state:
// - seen:    every canonical URL that was ever handed to a worker
// - pending: how many tasks exist that have not been fully resolved yet
//
// Nobody else can touch that state. Workers talk to the frontier only by
// sending messages over a channel, so there is no Mutex anywhere.
//
// Counting rules:
// - Every submitted task adds 1 to pending, before it can be seen by anyone
// - A duplicate task is resolved right away: -1, no fetch
// - A worker that finishes a task reports its children in the same message:
//   +children, then -1 for the finished task
// - When pending reaches 0 there is no task queued, in flight, or about to
//   be submitted. The frontier closes and every worker waiting in accept()
//   gets None.
//
// Rust concepts:
// - mpsc channel: many senders (workers), one receiver (the actor)
// - oneshot channel: a single reply, used to hand a task to one worker
// - VecDeque: ready tasks on one side, waiting workers on the other
// =============================================================================

use super::Task;
use std::collections::{HashSet, VecDeque};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

// Messages the frontier actor understands
#[derive(Debug)]
enum Message {
    /// New tasks from outside the pool (the seeds)
    Submit(Vec<Task>),
    /// A worker finished one task; these are the children it discovered
    Settle(Vec<Task>),
    /// A worker wants its next task
    Accept(oneshot::Sender<Option<Task>>),
    /// Stop handing out new work and drain what is left
    Shutdown,
}

// Numbers collected by the frontier over one crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    /// Tasks handed to a worker
    pub dispatched: usize,
    /// Tasks dropped because their URL was already seen
    pub duplicates: usize,
    /// Tasks dropped because of shutdown()
    pub retired_unvisited: usize,
    /// Value of the pending counter when the actor stopped (0 after a clean run)
    pub pending_at_close: usize,
}

// Cheap, cloneable way to talk to the frontier
#[derive(Debug, Clone)]
pub struct FrontierHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl FrontierHandle {
    // Adds tasks from outside the worker pool
    pub fn submit(&self, tasks: Vec<Task>) {
        self.send(Message::Submit(tasks));
    }

    // Reports that one accepted task is done, together with its children
    pub fn settle(&self, children: Vec<Task>) {
        self.send(Message::Settle(children));
    }

    // Waits for the next unseen task
    //
    // Returns None once the frontier is closed, which means the crawl is over.
    pub async fn accept(&self) -> Option<Task> {
        let (reply, answer) = oneshot::channel();
        self.send(Message::Accept(reply));
        // A dropped reply means the actor is gone, which also means we're done
        answer.await.ok().flatten()
    }

    // Stops admitting new tasks. In-flight tasks still finish.
    pub fn shutdown(&self) {
        self.send(Message::Shutdown);
    }

    fn send(&self, message: Message) {
        if self.tx.send(message).is_err() {
            debug!("frontier already stopped, message dropped");
        }
    }
}

// The actor state. Lives inside one tokio task.
pub struct Frontier {
    rx: mpsc::UnboundedReceiver<Message>,
    seen: HashSet<String>,
    ready: VecDeque<Task>,
    waiting: VecDeque<oneshot::Sender<Option<Task>>>,
    pending: usize,
    closed: bool,
    draining: bool,
    stats: FrontierStats,
}

impl Frontier {
    // Starts the actor and returns a handle to it
    //
    // The actor keeps running until every handle is dropped, then the
    // JoinHandle resolves with the final statistics.
    pub fn spawn() -> (FrontierHandle, JoinHandle<FrontierStats>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let frontier = Frontier {
            rx,
            seen: HashSet::new(),
            ready: VecDeque::new(),
            waiting: VecDeque::new(),
            pending: 0,
            closed: false,
            draining: false,
            stats: FrontierStats::default(),
        };
        let handle = tokio::spawn(frontier.run());
        (FrontierHandle { tx }, handle)
    }

    async fn run(mut self) -> FrontierStats {
        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Submit(tasks) => {
                    if self.closed {
                        warn!(count = tasks.len(), "tasks submitted after the frontier closed");
                        continue;
                    }
                    self.pending += tasks.len();
                    for task in tasks {
                        self.admit(task);
                    }
                    self.close_if_done();
                }
                Message::Settle(children) => {
                    self.pending += children.len();
                    for task in children {
                        self.admit(task);
                    }
                    self.retire(1);
                    self.close_if_done();
                }
                Message::Accept(reply) => self.accept(reply),
                Message::Shutdown => {
                    if !self.draining {
                        debug!(queued = self.ready.len(), "frontier draining");
                        self.draining = true;
                        let dropped = self.ready.len();
                        self.ready.clear();
                        self.stats.retired_unvisited += dropped;
                        self.retire(dropped);
                        self.close_if_done();
                    }
                }
            }
        }

        self.stats.pending_at_close = self.pending;
        let stats = self.stats;
        debug!(?stats, "frontier stopped");
        stats
    }

    // Dedups one task that was already counted in `pending`
    fn admit(&mut self, task: Task) {
        if self.draining {
            self.stats.retired_unvisited += 1;
            self.retire(1);
            return;
        }

        // insert() returns false when the URL was already there
        if !self.seen.insert(task.url.as_str().to_string()) {
            self.stats.duplicates += 1;
            self.retire(1);
            return;
        }

        self.dispatch(task);
    }

    // Gives the task to a waiting worker, or queues it until one asks
    fn dispatch(&mut self, mut task: Task) {
        while let Some(worker) = self.waiting.pop_front() {
            match worker.send(Some(task)) {
                Ok(()) => {
                    self.stats.dispatched += 1;
                    return;
                }
                // That worker stopped listening, try the next one
                Err(Some(returned)) => task = returned,
                Err(None) => return,
            }
        }
        self.ready.push_back(task);
    }

    fn accept(&mut self, reply: oneshot::Sender<Option<Task>>) {
        if let Some(task) = self.ready.pop_front() {
            match reply.send(Some(task)) {
                Ok(()) => self.stats.dispatched += 1,
                Err(Some(task)) => self.ready.push_front(task),
                Err(None) => {}
            }
        } else if self.closed {
            let _ = reply.send(None);
        } else {
            self.waiting.push_back(reply);
        }
    }

    fn retire(&mut self, count: usize) {
        debug_assert!(self.pending >= count, "pending counter would go negative");
        self.pending = self.pending.saturating_sub(count);
    }

    fn close_if_done(&mut self) {
        if self.pending > 0 || self.closed {
            return;
        }
        debug!(waiting = self.waiting.len(), "no pending work left, closing frontier");
        self.closed = true;
        for worker in self.waiting.drain(..) {
            let _ = worker.send(None);
        }
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why an actor instead of Arc<Mutex<HashSet>>?
//    - Only one task ever touches `seen` and `pending`, so no locking is needed
//    - Check-and-insert plus counting happen in one place, in one order
//    - Workers can't forget to update the counter; they just send a message
//
// 2. How does accept() "block"?
//    - It sends a oneshot::Sender to the actor and awaits the receiver
//    - The actor answers right away if a task is ready, otherwise it keeps
//      the sender in `waiting` and answers later
//    - Awaiting a oneshot doesn't block the thread, other tasks keep running
//
// 3. Why is it safe to close when pending hits 0?
//    - A task is counted before the actor can hand it out
//    - A finished task reports its children in the same message that
//      retires it, so the count never dips to 0 while work still exists
// -----------------------------------------------------------------------------
