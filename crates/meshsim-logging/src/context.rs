//! Node context injection
//!
//! The scheduler runs every node's algorithm code on its own thread, one
//! node at a time. [`NodeContextGuard`] records which node is currently
//! executing (and which run it belongs to) in thread-local storage so log
//! lines and spans emitted by algorithm code can be attributed to it.

use std::cell::RefCell;

use meshsim_core::NodeId;
use uuid::Uuid;

/// Context stored in thread-local storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeContextData {
    /// Node whose code is executing, if any
    pub node: Option<NodeId>,
    /// Identifier of the current run
    pub run_id: Option<Uuid>,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

fn replace(new_ctx: Option<NodeContextData>) -> Option<NodeContextData> {
    NODE_CONTEXT.with(|ctx| std::mem::replace(&mut *ctx.borrow_mut(), new_ctx))
}

/// RAII guard for node context
///
/// Setting a node keeps the run id of the enclosing context. Dropping the
/// guard restores whatever context was active before it was created.
///
/// ```ignore
/// let _run = RunContextGuard::new(Uuid::new_v4());
/// let _node = NodeContextGuard::new(NodeId(3));
/// tracing::debug!("handling messages"); // attributed to N3
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Mark `node` as the executing node
    pub fn new(node: NodeId) -> Self {
        let run_id = Self::current_run_id();
        let previous = replace(Some(NodeContextData {
            node: Some(node),
            run_id,
        }));
        Self { previous }
    }

    /// Get the current context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// Get the executing node (if set)
    pub fn current_node() -> Option<NodeId> {
        Self::current().and_then(|ctx| ctx.node)
    }

    /// Get the current run id (if set)
    pub fn current_run_id() -> Option<Uuid> {
        Self::current().and_then(|ctx| ctx.run_id)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        replace(self.previous.take());
    }
}

/// RAII guard marking the current thread as executing a run
pub struct RunContextGuard {
    previous: Option<NodeContextData>,
}

impl RunContextGuard {
    pub fn new(run_id: Uuid) -> Self {
        let previous = replace(Some(NodeContextData {
            node: None,
            run_id: Some(run_id),
        }));
        Self { previous }
    }
}

impl Drop for RunContextGuard {
    fn drop(&mut self) {
        replace(self.previous.take());
    }
}
