//! Orchestration graph
//!
//! ENTRY → ROUTER → {CHAT HANDLER | RETRIEVAL HANDLER} → EXIT
//!
//! The shape is fixed when the graph is built. Each invocation takes a
//! state snapshot, runs exactly one handler and returns a new state.

use crate::agent::Handler;
use crate::classifier::IntentRouter;
use crate::error::AgentError;
use crate::models::Route;
use crate::state::ConversationState;
use crate::Result;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Entry,
    Router,
    ChatHandler,
    RetrievalHandler,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Always,
    When(Route),
}

/// Every edge in the graph
pub const EDGES: &[(Node, Node, Edge)] = &[
    (Node::Entry, Node::Router, Edge::Always),
    (Node::Router, Node::ChatHandler, Edge::When(Route::ChatHandler)),
    (Node::Router, Node::RetrievalHandler, Edge::When(Route::RetrievalHandler)),
    (Node::ChatHandler, Node::Exit, Edge::Always),
    (Node::RetrievalHandler, Node::Exit, Edge::Always),
];

/// Result of one graph pass
#[derive(Debug, Clone)]
pub struct GraphOutput {
    /// Input snapshot with the produced messages appended
    pub state: ConversationState,
    pub route: Route,
    /// Nodes visited, entry to exit
    pub path: Vec<Node>,
}

pub struct AgentGraph {
    chat: Arc<dyn Handler>,
    retrieval: Arc<dyn Handler>,
}

impl AgentGraph {
    pub fn new(chat: Arc<dyn Handler>, retrieval: Arc<dyn Handler>) -> Result<Self> {
        for (handler, expected) in [(&chat, Route::ChatHandler), (&retrieval, Route::RetrievalHandler)] {
            if handler.route() != expected {
                return Err(AgentError::Config(format!(
                    "{} handler wired into the {} node",
                    handler.route(),
                    expected
                )));
            }
        }

        Ok(Self { chat, retrieval })
    }

    fn handler(&self, node: Node) -> Option<&Arc<dyn Handler>> {
        match node {
            Node::ChatHandler => Some(&self.chat),
            Node::RetrievalHandler => Some(&self.retrieval),
            _ => None,
        }
    }

    /// Run one pass over `state`, following `EDGES` from entry to exit
    pub async fn invoke(&self, state: ConversationState) -> Result<GraphOutput> {
        let mut node = Node::Entry;
        let mut path = vec![node];
        let mut route = None;
        let mut reply = None;

        while node != Node::Exit {
            if node == Node::Router {
                let routed = IntentRouter::route(&state)?;
                debug!(route = %routed, "Routed turn");
                route = Some(routed);
            } else if let Some(handler) = self.handler(node) {
                reply = Some(handler.handle(&state).await?);
            }

            node = next_node(node, route)
                .ok_or_else(|| AgentError::Config(format!("no edge out of {}", node)))?;
            path.push(node);
        }

        match (route, reply) {
            (Some(route), Some(reply)) => Ok(GraphOutput {
                state: state.with_message(reply),
                route,
                path,
            }),
            _ => Err(AgentError::Config(
                "graph reached exit without a handler reply".to_string(),
            )),
        }
    }
}

/// First edge out of `from` whose condition holds for `route`
fn next_node(from: Node, route: Option<Route>) -> Option<Node> {
    EDGES
        .iter()
        .find(|(source, _, edge)| {
            *source == from
                && match edge {
                    Edge::Always => true,
                    Edge::When(required) => route == Some(*required),
                }
        })
        .map(|(_, target, _)| *target)
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Node::Entry => "entry",
            Node::Router => "router",
            Node::ChatHandler => "chat_handler",
            Node::RetrievalHandler => "retrieval_handler",
            Node::Exit => "exit",
        };
        write!(f, "{}", s)
    }
}
