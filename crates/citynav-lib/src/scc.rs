//! Strongly connected components via Tarjan's algorithm.
//!
//! Two drivers share the same bookkeeping: a straightforward recursive
//! version and an iterative one that keeps an explicit task stack so deep
//! city graphs cannot blow the call stack. The engine runs the iterative
//! variant; the recursive one stays as the readable reference and lets the
//! tests compare both.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::graph::{GraphView, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StronglyConnectedComponent {
    nodes: HashSet<NodeId>,
    root: NodeId,
}

impl StronglyConnectedComponent {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn nodes(&self) -> &HashSet<NodeId> {
        &self.nodes
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Bookkeeping shared by both Tarjan drivers.
#[derive(Default)]
struct TarjanState {
    index: HashMap<NodeId, usize>,
    low_link: HashMap<NodeId, usize>,
    next_index: usize,
    stack: Vec<NodeId>,
    on_stack: HashSet<NodeId>,
    components: Vec<StronglyConnectedComponent>,
    largest: Option<usize>,
}

impl TarjanState {
    fn assign_index(&mut self, node: NodeId) {
        self.index.insert(node, self.next_index);
        self.low_link.insert(node, self.next_index);
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack.insert(node);
    }

    fn lower_link(&mut self, node: NodeId, candidate: usize) {
        let link = self.low_link.entry(node).or_insert(candidate);
        if candidate < *link {
            *link = candidate;
        }
    }

    fn is_component_root(&self, node: NodeId) -> bool {
        self.index.get(&node) == self.low_link.get(&node)
    }

    /// Pops the stack down to and including `root`, emitting the component.
    fn establish_component(&mut self, root: NodeId) {
        let mut nodes = HashSet::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.remove(&member);
            nodes.insert(member);
            if member == root {
                break;
            }
        }
        let component = StronglyConnectedComponent { nodes, root };
        let larger = self
            .largest
            .map_or(true, |at| component.len() > self.components[at].len());
        if larger {
            self.largest = Some(self.components.len());
        }
        self.components.push(component);
    }

    fn finish(self) -> SccResult {
        debug!(
            components = self.components.len(),
            largest = self
                .largest
                .map_or(0, |at| self.components[at].len()),
            "tarjan finished"
        );
        SccResult {
            components: self.components,
            largest: self.largest,
        }
    }
}

/// All components of a graph, largest one remembered.
#[derive(Debug, Clone)]
pub struct SccResult {
    components: Vec<StronglyConnectedComponent>,
    largest: Option<usize>,
}

impl SccResult {
    pub fn components(&self) -> &[StronglyConnectedComponent] {
        &self.components
    }

    pub fn largest(&self) -> Option<&StronglyConnectedComponent> {
        self.largest.map(|at| &self.components[at])
    }

    pub fn into_components(self) -> Vec<StronglyConnectedComponent> {
        self.components
    }
}

/// Recursive Tarjan over any graph view.
pub fn tarjan_recursive<G: GraphView>(graph: &G) -> SccResult {
    let mut state = TarjanState::default();
    for node in graph.node_ids().collect::<Vec<_>>() {
        if !state.index.contains_key(&node) {
            strong_connect(graph, node, &mut state);
        }
    }
    state.finish()
}

fn strong_connect<G: GraphView>(graph: &G, node: NodeId, state: &mut TarjanState) {
    state.assign_index(node);
    for arc in graph.arcs_from(node) {
        let successor = arc.destination();
        if !state.index.contains_key(&successor) {
            strong_connect(graph, successor, state);
            let successor_link = state.low_link[&successor];
            state.lower_link(node, successor_link);
        } else if state.on_stack.contains(&successor) {
            let successor_index = state.index[&successor];
            state.lower_link(node, successor_index);
        }
    }
    if state.is_component_root(node) {
        state.establish_component(node);
    }
}

enum Stage {
    Index,
    VisitSuccessors,
    Finalize,
}

struct Task {
    node: NodeId,
    predecessor: Option<NodeId>,
    stage: Stage,
}

/// Iterative Tarjan. Each node passes through three stages on an explicit
/// stack: assign its index, schedule its successors, then settle its low
/// link and possibly emit a component.
pub fn tarjan_iterative<G: GraphView>(graph: &G) -> SccResult {
    let mut state = TarjanState::default();
    let mut tasks: Vec<Task> = Vec::new();

    for start in graph.node_ids().collect::<Vec<_>>() {
        if state.index.contains_key(&start) {
            continue;
        }
        tasks.push(Task {
            node: start,
            predecessor: None,
            stage: Stage::Index,
        });

        while let Some(mut task) = tasks.pop() {
            match task.stage {
                Stage::Index => {
                    if let Some(&index) = state.index.get(&task.node) {
                        // Scheduled twice before the first visit ran. The
                        // predecessor still needs the back-link update the
                        // dropped visit would have produced.
                        if state.on_stack.contains(&task.node) {
                            if let Some(predecessor) = task.predecessor {
                                state.lower_link(predecessor, index);
                            }
                        }
                        continue;
                    }
                    state.assign_index(task.node);
                    task.stage = Stage::VisitSuccessors;
                    tasks.push(task);
                }
                Stage::VisitSuccessors => {
                    let node = task.node;
                    task.stage = Stage::Finalize;
                    tasks.push(task);
                    for arc in graph.arcs_from(node) {
                        let successor = arc.destination();
                        if let Some(&index) = state.index.get(&successor) {
                            if state.on_stack.contains(&successor) {
                                state.lower_link(node, index);
                            }
                        } else {
                            tasks.push(Task {
                                node: successor,
                                predecessor: Some(node),
                                stage: Stage::Index,
                            });
                        }
                    }
                }
                Stage::Finalize => {
                    if state.is_component_root(task.node) {
                        state.establish_component(task.node);
                    }
                    if let Some(predecessor) = task.predecessor {
                        let link = state.low_link[&task.node];
                        state.lower_link(predecessor, link);
                    }
                }
            }
        }
    }
    state.finish()
}
