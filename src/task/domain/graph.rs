//! Dependency graph over the tasks of one orchestration.
//!
//! The graph is a point-in-time snapshot. Nodes keep the order in which the
//! tasks were supplied (callers pass them in creation order), and that
//! discovery order breaks every tie in the algorithms below.

use super::{DependencyType, Task, TaskId};
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Resolved edge: `to` depends on `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    /// Prerequisite.
    pub from: TaskId,
    /// Dependent.
    pub to: TaskId,
    /// Temporal relation.
    pub dependency_type: DependencyType,
}

/// Dependency whose prerequisite is not part of the orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidDependency {
    /// Dependent task.
    pub task_id: TaskId,
    /// Unresolvable prerequisite.
    pub depends_on: TaskId,
    /// Explanation.
    pub reason: String,
}

/// Advisory structural report for one orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyValidation {
    /// `true` when there are no cycles, invalid dependencies or orphans.
    pub is_valid: bool,
    /// Each cycle as the path from its first repeated node back to itself.
    pub cycles: Vec<Vec<TaskId>>,
    /// Tasks whose parent task does not exist.
    pub orphaned_tasks: Vec<TaskId>,
    /// Dependencies on tasks outside the orchestration.
    pub invalid_dependencies: Vec<InvalidDependency>,
}

/// Topological execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOrder {
    /// Tasks in an order that respects every edge.
    pub ordered: Vec<TaskId>,
    /// Tasks on or behind a cycle, which cannot be ordered.
    pub cyclic: Vec<TaskId>,
}

impl ExecutionOrder {
    /// Returns `true` when every task could be ordered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cyclic.is_empty()
    }
}

/// Tasks grouped by dependency depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyLevels {
    /// `levels[n]` holds the tasks whose longest prerequisite chain has
    /// length `n`.
    pub levels: Vec<Vec<TaskId>>,
    /// Every resolved edge.
    pub edges: Vec<DependencyEdge>,
    /// Tasks that cannot be leveled because of cycles.
    pub unleveled: Vec<TaskId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnStack,
    Done,
}

/// Directed graph of the dependencies among a set of tasks.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<TaskId>,
    prerequisites: HashMap<TaskId, Vec<TaskId>>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
    edges: Vec<DependencyEdge>,
    invalid: Vec<InvalidDependency>,
    orphaned: Vec<TaskId>,
}

impl DependencyGraph {
    /// Builds the graph of `tasks`, keeping their order as discovery order.
    ///
    /// Dependencies on tasks outside the slice are recorded as invalid and
    /// contribute no edge.
    #[must_use]
    pub fn build(tasks: &[Task]) -> Self {
        let mut graph = Self {
            nodes: tasks.iter().map(Task::id).collect(),
            ..Self::default()
        };
        let known: HashSet<TaskId> = graph.nodes.iter().copied().collect();

        for task in tasks {
            if task
                .parent_task_id()
                .is_some_and(|parent| !known.contains(&parent))
            {
                graph.orphaned.push(task.id());
            }
            for dependency in task.dependencies() {
                if !known.contains(&dependency.task_id) {
                    graph.invalid.push(InvalidDependency {
                        task_id: task.id(),
                        depends_on: dependency.task_id,
                        reason: format!(
                            "prerequisite {} does not exist in this orchestration",
                            dependency.task_id
                        ),
                    });
                    continue;
                }
                graph.edges.push(DependencyEdge {
                    from: dependency.task_id,
                    to: task.id(),
                    dependency_type: dependency.dependency_type,
                });
                graph
                    .prerequisites
                    .entry(task.id())
                    .or_default()
                    .push(dependency.task_id);
                graph
                    .dependents
                    .entry(dependency.task_id)
                    .or_default()
                    .push(task.id());
            }
        }
        graph
    }

    /// Returns the nodes in discovery order.
    #[must_use]
    pub fn nodes(&self) -> &[TaskId] {
        &self.nodes
    }

    /// Returns every resolved edge.
    #[must_use]
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Returns dependencies whose prerequisite is missing.
    #[must_use]
    pub fn invalid_dependencies(&self) -> &[InvalidDependency] {
        &self.invalid
    }

    /// Returns `true` when `task_id` is a node.
    #[must_use]
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.nodes.contains(&task_id)
    }

    fn prerequisites_of(&self, task_id: TaskId) -> &[TaskId] {
        self.prerequisites.get(&task_id).map(Vec::as_slice).unwrap_or_default()
    }

    fn dependents_of(&self, task_id: TaskId) -> &[TaskId] {
        self.dependents.get(&task_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Finds cycles by depth-first search along "depends on" edges.
    ///
    /// Each cycle is reported once, when the search meets a node already on
    /// its stack, as the stack slice from that node with the node repeated
    /// at the end: `A depends on B, B depends on A` yields `[A, B, A]` when
    /// `A` is discovered first.
    #[must_use]
    pub fn find_cycles(&self) -> Vec<Vec<TaskId>> {
        let mut marks = HashMap::new();
        let mut cycles = Vec::new();
        for &root in &self.nodes {
            if !marks.contains_key(&root) {
                self.walk_from(root, &mut marks, &mut cycles);
            }
        }
        cycles
    }

    /// Depth-first walk from `root` with an explicit stack of
    /// `(node, next prerequisite index)` frames.
    fn walk_from(
        &self,
        root: TaskId,
        marks: &mut HashMap<TaskId, Mark>,
        cycles: &mut Vec<Vec<TaskId>>,
    ) {
        marks.insert(root, Mark::OnStack);
        let mut frames: Vec<(TaskId, usize)> = vec![(root, 0)];
        while let Some(frame) = frames.last_mut() {
            let (node, cursor) = *frame;
            let Some(&next) = self.prerequisites_of(node).get(cursor) else {
                frames.pop();
                marks.insert(node, Mark::Done);
                continue;
            };
            frame.1 = cursor.saturating_add(1);
            match marks.get(&next) {
                Some(Mark::OnStack) => {
                    if let Some(start) = frames.iter().position(|(id, _)| *id == next) {
                        let mut cycle: Vec<TaskId> =
                            frames.iter().skip(start).map(|(id, _)| *id).collect();
                        cycle.push(next);
                        cycles.push(cycle);
                    }
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(next, Mark::OnStack);
                    frames.push((next, 0));
                }
            }
        }
    }

    /// Orders the tasks with Kahn's algorithm.
    ///
    /// Among tasks that are ready at the same time, the one discovered first
    /// goes first.
    #[must_use]
    pub fn execution_order(&self) -> ExecutionOrder {
        let position: HashMap<TaskId, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();
        let mut in_degree: HashMap<TaskId, usize> = self
            .nodes
            .iter()
            .map(|id| (*id, self.prerequisites_of(*id).len()))
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, id)| self.prerequisites_of(**id).is_empty())
            .map(|(index, _)| Reverse(index))
            .collect();

        let mut ordered = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(index)) = ready.pop() {
            let Some(&node) = self.nodes.get(index) else {
                continue;
            };
            ordered.push(node);
            for dependent in self.dependents_of(node) {
                let Some(degree) = in_degree.get_mut(dependent) else {
                    continue;
                };
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    if let Some(&next) = position.get(dependent) {
                        ready.push(Reverse(next));
                    }
                }
            }
        }

        let placed: HashSet<TaskId> = ordered.iter().copied().collect();
        let cyclic = self
            .nodes
            .iter()
            .filter(|id| !placed.contains(*id))
            .copied()
            .collect();
        ExecutionOrder { ordered, cyclic }
    }

    /// Groups tasks by level: 0 without prerequisites, otherwise one more
    /// than the highest prerequisite level.
    #[must_use]
    pub fn levels(&self) -> DependencyLevels {
        let order = self.execution_order();
        let mut level_of: HashMap<TaskId, usize> = HashMap::new();
        for &node in &order.ordered {
            let level = self
                .prerequisites_of(node)
                .iter()
                .filter_map(|prerequisite| level_of.get(prerequisite))
                .map(|level| level + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(node, level);
        }

        let depth = level_of.values().max().map_or(0, |deepest| deepest + 1);
        let mut levels: Vec<Vec<TaskId>> = vec![Vec::new(); depth];
        for node in &self.nodes {
            if let Some(bucket) = level_of.get(node).and_then(|level| levels.get_mut(*level)) {
                bucket.push(*node);
            }
        }
        DependencyLevels {
            levels,
            edges: self.edges.clone(),
            unleveled: order.cyclic,
        }
    }

    /// Returns `true` when making `dependent` depend on `prerequisite` would
    /// close a cycle.
    #[must_use]
    pub fn would_create_cycle(&self, dependent: TaskId, prerequisite: TaskId) -> bool {
        if dependent == prerequisite {
            return true;
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([prerequisite]);
        while let Some(current) = queue.pop_front() {
            if current == dependent {
                return true;
            }
            if seen.insert(current) {
                queue.extend(self.prerequisites_of(current).iter().copied());
            }
        }
        false
    }

    /// Produces the advisory structural report.
    #[must_use]
    pub fn validation(&self) -> DependencyValidation {
        let cycles = self.find_cycles();
        DependencyValidation {
            is_valid: cycles.is_empty() && self.invalid.is_empty() && self.orphaned.is_empty(),
            cycles,
            orphaned_tasks: self.orphaned.clone(),
            invalid_dependencies: self.invalid.clone(),
        }
    }
}
