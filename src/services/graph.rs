use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::services::EngineError;
use crate::store::{Concept, Difficulty, PrerequisiteEdge};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub completed: bool,
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub difficulty: Difficulty,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Concept DAG with adjacency indexes built once per load.
///
/// An edge whose prerequisite is not in the concept list still gates its
/// concept, which then can never become available. Edges into unknown
/// concepts are dropped.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    concepts: Vec<Concept>,
    index: HashMap<String, usize>,
    prerequisites: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn build(concepts: Vec<Concept>, edges: &[PrerequisiteEdge]) -> Self {
        let index: HashMap<String, usize> = concepts
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();

        let mut prerequisites: HashMap<String, Vec<String>> = HashMap::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();

        for edge in edges {
            if !index.contains_key(&edge.concept) {
                tracing::debug!(
                    prerequisite = %edge.prerequisite,
                    concept = %edge.concept,
                    "dropping edge into unknown concept"
                );
                continue;
            }
            let prereqs = prerequisites.entry(edge.concept.clone()).or_default();
            if prereqs.contains(&edge.prerequisite) {
                continue;
            }
            prereqs.push(edge.prerequisite.clone());
            if index.contains_key(&edge.prerequisite) {
                dependents
                    .entry(edge.prerequisite.clone())
                    .or_default()
                    .push(edge.concept.clone());
            } else {
                tracing::warn!(
                    prerequisite = %edge.prerequisite,
                    concept = %edge.concept,
                    "concept gated by unknown prerequisite"
                );
            }
        }

        Self {
            concepts,
            index,
            prerequisites,
            dependents,
        }
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn concept(&self, concept_id: &str) -> Option<&Concept> {
        self.index.get(concept_id).map(|&i| &self.concepts[i])
    }

    pub fn prerequisites(&self, concept_id: &str) -> &[String] {
        self.prerequisites
            .get(concept_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dependents(&self, concept_id: &str) -> &[String] {
        self.dependents
            .get(concept_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Concepts not yet completed whose prerequisites are all completed.
    /// Result keeps concept-list order.
    pub fn available(&self, completed: &HashSet<String>) -> Vec<&Concept> {
        self.concepts
            .iter()
            .filter(|c| !completed.contains(&c.id))
            .filter(|c| self.prerequisites(&c.id).iter().all(|p| completed.contains(p)))
            .collect()
    }

    pub fn available_ids(&self, completed: &HashSet<String>) -> HashSet<String> {
        self.available(completed)
            .into_iter()
            .map(|c| c.id.clone())
            .collect()
    }

    /// Fails with [`EngineError::CycleDetected`] if any prerequisite chain
    /// revisits a concept. Iterative DFS; walk depth is bounded by the node
    /// count so a corrupted edge set cannot make it spin.
    pub fn ensure_acyclic(&self) -> Result<(), EngineError> {
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;

        let node_count = self.concepts.len();
        let mut color = vec![WHITE; node_count];

        for start in 0..node_count {
            if color[start] != WHITE {
                continue;
            }
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = GREY;

            while let Some(&(node, next_child)) = stack.last() {
                if stack.len() > node_count {
                    return Err(EngineError::CycleDetected {
                        visited: stack.len(),
                        node_count,
                    });
                }
                let children = self.dependents(&self.concepts[node].id);
                if next_child < children.len() {
                    let child_id = &children[next_child];
                    if let Some(top) = stack.last_mut() {
                        top.1 += 1;
                    }
                    let Some(&child) = self.index.get(child_id) else {
                        continue;
                    };
                    match color[child] {
                        WHITE => {
                            color[child] = GREY;
                            stack.push((child, 0));
                        }
                        GREY => {
                            return Err(EngineError::CycleDetected {
                                visited: stack.len() + 1,
                                node_count,
                            });
                        }
                        _ => {}
                    }
                } else {
                    color[node] = BLACK;
                    stack.pop();
                }
            }
        }

        Ok(())
    }

    /// Every concept with the learner's completion flag and its prerequisite
    /// ids, incomplete first, then by difficulty tier and name.
    pub fn learning_path(&self, completed: &HashSet<String>) -> Vec<PathEntry> {
        let mut entries: Vec<PathEntry> = self
            .concepts
            .iter()
            .map(|c| PathEntry {
                id: c.id.clone(),
                name: c.name.clone(),
                difficulty: c.difficulty,
                completed: completed.contains(&c.id),
                prerequisites: self.prerequisites(&c.id).to_vec(),
            })
            .collect();

        entries.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then(a.difficulty.cmp(&b.difficulty))
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }

    pub fn course_graph(&self, completed: &HashSet<String>) -> CourseGraph {
        let nodes = self
            .concepts
            .iter()
            .map(|c| GraphNode {
                id: c.id.clone(),
                name: c.name.clone(),
                difficulty: c.difficulty,
                completed: completed.contains(&c.id),
            })
            .collect();

        let edges = self
            .concepts
            .iter()
            .flat_map(|c| {
                self.dependents(&c.id).iter().map(move |target| GraphEdge {
                    source: c.id.clone(),
                    target: target.clone(),
                    edge_type: "prerequisite",
                })
            })
            .collect();

        CourseGraph { nodes, edges }
    }
}
