//! Computation graph stored inside a function.
//!
//! # Responsibility
//! - Model the node graph (feature sources, script nodes, one output node).
//! - Validate that node-to-node dependencies form a DAG.
//! - Serialize to and from the JSON stored in `functions.function_graph`.
//!
//! # Invariants
//! - Feature nodes have no dependencies; they are the graph's sources.
//! - The set of feature node `feature_id`s is the function's input set.

use super::FeatureId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Node identifier, unique within one graph.
pub type NodeId = u32;

/// Edge from an input connector to the node feeding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDependency {
    pub connector_index: u32,
    pub node_id: NodeId,
}

/// User supplied value for one script configuration field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "config_type", rename_all = "snake_case")]
pub enum ScriptConfigValue {
    Text { id: String, value: String },
    Number { id: String, value: f64 },
    Checkbox { id: String, value: bool },
    Enum { id: String, value: String },
    UInt { id: String, value: u32 },
    Duration { id: String, seconds: f64 },
    /// Minutes since midnight.
    LocalTime { id: String, minutes: u32 },
}

/// One node in the computation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "snake_case")]
pub enum FunctionGraphNode {
    /// Reads the series of one feature.
    FeatureNode {
        id: NodeId,
        x: f32,
        y: f32,
        feature_id: FeatureId,
    },
    /// Transforms its inputs with a script (executed outside this crate).
    LuaScriptNode {
        id: NodeId,
        x: f32,
        y: f32,
        script: String,
        input_connector_count: u32,
        #[serde(default)]
        configuration: Vec<ScriptConfigValue>,
        dependencies: Vec<NodeDependency>,
    },
}

impl FunctionGraphNode {
    pub fn id(&self) -> NodeId {
        match self {
            Self::FeatureNode { id, .. } | Self::LuaScriptNode { id, .. } => *id,
        }
    }

    pub fn dependencies(&self) -> &[NodeDependency] {
        match self {
            Self::FeatureNode { .. } => &[],
            Self::LuaScriptNode { dependencies, .. } => dependencies,
        }
    }
}

/// Sink node whose input is the function's output series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputNode {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub dependencies: Vec<NodeDependency>,
}

/// Declarative computation graph of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionGraph {
    pub nodes: Vec<FunctionGraphNode>,
    pub output_node: OutputNode,
    #[serde(default)]
    pub is_duration: bool,
}

/// Structural problem found by [`FunctionGraph::validate_acyclic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FunctionGraphError {
    /// A dependency chain returns to `node_id`.
    #[error("node {node_id} depends on itself")]
    Cycle { node_id: NodeId },
    /// Two nodes share `node_id`.
    #[error("node id {node_id} is used more than once")]
    DuplicateNodeId { node_id: NodeId },
}

impl FunctionGraph {
    /// Graph whose output reads the listed features directly.
    ///
    /// Each feature gets one feature node; the output node depends on all of
    /// them in order.
    pub fn passthrough(feature_ids: &[FeatureId]) -> Self {
        let nodes: Vec<FunctionGraphNode> = feature_ids
            .iter()
            .zip(1u32..)
            .map(|(feature_id, id)| FunctionGraphNode::FeatureNode {
                id,
                x: 0.0,
                y: id as f32 * 100.0,
                feature_id: *feature_id,
            })
            .collect();
        let dependencies = nodes
            .iter()
            .map(|node| NodeDependency {
                connector_index: 0,
                node_id: node.id(),
            })
            .collect();
        Self {
            nodes,
            output_node: OutputNode {
                id: 0,
                x: 400.0,
                y: 0.0,
                dependencies,
            },
            is_duration: false,
        }
    }

    /// Feature ids read by this graph, deduplicated.
    pub fn feature_node_ids(&self) -> BTreeSet<FeatureId> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                FunctionGraphNode::FeatureNode { feature_id, .. } => Some(*feature_id),
                FunctionGraphNode::LuaScriptNode { .. } => None,
            })
            .collect()
    }

    /// Checks that node dependencies, starting from the output node, form a
    /// DAG.
    ///
    /// Uses three-colour DFS. Dependencies naming unknown nodes are ignored;
    /// they cannot close a cycle.
    pub fn validate_acyclic(&self) -> Result<(), FunctionGraphError> {
        let mut edges: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in &self.nodes {
            let targets = node.dependencies().iter().map(|dep| dep.node_id).collect();
            if edges.insert(node.id(), targets).is_some() || node.id() == self.output_node.id {
                return Err(FunctionGraphError::DuplicateNodeId { node_id: node.id() });
            }
        }
        edges.insert(
            self.output_node.id,
            self.output_node
                .dependencies
                .iter()
                .map(|dep| dep.node_id)
                .collect(),
        );

        let mut colours: HashMap<NodeId, Colour> = HashMap::new();
        let mut roots: Vec<NodeId> = vec![self.output_node.id];
        roots.extend(self.nodes.iter().map(FunctionGraphNode::id));

        for root in roots {
            if colours.contains_key(&root) {
                continue;
            }
            // (node, next edge index) frames keep the walk iterative.
            let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
            colours.insert(root, Colour::Grey);
            while let Some(&(node, next)) = stack.last() {
                let target = edges.get(&node).and_then(|targets| targets.get(next)).copied();
                let Some(target) = target else {
                    colours.insert(node, Colour::Black);
                    stack.pop();
                    continue;
                };
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                if !edges.contains_key(&target) {
                    continue;
                }
                match colours.get(&target).copied() {
                    Some(Colour::Grey) => return Err(FunctionGraphError::Cycle { node_id: target }),
                    Some(Colour::Black) => {}
                    None => {
                        colours.insert(target, Colour::Grey);
                        stack.push((target, 0));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Colour {
    Grey,
    Black,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(id: NodeId, deps: &[NodeId]) -> FunctionGraphNode {
        FunctionGraphNode::LuaScriptNode {
            id,
            x: 0.0,
            y: 0.0,
            script: "return x".to_string(),
            input_connector_count: deps.len() as u32,
            configuration: Vec::new(),
            dependencies: deps
                .iter()
                .enumerate()
                .map(|(index, node_id)| NodeDependency {
                    connector_index: index as u32,
                    node_id: *node_id,
                })
                .collect(),
        }
    }

    #[test]
    fn passthrough_graph_is_acyclic_and_lists_inputs() {
        let graph = FunctionGraph::passthrough(&[7, 3, 7]);
        assert!(graph.validate_acyclic().is_ok());
        assert_eq!(graph.feature_node_ids().into_iter().collect::<Vec<_>>(), vec![3, 7]);
    }

    #[test]
    fn script_chain_is_acyclic() {
        let mut graph = FunctionGraph::passthrough(&[1]);
        graph.nodes.push(script(2, &[1]));
        graph.nodes.push(script(3, &[2, 1]));
        graph.output_node.dependencies = vec![NodeDependency {
            connector_index: 0,
            node_id: 3,
        }];
        assert!(graph.validate_acyclic().is_ok());
    }

    #[test]
    fn script_loop_is_rejected() {
        let mut graph = FunctionGraph::passthrough(&[1]);
        graph.nodes.push(script(2, &[3]));
        graph.nodes.push(script(3, &[2]));
        graph.output_node.dependencies = vec![NodeDependency {
            connector_index: 0,
            node_id: 2,
        }];
        assert!(matches!(
            graph.validate_acyclic(),
            Err(FunctionGraphError::Cycle { .. })
        ));
    }

    #[test]
    fn self_loop_off_the_output_path_is_rejected() {
        let mut graph = FunctionGraph::passthrough(&[1]);
        graph.nodes.push(script(5, &[5]));
        assert_eq!(
            graph.validate_acyclic(),
            Err(FunctionGraphError::Cycle { node_id: 5 })
        );
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let mut graph = FunctionGraph::passthrough(&[1]);
        graph.nodes.push(script(1, &[]));
        assert_eq!(
            graph.validate_acyclic(),
            Err(FunctionGraphError::DuplicateNodeId { node_id: 1 })
        );
    }

    #[test]
    fn json_keeps_node_variants() {
        let mut graph = FunctionGraph::passthrough(&[4]);
        graph.nodes.push(FunctionGraphNode::LuaScriptNode {
            id: 9,
            x: 1.0,
            y: 2.0,
            script: "return 1".to_string(),
            input_connector_count: 1,
            configuration: vec![ScriptConfigValue::Duration {
                id: "window".to_string(),
                seconds: 60.0,
            }],
            dependencies: vec![NodeDependency {
                connector_index: 0,
                node_id: 1,
            }],
        });
        let json = graph.to_json().unwrap();
        assert!(json.contains("\"node_type\":\"lua_script_node\""));
        assert_eq!(FunctionGraph::from_json(&json).unwrap(), graph);
    }
}
