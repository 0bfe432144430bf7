//! Renders a state space into a self-contained HTML graph document.

use crate::statespace::{Node, StateSpace};
use serde_json::Value;

/// Produces the HTML document for a state space. `physics` toggles the
/// renderer's physics simulation, as requested by `--enable-physics`.
pub fn render(space: &StateSpace, physics: bool) -> String {
    let mut nodes = Vec::new();
    for idx in space.graph.node_indices() {
        let label = match &space.graph[idx] {
            Node::Entry => "ENTRY".to_string(),
            Node::Exit => "EXIT".to_string(),
            Node::Block {
                contract, label, ..
            } => format!("{}\n{}", space.contracts[*contract].name, label),
        };
        nodes.push(serde_json::json!({
            "id": idx.index(),
            "label": label,
            "shape": "box",
        }));
    }

    let mut edges = Vec::new();
    for edge in space.graph.edge_indices() {
        if let Some((src, dst)) = space.graph.edge_endpoints(edge) {
            edges.push(serde_json::json!({
                "from": src.index(),
                "to": dst.index(),
                "label": space.graph[edge].to_string(),
                "arrows": "to",
            }));
        }
    }

    document(
        &Value::Array(nodes).to_string(),
        &Value::Array(edges).to_string(),
        physics,
    )
}

fn document(nodes: &str, edges: &str, physics: bool) -> String {
    format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>argus state space</title>
<script src="https://unpkg.com/vis-network@9.1.6/standalone/umd/vis-network.min.js"></script>
<style>
  html, body {{ margin: 0; height: 100%; background: #1e1e1e; }}
  #statespace {{ width: 100%; height: 100%; }}
</style>
</head>
<body>
<div id="statespace"></div>
<script>
  var nodes = new vis.DataSet({nodes});
  var edges = new vis.DataSet({edges});
  var options = {{
    physics: {{ enabled: {physics} }},
    nodes: {{ font: {{ face: "monospace", color: "#d4d4d4" }}, color: "#2d2d30" }},
    edges: {{ font: {{ size: 10 }} }}
  }};
  new vis.Network(document.getElementById("statespace"), {{ nodes: nodes, edges: edges }}, options);
</script>
</body>
</html>
"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statespace::{Mode, StateSpaceBuilder};
    use argus_core::{indexed_address, ContractSource};

    #[tokio::test]
    async fn renders_nodes_and_physics_flag() {
        let contract = ContractSource::new(
            "MAIN",
            indexed_address(0),
            hex::decode("600100").unwrap(),
        );
        let space = StateSpaceBuilder::new(Mode::Simplified)
            .build(&[contract], None)
            .await
            .unwrap();

        let with_physics = render(&space, true);
        assert!(with_physics.contains("vis.Network"));
        assert!(with_physics.contains("ENTRY"));
        assert!(with_physics.contains("\"label\":\"MAIN"));
        assert!(with_physics.contains("enabled: true"));

        let without = render(&space, false);
        assert!(without.contains("enabled: false"));
    }
}
