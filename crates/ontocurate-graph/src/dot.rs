//! Graphviz DOT export of induced subgraphs.

use crate::store::Subgraph;

fn dot_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Labels wrap one word per line, which keeps boxes narrow in `dot` layouts.
fn wrap_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join("\n")
}

pub fn render_dot(name: &str, subgraph: &Subgraph) -> String {
    let mut out = String::new();
    out.push_str(&format!("digraph \"{}\" {{\n", dot_escape(name)));

    for node in &subgraph.nodes {
        let mut attrs: Vec<String> = vec![format!(
            "label=\"{}\"",
            dot_escape(&wrap_label(&node.label)).replace('\n', "\\n")
        )];
        for (k, v) in &node.attrs {
            attrs.push(format!("{k}=\"{}\"", dot_escape(v)));
        }
        out.push_str(&format!(
            "  \"{}\" [{}];\n",
            dot_escape(&node.key),
            attrs.join(", ")
        ));
    }

    for (from, to, edge) in &subgraph.edges {
        let mut attrs: Vec<String> = Vec::new();
        if edge.back {
            attrs.push("dir=back".to_string());
        } else {
            attrs.push(format!("color=\"{}\"", dot_escape(&edge.color)));
        }
        if let Some(name) = &edge.name {
            attrs.push(format!("label=\"{}\"", dot_escape(name)));
        }
        out.push_str(&format!(
            "  \"{}\" -> \"{}\" [{}];\n",
            dot_escape(from),
            dot_escape(to),
            attrs.join(", ")
        ));
    }

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GraphStore, RelationEdge};

    #[test]
    fn renders_nodes_and_typed_edges() {
        let mut g = GraphStore::new("addicto");
        g.insert_node("A:1", "tobacco \"product\"");
        g.insert_node("A:2", "cigar");
        g.insert_node("A:3", "nicotine");
        g.add_edge("A:1", "A:2", RelationEdge::subclass());
        g.add_edge("A:2", "A:3", RelationEdge::relation("has part"));

        let sub = g.induced_subgraph(&["A:1".into(), "A:2".into(), "A:3".into()]);
        let dot = render_dot("addicto", &sub);

        assert!(dot.starts_with("digraph \"addicto\" {\n"));
        assert!(dot.contains("\"A_1\" [label=\"tobacco\\n\\\"product\\\"\", fontname=\"helvetica\", shape=\"box\", style=\"rounded\"];"));
        assert!(dot.contains("\"A_1\" -> \"A_2\" [dir=back];"));
        assert!(dot.contains("\"A_2\" -> \"A_3\" [color=\"blue\", label=\"has part\"];"));
        assert!(dot.ends_with("}\n"));
    }
}
