use std::collections::HashMap;

use crate::edge::TrustEdge;

/// Forward and reverse adjacency over a set of valid edges.
///
/// Both maps are built in a single pass. Neighbor lists preserve the
/// enumeration order of the input slice, which is what makes traversal
/// deterministic; callers feed edges ordered by `created_at, id`.
pub struct GraphIndex<'a> {
    pub forward: HashMap<&'a str, Vec<(&'a str, u8)>>,
    pub reverse: HashMap<&'a str, Vec<(&'a str, u8)>>,
}

impl<'a> GraphIndex<'a> {
    pub fn build(edges: &[&'a TrustEdge]) -> Self {
        let mut forward: HashMap<&str, Vec<(&str, u8)>> = HashMap::new();
        let mut reverse: HashMap<&str, Vec<(&str, u8)>> = HashMap::new();

        for edge in edges {
            forward
                .entry(edge.source.as_str())
                .or_default()
                .push((edge.target.as_str(), edge.trust_level));
            reverse
                .entry(edge.target.as_str())
                .or_default()
                .push((edge.source.as_str(), edge.trust_level));
        }

        Self { forward, reverse }
    }

    pub fn outgoing(&self, did: &str) -> &[(&'a str, u8)] {
        self.forward.get(did).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, did: &str) -> &[(&'a str, u8)] {
        self.reverse.get(did).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::TrustEdge;
    use chrono::Utc;
    use uuid::Uuid;

    fn edge(source: &str, target: &str, level: u8) -> TrustEdge {
        TrustEdge {
            id: Uuid::new_v4(),
            source: source.to_string(),
            target: target.to_string(),
            trust_level: level,
            attestation: String::new(),
            signature: String::new(),
            created_at: Utc::now(),
            expires_at: None,
            revoked_at: None,
        }
    }

    #[test]
    fn builds_both_directions_in_order() {
        let edges = vec![edge("a", "b", 80), edge("a", "c", 60), edge("b", "c", 90)];
        let refs: Vec<&TrustEdge> = edges.iter().collect();
        let index = GraphIndex::build(&refs);

        assert_eq!(index.outgoing("a"), &[("b", 80), ("c", 60)]);
        assert_eq!(index.incoming("c"), &[("a", 60), ("b", 90)]);
        assert!(index.outgoing("c").is_empty());
    }
}
