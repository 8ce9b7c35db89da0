use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::edge::{valid_edges, TrustEdge};
use crate::index::GraphIndex;

/// Per-hop decay applied to trust along a path.
pub const TRUST_DECAY: f64 = 0.85;

/// Default traversal depth bound for path discovery.
pub const MAX_PATH_DEPTH: usize = 6;

#[derive(Debug, Clone)]
pub struct PathOptions {
    pub max_depth: usize,
    pub decay: f64,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_PATH_DEPTH,
            decay: TRUST_DECAY,
        }
    }
}

/// One vertex on a discovered path. `trust_level` is the weight of the edge
/// entering the vertex; the starting vertex carries 100.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathHop {
    pub did: String,
    pub trust_level: u8,
}

/// Outcome of a shortest-trust-path query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResult {
    pub from: String,
    pub to: String,
    pub found: bool,
    pub path: Vec<PathHop>,
    pub cumulative_trust: f64,
    pub hops: usize,
}

impl PathResult {
    fn not_found(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            found: false,
            path: Vec::new(),
            cumulative_trust: 0.0,
            hops: 0,
        }
    }
}

struct QueueEntry<'a> {
    did: &'a str,
    depth: usize,
    trust: f64,
    entering_level: u8,
    parent: Option<usize>,
}

/// Breadth-first shortest-trust-path over the active edges.
///
/// The queue is dequeued by index, visited vertices are never re-enqueued
/// (so cycles cannot loop), and parent pointers are tracked instead of
/// copying path vectors. The first dequeue of the target is the reported
/// path: shortest in hops, and among equal-hop paths the one discovered
/// first in edge-enumeration order.
pub fn find_path(edges: &[TrustEdge], from: &str, to: &str, options: &PathOptions) -> PathResult {
    let now = Utc::now();
    let valid = valid_edges(edges, now);
    let index = GraphIndex::build(&valid);

    // decay^d for every reachable depth
    let decay_pow: Vec<f64> = (0..=options.max_depth)
        .map(|d| options.decay.powi(d as i32))
        .collect();

    let mut queue: Vec<QueueEntry> = vec![QueueEntry {
        did: from,
        depth: 0,
        trust: 1.0,
        entering_level: 100,
        parent: None,
    }];
    let mut visited: HashSet<&str> = HashSet::from([from]);
    let mut head = 0;

    while head < queue.len() {
        let current = head;
        head += 1;

        let (did, depth, trust) = {
            let entry = &queue[current];
            (entry.did, entry.depth, entry.trust)
        };

        if did == to {
            // Walk parent pointers back to the source
            let mut hops = Vec::new();
            let mut cursor = Some(current);
            while let Some(i) = cursor {
                let entry = &queue[i];
                hops.push(PathHop {
                    did: entry.did.to_string(),
                    trust_level: entry.entering_level,
                });
                cursor = entry.parent;
            }
            hops.reverse();

            return PathResult {
                from: from.to_string(),
                to: to.to_string(),
                found: true,
                path: hops,
                cumulative_trust: trust,
                hops: depth,
            };
        }

        if depth == options.max_depth {
            continue;
        }

        for &(target, level) in index.outgoing(did) {
            if visited.contains(target) {
                continue;
            }
            visited.insert(target);
            queue.push(QueueEntry {
                did: target,
                depth: depth + 1,
                trust: trust * (level as f64 / 100.0) * decay_pow[depth],
                entering_level: level,
                parent: Some(current),
            });
        }
    }

    PathResult::not_found(from, to)
}
