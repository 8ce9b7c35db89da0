use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::edge::{valid_edges, TrustEdge};
use crate::index::GraphIndex;
use crate::path::TRUST_DECAY;

/// Depth bound for transitive reputation: only hops 2 and 3 contribute.
pub const MAX_REPUTATION_DEPTH: usize = 3;

/// Weight of the direct component in the combined score.
const DIRECT_WEIGHT: f64 = 0.7;

/// Weight of the transitive component in the combined score.
const TRANSITIVE_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct ReputationOptions {
    pub max_depth: usize,
    pub decay: f64,
}

impl Default for ReputationOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_REPUTATION_DEPTH,
            decay: TRUST_DECAY,
        }
    }
}

/// Aggregated inbound trust for a subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationSummary {
    pub score: f64,
    pub direct_trusters: usize,
    pub transitive_trusters: usize,
}

struct QueueEntry<'a> {
    did: &'a str,
    depth: usize,
    path_trust: f64,
}

/// Compute a subject's reputation over the active edges.
///
/// The direct component is the mean inbound trust level. The transitive
/// component walks the reverse index breadth-first from the subject,
/// seeding direct trusters at depth 1 with full path trust and accumulating
/// decayed contributions from hops 2 and 3.
pub fn reputation(
    edges: &[TrustEdge],
    subject: &str,
    options: &ReputationOptions,
) -> ReputationSummary {
    let now = Utc::now();
    let valid = valid_edges(edges, now);
    let index = GraphIndex::build(&valid);

    let direct = index.incoming(subject);
    let direct_score = if direct.is_empty() {
        0.0
    } else {
        let total: u64 = direct.iter().map(|&(_, level)| level as u64).sum();
        total as f64 / direct.len() as f64 / 100.0
    };

    let decay_pow: Vec<f64> = (0..=options.max_depth)
        .map(|d| options.decay.powi(d as i32))
        .collect();

    let mut visited: HashSet<&str> = HashSet::from([subject]);
    let mut queue: Vec<QueueEntry> = Vec::new();
    for &(truster, _) in direct {
        if visited.insert(truster) {
            queue.push(QueueEntry {
                did: truster,
                depth: 1,
                path_trust: 1.0,
            });
        }
    }

    let mut transitive_score = 0.0;
    let mut transitive_trusters: HashSet<&str> = HashSet::new();
    let mut head = 0;

    while head < queue.len() {
        let (did, depth, path_trust) = {
            let entry = &queue[head];
            (entry.did, entry.depth, entry.path_trust)
        };
        head += 1;

        if depth >= options.max_depth {
            continue;
        }

        for &(truster, level) in index.incoming(did) {
            let contribution = path_trust * (level as f64 / 100.0) * decay_pow[depth];
            transitive_score += contribution;

            if visited.insert(truster) {
                transitive_trusters.insert(truster);
                queue.push(QueueEntry {
                    did: truster,
                    depth: depth + 1,
                    path_trust: contribution,
                });
            }
        }
    }

    let score = (DIRECT_WEIGHT * direct_score + TRANSITIVE_WEIGHT * transitive_score.min(1.0))
        .min(1.0);

    ReputationSummary {
        score,
        direct_trusters: direct.len(),
        transitive_trusters: transitive_trusters.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
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

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {} got {}",
            expected,
            actual
        );
    }

    #[test]
    fn no_trusters_scores_zero() {
        let summary = reputation(&[], "S", &ReputationOptions::default());
        assert_close(summary.score, 0.0);
        assert_eq!(summary.direct_trusters, 0);
        assert_eq!(summary.transitive_trusters, 0);
    }

    #[test]
    fn single_direct_truster() {
        let edges = vec![edge("A", "S", 80)];
        let summary = reputation(&edges, "S", &ReputationOptions::default());

        // 0.7 * 0.8
        assert_close(summary.score, 0.56);
        assert_eq!(summary.direct_trusters, 1);
        assert_eq!(summary.transitive_trusters, 0);
    }

    #[test]
    fn direct_component_is_the_mean() {
        let edges = vec![edge("A", "S", 100), edge("B", "S", 50)];
        let summary = reputation(&edges, "S", &ReputationOptions::default());

        assert_close(summary.score, 0.7 * 0.75);
        assert_eq!(summary.direct_trusters, 2);
    }

    #[test]
    fn second_hop_contributes_with_decay() {
        let edges = vec![edge("B", "S", 100), edge("C", "B", 100)];
        let summary = reputation(&edges, "S", &ReputationOptions::default());

        // direct 1.0; transitive: 1.0 * 1.0 * 0.85
        assert_close(summary.score, (0.7 + 0.3 * 0.85_f64).min(1.0));
        assert_eq!(summary.direct_trusters, 1);
        assert_eq!(summary.transitive_trusters, 1);
    }

    #[test]
    fn third_hop_contributes_fourth_does_not() {
        let edges = vec![
            edge("B", "S", 100),
            edge("C", "B", 100),
            edge("D", "C", 100),
            edge("E", "D", 100),
        ];
        let summary = reputation(&edges, "S", &ReputationOptions::default());

        // hop 2: 0.85; hop 3: 0.85 * 0.85^2; hop 4 is out of range
        let transitive = 0.85 + 0.85 * 0.85_f64.powi(2);
        assert_close(summary.score, (0.7 + 0.3 * transitive.min(1.0)).min(1.0));
        assert_eq!(summary.transitive_trusters, 2);
    }

    #[test]
    fn revoked_and_expired_edges_are_excluded() {
        let now = Utc::now();
        let mut revoked = edge("A", "S", 100);
        revoked.revoked_at = Some(now);
        let mut expired = edge("B", "S", 100);
        expired.expires_at = Some(now - Duration::minutes(1));
        let active = edge("C", "S", 60);

        let summary = reputation(&[revoked, expired, active], "S", &ReputationOptions::default());

        assert_eq!(summary.direct_trusters, 1);
        assert_close(summary.score, 0.7 * 0.6);
    }

    #[test]
    fn score_is_capped_at_one() {
        // Many strong trusters each trusted by many others
        let mut edges = Vec::new();
        for i in 0..10 {
            let truster = format!("T{}", i);
            edges.push(edge(&truster, "S", 100));
            for j in 0..10 {
                edges.push(edge(&format!("U{}x{}", i, j), &truster, 100));
            }
        }

        let summary = reputation(&edges, "S", &ReputationOptions::default());
        assert!(summary.score <= 1.0);
        assert_close(summary.score, 1.0);
    }

    #[test]
    fn cycles_terminate() {
        let edges = vec![edge("A", "S", 80), edge("S", "A", 80), edge("B", "A", 70)];
        let summary = reputation(&edges, "S", &ReputationOptions::default());

        assert_eq!(summary.direct_trusters, 1);
        // B reaches S through A at hop 2
        assert_eq!(summary.transitive_trusters, 1);
    }
}
