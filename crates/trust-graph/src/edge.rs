use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A directed weighted trust relation between two identifiers, unique on
/// `(source, target)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustEdge {
    pub id: Uuid,
    pub source: String,
    pub target: String,
    pub trust_level: u8,
    /// The signed attestation payload backing this edge.
    pub attestation: String,
    /// Hex-encoded signature over the attestation payload.
    pub signature: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of an edge. Revocation and expiry are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    Active,
    Revoked,
    Expired,
}

impl TrustEdge {
    /// Lifecycle state at a point in time. Revocation wins over expiry.
    pub fn status(&self, now: DateTime<Utc>) -> EdgeStatus {
        if self.revoked_at.is_some() {
            EdgeStatus::Revoked
        } else if self.expires_at.map_or(false, |expires| expires <= now) {
            EdgeStatus::Expired
        } else {
            EdgeStatus::Active
        }
    }

    /// Whether this edge participates in traversal and scoring.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == EdgeStatus::Active
    }
}

/// Filter down to the edges that participate in traversal and scoring.
pub fn valid_edges(edges: &[TrustEdge], now: DateTime<Utc>) -> Vec<&TrustEdge> {
    edges.iter().filter(|e| e.is_active(now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

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
    fn fresh_edge_is_active() {
        let e = edge("a", "b", 80);
        assert_eq!(e.status(Utc::now()), EdgeStatus::Active);
    }

    #[test]
    fn revoked_wins_over_expired() {
        let now = Utc::now();
        let mut e = edge("a", "b", 80);
        e.revoked_at = Some(now - Duration::hours(1));
        e.expires_at = Some(now - Duration::hours(2));
        assert_eq!(e.status(now), EdgeStatus::Revoked);
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = Utc::now();
        let mut e = edge("a", "b", 80);
        e.expires_at = Some(now - Duration::seconds(1));
        assert_eq!(e.status(now), EdgeStatus::Expired);
    }

    #[test]
    fn future_expiry_is_active() {
        let now = Utc::now();
        let mut e = edge("a", "b", 80);
        e.expires_at = Some(now + Duration::hours(1));
        assert!(e.is_active(now));
    }

    #[test]
    fn valid_edges_filters_lifecycle() {
        let now = Utc::now();
        let active = edge("a", "b", 80);
        let mut revoked = edge("b", "c", 90);
        revoked.revoked_at = Some(now);
        let mut expired = edge("c", "d", 70);
        expired.expires_at = Some(now - Duration::minutes(5));

        let edges = vec![active, revoked, expired];
        let valid = valid_edges(&edges, now);

        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].source, "a");
    }
}
