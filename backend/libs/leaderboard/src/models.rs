use serde::{Deserialize, Serialize};
use std::fmt;

/// Legacy sentinel for "member not found" in score and rank fields.
pub const NOT_FOUND: i64 = -1;

/// A member and its score as held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub member: String,
    pub score: i64,
}

impl Entry {
    pub fn new(member: impl Into<String>, score: i64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// Member with its live score and competition rank.
///
/// `rank` is the number of members with a strictly greater score, plus one.
/// It is derived on every read and never written back to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankScore {
    pub member: String,
    pub score: i64,
    pub rank: u64,
}

impl fmt::Display for RankScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "member:{} score:{} rank:{}",
            self.member, self.score, self.rank
        )
    }
}

/// Result of resolving one name in a batch lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RankedMember {
    Present(RankScore),
    Absent { member: String },
}

impl RankedMember {
    pub fn member(&self) -> &str {
        match self {
            RankedMember::Present(rs) => &rs.member,
            RankedMember::Absent { member } => member,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, RankedMember::Present(_))
    }

    pub fn score(&self) -> Option<i64> {
        match self {
            RankedMember::Present(rs) => Some(rs.score),
            RankedMember::Absent { .. } => None,
        }
    }

    pub fn rank(&self) -> Option<u64> {
        match self {
            RankedMember::Present(rs) => Some(rs.rank),
            RankedMember::Absent { .. } => None,
        }
    }

    /// Score, or [`NOT_FOUND`] for an absent member.
    pub fn score_or_sentinel(&self) -> i64 {
        self.score().unwrap_or(NOT_FOUND)
    }

    /// Rank, or [`NOT_FOUND`] for an absent member.
    pub fn rank_or_sentinel(&self) -> i64 {
        self.rank().map(|r| r as i64).unwrap_or(NOT_FOUND)
    }

    pub fn into_present(self) -> Option<RankScore> {
        match self {
            RankedMember::Present(rs) => Some(rs),
            RankedMember::Absent { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_score_display() {
        let rs = RankScore {
            member: "member_1".to_string(),
            score: 50,
            rank: 1,
        };
        assert_eq!(rs.to_string(), "member:member_1 score:50 rank:1");
    }

    #[test]
    fn test_absent_member_sentinels() {
        let absent = RankedMember::Absent {
            member: "ghost".to_string(),
        };
        assert_eq!(absent.member(), "ghost");
        assert!(!absent.is_present());
        assert_eq!(absent.score_or_sentinel(), NOT_FOUND);
        assert_eq!(absent.rank_or_sentinel(), NOT_FOUND);
        assert!(absent.into_present().is_none());
    }

    #[test]
    fn test_negative_score_is_not_absent() {
        let present = RankedMember::Present(RankScore {
            member: "debtor".to_string(),
            score: -1,
            rank: 4,
        });
        assert!(present.is_present());
        assert_eq!(present.score(), Some(-1));
        assert_eq!(present.rank_or_sentinel(), 4);
    }

    #[test]
    fn test_ranked_member_serialization() {
        let absent = RankedMember::Absent {
            member: "ghost".to_string(),
        };
        let json = serde_json::to_value(&absent).unwrap();
        assert_eq!(json["status"], "absent");
        assert_eq!(json["member"], "ghost");

        let present = RankedMember::Present(RankScore {
            member: "m".to_string(),
            score: 10,
            rank: 2,
        });
        let json = serde_json::to_value(&present).unwrap();
        assert_eq!(json["status"], "present");
        assert_eq!(json["rank"], 2);
    }
}
