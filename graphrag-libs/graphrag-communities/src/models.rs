use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityNode {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub text_unit_ids: Vec<String>,
}

/// Membership of one entity in one community at one hierarchy level.
/// Level 0 is the coarsest partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityAssignment {
    pub title: String,
    pub community: i64,
    pub level: i64,
}

/// Per-(community, level) relationship rollup. Lists may carry repeats until
/// they are deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipAggregate {
    pub community: i64,
    pub level: i64,
    pub relationship_ids: Vec<String>,
    pub text_unit_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub human_readable_id: i64,
    pub community: i64,
    pub level: i64,
    pub title: String,
    pub entity_ids: Vec<String>,
    pub relationship_ids: Vec<String>,
    pub text_unit_ids: Vec<String>,
    pub period: String,
    pub size: i64,
}
