use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};
use polars::frame::DataFrame;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    flows::relational::{group_by, inner_join, JoinStats},
    input::loaders::dfs::{
        read_community_assignments, read_entity_nodes, read_relationship_edges, to_community_dataframe,
    },
    models::{Community, CommunityAssignment, EntityNode, RelationshipAggregate, RelationshipEdge},
};

/// Column layout of the final communities table.
pub const COMMUNITY_COLUMNS: [&str; 10] = [
    "id",
    "human_readable_id",
    "community",
    "level",
    "title",
    "entity_ids",
    "relationship_ids",
    "text_unit_ids",
    "period",
    "size",
];

/// Entity ids per community, across all levels.
pub type EntityMembership = BTreeMap<i64, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelDiagnostics {
    pub level: i64,
    pub source_join: JoinStats,
    pub target_join: JoinStats,
    /// Edges whose endpoints both resolved at this level but landed in different communities.
    pub cross_community_edges: usize,
    pub aggregated_communities: usize,
}

/// Where rows fell out of the inner joins. Nothing here changes the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupDiagnostics {
    pub entity_join: JoinStats,
    pub levels: Vec<LevelDiagnostics>,
    pub community_join: JoinStats,
}

#[derive(Debug, Clone, Default)]
pub struct CommunityRollup {
    pub communities: Vec<Community>,
    pub diagnostics: RollupDiagnostics,
}

/// Builds the final communities table from the base entity nodes, relationship edges and
/// community assignments.
pub fn create_final_communities(
    base_entity_nodes: &DataFrame,
    base_relationship_edges: &DataFrame,
    base_communities: &DataFrame,
) -> anyhow::Result<DataFrame> {
    let entity_nodes = read_entity_nodes(base_entity_nodes.clone(), "id", "title")?;
    let relationship_edges = read_relationship_edges(
        base_relationship_edges.clone(),
        "id",
        "source",
        "target",
        Some("text_unit_ids"),
    )?;
    let assignments = read_community_assignments(base_communities.clone(), "title", "community", "level")?;

    let rollup = build_community_rollup(&entity_nodes, &relationship_edges, &assignments);
    info!(
        "created {} final communities from {} entities, {} relationships and {} assignments",
        rollup.communities.len(),
        entity_nodes.len(),
        relationship_edges.len(),
        assignments.len()
    );

    to_community_dataframe(&rollup.communities)
}

pub fn build_community_rollup(
    entity_nodes: &[EntityNode],
    relationship_edges: &[RelationshipEdge],
    assignments: &[CommunityAssignment],
) -> CommunityRollup {
    build_community_rollup_for_period(entity_nodes, relationship_edges, assignments, Utc::now().date_naive())
}

/// Same as [`build_community_rollup`] with a caller-supplied generation date.
pub fn build_community_rollup_for_period(
    entity_nodes: &[EntityNode],
    relationship_edges: &[RelationshipEdge],
    assignments: &[CommunityAssignment],
    period: NaiveDate,
) -> CommunityRollup {
    let (membership, entity_join) = aggregate_entity_membership(entity_nodes, assignments);
    let (aggregates, levels) = aggregate_relationships_by_level(relationship_edges, assignments);
    let aggregates = deduplicate(aggregates);

    let period = period.format("%Y-%m-%d").to_string();
    let (communities, community_join) = assemble_communities(aggregates, &membership, &period);

    debug!(
        "community join kept {} rows, dropped {} aggregates without entities, {} communities without edges",
        community_join.matched,
        community_join.unmatched_left,
        community_join.unmatched_right
    );

    CommunityRollup {
        communities,
        diagnostics: RollupDiagnostics {
            entity_join,
            levels,
            community_join,
        },
    }
}

/// Inner join of assignments to entity nodes on title, grouped by community. Ids keep the
/// order of the assignment rows they came from.
pub fn aggregate_entity_membership(
    entity_nodes: &[EntityNode],
    assignments: &[CommunityAssignment],
) -> (EntityMembership, JoinStats) {
    let (joined, stats) = inner_join(assignments, entity_nodes, |a| a.title.as_str(), |e| e.title.as_str());

    let membership = group_by(
        joined,
        |(assignment, _)| assignment.community,
        |ids: &mut Vec<String>, (_, entity)| ids.push(entity.id.clone()),
    );

    debug!(
        "entity membership: {} communities, {} unassigned entities, {} assignments without entity",
        membership.len(),
        stats.unmatched_right,
        stats.unmatched_left
    );

    (membership, stats)
}

/// Aggregates intra-community relationships for every level present in `assignments`.
/// Lists may still contain repeats; see [`deduplicate`].
pub fn aggregate_relationships_by_level(
    relationship_edges: &[RelationshipEdge],
    assignments: &[CommunityAssignment],
) -> (Vec<RelationshipAggregate>, Vec<LevelDiagnostics>) {
    let levels: BTreeSet<i64> = assignments.iter().map(|a| a.level).collect();

    let mut aggregates = Vec::new();
    let mut diagnostics = Vec::with_capacity(levels.len());
    for level in levels {
        let (level_aggregates, level_diagnostics) = aggregate_level(relationship_edges, assignments, level);
        aggregates.extend(level_aggregates);
        diagnostics.push(level_diagnostics);
    }

    (aggregates, diagnostics)
}

fn aggregate_level(
    relationship_edges: &[RelationshipEdge],
    assignments: &[CommunityAssignment],
    level: i64,
) -> (Vec<RelationshipAggregate>, LevelDiagnostics) {
    let at_level: Vec<&CommunityAssignment> = assignments.iter().filter(|a| a.level == level).collect();

    let (sources, source_join) = inner_join(
        relationship_edges,
        &at_level,
        |edge| edge.source.as_str(),
        |assignment| assignment.title.as_str(),
    );
    let (targets, target_join) = inner_join(
        &sources,
        &at_level,
        |(edge, _)| edge.target.as_str(),
        |assignment| assignment.title.as_str(),
    );

    let mut cross_community_edges = 0;
    let mut exploded: Vec<(i64, &str, Option<&str>)> = Vec::new();
    for ((edge, source), target) in targets {
        if source.community != target.community {
            cross_community_edges += 1;
            continue;
        }
        // An edge without text units still belongs to the community.
        if edge.text_unit_ids.is_empty() {
            exploded.push((source.community, edge.id.as_str(), None));
        }
        for text_unit_id in &edge.text_unit_ids {
            exploded.push((source.community, edge.id.as_str(), Some(text_unit_id.as_str())));
        }
    }

    let grouped = group_by(
        exploded,
        |(community, _, _)| *community,
        |acc: &mut (Vec<String>, Vec<String>), (_, relationship_id, text_unit_id)| {
            acc.0.push(relationship_id.to_string());
            if let Some(text_unit_id) = text_unit_id {
                acc.1.push(text_unit_id.to_string());
            }
        },
    );

    let aggregates: Vec<RelationshipAggregate> = grouped
        .into_iter()
        .map(|(community, (relationship_ids, text_unit_ids))| RelationshipAggregate {
            community,
            level,
            relationship_ids,
            text_unit_ids,
        })
        .collect();

    let diagnostics = LevelDiagnostics {
        level,
        source_join,
        target_join,
        cross_community_edges,
        aggregated_communities: aggregates.len(),
    };
    debug!(
        "level {}: {} source matches, {} target matches, {} cross-community edges, {} communities",
        level,
        source_join.matched,
        target_join.matched,
        cross_community_edges,
        diagnostics.aggregated_communities
    );

    (aggregates, diagnostics)
}

/// Replaces both id lists of every aggregate with their sorted unique form.
pub fn deduplicate(aggregates: Vec<RelationshipAggregate>) -> Vec<RelationshipAggregate> {
    aggregates
        .into_iter()
        .map(|aggregate| RelationshipAggregate {
            relationship_ids: sorted_unique(aggregate.relationship_ids),
            text_unit_ids: sorted_unique(aggregate.text_unit_ids),
            ..aggregate
        })
        .collect()
}

fn sorted_unique(values: Vec<String>) -> Vec<String> {
    values.into_iter().collect::<BTreeSet<String>>().into_iter().collect()
}

/// Inner join of the deduplicated aggregates with the entity membership on community id.
/// Every surviving row gets a fresh id and the shared `period`.
pub fn assemble_communities(
    aggregates: Vec<RelationshipAggregate>,
    membership: &EntityMembership,
    period: &str,
) -> (Vec<Community>, JoinStats) {
    let members: Vec<(i64, &Vec<String>)> =
        membership.iter().map(|(community, ids)| (*community, ids)).collect();
    let (joined, stats) =
        inner_join(&aggregates, &members, |aggregate| aggregate.community, |member| member.0);

    let communities = joined
        .into_iter()
        .map(|(aggregate, (community, entity_ids))| Community {
            id: Uuid::new_v4().to_string(),
            human_readable_id: *community,
            community: *community,
            level: aggregate.level,
            title: format!("Community {}", community),
            entity_ids: entity_ids.to_vec(),
            relationship_ids: aggregate.relationship_ids.clone(),
            text_unit_ids: aggregate.text_unit_ids.clone(),
            period: period.to_string(),
            size: entity_ids.len() as i64,
        })
        .collect();

    (communities, stats)
}
