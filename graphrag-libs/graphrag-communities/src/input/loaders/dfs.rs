use std::collections::HashSet;

use polars::{
    frame::DataFrame,
    prelude::{AnyValue, DataType, IntoSeries, ListBuilderTrait, ListStringChunkedBuilder, NamedFrom},
    series::Series,
};
use tracing::debug;

use crate::models::{Community, CommunityAssignment, EntityNode, RelationshipEdge};

pub fn read_entity_nodes(df: DataFrame, id_col: &str, title_col: &str) -> anyhow::Result<Vec<EntityNode>> {
    let column_names = unique_column_names(&[Some(id_col), Some(title_col)]);

    let mut df = df;
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    df.as_single_chunk_par();
    let rows = collect_rows(&df, &column_names)?;

    let entity_nodes = rows
        .iter()
        .map(|row| EntityNode {
            id: get_field(row, id_col, &column_names)
                .and_then(any_value_to_string)
                .unwrap_or_default(),
            title: get_field(row, title_col, &column_names)
                .and_then(any_value_to_string)
                .unwrap_or_default(),
        })
        .collect();

    Ok(entity_nodes)
}

pub fn read_relationship_edges(
    df: DataFrame,
    id_col: &str,
    source_col: &str,
    target_col: &str,
    text_unit_ids_col: Option<&str>,
) -> anyhow::Result<Vec<RelationshipEdge>> {
    let column_names =
        unique_column_names(&[Some(id_col), Some(source_col), Some(target_col), text_unit_ids_col]);

    let mut df = df;
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    df.as_single_chunk_par();
    let rows = collect_rows(&df, &column_names)?;

    let relationship_edges = rows
        .iter()
        .map(|row| RelationshipEdge {
            id: get_field(row, id_col, &column_names)
                .and_then(any_value_to_string)
                .unwrap_or_default(),
            source: get_field(row, source_col, &column_names)
                .and_then(any_value_to_string)
                .unwrap_or_default(),
            target: get_field(row, target_col, &column_names)
                .and_then(any_value_to_string)
                .unwrap_or_default(),
            text_unit_ids: text_unit_ids_col
                .and_then(|text_unit_ids_col| get_field(row, text_unit_ids_col, &column_names))
                .map(any_value_to_strings)
                .unwrap_or_default(),
        })
        .collect();

    Ok(relationship_edges)
}

/// Rows with a null or non-numeric community or level are skipped, since they cannot
/// take part in any grouping.
pub fn read_community_assignments(
    df: DataFrame,
    title_col: &str,
    community_col: &str,
    level_col: &str,
) -> anyhow::Result<Vec<CommunityAssignment>> {
    let column_names = unique_column_names(&[Some(title_col), Some(community_col), Some(level_col)]);

    let mut df = df;
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    df.as_single_chunk_par();
    let rows = collect_rows(&df, &column_names)?;

    let mut assignments = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in &rows {
        let community = get_field(row, community_col, &column_names).and_then(any_value_to_i64);
        let level = get_field(row, level_col, &column_names).and_then(any_value_to_i64);

        match (community, level) {
            (Some(community), Some(level)) => assignments.push(CommunityAssignment {
                title: get_field(row, title_col, &column_names)
                    .and_then(any_value_to_string)
                    .unwrap_or_default(),
                community,
                level,
            }),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("skipped {} community assignments without community or level", skipped);
    }

    Ok(assignments)
}

pub fn to_community_dataframe(communities: &[Community]) -> anyhow::Result<DataFrame> {
    let columns = vec![
        Series::new("id", communities.iter().map(|c| c.id.as_str()).collect::<Vec<_>>()),
        Series::new(
            "human_readable_id",
            communities.iter().map(|c| c.human_readable_id).collect::<Vec<i64>>(),
        ),
        Series::new("community", communities.iter().map(|c| c.community).collect::<Vec<i64>>()),
        Series::new("level", communities.iter().map(|c| c.level).collect::<Vec<i64>>()),
        Series::new("title", communities.iter().map(|c| c.title.as_str()).collect::<Vec<_>>()),
        string_list_series("entity_ids", communities.iter().map(|c| &c.entity_ids)),
        string_list_series("relationship_ids", communities.iter().map(|c| &c.relationship_ids)),
        string_list_series("text_unit_ids", communities.iter().map(|c| &c.text_unit_ids)),
        Series::new("period", communities.iter().map(|c| c.period.as_str()).collect::<Vec<_>>()),
        Series::new("size", communities.iter().map(|c| c.size).collect::<Vec<i64>>()),
    ];

    Ok(DataFrame::new(columns)?)
}

fn string_list_series<'a>(name: &str, lists: impl ExactSizeIterator<Item = &'a Vec<String>>) -> Series {
    let mut builder = ListStringChunkedBuilder::new(name, lists.len(), lists.len() * 4);
    for values in lists {
        builder.append_values_iter(values.iter().map(|v| v.as_str()));
    }
    builder.finish().into_series()
}

fn unique_column_names(columns: &[Option<&str>]) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .iter()
        .filter_map(|&v| v.map(|v| v.to_string()))
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

fn collect_rows<'a>(df: &'a DataFrame, column_names: &[String]) -> anyhow::Result<Vec<Vec<AnyValue<'a>>>> {
    let mut iters = df.columns(column_names)?.iter().map(|s| s.iter()).collect::<Vec<_>>();

    let mut rows = Vec::with_capacity(df.height());
    for _row in 0..df.height() {
        let mut row_values = Vec::with_capacity(iters.len());
        for iter in &mut iters {
            if let Some(value) = iter.next() {
                row_values.push(value);
            }
        }
        rows.push(row_values);
    }

    Ok(rows)
}

fn get_field<'a>(row: &[AnyValue<'a>], column_name: &str, column_names: &[String]) -> Option<AnyValue<'a>> {
    column_names
        .iter()
        .position(|x| x == column_name)
        .and_then(|index| row.get(index).cloned())
}

fn any_value_to_string(value: AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => Some(s.to_string()),
        AnyValue::StringOwned(s) => Some(s.to_string()),
        value => Some(value.to_string()),
    }
}

fn any_value_to_i64(value: AnyValue) -> Option<i64> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => parse_integer(s),
        AnyValue::StringOwned(s) => parse_integer(s.as_str()),
        value => value.extract::<i64>(),
    }
}

fn parse_integer(value: &str) -> Option<i64> {
    let value = value.trim();
    value
        .parse::<i64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|v| v.fract() == 0.0).map(|v| v as i64))
}

fn any_value_to_strings(value: AnyValue) -> Vec<String> {
    match value {
        AnyValue::Null => Vec::new(),
        AnyValue::List(series) => series
            .cast(&DataType::String)
            .ok()
            .map(|series| {
                series
                    .str()
                    .map(|values| values.into_iter().flatten().map(|v| v.to_string()).collect::<Vec<_>>())
                    .unwrap_or_default()
            })
            .unwrap_or_default(),
        AnyValue::String(s) => parse_list_literal(s),
        AnyValue::StringOwned(s) => parse_list_literal(s.as_str()),
        value => vec![value.to_string()],
    }
}

/// Parses list cells that were flattened to text, as happens with CSV tables. Accepts
/// JSON arrays, Python list literals (`['a', 'b']`) and bare scalars.
pub fn parse_list_literal(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return vec![trimmed.to_string()];
    }

    if let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(trimmed) {
        return values
            .into_iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }

    trimmed[1..trimmed.len() - 1]
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
