//! Per-sport competition hierarchy.
//!
//! League nodes live in a flat relation; the serving layer wants a rooted
//! forest, ingestion only needs the flat alias index. Rows whose declared
//! parent is missing reattach at the root so an orphaned row can never make
//! its subtree vanish from the filter tree.

use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use std::collections::HashMap;

use crate::store::db::Db;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeagueNodeRow {
    pub id: i64,
    pub sport: String,
    pub parent_id: Option<i64>,
    pub node_type: String,
    pub name: String,
    pub sort_order: i32,
    /// Seeds the serving layer's initial filter state; not interpreted here.
    pub default_included: bool,
}

/// Serialized as-is for the read-only tree the serving layer consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueNode {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub node_type: String,
    pub name: String,
    pub sort_order: i32,
    pub default_included: bool,
    pub children: Vec<LeagueNode>,
}

pub async fn load_league_nodes(db: &Db, sport: &str) -> Result<Vec<LeagueNodeRow>> {
    let rows = sqlx::query(
        "SELECT id, sport, parent_id, node_type, name, sort_order, default_included
         FROM league_nodes WHERE sport = $1",
    )
    .persistent(false)
    .bind(sport)
    .fetch_all(&db.pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| LeagueNodeRow {
            id: r.get("id"),
            sport: r.get("sport"),
            parent_id: r.get("parent_id"),
            node_type: r.get("node_type"),
            name: r.get("name"),
            sort_order: r.get("sort_order"),
            default_included: r.get("default_included"),
        })
        .collect())
}

/// Assemble the rooted forest: group children by parent, attach each node
/// under its parent (root when the parent id is unknown), then sort
/// siblings by sort_order, ties broken by name, recursively.
pub fn build_league_tree(rows: Vec<LeagueNodeRow>) -> Vec<LeagueNode> {
    let known: HashMap<i64, ()> = rows.iter().map(|r| (r.id, ())).collect();
    let mut by_parent: HashMap<Option<i64>, Vec<LeagueNodeRow>> = HashMap::new();
    for row in rows {
        let parent = match row.parent_id {
            Some(p) if known.contains_key(&p) => Some(p),
            _ => None,
        };
        by_parent.entry(parent).or_default().push(row);
    }

    fn attach(
        parent: Option<i64>,
        by_parent: &mut HashMap<Option<i64>, Vec<LeagueNodeRow>>,
    ) -> Vec<LeagueNode> {
        let mut rows = by_parent.remove(&parent).unwrap_or_default();
        rows.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows.into_iter()
            .map(|row| {
                let children = attach(Some(row.id), by_parent);
                LeagueNode {
                    id: row.id,
                    parent_id: row.parent_id,
                    node_type: row.node_type,
                    name: row.name,
                    sort_order: row.sort_order,
                    default_included: row.default_included,
                    children,
                }
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, parent: Option<i64>, name: &str, sort: i32) -> LeagueNodeRow {
        LeagueNodeRow {
            id,
            sport: "basketball".into(),
            parent_id: parent,
            node_type: if parent.is_none() { "sport".into() } else { "league".into() },
            name: name.into(),
            sort_order: sort,
            default_included: true,
        }
    }

    #[test]
    fn builds_nested_tree_with_sorted_siblings() {
        let rows = vec![
            row(1, None, "Korvpall", 0),
            row(3, Some(1), "Meistriliiga", 2),
            row(2, Some(1), "Eesti–Läti liiga", 1),
            row(4, Some(1), "Karikas", 1),
            row(5, Some(2), "Play-off", 0),
        ];
        let tree = build_league_tree(rows);
        assert_eq!(tree.len(), 1);
        let root = &tree[0];
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        // sort_order first, name breaks the 1-1 tie
        assert_eq!(names, vec!["Eesti–Läti liiga", "Karikas", "Meistriliiga"]);
        assert_eq!(root.children[0].children[0].name, "Play-off");
    }

    #[test]
    fn orphans_fall_back_to_root() {
        let rows = vec![row(1, None, "Korvpall", 0), row(9, Some(404), "Orb", 5)];
        let tree = build_league_tree(rows);
        let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Korvpall", "Orb"]);
    }

    #[test]
    fn empty_input_yields_empty_forest() {
        assert!(build_league_tree(Vec::new()).is_empty());
    }
}
