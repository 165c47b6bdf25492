//! In-batch parent/child structure: commit ordering and the preview tree.
//!
//! Rows reference their parent through `parentId` (or `qubitParentSlug`)
//! matched against another row's `legacyId`. References that do not hit a
//! row in the batch point at existing records and impose no ordering.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use serde::Serialize;

use crate::row::DataRow;
use crate::types::RowNumber;

/// Label shown for rows without a title.
pub const UNTITLED: &str = "[Untitled]";

/// `legacyId` → row number; the first row claiming an id wins.
pub fn legacy_index<'a>(rows: &[&'a DataRow]) -> HashMap<&'a str, RowNumber> {
    let mut index = HashMap::new();
    for row in rows {
        if let Some(id) = row.legacy_id() {
            index.entry(id).or_insert(row.row_number);
        }
    }
    index
}

/// In-batch parent row of each row that has one.
pub fn parent_links(rows: &[&DataRow]) -> HashMap<RowNumber, RowNumber> {
    let index = legacy_index(rows);
    rows.iter()
        .filter_map(|row| {
            let parent = *index.get(row.parent_ref()?)?;
            Some((row.row_number, parent))
        })
        .collect()
}

/// Result of ordering a batch for commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPlan {
    /// Rows in commit order: ascending row number, except that a parent
    /// always precedes its children.
    pub order: Vec<RowNumber>,
    /// Rows whose parent chain loops back on itself (and their descendants).
    pub cyclic: Vec<RowNumber>,
}

/// Order rows so every in-batch parent is committed before its children.
pub fn plan_commit_order(rows: &[&DataRow]) -> CommitPlan {
    let links = parent_links(rows);
    let mut children: HashMap<RowNumber, Vec<RowNumber>> = HashMap::new();
    for (&child, &parent) in &links {
        children.entry(parent).or_default().push(child);
    }

    let mut ready: BinaryHeap<Reverse<RowNumber>> = rows
        .iter()
        .map(|r| r.row_number)
        .filter(|n| !links.contains_key(n))
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(rows.len());
    while let Some(Reverse(next)) = ready.pop() {
        order.push(next);
        if let Some(kids) = children.get(&next) {
            ready.extend(kids.iter().copied().map(Reverse));
        }
    }

    let mut cyclic: Vec<RowNumber> = rows
        .iter()
        .map(|r| r.row_number)
        .filter(|n| !order.contains(n))
        .collect();
    cyclic.sort_unstable();

    CommitPlan { order, cyclic }
}

// ── Preview tree ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub row_number: RowNumber,
    pub title: String,
    pub level: String,
    pub legacy_id: Option<String>,
    pub is_valid: bool,
    pub has_digital_object: bool,
    pub children: Vec<TreeNode>,
}

/// Nest rows under their in-batch parents. Rows without one, and rows
/// caught in a cycle, become roots. Siblings keep row-number order.
pub fn build_tree<F>(rows: &[&DataRow], has_digital_object: F) -> Vec<TreeNode>
where
    F: Fn(&DataRow) -> bool,
{
    let plan = plan_commit_order(rows);
    let mut links = parent_links(rows);
    links.retain(|child, _| !plan.cyclic.contains(child));

    let mut children: HashMap<RowNumber, Vec<&DataRow>> = HashMap::new();
    let mut roots: Vec<&DataRow> = Vec::new();
    for &row in rows {
        match links.get(&row.row_number) {
            Some(parent) => children.entry(*parent).or_default().push(row),
            None => roots.push(row),
        }
    }
    roots.sort_by_key(|r| r.row_number);
    for list in children.values_mut() {
        list.sort_by_key(|r| r.row_number);
    }

    fn node<F: Fn(&DataRow) -> bool>(
        row: &DataRow,
        children: &HashMap<RowNumber, Vec<&DataRow>>,
        has_do: &F,
    ) -> TreeNode {
        TreeNode {
            row_number: row.row_number,
            title: row.title().unwrap_or(UNTITLED).to_string(),
            level: row.level_of_description().unwrap_or_default().to_string(),
            legacy_id: row.legacy_id().map(str::to_string),
            is_valid: row.is_valid,
            has_digital_object: has_do(row),
            children: children
                .get(&row.row_number)
                .map(|kids| kids.iter().map(|k| node(k, children, has_do)).collect())
                .unwrap_or_default(),
        }
    }

    roots
        .into_iter()
        .map(|r| node(r, &children, &has_digital_object))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::FieldMap;

    fn row(n: RowNumber, legacy: &str, parent: &str) -> DataRow {
        let mut fields = FieldMap::new();
        if !legacy.is_empty() {
            fields.insert("legacyId".into(), legacy.into());
        }
        if !parent.is_empty() {
            fields.insert("parentId".into(), parent.into());
        }
        fields.insert("title".into(), format!("Row {n}"));
        DataRow {
            row_number: n,
            raw: FieldMap::new(),
            fields,
            is_valid: true,
            is_excluded: false,
        }
    }

    #[test]
    fn flat_batch_keeps_row_order() {
        let rows = [row(1, "a", ""), row(2, "b", ""), row(3, "c", "")];
        let refs: Vec<&DataRow> = rows.iter().collect();
        assert_eq!(plan_commit_order(&refs).order, vec![1, 2, 3]);
    }

    #[test]
    fn parent_listed_after_child_is_hoisted() {
        let rows = [row(1, "child", "parent"), row(2, "other", ""), row(3, "parent", "")];
        let refs: Vec<&DataRow> = rows.iter().collect();
        let plan = plan_commit_order(&refs);
        assert_eq!(plan.order, vec![2, 3, 1]);
        assert!(plan.cyclic.is_empty());
    }

    #[test]
    fn parent_before_child_in_document_order() {
        let rows = [row(1, "1", ""), row(2, "2", "1")];
        let refs: Vec<&DataRow> = rows.iter().collect();
        assert_eq!(plan_commit_order(&refs).order, vec![1, 2]);
    }

    #[test]
    fn external_parent_imposes_no_order() {
        let rows = [row(1, "a", "existing-slug"), row(2, "b", "")];
        let refs: Vec<&DataRow> = rows.iter().collect();
        assert_eq!(plan_commit_order(&refs).order, vec![1, 2]);
    }

    #[test]
    fn cycles_and_their_descendants_are_reported() {
        let rows = [
            row(1, "a", "b"),
            row(2, "b", "a"),
            row(3, "c", "a"),
            row(4, "d", "d"),
            row(5, "e", ""),
        ];
        let refs: Vec<&DataRow> = rows.iter().collect();
        let plan = plan_commit_order(&refs);
        assert_eq!(plan.order, vec![5]);
        assert_eq!(plan.cyclic, vec![1, 2, 3, 4]);
    }

    #[test]
    fn tree_nests_children() {
        let mut rows = vec![row(1, "f", ""), row(2, "s", "f"), row(3, "i", "s"), row(4, "x", "")];
        rows[2].fields.remove("title");
        let refs: Vec<&DataRow> = rows.iter().collect();
        let tree = build_tree(&refs, |r| r.row_number == 3);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children[0].row_number, 2);
        let leaf = &tree[0].children[0].children[0];
        assert_eq!(leaf.title, UNTITLED);
        assert!(leaf.has_digital_object);
        assert_eq!(tree[1].row_number, 4);
    }

    #[test]
    fn tree_survives_cycles() {
        let rows = [row(1, "a", "b"), row(2, "b", "a")];
        let refs: Vec<&DataRow> = rows.iter().collect();
        let tree = build_tree(&refs, |_| false);
        assert_eq!(tree.len(), 2);
        assert!(tree.iter().all(|n| n.children.is_empty()));
    }
}
