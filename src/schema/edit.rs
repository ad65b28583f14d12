//! Lineage (edit) records embedded in genomes.

use serde::{Deserialize, Serialize};

use super::Genome;

/// Who is producing genomes; stamped on every lineage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineageInfo {
    pub nick: String,
    pub url: String,
    pub id: String,
    pub comment: String,
    /// Sheep generation, if running inside a flock server.
    pub sheep_generation: Option<u32>,
    pub sheep_id: Option<u32>,
    /// Deepest parent chain a new record keeps; older history is dropped.
    pub max_edit_depth: usize,
}

impl Default for LineageInfo {
    fn default() -> Self {
        Self {
            nick: String::new(),
            url: String::new(),
            id: String::new(),
            comment: String::new(),
            sheep_generation: None,
            sheep_id: None,
            max_edit_depth: DEFAULT_MAX_EDIT_DEPTH,
        }
    }
}

pub const DEFAULT_MAX_EDIT_DEPTH: usize = 10;

/// A note of which operator produced a genome and from which parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    pub action: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub nick: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheep_generation: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheep_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<EditRecord>,
}

impl EditRecord {
    /// Build a record for `action` applied to up to two parents.
    ///
    /// A parent's own history is nested when it has one; otherwise a leaf
    /// naming the parent is recorded. History is cut so the result is at
    /// most `info.max_edit_depth` records deep.
    pub fn new(
        action: impl Into<String>,
        parent0: Option<&Genome>,
        parent1: Option<&Genome>,
        info: &LineageInfo,
    ) -> Self {
        let keep = info.max_edit_depth.max(1) - 1;
        let parents = if keep == 0 {
            Vec::new()
        } else {
            [parent0, parent1]
                .into_iter()
                .flatten()
                .map(|p| match &p.edits {
                    Some(edits) => edits.truncated(keep),
                    None => EditRecord::leaf(format!("genome {}", p.name)),
                })
                .collect()
        };

        Self {
            action: action.into(),
            nick: info.nick.clone(),
            url: info.url.clone(),
            id: info.id.clone(),
            comment: info.comment.clone(),
            sheep_generation: info.sheep_generation,
            sheep_id: info.sheep_id,
            parents,
        }
    }

    /// Record with no parents and no author.
    pub fn leaf(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            nick: String::new(),
            url: String::new(),
            id: String::new(),
            comment: String::new(),
            sheep_generation: None,
            sheep_id: None,
            parents: Vec::new(),
        }
    }

    /// Copy of this record with ancestors beyond `depth` levels dropped.
    pub fn truncated(&self, depth: usize) -> Self {
        let parents = if depth <= 1 {
            Vec::new()
        } else {
            self.parents.iter().map(|p| p.truncated(depth - 1)).collect()
        };
        Self {
            parents,
            ..self.without_parents()
        }
    }

    fn without_parents(&self) -> Self {
        Self {
            action: self.action.clone(),
            nick: self.nick.clone(),
            url: self.url.clone(),
            id: self.id.clone(),
            comment: self.comment.clone(),
            sheep_generation: self.sheep_generation,
            sheep_id: self.sheep_id,
            parents: Vec::new(),
        }
    }

    /// Longest parent chain, counting this record.
    pub fn depth(&self) -> usize {
        1 + self.parents.iter().map(EditRecord::depth).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nests_parent_history() {
        let mut p0 = Genome::default();
        p0.edits = Some(EditRecord::leaf("random"));
        let p1 = Genome {
            name: "b".to_string(),
            ..Default::default()
        };
        let info = LineageInfo {
            nick: "ann".to_string(),
            ..Default::default()
        };

        let rec = EditRecord::new("cross union", Some(&p0), Some(&p1), &info);
        assert_eq!(rec.parents.len(), 2);
        assert_eq!(rec.parents[0].action, "random");
        assert_eq!(rec.parents[1].action, "genome b");
        assert_eq!(rec.nick, "ann");
        assert_eq!(rec.depth(), 2);
    }

    #[test]
    fn test_depth_stays_bounded_across_generations() {
        let info = LineageInfo {
            max_edit_depth: 4,
            ..Default::default()
        };
        let mut a = Genome::default();
        let mut b = Genome::default();
        for generation in 0..20 {
            let child = EditRecord::new(format!("cross {generation}"), Some(&a), Some(&b), &info);
            assert!(child.depth() <= 4);
            a.edits = Some(child.clone());
            b.edits = Some(child);
        }

        let last = a.edits.unwrap();
        assert_eq!(last.depth(), 4);
        assert_eq!(last.action, "cross 19");
        assert_eq!(last.parents[0].action, "cross 18");
        // at most 2^4 - 1 records survive
        fn count(r: &EditRecord) -> usize {
            1 + r.parents.iter().map(count).sum::<usize>()
        }
        assert_eq!(count(&last), 15);
    }

    #[test]
    fn test_depth_one_keeps_no_parents() {
        let mut p = Genome::default();
        p.edits = Some(EditRecord::leaf("random"));
        let info = LineageInfo {
            max_edit_depth: 1,
            ..Default::default()
        };
        let rec = EditRecord::new("mutate", Some(&p), None, &info);
        assert!(rec.parents.is_empty());
        assert_eq!(LineageInfo::default().max_edit_depth, DEFAULT_MAX_EDIT_DEPTH);
    }
}
