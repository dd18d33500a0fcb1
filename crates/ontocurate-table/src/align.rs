//! Row alignment between two tables with the same header.
//!
//! Rows are paired in three passes:
//!
//! 1. key column (`ID`, else `Label`) when the key is non-blank and occurs
//!    exactly once on each side;
//! 2. identical rows, in order;
//! 3. best content similarity among what is left (most equal cells, and at
//!    least as many agreeing non-blank cells as differing ones).
//!
//! Anything still unpaired is an insertion or a deletion.

use std::collections::HashMap;

use crate::table::{Row, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    /// For each left row, the paired right row.
    pub left_to_right: Vec<Option<usize>>,
    /// For each right row, the paired left row.
    pub right_to_left: Vec<Option<usize>>,
}

fn key_counts(rows: &[Row], col: usize) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for row in rows {
        let key = row[col].trim();
        if !key.is_empty() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

fn similarity(a: &[String], b: &[String]) -> Option<usize> {
    let mut equal = 0;
    let mut agreeing = 0;
    let mut differing = 0;
    for (x, y) in a.iter().zip(b) {
        if x == y {
            equal += 1;
            if !x.trim().is_empty() {
                agreeing += 1;
            }
        } else {
            differing += 1;
        }
    }
    (agreeing > 0 && agreeing >= differing).then_some(equal)
}

impl Alignment {
    pub fn compute(left: &Table, right: &Table, key_column: Option<usize>) -> Self {
        let mut l2r: Vec<Option<usize>> = vec![None; left.len()];
        let mut r2l: Vec<Option<usize>> = vec![None; right.len()];

        if let Some(col) = key_column {
            let lc = key_counts(left.rows(), col);
            let rc = key_counts(right.rows(), col);
            let right_by_key: HashMap<&str, usize> = right
                .rows()
                .iter()
                .enumerate()
                .filter(|(_, row)| rc.get(row[col].trim()) == Some(&1))
                .map(|(j, row)| (row[col].trim(), j))
                .collect();
            for (i, row) in left.rows().iter().enumerate() {
                let key = row[col].trim();
                if lc.get(key) != Some(&1) {
                    continue;
                }
                if let Some(&j) = right_by_key.get(key) {
                    l2r[i] = Some(j);
                    r2l[j] = Some(i);
                }
            }
        }

        for (i, row) in left.rows().iter().enumerate() {
            if l2r[i].is_some() {
                continue;
            }
            let hit = (0..right.len()).find(|&j| r2l[j].is_none() && right.rows()[j] == *row);
            if let Some(j) = hit {
                l2r[i] = Some(j);
                r2l[j] = Some(i);
            }
        }

        for (i, row) in left.rows().iter().enumerate() {
            if l2r[i].is_some() {
                continue;
            }
            let mut best: Option<(usize, usize)> = None;
            for (j, candidate) in right.rows().iter().enumerate() {
                if r2l[j].is_some() {
                    continue;
                }
                if let Some(score) = similarity(row, candidate) {
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some((j, score));
                    }
                }
            }
            if let Some((j, _)) = best {
                l2r[i] = Some(j);
                r2l[j] = Some(i);
            }
        }

        Self {
            left_to_right: l2r,
            right_to_left: r2l,
        }
    }

    /// Paired rows in presentation order: right-table order, with left-only
    /// rows placed after the right row paired with their nearest preceding
    /// left row.
    pub fn ordered(&self) -> Vec<(Option<usize>, Option<usize>)> {
        let mut leading: Vec<usize> = Vec::new();
        let mut after: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut anchor: Option<usize> = None;
        for (i, partner) in self.left_to_right.iter().enumerate() {
            match partner {
                Some(j) => anchor = Some(*j),
                None => match anchor {
                    Some(j) => after.entry(j).or_default().push(i),
                    None => leading.push(i),
                },
            }
        }

        let mut out: Vec<(Option<usize>, Option<usize>)> =
            leading.into_iter().map(|i| (Some(i), None)).collect();
        for (j, partner) in self.right_to_left.iter().enumerate() {
            out.push((*partner, Some(j)));
            if let Some(orphans) = after.remove(&j) {
                out.extend(orphans.into_iter().map(|i| (Some(i), None)));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Table {
        Table::from_rows(
            vec!["ID".into(), "Label".into(), "Definition".into()],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn pairs_by_unique_key() {
        let left = table(&[&["X:1", "Foo", "A"], &["X:2", "Bar", "B"]]);
        let right = table(&[&["X:2", "Bar", "changed"], &["X:1", "Foo", "A"]]);
        let a = Alignment::compute(&left, &right, Some(0));
        assert_eq!(a.left_to_right, vec![Some(1), Some(0)]);
    }

    #[test]
    fn blank_keys_fall_back_to_content() {
        let left = table(&[&["", "Foo", "A"], &["", "Bar", "B"]]);
        let right = table(&[&["X:9", "Bar", "B"], &["", "Foo", "A2"]]);
        let a = Alignment::compute(&left, &right, Some(0));
        assert_eq!(a.left_to_right, vec![Some(1), Some(0)]);
    }

    #[test]
    fn unrelated_rows_stay_unpaired() {
        let left = table(&[&["", "Foo", "A"]]);
        let right = table(&[&["", "Bar", "B"]]);
        let a = Alignment::compute(&left, &right, Some(0));
        assert_eq!(a.left_to_right, vec![None]);
        assert_eq!(
            a.ordered(),
            vec![(Some(0), None), (None, Some(0))]
        );
    }

    #[test]
    fn ordered_places_deletions_after_their_predecessor() {
        let left = table(&[&["X:1", "a", ""], &["X:2", "b", ""], &["X:3", "c", ""]]);
        let right = table(&[&["X:1", "a", ""], &["X:3", "c", ""]]);
        let a = Alignment::compute(&left, &right, Some(0));
        assert_eq!(
            a.ordered(),
            vec![(Some(0), Some(0)), (Some(1), None), (Some(2), Some(1))]
        );
    }
}
