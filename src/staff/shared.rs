//! Index bookkeeping shared by the staff sequence helpers

use crate::models::SemanticState;
use serde::{Deserialize, Serialize};

/// Interaction-side record of one drawn staff position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffNote {
    pub notes: Vec<String>,
    pub index: usize,
    pub state: Option<SemanticState>,
}

impl StaffNote {
    pub fn new(notes: Vec<String>, index: usize, state: Option<SemanticState>) -> Self {
        Self { notes, index, state }
    }
}

/// Make every note from `start` on carry its own position as `index`
pub fn reindex_staff_notes(notes: &mut [StaffNote], start: usize) {
    for (position, note) in notes.iter_mut().enumerate().skip(start) {
        note.index = position;
    }
}

/// Clamp an insertion point to `[0, len]`; no index means append
pub fn normalize_insert_index(index: Option<isize>, len: usize) -> usize {
    match index {
        None => len,
        Some(i) if i < 0 => 0,
        Some(i) => (i as usize).min(len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_insert_index() {
        assert_eq!(normalize_insert_index(None, 4), 4);
        assert_eq!(normalize_insert_index(Some(-3), 4), 0);
        assert_eq!(normalize_insert_index(Some(2), 4), 2);
        assert_eq!(normalize_insert_index(Some(9), 4), 4);
        assert_eq!(normalize_insert_index(Some(0), 0), 0);
    }

    #[test]
    fn test_reindex_from_start() {
        let mut notes: Vec<StaffNote> = (0..4)
            .map(|_| StaffNote::new(vec!["C4".to_string()], 99, None))
            .collect();
        reindex_staff_notes(&mut notes, 2);
        let indices: Vec<usize> = notes.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![99, 99, 2, 3]);

        reindex_staff_notes(&mut notes, 0);
        let indices: Vec<usize> = notes.iter().map(|n| n.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);

        reindex_staff_notes(&mut [], 5);
    }
}
