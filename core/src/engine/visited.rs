use std::collections::HashSet;

use crate::matrix::{ItemId, ScoreMatrix};

/// Items already fully or partially scored during one query.
///
/// `next_unvisited` only moves forward, so finding the lowest unvisited id
/// costs at most one step per visited item over a whole query.
pub(super) enum VisitedSet {
    Dense {
        seen: Vec<bool>,
        len: usize,
        next_unvisited: ItemId,
    },
    Sparse {
        items: HashSet<ItemId>,
        next_unvisited: ItemId,
    },
}

impl VisitedSet {
    pub(super) fn for_matrix(matrix: &ScoreMatrix) -> Self {
        match matrix {
            ScoreMatrix::Dense(dense) => Self::Dense {
                seen: vec![false; dense.rows()],
                len: 0,
                next_unvisited: 0,
            },
            ScoreMatrix::Sparse(_) => Self::Sparse {
                items: HashSet::new(),
                next_unvisited: 0,
            },
        }
    }

    /// Returns true when the item was not visited before.
    pub(super) fn insert(&mut self, item: ItemId) -> bool {
        match self {
            Self::Dense { seen, len, .. } => {
                if seen[item] {
                    return false;
                }
                seen[item] = true;
                *len += 1;
                true
            }
            Self::Sparse { items, .. } => items.insert(item),
        }
    }

    pub(super) fn contains(&self, item: ItemId) -> bool {
        match self {
            Self::Dense { seen, .. } => seen.get(item).copied().unwrap_or(false),
            Self::Sparse { items, .. } => items.contains(&item),
        }
    }

    pub(super) fn len(&self) -> usize {
        match self {
            Self::Dense { len, .. } => *len,
            Self::Sparse { items, .. } => items.len(),
        }
    }

    /// Smallest item id not visited yet; the item count once all are visited.
    pub(super) fn lowest_unvisited(&mut self) -> ItemId {
        let mut cursor = match self {
            Self::Dense { next_unvisited, .. } | Self::Sparse { next_unvisited, .. } => {
                *next_unvisited
            }
        };
        while self.contains(cursor) {
            cursor += 1;
        }
        match self {
            Self::Dense { next_unvisited, .. } | Self::Sparse { next_unvisited, .. } => {
                *next_unvisited = cursor;
            }
        }
        cursor
    }
}
