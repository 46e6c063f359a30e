//! Edge marks of the five-code adjacency convention.
//!
//! A cell `(i, j)` of the adjacency matrix describes the edge between `i`
//! and `j` *as seen from `i`*:
//!
//! | code | kind                      | meaning   | mirror `(j, i)` |
//! |------|---------------------------|-----------|-----------------|
//! | `0`  | [`EdgeKind::None`]        | no edge   | `0`             |
//! | `1`  | [`EdgeKind::Undirected`]  | `i — j`   | `1`             |
//! | `2`  | [`EdgeKind::ParentOf`]    | `i → j`   | `-2`            |
//! | `-2` | [`EdgeKind::ChildOf`]     | `i ← j`   | `2`             |
//! | `6`  | [`EdgeKind::Bidirected`]  | `i ↔ j`   | `6`             |

use serde::{Deserialize, Serialize};

/// The mark stored in one cell of an [`AdjacencyMatrix`](super::AdjacencyMatrix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    None,
    Undirected,
    /// The row variable is a parent of the column variable.
    ParentOf,
    /// The row variable is a child of the column variable.
    ChildOf,
    /// Both variables share a latent common cause.
    Bidirected,
}

impl EdgeKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Undirected,
        Self::ParentOf,
        Self::ChildOf,
        Self::Bidirected,
    ];

    /// Parse an integer cell code. Returns `None` for codes outside the
    /// five-value convention.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Undirected),
            2 => Some(Self::ParentOf),
            -2 => Some(Self::ChildOf),
            6 => Some(Self::Bidirected),
            _ => None,
        }
    }

    /// The integer cell code.
    #[must_use]
    pub const fn code(self) -> i8 {
        match self {
            Self::None => 0,
            Self::Undirected => 1,
            Self::ParentOf => 2,
            Self::ChildOf => -2,
            Self::Bidirected => 6,
        }
    }

    /// The mark the opposite cell must carry.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::ParentOf => Self::ChildOf,
            Self::ChildOf => Self::ParentOf,
            other => other,
        }
    }

    #[must_use]
    pub const fn is_edge(self) -> bool {
        !matches!(self, Self::None)
    }

    #[must_use]
    pub const fn is_directed(self) -> bool {
        matches!(self, Self::ParentOf | Self::ChildOf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_back() {
        for kind in EdgeKind::ALL {
            assert_eq!(EdgeKind::from_code(i64::from(kind.code())), Some(kind));
        }
    }

    #[test]
    fn unknown_codes_are_rejected() {
        for code in [-6, -1, 3, 4, 5, 7, 100] {
            assert_eq!(EdgeKind::from_code(code), None, "code {code}");
        }
    }

    #[test]
    fn mirror_pairs_match_convention() {
        let pairs: Vec<(i8, i8)> = EdgeKind::ALL
            .iter()
            .map(|k| (k.code(), k.mirrored().code()))
            .collect();
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, -2), (-2, 2), (6, 6)]);
    }

    #[test]
    fn mirroring_is_an_involution() {
        for kind in EdgeKind::ALL {
            assert_eq!(kind.mirrored().mirrored(), kind);
        }
    }
}
