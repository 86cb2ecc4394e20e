//! Merge rules, truth-table driven.
//!
//! Pure functions over tiles with no side effects.
//! These encode "what is legal" and "what a merge produces" without
//! touching the board.
//!
//! ## Eligibility (`can_merge`)
//! ┌──────────────────────────────┬─────────┬──────────────────┐
//! │ Condition (priority order)    │ Result  │ Notes            │
//! ├──────────────────────────────┼─────────┼──────────────────┤
//! │ dst absent                    │ DENY    │ dropped on empty │
//! │ src or dst locked / inert     │ DENY    │ ghosts never play│
//! │ src and dst are the same tile │ DENY    │                  │
//! │ either tile wild              │ ALLOW   │ Wild             │
//! │ src.value == dst.value        │ ALLOW   │ Stack            │
//! │ src.value + dst.value <= 6    │ ALLOW   │ Sum / Crack      │
//! │ Otherwise                     │ DENY    │                  │
//! └──────────────────────────────┴─────────┴──────────────────┘
//!
//! Equal values stack before the sum rule is consulted, so 3 + 3
//! stacks into a 3 of depth 2 and never collapses to a 6.
//!
//! ## Effect (`resolve_merge`)
//! ┌──────────┬─────────────────────────────┬──────────────────────┐
//! │ Kind     │ Result value                │ Result stack         │
//! ├──────────┼─────────────────────────────┼──────────────────────┤
//! │ Wild     │ non-wild value, else target │ 1, wild flag cleared │
//! │ Stack    │ unchanged                   │ min(4, deeper + 1)   │
//! │ Sum      │ src + dst (< 6)             │ 1                    │
//! │ Crack    │ 6, then consumed            │ 1                    │
//! └──────────┴─────────────────────────────┴──────────────────────┘

use super::tile::{Tile, MAX_STACK, MAX_VALUE};

#[derive(thiserror::Error, Clone, Copy, PartialEq, Eq, Debug)]
pub enum MergeError {
    #[error("a tile cannot merge with itself")]
    SameTile,
    #[error("no tile at the drop target")]
    MissingTile,
    #[error("locked or inert tiles cannot merge")]
    Locked,
    #[error("values {0} and {1} cannot merge")]
    Ineligible(u8, u8),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MergeKind {
    Wild,
    Stack,
    Sum,
    /// Sum landing exactly on the cap: the cube cracks and clears.
    Crack,
}

/// Tunables for merge effects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergeRules {
    /// Value a wild-on-wild merge settles on.
    pub wild_target: u8,
    /// Points for cracking a cube.
    pub crack_points: u32,
}

impl Default for MergeRules {
    fn default() -> Self {
        MergeRules { wild_target: 3, crack_points: 10 }
    }
}

/// What the destination cell holds after a merge.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MergeResult {
    pub kind: MergeKind,
    pub value: u8,
    pub stack: u8,
    pub points: u32,
}

impl MergeResult {
    /// Does the result leave a cleared (ghost) cell behind?
    pub fn cracks(&self) -> bool {
        self.kind == MergeKind::Crack
    }
}

// ── Eligibility ──

/// Classify a merge, or explain why it is refused.
pub fn merge_kind(src: &Tile, dst: Option<&Tile>) -> Result<MergeKind, MergeError> {
    let dst = dst.ok_or(MergeError::MissingTile)?;
    if src.is_inert() || dst.is_inert() { return Err(MergeError::Locked); }
    if src.id == dst.id { return Err(MergeError::SameTile); }

    if src.is_wild() || dst.is_wild() { return Ok(MergeKind::Wild); }
    if src.value == dst.value { return Ok(MergeKind::Stack); }

    let sum = src.value + dst.value;
    if sum < MAX_VALUE { return Ok(MergeKind::Sum); }
    if sum == MAX_VALUE { return Ok(MergeKind::Crack); }
    Err(MergeError::Ineligible(src.value, dst.value))
}

pub fn can_merge(src: &Tile, dst: Option<&Tile>) -> bool {
    merge_kind(src, dst).is_ok()
}

// ── Effect ──

pub fn resolve_merge(src: &Tile, dst: &Tile, rules: &MergeRules) -> Result<MergeResult, MergeError> {
    let kind = merge_kind(src, Some(dst))?;
    let result = match kind {
        MergeKind::Wild => {
            let value = match (src.is_wild(), dst.is_wild()) {
                (true, true) => rules.wild_target,
                (true, false) => dst.value,
                _ => src.value,
            };
            MergeResult { kind, value, stack: 1, points: value as u32 }
        }
        MergeKind::Stack => {
            let stack = (src.stack.max(dst.stack) + 1).min(MAX_STACK);
            MergeResult { kind, value: dst.value, stack, points: dst.value as u32 * stack as u32 }
        }
        MergeKind::Sum => {
            let value = src.value + dst.value;
            MergeResult { kind, value, stack: 1, points: value as u32 }
        }
        MergeKind::Crack => MergeResult {
            kind,
            value: MAX_VALUE,
            stack: 1,
            points: rules.crack_points,
        },
    };
    Ok(result)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::{Coord, Special, TileId};

    fn tile(id: u32, value: u8) -> Tile {
        let mut t = Tile::ghost(TileId(id), Coord::new(id as usize, 0));
        t.unlock(value);
        t
    }

    fn wild(id: u32, value: u8) -> Tile {
        let mut t = tile(id, value);
        t.special = Some(Special::Wild);
        t
    }

    fn ghost(id: u32) -> Tile {
        Tile::ghost(TileId(id), Coord::new(id as usize, 0))
    }

    // ── Eligibility ──

    #[test]
    fn missing_or_locked_destination_denied() {
        let a = tile(1, 2);
        assert_eq!(merge_kind(&a, None), Err(MergeError::MissingTile));
        assert_eq!(merge_kind(&a, Some(&ghost(2))), Err(MergeError::Locked));
        assert!(!can_merge(&a, Some(&ghost(2))));
    }

    #[test]
    fn locked_source_denied() {
        assert!(!can_merge(&ghost(1), Some(&tile(2, 3))));
    }

    #[test]
    fn same_tile_denied() {
        let a = tile(1, 2);
        assert_eq!(merge_kind(&a, Some(&a)), Err(MergeError::SameTile));
    }

    #[test]
    fn sum_within_cap_allowed() {
        assert_eq!(merge_kind(&tile(1, 2), Some(&tile(2, 3))), Ok(MergeKind::Sum));
        assert_eq!(merge_kind(&tile(1, 1), Some(&tile(2, 5))), Ok(MergeKind::Crack));
    }

    #[test]
    fn sum_over_cap_denied() {
        assert_eq!(
            merge_kind(&tile(1, 4), Some(&tile(2, 5))),
            Err(MergeError::Ineligible(4, 5)),
        );
    }

    #[test]
    fn equal_values_stack_before_sum() {
        assert_eq!(merge_kind(&tile(1, 3), Some(&tile(2, 3))), Ok(MergeKind::Stack));
        assert_eq!(merge_kind(&tile(1, 5), Some(&tile(2, 5))), Ok(MergeKind::Stack));
    }

    #[test]
    fn wild_merges_with_anything_unlocked() {
        assert!(can_merge(&wild(1, 3), Some(&tile(2, 5))));
        assert!(can_merge(&tile(1, 5), Some(&wild(2, 3))));
        assert!(can_merge(&wild(1, 3), Some(&wild(2, 3))));
        assert!(!can_merge(&wild(1, 3), Some(&ghost(2))));
    }

    #[test]
    fn eligibility_is_symmetric() {
        for a in 1..=6u8 {
            for b in 1..=6u8 {
                let (x, y) = (tile(1, a), tile(2, b));
                assert_eq!(can_merge(&x, Some(&y)), can_merge(&y, Some(&x)), "{a} vs {b}");
            }
        }
        // Wild pairs are symmetric too, as long as both tiles are unlocked.
        let (w, t) = (wild(1, 3), tile(2, 6));
        assert_eq!(can_merge(&w, Some(&t)), can_merge(&t, Some(&w)));
        // A locked partner breaks symmetry only through the ghost itself.
        assert!(!can_merge(&w, Some(&ghost(3))));
        assert!(!can_merge(&ghost(3), Some(&w)));
    }

    // ── Effect ──

    #[test]
    fn stack_keeps_value_and_deepens() {
        let rules = MergeRules::default();
        let r = resolve_merge(&tile(1, 3), &tile(2, 3), &rules).unwrap();
        assert_eq!(r.kind, MergeKind::Stack);
        assert_eq!(r.value, 3);
        assert_eq!(r.stack, 2);
        assert_eq!(r.points, 6);
    }

    #[test]
    fn stack_depth_caps_at_four() {
        let rules = MergeRules::default();
        let mut dst = tile(2, 2);
        dst.stack = 4;
        let r = resolve_merge(&tile(1, 2), &dst, &rules).unwrap();
        assert_eq!(r.stack, 4);
    }

    #[test]
    fn stack_carries_the_dragged_combo() {
        let rules = MergeRules::default();
        let mut src = tile(1, 2);
        src.stack = 3;
        let r = resolve_merge(&src, &tile(2, 2), &rules).unwrap();
        assert_eq!(r.kind, MergeKind::Stack);
        assert_eq!(r.stack, 4);
        assert_eq!(r.points, 8);
    }

    #[test]
    fn sum_resets_stack() {
        let rules = MergeRules::default();
        let mut dst = tile(2, 3);
        dst.stack = 3;
        let r = resolve_merge(&tile(1, 2), &dst, &rules).unwrap();
        assert_eq!(r.kind, MergeKind::Sum);
        assert_eq!(r.value, 5);
        assert_eq!(r.stack, 1);
    }

    #[test]
    fn sum_to_cap_cracks() {
        let rules = MergeRules { wild_target: 3, crack_points: 25 };
        let r = resolve_merge(&tile(1, 2), &tile(2, 4), &rules).unwrap();
        assert!(r.cracks());
        assert_eq!(r.value, MAX_VALUE);
        assert_eq!(r.points, 25);
    }

    #[test]
    fn wild_adopts_partner_value() {
        let rules = MergeRules::default();
        let r = resolve_merge(&wild(1, 3), &tile(2, 5), &rules).unwrap();
        assert_eq!((r.kind, r.value, r.stack), (MergeKind::Wild, 5, 1));
        let r = resolve_merge(&tile(1, 4), &wild(2, 3), &rules).unwrap();
        assert_eq!(r.value, 4);
    }

    #[test]
    fn wild_on_wild_uses_target() {
        let rules = MergeRules { wild_target: 2, crack_points: 10 };
        let r = resolve_merge(&wild(1, 3), &wild(2, 3), &rules).unwrap();
        assert_eq!(r.value, 2);
    }

    #[test]
    fn ineligible_merge_is_an_error() {
        let rules = MergeRules::default();
        assert!(resolve_merge(&tile(1, 4), &tile(2, 6), &rules).is_err());
    }
}
