//! Sparse integer ordering of items within a trip.
//!
//! # Responsibility
//! - Pick positions for new items at the top or bottom of a trip.
//! - Move completed items to the bottom and reopened items to the top.
//! - Shift only the neighbours between an item's old and new slot on reorder.
//!
//! # Invariants
//! - The first item of an empty trip sits at `BASELINE_POSITION`.
//! - Top/bottom inserts step `POSITION_GAP` past the current extreme.
//! - No two items share a position after a reorder; a shift that would
//!   create a tie renumbers the trip in the intended order instead.
//! - Gaps left by deletes are never closed implicitly.

use crate::model::item::{ItemId, ItemPlacement};
use crate::model::store::TripId;
use crate::repo::item_repo::{ItemRepository, PositionRange};
use crate::repo::{RepoError, RepoResult};
use log::{debug, warn};

pub const BASELINE_POSITION: i64 = 1000;
pub const POSITION_GAP: i64 = 2;

/// Position maintenance over one item repository.
pub struct PositionAllocator<'a, R: ItemRepository> {
    items: &'a R,
}

impl<'a, R: ItemRepository> PositionAllocator<'a, R> {
    pub fn new(items: &'a R) -> Self {
        Self { items }
    }

    /// Returns the position a new (or moved) item takes at `placement`.
    ///
    /// `exclude` leaves one item out of the extreme computation, so an item
    /// being re-placed is not measured against itself. When the next step
    /// would overflow `i64`, the trip is compacted and the step retried.
    pub fn allocate(
        &self,
        trip_id: TripId,
        placement: ItemPlacement,
        exclude: Option<ItemId>,
    ) -> RepoResult<i64> {
        if let Some(position) = self.next_position(trip_id, placement, exclude)? {
            return Ok(position);
        }

        warn!(
            "event=position_allocate module=service status=error trip_id={trip_id} error_code=position_overflow action=compact"
        );
        self.compact(trip_id)?;
        self.next_position(trip_id, placement, exclude)?
            .ok_or_else(|| {
                RepoError::InvalidData(format!("trip {trip_id} has no position left after compaction"))
            })
    }

    /// Position for an item whose completed flag just flipped: bottom when
    /// completed, top when reopened.
    pub fn reposition_for_completion(
        &self,
        trip_id: TripId,
        item_id: ItemId,
        completed: bool,
    ) -> RepoResult<i64> {
        let placement = if completed {
            ItemPlacement::Bottom
        } else {
            ItemPlacement::Top
        };
        self.allocate(trip_id, placement, Some(item_id))
    }

    /// Moves `item_id` from `old_position` to `new_position`.
    ///
    /// Items between the two slots shift by one gap towards the old slot:
    /// moving earlier pushes `[new, old)` down the list, moving later pulls
    /// `(old, new]` up. When that shift would land a neighbour on the slot
    /// of an unshifted item, or step past the `i64` range, the trip is
    /// renumbered in the intended order instead. The moved item is not
    /// written on the shift path; callers persist the returned position
    /// with the rest of the item.
    pub fn reorder(
        &self,
        trip_id: TripId,
        item_id: ItemId,
        old_position: i64,
        new_position: i64,
    ) -> RepoResult<i64> {
        if old_position == new_position {
            return Ok(old_position);
        }

        let (range, delta) = if new_position < old_position {
            (
                PositionRange {
                    low: new_position,
                    high: old_position.saturating_sub(1),
                },
                POSITION_GAP,
            )
        } else {
            (
                PositionRange {
                    low: old_position.saturating_add(1),
                    high: new_position,
                },
                -POSITION_GAP,
            )
        };

        let plan = self.plan_shift(trip_id, item_id, old_position, new_position, range, delta)?;
        if !plan.needs_renumber {
            let shifted = self.items.shift_positions(trip_id, range, delta, item_id)?;
            debug!(
                "event=position_reorder module=service status=ok trip_id={trip_id} item_id={item_id} shifted={shifted}"
            );
            return Ok(new_position);
        }

        warn!(
            "event=position_reorder module=service status=degraded trip_id={trip_id} item_id={item_id} error_code=position_collision action=compact"
        );
        let mut moved_to = new_position;
        let mut position = BASELINE_POSITION;
        for slot in &plan.order {
            if slot.item_id == item_id {
                moved_to = position;
            }
            if slot.item_id == item_id || slot.stored != position {
                self.items.set_position(slot.item_id, position)?;
            }
            position += POSITION_GAP;
        }
        Ok(moved_to)
    }

    /// Renumbers every item of a trip to `BASELINE_POSITION + i * POSITION_GAP`
    /// in current display order. Returns the trip's item count.
    pub fn compact(&self, trip_id: TripId) -> RepoResult<usize> {
        let items = self.items.list_trip_items(trip_id)?;
        let mut position = BASELINE_POSITION;
        for item in &items {
            if item.position != position {
                self.items.set_position(item.id, position)?;
            }
            position += POSITION_GAP;
        }
        debug!(
            "event=position_compact module=service status=ok trip_id={trip_id} items={}",
            items.len()
        );
        Ok(items.len())
    }

    /// Simulates a reorder shift and returns the resulting display order.
    fn plan_shift(
        &self,
        trip_id: TripId,
        item_id: ItemId,
        old_position: i64,
        new_position: i64,
        range: PositionRange,
        delta: i64,
    ) -> RepoResult<ShiftPlan> {
        let mut needs_renumber = false;
        let mut order = Vec::new();
        for item in self.items.list_trip_items(trip_id)? {
            let (before, target) = if item.id == item_id {
                (old_position, new_position)
            } else if range.contains(item.position) {
                needs_renumber |= item.position.checked_add(delta).is_none();
                (item.position, item.position.saturating_add(delta))
            } else {
                (item.position, item.position)
            };
            order.push(PlannedSlot {
                item_id: item.id,
                stored: item.position,
                before,
                target,
            });
        }

        // Ties keep the pre-move order.
        order.sort_by_key(|slot| (slot.target, slot.before));
        needs_renumber |= order
            .windows(2)
            .any(|pair| pair[0].target == pair[1].target);
        Ok(ShiftPlan {
            order,
            needs_renumber,
        })
    }

    fn next_position(
        &self,
        trip_id: TripId,
        placement: ItemPlacement,
        exclude: Option<ItemId>,
    ) -> RepoResult<Option<i64>> {
        let Some((min, max)) = self.items.position_bounds(trip_id, exclude)? else {
            return Ok(Some(BASELINE_POSITION));
        };
        Ok(match placement {
            ItemPlacement::Top => min.checked_sub(POSITION_GAP),
            ItemPlacement::Bottom => max.checked_add(POSITION_GAP),
        })
    }
}

struct PlannedSlot {
    item_id: ItemId,
    /// Position currently persisted for the row.
    stored: i64,
    before: i64,
    target: i64,
}

struct ShiftPlan {
    order: Vec<PlannedSlot>,
    needs_renumber: bool,
}
