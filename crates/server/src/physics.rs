//! Boundary containment and cell-cell collision resolution.
//!
//! Collisions are a simplified elastic exchange: colliding cells swap
//! headings and are pushed apart by half the penetration each. One pass per
//! tick, O(n²) over the population.

use crate::entity::Cell;
use crate::world::Arena;
use glam::Vec2;

/// Result of checking collision between two circles.
#[derive(Debug, Clone, Copy)]
pub struct CollisionResult {
    /// Combined radius of both cells
    pub r: f32,
    /// Distance X component (second minus first)
    pub dx: f32,
    /// Distance Y component (second minus first)
    pub dy: f32,
    /// Actual distance
    pub d: f32,
}

impl CollisionResult {
    /// Overlapping and not coincident. Coincident pairs have no separation axis.
    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.d > 0.0 && self.d < self.r
    }

    /// Penetration depth (negative when apart).
    #[inline]
    pub fn penetration(&self) -> f32 {
        self.r - self.d
    }

    /// Unit vector from the first centre toward the second.
    #[inline]
    pub fn normal(&self) -> Vec2 {
        if self.d > 0.0 {
            Vec2::new(self.dx / self.d, self.dy / self.d)
        } else {
            Vec2::ZERO
        }
    }
}

/// Check collision between two circles.
#[inline]
pub fn check_cell_collision(
    cell_pos: Vec2,
    cell_size: f32,
    check_pos: Vec2,
    check_size: f32,
) -> CollisionResult {
    let dx = check_pos.x - cell_pos.x;
    let dy = check_pos.y - cell_pos.y;
    CollisionResult {
        r: cell_size + check_size,
        dx,
        dy,
        d: (dx * dx + dy * dy).sqrt(),
    }
}

/// Clamp the cell into the arena and reflect its heading on every clamped axis.
/// Returns true if the cell touched a border.
pub fn contain(cell: &mut Cell, arena: &Arena) -> bool {
    let min = arena.min_bound(cell.size);
    let max = arena.max_bound(cell.size);
    let mut hit = false;

    if cell.position.x < min.x {
        cell.position.x = min.x;
        cell.direction.x = -cell.direction.x;
        hit = true;
    } else if cell.position.x > max.x {
        cell.position.x = max.x;
        cell.direction.x = -cell.direction.x;
        hit = true;
    }

    if cell.position.y < min.y {
        cell.position.y = min.y;
        cell.direction.y = -cell.direction.y;
        hit = true;
    } else if cell.position.y > max.y {
        cell.position.y = max.y;
        cell.direction.y = -cell.direction.y;
        hit = true;
    }

    hit
}

/// Clamp the cell into the arena without touching its heading.
#[inline]
pub fn clamp(cell: &mut Cell, arena: &Arena) {
    cell.position = cell
        .position
        .clamp(arena.min_bound(cell.size), arena.max_bound(cell.size));
}

/// Resolve every overlapping pair once. Returns the number of collisions.
///
/// Overlaps are detected against the positions at the start of the pass, so
/// each pair is resolved independently of the others; a cell touching several
/// neighbours may keep some residual overlap until the next tick.
pub fn resolve_collisions(cells: &mut [Cell]) -> usize {
    let origins: Vec<Vec2> = cells.iter().map(|cell| cell.position).collect();
    let mut collisions = 0;

    for i in 0..cells.len() {
        for j in (i + 1)..cells.len() {
            let collision =
                check_cell_collision(origins[i], cells[i].size, origins[j], cells[j].size);
            if !collision.is_colliding() {
                continue;
            }

            let push = collision.normal() * (collision.penetration() / 2.0);
            let (head, tail) = cells.split_at_mut(j);
            let (cell, check) = (&mut head[i], &mut tail[0]);

            std::mem::swap(&mut cell.direction, &mut check.direction);
            cell.position -= push;
            check.position += push;
            collisions += 1;
        }
    }

    collisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CellConfig;
    use proptest::prelude::*;
    use protocol::Color;

    fn cell_at(id: u32, x: f32, y: f32) -> Cell {
        Cell::new(id, id, Vec2::new(x, y), Color::default(), &CellConfig::default(), 0)
    }

    #[test]
    fn test_collision_check() {
        let result = check_cell_collision(Vec2::new(0.0, 0.0), 50.0, Vec2::new(30.0, 0.0), 20.0);

        assert!(result.is_colliding()); // 50 + 20 = 70, distance = 30
        assert_eq!(result.d, 30.0);
        assert_eq!(result.penetration(), 40.0);
        assert_eq!(result.normal(), Vec2::X);
    }

    #[test]
    fn test_no_collision() {
        let result = check_cell_collision(Vec2::new(0.0, 0.0), 10.0, Vec2::new(100.0, 0.0), 10.0);

        assert!(!result.is_colliding()); // 10 + 10 = 20, distance = 100
    }

    #[test]
    fn test_coincident_is_not_a_collision() {
        let result = check_cell_collision(Vec2::new(5.0, 5.0), 10.0, Vec2::new(5.0, 5.0), 10.0);
        assert!(!result.is_colliding());
        assert_eq!(result.normal(), Vec2::ZERO);
    }

    #[test]
    fn test_contain_reflects() {
        let arena = Arena::new(800.0, 600.0);
        let mut cell = cell_at(1, 5.0, 700.0);
        cell.direction = Vec2::new(-0.6, 0.8);

        assert!(contain(&mut cell, &arena));
        assert_eq!(cell.position, Vec2::new(15.0, 585.0));
        assert_eq!(cell.direction, Vec2::new(0.6, -0.8));
    }

    #[test]
    fn test_contain_inside_is_noop() {
        let arena = Arena::new(800.0, 600.0);
        let mut cell = cell_at(1, 400.0, 300.0);
        cell.direction = Vec2::new(1.0, 0.0);
        assert!(!contain(&mut cell, &arena));
        assert_eq!(cell.position, Vec2::new(400.0, 300.0));
        assert_eq!(cell.direction, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_clamp_keeps_heading() {
        let arena = Arena::new(800.0, 600.0);
        let mut cell = cell_at(1, 795.0, 300.0);
        cell.direction = Vec2::new(1.0, 0.0);
        clamp(&mut cell, &arena);
        assert_eq!(cell.position.x, 785.0);
        assert_eq!(cell.direction, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_resolve_swaps_and_separates() {
        let mut cells = vec![cell_at(1, 100.0, 100.0), cell_at(2, 120.0, 100.0)];
        cells[0].direction = Vec2::X;
        cells[1].direction = Vec2::Y;

        assert_eq!(resolve_collisions(&mut cells), 1);
        assert_eq!(cells[0].direction, Vec2::Y);
        assert_eq!(cells[1].direction, Vec2::X);
        // 30 - 20 = 10 penetration, 5 each way
        assert_eq!(cells[0].position, Vec2::new(95.0, 100.0));
        assert_eq!(cells[1].position, Vec2::new(125.0, 100.0));
    }

    #[test]
    fn test_resolve_skips_coincident() {
        let mut cells = vec![cell_at(1, 100.0, 100.0), cell_at(2, 100.0, 100.0)];
        cells[0].direction = Vec2::X;
        assert_eq!(resolve_collisions(&mut cells), 0);
        assert_eq!(cells[0].direction, Vec2::X);
        assert_eq!(cells[0].position, cells[1].position);
    }

    #[test]
    fn test_resolve_uses_pass_start_positions() {
        // The middle cell overlaps both neighbours; both pushes are computed
        // from the original layout and applied together.
        let mut cells = vec![
            cell_at(1, 100.0, 100.0),
            cell_at(2, 125.0, 100.0),
            cell_at(3, 150.0, 100.0),
        ];
        assert_eq!(resolve_collisions(&mut cells), 2);
        assert_eq!(cells[0].position.x, 97.5);
        assert_eq!(cells[1].position.x, 125.0);
        assert_eq!(cells[2].position.x, 152.5);
    }

    proptest! {
        #[test]
        fn prop_contain_keeps_cell_in_bounds(
            x in -500.0f32..1500.0,
            y in -500.0f32..1500.0,
            dx in -1.0f32..1.0,
            dy in -1.0f32..1.0,
        ) {
            let arena = Arena::new(800.0, 600.0);
            let mut cell = cell_at(1, x, y);
            cell.direction = Vec2::new(dx, dy);
            contain(&mut cell, &arena);
            prop_assert!(arena.contains(cell.position, cell.size));
            prop_assert_eq!(cell.direction.length(), Vec2::new(dx, dy).length());
        }

        #[test]
        fn prop_isolated_pair_separates(
            x in 100.0f32..700.0,
            y in 100.0f32..500.0,
            angle in 0.0f32..std::f32::consts::TAU,
            gap in 0.5f32..29.5,
        ) {
            let offset = Vec2::from_angle(angle) * gap;
            let mut cells = vec![cell_at(1, x, y), cell_at(2, x + offset.x, y + offset.y)];
            let before = cells[0].position.distance(cells[1].position);
            prop_assume!(before > 0.0 && before < 30.0);

            prop_assert_eq!(resolve_collisions(&mut cells), 1);
            let after = cells[0].position.distance(cells[1].position);
            prop_assert!(after > before);
            prop_assert!((after - 30.0).abs() < 1e-3);
        }
    }
}
