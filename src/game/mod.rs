//! Shared game-world primitives used by both the server's authoritative
//! simulation and the client's replicated mirror (spec §3, §4.3).

use crate::protocol::Position;
use std::collections::HashSet;

/// A live bomb: its cell and the number of turns left before it explodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bomb {
    pub position: Position,
    pub timer: u16,
}

/// The union of four axial rays from `position`, each extending up to
/// `explosion_radius` cells and stopping one cell past the first block
/// encountered (spec §4.3, Glossary "Explosion footprint"). Grounded on
/// `examples/original_source/src/common.h::calculate_explosion_range`: each
/// of the two signs per axis is walked independently from `i = 0` (the
/// bomb's own cell, included in both rays and deduped by the `HashSet`) up
/// to and including `i = explosion_radius`, stopping the first time a ray
/// step lands on a blocked cell.
pub fn explosion_footprint(
    position: Position,
    explosion_radius: u16,
    size_x: u16,
    size_y: u16,
    blocks: &HashSet<Position>,
) -> HashSet<Position> {
    let mut result = HashSet::new();

    for sign in [-1i32, 1i32] {
        let mut x_blocked = false;
        for i in 0..=explosion_radius as i32 {
            if x_blocked {
                break;
            }
            let nx = position.x as i32 + sign * i;
            if nx < 0 || nx >= size_x as i32 {
                break;
            }
            let here = Position::new(nx as u16, position.y);
            result.insert(here);
            if blocks.contains(&here) {
                x_blocked = true;
            }
        }

        let mut y_blocked = false;
        for i in 0..=explosion_radius as i32 {
            if y_blocked {
                break;
            }
            let ny = position.y as i32 + sign * i;
            if ny < 0 || ny >= size_y as i32 {
                break;
            }
            let here = Position::new(position.x, ny as u16);
            result.insert(here);
            if blocks.contains(&here) {
                y_blocked = true;
            }
        }
    }

    result
}
