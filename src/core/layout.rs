//! Automatic table arrangement.
//!
//! Force-directed layout: connected tables attract like springs, all tables
//! repel like charges, and a gentle centering pull keeps the arrangement from
//! drifting. Movement is capped by a cooling temperature so the simulation
//! settles. The result is deterministic for a given model: initial positions
//! come from the model itself or from a fixed circular arrangement, never from
//! a random source.

use std::collections::HashMap;

use super::schema::{SchemaModel, TableId};

/// Layout tuning knobs.
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    /// Horizontal spacing between tables
    pub horizontal_spacing: f64,
    /// Vertical spacing between tables
    pub vertical_spacing: f64,
    /// Top-left corner of the arranged area
    pub start_x: f64,
    pub start_y: f64,
    /// Estimated table extent for spacing calculations
    pub table_width: f64,
    pub table_height: f64,
    /// Number of simulation iterations
    pub iterations: usize,
    /// Initial movement cap, cooled every iteration
    pub initial_temperature: f64,
    pub cooling_rate: f64,
    /// Ideal distance between connected tables
    pub ideal_edge_length: f64,
    pub repulsion_strength: f64,
    pub attraction_strength: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 80.0,
            vertical_spacing: 100.0,
            start_x: 100.0,
            start_y: 100.0,
            table_width: 280.0,
            table_height: 250.0,
            iterations: 300,
            initial_temperature: 100.0,
            cooling_rate: 0.95,
            ideal_edge_length: 400.0,
            repulsion_strength: 50_000.0,
            attraction_strength: 0.1,
        }
    }
}

/// New positions for each table.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutResult {
    pub positions: Vec<(TableId, (f64, f64))>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Vec2 {
    x: f64,
    y: f64,
}

impl Vec2 {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    fn normalize(&self) -> Self {
        let len = self.length();
        if len < 0.0001 {
            Self::new(0.0, 0.0)
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    fn add(&self, other: Vec2) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    fn sub(&self, other: Vec2) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    fn scale(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// Compute an arrangement for every table in the model.
pub fn compute_layout(model: &SchemaModel, config: &LayoutConfig) -> LayoutResult {
    let ids: Vec<TableId> = model.tables().map(|t| t.id).collect();
    let count = ids.len();

    if count == 0 {
        return LayoutResult { positions: vec![] };
    }
    if count == 1 {
        return LayoutResult {
            positions: vec![(ids[0], (config.start_x + 200.0, config.start_y + 200.0))],
        };
    }

    let id_to_slot: HashMap<TableId, usize> =
        ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut positions = initial_positions(model, &ids, config);
    let center = Vec2::new(config.start_x + 600.0, config.start_y + 400.0);

    let edges: Vec<(usize, usize)> = model
        .relationships()
        .filter_map(|rel| {
            let a = *id_to_slot.get(&rel.from_table)?;
            let b = *id_to_slot.get(&rel.to_table)?;
            (a != b).then_some((a, b))
        })
        .collect();

    let mut temperature = config.initial_temperature;

    for _ in 0..config.iterations {
        let mut forces: Vec<Vec2> = vec![Vec2::default(); count];

        // Pairwise repulsion, strengthened when tables would overlap.
        for i in 0..count {
            for j in (i + 1)..count {
                let delta = positions[i].sub(positions[j]);
                let distance = delta.length().max(1.0);
                let min_distance = config.table_width + config.horizontal_spacing;
                let repulsion = if distance < min_distance {
                    config.repulsion_strength * 2.0 / (distance * distance).max(1.0)
                } else {
                    config.repulsion_strength / (distance * distance)
                };
                let force = delta.normalize().scale(repulsion);
                forces[i] = forces[i].add(force);
                forces[j] = forces[j].sub(force);
            }
        }

        // Spring attraction along relationships.
        for &(a, b) in &edges {
            let delta = positions[b].sub(positions[a]);
            let distance = delta.length().max(1.0);
            let displacement = distance - config.ideal_edge_length;
            let force = delta
                .normalize()
                .scale(config.attraction_strength * displacement);
            forces[a] = forces[a].add(force);
            forces[b] = forces[b].sub(force);
        }

        // Gentle pull toward the center.
        for i in 0..count {
            forces[i] = forces[i].add(center.sub(positions[i]).scale(0.01));
        }

        for i in 0..count {
            let magnitude = forces[i].length();
            if magnitude > 0.01 {
                let capped = magnitude.min(temperature);
                positions[i] = positions[i].add(forces[i].normalize().scale(capped));
            }
        }

        temperature *= config.cooling_rate;
        if temperature < 0.1 {
            break;
        }
    }

    positions = resolve_overlaps(&positions, config);

    // Normalize so the arrangement starts at the configured corner.
    let min_x = positions.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = positions.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

    LayoutResult {
        positions: ids
            .iter()
            .zip(positions.iter())
            .map(|(&id, pos)| {
                (
                    id,
                    (
                        pos.x - min_x + config.start_x,
                        pos.y - min_y + config.start_y,
                    ),
                )
            })
            .collect(),
    }
}

/// Use existing positions when the model has any, otherwise arrange on a
/// circle. A small index-derived jitter breaks symmetry without randomness.
fn initial_positions(model: &SchemaModel, ids: &[TableId], config: &LayoutConfig) -> Vec<Vec2> {
    let count = ids.len();
    let center_x = config.start_x + 600.0;
    let center_y = config.start_y + 400.0;
    let radius = (count as f64 * 100.0).max(300.0);

    let existing: Vec<(f64, f64)> = ids
        .iter()
        .filter_map(|&id| model.table(id).map(|t| t.position))
        .collect();
    let meaningful = existing.len() == count
        && existing.iter().any(|(x, y)| *x != 0.0 || *y != 0.0);

    if meaningful {
        existing
            .iter()
            .enumerate()
            .map(|(i, (x, y))| {
                let jitter = (i as f64 * 0.1).sin() * 10.0;
                Vec2::new(*x + jitter, *y + jitter)
            })
            .collect()
    } else {
        (0..count)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * (i as f64) / (count as f64);
                Vec2::new(
                    center_x + radius * angle.cos(),
                    center_y + radius * angle.sin(),
                )
            })
            .collect()
    }
}

/// Final pass pushing any remaining overlapping pairs apart.
fn resolve_overlaps(positions: &[Vec2], config: &LayoutConfig) -> Vec<Vec2> {
    let mut result = positions.to_vec();
    let min_dist_x = config.table_width + config.horizontal_spacing;
    let min_dist_y = config.table_height + config.vertical_spacing;

    for _ in 0..50 {
        let mut any_overlap = false;

        for i in 0..result.len() {
            for j in (i + 1)..result.len() {
                let dx = (result[i].x - result[j].x).abs();
                let dy = (result[i].y - result[j].y).abs();
                if dx < min_dist_x && dy < min_dist_y {
                    any_overlap = true;
                    let delta = result[i].sub(result[j]);
                    let push = if delta.length() < 1.0 {
                        Vec2::new(min_dist_x * 0.5, min_dist_y * 0.5)
                    } else {
                        let norm = delta.normalize();
                        Vec2::new(
                            norm.x * (min_dist_x - dx) * 0.5,
                            norm.y * (min_dist_y - dy) * 0.5,
                        )
                    };
                    result[i] = result[i].add(push);
                    result[j] = result[j].sub(push);
                }
            }
        }

        if !any_overlap {
            break;
        }
    }

    result
}

impl SchemaModel {
    /// Arrange every table with the default layout configuration.
    pub fn auto_arrange(&mut self, config: &LayoutConfig) {
        let layout = compute_layout(self, config);
        for (id, position) in layout.positions {
            let _ = self.move_table(id, position);
        }
        tracing::info!("auto-arranged {} table(s)", self.table_count());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::sample_schema;

    #[test]
    fn test_empty_model() {
        let model = SchemaModel::new();
        let result = compute_layout(&model, &LayoutConfig::default());
        assert!(result.positions.is_empty());
    }

    #[test]
    fn test_single_table_gets_a_fixed_spot() {
        let mut model = SchemaModel::new();
        let id = model.create_table((0.0, 0.0));
        let config = LayoutConfig::default();

        let result = compute_layout(&model, &config);
        assert_eq!(
            result.positions,
            vec![(id, (config.start_x + 200.0, config.start_y + 200.0))]
        );
    }

    #[test]
    fn test_layout_is_deterministic() {
        let model = sample_schema();
        let config = LayoutConfig::default();

        let a = compute_layout(&model, &config);
        let b = compute_layout(&model, &config);
        assert_eq!(a, b);
    }

    #[test]
    fn test_no_overlaps_after_arrangement() {
        let mut model = SchemaModel::new();
        for _ in 0..5 {
            model.create_table((0.0, 0.0));
        }
        let config = LayoutConfig::default();
        model.auto_arrange(&config);

        let positions: Vec<(f64, f64)> = model.tables().map(|t| t.position).collect();
        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let dx = (positions[i].0 - positions[j].0).abs();
                let dy = (positions[i].1 - positions[j].1).abs();
                let separated = dx >= config.table_width + config.horizontal_spacing
                    || dy >= config.table_height + config.vertical_spacing;
                assert!(separated, "tables {i} and {j} overlap");
            }
        }
    }

    #[test]
    fn test_positions_start_at_configured_corner() {
        let model = sample_schema();
        let config = LayoutConfig::default();
        let result = compute_layout(&model, &config);

        let min_x = result
            .positions
            .iter()
            .map(|(_, (x, _))| *x)
            .fold(f64::INFINITY, f64::min);
        let min_y = result
            .positions
            .iter()
            .map(|(_, (_, y))| *y)
            .fold(f64::INFINITY, f64::min);
        assert!((min_x - config.start_x).abs() < 1e-9);
        assert!((min_y - config.start_y).abs() < 1e-9);
    }
}
