//! Relationship curve routing.
//!
//! Stateless geometry: given table positions and column row indices, compute
//! the anchor points and a single cubic Bézier connecting them. Control points
//! share the anchors' y-coordinates, so curves always leave and enter tables
//! perpendicular to their vertical edge regardless of how far apart the
//! anchors are.

use serde::{Deserialize, Serialize};

use crate::core::{Relationship, RelationshipType, SchemaModel, Table};

/// Fixed canvas geometry and routing offsets.
#[derive(Clone, Debug)]
pub struct RoutingConfig {
    /// Rendered table width
    pub node_width: f64,
    /// Height of the table header above the first column row
    pub header_height: f64,
    /// Height of one column row
    pub row_height: f64,
    /// Horizontal extent of a self-reference loop
    pub self_loop_offset: f64,
    /// Margin required for straight left-to-right routing
    pub clearance: f64,
    /// Outward control-point bend when tables are too close
    pub avoidance_offset: f64,
    /// Control-point offset in the unobstructed case
    pub control_offset: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            node_width: 280.0,
            header_height: 48.0,
            row_height: 36.0,
            self_loop_offset: 60.0,
            clearance: 50.0,
            avoidance_offset: 80.0,
            control_offset: 50.0,
        }
    }
}

/// A point in model space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which vertical table edge an anchor sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorSide {
    Left,
    Right,
}

/// Line-end decoration encoding cardinality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardinalityMarker {
    One,
    Many,
}

/// A routed relationship curve: one cubic Bézier plus the marker for each end.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgePath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
    pub from_side: AnchorSide,
    pub to_side: AnchorSide,
    pub from_marker: CardinalityMarker,
    pub to_marker: CardinalityMarker,
}

impl EdgePath {
    /// SVG path data for the curve.
    pub fn path_data(&self) -> String {
        format!(
            "M {} {} C {} {} {} {} {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Markers for each end of a relationship.
pub fn markers(relationship_type: RelationshipType) -> (CardinalityMarker, CardinalityMarker) {
    match relationship_type {
        RelationshipType::OneToOne => (CardinalityMarker::One, CardinalityMarker::One),
        RelationshipType::OneToMany => (CardinalityMarker::One, CardinalityMarker::Many),
        RelationshipType::ManyToOne => (CardinalityMarker::Many, CardinalityMarker::One),
        RelationshipType::ManyToMany => (CardinalityMarker::Many, CardinalityMarker::Many),
    }
}

/// Anchor point for a column row on the given table edge.
pub fn column_anchor(table: &Table, row: usize, side: AnchorSide, config: &RoutingConfig) -> Point {
    let y = table.position.1
        + config.header_height
        + row as f64 * config.row_height
        + config.row_height / 2.0;
    let x = match side {
        AnchorSide::Left => table.position.0,
        AnchorSide::Right => table.position.0 + config.node_width,
    };
    Point::new(x, y)
}

/// Route a relationship of the model. Returns `None` when either endpoint no
/// longer resolves.
pub fn route(model: &SchemaModel, rel: &Relationship, config: &RoutingConfig) -> Option<EdgePath> {
    let from_table = model.table(rel.from_table)?;
    let to_table = model.table(rel.to_table)?;
    let from_row = model.column_row(rel.from_column)?;
    let to_row = model.column_row(rel.to_column)?;
    Some(route_between(
        from_table,
        from_row,
        to_table,
        to_row,
        rel.relationship_type,
        config,
    ))
}

/// Route between two column rows of resolved tables.
pub fn route_between(
    from: &Table,
    from_row: usize,
    to: &Table,
    to_row: usize,
    relationship_type: RelationshipType,
    config: &RoutingConfig,
) -> EdgePath {
    let (from_marker, to_marker) = markers(relationship_type);

    if from.id == to.id {
        // Self-reference: loop off the right edge, same shape for any rows.
        let start = column_anchor(from, from_row, AnchorSide::Right, config);
        let end = column_anchor(to, to_row, AnchorSide::Right, config);
        let out_x = start.x + config.self_loop_offset;
        return EdgePath {
            start,
            control1: Point::new(out_x, start.y),
            control2: Point::new(out_x, end.y),
            end,
            from_side: AnchorSide::Right,
            to_side: AnchorSide::Right,
            from_marker,
            to_marker,
        };
    }

    let from_left = from.position.0;
    let from_right = from.position.0 + config.node_width;
    let to_left = to.position.0;
    let to_right = to.position.0 + config.node_width;

    if from_right + config.clearance <= to_left {
        // Unobstructed left-to-right run.
        let start = column_anchor(from, from_row, AnchorSide::Right, config);
        let end = column_anchor(to, to_row, AnchorSide::Left, config);
        return EdgePath {
            start,
            control1: Point::new(start.x + config.control_offset, start.y),
            control2: Point::new(end.x - config.control_offset, end.y),
            end,
            from_side: AnchorSide::Right,
            to_side: AnchorSide::Left,
            from_marker,
            to_marker,
        };
    }

    // The straight run would cut through or graze the destination. Anchor on
    // the edges that face each other and bend the controls outward, clear of
    // both bodies.
    let from_center = from.position.0 + config.node_width / 2.0;
    let to_center = to.position.0 + config.node_width / 2.0;

    if from_center > to_center {
        let start = column_anchor(from, from_row, AnchorSide::Left, config);
        let end = column_anchor(to, to_row, AnchorSide::Right, config);
        EdgePath {
            start,
            control1: Point::new(from_left - config.avoidance_offset, start.y),
            control2: Point::new(to_right + config.avoidance_offset, end.y),
            end,
            from_side: AnchorSide::Left,
            to_side: AnchorSide::Right,
            from_marker,
            to_marker,
        }
    } else {
        let start = column_anchor(from, from_row, AnchorSide::Right, config);
        let end = column_anchor(to, to_row, AnchorSide::Left, config);
        EdgePath {
            start,
            control1: Point::new(from_right + config.avoidance_offset, start.y),
            control2: Point::new(to_left - config.avoidance_offset, end.y),
            end,
            from_side: AnchorSide::Right,
            to_side: AnchorSide::Left,
            from_marker,
            to_marker,
        }
    }
}

/// Curve from a source anchor to the pointer while a connection is being
/// drawn. Markers show the type the drop would create.
pub fn preview_path(
    from: &Table,
    from_row: usize,
    side: AnchorSide,
    cursor: Point,
    config: &RoutingConfig,
) -> EdgePath {
    let (from_marker, to_marker) = markers(RelationshipType::default());
    let start = column_anchor(from, from_row, side, config);
    let direction = match side {
        AnchorSide::Right => 1.0,
        AnchorSide::Left => -1.0,
    };
    EdgePath {
        start,
        control1: Point::new(start.x + direction * config.control_offset, start.y),
        control2: Point::new(cursor.x - direction * config.control_offset, cursor.y),
        end: cursor,
        from_side: side,
        to_side: match side {
            AnchorSide::Right => AnchorSide::Left,
            AnchorSide::Left => AnchorSide::Right,
        },
        from_marker,
        to_marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ColumnType, Table};

    fn table_at(name: &str, x: f64, y: f64) -> Table {
        Table::new(name)
            .with_position(x, y)
            .add_column(Column::new("id", ColumnType::Int).primary_key())
            .add_column(Column::new("ref_id", ColumnType::Int))
            .add_column(Column::new("note", ColumnType::Text))
    }

    #[test]
    fn test_anchor_y_follows_row_index() {
        let config = RoutingConfig::default();
        let table = table_at("t", 100.0, 200.0);

        let a0 = column_anchor(&table, 0, AnchorSide::Left, &config);
        let a2 = column_anchor(&table, 2, AnchorSide::Left, &config);

        assert_eq!(a0.y, 200.0 + 48.0 + 18.0);
        assert_eq!(a2.y, 200.0 + 48.0 + 2.0 * 36.0 + 18.0);
        assert_eq!(a0.x, 100.0);
        assert_eq!(
            column_anchor(&table, 0, AnchorSide::Right, &config).x,
            100.0 + 280.0
        );
    }

    #[test]
    fn test_self_reference_loop_shape_is_column_independent() {
        let config = RoutingConfig::default();
        let table = table_at("t", 0.0, 0.0);

        let a = route_between(&table, 0, &table, 1, RelationshipType::OneToMany, &config);
        let b = route_between(&table, 1, &table, 2, RelationshipType::OneToMany, &config);

        // Both loops extend the same fixed distance off the right edge.
        assert_eq!(a.control1.x, table.position.0 + 280.0 + 60.0);
        assert_eq!(a.control1.x, b.control1.x);
        assert_eq!(a.control2.x, b.control2.x);
        assert_eq!(a.from_side, AnchorSide::Right);
        assert_eq!(a.to_side, AnchorSide::Right);
        // Horizontal tangents at both ends.
        assert_eq!(a.control1.y, a.start.y);
        assert_eq!(a.control2.y, a.end.y);
    }

    #[test]
    fn test_unobstructed_route_runs_right_to_left_edge() {
        let config = RoutingConfig::default();
        let from = table_at("a", 0.0, 0.0);
        let to = table_at("b", 500.0, 300.0);

        let path = route_between(&from, 0, &to, 1, RelationshipType::OneToMany, &config);

        assert_eq!(path.from_side, AnchorSide::Right);
        assert_eq!(path.to_side, AnchorSide::Left);
        assert_eq!(path.start.x, 280.0);
        assert_eq!(path.end.x, 500.0);
        assert_eq!(path.control1.x, 280.0 + 50.0);
        assert_eq!(path.control2.x, 500.0 - 50.0);
        assert_eq!(path.control1.y, path.start.y);
        assert_eq!(path.control2.y, path.end.y);
    }

    #[test]
    fn test_close_tables_repick_facing_edges() {
        let config = RoutingConfig::default();
        // Destination starts inside the source's clearance band.
        let from = table_at("a", 0.0, 0.0);
        let to = table_at("b", 300.0, 400.0);

        let path = route_between(&from, 0, &to, 0, RelationshipType::OneToMany, &config);

        assert_eq!(path.from_side, AnchorSide::Right);
        assert_eq!(path.to_side, AnchorSide::Left);
        assert_eq!(path.control1.x, 280.0 + 80.0);
        assert_eq!(path.control2.x, 300.0 - 80.0);
    }

    #[test]
    fn test_destination_left_of_source_routes_from_left_edge() {
        let config = RoutingConfig::default();
        let from = table_at("a", 600.0, 0.0);
        let to = table_at("b", 0.0, 0.0);

        let path = route_between(&from, 0, &to, 0, RelationshipType::OneToMany, &config);

        assert_eq!(path.from_side, AnchorSide::Left);
        assert_eq!(path.to_side, AnchorSide::Right);
        assert_eq!(path.start.x, 600.0);
        assert_eq!(path.end.x, 280.0);
        assert_eq!(path.control1.x, 600.0 - 80.0);
        assert_eq!(path.control2.x, 280.0 + 80.0);
    }

    #[test]
    fn test_marker_mapping() {
        use CardinalityMarker::{Many, One};

        assert_eq!(markers(RelationshipType::OneToOne), (One, One));
        assert_eq!(markers(RelationshipType::OneToMany), (One, Many));
        assert_eq!(markers(RelationshipType::ManyToOne), (Many, One));
        assert_eq!(markers(RelationshipType::ManyToMany), (Many, Many));
    }

    #[test]
    fn test_preview_curve_follows_the_cursor() {
        let config = RoutingConfig::default();
        let table = table_at("a", 0.0, 0.0);
        let cursor = Point::new(500.0, 250.0);

        let path = preview_path(&table, 1, AnchorSide::Right, cursor, &config);

        assert_eq!(
            path.start,
            column_anchor(&table, 1, AnchorSide::Right, &config)
        );
        assert_eq!(path.end, cursor);
        assert_eq!(path.control1.x, path.start.x + config.control_offset);
        assert_eq!(path.control1.y, path.start.y);
        // The drop would create the default cardinality.
        assert_eq!(path.from_marker, CardinalityMarker::One);
        assert_eq!(path.to_marker, CardinalityMarker::Many);
    }

    #[test]
    fn test_path_data_is_a_single_cubic() {
        let config = RoutingConfig::default();
        let from = table_at("a", 0.0, 0.0);
        let to = table_at("b", 500.0, 0.0);

        let path = route_between(&from, 0, &to, 0, RelationshipType::OneToMany, &config);
        let data = path.path_data();

        assert!(data.starts_with("M 280 "));
        assert_eq!(data.matches('C').count(), 1);
    }
}
