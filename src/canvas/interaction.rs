//! Pointer-event state machine.
//!
//! Translates raw pointer events from the host view into schema commands.
//! Screen coordinates are converted to model space through the view-owned
//! [`Viewport`] before anything else happens, so dragging stays correct at
//! any zoom level. One event is processed to completion before the next; the
//! controller never holds references into the model, only ids.

use serde::{Deserialize, Serialize};

use super::routing::{AnchorSide, Point};
use crate::core::{ColumnId, Outcome, RelationshipType, SchemaCommand, SchemaModel, TableId};

/// View-owned zoom and pan, consumed read-only for coordinate conversion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    pub pan: (f64, f64),
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: (0.0, 0.0),
        }
    }
}

impl Viewport {
    pub fn to_model(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan.0) / self.zoom,
            (screen.y - self.pan.1) / self.zoom,
        )
    }

    pub fn to_screen(&self, model: Point) -> Point {
        Point::new(
            model.x * self.zoom + self.pan.0,
            model.y * self.zoom + self.pan.1,
        )
    }
}

/// What a pointer event landed on, as hit-tested by the view.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum HitTarget {
    Canvas,
    TableBody(TableId),
    ColumnRow {
        table: TableId,
        column: ColumnId,
    },
    /// The connector affordance on one side of a column row.
    Connector {
        table: TableId,
        column: ColumnId,
        side: AnchorSide,
    },
}

/// Current interaction mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionState {
    Idle,
    DraggingTable {
        table: TableId,
        /// Pointer position minus table origin, in model space.
        grab_offset: (f64, f64),
    },
    ConnectingEdge {
        source_table: TableId,
        source_column: ColumnId,
        source_side: AnchorSide,
        /// Transient endpoint following the pointer, for preview rendering.
        cursor: Point,
    },
}

/// Live connection-drawing preview: source anchor plus the cursor endpoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConnectPreview {
    pub source_table: TableId,
    pub source_column: ColumnId,
    pub source_side: AnchorSide,
    pub cursor: Point,
}

/// Finite-state machine turning pointer events into model commands.
#[derive(Clone, Debug)]
pub struct InteractionController {
    state: InteractionState,
    viewport: Viewport,
    selected: Option<TableId>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self {
            state: InteractionState::Idle,
            viewport: Viewport::default(),
            selected: None,
        }
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Adopt the view's current zoom and pan. Call before feeding events when
    /// the view transform changed.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state(), InteractionState::Idle)
    }

    /// Table shown in the host's properties panel. Set when a drag starts.
    pub fn selected_table(&self) -> Option<TableId> {
        self.selected
    }

    pub fn select_table(&mut self, table: Option<TableId>) {
        self.selected = table;
    }

    /// The in-flight connection, if one is being drawn.
    pub fn connect_preview(&self) -> Option<ConnectPreview> {
        match self.state() {
            InteractionState::ConnectingEdge {
                source_table,
                source_column,
                source_side,
                cursor,
            } => Some(ConnectPreview {
                source_table,
                source_column,
                source_side,
                cursor,
            }),
            _ => None,
        }
    }

    /// Pointer pressed. Starts a drag on a table body, starts drawing a
    /// connection on a connector affordance.
    pub fn pointer_down(&mut self, model: &SchemaModel, screen: Point, target: HitTarget) {
        if !self.is_idle() {
            return;
        }
        let pointer = self.viewport.to_model(screen);
        match target {
            HitTarget::TableBody(table) => {
                let Some(t) = model.table(table) else {
                    return;
                };
                let grab_offset = (pointer.x - t.position.0, pointer.y - t.position.1);
                self.state = InteractionState::DraggingTable { table, grab_offset };
                self.selected = Some(table);
                tracing::debug!("drag start on table {}", table);
            }
            HitTarget::Connector {
                table,
                column,
                side,
            } => {
                if model.table(table).and_then(|t| t.column_by_id(column)).is_none() {
                    return;
                }
                self.state = InteractionState::ConnectingEdge {
                    source_table: table,
                    source_column: column,
                    source_side: side,
                    cursor: pointer,
                };
                tracing::debug!("connect start from column {}", column);
            }
            HitTarget::ColumnRow { .. } | HitTarget::Canvas => {}
        }
    }

    /// Pointer moved. Commits the dragged table's position, or advances the
    /// connection preview; never both.
    pub fn pointer_move(&mut self, model: &mut SchemaModel, screen: Point) -> Option<Outcome> {
        let pointer = self.viewport.to_model(screen);
        match self.state() {
            InteractionState::DraggingTable { table, grab_offset } => {
                let position = (pointer.x - grab_offset.0, pointer.y - grab_offset.1);
                Some(model.apply(SchemaCommand::MoveTable { table, position }))
            }
            InteractionState::ConnectingEdge {
                source_table,
                source_column,
                source_side,
                ..
            } => {
                self.state = InteractionState::ConnectingEdge {
                    source_table,
                    source_column,
                    source_side,
                    cursor: pointer,
                };
                None
            }
            InteractionState::Idle => None,
        }
    }

    /// Pointer released. Ends a drag wherever it happens (positions committed
    /// incrementally are kept); completes a connection when released over a
    /// column row, cancels it anywhere else. A release while idle is ignored.
    pub fn pointer_up(
        &mut self,
        model: &mut SchemaModel,
        _screen: Point,
        target: HitTarget,
    ) -> Option<Outcome> {
        match self.state() {
            InteractionState::DraggingTable { table, .. } => {
                self.state = InteractionState::Idle;
                tracing::debug!("drag end on table {}", table);
                None
            }
            InteractionState::ConnectingEdge {
                source_table,
                source_column,
                ..
            } => {
                self.state = InteractionState::Idle;
                let (to_table, to_column) = match target {
                    HitTarget::ColumnRow { table, column }
                    | HitTarget::Connector { table, column, .. } => (table, column),
                    _ => {
                        tracing::debug!("connect cancelled");
                        return None;
                    }
                };
                Some(model.apply(SchemaCommand::CreateRelationship {
                    from_table: source_table,
                    from_column: source_column,
                    to_table,
                    to_column,
                    relationship_type: RelationshipType::default(),
                }))
            }
            InteractionState::Idle => {
                tracing::debug!("pointer up while idle ignored");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EntityId;
    use crate::core::sample_schema;

    fn fixture() -> (SchemaModel, TableId, ColumnId, TableId, ColumnId) {
        let model = sample_schema();
        let users = model.find_table_by_name("users").unwrap();
        let posts = model.find_table_by_name("posts").unwrap();
        let users_email = model
            .table(users)
            .unwrap()
            .find_column("email")
            .unwrap()
            .1
            .id;
        let posts_title = model
            .table(posts)
            .unwrap()
            .find_column("title")
            .unwrap()
            .1
            .id;
        (model, users, users_email, posts, posts_title)
    }

    #[test]
    fn test_drag_moves_by_screen_delta_divided_by_zoom() {
        let (mut model, users, ..) = fixture();
        let mut controller = InteractionController::new();
        controller.set_viewport(Viewport {
            zoom: 2.0,
            pan: (0.0, 0.0),
        });

        let start = model.table(users).unwrap().position;
        // users sits at (100, 100) in model space -> (200, 200) on screen.
        controller.pointer_down(
            &model,
            Point::new(220.0, 230.0),
            HitTarget::TableBody(users),
        );
        controller.pointer_move(&mut model, Point::new(270.0, 260.0));
        controller.pointer_up(&mut model, Point::new(270.0, 260.0), HitTarget::Canvas);

        let end = model.table(users).unwrap().position;
        assert_eq!(end, (start.0 + 25.0, start.1 + 15.0));
        assert!(controller.is_idle());
    }

    #[test]
    fn test_drag_start_selects_the_table() {
        let (model, users, ..) = fixture();
        let mut controller = InteractionController::new();

        assert_eq!(controller.selected_table(), None);
        controller.pointer_down(
            &model,
            Point::new(110.0, 110.0),
            HitTarget::TableBody(users),
        );
        assert_eq!(controller.selected_table(), Some(users));

        // The host panel can clear the selection explicitly.
        controller.select_table(None);
        assert_eq!(controller.selected_table(), None);
    }

    #[test]
    fn test_connect_completes_over_a_column_row() {
        let (mut model, users, users_email, posts, posts_title) = fixture();
        let mut controller = InteractionController::new();
        let before = model.relationship_count();

        controller.pointer_down(
            &model,
            Point::new(380.0, 190.0),
            HitTarget::Connector {
                table: users,
                column: users_email,
                side: AnchorSide::Right,
            },
        );
        controller.pointer_move(&mut model, Point::new(450.0, 220.0));
        let outcome = controller.pointer_up(
            &mut model,
            Point::new(540.0, 250.0),
            HitTarget::ColumnRow {
                table: posts,
                column: posts_title,
            },
        );

        assert_eq!(model.relationship_count(), before + 1);
        assert!(matches!(
            outcome.unwrap().created_id(),
            Some(EntityId::Relationship(_))
        ));
        assert!(controller.is_idle());

        let title = model.column(posts_title).unwrap();
        assert!(title.is_fk);
    }

    #[test]
    fn test_connect_cancels_over_empty_canvas() {
        let (mut model, users, users_email, ..) = fixture();
        let mut controller = InteractionController::new();
        let before = model.relationship_count();

        controller.pointer_down(
            &model,
            Point::new(380.0, 190.0),
            HitTarget::Connector {
                table: users,
                column: users_email,
                side: AnchorSide::Right,
            },
        );
        let outcome =
            controller.pointer_up(&mut model, Point::new(900.0, 700.0), HitTarget::Canvas);

        assert!(outcome.is_none());
        assert_eq!(model.relationship_count(), before);
        assert!(controller.is_idle());
    }

    #[test]
    fn test_connect_preview_follows_the_cursor_without_mutation() {
        let (mut model, users, users_email, ..) = fixture();
        let mut controller = InteractionController::new();
        let snapshot = model.to_document();

        controller.pointer_down(
            &model,
            Point::new(380.0, 190.0),
            HitTarget::Connector {
                table: users,
                column: users_email,
                side: AnchorSide::Right,
            },
        );
        controller.pointer_move(&mut model, Point::new(500.0, 333.0));

        let preview = controller.connect_preview().unwrap();
        assert_eq!(preview.cursor, Point::new(500.0, 333.0));
        assert_eq!(preview.source_column, users_email);
        assert_eq!(model.to_document(), snapshot);
    }

    #[test]
    fn test_pointer_up_while_idle_is_ignored() {
        let (mut model, ..) = fixture();
        let mut controller = InteractionController::new();

        let outcome = controller.pointer_up(&mut model, Point::new(0.0, 0.0), HitTarget::Canvas);
        assert!(outcome.is_none());
        assert!(controller.is_idle());
    }

    #[test]
    fn test_pan_is_subtracted_before_zoom() {
        let viewport = Viewport {
            zoom: 2.0,
            pan: (40.0, -10.0),
        };
        let model_point = viewport.to_model(Point::new(240.0, 190.0));
        assert_eq!(model_point, Point::new(100.0, 100.0));
        assert_eq!(viewport.to_screen(model_point), Point::new(240.0, 190.0));
    }

    #[test]
    fn test_stale_table_id_does_not_start_a_drag() {
        let (model, ..) = fixture();
        let mut controller = InteractionController::new();

        controller.pointer_down(
            &model,
            Point::new(0.0, 0.0),
            HitTarget::TableBody(TableId::new()),
        );
        assert!(controller.is_idle());
        assert_eq!(controller.selected_table(), None);
    }
}
