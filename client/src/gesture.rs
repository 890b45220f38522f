//! Pointer gesture recognition: pan, box-select, pinch, and click-vs-drag.
//!
//! ```text
//! Idle ──down (pan mode)────▶ Panning ──────┐
//!      ──down (select mode)─▶ BoxSelecting ─┼──up (last pointer)──▶ Idle
//!      ──second touch───────▶ Pinching ─────┘
//! ```
//!
//! On release the largest displacement any pointer reached from its own down
//! position decides the outcome: below the click threshold the gesture is a click,
//! whatever state it passed through; otherwise it completes as a pan or a box.
//! Wheel input never enters the state machine.

use pixelgrid_shared::GridPos;
use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::viewport::{GridRange, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    Pan,
    Select,
}

impl InteractionMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Pan => Self::Select,
            Self::Select => Self::Pan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Pen,
    Touch,
}

impl PointerKind {
    /// Map a DOM `pointerType` string.
    pub fn from_dom(pointer_type: &str) -> Self {
        match pointer_type {
            "touch" => Self::Touch,
            "pen" => Self::Pen,
            _ => Self::Mouse,
        }
    }
}

/// One pointer sample in viewport-local screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub id: i32,
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
}

impl PointerInput {
    pub fn mouse(x: f64, y: f64) -> Self {
        Self {
            id: 1,
            kind: PointerKind::Mouse,
            x,
            y,
        }
    }

    pub fn touch(id: i32, x: f64, y: f64) -> Self {
        Self {
            id,
            kind: PointerKind::Touch,
            x,
            y,
        }
    }

    fn pos(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Panning,
    BoxSelecting {
        /// World coordinate (cells) under the down position.
        anchor: (f64, f64),
        /// Latest pointer position on screen.
        current: (f64, f64),
    },
    Pinching {
        prev_distance: f64,
        prev_mid: (f64, f64),
    },
}

/// What the owner of the viewport should do in response to an input event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    Pan { dx: f64, dy: f64 },
    Pinch { ratio: f64, anchor: (f64, f64), dx: f64, dy: f64 },
    WheelZoom { delta: f64, anchor: (f64, f64) },
    /// Live box while dragging; a preview, not a selection.
    BoxPreview(GridRange),
    /// Gesture stayed under the click threshold. `None` when it started off-grid.
    Click(Option<GridPos>),
    BoxCompleted(GridRange),
    PanCompleted,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
struct TrackedPointer {
    id: i32,
    down: (f64, f64),
    last: (f64, f64),
}

#[derive(Debug)]
pub struct GestureController {
    state: GestureState,
    pointers: Vec<TrackedPointer>,
    start_cell: Option<GridPos>,
    max_displacement: f64,
    touch_gesture: bool,
    threshold_mouse: f64,
    threshold_touch: f64,
    cols: i32,
    rows: i32,
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

impl GestureController {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            state: GestureState::Idle,
            pointers: Vec::with_capacity(2),
            start_cell: None,
            max_displacement: 0.0,
            touch_gesture: false,
            threshold_mouse: config.click_threshold_mouse_px,
            threshold_touch: config.click_threshold_touch_px,
            cols: config.cols,
            rows: config.rows,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.state, GestureState::Idle)
    }

    /// Click threshold that applies to the gesture in progress.
    pub fn click_threshold(&self) -> f64 {
        if self.touch_gesture {
            self.threshold_touch
        } else {
            self.threshold_mouse
        }
    }

    /// Current box in grid coordinates, recomputed from screen positions each call.
    pub fn box_range(&self, vp: &Viewport) -> Option<GridRange> {
        match self.state {
            GestureState::BoxSelecting { anchor, current } => Some(GridRange::from_world_corners(
                anchor,
                vp.screen_to_world(current.0, current.1),
            )),
            _ => None,
        }
    }

    pub fn pointer_down(
        &mut self,
        input: PointerInput,
        mode: InteractionMode,
        vp: &Viewport,
    ) -> Option<GestureAction> {
        if let Some(existing) = self.pointers.iter_mut().find(|p| p.id == input.id) {
            existing.last = input.pos();
            return None;
        }

        match (self.state, self.pointers.len()) {
            (GestureState::Idle, _) => {
                self.pointers.clear();
                self.pointers.push(TrackedPointer {
                    id: input.id,
                    down: input.pos(),
                    last: input.pos(),
                });
                self.max_displacement = 0.0;
                self.touch_gesture = input.kind == PointerKind::Touch;
                let cell = vp.screen_to_grid(input.x, input.y);
                self.start_cell = (cell.x >= 0 && cell.y >= 0 && cell.x < self.cols && cell.y < self.rows)
                    .then_some(cell);

                match mode {
                    InteractionMode::Pan => {
                        self.transition(GestureState::Panning);
                        None
                    }
                    InteractionMode::Select => {
                        let anchor = vp.screen_to_world(input.x, input.y);
                        self.transition(GestureState::BoxSelecting {
                            anchor,
                            current: input.pos(),
                        });
                        self.box_range(vp).map(GestureAction::BoxPreview)
                    }
                }
            }
            (GestureState::Panning | GestureState::BoxSelecting { .. }, 1)
                if input.kind == PointerKind::Touch =>
            {
                let first = self.pointers[0].last;
                self.pointers.push(TrackedPointer {
                    id: input.id,
                    down: input.pos(),
                    last: input.pos(),
                });
                self.touch_gesture = true;
                self.transition(GestureState::Pinching {
                    prev_distance: distance(first, input.pos()),
                    prev_mid: midpoint(first, input.pos()),
                });
                None
            }
            _ => None,
        }
    }

    pub fn pointer_move(&mut self, input: PointerInput, vp: &Viewport) -> Option<GestureAction> {
        let idx = self.pointers.iter().position(|p| p.id == input.id)?;
        let previous = self.pointers[idx].last;
        self.pointers[idx].last = input.pos();
        self.max_displacement = self
            .max_displacement
            .max(distance(self.pointers[idx].down, input.pos()));

        match self.state {
            GestureState::Idle => None,
            GestureState::Panning => Some(GestureAction::Pan {
                dx: input.x - previous.0,
                dy: input.y - previous.1,
            }),
            GestureState::BoxSelecting { anchor, .. } => {
                self.state = GestureState::BoxSelecting {
                    anchor,
                    current: input.pos(),
                };
                self.box_range(vp).map(GestureAction::BoxPreview)
            }
            GestureState::Pinching {
                prev_distance,
                prev_mid,
            } => {
                // After one finger lifts the survivor is ignored until release.
                if self.pointers.len() < 2 {
                    return None;
                }
                let (a, b) = (self.pointers[0].last, self.pointers[1].last);
                let new_distance = distance(a, b);
                let new_mid = midpoint(a, b);
                self.state = GestureState::Pinching {
                    prev_distance: new_distance,
                    prev_mid: new_mid,
                };
                if prev_distance <= f64::EPSILON || new_distance <= f64::EPSILON {
                    return None;
                }
                Some(GestureAction::Pinch {
                    ratio: new_distance / prev_distance,
                    anchor: new_mid,
                    dx: new_mid.0 - prev_mid.0,
                    dy: new_mid.1 - prev_mid.1,
                })
            }
        }
    }

    pub fn pointer_up(&mut self, input: PointerInput, vp: &Viewport) -> Option<GestureAction> {
        let idx = self.pointers.iter().position(|p| p.id == input.id)?;
        let pointer = self.pointers.remove(idx);
        self.max_displacement = self.max_displacement.max(distance(pointer.down, input.pos()));
        if let GestureState::BoxSelecting { anchor, .. } = self.state {
            self.state = GestureState::BoxSelecting {
                anchor,
                current: input.pos(),
            };
        }
        if !self.pointers.is_empty() {
            return None;
        }

        let action = if self.max_displacement < self.click_threshold() {
            GestureAction::Click(self.start_cell)
        } else {
            match self.state {
                GestureState::BoxSelecting { .. } => self
                    .box_range(vp)
                    .map_or(GestureAction::Cancelled, GestureAction::BoxCompleted),
                GestureState::Idle => GestureAction::Cancelled,
                GestureState::Panning | GestureState::Pinching { .. } => GestureAction::PanCompleted,
            }
        };
        self.reset();
        Some(action)
    }

    /// Abort the gesture (pointercancel, Escape, mode change).
    pub fn cancel(&mut self) -> Option<GestureAction> {
        let was_active = self.is_active();
        self.reset();
        was_active.then_some(GestureAction::Cancelled)
    }

    /// Wheel zoom around the pointer; independent of any gesture in progress.
    pub fn wheel(&self, delta: f64, x: f64, y: f64) -> GestureAction {
        GestureAction::WheelZoom {
            delta,
            anchor: (x, y),
        }
    }

    fn transition(&mut self, next: GestureState) {
        tracing::trace!(from = ?self.state, to = ?next, "gesture transition");
        self.state = next;
    }

    fn reset(&mut self) {
        self.transition(GestureState::Idle);
        self.pointers.clear();
        self.start_cell = None;
        self.max_displacement = 0.0;
        self.touch_gesture = false;
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn setup() -> (GestureController, Viewport) {
        let config = GridConfig::default();
        (GestureController::new(&config), Viewport::new(&config))
    }

    #[test]
    fn small_pan_gesture_is_a_click_on_the_down_cell() {
        let (mut gestures, vp) = setup();
        assert_eq!(
            gestures.pointer_down(PointerInput::mouse(12.0, 20.0), InteractionMode::Pan, &vp),
            None
        );
        assert_eq!(
            gestures.pointer_move(PointerInput::mouse(13.0, 21.0), &vp),
            Some(GestureAction::Pan { dx: 1.0, dy: 1.0 })
        );
        assert_eq!(
            gestures.pointer_up(PointerInput::mouse(13.0, 21.0), &vp),
            Some(GestureAction::Click(Some(GridPos::new(1, 2))))
        );
        assert!(!gestures.is_active());
    }

    #[test]
    fn pan_deltas_are_incremental() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::mouse(0.0, 0.0), InteractionMode::Pan, &vp);
        gestures.pointer_move(PointerInput::mouse(10.0, 0.0), &vp);
        assert_eq!(
            gestures.pointer_move(PointerInput::mouse(25.0, -5.0), &vp),
            Some(GestureAction::Pan { dx: 15.0, dy: -5.0 })
        );
        assert_eq!(
            gestures.pointer_up(PointerInput::mouse(25.0, -5.0), &vp),
            Some(GestureAction::PanCompleted)
        );
    }

    #[test]
    fn select_drag_completes_box() {
        let (mut gestures, vp) = setup();
        let preview = gestures.pointer_down(PointerInput::mouse(0.0, 0.0), InteractionMode::Select, &vp);
        assert_eq!(
            preview,
            Some(GestureAction::BoxPreview(GridRange::single(GridPos::new(0, 0))))
        );
        gestures.pointer_move(PointerInput::mouse(24.0, 16.0), &vp);
        let expected = GridRange::from_corners(GridPos::new(0, 0), GridPos::new(2, 1));
        assert_eq!(gestures.box_range(&vp), Some(expected));
        assert_eq!(
            gestures.pointer_up(PointerInput::mouse(24.0, 16.0), &vp),
            Some(GestureAction::BoxCompleted(expected))
        );
        assert_eq!(gestures.box_range(&vp), None);
    }

    #[test]
    fn drag_out_and_back_is_not_a_click() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::mouse(50.0, 50.0), InteractionMode::Select, &vp);
        gestures.pointer_move(PointerInput::mouse(90.0, 50.0), &vp);
        let action = gestures.pointer_up(PointerInput::mouse(51.0, 50.0), &vp);
        assert!(matches!(action, Some(GestureAction::BoxCompleted(_))));
    }

    #[test]
    fn touch_uses_the_larger_threshold() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::touch(7, 40.0, 40.0), InteractionMode::Pan, &vp);
        gestures.pointer_move(PointerInput::touch(7, 48.0, 40.0), &vp);
        assert_eq!(gestures.click_threshold(), 12.0);
        assert_eq!(
            gestures.pointer_up(PointerInput::touch(7, 48.0, 40.0), &vp),
            Some(GestureAction::Click(Some(GridPos::new(5, 5))))
        );
    }

    #[test]
    fn click_off_grid_reports_no_cell() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::mouse(-20.0, 5.0), InteractionMode::Pan, &vp);
        assert_eq!(
            gestures.pointer_up(PointerInput::mouse(-20.0, 5.0), &vp),
            Some(GestureAction::Click(None))
        );
    }

    #[test]
    fn second_touch_enters_pinch_and_reports_ratio() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::touch(1, 100.0, 100.0), InteractionMode::Pan, &vp);
        gestures.pointer_down(PointerInput::touch(2, 200.0, 100.0), InteractionMode::Pan, &vp);
        assert!(matches!(gestures.state(), GestureState::Pinching { .. }));

        let action = gestures.pointer_move(PointerInput::touch(2, 300.0, 100.0), &vp);
        assert_eq!(
            action,
            Some(GestureAction::Pinch {
                ratio: 2.0,
                anchor: (200.0, 100.0),
                dx: 50.0,
                dy: 0.0,
            })
        );

        assert_eq!(gestures.pointer_up(PointerInput::touch(2, 300.0, 100.0), &vp), None);
        assert_eq!(gestures.pointer_move(PointerInput::touch(1, 140.0, 100.0), &vp), None);
        assert_eq!(
            gestures.pointer_up(PointerInput::touch(1, 140.0, 100.0), &vp),
            Some(GestureAction::PanCompleted)
        );
    }

    #[test]
    fn mouse_does_not_start_a_pinch() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::mouse(10.0, 10.0), InteractionMode::Pan, &vp);
        let mut other = PointerInput::mouse(30.0, 30.0);
        other.id = 2;
        gestures.pointer_down(other, InteractionMode::Pan, &vp);
        assert_eq!(gestures.state(), GestureState::Panning);
    }

    #[test]
    fn untracked_pointer_events_are_ignored() {
        let (mut gestures, vp) = setup();
        assert_eq!(gestures.pointer_move(PointerInput::mouse(5.0, 5.0), &vp), None);
        assert_eq!(gestures.pointer_up(PointerInput::mouse(5.0, 5.0), &vp), None);
        assert_eq!(gestures.cancel(), None);
    }

    #[test]
    fn cancel_resets_an_active_gesture() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::mouse(5.0, 5.0), InteractionMode::Select, &vp);
        assert_eq!(gestures.cancel(), Some(GestureAction::Cancelled));
        assert_eq!(gestures.state(), GestureState::Idle);
        assert_eq!(gestures.pointer_up(PointerInput::mouse(5.0, 5.0), &vp), None);
    }

    #[test]
    fn wheel_does_not_touch_gesture_state() {
        let (mut gestures, vp) = setup();
        gestures.pointer_down(PointerInput::mouse(5.0, 5.0), InteractionMode::Pan, &vp);
        assert_eq!(
            gestures.wheel(120.0, 3.0, 4.0),
            GestureAction::WheelZoom {
                delta: 120.0,
                anchor: (3.0, 4.0)
            }
        );
        assert_eq!(gestures.state(), GestureState::Panning);
    }

    proptest! {
        #[test]
        fn click_iff_below_threshold(
            select in any::<bool>(),
            start_x in 50.0f64..500.0,
            start_y in 50.0f64..500.0,
            dx in -20.0f64..20.0,
            dy in -20.0f64..20.0,
        ) {
            let (mut gestures, vp) = setup();
            let mode = if select { InteractionMode::Select } else { InteractionMode::Pan };
            gestures.pointer_down(PointerInput::mouse(start_x, start_y), mode, &vp);
            let end = PointerInput::mouse(start_x + dx, start_y + dy);
            gestures.pointer_move(end, &vp);
            let action = gestures.pointer_up(end, &vp);
            let is_click = matches!(action, Some(GestureAction::Click(_)));
            prop_assert_eq!(is_click, dx.hypot(dy) < 5.0);
        }
    }
}
