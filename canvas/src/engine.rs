use shapes::{Envelope, RoomId, Shape, ShapeId, ShapeList, StrokeId, decode_chat_message};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::geom::Point;
use crate::hit::resolve_eraser;
use crate::input::{Gesture, InputState, Tool, UiState};
use crate::render::{self, Palette, Scene};

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

/// Placeholder id carried by a preview shape until it is committed.
const PREVIEW_ID: &str = "preview";

/// Actions returned from handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Serialize and write this envelope to the room transport.
    Send(Envelope),
    /// State changed; call [`Engine::render`].
    RenderNeeded,
}

/// Core engine state: all logic that does not touch the canvas element.
///
/// Separated from `Engine` so it can be tested without WASM/browser dependencies.
#[derive(Debug)]
pub struct EngineCore {
    pub room_id: RoomId,
    pub shapes: ShapeList,
    pub ui: UiState,
    pub input: InputState,
    attached: bool,
}

impl EngineCore {
    #[must_use]
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            shapes: ShapeList::new(),
            ui: UiState::default(),
            input: InputState::default(),
            attached: true,
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    // --- Transport ---

    /// Message the host sends once the transport opens.
    #[must_use]
    pub fn join_message(&self) -> Envelope {
        Envelope::join(self.room_id.clone())
    }

    /// Seed the local list from the room history fetched before joining.
    /// Shapes that arrived live in the meantime are kept after the history.
    pub fn load_history(&mut self, messages: &[String]) -> Vec<Action> {
        if !self.attached {
            return Vec::new();
        }
        let (history, skipped) = ShapeList::from_messages(messages.iter().map(String::as_str));
        if skipped > 0 {
            log::warn!("canvas: skipped {skipped} undecodable history message(s) for room {}", self.room_id);
        }
        self.shapes.merge_history(history);
        vec![Action::RenderNeeded]
    }

    /// Apply one raw text frame from the transport. Malformed frames are
    /// logged and dropped.
    pub fn apply_text(&mut self, text: &str) -> Vec<Action> {
        match Envelope::from_json(text) {
            Ok(envelope) => self.apply_envelope(envelope),
            Err(e) => {
                log::warn!("canvas: dropping malformed message: {e}");
                Vec::new()
            }
        }
    }

    /// Apply a decoded server broadcast.
    pub fn apply_envelope(&mut self, envelope: Envelope) -> Vec<Action> {
        if !self.attached {
            return Vec::new();
        }
        match envelope {
            Envelope::Chat { room_id, message } if room_id == self.room_id => match decode_chat_message(&message) {
                Ok(shape) => {
                    if self.shapes.push_unique(shape) {
                        vec![Action::RenderNeeded]
                    } else {
                        Vec::new()
                    }
                }
                Err(e) => {
                    log::warn!("canvas: dropping invalid shape in room {room_id}: {e}");
                    Vec::new()
                }
            },
            Envelope::DeleteShapes { room_id, payload } if room_id == self.room_id => {
                if self.shapes.remove_ids(&payload.ids) > 0 { vec![Action::RenderNeeded] } else { Vec::new() }
            }
            Envelope::Error { code, message } => {
                log::warn!("canvas: server rejected operation: {code}: {message}");
                Vec::new()
            }
            other => {
                log::debug!("canvas: ignoring {other:?}");
                Vec::new()
            }
        }
    }

    // --- Tool ---

    /// Set the active tool. A gesture already in progress keeps its tool.
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        if !self.attached || self.ui.tool == tool {
            return Vec::new();
        }
        self.ui.tool = tool;
        vec![Action::RenderNeeded]
    }

    /// Set the active tool by the name the host toolbar uses. Unknown names
    /// leave the tool unchanged.
    pub fn set_tool_name(&mut self, name: &str) -> Vec<Action> {
        match Tool::from_name(name) {
            Some(tool) => self.set_tool(tool),
            None => {
                log::warn!("canvas: unknown tool {name:?}");
                Vec::new()
            }
        }
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, p: Point) -> Vec<Action> {
        if !self.attached {
            return Vec::new();
        }
        self.ui.cursor = Some(p);
        let gesture = match self.ui.tool {
            Tool::Pencil => Gesture::Pencil { anchor: p, stroke_id: StrokeId::generate() },
            tool @ (Tool::Rect | Tool::Circle) => Gesture::Box { tool, anchor: p, preview: None },
            Tool::Eraser => Gesture::Eraser { trail: vec![p] },
        };
        self.input = InputState::Dragging(gesture);
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_move(&mut self, p: Point) -> Vec<Action> {
        if !self.attached {
            return Vec::new();
        }
        self.ui.cursor = Some(p);

        let InputState::Dragging(gesture) = &mut self.input else {
            return if self.ui.tool == Tool::Eraser { vec![Action::RenderNeeded] } else { Vec::new() };
        };

        match gesture {
            Gesture::Pencil { anchor, stroke_id } => {
                let segment = Shape::pencil(ShapeId::generate(), (anchor.x, anchor.y), (p.x, p.y), stroke_id.clone());
                *anchor = p;
                self.commit(segment)
            }
            Gesture::Box { tool, anchor, preview } => {
                *preview = Some(box_shape(*tool, ShapeId::from(PREVIEW_ID), *anchor, p));
                vec![Action::RenderNeeded]
            }
            Gesture::Eraser { trail } => {
                trail.push(p);
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Finish the gesture. The release point itself is not sampled.
    pub fn on_pointer_up(&mut self, _p: Point) -> Vec<Action> {
        if !self.attached {
            return Vec::new();
        }
        match std::mem::take(&mut self.input) {
            InputState::Idle | InputState::Dragging(Gesture::Pencil { .. } | Gesture::Box { preview: None, .. }) => {
                Vec::new()
            }
            InputState::Dragging(Gesture::Box { preview: Some(mut shape), .. }) => {
                shape.id = ShapeId::generate();
                self.commit(shape)
            }
            InputState::Dragging(Gesture::Eraser { trail }) => self.erase(&trail),
        }
    }

    /// Pointer left the canvas. Only the eraser cursor indicator is affected,
    /// and only between gestures.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        if !self.attached || self.input.is_dragging() {
            return Vec::new();
        }
        let had_cursor = self.ui.cursor.take().is_some();
        if had_cursor && self.ui.tool == Tool::Eraser { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    // --- Teardown ---

    /// Stop reacting to input and transport messages. Returns the `leave_room`
    /// message for the host to send before closing the transport.
    pub fn detach(&mut self) -> Vec<Action> {
        if !self.attached {
            return Vec::new();
        }
        self.attached = false;
        self.input = InputState::Idle;
        self.ui.cursor = None;
        vec![Action::Send(Envelope::leave(self.room_id.clone()))]
    }

    // --- Queries ---

    /// Everything one frame draws, for a viewport of `width` × `height`.
    #[must_use]
    pub fn scene(&self, width: f64, height: f64) -> Scene<'_> {
        Scene {
            shapes: &self.shapes,
            preview: self.input.preview(),
            eraser_trail: self.input.eraser_trail(),
            eraser_cursor: if self.ui.tool == Tool::Eraser { self.ui.cursor } else { None },
            width,
            height,
        }
    }

    // --- Internals ---

    /// Append a locally created shape and send it to the room.
    fn commit(&mut self, shape: Shape) -> Vec<Action> {
        let mut actions = Vec::with_capacity(2);
        match Envelope::chat(self.room_id.clone(), &shape) {
            Ok(envelope) => actions.push(Action::Send(envelope)),
            Err(e) => log::warn!("canvas: shape {} not sent: {e}", shape.id),
        }
        self.shapes.push_unique(shape);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Resolve the trail, delete optimistically and send one deletion request.
    fn erase(&mut self, trail: &[Point]) -> Vec<Action> {
        let ids = resolve_eraser(trail, &self.shapes);
        if ids.is_empty() {
            return vec![Action::RenderNeeded];
        }
        self.shapes.remove_ids(&ids);
        vec![Action::Send(Envelope::delete(self.room_id.clone(), ids)), Action::RenderNeeded]
    }
}

/// Shape spanned by a drag from `anchor` to `p`; width and height are the
/// signed deltas.
fn box_shape(tool: Tool, id: ShapeId, anchor: Point, p: Point) -> Shape {
    let (width, height) = (p.x - anchor.x, p.y - anchor.y);
    if tool == Tool::Circle {
        Shape::circle(id, anchor.x, anchor.y, width, height)
    } else {
        Shape::rect(id, anchor.x, anchor.y, width, height)
    }
}

/// The full canvas engine. Wraps `EngineCore` and owns the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
    pub palette: Palette,
}

impl Engine {
    /// Create a new engine bound to the given canvas element and room.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement, room_id: RoomId) -> Self {
        Self { canvas, core: EngineCore::new(room_id), palette: Palette::default() }
    }

    // --- Delegated transport ---

    #[must_use]
    pub fn join_message(&self) -> Envelope {
        self.core.join_message()
    }

    pub fn load_history(&mut self, messages: &[String]) -> Vec<Action> {
        self.core.load_history(messages)
    }

    pub fn apply_text(&mut self, text: &str) -> Vec<Action> {
        self.core.apply_text(text)
    }

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        self.core.set_tool(tool)
    }

    pub fn set_tool_name(&mut self, name: &str) -> Vec<Action> {
        self.core.set_tool_name(name)
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, p: Point) -> Vec<Action> {
        self.core.on_pointer_down(p)
    }

    pub fn on_pointer_move(&mut self, p: Point) -> Vec<Action> {
        self.core.on_pointer_move(p)
    }

    pub fn on_pointer_up(&mut self, p: Point) -> Vec<Action> {
        self.core.on_pointer_up(p)
    }

    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        self.core.on_pointer_leave()
    }

    pub fn destroy(&mut self) -> Vec<Action> {
        self.core.detach()
    }

    // --- Render ---

    /// Draw the current state to the canvas.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a `Canvas2D` call fails.
    pub fn render(&self) -> Result<(), JsValue> {
        let mut ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| JsValue::from_str("context is not CanvasRenderingContext2d"))?;
        let scene = self.core.scene(f64::from(self.canvas.width()), f64::from(self.canvas.height()));
        render::draw(&mut ctx, &scene, &self.palette)
    }
}
