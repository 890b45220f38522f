//! Drawing target abstraction for the renderer and minimap.

use crate::colors::Rgba;
use crate::viewport::ScreenRect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub size_px: f64,
    pub color: Rgba,
    pub align: TextAlign,
    pub bold: bool,
}

/// An immediate-mode 2D target. Calls are issued in paint order.
pub trait Surface {
    type Image;

    fn size(&self) -> (f64, f64);
    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba);
    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba, line_width: f64);
    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgba, line_width: f64);
    fn draw_image(&mut self, image: &Self::Image, rect: ScreenRect);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: TextStyle);

    /// Approximate advance width of `text`. Surfaces with real font metrics override this.
    fn measure_text(&mut self, text: &str, size_px: f64) -> f64 {
        text.chars().count() as f64 * size_px * 0.6
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand<I> {
    FillRect(ScreenRect, Rgba),
    StrokeRect(ScreenRect, Rgba, f64),
    Line((f64, f64), (f64, f64), Rgba, f64),
    Image(I, ScreenRect),
    Text(String, f64, f64, TextStyle),
}

/// Surface that records every call; used for headless inspection and tests.
#[derive(Debug, Clone)]
pub struct RecordingSurface<I> {
    pub width: f64,
    pub height: f64,
    pub commands: Vec<DrawCommand<I>>,
}

impl<I> RecordingSurface<I> {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text(text, ..) => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &I> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Image(image, _) => Some(image),
            _ => None,
        })
    }

    pub fn fills_with(&self, color: Rgba) -> impl Iterator<Item = &ScreenRect> {
        self.commands.iter().filter_map(move |cmd| match cmd {
            DrawCommand::FillRect(rect, c) if *c == color => Some(rect),
            _ => None,
        })
    }

    pub fn strokes_with(&self, color: Rgba) -> impl Iterator<Item = &ScreenRect> {
        self.commands.iter().filter_map(move |cmd| match cmd {
            DrawCommand::StrokeRect(rect, c, _) if *c == color => Some(rect),
            _ => None,
        })
    }

    pub fn line_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Line(..)))
            .count()
    }
}

impl<I: Clone> Surface for RecordingSurface<I> {
    type Image = I;

    fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, rect: ScreenRect, color: Rgba) {
        self.commands.push(DrawCommand::FillRect(rect, color));
    }

    fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba, line_width: f64) {
        self.commands.push(DrawCommand::StrokeRect(rect, color, line_width));
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgba, line_width: f64) {
        self.commands.push(DrawCommand::Line(from, to, color, line_width));
    }

    fn draw_image(&mut self, image: &I, rect: ScreenRect) {
        self.commands.push(DrawCommand::Image(image.clone(), rect));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64, style: TextStyle) {
        self.commands.push(DrawCommand::Text(text.to_string(), x, y, style));
    }
}
