//! Drawing surfaces and draw commands.
//!
//! The analysis pipeline never touches pixels. It describes what to draw through the [`Surface`]
//! trait, which is implemented by the rasterizing [`ImageSurface`][crate::image::ImageSurface] and
//! by the [`CommandRecorder`], which stores the command stream for inspection.
//!
//! Drawing helpers follow a guard pattern: [`marker`] and [`overlay`] return a guard that can be
//! customized, and the command is issued when the guard is dropped.

use crate::image::{Color, Image, Resolution};
use crate::overlay::OverlayAsset;
use crate::rect::Rect;

/// Coordinate transform applied by a [`Surface`] to everything drawn after it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    Identity,
    /// Reflects around the vertical center line: `x' = width - x`.
    MirrorHorizontal,
}

impl Transform {
    /// Maps a point from drawing coordinates into the pixel space of a surface of width `width`.
    #[inline]
    pub fn apply_point(&self, width: f32, x: f32, y: f32) -> (f32, f32) {
        match self {
            Transform::Identity => (x, y),
            Transform::MirrorHorizontal => (width - x, y),
        }
    }

    /// Maps a rectangle from drawing coordinates into the pixel space of a surface of width
    /// `width`.
    #[inline]
    pub fn apply_rect(&self, width: f32, rect: Rect) -> Rect {
        match self {
            Transform::Identity => rect,
            Transform::MirrorHorizontal => rect.mirror_horizontal(width),
        }
    }
}

/// A destination for draw commands.
///
/// All coordinates are in the surface's pixel space before the current [`Transform`] is applied.
pub trait Surface {
    /// Returns the size of the surface in pixels.
    fn resolution(&self) -> Resolution;

    /// Erases the surface and resets its transform to [`Transform::Identity`].
    fn clear(&mut self);

    /// Sets the transform used for all following commands.
    fn set_transform(&mut self, transform: Transform);

    /// Draws a camera frame stretched over the whole surface.
    fn draw_frame(&mut self, frame: &Image);

    /// Draws a filled circle.
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Color);

    /// Draws an overlay asset scaled into `rect`.
    fn draw_overlay(&mut self, asset: OverlayAsset, rect: Rect);
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn set_transform(&mut self, transform: Transform) {
        (**self).set_transform(transform)
    }

    fn draw_frame(&mut self, frame: &Image) {
        (**self).draw_frame(frame)
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) {
        (**self).fill_circle(x, y, radius, color)
    }

    fn draw_overlay(&mut self, asset: OverlayAsset, rect: Rect) {
        (**self).draw_overlay(asset, rect)
    }
}

/// A single recorded draw command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    SetTransform(Transform),
    Frame(Resolution),
    Circle {
        x: f32,
        y: f32,
        radius: f32,
        color: Color,
    },
    Overlay {
        asset: OverlayAsset,
        rect: Rect,
    },
}

/// A [`Surface`] that records every command it receives.
#[derive(Debug, Clone)]
pub struct CommandRecorder {
    resolution: Resolution,
    commands: Vec<DrawCommand>,
}

impl CommandRecorder {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            commands: Vec::new(),
        }
    }

    /// Returns the commands recorded since the last [`Surface::clear`].
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Returns the recorded commands with the active transform applied to every coordinate.
    ///
    /// The result contains no [`DrawCommand::SetTransform`] entries; circles and overlays are in
    /// final pixel coordinates.
    pub fn resolved(&self) -> Vec<DrawCommand> {
        let width = self.resolution.width() as f32;
        let mut transform = Transform::Identity;
        let mut out = Vec::with_capacity(self.commands.len());
        for cmd in &self.commands {
            match *cmd {
                DrawCommand::SetTransform(t) => transform = t,
                DrawCommand::Circle {
                    x,
                    y,
                    radius,
                    color,
                } => {
                    let (x, y) = transform.apply_point(width, x, y);
                    out.push(DrawCommand::Circle {
                        x,
                        y,
                        radius,
                        color,
                    });
                }
                DrawCommand::Overlay { asset, rect } => out.push(DrawCommand::Overlay {
                    asset,
                    rect: transform.apply_rect(width, rect),
                }),
                ref other => out.push(other.clone()),
            }
        }
        out
    }

    /// Returns the overlays drawn, in final pixel coordinates.
    pub fn overlays(&self) -> Vec<(OverlayAsset, Rect)> {
        self.resolved()
            .into_iter()
            .filter_map(|cmd| match cmd {
                DrawCommand::Overlay { asset, rect } => Some((asset, rect)),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of markers drawn.
    pub fn marker_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Circle { .. }))
            .count()
    }
}

impl Surface for CommandRecorder {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn set_transform(&mut self, transform: Transform) {
        self.commands.push(DrawCommand::SetTransform(transform));
    }

    fn draw_frame(&mut self, frame: &Image) {
        self.commands.push(DrawCommand::Frame(frame.resolution()));
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            x,
            y,
            radius,
            color,
        });
    }

    fn draw_overlay(&mut self, asset: OverlayAsset, rect: Rect) {
        self.commands.push(DrawCommand::Overlay { asset, rect });
    }
}

/// Guard returned by [`marker`]; draws the marker when dropped and allows customization.
pub struct DrawMarker<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    x: f32,
    y: f32,
    color: Color,
    radius: f32,
}

impl<'a, S: Surface + ?Sized> DrawMarker<'a, S> {
    /// Sets the marker's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the marker's radius in pixels.
    ///
    /// The default radius is 2. A radius of 0 or less draws nothing.
    pub fn radius(&mut self, radius: f32) -> &mut Self {
        self.radius = radius;
        self
    }
}

impl<S: Surface + ?Sized> Drop for DrawMarker<'_, S> {
    fn drop(&mut self) {
        if self.radius > 0.0 {
            self.surface
                .fill_circle(self.x, self.y, self.radius, self.color);
        }
    }
}

/// Guard returned by [`overlay`]; draws the overlay asset when dropped.
pub struct DrawOverlay<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    asset: OverlayAsset,
    rect: Rect,
}

impl<S: Surface + ?Sized> Drop for DrawOverlay<'_, S> {
    fn drop(&mut self) {
        self.surface.draw_overlay(self.asset, self.rect);
    }
}

/// Draws a landmark marker centered at `(x, y)`.
pub fn marker<S: Surface + ?Sized>(surface: &mut S, x: f32, y: f32) -> DrawMarker<'_, S> {
    DrawMarker {
        surface,
        x,
        y,
        color: Color::CYAN,
        radius: 2.0,
    }
}

/// Draws an overlay asset into `rect`.
pub fn overlay<S: Surface + ?Sized>(
    surface: &mut S,
    asset: OverlayAsset,
    rect: Rect,
) -> DrawOverlay<'_, S> {
    DrawOverlay {
        surface,
        asset,
        rect,
    }
}
