use std::collections::HashMap;
use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    prelude::*,
    primitives::{Circle, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
};

use crate::draw::{Surface, Transform};
use crate::image::{Color, Image, Resolution};
use crate::overlay::OverlayAsset;
use crate::rect::Rect;

/// A [`Surface`] that rasterizes draw commands into an [`Image`].
///
/// Overlay assets have to be registered with [`ImageSurface::set_asset`]. Overlays whose asset is
/// missing are drawn as a rectangle outline instead.
pub struct ImageSurface {
    target: Image,
    transform: Transform,
    assets: HashMap<OverlayAsset, Image>,
}

impl ImageSurface {
    pub fn new(res: Resolution) -> Self {
        Self {
            target: Image::new(res.width(), res.height()),
            transform: Transform::Identity,
            assets: HashMap::new(),
        }
    }

    /// Registers the image to draw for `asset`.
    pub fn set_asset(&mut self, asset: OverlayAsset, image: Image) {
        self.assets.insert(asset, image);
    }

    /// Returns the rendered image.
    pub fn image(&self) -> &Image {
        &self.target
    }

    fn width(&self) -> f32 {
        self.target.width() as f32
    }
}

impl Surface for ImageSurface {
    fn resolution(&self) -> Resolution {
        self.target.resolution()
    }

    fn clear(&mut self) {
        self.target.clear(Color::NULL);
        self.transform = Transform::Identity;
    }

    fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    fn draw_frame(&mut self, frame: &Image) {
        let mut scaled = frame.resized(self.resolution());
        if self.transform == Transform::MirrorHorizontal {
            scaled.flip_horizontal_in_place();
        }
        image::imageops::overlay(&mut self.target.buf, &scaled.buf, 0, 0);
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Color) {
        let (x, y) = self.transform.apply_point(self.width(), x, y);
        let diameter = (radius * 2.0).round().max(1.0) as u32;
        let center = Point::new(x.round() as i32, y.round() as i32);
        match Circle::with_center(center, diameter)
            .into_styled(PrimitiveStyle::with_fill(color))
            .draw(&mut Target(&mut self.target))
        {
            Ok(()) => {}
            Err(infallible) => match infallible {},
        }
    }

    fn draw_overlay(&mut self, asset: OverlayAsset, rect: Rect) {
        let rect = self.transform.apply_rect(self.width(), rect);
        let (w, h) = (rect.width().round() as u32, rect.height().round() as u32);
        if w == 0 || h == 0 {
            return;
        }
        let (x, y) = (rect.x().round() as i64, rect.y().round() as i64);

        match self.assets.get(&asset) {
            Some(source) => {
                let mut scaled = source.resized(Resolution::new(w, h));
                if self.transform == Transform::MirrorHorizontal {
                    scaled.flip_horizontal_in_place();
                }
                image::imageops::overlay(&mut self.target.buf, &scaled.buf, x, y);
            }
            None => {
                log::trace!("no image registered for {asset:?}, drawing outline");
                match Rectangle::new(Point::new(x as i32, y as i32), Size::new(w, h))
                    .into_styled(
                        PrimitiveStyleBuilder::new()
                            .stroke_color(Color::YELLOW)
                            .stroke_width(1)
                            .stroke_alignment(StrokeAlignment::Inside)
                            .build(),
                    )
                    .draw(&mut Target(&mut self.target))
                {
                    Ok(()) => {}
                    Err(infallible) => match infallible {},
                }
            }
        }
    }
}

/// Alpha-blending draw target for `embedded-graphics` primitives.
struct Target<'a>(&'a mut Image);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size {
                width: self.0.width(),
                height: self.0.height(),
            },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(pos, color) in pixels {
            if pos.x >= 0
                && (pos.x as u32) < self.0.width()
                && pos.y >= 0
                && (pos.y as u32) < self.0.height()
            {
                let (x, y) = (pos.x as u32, pos.y as u32);
                let blended = color.blend_over(self.0.get(x, y));
                self.0.set(x, y, blended);
            }
        }

        Ok(())
    }
}
