//! `embedded-graphics` support.
//!
//! The matrix shows up as a display `N - 1` pixels wide and `N` pixels high,
//! pixel `(x, y)` being linear index `y * (N - 1) + x + 1`. Since only one
//! device can be lit, drawing a shape leaves the last `On` pixel lit; a
//! persistent picture is the caller's refresh loop drawing one pixel at a time.

use core::convert::Infallible;

use embedded_graphics::draw_target::DrawTarget;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::{Dimensions, OriginDimensions, Point, Size};
use embedded_graphics::Pixel;

use crate::driver::PinDriver;
use crate::{Charlieplex, DiodeNode};

impl<D: PinDriver, const N: usize> Charlieplex<D, N> {
    fn pixel_node(&self, point: Point) -> Option<DiodeNode<D::Pin>> {
        if point.x < 0 || point.y < 0 {
            return None;
        }
        let (x, y) = (point.x as usize, point.y as usize);
        if x >= N - 1 || y >= N {
            return None;
        }
        self.mapper.node_at((y * (N - 1) + x + 1) as u16).ok()
    }
}

impl<D: PinDriver, const N: usize> OriginDimensions for Charlieplex<D, N> {
    fn size(&self) -> Size {
        Size::new((N - 1) as u32, N as u32)
    }
}

impl<D: PinDriver, const N: usize> DrawTarget for Charlieplex<D, N> {
    type Color = BinaryColor;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let Some(node) = self.pixel_node(point) else {
                continue;
            };
            match color {
                BinaryColor::On => self.nodes.activate(node),
                BinaryColor::Off => {
                    if self.nodes.active() == Some(node) {
                        self.nodes.clear();
                    }
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        match color {
            BinaryColor::Off => {
                self.nodes.clear();
                Ok(())
            }
            BinaryColor::On => {
                let area = self.bounding_box();
                self.fill_solid(&area, color)
            }
        }
    }
}
