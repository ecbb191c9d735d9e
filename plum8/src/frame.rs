//! Two-plane framebuffer of a running machine.
//!
//! All pixel mutation happens through [`FrameManager`], behind a single lock, so the
//! interpreter thread and any renderer calling [`FrameManager::next_frame`] never see a
//! half-drawn frame.
use std::sync::{Mutex, MutexGuard, PoisonError};

use bitvec::prelude::*;

pub const LORES_WIDTH: usize = 64;
pub const LORES_HEIGHT: usize = 32;
pub const HIRES_WIDTH: usize = 128;
pub const HIRES_HEIGHT: usize = 64;

/// Horizontal scroll distance of `00FB` / `00FC`
pub const SCROLL_STEP: usize = 4;

const PLANE_1: u8 = 0b01;
const PLANE_2: u8 = 0b10;
const PLANES: [u8; 2] = [PLANE_1, PLANE_2];

/// A snapshot of the screen
///
/// Each plane holds one byte per pixel, row after row, valued 0 or 1. The color of a pixel
/// is `plane1 | plane2 << 1`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    width: usize,
    height: usize,
    plane1: Vec<u8>,
    plane2: Vec<u8>,
}

impl Frame {
    pub fn lores() -> Self {
        Self::blank(LORES_WIDTH, LORES_HEIGHT)
    }

    pub fn hires() -> Self {
        Self::blank(HIRES_WIDTH, HIRES_HEIGHT)
    }

    fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            plane1: vec![0; width * height],
            plane2: vec![0; width * height],
        }
    }

    /// Rebuild a frame out of raw planes
    ///
    /// Returns `None` unless the dimensions are one of the two screen modes, both planes
    /// match them and every pixel is 0 or 1.
    pub fn from_planes(width: usize, height: usize, plane1: Vec<u8>, plane2: Vec<u8>) -> Option<Self> {
        let known = (width, height) == (LORES_WIDTH, LORES_HEIGHT)
            || (width, height) == (HIRES_WIDTH, HIRES_HEIGHT);
        let sized = plane1.len() == width * height && plane2.len() == width * height;
        let binary = plane1.iter().chain(plane2.iter()).all(|&p| p <= 1);
        if known && sized && binary {
            Some(Self {
                width,
                height,
                plane1,
                plane2,
            })
        } else {
            None
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn plane1(&self) -> &[u8] {
        &self.plane1
    }

    pub fn plane2(&self) -> &[u8] {
        &self.plane2
    }

    /// Color (0..=3) of the pixel at `x`, `y`
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        let idx = y * self.width + x;
        self.plane1[idx] | self.plane2[idx] << 1
    }

    /// Iterate rows of pixel colors from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = impl Iterator<Item = u8> + '_> + '_ {
        self.plane1
            .chunks(self.width)
            .zip(self.plane2.chunks(self.width))
            .map(|(p1, p2)| p1.iter().zip(p2).map(|(&a, &b)| a | b << 1))
    }

    pub fn is_blank(&self) -> bool {
        self.plane1.iter().chain(self.plane2.iter()).all(|&p| p == 0)
    }

    fn planes_mut(&mut self, target: u8) -> impl Iterator<Item = &mut Vec<u8>> {
        let Self { plane1, plane2, .. } = self;
        [(PLANE_1, plane1), (PLANE_2, plane2)]
            .into_iter()
            .filter(move |(bit, _)| target & bit != 0)
            .map(|(_, plane)| plane)
    }

    /// Iterate over all pixels as 2-bit grayscale
    #[cfg(feature = "embedded-graphics")]
    pub fn pixels(
        &self,
    ) -> impl Iterator<Item = embedded_graphics::drawable::Pixel<embedded_graphics::pixelcolor::Gray2>> + '_
    {
        use embedded_graphics::{drawable::Pixel, geometry::Point, pixelcolor::Gray2};

        self.rows().enumerate().flat_map(|(y, row)| {
            row.enumerate()
                .map(move |(x, color)| Pixel(Point::new(x as i32, y as i32), Gray2::new(color)))
        })
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Frame {}x{}", self.width, self.height)?;
        for row in self.rows() {
            for color in row {
                let c = match color {
                    0 => '.',
                    1 => '#',
                    2 => '+',
                    _ => '@',
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Complete display state: mode, plane selection and pixels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub hires: bool,
    pub target_plane: u8,
    pub frame: Frame,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            hires: false,
            target_plane: PLANE_1,
            frame: Frame::lores(),
        }
    }
}

/// Bytes of sprite data a `DXYN` with `lines` rows consumes for the given plane selection
pub fn sprite_len(lines: u8, target_plane: u8) -> usize {
    let chunk = if lines == 0 { 32 } else { lines as usize };
    chunk * (target_plane & 0b11).count_ones() as usize
}

/// Owner of the screen of one machine
#[derive(Debug, Default)]
pub struct FrameManager {
    surface: Mutex<DisplayState>,
}

impl FrameManager {
    /// A cleared low resolution screen drawing to plane 1
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: DisplayState) -> Self {
        Self {
            surface: Mutex::new(state),
        }
    }

    pub fn is_hires(&self) -> bool {
        self.surface().hires
    }

    /// Switch resolution, always discarding the current picture
    pub fn set_hires(&self, hires: bool) {
        let mut surface = self.surface();
        surface.hires = hires;
        surface.frame = if hires { Frame::hires() } else { Frame::lores() };
    }

    pub fn target_plane(&self) -> u8 {
        self.surface().target_plane
    }

    /// Select planes affected by subsequent drawing; bit 0 is plane 1, bit 1 is plane 2
    pub fn set_target_plane(&self, planes: u8) {
        self.surface().target_plane = planes & 0b11;
    }

    pub fn clear(&self) {
        let mut surface = self.surface();
        let target = surface.target_plane;
        surface
            .frame
            .planes_mut(target)
            .for_each(|plane| plane.iter_mut().for_each(|p| *p = 0));
    }

    pub fn scroll_right(&self) {
        self.with_target_planes(|plane, width, _| {
            for row in plane.chunks_mut(width) {
                row.copy_within(..width - SCROLL_STEP, SCROLL_STEP);
                row[..SCROLL_STEP].fill(0);
            }
        });
    }

    pub fn scroll_left(&self) {
        self.with_target_planes(|plane, width, _| {
            for row in plane.chunks_mut(width) {
                row.copy_within(SCROLL_STEP.., 0);
                row[width - SCROLL_STEP..].fill(0);
            }
        });
    }

    pub fn scroll_down(&self, lines: u8) {
        self.with_target_planes(|plane, width, height| {
            let shift = (lines as usize).min(height) * width;
            plane.copy_within(..plane.len() - shift, shift);
            plane[..shift].fill(0);
        });
    }

    pub fn scroll_up(&self, lines: u8) {
        self.with_target_planes(|plane, width, height| {
            let shift = (lines as usize).min(height) * width;
            let len = plane.len();
            plane.copy_within(shift.., 0);
            plane[len - shift..].fill(0);
        });
    }

    /// XOR a sprite onto every selected plane, returning whether any lit pixel went dark
    ///
    /// `lines == 0` draws a 16x16 sprite (two bytes per row), otherwise `lines` rows of a
    /// single byte. `data` holds one such chunk per selected plane, plane 1 first. Both
    /// coordinates wrap around the screen.
    pub fn put_sprite(&self, x: usize, y: usize, data: &[u8], lines: u8) -> bool {
        let (rows, row_len) = if lines == 0 { (16, 2) } else { (lines as usize, 1) };
        let chunk = rows * row_len;

        let mut surface = self.surface();
        let target = surface.target_plane;
        let (width, height) = (surface.frame.width, surface.frame.height);

        let mut collision = false;
        for (plane, sprite) in surface.frame.planes_mut(target).zip(data.chunks(chunk)) {
            for (line, bits) in sprite.chunks(row_len).enumerate() {
                let row = ((y + line) & (height - 1)) * width;
                for column in bits.view_bits::<Msb0>().iter_ones() {
                    let pixel = &mut plane[row + ((x + column) & (width - 1))];
                    collision |= *pixel == 1;
                    *pixel ^= 1;
                }
            }
        }
        collision
    }

    /// Copy of the current frame, written into `recycle` when its dimensions match
    pub fn next_frame(&self, recycle: Option<Frame>) -> Frame {
        let surface = self.surface();
        match recycle {
            Some(mut frame)
                if frame.width == surface.frame.width && frame.height == surface.frame.height =>
            {
                frame.plane1.copy_from_slice(&surface.frame.plane1);
                frame.plane2.copy_from_slice(&surface.frame.plane2);
                frame
            }
            _ => surface.frame.clone(),
        }
    }

    /// Consistent copy of mode, plane selection and pixels
    pub fn state(&self) -> DisplayState {
        self.surface().clone()
    }

    pub fn restore(&self, state: DisplayState) {
        *self.surface() = state;
    }

    /// Back to a cleared low resolution screen drawing to plane 1
    pub fn reset(&self) {
        self.restore(DisplayState::default());
    }

    fn with_target_planes<F>(&self, mut op: F)
    where
        F: FnMut(&mut [u8], usize, usize),
    {
        let mut surface = self.surface();
        let target = surface.target_plane;
        let (width, height) = (surface.frame.width, surface.frame.height);
        surface
            .frame
            .planes_mut(target)
            .for_each(|plane| op(plane.as_mut_slice(), width, height));
    }

    fn surface(&self) -> MutexGuard<'_, DisplayState> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for FrameManager {
    fn clone(&self) -> Self {
        Self::from_state(self.state())
    }
}
