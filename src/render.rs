//! Text rendering of frames for terminals and logs.
use plum8::embedded_graphics::pixelcolor::GrayColor;
use plum8::Frame;

const SHADES: [char; 4] = ['.', '#', '+', '@'];

/// One line per row, one character per pixel, each line newline terminated
pub fn ascii(frame: &Frame) -> String {
    let width = frame.width();
    let mut cells = vec![SHADES[0]; width * frame.height()];
    for px in frame.pixels() {
        let (x, y) = (px.0.x as usize, px.0.y as usize);
        cells[y * width + x] = SHADES[px.1.luma() as usize & 3];
    }

    let mut out = String::with_capacity(cells.len() + frame.height());
    for row in cells.chunks(width) {
        out.extend(row);
        out.push('\n');
    }
    out
}
