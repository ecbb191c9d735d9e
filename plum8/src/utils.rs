#[cfg(test)]
pub mod testing {
    use core::fmt;
    use core::ops::Range;

    use crate::frame::Frame;

    /// Pixel colors of a screen region, comparable against ASCII art
    ///
    /// In the text form `.` is an unlit pixel, `#` is plane 1 only and the digits `0..=3`
    /// spell a color directly. Rows are whitespace separated.
    #[derive(Clone, PartialEq, Eq, Hash)]
    pub struct FrameMask {
        width: usize,
        rows: Vec<Vec<u8>>,
    }

    impl FrameMask {
        pub fn crop(&self, range_x: Range<usize>, range_y: Range<usize>) -> Self {
            let rows: Vec<Vec<u8>> = self.rows[range_y]
                .iter()
                .map(|row| row[range_x.clone()].to_vec())
                .collect();
            Self {
                width: range_x.len(),
                rows,
            }
        }

        pub fn lit(&self) -> usize {
            self.rows.iter().flatten().filter(|&&c| c != 0).count()
        }
    }

    impl fmt::Debug for FrameMask {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let border = "-".repeat(self.width + 2);
            writeln!(f)?;
            writeln!(f, "{}", border)?;
            for row in &self.rows {
                write!(f, "|")?;
                for &c in row {
                    match c {
                        0 => write!(f, " ")?,
                        1 => write!(f, "#")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                writeln!(f, "|")?;
            }
            write!(f, "{}", border)
        }
    }

    pub trait ToMask {
        fn to_mask(&self) -> FrameMask;
    }

    impl ToMask for str {
        fn to_mask(&self) -> FrameMask {
            let rows: Vec<Vec<u8>> = self
                .split_whitespace()
                .map(|row| {
                    row.chars()
                        .map(|c| match c {
                            '#' => 1,
                            '0'..='3' => c as u8 - b'0',
                            _ => 0,
                        })
                        .collect()
                })
                .collect();
            let width = rows.first().map_or(0, Vec::len);
            FrameMask { width, rows }
        }
    }

    impl ToMask for Frame {
        fn to_mask(&self) -> FrameMask {
            FrameMask {
                width: self.width(),
                rows: self.rows().map(|row| row.collect()).collect(),
            }
        }
    }

    mod tests {
        use super::*;
        use crate::frame::FrameManager;

        #[test]
        fn to_frame_mask() {
            let gfx = FrameManager::new();
            gfx.set_target_plane(3);
            gfx.put_sprite(1, 0, &[0xC0, 0x40], 1);

            let mask = gfx.next_frame(None).to_mask();
            assert_eq!(mask.lit(), 2);
            assert_eq!(mask.crop(0..4, 0..2), ".#3. ....".to_mask().crop(0..4, 0..2));
            assert_eq!("#.\n.2".to_mask(), "10 02".to_mask());
        }
    }
}
