use std::fmt::Write;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{geometry::Point, layout::Layout, pegs::Pegs, verboser::Silent};

/// The ordered walk over the pegs of a layout, starting at peg 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    layout: Layout,
    pegs: Vec<usize>,
}

impl Solution {
    pub fn new(layout: Layout, pegs: Vec<usize>) -> Self {
        Self { layout, pegs }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn pegs(&self) -> &[usize] {
        &self.pegs
    }

    /// Number of strings, one per consecutive pair of pegs.
    pub fn chords(&self) -> usize {
        self.pegs.len().saturating_sub(1)
    }

    /// Comma separated peg indexes, the format of `.pins` files.
    pub fn build_instructions(&self) -> String {
        let mut text = String::new();
        for (i, peg) in self.pegs.iter().enumerate() {
            if i > 0 {
                text.push(',');
            }
            let _ = write!(text, "{peg}");
        }
        text
    }

    pub fn parse_instructions(layout: Layout, text: &str) -> Result<Self, ParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        let pegs = text
            .split(',')
            .enumerate()
            .map(|(position, token)| {
                let token = token.trim();
                let peg = token
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidPeg {
                        position,
                        token: token.to_owned(),
                    })?;
                if peg >= layout.pegs() {
                    return Err(ParseError::PegOutOfRange {
                        position,
                        peg,
                        pegs: layout.pegs(),
                    });
                }
                Ok(peg)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(layout, pegs))
    }

    pub fn build_svg(&self, line_thickness: f32) -> svg::Document {
        let side = self.layout.side();
        let pegs = Pegs::<f64>::circular(&self.layout, &Silent);
        let mut doc = svg::Document::new().set("viewBox", (0, 0, side, side));
        for peg in pegs.positions() {
            doc = doc.add(
                svg::node::element::Circle::new()
                    .set("cx", format!("{:.4}", peg.x))
                    .set("cy", format!("{:.4}", peg.y))
                    .set("r", format!("{:.4}", line_thickness))
                    .set("fill", "black"),
            );
        }
        for (start, end) in self.segments(&pegs) {
            doc = doc.add(
                svg::node::element::Line::new()
                    .set("x1", format!("{:.4}", start.x))
                    .set("y1", format!("{:.4}", start.y))
                    .set("x2", format!("{:.4}", end.x))
                    .set("y2", format!("{:.4}", end.y))
                    .set("stroke", "black")
                    .set("stroke-width", format!("{:.4}", line_thickness))
                    .set("opacity", 1),
            );
        }
        doc
    }

    /// One-pixel black lines on a white canvas of the layout's size.
    pub fn build_image(&self) -> GrayImage {
        let grid = self.layout.grid();
        let pegs = Pegs::<f64>::circular(&self.layout, &Silent);
        let mut buffer = vec![u8::MAX; grid.len()];
        for (start, end) in self.segments(&pegs) {
            for index in grid.get_pixel_indexes_in_segment(start, end) {
                buffer[index] = 0;
            }
        }
        let side = self.layout.side() as u32;
        GrayImage::from_fn(side, side, |x, y| {
            Luma([buffer[y as usize * grid.width + x as usize]])
        })
    }

    /// Program for the winding machine: the thread is lifted, the board turned
    /// to the next peg and the thread lowered again.
    pub fn build_gcode(&self) -> String {
        let mut code = String::from("%\n");
        let _ = writeln!(code, "; Number of pegs: {}", self.layout.pegs());
        let _ = writeln!(code, "; Number of lengths: {}", self.pegs.len());
        code.push_str("G21\nG30\n");
        for peg in &self.pegs {
            let _ = writeln!(code, "G00 Y{:.3} ; move thread out", 5.0);
            let _ = writeln!(code, "G00 X{:.3} ; move board round", (peg + 5) as f64);
            let _ = writeln!(code, "G00 Y{:.3} ; move thread in", 0.0);
        }
        code.push_str("%\n");
        code
    }

    fn segments<'p>(
        &'p self,
        pegs: &'p Pegs<f64>,
    ) -> impl Iterator<Item = (Point<f64>, Point<f64>)> + 'p {
        self.pegs
            .windows(2)
            .filter_map(|pair| pegs.get(pair[0]).zip(pegs.get(pair[1])))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("The instructions hold no pegs")]
    Empty,
    #[error("Entry {position} is not a peg index: '{token}'")]
    InvalidPeg { position: usize, token: String },
    #[error("Entry {position} names peg {peg}, the layout only has {pegs}")]
    PegOutOfRange {
        position: usize,
        peg: usize,
        pegs: usize,
    },
}
