//! Glyph to text-box grouping.
//!
//! Glyphs are chained into lines when they sit side by side on the same
//! baseline, and lines are merged into boxes when they are stacked closely
//! with a matching height and a shared left edge, right edge or centre. The
//! resulting boxes are the [`TextFragment`]s the layout engine works with;
//! each line of a box ends in `\n`.

use crime_log_layout::TextFragment;
use serde::{Deserialize, Serialize};

use crate::decode::Glyph;

/// Tuning knobs for glyph grouping, all relative to glyph or line size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderParams {
    /// Maximum gap between two glyphs of one line, as a multiple of the
    /// wider glyph's width.
    pub char_margin: f64,
    /// Maximum gap between two lines of one box, as a multiple of the line
    /// height.
    pub line_margin: f64,
    /// Gap, as a multiple of glyph size, above which a space is inserted.
    pub word_margin: f64,
    /// Minimum vertical overlap of two glyphs on one line, as a fraction of
    /// the shorter glyph's height.
    pub line_overlap: f64,
}

impl Default for DecoderParams {
    fn default() -> Self {
        Self {
            char_margin: 2.0,
            line_margin: 0.5,
            word_margin: 0.1,
            line_overlap: 0.5,
        }
    }
}

/// A single line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl TextLine {
    fn start(glyph: &Glyph) -> Self {
        Self {
            text: glyph.text.clone(),
            x0: glyph.x0,
            x1: glyph.x1,
            y0: glyph.y0,
            y1: glyph.y1,
        }
    }

    fn push(&mut self, glyph: &Glyph, word_margin: f64) {
        let margin = word_margin * glyph.width().max(glyph.height());
        if self.x1 < glyph.x0 - margin {
            self.text.push(' ');
        }
        self.text.push_str(&glyph.text);
        self.x0 = self.x0.min(glyph.x0);
        self.x1 = self.x1.max(glyph.x1);
        self.y0 = self.y0.min(glyph.y0);
        self.y1 = self.y1.max(glyph.y1);
    }

    fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    fn center(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }
}

fn vertical_overlap(a: &Glyph, b: &Glyph) -> f64 {
    (a.y1.min(b.y1) - a.y0.max(b.y0)).max(0.0)
}

fn horizontal_distance(a: &Glyph, b: &Glyph) -> f64 {
    (b.x0 - a.x1).max(a.x0 - b.x1).max(0.0)
}

/// Whether `next` continues the line that `prev` is on.
fn continues_line(prev: &Glyph, next: &Glyph, params: &DecoderParams) -> bool {
    let overlap = vertical_overlap(prev, next);
    overlap > 0.0
        && prev.height().min(next.height()) * params.line_overlap < overlap
        && horizontal_distance(prev, next) < prev.width().max(next.width()) * params.char_margin
}

/// Chains glyphs, in content-stream order, into horizontal lines.
#[must_use]
pub fn group_lines(glyphs: &[Glyph], params: &DecoderParams) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let mut prev: Option<&Glyph> = None;

    for glyph in glyphs {
        match (prev, lines.last_mut()) {
            (Some(prev), Some(line)) if continues_line(prev, glyph, params) => {
                line.push(glyph, params.word_margin);
            }
            _ => lines.push(TextLine::start(glyph)),
        }
        prev = Some(glyph);
    }

    lines
}

/// Whether two lines belong in the same box.
fn stacked(a: &TextLine, b: &TextLine, line_margin: f64) -> bool {
    let d = line_margin * a.height();
    let reaches = b.x0 <= a.x1 && a.x0 <= b.x1 && b.y0 <= a.y1 + d && a.y0 - d <= b.y1;
    let same_height = (a.height() - b.height()).abs() <= d;
    let aligned = (a.x0 - b.x0).abs() <= d
        || (a.x1 - b.x1).abs() <= d
        || (a.center() - b.center()).abs() <= d;
    reaches && same_height && aligned
}

fn find(parents: &mut [usize], mut i: usize) -> usize {
    while parents[i] != i {
        parents[i] = parents[parents[i]];
        i = parents[i];
    }
    i
}

/// Merges lines into boxes and renders each box as a [`TextFragment`].
///
/// Lines inside a box are ordered top to bottom, then left to right. Boxes
/// are returned in order of their first line.
#[must_use]
pub fn group_boxes(lines: &[TextLine], params: &DecoderParams) -> Vec<TextFragment> {
    let mut parents: Vec<usize> = (0..lines.len()).collect();

    for (i, a) in lines.iter().enumerate() {
        for (j, b) in lines.iter().enumerate().skip(i + 1) {
            if stacked(a, b, params.line_margin) || stacked(b, a, params.line_margin) {
                let (ri, rj) = (find(&mut parents, i), find(&mut parents, j));
                if ri != rj {
                    parents[rj.max(ri)] = ri.min(rj);
                }
            }
        }
    }

    let mut boxes: Vec<(usize, Vec<&TextLine>)> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let root = find(&mut parents, i);
        match boxes.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(line),
            None => boxes.push((root, vec![line])),
        }
    }

    boxes
        .into_iter()
        .map(|(_, mut members)| {
            members.sort_by(|a, b| b.y1.total_cmp(&a.y1).then(a.x0.total_cmp(&b.x0)));
            let text: String = members
                .iter()
                .map(|line| format!("{}\n", line.text))
                .collect();
            let x0 = members.iter().map(|l| l.x0).fold(f64::INFINITY, f64::min);
            let x1 = members.iter().map(|l| l.x1).fold(f64::NEG_INFINITY, f64::max);
            let y0 = members.iter().map(|l| l.y0).fold(f64::INFINITY, f64::min);
            let y1 = members.iter().map(|l| l.y1).fold(f64::NEG_INFINITY, f64::max);
            TextFragment::new(text, x0, x1, y0, y1)
        })
        .collect()
}

/// Runs line and box grouping over one page's glyphs.
#[must_use]
pub fn text_boxes(glyphs: &[Glyph], params: &DecoderParams) -> Vec<TextFragment> {
    let lines = group_lines(glyphs, params);
    log::trace!("{} glyphs grouped into {} lines", glyphs.len(), lines.len());
    group_boxes(&lines, params)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 6pt wide, 10pt tall glyph with its lower-left corner at (x, y).
    fn glyph(c: &str, x: f64, y: f64) -> Glyph {
        Glyph {
            text: c.to_owned(),
            x0: x,
            x1: x + 6.0,
            y0: y,
            y1: y + 10.0,
        }
    }

    fn word(text: &str, x: f64, y: f64) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, c)| glyph(&c.to_string(), 6.0f64.mul_add(i as f64, x), y))
            .collect()
    }

    #[test]
    fn adjacent_glyphs_form_one_line() {
        let lines = group_lines(&word("THEFT", 90.0, 500.0), &DecoderParams::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "THEFT");
        assert!((lines[0].x1 - 120.0).abs() < 1e-9);
    }

    #[test]
    fn word_gap_inserts_a_space() {
        let mut glyphs = word("OF", 90.0, 500.0);
        glyphs.extend(word("BIKE", 106.0, 500.0));
        let lines = group_lines(&glyphs, &DecoderParams::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "OF BIKE");
    }

    #[test]
    fn distant_glyphs_start_a_new_line() {
        let mut glyphs = word("A", 90.0, 500.0);
        glyphs.extend(word("B", 300.0, 500.0));
        glyphs.extend(word("C", 90.0, 400.0));
        let lines = group_lines(&glyphs, &DecoderParams::default());
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn stacked_lines_merge_into_one_box() {
        let mut glyphs = word("LARCENY", 90.0, 512.0);
        glyphs.extend(word("FROM", 90.0, 500.0));
        let boxes = text_boxes(&glyphs, &DecoderParams::default());

        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].text, "LARCENY\nFROM\n");
        assert!((boxes[0].y0 - 500.0).abs() < 1e-9);
        assert!((boxes[0].y1 - 522.0).abs() < 1e-9);
    }

    #[test]
    fn far_apart_lines_stay_separate() {
        let mut glyphs = word("FIRST", 90.0, 512.0);
        glyphs.extend(word("SECOND", 90.0, 450.0));
        let boxes = text_boxes(&glyphs, &DecoderParams::default());

        let texts: Vec<&str> = boxes.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["FIRST\n", "SECOND\n"]);
    }

    #[test]
    fn side_by_side_columns_stay_separate() {
        let mut glyphs = word("3/14/2014", 14.0, 500.0);
        glyphs.extend(word("THEFT", 140.0, 500.0));
        let boxes = text_boxes(&glyphs, &DecoderParams::default());
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn empty_page_has_no_boxes() {
        assert!(text_boxes(&[], &DecoderParams::default()).is_empty());
    }
}
