//! Positioned glyph and rule collection on top of [`pdf_extract`].
//!
//! [`PageCollector`] is a [`pdf_extract::OutputDev`] that records, per
//! page, every glyph with its bounding box and the y-coordinate of every
//! thin horizontal rule (a stroked or filled line segment or rectangle).

use std::panic::{AssertUnwindSafe, catch_unwind};

use pdf_extract::{ColorSpace, MediaBox, OutputDev, OutputError, Path, PathOp, Transform};

use crate::PdfError;

/// A primitive thinner than this is a rule candidate.
const RULE_MAX_THICKNESS: f64 = 2.0;

/// A rule must be at least this wide; shorter strokes are glyph parts,
/// underlines of single characters and similar noise.
const RULE_MIN_WIDTH: f64 = 10.0;

/// One rendered character.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl Glyph {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

/// Everything collected from one page, before any layout analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    /// 1-based page number.
    pub number: u32,
    /// Glyphs in content-stream order.
    pub glyphs: Vec<Glyph>,
    /// Horizontal rule y-coordinates, unsorted.
    pub hlines: Vec<f64>,
}

/// An axis-aligned extent in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Extent {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

impl Extent {
    fn spanning(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            x0: a.0.min(b.0),
            y0: a.1.min(b.1),
            x1: a.0.max(b.0),
            y1: a.1.max(b.1),
        }
    }

    fn is_horizontal_rule(&self) -> bool {
        (self.y1 - self.y0).abs() < RULE_MAX_THICKNESS && (self.x1 - self.x0).abs() > RULE_MIN_WIDTH
    }
}

/// [`OutputDev`] that accumulates [`RawPage`]s.
#[derive(Debug, Default)]
pub struct PageCollector {
    pages: Vec<RawPage>,
    current: Option<RawPage>,
}

impl PageCollector {
    /// Consumes the collector, returning the finished pages in order.
    #[must_use]
    pub fn into_pages(mut self) -> Vec<RawPage> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.pages
    }

    fn collect_rules(&mut self, ctm: &Transform, path: &Path) {
        let Some(page) = self.current.as_mut() else {
            return;
        };
        page.hlines.extend(
            path_extents(ctm, path)
                .into_iter()
                .filter(Extent::is_horizontal_rule)
                .map(|extent| extent.y0),
        );
    }
}

impl OutputDev for PageCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        if let Some(page) = self.current.take() {
            self.pages.push(page);
        }
        self.current = Some(RawPage {
            number: page_num,
            ..RawPage::default()
        });
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        if let Some(page) = self.current.take() {
            log::trace!(
                "page {}: {} glyphs, {} rules",
                page.number,
                page.glyphs.len(),
                page.hlines.len()
            );
            self.pages.push(page);
        }
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        char: &str,
    ) -> Result<(), OutputError> {
        let Some(page) = self.current.as_mut() else {
            return Ok(());
        };
        if char.trim().is_empty() {
            return Ok(());
        }

        let size = scaled_font_size(trm, font_size);
        let (x0, y0) = (trm.m31, trm.m32);
        page.glyphs.push(Glyph {
            text: char.to_owned(),
            x0,
            x1: width.mul_add(size, x0),
            y0,
            y1: y0 + size,
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn stroke(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &Path,
    ) -> Result<(), OutputError> {
        self.collect_rules(ctm, path);
        Ok(())
    }

    fn fill(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &Path,
    ) -> Result<(), OutputError> {
        self.collect_rules(ctm, path);
        Ok(())
    }
}

/// Font size after the text rendering matrix is applied (side of the square
/// with the same area as the scaled em box).
fn scaled_font_size(trm: &Transform, font_size: f64) -> f64 {
    let sx = font_size * (trm.m11 + trm.m21);
    let sy = font_size * (trm.m12 + trm.m22);
    (sx * sy).abs().sqrt()
}

fn apply(ctm: &Transform, x: f64, y: f64) -> (f64, f64) {
    (
        x.mul_add(ctm.m11, y.mul_add(ctm.m21, ctm.m31)),
        x.mul_add(ctm.m12, y.mul_add(ctm.m22, ctm.m32)),
    )
}

/// Extents of the straight segments and rectangles in a path.
///
/// `re` operators and two-point subpaths yield one extent each, as do
/// closed four-corner subpaths whose edges are all axis-aligned. Curves and
/// other polylines are not rules and are ignored.
fn path_extents(ctm: &Transform, path: &Path) -> Vec<Extent> {
    let mut extents = Vec::new();
    let mut subpath: Vec<(f64, f64)> = Vec::new();
    let mut curved = false;

    let mut flush = |subpath: &mut Vec<(f64, f64)>, curved: &mut bool| {
        if !*curved
            && let Some(extent) = polyline_extent(subpath)
        {
            extents.push(extent);
        }
        subpath.clear();
        *curved = false;
    };

    for op in &path.ops {
        match *op {
            PathOp::MoveTo(x, y) => {
                flush(&mut subpath, &mut curved);
                subpath.push(apply(ctm, x, y));
            }
            PathOp::LineTo(x, y) => subpath.push(apply(ctm, x, y)),
            PathOp::CurveTo(_, _, _, _, x, y) => {
                curved = true;
                subpath.push(apply(ctm, x, y));
            }
            PathOp::Rect(x, y, w, h) => {
                flush(&mut subpath, &mut curved);
                let corners = [
                    apply(ctm, x, y),
                    apply(ctm, x + w, y),
                    apply(ctm, x + w, y + h),
                    apply(ctm, x, y + h),
                ];
                subpath.extend(corners);
                flush(&mut subpath, &mut curved);
            }
            PathOp::Close => {
                if let Some(&first) = subpath.first() {
                    subpath.push(first);
                }
            }
        }
    }
    flush(&mut subpath, &mut curved);

    extents
}

fn polyline_extent(points: &[(f64, f64)]) -> Option<Extent> {
    let mut points = points.to_vec();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    match points.as_slice() {
        [a, b] => Some(Extent::spanning(*a, *b)),
        [a, b, c, d] if is_axis_aligned_loop(&[*a, *b, *c, *d]) => {
            let (xs, ys): (Vec<f64>, Vec<f64>) = points.iter().copied().unzip();
            Some(Extent {
                x0: xs.iter().copied().fold(f64::INFINITY, f64::min),
                y0: ys.iter().copied().fold(f64::INFINITY, f64::min),
                x1: xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                y1: ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            })
        }
        _ => None,
    }
}

fn is_axis_aligned_loop(corners: &[(f64, f64); 4]) -> bool {
    (0..4).all(|i| {
        let (a, b) = (corners[i], corners[(i + 1) % 4]);
        a.0 == b.0 || a.1 == b.1
    })
}

/// Decodes a PDF held in memory into raw pages.
///
/// `pdf_extract` panics on some malformed documents; those panics are
/// caught and reported as [`PdfError::Decode`] like any other decode
/// failure.
///
/// # Errors
///
/// Returns [`PdfError::Decode`] if the bytes are not a readable PDF.
pub fn collect_pages(bytes: &[u8]) -> Result<Vec<RawPage>, PdfError> {
    catch_unwind(AssertUnwindSafe(|| {
        let mut doc = pdf_extract::Document::load_mem(bytes)
            .map_err(|e| PdfError::Decode(format!("failed to parse PDF: {e}")))?;

        if doc.is_encrypted() {
            doc.decrypt("")
                .map_err(|e| PdfError::Decode(format!("failed to decrypt PDF: {e}")))?;
        }

        let mut collector = PageCollector::default();
        pdf_extract::output_doc(&doc, &mut collector)
            .map_err(|e| PdfError::Decode(format!("failed to read PDF content: {e}")))?;

        Ok(collector.into_pages())
    }))
    .unwrap_or_else(|_| Err(PdfError::Decode("PDF decoder panicked (malformed document)".to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media_box() -> MediaBox {
        MediaBox {
            llx: 0.0,
            lly: 0.0,
            urx: 792.0,
            ury: 612.0,
        }
    }

    fn rules(ctm: &Transform, ops: Vec<PathOp>) -> Vec<f64> {
        path_extents(ctm, &Path { ops })
            .into_iter()
            .filter(Extent::is_horizontal_rule)
            .map(|e| e.y0)
            .collect()
    }

    #[test]
    fn thin_wide_rectangle_is_a_rule() {
        let ys = rules(&Transform::identity(), vec![PathOp::Rect(12.0, 300.0, 700.0, 0.5)]);
        assert_eq!(ys, vec![300.0]);
    }

    #[test]
    fn tall_rectangle_is_not_a_rule() {
        let ys = rules(&Transform::identity(), vec![PathOp::Rect(12.0, 300.0, 700.0, 20.0)]);
        assert!(ys.is_empty());
    }

    #[test]
    fn short_segment_is_not_a_rule() {
        let ys = rules(
            &Transform::identity(),
            vec![PathOp::MoveTo(100.0, 50.0), PathOp::LineTo(105.0, 50.0)],
        );
        assert!(ys.is_empty());
    }

    #[test]
    fn each_subpath_is_measured_separately() {
        let ys = rules(
            &Transform::identity(),
            vec![
                PathOp::MoveTo(12.0, 400.0),
                PathOp::LineTo(779.0, 400.0),
                PathOp::MoveTo(12.0, 380.0),
                PathOp::LineTo(779.0, 380.5),
            ],
        );
        assert_eq!(ys, vec![400.0, 380.0]);
    }

    #[test]
    fn ctm_moves_rules_into_page_space() {
        let ctm = Transform::row_major(1.0, 0.0, 0.0, 1.0, 0.0, 100.0);
        let ys = rules(&ctm, vec![PathOp::MoveTo(0.0, 10.0), PathOp::LineTo(50.0, 10.0)]);
        assert_eq!(ys, vec![110.0]);
    }

    #[test]
    fn curved_subpaths_are_ignored() {
        let ys = rules(
            &Transform::identity(),
            vec![
                PathOp::MoveTo(0.0, 10.0),
                PathOp::CurveTo(10.0, 10.0, 20.0, 10.0, 50.0, 10.0),
            ],
        );
        assert!(ys.is_empty());
    }

    #[test]
    fn collector_records_glyphs_and_rules_per_page() {
        let mut collector = PageCollector::default();

        collector.begin_page(1, &media_box(), None).unwrap();
        let trm = Transform::row_major(1.0, 0.0, 0.0, 1.0, 100.0, 500.0);
        collector.output_character(&trm, 0.5, 0.0, 10.0, "A").unwrap();
        collector.output_character(&trm, 0.25, 0.0, 10.0, " ").unwrap();
        collector
            .stroke(
                &Transform::identity(),
                &ColorSpace::DeviceGray,
                &[0.0],
                &Path {
                    ops: vec![PathOp::MoveTo(12.0, 480.0), PathOp::LineTo(779.0, 480.0)],
                },
            )
            .unwrap();
        collector.end_page().unwrap();

        collector.begin_page(2, &media_box(), None).unwrap();
        collector.end_page().unwrap();

        let pages = collector.into_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[0].glyphs.len(), 1);
        let glyph = &pages[0].glyphs[0];
        assert_eq!(glyph.text, "A");
        assert!((glyph.x0 - 100.0).abs() < 1e-9);
        assert!((glyph.x1 - 105.0).abs() < 1e-9);
        assert!((glyph.y1 - 510.0).abs() < 1e-9);
        assert_eq!(pages[0].hlines, vec![480.0]);
        assert!(pages[1].glyphs.is_empty());
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let result = collect_pages(b"<html><body>Page not found</body></html>");
        assert!(matches!(result, Err(PdfError::Decode(_))));
    }
}
