//! Conversion of raw per-page model output into the public layout-box schema.

use crate::engine::{RawBlock, RawPage};
use crate::error::JobError;
use crate::models::{CharBox, LayoutBox, Line, PageData, PageSize, Span};

/// Convert one raw block into a layout box.
///
/// Returns `None` when the conversion yields no lines; such blocks are
/// skipped entirely and do not consume a `box_id`.
fn format_block(block: &RawBlock, box_id: usize) -> Option<LayoutBox> {
    let lines: Vec<Line> = block
        .lines
        .iter()
        .filter(|line| !line.spans.is_empty())
        .map(|line| Line {
            bbox: line.bbox,
            spans: line
                .spans
                .iter()
                .map(|span| Span {
                    span_type: span.span_type.clone(),
                    bbox: span.bbox,
                    content: span.content.clone(),
                    characters: span
                        .chars
                        .iter()
                        .map(|c| CharBox {
                            glyph: c.glyph.clone(),
                            bbox: c.bbox,
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    if lines.is_empty() {
        return None;
    }

    Some(LayoutBox {
        box_id,
        box_type: block.block_type.clone(),
        bbox: block.bbox,
        lines,
        is_discarded: None,
    })
}

/// Format one raw page into [`PageData`].
///
/// Boxes are emitted in the raw block order. `box_id` is a single counter
/// shared across content and discarded blocks, starting at 0 and incremented
/// only when a block successfully converts, so emitted ids are contiguous.
/// Discarded blocks are formatted (and flagged) only when
/// `include_discarded` is set; the `discarded_boxes` list is present in the
/// output exactly when the flag is set.
pub fn format_page(
    raw: &RawPage,
    page_index: usize,
    include_discarded: bool,
) -> Result<PageData, JobError> {
    if raw.width == 0 || raw.height == 0 {
        return Err(JobError::PageFormat {
            page_index,
            message: format!("page has degenerate geometry {}x{}", raw.width, raw.height),
        });
    }

    let mut box_id = 0usize;
    let mut layout_boxes = Vec::with_capacity(raw.blocks.len());

    for block in &raw.blocks {
        match format_block(block, box_id) {
            Some(layout_box) => {
                layout_boxes.push(layout_box);
                box_id += 1;
            }
            None => {
                tracing::debug!(
                    page_index,
                    block_type = %block.block_type,
                    "skipping block with no formattable lines"
                );
            }
        }
    }

    let discarded_boxes = if include_discarded {
        let mut discarded = Vec::with_capacity(raw.discarded_blocks.len());
        for block in &raw.discarded_blocks {
            if let Some(mut layout_box) = format_block(block, box_id) {
                layout_box.is_discarded = Some(true);
                discarded.push(layout_box);
                box_id += 1;
            }
        }
        Some(discarded)
    } else {
        None
    };

    Ok(PageData {
        page_index,
        page_size: PageSize {
            width: raw.width,
            height: raw.height,
        },
        layout_boxes,
        discarded_boxes,
    })
}
