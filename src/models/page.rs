//! Public layout-box schema: the per-page wire types.

use serde::{Deserialize, Serialize};

/// Page geometry in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: u32,
    pub height: u32,
}

/// One character with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharBox {
    #[serde(rename = "char")]
    pub glyph: String,
    pub bbox: [f64; 4],
}

/// A run of characters sharing a span type (text, inline formula, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "type")]
    pub span_type: String,
    pub bbox: [f64; 4],
    pub content: String,
    pub characters: Vec<CharBox>,
}

/// An ordered list of spans on one visual line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub bbox: [f64; 4],
    pub spans: Vec<Span>,
}

/// Formatted layout unit.
///
/// `box_id` is assigned from a single counter per page shared across layout
/// and discarded boxes, incremented only on successful emission, so ids are
/// contiguous in the emitted sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    pub box_id: usize,
    pub box_type: String,
    pub bbox: [f64; 4],
    pub lines: Vec<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_discarded: Option<bool>,
}

/// One formatted page.
///
/// `discarded_boxes` is present only when discarded blocks were requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    pub page_index: usize,
    pub page_size: PageSize,
    pub layout_boxes: Vec<LayoutBox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discarded_boxes: Option<Vec<LayoutBox>>,
}

impl PageData {
    /// Concatenated text content of the page's layout boxes, one block per
    /// entry, in emission order.
    pub fn block_texts(&self) -> Vec<(String, String)> {
        self.layout_boxes
            .iter()
            .map(|b| {
                let text = b
                    .lines
                    .iter()
                    .flat_map(|l| l.spans.iter())
                    .map(|s| s.content.as_str())
                    .collect::<Vec<_>>()
                    .join("");
                (b.box_type.clone(), text)
            })
            .collect()
    }
}
