// this_file: crates/t2p-svg/src/spans.rs

//! Flatten one `<text>` element into layout leaves.
//!
//! The text/tspan/textPath tree is walked with an explicit stack. Each leaf
//! carries the computed style of its innermost span, the flowing position and
//! the dx/dy values addressed to its characters.

use crate::document::{Document, Element, NodeId, NodeKind, XLINK_NS};
use crate::props::{
    normalize_space, parse_coordinate_list, to_user_units, ComputedText, DEFAULT_FONT_SIZE,
};
use log::{debug, warn};
use std::str::FromStr;
use svgtypes::{Length, LengthUnit, ViewBox};
use t2p_core::Direction;
use t2p_layout::{LeafSpan, TextBlock, TextPathRef};
use t2p_render::{parse_any, PathGeometry};

/// Extent percentages of `x`, `y`, `dx` and `dy` resolve against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 100.0,
        }
    }
}

impl Viewport {
    /// Outermost `viewBox`, else absolute `width`/`height` of the root element.
    pub fn of(doc: &Document) -> Self {
        let mut viewport = Self::default();
        let Some(root) = doc.root_element().and_then(|id| doc.element(id)) else {
            return viewport;
        };
        if let Some(vb) = root.attr("viewBox").and_then(|v| ViewBox::from_str(v).ok()) {
            if vb.w > 0.0 && vb.h > 0.0 {
                viewport.width = vb.w;
                viewport.height = vb.h;
                return viewport;
            }
        }
        let absolute = |name: &str| {
            let length = Length::from_str(root.attr(name)?.trim()).ok()?;
            (length.unit != LengthUnit::Percent)
                .then(|| to_user_units(length, DEFAULT_FONT_SIZE))
                .filter(|v| *v > 0.0)
        };
        if let Some(width) = absolute("width") {
            viewport.width = width;
        }
        if let Some(height) = absolute("height") {
            viewport.height = height;
        }
        viewport
    }
}

/// Where a leaf came from in the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafOrigin {
    /// Innermost tspan/textPath, `None` for text directly under `<text>`.
    pub span: Option<NodeId>,
    /// Elements from the text element down to `span`.
    pub chain: Vec<NodeId>,
}

/// A text element ready for layout.
#[derive(Debug, Clone)]
pub struct SpanTree {
    pub block: TextBlock,
    /// Parallel to `block.leaves`.
    pub origins: Vec<LeafOrigin>,
    /// Properties of the text element itself.
    pub computed: ComputedText,
    /// Whether any tspan or textPath was seen.
    pub has_spans: bool,
}

impl SpanTree {
    pub fn text(&self) -> String {
        self.block.leaves.iter().map(|l| l.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.block.leaves.is_empty()
    }
}

/// Per-character values of one `dx`/`dy` list, consumed in document order.
#[derive(Debug, Clone, Default)]
struct Cursor {
    values: Vec<f64>,
    next: usize,
}

impl Cursor {
    fn declared(value: Option<&str>, font_size: f64, extent: f64) -> Option<Self> {
        let values = parse_coordinate_list(value?, font_size, extent);
        (!values.is_empty()).then_some(Self { values, next: 0 })
    }

    fn advance(&mut self) -> Option<f64> {
        let value = self.values.get(self.next).copied();
        self.next += 1;
        value
    }
}

#[derive(Debug)]
struct Frame {
    node: NodeId,
    computed: ComputedText,
    dx: Option<Cursor>,
    dy: Option<Cursor>,
    on_path: bool,
}

enum Step {
    Enter(NodeId),
    Leave,
}

struct PendingLeaf {
    leaf: LeafSpan,
    origin: LeafOrigin,
    preserve: bool,
}

/// Build the [`SpanTree`] of `text`.
///
/// Properties cascade from the ancestors of `text` down to each span.
/// `base_direction`, when set, overrides the element's `direction`.
pub fn collect_spans(doc: &Document, text: NodeId, base_direction: Option<Direction>) -> SpanTree {
    let mut computed = ComputedText::default();
    for ancestor in doc.ancestors(text).into_iter().rev() {
        if let Some(el) = doc.element(ancestor) {
            computed.apply(el);
        }
    }
    let text_el = doc.element(text);
    if let Some(el) = text_el {
        computed.apply(el);
    }

    let viewport = Viewport::of(doc);
    let first = |el: &Element, name: &str, size: f64, extent: f64| {
        el.attr(name)
            .and_then(|v| parse_coordinate_list(v, size, extent).first().copied())
    };
    let x = text_el
        .and_then(|el| first(el, "x", computed.font_size, viewport.width))
        .unwrap_or(0.0);
    let y = text_el
        .and_then(|el| first(el, "y", computed.font_size, viewport.height))
        .unwrap_or(0.0);

    let direction = base_direction
        .or(computed.direction)
        .unwrap_or_default();
    let mut block = TextBlock::new(x, y)
        .with_anchor(computed.anchor())
        .with_direction(direction);

    let mut frames = vec![Frame {
        node: text,
        dx: Cursor::declared(
            text_el.and_then(|el| el.attr("dx")),
            computed.font_size,
            viewport.width,
        ),
        dy: Cursor::declared(
            text_el.and_then(|el| el.attr("dy")),
            computed.font_size,
            viewport.height,
        ),
        computed: computed.clone(),
        on_path: false,
    }];

    let mut pending: Vec<PendingLeaf> = Vec::new();
    let mut has_spans = false;
    let (mut cur_x, mut cur_y) = (x, y);
    let (mut pending_x, mut pending_y) = (false, false);
    let mut at_start = true;
    let mut after_space = false;

    let mut stack: Vec<Step> = doc.children(text).iter().rev().map(|&c| Step::Enter(c)).collect();
    while let Some(step) = stack.pop() {
        let id = match step {
            Step::Leave => {
                frames.pop();
                continue;
            }
            Step::Enter(id) => id,
        };
        let Some(frame) = frames.last() else {
            break;
        };

        match doc.kind(id) {
            NodeKind::Text(raw) => {
                let preserve = frame.computed.preserve_space;
                let collapsed = normalize_space(raw, preserve);
                let content = if !preserve && (at_start || after_space) {
                    collapsed.trim_start_matches(' ')
                } else {
                    collapsed.as_str()
                };
                if content.is_empty() {
                    continue;
                }

                let mut dx = Vec::new();
                let mut dy = Vec::new();
                for _ in content.chars() {
                    dx.push(next_value(&mut frames, |f| f.dx.as_mut()));
                    dy.push(next_value(&mut frames, |f| f.dy.as_mut()));
                }
                trim_zeros(&mut dx);
                trim_zeros(&mut dy);

                let Some(frame) = frames.last() else {
                    break;
                };
                let mut leaf = LeafSpan::new(content, cur_x, cur_y, frame.computed.text_style())
                    .explicit(pending_x, pending_y);
                leaf.dx = dx;
                leaf.dy = dy;
                leaf.on_path = frame.on_path;
                let span = (frames.len() > 1).then_some(frame.node);
                let origin = LeafOrigin {
                    span,
                    chain: frames.iter().map(|f| f.node).collect(),
                };

                pending_x = false;
                pending_y = false;
                at_start = false;
                after_space = !preserve && content.ends_with(' ');
                pending.push(PendingLeaf {
                    leaf,
                    origin,
                    preserve,
                });
            }
            NodeKind::Element(el) if el.is("tspan") || el.is("textPath") => {
                has_spans = true;
                let computed = frame.computed.child(el);
                let mut on_path = frame.on_path;

                if el.is("tspan") {
                    if let Some(v) = first(el, "x", computed.font_size, viewport.width) {
                        cur_x = v;
                        pending_x = true;
                    }
                    if let Some(v) = first(el, "y", computed.font_size, viewport.height) {
                        cur_y = v;
                        pending_y = true;
                    }
                } else if block.path.is_some() {
                    debug!(target: "t2p::convert", "additional textPath shares the first reference path");
                    on_path = true;
                } else {
                    match resolve_text_path(doc, el) {
                        Some(path) => {
                            block.path = Some(path);
                            on_path = true;
                        }
                        None => {
                            warn!(
                                target: "t2p::convert",
                                "textPath reference {:?} not found; using baseline layout",
                                href(el).unwrap_or("")
                            );
                        }
                    }
                }

                let dx = Cursor::declared(el.attr("dx"), computed.font_size, viewport.width);
                let dy = Cursor::declared(el.attr("dy"), computed.font_size, viewport.height);
                frames.push(Frame {
                    node: id,
                    computed,
                    dx,
                    dy,
                    on_path,
                });
                stack.push(Step::Leave);
                stack.extend(doc.children(id).iter().rev().map(|&c| Step::Enter(c)));
            }
            _ => {}
        }
    }

    let mut origins = Vec::with_capacity(pending.len());
    for item in finish_whitespace(pending) {
        block.leaves.push(item.leaf);
        origins.push(item.origin);
    }

    SpanTree {
        block,
        origins,
        computed,
        has_spans,
    }
}

/// Advance every declaring frame; the innermost declared value wins.
fn next_value(frames: &mut [Frame], list: impl Fn(&mut Frame) -> Option<&mut Cursor>) -> f64 {
    let mut value = None;
    for frame in frames.iter_mut().rev() {
        if let Some(cursor) = list(frame) {
            let v = cursor.advance();
            if value.is_none() {
                value = v;
            }
        }
    }
    value.unwrap_or(0.0)
}

fn trim_zeros(values: &mut Vec<f64>) {
    while values.last() == Some(&0.0) {
        values.pop();
    }
}

/// Trim trailing whitespace of the text and drop leaves left without content.
///
/// A whitespace-only leaf directly before an explicitly positioned leaf only
/// separates source lines and is dropped as well.
fn finish_whitespace(mut leaves: Vec<PendingLeaf>) -> Vec<PendingLeaf> {
    while let Some(last) = leaves.last_mut() {
        if !last.preserve {
            let trimmed = last.leaf.text.trim_end_matches(' ').len();
            last.leaf.text.truncate(trimmed);
        }
        if last.leaf.text.is_empty() {
            leaves.pop();
        } else {
            break;
        }
    }

    let mut out: Vec<PendingLeaf> = Vec::with_capacity(leaves.len());
    let mut iter = leaves.into_iter().peekable();
    while let Some(item) = iter.next() {
        let separator = !item.preserve
            && item.leaf.text.trim().is_empty()
            && !item.leaf.has_explicit_position()
            && iter.peek().is_some_and(|next| next.leaf.has_explicit_position());
        if !separator {
            out.push(item);
        }
    }
    out
}

fn href(el: &Element) -> Option<&str> {
    el.attr("href").or_else(|| el.attr_ns(XLINK_NS, "href"))
}

fn resolve_text_path(doc: &Document, el: &Element) -> Option<TextPathRef> {
    let id = href(el)?.trim().strip_prefix('#')?;
    let target = doc.element(doc.find_by_id(id)?)?;
    if !target.is("path") {
        return None;
    }
    let transform = target.attr("transform").and_then(parse_any);
    let geometry = PathGeometry::from_svg(target.attr("d")?, transform)?;
    if geometry.is_empty() {
        return None;
    }
    let start_offset = geometry.start_offset(el.attr("startOffset").unwrap_or("0"));
    Some(TextPathRef {
        geometry,
        start_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use t2p_core::TextAnchor;

    fn spans(svg: &str) -> (Document, SpanTree) {
        let doc = Document::parse(svg).unwrap();
        let text = doc.elements_named("text")[0];
        let tree = collect_spans(&doc, text, None);
        (doc, tree)
    }

    fn texts(tree: &SpanTree) -> Vec<&str> {
        tree.block.leaves.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn test_plain_text_single_leaf() {
        let (_, tree) = spans(r#"<svg><text x="10 20" y="5" text-anchor="middle">  Hello
            world  </text></svg>"#);
        assert_eq!(texts(&tree), vec!["Hello world"]);
        assert!(!tree.has_spans);
        assert_relative_eq!(tree.block.x, 10.0);
        assert_relative_eq!(tree.block.y, 5.0);
        assert_eq!(tree.block.anchor, TextAnchor::Middle);
        assert_eq!(tree.origins[0].span, None);
    }

    #[test]
    fn test_tspans_flow_and_break_lines() {
        let (doc, tree) = spans(
            r#"<svg><text x="0" y="10">
                <tspan id="a" x="5" y="20">One</tspan>
                <tspan id="b" x="5" y="40">Two <tspan font-weight="bold">bold</tspan></tspan>
            </text></svg>"#,
        );
        assert_eq!(texts(&tree), vec!["One", "Two ", "bold"]);
        let leaves = &tree.block.leaves;
        assert!(leaves[0].explicit_x && leaves[0].explicit_y);
        assert_relative_eq!(leaves[1].y, 40.0);
        assert!(!leaves[2].has_explicit_position());
        assert_relative_eq!(leaves[2].y, 40.0);
        assert_eq!(leaves[2].style.font.weight, 700);
        assert_eq!(tree.origins[1].span, doc.find_by_id("b"));
        assert_eq!(tree.origins[2].chain.len(), 3);
    }

    #[test]
    fn test_adjacent_spaces_collapse_across_leaves() {
        let (_, tree) = spans(r#"<svg><text>A <tspan> B</tspan>  C </text></svg>"#);
        assert_eq!(texts(&tree), vec!["A ", "B", " C"]);
    }

    #[test]
    fn test_preserve_space() {
        let (_, tree) = spans(r#"<svg><text xml:space="preserve"> a	 b </text></svg>"#);
        assert_eq!(texts(&tree), vec![" a  b "]);
    }

    #[test]
    fn test_dx_lists_are_consumed_across_leaves() {
        let (_, tree) = spans(
            r#"<svg><text dx="1 2 3 4"><tspan>ab</tspan><tspan dx="9">cd</tspan></text></svg>"#,
        );
        let leaves = &tree.block.leaves;
        assert_eq!(leaves[0].dx, vec![1.0, 2.0]);
        assert_eq!(leaves[1].dx, vec![9.0, 4.0]);
        assert!(leaves[0].dy.is_empty());
    }

    #[test]
    fn test_style_cascade_from_ancestors() {
        let (_, tree) = spans(
            r#"<svg style="font-family:DejaVu Serif"><g font-size="30" direction="rtl"><text><tspan style="font-size:50%">x</tspan></text></g></svg>"#,
        );
        let style = &tree.block.leaves[0].style;
        assert_eq!(style.font.family, "DejaVu Serif");
        assert_relative_eq!(style.font_size, 15.0);
        assert_relative_eq!(tree.computed.font_size, 30.0);
        assert_eq!(tree.block.direction, Direction::RightToLeft);
    }

    #[test]
    fn test_base_direction_override() {
        let doc = Document::parse(r#"<svg><text direction="rtl">x</text></svg>"#).unwrap();
        let text = doc.elements_named("text")[0];
        let tree = collect_spans(&doc, text, Some(Direction::LeftToRight));
        assert_eq!(tree.block.direction, Direction::LeftToRight);
    }

    #[test]
    fn test_text_path_resolution() {
        let (_, tree) = spans(
            r##"<svg xmlns:xlink="http://www.w3.org/1999/xlink"><path id="p" d="M0 0 L100 0" transform="scale(2)"/><text><textPath xlink:href="#p" startOffset="25%">on</textPath> off</text></svg>"##,
        );
        let path = tree.block.path.as_ref().unwrap();
        assert_relative_eq!(path.geometry.length(), 200.0, epsilon = 1e-6);
        assert_relative_eq!(path.start_offset, 50.0, epsilon = 1e-6);
        assert!(tree.block.leaves[0].on_path);
        assert!(!tree.block.leaves[1].on_path);
    }

    #[test]
    fn test_missing_text_path_falls_back_to_baseline() {
        let (_, tree) = spans(r##"<svg><text><textPath href="#nope">x</textPath></text></svg>"##);
        assert!(tree.block.path.is_none());
        assert!(!tree.block.leaves[0].on_path);
        assert!(tree.has_spans);
    }

    #[test]
    fn test_non_text_children_are_skipped() {
        let (_, tree) = spans(
            r#"<svg><text>a<title>tooltip</title><animate attributeName="x"/>b</text></svg>"#,
        );
        assert_eq!(texts(&tree), vec!["a", "b"]);
    }

    #[test]
    fn test_percent_coordinates_use_viewport() {
        let (_, tree) = spans(
            r#"<svg viewBox="0 0 400 200" width="10cm"><text x="50%" y="25%" dx="10%"><tspan y="50%" dy="1em">a</tspan></text></svg>"#,
        );
        assert_relative_eq!(tree.block.x, 200.0);
        assert_relative_eq!(tree.block.y, 50.0);
        let leaf = &tree.block.leaves[0];
        assert_relative_eq!(leaf.y, 100.0);
        assert_eq!(leaf.dx, vec![40.0]);
        assert_eq!(leaf.dy, vec![16.0]);
    }

    #[test]
    fn test_viewport_from_absolute_size() {
        let doc = Document::parse(r#"<svg width="2in" height="50%"/>"#).unwrap();
        let viewport = Viewport::of(&doc);
        assert_relative_eq!(viewport.width, 192.0);
        assert_relative_eq!(viewport.height, 100.0);
    }

    #[test]
    fn test_empty_text() {
        let (_, tree) = spans(r#"<svg><text> <tspan>  </tspan> </text></svg>"#);
        assert!(tree.is_empty());
        assert_eq!(tree.text(), "");
    }
}
