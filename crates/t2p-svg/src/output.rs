// this_file: crates/t2p-svg/src/output.rs

//! Replacement subtrees for converted text elements.

use crate::css::StyleMap;
use crate::document::{Document, Element, NewNode, NodeId, QName};
use crate::props::parse_length;
use crate::spans::SpanTree;
use std::collections::HashSet;
use t2p_core::utils::format_number;
use t2p_layout::PaintedText;

/// Presentation attributes copied onto generated elements.
pub const FORWARDED_ATTRIBUTES: &[&str] = &[
    "fill",
    "stroke",
    "stroke-width",
    "stroke-linejoin",
    "stroke-linecap",
    "stroke-miterlimit",
    "fill-opacity",
    "stroke-opacity",
    "opacity",
    "stroke-dasharray",
    "stroke-dashoffset",
];

const ANIMATION_ELEMENTS: &[&str] = &["animate", "animateTransform", "animateMotion", "set"];

/// How the element transform is carried over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformMode<'a> {
    /// No transform on the text element.
    None,
    /// Baked into the outlines; forwarded lengths scale by this factor.
    Baked(f64),
    /// Not flattenable; copied verbatim.
    Kept(&'a str),
}

/// A planned replacement and the number of paths it contains.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    pub node: NewNode,
    pub path_count: usize,
}

/// Builds replacement elements with forwarded presentation attributes.
#[derive(Debug, Clone, Copy)]
pub struct OutputBuilder<'a> {
    pub preserve_styles: bool,
    pub precision: usize,
    pub transform: TransformMode<'a>,
}

impl<'a> OutputBuilder<'a> {
    /// Replacement for `text`: one `path` for a lone leaf without spans,
    /// otherwise a `g` holding one path per painted leaf.
    pub fn build(&self, doc: &Document, text: NodeId, tree: &SpanTree, painted: &PaintedText) -> Replacement {
        let Some(text_el) = doc.element(text) else {
            return Replacement {
                node: NewNode::Element {
                    element: Element::new(QName::local("g")),
                    children: Vec::new(),
                },
                path_count: 0,
            };
        };
        let text_id = text_el.id();
        let animations = animation_children(doc, text);

        let single = tree.block.leaves.len() == 1 && !tree.has_spans;
        let data = painted.joined();
        if single && !data.is_empty() {
            let mut path = self.element_like(text_el, "path", text_id);
            self.forward(text_el, &mut path);
            self.apply_transform(&mut path);
            path.set_attr("d", data);
            return Replacement {
                node: NewNode::Element {
                    element: path,
                    children: animations,
                },
                path_count: 1,
            };
        }

        let mut group = self.element_like(text_el, "g", text_id);
        self.forward(text_el, &mut group);
        self.apply_transform(&mut group);

        let mut children = Vec::new();
        let mut used_ids = HashSet::new();
        for (idx, (d, origin)) in painted.leaves.iter().zip(&tree.origins).enumerate() {
            if d.is_empty() {
                continue;
            }
            let span_id = origin
                .span
                .and_then(|span| doc.element(span))
                .and_then(Element::id)
                .filter(|id| !used_ids.contains(*id))
                .map(str::to_string);
            let id = span_id.or_else(|| {
                text_id.map(|t| unused_id(doc, &used_ids, &format!("{t}_tspan{}", idx + 1)))
            });
            if let Some(id) = &id {
                used_ids.insert(id.clone());
            }

            let mut path = self.element_like(text_el, "path", id.as_deref());
            for &node in origin.chain.iter().skip(1) {
                if let Some(span) = doc.element(node) {
                    self.forward(span, &mut path);
                }
            }
            path.set_attr("d", d.as_str());
            children.push(NewNode::Element {
                element: path,
                children: Vec::new(),
            });
        }
        let path_count = children.len();
        children.extend(animations);

        Replacement {
            node: NewNode::Element {
                element: group,
                children,
            },
            path_count,
        }
    }

    fn element_like(&self, text_el: &Element, local: &str, id: Option<&str>) -> Element {
        let mut el = Element::new(text_el.name.sibling(local));
        if let Some(id) = id {
            el.set_attr("id", id);
        }
        el
    }

    fn apply_transform(&self, el: &mut Element) {
        if let TransformMode::Kept(value) = self.transform {
            el.set_attr("transform", value);
        }
    }

    /// Copy presentation attributes, `style` and `class` of `source` onto
    /// `target`, later calls overriding earlier ones.
    pub fn forward(&self, source: &Element, target: &mut Element) {
        for &name in FORWARDED_ATTRIBUTES {
            if let Some(value) = source.attr(name) {
                target.set_attr(name, self.scaled(name, value));
            }
        }

        let Some(style) = source.attr("style") else {
            if self.preserve_styles {
                if let Some(class) = source.attr("class") {
                    target.set_attr("class", class);
                }
            }
            return;
        };
        let mut incoming = StyleMap::parse(style);
        if !self.preserve_styles {
            incoming.retain(is_paint_property);
        }
        let mut merged = StyleMap::parse(target.attr("style").unwrap_or(""));
        for (name, value) in incoming.iter() {
            merged.set(name, self.scaled(name, value));
        }
        if merged.is_empty() {
            target.remove_attr("style");
        } else {
            target.set_attr("style", merged.to_string());
        }
        if self.preserve_styles {
            if let Some(class) = source.attr("class") {
                target.set_attr("class", class);
            }
        }
    }

    fn scaled(&self, name: &str, value: &str) -> String {
        match self.transform {
            TransformMode::Baked(factor) if name == "stroke-width" && factor != 1.0 => {
                match parse_length(value, 16.0) {
                    Some(width) => format_number(width * factor, self.precision),
                    None => value.to_string(),
                }
            }
            _ => value.to_string(),
        }
    }
}

fn is_paint_property(name: &str) -> bool {
    FORWARDED_ATTRIBUTES.contains(&name) || name == "fill-rule"
}

/// `base`, suffixed with `_2`, `_3`, ... until no element of `doc` and no
/// earlier sibling carries it.
fn unused_id(doc: &Document, used: &HashSet<String>, base: &str) -> String {
    let taken = |id: &str| used.contains(id) || doc.find_by_id(id).is_some();
    let mut candidate = base.to_string();
    let mut n = 2;
    while taken(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    candidate
}

fn animation_children(doc: &Document, text: NodeId) -> Vec<NewNode> {
    doc.children(text)
        .iter()
        .filter(|&&child| {
            doc.element(child)
                .is_some_and(|el| ANIMATION_ELEMENTS.iter().any(|name| el.is(name)))
        })
        .map(|&child| NewNode::CopyOf(child))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spans::collect_spans;

    fn painted(leaves: &[&str]) -> PaintedText {
        PaintedText {
            leaves: leaves.iter().map(|s| s.to_string()).collect(),
            glyph_count: leaves.len(),
            decode_errors: Vec::new(),
        }
    }

    fn replace(svg: &str, leaves: &[&str], builder: OutputBuilder<'_>) -> (String, usize) {
        let mut doc = Document::parse(svg).unwrap();
        let text = doc.elements_named("text")[0];
        let tree = collect_spans(&doc, text, None);
        let replacement = builder.build(&doc, text, &tree, &painted(leaves));
        let new = doc.build(&replacement.node);
        doc.replace(text, new).unwrap();
        (doc.to_xml(), replacement.path_count)
    }

    fn builder() -> OutputBuilder<'static> {
        OutputBuilder {
            preserve_styles: false,
            precision: 2,
            transform: TransformMode::None,
        }
    }

    #[test]
    fn test_single_leaf_becomes_path() {
        let (xml, count) = replace(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text id="t" x="1" fill="red" font-size="9" style="font-family:Foo;fill-opacity:0.5">Hi</text></svg>"#,
            &["M 0 0 Z"],
            builder(),
        );
        assert_eq!(count, 1);
        insta::assert_snapshot!(xml, @r###"
        <?xml version="1.0" encoding="UTF-8"?>
        <svg xmlns="http://www.w3.org/2000/svg"><path id="t" fill="red" style="fill-opacity:0.5" d="M 0 0 Z"/></svg>
        "###);
    }

    #[test]
    fn test_spans_become_group_with_ids() {
        let (xml, count) = replace(
            r#"<svg><text id="t" stroke="blue"><tspan id="a" fill="green">A</tspan><tspan>B</tspan></text></svg>"#,
            &["M 1 1 Z", "M 2 2 Z"],
            builder(),
        );
        assert_eq!(count, 2);
        insta::assert_snapshot!(xml, @r###"
        <?xml version="1.0" encoding="UTF-8"?>
        <svg><g id="t" stroke="blue"><path id="a" fill="green" d="M 1 1 Z"/><path id="t_tspan2" d="M 2 2 Z"/></g></svg>
        "###);
    }

    #[test]
    fn test_empty_text_keeps_id_on_group() {
        let (xml, count) = replace(r#"<svg><text id="t">  </text></svg>"#, &[], builder());
        assert_eq!(count, 0);
        assert!(xml.contains(r#"<g id="t"/>"#));
    }

    #[test]
    fn test_prefixed_namespace_is_kept() {
        let (xml, _) = replace(
            r#"<s:svg xmlns:s="http://www.w3.org/2000/svg"><s:text>x</s:text></s:svg>"#,
            &["M 0 0"],
            builder(),
        );
        assert!(xml.contains("<s:path d=\"M 0 0\"/>"));
    }

    #[test]
    fn test_preserve_styles_forwards_everything() {
        let mut b = builder();
        b.preserve_styles = true;
        let (xml, _) = replace(
            r#"<svg><text class="c" style="font-family:Foo;fill:red">x</text></svg>"#,
            &["M 0 0"],
            b,
        );
        assert!(xml.contains(r#"style="font-family:Foo;fill:red""#));
        assert!(xml.contains(r#"class="c""#));
    }

    #[test]
    fn test_baked_transform_scales_stroke_width() {
        let mut b = builder();
        b.transform = TransformMode::Baked(2.0);
        let (xml, _) = replace(
            r#"<svg><text stroke-width="1.5" style="stroke-width:2px" transform="scale(2)">x</text></svg>"#,
            &["M 0 0"],
            b,
        );
        assert!(xml.contains(r#"stroke-width="3.00""#));
        assert!(xml.contains(r#"style="stroke-width:4.00""#));
        assert!(!xml.contains("transform"));
    }

    #[test]
    fn test_kept_transform_is_verbatim() {
        let mut b = builder();
        b.transform = TransformMode::Kept("rotate(45)");
        let (xml, _) = replace(r#"<svg><text transform="rotate(45)">x</text></svg>"#, &["M 0 0"], b);
        assert!(xml.contains(r#"<path transform="rotate(45)" d="M 0 0"/>"#));
    }

    #[test]
    fn test_animation_children_are_copied() {
        let (xml, _) = replace(
            r#"<svg><text id="t">x<animate attributeName="opacity" from="0" to="1"/><set attributeName="fill" to="red"/></text></svg>"#,
            &["M 0 0"],
            builder(),
        );
        assert!(xml.contains(
            r#"<path id="t" d="M 0 0"><animate attributeName="opacity" from="0" to="1"/><set attributeName="fill" to="red"/></path>"#
        ));
    }

    #[test]
    fn test_generated_id_avoids_existing_ids() {
        let (xml, _) = replace(
            r#"<svg><rect id="t_tspan1"/><rect id="t_tspan1_2"/><text id="t"><tspan>A</tspan><tspan>B</tspan></text></svg>"#,
            &["M 1 1", "M 2 2"],
            builder(),
        );
        assert!(xml.contains(r#"<path id="t_tspan1_3" d="M 1 1"/>"#));
        assert!(xml.contains(r#"<path id="t_tspan2" d="M 2 2"/>"#));
    }

    #[test]
    fn test_repeated_span_id_is_not_duplicated() {
        let (xml, count) = replace(
            r#"<svg><text id="t"><tspan id="a">A<tspan>B</tspan>C</tspan></text></svg>"#,
            &["M 1 1", "M 2 2", "M 3 3"],
            builder(),
        );
        assert_eq!(count, 3);
        assert!(xml.contains(r#"<path id="a" d="M 1 1"/>"#));
        assert!(xml.contains(r#"<path id="t_tspan2" d="M 2 2"/>"#));
        assert!(xml.contains(r#"<path id="t_tspan3" d="M 3 3"/>"#));
    }
}
