use std::ops::Range;

use crate::docx::{WPD_NS, body, body_paragraphs, is_wml};
use crate::error::Error;

/// Mutable view of `word/document.xml` that keeps the byte range of every
/// body paragraph current while new paragraphs are spliced in.
pub(crate) struct BodyEditor {
    xml: String,
    paragraphs: Vec<Range<usize>>,
    /// Insertion point for appended paragraphs: before the body-level
    /// `w:sectPr`, or before `</w:body>` when there is none.
    append_at: usize,
    next_drawing_id: u32,
}

impl BodyEditor {
    pub(crate) fn parse(xml: String) -> Result<BodyEditor, Error> {
        let xml = expand_empty_body(xml)?;
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| Error::DocumentParse(format!("word/document.xml: {e}")))?;
        let body = body(&doc)?;

        let paragraphs: Vec<Range<usize>> = body_paragraphs(body).map(|p| p.range()).collect();

        let append_at = match body.children().filter(|n| n.is_element()).last() {
            Some(last) if is_wml(last, "sectPr") => last.range().start,
            _ => closing_tag_start(&xml, body.range()).ok_or_else(|| {
                Error::DocumentParse("w:body has no closing tag".into())
            })?,
        };

        let max_drawing_id = doc
            .descendants()
            .filter(|n| n.tag_name().name() == "docPr" && n.tag_name().namespace() == Some(WPD_NS))
            .filter_map(|n| n.attribute("id"))
            .filter_map(|id| id.parse::<u32>().ok())
            .max()
            .unwrap_or(0);

        drop(doc);
        Ok(BodyEditor {
            xml,
            paragraphs,
            append_at,
            next_drawing_id: max_drawing_id + 1,
        })
    }

    pub(crate) fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// Unique `wp:docPr` id for the next drawing.
    pub(crate) fn allocate_drawing_id(&mut self) -> u32 {
        let id = self.next_drawing_id;
        self.next_drawing_id += 1;
        id
    }

    /// Keep new drawing ids above `max_id`, used by other parts of the
    /// package that share the id space.
    pub(crate) fn reserve_drawing_ids(&mut self, max_id: u32) {
        self.next_drawing_id = self.next_drawing_id.max(max_id.saturating_add(1));
    }

    /// Splice `markup` (one `w:p` element) in directly after paragraph
    /// `anchor`. Returns the index of the new paragraph, or `None` when
    /// `anchor` is not a current paragraph.
    pub(crate) fn insert_after(&mut self, anchor: usize, markup: &str) -> Option<usize> {
        let at = self.paragraphs.get(anchor)?.end;
        Some(self.splice(at, anchor + 1, markup))
    }

    /// Add `markup` at the end of the body, after everything appended so far.
    pub(crate) fn append(&mut self, markup: &str) -> usize {
        let index = self.paragraphs.len();
        self.splice(self.append_at, index, markup)
    }

    fn splice(&mut self, at: usize, new_index: usize, markup: &str) -> usize {
        let len = markup.len();
        self.xml.insert_str(at, markup);

        for range in self.paragraphs.iter_mut().filter(|r| r.start >= at) {
            range.start += len;
            range.end += len;
        }
        if self.append_at >= at {
            self.append_at += len;
        }
        self.paragraphs.insert(new_index, at..at + len);
        new_index
    }

    pub(crate) fn into_xml(self) -> String {
        self.xml
    }
}

fn closing_tag_start(xml: &str, range: Range<usize>) -> Option<usize> {
    let element = &xml[range.clone()];
    if element.ends_with("/>") {
        return None;
    }
    element.rfind("</").map(|offset| range.start + offset)
}

/// `<w:body/>` has nowhere to append to; rewrite it as an open/close pair.
fn expand_empty_body(xml: String) -> Result<String, Error> {
    let self_closing = {
        let doc = roxmltree::Document::parse(&xml)
            .map_err(|e| Error::DocumentParse(format!("word/document.xml: {e}")))?;
        let range = body(&doc)?.range();
        xml[range.clone()].ends_with("/>").then(|| {
            let qname = xml[range.clone()]
                .trim_start_matches('<')
                .split(|c: char| c.is_whitespace() || c == '/')
                .next()
                .unwrap_or("w:body")
                .to_string();
            (range, qname)
        })
    };
    let Some((range, qname)) = self_closing else {
        return Ok(xml);
    };
    let open = xml[range.start..range.end - 2].trim_end();
    Ok(format!(
        "{}{}></{}>{}",
        &xml[..range.start],
        open,
        qname,
        &xml[range.end..]
    ))
}
