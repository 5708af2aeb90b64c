//! XML access layer for MusicXML documents
//!
//! Thin wrappers around roxmltree: document parsing with byte-offset error
//! reporting, score header metadata, and the part-list / part-content matching
//! that decides which `<part>` elements take part in the conversion.

use crate::converters::musicxml::musicxml_to_humdrum::converter::ConversionContext;
use crate::converters::musicxml::musicxml_to_humdrum::errors::{
    ConversionError, ParseError, StructuralError,
};
use crate::converters::musicxml::musicxml_to_humdrum::types::WarningKind;
use roxmltree::{Document, Node, ParsingOptions, TextPos};
use std::collections::HashMap;

// ============================================================================
// XML DOCUMENT WRAPPER
// ============================================================================

/// Wrapper around roxmltree::Document for MusicXML parsing
pub struct XmlDocument<'a> {
    doc: Document<'a>,
}

impl<'a> XmlDocument<'a> {
    /// Parse XML string into XmlDocument
    pub fn parse(xml: &'a str) -> Result<XmlDocument<'a>, ParseError> {
        // MusicXML files usually carry a DOCTYPE pointing at the public DTD.
        // roxmltree never fetches external DTDs, it only has to accept the declaration.
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };

        let doc = Document::parse_with_options(xml, options).map_err(|e| {
            ParseError::InvalidXml {
                description: e.to_string(),
                offset: byte_offset(xml, e.pos()),
            }
        })?;

        Ok(XmlDocument { doc })
    }

    /// Get the root score-partwise element
    pub fn get_score_partwise(&'a self) -> Result<Node<'a, 'a>, ParseError> {
        let root = self.doc.root_element();

        match root.tag_name().name() {
            "score-partwise" => Ok(root),
            "score-timewise" => Err(ParseError::UnsupportedFormat(
                "score-timewise format (use score-partwise instead)".to_string(),
            )),
            other => Err(ParseError::UnsupportedFormat(format!(
                "Expected score-partwise, found {other}"
            ))),
        }
    }

    /// Extract title from MusicXML document
    pub fn extract_title(&'a self) -> Option<String> {
        let score = self.get_score_partwise().ok()?;

        // Try movement-title first (more common)
        if let Some(title) = get_child_text(score, "movement-title") {
            return Some(title);
        }

        // Fallback to work/work-title
        get_child(score, "work").and_then(|work| get_child_text(work, "work-title"))
    }

    /// Extract composer from MusicXML document
    pub fn extract_composer(&'a self) -> Option<String> {
        let score = self.get_score_partwise().ok()?;
        let identification = get_child(score, "identification")?;

        let creators: Vec<Node> = get_children(identification, "creator").collect();

        // First try creator with type="composer", then any creator at all
        creators
            .iter()
            .filter(|n| n.attribute("type") == Some("composer"))
            .chain(creators.iter())
            .find_map(|n| get_text(*n))
    }

    /// Match `<score-part>` declarations with `<part>` content.
    ///
    /// Returns the parts in declaration order. Duplicate IDs and undeclared
    /// content are recorded as warnings and skipped; a declaration left without
    /// content is a structural error.
    pub fn extract_parts(
        &'a self,
        context: &mut ConversionContext,
    ) -> Result<Vec<PartSource<'a>>, ConversionError> {
        let score = self.get_score_partwise()?;

        let (part_ids, part_info) = get_part_info(score, context)?;
        let part_content = get_part_content(score, &part_ids, context);

        if part_ids.is_empty() {
            return Err(ParseError::MissingRequiredElement(
                "No parts found in score".to_string(),
            )
            .into());
        }

        if part_content.len() != part_ids.len() {
            return Err(StructuralError::PartCountMismatch {
                declared: part_ids.len(),
                found: part_content.len(),
            }
            .into());
        }

        let mut parts = Vec::with_capacity(part_ids.len());
        for id in part_ids {
            if let (Some(&declaration), Some(&content)) = (part_info.get(&id), part_content.get(&id)) {
                parts.push(PartSource {
                    name: get_child_text(declaration, "part-name"),
                    id,
                    declaration,
                    content,
                });
            }
        }

        Ok(parts)
    }
}

/// A declared part paired with its content element
#[derive(Debug, Clone)]
pub struct PartSource<'a> {
    pub id: String,
    pub name: Option<String>,
    pub declaration: Node<'a, 'a>,
    pub content: Node<'a, 'a>,
}

/// Collect the ordered list of declared part IDs and map each to its `<score-part>`.
fn get_part_info<'a>(
    score: Node<'a, 'a>,
    context: &mut ConversionContext,
) -> Result<(Vec<String>, HashMap<String, Node<'a, 'a>>), ParseError> {
    let part_list = get_child(score, "part-list")
        .ok_or_else(|| ParseError::MissingRequiredElement("part-list".to_string()))?;

    let mut part_ids = Vec::new();
    let mut part_info = HashMap::new();

    for score_part in get_children(part_list, "score-part") {
        let id = score_part.attribute("id").unwrap_or("").to_string();
        if part_info.contains_key(&id) {
            context.add_warning(
                WarningKind::DuplicatePartId,
                format!("ID {id} is duplicated in part-list and secondary part will be ignored"),
            );
            continue;
        }
        part_info.insert(id.clone(), score_part);
        part_ids.push(id);
    }

    Ok((part_ids, part_info))
}

/// Map declared part IDs to their `<part>` content elements.
fn get_part_content<'a>(
    score: Node<'a, 'a>,
    part_ids: &[String],
    context: &mut ConversionContext,
) -> HashMap<String, Node<'a, 'a>> {
    let mut part_content = HashMap::new();

    for (index, part) in get_children(score, "part").enumerate() {
        let id = part.attribute("id").unwrap_or("");
        if id.is_empty() {
            context.add_warning(WarningKind::MissingPartId, format!("Part {index} has no ID"));
        }
        if !part_ids.iter().any(|declared| declared == id) {
            context.add_warning(
                WarningKind::UndeclaredPart,
                format!("Part ID {id} is not present in part-list element list"),
            );
            continue;
        }
        if part_content.contains_key(id) {
            context.add_warning(
                WarningKind::DuplicatePartId,
                format!("ID {id} is duplicated and secondary part will be ignored"),
            );
            continue;
        }
        part_content.insert(id.to_string(), part);
    }

    part_content
}

/// Convert a roxmltree row/column position to a byte offset into `text`.
fn byte_offset(text: &str, pos: TextPos) -> usize {
    let row = pos.row.max(1) as usize;
    let col = pos.col.max(1) as usize;

    let mut offset = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if index + 1 == row {
            let within = line
                .char_indices()
                .nth(col - 1)
                .map_or(line.len(), |(i, _)| i);
            return offset + within;
        }
        offset += line.len();
    }
    text.len()
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Get first child element with given tag name
pub fn get_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

/// Iterate over all child elements with given tag name
pub fn get_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == tag)
}

/// Get trimmed, non-empty text content of a node
pub fn get_text(node: Node) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Get text content of first child with given tag
pub fn get_child_text(node: Node, tag: &str) -> Option<String> {
    get_child(node, tag).and_then(get_text)
}

/// Check whether a node is an element with the given tag name
pub fn is_element_named(node: Node, tag: &str) -> bool {
    node.is_element() && node.tag_name().name() == tag
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PARTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN" "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1">
  <work><work-title>Little Suite</work-title></work>
  <identification>
    <creator type="lyricist">Someone Else</creator>
    <creator type="composer">J. Composer</creator>
  </identification>
  <part-list>
    <score-part id="P1"><part-name>Flute</part-name></score-part>
    <score-part id="P2"><part-name>Cello</part-name></score-part>
  </part-list>
  <part id="P1"><measure number="1"/></part>
  <part id="P2"><measure number="1"/></part>
</score-partwise>"#;

    #[test]
    fn test_parse_with_doctype() {
        let doc = XmlDocument::parse(TWO_PARTS).unwrap();
        let score = doc.get_score_partwise().unwrap();
        assert_eq!(score.tag_name().name(), "score-partwise");
    }

    #[test]
    fn test_extract_title_and_composer() {
        let doc = XmlDocument::parse(TWO_PARTS).unwrap();
        assert_eq!(doc.extract_title().as_deref(), Some("Little Suite"));
        assert_eq!(doc.extract_composer().as_deref(), Some("J. Composer"));
    }

    #[test]
    fn test_extract_parts_in_declaration_order() {
        let doc = XmlDocument::parse(TWO_PARTS).unwrap();
        let mut context = ConversionContext::new();
        let parts = doc.extract_parts(&mut context).unwrap();

        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].id, "P1");
        assert_eq!(parts[0].name.as_deref(), Some("Flute"));
        assert_eq!(parts[1].id, "P2");
        assert_eq!(parts[1].name.as_deref(), Some("Cello"));
        assert!(context.warnings.is_empty());
    }

    #[test]
    fn test_invalid_xml_reports_offset() {
        let xml = "<score-partwise>\n  <part-list>\n</score-partwise>";
        let err = XmlDocument::parse(xml).err().unwrap();

        match err {
            ParseError::InvalidXml { description, offset } => {
                assert!(!description.is_empty());
                assert!(offset > 0);
                assert!(offset <= xml.len());
            }
            other => panic!("Expected InvalidXml, got {other:?}"),
        }
    }

    #[test]
    fn test_timewise_is_unsupported() {
        let xml = r#"<score-timewise><part-list/></score-timewise>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        assert!(matches!(
            doc.get_score_partwise(),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_duplicate_score_part_keeps_first() {
        let xml = r#"<score-partwise>
  <part-list>
    <score-part id="P1"><part-name>First</part-name></score-part>
    <score-part id="P1"><part-name>Second</part-name></score-part>
  </part-list>
  <part id="P1"><measure number="1"/></part>
</score-partwise>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let mut context = ConversionContext::new();
        let parts = doc.extract_parts(&mut context).unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].name.as_deref(), Some("First"));
        assert_eq!(context.warnings.len(), 1);
        assert_eq!(context.warnings[0].kind, WarningKind::DuplicatePartId);
    }

    #[test]
    fn test_undeclared_part_content_is_skipped() {
        let xml = r#"<score-partwise>
  <part-list>
    <score-part id="P1"/>
  </part-list>
  <part id="P1"><measure number="1"/></part>
  <part id="P9"><measure number="1"/></part>
</score-partwise>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let mut context = ConversionContext::new();
        let parts = doc.extract_parts(&mut context).unwrap();

        assert_eq!(parts.len(), 1);
        assert_eq!(context.warnings.len(), 1);
        assert_eq!(context.warnings[0].kind, WarningKind::UndeclaredPart);
    }

    #[test]
    fn test_declared_part_without_content_is_structural() {
        let xml = r#"<score-partwise>
  <part-list>
    <score-part id="P1"/>
    <score-part id="P2"/>
  </part-list>
  <part id="P1"><measure number="1"/></part>
</score-partwise>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let mut context = ConversionContext::new();
        let err = doc.extract_parts(&mut context).unwrap_err();

        assert!(matches!(
            err,
            ConversionError::Structural(StructuralError::PartCountMismatch {
                declared: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_missing_part_list() {
        let xml = r#"<score-partwise><part id="P1"/></score-partwise>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let mut context = ConversionContext::new();
        let err = doc.extract_parts(&mut context).unwrap_err();

        assert!(matches!(
            err,
            ConversionError::Parse(ParseError::MissingRequiredElement(_))
        ));
    }

    #[test]
    fn test_byte_offset_counts_multibyte_characters() {
        let text = "ab\nçd\nxyz";
        assert_eq!(byte_offset(text, TextPos { row: 1, col: 1 }), 0);
        assert_eq!(byte_offset(text, TextPos { row: 2, col: 2 }), 5);
        assert_eq!(byte_offset(text, TextPos { row: 3, col: 3 }), 9);
    }
}
