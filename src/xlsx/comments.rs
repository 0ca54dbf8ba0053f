//! Legacy cell comments (`xl/commentsN.xml`).

use crate::error::Result;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufRead;

/// Comment text keyed by cell reference.
#[derive(Debug, Clone, Default)]
pub struct CommentsTable {
    by_ref: HashMap<String, String>,
}

impl CommentsTable {
    /// Parse a comments part.
    pub fn from_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut reader = quick_xml::Reader::from_reader(source);
        let mut by_ref = HashMap::new();

        let mut buf = Vec::new();
        let mut current_ref: Option<String> = None;
        let mut in_t = false;
        let mut text = String::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"comment" => {
                        text.clear();
                        current_ref = None;
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"ref" {
                                current_ref = Some(attr.unescape_value()?.into_owned());
                            }
                        }
                    }
                    b"t" if current_ref.is_some() => in_t = true,
                    _ => {}
                },
                Event::Text(e) if in_t => text.push_str(&e.unescape()?),
                Event::End(e) => match e.local_name().as_ref() {
                    b"t" => in_t = false,
                    b"comment" => {
                        if let Some(cell) = current_ref.take() {
                            by_ref.insert(cell, std::mem::take(&mut text));
                        }
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { by_ref })
    }

    /// Comment attached to a cell, if any.
    pub fn get(&self, reference: &str) -> Option<&str> {
        self.by_ref.get(reference).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_ref.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ref.is_empty()
    }
}
