//! Instruction rendering.
//!
//! A template is an ordered list of fragments. Conditional clauses are added
//! through [`PromptTemplate::when`], so a clause only exists in the rendered
//! instruction when its value is present. Rendering is deterministic:
//! consecutive lines are joined with `\n` into one text part and every media
//! fragment becomes its own part, in template order.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Media { url: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Instruction {
    parts: Vec<Part>,
}

impl Instruction {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// All text parts joined with newlines, media left out.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                Part::Media { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn media(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|part| match part {
            Part::Media { url } => Some(url.as_str()),
            Part::Text { .. } => None,
        })
    }
}

#[derive(Debug, Clone)]
enum Fragment {
    Line(String),
    Media(String),
}

#[derive(Debug, Clone, Default)]
pub struct PromptTemplate {
    fragments: Vec<Fragment>,
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.fragments.push(Fragment::Line(text.into()));
        self
    }

    pub fn media(mut self, url: impl Into<String>) -> Self {
        self.fragments.push(Fragment::Media(url.into()));
        self
    }

    /// Appends whatever `build` adds, but only when `value` is present.
    pub fn when<T>(self, value: Option<T>, build: impl FnOnce(Self, T) -> Self) -> Self {
        match value {
            Some(value) => build(self, value),
            None => self,
        }
    }

    pub fn render(self) -> Instruction {
        let mut parts = Vec::new();
        let mut lines: Vec<String> = Vec::new();

        for fragment in self.fragments {
            match fragment {
                Fragment::Line(line) => lines.push(line),
                Fragment::Media(url) => {
                    if !lines.is_empty() {
                        parts.push(Part::Text {
                            text: lines.join("\n"),
                        });
                        lines.clear();
                    }
                    parts.push(Part::Media { url });
                }
            }
        }
        if !lines.is_empty() {
            parts.push(Part::Text {
                text: lines.join("\n"),
            });
        }

        Instruction { parts }
    }
}
