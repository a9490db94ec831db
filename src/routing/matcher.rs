//! Path template compilation and matching.
//!
//! # Responsibilities
//! - Compile a template such as `/faiss/1.0/db/{db_name}` into instructions
//! - Run the instructions against the segments of a concrete path
//! - Extract captured variables in declaration order
//!
//! # Design Decisions
//! - Strictly positional: segment i is checked by instruction i
//! - No wildcards spanning segments, no optional segments, no backtracking
//! - Every program ends with an end-of-path assertion
//! - No regex, matching is O(segments)

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Segment delimiter for request paths.
pub const DELIMITER: char = '/';

/// One step of a compiled template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Consume the next segment; fail unless it equals the literal.
    PushLiteral(Arc<str>),
    /// Consume the next segment and bind it to the named variable.
    PushCapture(Arc<str>),
    /// Fail if any segment is left unconsumed.
    AssertEnd,
}

/// Errors raised while compiling a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("template `{0}` has no segments")]
    Empty(String),

    #[error("template `{template}`: malformed segment `{segment}`")]
    MalformedSegment { template: String, segment: String },

    #[error("template `{template}`: capture name must not be empty")]
    EmptyCapture { template: String },

    #[error("template `{template}`: capture `{name}` declared twice")]
    DuplicateCapture { template: String, name: String },
}

/// Split a path into its non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split(DELIMITER).filter(|s| !s.is_empty()).collect()
}

/// A compiled path template.
///
/// Immutable once built and cheap to share between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    template: String,
    program: Vec<Instruction>,
}

/// Variables captured by a successful match, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    values: Vec<(Arc<str>, String)>,
}

impl Captures {
    /// Look up a captured value by variable name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }
}

impl Pattern {
    /// Compile a template.
    ///
    /// Each `/`-separated segment is either a literal or a `{name}` capture.
    /// Empty segments (leading, trailing or doubled slashes) are ignored, the
    /// same way incoming paths are split.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let segments = split_path(template);
        if segments.is_empty() {
            return Err(PatternError::Empty(template.to_string()));
        }

        let mut program = Vec::with_capacity(segments.len() + 1);
        let mut names: Vec<&str> = Vec::new();

        for segment in segments {
            match (segment.strip_prefix('{'), segment.strip_suffix('}')) {
                (Some(_), Some(_)) if segment.len() >= 2 => {
                    let name = &segment[1..segment.len() - 1];
                    if name.is_empty() {
                        return Err(PatternError::EmptyCapture {
                            template: template.to_string(),
                        });
                    }
                    if name.contains(['{', '}']) {
                        return Err(PatternError::MalformedSegment {
                            template: template.to_string(),
                            segment: segment.to_string(),
                        });
                    }
                    if names.contains(&name) {
                        return Err(PatternError::DuplicateCapture {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    names.push(name);
                    program.push(Instruction::PushCapture(Arc::from(name)));
                }
                _ if segment.contains(['{', '}']) => {
                    return Err(PatternError::MalformedSegment {
                        template: template.to_string(),
                        segment: segment.to_string(),
                    });
                }
                _ => program.push(Instruction::PushLiteral(Arc::from(segment))),
            }
        }
        program.push(Instruction::AssertEnd);

        Ok(Self {
            template: template.to_string(),
            program,
        })
    }

    /// Build a literal-only pattern from already split segments.
    pub fn literal<S: AsRef<str>>(segments: &[S]) -> Result<Self, PatternError> {
        let template = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join("/");
        let pattern = Self::compile(&format!("/{template}"))?;
        if pattern.capture_count() > 0 {
            return Err(PatternError::MalformedSegment {
                template: pattern.template.clone(),
                segment: template,
            });
        }
        Ok(pattern)
    }

    /// The source template.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The compiled instruction sequence.
    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    /// Number of segments a matching path must have.
    pub fn segment_count(&self) -> usize {
        self.program.len() - 1
    }

    pub fn capture_count(&self) -> usize {
        self.program
            .iter()
            .filter(|op| matches!(op, Instruction::PushCapture(_)))
            .count()
    }

    /// True if both patterns accept exactly the same paths.
    ///
    /// Captures compare positionally; their names do not matter.
    pub fn same_shape(&self, other: &Pattern) -> bool {
        self.program.len() == other.program.len()
            && self.program.iter().zip(&other.program).all(|(a, b)| match (a, b) {
                (Instruction::PushLiteral(x), Instruction::PushLiteral(y)) => x == y,
                (Instruction::PushCapture(_), Instruction::PushCapture(_)) => true,
                (Instruction::AssertEnd, Instruction::AssertEnd) => true,
                _ => false,
            })
    }

    /// Match already split path segments.
    ///
    /// Returns `None` on mismatch. Captured values are percent-decoded.
    pub fn match_segments(&self, segments: &[&str]) -> Option<Captures> {
        if segments.len() != self.segment_count() {
            return None;
        }

        let mut cursor = 0;
        let mut captures = Captures::default();

        for op in &self.program {
            match op {
                Instruction::PushLiteral(literal) => {
                    let segment = segments.get(cursor)?;
                    if *segment != literal.as_ref() {
                        return None;
                    }
                    cursor += 1;
                }
                Instruction::PushCapture(name) => {
                    let segment = segments.get(cursor)?;
                    let value = urlencoding::decode(segment).ok()?;
                    captures.values.push((Arc::clone(name), value.into_owned()));
                    cursor += 1;
                }
                Instruction::AssertEnd => {
                    if cursor != segments.len() {
                        return None;
                    }
                }
            }
        }

        Some(captures)
    }

    /// Match a raw request path.
    pub fn match_path(&self, path: &str) -> Option<Captures> {
        self.match_segments(&split_path(path))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}
