//! Paragraph vector codec and the ordered [`EmbeddingMatrix`].
//!
//! Vectors are persisted either as little-endian `f32` BLOBs (the canonical
//! encoding written by ingestion) or as legacy textual literals such as
//! `[0.12, -0.5, 3e-4]`. Both decode through [`parse_vector`], which also
//! enforces the field's fixed width.

use serde::ser::{Serialize, SerializeSeq, Serializer};
use thiserror::Error;

use crate::models::{StoredVector, VectorField};

/// Why a stored vector could not be decoded.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VectorDecodeError {
    #[error("binary vector has {actual} bytes, expected {expected}")]
    ByteLength { expected: usize, actual: usize },

    #[error("vector has {actual} elements, expected {expected}")]
    Width { expected: usize, actual: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("non-finite value '{0}'")]
    NonFinite(String),

    #[error("unbalanced brackets in vector literal")]
    Unbalanced,

    #[error("empty element in vector literal")]
    EmptyElement,
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use corpus_lens_core::vector::{blob_to_vec, vec_to_blob};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Canonical stored form of a vector: little-endian `f32` bytes.
pub fn encode_vector(values: &[f32]) -> StoredVector {
    StoredVector::Binary(vec_to_blob(values))
}

/// Decode a BLOB back into a float vector. Trailing partial words are ignored;
/// callers that need exact lengths check them first.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Parse a legacy textual vector literal.
///
/// Accepts an optional pair of surrounding `[]` or `()`. Elements are
/// separated by commas and/or whitespace; one trailing comma is allowed, but
/// a leading comma or two commas with nothing between them is rejected.
pub fn parse_vector_literal(literal: &str) -> Result<Vec<f32>, VectorDecodeError> {
    let trimmed = literal.trim();
    let inner = match (trimmed.chars().next(), trimmed.chars().last()) {
        (Some('['), Some(']')) | (Some('('), Some(')')) if trimmed.len() >= 2 => {
            &trimmed[1..trimmed.len() - 1]
        }
        _ => trimmed,
    };
    if inner.contains(['[', ']', '(', ')']) {
        return Err(VectorDecodeError::Unbalanced);
    }

    let body = inner.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let body = match body.strip_suffix(',') {
        Some(rest) if !rest.trim().is_empty() => rest,
        _ => body,
    };

    let mut values = Vec::new();
    for piece in body.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(VectorDecodeError::EmptyElement);
        }
        for number in piece.split_whitespace() {
            values.push(parse_number(number)?);
        }
    }
    Ok(values)
}

fn parse_number(piece: &str) -> Result<f32, VectorDecodeError> {
    let value: f32 = piece
        .parse()
        .map_err(|_| VectorDecodeError::InvalidNumber(piece.to_string()))?;
    if !value.is_finite() {
        return Err(VectorDecodeError::NonFinite(piece.to_string()));
    }
    Ok(value)
}

/// Decode a stored vector and check it has exactly `width` elements.
pub fn parse_vector(stored: &StoredVector, width: usize) -> Result<Vec<f32>, VectorDecodeError> {
    let values = match stored {
        StoredVector::Binary(bytes) => {
            if bytes.len() != width * 4 {
                return Err(VectorDecodeError::ByteLength {
                    expected: width * 4,
                    actual: bytes.len(),
                });
            }
            let values = blob_to_vec(bytes);
            if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
                return Err(VectorDecodeError::NonFinite(bad.to_string()));
            }
            values
        }
        StoredVector::Text(literal) => parse_vector_literal(literal)?,
    };

    if values.len() != width {
        return Err(VectorDecodeError::Width {
            expected: width,
            actual: values.len(),
        });
    }
    Ok(values)
}

/// Per-paragraph vectors for one version, in strictly ascending ordinal order.
///
/// Serializes as a nested array of numbers (one inner array per row); the
/// ordinals are kept alongside for callers that need them.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    field: VectorField,
    width: usize,
    ordinals: Vec<i64>,
    rows: Vec<Vec<f32>>,
}

impl EmbeddingMatrix {
    pub fn new(field: VectorField, width: usize) -> Self {
        Self {
            field,
            width,
            ordinals: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Rows must arrive in ascending ordinal order with the
    /// matrix width; anything else is rejected and the matrix is unchanged.
    pub fn push(&mut self, ordinal: i64, row: Vec<f32>) -> bool {
        let ascending = self.ordinals.last().map_or(true, |&last| ordinal > last);
        if !ascending || row.len() != self.width {
            return false;
        }
        self.ordinals.push(ordinal);
        self.rows.push(row);
        true
    }

    pub fn field(&self) -> VectorField {
        self.field
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn ordinals(&self) -> &[i64] {
        &self.ordinals
    }

    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for EmbeddingMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn test_literal_forms() {
        assert_eq!(
            parse_vector_literal("[0.5, -1, 2e-1]").unwrap(),
            vec![0.5, -1.0, 0.2]
        );
        assert_eq!(
            parse_vector_literal("(1 2 3)").unwrap(),
            vec![1.0, 2.0, 3.0]
        );
        assert_eq!(parse_vector_literal(" 4,5 ").unwrap(), vec![4.0, 5.0]);
        assert!(parse_vector_literal("[]").unwrap().is_empty());
    }

    #[test]
    fn test_literal_rejects_garbage() {
        assert_eq!(
            parse_vector_literal("[0.1, abc]"),
            Err(VectorDecodeError::InvalidNumber("abc".to_string()))
        );
        assert_eq!(
            parse_vector_literal("[[0.1, 0.2]]"),
            Err(VectorDecodeError::Unbalanced)
        );
        assert_eq!(
            parse_vector_literal("[0.1, 0.2"),
            Err(VectorDecodeError::Unbalanced)
        );
        assert!(matches!(
            parse_vector_literal("[1, NaN]"),
            Err(VectorDecodeError::NonFinite(_))
        ));
    }

    #[test]
    fn test_literal_rejects_empty_elements() {
        for bad in ["[1,,2]", "[,1,2,]", "[,]", "[1, 2,,]", "1 , , 2"] {
            assert_eq!(
                parse_vector_literal(bad),
                Err(VectorDecodeError::EmptyElement),
                "{bad}"
            );
        }
        assert_eq!(parse_vector_literal("[1, 2,]").unwrap(), vec![1.0, 2.0]);
        assert_eq!(parse_vector_literal("[1 2, 3]").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parse_vector_enforces_width() {
        let text = StoredVector::Text("[1, 2]".to_string());
        assert_eq!(parse_vector(&text, 2).unwrap(), vec![1.0, 2.0]);
        assert_eq!(
            parse_vector(&text, 3),
            Err(VectorDecodeError::Width {
                expected: 3,
                actual: 2
            })
        );

        let binary = StoredVector::Binary(vec_to_blob(&[0.25, 0.75, 1.0]));
        assert_eq!(parse_vector(&binary, 3).unwrap(), vec![0.25, 0.75, 1.0]);
        assert_eq!(
            parse_vector(&binary, 2),
            Err(VectorDecodeError::ByteLength {
                expected: 8,
                actual: 12
            })
        );
    }

    #[test]
    fn test_binary_rejects_non_finite() {
        let binary = StoredVector::Binary(vec_to_blob(&[1.0, f32::INFINITY]));
        assert!(matches!(
            parse_vector(&binary, 2),
            Err(VectorDecodeError::NonFinite(_))
        ));
    }

    #[test]
    fn test_matrix_requires_ascending_ordinals() {
        let mut m = EmbeddingMatrix::new(VectorField::Projection, 2);
        assert!(m.push(0, vec![0.0, 1.0]));
        assert!(m.push(3, vec![1.0, 1.0]));
        assert!(!m.push(3, vec![2.0, 2.0]));
        assert!(!m.push(1, vec![2.0, 2.0]));
        assert!(!m.push(4, vec![2.0]));
        assert_eq!(m.ordinals(), &[0, 3]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_matrix_serializes_as_nested_arrays() {
        let mut m = EmbeddingMatrix::new(VectorField::Embedding, 2);
        m.push(1, vec![0.5, 1.5]);
        m.push(2, vec![-1.0, 2.0]);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "[[0.5,1.5],[-1.0,2.0]]");
    }
}
