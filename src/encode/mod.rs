//! Row encoding with the hashing trick.
//!
//! A [`FeatureEncoder`] owns an ordered list of predictor fields, a target
//! dictionary, and the width of the hashed feature space. It turns a tabular
//! row of string cells into `(target id, SparseVector)`:
//!
//! | Kind | Hashed on | Weight |
//! |------|-----------|--------|
//! | `numeric` | field name | parsed value |
//! | `word` | field name + cell | 1 |
//! | `text` | field name + each token | token count |
//!
//! Collisions are accepted: widening `num_features` trades memory for fewer
//! of them.
//!
//! ```rust
//! use furrow::encode::{FeatureEncoder, FieldKind, FieldSpec, TargetSpec};
//!
//! let mut enc = FeatureEncoder::new(
//!     vec![FieldSpec::new("x", FieldKind::Numeric), FieldSpec::new("tag", FieldKind::Word)],
//!     TargetSpec::new("label", 2),
//!     100,
//! ).unwrap();
//! enc.bind_header(&["x", "tag", "label"]).unwrap();
//!
//! let (target, v) = enc.encode(&["1.5", "red", "yes"]).unwrap();
//! assert_eq!(target, 0);
//! assert!(v.iter().all(|(i, _)| i < 100));
//! ```

mod hash;

use crate::error::{Error, Result};
use crate::vector::SparseVector;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Default number of probes per hashed value.
pub const DEFAULT_PROBES: usize = 2;

/// How a predictor cell becomes features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FieldKind {
    /// Parsed as `f64`; the value is the weight.
    Numeric,
    /// Whole cell is one categorical token.
    Word,
    /// Cell is tokenized; each token is weighted by its count.
    Text,
}

impl FromStr for FieldKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "numeric" | "n" => Ok(FieldKind::Numeric),
            "word" | "w" => Ok(FieldKind::Word),
            "text" | "t" => Ok(FieldKind::Text),
            other => Err(Error::invalid(
                "types",
                format!("unknown field kind '{other}' (expected numeric, word, or text)"),
            )),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Numeric => write!(f, "numeric"),
            FieldKind::Word => write!(f, "word"),
            FieldKind::Text => write!(f, "text"),
        }
    }
}

/// A named, typed predictor field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldSpec {
    /// Column name as it appears in the header.
    pub name: String,
    /// Encoding kind.
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Create a field spec.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Pair predictor names with kind names.
    ///
    /// A single kind is applied to every predictor; otherwise the lists must
    /// have equal length.
    pub fn zip<N, K>(names: &[N], kinds: &[K]) -> Result<Vec<FieldSpec>>
    where
        N: AsRef<str>,
        K: AsRef<str>,
    {
        if kinds.is_empty() {
            return Err(Error::invalid("types", "at least one kind is required"));
        }
        if kinds.len() != 1 && kinds.len() != names.len() {
            return Err(Error::invalid(
                "types",
                format!(
                    "{} kinds given for {} predictors",
                    kinds.len(),
                    names.len()
                ),
            ));
        }
        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = kinds[if kinds.len() == 1 { 0 } else { i }]
                    .as_ref()
                    .parse()?;
                Ok(FieldSpec::new(name.as_ref(), kind))
            })
            .collect()
    }
}

/// Target field and its category dictionary.
///
/// Category ids are assigned to declared categories first, then to new values
/// in first-seen order, up to `max_categories`. After [`TargetSpec::freeze`]
/// unseen values are rejected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawTargetSpec"))]
pub struct TargetSpec {
    name: String,
    max_categories: usize,
    values: Vec<String>,
    #[cfg_attr(feature = "serde", serde(skip))]
    ids: HashMap<String, usize>,
    frozen: bool,
}

impl TargetSpec {
    /// Target `name` with at most `max_categories` distinct values.
    pub fn new(name: impl Into<String>, max_categories: usize) -> Self {
        Self {
            name: name.into(),
            max_categories,
            values: Vec::new(),
            ids: HashMap::new(),
            frozen: false,
        }
    }

    /// Pre-declare categories; they receive ids `0..n` in the given order.
    pub fn with_categories<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        for c in categories {
            let c = c.as_ref().trim();
            if !self.ids.contains_key(c) {
                self.ids.insert(c.to_owned(), self.values.len());
                self.values.push(c.to_owned());
            }
        }
        self
    }

    /// Target field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper bound on distinct categories.
    pub fn max_categories(&self) -> usize {
        self.max_categories
    }

    /// Category values, indexed by id.
    pub fn categories(&self) -> &[String] {
        &self.values
    }

    /// Stop admitting new categories.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Whether new categories are rejected.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Id of an already known value.
    pub fn id_of(&self, value: &str) -> Option<usize> {
        self.ids.get(value.trim()).copied()
    }

    /// Id of `value`, interning it if the dictionary is open.
    pub fn intern(&mut self, value: &str) -> Result<usize> {
        let value = value.trim();
        if let Some(&id) = self.ids.get(value) {
            return Ok(id);
        }
        if self.frozen {
            return Err(Error::UnknownCategory {
                value: value.to_owned(),
                reason: "category dictionary is frozen",
            });
        }
        if self.values.len() >= self.max_categories {
            return Err(Error::UnknownCategory {
                value: value.to_owned(),
                reason: "more distinct values than the declared category count",
            });
        }
        let id = self.values.len();
        self.ids.insert(value.to_owned(), id);
        self.values.push(value.to_owned());
        Ok(id)
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid("target", "target field name is required"));
        }
        if self.max_categories < 2 {
            return Err(Error::invalid("categories", "need at least 2 target categories"));
        }
        if self.values.len() > self.max_categories {
            return Err(Error::invalid(
                "categories",
                "more declared categories than the category count",
            ));
        }
        Ok(())
    }
}

/// Column positions resolved from a header.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Binding {
    width: usize,
    target: usize,
    predictors: Vec<usize>,
}

/// Hashing row encoder.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawFeatureEncoder"))]
pub struct FeatureEncoder {
    fields: Vec<FieldSpec>,
    target: TargetSpec,
    num_features: usize,
    probes: usize,
    binding: Option<Binding>,
}

impl FeatureEncoder {
    /// Configure an encoder. Fails if the target is undeclared, `num_features`
    /// is zero, or the target also appears among the predictors.
    pub fn new(fields: Vec<FieldSpec>, target: TargetSpec, num_features: usize) -> Result<Self> {
        target.validate()?;
        if num_features == 0 {
            return Err(Error::invalid("features", "must be > 0"));
        }
        if fields.is_empty() {
            return Err(Error::invalid("predictors", "at least one predictor is required"));
        }
        if fields.iter().any(|f| f.name == target.name) {
            return Err(Error::invalid(
                "predictors",
                format!("target '{}' cannot also be a predictor", target.name),
            ));
        }
        Ok(Self {
            fields,
            target,
            num_features,
            probes: DEFAULT_PROBES,
            binding: None,
        })
    }

    /// Hash each value into `probes` slots (at least 1).
    pub fn with_probes(mut self, probes: usize) -> Self {
        self.probes = probes.max(1);
        self
    }

    /// Width of the hashed feature space.
    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Probes per hashed value.
    pub fn probes(&self) -> usize {
        self.probes
    }

    /// Predictor fields in encoding order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Target spec and dictionary.
    pub fn target(&self) -> &TargetSpec {
        &self.target
    }

    /// Freeze the target dictionary.
    pub fn freeze_target(&mut self) {
        self.target.freeze();
    }

    /// Resolve column positions. Header cells are trimmed of whitespace and quotes.
    pub fn bind_header<S: AsRef<str>>(&mut self, header: &[S]) -> Result<()> {
        let names: Vec<&str> = header.iter().map(|h| clean(h.as_ref())).collect();
        let position = |field: &str| {
            names
                .iter()
                .position(|&n| n == field)
                .ok_or_else(|| Error::MissingField {
                    field: field.to_owned(),
                })
        };
        let target = position(&self.target.name)?;
        let predictors = self
            .fields
            .iter()
            .map(|f| position(&f.name))
            .collect::<Result<Vec<_>>>()?;
        self.binding = Some(Binding {
            width: names.len(),
            target,
            predictors,
        });
        Ok(())
    }

    /// Encode a labeled row into `(target id, features)`.
    pub fn encode<S: AsRef<str>>(&mut self, row: &[S]) -> Result<(usize, SparseVector)> {
        let binding = self.checked_binding(row.len())?;
        let target_cell = clean(row[binding.target].as_ref()).to_owned();
        let features = self.encode_bound(binding, row)?;
        let target = self.target.intern(&target_cell)?;
        Ok((target, features))
    }

    /// Encode predictors only. The target column, if present, is ignored.
    pub fn encode_features<S: AsRef<str>>(&self, row: &[S]) -> Result<SparseVector> {
        let binding = self.checked_binding(row.len())?;
        self.encode_bound(binding, row)
    }

    fn checked_binding(&self, row_len: usize) -> Result<&Binding> {
        let binding = self
            .binding
            .as_ref()
            .ok_or_else(|| Error::invalid("header", "bind_header must be called before encoding"))?;
        if row_len != binding.width {
            return Err(Error::ColumnCount {
                expected: binding.width,
                found: row_len,
            });
        }
        Ok(binding)
    }

    fn encode_bound<S: AsRef<str>>(&self, binding: &Binding, row: &[S]) -> Result<SparseVector> {
        let mut v = SparseVector::new(self.num_features);
        for (field, &col) in self.fields.iter().zip(&binding.predictors) {
            let cell = clean(row[col].as_ref());
            match field.kind {
                FieldKind::Numeric => {
                    let value: f64 = cell.parse().map_err(|_| Error::Unparsable {
                        field: field.name.clone(),
                        value: cell.to_owned(),
                    })?;
                    self.add_hashed(&mut v, &field.name, "", value)?;
                }
                FieldKind::Word => {
                    if !cell.is_empty() {
                        self.add_hashed(&mut v, &field.name, cell, 1.0)?;
                    }
                }
                FieldKind::Text => {
                    for (token, count) in hash::token_counts(cell) {
                        self.add_hashed(&mut v, &field.name, &token, count as f64)?;
                    }
                }
            }
        }
        Ok(v)
    }

    fn add_hashed(&self, v: &mut SparseVector, field: &str, value: &str, weight: f64) -> Result<()> {
        for slot in hash::slots(field, value, self.probes, self.num_features) {
            v.add(slot, weight)?;
        }
        Ok(())
    }
}

/// Trim whitespace and surrounding double quotes from a header or data cell.
pub(crate) fn clean(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawTargetSpec {
    name: String,
    max_categories: usize,
    values: Vec<String>,
    frozen: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<RawTargetSpec> for TargetSpec {
    type Error = Error;

    fn try_from(raw: RawTargetSpec) -> Result<Self> {
        let mut target = TargetSpec::new(raw.name, raw.max_categories).with_categories(&raw.values);
        if target.values != raw.values {
            return Err(Error::invalid(
                "categories",
                "category values must be distinct and trimmed",
            ));
        }
        target.validate()?;
        target.frozen = raw.frozen;
        Ok(target)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawFeatureEncoder {
    fields: Vec<FieldSpec>,
    target: TargetSpec,
    num_features: usize,
    probes: usize,
    binding: Option<Binding>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawFeatureEncoder> for FeatureEncoder {
    type Error = Error;

    fn try_from(raw: RawFeatureEncoder) -> Result<Self> {
        if raw.probes == 0 {
            return Err(Error::invalid("probes", "must be > 0"));
        }
        let mut encoder = FeatureEncoder::new(raw.fields, raw.target, raw.num_features)?;
        encoder.probes = raw.probes;
        if let Some(binding) = raw.binding {
            let in_range = binding.target < binding.width
                && binding.predictors.iter().all(|&p| p < binding.width);
            if !in_range || binding.predictors.len() != encoder.fields.len() {
                return Err(Error::invalid(
                    "header",
                    "stored column binding does not fit its header",
                ));
            }
            encoder.binding = Some(binding);
        }
        Ok(encoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn encoder() -> FeatureEncoder {
        let mut enc = FeatureEncoder::new(
            vec![
                FieldSpec::new("x", FieldKind::Numeric),
                FieldSpec::new("color", FieldKind::Word),
                FieldSpec::new("notes", FieldKind::Text),
            ],
            TargetSpec::new("y", 2),
            64,
        )
        .unwrap();
        enc.bind_header(&["\"x\"", "color", "notes", "y"]).unwrap();
        enc
    }

    #[test]
    fn test_configure_errors() {
        let fields = vec![FieldSpec::new("x", FieldKind::Numeric)];
        let err = FeatureEncoder::new(fields.clone(), TargetSpec::new("", 2), 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = FeatureEncoder::new(fields.clone(), TargetSpec::new("y", 2), 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = FeatureEncoder::new(fields, TargetSpec::new("x", 2), 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_missing_header_field_is_schema_error() {
        let mut enc = encoder();
        let err = enc.bind_header(&["x", "color", "y"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(
            err,
            Error::MissingField {
                field: "notes".into()
            }
        );
    }

    #[test]
    fn test_encode_before_bind_fails() {
        let mut enc = FeatureEncoder::new(
            vec![FieldSpec::new("x", FieldKind::Numeric)],
            TargetSpec::new("y", 2),
            8,
        )
        .unwrap();
        assert!(enc.encode(&["1", "a"]).is_err());
    }

    #[test]
    fn test_numeric_weight_is_the_value() {
        let mut enc = encoder();
        let (_, v) = enc.encode(&["2.5", "", "", "a"]).unwrap();
        let total: f64 = v.iter().map(|(_, w)| w).sum();
        // Two probes, each carrying the full value.
        assert!((total - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_text_counts_tokens() {
        let mut enc = encoder().with_probes(1);
        let (_, v) = enc.encode(&["0", "", "spam spam eggs", "a"]).unwrap();
        let total: f64 = v.iter().map(|(_, w)| w).sum();
        assert!((total - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_targets_first_seen_then_frozen() {
        let mut enc = encoder();
        assert_eq!(enc.encode(&["1", "r", "", "4"]).unwrap().0, 0);
        assert_eq!(enc.encode(&["1", "r", "", "2"]).unwrap().0, 1);
        assert_eq!(enc.encode(&["1", "r", "", "4"]).unwrap().0, 0);
        let err = enc.encode(&["1", "r", "", "9"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        enc.freeze_target();
        assert!(enc.target().is_frozen());
        assert!(enc.encode(&["1", "r", "", "2"]).is_ok());
    }

    #[test]
    fn test_declared_categories_take_first_ids() {
        let mut enc = FeatureEncoder::new(
            vec![FieldSpec::new("x", FieldKind::Numeric)],
            TargetSpec::new("y", 2).with_categories(&["neg", "pos"]),
            8,
        )
        .unwrap();
        enc.bind_header(&["x", "y"]).unwrap();
        assert_eq!(enc.encode(&["1", "pos"]).unwrap().0, 1);
        assert_eq!(enc.encode(&["1", "neg"]).unwrap().0, 0);
    }

    #[test]
    fn test_data_errors() {
        let mut enc = encoder();
        let err = enc.encode(&["1", "r", "a"]).unwrap_err();
        assert_eq!(
            err,
            Error::ColumnCount {
                expected: 4,
                found: 3
            }
        );
        let err = enc.encode(&["abc", "r", "", "a"]).unwrap_err();
        assert!(matches!(err, Error::Unparsable { .. }));
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_encode_features_skips_target() {
        let enc = encoder();
        let v = enc.encode_features(&["1", "blue", "", "never-seen"]).unwrap();
        assert!(v.nnz() > 0);
        assert!(enc.target().categories().is_empty());
    }

    #[test]
    fn test_encode_features_before_bind_fails() {
        let enc = FeatureEncoder::new(
            vec![FieldSpec::new("x", FieldKind::Numeric)],
            TargetSpec::new("y", 2),
            8,
        )
        .unwrap();
        let err = enc.encode_features(&["1", "a"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_revalidates() {
        let mut enc = encoder();
        enc.encode(&["1", "r", "", "a"]).unwrap();
        enc.freeze_target();
        let json = serde_json::to_string(&enc).unwrap();
        let back: FeatureEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, enc);
        assert_eq!(back.target().id_of("a"), Some(0));

        let tamper = |path: &[&str], value: serde_json::Value| {
            let mut doc: serde_json::Value = serde_json::from_str(&json).unwrap();
            let mut slot = &mut doc;
            for key in path {
                slot = &mut slot[*key];
            }
            *slot = value;
            serde_json::from_value::<FeatureEncoder>(doc)
        };
        assert!(tamper(&["num_features"], serde_json::json!(0)).is_err());
        assert!(tamper(&["probes"], serde_json::json!(0)).is_err());
        assert!(tamper(&["binding", "target"], serde_json::json!(9)).is_err());
        assert!(tamper(&["binding", "predictors"], serde_json::json!([0])).is_err());
        assert!(tamper(&["target", "values"], serde_json::json!(["a", "a"])).is_err());
        assert!(tamper(&["target", "max_categories"], serde_json::json!(1)).is_err());
    }

    #[test]
    fn test_field_spec_zip() {
        let specs = FieldSpec::zip(&["a", "b"], &["numeric"]).unwrap();
        assert!(specs.iter().all(|s| s.kind == FieldKind::Numeric));
        let specs = FieldSpec::zip(&["a", "b"], &["word", "text"]).unwrap();
        assert_eq!(specs[1].kind, FieldKind::Text);
        assert!(FieldSpec::zip(&["a", "b", "c"], &["word", "text"]).is_err());
        assert!(FieldSpec::zip(&["a"], &["color"]).is_err());
    }

    proptest! {
        #[test]
        fn prop_encode_stays_in_range(
            width in 1usize..300,
            x in -1e6f64..1e6,
            word in "[a-z]{0,12}",
            text in "[a-z ,.]{0,60}",
        ) {
            let mut enc = FeatureEncoder::new(
                vec![
                    FieldSpec::new("x", FieldKind::Numeric),
                    FieldSpec::new("w", FieldKind::Word),
                    FieldSpec::new("t", FieldKind::Text),
                ],
                TargetSpec::new("y", 2),
                width,
            ).unwrap();
            enc.bind_header(&["x", "w", "t", "y"]).unwrap();
            let row = [x.to_string(), word, text, "1".to_string()];
            let (_, v) = enc.encode(&row).unwrap();
            prop_assert_eq!(v.dim(), width);
            for (i, _) in v.iter() {
                prop_assert!(i < width);
            }
        }
    }
}
