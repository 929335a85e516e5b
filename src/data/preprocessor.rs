// ============================================================
// Layer 4 — Preprocessing Pipeline
// ============================================================
// Turns raw student rows into fixed-order numeric vectors.
//
// Fit (once, on the training table):
//   1. Pick feature columns: everything except the target and
//      identifier columns, in table order
//   2. Impute statistics: median for numeric columns, mode for
//      categorical columns (computed over the whole table)
//   3. Label-encode every categorical column: sorted distinct
//      values → 0, 1, 2, ...
//   4. Stratified train/test split on the label
//   5. Fit a standard scaler on the encoded TRAIN matrix,
//      categorical codes included
//
// Transform (every request):
//   same column order, same encoders, same scaler. A missing key
//   or an unseen category is an error, never a guess.
//
// The encoders, scaler, feature order and impute statistics
// travel together as one PreprocessingArtifact.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::data::splitter::stratified_split;
use crate::domain::error::PreprocessingError;
use crate::domain::student::{
    FeatureMap, FeatureValue, RawTable, DEFAULT_CATEGORICAL_COLUMNS, DEFAULT_TARGET_COLUMN,
    IDENTIFIER_COLUMNS,
};

// ─── CategoryEncoder ──────────────────────────────────────────────────────────
/// Bijective map between category strings and dense codes 0..n.
/// Classes are stored sorted; a class's code is its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        Self { classes: set.into_iter().collect() }
    }

    pub fn encode(&self, value: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn is_sorted_unique(&self) -> bool {
        self.classes.windows(2).all(|w| w[0] < w[1])
    }
}

// ─── StandardScaler ───────────────────────────────────────────────────────────
/// Per-column shift/scale: x' = (x - mean) / scale.
/// Scale is the population standard deviation; constant columns get 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean:  Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn identity(width: usize) -> Self {
        Self { mean: vec![0.0; width], scale: vec![1.0; width] }
    }

    pub fn fit(rows: &[Vec<f64>], width: usize) -> Self {
        if rows.is_empty() {
            return Self::identity(width);
        }
        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = vec![0.0; width];
        for row in rows {
            for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m) * (x - m);
            }
        }
        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, row: &[f64]) -> Vec<f32> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| ((x - m) / s) as f32)
            .collect()
    }
}

// ─── Imputation ───────────────────────────────────────────────────────────────
/// Fill value for an explicitly missing cell, fixed at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Imputation {
    Median(f64),
    Mode(String),
}

// ─── PreprocessingArtifact ────────────────────────────────────────────────────
/// Everything needed to reproduce training-time vectors at inference time.
/// Persisted and loaded as a single unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingArtifact {
    pub feature_names: Vec<String>,
    pub encoders:      BTreeMap<String, CategoryEncoder>,
    pub scaler:        StandardScaler,
    pub imputation:    BTreeMap<String, Imputation>,
    pub target_column: String,
}

impl PreprocessingArtifact {
    /// Structural consistency check, run on every load.
    pub fn validate(&self) -> Result<(), String> {
        let width = self.feature_names.len();
        if width == 0 {
            return Err("artifact declares no features".into());
        }
        if self.scaler.mean.len() != width || self.scaler.scale.len() != width {
            return Err(format!(
                "scaler width {} / {} does not match {} feature names",
                self.scaler.mean.len(),
                self.scaler.scale.len(),
                width
            ));
        }
        if let Some(bad) = self.scaler.scale.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(format!("scaler contains invalid scale {bad}"));
        }
        if self.scaler.mean.iter().any(|m| !m.is_finite()) {
            return Err("scaler contains a non-finite mean".into());
        }
        for (column, encoder) in &self.encoders {
            if !self.feature_names.contains(column) {
                return Err(format!("encoder for unknown feature '{column}'"));
            }
            if encoder.is_empty() || !encoder.is_sorted_unique() {
                return Err(format!("encoder for '{column}' is empty or unordered"));
            }
        }
        for name in &self.feature_names {
            match (self.encoders.contains_key(name), self.imputation.get(name)) {
                (_, None) => return Err(format!("no imputation value for '{name}'")),
                (true, Some(Imputation::Median(_))) | (false, Some(Imputation::Mode(_))) => {
                    return Err(format!("imputation kind does not match column type of '{name}'"))
                }
                (false, Some(Imputation::Median(m))) if !m.is_finite() => {
                    return Err(format!("median of '{name}' is not finite"))
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Encode one feature value (before scaling). Shared by fit and transform.
    fn encode_value(&self, feature: &str, value: &FeatureValue) -> Result<f64, PreprocessingError> {
        let imputed;
        let value = if value.is_missing() {
            imputed = match self.imputation.get(feature) {
                Some(Imputation::Median(m)) => FeatureValue::Number(*m),
                Some(Imputation::Mode(m))   => FeatureValue::Text(m.clone()),
                None => return Err(PreprocessingError::missing_feature(feature)),
            };
            &imputed
        } else {
            value
        };

        match self.encoders.get(feature) {
            Some(encoder) => {
                let category = value.as_category().unwrap_or_default();
                encoder
                    .encode(&category)
                    .map(|code| code as f64)
                    .ok_or_else(|| PreprocessingError::unseen_category(feature, category))
            }
            None => value.as_number().ok_or_else(|| PreprocessingError::NotNumeric {
                feature: feature.to_string(),
                value:   value.to_string(),
            }),
        }
    }

    /// Encode a row looked up by feature name, in fitted order.
    fn encode_with<'a, F>(&self, lookup: F) -> Result<Vec<f64>, PreprocessingError>
    where
        F: Fn(&str) -> Option<&'a FeatureValue>,
    {
        self.feature_names
            .iter()
            .map(|name| {
                let value = lookup(name).ok_or_else(|| PreprocessingError::missing_feature(name))?;
                self.encode_value(name, value)
            })
            .collect()
    }
}

// ─── Pipeline configuration and output ────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub target_column:       String,
    pub categorical_columns: Vec<String>,
    pub test_fraction:       f64,
    pub seed:                u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column:       DEFAULT_TARGET_COLUMN.to_string(),
            categorical_columns: DEFAULT_CATEGORICAL_COLUMNS.iter().map(|c| c.to_string()).collect(),
            test_fraction:       0.2,
            seed:                42,
        }
    }
}

/// Scaled vectors and labels for both sides of the split.
#[derive(Debug, Clone, Default)]
pub struct FittedSplit {
    pub train_vectors: Vec<Vec<f32>>,
    pub test_vectors:  Vec<Vec<f32>>,
    pub train_labels:  Vec<usize>,
    pub test_labels:   Vec<usize>,
}

// ─── PreprocessingPipeline ────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessingPipeline {
    artifact: PreprocessingArtifact,
}

impl PreprocessingPipeline {
    /// Wrap a loaded artifact after checking it is self-consistent.
    pub fn from_artifact(artifact: PreprocessingArtifact) -> Result<Self, String> {
        artifact.validate()?;
        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &PreprocessingArtifact {
        &self.artifact
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    pub fn width(&self) -> usize {
        self.artifact.feature_names.len()
    }

    /// Fit encoders, impute statistics and scaler; return the split vectors.
    pub fn fit(table: &RawTable, config: &PipelineConfig) -> Result<(Self, FittedSplit), PreprocessingError> {
        if table.is_empty() {
            return Err(PreprocessingError::EmptyTable);
        }
        let target_idx = table
            .column_index(&config.target_column)
            .ok_or_else(|| PreprocessingError::MissingColumn(config.target_column.clone()))?;

        let labels = table
            .column(target_idx)
            .enumerate()
            .map(|(row, v)| parse_label(row, v))
            .collect::<Result<Vec<usize>, _>>()?;

        let feature_columns: Vec<(usize, String)> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(i, name)| {
                *i != target_idx && !IDENTIFIER_COLUMNS.contains(&name.as_str())
            })
            .map(|(i, name)| (i, name.clone()))
            .collect();

        let mut encoders   = BTreeMap::new();
        let mut imputation = BTreeMap::new();

        for (idx, name) in &feature_columns {
            if config.categorical_columns.iter().any(|c| c == name) {
                let mode = column_mode(table, *idx).ok_or_else(|| PreprocessingError::EmptyColumn(name.clone()))?;
                let encoder = CategoryEncoder::fit(
                    table
                        .column(*idx)
                        .map(|v| v.as_category().unwrap_or_else(|| mode.clone())),
                );
                encoders.insert(name.clone(), encoder);
                imputation.insert(name.clone(), Imputation::Mode(mode));
            } else {
                let median = column_median(table, *idx, name)?;
                imputation.insert(name.clone(), Imputation::Median(median));
            }
        }

        let feature_names: Vec<String> = feature_columns.iter().map(|(_, n)| n.clone()).collect();
        let width = feature_names.len();
        let mut artifact = PreprocessingArtifact {
            feature_names,
            encoders,
            scaler: StandardScaler::identity(width),
            imputation,
            target_column: config.target_column.clone(),
        };

        let encoded: Vec<Vec<f64>> = table
            .rows
            .iter()
            .map(|row| {
                artifact.encode_with(|name| {
                    feature_columns
                        .iter()
                        .find(|(_, n)| n == name)
                        .map(|(i, _)| &row[*i])
                })
            })
            .collect::<Result<_, _>>()?;

        let (train_idx, test_idx) = stratified_split(&labels, config.test_fraction, config.seed);

        let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|&i| encoded[i].clone()).collect();
        artifact.scaler = StandardScaler::fit(&train_rows, width);

        let split = FittedSplit {
            train_vectors: train_rows.iter().map(|r| artifact.scaler.transform(r)).collect(),
            test_vectors:  test_idx.iter().map(|&i| artifact.scaler.transform(&encoded[i])).collect(),
            train_labels:  train_idx.iter().map(|&i| labels[i]).collect(),
            test_labels:   test_idx.iter().map(|&i| labels[i]).collect(),
        };

        tracing::info!(
            "Preprocessing fitted: {} features ({} categorical), {} train / {} test rows",
            width,
            artifact.encoders.len(),
            split.train_vectors.len(),
            split.test_vectors.len()
        );

        Ok((Self { artifact }, split))
    }

    /// Convert one raw feature map to a scaled vector in fitted order.
    pub fn transform_one(&self, features: &FeatureMap) -> Result<Vec<f32>, PreprocessingError> {
        let encoded = self.artifact.encode_with(|name| features.get(name))?;
        Ok(self.artifact.scaler.transform(&encoded))
    }

    /// Split a labelled table with this already-fitted pipeline, using the
    /// same stratified split `fit` uses. Nothing is refitted, so a table
    /// holding a category the encoders never saw is an error.
    pub fn split_table(
        &self,
        table:         &RawTable,
        test_fraction: f64,
        seed:          u64,
    ) -> Result<FittedSplit, PreprocessingError> {
        if table.is_empty() {
            return Err(PreprocessingError::EmptyTable);
        }
        let (vectors, labels) = self.transform_table(table)?;
        let (train_idx, test_idx) = stratified_split(&labels, test_fraction, seed);
        Ok(FittedSplit {
            train_vectors: train_idx.iter().map(|&i| vectors[i].clone()).collect(),
            test_vectors:  test_idx.iter().map(|&i| vectors[i].clone()).collect(),
            train_labels:  train_idx.iter().map(|&i| labels[i]).collect(),
            test_labels:   test_idx.iter().map(|&i| labels[i]).collect(),
        })
    }

    /// Transform every row of a labelled table.
    fn transform_table(&self, table: &RawTable) -> Result<(Vec<Vec<f32>>, Vec<usize>), PreprocessingError> {
        let target_idx = table
            .column_index(&self.artifact.target_column)
            .ok_or_else(|| PreprocessingError::MissingColumn(self.artifact.target_column.clone()))?;

        let mut vectors = Vec::with_capacity(table.len());
        let mut labels  = Vec::with_capacity(table.len());
        for (row, values) in table.rows.iter().enumerate() {
            labels.push(parse_label(row, &values[target_idx])?);
            let encoded = self.artifact.encode_with(|name| {
                table.column_index(name).map(|i| &values[i])
            })?;
            vectors.push(self.artifact.scaler.transform(&encoded));
        }
        Ok((vectors, labels))
    }
}

/// Accept 0/1 numbers, "0"/"1", or "Low"/"High".
fn parse_label(row: usize, value: &FeatureValue) -> Result<usize, PreprocessingError> {
    let invalid = || PreprocessingError::InvalidLabel { row, value: value.to_string() };
    match value {
        FeatureValue::Number(n) if *n == 0.0 => Ok(0),
        FeatureValue::Number(n) if *n == 1.0 => Ok(1),
        FeatureValue::Text(s) => match s.trim() {
            "0" | "Low"  => Ok(0),
            "1" | "High" => Ok(1),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}

/// Median of the numeric values of a column, ignoring Missing.
fn column_median(table: &RawTable, idx: usize, name: &str) -> Result<f64, PreprocessingError> {
    let mut values = Vec::with_capacity(table.len());
    for v in table.column(idx) {
        if v.is_missing() {
            continue;
        }
        let n = v.as_number().ok_or_else(|| PreprocessingError::NotNumeric {
            feature: name.to_string(),
            value:   v.to_string(),
        })?;
        values.push(n);
    }
    if values.is_empty() {
        return Err(PreprocessingError::EmptyColumn(name.to_string()));
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Ok(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Most frequent category; ties go to the smallest string.
fn column_mode(table: &RawTable, idx: usize) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for category in table.column(idx).filter_map(FeatureValue::as_category) {
        *counts.entry(category).or_insert(0) += 1;
    }
    // max_by_key returns the LAST max; iterate in reverse so the smallest key wins.
    counts
        .into_iter()
        .rev()
        .max_by_key(|(_, count)| *count)
        .map(|(category, _)| category)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::SyntheticGenerator;
    use crate::domain::error::ErrorCategory;

    fn fitted() -> (PreprocessingPipeline, FittedSplit) {
        let table = SyntheticGenerator::new(200, 42).generate().unwrap();
        PreprocessingPipeline::fit(&table, &PipelineConfig::default()).unwrap()
    }

    fn student() -> FeatureMap {
        let mut m = FeatureMap::new();
        m.insert("attendance".into(), 65.5.into());
        m.insert("marks".into(), 45.0.into());
        m.insert("income".into(), "Low".into());
        m.insert("gender".into(), "Male".into());
        m.insert("class".into(), "8th".into());
        m.insert("parent_occupation".into(), "Farmer".into());
        m.insert("location".into(), "Rural".into());
        m
    }

    #[test]
    fn test_feature_order_excludes_ids_and_target() {
        let (p, _) = fitted();
        assert_eq!(
            p.feature_names(),
            ["attendance", "marks", "income", "gender", "class", "parent_occupation", "location"]
        );
    }

    #[test]
    fn test_split_shapes() {
        let (p, split) = fitted();
        assert_eq!(split.train_vectors.len() + split.test_vectors.len(), 200);
        assert_eq!(split.train_vectors.len(), split.train_labels.len());
        assert_eq!(split.test_vectors.len(), split.test_labels.len());
        assert!(split.train_vectors.iter().all(|v| v.len() == p.width()));
    }

    #[test]
    fn test_train_columns_are_standardised() {
        let (p, split) = fitted();
        let n = split.train_vectors.len() as f64;
        for col in 0..p.width() {
            let mean: f64 = split.train_vectors.iter().map(|v| v[col] as f64).sum::<f64>() / n;
            assert!(mean.abs() < 1e-4, "column {col} mean {mean}");
        }
    }

    #[test]
    fn test_transform_one_is_deterministic() {
        let (p, _) = fitted();
        let a = p.transform_one(&student()).unwrap();
        let b = p.transform_one(&student()).unwrap();
        assert_eq!(a.len(), p.width());
        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_missing_key_is_invalid_input() {
        let (p, _) = fitted();
        let mut s = student();
        s.remove("gender");
        let err = p.transform_one(&s).unwrap_err();
        assert!(matches!(err, PreprocessingError::MissingFeature { ref feature } if feature == "gender"));
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
    }

    #[test]
    fn test_unseen_category_is_invalid_input() {
        let (p, _) = fitted();
        let mut s = student();
        s.insert("location".into(), "Mars".into());
        let err = p.transform_one(&s).unwrap_err();
        assert!(matches!(err, PreprocessingError::UnseenCategory { .. }));
        assert_eq!(err.category(), ErrorCategory::InvalidInput);
    }

    #[test]
    fn test_non_numeric_attendance_rejected() {
        let (p, _) = fitted();
        let mut s = student();
        s.insert("attendance".into(), "lots".into());
        assert!(matches!(p.transform_one(&s), Err(PreprocessingError::NotNumeric { .. })));
    }

    #[test]
    fn test_explicit_null_uses_fit_statistics() {
        let (p, _) = fitted();
        let mut s = student();
        s.insert("marks".into(), FeatureValue::Missing);
        let with_null = p.transform_one(&s).unwrap();

        let Some(Imputation::Median(median)) = p.artifact().imputation.get("marks").cloned() else {
            panic!("marks should be imputed with a median");
        };
        s.insert("marks".into(), median.into());
        assert_eq!(with_null, p.transform_one(&s).unwrap());
    }

    #[test]
    fn test_extra_keys_are_ignored() {
        let (p, _) = fitted();
        let mut s = student();
        let base = p.transform_one(&s).unwrap();
        s.insert("student_name".into(), "Asha".into());
        assert_eq!(base, p.transform_one(&s).unwrap());
    }

    #[test]
    fn test_encoder_codes_are_contiguous_and_sorted() {
        let e = CategoryEncoder::fit(["Urban", "Rural", "City", "Rural"]);
        assert_eq!(e.encode("City"), Some(0));
        assert_eq!(e.encode("Urban"), Some(2));
        assert_eq!(e.encode("Rural"), Some(1));
        assert_eq!(e.encode("Mars"), None);
    }

    #[test]
    fn test_fit_imputes_missing_cells() {
        let mut t = RawTable::new(vec!["attendance".into(), "gender".into(), "dropout_risk".into()]);
        t.push_row(vec![10.0.into(), "Male".into(), 0.0.into()]);
        t.push_row(vec![FeatureValue::Missing, "Male".into(), 1.0.into()]);
        t.push_row(vec![30.0.into(), FeatureValue::Missing, 0.0.into()]);
        t.push_row(vec![20.0.into(), "Female".into(), 1.0.into()]);
        let cfg = PipelineConfig { test_fraction: 0.0, ..PipelineConfig::default() };
        let (p, split) = PreprocessingPipeline::fit(&t, &cfg).unwrap();

        assert_eq!(p.artifact().imputation["attendance"], Imputation::Median(20.0));
        assert_eq!(p.artifact().imputation["gender"], Imputation::Mode("Male".into()));
        assert_eq!(split.train_vectors.len(), 4);
        assert!(split.train_vectors.iter().flatten().all(|x| x.is_finite()));
    }

    #[test]
    fn test_fit_rejects_bad_labels_and_empty_tables() {
        let t = RawTable::new(vec!["a".into(), "dropout_risk".into()]);
        assert!(matches!(
            PreprocessingPipeline::fit(&t, &PipelineConfig::default()),
            Err(PreprocessingError::EmptyTable)
        ));

        let mut t = RawTable::new(vec!["a".into(), "dropout_risk".into()]);
        t.push_row(vec![1.0.into(), "maybe".into()]);
        assert!(matches!(
            PreprocessingPipeline::fit(&t, &PipelineConfig::default()),
            Err(PreprocessingError::InvalidLabel { row: 0, .. })
        ));
    }

    #[test]
    fn test_validate_catches_width_mismatch() {
        let (p, _) = fitted();
        let mut artifact = p.artifact().clone();
        artifact.scaler.mean.pop();
        assert!(PreprocessingPipeline::from_artifact(artifact).is_err());
        assert!(PreprocessingPipeline::from_artifact(p.artifact().clone()).is_ok());
    }

    #[test]
    fn test_split_table_reproduces_fitted_split() {
        let table = SyntheticGenerator::new(200, 42).generate().unwrap();
        let cfg = PipelineConfig::default();
        let (p, fitted_split) = PreprocessingPipeline::fit(&table, &cfg).unwrap();
        let again = p.split_table(&table, cfg.test_fraction, cfg.seed).unwrap();
        assert_eq!(again.train_vectors, fitted_split.train_vectors);
        assert_eq!(again.test_vectors, fitted_split.test_vectors);
        assert_eq!(again.train_labels, fitted_split.train_labels);
        assert_eq!(again.test_labels, fitted_split.test_labels);

        let mut unseen = table.clone();
        let loc = unseen.column_index("location").unwrap();
        unseen.rows[0][loc] = "Moon".into();
        assert!(matches!(
            p.split_table(&unseen, cfg.test_fraction, cfg.seed),
            Err(PreprocessingError::UnseenCategory { .. })
        ));
    }

    #[test]
    fn test_non_finite_request_values_are_invalid_input() {
        let (p, _) = fitted();
        for bad in [FeatureValue::from("NaN"), FeatureValue::from("inf"), FeatureValue::from(f64::NAN)] {
            let mut s = student();
            s.insert("attendance".into(), bad);
            let err = p.transform_one(&s).unwrap_err();
            assert!(matches!(err, PreprocessingError::NotNumeric { ref feature, .. } if feature == "attendance"));
            assert_eq!(err.category(), ErrorCategory::InvalidInput);
        }
    }

    #[test]
    fn test_non_finite_csv_cell_fails_fit() {
        let csv = "attendance,gender,dropout_risk\n10,Male,0\nNaN,Female,1\n30,Male,0\n-inf,Female,1\n";
        let table = crate::data::loader::read_table(csv.as_bytes()).unwrap();
        let err = PreprocessingPipeline::fit(&table, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PreprocessingError::NotNumeric { ref feature, .. } if feature == "attendance"));
    }

    #[test]
    fn test_validate_rejects_non_finite_statistics() {
        let (p, _) = fitted();
        let mut artifact = p.artifact().clone();
        artifact.scaler.mean[0] = f64::NAN;
        assert!(PreprocessingPipeline::from_artifact(artifact).is_err());

        let mut artifact = p.artifact().clone();
        artifact.imputation.insert("marks".into(), Imputation::Median(f64::INFINITY));
        assert!(PreprocessingPipeline::from_artifact(artifact).is_err());
    }
}
