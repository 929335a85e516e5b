// ============================================================
// Layer 4 — Synthetic Student Generator
// ============================================================
// Produces a rule-labelled dataset for Jilha Parishad school
// students so the whole pipeline can be trained and tested
// without real records.
//
// Label rules (High risk = 1), applied in order, any match wins:
//   attendance < 60 OR marks < 40
//   income = Low AND attendance < 70
//   location = Rural AND marks < 50 AND attendance < 75
//
// Sampling is driven by a seeded ChaCha RNG so the same seed
// always yields the same table.

use anyhow::Result;
use rand::{distributions::WeightedIndex, prelude::*};
use rand_chacha::ChaCha8Rng;

use crate::domain::student::{FeatureValue, RawTable};
use crate::domain::traits::TableSource;

/// Category pools with sampling weights.
const INCOME_WEIGHTS: [(&str, f64); 3] = [("Low", 0.6), ("Medium", 0.3), ("High", 0.1)];
const GENDERS: [&str; 2] = ["Male", "Female"];
const CLASSES: [&str; 6] = ["5th", "6th", "7th", "8th", "9th", "10th"];
const OCCUPATION_WEIGHTS: [(&str, f64); 5] = [
    ("Farmer", 0.4),
    ("Labor", 0.3),
    ("Small Business", 0.15),
    ("Government Job", 0.05),
    ("Daily Wage", 0.1),
];
const LOCATION_WEIGHTS: [(&str, f64); 3] = [("Rural", 0.7), ("Urban", 0.2), ("City", 0.1)];

pub const SYNTHETIC_COLUMNS: [&str; 10] = [
    "student_name",
    "roll_no",
    "attendance",
    "marks",
    "income",
    "gender",
    "class",
    "parent_occupation",
    "location",
    "dropout_risk",
];

/// The documented labelling rule. Returns 1 for High risk.
pub fn synthetic_label(attendance: f64, marks: f64, income: &str, location: &str) -> u8 {
    let high = attendance < 60.0
        || marks < 40.0
        || (income == "Low" && attendance < 70.0)
        || (location == "Rural" && marks < 50.0 && attendance < 75.0);
    u8::from(high)
}

/// Seeded generator of synthetic student tables.
#[derive(Debug, Clone)]
pub struct SyntheticGenerator {
    samples: usize,
    seed:    u64,
}

impl SyntheticGenerator {
    pub fn new(samples: usize, seed: u64) -> Self {
        Self { samples, seed }
    }

    pub fn generate(&self) -> Result<RawTable> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let income_dist     = weighted(&INCOME_WEIGHTS)?;
        let occupation_dist = weighted(&OCCUPATION_WEIGHTS)?;
        let location_dist   = weighted(&LOCATION_WEIGHTS)?;

        let mut table = RawTable::new(SYNTHETIC_COLUMNS.iter().map(|c| c.to_string()).collect());

        for i in 1..=self.samples {
            let attendance: f64 = rng.gen_range(40.0..100.0);
            let marks: f64      = rng.gen_range(20.0..100.0);
            let income     = INCOME_WEIGHTS[income_dist.sample(&mut rng)].0;
            let gender     = GENDERS[rng.gen_range(0..GENDERS.len())];
            let class      = CLASSES[rng.gen_range(0..CLASSES.len())];
            let occupation = OCCUPATION_WEIGHTS[occupation_dist.sample(&mut rng)].0;
            let location   = LOCATION_WEIGHTS[location_dist.sample(&mut rng)].0;
            let label      = synthetic_label(attendance, marks, income, location);

            table.push_row(vec![
                FeatureValue::Text(format!("Student_{i}")),
                FeatureValue::Text(format!("JP{i:05}")),
                FeatureValue::Number(attendance),
                FeatureValue::Number(marks),
                income.into(),
                gender.into(),
                class.into(),
                occupation.into(),
                location.into(),
                FeatureValue::Number(f64::from(label)),
            ]);
        }

        tracing::info!(
            "Generated {} synthetic students (seed={})",
            self.samples,
            self.seed
        );
        Ok(table)
    }
}

impl TableSource for SyntheticGenerator {
    fn load_table(&self) -> Result<RawTable> {
        self.generate()
    }
}

fn weighted(pool: &[(&str, f64)]) -> Result<WeightedIndex<f64>> {
    Ok(WeightedIndex::new(pool.iter().map(|(_, w)| *w))?)
}
