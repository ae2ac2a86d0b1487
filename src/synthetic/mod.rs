//! Synthetic customer tables
//!
//! Generates raw churn tables in the input CSV layout with a known signal:
//! customers with many service calls churn, and so do heavy daytime users on
//! the international plan. Used for demos and tests.

use crate::error::Result;
use crate::preprocessing::schema::{LABEL_COLUMN, REDUNDANT_COLUMNS, REGION_COLUMN};
use polars::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::fs::File;
use std::path::Path;

/// Seeded generator of raw customer tables
#[derive(Debug, Clone)]
pub struct ChurnDataGenerator {
    n_samples: usize,
    n_regions: usize,
    /// Probability that a numeric cell is left empty
    missing_rate: f64,
    /// Probability that a label is flipped
    label_noise: f64,
    seed: u64,
}

impl Default for ChurnDataGenerator {
    fn default() -> Self {
        Self {
            n_samples: 500,
            n_regions: 7,
            missing_rate: 0.0,
            label_noise: 0.02,
            seed: 42,
        }
    }
}

impl ChurnDataGenerator {
    pub fn new(n_samples: usize, seed: u64) -> Self {
        Self {
            n_samples,
            seed,
            ..Self::default()
        }
    }

    pub fn with_regions(mut self, n_regions: usize) -> Self {
        self.n_regions = n_regions.max(1);
        self
    }

    pub fn with_missing_rate(mut self, rate: f64) -> Self {
        self.missing_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_label_noise(mut self, noise: f64) -> Self {
        self.label_noise = noise.clamp(0.0, 1.0);
        self
    }

    /// Generate a table. Every region and both plan values appear at least once
    /// when `n_samples` allows it.
    pub fn generate(&self) -> Result<DataFrame> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let n = self.n_samples;

        let mut state = Vec::with_capacity(n);
        let mut area = Vec::with_capacity(n);
        let mut intl_plan = Vec::with_capacity(n);
        let mut vmail_plan = Vec::with_capacity(n);
        let mut churn = Vec::with_capacity(n);

        let mut account_length = Vec::with_capacity(n);
        let mut vmail_messages = Vec::with_capacity(n);
        let mut service_calls = Vec::with_capacity(n);
        // minutes and calls for day, eve, night, intl
        let mut minutes: [Vec<f64>; 4] = Default::default();
        let mut calls: [Vec<i64>; 4] = Default::default();

        for i in 0..n {
            let region = if i < self.n_regions { i } else { rng.gen_range(0..self.n_regions) };
            let intl = if i < 2 { i == 0 } else { rng.gen_bool(0.15) };
            let vmail = if i < 2 { i == 1 } else { rng.gen_bool(0.3) };

            let cs_calls: i64 = if rng.gen_bool(0.8) {
                rng.gen_range(0..=3)
            } else {
                rng.gen_range(4..=9)
            };
            let day = rng.gen_range(60.0..330.0);

            let mut churned = cs_calls >= 4 || (intl && day > 230.0);
            if rng.gen_bool(self.label_noise) {
                churned = !churned;
            }

            state.push(region as i64);
            area.push([408_i64, 415, 510][rng.gen_range(0..3)]);
            intl_plan.push(if intl { "Yes" } else { "No" });
            vmail_plan.push(if vmail { "Yes" } else { "No" });
            churn.push(churned);

            account_length.push(rng.gen_range(1..=240_i64));
            vmail_messages.push(if vmail { rng.gen_range(5..=50_i64) } else { 0 });
            service_calls.push(cs_calls);

            minutes[0].push(day);
            minutes[1].push(rng.gen_range(50.0..350.0));
            minutes[2].push(rng.gen_range(50.0..350.0));
            minutes[3].push(rng.gen_range(0.0..20.0));
            for slot in calls.iter_mut().take(3) {
                slot.push(rng.gen_range(40..=160));
            }
            calls[3].push(rng.gen_range(0..=15));
        }

        let rates = [0.17, 0.085, 0.045, 0.27];
        let charges: Vec<Vec<f64>> = minutes
            .iter()
            .zip(rates)
            .map(|(m, rate)| m.iter().map(|v| (v * rate * 100.0).round() / 100.0).collect())
            .collect();

        let mut columns: Vec<Column> = vec![
            Series::new(REGION_COLUMN.into(), state).into(),
            self.counts("Account length", account_length, &mut rng),
            Series::new("Area code".into(), area).into(),
            Series::new("International plan".into(), intl_plan).into(),
            Series::new("Voice mail plan".into(), vmail_plan).into(),
            self.counts("Number vmail messages", vmail_messages, &mut rng),
        ];

        let periods = ["day", "eve", "night", "intl"];
        for (idx, period) in periods.iter().enumerate() {
            columns.push(self.minutes(&format!("Total {} minutes", period), &minutes[idx], &mut rng));
            columns.push(self.counts(&format!("Total {} calls", period), calls[idx].clone(), &mut rng));
            columns.push(Series::new(REDUNDANT_COLUMNS[idx].into(), charges[idx].clone()).into());
        }

        columns.push(self.counts("Customer service calls", service_calls, &mut rng));
        columns.push(Series::new(LABEL_COLUMN.into(), churn).into());

        Ok(DataFrame::new(columns)?)
    }

    /// Generate a table and write it as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut df = self.generate()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).finish(&mut df)?;
        Ok(())
    }

    fn counts(&self, name: &str, values: Vec<i64>, rng: &mut Xoshiro256PlusPlus) -> Column {
        let values: Vec<Option<i64>> = values
            .into_iter()
            .map(|v| self.keep(rng).then_some(v))
            .collect();
        Series::new(name.into(), values).into()
    }

    fn minutes(&self, name: &str, values: &[f64], rng: &mut Xoshiro256PlusPlus) -> Column {
        let values: Vec<Option<f64>> = values
            .iter()
            .map(|&v| self.keep(rng).then_some((v * 10.0).round() / 10.0))
            .collect();
        Series::new(name.into(), values).into()
    }

    fn keep(&self, rng: &mut Xoshiro256PlusPlus) -> bool {
        self.missing_rate == 0.0 || !rng.gen_bool(self.missing_rate)
    }
}
