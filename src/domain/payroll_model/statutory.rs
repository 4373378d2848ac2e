//! Statutory rate tables: PAYE brackets, SSNIT tiers, tax reliefs, and the
//! overtime/bonus tax configuration (spec.md §3, §6).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxBracket {
    pub order: i32,
    pub min: Decimal,
    pub max: Option<Decimal>,
    pub rate_pct: Decimal,
    pub cumulative_tax: Decimal,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsnitTier {
    Tier1,
    Tier2,
    Tier3,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SsnitRate {
    pub tier: SsnitTier,
    pub employer_pct: Decimal,
    pub employee_pct: Decimal,
    pub max_contribution: Option<Decimal>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliefKind {
    Fixed,
    Percentage,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxRelief {
    pub kind: ReliefKind,
    pub amount: Option<Decimal>,
    pub percentage: Option<Decimal>,
    pub max: Option<Decimal>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

/// Parameters for overtime and bonus tax segregation (spec.md §4.G/§4.H).
/// Defaults are the source's hard-coded constants.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OvertimeBonusTaxConfig {
    pub overtime_annual_threshold: Decimal,
    pub overtime_basic_pct_threshold: Decimal,
    pub overtime_rate_below: Decimal,
    pub overtime_rate_above: Decimal,
    pub overtime_non_resident_rate: Decimal,

    pub bonus_annual_basic_pct_threshold: Decimal,
    pub bonus_flat_rate: Decimal,
    pub bonus_excess_to_paye: bool,
    pub bonus_non_resident_rate: Decimal,
}

impl Default for OvertimeBonusTaxConfig {
    fn default() -> Self {
        Self {
            overtime_annual_threshold: dec!(18000),
            overtime_basic_pct_threshold: dec!(50),
            overtime_rate_below: dec!(5),
            overtime_rate_above: dec!(10),
            overtime_non_resident_rate: dec!(20),

            bonus_annual_basic_pct_threshold: dec!(15),
            bonus_flat_rate: dec!(5),
            bonus_excess_to_paye: true,
            bonus_non_resident_rate: dec!(20),
        }
    }
}

/// 2026 Ghana PAYE monthly bands (spec.md §6).
pub fn ghana_2026_monthly_brackets(effective_from: NaiveDate) -> Vec<TaxBracket> {
    let bounds: [(Decimal, Option<Decimal>, Decimal); 7] = [
        (dec!(0), Some(dec!(490)), dec!(0)),
        (dec!(490), Some(dec!(600)), dec!(5)),
        (dec!(600), Some(dec!(730)), dec!(10)),
        (dec!(730), Some(dec!(3896.67)), dec!(17.5)),
        (dec!(3896.67), Some(dec!(19896.67)), dec!(25)),
        (dec!(19896.67), Some(dec!(50416.67)), dec!(30)),
        (dec!(50416.67), None, dec!(35)),
    ];

    let mut cumulative = Decimal::ZERO;
    bounds
        .into_iter()
        .enumerate()
        .map(|(i, (min, max, rate))| {
            let bracket = TaxBracket {
                order: i as i32,
                min,
                max,
                rate_pct: rate,
                cumulative_tax: cumulative,
                effective_from,
                effective_to: None,
            };
            if let Some(max) = max {
                cumulative += (max - min) * rate / Decimal::from(100);
            }
            bracket
        })
        .collect()
}

/// SSNIT Tier 1/2/3 rates (spec.md §6).
pub fn ghana_ssnit_rates(effective_from: NaiveDate) -> Vec<SsnitRate> {
    vec![
        SsnitRate {
            tier: SsnitTier::Tier1,
            employer_pct: dec!(13),
            employee_pct: dec!(5.5),
            max_contribution: None,
            effective_from,
            effective_to: None,
        },
        SsnitRate {
            tier: SsnitTier::Tier2,
            employer_pct: dec!(0),
            employee_pct: dec!(5),
            max_contribution: None,
            effective_from,
            effective_to: None,
        },
        SsnitRate {
            tier: SsnitTier::Tier3,
            employer_pct: dec!(5),
            employee_pct: dec!(5),
            max_contribution: None,
            effective_from,
            effective_to: None,
        },
    ]
}

/// The "active at D" predicate used across every statutory/salary/
/// transaction read (spec.md §9 "Time-windowed lookups").
pub fn active_at(effective_from: NaiveDate, effective_to: Option<NaiveDate>, as_of: NaiveDate) -> bool {
    effective_from <= as_of && effective_to.map(|to| to >= as_of).unwrap_or(true)
}
