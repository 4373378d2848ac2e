//! Salary Structure: Band → Level → Notch, a three-level ordered hierarchy.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalaryBand {
    pub id: Uuid,
    pub name: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalaryLevel {
    pub id: Uuid,
    pub band_id: Uuid,
    pub name: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalaryNotch {
    pub id: Uuid,
    pub level_id: Uuid,
    pub name: String,
    pub amount: Decimal,
}

/// Job grade. Distinct from the Band/Level/Notch pay scale: a grade may
/// optionally link straight to a Band for GRADE/BAND transaction targeting
/// (spec.md §4.C step 2 — `employee.grade.salary_band`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Grade {
    pub id: Uuid,
    pub name: String,
    pub salary_band_id: Option<Uuid>,
}

/// Scope over which a Global Salary Increment scales/shifts notches
/// (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementScope {
    All,
    Band(Uuid),
    Level(Uuid),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementKind {
    PercentageScale,
    FlatShift,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalaryIncrementRequest {
    pub id: Uuid,
    pub scope: IncrementScope,
    pub kind: IncrementKind,
    /// Percentage (e.g. 5.0 for 5%) or flat amount, depending on `kind`.
    pub value: Decimal,
    pub effective_from: NaiveDate,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Applies a percentage scale or flat shift to every notch in scope, then
/// cascades the new min/max up to the owning Level and Band (spec.md §3:
/// "Bands/Levels carry min/max that must equal aggregate of their
/// children").
pub fn apply_increment(
    request: &SalaryIncrementRequest,
    notches: &mut [SalaryNotch],
    levels: &mut [SalaryLevel],
    bands: &mut [SalaryBand],
) {
    for notch in notches.iter_mut() {
        let in_scope = match request.scope {
            IncrementScope::All => true,
            IncrementScope::Level(level_id) => notch.level_id == level_id,
            IncrementScope::Band(band_id) => levels
                .iter()
                .find(|l| l.id == notch.level_id)
                .map(|l| l.band_id == band_id)
                .unwrap_or(false),
        };
        if !in_scope {
            continue;
        }
        notch.amount = match request.kind {
            IncrementKind::PercentageScale => {
                notch.amount + (notch.amount * request.value / Decimal::from(100))
            }
            IncrementKind::FlatShift => notch.amount + request.value,
        };
    }

    for level in levels.iter_mut() {
        let level_notches: Vec<&SalaryNotch> =
            notches.iter().filter(|n| n.level_id == level.id).collect();
        if let (Some(min), Some(max)) = (
            level_notches.iter().map(|n| n.amount).min(),
            level_notches.iter().map(|n| n.amount).max(),
        ) {
            level.min_amount = min;
            level.max_amount = max;
        }
    }

    for band in bands.iter_mut() {
        let band_levels: Vec<&SalaryLevel> =
            levels.iter().filter(|l| l.band_id == band.id).collect();
        if let (Some(min), Some(max)) = (
            band_levels.iter().map(|l| l.min_amount).min(),
            band_levels.iter().map(|l| l.max_amount).max(),
        ) {
            band.min_amount = min;
            band.max_amount = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percentage_scale_cascades_to_level_and_band() {
        let band_id = Uuid::new_v4();
        let level_id = Uuid::new_v4();
        let mut bands = vec![SalaryBand {
            id: band_id,
            name: "B1".into(),
            min_amount: dec!(1000),
            max_amount: dec!(2000),
        }];
        let mut levels = vec![SalaryLevel {
            id: level_id,
            band_id,
            name: "L1".into(),
            min_amount: dec!(1000),
            max_amount: dec!(2000),
        }];
        let mut notches = vec![
            SalaryNotch { id: Uuid::new_v4(), level_id, name: "N1".into(), amount: dec!(1000) },
            SalaryNotch { id: Uuid::new_v4(), level_id, name: "N2".into(), amount: dec!(2000) },
        ];

        let req = SalaryIncrementRequest {
            id: Uuid::new_v4(),
            scope: IncrementScope::All,
            kind: IncrementKind::PercentageScale,
            value: dec!(10),
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            applied_at: None,
        };

        apply_increment(&req, &mut notches, &mut levels, &mut bands);

        assert_eq!(notches[0].amount, dec!(1100.0));
        assert_eq!(notches[1].amount, dec!(2200.0));
        assert_eq!(levels[0].min_amount, dec!(1100.0));
        assert_eq!(levels[0].max_amount, dec!(2200.0));
        assert_eq!(bands[0].min_amount, dec!(1100.0));
        assert_eq!(bands[0].max_amount, dec!(2200.0));
    }
}
