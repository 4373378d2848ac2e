//! Statutory Rate Book (§4.A): a read-mostly, date-indexed store over PAYE
//! brackets, SSNIT tiers, tax reliefs, and the overtime/bonus config.
//!
//! Grounded on `tax_service.py`'s cached `@property` accessors — this is the
//! Rust equivalent of "cache per period", generalised to cache per
//! `(kind, as_of)` as spec.md §4.A directs, using `dashmap` for concurrent
//! read-mostly access the way the teacher uses it for progress keys.

use chrono::NaiveDate;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::payroll_model::statutory::{
    active_at, ghana_2026_monthly_brackets, ghana_ssnit_rates, OvertimeBonusTaxConfig, SsnitRate,
    SsnitTier, TaxBracket, TaxRelief,
};
use crate::payroll::error::{PayrollError, PayrollResult};

#[derive(Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Brackets(NaiveDate),
    Ssnit(NaiveDate),
    Reliefs(NaiveDate),
}

/// The statutory data an instance of the book was seeded with, plus a cache
/// of resolved "active as of D" views. The book itself never mutates rows
/// mid-compute (spec.md §4.A: "the Rate Book never mutates during a run").
pub struct RateBook {
    brackets: Vec<TaxBracket>,
    ssnit_rates: Vec<SsnitRate>,
    reliefs: Vec<TaxRelief>,
    overtime_bonus_config: OvertimeBonusTaxConfig,
    bracket_cache: DashMap<NaiveDate, Arc<Vec<TaxBracket>>>,
    ssnit_cache: DashMap<NaiveDate, Arc<HashMap<SsnitTier, SsnitRate>>>,
    relief_cache: DashMap<NaiveDate, Arc<Vec<TaxRelief>>>,
}

impl RateBook {
    pub fn new(
        brackets: Vec<TaxBracket>,
        ssnit_rates: Vec<SsnitRate>,
        reliefs: Vec<TaxRelief>,
        overtime_bonus_config: OvertimeBonusTaxConfig,
    ) -> Self {
        Self {
            brackets,
            ssnit_rates,
            reliefs,
            overtime_bonus_config,
            bracket_cache: DashMap::new(),
            ssnit_cache: DashMap::new(),
            relief_cache: DashMap::new(),
        }
    }

    /// The seed data from spec.md §6: Ghana 2026 monthly PAYE bands, SSNIT
    /// Tier 1/2/3 rates, and default overtime/bonus config. No reliefs are
    /// seeded by default — tenants configure their own.
    pub fn seed_ghana_2026(effective_from: NaiveDate) -> Self {
        Self::new(
            ghana_2026_monthly_brackets(effective_from),
            ghana_ssnit_rates(effective_from),
            Vec::new(),
            OvertimeBonusTaxConfig::default(),
        )
    }

    /// `active(PAYE, as_of)` — ordered by `order`, then `min` (spec.md §4.A).
    pub fn active_brackets(&self, as_of: NaiveDate) -> PayrollResult<Arc<Vec<TaxBracket>>> {
        if let Some(cached) = self.bracket_cache.get(&as_of) {
            return Ok(cached.clone());
        }
        let mut rows: Vec<TaxBracket> = self
            .brackets
            .iter()
            .filter(|b| active_at(b.effective_from, b.effective_to, as_of))
            .cloned()
            .collect();
        if rows.is_empty() {
            return Err(PayrollError::RateResolution {
                kind: "PAYE bracket".into(),
                as_of,
            });
        }
        rows.sort_by(|a, b| a.order.cmp(&b.order).then(a.min.cmp(&b.min)));
        let arc = Arc::new(rows);
        self.bracket_cache.insert(as_of, arc.clone());
        Ok(arc)
    }

    /// `active(SSNIT, as_of)` keyed by tier (spec.md §4.A).
    pub fn active_ssnit(&self, as_of: NaiveDate) -> PayrollResult<Arc<HashMap<SsnitTier, SsnitRate>>> {
        if let Some(cached) = self.ssnit_cache.get(&as_of) {
            return Ok(cached.clone());
        }
        let map: HashMap<SsnitTier, SsnitRate> = self
            .ssnit_rates
            .iter()
            .filter(|r| active_at(r.effective_from, r.effective_to, as_of))
            .map(|r| (r.tier, r.clone()))
            .collect();
        if map.is_empty() {
            return Err(PayrollError::RateResolution {
                kind: "SSNIT rate".into(),
                as_of,
            });
        }
        let arc = Arc::new(map);
        self.ssnit_cache.insert(as_of, arc.clone());
        Ok(arc)
    }

    pub fn active_reliefs(&self, as_of: NaiveDate) -> Arc<Vec<TaxRelief>> {
        if let Some(cached) = self.relief_cache.get(&as_of) {
            return cached.clone();
        }
        let rows: Vec<TaxRelief> = self
            .reliefs
            .iter()
            .filter(|r| active_at(r.effective_from, r.effective_to, as_of))
            .cloned()
            .collect();
        let arc = Arc::new(rows);
        self.relief_cache.insert(as_of, arc.clone());
        arc
    }

    pub fn overtime_bonus_config(&self) -> OvertimeBonusTaxConfig {
        self.overtime_bonus_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn active_brackets_are_ordered_and_cached() {
        let book = RateBook::seed_ghana_2026(date(2026, 1, 1));
        let first = book.active_brackets(date(2026, 1, 31)).unwrap();
        assert_eq!(first.len(), 7);
        assert!(first.windows(2).all(|w| w[0].order < w[1].order));
        let second = book.active_brackets(date(2026, 1, 31)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn missing_rate_is_rate_resolution_error() {
        let book = RateBook::new(vec![], vec![], vec![], OvertimeBonusTaxConfig::default());
        assert!(matches!(
            book.active_brackets(date(2026, 1, 1)),
            Err(PayrollError::RateResolution { .. })
        ));
    }
}
