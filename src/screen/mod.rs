//! Multi-criteria momentum screen and 1-day ranking.

use crate::config::{MonthKeys, ScreenConfig};
use crate::metrics::{MONTH_BUCKETS, month_back};
use crate::models::{RankedEntry, RankedList, SymbolRecord};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct ScreenRules {
    pub top_n: usize,
    pub min_window_change: f64,
    pub min_monthly_change: f64,
    pub month_keys: MonthKeys,
}

impl From<&ScreenConfig> for ScreenRules {
    fn from(cfg: &ScreenConfig) -> Self {
        Self {
            top_n: cfg.top_n,
            min_window_change: cfg.min_window_change,
            min_monthly_change: cfg.min_monthly_change,
            month_keys: cfg.month_keys,
        }
    }
}

impl Default for ScreenRules {
    fn default() -> Self {
        Self::from(&ScreenConfig::default())
    }
}

impl ScreenRules {
    /// Month numbers a record must carry for `current_month`.
    ///
    /// `None` marks a key that can never match (raw lookups below January).
    pub fn required_months(&self, current_month: u32) -> Vec<Option<u32>> {
        (0..MONTH_BUCKETS)
            .map(|back| match self.month_keys {
                // The year is irrelevant here; only the month number is stored.
                MonthKeys::Rolled => Some(month_back(current_month, 0, back).0),
                MonthKeys::Raw => {
                    let key = current_month as i32 - back as i32;
                    (key > 0).then_some(key as u32)
                }
            })
            .collect()
    }

    /// Whether `record` clears every monthly and short-window threshold.
    pub fn passes(&self, record: &SymbolRecord, current_month: u32) -> bool {
        let months_ok = self.required_months(current_month).into_iter().all(|key| {
            key.and_then(|k| record.monthly.get(&k))
                .is_some_and(|&change| change > self.min_monthly_change)
        });

        months_ok
            && record
                .windows()
                .iter()
                .all(|&(_, change)| change >= self.min_window_change)
    }

    /// Survivors ordered by 1-day change, best first, capped at `top_n`.
    ///
    /// Equal 1-day changes fall back to symbol order.
    pub fn select(
        &self,
        records: &BTreeMap<String, SymbolRecord>,
        current_month: u32,
    ) -> RankedList {
        let mut ranked: RankedList = records
            .values()
            .filter(|r| self.passes(r, current_month))
            .map(|r| RankedEntry {
                symbol: r.symbol.clone(),
                one_day: r.one_day,
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.one_day
                .total_cmp(&a.one_day)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        ranked.truncate(self.top_n);
        ranked
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::MonthlyChangeMap;

    pub(crate) fn record(symbol: &str, windows: [f64; 4], months: &[(u32, f64)]) -> SymbolRecord {
        SymbolRecord {
            symbol: symbol.to_string(),
            one_day: windows[0],
            one_week: windows[1],
            fourteen_days: windows[2],
            one_month: windows[3],
            monthly: months.iter().copied().collect::<MonthlyChangeMap>(),
        }
    }

    fn book(records: Vec<SymbolRecord>) -> BTreeMap<String, SymbolRecord> {
        records.into_iter().map(|r| (r.symbol.clone(), r)).collect()
    }

    const JUNE_UP: [(u32, f64); 3] = [(4, 2.0), (5, 3.0), (6, 4.0)];

    #[test]
    fn test_required_months() {
        let rolled = ScreenRules::default();
        assert_eq!(rolled.required_months(6), vec![Some(6), Some(5), Some(4)]);
        assert_eq!(rolled.required_months(1), vec![Some(1), Some(12), Some(11)]);

        let raw = ScreenRules {
            month_keys: MonthKeys::Raw,
            ..ScreenRules::default()
        };
        assert_eq!(raw.required_months(6), vec![Some(6), Some(5), Some(4)]);
        assert_eq!(raw.required_months(2), vec![Some(2), Some(1), None]);
    }

    #[test]
    fn test_missing_month_excludes_even_if_rest_positive() {
        let rules = ScreenRules::default();
        let r = record("GAP", [5.0, 5.0, 5.0, 5.0], &[(4, 2.0), (6, 4.0)]);
        assert!(!rules.passes(&r, 6));
        assert!(rules.select(&book(vec![r]), 6).is_empty());
    }

    #[test]
    fn test_monthly_change_must_be_strictly_positive() {
        let rules = ScreenRules::default();
        let flat = record("FLAT", [5.0; 4], &[(4, 2.0), (5, 0.0), (6, 4.0)]);
        let down = record("DOWN", [5.0; 4], &[(4, 2.0), (5, -0.5), (6, 4.0)]);
        assert!(!rules.passes(&flat, 6));
        assert!(!rules.passes(&down, 6));
    }

    #[test]
    fn test_window_threshold_is_inclusive() {
        let rules = ScreenRules::default();
        for slot in 0..4 {
            let mut below = [5.0; 4];
            below[slot] = 0.999;
            assert!(!rules.passes(&record("X", below, &JUNE_UP), 6), "slot {slot}");

            let mut at = [5.0; 4];
            at[slot] = 1.000;
            assert!(rules.passes(&record("X", at, &JUNE_UP), 6), "slot {slot}");
        }
    }

    #[test]
    fn test_january_lookup_policies() {
        let jan = record("WINTER", [2.0; 4], &[(11, 1.0), (12, 1.0), (1, 1.0)]);

        assert!(ScreenRules::default().passes(&jan, 1));

        let raw = ScreenRules {
            month_keys: MonthKeys::Raw,
            ..ScreenRules::default()
        };
        assert!(!raw.passes(&jan, 1));
    }

    #[test]
    fn test_select_orders_by_one_day_and_caps() {
        let rules = ScreenRules::default();
        let records: Vec<SymbolRecord> = (0..40)
            .map(|i| record(&format!("S{i:02}"), [1.0 + i as f64 * 0.5, 2.0, 2.0, 2.0], &JUNE_UP))
            .collect();

        let ranked = rules.select(&book(records), 6);

        assert_eq!(ranked.len(), 28);
        assert_eq!(ranked[0].symbol, "S39");
        assert!(ranked.windows(2).all(|w| w[0].one_day > w[1].one_day));
        assert_eq!(ranked.last().map(|e| e.symbol.as_str()), Some("S12"));
    }

    #[test]
    fn test_select_ties_break_by_symbol() {
        let rules = ScreenRules::default();
        let ranked = rules.select(
            &book(vec![
                record("ZZ", [3.0; 4], &JUNE_UP),
                record("AA", [3.0; 4], &JUNE_UP),
                record("MM", [4.0; 4], &JUNE_UP),
            ]),
            6,
        );
        let order: Vec<&str> = ranked.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(order, vec!["MM", "AA", "ZZ"]);
    }

    #[test]
    fn test_select_respects_custom_top_n() {
        let rules = ScreenRules {
            top_n: 1,
            ..ScreenRules::default()
        };
        let ranked = rules.select(
            &book(vec![
                record("A", [5.0; 4], &JUNE_UP),
                record("B", [2.0; 4], &JUNE_UP),
            ]),
            6,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].symbol, "A");
    }
}
