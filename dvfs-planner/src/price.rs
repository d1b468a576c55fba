/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Hourly, cyclic electricity prices and energy-cost integration.
//!
//! A [`PriceSchedule`] holds one price per kWh for each hour of a cycle.
//! Hour `h` of planning time uses `prices[h mod len]`, so a 24-entry schedule
//! repeats daily.  Costs are integrated segment by segment across hour
//! boundaries:
//!
//! ```text
//!  t0        3600       7200    t1
//!  |---p0----|----p1----|--p2---|
//!  cost = W·(3600−t0)·p0 + W·3600·p1 + W·(t1−7200)·p2     (W·s → kWh)
//! ```
//!
//! Integration is additive: for any `t0 ≤ tm ≤ t1`,
//! `cost(t0, t1) = cost(t0, tm) + cost(tm, t1)`.

use crate::error::ModelError;

/// Length of one price slot, in seconds.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Watt-seconds (joules) per kWh.
const JOULES_PER_KWH: f64 = 3.6e6;

/// Per-site hourly electricity prices, repeating every `len` hours.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSchedule {
    hourly: Vec<f64>,
    cycle_sum: f64,
}

impl PriceSchedule {
    /// Builds a schedule from per-hour prices (currency per kWh).
    ///
    /// # Errors
    /// [`ModelError::EmptyPriceSchedule`] for an empty vector and
    /// [`ModelError::InvalidPrice`] for negative or non-finite entries.
    pub fn new(hourly: Vec<f64>) -> Result<Self, ModelError> {
        if hourly.is_empty() {
            return Err(ModelError::EmptyPriceSchedule);
        }
        if let Some((hour, &price)) = hourly
            .iter()
            .enumerate()
            .find(|(_, p)| !p.is_finite() || **p < 0.0)
        {
            return Err(ModelError::InvalidPrice { hour, price });
        }
        let cycle_sum: f64 = hourly.iter().sum();
        Ok(Self { hourly, cycle_sum })
    }

    /// A single price for every hour.
    pub fn flat(price: f64) -> Result<Self, ModelError> {
        Self::new(vec![price])
    }

    pub fn hourly(&self) -> &[f64] {
        &self.hourly
    }

    /// Mean price over one full cycle.
    pub fn mean_price(&self) -> f64 {
        self.cycle_sum / self.hourly.len() as f64
    }

    fn hour_index(&self, t: f64) -> usize {
        let hour = (t / SECONDS_PER_HOUR).floor() as i64;
        hour.rem_euclid(self.hourly.len() as i64) as usize
    }

    /// Price in effect at time `t` (seconds).
    pub fn price_at(&self, t: f64) -> f64 {
        self.hourly[self.hour_index(t)]
    }

    /// `∫ price(t) dt` over `[start, end)`, in price·seconds.
    fn price_seconds(&self, start: f64, end: f64) -> f64 {
        if !(end > start) {
            return 0.0;
        }
        if !end.is_finite() {
            return f64::INFINITY;
        }

        let cycle = SECONDS_PER_HOUR * self.hourly.len() as f64;
        let mut total = 0.0;
        let mut t = start;

        // Whole cycles in closed form; the phase at `t` is unchanged.
        let cycles = ((end - start) / cycle).floor();
        if cycles >= 1.0 {
            total += cycles * self.cycle_sum * SECONDS_PER_HOUR;
            t += cycles * cycle;
        }

        while t < end {
            let boundary = ((t / SECONDS_PER_HOUR).floor() + 1.0) * SECONDS_PER_HOUR;
            let segment_end = boundary.min(end);
            total += (segment_end - t) * self.price_at(t);
            t = segment_end;
        }
        total
    }

    /// Electricity cost of drawing `power_watts` over `[start, end)`.
    ///
    /// Returns `0.0` for empty or inverted intervals.
    pub fn energy_cost(&self, start: f64, end: f64, power_watts: f64) -> f64 {
        if power_watts == 0.0 {
            return 0.0;
        }
        power_watts * self.price_seconds(start, end) / JOULES_PER_KWH
    }

    /// Time-weighted mean price over `[start, end)`.
    ///
    /// An empty interval yields the price at `start`; an unbounded one
    /// yields the cycle mean.
    pub fn average_price(&self, start: f64, end: f64) -> f64 {
        if !(end > start) {
            return self.price_at(start);
        }
        if !end.is_finite() {
            return self.mean_price();
        }
        self.price_seconds(start, end) / (end - start)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn day_night() -> PriceSchedule {
        // 12 cheap hours followed by 12 expensive ones
        let mut hourly = vec![0.10; 12];
        hourly.extend(vec![0.30; 12]);
        PriceSchedule::new(hourly).unwrap()
    }

    #[test]
    fn rejects_empty_and_negative_prices() {
        assert!(matches!(
            PriceSchedule::new(vec![]),
            Err(ModelError::EmptyPriceSchedule)
        ));
        assert!(matches!(
            PriceSchedule::new(vec![0.1, -0.2]),
            Err(ModelError::InvalidPrice { hour: 1, .. })
        ));
        assert!(PriceSchedule::new(vec![f64::NAN]).is_err());
    }

    #[test]
    fn hour_index_wraps_around_the_cycle() {
        let p = PriceSchedule::new(vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(p.price_at(0.0), 1.0);
        assert_eq!(p.price_at(3599.9), 1.0);
        assert_eq!(p.price_at(3600.0), 2.0);
        assert_eq!(p.price_at(3.0 * 3600.0), 1.0);
        assert_eq!(p.price_at(5.0 * 3600.0 + 1.0), 3.0);
    }

    #[test]
    fn cost_within_a_single_hour() {
        let p = PriceSchedule::flat(0.2).unwrap();
        // 1 kW for 30 min at 0.2/kWh
        let cost = p.energy_cost(0.0, 1800.0, 1000.0);
        assert!((cost - 0.1).abs() < EPS);
    }

    #[test]
    fn cost_straddling_a_price_change() {
        let p = day_night();
        // 1 kW, 30 min cheap + 30 min expensive
        let start = 11.5 * 3600.0;
        let cost = p.energy_cost(start, start + 3600.0, 1000.0);
        assert!((cost - (0.05 + 0.15)).abs() < EPS, "cost = {cost}");
    }

    #[test]
    fn empty_or_inverted_interval_costs_nothing() {
        let p = day_night();
        assert_eq!(p.energy_cost(100.0, 100.0, 500.0), 0.0);
        assert_eq!(p.energy_cost(200.0, 100.0, 500.0), 0.0);
        assert_eq!(p.energy_cost(0.0, 1000.0, 0.0), 0.0);
    }

    #[test]
    fn cost_is_additive_over_any_split_point() {
        let p = day_night();
        let (t0, t1) = (1234.5, 3.0 * 86_400.0 + 777.0);
        let whole = p.energy_cost(t0, t1, 250.0);
        for tm in [t0, 3600.0, 40_000.0, 43_200.0, 86_400.0 + 13.0, 200_000.0, t1] {
            let split = p.energy_cost(t0, tm, 250.0) + p.energy_cost(tm, t1, 250.0);
            assert!(
                (whole - split).abs() < 1e-6 * whole.max(1.0),
                "split at {tm}: {whole} vs {split}"
            );
        }
    }

    #[test]
    fn whole_cycles_match_segment_walk() {
        let p = day_night();
        let day = 86_400.0;
        let one_day = p.energy_cost(0.0, day, 1000.0);
        assert!((one_day - (12.0 * 0.10 + 12.0 * 0.30)).abs() < EPS);
        let three_days = p.energy_cost(500.0, 500.0 + 3.0 * day, 1000.0);
        assert!((three_days - 3.0 * one_day).abs() < 1e-9);
    }

    #[test]
    fn average_price_is_time_weighted() {
        let p = day_night();
        let avg = p.average_price(11.0 * 3600.0, 14.0 * 3600.0);
        assert!((avg - (0.10 + 0.30 + 0.30) / 3.0).abs() < EPS);
        assert_eq!(p.average_price(0.0, 0.0), 0.10);
        assert!((p.average_price(0.0, f64::INFINITY) - 0.20).abs() < EPS);
    }
}
