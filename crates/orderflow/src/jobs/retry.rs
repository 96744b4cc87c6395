use rand::Rng;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub base_ms: i64,
    pub max_ms: i64,
    pub jitter_pct: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_ms: 2000,
            max_ms: 15 * 60 * 1000,
            jitter_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    NonRetryable,
}

/// Delay before attempt `attempt_no + 1`, i.e. `base * 2^(attempt_no - 1)`
/// for the attempt that just failed: 2s, 4s, 8s, 16s with the default base.
pub fn next_delay_ms(attempt_no: i32, cfg: &RetryConfig, rng: &mut impl Rng) -> i64 {
    let attempt_no = attempt_no.max(1) as u32;
    let exp = attempt_no.saturating_sub(1);

    let pow2 = 1_i64.checked_shl(exp).filter(|p| *p > 0).unwrap_or(i64::MAX);
    let mut delay = cfg.base_ms.saturating_mul(pow2);

    if delay > cfg.max_ms {
        delay = cfg.max_ms;
    }

    if cfg.jitter_pct > 0.0 {
        let jitter_range = (delay as f64) * cfg.jitter_pct;
        let jitter = rng.gen_range(-jitter_range..=jitter_range);
        delay = (delay as f64 + jitter).round() as i64;
    }

    delay.clamp(0, cfg.max_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn doubles_per_attempt_from_base() {
        let cfg = RetryConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(next_delay_ms(1, &cfg, &mut rng), 2000);
        assert_eq!(next_delay_ms(2, &cfg, &mut rng), 4000);
        assert_eq!(next_delay_ms(3, &cfg, &mut rng), 8000);
        assert_eq!(next_delay_ms(4, &cfg, &mut rng), 16000);
    }

    #[test]
    fn caps_at_max() {
        let cfg = RetryConfig {
            base_ms: 2000,
            max_ms: 5000,
            jitter_pct: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(next_delay_ms(10, &cfg, &mut rng), 5000);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let cfg = RetryConfig {
            base_ms: 2000,
            max_ms: 60_000,
            jitter_pct: 0.2,
        };
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let d = next_delay_ms(2, &cfg, &mut rng);
            assert!((3200..=4800).contains(&d), "delay {d} outside jitter band");
        }
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let cfg = RetryConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(next_delay_ms(i32::MAX, &cfg, &mut rng), cfg.max_ms);
    }
}
