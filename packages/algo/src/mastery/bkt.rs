//! Bayesian Knowledge Tracing
//!
//! Two-step sequential filter applied once per observed attempt:
//!
//! - Evidence: `P(L | obs)` from the slip/guess emission model
//!   - correct:   `P·(1−S) / (P·(1−S) + (1−P)·G)`
//!   - incorrect: `P·S / (P·S + (1−P)·(1−G))`
//! - Transition: `P' = P(L | obs) + (1 − P(L | obs))·T`
//!
//! The prior is epsilon-clamped before the evidence step so neither
//! denominator can reach zero.

use crate::config::BktParams;
use crate::sanitize::{clamp_probability, clamp_unit};

/// Posterior belief that the skill is known, given one observation.
pub fn posterior_given_evidence(prior: f64, correct: bool, params: &BktParams) -> f64 {
    let p = clamp_probability(prior);
    let (known, unknown) = if correct {
        (p * (1.0 - params.p_slip), (1.0 - p) * params.p_guess)
    } else {
        (p * params.p_slip, (1.0 - p) * (1.0 - params.p_guess))
    };
    clamp_unit(known / (known + unknown))
}

/// One full BKT step: evidence update followed by the learning transition.
///
/// An incorrect observation never raises the belief above the pre-attempt
/// value; near the floor the learning transition alone would otherwise lift
/// it past the prior.
pub fn bkt_step(prior: f64, correct: bool, params: &BktParams) -> f64 {
    let evidence = posterior_given_evidence(prior, correct, params);
    let next = evidence + (1.0 - evidence) * params.p_learn;
    let next = if correct { next } else { next.min(clamp_probability(prior)) };
    clamp_unit(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn params() -> BktParams {
        BktParams::default()
    }

    #[test]
    fn test_correct_evidence_from_init() {
        let post = posterior_given_evidence(0.1, true, &params());
        assert!((post - 0.095 / 0.185).abs() < TOL);
    }

    #[test]
    fn test_two_correct_from_init_exact_values() {
        let p1 = bkt_step(0.1, true, &params());
        assert!((p1 - 0.586_486_486_486_486_5).abs() < TOL, "p1 = {p1}");
        let p2 = bkt_step(p1, true, &params());
        assert!((p2 - 0.941_273_425_152_404_6).abs() < TOL, "p2 = {p2}");
    }

    #[test]
    fn test_incorrect_at_high_belief_follows_textbook_update() {
        let p = 0.9;
        let evidence = 0.9 * 0.05 / (0.9 * 0.05 + 0.1 * 0.9);
        let expected = evidence + (1.0 - evidence) * 0.15;
        assert!((bkt_step(p, false, &params()) - expected).abs() < TOL);
    }

    #[test]
    fn test_incorrect_near_floor_does_not_raise_belief() {
        let p = bkt_step(0.1, false, &params());
        assert!(p <= 0.1 + TOL);
    }

    #[test]
    fn test_incorrect_at_init_is_capped_below_learn_transition() {
        // uncapped posterior + learn transition at 0.1 gives 0.15521472392638036
        let p = bkt_step(0.1, false, &params());
        assert!((p - 0.1).abs() < TOL);
        assert!((p - 0.155_214_723_926_380_36).abs() > 1e-3);
    }

    #[test]
    fn test_degenerate_priors_stay_finite() {
        for prior in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            for correct in [true, false] {
                let next = bkt_step(prior, correct, &params());
                assert!(next.is_finite());
                assert!((0.0..=1.0).contains(&next), "prior {prior} -> {next}");
            }
        }
    }
}
