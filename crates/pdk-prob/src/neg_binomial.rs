//! Negative binomial distribution with a log-link location.
//!
//! NB2 parameterized by log mean `eta = ln(mu)` and precision `phi`, so that
//! `Var(Y) = mu + mu^2 / phi`:
//!
//! `P(n) = C(n+phi-1, n) * (mu/(mu+phi))^n * (phi/(mu+phi))^phi`
//!
//! [`log_lpmf`] accepts scalars or sequences for every argument and returns
//! analytic partials for whichever of `eta` / `phi` are tape-tracked.

use pdk_core::Result;

use crate::argument::{Argument, Broadcast};
use crate::cache::Cached;
use crate::check::{check_finite, check_nonnegative_finite, check_positive_finite};
use crate::math::{digamma_difference, ln_neg_binomial_coefficient, log1pexp, sigmoid};
use crate::partials::{Edge, LogDensity, Partials};
use crate::sizes::{any_empty, check_consistent_sizes, max_size};

const FUNCTION: &str = "neg_binomial_log_lpmf";

const ETA: usize = 0;
const PHI: usize = 1;

/// Log-PMF of NB2 with log mean `eta` and precision `phi`, summed over the
/// broadcast elements of `n`, `eta` and `phi`.
///
/// - `n` finite and `>= 0` (counts; treated as data, never differentiated)
/// - `eta` finite
/// - `phi` finite and `> 0`
///
/// Any empty argument yields `0`. With `propto`, the normalizing term
/// `ln C(n+phi-1, n)` is left out of the value (its `phi` derivative is still
/// accumulated), `n * eta` is left out when `eta` is constant, and the result
/// is `0` when neither `eta` nor `phi` is differentiable.
pub fn log_lpmf<N, E, P>(n: N, eta: E, phi: P, propto: bool) -> Result<LogDensity>
where
    N: Argument,
    E: Argument,
    P: Argument,
{
    check_nonnegative_finite(FUNCTION, "n", &n)?;
    check_finite(FUNCTION, "eta", &eta)?;
    check_positive_finite(FUNCTION, "phi", &phi)?;

    let (size_n, size_eta, size_phi) = (n.size(), eta.size(), phi.size());
    if any_empty(&[size_n, size_eta, size_phi]) {
        log::trace!("{FUNCTION}: empty argument, returning 0");
        return Ok(LogDensity::Value(0.0));
    }
    let size = check_consistent_sizes(
        FUNCTION,
        &[("n", size_n), ("eta", size_eta), ("phi", size_phi)],
    )?;

    let eta_active = eta.is_differentiable();
    let phi_active = phi.is_differentiable();
    if propto && !eta_active && !phi_active {
        log::debug!("{FUNCTION}: propto with constant parameters, returning 0");
        return Ok(LogDensity::Value(0.0));
    }
    let include_norm = !propto;
    let include_n_eta = !propto || eta_active;

    let size_eta_phi = max_size(&[size_eta, size_phi]);
    let size_n_phi = max_size(&[size_n, size_phi]);

    let n_vec = Broadcast::new(&n);
    let eta_vec = Broadcast::new(&eta);
    let phi_vec = Broadcast::new(&phi);
    log::trace!(
        "{FUNCTION}: size={size}, sequence n/eta/phi={}/{}/{}, \
         d_eta={eta_active}, d_phi={phi_active}, propto={propto}",
        n_vec.is_sequence(),
        eta_vec.is_sequence(),
        phi_vec.is_sequence(),
    );

    let log_phi = Cached::compute(size_phi, |i| phi_vec.value(i).ln());
    // log(1 + mu/phi)
    let log1p_mu_over_phi =
        Cached::compute(size_eta_phi, |i| log1pexp(eta_vec.value(i) - log_phi.get(i)));
    let exp_eta = Cached::compute_if(phi_active, size_eta, |i| eta_vec.value(i).exp());
    // mu / (mu + phi)
    let mu_ratio = Cached::compute_if(eta_active || phi_active, size_eta_phi, |i| {
        sigmoid(eta_vec.value(i) - log_phi.get(i))
    });
    let n_plus_phi = Cached::compute_if(eta_active, size_n_phi, |i| {
        n_vec.value(i) + phi_vec.value(i)
    });
    // digamma(n + phi) - digamma(phi)
    let digamma_diff = Cached::compute_if(phi_active, size_n_phi, |i| {
        digamma_difference(phi_vec.value(i), n_vec.value(i))
    });

    let mut ops = Partials::new([Edge::of("eta", &eta, size), Edge::of("phi", &phi, size)]);
    let mut logp = 0.0;
    for i in 0..size {
        let n_i = n_vec.value(i);
        let phi_i = phi_vec.value(i);
        let log1p_term = log1p_mu_over_phi.get(i);

        if include_norm {
            logp += ln_neg_binomial_coefficient(n_i, phi_i);
        }
        if include_n_eta {
            logp += n_i * eta_vec.value(i);
        }
        logp -= phi_i * log1p_term + n_i * (log_phi.get(i) + log1p_term);

        if eta_active {
            ops.add(ETA, i, n_i - n_plus_phi.get(i) * mu_ratio.get(i));
        }
        if phi_active {
            ops.add(
                PHI,
                i,
                mu_ratio.get(i) - n_i / (exp_eta.get(i) + phi_i) - log1p_term
                    + digamma_diff.get(i),
            );
        }
    }

    Ok(ops.build(logp))
}

/// Log-PMF of NB2 at count `k` with log mean `eta` and precision `phi`.
pub fn logpmf_log_link(k: u64, eta: f64, phi: f64) -> Result<f64> {
    Ok(log_lpmf(k, eta, phi, false)?.value())
}

/// Negative log-likelihood for NB2(log mean, precision).
pub fn nll_log_link(k: u64, eta: f64, phi: f64) -> Result<f64> {
    Ok(-logpmf_log_link(k, eta, phi)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pdk_ad::Tape;
    use pdk_core::Error;
    use statrs::function::gamma::ln_gamma;

    /// Direct mean/precision form of the NB2 log-PMF.
    fn reference(k: f64, eta: f64, phi: f64) -> f64 {
        let mu = eta.exp();
        ln_gamma(k + phi) - ln_gamma(phi) - ln_gamma(k + 1.0)
            + phi * (phi / (mu + phi)).ln()
            + k * (mu / (mu + phi)).ln()
    }

    fn partials(k: i64, eta: f64, phi: f64, propto: bool) -> (f64, f64, f64) {
        let mut t = Tape::new();
        let (eta, phi) = (t.real(eta), t.real(phi));
        let lp = log_lpmf(k, eta, phi, propto).unwrap();
        (lp.value(), lp.edge("eta").unwrap().total(), lp.edge("phi").unwrap().total())
    }

    #[test]
    fn test_matches_mean_precision_form() {
        for (k, eta, phi) in [(0u64, 0.0, 1.0), (3, 0.5, 2.0), (10, 2.3, 0.4), (1, -3.0, 25.0)] {
            let lp = logpmf_log_link(k, eta, phi).unwrap();
            assert_relative_eq!(lp, reference(k as f64, eta, phi), epsilon = 1e-10);
            assert_eq!(nll_log_link(k, eta, phi).unwrap(), -lp);
        }
    }

    #[test]
    fn test_pmf_sums_to_one() {
        let (eta, phi) = (1.2, 3.5);
        let total: f64 = (0..400u64).map(|k| logpmf_log_link(k, eta, phi).unwrap().exp()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_gradient_matches_finite_differences() {
        let (n, eta, phi) = (3i64, 0.5f64, 2.0f64);
        let h = 1e-6;
        let f = |eta: f64, phi: f64| log_lpmf(n, eta, phi, false).unwrap().value();
        let fd_eta = (f(eta + h, phi) - f(eta - h, phi)) / (2.0 * h);
        let fd_phi = (f(eta, phi + h) - f(eta, phi - h)) / (2.0 * h);

        let (_, d_eta, d_phi) = partials(n, eta, phi, false);
        assert!((d_eta - fd_eta).abs() < 1e-5, "d_eta: analytical={d_eta}, fd={fd_eta}");
        assert!((d_phi - fd_phi).abs() < 1e-5, "d_phi: analytical={d_phi}, fd={fd_phi}");
    }

    #[test]
    fn test_closed_form_partials() {
        let (n, eta, phi) = (3.0f64, 0.5f64, 2.0f64);
        let (_, d_eta, d_phi) = partials(3, eta, phi, false);
        let mu: f64 = f64::exp(eta);
        let expected_eta = n - (n + phi) / (1.0 + phi * (-eta).exp());
        let expected_phi = 1.0 / (1.0 + phi * (-eta).exp()) - n / (mu + phi) - (1.0 + mu / phi).ln()
            + (1.0 / phi + 1.0 / (phi + 1.0) + 1.0 / (phi + 2.0));
        assert_relative_eq!(d_eta, expected_eta, epsilon = 1e-12);
        assert_relative_eq!(d_phi, expected_phi, epsilon = 1e-12);
    }

    #[test]
    fn test_propto_drops_only_normalizing_value() {
        let (n, eta, phi) = (4i64, 0.2f64, 1.5f64);
        let (full, full_eta, full_phi) = partials(n, eta, phi, false);
        let (prop, prop_eta, prop_phi) = partials(n, eta, phi, true);

        let norm = ln_gamma(4.0 + phi) - ln_gamma(phi) - ln_gamma(5.0);
        assert_relative_eq!(full - prop, norm, epsilon = 1e-12);
        assert_eq!(full_phi, prop_phi);
        assert_eq!(full_eta, prop_eta);
    }

    #[test]
    fn test_propto_with_constant_eta_drops_n_eta() {
        let mut t = Tape::new();
        let phi = t.real(1.5);
        let full = log_lpmf(4, 0.2, phi, false).unwrap().value();
        let prop = log_lpmf(4, 0.2, phi, true).unwrap().value();
        let norm = ln_gamma(5.5) - ln_gamma(1.5) - ln_gamma(5.0);
        assert_relative_eq!(full - prop, norm + 4.0 * 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_propto_all_constant_is_zero() {
        let lp = log_lpmf([1, 2, 3], 0.3, 2.0, true).unwrap();
        assert!(lp.is_constant());
        assert_eq!(lp.value(), 0.0);
    }

    #[test]
    fn test_domain_errors_name_argument() {
        let cases = [
            (log_lpmf(3, 0.5, 0.0, false), "phi"),
            (log_lpmf(3, f64::NAN, 2.0, false), "eta"),
            (log_lpmf(-1i64, 0.5, 2.0, false), "n"),
            (log_lpmf(f64::INFINITY, 0.5, 2.0, false), "n"),
            (log_lpmf([1.0, f64::NAN], 0.5, 2.0, false), "n"),
            (log_lpmf(3, f64::INFINITY, 2.0, false), "eta"),
            (log_lpmf(3, 0.5, [1.0, f64::INFINITY], false), "phi"),
        ];
        for (res, arg) in cases {
            match res {
                Err(e @ Error::Domain { .. }) => assert_eq!(e.argument(), Some(arg)),
                other => panic!("expected domain error on {arg}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_validation_precedes_size_check() {
        // phi is invalid and sizes disagree: the domain error wins
        let err = log_lpmf([1, 2, 3], [0.0; 5], -1.0, false).unwrap_err();
        assert_eq!(err.argument(), Some("phi"));
        assert!(matches!(err, Error::Domain { .. }));
    }

    #[test]
    fn test_size_mismatch() {
        let err = log_lpmf([1, 2, 3], 0.5, [1.0; 5], false).unwrap_err();
        match err {
            Error::SizeMismatch { argument, size, expected, .. } => {
                assert_eq!((argument, size, expected), ("n", 3, 5));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(log_lpmf([1], [0.5], [2.0], false).is_ok());
    }

    #[test]
    fn test_empty_argument_is_zero_without_buffers() {
        let mut t = Tape::new();
        let phi = t.real(2.0);
        let etas: Vec<pdk_ad::Real> = Vec::new();
        let lp = log_lpmf(3, &etas, phi, false).unwrap();
        assert!(lp.is_constant());
        assert_eq!(lp.value(), 0.0);

        let empty: &[i64] = &[];
        assert_eq!(log_lpmf(empty, 0.5, 2.0, false).unwrap().value(), 0.0);
    }

    #[test]
    fn test_sum_over_elements() {
        let ns = [0i64, 2, 5];
        let etas = [0.1, -0.4, 1.3];
        let lp = log_lpmf(ns, etas, 1.7, false).unwrap().value();
        let sum: f64 = (0..3).map(|i| logpmf_log_link(ns[i] as u64, etas[i], 1.7).unwrap()).sum();
        assert_relative_eq!(lp, sum, epsilon = 1e-12);
    }

    #[test]
    fn test_stable_for_huge_mean_over_precision() {
        // eta - ln(phi) = 1000: exp overflows, the kernel must not
        let (eta, phi) = (1000.0f64, 1.0f64);
        let (value, d_eta, d_phi) = partials(2, eta, phi, false);
        assert!(value.is_finite() && d_eta.is_finite() && d_phi.is_finite());
        // C(2, 2) = 1, log1p(mu/phi) = 1000: 2*1000 - 3*1000
        assert_relative_eq!(value, -1000.0, epsilon = 1e-9);
        assert_relative_eq!(d_eta, -1.0, epsilon = 1e-12);
        // 1 - 0 - 1000 + (1/1 + 1/2)
        assert_relative_eq!(d_phi, -997.5, epsilon = 1e-9);

        let (eta, phi) = (1000.0 + 3.0f64.ln(), 3.0f64);
        assert_relative_eq!(log1pexp(eta - phi.ln()), 1000.0, epsilon = 1e-12);
        assert!(log_lpmf(0, eta, phi, false).unwrap().value().is_finite());
    }

    #[test]
    fn test_large_precision_approaches_poisson() {
        let eta = 0.5f64;
        let mu = f64::exp(eta);
        let cases: [(i64, [f64; 2]); 4] =
            [(3, [1e6, 1e8]), (65, [1e8, 1e12]), (100, [1e8, 1e12]), (1000, [1e10, 1e12])];

        for (k, phis) in cases {
            let n = k as f64;
            let poisson = n * eta - mu - ln_gamma(n + 1.0);
            // log p = poisson + c / phi + O(phi^-2), c = ((n - mu)^2 - n) / 2
            let c = ((n - mu).powi(2) - n) / 2.0;
            for phi in phis {
                let (value, _, d_phi) = partials(k, eta, phi, false);
                assert_relative_eq!(value, poisson + c / phi, epsilon = 1e-9);
                // d/dphi = -c / phi^2 + O(phi^-3); the terms cancel by ~1e10 at phi = 1e12
                assert_relative_eq!(d_phi, -c / (phi * phi), max_relative = 1e-3);
            }
        }
    }

    #[test]
    fn test_tiny_precision_is_finite() {
        // phi far below ulp(n)
        let (eta, phi) = (0.5f64, 1e-17f64);
        let (value, d_eta, d_phi) = partials(3, eta, phi, false);
        assert_relative_eq!(value, reference(3.0, eta, phi), max_relative = 1e-12);
        assert!(d_eta.is_finite());
        // dominated by -psi(phi) ~ 1 / phi
        assert_relative_eq!(d_phi, 1.0 / phi, max_relative = 1e-6);

        let lp = log_lpmf([0u64, 1, 40], 0.0, 1e-300, false).unwrap();
        assert!(lp.value().is_finite());
    }

    #[test]
    fn test_huge_count_is_finite() {
        let k = 1u64 << 60;
        let mut t = Tape::new();
        let (eta, phi) = (t.real(0.5), t.real(2.0));
        let lp = log_lpmf(k, eta, phi, false).unwrap();
        assert!(lp.value().is_finite(), "value {}", lp.value());
        assert!(lp.value() < 0.0);
        assert!(lp.edge("eta").unwrap().total().is_finite());
        assert!(lp.edge("phi").unwrap().total().is_finite());

        // ln_gamma terms near 1e20 only lose absolute precision here
        assert_relative_eq!(lp.value(), reference(k as f64, 0.5, 2.0), max_relative = 1e-9);
    }

    #[test]
    fn test_records_on_tape() {
        let mut t = Tape::new();
        let etas: Vec<_> = [0.1, 0.7, -0.2].iter().map(|&e| t.real(e)).collect();
        let phi = t.real(2.5);
        let ns = vec![1i64, 0, 4];

        let lp = log_lpmf(&ns, &etas, phi, false).unwrap();
        let d_eta = lp.edge("eta").unwrap().partials().to_vec();
        let d_phi = lp.edge("phi").unwrap().total();
        let out = lp.record(&mut t);

        // upstream: -2 * lp
        let scaled = t.mul_f64(out.var(), -2.0);
        t.backward(scaled);
        for (i, e) in etas.iter().enumerate() {
            assert_relative_eq!(t.adjoint(e.var()), -2.0 * d_eta[i], epsilon = 1e-12);
            let (_, single, _) = partials(ns[i], [0.1, 0.7, -0.2][i], 2.5, false);
            assert_relative_eq!(d_eta[i], single, epsilon = 1e-12);
        }
        assert_relative_eq!(t.adjoint(phi.var()), -2.0 * d_phi, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_phi_has_no_phi_edge() {
        let mut t = Tape::new();
        let eta = t.real(0.3);
        let lp = log_lpmf(2, eta, 4.0, false).unwrap();
        assert!(lp.edge("eta").is_some());
        assert!(lp.edge("phi").is_none());
        assert_eq!(lp.edges().len(), 1);
    }

    #[test]
    fn test_mixture_through_tape() {
        // log(p(1) + p(2)) composed from recorded log densities
        let mut t = Tape::new();
        let (eta, phi) = (t.real(0.4), t.real(3.0));
        let lp1 = log_lpmf(1, eta, phi, false).unwrap();
        let lp2 = log_lpmf(2, eta, phi, false).unwrap();
        let (v1, v2) = (lp1.value(), lp2.value());
        let (d1, d2) = (lp1.edge("eta").unwrap().total(), lp2.edge("eta").unwrap().total());

        let a = lp1.record(&mut t);
        let b = lp2.record(&mut t);
        let p1 = t.exp(a.var());
        let p2 = t.exp(b.var());
        let p = t.add(p1, p2);
        let out = t.ln(p);
        t.backward(out);

        let (q1, q2) = (v1.exp(), v2.exp());
        assert_relative_eq!(t.val(out), (q1 + q2).ln(), epsilon = 1e-12);
        assert_relative_eq!(t.adjoint(eta.var()), (q1 * d1 + q2 * d2) / (q1 + q2), epsilon = 1e-12);
    }
}
