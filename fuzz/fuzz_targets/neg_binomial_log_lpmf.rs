#![no_main]

use libfuzzer_sys::fuzz_target;
use pdk_ad::Tape;
use pdk_prob::neg_binomial::log_lpmf;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Layout: [flags][len_n][ (i16 count)* ][ (f64 eta, f64 phi)* ]
    let flags = data[0];
    let len_n = (data[1] % 8) as usize;
    let rest = &data[2..];
    if rest.len() < len_n * 2 {
        return;
    }
    let (count_bytes, param_bytes) = rest.split_at(len_n * 2);
    let ns: Vec<i64> =
        count_bytes.chunks_exact(2).map(|c| i16::from_le_bytes([c[0], c[1]]) as i64).collect();
    let params: Vec<f64> = param_bytes
        .chunks_exact(8)
        .take(16)
        .map(|c| f64::from_le_bytes(c.try_into().unwrap_or([0; 8])))
        .collect();
    let (etas, phis) = params.split_at(params.len() / 2);

    let propto = flags & 1 != 0;
    let mut tape = Tape::new();
    let eta_vars: Vec<_> = etas.iter().map(|&e| tape.real(e)).collect();

    // Errors are fine; panics and non-finite partials on accepted input are not.
    if let Ok(lp) = log_lpmf(&ns, &eta_vars, phis, propto) {
        let finite_inputs = etas.iter().all(|e| e.abs() < 700.0)
            && phis.iter().all(|&p| p > 1e-300 && p < 1e300);
        if finite_inputs {
            assert!(!lp.value().is_nan());
        }
        let out = lp.record(&mut tape);
        tape.backward(out.var());
    }
});
