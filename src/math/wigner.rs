//! Wigner 3j symbols for integer angular momenta.
//!
//! Evaluated with Racah's closed form. Factorials are kept as a table of logarithms
//! so large J stays within `f64` range.

/// Table of `ln(n!)` sized for 3j symbols up to a given total angular momentum.
#[derive(Debug, Clone)]
pub struct Wigner3j {
    ln_fact: Vec<f64>,
}

impl Wigner3j {
    /// Enough table for any symbol with `j1 + j2 + j3 <= max_sum`.
    pub fn new(max_sum: usize) -> Self {
        let mut ln_fact = Vec::with_capacity(max_sum + 2);
        ln_fact.push(0.0);
        for n in 1..=max_sum + 1 {
            ln_fact.push(ln_fact[n - 1] + (n as f64).ln());
        }
        Self { ln_fact }
    }

    fn ln_factorial(&self, n: i64) -> f64 {
        self.ln_fact[n as usize]
    }

    /// `( j1 j2 j3 ; m1 m2 m3 )`. Returns zero for any symbol that vanishes by the
    /// triangle or projection rules, or that exceeds the table.
    pub fn symbol(&self, j1: i64, j2: i64, j3: i64, m1: i64, m2: i64, m3: i64) -> f64 {
        if m1 + m2 + m3 != 0 || j1 < 0 || j2 < 0 || j3 < 0 {
            return 0.0;
        }
        if j3 < (j1 - j2).abs() || j3 > j1 + j2 {
            return 0.0;
        }
        if m1.abs() > j1 || m2.abs() > j2 || m3.abs() > j3 {
            return 0.0;
        }
        if (j1 + j2 + j3 + 1) as usize >= self.ln_fact.len() {
            return 0.0;
        }

        let f = |n: i64| self.ln_factorial(n);
        let triangle = f(j1 + j2 - j3) + f(j1 - j2 + j3) + f(-j1 + j2 + j3) - f(j1 + j2 + j3 + 1);
        let prefactor =
            0.5 * (triangle + f(j1 + m1) + f(j1 - m1) + f(j2 + m2) + f(j2 - m2) + f(j3 + m3) + f(j3 - m3));

        let k_min = 0i64.max(j2 - j3 - m1).max(j1 - j3 + m2);
        let k_max = (j1 + j2 - j3).min(j1 - m1).min(j2 + m2);
        let mut sum = 0.0;
        for k in k_min..=k_max {
            let denom = f(k) + f(j1 + j2 - j3 - k) + f(j1 - m1 - k) + f(j2 + m2 - k) + f(j3 - j2 + m1 + k)
                + f(j3 - j1 - m2 + k);
            sum += parity(k) * (prefactor - denom).exp();
        }
        parity(j1 - j2 - m3) * sum
    }
}

/// `(-1)^n`.
pub fn parity(n: i64) -> f64 {
    if n.rem_euclid(2) == 0 { 1.0 } else { -1.0 }
}
