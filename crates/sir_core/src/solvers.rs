use crate::traits::{Scalar, Steppable, VectorField};

/// Classic Runge-Kutta 4th Order Solver
pub struct Rk4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> Rk4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
            k2: vec![T::zero(); dim],
            k3: vec![T::zero(); dim],
            k4: vec![T::zero(); dim],
            tmp: vec![T::zero(); dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for Rk4<T> {
    fn step(&mut self, field: &impl VectorField<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();

        let t0 = *t;

        // k1 = f(t, y)
        field.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        field.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        field.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        field.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

/// Embedded Dormand-Prince 5(4) pair.
///
/// Unlike the fixed-step solvers this exposes a trial/commit interface:
/// `attempt_step` evaluates one candidate step and returns its scaled error
/// norm, `accept_step` commits the candidate. The caller owns the step-size
/// policy. The pair is FSAL (first-same-as-last): the seventh stage of an
/// accepted step is recycled as the first stage of the next one.
pub struct Dopri5<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    k5: Vec<T>,
    k6: Vec<T>,
    k7: Vec<T>,
    tmp: Vec<T>,
    y_next: Vec<T>,
    first_stage_cached: bool,
}

impl<T: Scalar> Dopri5<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::zero();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            k5: vec![z; dim],
            k6: vec![z; dim],
            k7: vec![z; dim],
            tmp: vec![z; dim],
            y_next: vec![z; dim],
            first_stage_cached: false,
        }
    }

    /// Evaluates one trial step of size dt from (t, y).
    ///
    /// The 5th-order candidate is kept internally until `accept_step`. The
    /// returned norm is the RMS of the stage-difference error scaled by
    /// `abs_tol + rel_tol * max(|y|, |y_next|)` per component; a value of at
    /// most 1 means the step meets the tolerances. Rejected trials may be
    /// retried from the same (t, y) with a different dt at the cost of only
    /// the later stages, since the first stage depends on (t, y) alone.
    pub fn attempt_step(
        &mut self,
        field: &impl VectorField<T>,
        t: T,
        y: &[T],
        dt: T,
        rel_tol: T,
        abs_tol: T,
    ) -> T {
        let c = |v: f64| T::from_f64(v).unwrap();

        // Dormand-Prince coefficients
        let c2 = c(1.0 / 5.0);
        let c3 = c(3.0 / 10.0);
        let c4 = c(4.0 / 5.0);
        let c5 = c(8.0 / 9.0);

        let a21 = c(1.0 / 5.0);

        let a31 = c(3.0 / 40.0);
        let a32 = c(9.0 / 40.0);

        let a41 = c(44.0 / 45.0);
        let a42 = c(-56.0 / 15.0);
        let a43 = c(32.0 / 9.0);

        let a51 = c(19372.0 / 6561.0);
        let a52 = c(-25360.0 / 2187.0);
        let a53 = c(64448.0 / 6561.0);
        let a54 = c(-212.0 / 729.0);

        let a61 = c(9017.0 / 3168.0);
        let a62 = c(-355.0 / 33.0);
        let a63 = c(46732.0 / 5247.0);
        let a64 = c(49.0 / 176.0);
        let a65 = c(-5103.0 / 18656.0);

        // b coefficients (5th order, also the a7* row)
        let b1 = c(35.0 / 384.0);
        let b3 = c(500.0 / 1113.0);
        let b4 = c(125.0 / 192.0);
        let b5 = c(-2187.0 / 6784.0);
        let b6 = c(11.0 / 84.0);

        // bh coefficients (embedded 4th order)
        let bh1 = c(5179.0 / 57600.0);
        let bh3 = c(7571.0 / 16695.0);
        let bh4 = c(393.0 / 640.0);
        let bh5 = c(-92097.0 / 339200.0);
        let bh6 = c(187.0 / 2100.0);
        let bh7 = c(1.0 / 40.0);

        // error weights: 5th order minus 4th order
        let e1 = b1 - bh1;
        let e3 = b3 - bh3;
        let e4 = b4 - bh4;
        let e5 = b5 - bh5;
        let e6 = b6 - bh6;
        let e7 = -bh7;

        // k1
        if !self.first_stage_cached {
            field.apply(t, y, &mut self.k1);
            self.first_stage_cached = true;
        }

        // k2
        for i in 0..y.len() {
            self.tmp[i] = y[i] + dt * (a21 * self.k1[i]);
        }
        field.apply(t + c2 * dt, &self.tmp, &mut self.k2);

        // k3
        for i in 0..y.len() {
            self.tmp[i] = y[i] + dt * (a31 * self.k1[i] + a32 * self.k2[i]);
        }
        field.apply(t + c3 * dt, &self.tmp, &mut self.k3);

        // k4
        for i in 0..y.len() {
            self.tmp[i] = y[i] + dt * (a41 * self.k1[i] + a42 * self.k2[i] + a43 * self.k3[i]);
        }
        field.apply(t + c4 * dt, &self.tmp, &mut self.k4);

        // k5
        for i in 0..y.len() {
            self.tmp[i] = y[i]
                + dt * (a51 * self.k1[i] + a52 * self.k2[i] + a53 * self.k3[i] + a54 * self.k4[i]);
        }
        field.apply(t + c5 * dt, &self.tmp, &mut self.k5);

        // k6
        for i in 0..y.len() {
            self.tmp[i] = y[i]
                + dt * (a61 * self.k1[i]
                    + a62 * self.k2[i]
                    + a63 * self.k3[i]
                    + a64 * self.k4[i]
                    + a65 * self.k5[i]);
        }
        field.apply(t + dt, &self.tmp, &mut self.k6);

        // 5th-order candidate
        for i in 0..y.len() {
            self.y_next[i] = y[i]
                + dt * (b1 * self.k1[i]
                    + b3 * self.k3[i]
                    + b4 * self.k4[i]
                    + b5 * self.k5[i]
                    + b6 * self.k6[i]);
        }

        // k7 (FSAL stage, evaluated at the candidate)
        field.apply(t + dt, &self.y_next, &mut self.k7);

        // scaled RMS error norm
        let mut sum = T::zero();
        for i in 0..y.len() {
            let err = dt
                * (e1 * self.k1[i]
                    + e3 * self.k3[i]
                    + e4 * self.k4[i]
                    + e5 * self.k5[i]
                    + e6 * self.k6[i]
                    + e7 * self.k7[i]);
            let scale = abs_tol + rel_tol * y[i].abs().max(self.y_next[i].abs());
            let ratio = err / scale;
            sum = sum + ratio * ratio;
        }
        (sum / T::from_usize(y.len()).unwrap()).sqrt()
    }

    /// Commits the candidate from the last `attempt_step` into `y` and
    /// recycles the seventh stage as the next first stage.
    pub fn accept_step(&mut self, y: &mut [T]) {
        y.copy_from_slice(&self.y_next);
        std::mem::swap(&mut self.k1, &mut self.k7);
    }

    /// Discards the cached first stage. Required whenever the caller moves
    /// (t, y) by means other than `accept_step`.
    pub fn reset(&mut self) {
        self.first_stage_cached = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{Dopri5, Rk4};
    use crate::traits::{Steppable, VectorField};

    /// dy/dt = -rate * y, with the closed form y(t) = y0 * exp(-rate * t).
    struct Decay {
        rate: f64,
    }

    impl VectorField<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * x[0];
        }
    }

    #[test]
    fn rk4_tracks_exponential_decay() {
        let field = Decay { rate: 1.0 };
        let mut stepper = Rk4::new(1);
        let mut t = 0.0;
        let mut state = [2.0];

        for _ in 0..100 {
            stepper.step(&field, &mut t, &mut state, 0.01);
        }

        let expected = 2.0 * (-1.0_f64).exp();
        assert!((t - 1.0).abs() < 1e-12);
        assert!((state[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn dopri5_single_step_is_accurate() {
        let field = Decay { rate: 1.3 };
        let mut stepper = Dopri5::new(1);
        let mut state = [2.0];

        let norm = stepper.attempt_step(&field, 0.0, &state, 0.1, 1e-8, 1e-8);
        assert!(norm.is_finite());
        assert!(norm <= 1.0, "small step should meet tolerances, norm = {norm}");

        stepper.accept_step(&mut state);
        let expected = 2.0 * (-0.13_f64).exp();
        assert!((state[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn dopri5_reports_large_error_for_oversized_step() {
        let field = Decay { rate: 1.0 };
        let mut stepper = Dopri5::new(1);
        let state = [1.0];

        let norm = stepper.attempt_step(&field, 0.0, &state, 10.0, 1e-10, 1e-10);
        assert!(norm > 1.0, "a 10-unit step cannot meet 1e-10 tolerances");
    }

    #[test]
    fn dopri5_rejected_trial_can_be_retried() {
        let field = Decay { rate: 1.0 };
        let mut stepper = Dopri5::new(1);
        let mut state = [1.0];

        let coarse = stepper.attempt_step(&field, 0.0, &state, 10.0, 1e-10, 1e-10);
        assert!(coarse > 1.0);

        // Same (t, y), smaller dt: the retry must succeed and stay accurate.
        let fine = stepper.attempt_step(&field, 0.0, &state, 0.05, 1e-10, 1e-10);
        assert!(fine <= 1.0);
        stepper.accept_step(&mut state);
        let expected = (-0.05_f64).exp();
        assert!((state[0] - expected).abs() < 1e-10);
    }

    #[test]
    fn dopri5_marches_to_closed_form_solution() {
        let field = Decay { rate: 1.3 };
        let mut stepper = Dopri5::new(1);
        let mut state = [2.0];
        let mut t = 0.0;
        let mut dt = 0.05_f64;

        while t < 1.0 {
            let trial = dt.min(1.0 - t);
            let norm = stepper.attempt_step(&field, t, &state, trial, 1e-9, 1e-9);
            if norm <= 1.0 {
                stepper.accept_step(&mut state);
                t += trial;
            }
            let factor = if norm == 0.0 {
                5.0
            } else {
                (0.9 * norm.powf(-0.2)).clamp(0.2, 5.0)
            };
            dt = trial * factor;
        }

        let expected = 2.0 * (-1.3_f64).exp();
        assert!((state[0] - expected).abs() < 1e-7);
    }
}
