//! Quadratic unconstrained binary optimization model.

/// A QUBO over `n` binary variables:
/// `E(x) = offset + Σ linear[i]·x_i + Σ_{i<j} q[i][j]·x_i·x_j`.
///
/// Constraints are folded in as squared penalty terms, so every coefficient
/// stays explicit and the energy of any assignment is exact.
///
/// # Examples
///
/// ```
/// use fleetflow::combinatorial::Qubo;
///
/// let mut q = Qubo::new(2);
/// q.add_linear(0, 3.0);
/// q.add_linear(1, 5.0);
/// // exactly one of x0, x1
/// q.add_squared_penalty(&[(0, 1.0), (1, 1.0)], -1.0, 100.0);
///
/// assert_eq!(q.energy(&[true, false]), 3.0);
/// assert_eq!(q.energy(&[false, true]), 5.0);
/// assert_eq!(q.energy(&[false, false]), 100.0);
/// assert_eq!(q.energy(&[true, true]), 108.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Qubo {
    n: usize,
    linear: Vec<f64>,
    quadratic: Vec<f64>,
    offset: f64,
}

impl Qubo {
    /// Creates an all-zero model over `n` variables.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            linear: vec![0.0; n],
            quadratic: vec![0.0; n * n],
            offset: 0.0,
        }
    }

    /// Number of binary variables.
    pub fn num_variables(&self) -> usize {
        self.n
    }

    /// Adds `c·x_i`.
    pub fn add_linear(&mut self, i: usize, c: f64) {
        self.linear[i] += c;
    }

    /// Adds `c·x_i·x_j`. A diagonal term folds into the linear part since
    /// `x² = x` for binaries.
    pub fn add_quadratic(&mut self, i: usize, j: usize, c: f64) {
        if i == j {
            self.add_linear(i, c);
            return;
        }
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        self.quadratic[a * self.n + b] += c;
    }

    /// Adds a constant.
    pub fn add_offset(&mut self, c: f64) {
        self.offset += c;
    }

    /// Adds `weight · (Σ a_i·x_i + constant)²`.
    ///
    /// Zero exactly when the linear expression equals `-constant`; at least
    /// `weight` for any integer violation.
    pub fn add_squared_penalty(&mut self, terms: &[(usize, f64)], constant: f64, weight: f64) {
        for (k, &(i, a)) in terms.iter().enumerate() {
            self.add_linear(i, weight * (a * a + 2.0 * constant * a));
            for &(j, b) in &terms[k + 1..] {
                self.add_quadratic(i, j, weight * 2.0 * a * b);
            }
        }
        self.add_offset(weight * constant * constant);
    }

    /// Adds `weight · Σ_{i<j} x_i·x_j`: zero when at most one variable is set.
    pub fn add_at_most_one(&mut self, vars: &[usize], weight: f64) {
        for (k, &i) in vars.iter().enumerate() {
            for &j in &vars[k + 1..] {
                self.add_quadratic(i, j, weight);
            }
        }
    }

    /// Linear coefficient of `x_i`.
    pub fn linear(&self, i: usize) -> f64 {
        self.linear[i]
    }

    /// Coupling between `x_i` and `x_j` (`i != j`).
    pub fn quadratic(&self, i: usize, j: usize) -> f64 {
        let (a, b) = if i < j { (i, j) } else { (j, i) };
        self.quadratic[a * self.n + b]
    }

    /// Constant term.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Returns `true` if every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.offset.is_finite()
            && self.linear.iter().all(|c| c.is_finite())
            && self.quadratic.iter().all(|c| c.is_finite())
    }

    /// Energy of a full assignment.
    ///
    /// # Panics
    ///
    /// Panics if `x.len()` differs from the variable count.
    pub fn energy(&self, x: &[bool]) -> f64 {
        assert_eq!(x.len(), self.n, "assignment length mismatch");
        let mut e = self.offset;
        for i in (0..self.n).filter(|&i| x[i]) {
            e += self.linear[i];
            for j in ((i + 1)..self.n).filter(|&j| x[j]) {
                e += self.quadratic[i * self.n + j];
            }
        }
        e
    }
}
