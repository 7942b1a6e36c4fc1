//! Dense directional cost matrix with per-edge records.

use crate::models::Coordinate;

/// What is known about one directed edge beyond its cost.
///
/// The diagonal always holds [`EdgeRecord::default`], an empty record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeRecord {
    /// Road or geodesic distance, when known.
    pub distance_km: Option<f64>,
    /// Travel time, when a provider reported one.
    pub duration_minutes: Option<f64>,
    /// Provider polyline for this edge; empty when none was returned.
    pub geometry: Vec<Coordinate>,
    /// `true` when the cost came from the geodesic fallback.
    pub estimated: bool,
}

/// A dense n×n cost matrix stored in row-major order.
///
/// Entries are non-negative reals or `+∞` for disallowed edges; the
/// diagonal is always zero. Entries may be asymmetric.
///
/// # Examples
///
/// ```
/// use fleetflow::distance::CostMatrix;
///
/// let m = CostMatrix::from_rows(&[
///     vec![0.0, 5.0, f64::INFINITY],
///     vec![5.0, 0.0, 2.0],
///     vec![4.0, 2.0, 0.0],
/// ]).unwrap();
/// assert_eq!(m.get(0, 1), 5.0);
/// assert!(!m.is_allowed(0, 2));
/// assert_eq!(m.size(), 3);
/// assert_eq!(m.route_cost(&[0, 1, 2, 0]), 11.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    data: Vec<f64>,
    edges: Vec<EdgeRecord>,
    size: usize,
}

impl CostMatrix {
    /// Creates a cost matrix of the given size, initialized to zero.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            edges: vec![EdgeRecord::default(); size * size],
            size,
        }
    }

    /// Creates a cost matrix from an explicit n×n grid.
    ///
    /// Returns `None` if the data length doesn't match `size * size`, an entry
    /// is negative, NaN or `-∞`, or the diagonal is not zero.
    pub fn from_data(size: usize, data: Vec<f64>) -> Option<Self> {
        if data.len() != size * size {
            return None;
        }
        for i in 0..size {
            for j in 0..size {
                let c = data[i * size + j];
                if !is_valid_cost(c) || (i == j && c != 0.0) {
                    return None;
                }
            }
        }
        Some(Self {
            data,
            edges: vec![EdgeRecord::default(); size * size],
            size,
        })
    }

    /// Creates a cost matrix from rows; see [`CostMatrix::from_data`].
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let size = rows.len();
        if rows.iter().any(|r| r.len() != size) {
            return None;
        }
        Self::from_data(size, rows.concat())
    }

    /// Returns the cost from location `from` to location `to`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.size + to]
    }

    /// Sets the cost from location `from` to location `to`.
    pub fn set(&mut self, from: usize, to: usize, cost: f64) {
        self.data[from * self.size + to] = cost;
    }

    /// Returns the record kept for the edge `from → to`.
    pub fn edge(&self, from: usize, to: usize) -> &EdgeRecord {
        &self.edges[from * self.size + to]
    }

    /// Replaces the record kept for the edge `from → to`.
    pub fn set_edge(&mut self, from: usize, to: usize, record: EdgeRecord) {
        self.edges[from * self.size + to] = record;
    }

    /// Number of locations in this matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Raw row-major entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Returns `true` if the edge has a finite cost.
    pub fn is_allowed(&self, from: usize, to: usize) -> bool {
        self.get(from, to).is_finite()
    }

    /// Sum of every finite entry.
    pub fn finite_sum(&self) -> f64 {
        self.data.iter().filter(|c| c.is_finite()).sum()
    }

    /// Number of edges whose cost came from the geodesic fallback.
    pub fn estimated_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.estimated).count()
    }

    /// First entry that is negative or NaN, as `(from, to, value)`.
    /// `+∞` marks a forbidden edge and is valid.
    pub fn first_invalid(&self) -> Option<(usize, usize, f64)> {
        self.data
            .iter()
            .position(|&c| !is_valid_cost(c))
            .map(|k| (k / self.size, k % self.size, self.data[k]))
    }

    /// Returns `true` if the matrix is symmetric within the given tolerance.
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.size {
            for j in (i + 1)..self.size {
                let (a, b) = (self.get(i, j), self.get(j, i));
                if a.is_infinite() || b.is_infinite() {
                    if a != b {
                        return false;
                    }
                } else if (a - b).abs() > tol {
                    return false;
                }
            }
        }
        true
    }

    /// Returns the cheapest reachable candidate from `from`.
    ///
    /// Ties go to the candidate listed first. Returns `None` if no candidate
    /// has a finite cost.
    pub fn nearest_neighbor(&self, from: usize, candidates: &[usize]) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .filter(|&c| self.is_allowed(from, c))
            .fold(None, |best: Option<usize>, c| match best {
                Some(b) if self.get(from, b) <= self.get(from, c) => Some(b),
                _ => Some(c),
            })
    }

    /// Sum of consecutive edges along a node sequence.
    pub fn route_cost(&self, nodes: &[usize]) -> f64 {
        nodes.windows(2).map(|w| self.get(w[0], w[1])).sum()
    }
}

fn is_valid_cost(c: f64) -> bool {
    c == f64::INFINITY || (c.is_finite() && c >= 0.0)
}
