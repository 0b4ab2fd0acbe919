use std::sync::Arc;

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::{debug, trace};

use crate::errors::{GridError, GridResult};
use crate::geometry::GridDomain;
use crate::missing::{missing_value, MissingValue};
use crate::parallel::ParallelReduction;

use super::global::GlobalField;
use super::stats::FieldStats;

/// Lifecycle of a field: zero-filled on construction, populated once any
/// data has been read, computed or written into it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldState
{
    Allocated,
    Populated,
}

///
/// Named per-cell arrays over one PE's partition of a [`GridDomain`].
///
/// Every binary operation treats the missing sentinel as absorbing: a cell
/// is missing in the result exactly when it is missing in either operand.
/// Reductions (`norm`, `dot_product`, `diagnostics`) only look at valid
/// cells and are collectives over the domain's communicator.
///
#[derive(Clone, Debug)]
pub struct DistributedField
{
    domain: Arc<GridDomain>,
    variables: IndexMap<String, Vec<f64>>,
    state: FieldState,
}

#[inline]
fn combine(a: f64, b: f64, op: impl Fn(f64, f64) -> f64) -> f64
{
    if a.is_missing() || b.is_missing() { missing_value() } else { op(a, b) }
}

impl DistributedField
{
    /// Zero-filled field holding `names` on `domain`'s local cells.
    pub fn new(domain: Arc<GridDomain>, names: &[&str]) -> GridResult<Self>
    {
        let n = domain.local_size();
        let mut variables = IndexMap::with_capacity(names.len());
        for &name in names
        {
            if variables.insert(name.to_string(), vec![0.0; n]).is_some()
            {
                return Err(GridError::DuplicateField(name.to_string()));
            }
        }
        trace!("DistributedField {:?} with {} local cells", names, n);
        Ok(Self { domain, variables, state: FieldState::Allocated })
    }

    pub fn domain(&self) -> &Arc<GridDomain>
    {
        &self.domain
    }

    pub fn variables(&self) -> impl Iterator<Item = &str>
    {
        self.variables.keys().map(|k| k.as_str())
    }

    pub fn has_variable(&self, name: &str) -> bool
    {
        self.variables.contains_key(name)
    }

    #[inline]
    pub fn local_size(&self) -> usize
    {
        self.domain.local_size()
    }

    #[inline]
    pub fn state(&self) -> FieldState
    {
        self.state
    }

    #[inline]
    pub fn missing(&self) -> f64
    {
        missing_value()
    }

    pub fn values(&self, name: &str) -> GridResult<&[f64]>
    {
        self.variables.get(name).map(|v| v.as_slice()).ok_or_else(|| GridError::UnknownVariable(name.to_string()))
    }

    /// Mutable access to one variable; the field counts as populated afterwards.
    pub fn values_mut(&mut self, name: &str) -> GridResult<&mut [f64]>
    {
        let values = self.variables.get_mut(name).ok_or_else(|| GridError::UnknownVariable(name.to_string()))?;
        self.state = FieldState::Populated;
        Ok(values.as_mut_slice())
    }

    /// Replace one variable's local values.
    pub fn set_values(&mut self, name: &str, values: Vec<f64>) -> GridResult<()>
    {
        if values.len() != self.local_size()
        {
            return Err(GridError::DimensionMismatch
            {
                context: "DistributedField::set_values",
                expected: vec![self.local_size()],
                found: vec![values.len()],
            });
        }
        *self.variables.get_mut(name).ok_or_else(|| GridError::UnknownVariable(name.to_string()))? = values;
        self.state = FieldState::Populated;
        Ok(())
    }

    fn names(&self) -> Vec<String>
    {
        self.variables.keys().cloned().collect()
    }

    fn check_partition(&self, other: &DistributedField) -> GridResult<()>
    {
        if Arc::ptr_eq(&self.domain, &other.domain) || self.domain.is_compatible(&other.domain)
        {
            Ok(())
        }
        else
        {
            Err(GridError::PartitionMismatch)
        }
    }

    /// Same partition and the same set of variable names.
    fn check_compatible(&self, other: &DistributedField) -> GridResult<()>
    {
        self.check_partition(other)?;
        if self.variables.len() != other.variables.len() || self.variables.keys().any(|k| !other.variables.contains_key(k))
        {
            return Err(GridError::VariableMismatch { left: self.names(), right: other.names() });
        }
        Ok(())
    }

    fn zip_with(&mut self, other: &DistributedField, op: impl Fn(f64, f64) -> f64 + Copy) -> GridResult<()>
    {
        self.check_compatible(other)?;
        for (name, values) in self.variables.iter_mut()
        {
            let rhs = &other.variables[name];
            values.iter_mut().zip(rhs).for_each(|(a, &b)| *a = combine(*a, b, op));
        }
        self.state = FieldState::Populated;
        Ok(())
    }

    fn map_valid(&mut self, op: impl Fn(f64) -> f64)
    {
        for values in self.variables.values_mut()
        {
            values.iter_mut().filter(|v| !v.is_missing()).for_each(|v| *v = op(*v));
        }
    }

    ///
    /// Copy the values of every variable of `other` into the variable of
    /// the same name, missing cells included. Variables only `self` holds
    /// are left as they are; a variable `self` lacks is an error and
    /// nothing is copied.
    ///
    pub fn assign(&mut self, other: &DistributedField) -> GridResult<()>
    {
        self.check_partition(other)?;
        if other.variables.keys().any(|k| !self.variables.contains_key(k))
        {
            return Err(GridError::VariableMismatch { left: self.names(), right: other.names() });
        }
        for (name, values) in &other.variables
        {
            self.variables[name].copy_from_slice(values);
        }
        self.state = FieldState::Populated;
        Ok(())
    }

    /// `self += other`
    pub fn add(&mut self, other: &DistributedField) -> GridResult<()>
    {
        self.zip_with(other, |a, b| a + b)
    }

    /// `self -= other`
    pub fn sub(&mut self, other: &DistributedField) -> GridResult<()>
    {
        self.zip_with(other, |a, b| a - b)
    }

    /// `self += scalar * other`
    pub fn axpy(&mut self, scalar: f64, other: &DistributedField) -> GridResult<()>
    {
        self.zip_with(other, move |a, b| a + scalar * b)
    }

    /// `self = x1 - x2`
    pub fn diff(&mut self, x1: &DistributedField, x2: &DistributedField) -> GridResult<()>
    {
        x1.check_compatible(x2)?;
        self.check_compatible(x1)?;
        for (name, values) in self.variables.iter_mut()
        {
            let (a, b) = (&x1.variables[name], &x2.variables[name]);
            values.iter_mut().zip(a.iter().zip(b)).for_each(|(v, (&a, &b))| *v = combine(a, b, |a, b| a - b));
        }
        self.state = FieldState::Populated;
        Ok(())
    }

    /// Multiply every valid cell by `z`; missing cells stay missing.
    pub fn scale(&mut self, z: f64)
    {
        self.map_valid(|v| v * z);
        self.state = FieldState::Populated;
    }

    /// Set every valid cell to 0. Missing cells stay missing so masked
    /// points are not exposed again.
    pub fn zero(&mut self)
    {
        self.map_valid(|_| 0.0);
    }

    /// Set every valid cell to 1, with the same policy as [`zero`](Self::zero).
    pub fn ones(&mut self)
    {
        self.map_valid(|_| 1.0);
        self.state = FieldState::Populated;
    }

    /// Elementwise product.
    pub fn schur_product(&mut self, other: &DistributedField) -> GridResult<()>
    {
        self.zip_with(other, |a, b| a * b)
    }

    /// Elementwise quotient. Dividing by zero yields a missing cell.
    pub fn schur_product_inverse(&mut self, other: &DistributedField) -> GridResult<()>
    {
        self.zip_with(other, |a, b| if b == 0.0 { missing_value() } else { a / b })
    }

    ///
    /// Global sum of `self * other` over cells valid in both fields.
    /// Collective.
    ///
    pub fn dot_product(&self, other: &DistributedField) -> GridResult<f64>
    {
        self.check_compatible(other)?;
        let mut local = 0.0;
        for (name, values) in &self.variables
        {
            local += values.iter().zip(&other.variables[name])
                .filter(|(a, b)| !a.is_missing() && !b.is_missing())
                .map(|(a, b)| a * b)
                .sum::<f64>();
        }
        Ok(ParallelReduction::new(self.domain.comm()).sum(local))
    }

    ///
    /// Root mean square over the valid cells of all variables on all PEs,
    /// or 0 when no PE holds a valid cell. Collective.
    ///
    pub fn norm(&self) -> f64
    {
        let mut acc = [0.0, 0.0];
        for values in self.variables.values()
        {
            for v in values.iter().filter(|v| !v.is_missing())
            {
                acc[0] += v * v;
                acc[1] += 1.0;
            }
        }
        ParallelReduction::new(self.domain.comm()).sum_many(&mut acc);
        if acc[1] == 0.0
        {
            debug!("norm of a field with no valid cells");
            return 0.0;
        }
        (acc[0] / acc[1]).sqrt()
    }

    /// Mark land cells (`gmask == 0`) missing. Does nothing without a land mask.
    pub fn apply_mask(&mut self)
    {
        let Some(mask) = self.domain.mask()
        else
        {
            debug!("no land mask to apply");
            return;
        };
        for values in self.variables.values_mut()
        {
            values.iter_mut().zip(mask).filter(|(_, m)| **m == 0).for_each(|(v, _)| *v = missing_value());
        }
    }

    ///
    /// Zero the field and put 1 at each global point `(ixdir[k], iydir[k])`
    /// in every variable. Points owned by other PEs are skipped here and
    /// set there.
    ///
    pub fn dirac(&mut self, ixdir: &[usize], iydir: &[usize]) -> GridResult<()>
    {
        if ixdir.is_empty()
        {
            return Err(GridError::InvalidInput("dirac needs at least one point".to_string()));
        }
        if ixdir.len() != iydir.len()
        {
            return Err(GridError::DimensionMismatch
            {
                context: "DistributedField::dirac",
                expected: vec![ixdir.len()],
                found: vec![iydir.len()],
            });
        }
        let grid = *self.domain.grid();
        if let Some((i, j)) = ixdir.iter().zip(iydir).find(|&(&i, &j)| i >= grid.nx() || j >= grid.ny())
        {
            return Err(GridError::InvalidInput(format!("dirac point ({i}, {j}) is outside the {grid} grid")));
        }
        self.zero();
        let partition = self.domain.partition().clone();
        for (&i, &j) in ixdir.iter().zip(iydir)
        {
            if let Some(local) = partition.local_index(grid.global_index(i, j))
            {
                for values in self.variables.values_mut()
                {
                    values[local] = 1.0;
                }
            }
        }
        self.state = FieldState::Populated;
        Ok(())
    }

    ///
    /// Fill valid cells with standard normal samples. Variable `k` draws
    /// from a stream seeded with `seed + k`, one sample per global cell in
    /// global order, so the result does not depend on how the grid is
    /// split across PEs.
    ///
    pub fn random(&mut self, seed: u64)
    {
        let offset = self.domain.partition().global_offset();
        for (k, values) in self.variables.values_mut().enumerate()
        {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(k as u64));
            for _ in 0..offset
            {
                let _: f64 = StandardNormal.sample(&mut rng);
            }
            for v in values.iter_mut()
            {
                let sample: f64 = StandardNormal.sample(&mut rng);
                if !v.is_missing()
                {
                    *v = sample;
                }
            }
        }
        self.state = FieldState::Populated;
    }

    ///
    /// Global min, max and mean of each variable over valid cells.
    /// Collective.
    ///
    pub fn diagnostics(&self) -> Vec<FieldStats>
    {
        let n = self.variables.len();
        let mut sums = vec![0.0; 2 * n];
        let mut mins = vec![f64::MAX; n];
        let mut maxs = vec![f64::MIN; n];
        for (k, values) in self.variables.values().enumerate()
        {
            for &v in values.iter().filter(|v| !v.is_missing())
            {
                sums[2 * k] += v;
                sums[2 * k + 1] += 1.0;
                mins[k] = mins[k].min(v);
                maxs[k] = maxs[k].max(v);
            }
        }
        let red = ParallelReduction::new(self.domain.comm());
        red.sum_many(&mut sums);
        red.min_many(&mut mins);
        red.max_many(&mut maxs);

        self.variables.keys().enumerate().map(|(k, name)|
        {
            let valid = sums[2 * k + 1] as usize;
            let mean = if valid == 0
            {
                debug!("'{}' has no valid cells", name);
                0.0
            }
            else
            {
                sums[2 * k] / valid as f64
            };
            FieldStats { name: name.clone(), min: mins[k], max: maxs[k], mean, valid }
        }).collect()
    }

    ///
    /// Collect every variable onto the root PE. The other PEs get a
    /// placeholder with empty variables. Collective.
    ///
    pub fn gather_to_root(&self) -> GridResult<GlobalField>
    {
        let grid = self.domain.grid();
        let comm = self.domain.comm();
        let mut global = GlobalField::new(grid.nx(), grid.ny());
        for (name, values) in &self.variables
        {
            let pieces = comm.gather_f64(values);
            global.insert(name, pieces.concat())?;
        }
        Ok(global)
    }

    ///
    /// Replace every variable with the root's global values. Only the
    /// root's `global` is read. Collective; a bad root field fails on all
    /// PEs before anything changes.
    ///
    pub fn scatter_from_root(&mut self, global: &GlobalField) -> GridResult<()>
    {
        let names = self.names();
        let mut pieces = Vec::with_capacity(names.len());
        let mut failure = None;
        if self.domain.comm().is_root()
        {
            for name in &names
            {
                match global.values(name).and_then(|v| self.domain.partition().split(v))
                {
                    Ok(p) => pieces.push(p),
                    Err(e) =>
                    {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }
        let comm = self.domain.comm_handle();
        if !ParallelReduction::new(comm.as_ref()).root_status(failure.is_none())
        {
            return Err(failure.unwrap_or(GridError::RootFailure("scatter_from_root")));
        }
        let mut pieces = pieces.into_iter();
        for name in &names
        {
            let local = comm.scatter_f64(pieces.next().unwrap_or_default());
            self.set_values(name, local)?;
        }
        Ok(())
    }

    ///
    /// Distribute one variable from globally ordered root data. `root_data`
    /// is only looked at on the root PE. Collective.
    ///
    pub(crate) fn scatter_variable(&mut self, name: &str, root_data: GridResult<Vec<f64>>) -> GridResult<()>
    {
        if !self.has_variable(name)
        {
            return Err(GridError::UnknownVariable(name.to_string()));
        }
        let comm = self.domain.comm_handle();
        let mut pieces = Vec::new();
        let mut failure = None;
        if comm.is_root()
        {
            match root_data.and_then(|v| self.domain.partition().split(&v))
            {
                Ok(p) => pieces = p,
                Err(e) => failure = Some(e),
            }
        }
        if !ParallelReduction::new(comm.as_ref()).root_status(failure.is_none())
        {
            return Err(failure.unwrap_or(GridError::RootFailure("scatter_variable")));
        }
        let local = comm.scatter_f64(pieces);
        self.set_values(name, local)
    }
}
