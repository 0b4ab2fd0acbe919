use std::ops::Range;

use crate::errors::{GridError, GridResult};

use super::lonlat_grid::RegularLonLatGrid;

///
/// Horizontal decomposition of a grid into contiguous latitude bands, one
/// band per PE, with no halo. The first `ny % npes` PEs receive one extra
/// row; when there are more PEs than rows the trailing PEs own nothing.
///
/// Cells inside a band keep the global ordering, so the local index of a
/// cell is its global index minus the band's offset.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition
{
    nx: usize,
    ny: usize,
    rank: usize,
    rows: Vec<Range<usize>>,
}

impl Partition
{
    pub fn new(grid: &RegularLonLatGrid, rank: usize, npes: usize) -> GridResult<Self>
    {
        if npes == 0 || rank >= npes
        {
            return Err(GridError::InvalidInput(format!("rank {rank} is not part of a group of {npes} PEs")));
        }
        let base = grid.ny() / npes;
        let rem = grid.ny() % npes;
        let mut rows = Vec::with_capacity(npes);
        let mut cursor = 0;
        for pe in 0..npes
        {
            let n = base + usize::from(pe < rem);
            rows.push(cursor..cursor + n);
            cursor += n;
        }
        Ok(Self { nx: grid.nx(), ny: grid.ny(), rank, rows })
    }

    #[inline]
    pub fn rank(&self) -> usize
    {
        self.rank
    }

    #[inline]
    pub fn npes(&self) -> usize
    {
        self.rows.len()
    }

    /// Rows owned by this PE.
    #[inline]
    pub fn row_range(&self) -> Range<usize>
    {
        self.rows[self.rank].clone()
    }

    /// Rows owned by every PE, in rank order.
    pub fn ranges(&self) -> &[Range<usize>]
    {
        &self.rows
    }

    #[inline]
    pub fn local_size(&self) -> usize
    {
        self.size_of(self.rank)
    }

    #[inline]
    pub fn size_of(&self, pe: usize) -> usize
    {
        self.rows[pe].len() * self.nx
    }

    /// Global index of this PE's first cell.
    #[inline]
    pub fn global_offset(&self) -> usize
    {
        self.offset_of(self.rank)
    }

    #[inline]
    pub fn offset_of(&self, pe: usize) -> usize
    {
        self.rows[pe].start * self.nx
    }

    #[inline]
    pub fn global_size(&self) -> usize
    {
        self.nx * self.ny
    }

    #[inline]
    pub fn global_index(&self, local: usize) -> usize
    {
        self.global_offset() + local
    }

    pub fn local_index(&self, global: usize) -> Option<usize>
    {
        let offset = self.global_offset();
        (global >= offset && global < offset + self.local_size()).then(|| global - offset)
    }

    /// PE owning a global cell.
    pub fn owner_of(&self, global: usize) -> Option<usize>
    {
        let row = global / self.nx;
        self.rows.iter().position(|r| r.contains(&row))
    }

    ///
    /// Cut a globally ordered array into one piece per PE, in rank order,
    /// ready for a scatter.
    ///
    pub fn split<T: Clone>(&self, global: &[T]) -> GridResult<Vec<Vec<T>>>
    {
        if global.len() != self.global_size()
        {
            return Err(GridError::DimensionMismatch
            {
                context: "Partition::split",
                expected: vec![self.global_size()],
                found: vec![global.len()],
            });
        }
        Ok((0..self.npes()).map(|pe|
        {
            let start = self.offset_of(pe);
            global[start..start + self.size_of(pe)].to_vec()
        }).collect())
    }

    /// Same decomposition of the same grid, possibly seen from another PE.
    pub fn same_layout(&self, other: &Partition) -> bool
    {
        self.nx == other.nx && self.ny == other.ny && self.rows == other.rows
    }
}

#[test]
fn four_by_four_over_two_pes()
{
    let grid = RegularLonLatGrid::new(4, 4, true).unwrap();
    let p0 = Partition::new(&grid, 0, 2).unwrap();
    let p1 = Partition::new(&grid, 1, 2).unwrap();
    assert_eq!(p0.row_range(), 0..2);
    assert_eq!(p1.row_range(), 2..4);
    assert_eq!(p0.local_size(), 8);
    assert_eq!(p1.global_offset(), 8);
    assert_eq!(p1.global_index(3), 11);
    assert_eq!(p1.local_index(11), Some(3));
    assert_eq!(p0.local_index(11), None);
    assert_eq!(p0.owner_of(9), Some(1));
    assert!(p0.same_layout(&p1));
    let global: Vec<usize> = (0..16).collect();
    let pieces = p1.split(&global).unwrap();
    assert_eq!(pieces[1], (8..16).collect::<Vec<_>>());
    assert!(p1.split(&global[..15]).is_err());
}

#[test]
fn uneven_and_oversubscribed_splits()
{
    let grid = RegularLonLatGrid::new(3, 5, true).unwrap();
    let p = Partition::new(&grid, 0, 3).unwrap();
    assert_eq!(p.ranges(), &[0..2, 2..4, 4..5]);
    let p = Partition::new(&grid, 6, 7).unwrap();
    assert_eq!(p.local_size(), 0);
    assert_eq!(p.ranges().iter().map(|r| r.len()).sum::<usize>(), 5);
    assert!(Partition::new(&grid, 2, 2).is_err());
}
