//!
//! Sentinel values marking a cell as having no data (land, sensor gap,
//! out-of-range). The sentinel is an ordinary finite number, never NaN, so
//! it survives serialization and exact equality tests.
//!

/// Types with a reserved "no data" value.
pub trait MissingValue: Copy + PartialEq
{
    const MISSING: Self;

    #[inline]
    fn is_missing(&self) -> bool
    {
        *self == Self::MISSING
    }
}

impl MissingValue for f64
{
    const MISSING: Self = -3.33338887e+38;
}

impl MissingValue for f32
{
    const MISSING: Self = -3.33338887e+38;
}

impl MissingValue for i32
{
    const MISSING: Self = -2147483647;
}

impl MissingValue for i64
{
    const MISSING: Self = -9223372036854775807;
}

/// Sentinel for type `T`.
#[inline]
pub fn missing_value<T: MissingValue>() -> T
{
    T::MISSING
}

/// Fill value used by the gridded datasets on disk.
pub const DATASET_FILL_VALUE: f32 = -32768.0;

#[test]
fn sentinels_are_finite_and_distinct_from_zero()
{
    let m = missing_value::<f64>();
    assert!(m.is_finite());
    assert!(m.is_missing());
    assert!(!0.0f64.is_missing());
    assert!(missing_value::<f32>().is_finite());
    assert_ne!(missing_value::<f32>(), DATASET_FILL_VALUE);
    assert!(missing_value::<i32>().is_missing());
}
