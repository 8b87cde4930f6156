use std::{
    fmt::{Debug, Display},
    ops::{AddAssign, DivAssign, MulAssign, SubAssign},
};

use num_traits::{ConstOne, ConstZero};

pub trait Float:
    'static
    + Display
    + Debug
    + Sync
    + Send
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + num_traits::Float
    + num_traits::NumCast
    + ConstZero
    + ConstOne
{
    /// Short name of the precision, part of chord cache file names.
    const NAME: &'static str;
    const TWO: Self;
    const PI: Self;
    const TWO_FIVE_FIVE: Self;
}

impl Float for f32 {
    const NAME: &'static str = "f32";
    const TWO: Self = 2.0;
    const PI: Self = core::f32::consts::PI;
    const TWO_FIVE_FIVE: Self = 255.0;
}

impl Float for f64 {
    const NAME: &'static str = "f64";
    const TWO: Self = 2.0;
    const PI: Self = core::f64::consts::PI;
    const TWO_FIVE_FIVE: Self = 255.0;
}
