use std::mem::MaybeUninit;

use ndarray::OwnedRepr;
use ndarray::{prelude::*, Data, RemoveAxis, Slice, Zip};

/// Constant padding along one axis.
///
/// `n_pads` is `(before, after)`. The input elements are copied unchanged
/// into the middle of the result.
pub trait Pad<A> {
    type WithOwnedA;
    fn pad(&self, n_pads: (usize, usize), axis: Axis, fill: A) -> Self::WithOwnedA;
}

impl<A, S, D> Pad<A> for ArrayBase<S, D>
where
    A: Copy,
    S: Data<Elem = A>,
    D: Dimension + RemoveAxis,
{
    type WithOwnedA = ArrayBase<OwnedRepr<A>, D>;
    fn pad(
        &self,
        (n_pad_before, n_pad_after): (usize, usize),
        axis: Axis,
        fill: A,
    ) -> Self::WithOwnedA {
        let n_main = self.len_of(axis);
        let mut shape = self.raw_dim();
        shape[axis.index()] += n_pad_before + n_pad_after;
        let mut result = Self::WithOwnedA::uninit(shape);

        Zip::from(self).map_assign_into(
            result.slice_axis_mut(axis, Slice::from(n_pad_before..n_pad_before + n_main)),
            |x| *x,
        );
        result
            .slice_axis_mut(axis, Slice::from(..n_pad_before))
            .mapv_inplace(|_| MaybeUninit::new(fill));
        result
            .slice_axis_mut(axis, Slice::from(n_pad_before + n_main..))
            .mapv_inplace(|_| MaybeUninit::new(fill));
        unsafe { result.assume_init() }
    }
}
