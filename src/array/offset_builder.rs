//! Contains the declaration of [`OffsetsBuilder`]

use arrow_array::OffsetSizeTrait;
use arrow_buffer::OffsetBuffer;

use crate::error::LayerError as Error;

/// A wrapper type of [`Vec<O>`] representing the invariants of Arrow's offsets.
/// It is guaranteed to (sound to assume that):
/// * the first element is `0`
/// * element at position `i` is >= than element at position `i-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetsBuilder<O: OffsetSizeTrait>(Vec<O>);

impl<O: OffsetSizeTrait> Default for OffsetsBuilder<O> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<O: OffsetSizeTrait> OffsetsBuilder<O> {
    /// Returns an empty [`OffsetsBuilder`] (i.e. with a single element, the zero)
    #[inline]
    pub fn new() -> Self {
        Self(vec![O::usize_as(0)])
    }

    /// Returns a new [`OffsetsBuilder`] with a capacity, allocating at least `capacity + 1`
    /// entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut offsets = Vec::with_capacity(capacity + 1);
        offsets.push(O::usize_as(0));
        Self(offsets)
    }

    /// Reserves `additional` entries.
    pub fn reserve(&mut self, additional: usize) {
        self.0.reserve(additional);
    }

    /// Pushes a new element with a given length.
    /// # Error
    /// This function errors iff the new last item is larger than what `O` supports.
    #[inline]
    pub fn try_push_usize(&mut self, length: usize) -> Result<(), Error> {
        let last = self.last().to_usize().ok_or(Error::Overflow)?;
        let new_last = last.checked_add(length).ok_or(Error::Overflow)?;
        self.0.push(O::from_usize(new_last).ok_or(Error::Overflow)?);
        Ok(())
    }

    /// Returns the last offset of this container.
    #[inline]
    pub fn last(&self) -> &O {
        // The vec is created with one element and never shrinks below it.
        &self.0[self.0.len() - 1]
    }

    /// Returns the length an array with these offsets would be.
    #[inline]
    pub fn len_proxy(&self) -> usize {
        self.0.len() - 1
    }

    /// Extends itself with `additional` elements equal to the last offset.
    /// This is useful to extend offsets with empty values, e.g. for null slots.
    #[inline]
    pub fn extend_constant(&mut self, additional: usize) {
        let offset = *self.last();
        self.0.resize(self.0.len() + additional, offset)
    }

    /// Returns the byte slice stored in this buffer
    #[inline]
    pub fn as_slice(&self) -> &[O] {
        self.0.as_slice()
    }

    pub fn finish(self) -> OffsetBuffer<O> {
        self.into()
    }
}

impl<O: OffsetSizeTrait> From<OffsetsBuilder<O>> for OffsetBuffer<O> {
    fn from(value: OffsetsBuilder<O>) -> Self {
        OffsetBuffer::new(value.0.into())
    }
}

/// Checks that `offsets` starts at zero, never decreases, and ends at `child_len`.
pub(crate) fn check_offsets(offsets: &[i32], child_len: usize, level: &str) -> Result<(), Error> {
    match offsets.first() {
        None => {
            return Err(Error::General(format!(
                "{} offsets must have at least one element",
                level
            )))
        }
        Some(first) if *first != 0 => {
            return Err(Error::General(format!("{} offsets must start at 0", level)))
        }
        _ => (),
    }

    if offsets.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::General(format!(
            "{} offsets must be monotonically increasing",
            level
        )));
    }

    let last = offsets[offsets.len() - 1] as usize;
    if last != child_len {
        return Err(Error::General(format!(
            "largest {} offset {} does not match child length {}",
            level, last, child_len
        )));
    }
    Ok(())
}
