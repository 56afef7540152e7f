//! Dense 3D voxel container with x-fastest layout.
//!
//! Voxel `(x, y, z)` lives at `x + sx * (y + sy * z)`, so every z-slice is a
//! contiguous `sx × sy` block that can be viewed as a 2D image.

use crate::image::{ImageView, SliceView, SliceViewMut};

#[derive(Clone, Debug, PartialEq)]
pub struct Volume<T> {
    size: [usize; 3],
    data: Vec<T>,
}

impl<T: Copy + Default> Volume<T> {
    /// Allocate a volume of `[sx, sy, sz]` voxels set to `T::default()`.
    pub fn new(size: [usize; 3]) -> Self {
        Self::filled(size, T::default())
    }

    /// Reallocate to `size`, discarding the previous contents.
    pub fn resize(&mut self, size: [usize; 3]) {
        self.reset(size, T::default());
    }
}

impl<T: Copy> Volume<T> {
    pub fn filled(size: [usize; 3], value: T) -> Self {
        Self {
            size,
            data: vec![value; size[0] * size[1] * size[2]],
        }
    }

    /// Wrap an existing buffer. Panics when the length does not match `size`.
    pub fn from_vec(size: [usize; 3], data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            size[0] * size[1] * size[2],
            "voxel buffer does not match volume size {size:?}"
        );
        Self { size, data }
    }

    /// Single-slice volume holding a copy of `image`.
    pub fn from_image<I: ImageView<Pixel = T>>(image: &I) -> Self {
        let mut data = Vec::with_capacity(image.width() * image.height());
        for row in image.rows() {
            data.extend_from_slice(row);
        }
        Self {
            size: [image.width(), image.height(), 1],
            data,
        }
    }

    /// Reallocate to `size` with every voxel set to `value`.
    pub fn reset(&mut self, size: [usize; 3], value: T) {
        self.size = size;
        self.data.clear();
        self.data.resize(size[0] * size[1] * size[2], value);
    }

    #[inline]
    pub fn get_size(&self) -> [usize; 3] {
        self.size
    }
    #[inline]
    pub fn sx(&self) -> usize {
        self.size[0]
    }
    #[inline]
    pub fn sy(&self) -> usize {
        self.size[1]
    }
    #[inline]
    pub fn sz(&self) -> usize {
        self.size[2]
    }

    /// Number of voxels in one z-slice.
    #[inline]
    pub fn slice_len(&self) -> usize {
        self.size[0] * self.size[1]
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.size[0] * (y + self.size[1] * z)
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.idx(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, v: T) {
        let i = self.idx(x, y, z);
        self.data[i] = v;
    }

    /// Voxel at a signed coordinate, `None` outside the volume.
    #[inline]
    pub fn get_signed(&self, x: i64, y: i64, z: i64) -> Option<T> {
        if x < 0 || y < 0 || z < 0 {
            return None;
        }
        let (x, y, z) = (x as usize, y as usize, z as usize);
        if x >= self.size[0] || y >= self.size[1] || z >= self.size[2] {
            return None;
        }
        Some(self.at(x, y, z))
    }

    /// 2D view of slice `z`.
    pub fn slice(&self, z: usize) -> SliceView<'_, T> {
        let n = self.slice_len();
        SliceView {
            w: self.size[0],
            h: self.size[1],
            stride: self.size[0],
            data: &self.data[z * n..(z + 1) * n],
        }
    }

    pub fn slice_mut(&mut self, z: usize) -> SliceViewMut<'_, T> {
        let n = self.slice_len();
        SliceViewMut {
            w: self.size[0],
            h: self.size[1],
            stride: self.size[0],
            data: &mut self.data[z * n..(z + 1) * n],
        }
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
