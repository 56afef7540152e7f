/// Borrowed view of one z-slice of a [`crate::volume::Volume`].
#[derive(Clone, Copy, Debug)]
pub struct SliceView<'a, T> {
    pub w: usize,
    pub h: usize,
    pub stride: usize, // elements between rows
    pub data: &'a [T],
}

impl<'a, T: Copy> crate::image::traits::ImageView for SliceView<'a, T> {
    type Pixel = T;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[T] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

/// Mutable counterpart of [`SliceView`].
#[derive(Debug)]
pub struct SliceViewMut<'a, T> {
    pub w: usize,
    pub h: usize,
    pub stride: usize,
    pub data: &'a mut [T],
}

impl<'a, T: Copy> crate::image::traits::ImageView for SliceViewMut<'a, T> {
    type Pixel = T;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[T] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

impl<'a, T: Copy> crate::image::traits::ImageViewMut for SliceViewMut<'a, T> {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [T] {
        let start = y * self.stride;
        &mut self.data[start..start + self.w]
    }
}
