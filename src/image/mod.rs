pub mod i16;
pub mod io;
pub mod slice;
pub mod traits;

pub use self::i16::ImageI16;
pub use self::slice::{SliceView, SliceViewMut};
pub use self::traits::{ImageView, ImageViewMut, Rows};
