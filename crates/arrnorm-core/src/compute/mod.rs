pub mod fft;

pub use fft::{fft2d_forward, fft_shift, ifft2d_real};
