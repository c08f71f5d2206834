// radix-2 FFT for the power-of-two field grids, 2D = rows then columns, parallel over lines

use std::ops::{Add, AddAssign, Mul, MulAssign, Sub};

use rayon::prelude::*;

use crate::error::{Result, SimError, try_alloc};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Complex {
    pub re: f32,
    pub im: f32,
}

impl Complex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    #[inline]
    pub const fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    #[inline]
    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }

    #[inline]
    pub fn norm_sqr(self) -> f32 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.re.is_finite() && self.im.is_finite()
    }
}

impl Add for Complex {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl AddAssign for Complex {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Complex {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Mul<f32> for Complex {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.re * rhs, self.im * rhs)
    }
}

impl MulAssign<f32> for Complex {
    #[inline]
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    /// includes the 1 / len normalisation
    Inverse,
}

/// Precomputed 1D transform of a fixed power-of-two length.
#[derive(Clone, Debug)]
pub struct Fft1d {
    len: usize,
    twiddles: Vec<Complex>, // exp(-2 pi i k / len), k < len / 2
}

impl Fft1d {
    pub fn new(len: usize) -> Self {
        assert!(len.is_power_of_two(), "fft length {len} is not a power of two");
        let twiddles = (0..len / 2)
            .map(|k| {
                // f64 keeps the large-k twiddles accurate
                let angle = -std::f64::consts::TAU * k as f64 / len as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();
        Self { len, twiddles }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn process(&self, buf: &mut [Complex], direction: Direction) {
        debug_assert_eq!(buf.len(), self.len);
        let len = self.len;
        if len <= 1 {
            return;
        }

        let bits = len.trailing_zeros();
        for i in 0..len {
            let j = i.reverse_bits() >> (usize::BITS - bits);
            if j > i {
                buf.swap(i, j);
            }
        }

        let mut size = 2;
        while size <= len {
            let half = size / 2;
            let stride = len / size;
            for block in buf.chunks_exact_mut(size) {
                let (lo, hi) = block.split_at_mut(half);
                for (k, (a, b)) in lo.iter_mut().zip(hi.iter_mut()).enumerate() {
                    let w = match direction {
                        Direction::Forward => self.twiddles[k * stride],
                        Direction::Inverse => self.twiddles[k * stride].conj(),
                    };
                    let t = *b * w;
                    *b = *a - t;
                    *a += t;
                }
            }
            size *= 2;
        }

        if direction == Direction::Inverse {
            let scale = 1.0 / len as f32;
            buf.iter_mut().for_each(|c| *c *= scale);
        }
    }
}

/// Row-major 2D transform over a `width x height` grid.
#[derive(Clone, Debug)]
pub struct Fft2d {
    width: usize,
    height: usize,
    rows: Fft1d,
    cols: Fft1d,
    scratch: Vec<Complex>, // transposed copy, column-major
}

impl Fft2d {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if !(width.is_power_of_two() && height.is_power_of_two()) {
            return Err(SimError::InvalidFieldSize {
                width: width as u32,
                height: height as u32,
            });
        }
        let len = width.checked_mul(height).ok_or(SimError::Allocation {
            what: "fft scratch",
            requested: usize::MAX,
        })?;
        // scratch first: an oversized grid fails here before any twiddle table is built
        let scratch = try_alloc("fft scratch", len, Complex::ZERO)?;
        Ok(Self {
            width,
            height,
            rows: Fft1d::new(width),
            cols: Fft1d::new(height),
            scratch,
        })
    }

    pub fn process(&mut self, data: &mut [Complex], direction: Direction) {
        let (w, h) = (self.width, self.height);
        debug_assert_eq!(data.len(), w * h);

        let rows = &self.rows;
        data.par_chunks_mut(w)
            .for_each(|row| rows.process(row, direction));

        {
            let src: &[Complex] = data;
            self.scratch
                .par_chunks_mut(h)
                .enumerate()
                .for_each(|(x, column)| {
                    for (y, c) in column.iter_mut().enumerate() {
                        *c = src[y * w + x];
                    }
                });
        }

        let cols = &self.cols;
        self.scratch
            .par_chunks_mut(h)
            .for_each(|column| cols.process(column, direction));

        let scratch = &self.scratch;
        data.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, c) in row.iter_mut().enumerate() {
                *c = scratch[x * h + y];
            }
        });
    }
}
