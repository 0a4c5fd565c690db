mod float;
mod int;

/// \[Hz\]
pub struct Hz;

/// \[kHz\]
#[allow(non_camel_case_types)]
pub struct kHz;

/// \[MHz\]
pub struct MHz;

/// Frequency
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Freq<T: Copy> {
    pub(crate) freq: T,
}

impl<T: Copy> core::fmt::Debug for Freq<T>
where
    T: core::fmt::Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} Hz", self.freq)
    }
}

impl<T: Copy> Freq<T> {
    #[inline]
    /// Returns the frequency in Hz.
    pub const fn hz(&self) -> T {
        self.freq
    }
}

impl Freq<u32> {
    /// Zero frequency, used for unmodulated raw frames.
    pub const ZERO: Self = Self { freq: 0 };

    /// Returns the frequency as a float.
    #[must_use]
    pub fn as_f64(&self) -> Freq<f64> {
        Freq {
            freq: self.freq as f64,
        }
    }

    /// Returns `true` for [`Freq::ZERO`].
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.freq == 0
    }
}

impl Eq for Freq<u32> {}

impl Ord for Freq<u32> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.freq.cmp(&other.freq)
    }
}

impl core::hash::Hash for Freq<u32> {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.freq.hash(state);
    }
}

impl<T> core::ops::Add<Freq<T>> for Freq<T>
where
    T: core::ops::Add<Output = T> + Copy,
{
    type Output = Freq<T>;

    fn add(self, rhs: Freq<T>) -> Self::Output {
        Freq {
            freq: self.freq + rhs.freq,
        }
    }
}

impl<T> core::ops::Sub<Freq<T>> for Freq<T>
where
    T: core::ops::Sub<Output = T> + Copy,
{
    type Output = Freq<T>;

    fn sub(self, rhs: Freq<T>) -> Self::Output {
        Freq {
            freq: self.freq - rhs.freq,
        }
    }
}

impl<T, U> core::ops::Mul<U> for Freq<T>
where
    T: core::ops::Mul<U, Output = T> + Copy,
{
    type Output = Freq<T>;

    fn mul(self, rhs: U) -> Self::Output {
        Freq {
            freq: self.freq * rhs,
        }
    }
}

impl<T, U> core::ops::Div<U> for Freq<T>
where
    T: core::ops::Div<U, Output = T> + Copy,
{
    type Output = Freq<T>;

    fn div(self, rhs: U) -> Self::Output {
        Freq {
            freq: self.freq / rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ops() {
        assert_eq!(200 * Hz, 100 * Hz + 100 * Hz);
        assert_eq!(0 * Hz, 100 * Hz - 100 * Hz);
        assert_eq!(200 * Hz, 100 * Hz * 2);
        assert_eq!(50 * Hz, 100 * Hz / 2);
    }

    #[test]
    fn dbg() {
        assert_eq!(format!("{:?}", 100 * Hz), "100 Hz");
        assert_eq!(format!("{:?}", 100 * kHz), "100000 Hz");
        assert_eq!(format!("{:?}", 30 * MHz), "30000000 Hz");
    }

    #[rstest::rstest]
    #[case(30_000_000., 30 * MHz)]
    #[case(0., Freq::ZERO)]
    fn as_f64(#[case] expect: f64, #[case] freq: Freq<u32>) {
        approx::assert_abs_diff_eq!(expect, freq.as_f64().hz());
    }

    #[test]
    fn ord() {
        let mut v = vec![60 * MHz, 20 * MHz, 30 * MHz];
        v.sort();
        assert_eq!(vec![20 * MHz, 30 * MHz, 60 * MHz], v);
    }

    #[test]
    fn serde_transparent() -> anyhow::Result<()> {
        assert_eq!("30000000", serde_json::to_string(&(30 * MHz))?);
        assert_eq!(20 * MHz, serde_json::from_str::<Freq<u32>>("20000000")?);
        Ok(())
    }
}
