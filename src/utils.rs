use std::fmt::{Display, Error, Formatter};

#[allow(clippy::while_let_on_iterator)]
pub fn disp_slice<T: Display>(f: &mut Formatter<'_>, iterable: &[T], sep: &str) -> Result<(), Error> {
    let mut i = iterable.iter();
    if let Some(first) = i.next() {
        write!(f, "{first}")?;
        while let Some(other) = i.next() {
            write!(f, "{sep}")?;
            write!(f, "{other}")?;
        }
    }
    Result::Ok(())
}

#[allow(clippy::while_let_on_iterator)]
pub fn disp_iter<T: Display>(f: &mut Formatter<'_>, iterable: impl Iterator<Item = T>, sep: &str) -> Result<(), Error> {
    let mut i = iterable;
    if let Some(first) = i.next() {
        write!(f, "{first}")?;
        while let Some(other) = i.next() {
            write!(f, "{sep}")?;
            write!(f, "{other}")?;
        }
    }
    Result::Ok(())
}

/// Formats a real number so that it lexes back as a decimal (never as an integer).
pub fn fmt_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reals_keep_a_fractional_part() {
        assert_eq!(fmt_real(5.0), "5.0");
        assert_eq!(fmt_real(0.75), "0.75");
        assert_eq!(fmt_real(-3.5), "-3.5");
    }
}
