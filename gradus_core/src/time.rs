// Exact rational time.
//
// Musical durations, accidentals, and interval distances are all exact
// fractions: a dotted quarter is 3/2, a triplet eighth is 1/3, a quarter-tone
// accidental is 1/2 of a semitone. Floating point would accumulate error as
// cursors sum durations across measures, so every temporal quantity in the
// workspace is a `Time`.
//
// Backed by num_rational::Rational64, which keeps values reduced with a
// positive denominator and panics on a zero denominator.

use num_rational::Rational64;
use num_traits::ToPrimitive;

/// Exact fractional quantity used for durations, offsets and accidentals.
pub type Time = Rational64;

/// Shorthand for `num/den`.
pub fn time(num: i64, den: i64) -> Time {
    Time::new(num, den)
}

/// A whole number of time units.
pub fn whole(n: i64) -> Time {
    Time::from_integer(n)
}

/// Lossy conversion for cost arithmetic and display. Exact comparisons should
/// use `Time` directly.
pub fn to_f64(t: Time) -> f64 {
    t.to_f64().unwrap_or(f64::NAN)
}

/// Floored remainder: the result always has the sign of `m`.
pub fn rem_floor(a: Time, m: Time) -> Time {
    a - m * (a / m).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduced_and_sign_normalized() {
        assert_eq!(time(2, 4), time(1, 2));
        assert_eq!(time(1, -2), time(-1, 2));
        assert_eq!(*time(1, -2).denom(), 2);
        assert_eq!(*time(-6, -4).numer(), 3);
    }

    #[test]
    fn test_add_sub_round_trip() {
        let a = time(3, 7);
        let b = time(-5, 12);
        assert_eq!(a + b - b, a);
        assert_eq!((a * b) / b, a);
    }

    #[test]
    #[should_panic]
    fn test_zero_denominator_panics() {
        let _ = time(1, 0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("3/4".parse::<Time>().unwrap(), time(3, 4));
        assert_eq!("-1/2".parse::<Time>().unwrap(), time(-1, 2));
        assert_eq!("+1/2".parse::<Time>().unwrap(), time(1, 2));
        assert_eq!("4".parse::<Time>().unwrap(), whole(4));
        assert!("1.5".parse::<Time>().is_err());
        assert!("".parse::<Time>().is_err());
    }

    #[test]
    fn test_rem_floor() {
        assert_eq!(rem_floor(time(7, 2), whole(2)), time(3, 2));
        assert_eq!(rem_floor(whole(-1), whole(12)), whole(11));
    }
}
