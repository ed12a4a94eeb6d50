use std::num::IntErrorKind;

use url::form_urlencoded;

use crate::core::TransformParams;

/// Builds transform params from a raw query string. Unknown keys are
/// ignored and the first occurrence of a key wins.
pub fn from_query(query: &str) -> TransformParams {
    let mut blur = None;
    let mut crop = None;
    let mut h = None;
    let mut w = None;
    let mut q = None;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let slot = match key.as_ref() {
            "blur" => &mut blur,
            "crop" => &mut crop,
            "h" => &mut h,
            "w" => &mut w,
            "q" => &mut q,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    TransformParams {
        width: w.as_deref().and_then(parse_dimension),
        height: h.as_deref().and_then(parse_dimension),
        blur: blur.as_deref().and_then(parse_float),
        quality: q.as_deref().and_then(parse_int),
        crop_mode: crop,
    }
}

/// Leading base-10 integer of `s`, ignoring anything after the digits, so
/// `"120px"` reads as 120. Values past the `i64` range saturate.
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let end = sign_len(s) + digits_len(&s[sign_len(s)..]);
    match s[..end].parse::<i64>() {
        Ok(v) => Some(v),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Some(i64::MAX),
            IntErrorKind::NegOverflow => Some(i64::MIN),
            _ => None,
        },
    }
}

/// Positive integer prefix of `s`; too-large values saturate to `u32::MAX`
/// so they fail the size checks instead of vanishing.
fn parse_dimension(s: &str) -> Option<u32> {
    parse_int(s)
        .filter(|&v| v > 0)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

/// Leading decimal number of `s` (`"2.5px"` reads as 2.5). Needs at least one
/// digit before any fraction or exponent.
fn parse_float(s: &str) -> Option<f32> {
    let s = s.trim_start();
    let mut end = sign_len(s);
    let int_digits = digits_len(&s[end..]);
    end += int_digits;

    if s[end..].starts_with('.') {
        let frac_digits = digits_len(&s[end + 1..]);
        if int_digits + frac_digits == 0 {
            return None;
        }
        end += 1 + frac_digits;
    } else if int_digits == 0 {
        return None;
    }

    if s[end..].starts_with(['e', 'E']) {
        let exp_sign = sign_len(&s[end + 1..]);
        let exp_digits = digits_len(&s[end + 1 + exp_sign..]);
        if exp_digits > 0 {
            end += 1 + exp_sign + exp_digits;
        }
    }

    // overflow parses to infinity, which the sigma clamp absorbs
    s[..end].parse::<f32>().ok()
}

fn sign_len(s: &str) -> usize {
    usize::from(s.starts_with(['-', '+']))
}

fn digits_len(s: &str) -> usize {
    s.bytes().take_while(u8::is_ascii_digit).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransformConfig;

    #[test]
    fn reads_all_keys() {
        let p = from_query("w=100&h=200&q=50&blur=2000&crop=north");
        assert_eq!(
            p,
            TransformParams {
                width: Some(100),
                height: Some(200),
                blur: Some(2000.0),
                quality: Some(50),
                crop_mode: Some("north".to_string()),
            }
        );
    }

    #[test]
    fn empty_query() {
        assert_eq!(from_query(""), TransformParams::default());
    }

    #[test]
    fn bad_numbers_are_absent() {
        let p = from_query("w=wide&h=&q=best&blur=soft");
        assert_eq!(p.width, None);
        assert_eq!(p.height, None);
        assert_eq!(p.quality, None);
        assert_eq!(p.blur, None);

        let p = from_query("w=0&h=-10&blur=inf");
        assert_eq!(p.width, None);
        assert_eq!(p.height, None);
        assert_eq!(p.blur, None);
    }

    #[test]
    fn integer_prefix() {
        assert_eq!(parse_int("120px"), Some(120));
        assert_eq!(parse_int(" 42"), Some(42));
        assert_eq!(parse_int("-7.5"), Some(-7));
        assert_eq!(parse_int("+3"), Some(3));
        assert_eq!(parse_int("-"), None);
        assert_eq!(parse_int("x1"), None);
        assert_eq!(parse_int("99999999999999999999999"), Some(i64::MAX));
        assert_eq!(parse_int("-99999999999999999999999"), Some(i64::MIN));
    }

    #[test]
    fn huge_values_saturate() {
        let p = from_query("q=99999999999999999999&w=99999999999&h=-99999999999999999999");
        assert_eq!(p.quality, Some(i64::MAX));
        assert_eq!(p.width, Some(u32::MAX));
        assert_eq!(p.height, None);
        assert_eq!(TransformConfig::from_params(&p).quality, 100);

        let p = from_query("q=-99999999999999999999");
        assert_eq!(TransformConfig::from_params(&p).quality, 1);
    }

    #[test]
    fn blur_accepts_fractions() {
        assert_eq!(from_query("blur=1.5").blur, Some(1.5));
        assert_eq!(from_query("blur=3").blur, Some(3.0));
        assert_eq!(from_query("blur=.5").blur, Some(0.5));
        assert_eq!(from_query("blur=2e1").blur, Some(20.0));
    }

    #[test]
    fn blur_reads_numeric_prefix() {
        assert_eq!(from_query("blur=2px").blur, Some(2.0));
        assert_eq!(from_query("blur=%202.5x").blur, Some(2.5));
        assert_eq!(from_query("blur=4.").blur, Some(4.0));
        assert_eq!(from_query("blur=3e").blur, Some(3.0));
        assert_eq!(from_query("blur=-1").blur, Some(-1.0));
        assert_eq!(from_query("blur=.").blur, None);
        assert_eq!(from_query("blur=-").blur, None);
        assert_eq!(from_query("blur=px2").blur, None);

        let huge = from_query("blur=1e99");
        assert_eq!(huge.blur, Some(f32::INFINITY));
        assert_eq!(TransformConfig::from_params(&huge).blur, Some(1000.0));
    }

    #[test]
    fn crop_passes_through_and_first_wins() {
        let p = from_query("crop=Not%20A%20Gravity&crop=north&w=5&w=6");
        assert_eq!(p.crop_mode.as_deref(), Some("Not A Gravity"));
        assert_eq!(p.width, Some(5));
    }
}
