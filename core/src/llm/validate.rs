use super::settings::Scalar;
use std::fmt::Debug;
use tracing::warn;

/// Strip a trailing `/api` or, failing that, one trailing slash.
pub fn clean_url(url: &str) -> String {
    if let Some(stripped) = url.strip_suffix("/api") {
        stripped.to_string()
    } else if let Some(stripped) = url.strip_suffix('/') {
        stripped.to_string()
    } else {
        url.to_string()
    }
}

/// Integers pass only when they are exactly 0 or 1. Floats must lie in
/// `[0, 1]`, or merely be non-negative when `unbounded` is set.
pub fn is_valid_fraction(value: Scalar, unbounded: bool) -> bool {
    match value {
        Scalar::Int(v) => v == 0 || v == 1,
        Scalar::Float(v) if unbounded => v >= 0.0,
        Scalar::Float(v) => (0.0..=1.0).contains(&v),
    }
}

/// Accepts any list made only of integers.
///
/// The indices are not compared against `0..=6`, so a short or out-of-range
/// order such as `[9]` still passes and is sent to the server as-is.
pub fn is_valid_sampler_order(order: &[Scalar]) -> bool {
    order.iter().all(|v| v.is_int())
}

/// Return the candidate when present and accepted, otherwise `default`.
///
/// Rejections are logged with the field name; construction never fails.
pub fn accept_or_default<T, F>(field: &str, candidate: Option<T>, accept: F, default: T) -> T
where
    T: Debug,
    F: FnOnce(&T) -> bool,
{
    match candidate {
        None => default,
        Some(v) if accept(&v) => v,
        Some(v) => {
            warn!(target: "kobold_config", setting = field, rejected = ?v, fallback = ?default, "Invalid setting; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_url_strips_api_suffix_once() {
        assert_eq!(clean_url("http://localhost:5001/api"), "http://localhost:5001");
        assert_eq!(clean_url("http://localhost:5001/api/api"), "http://localhost:5001/api");
    }

    #[test]
    fn clean_url_strips_one_trailing_slash() {
        assert_eq!(clean_url("http://localhost:5001/"), "http://localhost:5001");
        assert_eq!(clean_url("http://localhost:5001//"), "http://localhost:5001/");
        // `/api` wins, so the slash before it stays
        assert_eq!(clean_url("http://h/api/"), "http://h/api");
    }

    #[test]
    fn clean_url_leaves_other_urls_alone() {
        assert_eq!(clean_url("http://localhost:5001"), "http://localhost:5001");
        assert_eq!(clean_url("http://localhost:5001/apis"), "http://localhost:5001/apis");
        assert_eq!(clean_url(""), "");
    }

    #[test]
    fn fraction_accepts_integer_endpoints_only() {
        assert!(is_valid_fraction(Scalar::Int(0), false));
        assert!(is_valid_fraction(Scalar::Int(1), false));
        assert!(!is_valid_fraction(Scalar::Int(2), false));
        assert!(!is_valid_fraction(Scalar::Int(2), true));
        assert!(!is_valid_fraction(Scalar::Int(-1), false));
    }

    #[test]
    fn fraction_range_checks_floats() {
        assert!(is_valid_fraction(Scalar::Float(0.0), false));
        assert!(is_valid_fraction(Scalar::Float(0.92), false));
        assert!(is_valid_fraction(Scalar::Float(1.0), false));
        assert!(!is_valid_fraction(Scalar::Float(1.5), false));
        assert!(!is_valid_fraction(Scalar::Float(-0.1), false));
        assert!(!is_valid_fraction(Scalar::Float(f64::NAN), false));
    }

    #[test]
    fn fraction_unbounded_only_needs_non_negative() {
        assert!(is_valid_fraction(Scalar::Float(1.5), true));
        assert!(is_valid_fraction(Scalar::Float(250.0), true));
        assert!(!is_valid_fraction(Scalar::Float(-0.5), true));
    }

    #[test]
    fn sampler_order_only_checks_element_types() {
        let ints = |v: &[i64]| v.iter().map(|&n| Scalar::Int(n)).collect::<Vec<_>>();
        assert!(is_valid_sampler_order(&ints(&[6, 0, 1, 3, 4, 2, 5])));
        assert!(is_valid_sampler_order(&ints(&[0, 1, 2, 3, 4, 5])));
        // Not a permutation of 0..=6, accepted all the same
        assert!(is_valid_sampler_order(&ints(&[9, 9])));
        assert!(is_valid_sampler_order(&[]));
        assert!(!is_valid_sampler_order(&[Scalar::Int(0), Scalar::Float(1.0)]));
    }

    #[test]
    fn accept_or_default_picks_value_or_fallback() {
        assert_eq!(accept_or_default("top_k", Some(40), |v| *v >= 0, 100), 40);
        assert_eq!(accept_or_default("top_k", Some(-4), |v| *v >= 0, 100), 100);
        assert_eq!(accept_or_default("top_k", None, |_| unreachable!(), 100), 100);
    }
}
