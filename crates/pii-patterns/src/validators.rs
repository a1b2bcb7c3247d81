//! Built-in value validators, referenced by name from pattern specs.
//!
//! A validator confirms that a regex hit is semantically plausible
//! before the engine accepts it as a candidate. Checksums catch most
//! random digit runs; range checks catch impossible values.

use std::sync::Arc;

use crate::descriptor::Validator;

/// Look up a built-in validator by its registered name.
pub fn by_name(name: &str) -> Option<Validator> {
    match name {
        "luhn" => Some(Arc::new(|value, _| luhn(value))),
        "ipv4_octets" => Some(Arc::new(|value, _| ipv4_octets(value))),
        "iban_mod97" => Some(Arc::new(|value, _| iban_mod97(value))),
        "plausible_dob" => Some(Arc::new(|value, _| plausible_dob(value))),
        "not_all_same_digit" => Some(Arc::new(|value, _| not_all_same_digit(value))),
        _ => None,
    }
}

/// Luhn check digit over the digits in `value`. Non-digits (spaces,
/// dashes) are ignored. Accepts 12 to 19 digits.
pub fn luhn(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 12 || digits.len() > 19 {
        return false;
    }
    let mut sum = 0u32;
    let mut double = false;
    for &d in digits.iter().rev() {
        let mut d = d;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// All four dotted octets parse and fit in 0..=255.
pub fn ipv4_octets(value: &str) -> bool {
    let mut count = 0;
    for part in value.split('.') {
        count += 1;
        if count > 4 || part.is_empty() || part.len() > 3 {
            return false;
        }
        match part.parse::<u16>() {
            Ok(n) if n <= 255 => {}
            _ => return false,
        }
    }
    count == 4
}

/// IBAN mod-97 check: move the first four characters to the end, map
/// letters to 10..=35, and the big number must be 1 mod 97.
pub fn iban_mod97(value: &str) -> bool {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.len() < 15 || cleaned.len() > 34 {
        return false;
    }
    let rearranged = format!("{}{}", &cleaned[4..], &cleaned[..4]);
    let mut rem: u32 = 0;
    for c in rearranged.chars() {
        let v = if c.is_ascii_digit() {
            c as u32 - '0' as u32
        } else {
            c as u32 - 'A' as u32 + 10
        };
        rem = if v < 10 {
            (rem * 10 + v) % 97
        } else {
            (rem * 100 + v) % 97
        };
    }
    rem == 1
}

/// Any four-digit year inside the value must fall in 1900..=current.
/// Values with no four-digit year (two-digit formats) pass.
pub fn plausible_dob(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().map(|c| c.to_digit(10).unwrap_or(10)).collect();
    let current = current_year();
    let mut i = 0;
    while i + 4 <= digits.len() {
        if digits[i..i + 4].iter().all(|&d| d < 10) {
            // Skip runs longer than 4 digits, they are not years.
            let run_ok = (i == 0 || digits[i - 1] >= 10)
                && (i + 4 == digits.len() || digits[i + 4] >= 10);
            if run_ok {
                let year = digits[i..i + 4].iter().fold(0, |acc, &d| acc * 10 + d);
                if !(1900..=current).contains(&year) {
                    return false;
                }
                i += 4;
                continue;
            }
        }
        i += 1;
    }
    true
}

/// At least two distinct digits appear in the value.
pub fn not_all_same_digit(value: &str) -> bool {
    let mut first = None;
    for c in value.chars().filter(|c| c.is_ascii_digit()) {
        match first {
            None => first = Some(c),
            Some(f) if f != c => return true,
            Some(_) => {}
        }
    }
    false
}

/// Current calendar year, from the system clock. Good enough for a
/// plausibility bound; no timezone handling needed.
fn current_year() -> u32 {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    1970 + (secs / 31_557_600) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn_known_good() {
        // Standard test card numbers.
        assert!(luhn("4111111111111111"));
        assert!(luhn("5500 0000 0000 0004"));
        assert!(luhn("4111-1111-1111-1111"));
        assert!(luhn("378282246310005"));
    }

    #[test]
    fn test_luhn_rejects() {
        assert!(!luhn("4111111111111112"));
        assert!(!luhn("1234"));
        assert!(!luhn("12345678901234567890"));
        assert!(!luhn("no digits here"));
    }

    #[test]
    fn test_ipv4_octets() {
        assert!(ipv4_octets("192.168.1.1"));
        assert!(ipv4_octets("0.0.0.0"));
        assert!(ipv4_octets("255.255.255.255"));
        assert!(!ipv4_octets("256.1.1.1"));
        assert!(!ipv4_octets("1.2.3"));
        assert!(!ipv4_octets("1.2.3.4.5"));
        assert!(!ipv4_octets("1.2.3.1000"));
    }

    #[test]
    fn test_iban_mod97() {
        assert!(iban_mod97("GB82WEST12345698765432"));
        assert!(iban_mod97("DE89370400440532013000"));
        assert!(!iban_mod97("GB82WEST12345698765433"));
        assert!(!iban_mod97("XX00"));
    }

    #[test]
    fn test_plausible_dob() {
        assert!(plausible_dob("1987-04-12"));
        assert!(plausible_dob("04/12/87"));
        assert!(plausible_dob("12/31/1999"));
        assert!(!plausible_dob("3010-01-01"));
        assert!(!plausible_dob("1850-06-06"));
    }

    #[test]
    fn test_not_all_same_digit() {
        assert!(not_all_same_digit("123-45-6789"));
        assert!(!not_all_same_digit("000-00-0000"));
        assert!(!not_all_same_digit("1111111111"));
        assert!(!not_all_same_digit("abc"));
    }

    #[test]
    fn test_by_name_lookup() {
        assert!(by_name("luhn").is_some());
        assert!(by_name("ipv4_octets").is_some());
        assert!(by_name("mod11").is_none());
    }
}
