//! Arithmetic and text helpers shared by the MusicXML reader and writer

/// Calculate least common multiple, `None` when it does not fit in a `u32`
pub fn lcm(a: u32, b: u32) -> Option<u32> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    (a / gcd(a, b)).checked_mul(b)
}

/// Calculate greatest common divisor
pub fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Escape special XML characters
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Keep only the ASCII digits of a measure number such as "12a" or "X3"
pub fn measure_number_digits(raw: &str) -> Option<u32> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(12, 8), 4);
        assert_eq!(gcd(17, 5), 1);
        assert_eq!(gcd(100, 50), 50);
    }

    #[test]
    fn test_lcm() {
        assert_eq!(lcm(12, 8), Some(24));
        assert_eq!(lcm(4, 6), Some(12));
        assert_eq!(lcm(3, 5), Some(15));
        assert_eq!(lcm(0, 5), Some(0));
        assert_eq!(lcm(1_000_003, 999_983), None);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("Tom & \"Jerry\" <3"), "Tom &amp; &quot;Jerry&quot; &lt;3");
    }

    #[test]
    fn test_measure_number_digits() {
        assert_eq!(measure_number_digits("12"), Some(12));
        assert_eq!(measure_number_digits("12a"), Some(12));
        assert_eq!(measure_number_digits("X1"), Some(1));
        assert_eq!(measure_number_digits("pickup"), None);
    }
}
