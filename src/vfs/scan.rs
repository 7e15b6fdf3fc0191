//! Formatted input
//!
//! Implements the `scanf` family of directives over a `ByteSource`:
//! whitespace in the format skips any input whitespace, ordinary bytes must
//! match exactly, and `%` introduces a conversion of the form
//! `%[*][width][length]conv`. Supported conversions are `d i u o x X`,
//! `f F e E g G a A`, `s`, `c`, `[set]` and `%%`. Length modifiers are
//! accepted and ignored, values are always widened to 64 bits.

use crate::vfs::interface::ByteSource;

/// A field produced by one assigning conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ScanValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
enum Conversion {
    Signed(u32),
    Unsigned(u32),
    Float,
    Str,
    Chars,
    Set { negated: bool, members: Box<[bool; 256]> },
    Percent,
}

#[derive(Debug, Clone, PartialEq)]
struct Directive {
    suppress: bool,
    width: Option<usize>,
    conversion: Conversion,
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

/// Parse the directive starting right after a `%`. Returns the directive and
/// the index of the first format byte after it.
fn parse_directive(fmt: &[u8], mut i: usize) -> Option<(Directive, usize)> {
    let mut suppress = false;
    if fmt.get(i) == Some(&b'*') {
        suppress = true;
        i += 1;
    }

    let mut width = None;
    while let Some(digit) = fmt.get(i).filter(|b| b.is_ascii_digit()) {
        let w: usize = width.unwrap_or(0);
        width = Some(w.checked_mul(10)?.checked_add((digit - b'0') as usize)?);
        i += 1;
    }
    if width == Some(0) {
        return None;
    }

    while matches!(fmt.get(i), Some(b'h' | b'l' | b'L' | b'q' | b'j' | b'z' | b't')) {
        i += 1;
    }

    let conversion = match *fmt.get(i)? {
        b'd' => Conversion::Signed(10),
        b'i' => Conversion::Signed(0),
        b'u' => Conversion::Unsigned(10),
        b'o' => Conversion::Unsigned(8),
        b'x' | b'X' => Conversion::Unsigned(16),
        b'f' | b'F' | b'e' | b'E' | b'g' | b'G' | b'a' | b'A' => Conversion::Float,
        b's' => Conversion::Str,
        b'c' => Conversion::Chars,
        b'%' if !suppress && width.is_none() => Conversion::Percent,
        b'[' => {
            let (conversion, end) = parse_set(fmt, i + 1)?;
            return Some((Directive { suppress, width, conversion }, end));
        }
        _ => return None,
    };

    Some((Directive { suppress, width, conversion }, i + 1))
}

fn parse_set(fmt: &[u8], mut i: usize) -> Option<(Conversion, usize)> {
    let mut members = Box::new([false; 256]);
    let negated = fmt.get(i) == Some(&b'^');
    if negated {
        i += 1;
    }

    // A leading ']' is a member, not the terminator
    if fmt.get(i) == Some(&b']') {
        members[b']' as usize] = true;
        i += 1;
    }

    loop {
        let byte = *fmt.get(i)?;
        if byte == b']' {
            break;
        }
        match (fmt.get(i + 1), fmt.get(i + 2)) {
            (Some(b'-'), Some(&hi)) if hi != b']' && hi >= byte => {
                for member in byte..=hi {
                    members[member as usize] = true;
                }
                i += 3;
            }
            _ => {
                members[byte as usize] = true;
                i += 1;
            }
        }
    }

    Some((Conversion::Set { negated, members }, i + 1))
}

struct Input<'s, S: ByteSource + ?Sized> {
    source: &'s mut S,
}

impl<S: ByteSource + ?Sized> Input<'_, S> {
    fn peek(&mut self) -> Option<u8> {
        let byte = self.source.next_byte()?;
        self.source.unread(byte);
        Some(byte)
    }

    fn bump(&mut self) {
        self.source.next_byte();
    }

    /// Consume the next byte if `accept` says so, respecting `remaining`
    fn take_if(&mut self, remaining: &mut usize, accept: impl Fn(u8) -> bool) -> Option<u8> {
        if *remaining == 0 {
            return None;
        }
        let byte = self.source.next_byte()?;
        if accept(byte) {
            *remaining -= 1;
            Some(byte)
        } else {
            self.source.unread(byte);
            None
        }
    }

    fn skip_space(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.bump();
        }
    }

    fn integer(&mut self, width: Option<usize>, radix: u32, signed: bool) -> Option<ScanValue> {
        let mut remaining = width.unwrap_or(usize::MAX);
        let negative = self
            .take_if(&mut remaining, |b| b == b'+' || b == b'-')
            .is_some_and(|b| b == b'-');

        let mut radix = radix;
        let mut digits = String::new();
        if (radix == 0 || radix == 16) && self.take_if(&mut remaining, |b| b == b'0').is_some() {
            if self.take_if(&mut remaining, |b| b == b'x' || b == b'X').is_some() {
                radix = 16;
            } else {
                digits.push('0');
                if radix == 0 {
                    radix = 8;
                }
            }
        }
        if radix == 0 {
            radix = 10;
        }

        while let Some(byte) = self.take_if(&mut remaining, |b| (b as char).is_digit(radix)) {
            digits.push(byte as char);
        }
        if digits.is_empty() {
            return None;
        }

        let magnitude = u64::from_str_radix(&digits, radix).unwrap_or(u64::MAX);
        if signed {
            let value = if negative {
                0i64.checked_sub_unsigned(magnitude).unwrap_or(i64::MIN)
            } else {
                i64::try_from(magnitude).unwrap_or(i64::MAX)
            };
            Some(ScanValue::Int(value))
        } else if negative {
            Some(ScanValue::UInt(magnitude.wrapping_neg()))
        } else {
            Some(ScanValue::UInt(magnitude))
        }
    }

    fn float(&mut self, width: Option<usize>) -> Option<ScanValue> {
        let mut remaining = width.unwrap_or(usize::MAX);
        let mut text = String::new();
        if let Some(sign) = self.take_if(&mut remaining, |b| b == b'+' || b == b'-') {
            text.push(sign as char);
        }

        if let Some(first) = self.take_if(&mut remaining, |b| matches!(b, b'i' | b'I' | b'n' | b'N')) {
            let word: &[u8] = if first.eq_ignore_ascii_case(&b'i') { b"infinity" } else { b"nan" };
            let mut matched = 1;
            while matched < word.len() {
                let expected = word[matched];
                if self.take_if(&mut remaining, |b| b.eq_ignore_ascii_case(&expected)).is_none() {
                    break;
                }
                matched += 1;
            }
            text.push_str(std::str::from_utf8(&word[..matched]).ok()?);
            return text.parse().ok().map(ScanValue::Float);
        }

        let mut mantissa_digits = 0;
        while let Some(byte) = self.take_if(&mut remaining, |b| b.is_ascii_digit()) {
            text.push(byte as char);
            mantissa_digits += 1;
        }
        if self.take_if(&mut remaining, |b| b == b'.').is_some() {
            text.push('.');
            while let Some(byte) = self.take_if(&mut remaining, |b| b.is_ascii_digit()) {
                text.push(byte as char);
                mantissa_digits += 1;
            }
        }
        if mantissa_digits == 0 {
            return None;
        }

        if self.take_if(&mut remaining, |b| b == b'e' || b == b'E').is_some() {
            text.push('e');
            if let Some(sign) = self.take_if(&mut remaining, |b| b == b'+' || b == b'-') {
                text.push(sign as char);
            }
            while let Some(byte) = self.take_if(&mut remaining, |b| b.is_ascii_digit()) {
                text.push(byte as char);
            }
        }

        text.parse().ok().map(ScanValue::Float)
    }

    fn run(&mut self, width: Option<usize>, accept: impl Fn(u8) -> bool) -> Vec<u8> {
        let mut remaining = width.unwrap_or(usize::MAX);
        let mut bytes = Vec::new();
        while let Some(byte) = self.take_if(&mut remaining, &accept) {
            bytes.push(byte);
        }
        bytes
    }
}

enum Outcome {
    Value(ScanValue),
    MatchFailure,
    InputFailure,
}

/// Parse `source` according to `format`, appending every assigned field to
/// `out`. Returns the number of assigned fields, or -1 if the input ended
/// before the first conversion completed.
pub fn scan<S: ByteSource + ?Sized>(source: &mut S, format: &str, out: &mut Vec<ScanValue>) -> i64 {
    let mut input = Input { source };
    let fmt = format.as_bytes();
    let mut assigned = 0i64;
    let mut converted = false;
    let input_failure = |converted: bool, assigned: i64| if converted { assigned } else { -1 };

    let mut i = 0;
    while i < fmt.len() {
        let byte = fmt[i];
        if is_space(byte) {
            input.skip_space();
            while i < fmt.len() && is_space(fmt[i]) {
                i += 1;
            }
            continue;
        }

        if byte != b'%' {
            match input.peek() {
                None => return input_failure(converted, assigned),
                Some(next) if next == byte => input.bump(),
                Some(_) => return assigned,
            }
            i += 1;
            continue;
        }

        let Some((directive, next)) = parse_directive(fmt, i + 1) else {
            log::error!("malformed scan directive at offset {} in {:?}", i, format);
            return assigned;
        };
        i = next;

        if !matches!(directive.conversion, Conversion::Chars | Conversion::Set { .. }) {
            input.skip_space();
        }
        if input.peek().is_none() {
            return input_failure(converted, assigned);
        }

        let outcome = match &directive.conversion {
            Conversion::Percent => {
                if input.peek() == Some(b'%') {
                    input.bump();
                    continue;
                }
                Outcome::MatchFailure
            }
            Conversion::Signed(radix) => input
                .integer(directive.width, *radix, true)
                .map_or(Outcome::MatchFailure, Outcome::Value),
            Conversion::Unsigned(radix) => input
                .integer(directive.width, *radix, false)
                .map_or(Outcome::MatchFailure, Outcome::Value),
            Conversion::Float => input
                .float(directive.width)
                .map_or(Outcome::MatchFailure, Outcome::Value),
            Conversion::Str => {
                let bytes = input.run(directive.width, |b| !is_space(b));
                Outcome::Value(ScanValue::Str(String::from_utf8_lossy(&bytes).into_owned()))
            }
            Conversion::Chars => {
                let count = directive.width.unwrap_or(1);
                let bytes = input.run(Some(count), |_| true);
                if bytes.len() < count {
                    Outcome::InputFailure
                } else {
                    Outcome::Value(ScanValue::Bytes(bytes))
                }
            }
            Conversion::Set { negated, members } => {
                let bytes = input.run(directive.width, |b| members[b as usize] != *negated);
                if bytes.is_empty() {
                    Outcome::MatchFailure
                } else {
                    Outcome::Value(ScanValue::Str(String::from_utf8_lossy(&bytes).into_owned()))
                }
            }
        };

        match outcome {
            Outcome::Value(value) => {
                converted = true;
                if !directive.suppress {
                    out.push(value);
                    assigned += 1;
                }
            }
            Outcome::MatchFailure => return assigned,
            Outcome::InputFailure => return input_failure(converted, assigned),
        }
    }

    assigned
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SliceSource<'a> {
        data: &'a [u8],
        pos: usize,
    }

    impl<'a> SliceSource<'a> {
        fn new(data: &'a str) -> Self {
            SliceSource { data: data.as_bytes(), pos: 0 }
        }

        fn rest(&self) -> &str {
            std::str::from_utf8(&self.data[self.pos..]).unwrap()
        }
    }

    impl ByteSource for SliceSource<'_> {
        fn next_byte(&mut self) -> Option<u8> {
            let byte = *self.data.get(self.pos)?;
            self.pos += 1;
            Some(byte)
        }

        fn unread(&mut self, byte: u8) {
            self.pos -= 1;
            assert_eq!(self.data[self.pos], byte);
        }
    }

    fn scan_str(input: &str, format: &str) -> (i64, Vec<ScanValue>) {
        let mut source = SliceSource::new(input);
        let mut out = Vec::new();
        let count = scan(&mut source, format, &mut out);
        (count, out)
    }

    #[test]
    fn test_scan_integers() {
        let (count, out) = scan_str("  42 -17 +8", "%d %d %d");
        assert_eq!(count, 3);
        assert_eq!(out, vec![ScanValue::Int(42), ScanValue::Int(-17), ScanValue::Int(8)]);

        let (count, out) = scan_str("0x1F 017 9 ff", "%i %i %u %x");
        assert_eq!(count, 4);
        assert_eq!(
            out,
            vec![ScanValue::Int(31), ScanValue::Int(15), ScanValue::UInt(9), ScanValue::UInt(255)]
        );

        let (_, out) = scan_str("0X10 755", "%x %o");
        assert_eq!(out, vec![ScanValue::UInt(16), ScanValue::UInt(493)]);
    }

    #[test]
    fn test_scan_width_splits_fields() {
        let (count, out) = scan_str("123456", "%2d%3d%d");
        assert_eq!(count, 3);
        assert_eq!(out, vec![ScanValue::Int(12), ScanValue::Int(345), ScanValue::Int(6)]);
    }

    #[test]
    fn test_scan_floats() {
        let (count, out) = scan_str("3.5 -1e3 .25 inf", "%f %lf %g %f");
        assert_eq!(count, 4);
        assert_eq!(out[0], ScanValue::Float(3.5));
        assert_eq!(out[1], ScanValue::Float(-1000.0));
        assert_eq!(out[2], ScanValue::Float(0.25));
        assert_eq!(out[3], ScanValue::Float(f64::INFINITY));
    }

    #[test]
    fn test_scan_strings_and_chars() {
        let (count, out) = scan_str("name: glyph  x", "name: %s %c");
        assert_eq!(count, 2);
        assert_eq!(out[0], ScanValue::Str("glyph".to_string()));
        assert_eq!(out[1], ScanValue::Bytes(b"x".to_vec()));

        let (count, out) = scan_str("ab cd", "%3c");
        assert_eq!(count, 1);
        assert_eq!(out[0], ScanValue::Bytes(b"ab ".to_vec()));
    }

    #[test]
    fn test_scan_sets() {
        let (count, out) = scan_str("abc123,rest", "%[a-z]%[0-9]%*[,]%[^\n]");
        assert_eq!(count, 3);
        assert_eq!(
            out,
            vec![
                ScanValue::Str("abc".to_string()),
                ScanValue::Str("123".to_string()),
                ScanValue::Str("rest".to_string()),
            ]
        );

        let (count, out) = scan_str("]]x", "%[]]");
        assert_eq!(count, 1);
        assert_eq!(out[0], ScanValue::Str("]]".to_string()));
    }

    #[test]
    fn test_scan_suppression_not_counted() {
        let (count, out) = scan_str("10 20 30", "%*d %d %*d");
        assert_eq!(count, 1);
        assert_eq!(out, vec![ScanValue::Int(20)]);
    }

    #[test]
    fn test_scan_matching_failure_stops() {
        let mut source = SliceSource::new("12 abc");
        let mut out = Vec::new();
        assert_eq!(scan(&mut source, "%d %d", &mut out), 1);
        assert_eq!(source.rest(), "abc");

        let (count, _) = scan_str("width=5", "height=%d");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_scan_input_failure_before_conversion() {
        assert_eq!(scan_str("", "%d").0, -1);
        assert_eq!(scan_str("   ", "%s").0, -1);
        assert_eq!(scan_str("7", "%d %d").0, 1);
        assert_eq!(scan_str("x", "%2c").0, -1);
    }

    #[test]
    fn test_scan_percent_literal() {
        let (count, out) = scan_str("50% done", "%d%% %s");
        assert_eq!(count, 2);
        assert_eq!(out[1], ScanValue::Str("done".to_string()));
    }

    #[test]
    fn test_scan_pushes_back_terminator() {
        let mut source = SliceSource::new("99;next");
        let mut out = Vec::new();
        assert_eq!(scan(&mut source, "%d", &mut out), 1);
        assert_eq!(source.rest(), ";next");
    }

    #[test]
    fn test_scan_malformed_directive() {
        assert_eq!(scan_str("1 2", "%d %y").0, 1);
        assert_eq!(scan_str("abc", "%[abc").0, 0);
    }

    #[test]
    fn test_scan_bad_exponent_is_matching_failure() {
        assert_eq!(scan_str("100ergs", "%f").0, 0);
    }
}
