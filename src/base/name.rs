//! Domain names.
//!
//! The cache stores names in their textual representation rather than in
//! wire format: records arrive pre-parsed from the protocol layer and the
//! cache never serializes to the wire itself. A [`Name`] is an owned,
//! case-preserving string of dot-separated labels which compares and
//! hashes case-insensitively as demanded by
//! [RFC 1035](https://tools.ietf.org/html/rfc1035).
//!
//! Internationalized names are accepted through [`Name::from_idn`] which
//! converts any label containing non-ASCII characters into its ACE form
//! (the `xn--` prefix followed by the punycode encoding of the label as
//! per [RFC 3492](https://tools.ietf.org/html/rfc3492)).

use core::fmt;
use core::hash::{Hash, Hasher};
use std::str::FromStr;

//------------ Name ----------------------------------------------------------

/// An owned domain name in textual form.
///
/// The name is kept in the spelling it was created with but all
/// comparisons ignore ASCII case. A possible single trailing dot (the
/// explicit root label) is stripped upon creation, so `example.com.` and
/// `example.com` intern to the same cache node.
#[derive(Clone, Debug)]
pub struct Name(Box<str>);

impl Name {
    /// The maximum length of a name in its textual form.
    pub const MAX_LEN: usize = 255;

    /// The maximum length of a single label.
    pub const MAX_LABEL_LEN: usize = 63;

    /// Creates a name from its internal (ASCII) representation.
    ///
    /// This checks the usual length limits and rejects empty labels. It
    /// does not insist on strict letter-digit-hyphen names since real
    /// caches see underscores and other relics in the wild.
    pub fn from_ascii(name: &str) -> Result<Self, NameError> {
        let name = name.strip_suffix('.').unwrap_or(name);
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > Self::MAX_LEN {
            return Err(NameError::LongName);
        }
        if !name.is_ascii() {
            return Err(NameError::NotAscii);
        }
        for label in name.split('.') {
            if label.is_empty() {
                return Err(NameError::EmptyLabel);
            }
            if label.len() > Self::MAX_LABEL_LEN {
                return Err(NameError::LongLabel);
            }
        }
        Ok(Name(name.into()))
    }

    /// Creates a name from a possibly internationalized representation.
    ///
    /// Labels consisting entirely of ASCII are taken verbatim. Any other
    /// label is lowercased and replaced by its ACE form.
    pub fn from_idn(name: &str) -> Result<Self, NameError> {
        if name.is_ascii() {
            return Self::from_ascii(name);
        }
        let name = name.strip_suffix('.').unwrap_or(name);
        let mut out = String::new();
        for label in name.split('.') {
            if !out.is_empty() {
                out.push('.');
            }
            if label.is_ascii() {
                out.push_str(label);
            } else {
                let lower = label.to_lowercase();
                out.push_str("xn--");
                out.push_str(&punycode_encode(&lower)?);
            }
        }
        Self::from_ascii(&out)
    }

    /// Returns the textual form of the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether this name equals or lies below the given apex.
    ///
    /// The comparison is case-insensitive and respects label boundaries:
    /// `www.example.com` is a subdomain of `example.com` while
    /// `badexample.com` is not.
    #[must_use]
    pub fn is_subdomain_of(&self, apex: &Name) -> bool {
        let name = self.0.as_bytes();
        let apex = apex.0.as_bytes();
        if name.len() == apex.len() {
            return name.eq_ignore_ascii_case(apex);
        }
        if name.len() < apex.len() + 1 {
            return false;
        }
        let (head, tail) = name.split_at(name.len() - apex.len());
        head.last() == Some(&b'.') && tail.eq_ignore_ascii_case(apex)
    }

    /// Iterates over the bytes of the name folded to lower case.
    pub(crate) fn folded_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.bytes().map(|ch| ch.to_ascii_lowercase())
    }
}

//--- FromStr

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ascii(s)
    }
}

//--- PartialEq, Eq, and Hash

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for ch in self.folded_bytes() {
            state.write_u8(ch)
        }
    }
}

//--- Display

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//--- AsRef

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

//------------ NameError -----------------------------------------------------

/// A string did not constitute a valid domain name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NameError {
    /// The name was empty.
    Empty,

    /// The name exceeded 255 characters.
    LongName,

    /// A label exceeded 63 characters.
    LongLabel,

    /// The name contained an empty label.
    EmptyLabel,

    /// The name contained non-ASCII characters outside of IDN conversion.
    NotAscii,

    /// A label could not be converted to its ACE form.
    BadIdnLabel,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "empty domain name"),
            NameError::LongName => write!(f, "domain name too long"),
            NameError::LongLabel => write!(f, "domain name label too long"),
            NameError::EmptyLabel => write!(f, "empty domain name label"),
            NameError::NotAscii => {
                write!(f, "non-ASCII character in domain name")
            }
            NameError::BadIdnLabel => {
                write!(f, "label cannot be IDN-converted")
            }
        }
    }
}

impl std::error::Error for NameError {}

//------------ Punycode encoding ---------------------------------------------

/// The base of the punycode number system.
const BASE: u32 = 36;

/// Minimum threshold for the variable-length integer digits.
const TMIN: u32 = 1;

/// Maximum threshold for the variable-length integer digits.
const TMAX: u32 = 26;

/// Skew constant of the bias adaptation function.
const SKEW: u32 = 38;

/// Damping factor for the first delta.
const DAMP: u32 = 700;

/// Initial bias of the encoder state.
const INITIAL_BIAS: u32 = 72;

/// First code point beyond ASCII.
const INITIAL_N: u32 = 128;

/// Encodes a single label using the punycode algorithm of RFC 3492.
///
/// Returns the encoded label without the `xn--` prefix. The rare failure
/// case is the delta counter overflowing which cannot happen for labels
/// that fit the DNS length limits but is checked anyway as the RFC
/// requires.
fn punycode_encode(label: &str) -> Result<String, NameError> {
    let input: Vec<char> = label.chars().collect();
    let mut output: String = input.iter().filter(|c| c.is_ascii()).collect();
    let basic = output.len() as u32;
    let mut handled = basic;
    if basic > 0 {
        output.push('-');
    }

    let mut n = INITIAL_N;
    let mut delta = 0u32;
    let mut bias = INITIAL_BIAS;

    while (handled as usize) < input.len() {
        // The smallest code point not yet handled.
        let m = input
            .iter()
            .map(|&ch| ch as u32)
            .filter(|&ch| ch >= n)
            .min()
            .expect("unhandled code points remain");
        delta = (m - n)
            .checked_mul(handled + 1)
            .and_then(|step| delta.checked_add(step))
            .ok_or(NameError::BadIdnLabel)?;
        n = m;
        for &ch in &input {
            let ch = ch as u32;
            if ch < n {
                delta =
                    delta.checked_add(1).ok_or(NameError::BadIdnLabel)?;
            }
            if ch == n {
                let mut q = delta;
                let mut k = BASE;
                loop {
                    let t = if k <= bias {
                        TMIN
                    } else if k >= bias + TMAX {
                        TMAX
                    } else {
                        k - bias
                    };
                    if q < t {
                        break;
                    }
                    output.push(encode_digit(t + (q - t) % (BASE - t)));
                    q = (q - t) / (BASE - t);
                    k += BASE;
                }
                output.push(encode_digit(q));
                bias = adapt(delta, handled + 1, handled == basic);
                delta = 0;
                handled += 1;
            }
        }
        delta += 1;
        n += 1;
    }
    Ok(output)
}

/// The bias adaptation function of RFC 3492, section 6.1.
fn adapt(mut delta: u32, num_points: u32, first_time: bool) -> u32 {
    delta /= if first_time { DAMP } else { 2 };
    delta += delta / num_points;
    let mut k = 0;
    while delta > ((BASE - TMIN) * TMAX) / 2 {
        delta /= BASE - TMIN;
        k += BASE;
    }
    k + ((BASE - TMIN + 1) * delta) / (delta + SKEW)
}

/// Maps a digit value to its punycode character.
fn encode_digit(digit: u32) -> char {
    debug_assert!(digit < BASE);
    if digit < 26 {
        (b'a' + digit as u8) as char
    } else {
        (b'0' + (digit - 26) as u8) as char
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[test]
    fn from_ascii() {
        assert_eq!(
            Name::from_ascii("example.com.").unwrap().as_str(),
            "example.com"
        );
        assert_eq!(Name::from_ascii("Example.COM"), "example.com".parse());
        assert_eq!(Name::from_ascii(""), Err(NameError::Empty));
        assert_eq!(Name::from_ascii("foo..bar"), Err(NameError::EmptyLabel));
        assert_eq!(
            Name::from_ascii(&"x".repeat(64)),
            Err(NameError::LongLabel)
        );
        assert_eq!(Name::from_ascii("bücher.de"), Err(NameError::NotAscii));
    }

    #[test]
    fn eq_ignores_case() {
        let a: Name = "Host.Example".parse().unwrap();
        let b: Name = "host.example".parse().unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    #[case("www.example.com", "example.com", true)]
    #[case("example.com", "example.com", true)]
    #[case("Example.COM", "example.com", true)]
    #[case("badexample.com", "example.com", false)]
    #[case("example.com", "www.example.com", false)]
    #[case("www.example.org", "example.com", false)]
    fn subdomain(
        #[case] name: &str,
        #[case] apex: &str,
        #[case] expected: bool,
    ) {
        let name: Name = name.parse().unwrap();
        let apex: Name = apex.parse().unwrap();
        assert_eq!(name.is_subdomain_of(&apex), expected);
    }

    #[rstest]
    #[case("bücher.de", "xn--bcher-kva.de")]
    #[case("bücher.example.com", "xn--bcher-kva.example.com")]
    #[case("münchen.example", "xn--mnchen-3ya.example")]
    #[case("españa.example", "xn--espaa-rta.example")]
    #[case("plain.example", "plain.example")]
    fn idn(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(Name::from_idn(input).unwrap().as_str(), expected);
    }
}
