use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use validator::ValidationError;

/// Keep only the ASCII digits of a CPF as typed by the user.
pub fn cpf_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Validate a Brazilian CPF against its two check digits.
///
/// Formatting characters are ignored, so `111.444.777-35` and `11144477735`
/// give the same answer. Never panics; anything malformed is simply `false`.
pub fn is_valid_cpf(raw: &str) -> bool {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() != 11 {
        return false;
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Weights run from `len + 1` down to 2.
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();

    match (sum * 10) % 11 {
        10 | 11 => 0,
        rest => rest,
    }
}

/// Apply the `000.000.000-00` mask progressively, as the registration form does
/// while the user types. Extra digits are dropped.
pub fn format_cpf(raw: &str) -> String {
    let digits = cpf_digits(raw);
    let mut out = String::with_capacity(14);

    for (i, c) in digits.chars().take(11).enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }

    out
}

/// `validator` hook for request payloads carrying a CPF.
pub fn validate_cpf(value: &str) -> Result<(), ValidationError> {
    if is_valid_cpf(value) {
        Ok(())
    } else {
        Err(ValidationError::new("cpf_invalid"))
    }
}

/// A CPF that passed validation, stored as its 11 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    pub fn parse(raw: &str) -> Option<Self> {
        is_valid_cpf(raw).then(|| Cpf(cpf_digits(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn formatted(&self) -> String {
        format_cpf(&self.0)
    }
}

impl Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cpf {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cpf::parse(s).ok_or_else(|| format!("Invalid CPF: {}", s))
    }
}

impl TryFrom<String> for Cpf {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Cpf> for String {
    fn from(cpf: Cpf) -> Self {
        cpf.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_valid_cpf() {
        assert!(is_valid_cpf("11144477735"));
        assert!(is_valid_cpf("111.444.777-35"));
        assert!(is_valid_cpf("529.982.247-25"));
    }

    #[test]
    fn test_formatting_is_ignored() {
        for raw in ["111.444.777-35", " 111 444 777 35 ", "111-444-777.35"] {
            assert_eq!(is_valid_cpf(raw), is_valid_cpf("11144477735"));
        }
    }

    #[test]
    fn test_repeated_digits_rejected() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert!(!is_valid_cpf(&cpf), "{} should be rejected", cpf);
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert!(!is_valid_cpf(""));
        assert!(!is_valid_cpf("1114447773"));
        assert!(!is_valid_cpf("111444777350"));
        assert!(!is_valid_cpf("abc"));
    }

    #[test]
    fn test_check_digit_mutations_rejected() {
        assert!(!is_valid_cpf("11144477745"));
        assert!(!is_valid_cpf("11144477736"));
        assert!(!is_valid_cpf("21144477735"));
    }

    #[test]
    fn test_non_ascii_digits_ignored() {
        // Arabic-Indic digits are not CPF digits.
        assert!(!is_valid_cpf("١١١٤٤٤٧٧٧٣٥"));
    }

    #[test]
    fn test_format_cpf_progressive() {
        assert_eq!(format_cpf("111"), "111");
        assert_eq!(format_cpf("1114"), "111.4");
        assert_eq!(format_cpf("1114447"), "111.444.7");
        assert_eq!(format_cpf("11144477735"), "111.444.777-35");
        assert_eq!(format_cpf("111444777351234"), "111.444.777-35");
    }

    #[test]
    fn test_cpf_newtype() {
        let cpf = Cpf::parse("111.444.777-35").unwrap();
        assert_eq!(cpf.as_str(), "11144477735");
        assert_eq!(cpf.formatted(), "111.444.777-35");
        assert!(Cpf::parse("111.444.777-36").is_none());

        let json = serde_json::to_string(&cpf).unwrap();
        assert_eq!(json, "\"11144477735\"");
        assert!(serde_json::from_str::<Cpf>("\"00000000000\"").is_err());
    }
}
