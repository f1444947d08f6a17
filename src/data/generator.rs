//! Random test data.

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::seq::SliceRandom;
use rand::Rng;
use std::str::FromStr;
use uuid::Uuid;

const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
pub const PASSWORD_SYMBOLS: &[u8] = b"!@#$%&*";

/// Password with at least one upper, lower, digit and symbol.
/// Lengths below 4 are raised to 4.
pub fn password(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let length = length.max(4);

    let mut chars: Vec<u8> = [UPPER, LOWER, DIGITS, PASSWORD_SYMBOLS]
        .iter()
        .filter_map(|class| class.choose(&mut rng).copied())
        .collect();

    let all: Vec<u8> = [UPPER, LOWER, DIGITS, PASSWORD_SYMBOLS].concat();
    while chars.len() < length {
        if let Some(c) = all.choose(&mut rng) {
            chars.push(*c);
        }
    }

    chars.shuffle(&mut rng);
    chars.into_iter().map(char::from).collect()
}

/// Lowercase ASCII letters
pub fn alphabetic(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

/// Decimal digits; the first one is never `0` so the value keeps its length
/// when read back as a number.
pub fn numeric(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|i| {
            let low = if i == 0 { 1 } else { 0 };
            char::from(b'0' + rng.gen_range(low..10u8))
        })
        .collect()
}

/// Value kinds accepted by the "I generate ... as ..." step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Email,
    Name,
    Phone,
    Uuid,
    Password,
    Number,
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(DataKind::Email),
            "name" => Ok(DataKind::Name),
            "phone" => Ok(DataKind::Phone),
            "uuid" => Ok(DataKind::Uuid),
            "password" => Ok(DataKind::Password),
            "number" => Ok(DataKind::Number),
            other => Err(format!("unknown data kind '{}'", other)),
        }
    }
}

pub fn generate(kind: DataKind, password_length: usize, numeric_length: usize) -> String {
    match kind {
        DataKind::Email => SafeEmail().fake(),
        DataKind::Name => Name().fake(),
        DataKind::Phone => PhoneNumber().fake(),
        DataKind::Uuid => Uuid::new_v4().to_string(),
        DataKind::Password => password(password_length),
        DataKind::Number => numeric(numeric_length),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_classes() {
        for _ in 0..20 {
            let p = password(12);
            assert_eq!(p.len(), 12);
            assert!(p.chars().any(|c| c.is_ascii_uppercase()));
            assert!(p.chars().any(|c| c.is_ascii_lowercase()));
            assert!(p.chars().any(|c| c.is_ascii_digit()));
            assert!(p.bytes().any(|c| PASSWORD_SYMBOLS.contains(&c)));
        }
    }

    #[test]
    fn test_short_password_is_padded_to_classes() {
        assert_eq!(password(1).len(), 4);
    }

    #[test]
    fn test_alphabetic() {
        let s = alphabetic(6);
        assert_eq!(s.len(), 6);
        assert!(s.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_numeric() {
        let s = numeric(10);
        assert_eq!(s.len(), 10);
        assert!(s.chars().all(|c| c.is_ascii_digit()));
        assert_ne!(s.chars().next(), Some('0'));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Email".parse::<DataKind>(), Ok(DataKind::Email));
        assert!("colour".parse::<DataKind>().is_err());
    }

    #[test]
    fn test_generate_email() {
        let email = generate(DataKind::Email, 12, 10);
        assert!(email.contains('@'));
    }
}
