//! Invite code generation and normalization.

use crate::core::constants::INVITE_ALPHABET;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

/// Produces candidate invite codes; uniqueness is checked by the caller.
pub trait CodeGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Draws characters from v4 uuid random bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidCodeGenerator;

// Largest multiple of the alphabet size that fits in a byte; bytes at or
// above it are rejected so every character is equally likely.
const ACCEPT_BELOW: u8 = (256 / INVITE_ALPHABET.len() * INVITE_ALPHABET.len()) as u8;

impl CodeGenerator for UuidCodeGenerator {
    fn generate(&self, length: usize) -> String {
        let mut code = String::with_capacity(length);
        while code.len() < length {
            let bytes = *Uuid::new_v4().as_bytes();
            // bytes 6 and 8 carry the version and variant bits
            for (i, byte) in bytes.iter().enumerate() {
                if i == 6 || i == 8 || *byte >= ACCEPT_BELOW {
                    continue;
                }
                code.push(INVITE_ALPHABET[(*byte as usize) % INVITE_ALPHABET.len()] as char);
                if code.len() == length {
                    break;
                }
            }
        }
        code
    }
}

/// Replays a fixed list of codes, then repeats the last one.
#[derive(Debug)]
pub struct SequenceCodeGenerator {
    codes: Mutex<VecDeque<String>>,
    last: Mutex<String>,
}

impl SequenceCodeGenerator {
    pub fn new<I, T>(codes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        SequenceCodeGenerator {
            codes: Mutex::new(codes.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self, _length: usize) -> String {
        let mut codes = self.codes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(next) = codes.pop_front() {
            *last = next;
        }
        last.clone()
    }
}

/// Strips spaces and dashes and uppercases, so `abcd-efgh` matches `ABCDEFGH`.
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Display form with a dash in the middle, e.g. `ABCD-EFGH`.
pub fn format_code(code: &str) -> String {
    let normalized = normalize_code(code);
    if normalized.len() < 2 || !normalized.is_ascii() {
        return normalized;
    }
    let (head, tail) = normalized.split_at(normalized.len() / 2);
    format!("{}-{}", head, tail)
}

/// True when every character belongs to the invite alphabet.
pub fn is_well_formed(code: &str, length: usize) -> bool {
    code.len() == length && code.bytes().all(|b| INVITE_ALPHABET.contains(&b))
}
