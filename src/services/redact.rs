//! Pseudonymisation of identifiers and scrubbing of free text before a card
//! is persisted. Raw user/session ids never reach disk.

use crate::domain::models::ConfigFile;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const NUMBER_SEPARATORS: [char; 5] = ['-', ' ', '+', '(', ')'];
const MIN_MASKED_DIGITS: usize = 7;
const EMAIL_TRIM: &[char] = &['<', '>', '(', ')', '[', ']', ',', ';', ':', '"', '\'', '.'];

pub fn hmac_hex(secret: &[u8], value: &str) -> anyhow::Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| anyhow::anyhow!("invalid hmac key: {}", e))?;
    mac.update(value.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Secret from the configured environment variable. There is no built-in
/// fallback key.
pub fn redaction_secret(cfg: &ConfigFile) -> anyhow::Result<Vec<u8>> {
    let name = cfg.redaction.secret_env.as_str();
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v.into_bytes()),
        _ => anyhow::bail!("redaction secret not set: export {} before ingesting", name),
    }
}

pub fn scrub_note(text: &str) -> String {
    mask_numbers(&mask_emails(text))
}

fn looks_like_email(token: &str) -> bool {
    let mut parts = token.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(l), Some(d), None) => (l, d),
        _ => return false,
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }
    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return false;
    }
    domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn mask_emails(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for piece in text.split_inclusive(char::is_whitespace) {
        let body = piece.trim_end_matches(char::is_whitespace);
        let ws = &piece[body.len()..];
        let core = body.trim_matches(EMAIL_TRIM);
        if !core.is_empty() && looks_like_email(core) {
            let start = body.find(core).unwrap_or(0);
            out.push_str(&body[..start]);
            out.push_str("[email]");
            out.push_str(&body[start + core.len()..]);
        } else {
            out.push_str(body);
        }
        out.push_str(ws);
    }
    out
}

fn mask_numbers(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() || c == '+' || c == '(' {
            let mut j = i;
            let mut digits = 0usize;
            let mut last_digit = None;
            while j < chars.len()
                && (chars[j].is_ascii_digit() || NUMBER_SEPARATORS.contains(&chars[j]))
            {
                if chars[j].is_ascii_digit() {
                    digits += 1;
                    last_digit = Some(j);
                }
                j += 1;
            }
            if digits >= MIN_MASKED_DIGITS {
                if let Some(end) = last_digit {
                    out.push_str("[number]");
                    i = end + 1;
                    continue;
                }
            }
            // Too short to mask: every later start inside this run is too.
            out.extend(&chars[i..j]);
            i = j;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_is_keyed_and_stable() {
        let a = hmac_hex(b"secret", "user-1").unwrap();
        assert_eq!(a, hmac_hex(b"secret", "user-1").unwrap());
        assert_ne!(a, hmac_hex(b"other", "user-1").unwrap());
        assert_ne!(a, hmac_hex(b"secret", "user-2").unwrap());
        assert_eq!(a.len(), 64);
        assert!(!a.contains("user-1"));
    }

    #[test]
    fn hmac_matches_rfc4231_case_two() {
        assert_eq!(
            hmac_hex(b"Jefe", "what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn masks_email_and_keeps_punctuation() {
        assert_eq!(
            scrub_note("contact me at <jane.doe@example.org>, thanks"),
            "contact me at <[email]>, thanks"
        );
        assert_eq!(scrub_note("not@an email"), "not@an email");
    }

    #[test]
    fn masks_phone_numbers_across_separators() {
        assert_eq!(
            scrub_note("call +1 (555) 123-4567 now"),
            "call [number] now"
        );
    }

    #[test]
    fn separator_runs_are_kept_verbatim() {
        let noise = "(+".repeat(20_000);
        assert_eq!(scrub_note(&noise), noise);
        assert_eq!(scrub_note("ids 12-34 and 5 6"), "ids 12-34 and 5 6");
        assert_eq!(
            scrub_note("ref (12) then 555 123 4567"),
            "ref (12) then [number]"
        );
    }

    #[test]
    fn keeps_short_numbers() {
        assert_eq!(
            scrub_note("rated 3 of 5 in 2026 (twice)"),
            "rated 3 of 5 in 2026 (twice)"
        );
    }
}
