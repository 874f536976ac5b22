//! Regex-based masking of personally identifiable information.
//!
//! Optional upstream transform. When enabled it runs before deduplication,
//! so masked lines that become identical are removed by the exact pass.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::ops::AddAssign;

/// Replacement for email addresses.
pub const EMAIL_TOKEN: &str = "|||EMAIL_ADDRESS|||";
/// Replacement for phone numbers.
pub const PHONE_TOKEN: &str = "|||PHONE_NUMBER|||";
/// Replacement for IPv4 addresses.
pub const IP_TOKEN: &str = "|||IP_ADDRESS|||";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
});

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{2}[-.\s]?\d{2}\b")
        .expect("valid phone regex")
});

static IP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b").expect("valid ip regex")
});

/// Replacement counts per PII category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PiiCounts {
    /// Email addresses masked.
    pub emails: usize,
    /// Phone numbers masked.
    pub phone_numbers: usize,
    /// IP addresses masked.
    pub ip_addresses: usize,
}

impl PiiCounts {
    /// Sum of all categories.
    #[must_use]
    pub fn total(&self) -> usize {
        self.emails + self.phone_numbers + self.ip_addresses
    }
}

impl AddAssign for PiiCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.emails += rhs.emails;
        self.phone_numbers += rhs.phone_numbers;
        self.ip_addresses += rhs.ip_addresses;
    }
}

fn mask(re: &Regex, text: &str, token: &str) -> (String, usize) {
    let count = re.find_iter(text).count();
    if count == 0 {
        return (text.to_string(), 0);
    }
    (re.replace_all(text, token).into_owned(), count)
}

/// Mask email addresses.
#[must_use]
pub fn mask_emails(text: &str) -> (String, usize) {
    mask(&EMAIL_RE, text, EMAIL_TOKEN)
}

/// Mask phone numbers such as `555-123-4567` or `1 (555) 123 4567`.
///
/// Matches start at a word boundary, so a leading `+` (or an opening `(`
/// without a country code) stays in the output.
#[must_use]
pub fn mask_phone_numbers(text: &str) -> (String, usize) {
    mask(&PHONE_RE, text, PHONE_TOKEN)
}

/// Mask dotted-quad IPv4 addresses.
#[must_use]
pub fn mask_ip_addresses(text: &str) -> (String, usize) {
    mask(&IP_RE, text, IP_TOKEN)
}

/// Mask emails, then phone numbers, then IP addresses.
#[must_use]
pub fn mask_pii(text: &str) -> (String, PiiCounts) {
    let (text, emails) = mask_emails(text);
    let (text, phone_numbers) = mask_phone_numbers(&text);
    let (text, ip_addresses) = mask_ip_addresses(&text);
    (
        text,
        PiiCounts {
            emails,
            phone_numbers,
            ip_addresses,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_emails() {
        let (masked, n) =
            mask_emails("Contact test@example.com or friend@domain.co.in today");
        assert_eq!(n, 2);
        assert_eq!(
            masked,
            "Contact |||EMAIL_ADDRESS||| or |||EMAIL_ADDRESS||| today"
        );
    }

    #[test]
    fn test_mask_phone_numbers() {
        let (masked, n) = mask_phone_numbers("Call 123-456-7890 now");
        assert_eq!(n, 1);
        assert_eq!(masked, "Call |||PHONE_NUMBER||| now");

        let (masked, n) = mask_phone_numbers("or 2831823829 please");
        assert_eq!(n, 1);
        assert_eq!(masked, "or |||PHONE_NUMBER||| please");
    }

    #[test]
    fn test_phone_prefix_outside_match() {
        let (masked, n) = mask_phone_numbers("Call +1 (555) 123 4567 now");
        assert_eq!(n, 1);
        assert_eq!(masked, "Call +|||PHONE_NUMBER||| now");
    }

    #[test]
    fn test_mask_ip_addresses() {
        let (masked, n) = mask_ip_addresses("Server at 192.168.1.1 is down");
        assert_eq!(n, 1);
        assert_eq!(masked, "Server at |||IP_ADDRESS||| is down");
    }

    #[test]
    fn test_no_pii_unchanged() {
        let text = "Nothing sensitive here.";
        let (masked, counts) = mask_pii(text);
        assert_eq!(masked, text);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_mask_pii_counts() {
        let (masked, counts) = mask_pii("mail a@b.org from 10.0.0.1");
        assert_eq!(masked, "mail |||EMAIL_ADDRESS||| from |||IP_ADDRESS|||");
        assert_eq!(
            counts,
            PiiCounts {
                emails: 1,
                phone_numbers: 0,
                ip_addresses: 1
            }
        );

        let mut total = PiiCounts::default();
        total += counts;
        total += counts;
        assert_eq!(total.total(), 4);
    }
}
