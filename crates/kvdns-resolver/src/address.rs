//! Narrowing of `ip` fields into IPv4 and IPv6 addresses.
//!
//! Accepted shapes:
//!
//! | Family | String | Array |
//! |--------|--------|-------|
//! | IPv4 | 8 hex digits, or dotted decimal | 4 parts, each 0..=255 |
//! | IPv6 | 32 hex digits, or RFC 4291 text | 8 parts of 16 bits, or 16 parts of 8 bits |
//!
//! Array parts are numbers or numeric strings. Numeric strings take an
//! optional `0x`, `0o` or `0b` radix prefix; a leading `0` means octal.

use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;

use crate::error::ResolveError;
use crate::error::ResolveResult;
use crate::value::FieldValue;

const IPV4: &str = "IPv4";
const IPV6: &str = "IPv6";

/// Parse an `ip` field as an IPv4 address.
pub fn parse_ipv4(value: &FieldValue) -> ResolveResult<Ipv4Addr> {
    match value {
        FieldValue::String(text) => {
            if let Some(octets) = decode_hex::<4>(text) {
                return Ok(Ipv4Addr::from(octets));
            }
            match text.parse::<IpAddr>() {
                Ok(IpAddr::V4(addr)) => Ok(addr),
                Ok(IpAddr::V6(addr)) => addr
                    .to_ipv4_mapped()
                    .ok_or_else(|| invalid(IPV4, "parsed, but not as IPv4".to_string())),
                Err(_) => Err(invalid(IPV4, "failed to parse".to_string())),
            }
        }
        FieldValue::Sequence(parts) => {
            if parts.len() != 4 {
                return Err(invalid(IPV4, "array length not 4".to_string()));
            }
            let mut octets = [0u8; 4];
            for (i, part) in parts.iter().enumerate() {
                octets[i] = narrow_part(IPV4, i, part, u8::MAX.into())? as u8;
            }
            Ok(Ipv4Addr::from(octets))
        }
        _ => Err(invalid(IPV4, "not string or array".to_string())),
    }
}

/// Parse an `ip` field as an IPv6 address.
///
/// IPv4 text is accepted and yields the IPv4-mapped address.
pub fn parse_ipv6(value: &FieldValue) -> ResolveResult<Ipv6Addr> {
    match value {
        FieldValue::String(text) => {
            if let Some(octets) = decode_hex::<16>(text) {
                return Ok(Ipv6Addr::from(octets));
            }
            match text.parse::<IpAddr>() {
                Ok(IpAddr::V6(addr)) => Ok(addr),
                Ok(IpAddr::V4(addr)) => Ok(addr.to_ipv6_mapped()),
                Err(_) => Err(invalid(IPV6, "failed to parse".to_string())),
            }
        }
        FieldValue::Sequence(parts) => {
            let bytes_per_part = match parts.len() {
                8 => 2,
                16 => 1,
                _ => return Err(invalid(IPV6, "array length neither 8 nor 16".to_string())),
            };
            let max = (1u64 << (bytes_per_part * 8)) - 1;
            let mut octets = [0u8; 16];
            for (i, part) in parts.iter().enumerate() {
                let value = narrow_part(IPV6, i, part, max)?;
                for j in 0..bytes_per_part {
                    let shift = (bytes_per_part - 1 - j) * 8;
                    octets[i * bytes_per_part + j] = ((value >> shift) & 0xff) as u8;
                }
            }
            Ok(Ipv6Addr::from(octets))
        }
        _ => Err(invalid(IPV6, "not string or array".to_string())),
    }
}

/// Decode exactly `N` bytes written as `2 * N` hex digits.
fn decode_hex<const N: usize>(text: &str) -> Option<[u8; N]> {
    if text.len() != N * 2 || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; N];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&text[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// One array element of an address, bounded by `max`. `index` is zero-based.
fn narrow_part(family: &'static str, index: usize, part: &FieldValue, max: u64) -> ResolveResult<u64> {
    let value = match part {
        FieldValue::Number(n) => {
            if *n < 0.0 || n.trunc() > max as f64 {
                return Err(invalid(family, format!("part {} out of range", index + 1)));
            }
            n.trunc() as u64
        }
        FieldValue::String(text) => parse_uint(text.trim())
            .ok_or_else(|| invalid(family, format!("part {} is not a number: '{text}'", index + 1)))?,
        _ => return Err(invalid(family, format!("part {} neither number nor string", index + 1))),
    };
    if value > max {
        return Err(invalid(family, format!("part {} out of range", index + 1)));
    }
    Ok(value)
}

/// Unsigned integer with an optional radix prefix.
fn parse_uint(text: &str) -> Option<u64> {
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(rest) = lower.strip_prefix("0x") {
        (rest, 16)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (rest, 8)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (rest, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };
    if digits.is_empty() || digits.starts_with('+') {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

fn invalid(family: &'static str, reason: String) -> ResolveError {
    ResolveError::InvalidAddress { family, reason }
}
