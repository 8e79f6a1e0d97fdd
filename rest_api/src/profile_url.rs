// rest_api/src/profile_url.rs

use std::net::{IpAddr, Ipv4Addr};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, warn};

use models::{EmergencyProfile, ProfileId};

/// Characters escaped in query-string values. `NON_ALPHANUMERIC` minus the
/// characters `encodeURIComponent` leaves alone, so URLs match what the
/// original frontend already parses.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How the QR target is rendered. Plain is the canonical default; Inline is
/// an explicit opt-in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UrlMode {
    /// A network URL to the public profile page, with the snapshot appended
    /// as query parameters when one is available.
    Plain,
    /// A self-contained `data:text/html` document carrying the snapshot, so
    /// the code scans to content with zero network dependency. Degrades to
    /// Plain when no snapshot exists.
    Inline,
}

/// The minimal subset of a record embedded as a fallback in the generated
/// URL, so a scan still shows something when the API is unreachable.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileSnapshot {
    pub name: String,
    pub blood_group: String,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
}

impl From<&EmergencyProfile> for ProfileSnapshot {
    fn from(profile: &EmergencyProfile) -> Self {
        Self {
            name: profile.name.clone(),
            blood_group: profile.blood_group.to_string(),
            emergency_contact_name: profile.emergency_contact.name.clone(),
            emergency_contact_phone: profile.emergency_contact.phone.clone(),
        }
    }
}

/// Composes the externally reachable URL embedded in a QR code.
///
/// The machine's non-loopback IPv4 address is discovered once at
/// construction and baked into the base URL, so a phone scanning the code on
/// the same network reaches the server instead of its own loopback. A
/// refresh requires reconfiguration (in practice: a restart).
#[derive(Clone, Debug)]
pub struct ProfileUrlBuilder {
    base_url: String,
    mode: UrlMode,
}

impl ProfileUrlBuilder {
    pub fn new(frontend_url: &str, mode: UrlMode) -> Self {
        Self::with_local_addr(frontend_url, discover_local_ipv4(), mode)
    }

    /// Seam for tests: takes the discovered address instead of querying the
    /// host's interfaces.
    pub fn with_local_addr(frontend_url: &str, local: Option<Ipv4Addr>, mode: UrlMode) -> Self {
        Self {
            base_url: substitute_loopback(frontend_url, local),
            mode,
        }
    }

    /// Builds the QR target for `id`. Passing no snapshot degrades Inline
    /// mode to a bare Plain URL; it never fails.
    pub fn build(&self, id: &ProfileId, snapshot: Option<&ProfileSnapshot>) -> String {
        match (self.mode, snapshot) {
            (UrlMode::Inline, Some(snapshot)) => inline_document(snapshot),
            _ => self.plain_url(id, snapshot),
        }
    }

    fn plain_url(&self, id: &ProfileId, snapshot: Option<&ProfileSnapshot>) -> String {
        let mut url = format!("{}/profile/{}", self.base_url.trim_end_matches('/'), id);
        if let Some(snapshot) = snapshot {
            url.push_str(&format!(
                "?n={}&bg={}&ecn={}&ecp={}",
                utf8_percent_encode(&snapshot.name, QUERY_VALUE),
                utf8_percent_encode(&snapshot.blood_group, QUERY_VALUE),
                utf8_percent_encode(&snapshot.emergency_contact_name, QUERY_VALUE),
                utf8_percent_encode(&snapshot.emergency_contact_phone, QUERY_VALUE),
            ));
        }
        url
    }
}

/// First non-loopback IPv4 address of this machine, if any.
fn discover_local_ipv4() -> Option<Ipv4Addr> {
    match local_ip_address::local_ip() {
        Ok(IpAddr::V4(addr)) if !addr.is_loopback() => {
            debug!("Discovered local network address {}", addr);
            Some(addr)
        }
        Ok(other) => {
            debug!("Local address {} is not a usable IPv4 address", other);
            None
        }
        Err(e) => {
            // Degraded but non-fatal: QR codes will carry the loopback host.
            warn!("Could not discover a local network address: {}", e);
            None
        }
    }
}

/// Replaces a loopback host in the configured base URL with the discovered
/// local-network address, so a physically separate device can reach the
/// server. Keeps the URL unchanged when the host is not loopback or no
/// address was found.
fn substitute_loopback(frontend_url: &str, local: Option<Ipv4Addr>) -> String {
    let is_loopback_host =
        frontend_url.contains("localhost") || frontend_url.contains("127.0.0.1");
    match local {
        Some(addr) if is_loopback_host => {
            let addr = addr.to_string();
            frontend_url
                .replace("localhost", &addr)
                .replace("127.0.0.1", &addr)
        }
        _ => frontend_url.to_string(),
    }
}

fn inline_document(snapshot: &ProfileSnapshot) -> String {
    let html = format!(
        concat!(
            "<!doctype html><html><head><meta charset=\"utf-8\">",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
            "<title>Emergency Profile</title></head><body>",
            "<h1>{}</h1>",
            "<p>Blood group: {}</p>",
            "<p>Emergency contact: {} {}</p>",
            "</body></html>"
        ),
        escape_html(&snapshot.name),
        escape_html(&snapshot.blood_group),
        escape_html(&snapshot.emergency_contact_name),
        escape_html(&snapshot.emergency_contact_phone),
    );
    format!("data:text/html;base64,{}", BASE64.encode(html.as_bytes()))
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
