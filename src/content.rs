//! Payload construction for each supported content type.
//!
//! [`build_content`] turns a [`ContentType`] and the user's [`FormFields`] into
//! the exact string handed to the encoder. It never fails: missing fields read
//! as empty strings and the `url`/`text` types fall back to a placeholder.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::QrError;

/// Placeholder payload for an empty `url` field.
pub const DEFAULT_URL: &str = "https://example.com";

/// Placeholder payload for an empty `text` field.
pub const DEFAULT_TEXT: &str = "Hello, world!";

/// Security type used when `wifiSec` is absent or empty.
pub const DEFAULT_WIFI_SECURITY: &str = "WPA";

/// Bytes left as-is by `encodeURIComponent`; everything else is escaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Form field keys, grouped by the content type that reads them.
pub mod field {
    pub const URL: &str = "url";
    pub const TEXT: &str = "text";

    pub const WIFI_SSID: &str = "wifiSsid";
    pub const WIFI_PASS: &str = "wifiPass";
    pub const WIFI_SEC: &str = "wifiSec";

    pub const EMAIL_TO: &str = "emailTo";
    pub const EMAIL_SUBJECT: &str = "emailSubject";
    pub const EMAIL_BODY: &str = "emailBody";

    pub const SMS_NUMBER: &str = "smsNumber";
    pub const SMS_BODY: &str = "smsBody";

    pub const VC_FIRST: &str = "vcFirst";
    pub const VC_LAST: &str = "vcLast";
    pub const VC_PHONE: &str = "vcPhone";
    pub const VC_EMAIL: &str = "vcEmail";
    pub const VC_ORG: &str = "vcOrg";
    pub const VC_URL: &str = "vcUrl";
}

/// The kind of content encoded into the QR code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Url,
    Text,
    Wifi,
    Email,
    Sms,
    #[serde(alias = "contact")]
    Vcard,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::Url,
        ContentType::Text,
        ContentType::Wifi,
        ContentType::Email,
        ContentType::Sms,
        ContentType::Vcard,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Url => "url",
            ContentType::Text => "text",
            ContentType::Wifi => "wifi",
            ContentType::Email => "email",
            ContentType::Sms => "sms",
            ContentType::Vcard => "vcard",
        }
    }

    /// The form field keys this content type reads, in form order.
    pub fn fields(self) -> &'static [&'static str] {
        use field::*;
        match self {
            ContentType::Url => &[URL],
            ContentType::Text => &[TEXT],
            ContentType::Wifi => &[WIFI_SSID, WIFI_PASS, WIFI_SEC],
            ContentType::Email => &[EMAIL_TO, EMAIL_SUBJECT, EMAIL_BODY],
            ContentType::Sms => &[SMS_NUMBER, SMS_BODY],
            ContentType::Vcard => &[VC_FIRST, VC_LAST, VC_PHONE, VC_EMAIL, VC_ORG, VC_URL],
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(ContentType::Url),
            "text" => Ok(ContentType::Text),
            "wifi" => Ok(ContentType::Wifi),
            "email" => Ok(ContentType::Email),
            "sms" => Ok(ContentType::Sms),
            "vcard" | "contact" => Ok(ContentType::Vcard),
            _ => Err(QrError::UnknownContentType(s.to_string())),
        }
    }
}

/// Field values entered by the user, keyed by field name.
///
/// Lookups of absent keys yield `""`, so the builder never has to deal with
/// missing input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormFields(BTreeMap<String, String>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value for `key`, or `""` if it was never set.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`FormFields::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Percent-encodes `value` the way `encodeURIComponent` does.
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Whitespace and line terminators as ECMAScript `String.prototype.trim`
/// defines them. Differs from `char::is_whitespace`: U+FEFF is included,
/// U+0085 is not.
fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\t' | '\u{0B}' | '\u{0C}' | ' ' | '\u{A0}' | '\u{FEFF}'
            | '\n' | '\r' | '\u{2028}' | '\u{2029}'
            | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{202F}' | '\u{205F}' | '\u{3000}'
    )
}

fn js_trim(value: &str) -> &str {
    value.trim_matches(is_js_whitespace)
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Builds the payload string for `content_type` from `fields`.
///
/// # Example
///
/// ```
/// use justqr::content::{build_content, ContentType, FormFields};
///
/// let fields = FormFields::new()
///     .with("wifiSsid", "Net")
///     .with("wifiPass", "pw")
///     .with("wifiSec", "WEP");
/// assert_eq!(build_content(ContentType::Wifi, &fields), "WIFI:T:WEP;S:Net;P:pw;;");
/// ```
pub fn build_content(content_type: ContentType, fields: &FormFields) -> String {
    use field::*;

    match content_type {
        ContentType::Url => or_default(js_trim(fields.get(URL)), DEFAULT_URL).to_string(),
        ContentType::Text => or_default(js_trim(fields.get(TEXT)), DEFAULT_TEXT).to_string(),
        ContentType::Wifi => {
            let sec = or_default(fields.get(WIFI_SEC), DEFAULT_WIFI_SECURITY);
            format!(
                "WIFI:T:{};S:{};P:{};;",
                sec,
                fields.get(WIFI_SSID),
                fields.get(WIFI_PASS)
            )
        }
        ContentType::Email => format!(
            "mailto:{}?subject={}&body={}",
            fields.get(EMAIL_TO),
            encode_component(fields.get(EMAIL_SUBJECT)),
            encode_component(fields.get(EMAIL_BODY))
        ),
        ContentType::Sms => {
            let body = encode_component(fields.get(SMS_BODY));
            if body.is_empty() {
                format!("sms:{}", fields.get(SMS_NUMBER))
            } else {
                format!("sms:{}?body={}", fields.get(SMS_NUMBER), body)
            }
        }
        ContentType::Vcard => {
            let first = fields.get(VC_FIRST);
            let last = fields.get(VC_LAST);
            format!(
                "BEGIN:VCARD\nVERSION:3.0\nFN:{first} {last}\nN:{last};{first};;;\nTEL:{}\nEMAIL:{}\nORG:{}\nURL:{}\nEND:VCARD",
                fields.get(VC_PHONE),
                fields.get(VC_EMAIL),
                fields.get(VC_ORG),
                fields.get(VC_URL)
            )
        }
    }
}
