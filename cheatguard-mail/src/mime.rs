use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

/// Assemble a single-part `text/plain` message with CRLF line endings.
///
/// Non-ASCII subjects are carried as RFC 2047 encoded-words.
pub fn build_message(from: &str, to: &str, subject: &str, body: &str) -> String {
    let mut msg = String::with_capacity(body.len() + 256);
    msg.push_str("MIME-Version: 1.0\r\n");
    msg.push_str("Content-Type: text/plain; charset=\"utf-8\"\r\n");
    msg.push_str("Content-Transfer-Encoding: 8bit\r\n");
    msg.push_str(&format!("To: {}\r\n", header_value(to)));
    msg.push_str(&format!("From: {}\r\n", header_value(from)));
    msg.push_str(&format!("Subject: {}\r\n", encode_subject(subject)));
    msg.push_str("\r\n");
    msg.push_str(&body.replace("\r\n", "\n").replace('\n', "\r\n"));
    msg
}

/// The `raw` field Gmail expects: URL-safe base64 of the whole message.
pub fn encode_raw(message: &str) -> String {
    URL_SAFE.encode(message.as_bytes())
}

fn encode_subject(subject: &str) -> String {
    let subject = header_value(subject);
    if subject.is_ascii() {
        subject
    } else {
        format!("=?utf-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}

/// Header values must stay on one line.
fn header_value(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_the_required_headers() {
        let msg = build_message("bot@example.com", "me@example.com", "Digest", "line1\nline2");
        let (head, body) = msg.split_once("\r\n\r\n").unwrap();
        assert!(head.contains("To: me@example.com"));
        assert!(head.contains("From: bot@example.com"));
        assert!(head.contains("Subject: Digest"));
        assert!(head.contains("MIME-Version: 1.0"));
        assert!(head.contains("Content-Type: text/plain; charset=\"utf-8\""));
        assert_eq!(body, "line1\r\nline2");
    }

    #[test]
    fn header_injection_is_flattened() {
        let msg = build_message("a@x", "b@x", "Hi\r\nBcc: evil@x", "");
        assert!(msg.contains("Subject: Hi Bcc: evil@x\r\n"));
        assert!(!msg.contains("\r\nBcc:"));
    }

    #[test]
    fn unicode_subject_is_encoded() {
        let msg = build_message("a@x", "b@x", "Résumé", "");
        assert!(msg.contains("Subject: =?utf-8?B?UsOpc3Vtw6k=?="));
    }

    #[test]
    fn raw_is_url_safe() {
        let raw = encode_raw("??>>??");
        assert!(!raw.contains('+') && !raw.contains('/'));
        assert_eq!(URL_SAFE.decode(raw).unwrap(), b"??>>??");
    }
}
